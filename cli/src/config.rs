use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use simple_counter::Coins;

use crate::cli::GlobalOptions;
use crate::error::{CliError, Result};
use crate::wait::RetryPolicy;

/// Config file picked up from the working directory.
pub const DEFAULT_CONFIG_FILENAME: &str = "simple-counter.toml";
pub const DEFAULT_LEDGER: &str = "simple-counter-ledger.json";
pub const DEFAULT_SENDER: &str = "deployer";
pub const DEFAULT_VALUE: &str = "0.05";

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub ledger: Option<PathBuf>,
    pub sender: Option<String>,
    pub value: Option<String>,
    #[serde(default)]
    pub wait: WaitConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WaitConfig {
    pub interval_ms: u64,
    pub max_attempts: u32,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            interval_ms: 2000,
            max_attempts: 30,
        }
    }
}

/// Reads `explicit`, or the default file when it exists.
pub fn load(explicit: Option<&Path>) -> Result<Config> {
    let path = match explicit {
        Some(path) if !path.exists() => return Err(CliError::MissingConfig(path.to_path_buf())),
        Some(path) => path.to_path_buf(),
        None => {
            let default = PathBuf::from(DEFAULT_CONFIG_FILENAME);
            if !default.exists() {
                return Ok(Config::default());
            }
            default
        }
    };
    tracing::debug!(path = %path.display(), "loading config");
    parse(&fs::read_to_string(path)?)
}

pub fn parse(content: &str) -> Result<Config> {
    Ok(toml::from_str(content)?)
}

/// Options after merging flags, config file and defaults, in that order.
#[derive(Debug, Clone)]
pub struct Settings {
    pub ledger: PathBuf,
    pub sender: String,
    pub value: Coins,
    pub retry: RetryPolicy,
    pub verbose: bool,
}

impl Settings {
    pub fn resolve(global: &GlobalOptions, config: Config) -> Result<Self> {
        let value = config.value.as_deref().unwrap_or(DEFAULT_VALUE);
        Ok(Self {
            ledger: global
                .ledger
                .clone()
                .or(config.ledger)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LEDGER)),
            sender: global
                .sender
                .clone()
                .or(config.sender)
                .unwrap_or_else(|| DEFAULT_SENDER.to_string()),
            value: parse_value(value)?,
            retry: RetryPolicy::new(
                Duration::from_millis(config.wait.interval_ms),
                config.wait.max_attempts,
            ),
            verbose: global.verbose,
        })
    }

    /// `flag` when given, otherwise the configured value.
    pub fn value_or(&self, flag: Option<&str>) -> Result<Coins> {
        flag.map_or(Ok(self.value), parse_value)
    }
}

pub fn parse_value(input: &str) -> Result<Coins> {
    input.parse().map_err(|source| CliError::InvalidValue {
        input: input.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn global() -> GlobalOptions {
        GlobalOptions {
            config: None,
            ledger: None,
            sender: None,
            verbose: false,
        }
    }

    #[test]
    fn empty_config_uses_defaults() {
        let settings = Settings::resolve(&global(), parse("").unwrap()).unwrap();
        assert_eq!(settings.ledger, PathBuf::from(DEFAULT_LEDGER));
        assert_eq!(settings.sender, DEFAULT_SENDER);
        assert_eq!(settings.value, Coins::from_nano(50_000_000));
        assert_eq!(settings.retry.max_attempts(), 30);
    }

    #[test]
    fn flags_override_config() {
        let config = parse(
            r#"
            ledger = "from-config.json"
            sender = "alice"
            value = "1.5"

            [wait]
            interval_ms = 10
            "#,
        )
        .unwrap();
        let mut flags = global();
        flags.sender = Some("bob".to_string());

        let settings = Settings::resolve(&flags, config).unwrap();
        assert_eq!(settings.ledger, PathBuf::from("from-config.json"));
        assert_eq!(settings.sender, "bob");
        assert_eq!(settings.value.as_nano(), 1_500_000_000);
        assert_eq!(settings.retry.interval(), Duration::from_millis(10));
        assert_eq!(settings.retry.max_attempts(), 30);
        assert_eq!(
            settings.value_or(Some("2")).unwrap().as_nano(),
            2_000_000_000
        );
    }

    #[test]
    fn rejects_unknown_keys_and_bad_values() {
        assert!(matches!(parse("ledgr = 'x'"), Err(CliError::Toml(_))));
        let config = parse("value = 'lots'").unwrap();
        assert!(matches!(
            Settings::resolve(&global(), config),
            Err(CliError::InvalidValue { .. })
        ));
    }
}
