use simple_counter::{Address, Provider, SendReceipt, SimpleContract};
use simple_counter_sandbox::Blockchain;

use crate::config::Settings;
use crate::error::{CliError, Result};
use crate::ui;

/// The local ledger opened for one command, plus the signing treasury.
pub struct Session {
    pub chain: Blockchain,
    pub sender: Address,
    settings: Settings,
}

impl Session {
    pub fn open(settings: &Settings) -> Result<Self> {
        let mut chain = Blockchain::load(&settings.ledger)?;
        let sender = chain.treasury(&settings.sender);
        tracing::debug!(sender = %sender, name = %settings.sender, "using treasury");
        Ok(Self {
            chain,
            sender,
            settings: settings.clone(),
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn save(&self) -> Result<()> {
        self.chain.save(&self.settings.ledger)?;
        Ok(())
    }

    /// An address, or the treasury with that name.
    ///
    /// Input shaped like an address (raw `wc:hex` or 48-character friendly
    /// form) must parse as one; it never names a treasury.
    pub fn resolve_account(&mut self, input: &str) -> Result<Address> {
        if looks_like_address(input) {
            return parse_address(input);
        }
        Ok(self.chain.treasury(input))
    }

    /// Binds to a deployed contract.
    pub fn open_contract(&mut self, input: &str) -> Result<SimpleContract> {
        let address = parse_address(input)?;
        if !self.chain.is_deployed(&address)? {
            return Err(CliError::NotDeployed(address));
        }
        Ok(SimpleContract::create_from_address(address))
    }

    /// Logs the receipt and turns a failed contract transaction into an error.
    pub fn check_receipt(&self, receipt: &SendReceipt, contract: &Address) -> Result<()> {
        if self.settings.verbose {
            for tx in &receipt.transactions {
                ui::status(ui::format_transaction(tx));
            }
        }
        receipt.ensure_success(&self.sender, contract)?;
        Ok(())
    }
}

const FRIENDLY_ADDRESS_CHARS: usize = 48;

fn looks_like_address(input: &str) -> bool {
    input.contains(':') || input.len() == FRIENDLY_ADDRESS_CHARS
}

pub fn parse_address(input: &str) -> Result<Address> {
    input
        .parse()
        .map_err(|source| CliError::InvalidAddress {
            input: input.to_string(),
            source,
        })
}
