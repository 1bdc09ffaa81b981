// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
// Copyright (c) DUSK NETWORK. All rights reserved.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DecodeError;

const DECIMALS: usize = 9;
const NANO_PER_COIN: u64 = 1_000_000_000;

/// An amount of coins, counted in nano units (10^-9).
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct Coins(u64);

impl Coins {
    /// Zero coins.
    pub const ZERO: Self = Self(0);

    /// Amount from nano units.
    #[must_use]
    pub const fn from_nano(nano: u64) -> Self {
        Self(nano)
    }

    /// Amount in nano units.
    #[must_use]
    pub const fn as_nano(self) -> u64 {
        self.0
    }

    /// Adds two amounts, saturating at `u64::MAX` nano units.
    #[must_use]
    pub const fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }
}

impl FromStr for Coins {
    type Err = DecodeError;

    /// Parses a decimal amount such as `"0.05"` or `"12"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason| DecodeError::InvalidAmount {
            input: s.to_string(),
            reason,
        };

        let (whole, frac) = s.split_once('.').unwrap_or((s, ""));
        if whole.is_empty() && frac.is_empty() {
            return Err(invalid("empty amount"));
        }
        if !whole.chars().chain(frac.chars()).all(|c| c.is_ascii_digit()) {
            return Err(invalid("only digits and one '.' are allowed"));
        }
        if frac.len() > DECIMALS {
            return Err(invalid("more than 9 decimal places"));
        }

        let whole = if whole.is_empty() {
            0
        } else {
            whole.parse::<u64>().map_err(|_| invalid("amount too large"))?
        };
        let frac = if frac.is_empty() {
            0
        } else {
            let padded = format!("{frac:0<DECIMALS$}");
            padded.parse::<u64>().map_err(|_| invalid("amount too large"))?
        };

        whole
            .checked_mul(NANO_PER_COIN)
            .and_then(|nano| nano.checked_add(frac))
            .map(Self)
            .ok_or_else(|| invalid("amount too large"))
    }
}

impl fmt::Display for Coins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / NANO_PER_COIN;
        let frac = self.0 % NANO_PER_COIN;
        if frac == 0 {
            return write!(f, "{whole}");
        }
        let digits = format!("{frac:0>DECIMALS$}");
        write!(f, "{whole}.{}", digits.trim_end_matches('0'))
    }
}

impl TryFrom<String> for Coins {
    type Error = DecodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Coins> for String {
    fn from(coins: Coins) -> Self {
        coins.to_string()
    }
}
