// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
// Copyright (c) DUSK NETWORK. All rights reserved.

//! Standard account addresses.
//!
//! An address is a workchain id plus the 256-bit account id. Contract
//! addresses are derived from the hash of their [`StateInit`], so the same
//! code and initial data always land on the same address.

use std::fmt;
use std::str::FromStr;

use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use base64::Engine;
use crc::{Crc, CRC_16_XMODEM};
use serde::{Deserialize, Serialize};

use crate::cell::{Cell, CellBuilder, CellSlice};
use crate::error::{DecodeError, EncodeError};

/// The basechain, where user contracts live by default.
pub const BASECHAIN: i8 = 0;

const TAG_BOUNCEABLE: u8 = 0x11;
const TAG_NON_BOUNCEABLE: u8 = 0x51;
const TAG_TEST_ONLY: u8 = 0x80;
const FRIENDLY_LEN: usize = 36;

/// A standard (`addr_std`, non-anycast) account address.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address {
    workchain: i8,
    hash: [u8; 32],
}

impl Address {
    /// Creates an address from its parts.
    #[must_use]
    pub const fn new(workchain: i8, hash: [u8; 32]) -> Self {
        Self { workchain, hash }
    }

    /// Workchain id.
    #[must_use]
    pub const fn workchain(&self) -> i8 {
        self.workchain
    }

    /// 256-bit account id.
    #[must_use]
    pub const fn hash(&self) -> &[u8; 32] {
        &self.hash
    }

    /// User-friendly base64url form.
    #[must_use]
    pub fn to_friendly(&self, bounceable: bool, test_only: bool) -> String {
        let mut tag = if bounceable {
            TAG_BOUNCEABLE
        } else {
            TAG_NON_BOUNCEABLE
        };
        if test_only {
            tag |= TAG_TEST_ONLY;
        }

        let mut raw = Vec::with_capacity(FRIENDLY_LEN);
        raw.push(tag);
        raw.push(self.workchain.to_be_bytes()[0]);
        raw.extend_from_slice(&self.hash);
        raw.extend_from_slice(&crc16(&raw).to_be_bytes());

        URL_SAFE.encode(raw)
    }

    fn parse_raw(input: &str) -> Result<Self, DecodeError> {
        let invalid = |reason| DecodeError::InvalidAddress {
            input: input.to_string(),
            reason,
        };

        let (wc, hash) = input
            .split_once(':')
            .ok_or_else(|| invalid("missing ':' separator"))?;
        let workchain = wc
            .parse::<i8>()
            .map_err(|_| invalid("workchain is not an 8-bit integer"))?;

        let mut out = [0u8; 32];
        hex::decode_to_slice(hash, &mut out)
            .map_err(|_| invalid("account id is not 64 hex digits"))?;

        Ok(Self::new(workchain, out))
    }

    fn parse_friendly(input: &str) -> Result<Self, DecodeError> {
        let invalid = |reason| DecodeError::InvalidAddress {
            input: input.to_string(),
            reason,
        };

        let raw = if input.contains(|c: char| c == '-' || c == '_') {
            URL_SAFE.decode(input)
        } else {
            STANDARD.decode(input)
        }
        .map_err(|_| invalid("not valid base64"))?;

        if raw.len() != FRIENDLY_LEN {
            return Err(invalid("friendly form must decode to 36 bytes"));
        }
        let tag = raw[0] & !TAG_TEST_ONLY;
        if tag != TAG_BOUNCEABLE && tag != TAG_NON_BOUNCEABLE {
            return Err(invalid("unknown address tag"));
        }
        let checksum = u16::from_be_bytes([raw[34], raw[35]]);
        if crc16(&raw[..34]) != checksum {
            return Err(invalid("checksum mismatch"));
        }

        let mut hash = [0u8; 32];
        hash.copy_from_slice(&raw[2..34]);
        Ok(Self::new(i8::from_be_bytes([raw[1]]), hash))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.workchain, hex::encode(self.hash))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({self})")
    }
}

impl FromStr for Address {
    type Err = DecodeError;

    /// Accepts the raw form (`0:<64 hex>`) and the 48-character friendly
    /// form in either base64 alphabet.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.contains(':') {
            Self::parse_raw(s)
        } else {
            Self::parse_friendly(s)
        }
    }
}

impl TryFrom<String> for Address {
    type Error = DecodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.to_string()
    }
}

const XMODEM: Crc<u16> = Crc::<u16>::new(&CRC_16_XMODEM);

/// Friendly address checksum.
fn crc16(data: &[u8]) -> u16 {
    XMODEM.checksum(data)
}

impl CellBuilder {
    /// Stores a `MsgAddressInt` (`addr_std$10`), or `addr_none$00` for
    /// `None`.
    ///
    /// # Errors
    /// Fails when the cell has no room for the 267 (or 2) bits.
    pub fn store_address(&mut self, address: Option<&Address>) -> Result<&mut Self, EncodeError> {
        match address {
            None => self.store_uint(0b00, 2),
            Some(addr) => self
                .store_uint(0b10, 2)?
                .store_bit(false)?
                .store_int(i64::from(addr.workchain), 8)?
                .store_bytes(&addr.hash),
        }
    }
}

impl CellSlice<'_> {
    /// Reads a `MsgAddressInt`; `addr_none` yields `None`.
    ///
    /// # Errors
    /// Fails on underflow, on external or variable-length addresses, and on
    /// anycast.
    pub fn load_address(&mut self) -> Result<Option<Address>, DecodeError> {
        // Two bits always fit in a byte.
        #[allow(clippy::cast_possible_truncation)]
        let tag = self.load_uint(2)? as u8;
        match tag {
            0b00 => Ok(None),
            0b10 => {
                if self.load_bit()? {
                    return Err(DecodeError::UnsupportedAddress(tag));
                }
                // Eight-bit loads always fit in an i8.
                #[allow(clippy::cast_possible_truncation)]
                let workchain = self.load_int(8)? as i8;
                let mut hash = [0u8; 32];
                hash.copy_from_slice(&self.load_bytes(32)?);
                Ok(Some(Address::new(workchain, hash)))
            }
            other => Err(DecodeError::UnsupportedAddress(other)),
        }
    }
}

/// Code and initial data of a contract, attached to its first message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateInit {
    /// Contract code.
    pub code: Cell,
    /// Initial persistent data.
    pub data: Cell,
}

impl StateInit {
    /// Serializes as `_ split_depth:(Maybe ...) special:(Maybe ...)
    /// code:(Maybe ^Cell) data:(Maybe ^Cell) library:(HashmapE ...)` with
    /// only code and data present.
    ///
    /// # Errors
    /// Never fails for ordinary cells; the builder's limits are far away.
    pub fn to_cell(&self) -> Result<Cell, EncodeError> {
        let mut b = CellBuilder::new();
        b.store_uint(0b00110, 5)?
            .store_ref(self.code.clone())?
            .store_ref(self.data.clone())?;
        Ok(b.build())
    }

    /// Address this init bundle deploys to on `workchain`.
    ///
    /// # Errors
    /// See [`StateInit::to_cell`].
    pub fn address(&self, workchain: i8) -> Result<Address, EncodeError> {
        Ok(Address::new(workchain, self.to_cell()?.hash()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Address {
        let mut hash = [0u8; 32];
        for (i, b) in hash.iter_mut().enumerate() {
            *b = u8::try_from(i).unwrap() * 7;
        }
        Address::new(BASECHAIN, hash)
    }

    #[test]
    fn crc16_matches_xmodem_check_value() {
        assert_eq!(crc16(b"123456789"), 0x31c3);
    }

    #[test]
    fn raw_form_round_trips() {
        let addr = sample();
        let text = addr.to_string();

        assert!(text.starts_with("0:00070e15"));
        assert_eq!(text.parse::<Address>().unwrap(), addr);

        let master = Address::new(-1, [0xff; 32]);
        assert_eq!(master.to_string().parse::<Address>().unwrap(), master);
    }

    #[test]
    fn friendly_form_round_trips_in_both_alphabets() {
        let addr = sample();
        for (bounceable, test_only) in [(true, false), (false, false), (true, true)] {
            let friendly = addr.to_friendly(bounceable, test_only);
            assert_eq!(friendly.len(), 48);
            assert_eq!(friendly.parse::<Address>().unwrap(), addr);

            let standard = friendly.replace('-', "+").replace('_', "/");
            assert_eq!(standard.parse::<Address>().unwrap(), addr);
        }
    }

    #[test]
    fn friendly_form_rejects_bad_checksum() {
        let friendly = sample().to_friendly(true, false);
        let mut raw = URL_SAFE.decode(&friendly).unwrap();
        raw[10] ^= 1;
        let tampered = URL_SAFE.encode(raw);

        assert!(matches!(
            tampered.parse::<Address>(),
            Err(DecodeError::InvalidAddress {
                reason: "checksum mismatch",
                ..
            })
        ));
    }

    #[test]
    fn malformed_text_is_rejected() {
        assert!("0:abcd".parse::<Address>().is_err());
        assert!("x:00".parse::<Address>().is_err());
        assert!("not-an-address".parse::<Address>().is_err());
    }

    #[test]
    fn addresses_round_trip_through_cells() {
        let addr = sample();
        let mut b = CellBuilder::new();
        b.store_address(Some(&addr))
            .unwrap()
            .store_address(None)
            .unwrap();
        let cell = b.build();
        assert_eq!(cell.bit_len(), 267 + 2);

        let mut s = cell.parse();
        assert_eq!(s.load_address().unwrap(), Some(addr));
        assert_eq!(s.load_address().unwrap(), None);
        assert!(s.end_parse().is_ok());
    }

    #[test]
    fn serde_uses_raw_form() {
        let addr = sample();
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, format!("\"{addr}\""));
        assert_eq!(serde_json::from_str::<Address>(&json).unwrap(), addr);
    }

    #[test]
    fn state_init_address_depends_on_data() {
        let code = Cell::empty();
        let mut b = CellBuilder::new();
        b.store_uint(1, 32).unwrap();
        let one = StateInit {
            code: code.clone(),
            data: b.build(),
        };
        let zero = StateInit {
            code,
            data: Cell::empty(),
        };

        assert_eq!(one.address(BASECHAIN).unwrap(), one.address(BASECHAIN).unwrap());
        assert_ne!(one.address(BASECHAIN).unwrap(), zero.address(BASECHAIN).unwrap());
        assert_eq!(one.address(-1).unwrap().workchain(), -1);
    }
}
