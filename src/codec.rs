// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
// Copyright (c) DUSK NETWORK. All rights reserved.

//! Message bodies understood by `SimpleContract`.
//!
//! Every non-empty body starts with a 32-bit opcode and a 64-bit query id,
//! followed by the operands of the operation. Integers are stored inline;
//! code and data cells travel as references.
//!
//! | Operation            | Opcode       | Operands                          |
//! |----------------------|--------------|-----------------------------------|
//! | `Deploy`             | (empty body) |                                   |
//! | `Increase`           | `0x7e8764ef` | `increase_by:u32`                 |
//! | `Decrease`           | `0xe78525c4` | `decrease_by:u32`                 |
//! | `UpgradeCode`        | `0xdbfaf817` | `code:^Cell`                      |
//! | `UpgradeCodeAndData` | `0xff382702` | `code:^Cell data:^Cell`           |

use std::fmt;

use crate::cell::{Cell, CellBuilder};
use crate::error::{DecodeError, EncodeError};

/// Opcode constants. These are part of the deployed contract's interface.
pub mod opcodes {
    /// Add to the counter.
    pub const INCREASE: u32 = 0x7e87_64ef;
    /// Subtract from the counter.
    pub const DECREASE: u32 = 0xe785_25c4;
    /// Replace the contract code.
    pub const UPGRADE: u32 = 0xdbfa_f817;
    /// Replace the contract code and its persistent data.
    pub const UPGRADE_ALL: u32 = 0xff38_2702;
}

/// Query id used when the caller does not pick one.
pub const DEFAULT_QUERY_ID: u64 = 0;

const OPCODE_BITS: usize = 32;
const QUERY_ID_BITS: usize = 64;
const AMOUNT_BITS: usize = 32;

/// The operations a message body can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OperationKind {
    /// First message, empty body; carries the init bundle.
    Deploy,
    /// Add to the counter.
    Increase,
    /// Subtract from the counter.
    Decrease,
    /// Replace the code, keep the data.
    UpgradeCode,
    /// Replace the code and the data.
    UpgradeCodeAndData,
}

impl OperationKind {
    /// Every kind, in opcode table order.
    pub const ALL: [Self; 5] = [
        Self::Deploy,
        Self::Increase,
        Self::Decrease,
        Self::UpgradeCode,
        Self::UpgradeCodeAndData,
    ];

    /// Opcode of the kind; `Deploy` has none.
    #[must_use]
    pub const fn opcode(self) -> Option<u32> {
        match self {
            Self::Deploy => None,
            Self::Increase => Some(opcodes::INCREASE),
            Self::Decrease => Some(opcodes::DECREASE),
            Self::UpgradeCode => Some(opcodes::UPGRADE),
            Self::UpgradeCodeAndData => Some(opcodes::UPGRADE_ALL),
        }
    }

    /// Kind for a known opcode.
    #[must_use]
    pub const fn from_opcode(opcode: u32) -> Option<Self> {
        match opcode {
            opcodes::INCREASE => Some(Self::Increase),
            opcodes::DECREASE => Some(Self::Decrease),
            opcodes::UPGRADE => Some(Self::UpgradeCode),
            opcodes::UPGRADE_ALL => Some(Self::UpgradeCodeAndData),
            _ => None,
        }
    }

    /// Short lowercase name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Deploy => "deploy",
            Self::Increase => "increase",
            Self::Decrease => "decrease",
            Self::UpgradeCode => "upgrade",
            Self::UpgradeCodeAndData => "upgrade_all",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One operand of a message envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    /// An inline unsigned integer of fixed width.
    Uint {
        /// The value.
        value: u64,
        /// Width in bits.
        bits: usize,
    },
    /// A nested cell, carried by reference.
    Ref(Cell),
}

/// A generic envelope: opcode, query id, operands in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Operation identifier.
    pub opcode: u32,
    /// Caller-chosen correlation id.
    pub query_id: u64,
    /// Operands after the header.
    pub operands: Vec<Operand>,
}

impl Message {
    /// Envelope with no operands yet.
    #[must_use]
    pub fn new(opcode: u32, query_id: u64) -> Self {
        Self {
            opcode,
            query_id,
            operands: Vec::new(),
        }
    }

    /// Appends an inline integer operand.
    #[must_use]
    pub fn with_uint(mut self, value: u64, bits: usize) -> Self {
        self.operands.push(Operand::Uint { value, bits });
        self
    }

    /// Appends a reference operand.
    #[must_use]
    pub fn with_ref(mut self, cell: Cell) -> Self {
        self.operands.push(Operand::Ref(cell));
        self
    }

    /// Writes the envelope into a cell.
    ///
    /// # Errors
    /// Fails when an integer operand does not fit its width or the cell
    /// limits are exceeded.
    pub fn to_cell(&self) -> Result<Cell, EncodeError> {
        let mut b = CellBuilder::new();
        b.store_uint(u64::from(self.opcode), OPCODE_BITS)?
            .store_uint(self.query_id, QUERY_ID_BITS)?;
        for operand in &self.operands {
            match operand {
                Operand::Uint { value, bits } => b.store_uint(*value, *bits)?,
                Operand::Ref(cell) => b.store_ref(cell.clone())?,
            };
        }
        Ok(b.build())
    }

    /// Opcode of a body, if it is long enough to carry one.
    #[must_use]
    pub fn peek_opcode(body: &Cell) -> Option<u32> {
        body.parse()
            .preload_uint(OPCODE_BITS)
            .ok()
            .and_then(|op| u32::try_from(op).ok())
    }
}

/// A typed request to the contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Empty body; only meaningful with an init bundle attached.
    Deploy,
    /// `counter += increase_by`.
    Increase {
        /// Correlation id.
        query_id: u64,
        /// Amount to add.
        increase_by: u32,
    },
    /// `counter -= decrease_by`.
    Decrease {
        /// Correlation id.
        query_id: u64,
        /// Amount to subtract.
        decrease_by: u32,
    },
    /// Install new code over the existing data.
    UpgradeCode {
        /// Correlation id.
        query_id: u64,
        /// New contract code.
        code: Cell,
    },
    /// Install new code and replace the data cell.
    UpgradeCodeAndData {
        /// Correlation id.
        query_id: u64,
        /// New contract code.
        code: Cell,
        /// New persistent data, stored verbatim.
        data: Cell,
    },
}

impl Operation {
    /// The kind of this operation.
    #[must_use]
    pub fn kind(&self) -> OperationKind {
        match self {
            Self::Deploy => OperationKind::Deploy,
            Self::Increase { .. } => OperationKind::Increase,
            Self::Decrease { .. } => OperationKind::Decrease,
            Self::UpgradeCode { .. } => OperationKind::UpgradeCode,
            Self::UpgradeCodeAndData { .. } => OperationKind::UpgradeCodeAndData,
        }
    }

    /// The envelope for this operation; `Deploy` has an empty body instead.
    #[must_use]
    pub fn to_message(&self) -> Option<Message> {
        let opcode = self.kind().opcode()?;
        let message = match self {
            Self::Deploy => return None,
            Self::Increase {
                query_id,
                increase_by,
            } => Message::new(opcode, *query_id).with_uint(u64::from(*increase_by), AMOUNT_BITS),
            Self::Decrease {
                query_id,
                decrease_by,
            } => Message::new(opcode, *query_id).with_uint(u64::from(*decrease_by), AMOUNT_BITS),
            Self::UpgradeCode { query_id, code } => {
                Message::new(opcode, *query_id).with_ref(code.clone())
            }
            Self::UpgradeCodeAndData {
                query_id,
                code,
                data,
            } => Message::new(opcode, *query_id)
                .with_ref(code.clone())
                .with_ref(data.clone()),
        };
        Some(message)
    }

    /// Encodes the message body.
    ///
    /// # Errors
    /// See [`Message::to_cell`].
    pub fn encode(&self) -> Result<Cell, EncodeError> {
        match self.to_message() {
            Some(message) => message.to_cell(),
            None => Ok(Cell::empty()),
        }
    }

    /// Decodes a message body; the whole body must be consumed.
    ///
    /// # Errors
    /// Fails on unknown opcodes, short bodies, missing references and
    /// trailing data.
    pub fn decode(body: &Cell) -> Result<Self, DecodeError> {
        if body.is_empty() {
            return Ok(Self::Deploy);
        }

        let mut s = body.parse();
        // A 32-bit load always fits in a u32.
        #[allow(clippy::cast_possible_truncation)]
        let opcode = s.load_uint(OPCODE_BITS)? as u32;
        let kind = OperationKind::from_opcode(opcode).ok_or(DecodeError::UnknownOpcode(opcode))?;
        let query_id = s.load_uint(QUERY_ID_BITS)?;

        #[allow(clippy::cast_possible_truncation)]
        let op = match kind {
            OperationKind::Increase => Self::Increase {
                query_id,
                increase_by: s.load_uint(AMOUNT_BITS)? as u32,
            },
            OperationKind::Decrease => Self::Decrease {
                query_id,
                decrease_by: s.load_uint(AMOUNT_BITS)? as u32,
            },
            OperationKind::UpgradeCode => Self::UpgradeCode {
                query_id,
                code: s.load_ref()?.clone(),
            },
            OperationKind::UpgradeCodeAndData => Self::UpgradeCodeAndData {
                query_id,
                code: s.load_ref()?.clone(),
                data: s.load_ref()?.clone(),
            },
            OperationKind::Deploy => return Err(DecodeError::UnknownOpcode(opcode)),
        };

        s.end_parse()?;
        Ok(op)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code_blob(tag: u64) -> Cell {
        let mut b = CellBuilder::new();
        b.store_uint(tag, 16).unwrap();
        b.build()
    }

    #[test]
    fn opcode_table_is_stable() {
        assert_eq!(OperationKind::Increase.opcode(), Some(0x7E87_64EF));
        assert_eq!(OperationKind::Decrease.opcode(), Some(0xE785_25C4));
        assert_eq!(OperationKind::UpgradeCode.opcode(), Some(0xDBFA_F817));
        assert_eq!(OperationKind::UpgradeCodeAndData.opcode(), Some(0xFF38_2702));
        assert_eq!(OperationKind::Deploy.opcode(), None);

        for kind in OperationKind::ALL.into_iter().skip(1) {
            assert_eq!(OperationKind::from_opcode(kind.opcode().unwrap()), Some(kind));
        }
    }

    #[test]
    fn increase_body_layout() {
        let body = Operation::Increase {
            query_id: 0,
            increase_by: 100,
        }
        .encode()
        .unwrap();

        assert_eq!(body.bit_len(), 32 + 64 + 32);
        assert!(body.references().is_empty());
        assert_eq!(
            hex::encode(body.data()),
            "7e8764ef000000000000000000000064"
        );
    }

    #[test]
    fn upgrade_bodies_carry_references() {
        let code = code_blob(2);
        let data = code_blob(3);

        let body = Operation::UpgradeCode {
            query_id: 9,
            code: code.clone(),
        }
        .encode()
        .unwrap();
        assert_eq!(body.bit_len(), 96);
        assert_eq!(body.references(), &[code.clone()]);
        assert_eq!(hex::encode(body.data()), "dbfaf8170000000000000009");

        let body = Operation::UpgradeCodeAndData {
            query_id: 0,
            code: code.clone(),
            data: data.clone(),
        }
        .encode()
        .unwrap();
        assert_eq!(body.references(), &[code, data]);
        assert_eq!(Message::peek_opcode(&body), Some(opcodes::UPGRADE_ALL));
    }

    #[test]
    fn deploy_is_the_empty_body() {
        let body = Operation::Deploy.encode().unwrap();
        assert!(body.is_empty());
        assert_eq!(Operation::decode(&body).unwrap(), Operation::Deploy);
        assert_eq!(Message::peek_opcode(&body), None);
    }

    #[test]
    fn decode_recovers_every_operation() {
        let ops = [
            Operation::Increase {
                query_id: u64::MAX,
                increase_by: u32::MAX,
            },
            Operation::Decrease {
                query_id: 42,
                decrease_by: 50,
            },
            Operation::UpgradeCode {
                query_id: 1,
                code: code_blob(7),
            },
            Operation::UpgradeCodeAndData {
                query_id: 2,
                code: code_blob(7),
                data: code_blob(8),
            },
        ];
        for op in ops {
            let body = op.encode().unwrap();
            assert_eq!(Operation::decode(&body).unwrap(), op);
        }
    }

    #[test]
    fn decode_rejects_malformed_bodies() {
        let unknown = Message::new(0xdead_beef, 0).to_cell().unwrap();
        assert_eq!(
            Operation::decode(&unknown).unwrap_err(),
            DecodeError::UnknownOpcode(0xdead_beef)
        );

        let short = Message::new(opcodes::INCREASE, 0).to_cell().unwrap();
        assert!(matches!(
            Operation::decode(&short),
            Err(DecodeError::CellUnderflow { .. })
        ));

        let no_ref = Message::new(opcodes::UPGRADE, 0).to_cell().unwrap();
        assert_eq!(Operation::decode(&no_ref).unwrap_err(), DecodeError::RefUnderflow);

        let trailing = Message::new(opcodes::DECREASE, 0)
            .with_uint(1, 32)
            .with_uint(1, 1)
            .to_cell()
            .unwrap();
        assert_eq!(
            Operation::decode(&trailing).unwrap_err(),
            DecodeError::TrailingData { bits: 1, refs: 0 }
        );
    }

    #[test]
    fn envelope_rejects_oversized_operands() {
        let err = Message::new(opcodes::INCREASE, 0)
            .with_uint(1 << 32, 32)
            .to_cell()
            .unwrap_err();
        assert_eq!(
            err,
            EncodeError::ValueOutOfRange {
                value: 1 << 32,
                bits: 32
            }
        );
    }
}
