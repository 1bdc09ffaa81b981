// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
// Copyright (c) DUSK NETWORK. All rights reserved.

use std::collections::VecDeque;

use crate::address::Address;
use crate::cell::Cell;
use crate::error::DecodeError;

/// A value on a get-method result stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StackEntry {
    /// The null value.
    Null,
    /// An integer. TVM integers are 257-bit; every value this contract
    /// returns fits in 128 bits.
    Int(i128),
    /// A cell.
    Cell(Cell),
    /// A slice, carried as the cell it covers.
    Slice(Cell),
}

impl StackEntry {
    fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Int(_) => "int",
            Self::Cell(_) => "cell",
            Self::Slice(_) => "slice",
        }
    }
}

/// Reads a get-method result stack front to back.
#[derive(Debug, Clone)]
pub struct TupleReader {
    items: VecDeque<StackEntry>,
}

impl TupleReader {
    /// Wraps a result stack.
    #[must_use]
    pub fn new(items: Vec<StackEntry>) -> Self {
        Self {
            items: items.into(),
        }
    }

    /// Entries not yet read.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.items.len()
    }

    /// Pops the next entry.
    ///
    /// # Errors
    /// Fails on an empty stack.
    pub fn pop(&mut self) -> Result<StackEntry, DecodeError> {
        self.items.pop_front().ok_or(DecodeError::EmptyStack)
    }

    /// Reads an integer.
    ///
    /// # Errors
    /// Fails on an empty stack or a non-integer entry.
    pub fn read_number(&mut self) -> Result<i128, DecodeError> {
        match self.pop()? {
            StackEntry::Int(value) => Ok(value),
            other => Err(DecodeError::UnexpectedStackEntry {
                expected: "int",
                found: other.kind(),
            }),
        }
    }

    /// Reads an integer that must fit in a `u32`.
    ///
    /// # Errors
    /// As [`TupleReader::read_number`], plus range errors.
    pub fn read_u32(&mut self) -> Result<u32, DecodeError> {
        let value = self.read_number()?;
        u32::try_from(value).map_err(|_| DecodeError::NumberOutOfRange {
            value,
            target: "u32",
        })
    }

    /// Reads a slice holding a `MsgAddress`.
    ///
    /// # Errors
    /// Fails on an empty stack, a non-slice entry or a malformed address.
    pub fn read_address_opt(&mut self) -> Result<Option<Address>, DecodeError> {
        match self.pop()? {
            StackEntry::Slice(cell) | StackEntry::Cell(cell) => cell.parse().load_address(),
            StackEntry::Null => Ok(None),
            other => Err(DecodeError::UnexpectedStackEntry {
                expected: "slice",
                found: other.kind(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_numbers_in_order() {
        let mut reader = TupleReader::new(vec![StackEntry::Int(100), StackEntry::Int(7)]);
        assert_eq!(reader.read_u32().unwrap(), 100);
        assert_eq!(reader.read_number().unwrap(), 7);
        assert_eq!(reader.read_number().unwrap_err(), DecodeError::EmptyStack);
    }

    #[test]
    fn rejects_wrong_types_and_ranges() {
        let mut reader = TupleReader::new(vec![
            StackEntry::Null,
            StackEntry::Int(-1),
            StackEntry::Int(1 << 40),
        ]);
        assert_eq!(
            reader.read_number().unwrap_err(),
            DecodeError::UnexpectedStackEntry {
                expected: "int",
                found: "null"
            }
        );
        assert!(matches!(
            reader.read_u32(),
            Err(DecodeError::NumberOutOfRange { value: -1, .. })
        ));
        assert!(reader.read_u32().is_err());
        assert_eq!(reader.remaining(), 0);
    }
}
