// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
// Copyright (c) DUSK NETWORK. All rights reserved.

use thiserror::Error;

use crate::address::Address;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while writing into a cell.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    /// The value needs more bits than the declared width.
    #[error("value {value} does not fit in {bits} bits")]
    ValueOutOfRange {
        /// Offending value, sign-extended for signed stores.
        value: i128,
        /// Declared field width.
        bits: usize,
    },

    /// The declared width is not supported by the store call.
    #[error("unsupported field width: {0} bits")]
    InvalidBitWidth(usize),

    /// The cell would exceed 1023 data bits.
    #[error("cell overflow: {requested} bits requested, {available} available")]
    BitOverflow {
        /// Bits the store call needed.
        requested: usize,
        /// Bits left in the cell.
        available: usize,
    },

    /// The cell would exceed four references.
    #[error("cell overflow: more than 4 references")]
    RefOverflow,
}

/// Errors raised while reading cells, BoC payloads, addresses or stacks.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Fewer data bits left than requested.
    #[error("cell underflow: {requested} bits requested, {remaining} remaining")]
    CellUnderflow {
        /// Bits the load call needed.
        requested: usize,
        /// Bits left in the slice.
        remaining: usize,
    },

    /// The requested width is not supported by the load call.
    #[error("unsupported field width: {0} bits")]
    InvalidBitWidth(usize),

    /// No reference left to load.
    #[error("cell underflow: no references left")]
    RefUnderflow,

    /// The slice was expected to be fully consumed.
    #[error("trailing data: {bits} bits and {refs} references left unread")]
    TrailingData {
        /// Unread data bits.
        bits: usize,
        /// Unread references.
        refs: usize,
    },

    /// The body starts with an opcode the codec does not know.
    #[error("unknown opcode 0x{0:08x}")]
    UnknownOpcode(u32),

    /// The address tag is neither `addr_none` nor `addr_std`.
    #[error("unsupported address tag 0b{0:02b}")]
    UnsupportedAddress(u8),

    /// A textual address could not be parsed.
    #[error("invalid address '{input}': {reason}")]
    InvalidAddress {
        /// The rejected text.
        input: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// A decimal coin amount could not be parsed.
    #[error("invalid amount '{input}': {reason}")]
    InvalidAmount {
        /// The rejected text.
        input: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// A bag-of-cells payload is malformed.
    #[error("invalid bag of cells: {0}")]
    InvalidBoc(&'static str),

    /// The get-method returned fewer entries than read.
    #[error("get-method stack is empty")]
    EmptyStack,

    /// The stack entry has a different type than requested.
    #[error("expected {expected} on the stack, found {found}")]
    UnexpectedStackEntry {
        /// Entry kind the reader asked for.
        expected: &'static str,
        /// Entry kind actually present.
        found: &'static str,
    },

    /// The number does not fit the requested integer type.
    #[error("number {value} is out of range for {target}")]
    NumberOutOfRange {
        /// Value read from the stack.
        value: i128,
        /// Requested Rust type.
        target: &'static str,
    },
}

/// Errors surfaced by the client.
///
/// Transport and ledger failures are passed through unchanged; only malformed
/// input is detected locally, before anything is submitted.
#[derive(Debug, Error)]
pub enum Error {
    /// A message or data cell could not be built.
    #[error("encode error: {0}")]
    Encode(#[from] EncodeError),

    /// A body or get-method result could not be read.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// The account has no active contract.
    #[error("contract at address {0} is not deployed")]
    NotDeployed(Address),

    /// A deploy was requested on a handle without an init bundle.
    #[error("cannot deploy {0}: the handle carries no code and data")]
    MissingStateInit(Address),

    /// The get-method terminated with a non-zero exit code.
    #[error("get-method '{method}' failed with exit code {exit_code}")]
    GetMethodFailed {
        /// Method name.
        method: String,
        /// TVM exit code.
        exit_code: i32,
    },

    /// The ledger accepted the message but its transaction failed.
    #[error("{op} from {from} to {to} was rejected{}", exit_code_suffix(.exit_code))]
    OperationRejected {
        /// Sender of the rejected message.
        from: Address,
        /// Destination of the rejected message.
        to: Address,
        /// Human readable operation name.
        op: String,
        /// Compute-phase exit code, if the compute phase ran.
        exit_code: Option<i32>,
    },

    /// Opaque failure from the transport layer.
    #[error("transport error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),
}

fn exit_code_suffix(exit_code: &Option<i32>) -> String {
    exit_code.map_or_else(String::new, |code| format!(" with exit code {code}"))
}

impl Error {
    /// Wraps a transport-level failure without interpreting it.
    pub fn transport<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::Transport(err.into())
    }
}
