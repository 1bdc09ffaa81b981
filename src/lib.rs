// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
// Copyright (c) DUSK NETWORK. All rights reserved.

//! Client-side toolkit for the `SimpleContract` counter.
//!
//! The crate covers everything that happens off-chain:
//! - the cell model and its bag-of-cells serialization
//! - the message codec (opcodes, query ids, operand layouts)
//! - a [`SimpleContract`] handle that submits messages through a [`Provider`]
//! - the upgrade rules that tell the contract versions apart

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unused_must_use)]
#![deny(unused_extern_crates)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![warn(missing_debug_implementations, unreachable_pub, rustdoc::all)]

/// Account addresses and their text forms.
pub mod address;
/// Bag-of-cells serialization.
pub mod boc;
/// Cells, builders and slices.
pub mod cell;
/// Message envelopes and typed operations.
pub mod codec;
/// Nanoton amounts.
pub mod coins;
/// The `SimpleContract` client handle.
pub mod contract;
/// Error types.
pub mod error;
/// The transport boundary consumed by the client.
pub mod provider;
/// Get-method result stacks.
pub mod stack;
/// Contract versions, state layouts and the ownership gate.
pub mod upgrade;

pub use address::{Address, StateInit, BASECHAIN};
pub use cell::{Cell, CellBuilder, CellSlice};
pub use codec::{Message, Operand, Operation, OperationKind};
pub use coins::Coins;
pub use contract::{
    DecreaseOptions, IncreaseOptions, SimpleContract, SimpleContractConfig, UpgradeAllOptions,
    UpgradeOptions,
};
pub use error::{DecodeError, EncodeError, Error, Result};
pub use provider::{
    GetMethodResult, InternalMessage, Provider, SendMode, SendReceipt, Transaction,
    TransactionFilter,
};
pub use stack::{StackEntry, TupleReader};
pub use upgrade::{ContractVersion, CounterState};
