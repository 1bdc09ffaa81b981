// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
// Copyright (c) DUSK NETWORK. All rights reserved.

//! The boundary between the client and whatever carries its messages.
//!
//! A [`Provider`] submits internal messages on behalf of a sender, runs
//! get-methods and reports whether an account holds an active contract.
//! The client never looks behind it: a local sandbox and a network-backed
//! provider are interchangeable.

use std::ops::BitOr;

use serde::{Deserialize, Serialize};

use crate::address::{Address, StateInit};
use crate::cell::Cell;
use crate::codec::OperationKind;
use crate::coins::Coins;
use crate::error::{Error, Result};
use crate::stack::{StackEntry, TupleReader};

/// Flags controlling how the sender's wallet pays for an outbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SendMode(u8);

impl SendMode {
    /// Ordinary message: fees are taken from the attached value.
    pub const NONE: Self = Self(0);
    /// Pay forwarding fees separately from the attached value.
    pub const PAY_GAS_SEPARATELY: Self = Self(1);
    /// Ignore errors during the action phase.
    pub const IGNORE_ERRORS: Self = Self(2);
    /// Destroy the sender if its balance reaches zero.
    pub const DESTROY_ACCOUNT_IF_ZERO: Self = Self(32);
    /// Carry the remaining value of the inbound message.
    pub const CARRY_ALL_REMAINING_INCOMING_VALUE: Self = Self(64);
    /// Carry the whole remaining balance.
    pub const CARRY_ALL_REMAINING_BALANCE: Self = Self(128);

    /// Raw flag byte.
    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Whether every flag of `other` is set.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for SendMode {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// An internal message as handed to the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InternalMessage {
    /// Destination account.
    pub to: Address,
    /// Value attached to the message.
    pub value: Coins,
    /// Whether a failed delivery bounces back to the sender.
    pub bounce: bool,
    /// How the sender pays for the message.
    pub send_mode: SendMode,
    /// Code and data for an account that is not deployed yet.
    pub init: Option<StateInit>,
    /// Message body.
    pub body: Cell,
}

/// Outcome of one transaction triggered by a submitted message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Sender of the inbound message.
    pub from: Option<Address>,
    /// Account that executed the transaction.
    pub to: Address,
    /// Opcode of the inbound body, when it carries one.
    pub op: Option<u32>,
    /// Value carried by the inbound message.
    pub value: Coins,
    /// Whether the compute phase succeeded.
    pub success: bool,
    /// Whether the transaction was aborted.
    pub aborted: bool,
    /// Whether this transaction activated the account.
    pub deploy: bool,
    /// Compute-phase exit code; `None` when the compute phase was skipped.
    pub exit_code: Option<i32>,
}

/// Predicate over transactions; unset fields match anything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransactionFilter {
    from: Option<Address>,
    to: Option<Address>,
    op: Option<u32>,
    success: Option<bool>,
    deploy: Option<bool>,
    exit_code: Option<i32>,
}

impl TransactionFilter {
    /// A filter matching every transaction.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Require the inbound sender.
    #[must_use]
    pub fn from(mut self, from: Address) -> Self {
        self.from = Some(from);
        self
    }

    /// Require the executing account.
    #[must_use]
    pub fn to(mut self, to: Address) -> Self {
        self.to = Some(to);
        self
    }

    /// Require the inbound opcode.
    #[must_use]
    pub fn op(mut self, op: u32) -> Self {
        self.op = Some(op);
        self
    }

    /// Require the compute-phase outcome.
    #[must_use]
    pub fn success(mut self, success: bool) -> Self {
        self.success = Some(success);
        self
    }

    /// Require (or exclude) account activation.
    #[must_use]
    pub fn deploy(mut self, deploy: bool) -> Self {
        self.deploy = Some(deploy);
        self
    }

    /// Require the compute-phase exit code.
    #[must_use]
    pub fn exit_code(mut self, exit_code: i32) -> Self {
        self.exit_code = Some(exit_code);
        self
    }

    /// Whether `tx` satisfies every set field.
    #[must_use]
    pub fn matches(&self, tx: &Transaction) -> bool {
        self.from.map_or(true, |from| tx.from == Some(from))
            && self.to.map_or(true, |to| tx.to == to)
            && self.op.map_or(true, |op| tx.op == Some(op))
            && self.success.map_or(true, |s| tx.success == s)
            && self.deploy.map_or(true, |d| tx.deploy == d)
            && self.exit_code.map_or(true, |c| tx.exit_code == Some(c))
    }
}

/// Every transaction caused by one submitted message, in execution order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendReceipt {
    /// The transactions.
    pub transactions: Vec<Transaction>,
}

impl SendReceipt {
    /// First transaction matching `filter`.
    #[must_use]
    pub fn find(&self, filter: &TransactionFilter) -> Option<&Transaction> {
        self.transactions.iter().find(|tx| filter.matches(tx))
    }

    /// Whether any transaction matches `filter`.
    #[must_use]
    pub fn has_transaction(&self, filter: &TransactionFilter) -> bool {
        self.find(filter).is_some()
    }

    /// Returns the transaction `from -> to`, or the rejection it represents.
    ///
    /// # Errors
    /// [`Error::OperationRejected`] when that transaction failed, and a
    /// transport error when the receipt holds no such transaction.
    pub fn ensure_success(&self, from: &Address, to: &Address) -> Result<&Transaction> {
        let tx = self
            .find(&TransactionFilter::new().from(*from).to(*to))
            .ok_or_else(|| Error::transport(format!("receipt has no transaction {from} -> {to}")))?;

        if tx.success {
            return Ok(tx);
        }

        let op = match tx.op {
            None => OperationKind::Deploy.to_string(),
            Some(op) => OperationKind::from_opcode(op)
                .map_or_else(|| format!("opcode 0x{op:08x}"), |kind| kind.to_string()),
        };
        Err(Error::OperationRejected {
            from: *from,
            to: *to,
            op,
            exit_code: tx.exit_code,
        })
    }
}

/// Result of a get-method call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetMethodResult {
    /// TVM exit code; 0 and 1 mean success.
    pub exit_code: i32,
    /// Returned stack, first entry on top.
    pub stack: Vec<StackEntry>,
}

impl GetMethodResult {
    /// Whether the method ran to completion.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.exit_code == 0 || self.exit_code == 1
    }

    /// A reader over the returned stack.
    #[must_use]
    pub fn reader(self) -> TupleReader {
        TupleReader::new(self.stack)
    }
}

/// Submits messages and runs get-methods against a ledger.
///
/// Implementations report ledger and network failures as [`Error`] values;
/// the client passes them through untouched.
pub trait Provider {
    /// Submits `message` on behalf of `via` and waits for its transactions.
    ///
    /// # Errors
    /// Transport failures only; a failed transaction is reported inside the
    /// receipt.
    fn internal(&mut self, via: &Address, message: InternalMessage) -> Result<SendReceipt>;

    /// Runs a get-method on the contract at `address`.
    ///
    /// # Errors
    /// [`Error::NotDeployed`] for inactive accounts, transport failures
    /// otherwise.
    fn get(&mut self, address: &Address, method: &str, args: &[StackEntry])
        -> Result<GetMethodResult>;

    /// Whether `address` holds an active contract.
    ///
    /// # Errors
    /// Transport failures.
    fn is_deployed(&mut self, address: &Address) -> Result<bool>;
}

impl<P: Provider + ?Sized> Provider for &mut P {
    fn internal(&mut self, via: &Address, message: InternalMessage) -> Result<SendReceipt> {
        (**self).internal(via, message)
    }

    fn get(
        &mut self,
        address: &Address,
        method: &str,
        args: &[StackEntry],
    ) -> Result<GetMethodResult> {
        (**self).get(address, method, args)
    }

    fn is_deployed(&mut self, address: &Address) -> Result<bool> {
        (**self).is_deployed(address)
    }
}
