// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
// Copyright (c) DUSK NETWORK. All rights reserved.

//! An in-process ledger for `SimpleContract`.
//!
//! [`Blockchain`] keeps accounts in memory, executes internal messages one
//! at a time and implements [`Provider`], so the client runs against it
//! unchanged. There are no fees, no gas and no blocks: a message and every
//! transaction it causes complete inside the `internal` call.
//!
//! Wallets are modelled as treasuries: plain accounts holding coins, created
//! on demand by name.

#![deny(missing_docs)]
#![deny(unused_must_use)]
#![warn(missing_debug_implementations, unreachable_pub)]

pub mod code;
pub mod counter;
/// Sandbox failures.
pub mod error;

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use simple_counter::codec::Message;
use simple_counter::provider::{GetMethodResult, InternalMessage, Provider, SendReceipt};
use simple_counter::{Address, Cell, Coins, StackEntry, StateInit, Transaction, BASECHAIN};
use tracing::{debug, info, warn};

pub use code::{compile, CodeRegistry, ContractCode, Effects, ExitCode, Inbound};
pub use error::{Result, SandboxError};

/// Balance a treasury starts with: one million coins.
pub const TREASURY_BALANCE: Coins = Coins::from_nano(1_000_000 * 1_000_000_000);

/// Opcode prefix of a bounced body.
const BOUNCE_OPCODE: u32 = 0xffff_ffff;

/// State of one account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AccountState {
    /// No code yet.
    Uninit,
    /// Deployed contract.
    Active {
        /// Installed code.
        code: Cell,
        /// Persistent data.
        data: Cell,
    },
}

/// An account on the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Coins held.
    pub balance: Coins,
    /// Code and data, if deployed.
    pub state: AccountState,
}

impl Account {
    const fn empty() -> Self {
        Self {
            balance: Coins::ZERO,
            state: AccountState::Uninit,
        }
    }
}

/// The persisted part of a [`Blockchain`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Every known account.
    pub accounts: BTreeMap<Address, Account>,
    /// Logical time of the last transaction.
    pub lt: u64,
}

/// The sandbox ledger.
#[derive(Debug, Clone)]
pub struct Blockchain {
    accounts: BTreeMap<Address, Account>,
    registry: CodeRegistry,
    lt: u64,
}

impl Blockchain {
    /// An empty ledger that runs every `SimpleContract` release.
    ///
    /// # Errors
    /// See [`CodeRegistry::with_counter_versions`].
    pub fn create() -> Result<Self> {
        Ok(Self::with_registry(CodeRegistry::with_counter_versions()?))
    }

    /// An empty ledger running the code in `registry`.
    #[must_use]
    pub fn with_registry(registry: CodeRegistry) -> Self {
        Self {
            accounts: BTreeMap::new(),
            registry,
            lt: 0,
        }
    }

    /// Rebuilds a ledger from a snapshot, running every `SimpleContract`
    /// release.
    ///
    /// # Errors
    /// See [`Blockchain::create`].
    pub fn restore(snapshot: Snapshot) -> Result<Self> {
        Ok(Self::restore_with(
            snapshot,
            CodeRegistry::with_counter_versions()?,
        ))
    }

    /// Rebuilds a ledger from a snapshot, running the code in `registry`.
    #[must_use]
    pub fn restore_with(snapshot: Snapshot, registry: CodeRegistry) -> Self {
        Self {
            accounts: snapshot.accounts,
            registry,
            lt: snapshot.lt,
        }
    }

    /// Captures accounts and logical time.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            accounts: self.accounts.clone(),
            lt: self.lt,
        }
    }

    /// Loads a ledger from a JSON snapshot, or starts an empty one when the
    /// file does not exist.
    ///
    /// # Errors
    /// I/O failures other than a missing file, and malformed snapshots.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "no ledger file, starting empty");
            return Self::create();
        }
        let raw = fs::read_to_string(path).map_err(|source| SandboxError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::restore(serde_json::from_str(&raw)?)
    }

    /// Writes the ledger as a JSON snapshot.
    ///
    /// # Errors
    /// I/O and encoding failures.
    pub fn save(&self, path: &Path) -> Result<()> {
        let raw = serde_json::to_string_pretty(&self.snapshot())?;
        fs::write(path, raw).map_err(|source| SandboxError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Address of the treasury called `name`, funding it on first use.
    pub fn treasury(&mut self, name: &str) -> Address {
        let address = treasury_address(name);
        self.accounts.entry(address).or_insert_with(|| {
            debug!(name, %address, "funding treasury");
            Account {
                balance: TREASURY_BALANCE,
                state: AccountState::Uninit,
            }
        });
        address
    }

    /// Account at `address`.
    #[must_use]
    pub fn account(&self, address: &Address) -> Option<&Account> {
        self.accounts.get(address)
    }

    /// Balance at `address`; zero for unknown accounts.
    #[must_use]
    pub fn balance(&self, address: &Address) -> Coins {
        self.accounts
            .get(address)
            .map_or(Coins::ZERO, |account| account.balance)
    }

    /// Name of the code installed at `address`, when the sandbox knows it.
    #[must_use]
    pub fn code_name(&self, address: &Address) -> Option<&str> {
        match &self.accounts.get(address)?.state {
            AccountState::Active { code, .. } => {
                self.registry.lookup(code).map(|behavior| behavior.name())
            }
            AccountState::Uninit => None,
        }
    }

    /// Data cell at `address`, when deployed.
    #[must_use]
    pub fn data(&self, address: &Address) -> Option<&Cell> {
        match &self.accounts.get(address)?.state {
            AccountState::Active { data, .. } => Some(data),
            AccountState::Uninit => None,
        }
    }

    /// Delivers `message` from `via` and runs every resulting transaction.
    ///
    /// # Errors
    /// Unknown senders and insufficient balances. Failed transactions are
    /// part of the receipt, not errors.
    pub fn send(&mut self, via: &Address, message: InternalMessage) -> Result<SendReceipt> {
        let balance = self
            .accounts
            .get(via)
            .ok_or(SandboxError::UnknownSender(*via))?
            .balance;
        if balance < message.value {
            return Err(SandboxError::InsufficientFunds {
                sender: *via,
                balance,
                value: message.value,
            });
        }

        let mut transactions = vec![self.wallet_transaction(via, message.value)];
        let inbound = self.deliver(via, &message);
        let failed = !inbound.success;
        transactions.push(inbound);

        if failed && message.bounce {
            transactions.push(self.bounce(&message.to, via, message.value));
        }

        Ok(SendReceipt { transactions })
    }

    fn next_lt(&mut self) -> u64 {
        self.lt += 1;
        self.lt
    }

    fn wallet_transaction(&mut self, via: &Address, value: Coins) -> Transaction {
        self.next_lt();
        if let Some(wallet) = self.accounts.get_mut(via) {
            wallet.balance = Coins::from_nano(wallet.balance.as_nano() - value.as_nano());
        }
        Transaction {
            from: None,
            to: *via,
            op: None,
            value: Coins::ZERO,
            success: true,
            aborted: false,
            deploy: false,
            exit_code: Some(0),
        }
    }

    fn deliver(&mut self, via: &Address, message: &InternalMessage) -> Transaction {
        let lt = self.next_lt();
        let to = message.to;
        let op = Message::peek_opcode(&message.body);
        let mut tx = Transaction {
            from: Some(*via),
            to,
            op,
            value: message.value,
            success: false,
            aborted: true,
            deploy: false,
            exit_code: None,
        };

        let account = self.accounts.entry(to).or_insert_with(Account::empty);
        account.balance = account.balance.saturating_add(message.value);

        let (code, data, activating) = match (&account.state, &message.init) {
            (AccountState::Active { code, data }, _) => (code.clone(), data.clone(), false),
            (AccountState::Uninit, Some(init)) if init_matches(init, &to) => {
                (init.code.clone(), init.data.clone(), true)
            }
            (AccountState::Uninit, _) => {
                warn!(lt, %to, "message to an inactive account, compute phase skipped");
                return tx;
            }
        };

        let Some(behavior) = self.registry.lookup(&code) else {
            warn!(lt, %to, "installed code is unknown to the sandbox");
            tx.exit_code = Some(code::exit_codes::INVALID_OPCODE);
            return tx;
        };

        let outcome = behavior.receive(
            &data,
            &Inbound {
                sender: via,
                value: message.value,
                body: &message.body,
            },
        );

        match outcome {
            Ok(effects) => {
                let code = effects.code.unwrap_or(code);
                let data = effects.data.unwrap_or(data);
                account.state = AccountState::Active { code, data };
                tx.success = true;
                tx.aborted = false;
                tx.deploy = activating;
                tx.exit_code = Some(code::exit_codes::SUCCESS);
                info!(lt, from = %via, %to, op = ?op, deploy = activating, "transaction committed");
            }
            Err(exit_code) => {
                tx.exit_code = Some(exit_code);
                warn!(lt, from = %via, %to, op = ?op, exit_code, "transaction failed");
            }
        }
        tx
    }

    fn bounce(&mut self, from: &Address, to: &Address, value: Coins) -> Transaction {
        self.next_lt();
        if let Some(account) = self.accounts.get_mut(from) {
            let left = account.balance.as_nano().saturating_sub(value.as_nano());
            account.balance = Coins::from_nano(left);
        }
        if let Some(account) = self.accounts.get_mut(to) {
            account.balance = account.balance.saturating_add(value);
        }
        Transaction {
            from: Some(*from),
            to: *to,
            op: Some(BOUNCE_OPCODE),
            value,
            success: true,
            aborted: false,
            deploy: false,
            exit_code: Some(0),
        }
    }
}

fn init_matches(init: &StateInit, to: &Address) -> bool {
    init.address(to.workchain())
        .map_or(false, |derived| derived == *to)
}

/// Deterministic address of the treasury called `name`.
#[must_use]
pub fn treasury_address(name: &str) -> Address {
    let mut hasher = Sha256::new();
    hasher.update(b"treasury:");
    hasher.update(name.as_bytes());
    Address::new(BASECHAIN, hasher.finalize().into())
}

impl Provider for Blockchain {
    fn internal(
        &mut self,
        via: &Address,
        message: InternalMessage,
    ) -> simple_counter::Result<SendReceipt> {
        Ok(self.send(via, message)?)
    }

    fn get(
        &mut self,
        address: &Address,
        method: &str,
        _args: &[StackEntry],
    ) -> simple_counter::Result<GetMethodResult> {
        let Some(Account {
            state: AccountState::Active { code, data },
            ..
        }) = self.accounts.get(address)
        else {
            return Err(simple_counter::Error::NotDeployed(*address));
        };

        let Some(behavior) = self.registry.lookup(code) else {
            return Ok(GetMethodResult {
                exit_code: code::exit_codes::INVALID_OPCODE,
                stack: Vec::new(),
            });
        };

        Ok(match behavior.run_get_method(data, method) {
            Ok(stack) => GetMethodResult {
                exit_code: code::exit_codes::SUCCESS,
                stack,
            },
            Err(exit_code) => GetMethodResult {
                exit_code,
                stack: Vec::new(),
            },
        })
    }

    fn is_deployed(&mut self, address: &Address) -> simple_counter::Result<bool> {
        Ok(matches!(
            self.accounts.get(address),
            Some(Account {
                state: AccountState::Active { .. },
                ..
            })
        ))
    }
}
