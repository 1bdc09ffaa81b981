// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
// Copyright (c) DUSK NETWORK. All rights reserved.

//! Client handle for a single `SimpleContract` account.
//!
//! The handle owns no connection. Every call borrows a [`Provider`], encodes
//! one body with [`Operation::encode`] and submits exactly one internal
//! message. Receipts and provider errors are handed back untouched.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::address::{Address, StateInit, BASECHAIN};
use crate::cell::{Cell, CellBuilder};
use crate::codec::{Operation, DEFAULT_QUERY_ID};
use crate::coins::Coins;
use crate::error::{EncodeError, Error, Result};
use crate::provider::{InternalMessage, Provider, SendMode, SendReceipt};

/// Initial data of a freshly deployed contract.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SimpleContractConfig {
    /// Instance id; distinguishes otherwise identical deployments.
    pub id: u32,
    /// Starting counter value.
    pub counter: u32,
}

/// Serializes a config as `id:uint32 counter:uint32`.
///
/// # Errors
/// Never fails in practice; two 32-bit fields always fit.
pub fn config_to_cell(config: &SimpleContractConfig) -> std::result::Result<Cell, EncodeError> {
    let mut b = CellBuilder::new();
    b.store_uint(u64::from(config.id), 32)?
        .store_uint(u64::from(config.counter), 32)?;
    Ok(b.build())
}

/// Parameters of [`SimpleContract::send_increase`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IncreaseOptions {
    /// Value attached to the message.
    pub value: Coins,
    /// Amount to add.
    pub increase_by: u32,
    /// Correlation id; `0` when unset.
    pub query_id: Option<u64>,
}

/// Parameters of [`SimpleContract::send_decrease`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecreaseOptions {
    /// Value attached to the message.
    pub value: Coins,
    /// Amount to subtract.
    pub decrease_by: u32,
    /// Correlation id; `0` when unset.
    pub query_id: Option<u64>,
}

/// Parameters of [`SimpleContract::send_upgrade`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpgradeOptions {
    /// Value attached to the message.
    pub value: Coins,
    /// Correlation id; `0` when unset.
    pub query_id: Option<u64>,
    /// Replacement code.
    pub code: Cell,
}

/// Parameters of [`SimpleContract::send_upgrade_all`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpgradeAllOptions {
    /// Value attached to the message.
    pub value: Coins,
    /// Correlation id; `0` when unset.
    pub query_id: Option<u64>,
    /// Replacement code.
    pub code: Cell,
    /// Replacement data cell, stored as given.
    pub data: Cell,
}

/// A `SimpleContract` account, deployed or about to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimpleContract {
    address: Address,
    init: Option<StateInit>,
}

impl SimpleContract {
    /// Binds to an existing account. The handle cannot deploy.
    #[must_use]
    pub const fn create_from_address(address: Address) -> Self {
        Self {
            address,
            init: None,
        }
    }

    /// Derives the account that `code` with `config` deploys to.
    ///
    /// The same inputs always give the same address.
    ///
    /// # Errors
    /// Only if the init bundle cannot be serialized.
    pub fn create_from_config(
        config: &SimpleContractConfig,
        code: Cell,
        workchain: i8,
    ) -> Result<Self> {
        let init = StateInit {
            code,
            data: config_to_cell(config)?,
        };
        let address = init.address(workchain)?;
        Ok(Self {
            address,
            init: Some(init),
        })
    }

    /// [`SimpleContract::create_from_config`] on the base workchain.
    ///
    /// # Errors
    /// See [`SimpleContract::create_from_config`].
    pub fn create_on_basechain(config: &SimpleContractConfig, code: Cell) -> Result<Self> {
        Self::create_from_config(config, code, BASECHAIN)
    }

    /// The bound account.
    #[must_use]
    pub const fn address(&self) -> &Address {
        &self.address
    }

    /// The init bundle, when the handle was derived from a config.
    #[must_use]
    pub const fn init(&self) -> Option<&StateInit> {
        self.init.as_ref()
    }

    /// Sends an empty body with the init bundle attached.
    ///
    /// # Errors
    /// [`Error::MissingStateInit`] for handles built from an address, before
    /// anything is submitted. Provider errors otherwise.
    pub fn send_deploy<P: Provider>(
        &self,
        provider: &mut P,
        via: &Address,
        value: Coins,
    ) -> Result<SendReceipt> {
        if self.init.is_none() {
            return Err(Error::MissingStateInit(self.address));
        }
        self.send(provider, via, value, &Operation::Deploy)
    }

    /// Sends `increase`.
    ///
    /// # Errors
    /// Provider errors.
    pub fn send_increase<P: Provider>(
        &self,
        provider: &mut P,
        via: &Address,
        opts: IncreaseOptions,
    ) -> Result<SendReceipt> {
        let op = Operation::Increase {
            query_id: opts.query_id.unwrap_or(DEFAULT_QUERY_ID),
            increase_by: opts.increase_by,
        };
        self.send(provider, via, opts.value, &op)
    }

    /// Sends `decrease`.
    ///
    /// # Errors
    /// Provider errors.
    pub fn send_decrease<P: Provider>(
        &self,
        provider: &mut P,
        via: &Address,
        opts: DecreaseOptions,
    ) -> Result<SendReceipt> {
        let op = Operation::Decrease {
            query_id: opts.query_id.unwrap_or(DEFAULT_QUERY_ID),
            decrease_by: opts.decrease_by,
        };
        self.send(provider, via, opts.value, &op)
    }

    /// Sends a code-only upgrade. The data cell stays as it is.
    ///
    /// # Errors
    /// Provider errors.
    pub fn send_upgrade<P: Provider>(
        &self,
        provider: &mut P,
        via: &Address,
        opts: UpgradeOptions,
    ) -> Result<SendReceipt> {
        let op = Operation::UpgradeCode {
            query_id: opts.query_id.unwrap_or(DEFAULT_QUERY_ID),
            code: opts.code,
        };
        self.send(provider, via, opts.value, &op)
    }

    /// Sends a code and data upgrade.
    ///
    /// # Errors
    /// Provider errors.
    pub fn send_upgrade_all<P: Provider>(
        &self,
        provider: &mut P,
        via: &Address,
        opts: UpgradeAllOptions,
    ) -> Result<SendReceipt> {
        let op = Operation::UpgradeCodeAndData {
            query_id: opts.query_id.unwrap_or(DEFAULT_QUERY_ID),
            code: opts.code,
            data: opts.data,
        };
        self.send(provider, via, opts.value, &op)
    }

    /// Reads the counter through `get_counter`.
    ///
    /// # Errors
    /// [`Error::GetMethodFailed`] on a non-zero exit, decode errors on an
    /// unexpected stack, provider errors otherwise.
    pub fn get_counter<P: Provider>(&self, provider: &mut P) -> Result<u32> {
        self.get_u32(provider, "get_counter")
    }

    /// Reads the instance id through `get_id`.
    ///
    /// # Errors
    /// See [`SimpleContract::get_counter`].
    pub fn get_id<P: Provider>(&self, provider: &mut P) -> Result<u32> {
        self.get_u32(provider, "get_id")
    }

    fn send<P: Provider>(
        &self,
        provider: &mut P,
        via: &Address,
        value: Coins,
        op: &Operation,
    ) -> Result<SendReceipt> {
        let body = op.encode()?;
        debug!(
            to = %self.address,
            from = %via,
            op = %op.kind(),
            %value,
            "submitting internal message"
        );
        provider.internal(
            via,
            InternalMessage {
                to: self.address,
                value,
                bounce: true,
                send_mode: SendMode::PAY_GAS_SEPARATELY,
                init: self.init.clone(),
                body,
            },
        )
    }

    fn get_u32<P: Provider>(&self, provider: &mut P, method: &str) -> Result<u32> {
        let result = provider.get(&self.address, method, &[])?;
        if !result.is_success() {
            return Err(Error::GetMethodFailed {
                method: method.to_string(),
                exit_code: result.exit_code,
            });
        }
        Ok(result.reader().read_u32()?)
    }
}
