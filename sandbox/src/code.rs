// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
// Copyright (c) DUSK NETWORK. All rights reserved.

//! Contract code as the sandbox sees it.
//!
//! The ledger never interprets a code cell. It looks the cell's hash up in a
//! [`CodeRegistry`] and hands the message to whatever [`ContractCode`] was
//! registered for it. Installing a different code cell therefore swaps the
//! behavior of an account on its next message.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use simple_counter::{Address, Cell, CellBuilder, Coins, ContractVersion, StackEntry};

use crate::counter::CounterCode;
use crate::error::{Result, SandboxError};

/// Compute-phase exit code.
pub type ExitCode = i32;

/// TVM exit codes produced by the sandbox.
pub mod exit_codes {
    use super::ExitCode;

    /// Normal termination.
    pub const SUCCESS: ExitCode = 0;
    /// Integer out of the expected range.
    pub const RANGE_CHECK: ExitCode = 5;
    /// The installed code is not something the sandbox can run.
    pub const INVALID_OPCODE: ExitCode = 6;
    /// Read past the end of a slice.
    pub const CELL_UNDERFLOW: ExitCode = 9;
    /// No get-method with this name.
    pub const METHOD_NOT_FOUND: ExitCode = 11;
}

/// First 32 bits of every compiled artifact.
const ARTIFACT_TAG: u64 = 0x5343_0000;

/// An inbound internal message.
#[derive(Debug, Clone, Copy)]
pub struct Inbound<'a> {
    /// Sender of the message.
    pub sender: &'a Address,
    /// Attached value.
    pub value: Coins,
    /// Message body.
    pub body: &'a Cell,
}

/// State changes requested by a successful compute phase.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Effects {
    /// Code to install.
    pub code: Option<Cell>,
    /// Data to store.
    pub data: Option<Cell>,
}

/// Behavior bound to a code cell.
pub trait ContractCode: fmt::Debug + Send + Sync {
    /// Artifact name.
    fn name(&self) -> &str;

    /// Handles an inbound internal message against `data`.
    ///
    /// # Errors
    /// The exit code the compute phase terminates with. Nothing is committed.
    fn receive(&self, data: &Cell, msg: &Inbound<'_>) -> std::result::Result<Effects, ExitCode>;

    /// Runs a get-method against `data`.
    ///
    /// # Errors
    /// The exit code the method terminates with.
    fn run_get_method(
        &self,
        data: &Cell,
        method: &str,
    ) -> std::result::Result<Vec<StackEntry>, ExitCode>;
}

/// Builds the code cell of a released contract version.
///
/// # Errors
/// Fails only if the artifact name does not fit a cell.
pub fn artifact(version: ContractVersion) -> Result<Cell> {
    let index = match version {
        ContractVersion::V1 => 1,
        ContractVersion::V2 => 2,
        ContractVersion::V3 => 3,
    };
    let mut b = CellBuilder::new();
    b.store_uint(ARTIFACT_TAG | index, 32)?
        .store_bytes(version.artifact().as_bytes())?;
    Ok(b.build())
}

/// Looks an artifact up by name, like a build step would.
///
/// # Errors
/// [`SandboxError::UnknownArtifact`] for names other than the three releases.
pub fn compile(name: &str) -> Result<Cell> {
    let version = ContractVersion::from_artifact(name)
        .ok_or_else(|| SandboxError::UnknownArtifact(name.to_string()))?;
    artifact(version)
}

/// Maps code hashes to behavior.
#[derive(Debug, Clone, Default)]
pub struct CodeRegistry {
    entries: HashMap<[u8; 32], Arc<dyn ContractCode>>,
}

impl CodeRegistry {
    /// An empty registry; every account fails with
    /// [`exit_codes::INVALID_OPCODE`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry knowing every `SimpleContract` release.
    ///
    /// # Errors
    /// See [`artifact`].
    pub fn with_counter_versions() -> Result<Self> {
        let mut registry = Self::new();
        for version in ContractVersion::ALL {
            registry.register(&artifact(version)?, Arc::new(CounterCode::new(version)));
        }
        Ok(registry)
    }

    /// Binds `behavior` to `code`, replacing any earlier binding.
    pub fn register(&mut self, code: &Cell, behavior: Arc<dyn ContractCode>) {
        self.entries.insert(code.hash(), behavior);
    }

    /// Behavior bound to `code`.
    #[must_use]
    pub fn lookup(&self, code: &Cell) -> Option<&Arc<dyn ContractCode>> {
        self.entries.get(&code.hash())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn artifacts_are_distinct_and_registered() {
        let registry = CodeRegistry::with_counter_versions().unwrap();
        let mut hashes: Vec<_> = ContractVersion::ALL
            .iter()
            .map(|v| artifact(*v).unwrap().hash())
            .collect();
        hashes.dedup();
        assert_eq!(hashes.len(), 3);

        for version in ContractVersion::ALL {
            let code = compile(version.artifact()).unwrap();
            assert_eq!(registry.lookup(&code).unwrap().name(), version.artifact());
        }
    }

    #[test]
    fn unknown_artifacts_are_rejected() {
        assert!(matches!(
            compile("Wallet"),
            Err(SandboxError::UnknownArtifact(name)) if name == "Wallet"
        ));
        assert!(CodeRegistry::new().lookup(&Cell::empty()).is_none());
    }
}
