// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
// Copyright (c) DUSK NETWORK. All rights reserved.

use std::path::PathBuf;

use simple_counter::{Address, Coins};
use thiserror::Error;

/// Result type for sandbox operations.
pub type Result<T> = std::result::Result<T, SandboxError>;

/// Failures of the sandbox itself, as opposed to failed transactions.
#[derive(Debug, Error)]
pub enum SandboxError {
    /// The sending account does not exist.
    #[error("unknown sender {0}")]
    UnknownSender(Address),

    /// The sender cannot cover the attached value.
    #[error("{sender} holds {balance} but tried to send {value}")]
    InsufficientFunds {
        /// Sending account.
        sender: Address,
        /// Its balance.
        balance: Coins,
        /// Attached value.
        value: Coins,
    },

    /// No artifact with this name exists.
    #[error("unknown artifact '{0}' (expected SimpleContract, SimpleContractV2 or SimpleContractV3)")]
    UnknownArtifact(String),

    /// Reading or writing a snapshot file failed.
    #[error("failed to access ledger file {path}: {source}")]
    Io {
        /// The snapshot path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// A snapshot could not be encoded or decoded.
    #[error("invalid ledger snapshot: {0}")]
    Snapshot(#[from] serde_json::Error),

    /// A cell could not be built.
    #[error(transparent)]
    Encode(#[from] simple_counter::EncodeError),
}

impl From<SandboxError> for simple_counter::Error {
    fn from(err: SandboxError) -> Self {
        simple_counter::Error::transport(err)
    }
}
