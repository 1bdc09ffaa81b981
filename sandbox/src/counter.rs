// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
// Copyright (c) DUSK NETWORK. All rights reserved.

//! The three `SimpleContract` releases as sandbox behavior.
//!
//! Message handling order:
//! 1. an empty body is accepted and changes nothing
//! 2. `op:uint32 query_id:uint64` is read
//! 3. upgrade messages swap code (and data) without reading state
//! 4. state is read with the installed version's layout
//! 5. the version's rules decide, then the operation runs

use simple_counter::codec::OperationKind;
use simple_counter::upgrade::{self, exit_codes as contract_exit_codes};
use simple_counter::{Cell, CellSlice, ContractVersion, CounterState, DecodeError, StackEntry};
use tracing::{debug, trace};

use crate::code::{exit_codes, ContractCode, Effects, ExitCode, Inbound};

/// Cell overflow; raised if a state cell cannot be rebuilt.
const CELL_OVERFLOW: ExitCode = 8;

/// One `SimpleContract` release.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterCode {
    version: ContractVersion,
}

impl CounterCode {
    /// Behavior of `version`.
    #[must_use]
    pub const fn new(version: ContractVersion) -> Self {
        Self { version }
    }

    /// The release this behaves as.
    #[must_use]
    pub const fn version(&self) -> ContractVersion {
        self.version
    }

    fn load_state(&self, data: &Cell) -> Result<CounterState, ExitCode> {
        CounterState::parse(self.version.layout(), data).map_err(|err| {
            debug!(version = %self.version, %err, "state cell does not match layout");
            exit_codes::CELL_UNDERFLOW
        })
    }
}

fn underflow(_: DecodeError) -> ExitCode {
    exit_codes::CELL_UNDERFLOW
}

#[allow(clippy::cast_possible_truncation)]
fn load_u32(body: &mut CellSlice<'_>) -> Result<u32, ExitCode> {
    body.load_uint(32).map(|v| v as u32).map_err(underflow)
}

impl ContractCode for CounterCode {
    fn name(&self) -> &str {
        self.version.artifact()
    }

    fn receive(&self, data: &Cell, msg: &Inbound<'_>) -> Result<Effects, ExitCode> {
        let mut body = msg.body.parse();
        if body.is_empty() {
            return Ok(Effects::default());
        }

        let op = load_u32(&mut body)?;
        let query_id = body.load_uint(64).map_err(underflow)?;
        trace!(version = %self.version, op, query_id, "dispatch");

        let kind = OperationKind::from_opcode(op);
        match kind {
            Some(OperationKind::UpgradeCode) => {
                let code = body.load_ref().map_err(underflow)?.clone();
                return Ok(Effects {
                    code: Some(code),
                    data: None,
                });
            }
            Some(OperationKind::UpgradeCodeAndData) => {
                let code = body.load_ref().map_err(underflow)?.clone();
                let data = body.load_ref().map_err(underflow)?.clone();
                return Ok(Effects {
                    code: Some(code),
                    data: Some(data),
                });
            }
            _ => {}
        }

        let mut state = self.load_state(data)?;
        let kind = kind.ok_or(contract_exit_codes::UNKNOWN_OP)?;
        upgrade::authorize(self.version, &state, kind, msg.sender).map_err(|rejection| {
            debug!(%rejection, "message rejected");
            rejection.exit_code()
        })?;

        match kind {
            OperationKind::Increase => {
                let by = load_u32(&mut body)?;
                state.counter = state.counter.wrapping_add(by);
            }
            OperationKind::Decrease => {
                let by = load_u32(&mut body)?;
                state.counter = state
                    .counter
                    .checked_sub(by)
                    .ok_or(exit_codes::RANGE_CHECK)?;
            }
            _ => return Err(contract_exit_codes::UNKNOWN_OP),
        }

        let data = state
            .to_layout_cell(self.version.layout())
            .map_err(|_| CELL_OVERFLOW)?;
        Ok(Effects {
            code: None,
            data: Some(data),
        })
    }

    fn run_get_method(&self, data: &Cell, method: &str) -> Result<Vec<StackEntry>, ExitCode> {
        let read: fn(&CounterState) -> u32 = match method {
            "get_counter" => |state| state.counter,
            "get_id" => |state| state.id,
            _ => return Err(exit_codes::METHOD_NOT_FOUND),
        };
        let value = read(&self.load_state(data)?);
        Ok(vec![StackEntry::Int(i128::from(value))])
    }
}
