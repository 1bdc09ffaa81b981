// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
// Copyright (c) DUSK NETWORK. All rights reserved.

//! Versions of `SimpleContract` and the rules that separate them.
//!
//! - V1 accepts deploys, increases and both upgrade messages.
//! - V2 adds decreases, open to anyone.
//! - V3 keeps V2's operations but only the owner stored in its data may
//!   decrease.
//!
//! `UpgradeCode` swaps the code and leaves the data cell as it is. Whether
//! the new code can read that cell is the caller's problem; nothing here
//! migrates it. [`check_layout`] lets a caller find out beforehand.
//! `UpgradeCodeAndData` swaps both, which is the only way to introduce or
//! remove the owner field.

use std::fmt;

use thiserror::Error;

use crate::address::Address;
use crate::cell::{Cell, CellBuilder};
use crate::codec::OperationKind;
use crate::error::{DecodeError, EncodeError};

/// Contract-level exit codes.
pub mod exit_codes {
    /// The sender is not the owner recorded in the data cell.
    pub const NOT_OWNER: i32 = 73;
    /// The opcode is not handled by the installed code.
    pub const UNKNOWN_OP: i32 = 0xffff;
}

/// A released version of the contract code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ContractVersion {
    /// Increase only.
    V1,
    /// Increase and decrease.
    V2,
    /// Increase, and owner-only decrease.
    V3,
}

const V1_OPERATIONS: &[OperationKind] = &[
    OperationKind::Deploy,
    OperationKind::Increase,
    OperationKind::UpgradeCode,
    OperationKind::UpgradeCodeAndData,
];

const V2_OPERATIONS: &[OperationKind] = &[
    OperationKind::Deploy,
    OperationKind::Increase,
    OperationKind::Decrease,
    OperationKind::UpgradeCode,
    OperationKind::UpgradeCodeAndData,
];

impl ContractVersion {
    /// Every version, oldest first.
    pub const ALL: [Self; 3] = [Self::V1, Self::V2, Self::V3];

    /// Name of the compiled artifact for this version.
    #[must_use]
    pub const fn artifact(self) -> &'static str {
        match self {
            Self::V1 => "SimpleContract",
            Self::V2 => "SimpleContractV2",
            Self::V3 => "SimpleContractV3",
        }
    }

    /// Version for an artifact name.
    #[must_use]
    pub fn from_artifact(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|v| v.artifact() == name)
    }

    /// Operations the version's code dispatches.
    #[must_use]
    pub const fn operations(self) -> &'static [OperationKind] {
        match self {
            Self::V1 => V1_OPERATIONS,
            Self::V2 | Self::V3 => V2_OPERATIONS,
        }
    }

    /// Whether the version's code dispatches `kind`.
    #[must_use]
    pub fn supports(self, kind: OperationKind) -> bool {
        self.operations().contains(&kind)
    }

    /// Data layout the version's code reads and writes.
    #[must_use]
    pub const fn layout(self) -> StateLayout {
        match self {
            Self::V1 | Self::V2 => StateLayout::Counter,
            Self::V3 => StateLayout::OwnedCounter,
        }
    }

    /// Whether decreases are restricted to the owner.
    #[must_use]
    pub const fn is_owner_gated(self) -> bool {
        matches!(self, Self::V3)
    }
}

impl fmt::Display for ContractVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.artifact())
    }
}

/// Shape of the persistent data cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateLayout {
    /// `id:uint32 counter:uint32`
    Counter,
    /// `id:uint32 counter:uint32 owner:MsgAddressInt`
    OwnedCounter,
}

/// Decoded persistent data of the contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterState {
    /// Instance id, fixed at deploy time.
    pub id: u32,
    /// The counter.
    pub counter: u32,
    /// Owner allowed to decrease; only present in the V3 layout.
    pub owner: Option<Address>,
}

impl CounterState {
    /// State without an owner.
    #[must_use]
    pub const fn new(id: u32, counter: u32) -> Self {
        Self {
            id,
            counter,
            owner: None,
        }
    }

    /// State with an owner, for the V3 layout.
    #[must_use]
    pub const fn with_owner(id: u32, counter: u32, owner: Address) -> Self {
        Self {
            id,
            counter,
            owner: Some(owner),
        }
    }

    /// Layout this state serializes to.
    #[must_use]
    pub const fn layout(&self) -> StateLayout {
        match self.owner {
            None => StateLayout::Counter,
            Some(_) => StateLayout::OwnedCounter,
        }
    }

    /// Serializes the state in its own [`layout`](Self::layout); the owner
    /// field is written only when set.
    ///
    /// # Errors
    /// Never fails in practice; the result is at most 331 bits.
    pub fn to_cell(&self) -> Result<Cell, EncodeError> {
        self.to_layout_cell(self.layout())
    }

    /// Serializes the state for code expecting `layout`.
    ///
    /// The owned layout always carries an address field, `addr_none` when
    /// there is no owner. The plain layout drops the owner.
    ///
    /// # Errors
    /// Never fails in practice; the result is at most 331 bits.
    pub fn to_layout_cell(&self, layout: StateLayout) -> Result<Cell, EncodeError> {
        let mut b = CellBuilder::new();
        b.store_uint(u64::from(self.id), 32)?
            .store_uint(u64::from(self.counter), 32)?;
        if layout == StateLayout::OwnedCounter {
            b.store_address(self.owner.as_ref())?;
        }
        Ok(b.build())
    }

    /// Reads the state the way code expecting `layout` does: fields are
    /// read from the front and anything after them is ignored.
    ///
    /// # Errors
    /// Fails when the cell is too short for the layout.
    pub fn parse(layout: StateLayout, data: &Cell) -> Result<Self, DecodeError> {
        Ok(Self::read(layout, data)?.0)
    }

    #[allow(clippy::cast_possible_truncation)]
    fn read(layout: StateLayout, data: &Cell) -> Result<(Self, usize, usize), DecodeError> {
        let mut s = data.parse();
        let id = s.load_uint(32)? as u32;
        let counter = s.load_uint(32)? as u32;
        let owner = match layout {
            StateLayout::Counter => None,
            StateLayout::OwnedCounter => s.load_address()?,
        };
        Ok((
            Self { id, counter, owner },
            s.remaining_bits(),
            s.remaining_refs(),
        ))
    }
}

/// Checks that `data` has exactly the layout `target` expects.
///
/// Useful before a code-only upgrade: a cell that is too short makes the new
/// code fail on every message that reads state, and a cell that is too long
/// loses its extra fields on the next write.
///
/// # Errors
/// [`DecodeError::CellUnderflow`] or friends when the cell is too short,
/// [`DecodeError::TrailingData`] when fields would be dropped.
pub fn check_layout(target: ContractVersion, data: &Cell) -> Result<CounterState, DecodeError> {
    let (state, bits, refs) = CounterState::read(target.layout(), data)?;
    if bits > 0 || refs > 0 {
        return Err(DecodeError::TrailingData { bits, refs });
    }
    Ok(state)
}

/// Why the installed code refused a message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    /// The version does not dispatch this operation.
    #[error("{kind} is not supported by {version}")]
    Unsupported {
        /// Installed version.
        version: ContractVersion,
        /// Requested operation.
        kind: OperationKind,
    },

    /// The ownership gate refused the sender.
    #[error("{sender} is not the owner and may not {kind}")]
    NotOwner {
        /// Sender of the message.
        sender: Address,
        /// Gated operation.
        kind: OperationKind,
    },
}

impl Rejection {
    /// Exit code the contract terminates with.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Unsupported { .. } => exit_codes::UNKNOWN_OP,
            Self::NotOwner { .. } => exit_codes::NOT_OWNER,
        }
    }
}

/// Decides whether `sender` may perform `kind` on a contract running
/// `version` with `state`.
///
/// # Errors
/// [`Rejection::Unsupported`] for operations the version lacks,
/// [`Rejection::NotOwner`] when the V3 gate refuses a decrease.
pub fn authorize(
    version: ContractVersion,
    state: &CounterState,
    kind: OperationKind,
    sender: &Address,
) -> Result<(), Rejection> {
    if !version.supports(kind) {
        return Err(Rejection::Unsupported { version, kind });
    }
    if version.is_owner_gated() && kind == OperationKind::Decrease && state.owner != Some(*sender) {
        return Err(Rejection::NotOwner {
            sender: *sender,
            kind,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(byte: u8) -> Address {
        Address::new(0, [byte; 32])
    }

    #[test]
    fn versions_dispatch_expected_operations() {
        assert!(!ContractVersion::V1.supports(OperationKind::Decrease));
        assert!(ContractVersion::V1.supports(OperationKind::UpgradeCode));
        assert!(ContractVersion::V2.supports(OperationKind::Decrease));
        assert_eq!(
            ContractVersion::V2.operations(),
            ContractVersion::V3.operations()
        );
        assert!(ContractVersion::V3.is_owner_gated());
        assert!(!ContractVersion::V2.is_owner_gated());
    }

    #[test]
    fn artifact_names_round_trip() {
        for v in ContractVersion::ALL {
            assert_eq!(ContractVersion::from_artifact(v.artifact()), Some(v));
        }
        assert_eq!(ContractVersion::from_artifact("SimpleContractV4"), None);
    }

    #[test]
    fn state_layouts_serialize_to_expected_widths() {
        let basic = CounterState::new(0, 10_000).to_cell().unwrap();
        assert_eq!(basic.bit_len(), 64);
        assert_eq!(hex::encode(basic.data()), "0000000000002710");

        let owned = CounterState::with_owner(0, 10_000, addr(9)).to_cell().unwrap();
        assert_eq!(owned.bit_len(), 64 + 267);
        assert_eq!(
            CounterState::parse(StateLayout::OwnedCounter, &owned).unwrap(),
            CounterState::with_owner(0, 10_000, addr(9))
        );
    }

    #[test]
    fn owned_layout_keeps_an_empty_owner_field() {
        let unowned = CounterState::new(0, 10_000)
            .to_layout_cell(StateLayout::OwnedCounter)
            .unwrap();
        assert_eq!(unowned.bit_len(), 64 + 2);
        assert_eq!(
            check_layout(ContractVersion::V3, &unowned).unwrap(),
            CounterState::new(0, 10_000)
        );

        let dropped = CounterState::with_owner(0, 1, addr(3))
            .to_layout_cell(StateLayout::Counter)
            .unwrap();
        assert_eq!(dropped.bit_len(), 64);
    }

    #[test]
    fn lenient_parse_ignores_extra_fields() {
        let owned = CounterState::with_owner(1, 2, addr(9)).to_cell().unwrap();
        assert_eq!(
            CounterState::parse(StateLayout::Counter, &owned).unwrap(),
            CounterState::new(1, 2)
        );
    }

    #[test]
    fn check_layout_flags_both_directions() {
        let basic = CounterState::new(0, 100).to_cell().unwrap();
        let owned = CounterState::with_owner(0, 100, addr(1)).to_cell().unwrap();

        assert!(check_layout(ContractVersion::V2, &basic).is_ok());
        assert!(check_layout(ContractVersion::V3, &owned).is_ok());
        assert!(matches!(
            check_layout(ContractVersion::V3, &basic),
            Err(DecodeError::CellUnderflow { .. })
        ));
        assert_eq!(
            check_layout(ContractVersion::V2, &owned).unwrap_err(),
            DecodeError::TrailingData { bits: 267, refs: 0 }
        );
    }

    #[test]
    fn gate_only_restricts_decrease_on_v3() {
        let owner = addr(1);
        let stranger = addr(2);
        let state = CounterState::with_owner(0, 10_000, owner);

        assert!(authorize(ContractVersion::V3, &state, OperationKind::Decrease, &owner).is_ok());
        assert!(authorize(ContractVersion::V3, &state, OperationKind::Increase, &stranger).is_ok());
        assert!(
            authorize(ContractVersion::V3, &state, OperationKind::UpgradeCode, &stranger).is_ok()
        );

        let err = authorize(ContractVersion::V3, &state, OperationKind::Decrease, &stranger)
            .unwrap_err();
        assert_eq!(err.exit_code(), exit_codes::NOT_OWNER);
        assert_eq!(
            err,
            Rejection::NotOwner {
                sender: stranger,
                kind: OperationKind::Decrease
            }
        );

        let open = CounterState::new(0, 10_000);
        assert!(authorize(ContractVersion::V2, &open, OperationKind::Decrease, &stranger).is_ok());
    }

    #[test]
    fn gate_refuses_everyone_without_owner() {
        let state = CounterState::new(0, 1);
        assert!(authorize(ContractVersion::V3, &state, OperationKind::Decrease, &addr(1)).is_err());
    }

    #[test]
    fn v1_rejects_decrease_as_unknown_op() {
        let err = authorize(
            ContractVersion::V1,
            &CounterState::new(0, 1),
            OperationKind::Decrease,
            &addr(1),
        )
        .unwrap_err();
        assert_eq!(err.exit_code(), exit_codes::UNKNOWN_OP);
    }
}
