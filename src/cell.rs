// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
// Copyright (c) DUSK NETWORK. All rights reserved.

//! Ordinary (level 0) cells.
//!
//! A cell holds up to [`MAX_BITS`] data bits and up to [`MAX_REFS`]
//! references to other cells. Cells are immutable once built; their
//! representation hash is computed eagerly so that equality, addresses and
//! serialization never have to walk the tree twice.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use sha2::{Digest, Sha256};

use crate::error::{DecodeError, EncodeError};

/// Maximum number of data bits in a cell.
pub const MAX_BITS: usize = 1023;
/// Maximum number of references in a cell.
pub const MAX_REFS: usize = 4;

/// An immutable, cheaply clonable cell.
#[derive(Clone)]
pub struct Cell(Arc<CellInner>);

struct CellInner {
    data: Vec<u8>,
    bit_len: usize,
    refs: Vec<Cell>,
    hash: [u8; 32],
    depth: u16,
}

impl Cell {
    /// Returns the cell with no bits and no references.
    #[must_use]
    pub fn empty() -> Self {
        Self::from_parts(Vec::new(), 0, Vec::new())
    }

    /// Builds a cell from raw parts.
    ///
    /// Callers guarantee `bit_len <= MAX_BITS`, `refs.len() <= MAX_REFS` and
    /// `data.len() == bit_len.div_ceil(8)`. Bits past `bit_len` are cleared.
    pub(crate) fn from_parts(mut data: Vec<u8>, bit_len: usize, refs: Vec<Cell>) -> Self {
        debug_assert!(bit_len <= MAX_BITS && refs.len() <= MAX_REFS);
        debug_assert_eq!(data.len(), bit_len.div_ceil(8));

        let rem = bit_len % 8;
        if rem != 0 {
            if let Some(last) = data.last_mut() {
                *last &= 0xff << (8 - rem);
            }
        }

        let depth = refs
            .iter()
            .map(Cell::depth)
            .max()
            .map_or(0, |max| max.saturating_add(1));

        let mut hasher = Sha256::new();
        hasher.update(descriptors(bit_len, refs.len()));
        hasher.update(augment(&data, bit_len));
        for r in &refs {
            hasher.update(r.depth().to_be_bytes());
        }
        for r in &refs {
            hasher.update(r.hash());
        }

        Self(Arc::new(CellInner {
            data,
            bit_len,
            refs,
            hash: hasher.finalize().into(),
            depth,
        }))
    }

    /// Number of data bits.
    #[must_use]
    pub fn bit_len(&self) -> usize {
        self.0.bit_len
    }

    /// Data bits packed MSB first; trailing bits of the last byte are zero.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.0.data
    }

    /// Referenced child cells, in order.
    #[must_use]
    pub fn references(&self) -> &[Cell] {
        &self.0.refs
    }

    /// Standard representation hash (SHA-256).
    #[must_use]
    pub fn hash(&self) -> [u8; 32] {
        self.0.hash
    }

    /// Depth of the reference tree below this cell.
    #[must_use]
    pub fn depth(&self) -> u16 {
        self.0.depth
    }

    /// Whether the cell has neither bits nor references.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.bit_len == 0 && self.0.refs.is_empty()
    }

    /// Starts reading the cell from its first bit and first reference.
    #[must_use]
    pub fn parse(&self) -> CellSlice<'_> {
        CellSlice {
            cell: self,
            bit_pos: 0,
            ref_pos: 0,
        }
    }

    pub(crate) fn bit(&self, index: usize) -> bool {
        (self.0.data[index / 8] >> (7 - index % 8)) & 1 == 1
    }

    /// The two descriptor bytes of the standard representation.
    pub(crate) fn descriptors(&self) -> [u8; 2] {
        descriptors(self.0.bit_len, self.0.refs.len())
    }

    /// Data bytes with the completion tag applied.
    pub(crate) fn augmented_data(&self) -> Vec<u8> {
        augment(&self.0.data, self.0.bit_len)
    }
}

fn descriptors(bit_len: usize, refs: usize) -> [u8; 2] {
    // Both values are bounded by MAX_REFS and MAX_BITS.
    #[allow(clippy::cast_possible_truncation)]
    let d1 = refs as u8;
    #[allow(clippy::cast_possible_truncation)]
    let d2 = (bit_len / 8 + bit_len.div_ceil(8)) as u8;
    [d1, d2]
}

fn augment(data: &[u8], bit_len: usize) -> Vec<u8> {
    let mut out = data.to_vec();
    let rem = bit_len % 8;
    if rem != 0 {
        if let Some(last) = out.last_mut() {
            *last |= 0x80 >> rem;
        }
    }
    out
}

impl PartialEq for Cell {
    fn eq(&self, other: &Self) -> bool {
        self.0.hash == other.0.hash
    }
}

impl Eq for Cell {}

impl Hash for Cell {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash.hash(state);
    }
}

impl Default for Cell {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cell")
            .field("bits", &self.0.bit_len)
            .field("data", &format_args!("{}", self.bits_hex()))
            .field("refs", &self.0.refs)
            .finish()
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_tree(f, 0)
    }
}

impl Cell {
    /// Fift-style hex dump: nibbles, with a `_` suffix when the last nibble
    /// carries a completion tag.
    fn bits_hex(&self) -> String {
        let bit_len = self.0.bit_len;
        let nibbles = bit_len.div_ceil(4);
        let augmented = augment(&self.0.data, bit_len);
        let mut out = hex::encode_upper(&augmented);
        out.truncate(nibbles);
        if bit_len % 4 != 0 {
            out.push('_');
        }
        out
    }

    fn write_tree(&self, f: &mut fmt::Formatter<'_>, indent: usize) -> fmt::Result {
        writeln!(f, "{:indent$}x{{{}}}", "", self.bits_hex(), indent = indent)?;
        for r in &self.0.refs {
            r.write_tree(f, indent + 1)?;
        }
        Ok(())
    }
}

/// Accumulates bits and references for a new cell.
#[derive(Debug, Clone, Default)]
pub struct CellBuilder {
    data: Vec<u8>,
    bit_len: usize,
    refs: Vec<Cell>,
}

impl CellBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bits written so far.
    #[must_use]
    pub fn bit_len(&self) -> usize {
        self.bit_len
    }

    /// Bits that can still be written.
    #[must_use]
    pub fn available_bits(&self) -> usize {
        MAX_BITS - self.bit_len
    }

    /// Stores a single bit.
    ///
    /// # Errors
    /// Fails when the cell is full.
    pub fn store_bit(&mut self, bit: bool) -> Result<&mut Self, EncodeError> {
        self.reserve(1)?;
        self.push_bit(bit);
        Ok(self)
    }

    /// Stores `value` as a big-endian unsigned integer of `bits` width.
    ///
    /// # Errors
    /// Fails when `bits > 64`, when `value` needs more than `bits` bits, or
    /// when the cell has no room left.
    pub fn store_uint(&mut self, value: u64, bits: usize) -> Result<&mut Self, EncodeError> {
        if bits > 64 {
            return Err(EncodeError::InvalidBitWidth(bits));
        }
        if bits < 64 && value >> bits != 0 {
            return Err(EncodeError::ValueOutOfRange {
                value: i128::from(value),
                bits,
            });
        }
        self.reserve(bits)?;
        for i in (0..bits).rev() {
            self.push_bit((value >> i) & 1 == 1);
        }
        Ok(self)
    }

    /// Stores `value` as a two's complement integer of `bits` width.
    ///
    /// # Errors
    /// Fails when `bits` is 0 or above 64, when `value` is out of range for
    /// the width, or when the cell has no room left.
    pub fn store_int(&mut self, value: i64, bits: usize) -> Result<&mut Self, EncodeError> {
        if bits == 0 || bits > 64 {
            return Err(EncodeError::InvalidBitWidth(bits));
        }
        let bound = 1i128 << (bits - 1);
        let wide = i128::from(value);
        if wide < -bound || wide >= bound {
            return Err(EncodeError::ValueOutOfRange { value: wide, bits });
        }
        self.reserve(bits)?;
        #[allow(clippy::cast_sign_loss)]
        let raw = value as u64;
        for i in (0..bits).rev() {
            self.push_bit((raw >> i) & 1 == 1);
        }
        Ok(self)
    }

    /// Stores whole bytes.
    ///
    /// # Errors
    /// Fails when the cell has no room left.
    pub fn store_bytes(&mut self, bytes: &[u8]) -> Result<&mut Self, EncodeError> {
        self.reserve(bytes.len() * 8)?;
        for byte in bytes {
            for i in (0..8).rev() {
                self.push_bit((byte >> i) & 1 == 1);
            }
        }
        Ok(self)
    }

    /// Appends a reference to `cell`.
    ///
    /// # Errors
    /// Fails when the builder already holds four references.
    pub fn store_ref(&mut self, cell: Cell) -> Result<&mut Self, EncodeError> {
        if self.refs.len() == MAX_REFS {
            return Err(EncodeError::RefOverflow);
        }
        self.refs.push(cell);
        Ok(self)
    }

    /// Finishes the cell.
    #[must_use]
    pub fn build(self) -> Cell {
        Cell::from_parts(self.data, self.bit_len, self.refs)
    }

    fn reserve(&self, bits: usize) -> Result<(), EncodeError> {
        let available = self.available_bits();
        if bits > available {
            return Err(EncodeError::BitOverflow {
                requested: bits,
                available,
            });
        }
        Ok(())
    }

    fn push_bit(&mut self, bit: bool) {
        if self.bit_len % 8 == 0 {
            self.data.push(0);
        }
        if bit {
            let idx = self.bit_len / 8;
            self.data[idx] |= 0x80 >> (self.bit_len % 8);
        }
        self.bit_len += 1;
    }
}

/// Cursor over the bits and references of a [`Cell`].
#[derive(Debug, Clone)]
pub struct CellSlice<'a> {
    cell: &'a Cell,
    bit_pos: usize,
    ref_pos: usize,
}

impl<'a> CellSlice<'a> {
    /// Unread data bits.
    #[must_use]
    pub fn remaining_bits(&self) -> usize {
        self.cell.bit_len() - self.bit_pos
    }

    /// Unread references.
    #[must_use]
    pub fn remaining_refs(&self) -> usize {
        self.cell.references().len() - self.ref_pos
    }

    /// Whether both bits and references are exhausted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.remaining_bits() == 0 && self.remaining_refs() == 0
    }

    /// Reads one bit.
    ///
    /// # Errors
    /// Fails when no bits are left.
    pub fn load_bit(&mut self) -> Result<bool, DecodeError> {
        self.require(1)?;
        let bit = self.cell.bit(self.bit_pos);
        self.bit_pos += 1;
        Ok(bit)
    }

    /// Reads an unsigned big-endian integer without advancing.
    ///
    /// # Errors
    /// Fails when `bits > 64` or fewer bits are left.
    pub fn preload_uint(&self, bits: usize) -> Result<u64, DecodeError> {
        if bits > 64 {
            return Err(DecodeError::InvalidBitWidth(bits));
        }
        self.require(bits)?;
        let mut value = 0u64;
        for i in 0..bits {
            value = (value << 1) | u64::from(self.cell.bit(self.bit_pos + i));
        }
        Ok(value)
    }

    /// Reads an unsigned big-endian integer.
    ///
    /// # Errors
    /// Fails when `bits > 64` or fewer bits are left.
    pub fn load_uint(&mut self, bits: usize) -> Result<u64, DecodeError> {
        let value = self.preload_uint(bits)?;
        self.bit_pos += bits;
        Ok(value)
    }

    /// Reads a two's complement integer.
    ///
    /// # Errors
    /// Fails when `bits` is 0 or above 64, or fewer bits are left.
    pub fn load_int(&mut self, bits: usize) -> Result<i64, DecodeError> {
        if bits == 0 {
            return Err(DecodeError::InvalidBitWidth(bits));
        }
        let raw = self.load_uint(bits)?;
        let shift = 64 - bits;
        #[allow(clippy::cast_possible_wrap)]
        let value = ((raw << shift) as i64) >> shift;
        Ok(value)
    }

    /// Reads `len` whole bytes.
    ///
    /// # Errors
    /// Fails when fewer than `len * 8` bits are left.
    pub fn load_bytes(&mut self, len: usize) -> Result<Vec<u8>, DecodeError> {
        self.require(len * 8)?;
        let mut out = Vec::with_capacity(len);
        for _ in 0..len {
            // Eight bits always fit in a byte.
            #[allow(clippy::cast_possible_truncation)]
            out.push(self.load_uint(8)? as u8);
        }
        Ok(out)
    }

    /// Reads the next reference.
    ///
    /// # Errors
    /// Fails when all references were consumed.
    pub fn load_ref(&mut self) -> Result<&'a Cell, DecodeError> {
        let cell = self
            .cell
            .references()
            .get(self.ref_pos)
            .ok_or(DecodeError::RefUnderflow)?;
        self.ref_pos += 1;
        Ok(cell)
    }

    /// Checks that nothing is left unread.
    ///
    /// # Errors
    /// Fails with [`DecodeError::TrailingData`] otherwise.
    pub fn end_parse(&self) -> Result<(), DecodeError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(DecodeError::TrailingData {
                bits: self.remaining_bits(),
                refs: self.remaining_refs(),
            })
        }
    }

    fn require(&self, bits: usize) -> Result<(), DecodeError> {
        let remaining = self.remaining_bits();
        if bits > remaining {
            return Err(DecodeError::CellUnderflow {
                requested: bits,
                remaining,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EMPTY_CELL_HASH: &str =
        "96a296d224f285c67bee93c30f8a309157f0daa35dc5b87e410b78630a09cfc7";

    #[test]
    fn empty_cell_hash_matches_reference() {
        assert_eq!(hex::encode(Cell::empty().hash()), EMPTY_CELL_HASH);
        assert_eq!(Cell::empty().depth(), 0);
    }

    #[test]
    fn uint_fields_are_big_endian() {
        let mut b = CellBuilder::new();
        b.store_uint(0x7e87_64ef, 32)
            .unwrap()
            .store_uint(1, 64)
            .unwrap();
        let cell = b.build();

        assert_eq!(cell.bit_len(), 96);
        assert_eq!(&cell.data()[..4], &[0x7e, 0x87, 0x64, 0xef]);
        assert_eq!(cell.data()[11], 1);
    }

    #[test]
    fn store_uint_rejects_values_wider_than_field() {
        let mut b = CellBuilder::new();
        assert_eq!(
            b.store_uint(256, 8).unwrap_err(),
            EncodeError::ValueOutOfRange { value: 256, bits: 8 }
        );
        assert_eq!(b.bit_len(), 0);
    }

    #[test]
    fn store_int_round_trips_negative_values() {
        let mut b = CellBuilder::new();
        b.store_int(-1, 8).unwrap().store_int(-128, 8).unwrap();
        let cell = b.build();
        let mut s = cell.parse();

        assert_eq!(s.load_int(8).unwrap(), -1);
        assert_eq!(s.load_int(8).unwrap(), -128);
        assert!(CellBuilder::new().store_int(128, 8).is_err());
    }

    #[test]
    fn builder_enforces_cell_limits() {
        let mut b = CellBuilder::new();
        for _ in 0..15 {
            b.store_uint(0, 64).unwrap();
        }
        b.store_uint(0, 63).unwrap();
        assert_eq!(b.available_bits(), 0);
        assert!(matches!(
            b.store_bit(true),
            Err(EncodeError::BitOverflow { requested: 1, available: 0 })
        ));

        let mut b = CellBuilder::new();
        for _ in 0..MAX_REFS {
            b.store_ref(Cell::empty()).unwrap();
        }
        assert_eq!(b.store_ref(Cell::empty()).unwrap_err(), EncodeError::RefOverflow);
    }

    #[test]
    fn slice_reports_underflow_and_trailing_data() {
        let mut b = CellBuilder::new();
        b.store_uint(5, 4).unwrap();
        let cell = b.build();

        let mut s = cell.parse();
        assert_eq!(
            s.load_uint(8).unwrap_err(),
            DecodeError::CellUnderflow {
                requested: 8,
                remaining: 4
            }
        );
        assert_eq!(
            s.end_parse().unwrap_err(),
            DecodeError::TrailingData { bits: 4, refs: 0 }
        );
        assert_eq!(s.load_uint(4).unwrap(), 5);
        assert!(s.end_parse().is_ok());
        assert_eq!(s.load_ref().unwrap_err(), DecodeError::RefUnderflow);
    }

    #[test]
    fn hash_depends_on_references_and_depth() {
        let leaf = CellBuilder::new().build();
        let mut b = CellBuilder::new();
        b.store_ref(leaf.clone()).unwrap();
        let parent = b.build();

        assert_eq!(parent.depth(), 1);
        assert_ne!(parent.hash(), leaf.hash());
        assert_eq!(parent.references()[0], leaf);
    }

    #[test]
    fn display_uses_completion_tag_for_partial_nibbles() {
        let mut b = CellBuilder::new();
        b.store_uint(0b101, 3).unwrap();
        assert_eq!(b.build().to_string(), "x{B_}\n");

        let mut b = CellBuilder::new();
        b.store_uint(0xab, 8).unwrap();
        assert_eq!(b.build().to_string(), "x{AB}\n");
    }
}
