// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
// Copyright (c) DUSK NETWORK. All rights reserved.

//! Bag-of-cells (BoC) serialization for single-root trees.
//!
//! Output uses the generic `b5ee9c72` layout without an offset index and
//! with a CRC32C trailer. Input may carry an index and may omit the trailer.

use std::collections::HashMap;

use crc::{Crc, CRC_32_ISCSI};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::cell::{Cell, MAX_BITS, MAX_REFS};
use crate::error::DecodeError;

const BOC_MAGIC: [u8; 4] = [0xb5, 0xee, 0x9c, 0x72];
const FLAG_HAS_INDEX: u8 = 0x80;
const FLAG_HAS_CRC32C: u8 = 0x40;

const CASTAGNOLI: Crc<u32> = Crc::<u32>::new(&CRC_32_ISCSI);

impl Cell {
    /// Serializes the tree rooted at this cell, with a CRC32C trailer.
    #[must_use]
    pub fn to_boc(&self) -> Vec<u8> {
        serialize(self, true)
    }

    /// Parses a single-root bag of cells.
    ///
    /// # Errors
    /// Fails on a bad magic, checksum, layout, or on exotic cells.
    pub fn from_boc(bytes: &[u8]) -> Result<Self, DecodeError> {
        deserialize(bytes)
    }
}

/// Serializes `root`, optionally appending the CRC32C of the payload.
#[must_use]
pub fn serialize(root: &Cell, with_crc32c: bool) -> Vec<u8> {
    let mut order = Vec::new();
    let mut index = HashMap::new();
    visit(root, &mut order, &mut index);
    order.reverse();
    let n = order.len();
    for (i, cell) in order.iter().enumerate() {
        index.insert(cell.hash(), i);
    }

    let size_bytes = min_bytes(n as u64);
    let tot_cells_size: usize = order
        .iter()
        .map(|c| 2 + c.data().len() + c.references().len() * size_bytes)
        .sum();
    let off_bytes = min_bytes(tot_cells_size as u64);

    let mut out = Vec::with_capacity(16 + tot_cells_size);
    out.extend_from_slice(&BOC_MAGIC);
    // size_bytes <= 8 and fits in the low three bits
    #[allow(clippy::cast_possible_truncation)]
    let mut flags = size_bytes as u8;
    if with_crc32c {
        flags |= FLAG_HAS_CRC32C;
    }
    out.push(flags);
    #[allow(clippy::cast_possible_truncation)]
    out.push(off_bytes as u8);
    write_be(&mut out, n as u64, size_bytes);
    write_be(&mut out, 1, size_bytes);
    write_be(&mut out, 0, size_bytes);
    write_be(&mut out, tot_cells_size as u64, off_bytes);
    write_be(&mut out, 0, size_bytes);

    for cell in &order {
        out.extend_from_slice(&cell.descriptors());
        out.extend_from_slice(&cell.augmented_data());
        for r in cell.references() {
            write_be(&mut out, index[&r.hash()] as u64, size_bytes);
        }
    }

    if with_crc32c {
        let crc = crc32c(&out);
        out.extend_from_slice(&crc.to_le_bytes());
    }
    out
}

/// Post-order walk; each distinct cell is recorded once.
fn visit(cell: &Cell, order: &mut Vec<Cell>, seen: &mut HashMap<[u8; 32], usize>) {
    if seen.contains_key(&cell.hash()) {
        return;
    }
    seen.insert(cell.hash(), 0);
    for r in cell.references() {
        visit(r, order, seen);
    }
    order.push(cell.clone());
}

/// Parses a single-root bag of cells.
///
/// # Errors
/// See [`Cell::from_boc`].
pub fn deserialize(bytes: &[u8]) -> Result<Cell, DecodeError> {
    if bytes.len() < 6 || bytes[..4] != BOC_MAGIC {
        return Err(DecodeError::InvalidBoc("missing b5ee9c72 magic"));
    }
    let flags = bytes[4];
    let mut payload = bytes;
    if flags & FLAG_HAS_CRC32C != 0 {
        if bytes.len() < 10 {
            return Err(DecodeError::InvalidBoc("truncated checksum"));
        }
        let (body, trailer) = bytes.split_at(bytes.len() - 4);
        let expected = u32::from_le_bytes([trailer[0], trailer[1], trailer[2], trailer[3]]);
        if crc32c(body) != expected {
            return Err(DecodeError::InvalidBoc("checksum mismatch"));
        }
        payload = body;
    }

    let size_bytes = usize::from(flags & 0x07);
    let off_bytes = usize::from(bytes[5]);
    if !(1..=4).contains(&size_bytes) || !(1..=8).contains(&off_bytes) {
        return Err(DecodeError::InvalidBoc("unsupported field sizes"));
    }

    let mut r = Reader {
        bytes: payload,
        pos: 6,
    };
    let cells = r.uint(size_bytes)?;
    let roots = r.uint(size_bytes)?;
    let _absent = r.uint(size_bytes)?;
    let _tot_cells_size = r.uint(off_bytes)?;
    if roots != 1 {
        return Err(DecodeError::InvalidBoc("expected exactly one root"));
    }
    let root = r.uint(size_bytes)?;
    if flags & FLAG_HAS_INDEX != 0 {
        let index_len = cells
            .checked_mul(off_bytes)
            .ok_or(DecodeError::InvalidBoc("cell count overflows the index"))?;
        r.take(index_len)?;
    }
    // every cell needs at least its two descriptor bytes
    if cells > r.remaining() / 2 {
        return Err(DecodeError::InvalidBoc("cell count exceeds payload"));
    }

    let mut raw = Vec::with_capacity(cells);
    for i in 0..cells {
        let [d1, d2] = [r.byte()?, r.byte()?];
        if d1 & 0x08 != 0 || d1 >> 5 != 0 {
            return Err(DecodeError::InvalidBoc("exotic or higher-level cells are not supported"));
        }
        let ref_count = usize::from(d1 & 0x07);
        if ref_count > MAX_REFS {
            return Err(DecodeError::InvalidBoc("too many references"));
        }

        let data_len = usize::from(d2).div_ceil(2);
        let mut data = r.take(data_len)?.to_vec();
        let bit_len = if d2 % 2 == 0 {
            data_len * 8
        } else {
            let last = data.last().copied().unwrap_or(0);
            if last == 0 {
                return Err(DecodeError::InvalidBoc("missing completion tag"));
            }
            (data_len - 1) * 8 + 7 - last.trailing_zeros() as usize
        };
        if bit_len > MAX_BITS {
            return Err(DecodeError::InvalidBoc("cell exceeds 1023 bits"));
        }
        data.truncate(bit_len.div_ceil(8));

        let mut refs = Vec::with_capacity(ref_count);
        for _ in 0..ref_count {
            let idx = r.uint(size_bytes)?;
            if idx <= i || idx >= cells {
                return Err(DecodeError::InvalidBoc("reference index out of order"));
            }
            refs.push(idx);
        }
        raw.push((data, bit_len, refs));
    }

    let mut built: Vec<Option<Cell>> = vec![None; cells];
    for (i, (data, bit_len, refs)) in raw.into_iter().enumerate().rev() {
        let children = refs
            .iter()
            .map(|&idx| built[idx].clone().ok_or(DecodeError::InvalidBoc("dangling reference")))
            .collect::<Result<Vec<_>, _>>()?;
        built[i] = Some(Cell::from_parts(data, bit_len, children));
    }

    built
        .get(root)
        .cloned()
        .flatten()
        .ok_or(DecodeError::InvalidBoc("root index out of range"))
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.bytes.len())
            .ok_or(DecodeError::InvalidBoc("unexpected end of input"))?;
        let bytes = self.bytes;
        let out = &bytes[self.pos..end];
        self.pos = end;
        Ok(out)
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    fn byte(&mut self) -> Result<u8, DecodeError> {
        Ok(self.take(1)?[0])
    }

    fn uint(&mut self, len: usize) -> Result<usize, DecodeError> {
        let value = self
            .take(len)?
            .iter()
            .fold(0u64, |acc, b| (acc << 8) | u64::from(*b));
        usize::try_from(value).map_err(|_| DecodeError::InvalidBoc("size field overflows usize"))
    }
}

fn min_bytes(value: u64) -> usize {
    let bits = 64 - value.leading_zeros() as usize;
    bits.div_ceil(8).max(1)
}

fn write_be(out: &mut Vec<u8>, value: u64, len: usize) {
    out.extend_from_slice(&value.to_be_bytes()[8 - len..]);
}

fn crc32c(data: &[u8]) -> u32 {
    CASTAGNOLI.checksum(data)
}

impl Serialize for Cell {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(self.to_boc()))
    }
}

impl<'de> Deserialize<'de> for Cell {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        let bytes = hex::decode(text.trim_start_matches("0x")).map_err(D::Error::custom)?;
        Cell::from_boc(&bytes).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::CellBuilder;

    const EMPTY_CELL_BOC: &str = "b5ee9c724101010100020000004cacb9cd";

    fn leaf(value: u64, bits: usize) -> Cell {
        let mut b = CellBuilder::new();
        b.store_uint(value, bits).unwrap();
        b.build()
    }

    #[test]
    fn empty_cell_matches_reference_bytes() {
        assert_eq!(hex::encode(Cell::empty().to_boc()), EMPTY_CELL_BOC);
        let parsed = Cell::from_boc(&hex::decode(EMPTY_CELL_BOC).unwrap()).unwrap();
        assert_eq!(parsed, Cell::empty());
    }

    #[test]
    fn crc32c_matches_check_value() {
        assert_eq!(crc32c(b"123456789"), 0xe306_9283);
    }

    #[test]
    fn shared_children_are_stored_once() {
        let shared = leaf(0xabc, 12);
        let mut b = CellBuilder::new();
        b.store_uint(1, 3)
            .unwrap()
            .store_ref(shared.clone())
            .unwrap()
            .store_ref(shared)
            .unwrap();
        let root = b.build();

        let bytes = root.to_boc();
        assert_eq!(bytes[6], 2, "two distinct cells");
        assert_eq!(Cell::from_boc(&bytes).unwrap(), root);
    }

    #[test]
    fn deep_trees_round_trip() {
        let mut cell = leaf(7, 5);
        for i in 0..20 {
            let mut b = CellBuilder::new();
            b.store_uint(i, 17).unwrap().store_ref(cell).unwrap();
            cell = b.build();
        }

        let parsed = Cell::from_boc(&cell.to_boc()).unwrap();
        assert_eq!(parsed.depth(), 20);
        assert_eq!(parsed, cell);
    }

    #[test]
    fn payload_without_crc_is_accepted() {
        let cell = leaf(0x1234, 16);
        let bytes = serialize(&cell, false);
        assert_eq!(bytes[4] & FLAG_HAS_CRC32C, 0);
        assert_eq!(Cell::from_boc(&bytes).unwrap(), cell);
    }

    #[test]
    fn corrupted_payloads_are_rejected() {
        let mut bytes = leaf(0x1234, 16).to_boc();
        let last = bytes.len() - 5;
        bytes[last] ^= 0xff;
        assert_eq!(
            Cell::from_boc(&bytes).unwrap_err(),
            DecodeError::InvalidBoc("checksum mismatch")
        );

        assert!(Cell::from_boc(&[0u8; 8]).is_err());
        assert!(Cell::from_boc(&BOC_MAGIC).is_err());
    }

    #[test]
    fn oversized_cell_counts_are_rejected() {
        // header claims 0xffffffff cells with no cell data behind it
        let mut bytes = hex::decode("b5ee9c720401ffffffff00000001000000000000000000").unwrap();
        assert_eq!(
            Cell::from_boc(&bytes).unwrap_err(),
            DecodeError::InvalidBoc("cell count exceeds payload")
        );

        bytes[4] |= FLAG_HAS_CRC32C;
        let crc = crc32c(&bytes);
        bytes.extend_from_slice(&crc.to_le_bytes());
        assert_eq!(
            Cell::from_boc(&bytes).unwrap_err(),
            DecodeError::InvalidBoc("cell count exceeds payload")
        );

        let indexed = hex::decode("b5ee9c728408ffffffff0000000100000000000000000000000000000000").unwrap();
        assert!(Cell::from_boc(&indexed).is_err());
    }

    #[test]
    fn serde_uses_boc_hex() {
        let json = serde_json::to_string(&Cell::empty()).unwrap();
        assert_eq!(json, format!("\"{EMPTY_CELL_BOC}\""));
        let back: Cell = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Cell::empty());
    }
}
