//! Delta-only heap accumulation for `#Strings`, `#US`, `#Blob` and `#GUID`.
//!
//! An EnC delta does not rewrite the baseline heaps; it ships only the bytes
//! appended by the current generation, and every index it hands out is an
//! offset (or entry number, for GUIDs) that continues the baseline stream.
//! [`DeltaHeaps`] therefore tracks the baseline stream lengths it was seeded
//! with, interns values so that equal inputs share one index, and serializes
//! each heap into exactly the bytes the delta image will carry.
//!
//! Indices follow .NET runtime conventions: string and blob indices are byte
//! offsets with 0 reserved for the empty entry of the baseline heap, user
//! string indices are byte offsets into `#US`, and GUID indices are 1-based
//! entry numbers (each entry is exactly 16 bytes).
//!
//! # Reference
//!
//! - [ECMA-335 II.24.2](https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf) - Metadata heap formats

use indexmap::IndexMap;
use rustc_hash::FxBuildHasher;

use crate::metadata::guid::Guid;
use crate::metadata::signatures::write_compressed_uint;

/// Rounds a stream length up to 4-byte alignment.
#[must_use]
pub fn aligned4(len: u32) -> u32 {
    (len + 3) & !3
}

/// Baseline stream lengths a [`DeltaHeaps`] continues from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HeapLengths {
    /// Byte length of `#Strings` after the previous generation.
    pub string: u32,
    /// Byte length of `#US` after the previous generation.
    pub user_string: u32,
    /// Byte length of `#Blob` after the previous generation.
    pub blob: u32,
    /// Byte length of `#GUID` after the previous generation (a multiple of 16).
    pub guid: u32,
}

/// Accumulates this delta's additions to the four metadata heaps.
///
/// All four heaps are append-only and content-interned: adding the same value
/// twice returns the same index and contributes bytes once. The serialized
/// streams contain only the delta's additions.
#[derive(Debug)]
pub struct DeltaHeaps {
    base: HeapLengths,
    strings: IndexMap<String, u32, FxBuildHasher>,
    string_bytes: Vec<u8>,
    user_strings: IndexMap<String, u32, FxBuildHasher>,
    user_string_bytes: Vec<u8>,
    blobs: IndexMap<Vec<u8>, u32, FxBuildHasher>,
    blob_bytes: Vec<u8>,
    guids: Vec<Guid>,
}

impl DeltaHeaps {
    /// Creates empty delta heaps continuing from the given baseline lengths.
    #[must_use]
    pub fn new(base: HeapLengths) -> Self {
        debug_assert_eq!(base.guid % 16, 0, "GUID stream length must be a multiple of 16");
        Self {
            base,
            strings: IndexMap::default(),
            string_bytes: Vec::new(),
            user_strings: IndexMap::default(),
            user_string_bytes: Vec::new(),
            blobs: IndexMap::default(),
            blob_bytes: Vec::new(),
            guids: Vec::new(),
        }
    }

    /// Interns a string into the delta's `#Strings` heap and returns its index.
    ///
    /// The empty string always maps to index 0 (the shared empty entry at the
    /// start of the generation-0 heap). Strings are stored UTF-8 encoded with
    /// a trailing NUL.
    pub fn get_or_add_string(&mut self, value: &str) -> u32 {
        if value.is_empty() {
            return 0;
        }
        if let Some(&index) = self.strings.get(value) {
            return index;
        }
        let index = self.base.string + self.string_bytes.len() as u32;
        self.string_bytes.extend_from_slice(value.as_bytes());
        self.string_bytes.push(0);
        self.strings.insert(value.to_string(), index);
        index
    }

    /// Interns a user string into the delta's `#US` heap and returns its index.
    ///
    /// User strings are stored as a compressed byte count followed by UTF-16LE
    /// code units and a terminal byte; the terminal byte is 1 when any code
    /// unit requires more than simple handling (ECMA-335 §II.24.2.4).
    pub fn get_or_add_user_string(&mut self, value: &str) -> u32 {
        if let Some(&index) = self.user_strings.get(value) {
            return index;
        }
        let index = self.base.user_string + self.user_string_bytes.len() as u32;

        let units: Vec<u16> = value.encode_utf16().collect();
        let byte_len = units.len() as u32 * 2 + 1;
        write_compressed_uint(byte_len, &mut self.user_string_bytes);
        for unit in &units {
            self.user_string_bytes.extend_from_slice(&unit.to_le_bytes());
        }
        self.user_string_bytes.push(u8::from(units.iter().any(|&u| needs_full_handling(u))));

        self.user_strings.insert(value.to_string(), index);
        index
    }

    /// Interns a blob into the delta's `#Blob` heap and returns its index.
    ///
    /// The empty blob always maps to index 0. Blobs are stored with a
    /// compressed length prefix.
    pub fn get_or_add_blob(&mut self, data: &[u8]) -> u32 {
        if data.is_empty() {
            return 0;
        }
        if let Some(&index) = self.blobs.get(data) {
            return index;
        }
        let index = self.base.blob + self.blob_bytes.len() as u32;
        write_compressed_uint(data.len() as u32, &mut self.blob_bytes);
        self.blob_bytes.extend_from_slice(data);
        self.blobs.insert(data.to_vec(), index);
        index
    }

    /// Appends a GUID to the delta's `#GUID` heap and returns its 1-based index.
    ///
    /// GUIDs are not interned; each generation records its own `enc_id` and
    /// `enc_base_id` entries even when a GUID value recurs.
    pub fn add_guid(&mut self, guid: Guid) -> u32 {
        self.guids.push(guid);
        self.base.guid / 16 + self.guids.len() as u32
    }

    /// Serialized `#Strings` delta bytes.
    #[must_use]
    pub fn string_stream(&self) -> &[u8] {
        &self.string_bytes
    }

    /// Serialized `#US` delta bytes, zero-padded to the 4-byte alignment the
    /// stream carries on disk. The padded length is what
    /// [`DeltaHeaps::merged_lengths`] reports, so the next generation's
    /// offsets line up with the physically appended bytes.
    #[must_use]
    pub fn user_string_stream(&self) -> Vec<u8> {
        padded4(&self.user_string_bytes)
    }

    /// Serialized `#Blob` delta bytes, zero-padded to 4-byte alignment like
    /// [`DeltaHeaps::user_string_stream`].
    #[must_use]
    pub fn blob_stream(&self) -> Vec<u8> {
        padded4(&self.blob_bytes)
    }

    /// Serialized `#GUID` delta bytes.
    #[must_use]
    pub fn guid_stream(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.guids.len() * 16);
        for guid in &self.guids {
            out.extend_from_slice(guid.as_bytes());
        }
        out
    }

    /// Stream lengths after this delta, with the alignment rules the runtime
    /// expects: `#Blob` and `#US` pad to 4 bytes, `#Strings` is unaligned,
    /// `#GUID` is aligned by construction.
    #[must_use]
    pub fn merged_lengths(&self) -> HeapLengths {
        HeapLengths {
            string: self.base.string + self.string_bytes.len() as u32,
            user_string: self.base.user_string + aligned4(self.user_string_bytes.len() as u32),
            blob: self.base.blob + aligned4(self.blob_bytes.len() as u32),
            guid: self.base.guid + self.guids.len() as u32 * 16,
        }
    }
}

/// Copies a stream and zero-pads it to 4-byte alignment. Interning offsets
/// use the unpadded length; padding exists only in the emitted bytes, at the
/// end of the generation's stream.
fn padded4(bytes: &[u8]) -> Vec<u8> {
    let mut out = bytes.to_vec();
    out.resize(aligned4(bytes.len() as u32) as usize, 0);
    out
}

/// ECMA-335 §II.24.2.4: does this UTF-16 code unit force the terminal byte to 1?
fn needs_full_handling(unit: u16) -> bool {
    if unit >= 0x80 {
        return true;
    }
    matches!(unit, 0x01..=0x08 | 0x0E..=0x1F | 0x27 | 0x2D | 0x7F)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> HeapLengths {
        HeapLengths { string: 100, user_string: 50, blob: 80, guid: 16 }
    }

    #[test]
    fn test_string_indices_continue_baseline() {
        let mut heaps = DeltaHeaps::new(base());
        let first = heaps.get_or_add_string("Hello");
        let second = heaps.get_or_add_string("World");
        assert_eq!(first, 100);
        assert_eq!(second, 106); // "Hello" + NUL
        assert_eq!(heaps.get_or_add_string("Hello"), first);
        assert_eq!(heaps.string_stream(), b"Hello\0World\0");
    }

    #[test]
    fn test_empty_string_and_blob_map_to_zero() {
        let mut heaps = DeltaHeaps::new(base());
        assert_eq!(heaps.get_or_add_string(""), 0);
        assert_eq!(heaps.get_or_add_blob(&[]), 0);
        assert!(heaps.string_stream().is_empty());
        assert!(heaps.blob_stream().is_empty());
    }

    #[test]
    fn test_blob_length_prefix() {
        let mut heaps = DeltaHeaps::new(base());
        let index = heaps.get_or_add_blob(&[7, 2, 1]);
        assert_eq!(index, 80);
        assert_eq!(heaps.blob_stream(), &[3, 7, 2, 1]);

        // Interned: same bytes, same index, no growth.
        assert_eq!(heaps.get_or_add_blob(&[7, 2, 1]), 80);
        assert_eq!(heaps.blob_stream().len(), 4);

        assert_eq!(heaps.get_or_add_blob(&[9]), 84);
    }

    #[test]
    fn test_user_string_encoding() {
        let mut heaps = DeltaHeaps::new(base());
        let index = heaps.get_or_add_user_string("Hi");
        assert_eq!(index, 50);
        // 2 UTF-16 units = 4 bytes + terminal byte = 5, ASCII so terminal 0;
        // the emitted stream pads the 6 content bytes to 8.
        assert_eq!(heaps.user_string_stream(), &[5, b'H', 0, b'i', 0, 0, 0, 0]);
    }

    #[test]
    fn test_user_string_terminal_flag() {
        let mut heaps = DeltaHeaps::new(HeapLengths::default());
        heaps.get_or_add_user_string("\u{00E9}");
        let stream = heaps.user_string_stream();
        assert_eq!(*stream.last().unwrap(), 1);
    }

    #[test]
    fn test_guid_entries_are_one_based_continuations() {
        let mut heaps = DeltaHeaps::new(base()); // one baseline GUID
        let first = heaps.add_guid(Guid::from_bytes([1; 16]));
        let second = heaps.add_guid(Guid::from_bytes([1; 16]));
        assert_eq!(first, 2);
        assert_eq!(second, 3); // not interned
        assert_eq!(heaps.guid_stream().len(), 32);
    }

    #[test]
    fn test_emitted_streams_match_merged_lengths() {
        let mut heaps = DeltaHeaps::new(base());
        heaps.get_or_add_blob(&[7, 2, 1]); // 4 content bytes, aligned already
        heaps.get_or_add_blob(&[9]); // 6 content bytes total, pads to 8
        heaps.get_or_add_user_string("Hi"); // 6 content bytes, pads to 8

        let blob = heaps.blob_stream();
        assert_eq!(blob.len(), 8);
        assert_eq!(&blob[6..], [0, 0]);
        assert_eq!(heaps.user_string_stream().len(), 8);

        // Interning keeps using unpadded offsets within the generation, but
        // the physical stream length is exactly what the next generation's
        // starting offsets are computed from.
        let merged = heaps.merged_lengths();
        assert_eq!(merged.blob, base().blob + blob.len() as u32);
        assert_eq!(merged.user_string, base().user_string + 8);
    }

    #[test]
    fn test_merged_lengths_alignment() {
        let mut heaps = DeltaHeaps::new(base());
        heaps.get_or_add_string("abc"); // 4 bytes, strings unaligned
        heaps.get_or_add_blob(&[1, 2]); // 3 bytes, pads to 4
        heaps.get_or_add_user_string("x"); // 1 + 2 + 1 = 4 bytes, already aligned
        heaps.add_guid(Guid::ZERO);

        let merged = heaps.merged_lengths();
        assert_eq!(merged.string, 104);
        assert_eq!(merged.blob, 84);
        assert_eq!(merged.user_string, 54);
        assert_eq!(merged.guid, 32);
    }

    #[test]
    fn test_aligned4() {
        assert_eq!(aligned4(0), 0);
        assert_eq!(aligned4(1), 4);
        assert_eq!(aligned4(4), 4);
        assert_eq!(aligned4(7), 8);
    }
}
