//! Low-level ECMA-335 signature encoding primitives.
//!
//! Everything the delta writer serializes into the `#Blob` heap - local
//! variable signatures, `TypeSpec` signatures, `MethodSpec` instantiations -
//! bottoms out in the helpers here: compressed unsigned integers, the
//! `ELEMENT_TYPE` wire constants, the signature header bytes and the
//! `TypeDefOrRef` coded index.
//!
//! # Reference
//!
//! - [ECMA-335 II.23.2](https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf) - Blobs and signatures
//! - [ECMA-335 II.23.1.16](https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf) - Element types

use crate::metadata::tables::TableId;
use crate::metadata::token::Token;
use crate::Result;

/// Element type constants used in signature blobs.
///
/// Only the constants the delta writer can actually emit are listed; the full
/// set lives in ECMA-335 §II.23.1.16.
#[allow(non_snake_case)]
pub mod ELEMENT_TYPE {
    /// Void type (no value)
    pub const VOID: u8 = 0x01;
    /// Boolean type (true/false)
    pub const BOOLEAN: u8 = 0x02;
    /// 16-bit Unicode character
    pub const CHAR: u8 = 0x03;
    /// Signed 8-bit integer
    pub const I1: u8 = 0x04;
    /// Unsigned 8-bit integer
    pub const U1: u8 = 0x05;
    /// Signed 16-bit integer
    pub const I2: u8 = 0x06;
    /// Unsigned 16-bit integer
    pub const U2: u8 = 0x07;
    /// Signed 32-bit integer
    pub const I4: u8 = 0x08;
    /// Unsigned 32-bit integer
    pub const U4: u8 = 0x09;
    /// Signed 64-bit integer
    pub const I8: u8 = 0x0a;
    /// Unsigned 64-bit integer
    pub const U8: u8 = 0x0b;
    /// 32-bit floating point
    pub const R4: u8 = 0x0c;
    /// 64-bit floating point
    pub const R8: u8 = 0x0d;
    /// String type
    pub const STRING: u8 = 0x0e;
    /// Unmanaged pointer (followed by type)
    pub const PTR: u8 = 0x0f;
    /// Managed reference (followed by type)
    pub const BYREF: u8 = 0x10;
    /// Value type (followed by a `TypeDefOrRef` coded index)
    pub const VALUETYPE: u8 = 0x11;
    /// Reference type/class (followed by a `TypeDefOrRef` coded index)
    pub const CLASS: u8 = 0x12;
    /// Generic parameter of a generic type (followed by its number)
    pub const VAR: u8 = 0x13;
    /// Generic type instantiation (followed by type, arg count, args)
    pub const GENERICINST: u8 = 0x15;
    /// Native integer type (System.IntPtr)
    pub const I: u8 = 0x18;
    /// Native unsigned integer type (System.UIntPtr)
    pub const U: u8 = 0x19;
    /// Object type (System.Object)
    pub const OBJECT: u8 = 0x1c;
    /// Single-dimension array with 0 lower bound
    pub const SZARRAY: u8 = 0x1d;
    /// Generic parameter of a generic method (followed by its number)
    pub const MVAR: u8 = 0x1e;
    /// Denotes a local variable that points at a pinned object
    pub const PINNED: u8 = 0x45;
}

/// Signature header bytes (first byte of a signature blob).
#[allow(non_snake_case)]
pub mod SIGNATURE_HEADER {
    /// `LOCAL_SIG` - a local variable signature stored in `StandAloneSig`.
    pub const LOCAL_SIG: u8 = 0x07;
    /// `GENERICINST` calling convention - a `MethodSpec` instantiation blob.
    pub const GENERIC_INST: u8 = 0x0A;
}

/// Writes a compressed unsigned integer according to ECMA-335 §II.23.2.
///
/// - Values below `0x80` use 1 byte
/// - Values below `0x4000` use 2 bytes (high bit set)
/// - Values below `0x2000_0000` use 4 bytes (two high bits set)
///
/// # Panics
///
/// Panics if the value exceeds the 29-bit encodable range; signature
/// components that large cannot occur in valid metadata.
pub fn write_compressed_uint(value: u32, buffer: &mut Vec<u8>) {
    if value < 0x80 {
        buffer.push(value as u8);
    } else if value < 0x4000 {
        buffer.push(0x80 | (value >> 8) as u8);
        buffer.push(value as u8);
    } else {
        assert!(value < 0x2000_0000, "value {value} exceeds compressed uint range");
        buffer.push(0xC0 | (value >> 24) as u8);
        buffer.push((value >> 16) as u8);
        buffer.push((value >> 8) as u8);
        buffer.push(value as u8);
    }
}

/// Returns the number of bytes [`write_compressed_uint`] produces for a value.
#[must_use]
pub fn compressed_uint_size(value: u32) -> u32 {
    if value < 0x80 {
        1
    } else if value < 0x4000 {
        2
    } else {
        4
    }
}

/// Encodes a token as a `TypeDefOrRef` coded index per ECMA-335 §II.24.2.6.
///
/// The coded index packs tokens from three possible tables:
/// - `TypeDef` (0x02): `(rid << 2) | 0`
/// - `TypeRef` (0x01): `(rid << 2) | 1`
/// - `TypeSpec` (0x1B): `(rid << 2) | 2`
///
/// # Errors
///
/// Returns [`crate::Error::Invariant`] if the token's table is not one of the
/// three encodable tables.
pub fn type_def_or_ref_coded_index(token: Token) -> Result<u32> {
    let rid = token.row();
    match token.table() {
        t if t == TableId::TypeDef as u8 => Ok(rid << 2),
        t if t == TableId::TypeRef as u8 => Ok((rid << 2) | 1),
        t if t == TableId::TypeSpec as u8 => Ok((rid << 2) | 2),
        other => Err(invariant_error!(
            "token 0x{:08X} (table 0x{:02X}) is not encodable as TypeDefOrRef",
            token.value(),
            other
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn test_compressed_uint_one_byte() {
        let mut buf = Vec::new();
        write_compressed_uint(0x03, &mut buf);
        assert_eq!(buf, [0x03]);
        write_compressed_uint(0x7F, &mut buf);
        assert_eq!(buf, [0x03, 0x7F]);
    }

    #[test]
    fn test_compressed_uint_two_bytes() {
        let mut buf = Vec::new();
        write_compressed_uint(0x80, &mut buf);
        assert_eq!(buf, [0x80, 0x80]);

        buf.clear();
        write_compressed_uint(0x3FFF, &mut buf);
        assert_eq!(buf, [0xBF, 0xFF]);
    }

    #[test]
    fn test_compressed_uint_four_bytes() {
        let mut buf = Vec::new();
        write_compressed_uint(0x4000, &mut buf);
        assert_eq!(buf, [0xC0, 0x00, 0x40, 0x00]);

        buf.clear();
        write_compressed_uint(0x1FFF_FFFF, &mut buf);
        assert_eq!(buf, [0xDF, 0xFF, 0xFF, 0xFF]);
    }

    #[test]
    fn test_compressed_uint_size_matches_writer() {
        for value in [0, 0x7F, 0x80, 0x3FFF, 0x4000, 0x1FFF_FFFF] {
            let mut buf = Vec::new();
            write_compressed_uint(value, &mut buf);
            assert_eq!(buf.len() as u32, compressed_uint_size(value));
        }
    }

    #[test]
    fn test_type_def_or_ref_coded_index() {
        let def = Token::from_parts(TableId::TypeDef, 3);
        let type_ref = Token::from_parts(TableId::TypeRef, 3);
        let spec = Token::from_parts(TableId::TypeSpec, 3);
        assert_eq!(type_def_or_ref_coded_index(def).unwrap(), 0b1100);
        assert_eq!(type_def_or_ref_coded_index(type_ref).unwrap(), 0b1101);
        assert_eq!(type_def_or_ref_coded_index(spec).unwrap(), 0b1110);
    }

    #[test]
    fn test_type_def_or_ref_rejects_other_tables() {
        let bad = Token::from_parts(TableId::MethodDef, 1);
        assert!(matches!(
            type_def_or_ref_coded_index(bad),
            Err(Error::Invariant { .. })
        ));
    }
}
