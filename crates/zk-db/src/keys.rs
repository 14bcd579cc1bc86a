//! Canonical byte encoding for correlation-table keys.
//!
//! All integers are big-endian so that redb's lexicographic key order is the
//! numeric order. Composite keys are plain concatenations of their parts.

use crate::errors::{DbError, DbResult};
use crate::types::Hash;

pub const U64_LEN: usize = 8;
pub const COMPOSITE_KEY_LEN: usize = 16;
pub const GER_KEY_LEN: usize = 40;

// ---------------------------------------------------------------------------
// Fixed-width integers
// ---------------------------------------------------------------------------

pub fn uint64_to_bytes(v: u64) -> [u8; 8] {
    v.to_be_bytes()
}

pub fn bytes_to_uint64(data: &[u8]) -> DbResult<u64> {
    if data.len() != U64_LEN {
        return Err(DbError::InvalidKeyLength {
            expected: U64_LEN,
            actual: data.len(),
        });
    }
    Ok(read_u64_be(data))
}

pub fn uint8_to_bytes(v: u8) -> [u8; 1] {
    [v]
}

pub fn bytes_to_uint8(data: &[u8]) -> DbResult<u8> {
    match data {
        [v] => Ok(*v),
        _ => Err(DbError::InvalidKeyLength {
            expected: 1,
            actual: data.len(),
        }),
    }
}

/// Reads the big-endian u64 in the first 8 bytes. Callers check the length.
pub(crate) fn read_u64_be(data: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&data[..U64_LEN]);
    u64::from_be_bytes(buf)
}

pub(crate) fn read_hash(data: &[u8]) -> Hash {
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&data[..32]);
    hash
}

// ---------------------------------------------------------------------------
// Composite (L1 block, batch) key: be(a)[8] || be(b)[8] = 16 bytes
// ---------------------------------------------------------------------------

pub fn concat_key(a: u64, b: u64) -> [u8; 16] {
    let mut buf = [0u8; COMPOSITE_KEY_LEN];
    buf[0..8].copy_from_slice(&a.to_be_bytes());
    buf[8..16].copy_from_slice(&b.to_be_bytes());
    buf
}

pub fn split_key(key: &[u8]) -> DbResult<(u64, u64)> {
    if key.len() != COMPOSITE_KEY_LEN {
        return Err(DbError::InvalidKeyLength {
            expected: COMPOSITE_KEY_LEN,
            actual: key.len(),
        });
    }
    Ok((read_u64_be(&key[0..8]), read_u64_be(&key[8..16])))
}

// ---------------------------------------------------------------------------
// GER key: be(block)[8] || l1_block_hash[32]? = 8 or 40 bytes
// ---------------------------------------------------------------------------

pub fn concat_ger_key(block_no: u64, l1_block_hash: Option<&Hash>) -> Vec<u8> {
    let mut buf = Vec::with_capacity(GER_KEY_LEN);
    buf.extend_from_slice(&block_no.to_be_bytes());
    if let Some(hash) = l1_block_hash {
        buf.extend_from_slice(hash);
    }
    buf
}

/// Inverse of [`concat_ger_key`]. An 8-byte key carries no L1 block hash.
pub fn split_ger_key(key: &[u8]) -> DbResult<(u64, Option<Hash>)> {
    match key.len() {
        U64_LEN => Ok((read_u64_be(key), None)),
        GER_KEY_LEN => Ok((read_u64_be(&key[0..8]), Some(read_hash(&key[8..40])))),
        actual => Err(DbError::InvalidKeyLength {
            expected: GER_KEY_LEN,
            actual,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_uint64_roundtrip_edges() {
        for v in [0u64, 1, 255, 256, u64::MAX - 1, u64::MAX] {
            assert_eq!(bytes_to_uint64(&uint64_to_bytes(v)).unwrap(), v);
        }
    }

    #[test]
    fn test_uint64_big_endian_sorts_numerically() {
        assert!(uint64_to_bytes(255) < uint64_to_bytes(256));
        assert!(uint64_to_bytes(1 << 32) < uint64_to_bytes(u64::MAX));
    }

    #[test]
    fn test_uint8_roundtrip() {
        for v in 0..=u8::MAX {
            assert_eq!(bytes_to_uint8(&uint8_to_bytes(v)).unwrap(), v);
        }
        assert!(bytes_to_uint8(&[]).is_err());
    }

    #[test]
    fn test_split_key_rejects_bad_length() {
        let err = split_key(&[0u8; 15]).unwrap_err();
        assert!(matches!(
            err,
            DbError::InvalidKeyLength {
                expected: 16,
                actual: 15
            }
        ));
        assert!(split_key(&[0u8; 17]).is_err());
    }

    #[test]
    fn test_composite_key_groups_by_first_component() {
        assert!(concat_key(10, u64::MAX) < concat_key(11, 0));
        assert!(concat_key(10, 5) < concat_key(10, 7));
    }

    #[test]
    fn test_ger_key_with_and_without_hash() {
        let short = concat_ger_key(42, None);
        assert_eq!(short.len(), 8);
        assert_eq!(split_ger_key(&short).unwrap(), (42, None));

        let hash = [0x5a; 32];
        let long = concat_ger_key(42, Some(&hash));
        assert_eq!(long.len(), 40);
        assert_eq!(split_ger_key(&long).unwrap(), (42, Some(hash)));

        assert!(split_ger_key(&[0u8; 12]).is_err());
    }

    proptest! {
        #[test]
        fn split_key_inverts_concat_key(a in any::<u64>(), b in any::<u64>()) {
            prop_assert_eq!(split_key(&concat_key(a, b)).unwrap(), (a, b));
        }

        #[test]
        fn composite_order_matches_tuple_order(
            a1 in any::<u64>(), b1 in any::<u64>(), a2 in any::<u64>(), b2 in any::<u64>()
        ) {
            prop_assert_eq!(concat_key(a1, b1).cmp(&concat_key(a2, b2)), (a1, b1).cmp(&(a2, b2)));
        }
    }
}
