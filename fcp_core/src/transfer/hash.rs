use crate::record::RecordHash;

use super::constants::HASH_LEN;

/// Compute the content hash of record data: BLAKE3 truncated to 20 bytes
pub fn hash_data(data: &[u8]) -> RecordHash {
    let full = blake3::hash(data);
    let mut truncated = [0u8; HASH_LEN];
    truncated.copy_from_slice(&full.as_bytes()[..HASH_LEN]);
    RecordHash::from_bytes(truncated)
}
