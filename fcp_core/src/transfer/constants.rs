/// Default number of records requested per page
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Length of a record content hash (truncated BLAKE3)
pub const HASH_LEN: usize = 20;

/// Size of the little-endian length prefix in front of each frame
pub const FRAME_HEADER_LEN: usize = 4;

/// Per remote call timeout
pub const DEFAULT_CALL_TIMEOUT_SECS: u64 = 5;

/// Extension of per-category backup files
pub const BACKUP_FILE_EXT: &str = "backup";
