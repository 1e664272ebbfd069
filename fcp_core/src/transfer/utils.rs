use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, TimeZone};
use std::path::Path;
use tokio::fs::{File, OpenOptions};

use super::constants::BACKUP_FILE_EXT;
use crate::record::Category;

/// Open an output file with secure permissions (0o600 on Unix).
///
/// With `append` the file is extended, otherwise it is truncated.
pub async fn open_secure_file(path: &Path, append: bool) -> std::io::Result<File> {
    let mut options = OpenOptions::new();
    options.write(true).create(true);

    if append {
        options.append(true);
    } else {
        options.truncate(true);
    }
    #[cfg(unix)]
    options.mode(0o600);

    options.open(path).await
}

/// Render an opaque cursor for progress output
pub fn display_cursor(cursor: &[u8]) -> String {
    STANDARD.encode(cursor)
}

/// Backup file name: `{fid:06}_{YYYY-MM-DD-HHMM-SS}_{category}.backup`
pub fn backup_file_name<Tz: TimeZone>(fid: u64, at: &DateTime<Tz>, category: Category) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!(
        "{:06}_{}_{}.{}",
        fid,
        at.format("%Y-%m-%d-%H%M-%S"),
        category.label(),
        BACKUP_FILE_EXT
    )
}
