//! Transfer protocol between a hub and local files.
//!
//! This module provides:
//! - Batch framing for export files (`codec`)
//! - Cursor-driven pagination (`fetcher`)
//! - Re-signing of records under a new key (`resign`)
//! - Download, backup and upload orchestration on [`Transfer`]
//! - Local re-framing of export files (`convert`)

pub mod codec;
pub mod constants;
pub mod convert;
pub mod download;
pub mod fetcher;
pub mod hash;
pub mod resign;
pub mod session;
pub mod upload;
pub mod utils;

use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::config::TransferOptions;
use crate::{NoProgress, ProgressSink};

// Re-export public API
pub use codec::{FrameReader, FrameWriter, decode, encode};
pub use convert::convert;
pub use download::BackupFile;
pub use fetcher::{PageFetcher, fetch_all};
pub use resign::{ResignOutcome, resign};
pub use session::{Aborted, TransferError, TransferReport};

/// One download, backup or upload against a hub.
///
/// Runs on a single sequential flow: pages, frames and submissions never
/// overlap. Cancellation is honored only between pages or records.
pub struct Transfer<'a, H> {
    hub: &'a H,
    options: TransferOptions,
    sink: Arc<dyn ProgressSink>,
    cancel: CancellationToken,
}

impl<'a, H> Transfer<'a, H> {
    pub fn new(hub: &'a H, options: TransferOptions) -> Self {
        Self {
            hub,
            options,
            sink: Arc::new(NoProgress),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn options(&self) -> &TransferOptions {
        &self.options
    }
}
