use tokio::sync::mpsc;

pub mod config;
pub mod endpoint;
pub mod hub;
pub mod inspect;
pub mod keys;
pub mod record;
pub mod transfer;

pub use config::{FcpConfig, TransferOptions};
pub use endpoint::Endpoint;
pub use hub::{HubClient, HubError, Identifier, MemoryHub};
pub use record::{Batch, Category, CategorySet, HashScheme, Record, RecordHash, SignatureScheme};
pub use transfer::codec::{CodecError, Format};
pub use transfer::session::{Aborted, TransferError, TransferReport};
pub use transfer::{Transfer, convert};

/// Progress report from the transfer core to whatever renders it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferEvent {
    /// A downloaded page was written to the destination
    PageSaved {
        category: Category,
        /// Records written so far for this category
        count: u64,
        /// Next cursor, base64, for display only
        cursor: String,
    },
    CategoryDone {
        category: Category,
        count: u64,
    },
    RecordSubmitted {
        hash: RecordHash,
    },
    RecordFailed {
        hash: RecordHash,
        reason: String,
    },
    /// Record kept its original signature because its scheme cannot be resigned
    ResignSkipped {
        hash: RecordHash,
        scheme: SignatureScheme,
    },
    Finished(TransferReport),
}

/// Receives progress events. Implementations must not block.
pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: TransferEvent);
}

impl ProgressSink for mpsc::UnboundedSender<TransferEvent> {
    fn emit(&self, event: TransferEvent) {
        // A dropped receiver just means nobody is watching
        let _ = self.send(event);
    }
}

/// Discards all events
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn emit(&self, _event: TransferEvent) {}
}

/// Renders events as log lines
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn emit(&self, event: TransferEvent) {
        match event {
            TransferEvent::PageSaved {
                category,
                count,
                cursor,
            } => tracing::info!("... Saving {:06} {:<12} {}", count, category, cursor),
            TransferEvent::CategoryDone { category, count } => {
                tracing::info!("{}: {} records. Done.", category, count)
            }
            TransferEvent::RecordSubmitted { hash } => tracing::debug!("{} Uploaded", hash),
            TransferEvent::RecordFailed { hash, reason } => {
                tracing::warn!("{} failed: {}", hash, reason)
            }
            TransferEvent::ResignSkipped { hash, scheme } => {
                tracing::warn!("{} kept its {} signature", hash, scheme)
            }
            TransferEvent::Finished(report) => {
                tracing::info!("Total:   {:6} messages", report.total);
                tracing::info!("Success: {:6} messages", report.success);
                tracing::info!("Error:   {:6} messages", report.error);
            }
        }
    }
}
