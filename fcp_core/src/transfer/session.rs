use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::codec::CodecError;
use crate::hub::HubError;

#[derive(Debug, Error)]
pub enum TransferError {
    #[error(transparent)]
    Hub(#[from] HubError),
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("transfer cancelled")]
    Cancelled,
}

/// Counts reported at the end of every transfer.
///
/// For uploads `total` is every record read from the source, including
/// records whose category was filtered out. For downloads all three track
/// records written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferReport {
    pub total: u64,
    pub success: u64,
    pub error: u64,
    pub frames: u64,
}

impl TransferReport {
    /// Records neither submitted nor failed (filtered out)
    pub fn skipped(&self) -> u64 {
        self.total.saturating_sub(self.success + self.error)
    }
}

/// A transfer stopped early. Carries the counts completed before the failure.
#[derive(Debug, Error)]
#[error("transfer aborted after {} records: {source}", .report.total)]
pub struct Aborted {
    pub report: TransferReport,
    pub source: TransferError,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TransferState {
    Init,
    Streaming,
    Complete,
    Aborted,
}

/// Per-call bookkeeping. Never holds records, only counters.
pub(crate) struct TransferSession {
    kind: &'static str,
    state: TransferState,
    pub(crate) report: TransferReport,
}

impl TransferSession {
    pub(crate) fn new(kind: &'static str) -> Self {
        tracing::debug!("{} session started", kind);
        Self {
            kind,
            state: TransferState::Init,
            report: TransferReport::default(),
        }
    }

    pub(crate) fn stream(&mut self) {
        if self.state != TransferState::Streaming {
            self.transition(TransferState::Streaming);
        }
    }

    fn transition(&mut self, next: TransferState) {
        tracing::debug!("{} session {:?} -> {:?}", self.kind, self.state, next);
        self.state = next;
    }

    pub(crate) fn complete(mut self) -> TransferReport {
        self.transition(TransferState::Complete);
        tracing::info!(
            "{} complete: total {}, success {}, error {}",
            self.kind,
            self.report.total,
            self.report.success,
            self.report.error
        );
        self.report
    }

    pub(crate) fn abort(mut self, source: impl Into<TransferError>) -> Aborted {
        self.transition(TransferState::Aborted);
        let source = source.into();
        tracing::error!(
            "{} aborted after {} records: {}",
            self.kind,
            self.report.total,
            source
        );
        Aborted {
            report: self.report,
            source,
        }
    }
}
