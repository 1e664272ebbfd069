use ed25519_dalek::SigningKey;
use std::path::Path;
use tokio::fs::File;
use tokio::io::AsyncRead;
use tracing::{info, warn};

use super::Transfer;
use super::codec::{CodecError, FrameReader};
use super::resign::{ResignOutcome, resign};
use super::session::{Aborted, TransferError, TransferReport, TransferSession};
use crate::hub::{HubClient, call};
use crate::record::Record;
use crate::{ProgressSink, TransferEvent};

impl<'a, H: HubClient> Transfer<'a, H> {
    /// Submit every enabled record read from `reader` to the hub.
    ///
    /// Submissions are best effort: a rejected record is counted and
    /// reported, never fatal. Only a corrupt source (truncated or
    /// undecodable frame) or a read error aborts the upload.
    pub async fn upload<R: AsyncRead + Unpin>(&self, reader: R) -> Result<TransferReport, Aborted> {
        let mut session = TransferSession::new("upload");
        let mut frames = FrameReader::new(reader, self.options.format);

        loop {
            if self.cancel.is_cancelled() {
                return Err(session.abort(TransferError::Cancelled));
            }
            let batch = match frames.read_batch().await {
                Ok(batch) => batch,
                Err(CodecError::EndOfStream) => break,
                Err(e) => return Err(session.abort(e)),
            };
            session.stream();
            session.report.frames += 1;

            for record in batch.records {
                if self.cancel.is_cancelled() {
                    return Err(session.abort(TransferError::Cancelled));
                }
                session.report.total += 1;
                if !self.options.filters.contains(record.category) {
                    continue;
                }

                let record =
                    prepare_record(record, self.options.signing_key.as_ref(), self.sink.as_ref());
                match call(self.options.call_timeout, self.hub.submit(&record)).await {
                    Ok(()) => {
                        session.report.success += 1;
                        self.sink
                            .emit(TransferEvent::RecordSubmitted { hash: record.hash });
                    }
                    Err(e) => {
                        session.report.error += 1;
                        warn!("{} failed: {}", record.hash, e);
                        self.sink.emit(TransferEvent::RecordFailed {
                            hash: record.hash,
                            reason: e.to_string(),
                        });
                    }
                }
            }
        }

        info!("Uploaded {} frames", frames.frames());
        let report = session.complete();
        self.sink.emit(TransferEvent::Finished(report));
        Ok(report)
    }

    /// Upload the records stored in a local file
    pub async fn upload_from_path(&self, path: &Path) -> Result<TransferReport, Aborted> {
        let file = File::open(path)
            .await
            .map_err(|e| TransferSession::new("upload").abort(e))?;
        self.upload(file).await
    }
}

/// Resign `record` when a key is configured; unsupported schemes pass through
pub(crate) fn prepare_record(
    mut record: Record,
    key: Option<&SigningKey>,
    sink: &dyn ProgressSink,
) -> Record {
    if let Some(key) = key {
        if let ResignOutcome::Skipped(scheme) = resign(&mut record, key) {
            sink.emit(TransferEvent::ResignSkipped {
                hash: record.hash,
                scheme,
            });
        }
    }
    record
}
