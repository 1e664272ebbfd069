use tokio::io::{AsyncRead, AsyncWrite};

use super::codec::{CodecError, Format, FrameReader, FrameWriter};
use super::session::{Aborted, TransferReport, TransferSession};
use super::upload::prepare_record;
use crate::config::TransferOptions;
use crate::{ProgressSink, TransferEvent};

/// Re-frame an export file without touching a hub.
///
/// Reads `input` frames from `reader`, drops records of disabled categories,
/// resigns when a key is configured, and writes `options.format` frames to
/// `writer`. Batch boundaries and cursors are kept; a batch left empty by the
/// filter is not written.
pub async fn convert<R, W>(
    reader: R,
    input: Format,
    writer: &mut W,
    options: &TransferOptions,
    sink: &dyn ProgressSink,
) -> Result<TransferReport, Aborted>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut session = TransferSession::new("convert");
    let mut frames_in = FrameReader::new(reader, input);
    let mut frames_out = FrameWriter::new(writer, options.format);

    loop {
        let mut batch = match frames_in.read_batch().await {
            Ok(batch) => batch,
            Err(CodecError::EndOfStream) => break,
            Err(e) => {
                let _ = frames_out.flush().await;
                return Err(session.abort(e));
            }
        };
        session.stream();

        let seen = batch.records.len();
        session.report.total += seen as u64;
        batch.records = batch
            .records
            .into_iter()
            .filter(|record| options.filters.contains(record.category))
            .map(|record| prepare_record(record, options.signing_key.as_ref(), sink))
            .collect();
        if batch.records.is_empty() && seen > 0 {
            continue;
        }

        if let Err(e) = frames_out.write_batch(&batch).await {
            return Err(session.abort(e));
        }
        session.report.success += batch.records.len() as u64;
        session.report.frames += 1;
    }

    if let Err(e) = frames_out.flush().await {
        return Err(session.abort(e));
    }
    let report = session.complete();
    sink.emit(TransferEvent::Finished(report));
    Ok(report)
}
