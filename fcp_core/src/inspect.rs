use serde::Serialize;
use std::collections::BTreeMap;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};

use crate::record::{Category, CategorySet};
use crate::transfer::codec::{CodecError, Format, FrameReader};

/// Record counts of an export file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InspectSummary {
    pub frames: u64,
    pub total: u64,
    pub by_category: BTreeMap<Category, u64>,
}

impl std::fmt::Display for InspectSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Total records: {}", self.total)?;
        for (category, count) in &self.by_category {
            writeln!(f, "{}: {}", category, count)?;
        }
        Ok(())
    }
}

/// Walk an export file, counting records and optionally dumping the enabled
/// ones as one JSON array per batch to `out`.
pub async fn inspect<R, W>(
    reader: R,
    format: Format,
    filters: CategorySet,
    out: &mut W,
    dump: bool,
) -> Result<InspectSummary, CodecError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut frames = FrameReader::new(reader, format);
    let mut summary = InspectSummary::default();

    loop {
        let batch = match frames.read_batch().await {
            Ok(batch) => batch,
            Err(CodecError::EndOfStream) => break,
            Err(e) => return Err(e),
        };
        summary.frames += 1;
        summary.total += batch.len() as u64;
        for record in &batch.records {
            *summary.by_category.entry(record.category).or_default() += 1;
        }

        if dump {
            let shown: Vec<_> = batch
                .records
                .iter()
                .filter(|record| filters.contains(record.category))
                .collect();
            if shown.is_empty() {
                continue;
            }
            let mut line =
                serde_json::to_vec(&shown).map_err(|e| CodecError::Encoding(e.to_string()))?;
            line.push(b'\n');
            out.write_all(&line).await?;
        }
    }

    out.flush().await?;
    Ok(summary)
}
