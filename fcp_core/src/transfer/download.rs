use std::path::{Path, PathBuf};
use tokio::io::AsyncWrite;
use tracing::info;

use super::Transfer;
use super::codec::FrameWriter;
use super::fetcher::PageFetcher;
use super::session::{Aborted, TransferError, TransferReport, TransferSession};
use super::utils::{backup_file_name, display_cursor, open_secure_file};
use crate::TransferEvent;
use crate::hub::{HubClient, Identifier};
use crate::record::Category;

/// One per-category file written by [`Transfer::backup_to_dir`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupFile {
    pub category: Category,
    pub path: PathBuf,
    pub records: u64,
}

impl<'a, H: HubClient> Transfer<'a, H> {
    /// Download every enabled category for `identifier` into `writer`.
    ///
    /// Categories run in the fixed order casts, reactions, links. The first
    /// remote or write error aborts the whole download; frames already
    /// written stay valid.
    pub async fn download<W: AsyncWrite + Unpin>(
        &self,
        identifier: &Identifier,
        writer: &mut W,
    ) -> Result<TransferReport, Aborted> {
        let mut session = TransferSession::new("download");
        let fid = match identifier.resolve(self.hub, self.options.call_timeout).await {
            Ok(fid) => fid,
            Err(e) => return Err(session.abort(e)),
        };
        info!("Downloading data for FID: {}", fid);

        let mut frames = FrameWriter::new(writer, self.options.format);
        for category in self.options.filters.iter() {
            session.stream();
            if let Err(e) = self
                .download_category(category, fid, &mut frames, &mut session)
                .await
            {
                let _ = frames.flush().await;
                return Err(session.abort(e));
            }
        }
        if let Err(e) = frames.flush().await {
            return Err(session.abort(e));
        }

        let report = session.complete();
        self.sink.emit(TransferEvent::Finished(report));
        Ok(report)
    }

    /// Download into a file, replacing its contents.
    ///
    /// The file is only opened once the identifier has resolved, so an
    /// unknown name leaves an existing file untouched.
    pub async fn download_to_path(
        &self,
        identifier: &Identifier,
        path: &Path,
    ) -> Result<TransferReport, Aborted> {
        let fid = identifier
            .resolve(self.hub, self.options.call_timeout)
            .await
            .map_err(|e| TransferSession::new("download").abort(e))?;
        let mut file = open_secure_file(path, false)
            .await
            .map_err(|e| TransferSession::new("download").abort(e))?;
        self.download(&Identifier::Fid(fid), &mut file).await
    }

    /// Write one backup file per enabled category into `dir`.
    ///
    /// Files are named `{fid:06}_{timestamp}_{category}.backup` and opened in
    /// append mode, so rerunning within the same second extends them.
    pub async fn backup_to_dir(
        &self,
        identifier: &Identifier,
        dir: &Path,
    ) -> Result<Vec<BackupFile>, Aborted> {
        let mut session = TransferSession::new("backup");
        let fid = match identifier.resolve(self.hub, self.options.call_timeout).await {
            Ok(fid) => fid,
            Err(e) => return Err(session.abort(e)),
        };
        if let Err(e) = tokio::fs::create_dir_all(dir).await {
            return Err(session.abort(e));
        }

        let now = chrono::Local::now();
        let mut files = Vec::new();
        for category in self.options.filters.iter() {
            session.stream();
            let path = dir.join(backup_file_name(fid, &now, category));
            let file = match open_secure_file(&path, true).await {
                Ok(file) => file,
                Err(e) => return Err(session.abort(e)),
            };

            let mut frames = FrameWriter::new(file, self.options.format);
            let records = match self
                .download_category(category, fid, &mut frames, &mut session)
                .await
            {
                Ok(records) => records,
                Err(e) => {
                    let _ = frames.flush().await;
                    return Err(session.abort(e));
                }
            };
            if let Err(e) = frames.flush().await {
                return Err(session.abort(e));
            }

            info!("Saved {} {} to {:?}", records, category, path);
            files.push(BackupFile {
                category,
                path,
                records,
            });
        }

        let report = session.complete();
        self.sink.emit(TransferEvent::Finished(report));
        Ok(files)
    }

    /// Fetch every page of one category and append each as a frame.
    async fn download_category<W: AsyncWrite + Unpin>(
        &self,
        category: Category,
        fid: u64,
        frames: &mut FrameWriter<W>,
        session: &mut TransferSession,
    ) -> Result<u64, TransferError> {
        let mut fetcher = PageFetcher::new(self.hub, category, fid, self.options.page_size)
            .with_timeout(self.options.call_timeout);
        let mut count = 0u64;

        loop {
            if self.cancel.is_cancelled() {
                return Err(TransferError::Cancelled);
            }
            let Some(batch) = fetcher.next_page().await? else {
                break;
            };

            frames.write_batch(&batch).await?;
            let written = batch.len() as u64;
            count += written;
            session.report.total += written;
            session.report.success += written;
            session.report.frames += 1;

            self.sink.emit(TransferEvent::PageSaved {
                category,
                count,
                cursor: display_cursor(&batch.next_cursor),
            });
        }

        info!("{}: {} records in {} pages", category, count, fetcher.pages());
        self.sink.emit(TransferEvent::CategoryDone { category, count });
        Ok(count)
    }
}
