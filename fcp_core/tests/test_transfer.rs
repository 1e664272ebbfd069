//! End-to-end download / upload tests against the in-memory hub.

use ed25519_dalek::SigningKey;
use fcp_core::hub::sample_records;
use fcp_core::transfer::FrameReader;
use fcp_core::transfer::resign::verify;
use fcp_core::{
    Batch, Category, CategorySet, CodecError, Format, HubError, Identifier, MemoryHub, Record,
    SignatureScheme, Transfer, TransferError, TransferEvent, TransferOptions,
};
use fcp_core::transfer::codec::encode;
use fcp_core::ProgressSink;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

const FID: u64 = 1234;

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter("info")
        .with_test_writer()
        .try_init()
        .ok();
}

fn author_key() -> SigningKey {
    SigningKey::from_bytes(&[31u8; 32])
}

fn options() -> TransferOptions {
    TransferOptions::default()
}

async fn read_all(bytes: &[u8], format: Format) -> Vec<Batch> {
    let mut frames = FrameReader::new(bytes, format);
    let mut batches = Vec::new();
    loop {
        match frames.read_batch().await {
            Ok(batch) => batches.push(batch),
            Err(CodecError::EndOfStream) => break,
            Err(e) => panic!("unexpected codec error: {}", e),
        }
    }
    batches
}

#[tokio::test]
async fn test_download_then_upload_2500_records() {
    init_tracing();
    let records = sample_records(Category::Cast, FID, 2500, &author_key());
    let source = MemoryHub::new().with_records(FID, Category::Cast, records.clone());
    let opts = options()
        .with_filters(CategorySet::only(Category::Cast))
        .with_page_size(1000);

    let mut file = Vec::new();
    let report = Transfer::new(&source, opts.clone())
        .download(&Identifier::Fid(FID), &mut file)
        .await
        .expect("Download should succeed");
    assert_eq!(report.total, 2500);
    assert_eq!(report.frames, 3);

    let batches = read_all(&file, Format::Binary).await;
    let sizes: Vec<usize> = batches.iter().map(Batch::len).collect();
    assert_eq!(sizes, vec![1000, 1000, 500]);

    let destination = MemoryHub::new().verify_signatures(true);
    let report = Transfer::new(&destination, opts)
        .upload(&file[..])
        .await
        .expect("Upload should succeed");

    assert_eq!(report.total, 2500);
    assert_eq!(report.success, 2500);
    assert_eq!(report.error, 0);
    assert_eq!(destination.accepted().await, records);
}

#[tokio::test]
async fn test_upload_counts_rejections_without_aborting() {
    let records = sample_records(Category::Cast, FID, 2500, &author_key());
    let source = MemoryHub::new().with_records(FID, Category::Cast, records.clone());
    let opts = options().with_page_size(1000);

    let mut file = Vec::new();
    Transfer::new(&source, opts.clone())
        .download(&Identifier::Fid(FID), &mut file)
        .await
        .unwrap();

    let rejected: Vec<_> = records.iter().step_by(250).map(|r| r.hash).collect();
    assert_eq!(rejected.len(), 10);
    let destination = MemoryHub::new().reject(rejected.clone());

    let (tx, mut rx) = mpsc::unbounded_channel();
    let report = Transfer::new(&destination, opts)
        .with_sink(Arc::new(tx))
        .upload(&file[..])
        .await
        .expect("Rejections must not abort the upload");

    assert_eq!(report.total, 2500);
    assert_eq!(report.success, 2490);
    assert_eq!(report.error, 10);

    let mut failed = Vec::new();
    let mut finished = None;
    while let Ok(event) = rx.try_recv() {
        match event {
            TransferEvent::RecordFailed { hash, .. } => failed.push(hash),
            TransferEvent::Finished(report) => finished = Some(report),
            _ => {}
        }
    }
    assert_eq!(failed, rejected);
    assert_eq!(finished, Some(report));
}

#[tokio::test]
async fn test_download_writes_categories_in_fixed_order() {
    let hub = MemoryHub::new()
        .with_records(FID, Category::Link, sample_records(Category::Link, FID, 2, &author_key()))
        .with_records(FID, Category::Cast, sample_records(Category::Cast, FID, 3, &author_key()))
        .with_records(
            FID,
            Category::Reaction,
            sample_records(Category::Reaction, FID, 4, &author_key()),
        );

    let mut file = Vec::new();
    let report = Transfer::new(&hub, options().with_page_size(10))
        .download(&Identifier::Fid(FID), &mut file)
        .await
        .unwrap();
    assert_eq!(report.total, 9);

    let batches = read_all(&file, Format::Binary).await;
    let categories: Vec<Category> = batches.iter().map(|b| b.records[0].category).collect();
    assert_eq!(
        categories,
        vec![Category::Cast, Category::Reaction, Category::Link]
    );
}

#[tokio::test]
async fn test_upload_skips_filtered_categories() {
    let hub = MemoryHub::new()
        .with_records(FID, Category::Cast, sample_records(Category::Cast, FID, 3, &author_key()))
        .with_records(FID, Category::Link, sample_records(Category::Link, FID, 2, &author_key()));
    let mut file = Vec::new();
    Transfer::new(&hub, options())
        .download(&Identifier::Fid(FID), &mut file)
        .await
        .unwrap();

    let destination = MemoryHub::new();
    let links_only = options().with_filters(CategorySet::only(Category::Link));
    let report = Transfer::new(&destination, links_only)
        .upload(&file[..])
        .await
        .unwrap();

    assert_eq!(report.total, 5);
    assert_eq!(report.success, 2);
    assert_eq!(report.skipped(), 3);
    assert!(
        destination
            .accepted()
            .await
            .iter()
            .all(|r| r.category == Category::Link)
    );
}

#[tokio::test]
async fn test_upload_with_signing_key_resigns_records() {
    let app_key = SigningKey::from_bytes(&[77u8; 32]);
    let mut records = sample_records(Category::Reaction, FID, 5, &author_key());
    records[4].signature_scheme = SignatureScheme::Eip712;
    let hub = MemoryHub::new().with_records(FID, Category::Reaction, records.clone());

    let mut file = Vec::new();
    Transfer::new(&hub, options())
        .download(&Identifier::Fid(FID), &mut file)
        .await
        .unwrap();

    let destination = MemoryHub::new();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let report = Transfer::new(&destination, options().with_signing_key(app_key.clone()))
        .with_sink(Arc::new(tx))
        .upload(&file[..])
        .await
        .unwrap();
    assert_eq!(report.success, 5);

    let accepted = destination.accepted().await;
    let app_public = app_key.verifying_key().to_bytes().to_vec();
    for (original, uploaded) in records.iter().zip(&accepted).take(4) {
        assert_eq!(uploaded.hash, original.hash);
        assert_eq!(uploaded.data, original.data);
        assert_eq!(uploaded.signer, app_public);
        assert!(verify(uploaded));
    }
    // Unsupported scheme goes up untouched
    assert_eq!(accepted[4], records[4]);

    let mut skipped = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let TransferEvent::ResignSkipped { hash, scheme } = event {
            skipped.push((hash, scheme));
        }
    }
    assert_eq!(skipped, vec![(records[4].hash, SignatureScheme::Eip712)]);
}

#[tokio::test]
async fn test_download_resolves_names() {
    let hub = MemoryHub::new()
        .with_name("alice", FID)
        .with_records(FID, Category::Cast, sample_records(Category::Cast, FID, 4, &author_key()));

    let mut file = Vec::new();
    let report = Transfer::new(&hub, options().with_filters(CategorySet::only(Category::Cast)))
        .download(&Identifier::parse("alice"), &mut file)
        .await
        .unwrap();
    assert_eq!(report.total, 4);

    let aborted = Transfer::new(&hub, options())
        .download(&Identifier::parse("bob"), &mut Vec::new())
        .await
        .expect_err("Unknown name should abort");
    assert!(matches!(
        aborted.source,
        TransferError::Hub(HubError::NotFound(ref name)) if name == "bob"
    ));
    assert_eq!(aborted.report.total, 0);
}

#[tokio::test]
async fn test_download_aborts_on_remote_error_and_keeps_written_frames() {
    let hub = MemoryHub::new()
        .with_records(FID, Category::Cast, sample_records(Category::Cast, FID, 30, &author_key()))
        .fail_after_pages(2);

    let mut file = Vec::new();
    let aborted = Transfer::new(&hub, options().with_page_size(10))
        .download(&Identifier::Fid(FID), &mut file)
        .await
        .expect_err("Remote failure should abort");

    assert!(matches!(
        aborted.source,
        TransferError::Hub(HubError::Remote(_))
    ));
    assert_eq!(aborted.report.total, 20);
    assert_eq!(aborted.report.frames, 2);

    // What was written before the failure is still a valid file
    let batches = read_all(&file, Format::Binary).await;
    assert_eq!(batches.len(), 2);
}

#[tokio::test]
async fn test_upload_aborts_on_truncated_source() {
    let hub = MemoryHub::new()
        .with_records(FID, Category::Cast, sample_records(Category::Cast, FID, 6, &author_key()));
    let mut file = Vec::new();
    let casts_only = options().with_filters(CategorySet::only(Category::Cast));
    Transfer::new(&hub, casts_only.clone().with_page_size(3))
        .download(&Identifier::Fid(FID), &mut file)
        .await
        .unwrap();
    file.truncate(file.len() - 5);

    let destination = MemoryHub::new();
    let aborted = Transfer::new(&destination, casts_only)
        .upload(&file[..])
        .await
        .expect_err("Truncated file must abort");

    assert!(matches!(
        aborted.source,
        TransferError::Codec(CodecError::TruncatedFrame { .. })
    ));
    assert_eq!(aborted.report.total, 3);
    assert_eq!(aborted.report.success, 3);
}

#[tokio::test]
async fn test_upload_of_empty_file() {
    let hub = MemoryHub::new();
    let report = Transfer::new(&hub, options())
        .upload(&[][..])
        .await
        .unwrap();
    assert_eq!(report.total, 0);
    assert_eq!(report.frames, 0);
}

#[tokio::test]
async fn test_cancelled_transfer_stops_at_boundary() {
    let hub = MemoryHub::new()
        .with_records(FID, Category::Cast, sample_records(Category::Cast, FID, 10, &author_key()));
    let cancel = CancellationToken::new();
    cancel.cancel();

    let mut file = Vec::new();
    let aborted = Transfer::new(&hub, options())
        .with_cancel(cancel.clone())
        .download(&Identifier::Fid(FID), &mut file)
        .await
        .expect_err("Cancelled download should abort");
    assert!(matches!(aborted.source, TransferError::Cancelled));
    assert!(file.is_empty());
    assert_eq!(hub.pages_served().await, 0);
}

#[tokio::test]
async fn test_slow_hub_times_out_per_call() {
    let hub = MemoryHub::new()
        .with_records(FID, Category::Cast, sample_records(Category::Cast, FID, 2, &author_key()))
        .with_latency(Duration::from_millis(300));

    let aborted = Transfer::new(
        &hub,
        options().with_call_timeout(Some(Duration::from_millis(20))),
    )
    .download(&Identifier::Fid(FID), &mut Vec::new())
    .await
    .expect_err("Slow hub should time out");

    assert!(matches!(
        aborted.source,
        TransferError::Hub(HubError::Timeout(_))
    ));
}

#[tokio::test]
async fn test_download_to_path_and_upload_from_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("export.data");
    let records = sample_records(Category::Link, FID, 12, &author_key());
    let hub = MemoryHub::new().with_records(FID, Category::Link, records.clone());

    let report = Transfer::new(&hub, options().with_page_size(5))
        .download_to_path(&Identifier::Fid(FID), &path)
        .await
        .unwrap();
    assert_eq!(report.total, 12);

    let destination = MemoryHub::new();
    let report = Transfer::new(&destination, options())
        .upload_from_path(&path)
        .await
        .unwrap();
    assert_eq!(report.success, 12);
    assert_eq!(destination.accepted().await, records);

    let missing = Transfer::new(&destination, options())
        .upload_from_path(&dir.path().join("missing.data"))
        .await
        .expect_err("Missing file should abort");
    assert!(matches!(missing.source, TransferError::Io(_)));
}

#[tokio::test]
async fn test_backup_to_dir_writes_one_file_per_category() {
    let dir = tempfile::tempdir().unwrap();
    let backup_dir = dir.path().join("backups");
    let hub = MemoryHub::new()
        .with_records(FID, Category::Cast, sample_records(Category::Cast, FID, 3, &author_key()))
        .with_records(FID, Category::Link, sample_records(Category::Link, FID, 1, &author_key()));

    let files = Transfer::new(&hub, options())
        .backup_to_dir(&Identifier::Fid(FID), &backup_dir)
        .await
        .unwrap();

    let categories: Vec<Category> = files.iter().map(|f| f.category).collect();
    assert_eq!(categories, Category::ALL.to_vec());
    let counts: Vec<u64> = files.iter().map(|f| f.records).collect();
    assert_eq!(counts, vec![3, 0, 1]);

    for file in &files {
        let name = file.path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("001234_"));
        assert!(name.ends_with(&format!("_{}.backup", file.category.label())));

        let bytes = std::fs::read(&file.path).unwrap();
        let records: Vec<Record> = read_all(&bytes, Format::Binary)
            .await
            .into_iter()
            .flat_map(|b| b.records)
            .collect();
        assert_eq!(records.len() as u64, file.records);
    }
}

#[tokio::test]
async fn test_download_reports_page_progress() {
    let hub = MemoryHub::new()
        .with_records(FID, Category::Cast, sample_records(Category::Cast, FID, 5, &author_key()));
    let (tx, mut rx) = mpsc::unbounded_channel();

    let opts = options()
        .with_filters(CategorySet::only(Category::Cast))
        .with_page_size(2);
    Transfer::new(&hub, opts)
        .with_sink(Arc::new(tx))
        .download(&Identifier::Fid(FID), &mut Vec::new())
        .await
        .unwrap();

    let mut counts = Vec::new();
    let mut done = None;
    while let Ok(event) = rx.try_recv() {
        match event {
            TransferEvent::PageSaved { count, cursor, .. } => {
                counts.push((count, cursor.is_empty()))
            }
            TransferEvent::CategoryDone { category, count } => done = Some((category, count)),
            _ => {}
        }
    }
    assert_eq!(counts, vec![(2, false), (4, false), (5, true)]);
    assert_eq!(done, Some((Category::Cast, 5)));
}

#[tokio::test]
async fn test_download_to_path_keeps_existing_file_on_unknown_name() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("existing.data");
    std::fs::write(&path, b"previous export content").unwrap();

    let hub = MemoryHub::new();
    let aborted = Transfer::new(&hub, options())
        .download_to_path(&Identifier::parse("nobody"), &path)
        .await
        .expect_err("Unknown name should abort");

    assert!(matches!(
        aborted.source,
        TransferError::Hub(HubError::NotFound(_))
    ));
    assert_eq!(std::fs::read(&path).unwrap(), b"previous export content");
}

/// Cancels the transfer once `after` records have been submitted
struct CancelAfter {
    token: CancellationToken,
    after: u64,
    submitted: AtomicU64,
}

impl ProgressSink for CancelAfter {
    fn emit(&self, event: TransferEvent) {
        if matches!(event, TransferEvent::RecordSubmitted { .. })
            && self.submitted.fetch_add(1, Ordering::SeqCst) + 1 == self.after
        {
            self.token.cancel();
        }
    }
}

#[tokio::test]
async fn test_upload_cancelled_between_records() {
    let records = sample_records(Category::Cast, FID, 10, &author_key());
    let file = encode(&Batch::new(records.clone(), Vec::new())).unwrap();

    let cancel = CancellationToken::new();
    let sink = CancelAfter {
        token: cancel.clone(),
        after: 4,
        submitted: AtomicU64::new(0),
    };
    let destination = MemoryHub::new();
    let aborted = Transfer::new(&destination, options())
        .with_sink(Arc::new(sink))
        .with_cancel(cancel)
        .upload(&file[..])
        .await
        .expect_err("Cancelled upload should abort");

    assert!(matches!(aborted.source, TransferError::Cancelled));
    assert_eq!(aborted.report.total, 4);
    assert_eq!(aborted.report.success, 4);
    assert_eq!(aborted.report.frames, 1);
    assert_eq!(destination.accepted().await, records[..4]);
}

#[tokio::test]
async fn test_upload_cancelled_before_next_frame() {
    let records = sample_records(Category::Cast, FID, 4, &author_key());
    let mut file = encode(&Batch::new(records[..2].to_vec(), vec![1])).unwrap();
    file.extend(encode(&Batch::new(records[2..].to_vec(), Vec::new())).unwrap());

    let cancel = CancellationToken::new();
    let sink = CancelAfter {
        token: cancel.clone(),
        after: 2,
        submitted: AtomicU64::new(0),
    };
    let destination = MemoryHub::new();
    let aborted = Transfer::new(&destination, options())
        .with_sink(Arc::new(sink))
        .with_cancel(cancel)
        .upload(&file[..])
        .await
        .expect_err("Cancelled upload should abort");

    assert!(matches!(aborted.source, TransferError::Cancelled));
    assert_eq!(aborted.report.total, 2);
    assert_eq!(aborted.report.frames, 1);
}

#[tokio::test]
async fn test_upload_aborts_on_undecodable_frame() {
    let records = sample_records(Category::Cast, FID, 3, &author_key());
    let mut file = encode(&Batch::new(records, Vec::new())).unwrap();
    // Well-formed length prefix, payload that is not a batch
    file.extend_from_slice(&3u32.to_le_bytes());
    file.extend_from_slice(&[0xff, 0xff, 0xff]);

    let destination = MemoryHub::new();
    let aborted = Transfer::new(&destination, options())
        .upload(&file[..])
        .await
        .expect_err("Garbage frame must abort");

    assert!(matches!(
        aborted.source,
        TransferError::Codec(CodecError::Decoding(_))
    ));
    assert_eq!(aborted.report.total, 3);
    assert_eq!(aborted.report.success, 3);
    assert_eq!(aborted.report.frames, 1);
}
