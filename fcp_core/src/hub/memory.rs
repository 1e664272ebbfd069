//! In-process hub.
//!
//! Serves paginated collections the way a remote hub does (opaque cursor,
//! empty cursor on the last page) and accepts submissions with the same kinds
//! of rejections: duplicates, invalid signatures, and explicit rejects.

use ed25519_dalek::SigningKey;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::Duration;
use tokio::sync::Mutex;

use super::{HubClient, HubError};
use crate::record::{Batch, Category, Record, RecordHash};
use crate::transfer::constants::DEFAULT_PAGE_SIZE;
use crate::transfer::resign::verify;

#[derive(Default)]
struct HubState {
    casts: BTreeMap<u64, Vec<Record>>,
    reactions: BTreeMap<u64, Vec<Record>>,
    links: BTreeMap<u64, Vec<Record>>,
    names: HashMap<String, u64>,
    rejected: HashSet<RecordHash>,
    /// (hash, signer) pairs already stored
    stored: HashSet<(RecordHash, Vec<u8>)>,
    accepted: Vec<Record>,
    pages_served: usize,
    fail_after_pages: Option<usize>,
    verify_signatures: bool,
    latency: Option<Duration>,
}

impl HubState {
    fn collection(&self, category: Category) -> &BTreeMap<u64, Vec<Record>> {
        match category {
            Category::Cast => &self.casts,
            Category::Reaction => &self.reactions,
            Category::Link => &self.links,
        }
    }

    fn collection_mut(&mut self, category: Category) -> &mut BTreeMap<u64, Vec<Record>> {
        match category {
            Category::Cast => &mut self.casts,
            Category::Reaction => &mut self.reactions,
            Category::Link => &mut self.links,
        }
    }
}

#[derive(Default)]
pub struct MemoryHub {
    state: Mutex<HubState>,
}

impl MemoryHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append records to the `category` collection of `fid`
    pub fn with_records(mut self, fid: u64, category: Category, records: Vec<Record>) -> Self {
        self.state
            .get_mut()
            .collection_mut(category)
            .entry(fid)
            .or_default()
            .extend(records);
        self
    }

    pub fn with_name(mut self, name: &str, fid: u64) -> Self {
        self.state.get_mut().names.insert(name.to_string(), fid);
        self
    }

    /// Reject submissions of records with these hashes
    pub fn reject(mut self, hashes: impl IntoIterator<Item = RecordHash>) -> Self {
        self.state.get_mut().rejected.extend(hashes);
        self
    }

    /// Serve `pages` pages successfully, then fail every read
    pub fn fail_after_pages(mut self, pages: usize) -> Self {
        self.state.get_mut().fail_after_pages = Some(pages);
        self
    }

    /// Reject submissions whose signature does not verify
    pub fn verify_signatures(mut self, enabled: bool) -> Self {
        self.state.get_mut().verify_signatures = enabled;
        self
    }

    /// Delay every call by `latency`
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.state.get_mut().latency = Some(latency);
        self
    }

    /// Records accepted by `submit`, in submission order
    pub async fn accepted(&self) -> Vec<Record> {
        self.state.lock().await.accepted.clone()
    }

    pub async fn pages_served(&self) -> usize {
        self.state.lock().await.pages_served
    }

    async fn delay(&self) {
        let latency = self.state.lock().await.latency;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }
}

fn decode_cursor(cursor: &[u8]) -> Result<usize, HubError> {
    if cursor.is_empty() {
        return Ok(0);
    }
    let raw: [u8; 8] = cursor
        .try_into()
        .map_err(|_| HubError::Remote("invalid page token".to_string()))?;
    Ok(u64::from_be_bytes(raw) as usize)
}

impl HubClient for MemoryHub {
    async fn resolve_identifier(&self, name: &str) -> Result<u64, HubError> {
        self.delay().await;
        let state = self.state.lock().await;
        state
            .names
            .get(name)
            .copied()
            .ok_or_else(|| HubError::NotFound(name.to_string()))
    }

    async fn read_page(
        &self,
        category: Category,
        fid: u64,
        cursor: &[u8],
        page_size: u32,
    ) -> Result<Batch, HubError> {
        self.delay().await;
        let mut state = self.state.lock().await;

        if let Some(limit) = state.fail_after_pages {
            if state.pages_served >= limit {
                return Err(HubError::Remote("hub unavailable".to_string()));
            }
        }

        let start = decode_cursor(cursor)?;
        let page_size = if page_size == 0 {
            DEFAULT_PAGE_SIZE
        } else {
            page_size
        } as usize;

        let (records, next_cursor) = match state.collection(category).get(&fid) {
            Some(all) => {
                let start = start.min(all.len());
                let end = (start + page_size).min(all.len());
                let next = if end < all.len() {
                    (end as u64).to_be_bytes().to_vec()
                } else {
                    Vec::new()
                };
                (all[start..end].to_vec(), next)
            }
            None => (Vec::new(), Vec::new()),
        };

        state.pages_served += 1;
        Ok(Batch::new(records, next_cursor))
    }

    async fn submit(&self, record: &Record) -> Result<(), HubError> {
        self.delay().await;
        let mut state = self.state.lock().await;

        if state.verify_signatures && !verify(record) {
            return Err(HubError::Remote(format!("invalid signature for {}", record.hash)));
        }
        if state.rejected.contains(&record.hash) {
            return Err(HubError::Remote(format!("message {} rejected", record.hash)));
        }
        let key = (record.hash, record.signer.clone());
        if state.stored.contains(&key) {
            return Err(HubError::Remote(format!("duplicate message {}", record.hash)));
        }

        state.stored.insert(key);
        state.accepted.push(record.clone());
        Ok(())
    }
}

/// Build `count` distinct signed records for one account's collection
pub fn sample_records(category: Category, fid: u64, count: usize, key: &SigningKey) -> Vec<Record> {
    (0..count)
        .map(|i| {
            let data = format!("{}:{}:{}", category.label(), fid, i).into_bytes();
            Record::signed(category, data, key)
        })
        .collect()
}
