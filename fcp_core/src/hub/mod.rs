//! Hub client capability consumed by the transfer code.
//!
//! The RPC transport itself lives outside this crate. Anything that can
//! resolve names, serve pages of records and accept submissions can drive a
//! transfer; [`MemoryHub`] is the in-process implementation.

pub mod memory;

use std::future::Future;
use std::time::Duration;
use thiserror::Error;

use crate::record::{Batch, Category, Record};

pub use memory::{MemoryHub, sample_records};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HubError {
    #[error("identifier not found: {0}")]
    NotFound(String),
    #[error("remote error: {0}")]
    Remote(String),
    #[error("remote call timed out after {0:?}")]
    Timeout(Duration),
}

/// Operations a hub must offer for downloads and uploads.
pub trait HubClient: Sync {
    /// Resolve a human-readable name to a numeric account id
    fn resolve_identifier(&self, name: &str) -> impl Future<Output = Result<u64, HubError>> + Send;

    /// Read one page of a category's collection for `fid`, starting at
    /// `cursor` (empty for the first page).
    fn read_page(
        &self,
        category: Category,
        fid: u64,
        cursor: &[u8],
        page_size: u32,
    ) -> impl Future<Output = Result<Batch, HubError>> + Send;

    /// Submit a single record
    fn submit(&self, record: &Record) -> impl Future<Output = Result<(), HubError>> + Send;
}

/// Run a single remote call under an optional timeout.
pub async fn call<T, F>(timeout: Option<Duration>, fut: F) -> Result<T, HubError>
where
    F: Future<Output = Result<T, HubError>>,
{
    match timeout {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| HubError::Timeout(limit))?,
        None => fut.await,
    }
}

/// Account reference as typed by a user: numeric fid or a name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identifier {
    Fid(u64),
    Name(String),
}

impl Identifier {
    pub fn parse(input: &str) -> Self {
        let trimmed = input.trim().trim_start_matches('/');
        match trimmed.parse::<u64>() {
            Ok(fid) => Identifier::Fid(fid),
            Err(_) => Identifier::Name(trimmed.to_string()),
        }
    }

    /// Numeric ids resolve to themselves; names go through the hub
    pub async fn resolve<H: HubClient>(
        &self,
        hub: &H,
        timeout: Option<Duration>,
    ) -> Result<u64, HubError> {
        match self {
            Identifier::Fid(fid) => Ok(*fid),
            Identifier::Name(name) => call(timeout, hub.resolve_identifier(name)).await,
        }
    }
}

impl std::fmt::Display for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Identifier::Fid(fid) => write!(f, "{}", fid),
            Identifier::Name(name) => f.write_str(name),
        }
    }
}
