use ed25519_dalek::{SECRET_KEY_LENGTH, SigningKey};
use std::path::Path;
use thiserror::Error;
use tokio::fs;

#[derive(Debug, Error)]
pub enum KeyError {
    #[error("invalid app key: {0}")]
    InvalidHex(#[from] hex::FromHexError),
    #[error("invalid app key length: {0} bytes, expected 32")]
    InvalidLength(usize),
    #[error("failed to read app key file: {0}")]
    Io(#[from] std::io::Error),
}

/// Parse an app key given as hex (optionally `0x`-prefixed) Ed25519 seed
pub fn parse_app_key(input: &str) -> Result<SigningKey, KeyError> {
    let trimmed = input.trim();
    let hex_str = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    let bytes = hex::decode(hex_str)?;
    let seed: [u8; SECRET_KEY_LENGTH] = bytes
        .as_slice()
        .try_into()
        .map_err(|_| KeyError::InvalidLength(bytes.len()))?;
    Ok(SigningKey::from_bytes(&seed))
}

/// Load an app key stored as hex text in a file
pub async fn load_app_key(path: &Path) -> Result<SigningKey, KeyError> {
    tracing::info!("Loading app key from {:?}", path);
    let content = fs::read_to_string(path).await?;
    parse_app_key(&content)
}
