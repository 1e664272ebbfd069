//! Record and batch data model.
//!
//! A [`Record`] is one signed social-graph event as stored by a hub. The
//! transfer code treats `data` as opaque bytes; only the authentication
//! envelope (hash, signature, signer) is ever rewritten, and only by the
//! resigning engine.

use ed25519_dalek::{Signer, SigningKey};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::transfer::constants::HASH_LEN;
use crate::transfer::hash::hash_data;

/// The three record collections a hub exposes per account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    Cast,
    Reaction,
    Link,
}

impl Category {
    /// Fixed processing order for downloads and reports.
    pub const ALL: [Category; 3] = [Category::Cast, Category::Reaction, Category::Link];

    /// Plural label used in file names, flags and progress output
    pub fn label(self) -> &'static str {
        match self {
            Category::Cast => "casts",
            Category::Reaction => "reactions",
            Category::Link => "links",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Set of enabled categories. Iteration always follows [`Category::ALL`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySet {
    pub casts: bool,
    pub reactions: bool,
    pub links: bool,
}

impl CategorySet {
    pub fn all() -> Self {
        Self {
            casts: true,
            reactions: true,
            links: true,
        }
    }

    pub fn none() -> Self {
        Self {
            casts: false,
            reactions: false,
            links: false,
        }
    }

    pub fn only(category: Category) -> Self {
        let mut set = Self::none();
        set.set(category, true);
        set
    }

    pub fn contains(&self, category: Category) -> bool {
        match category {
            Category::Cast => self.casts,
            Category::Reaction => self.reactions,
            Category::Link => self.links,
        }
    }

    pub fn set(&mut self, category: Category, enabled: bool) {
        match category {
            Category::Cast => self.casts = enabled,
            Category::Reaction => self.reactions = enabled,
            Category::Link => self.links = enabled,
        }
    }

    pub fn is_empty(&self) -> bool {
        !(self.casts || self.reactions || self.links)
    }

    pub fn iter(&self) -> impl Iterator<Item = Category> + '_ {
        Category::ALL.into_iter().filter(|c| self.contains(*c))
    }
}

impl Default for CategorySet {
    fn default() -> Self {
        Self::all()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HashScheme {
    None,
    #[default]
    Blake3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SignatureScheme {
    None,
    #[default]
    Ed25519,
    Eip712,
}

impl fmt::Display for SignatureScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SignatureScheme::None => "none",
            SignatureScheme::Ed25519 => "ed25519",
            SignatureScheme::Eip712 => "eip712",
        };
        f.write_str(name)
    }
}

/// 20-byte content digest of a record's `data`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct RecordHash([u8; HASH_LEN]);

impl RecordHash {
    pub fn from_bytes(bytes: [u8; HASH_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; HASH_LEN] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; HASH_LEN]
    }
}

impl TryFrom<&[u8]> for RecordHash {
    type Error = std::array::TryFromSliceError;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        Ok(Self(value.try_into()?))
    }
}

impl fmt::Display for RecordHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for RecordHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecordHash({})", self)
    }
}

impl Serialize for RecordHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.to_string())
        } else {
            self.0.serialize(serializer)
        }
    }
}

impl<'de> Deserialize<'de> for RecordHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            let text = String::deserialize(deserializer)?;
            let raw = hex::decode(text.trim_start_matches("0x")).map_err(serde::de::Error::custom)?;
            RecordHash::try_from(raw.as_slice())
                .map_err(|_| serde::de::Error::invalid_length(raw.len(), &"20 bytes"))
        } else {
            Ok(Self(<[u8; HASH_LEN]>::deserialize(deserializer)?))
        }
    }
}

/// Byte fields are base64 strings in JSON and raw sequences in bincode.
mod byte_field {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(bytes: &Vec<u8>, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_str(&STANDARD.encode(bytes))
        } else {
            bytes.serialize(serializer)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        if deserializer.is_human_readable() {
            let text = String::deserialize(deserializer)?;
            STANDARD.decode(text).map_err(serde::de::Error::custom)
        } else {
            Vec::<u8>::deserialize(deserializer)
        }
    }
}

/// One signed record: opaque payload plus authentication envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub category: Category,
    #[serde(with = "byte_field")]
    pub data: Vec<u8>,
    pub hash: RecordHash,
    pub hash_scheme: HashScheme,
    #[serde(with = "byte_field")]
    pub signature: Vec<u8>,
    pub signature_scheme: SignatureScheme,
    /// Public key of the signer
    #[serde(with = "byte_field")]
    pub signer: Vec<u8>,
}

impl Record {
    /// Build a record from raw data, hashing and signing it with `key`.
    pub fn signed(category: Category, data: Vec<u8>, key: &SigningKey) -> Self {
        let hash = hash_data(&data);
        let signature = key.sign(hash.as_bytes());
        Self {
            category,
            data,
            hash,
            hash_scheme: HashScheme::Blake3,
            signature: signature.to_bytes().to_vec(),
            signature_scheme: SignatureScheme::Ed25519,
            signer: key.verifying_key().to_bytes().to_vec(),
        }
    }
}

/// One page of records plus the cursor for the next page.
///
/// An empty `next_cursor` means the collection is exhausted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Batch {
    pub records: Vec<Record>,
    #[serde(with = "byte_field")]
    pub next_cursor: Vec<u8>,
}

impl Batch {
    pub fn new(records: Vec<Record>, next_cursor: Vec<u8>) -> Self {
        Self {
            records,
            next_cursor,
        }
    }

    pub fn is_last(&self) -> bool {
        self.next_cursor.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
