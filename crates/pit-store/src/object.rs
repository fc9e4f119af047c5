use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use pit_types::ObjectId;
use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

/// zstd level used for every stored object.
///
/// Keys are computed over the compressed bytes, so this is part of the
/// repository format: changing it changes every key.
pub const COMPRESSION_LEVEL: i32 = 3;

/// The kind of object stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ObjectKind {
    /// Raw file content.
    Blob,
    /// Directory listing.
    Tree,
    /// Snapshot of a tree with metadata.
    Commit,
    /// Serialized staging index.
    Staging,
}

impl ObjectKind {
    pub const ALL: [ObjectKind; 4] = [Self::Blob, Self::Tree, Self::Commit, Self::Staging];

    /// Tag written into the canonical header.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Blob => "data-blob",
            Self::Tree => "tree",
            Self::Commit => "commit",
            Self::Staging => "staging",
        }
    }

    /// Octal-style mode string shown in the staging index. Cosmetic only.
    pub fn mode(&self) -> &'static str {
        match self {
            Self::Blob => "100644",
            Self::Tree | Self::Staging => "040000",
            Self::Commit => "160000",
        }
    }

    /// Returns `true` if `mode` is one of the strings produced by [`mode`](Self::mode).
    pub fn is_known_mode(mode: &str) -> bool {
        Self::ALL.iter().any(|k| k.mode() == mode)
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// A header carried a tag that names no [`ObjectKind`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown object kind: {0:?}")]
pub struct UnknownKind(pub String);

impl FromStr for ObjectKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.tag() == s)
            .ok_or_else(|| UnknownKind(s.to_string()))
    }
}

/// An immutable, hash-addressed object.
///
/// The canonical form is `"<kind> <size>\0<content>"`. That form is zstd
/// compressed, and the key is the BLAKE3 digest of the compressed bytes, so a
/// key always names one exact stored representation. The compressed bytes and
/// key are computed once at construction.
///
/// Two objects are equal iff their keys are equal.
#[derive(Clone)]
pub struct ContentObject {
    kind: ObjectKind,
    content: Vec<u8>,
    binary: Vec<u8>,
    key: ObjectId,
}

impl ContentObject {
    /// Wrap `content` as an object of the given kind.
    pub fn new(kind: ObjectKind, content: impl Into<Vec<u8>>) -> StoreResult<Self> {
        let content = content.into();
        let canonical = canonical_form(kind, &content);
        let binary = zstd::encode_all(canonical.as_slice(), COMPRESSION_LEVEL)?;
        let key = ObjectId::from_bytes(&binary);
        Ok(Self {
            kind,
            content,
            binary,
            key,
        })
    }

    /// Wrap `content` as a blob.
    pub fn blob(content: impl Into<Vec<u8>>) -> StoreResult<Self> {
        Self::new(ObjectKind::Blob, content)
    }

    pub fn kind(&self) -> ObjectKind {
        self.kind
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }

    /// Payload length in bytes.
    pub fn size(&self) -> usize {
        self.content.len()
    }

    /// The canonical, uncompressed form: `"<kind> <size>\0<content>"`.
    pub fn serialize(&self) -> Vec<u8> {
        canonical_form(self.kind, &self.content)
    }

    /// The compressed canonical form, exactly as it is stored.
    pub fn to_binary(&self) -> &[u8] {
        &self.binary
    }

    /// BLAKE3 digest of [`to_binary`](Self::to_binary).
    pub fn key(&self) -> ObjectId {
        self.key
    }

    /// Decode stored bytes that were fetched under `expected`.
    ///
    /// The hash of `bytes` is checked against `expected` before anything is
    /// decoded; a mismatch is [`StoreError::IntegrityMismatch`]. Any defect in
    /// the decoded form, including a declared size that disagrees with the
    /// payload, is [`StoreError::MalformedObject`].
    pub fn from_binary(bytes: &[u8], expected: &ObjectId) -> StoreResult<Self> {
        let computed = ObjectId::from_bytes(bytes);
        if computed != *expected {
            return Err(StoreError::IntegrityMismatch {
                expected: *expected,
                computed,
            });
        }

        let malformed = |reason: String| StoreError::MalformedObject {
            id: *expected,
            reason,
        };

        let raw = zstd::decode_all(bytes).map_err(|e| malformed(format!("decompression failed: {e}")))?;
        let nul = raw
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| malformed("missing header terminator".into()))?;
        let header = std::str::from_utf8(&raw[..nul])
            .map_err(|_| malformed("header is not valid UTF-8".into()))?;
        let (tag, size) = header
            .split_once(' ')
            .ok_or_else(|| malformed(format!("header {header:?} lacks a size field")))?;
        let kind: ObjectKind = tag.parse().map_err(|e: UnknownKind| malformed(e.to_string()))?;
        let size: usize = size
            .parse()
            .map_err(|_| malformed(format!("size field {size:?} is not a number")))?;

        let payload = &raw[nul + 1..];
        if size != payload.len() {
            return Err(malformed(format!(
                "declared size {size} but payload is {} bytes",
                payload.len()
            )));
        }

        Ok(Self {
            kind,
            content: payload.to_vec(),
            binary: bytes.to_vec(),
            key: *expected,
        })
    }
}

fn canonical_form(kind: ObjectKind, content: &[u8]) -> Vec<u8> {
    let header = format!("{} {}\0", kind.tag(), content.len());
    let mut out = Vec::with_capacity(header.len() + content.len());
    out.extend_from_slice(header.as_bytes());
    out.extend_from_slice(content);
    out
}

impl PartialEq for ContentObject {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for ContentObject {}

impl Hash for ContentObject {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl fmt::Debug for ContentObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContentObject")
            .field("kind", &self.kind)
            .field("size", &self.size())
            .field("key", &self.key)
            .finish()
    }
}
