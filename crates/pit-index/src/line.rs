//! The staging index line format.
//!
//! ```text
//! <mode> <key> <version>    <path>
//! 100644 3f2a...9c 0    src/main.rs
//! ```
//!
//! The mode is cosmetic, derived from the object kind. Exactly four spaces
//! separate the version from the path, so paths may themselves contain spaces.
//! Records are newline-terminated, so a path may not contain `\n` or `\r`.

use std::fmt;

use pit_store::{ContentObject, ObjectKind};
use pit_types::ObjectId;

use crate::error::{IndexError, IndexResult};

/// Separator between the version field and the path.
pub const PATH_SEPARATOR: &str = "    ";

/// Returns `true` if `path` can be written as the last field of a record.
pub fn is_representable(path: &str) -> bool {
    !path.is_empty() && !path.contains(['\n', '\r'])
}

/// One record of the staging index.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexLine {
    pub mode: String,
    pub key: ObjectId,
    /// Zero-based position in the path's history.
    pub version: usize,
    pub path: String,
}

impl IndexLine {
    /// Build the record for `object` as version `version` of `path`.
    pub fn new(object: &ContentObject, version: usize, path: impl Into<String>) -> Self {
        Self {
            mode: object.kind().mode().to_string(),
            key: object.key(),
            version,
            path: path.into(),
        }
    }

    /// Parse one line. `lineno` is 1-based and only used in errors.
    pub fn parse(line: &str, lineno: usize) -> IndexResult<Self> {
        let malformed = |reason: String| IndexError::MalformedIndex {
            line: lineno,
            reason,
        };

        let (mode, rest) = line
            .split_once(' ')
            .ok_or_else(|| malformed("missing key field".into()))?;
        if !ObjectKind::is_known_mode(mode) {
            return Err(malformed(format!("unknown mode {mode:?}")));
        }

        let (key, rest) = rest
            .split_once(' ')
            .ok_or_else(|| malformed("missing version field".into()))?;
        let key = ObjectId::from_hex(key).map_err(|e| malformed(format!("bad key: {e}")))?;

        let (version, path) = rest
            .split_once(PATH_SEPARATOR)
            .ok_or_else(|| malformed("missing path separator".into()))?;
        if version.is_empty() || !version.bytes().all(|b| b.is_ascii_digit()) {
            return Err(malformed(format!("bad version {version:?}")));
        }
        let version: usize = version
            .parse()
            .map_err(|_| malformed(format!("version {version:?} out of range")))?;

        if path.is_empty() {
            return Err(malformed("empty path".into()));
        }
        if !is_representable(path) {
            return Err(malformed(format!("line break in path {path:?}")));
        }

        Ok(Self {
            mode: mode.to_string(),
            key,
            version,
            path: path.to_string(),
        })
    }
}

impl fmt::Display for IndexLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}{}{}",
            self.mode, self.key, self.version, PATH_SEPARATOR, self.path
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blob_line(path: &str) -> IndexLine {
        let obj = ContentObject::blob("content").unwrap();
        IndexLine::new(&obj, 0, path)
    }

    #[test]
    fn formats_with_four_space_separator() {
        let obj = ContentObject::blob("content").unwrap();
        let line = IndexLine::new(&obj, 3, "dir/file.txt");
        assert_eq!(
            line.to_string(),
            format!("100644 {} 3    dir/file.txt", obj.key().to_hex())
        );
    }

    #[test]
    fn staging_objects_use_directory_mode() {
        let obj = ContentObject::new(ObjectKind::Staging, "").unwrap();
        assert!(IndexLine::new(&obj, 0, "x").to_string().starts_with("040000 "));
    }

    #[test]
    fn parse_inverts_display() {
        let line = blob_line("a/b.txt");
        assert_eq!(IndexLine::parse(&line.to_string(), 1).unwrap(), line);
    }

    #[test]
    fn paths_may_contain_spaces() {
        let line = blob_line("my docs/read me.txt");
        let parsed = IndexLine::parse(&line.to_string(), 1).unwrap();
        assert_eq!(parsed.path, "my docs/read me.txt");

        let leading = blob_line(" leading space");
        assert_eq!(
            IndexLine::parse(&leading.to_string(), 1).unwrap().path,
            " leading space"
        );
    }

    #[test]
    fn line_breaks_are_not_representable() {
        assert!(is_representable("dir/read me.txt"));
        assert!(!is_representable("a\nb"));
        assert!(!is_representable("name\r"));
        assert!(!is_representable(""));
    }

    #[test]
    fn rejects_malformed_lines() {
        let key = ContentObject::blob("k").unwrap().key().to_hex();
        let cases = [
            String::new(),
            "100644".to_string(),
            format!("999999 {key} 0    path"),
            format!("100644 {} 0    path", &key[..10]),
            format!("100644 {key} x    path"),
            format!("100644 {key} -1    path"),
            format!("100644 {key} 0 path"),
            format!("100644 {key} 0    "),
            format!("100644 {key}"),
            format!("100644 {key} 0    name\r"),
        ];
        for (i, case) in cases.iter().enumerate() {
            match IndexLine::parse(case, i + 1) {
                Err(IndexError::MalformedIndex { line, .. }) => assert_eq!(line, i + 1),
                other => panic!("{case:?} parsed as {other:?}"),
            }
        }
    }
}
