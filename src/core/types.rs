//! Core type definitions used throughout the codebase

use crate::core::error::{KernelError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Unique identifier for an interactive session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Milliseconds since the unix epoch
pub type Timestamp = u64;

/// Current wall-clock time as a [`Timestamp`]
pub fn now_millis() -> Timestamp {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Canonical absolute path acting as the primary key of a store entry
///
/// Always starts with `/`, never ends with `/` (except root), never
/// contains empty, `.` or `..` segments.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PathKey(String);

impl PathKey {
    /// The root directory
    pub fn root() -> Self {
        Self("/".to_string())
    }

    /// Canonicalise an absolute path
    pub fn parse(raw: &str) -> Result<Self> {
        if !raw.starts_with('/') {
            return Err(KernelError::InvalidParams(format!(
                "path must be absolute: {:?}",
                raw
            )));
        }
        if raw.contains('\0') {
            return Err(KernelError::InvalidParams("path contains NUL".into()));
        }

        let mut segments: Vec<&str> = Vec::new();
        for segment in raw.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    segments.pop();
                }
                s => segments.push(s),
            }
        }

        if segments.is_empty() {
            return Ok(Self::root());
        }
        Ok(Self(format!("/{}", segments.join("/"))))
    }

    /// Resolve a possibly relative path against a working directory
    pub fn resolve(cwd: &PathKey, raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(KernelError::InvalidParams("empty path".into()));
        }
        if raw.starts_with('/') {
            Self::parse(raw)
        } else {
            Self::parse(&format!("{}/{}", cwd.as_str(), raw))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0 == "/"
    }

    /// Parent path; root has none
    pub fn parent(&self) -> Option<PathKey> {
        if self.is_root() {
            return None;
        }
        match self.0.rfind('/') {
            Some(0) => Some(Self::root()),
            Some(idx) => Some(Self(self.0[..idx].to_string())),
            None => None,
        }
    }

    /// Final path segment; root has none
    pub fn name(&self) -> Option<&str> {
        if self.is_root() {
            return None;
        }
        self.0.rsplit('/').next()
    }

    /// Append a single segment
    pub fn join(&self, name: &str) -> Result<Self> {
        if name.is_empty() || name.contains('/') {
            return Err(KernelError::InvalidParams(format!(
                "invalid path segment: {:?}",
                name
            )));
        }
        Self::parse(&format!("{}/{}", self.0, name))
    }

    /// Whether `self` lies strictly below `ancestor`
    pub fn is_descendant_of(&self, ancestor: &PathKey) -> bool {
        if ancestor.is_root() {
            return !self.is_root();
        }
        self.0.len() > ancestor.0.len()
            && self.0.starts_with(&ancestor.0)
            && self.0.as_bytes()[ancestor.0.len()] == b'/'
    }

    /// Replace the `from` prefix of this path with `to`
    pub fn rebase(&self, from: &PathKey, to: &PathKey) -> Result<Self> {
        if self == from {
            return Ok(to.clone());
        }
        if !self.is_descendant_of(from) {
            return Err(KernelError::internal(format!(
                "{} is not below {}",
                self, from
            )));
        }
        let rest = if from.is_root() {
            &self.0[1..]
        } else {
            &self.0[from.0.len() + 1..]
        };
        Self::parse(&format!("{}/{}", to.0, rest))
    }
}

impl fmt::Display for PathKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for PathKey {
    type Error = KernelError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<PathKey> for String {
    fn from(value: PathKey) -> Self {
        value.0
    }
}

/// Kind of store entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Directory,
}

/// One record in the flat store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub path: PathKey,
    pub kind: EntryKind,
    /// `None` for directories, `Some` (possibly empty) for files
    pub payload: Option<Vec<u8>>,
    pub created_at: Timestamp,
    pub modified_at: Timestamp,
    pub size: u64,
}

impl Entry {
    pub fn directory(path: PathKey) -> Self {
        let now = now_millis();
        Self {
            path,
            kind: EntryKind::Directory,
            payload: None,
            created_at: now,
            modified_at: now,
            size: 0,
        }
    }

    pub fn file(path: PathKey, payload: Vec<u8>) -> Self {
        let now = now_millis();
        Self {
            path,
            kind: EntryKind::File,
            size: payload.len() as u64,
            payload: Some(payload),
            created_at: now,
            modified_at: now,
        }
    }

    pub fn is_directory(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    /// Replace file content, keeping the creation time
    pub fn with_payload(&self, payload: Vec<u8>) -> Self {
        Self {
            path: self.path.clone(),
            kind: EntryKind::File,
            size: payload.len() as u64,
            payload: Some(payload),
            created_at: self.created_at,
            modified_at: now_millis(),
        }
    }

    /// Same record under another key
    pub fn moved_to(&self, path: PathKey) -> Self {
        Self {
            path,
            modified_at: now_millis(),
            ..self.clone()
        }
    }

    /// Whether the payload invariant for this kind holds
    pub fn is_well_formed(&self) -> bool {
        match self.kind {
            EntryKind::Directory => self.payload.is_none(),
            EntryKind::File => self
                .payload
                .as_ref()
                .is_some_and(|p| p.len() as u64 == self.size),
        }
    }
}
