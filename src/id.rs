use std::fmt;

use parking_lot::Mutex;
use ulid::{Generator, MonotonicError, Ulid};

/// Identifier used for segment files and other persisted artifacts.
pub type FileId = Ulid;

/// Opaque identifier of the logical partition a writer is bound to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TabletId(i64);

impl TabletId {
    /// Wrap a raw tablet identifier.
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    /// Access the raw identifier value.
    pub const fn raw(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for TabletId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Load transaction a writing session belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TxnId(i64);

impl TxnId {
    /// Wrap a raw transaction identifier.
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    /// Access the raw identifier value.
    pub const fn raw(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for TxnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Thread-safe ULID generator shared by every writer built from one factory.
pub struct FileIdGenerator {
    inner: Mutex<Generator>,
}

impl FileIdGenerator {
    /// Create a new generator seeded with the current time.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Generator::new()),
        }
    }

    /// Produce the next [`FileId`] in a monotonic, time-ordered sequence.
    pub fn generate(&self) -> Result<FileId, MonotonicError> {
        self.inner.lock().generate()
    }
}

impl Default for FileIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for FileIdGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileIdGenerator").finish_non_exhaustive()
    }
}
