//! Property Name Interning
//!
//! Canonicalizes property-name strings to reference-identical `Arc<str>`
//! instances so repeated engine callbacks for the same name avoid
//! reallocation and get reference-stable hashing on later lookups.
//!
//! Keys arrive either as managed strings or as raw byte buffers; the
//! [`NameSource`] capability lets both be hashed and compared against
//! pooled entries without allocating first.

use std::sync::{Arc, LazyLock};

use dashmap::DashMap;

/// A string-like lookup key: length plus byte indexer.
///
/// Raw engine buffers and managed strings both implement this, which is
/// what makes allocation-free pool probes possible.
pub trait NameSource {
    fn len(&self) -> usize;

    fn byte_at(&self, index: usize) -> u8;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Materialize an owned canonical string. Called once per distinct
    /// name, on first sight.
    fn to_interned(&self) -> Arc<str>;
}

impl NameSource for &str {
    fn len(&self) -> usize {
        str::len(self)
    }

    fn byte_at(&self, index: usize) -> u8 {
        self.as_bytes()[index]
    }

    fn to_interned(&self) -> Arc<str> {
        Arc::from(*self)
    }
}

impl NameSource for &[u8] {
    fn len(&self) -> usize {
        <[u8]>::len(self)
    }

    fn byte_at(&self, index: usize) -> u8 {
        self[index]
    }

    fn to_interned(&self) -> Arc<str> {
        Arc::from(String::from_utf8_lossy(self).into_owned().as_str())
    }
}

/// Length-prefixed DJB2 over the key bytes. Prefixing the length keeps
/// `"ab"` and `"ab\0"`-style extensions from colliding trivially.
fn name_hash<N: NameSource + ?Sized>(name: &N) -> u64 {
    let mut hash: u64 = 5381;
    for byte in (name.len() as u32).to_le_bytes() {
        hash = hash.wrapping_mul(33).wrapping_add(u64::from(byte));
    }
    for i in 0..name.len() {
        hash = hash.wrapping_mul(33).wrapping_add(u64::from(name.byte_at(i)));
    }
    hash
}

fn name_eq<N: NameSource + ?Sized>(name: &N, candidate: &str) -> bool {
    let bytes = candidate.as_bytes();
    if bytes.len() != name.len() {
        return false;
    }
    (0..bytes.len()).all(|i| bytes[i] == name.byte_at(i))
}

/// Content-keyed intern pool. Entries are never evicted; the table is
/// bounded by the process's distinct property-name vocabulary.
#[derive(Default)]
pub struct NamePool {
    buckets: DashMap<u64, Vec<Arc<str>>>,
}

impl NamePool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Canonicalize a name. The first writer for a given content wins;
    /// racing callers reuse its entry.
    pub fn intern<N: NameSource + ?Sized>(&self, name: &N) -> Arc<str> {
        let hash = name_hash(name);

        if let Some(bucket) = self.buckets.get(&hash) {
            if let Some(found) = bucket.iter().find(|s| name_eq(name, s)) {
                return found.clone();
            }
        }

        let mut bucket = self.buckets.entry(hash).or_default();
        // Re-probe under the write guard: another thread may have won.
        if let Some(found) = bucket.iter().find(|s| name_eq(name, s)) {
            return found.clone();
        }
        let interned = name.to_interned();
        tracing::trace!(name = %interned, "interned property name");
        bucket.push(interned.clone());
        interned
    }

    /// Number of distinct interned names.
    pub fn len(&self) -> usize {
        self.buckets.iter().map(|bucket| bucket.value().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

static GLOBAL_POOL: LazyLock<NamePool> = LazyLock::new(NamePool::new);

/// Intern through the process-wide pool.
pub fn intern<N: NameSource + ?Sized>(name: &N) -> Arc<str> {
    GLOBAL_POOL.intern(name)
}
