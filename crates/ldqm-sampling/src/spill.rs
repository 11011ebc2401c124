use std::collections::HashSet;
use std::path::{Path, PathBuf};

use rusqlite::{Connection, OptionalExtension, params};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::errors::{Result, SamplingError};

/// Exact string set whose backing storage is an implementation detail.
pub trait SpillableSet {
    /// Inserts `item`; returns true when it was not present before.
    fn insert(&mut self, item: &str) -> Result<bool>;
    fn contains(&self, item: &str) -> Result<bool>;
    fn len(&self) -> u64;
    fn is_spilled(&self) -> bool;

    /// Hands every item to `visit` in batches of at most `batch_size`,
    /// reading spilled items back from the store batch by batch.
    fn for_each_batch<E, F>(&self, batch_size: usize, visit: F) -> std::result::Result<(), E>
    where
        E: From<SamplingError>,
        F: FnMut(&[String]) -> std::result::Result<(), E>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Set held in memory up to `threshold` items, then moved wholesale into an
/// SQLite file under `spill_dir`. The file is removed when the set is
/// dropped.
pub struct HybridSet {
    threshold: usize,
    spill_dir: PathBuf,
    memory: HashSet<String>,
    overflow: Option<SqliteOverflow>,
    len: u64,
}

struct SqliteOverflow {
    conn: Connection,
    path: PathBuf,
}

impl HybridSet {
    pub fn new(threshold: usize, spill_dir: impl Into<PathBuf>) -> Result<Self> {
        if threshold == 0 {
            return Err(SamplingError::InvalidThreshold(threshold));
        }

        Ok(Self {
            threshold,
            spill_dir: spill_dir.into(),
            memory: HashSet::new(),
            overflow: None,
            len: 0,
        })
    }

    /// Spills into the system temporary directory.
    pub fn in_temp_dir(threshold: usize) -> Result<Self> {
        Self::new(threshold, std::env::temp_dir())
    }

    /// Location of the overflow file once the set has spilled.
    pub fn spill_path(&self) -> Option<&Path> {
        self.overflow.as_ref().map(|overflow| overflow.path.as_path())
    }

    /// Copies the in-memory items into a fresh overflow file. Memory is only
    /// released once the copy is committed; a failed copy leaves the set
    /// unchanged and removes the partial file.
    fn spill(&mut self) -> Result<()> {
        std::fs::create_dir_all(&self.spill_dir)?;
        let path = self
            .spill_dir
            .join(format!("spillset-{}.sqlite", Uuid::new_v4()));

        let conn = match write_overflow(&path, &self.memory) {
            Ok(conn) => conn,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "spill failed, staying in memory");
                if path.exists() {
                    if let Err(remove_err) = std::fs::remove_file(&path) {
                        warn!(path = %path.display(), error = %remove_err, "failed to remove partial spill store");
                    }
                }
                return Err(err);
            }
        };

        info!(
            path = %path.display(),
            items = self.len,
            threshold = self.threshold,
            "set spilled to disk"
        );
        self.memory.clear();
        self.memory.shrink_to_fit();
        self.overflow = Some(SqliteOverflow { conn, path });
        Ok(())
    }
}

fn write_overflow(path: &Path, items: &HashSet<String>) -> Result<Connection> {
    let mut conn = Connection::open(path)?;
    conn.execute_batch(
        "PRAGMA journal_mode = OFF;
         PRAGMA synchronous = OFF;
         CREATE TABLE IF NOT EXISTS items (value TEXT PRIMARY KEY) WITHOUT ROWID;",
    )?;

    let tx = conn.transaction()?;
    {
        let mut stmt = tx.prepare("INSERT OR IGNORE INTO items (value) VALUES (?1)")?;
        for item in items {
            stmt.execute(params![item])?;
        }
    }
    tx.commit()?;
    Ok(conn)
}

impl SpillableSet for HybridSet {
    fn insert(&mut self, item: &str) -> Result<bool> {
        if let Some(overflow) = &self.overflow {
            let changed = overflow
                .conn
                .execute("INSERT OR IGNORE INTO items (value) VALUES (?1)", params![item])?;
            if changed > 0 {
                self.len += 1;
            }
            return Ok(changed > 0);
        }

        if !self.memory.insert(item.to_string()) {
            return Ok(false);
        }
        self.len += 1;

        if self.memory.len() > self.threshold {
            self.spill()?;
        }
        Ok(true)
    }

    fn contains(&self, item: &str) -> Result<bool> {
        match &self.overflow {
            Some(overflow) => {
                let found = overflow
                    .conn
                    .query_row("SELECT 1 FROM items WHERE value = ?1", params![item], |_| {
                        Ok(())
                    })
                    .optional()?;
                Ok(found.is_some())
            }
            None => Ok(self.memory.contains(item)),
        }
    }

    fn len(&self) -> u64 {
        self.len
    }

    fn is_spilled(&self) -> bool {
        self.overflow.is_some()
    }

    fn for_each_batch<E, F>(&self, batch_size: usize, mut visit: F) -> std::result::Result<(), E>
    where
        E: From<SamplingError>,
        F: FnMut(&[String]) -> std::result::Result<(), E>,
    {
        let batch_size = batch_size.max(1);
        let Some(overflow) = &self.overflow else {
            let mut batch = Vec::with_capacity(batch_size.min(self.memory.len()));
            for item in &self.memory {
                batch.push(item.clone());
                if batch.len() == batch_size {
                    visit(&batch)?;
                    batch.clear();
                }
            }
            if !batch.is_empty() {
                visit(&batch)?;
            }
            return Ok(());
        };

        let mut after: Option<String> = None;
        loop {
            let batch = overflow
                .read_batch(after.as_deref(), batch_size)
                .map_err(SamplingError::from)?;
            let Some(last) = batch.last() else {
                return Ok(());
            };
            after = Some(last.clone());
            visit(&batch)?;
            if batch.len() < batch_size {
                return Ok(());
            }
        }
    }
}

impl SqliteOverflow {
    /// Items ordered by value, strictly after `after`.
    fn read_batch(&self, after: Option<&str>, limit: usize) -> rusqlite::Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT value FROM items WHERE ?1 IS NULL OR value > ?1 ORDER BY value LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![after, limit as i64], |row| row.get::<_, String>(0))?;
        rows.collect()
    }
}

impl Drop for HybridSet {
    fn drop(&mut self) {
        let Some(SqliteOverflow { conn, path }) = self.overflow.take() else {
            return;
        };

        if let Err((_, err)) = conn.close() {
            warn!(path = %path.display(), error = %err, "failed to close spill store");
        }
        match std::fs::remove_file(&path) {
            Ok(()) => debug!(path = %path.display(), "spill store removed"),
            Err(err) => warn!(path = %path.display(), error = %err, "failed to remove spill store"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stays_in_memory_below_threshold() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut set = HybridSet::new(4, dir.path()).expect("set");
        assert!(set.insert("a").expect("insert"));
        assert!(!set.insert("a").expect("insert"));
        assert!(set.contains("a").expect("contains"));
        assert!(!set.is_spilled());
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn spills_past_threshold_and_keeps_answers() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut set = HybridSet::new(3, dir.path()).expect("set");
        for idx in 0..10 {
            assert!(set.insert(&format!("http://example.org/{idx}")).expect("insert"));
        }
        assert!(set.is_spilled());
        assert_eq!(set.len(), 10);
        assert!(!set.insert("http://example.org/2").expect("insert"));
        assert!(set.contains("http://example.org/0").expect("contains"));
        assert!(set.contains("http://example.org/9").expect("contains"));
        assert!(!set.contains("http://example.org/10").expect("contains"));
    }

    #[test]
    fn drop_removes_spill_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = {
            let mut set = HybridSet::new(1, dir.path()).expect("set");
            set.insert("a").expect("insert");
            set.insert("b").expect("insert");
            let path = set.spill_path().expect("spilled").to_path_buf();
            assert!(path.exists());
            path
        };
        assert!(!path.exists());
    }

    fn collect_batches(set: &HybridSet, batch_size: usize) -> (Vec<usize>, Vec<String>) {
        let mut sizes = Vec::new();
        let mut items = Vec::new();
        set.for_each_batch(batch_size, |batch| {
            sizes.push(batch.len());
            items.extend_from_slice(batch);
            Ok::<(), SamplingError>(())
        })
        .expect("batches");
        items.sort();
        (sizes, items)
    }

    #[test]
    fn batches_cover_memory_and_spilled_items() {
        let dir = tempfile::tempdir().expect("tempdir");
        let expected: Vec<String> = {
            let mut items: Vec<String> = (0..7).map(|idx| format!("http://example.org/{idx}")).collect();
            items.sort();
            items
        };

        let mut in_memory = HybridSet::new(100, dir.path()).expect("set");
        let mut spilled = HybridSet::new(2, dir.path()).expect("set");
        for item in &expected {
            in_memory.insert(item).expect("insert");
            spilled.insert(item).expect("insert");
        }
        assert!(!in_memory.is_spilled());
        assert!(spilled.is_spilled());

        for set in [&in_memory, &spilled] {
            let (sizes, items) = collect_batches(set, 3);
            assert_eq!(sizes, vec![3, 3, 1]);
            assert_eq!(items, expected);
        }
    }

    #[test]
    fn batch_errors_stop_the_walk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut set = HybridSet::new(1, dir.path()).expect("set");
        for idx in 0..5 {
            set.insert(&format!("item-{idx}")).expect("insert");
        }

        let mut visited = 0;
        let result = set.for_each_batch(2, |_| {
            visited += 1;
            Err(SamplingError::InvalidThreshold(0))
        });
        assert!(result.is_err());
        assert_eq!(visited, 1);
    }

    #[test]
    fn failed_spill_keeps_items_in_memory() {
        let dir = tempfile::tempdir().expect("tempdir");
        // A regular file where the spill directory should be.
        let blocked = dir.path().join("not-a-dir");
        std::fs::write(&blocked, b"").expect("write");

        let mut set = HybridSet::new(2, &blocked).expect("set");
        set.insert("a").expect("insert");
        set.insert("b").expect("insert");
        assert!(set.insert("c").is_err());

        assert!(!set.is_spilled());
        assert_eq!(set.len(), 3);
        for item in ["a", "b", "c"] {
            assert!(set.contains(item).expect("contains"), "{item} lost");
        }
        let (_, items) = collect_batches(&set, 10);
        assert_eq!(items, vec!["a", "b", "c"]);
        assert_eq!(std::fs::read_dir(dir.path()).expect("read dir").count(), 1);
    }

    #[test]
    fn zero_threshold_is_rejected() {
        assert!(matches!(
            HybridSet::in_temp_dir(0),
            Err(SamplingError::InvalidThreshold(0))
        ));
    }
}
