//! Store orchestration: startup recovery, journaling and consolidation.

use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::cache::RowCache;
use crate::error::StoreResult;
use crate::journal::{Command, Journal};

/// Extension of the transient snapshot file used during consolidation.
const SNAPSHOT_EXTENSION: &str = "tmp";

/// A line-oriented text file held as an ordered sequence of rows.
///
/// Mutations apply in memory and are journaled; the primary file is
/// only rewritten wholesale when the store consolidates (at the end of
/// a recovering open and when the store is dropped). A crash in between
/// is recovered by replaying the journal on the next open.
pub struct LineStore {
    path: PathBuf,
    journal: Journal,
    cache: RowCache,
    dirty: bool,
}

impl LineStore {
    /// Open the store backed by `path`, recovering any journaled state.
    pub fn open(path: &Path) -> StoreResult<Self> {
        // A leftover snapshot means a crash mid-consolidation; the
        // primary file and journal supersede it.
        let snapshot = snapshot_path(path);
        if snapshot.exists() {
            fs::remove_file(&snapshot)?;
        }

        let mut store = LineStore {
            journal: Journal::new(journal_path(path)),
            cache: RowCache::new(),
            dirty: false,
            path: path.to_path_buf(),
        };

        if store.path.exists() {
            store.load_primary()?;
        }

        if store.journal.exists() {
            if let Err(err) = store.recover() {
                // The drop-time consolidation must not snapshot a
                // half-replayed state; leave both files for inspection.
                store.dirty = false;
                return Err(err);
            }
        }

        Ok(store)
    }

    /// Replay the journal through the regular apply path, then fold the
    /// result into the primary file.
    fn recover(&mut self) -> StoreResult<()> {
        for command in self.journal.replay()? {
            self.apply(&command)?;
        }
        self.consolidate()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The row at `index`.
    pub fn read(&self, index: usize) -> StoreResult<&str> {
        self.cache.read(index)
    }

    pub fn first(&self) -> StoreResult<&str> {
        self.cache.first()
    }

    pub fn last(&self) -> StoreResult<&str> {
        self.cache.last()
    }

    /// Every row in display order.
    pub fn all(&self) -> Vec<String> {
        self.cache.all()
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Append a row after the current last one.
    pub fn append(&mut self, text: impl Into<String>) -> StoreResult<()> {
        self.mutate(Command::Append { text: text.into() })
    }

    /// Replace the row at `index`.
    pub fn overwrite(&mut self, index: usize, text: impl Into<String>) -> StoreResult<()> {
        self.mutate(Command::Overwrite {
            index,
            text: text.into(),
        })
    }

    /// Remove the row at `index`; later rows shift down one position.
    pub fn erase(&mut self, index: usize) -> StoreResult<()> {
        self.mutate(Command::Erase { index })
    }

    /// Remove every row.
    pub fn clear(&mut self) -> StoreResult<()> {
        self.mutate(Command::Clear)
    }

    /// Flush the journal's pending entries to disk.
    ///
    /// This durably records the mutations without rewriting the primary
    /// file; the full rewrite happens at consolidation time.
    pub fn save(&mut self) -> StoreResult<()> {
        self.journal.save()
    }

    fn mutate(&mut self, command: Command) -> StoreResult<()> {
        self.apply(&command)?;
        self.journal.record(&command)
    }

    /// Apply a command to the in-memory state. Shared by live mutations
    /// and journal replay so the two can never diverge.
    fn apply(&mut self, command: &Command) -> StoreResult<()> {
        match command {
            Command::Append { text } => self.cache.push(text.clone()),
            Command::Overwrite { index, text } => self.cache.overwrite(*index, text.clone())?,
            Command::Erase { index } => self.cache.erase(*index)?,
            Command::Clear => {
                if self.cache.is_empty() {
                    return Ok(());
                }
                self.cache.clear();
            }
        }

        self.dirty = true;
        Ok(())
    }

    /// Collapse the current rows into the primary file and retire the
    /// journal. When the snapshot cannot complete, the journal is
    /// flushed instead and remains the recovery path.
    fn consolidate(&mut self) -> StoreResult<()> {
        if !self.dirty {
            return Ok(());
        }

        let snapshot = snapshot_path(&self.path);

        if let Err(err) = self.write_snapshot(&snapshot) {
            log::warn!("snapshot write failed, falling back to the journal: {err}");
            let _ = fs::remove_file(&snapshot);
            return self.journal.save();
        }

        if let Err(err) = fs::rename(&snapshot, &self.path) {
            log::warn!("snapshot replace failed, falling back to the journal: {err}");
            let _ = fs::remove_file(&snapshot);
            return self.journal.save();
        }

        self.journal.destroy()?;
        self.dirty = false;
        Ok(())
    }

    fn write_snapshot(&self, snapshot: &Path) -> std::io::Result<()> {
        let file = File::create(snapshot)?;
        let mut writer = BufWriter::new(file);

        for row in self.cache.rows() {
            writeln!(writer, "{row}")?;
        }

        writer.flush()?;
        // Everything must be on disk before the handle closes; the
        // rename that follows makes this file the primary.
        writer.get_mut().sync_all()?;
        Ok(())
    }

    fn load_primary(&mut self) -> StoreResult<()> {
        let file = File::open(&self.path)?;
        let reader = BufReader::new(file);

        for line in reader.lines() {
            self.cache.push(line?);
        }

        Ok(())
    }
}

impl Drop for LineStore {
    fn drop(&mut self) {
        if let Err(err) = self.consolidate() {
            log::warn!("failed to persist {}: {err}", self.path.display());
        }
    }
}

/// Journal file co-located with the primary: `<stem>_journal<.ext>`.
fn journal_path(path: &Path) -> PathBuf {
    let mut name = path.file_stem().unwrap_or_default().to_os_string();
    name.push("_journal");
    if let Some(ext) = path.extension() {
        name.push(".");
        name.push(ext);
    }
    path.with_file_name(name)
}

fn snapshot_path(path: &Path) -> PathBuf {
    path.with_extension(SNAPSHOT_EXTENSION)
}
