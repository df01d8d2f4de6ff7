//! Journal manager.
//!
//! Buffers pending entries in memory and batches them to the on-disk
//! log, trading a bounded window of recent entries against per-mutation
//! I/O cost.

use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use super::record::Command;
use crate::error::StoreResult;

/// Number of buffered entries that triggers an implicit flush.
///
/// At most this many of the newest entries can be lost by a crash
/// before the next flush.
const FLUSH_THRESHOLD: usize = 16;

/// Append-only on-disk command log.
pub struct Journal {
    path: PathBuf,
    pending: Vec<String>,
}

impl Journal {
    /// Create a handle for the journal at `path`. The file itself only
    /// appears once an entry is flushed.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Journal {
            path: path.into(),
            pending: Vec::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the journal file is present on disk.
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Buffer one command, flushing the buffer once it reaches
    /// [`FLUSH_THRESHOLD`] entries.
    pub fn record(&mut self, command: &Command) -> StoreResult<()> {
        self.pending.push(command.encode());

        if self.pending.len() >= FLUSH_THRESHOLD {
            self.save()?;
        }

        Ok(())
    }

    /// Append every pending entry to the journal file. No-op when
    /// nothing is pending.
    pub fn save(&mut self) -> StoreResult<()> {
        if self.pending.is_empty() {
            return Ok(());
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut writer = BufWriter::new(file);

        for entry in &self.pending {
            writeln!(writer, "{entry}")?;
        }

        writer.flush()?;
        writer.get_mut().sync_all()?;
        self.pending.clear();

        Ok(())
    }

    /// Read back every command in file order.
    ///
    /// Entries whose arguments were torn by a crash decode to nothing
    /// and are skipped; everything before them still applies.
    pub fn replay(&self) -> StoreResult<Vec<Command>> {
        let file = File::open(&self.path)?;
        let reader = BufReader::new(file);
        let mut commands = Vec::new();

        for line in reader.lines() {
            let line = line?;
            if line.is_empty() {
                continue;
            }

            match Command::decode(&line)? {
                Some(command) => commands.push(command),
                None => log::debug!("skipping torn journal entry: {line:?}"),
            }
        }

        Ok(commands)
    }

    /// Drop the journal entirely: pending entries and the on-disk file.
    /// Only valid once a consolidated snapshot has superseded it.
    pub fn destroy(&mut self) -> StoreResult<()> {
        self.pending.clear();

        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}
