//! The active observation ledger and its rotation primitive.
//!
//! ## `rotate` — crash-safe ordering
//!
//! 1. Read the full active ledger.
//! 2. Write the archive to `sets/<name>/<n>.csv.tmp`, rename to `<n>.csv`.
//! 3. Truncate the active ledger.
//!
//! A crash before step 2's rename leaves the pre-rotation state intact; a
//! crash between 2 and 3 leaves a complete archive and a full ledger, and a
//! retried `rotate(n)` rewrites the byte-identical archive before truncating.
//! Either way no partial/mixed state is ever observable.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use watchpost_core::paths;
use watchpost_core::types::{DeviceName, ObservationRecord};

use crate::error::{io_err, LedgerError};

/// The active append-only ledger for one device, rooted at the data root.
#[derive(Debug, Clone)]
pub struct Ledger {
    root: PathBuf,
    name: DeviceName,
}

impl Ledger {
    /// Open (creating directories and an empty active file as needed) the
    /// ledger for `name` under `root`.
    pub fn open(root: &Path, name: DeviceName) -> Result<Self, LedgerError> {
        let dir = paths::ledger_dir(root);
        if !dir.exists() {
            std::fs::create_dir_all(&dir).map_err(|e| io_err(&dir, e))?;
        }
        let ledger = Self {
            root: root.to_path_buf(),
            name,
        };
        let path = ledger.path();
        if !path.exists() {
            std::fs::write(&path, "").map_err(|e| io_err(&path, e))?;
        }
        Ok(ledger)
    }

    /// Path of the active ledger file.
    pub fn path(&self) -> PathBuf {
        paths::ledger_path(&self.root, &self.name)
    }

    pub fn device(&self) -> &DeviceName {
        &self.name
    }

    /// Append one observation as a `date,time` line.
    pub fn append(&self, record: &ObservationRecord) -> Result<(), LedgerError> {
        let path = self.path();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| io_err(&path, e))?;
        writeln!(file, "{},{}", record.date, record.time).map_err(|e| io_err(&path, e))?;
        Ok(())
    }

    /// The raw active ledger content, for the bulk re-upload body.
    /// A missing file reads as empty.
    pub fn read_raw(&self) -> Result<String, LedgerError> {
        let path = self.path();
        if !path.exists() {
            return Ok(String::new());
        }
        std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))
    }

    /// All active observations, oldest first. Malformed lines are skipped
    /// with a warning; the reader never fails on a single bad row.
    pub fn read_all(&self) -> Result<Vec<ObservationRecord>, LedgerError> {
        let raw = self.read_raw()?;
        let mut records = Vec::new();
        for line in raw.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let mut parts = line.splitn(2, ',');
            match (parts.next(), parts.next()) {
                (Some(date), Some(time)) if !date.is_empty() && !time.is_empty() => {
                    records.push(ObservationRecord {
                        device: self.name.clone(),
                        date: date.to_string(),
                        time: time.trim().to_string(),
                    });
                }
                _ => {
                    tracing::warn!("skipping malformed ledger line: {line:?}");
                }
            }
        }
        Ok(records)
    }

    /// Number of observations currently in the active ledger.
    pub fn len(&self) -> Result<usize, LedgerError> {
        Ok(self.read_all()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, LedgerError> {
        Ok(self.read_raw()?.trim().is_empty())
    }

    /// Snapshot the full active ledger into archive `set`, then truncate the
    /// active ledger. Returns the archive path.
    pub fn rotate(&self, set: u32) -> Result<PathBuf, LedgerError> {
        let dir = paths::sets_dir(&self.root, &self.name);
        if !dir.exists() {
            std::fs::create_dir_all(&dir).map_err(|e| io_err(&dir, e))?;
        }

        let content = self.read_raw()?;
        let archive = paths::archive_path(&self.root, &self.name, set);
        let tmp = archive.with_extension("csv.tmp");
        std::fs::write(&tmp, &content).map_err(|e| io_err(&tmp, e))?;
        std::fs::rename(&tmp, &archive).map_err(|e| io_err(&archive, e))?;

        let active = self.path();
        std::fs::write(&active, "").map_err(|e| io_err(&active, e))?;

        tracing::info!(
            "rotated ledger for {} into set {set} ({} bytes)",
            self.name,
            content.len()
        );
        Ok(archive)
    }

    /// Archive numbers present on disk, ascending.
    pub fn archived_sets(&self) -> Result<Vec<u32>, LedgerError> {
        let dir = paths::sets_dir(&self.root, &self.name);
        if !dir.exists() {
            return Ok(vec![]);
        }
        let mut sets: Vec<u32> = std::fs::read_dir(&dir)
            .map_err(|e| io_err(&dir, e))?
            .filter_map(|e| e.ok())
            .filter_map(|e| {
                e.path()
                    .file_stem()
                    .and_then(|stem| stem.to_str())
                    .and_then(|stem| stem.parse().ok())
            })
            .collect();
        sets.sort_unstable();
        Ok(sets)
    }
}
