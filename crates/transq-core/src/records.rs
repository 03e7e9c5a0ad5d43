use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Default records filename, kept in the scan root.
pub const RECORDS_FILENAME: &str = "records.json";

/// Durable mapping of base name -> directory the item was staged from.
///
/// Every successful insert rewrites the whole backing file before returning,
/// so the file on disk never lags behind a move that has been decided.
#[derive(Debug)]
pub struct RecordStore {
    path: PathBuf,
    records: BTreeMap<String, PathBuf>,
}

impl RecordStore {
    /// Load the store from `path`. A missing file yields an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.exists() {
            return Ok(Self {
                path,
                records: BTreeMap::new(),
            });
        }

        let file = File::open(&path)?;
        let reader = BufReader::new(file);
        let records = serde_json::from_reader(reader).map_err(|source| Error::StoreCorrupt {
            path: path.clone(),
            source,
        })?;

        Ok(Self { path, records })
    }

    /// Record `origin` for `base_name` unless a record already exists.
    ///
    /// Returns `true` when a new record was written.
    pub fn put(&mut self, base_name: &str, origin: &Path) -> Result<bool> {
        if self.records.contains_key(base_name) {
            return Ok(false);
        }
        self.records
            .insert(base_name.to_string(), origin.to_path_buf());
        if let Err(e) = self.save() {
            self.records.remove(base_name);
            return Err(e);
        }
        Ok(true)
    }

    /// Original directory recorded for `base_name`.
    pub fn get(&self, base_name: &str) -> Result<&Path> {
        self.records
            .get(base_name)
            .map(PathBuf::as_path)
            .ok_or_else(|| Error::RecordNotFound(base_name.to_string()))
    }

    pub fn has(&self, base_name: &str) -> bool {
        self.records.contains_key(base_name)
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Rewrite the backing file. Skipped when there is nothing to persist and
    /// no file exists yet, so a dry run never creates the records file.
    pub fn flush(&self) -> Result<()> {
        if self.is_empty() && !self.path.exists() {
            return Ok(());
        }
        self.save()
    }

    fn save(&self) -> Result<()> {
        let temp_path = self.path.with_extension("json.tmp");

        // Write to temp file first, then rename for atomicity
        let file = File::create(&temp_path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, &self.records)
            .map_err(std::io::Error::from)?;
        writer.write_all(b"\n")?;
        writer.into_inner().map_err(|e| e.into_error())?.sync_all()?;

        fs::rename(&temp_path, &self.path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let store = RecordStore::open(dir.path().join(RECORDS_FILENAME)).unwrap();
        assert!(store.is_empty());
        assert!(!store.has("clip1"));
    }

    #[test]
    fn test_first_writer_wins() {
        let dir = tempdir().unwrap();
        let mut store = RecordStore::open(dir.path().join(RECORDS_FILENAME)).unwrap();

        assert!(store.put("clip1", Path::new("/a")).unwrap());
        assert!(!store.put("clip1", Path::new("/b")).unwrap());
        assert_eq!(store.get("clip1").unwrap(), Path::new("/a"));
    }

    #[test]
    fn test_put_persists_immediately() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(RECORDS_FILENAME);
        let mut store = RecordStore::open(&path).unwrap();
        store.put("talk", Path::new("/videos/a")).unwrap();

        // No flush: the write-through on put is the durability guarantee
        let reopened = RecordStore::open(&path).unwrap();
        assert_eq!(reopened.get("talk").unwrap(), Path::new("/videos/a"));

        let raw: BTreeMap<String, String> =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw.get("talk").map(String::as_str), Some("/videos/a"));
    }

    #[test]
    fn test_get_missing_is_record_not_found() {
        let dir = tempdir().unwrap();
        let store = RecordStore::open(dir.path().join(RECORDS_FILENAME)).unwrap();
        match store.get("orphan") {
            Err(Error::RecordNotFound(name)) => assert_eq!(name, "orphan"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_keys_with_glob_characters_are_not_escaped() {
        let dir = tempdir().unwrap();
        let mut store = RecordStore::open(dir.path().join(RECORDS_FILENAME)).unwrap();
        store.put("talk [part 1]*?", Path::new("/videos/a")).unwrap();
        assert!(store.has("talk [part 1]*?"));
    }

    #[test]
    fn test_corrupt_file_is_fatal() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(RECORDS_FILENAME);
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            RecordStore::open(&path),
            Err(Error::StoreCorrupt { .. })
        ));
    }

    #[test]
    fn test_flush_on_empty_store_creates_nothing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(RECORDS_FILENAME);
        let store = RecordStore::open(&path).unwrap();
        store.flush().unwrap();
        assert!(!path.exists());
    }
}
