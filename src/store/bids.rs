use std::{
    collections::BTreeMap,
    fs,
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
};

use parking_lot::Mutex;
use serde::{de::DeserializeOwned, Serialize};
use tempfile::NamedTempFile;
use thiserror::Error;

use crate::{
    domain::{SkippedBid, SubmittedBid},
    infrastructure::directories::ResolvedPaths,
};

/// The state files cannot be read or written. Nothing can run safely on top
/// of a store in an unknown condition, so callers treat this as fatal.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("bid state store unavailable ({path}): {source}")]
    Unavailable {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },
}

#[derive(Default)]
struct Records {
    submitted: BTreeMap<String, SubmittedBid>,
    skipped: BTreeMap<String, SkippedBid>,
}

/// Durable title-keyed persistence for submitted and skipped bids.
///
/// Both maps live fully in memory and are rewritten to their JSON file on
/// every mutation, through a temp file renamed over the target so a crash
/// mid-write leaves the previous file intact. Records are write-once: a
/// title never moves between maps and is never overwritten.
pub struct BidStateStore {
    submitted_path: PathBuf,
    skipped_path: PathBuf,
    records: Mutex<Records>,
}

impl BidStateStore {
    pub fn open(paths: &ResolvedPaths) -> Result<Self, StoreError> {
        let submitted = load_map(&paths.submitted_path)?;
        let skipped = load_map(&paths.skipped_path)?;
        Ok(Self {
            submitted_path: paths.submitted_path.clone(),
            skipped_path: paths.skipped_path.clone(),
            records: Mutex::new(Records { submitted, skipped }),
        })
    }

    pub fn has_submitted(&self, title: &str) -> bool {
        self.records.lock().submitted.contains_key(title)
    }

    pub fn has_skipped(&self, title: &str) -> bool {
        self.records.lock().skipped.contains_key(title)
    }

    /// True when the title already has a terminal outcome in either map.
    pub fn contains(&self, title: &str) -> bool {
        let records = self.records.lock();
        records.submitted.contains_key(title) || records.skipped.contains_key(title)
    }

    pub fn submitted_count(&self) -> usize {
        self.records.lock().submitted.len()
    }

    /// Inserts the bid unless its title already has a terminal outcome in
    /// either map, persisting synchronously. Returns false when the title
    /// was already tracked.
    pub fn record_submitted(&self, bid: SubmittedBid) -> Result<bool, StoreError> {
        let mut records = self.records.lock();
        if records.submitted.contains_key(&bid.title) || records.skipped.contains_key(&bid.title) {
            return Ok(false);
        }
        let title = bid.title.clone();
        records.submitted.insert(title.clone(), bid);
        if let Err(err) = persist_map(&self.submitted_path, &records.submitted) {
            records.submitted.remove(&title);
            return Err(err);
        }
        Ok(true)
    }

    /// Same write-once semantics as [`record_submitted`](Self::record_submitted),
    /// for the skip map. A title that was already bid on is never demoted to
    /// a skip record.
    pub fn record_skipped(&self, skip: SkippedBid) -> Result<bool, StoreError> {
        let mut records = self.records.lock();
        if records.skipped.contains_key(&skip.title) || records.submitted.contains_key(&skip.title)
        {
            return Ok(false);
        }
        let title = skip.title.clone();
        records.skipped.insert(title.clone(), skip);
        if let Err(err) = persist_map(&self.skipped_path, &records.skipped) {
            records.skipped.remove(&title);
            return Err(err);
        }
        Ok(true)
    }
}

fn load_map<T: DeserializeOwned>(path: &Path) -> Result<BTreeMap<String, T>, StoreError> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(BTreeMap::new()),
        Err(err) => return Err(unavailable(path, err.into())),
    };
    if contents.trim().is_empty() {
        return Ok(BTreeMap::new());
    }
    serde_json::from_str(&contents).map_err(|err| unavailable(path, err.into()))
}

fn persist_map<T: Serialize>(path: &Path, map: &BTreeMap<String, T>) -> Result<(), StoreError> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let write = || -> anyhow::Result<()> {
        let payload = serde_json::to_vec_pretty(map)?;
        let mut file = NamedTempFile::new_in(dir)?;
        file.write_all(&payload)?;
        file.as_file().sync_all()?;
        file.persist(path)?;
        Ok(())
    };
    write().map_err(|err| unavailable(path, err))
}

fn unavailable(path: &Path, source: anyhow::Error) -> StoreError {
    StoreError::Unavailable {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::domain::{BidDuration, SkipReason};

    fn temp_paths() -> (tempfile::TempDir, ResolvedPaths) {
        let dir = tempfile::tempdir().unwrap();
        let paths = ResolvedPaths {
            logs_dir: dir.path().join("logs"),
            data_dir: dir.path().to_path_buf(),
            submitted_path: dir.path().join("submitted_bids.json"),
            skipped_path: dir.path().join("skipped_bids.json"),
        };
        (dir, paths)
    }

    fn sample_bid(title: &str) -> SubmittedBid {
        SubmittedBid {
            title: title.to_string(),
            budget: "$500-800".into(),
            description: "short".into(),
            full_description: "long".into(),
            proposal: "Hello,".into(),
            min_budget: 500,
            duration: BidDuration::Days(5),
            link: "https://example.com/p/1".into(),
            submitted_at: Utc::now(),
        }
    }

    fn sample_skip(title: &str) -> SkippedBid {
        SkippedBid {
            title: title.to_string(),
            link: "https://example.com/p/2".into(),
            budget: "N/A".into(),
            reason: SkipReason::RestrictedProject,
            description: String::new(),
            skills: vec!["React".into()],
            skipped_at: Utc::now(),
        }
    }

    #[test]
    fn records_are_write_once() {
        let (_dir, paths) = temp_paths();
        let store = BidStateStore::open(&paths).unwrap();

        assert!(store.record_submitted(sample_bid("a")).unwrap());
        assert!(!store.record_submitted(sample_bid("a")).unwrap());
        assert!(store.record_skipped(sample_skip("b")).unwrap());
        assert!(!store.record_skipped(sample_skip("b")).unwrap());

        assert!(store.contains("a"));
        assert!(store.contains("b"));
        assert_eq!(store.submitted_count(), 1);
    }

    #[test]
    fn a_title_never_lands_in_both_maps() {
        let (_dir, paths) = temp_paths();
        let store = BidStateStore::open(&paths).unwrap();

        assert!(store.record_submitted(sample_bid("a")).unwrap());
        assert!(!store.record_skipped(sample_skip("a")).unwrap());
        assert!(!store.has_skipped("a"));

        assert!(store.record_skipped(sample_skip("b")).unwrap());
        assert!(!store.record_submitted(sample_bid("b")).unwrap());
        assert!(!store.has_submitted("b"));
    }

    #[test]
    fn reopening_sees_persisted_records() {
        let (_dir, paths) = temp_paths();
        {
            let store = BidStateStore::open(&paths).unwrap();
            store.record_submitted(sample_bid("crm dashboard")).unwrap();
            store.record_skipped(sample_skip("restricted one")).unwrap();
        }

        let reopened = BidStateStore::open(&paths).unwrap();
        assert!(reopened.has_submitted("crm dashboard"));
        assert!(reopened.has_skipped("restricted one"));
        assert!(!reopened.has_skipped("crm dashboard"));
        assert_eq!(reopened.submitted_count(), 1);
    }

    #[test]
    fn missing_files_open_empty() {
        let (_dir, paths) = temp_paths();
        let store = BidStateStore::open(&paths).unwrap();
        assert_eq!(store.submitted_count(), 0);
        assert!(!store.contains("anything"));
    }

    #[test]
    fn state_files_are_title_keyed_json() {
        let (_dir, paths) = temp_paths();
        let store = BidStateStore::open(&paths).unwrap();
        store.record_submitted(sample_bid("a title")).unwrap();

        let raw = fs::read_to_string(&paths.submitted_path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["a title"]["min_budget"], 500);
        assert_eq!(value["a title"]["duration"]["kind"], "days");
    }
}
