//! Append-only ledger of encrypted records
//!
//! Layout inside the operator:
//! ```text
//! <prefix>/records/00000000000000000000.json   ["0x…", "0x…", …]
//! <prefix>/records/00000000000000000001.json
//! ```
//!
//! Ids start at 0 and grow in append order. Several ledgers may share one
//! store: a record file is only ever created, never replaced, so a writer
//! that loses the race for an id rescans and takes the next free one.

use std::sync::atomic::{AtomicU64, Ordering};

use opendal::{ErrorKind, Operator};
use sealwall_core::{Record, SealwallError, SealwallResult};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

/// Position of a record in the ledger
pub type RecordId = u64;

const ID_WIDTH: usize = 20;

/// Conflicting writers an append tolerates before giving up
const MAX_APPEND_ATTEMPTS: usize = 16;

pub struct Ledger {
    op: Operator,
    prefix: String,
    next_id: OnceCell<AtomicU64>,
}

impl Ledger {
    pub fn new(op: Operator, prefix: &str) -> Self {
        Self {
            op,
            prefix: prefix.trim_matches('/').to_string(),
            next_id: OnceCell::new(),
        }
    }

    fn records_dir(&self) -> String {
        if self.prefix.is_empty() {
            "records/".to_string()
        } else {
            format!("{}/records/", self.prefix)
        }
    }

    fn record_key(&self, id: RecordId) -> String {
        format!("{}{id:0width$}.json", self.records_dir(), width = ID_WIDTH)
    }

    /// Ids of the record files currently in the store, ascending.
    async fn scan_ids(&self) -> SealwallResult<Vec<RecordId>> {
        let dir = self.records_dir();
        let entries = match self.op.list(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(ledger_error(format!("listing {dir}: {e}"))),
        };

        let mut ids: Vec<RecordId> = entries
            .iter()
            .filter_map(|entry| entry.name().strip_suffix(".json"))
            .filter_map(|stem| stem.parse().ok())
            .collect();
        ids.sort_unstable();
        debug!(prefix = %self.prefix, count = ids.len(), "scanned ledger");
        Ok(ids)
    }

    /// One past the highest stored id.
    async fn scan_next_id(&self) -> SealwallResult<RecordId> {
        Ok(self.scan_ids().await?.last().map_or(0, |max| max + 1))
    }

    async fn counter(&self) -> SealwallResult<&AtomicU64> {
        self.next_id
            .get_or_try_init(|| async { self.scan_next_id().await.map(AtomicU64::new) })
            .await
    }

    /// Create `key` unless it already exists; `Ok(false)` means another
    /// writer holds it.
    async fn create_record(&self, key: &str, body: Vec<u8>) -> opendal::Result<bool> {
        let conditional = self.op.info().full_capability().write_with_if_not_exists;
        if !conditional && self.op.exists(key).await? {
            return Ok(false);
        }
        match self.op.write_with(key, body).if_not_exists(conditional).await {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == ErrorKind::ConditionNotMatch => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Append one record and return its id.
    ///
    /// The record is stored whole, so word order and count are preserved.
    pub async fn append(&self, record: &Record) -> SealwallResult<RecordId> {
        if record.is_empty() {
            return Err(ledger_error("refusing to append an empty record".into()));
        }
        let body = serde_json::to_vec(record)
            .map_err(|e| SealwallError::Format(format!("serializing record: {e}")))?;

        let counter = self.counter().await?;
        for _ in 0..MAX_APPEND_ATTEMPTS {
            let id = counter.fetch_add(1, Ordering::SeqCst);
            let key = self.record_key(id);

            match self.create_record(&key, body.clone()).await {
                Ok(true) => {
                    info!(id, words = record.len(), "appended record");
                    return Ok(id);
                }
                Ok(false) => {
                    debug!(id, "id taken by another writer, rescanning");
                    counter.fetch_max(self.scan_next_id().await?, Ordering::SeqCst);
                }
                Err(e) => {
                    // the id is still free; let the next append retry it
                    counter.fetch_min(id, Ordering::SeqCst);
                    return Err(ledger_error(format!("writing {key}: {e}")));
                }
            }
        }
        Err(ledger_error(format!(
            "no free record id after {MAX_APPEND_ATTEMPTS} attempts"
        )))
    }

    /// Number of records in the ledger, including other writers' appends.
    pub async fn count(&self) -> SealwallResult<u64> {
        Ok(self.scan_ids().await?.len() as u64)
    }

    /// Fetch one record; `None` if no record has that id.
    pub async fn get(&self, id: RecordId) -> SealwallResult<Option<Record>> {
        let key = self.record_key(id);
        let bytes = match self.op.read(&key).await {
            Ok(buffer) => buffer.to_vec(),
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(ledger_error(format!("reading {key}: {e}"))),
        };
        let record = serde_json::from_slice(&bytes)
            .map_err(|e| SealwallError::Format(format!("parsing {key}: {e}")))?;
        Ok(Some(record))
    }

    /// All records with their ids, in append order.
    ///
    /// Ids left unused by a failed write are skipped.
    pub async fn entries(&self) -> SealwallResult<Vec<(RecordId, Record)>> {
        let ids = self.scan_ids().await?;
        let expected = ids.last().map_or(0, |max| max + 1);
        if expected != ids.len() as u64 {
            warn!(
                prefix = %self.prefix,
                missing = expected - ids.len() as u64,
                "ledger has unused ids"
            );
        }

        let mut entries = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(record) = self.get(id).await? {
                entries.push((id, record));
            }
        }
        Ok(entries)
    }

    /// All records in append order.
    pub async fn list(&self) -> SealwallResult<Vec<Record>> {
        Ok(self.entries().await?.into_iter().map(|(_, r)| r).collect())
    }
}

fn ledger_error(msg: String) -> SealwallError {
    SealwallError::Ledger(msg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operator::memory_operator;
    use sealwall_core::{Word, WORD_SIZE};

    fn record(fill: u8, words: usize) -> Record {
        Record::new(
            (0..words)
                .map(|i| Word::from_bytes([fill.wrapping_add(i as u8); WORD_SIZE]))
                .collect(),
        )
    }

    fn fs_operator(root: &std::path::Path) -> Operator {
        Operator::new(opendal::services::Fs::default().root(root.to_str().unwrap()))
            .unwrap()
            .finish()
    }

    #[tokio::test]
    async fn test_append_assigns_dense_ids() {
        let ledger = Ledger::new(memory_operator().unwrap(), "sealwall");
        assert_eq!(ledger.count().await.unwrap(), 0);

        for expected in 0..3u64 {
            let id = ledger.append(&record(expected as u8, 8)).await.unwrap();
            assert_eq!(id, expected);
        }
        assert_eq!(ledger.count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_get_preserves_words() {
        let ledger = Ledger::new(memory_operator().unwrap(), "sealwall");
        let original = record(0x10, 16);
        let id = ledger.append(&original).await.unwrap();

        let fetched = ledger.get(id).await.unwrap().unwrap();
        assert_eq!(fetched, original);
        assert!(ledger.get(id + 1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_in_append_order() {
        let ledger = Ledger::new(memory_operator().unwrap(), "sealwall");
        let records: Vec<Record> = (0..4).map(|i| record(i * 40, 8)).collect();
        for r in &records {
            ledger.append(r).await.unwrap();
        }
        assert_eq!(ledger.list().await.unwrap(), records);
    }

    #[tokio::test]
    async fn test_empty_record_rejected() {
        let ledger = Ledger::new(memory_operator().unwrap(), "sealwall");
        let err = ledger.append(&Record::default()).await.unwrap_err();
        assert!(matches!(err, SealwallError::Ledger(_)));
        assert_eq!(ledger.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_stored_as_hex_json() {
        let op = memory_operator().unwrap();
        let ledger = Ledger::new(op.clone(), "/pfx/");
        ledger.append(&record(0xAB, 1)).await.unwrap();

        let raw = op
            .read("pfx/records/00000000000000000000.json")
            .await
            .unwrap()
            .to_vec();
        let value: Vec<String> = serde_json::from_slice(&raw).unwrap();
        assert_eq!(value, vec![format!("0x{}", "ab".repeat(WORD_SIZE))]);
    }

    #[tokio::test]
    async fn test_counter_seeded_from_existing_store() {
        let tmp = tempfile::tempdir().unwrap();

        let first = Ledger::new(fs_operator(tmp.path()), "sealwall");
        first.append(&record(1, 8)).await.unwrap();
        first.append(&record(2, 8)).await.unwrap();
        drop(first);

        let reopened = Ledger::new(fs_operator(tmp.path()), "sealwall");
        assert_eq!(reopened.count().await.unwrap(), 2);
        assert_eq!(reopened.append(&record(3, 8)).await.unwrap(), 2);
        assert_eq!(reopened.list().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_two_writers_never_share_an_id() {
        let tmp = tempfile::tempdir().unwrap();
        let a = Ledger::new(fs_operator(tmp.path()), "sealwall");
        let b = Ledger::new(fs_operator(tmp.path()), "sealwall");
        let (ra, rb) = (record(0xA0, 8), record(0xB0, 8));

        let (id_a, id_b) = tokio::join!(a.append(&ra), b.append(&rb));
        let (id_a, id_b) = (id_a.unwrap(), id_b.unwrap());
        assert_ne!(id_a, id_b);

        let reader = Ledger::new(fs_operator(tmp.path()), "sealwall");
        assert_eq!(reader.count().await.unwrap(), 2);
        assert_eq!(reader.get(id_a).await.unwrap().unwrap(), ra);
        assert_eq!(reader.get(id_b).await.unwrap().unwrap(), rb);
    }

    #[tokio::test]
    async fn test_stale_writer_skips_taken_ids() {
        let op = memory_operator().unwrap();
        let a = Ledger::new(op.clone(), "sealwall");
        let b = Ledger::new(op, "sealwall");

        // both counters seeded while the ledger is empty
        assert_eq!(a.count().await.unwrap(), 0);
        a.counter().await.unwrap();
        b.counter().await.unwrap();

        for i in 0..3 {
            a.append(&record(i, 8)).await.unwrap();
        }
        assert_eq!(b.append(&record(0xEE, 8)).await.unwrap(), 3);
        assert_eq!(b.list().await.unwrap().len(), 4);
        assert_eq!(a.get(0).await.unwrap().unwrap(), record(0, 8));
    }

    #[tokio::test]
    async fn test_reopen_after_gap_keeps_existing_records() {
        let tmp = tempfile::tempdir().unwrap();
        let op = fs_operator(tmp.path());
        let survivor = record(0x11, 8);
        op.write(
            "sealwall/records/00000000000000000001.json",
            serde_json::to_vec(&survivor).unwrap(),
        )
        .await
        .unwrap();

        let ledger = Ledger::new(fs_operator(tmp.path()), "sealwall");
        assert_eq!(ledger.count().await.unwrap(), 1);
        assert_eq!(ledger.append(&record(0x22, 8)).await.unwrap(), 2);
        assert_eq!(ledger.get(1).await.unwrap().unwrap(), survivor);

        let entries = ledger.entries().await.unwrap();
        let ids: Vec<RecordId> = entries.iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(ledger.list().await.unwrap()[0], survivor);
    }

    #[tokio::test]
    async fn test_prefixes_are_isolated() {
        let op = memory_operator().unwrap();
        let a = Ledger::new(op.clone(), "a");
        let b = Ledger::new(op, "b");
        a.append(&record(1, 8)).await.unwrap();

        assert_eq!(a.count().await.unwrap(), 1);
        assert_eq!(b.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_corrupt_record_is_format_error() {
        let op = memory_operator().unwrap();
        op.write("sealwall/records/00000000000000000000.json", b"not json".to_vec())
            .await
            .unwrap();
        let ledger = Ledger::new(op, "sealwall");
        assert_eq!(ledger.count().await.unwrap(), 1);
        assert!(matches!(ledger.get(0).await, Err(SealwallError::Format(_))));
    }
}
