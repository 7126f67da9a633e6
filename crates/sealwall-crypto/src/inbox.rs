//! Batch decryption of many ledger records on the recipient device
//!
//! The private key is imported once and shared by a bounded rayon pool.
//! Every record gets its own result, so one unreadable record never hides
//! the others.

use std::sync::atomic::{AtomicU64, Ordering};

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{info, warn};

use sealwall_core::Record;

use crate::error::{CryptoError, CryptoResult};
use crate::provider::CryptoProvider;
use crate::service::EncryptionService;

/// Upper bound for the automatic worker count
const MAX_AUTO_WORKERS: usize = 8;

/// Upper bound for an explicitly requested worker count
const MAX_WORKERS: usize = MAX_AUTO_WORKERS * 4;

/// Progress callback type (records_done, records_total, message)
pub type ProgressFn = Box<dyn Fn(u64, u64, &str) + Send + Sync>;

/// Outcome for one record, in input order.
#[derive(Debug)]
pub struct InboxEntry {
    pub index: usize,
    pub result: CryptoResult<String>,
}

impl InboxEntry {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Worker count for `requested` (0 means available parallelism, capped).
pub fn worker_count(requested: usize) -> usize {
    if requested > 0 {
        return requested.min(MAX_WORKERS);
    }
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .min(MAX_AUTO_WORKERS)
}

/// Decrypt every record with the local private key.
///
/// Fails as a whole only when the key is missing or the pool cannot start.
pub fn decrypt_all<P: CryptoProvider>(
    service: &EncryptionService<P>,
    records: &[Record],
    workers: usize,
) -> CryptoResult<Vec<InboxEntry>> {
    decrypt_all_with_progress(service, records, workers, None)
}

/// [`decrypt_all`], reporting each finished record to `progress`.
pub fn decrypt_all_with_progress<P: CryptoProvider>(
    service: &EncryptionService<P>,
    records: &[Record],
    workers: usize,
    progress: Option<&ProgressFn>,
) -> CryptoResult<Vec<InboxEntry>> {
    if records.is_empty() {
        return Ok(Vec::new());
    }
    let private = service.private_key()?;
    let workers = worker_count(workers).min(records.len());
    let pool = build_pool(workers)?;

    let total = records.len() as u64;
    let done = AtomicU64::new(0);
    let entries: Vec<InboxEntry> = pool.install(|| {
        records
            .par_iter()
            .enumerate()
            .map(|(index, record)| {
                let result = service.decrypt_with_key(&private, record);
                if let Some(report) = progress {
                    let n = done.fetch_add(1, Ordering::Relaxed) + 1;
                    report(n, total, &format!("record {index}"));
                }
                InboxEntry { index, result }
            })
            .collect()
    });

    let failed = entries.iter().filter(|e| !e.is_ok()).count();
    for entry in entries.iter() {
        if let Err(e) = &entry.result {
            warn!(index = entry.index, error = %e, "record could not be decrypted");
        }
    }
    info!(records = records.len(), failed, workers, "inbox decrypted");
    Ok(entries)
}

fn build_pool(workers: usize) -> CryptoResult<ThreadPool> {
    ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("sealwall-inbox-{i}"))
        .build()
        .map_err(|e| CryptoError::WorkerPool(e.to_string()))
}
