use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, mpsc};
use std::thread;

use camino::Utf8Path;
use tracing::{error, info};

use crate::domain::{Outcome, Record, ReportId};
use crate::fetch::PdfFetcher;
use crate::processor::{process_record, record_outcome};
use crate::store::MetadataStore;
use crate::validate::UrlValidator;

/// Shared cancellation token. Workers check it before taking new work; a
/// record already in flight finishes its metadata upsert first.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Fans record processing out over a bounded pool of worker threads. Sizing
/// is for I/O-bound work: workers spend most of their time blocked on the
/// network, so the pool is expected to exceed the core count.
pub struct Runner {
    workers: usize,
}

impl Runner {
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
        }
    }

    /// Processes every record and returns (identifier, outcome) pairs sorted
    /// ascending by identifier. Results are collected in completion order;
    /// the sort makes the output deterministic regardless of timing. A panic
    /// in one record's processing is contained, recorded as a failed outcome,
    /// and never aborts sibling records.
    pub fn run(
        &self,
        records: Vec<Record>,
        validator: &dyn UrlValidator,
        fetcher: &dyn PdfFetcher,
        store: &MetadataStore,
        download_dir: &Utf8Path,
        cancel: &CancelFlag,
    ) -> Vec<(ReportId, Outcome)> {
        let total = records.len();
        let queue = Mutex::new(VecDeque::from(records));
        let (tx, rx) = mpsc::channel::<(ReportId, Outcome)>();

        thread::scope(|scope| {
            for _ in 0..self.workers.min(total.max(1)) {
                let tx = tx.clone();
                let queue = &queue;
                scope.spawn(move || {
                    loop {
                        if cancel.is_cancelled() {
                            break;
                        }
                        let record = queue
                            .lock()
                            .unwrap_or_else(PoisonError::into_inner)
                            .pop_front();
                        let Some(record) = record else {
                            break;
                        };

                        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                            process_record(&record, validator, fetcher, store, download_dir)
                        }));
                        let pair = match outcome {
                            Ok(pair) => pair,
                            Err(_) => {
                                error!(id = %record.id, "record processing panicked");
                                record_outcome(store, &record.id, Outcome::Failed);
                                (record.id.clone(), Outcome::Failed)
                            }
                        };
                        if tx.send(pair).is_err() {
                            break;
                        }
                    }
                });
            }
            drop(tx);
        });

        let mut results: Vec<(ReportId, Outcome)> = rx.into_iter().collect();
        results.sort_by(|a, b| a.0.cmp(&b.0));

        if cancel.is_cancelled() && results.len() < total {
            info!(
                processed = results.len(),
                total, "run cancelled before all records were processed"
            );
        }
        results
    }
}
