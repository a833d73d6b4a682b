//! The Comparator driver: walks a root against a previously generated store and
//! classifies every entry as new, changed, or unchanged, then makes a second pass
//! over the store to find paths that vanished from disk.
//!
//! A fixed-size worker pool reads skeletal records off a rendezvous (zero-capacity)
//! channel — the traversal thread blocks until a worker is free, which caps memory
//! use regardless of tree size. Workers push classifications onto a result channel
//! that a single accumulator thread drains into the final report. Quit tokens are
//! sent to every worker and joined before the accumulator is told to stop, so no
//! result is ever dropped on the floor.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::thread;

use crate::error::{Error, Result};
use crate::exclude::is_excluded;
use crate::store::RecordReader;
use crate::walk::{WalkerState, walk_tree};

#[derive(Debug, Default, Clone)]
pub struct CompareReport {
    pub new_files: Vec<String>,
    pub changed_files: Vec<String>,
    pub removed_files: Vec<String>,
}

enum ResultMsg {
    New(String),
    Changed(String),
}

pub struct Comparator {
    state: WalkerState,
    db_path: PathBuf,
    reader: Option<Arc<RecordReader>>,
    workers: usize,
    report: CompareReport,
    last_path: Option<String>,
    last_excludes: Vec<String>,
}

impl Comparator {
    pub fn new(db_path: PathBuf, workers: usize) -> Self {
        Comparator {
            state: WalkerState::new(),
            db_path,
            reader: None,
            workers: workers.max(1),
            report: CompareReport::default(),
            last_path: None,
            last_excludes: Vec::new(),
        }
    }

    pub fn start(&mut self) -> Result<()> {
        self.state.start()?;
        self.reader = Some(Arc::new(RecordReader::open(&self.db_path)?));
        Ok(())
    }

    pub fn start_walking(&mut self, path: &str, excludes: &[String], verbose: bool) -> Result<()> {
        self.state.begin_walking()?;
        let reader = self
            .reader
            .clone()
            .expect("start() must be called before start_walking()");
        self.last_path = Some(path.to_string());
        self.last_excludes = excludes.to_vec();

        let (job_tx, job_rx) = std::sync::mpsc::sync_channel::<Option<crate::record::FileRecord>>(0);
        let job_rx = Arc::new(Mutex::new(job_rx));
        let (res_tx, res_rx) = std::sync::mpsc::channel::<ResultMsg>();
        let first_error: Arc<Mutex<Option<Error>>> = Arc::new(Mutex::new(None));

        let mut worker_handles = Vec::with_capacity(self.workers);
        for _ in 0..self.workers {
            let job_rx = Arc::clone(&job_rx);
            let reader = Arc::clone(&reader);
            let res_tx = res_tx.clone();
            let first_error = Arc::clone(&first_error);
            worker_handles.push(thread::spawn(move || {
                loop {
                    let job = {
                        let rx = job_rx.lock().unwrap();
                        rx.recv()
                    };
                    let Ok(Some(mut record)) = job else { break };
                    match reader.get(&record.path) {
                        Ok(None) => {
                            let _ = res_tx.send(ResultMsg::New(record.path.clone()));
                        }
                        Ok(Some(old)) => {
                            if record.lite_match(&old) {
                                if let Err(e) = record.calc_digest() {
                                    log::warn!("digest failed for {}: {e}", record.path);
                                }
                            }
                            if !record.matches(&old) {
                                let _ = res_tx.send(ResultMsg::Changed(record.path.clone()));
                            }
                        }
                        Err(e) => {
                            log::error!("fatal store error comparing {}: {e}", record.path);
                            let mut slot = first_error.lock().unwrap();
                            if slot.is_none() {
                                *slot = Some(e);
                            }
                        }
                    }
                }
            }));
        }
        drop(res_tx);

        let accumulator = thread::spawn(move || {
            let mut new_files = Vec::new();
            let mut changed_files = Vec::new();
            for msg in res_rx {
                match msg {
                    ResultMsg::New(p) => new_files.push(p),
                    ResultMsg::Changed(p) => changed_files.push(p),
                }
            }
            (new_files, changed_files)
        });

        let walk_result = walk_tree(path, excludes, verbose, |record| {
            let _ = job_tx.send(Some(record));
        });

        for _ in 0..self.workers {
            let _ = job_tx.send(None);
        }
        drop(job_tx);
        for h in worker_handles {
            let _ = h.join();
        }

        let (new_files, changed_files) = accumulator.join().expect("accumulator thread panicked");
        self.report.new_files = new_files;
        self.report.changed_files = changed_files;

        walk_result?;
        if let Some(e) = first_error.lock().unwrap().take() {
            return Err(e);
        }
        Ok(())
    }

    pub fn stop(&mut self) -> Result<()> {
        self.state.stop()?;
        if let Some(reader) = self.reader.take() {
            let prefix = self.last_path.take().unwrap_or_default();
            let excludes = std::mem::take(&mut self.last_excludes);
            let mut removed = Vec::new();
            reader.map_prefix(&prefix, |record| {
                if is_excluded(&record.path, &excludes) {
                    return;
                }
                match std::fs::symlink_metadata(&record.path) {
                    Ok(_) => {}
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                        removed.push(record.path.clone());
                    }
                    Err(e) => log::warn!("lstat failed for {}: {e}", record.path),
                }
            })?;
            self.report.removed_files = removed;
        }
        Ok(())
    }

    pub fn report(&self) -> &CompareReport {
        &self.report
    }
}
