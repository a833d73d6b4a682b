//! The Generator driver: walks a root, computes a SHA-512 digest for every regular
//! file, and appends the resulting records to a fresh record store.
//!
//! Bounded concurrency is enforced by a counting [`Semaphore`] with capacity equal to
//! the configured worker count: for each entry the traversal thread acquires a
//! permit, spawns a thread to digest-and-store it, and that thread releases the
//! permit on exit. Shutdown waits for every permit to return before closing the
//! writer.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::thread;

use indicatif::{ProgressBar, ProgressStyle};

use crate::error::{Error, Result};
use crate::semaphore::Semaphore;
use crate::store::RecordWriter;
use crate::walk::{WalkerState, walk_tree};

pub struct Generator {
    state: WalkerState,
    db_path: PathBuf,
    writer: Option<Arc<RecordWriter>>,
    workers: usize,
}

impl Generator {
    pub fn new(db_path: PathBuf, workers: usize) -> Self {
        Generator {
            state: WalkerState::new(),
            db_path,
            writer: None,
            workers: workers.max(1),
        }
    }

    pub fn start(&mut self) -> Result<()> {
        self.state.start()?;
        self.writer = Some(Arc::new(RecordWriter::create(&self.db_path)?));
        Ok(())
    }

    pub fn start_walking(&mut self, path: &str, excludes: &[String], verbose: bool) -> Result<()> {
        self.state.begin_walking()?;
        let writer = self
            .writer
            .clone()
            .expect("start() must be called before start_walking()");
        let sem = Arc::new(Semaphore::new(self.workers));
        let first_error: Arc<Mutex<Option<Error>>> = Arc::new(Mutex::new(None));
        let mut handles = Vec::new();

        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {pos} entries {msg}")
                .unwrap(),
        );

        walk_tree(path, excludes, verbose, |mut record| {
            pb.inc(1);
            pb.set_message(record.path.clone());
            sem.acquire();
            let writer = Arc::clone(&writer);
            let sem = Arc::clone(&sem);
            let first_error = Arc::clone(&first_error);
            handles.push(thread::spawn(move || {
                if let Err(e) = record.calc_digest() {
                    log::warn!("digest failed for {}: {e}", record.path);
                    record.digest.clear();
                }
                if let Err(e) = writer.put(record) {
                    let mut slot = first_error.lock().unwrap();
                    if slot.is_none() {
                        *slot = Some(e);
                    }
                }
                sem.release();
            }));
        })?;

        for handle in handles {
            let _ = handle.join();
        }
        sem.drain();
        pb.finish_and_clear();

        if let Some(e) = first_error.lock().unwrap().take() {
            return Err(e);
        }
        Ok(())
    }

    pub fn stop(&mut self) -> Result<()> {
        self.state.stop()?;
        if let Some(writer) = self.writer.take() {
            match Arc::try_unwrap(writer) {
                Ok(writer) => writer.close()?,
                Err(_) => {
                    log::error!("writer still had outstanding references at shutdown");
                    return Err(Error::InvalidState);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::RecordReader;

    fn make_tree() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), b"hello").unwrap();
        std::fs::write(dir.path().join("b.txt"), b"world").unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("sub").join("c.txt"), b"nested").unwrap();
        dir
    }

    #[test]
    fn generate_then_lookup_every_visited_path() {
        let tree = make_tree();
        let db_dir = tempfile::tempdir().unwrap();
        let db = db_dir.path().join("test.db");

        let mut gen = Generator::new(db.clone(), 2);
        gen.start().unwrap();
        gen.start_walking(&tree.path().to_string_lossy(), &[], false)
            .unwrap();
        gen.stop().unwrap();

        let reader = RecordReader::open(&db).unwrap();
        let a = tree.path().join("a.txt").to_string_lossy().into_owned();
        let found = reader.get(&a).unwrap().unwrap();
        assert_eq!(found.path, a);
        assert_eq!(found.digest.len(), 64); // SHA-512
    }

    #[test]
    fn empty_file_has_empty_digest() {
        let tree = tempfile::tempdir().unwrap();
        std::fs::write(tree.path().join("empty.txt"), b"").unwrap();
        let db_dir = tempfile::tempdir().unwrap();
        let db = db_dir.path().join("test.db");

        let mut gen = Generator::new(db.clone(), 1);
        gen.start().unwrap();
        gen.start_walking(&tree.path().to_string_lossy(), &[], false)
            .unwrap();
        gen.stop().unwrap();

        let reader = RecordReader::open(&db).unwrap();
        let p = tree.path().join("empty.txt").to_string_lossy().into_owned();
        let found = reader.get(&p).unwrap().unwrap();
        assert!(found.digest.is_empty());
    }
}
