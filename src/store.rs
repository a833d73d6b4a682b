//! The record store: an append-only writer backed by a single writer
//! thread reading an MPSC channel, and a random-access reader that resolves lookups
//! through the path-trie index.
//!
//! Two files share a base name: `<db>` (the framed record sequence) and `<db>.index`
//! (the serialised [`PathIndex`]).

use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::mpsc;
use std::thread::JoinHandle;

use crate::error::{Error, Result};
use crate::index::PathIndex;
use crate::record::FileRecord;

fn index_path(db: &Path) -> PathBuf {
    let mut p = db.as_os_str().to_owned();
    p.push(".index");
    PathBuf::from(p)
}

/// Single-writer append log. `put` hands a record to the writer thread over a
/// channel; only that thread ever touches the file's cursor, so no append races.
pub struct RecordWriter {
    sender: Option<mpsc::Sender<FileRecord>>,
    handle: Option<JoinHandle<Result<(File, PathIndex)>>>,
    db_path: PathBuf,
}

impl RecordWriter {
    /// Truncates or creates `<db>`, opens it for writing, and starts a fresh index.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let db_path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&db_path)?;

        let (sender, receiver) = mpsc::channel::<FileRecord>();
        let handle = std::thread::Builder::new()
            .name("fcheck-writer".into())
            .spawn(move || writer_loop(file, receiver))
            .expect("failed to spawn writer thread");

        Ok(RecordWriter {
            sender: Some(sender),
            handle: Some(handle),
            db_path,
        })
    }

    /// Asynchronously enqueues `record` for the writer thread to append.
    pub fn put(&self, record: FileRecord) -> Result<()> {
        match &self.sender {
            Some(sender) => sender.send(record).map_err(|_| Error::WriterClosed),
            None => Err(Error::WriterClosed),
        }
    }

    /// Drains the queue, joins the writer thread, and atomically persists the index
    /// sidecar (temp file + rename).
    pub fn close(mut self) -> Result<()> {
        self.close_mut()
    }

    fn close_mut(&mut self) -> Result<()> {
        // Dropping the sender is what lets the writer thread's recv loop end.
        self.sender.take();
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };
        let (mut file, index) = handle.join().expect("writer thread panicked")?;
        file.flush()?;

        let idx_path = index_path(&self.db_path);
        let dir = idx_path.parent().unwrap_or_else(|| Path::new("."));
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        index.save(&mut tmp)?;
        tmp.persist(&idx_path).map_err(|e| e.error)?;
        Ok(())
    }
}

impl Drop for RecordWriter {
    fn drop(&mut self) {
        if self.handle.is_some() {
            let _ = self.close_mut();
        }
    }
}

fn writer_loop(
    mut file: File,
    receiver: mpsc::Receiver<FileRecord>,
) -> Result<(File, PathIndex)> {
    let mut index = PathIndex::new();
    let mut offset: u64 = 0;
    for record in receiver {
        let encoded = record.encode()?;
        index.set(&record.path, offset as i64);
        file.write_all(&(encoded.len() as u16).to_le_bytes())?;
        file.write_all(&encoded)?;
        // 2-byte length prefix plus the encoded record.
        offset += 2 + encoded.len() as u64;
    }
    Ok((file, index))
}

/// Random-access reader over a previously written record store.
pub struct RecordReader {
    file: Mutex<File>,
    db_path: PathBuf,
    index: PathIndex,
}

impl RecordReader {
    /// Opens `<db>` read-only and loads `<db>.index` into memory. A missing sidecar
    /// is a fatal open error.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let db_path = path.as_ref().to_path_buf();
        let idx_path = index_path(&db_path);
        if !idx_path.exists() {
            return Err(Error::MissingIndex(idx_path));
        }
        let index = PathIndex::load(File::open(&idx_path)?)?;
        let file = File::open(&db_path)?;
        Ok(RecordReader {
            file: Mutex::new(file),
            db_path,
            index,
        })
    }

    /// Looks up `path`; `Ok(None)` means it was never stored. A decoded record whose
    /// path disagrees with the lookup key means the index and data have drifted apart
    /// — fatal (`Error::IndexSkew`).
    pub fn get(&self, path: &str) -> Result<Option<FileRecord>> {
        let offset = match self.index.get(path) {
            Some(offset) if offset >= 0 => offset,
            _ => return Ok(None),
        };
        let mut file = self.file.lock().unwrap();
        file.seek(SeekFrom::Start(offset as u64))?;
        let record = FileRecord::read_framed(&mut *file)?.ok_or(Error::TruncatedRecord)?;
        if record.path != path {
            return Err(Error::IndexSkew {
                key: path.to_string(),
                stored: record.path,
            });
        }
        Ok(Some(record))
    }

    /// Streams the record file sequentially on an independent handle (so it never
    /// contends with concurrent `get` calls), invoking `visitor` for every record
    /// whose path starts with `prefix`.
    pub fn map_prefix<F: FnMut(&FileRecord)>(&self, prefix: &str, mut visitor: F) -> Result<()> {
        let mut file = File::open(&self.db_path)?;
        while let Some(record) = FileRecord::read_framed(&mut file)? {
            if record.path.starts_with(prefix) {
                visitor(&record);
            }
        }
        Ok(())
    }

    pub fn index(&self) -> &PathIndex {
        &self.index
    }
}
