//! The Printer driver: lists every stored record under a prefix in a human-readable
//! line format, honouring the same exclusion list the other drivers do.

use std::path::PathBuf;

use crate::error::Result;
use crate::exclude::is_excluded;
use crate::record::FileRecord;
use crate::store::RecordReader;
use crate::walk::WalkerState;

pub struct Printer {
    state: WalkerState,
    db_path: PathBuf,
    reader: Option<RecordReader>,
}

impl Printer {
    pub fn new(db_path: PathBuf) -> Self {
        Printer {
            state: WalkerState::new(),
            db_path,
            reader: None,
        }
    }

    pub fn start(&mut self) -> Result<()> {
        self.state.start()?;
        self.reader = Some(RecordReader::open(&self.db_path)?);
        Ok(())
    }

    /// Prints one line per stored record under `prefix`, in storage order, skipping
    /// anything matching `excludes`.
    pub fn start_walking(&mut self, prefix: &str, excludes: &[String]) -> Result<()> {
        self.state.begin_walking()?;
        let reader = self
            .reader
            .as_ref()
            .expect("start() must be called before start_walking()");
        reader.map_prefix(prefix, |record| {
            if is_excluded(&record.path, excludes) {
                return;
            }
            println!("{}", format_line(record));
        })
    }

    pub fn stop(&mut self) -> Result<()> {
        self.state.stop()?;
        self.reader = None;
        Ok(())
    }
}

/// `<mode> <YYYY-MM-DD HH:MM:SS (+offset)> <hex digest> <path>`
fn format_line(record: &FileRecord) -> String {
    let ts = record.modtime.format("%Y-%m-%d %H:%M:%S (%z)");
    format!("{} {} {} {}", record.mode, ts, record.hex_digest(), record.path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::Generator;

    #[test]
    fn line_format_contains_mode_timestamp_digest_and_path() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), b"hello").unwrap();
        let db_dir = tempfile::tempdir().unwrap();
        let db = db_dir.path().join("test.db");

        let mut gen = Generator::new(db.clone(), 1);
        gen.start().unwrap();
        gen.start_walking(&dir.path().to_string_lossy(), &[], false)
            .unwrap();
        gen.stop().unwrap();

        let reader = RecordReader::open(&db).unwrap();
        let path = dir.path().join("a.txt").to_string_lossy().into_owned();
        let record = reader.get(&path).unwrap().unwrap();
        let line = format_line(&record);
        assert!(line.contains(&path));
        assert!(line.contains(&record.hex_digest()));
        assert!(line.starts_with('-')); // regular file mode char
    }

    #[test]
    fn excluded_paths_never_reach_the_visitor() {
        let excludes = vec!["/secret".to_string()];
        assert!(is_excluded("/secret/file", &excludes));
    }
}
