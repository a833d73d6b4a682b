//! Run configuration resolved once from parsed CLI arguments. There is no
//! separate config-file format in scope — the flags are the whole surface.

use std::path::PathBuf;

/// Which driver a run should execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Generate,
    Compare,
    Show,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub mode: Mode,
    pub path: String,
    pub db: PathBuf,
    pub exclude_from: PathBuf,
    pub workers: usize,
    pub verbose: bool,
}

impl Config {
    /// Applies the CLI defaulting rules: an invalid worker count (zero or
    /// unparsable) falls back to the host CPU count rather than erroring.
    pub fn resolve(
        gendb: bool,
        show: bool,
        path: String,
        db: PathBuf,
        exclude_from: PathBuf,
        num: Option<i64>,
        verbose: bool,
    ) -> Self {
        let mode = if show {
            Mode::Show
        } else if gendb {
            Mode::Generate
        } else {
            Mode::Compare
        };

        let workers = match num {
            Some(n) if n > 0 => n as usize,
            Some(n) => {
                log::warn!("invalid worker count {n}; falling back to host CPU count");
                num_cpus::get()
            }
            None => num_cpus::get(),
        };

        Config {
            mode,
            path,
            db,
            exclude_from,
            workers: workers.max(1),
            verbose,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_worker_count_falls_back_to_default() {
        let cfg = Config::resolve(
            false,
            false,
            "/".into(),
            "fcheck.db".into(),
            "excludes.txt".into(),
            Some(0),
            false,
        );
        assert_eq!(cfg.workers, num_cpus::get().max(1));
    }

    #[test]
    fn show_overrides_gendb() {
        let cfg = Config::resolve(
            true,
            true,
            "/".into(),
            "fcheck.db".into(),
            "excludes.txt".into(),
            None,
            false,
        );
        assert_eq!(cfg.mode, Mode::Show);
    }
}
