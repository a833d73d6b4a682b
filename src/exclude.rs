//! Exclusion list: a newline-separated file of path prefixes, read once before a
//! walk starts and treated as read-only for the rest of the run.

use std::path::Path;

/// Reads `path`, trimming each line and dropping blank ones (with a warning — see the
/// "empty prefix" open question in the design doc, resolved as a no-op rather than a
/// footgun that matches every path). A missing file yields an empty set and a warning,
/// never an error: config problems degrade to defaults rather than aborting the run.
pub fn read_exclusions(path: &Path) -> Vec<String> {
    let contents = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            log::warn!(
                "exclude file {} not readable ({e}); continuing with no exclusions",
                path.display()
            );
            return Vec::new();
        }
    };

    let mut out = Vec::new();
    for (lineno, raw) in contents.lines().enumerate() {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            log::warn!(
                "{}:{}: blank exclusion entry ignored (would otherwise match every path)",
                path.display(),
                lineno + 1
            );
            continue;
        }
        out.push(trimmed.to_string());
    }
    out
}

/// True if `path` begins with any entry in `excludes`. Prefix matching is plain
/// string comparison, not glob — `"/bin/ps"` also excludes `"/bin/psql"`.
pub fn is_excluded(path: &str, excludes: &[String]) -> bool {
    excludes.iter().any(|prefix| path.starts_with(prefix.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_lines_are_dropped_not_matched() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("excludes.txt");
        std::fs::write(&file, "  /bin/ps \n\n/etc\n   \n").unwrap();
        let excludes = read_exclusions(&file);
        assert_eq!(excludes, vec!["/bin/ps".to_string(), "/etc".to_string()]);
        assert!(!is_excluded("/anything", &excludes));
    }

    #[test]
    fn missing_file_yields_empty_set() {
        let excludes = read_exclusions(Path::new("/does/not/exist/excludes.txt"));
        assert!(excludes.is_empty());
    }

    #[test]
    fn prefix_match_is_a_documented_footgun_for_sibling_names() {
        let excludes = vec!["/bin/ps".to_string()];
        assert!(is_excluded("/bin/psql", &excludes));
        assert!(is_excluded("/bin/ps", &excludes));
        assert!(!is_excluded("/bin/ls", &excludes));
    }
}
