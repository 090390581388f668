//! Rotation target selection
//!
//! Scans the log directory, decides which name the overflowing live file
//! should be renamed to, and removes the oldest file when the count budget
//! requires it.

use std::path::Path;
use std::time::SystemTime;

use tracing::warn;

/// Largest index handed out before the numbering restarts
const MAX_FILE_INDEX: u64 = 2_147_483_640;

/// First index probed once the index space tops out
const INDEX_NEW_START: u64 = 10_240;

/// A directory entry matching the log naming pattern
#[derive(Clone)]
struct Candidate {
    name: String,
    modified: SystemTime,
    size: u64,
}

/// Parse a file name into its rotation index.
///
/// Returns `Some(0)` for the bare prefix (the live file), `Some(n)` for
/// `<prefix>.<n>` with positive `n`, and `None` for everything else.
fn parse_index(name: &str, prefix: &str) -> Option<u64> {
    let rest = name.strip_prefix(prefix)?;
    if rest.is_empty() {
        return Some(0);
    }
    let digits = rest.strip_prefix('.')?;
    match digits.parse::<u64>() {
        Ok(n) if n > 0 => Some(n),
        _ => None,
    }
}

fn rotated_name(prefix: &str, index: u64) -> String {
    format!("{}.{}", prefix, index)
}

/// Pick the next rotation index given the indices already in use.
///
/// Indices grow monotonically until [`MAX_FILE_INDEX`]; after that the
/// allocation restarts at [`INDEX_NEW_START`] and probes forward for the
/// first free slot, giving up after `len + 3` probes.
fn next_index(numbers: &[u64]) -> u64 {
    let Some(&max) = numbers.iter().max() else {
        return 0;
    };
    if max < MAX_FILE_INDEX {
        return max + 1;
    }
    for probe in 0..(numbers.len() as u64 + 3) {
        let candidate = INDEX_NEW_START + probe;
        if !numbers.contains(&candidate) {
            return candidate;
        }
    }
    1
}

fn remove_file(dir: &Path, name: &str) {
    let path = dir.join(name);
    if let Err(e) = std::fs::remove_file(&path) {
        warn!("choose_file: remove {}: {}", path.display(), e);
    }
}

/// Decide which name the overflowing live file should be renamed to.
///
/// Counts the live file and its rotated siblings in `dir`, removes the
/// single oldest file when the count budget demands it, and returns the
/// rotation target name. Filesystem errors degrade rather than fail: on a
/// directory read error the bare prefix is returned so writing can proceed,
/// unreadable entries are skipped, and a failed removal leaves a leaked
/// file that is retried on the next overflow.
pub fn choose_file(dir: &Path, prefix: &str, max_size: u64, max_count: usize) -> String {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("choose_file: read dir {}: {}", dir.display(), e);
            return prefix.to_string();
        }
    };

    let mut numbers: Vec<u64> = Vec::new();
    let mut count = 0usize;
    let mut oldest: Option<Candidate> = None;
    let mut newest: Option<Candidate> = None;

    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("choose_file: read entry in {}: {}", dir.display(), e);
                continue;
            }
        };
        let name = entry.file_name().to_string_lossy().into_owned();
        let Some(index) = parse_index(&name, prefix) else {
            continue;
        };
        let metadata = match entry.metadata() {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!("choose_file: stat {}: {}", entry.path().display(), e);
                continue;
            }
        };
        if metadata.is_dir() {
            continue;
        }
        let modified = match metadata.modified() {
            Ok(modified) => modified,
            Err(e) => {
                warn!("choose_file: mtime of {}: {}", entry.path().display(), e);
                continue;
            }
        };

        numbers.push(index);
        count += 1;

        let candidate = Candidate {
            name,
            modified,
            size: metadata.len(),
        };
        if oldest.as_ref().map_or(true, |o| candidate.modified < o.modified) {
            oldest = Some(candidate.clone());
        }
        if newest.as_ref().map_or(true, |n| candidate.modified > n.modified) {
            newest = Some(candidate);
        }
    }

    let (oldest, newest) = match (oldest, newest) {
        (Some(oldest), Some(newest)) => (oldest, newest),
        _ => return prefix.to_string(),
    };

    if count < max_count {
        // Reconciliation path: if the newest file on disk is still under
        // the size budget, keep appending into it instead of allocating a
        // new number.
        if newest.size < max_size {
            return newest.name;
        }
        return rotated_name(prefix, next_index(&numbers));
    }

    if count == max_count {
        if newest.size > max_size {
            remove_file(dir, &oldest.name);
        }
        return rotated_name(prefix, next_index(&numbers));
    }

    // count > max_count: shed the oldest file before allocating
    remove_file(dir, &oldest.name);
    rotated_name(prefix, next_index(&numbers))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use std::time::Duration;
    use tempfile::TempDir;

    const PREFIX: &str = "app.log";

    /// Create a file of `size` bytes whose mtime is `age_secs` in the past
    fn touch(dir: &Path, name: &str, size: usize, age_secs: u64) {
        let path = dir.join(name);
        let mut file = File::options()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&path)
            .unwrap();
        file.write_all(&vec![b'x'; size]).unwrap();
        let mtime = SystemTime::now() - Duration::from_secs(age_secs);
        file.set_modified(mtime).unwrap();
    }

    #[test]
    fn test_parse_index_live_file() {
        assert_eq!(parse_index("app.log", PREFIX), Some(0));
    }

    #[test]
    fn test_parse_index_rotated_files() {
        assert_eq!(parse_index("app.log.1", PREFIX), Some(1));
        assert_eq!(parse_index("app.log.10240", PREFIX), Some(10240));
    }

    #[test]
    fn test_parse_index_rejects_non_matches() {
        assert_eq!(parse_index("other.log", PREFIX), None);
        assert_eq!(parse_index("app.log.", PREFIX), None);
        assert_eq!(parse_index("app.log.0", PREFIX), None);
        assert_eq!(parse_index("app.log.-3", PREFIX), None);
        assert_eq!(parse_index("app.log.abc", PREFIX), None);
        assert_eq!(parse_index("app.log.1.gz", PREFIX), None);
    }

    #[test]
    fn test_next_index_increments_max() {
        assert_eq!(next_index(&[0]), 1);
        assert_eq!(next_index(&[0, 1, 2]), 3);
        assert_eq!(next_index(&[0, 7, 3]), 8);
    }

    #[test]
    fn test_next_index_restarts_at_ceiling() {
        assert_eq!(next_index(&[0, MAX_FILE_INDEX]), INDEX_NEW_START);
    }

    #[test]
    fn test_next_index_probes_past_taken_slots() {
        let numbers = [0, MAX_FILE_INDEX, INDEX_NEW_START, INDEX_NEW_START + 1];
        assert_eq!(next_index(&numbers), INDEX_NEW_START + 2);
    }

    #[test]
    fn test_next_index_probe_window_is_bounded() {
        // len + 3 probes always cover more slots than the input can occupy,
        // so an in-window slot is found even with the start range saturated
        let numbers = [
            MAX_FILE_INDEX,
            INDEX_NEW_START,
            INDEX_NEW_START + 1,
            INDEX_NEW_START + 2,
            INDEX_NEW_START + 3,
        ];
        assert_eq!(next_index(&numbers), INDEX_NEW_START + 4);
    }

    #[test]
    fn test_choose_empty_dir_returns_prefix() {
        let temp_dir = TempDir::new().unwrap();
        let target = choose_file(temp_dir.path(), PREFIX, 1000, 10);
        assert_eq!(target, PREFIX);
    }

    #[test]
    fn test_choose_missing_dir_returns_prefix() {
        let target = choose_file(Path::new("/nonexistent/for/testing"), PREFIX, 1000, 10);
        assert_eq!(target, PREFIX);
    }

    #[test]
    fn test_choose_reuses_newest_under_size() {
        let temp_dir = TempDir::new().unwrap();
        touch(temp_dir.path(), "app.log.1", 100, 60);
        touch(temp_dir.path(), "app.log.2", 100, 10);

        let target = choose_file(temp_dir.path(), PREFIX, 1000, 10);
        assert_eq!(target, "app.log.2");
    }

    #[test]
    fn test_choose_allocates_next_when_newest_full() {
        let temp_dir = TempDir::new().unwrap();
        touch(temp_dir.path(), PREFIX, 1200, 10);
        touch(temp_dir.path(), "app.log.1", 100, 60);

        let target = choose_file(temp_dir.path(), PREFIX, 1000, 10);
        assert_eq!(target, "app.log.2");
    }

    #[test]
    fn test_choose_at_count_budget_removes_oldest() {
        let temp_dir = TempDir::new().unwrap();
        touch(temp_dir.path(), PREFIX, 1200, 10);
        touch(temp_dir.path(), "app.log.1", 100, 90);
        touch(temp_dir.path(), "app.log.2", 100, 60);

        let target = choose_file(temp_dir.path(), PREFIX, 1000, 3);
        assert_eq!(target, "app.log.3");
        assert!(!temp_dir.path().join("app.log.1").exists());
        assert!(temp_dir.path().join("app.log.2").exists());
    }

    #[test]
    fn test_choose_at_count_budget_keeps_all_when_newest_small() {
        let temp_dir = TempDir::new().unwrap();
        touch(temp_dir.path(), PREFIX, 100, 10);
        touch(temp_dir.path(), "app.log.1", 100, 90);
        touch(temp_dir.path(), "app.log.2", 100, 60);

        // count == max and newest under the size budget: no removal, but a
        // fresh number is still allocated
        let target = choose_file(temp_dir.path(), PREFIX, 1000, 3);
        assert_eq!(target, "app.log.3");
        assert!(temp_dir.path().join("app.log.1").exists());
    }

    #[test]
    fn test_choose_over_count_budget_removes_oldest() {
        let temp_dir = TempDir::new().unwrap();
        touch(temp_dir.path(), PREFIX, 1200, 10);
        touch(temp_dir.path(), "app.log.1", 100, 90);
        touch(temp_dir.path(), "app.log.2", 100, 60);
        touch(temp_dir.path(), "app.log.3", 100, 30);

        let target = choose_file(temp_dir.path(), PREFIX, 1000, 2);
        assert_eq!(target, "app.log.4");
        assert!(!temp_dir.path().join("app.log.1").exists());
    }

    #[test]
    fn test_choose_ignores_unrelated_files() {
        let temp_dir = TempDir::new().unwrap();
        touch(temp_dir.path(), "other.txt", 5000, 10);
        touch(temp_dir.path(), "app.log.bak", 5000, 10);

        let target = choose_file(temp_dir.path(), PREFIX, 1000, 10);
        assert_eq!(target, PREFIX);
    }

    #[test]
    fn test_choose_restarts_numbering_at_ceiling() {
        let temp_dir = TempDir::new().unwrap();
        touch(temp_dir.path(), PREFIX, 1200, 10);
        touch(
            temp_dir.path(),
            &format!("app.log.{}", MAX_FILE_INDEX),
            100,
            60,
        );

        let target = choose_file(temp_dir.path(), PREFIX, 1000, 10);
        assert_eq!(target, format!("app.log.{}", INDEX_NEW_START));
    }
}
