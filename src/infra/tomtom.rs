// ============================================================
// Layer 6 — External Motif Comparison
// ============================================================
// Runs the comparison script as a subprocess:
//
//   <program> <motif_file> <output_dir>
//
// and expects `<output_dir>/tomtom.tsv` afterwards. The script
// (see scripts/motif_comparison.sh) wraps MEME-suite Tomtom and a
// JASPAR database; any executable with the same contract works.
//
// A table left over from an earlier run is deleted before the
// program starts, so only a table written by this run is scored.
//
// On unix the program leads its own process group and a timeout
// kills the whole group, including tools the script started.
//
// Outcomes:
//   exit 0 + table with data rows  → Results(path)
//   exit 0 + no table / no rows    → Empty
//   program missing                → NotFound
//   launch failure                 → Spawn
//   old table cannot be removed    → StaleOutput
//   non-zero exit or signal        → Crashed { code, stderr }
//   still running after `timeout`  → killed, TimedOut
//
// Reference: Rust std::process documentation

use std::{
    fs,
    io::{ErrorKind, Read},
    path::{Path, PathBuf},
    process::{Child, Command, Stdio},
    thread,
    time::{Duration, Instant},
};

#[cfg(unix)]
use std::os::unix::process::CommandExt;

use crate::domain::comparison::{ComparisonError, ComparisonOutcome, RESULTS_FILE};
use crate::domain::traits::MotifComparator;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Longest stderr excerpt kept in a Crashed error
const STDERR_LIMIT: usize = 4096;

#[derive(Debug, Clone)]
pub struct ExternalComparator {
    pub program: PathBuf,
    pub timeout: Duration,
}

impl ExternalComparator {
    pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self { program: program.into(), timeout }
    }

    /// A bare name is looked up on PATH by the OS; a path must exist.
    fn check_program(&self) -> Result<(), ComparisonError> {
        let is_path = self.program.components().count() > 1;
        if is_path && !self.program.exists() {
            return Err(ComparisonError::NotFound(self.program.clone()));
        }
        Ok(())
    }
}

impl MotifComparator for ExternalComparator {
    fn compare(&self, motif_file: &Path, output_dir: &Path) -> Result<ComparisonOutcome, ComparisonError> {
        self.check_program()?;

        let table = output_dir.join(RESULTS_FILE);
        remove_stale(&table)?;

        tracing::info!(
            "Running '{}' on '{}' → '{}'",
            self.program.display(), motif_file.display(), output_dir.display(),
        );
        let mut command = Command::new(&self.program);
        command
            .arg(motif_file)
            .arg(output_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        #[cfg(unix)]
        command.process_group(0);

        let mut child = command
            .spawn()
            .map_err(|source| match source.kind() {
                ErrorKind::NotFound => ComparisonError::NotFound(self.program.clone()),
                _ => ComparisonError::Spawn { program: self.program.clone(), source },
            })?;

        // Drain stderr concurrently so a chatty tool cannot block on a full pipe
        let stderr_reader = child.stderr.take().map(|mut pipe| {
            thread::spawn(move || {
                let mut buf = String::new();
                let _ = pipe.read_to_string(&mut buf);
                buf
            })
        });

        let started = Instant::now();
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) if started.elapsed() >= self.timeout => {
                    kill_tree(&mut child);
                    tracing::warn!("Comparison tool killed after {:?}", self.timeout);
                    return Err(ComparisonError::TimedOut(self.timeout));
                }
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(source) => {
                    return Err(ComparisonError::Spawn { program: self.program.clone(), source });
                }
            }
        };

        let stderr = stderr_reader
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default();

        if !status.success() {
            let mut stderr = stderr.trim().to_string();
            if stderr.len() > STDERR_LIMIT {
                let mut cut = STDERR_LIMIT;
                while !stderr.is_char_boundary(cut) {
                    cut -= 1;
                }
                stderr.truncate(cut);
            }
            return Err(ComparisonError::Crashed { code: status.code(), stderr });
        }

        if has_data_rows(&table) {
            Ok(ComparisonOutcome::Results(table))
        } else {
            tracing::warn!("Comparison finished without results in '{}'", output_dir.display());
            Ok(ComparisonOutcome::Empty)
        }
    }
}

fn remove_stale(table: &Path) -> Result<(), ComparisonError> {
    match fs::remove_file(table) {
        Ok(()) => {
            tracing::debug!("Removed previous results '{}'", table.display());
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(source) => Err(ComparisonError::StaleOutput { path: table.to_path_buf(), source }),
    }
}

/// Kill the child and everything in its process group, then reap it.
fn kill_tree(child: &mut Child) {
    #[cfg(unix)]
    {
        if let Ok(pgid) = libc::pid_t::try_from(child.id()) {
            // SAFETY: kill(2) takes no pointers; a negative pid addresses
            // the group the child was spawned into.
            unsafe {
                libc::kill(-pgid, libc::SIGKILL);
            }
        }
    }
    let _ = child.kill();
    let _ = child.wait();
}

/// True when the table exists and has a row after the header.
fn has_data_rows(table: &Path) -> bool {
    fs::read_to_string(table)
        .map(|text| {
            text.lines()
                .filter(|l| !l.trim().is_empty() && !l.starts_with('#'))
                .nth(1)
                .is_some()
        })
        .unwrap_or(false)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn run(program: PathBuf, timeout: Duration) -> (tempfile::TempDir, Result<ComparisonOutcome, ComparisonError>) {
        let dir = tempfile::tempdir().unwrap();
        let motifs = dir.path().join("motifs.txt");
        fs::write(&motifs, "MEME version 4\n").unwrap();
        let out = dir.path().join("tomtom");
        let result = ExternalComparator::new(program, timeout).compare(&motifs, &out);
        (dir, result)
    }

    #[test]
    fn test_missing_program() {
        let (_dir, result) = run(PathBuf::from("/nonexistent/motif_comparison.sh"), Duration::from_secs(5));
        assert!(matches!(result, Err(ComparisonError::NotFound(_))));
    }

    #[test]
    fn test_crash_reports_code_and_stderr() {
        let bin = tempfile::tempdir().unwrap();
        let program = script(bin.path(), "crash.sh", "echo 'database missing' >&2\nexit 3");
        let (_dir, result) = run(program, Duration::from_secs(5));
        match result {
            Err(ComparisonError::Crashed { code, stderr }) => {
                assert_eq!(code, Some(3));
                assert_eq!(stderr, "database missing");
            }
            other => panic!("expected crash, got {other:?}"),
        }
    }

    #[test]
    fn test_clean_exit_without_table_is_empty() {
        let bin = tempfile::tempdir().unwrap();
        let program = script(bin.path(), "noop.sh", "mkdir -p \"$2\"");
        let (_dir, result) = run(program, Duration::from_secs(5));
        assert_eq!(result.unwrap(), ComparisonOutcome::Empty);
    }

    #[test]
    fn test_results_table_is_found() {
        let bin = tempfile::tempdir().unwrap();
        let program = script(
            bin.path(),
            "fake_tomtom.sh",
            "mkdir -p \"$2\"\nprintf 'Query_ID\\tTarget_ID\\tq-value\\nfilter0\\tMA0151.1\\t0.01\\n' > \"$2/tomtom.tsv\"",
        );
        let (dir, result) = run(program, Duration::from_secs(5));
        assert_eq!(
            result.unwrap(),
            ComparisonOutcome::Results(dir.path().join("tomtom").join(RESULTS_FILE)),
        );
    }

    #[test]
    fn test_header_only_table_is_empty() {
        let bin = tempfile::tempdir().unwrap();
        let program = script(
            bin.path(),
            "header_only.sh",
            "mkdir -p \"$2\"\nprintf 'Query_ID\\tTarget_ID\\tq-value\\n' > \"$2/tomtom.tsv\"",
        );
        let (_dir, result) = run(program, Duration::from_secs(5));
        assert_eq!(result.unwrap(), ComparisonOutcome::Empty);
    }

    #[test]
    fn test_previous_table_is_not_rescored() {
        let bin = tempfile::tempdir().unwrap();
        let program = script(bin.path(), "noop.sh", "exit 0");

        let dir = tempfile::tempdir().unwrap();
        let motifs = dir.path().join("motifs.txt");
        fs::write(&motifs, "MEME version 4\n").unwrap();
        let out = dir.path().join("tomtom");
        fs::create_dir_all(&out).unwrap();
        fs::write(out.join(RESULTS_FILE), "Query_ID\tTarget_ID\tq-value\nfilter0\tMA0151.1\t0.01\n").unwrap();

        let result = ExternalComparator::new(program, Duration::from_secs(5)).compare(&motifs, &out);
        assert_eq!(result.unwrap(), ComparisonOutcome::Empty);
        assert!(!out.join(RESULTS_FILE).exists());
    }

    #[test]
    fn test_timeout_kills_background_tools() {
        let bin = tempfile::tempdir().unwrap();
        // the script starts a "tool" of its own and waits on it
        let program = script(bin.path(), "spawner.sh", "mkdir -p \"$2\"\n(sleep 1; touch \"$2/late\") &\nwait");
        let (dir, result) = run(program, Duration::from_millis(200));
        assert!(matches!(result, Err(ComparisonError::TimedOut(_))));

        thread::sleep(Duration::from_millis(1500));
        assert!(!dir.path().join("tomtom").join("late").exists());
    }

    #[test]
    fn test_slow_tool_times_out() {
        let bin = tempfile::tempdir().unwrap();
        let program = script(bin.path(), "slow.sh", "sleep 5");
        let (_dir, result) = run(program, Duration::from_millis(200));
        assert!(matches!(result, Err(ComparisonError::TimedOut(_))));
    }
}
