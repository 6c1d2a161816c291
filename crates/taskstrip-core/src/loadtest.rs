//! Concurrent notebook load test.
//!
//! Runs the same notebook through an external runner several times at once
//! to check that a shared backend copes with a full classroom.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::task::{JoinHandle, JoinSet};

use crate::error::{TaskError, TaskResult};

/// Load test parameters.
#[derive(Debug, Clone)]
pub struct LoadTest {
    /// Runner command; the notebook path is appended
    pub runner: Vec<String>,

    /// Notebook to run
    pub notebook: PathBuf,

    /// Number of concurrent runs
    pub processes: usize,

    /// Per-run timeout
    pub timeout: Duration,
}

impl LoadTest {
    pub const DEFAULT_PROCESSES: usize = 10;
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(80 * 30);

    /// How long a killed run's pipes get to drain.
    const DRAIN_GRACE: Duration = Duration::from_secs(1);

    /// Default runner: `uv run ipython`.
    pub fn default_runner() -> Vec<String> {
        vec!["uv".to_string(), "run".to_string(), "ipython".to_string()]
    }
}

/// Result of a single run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub test_id: usize,
    pub success: bool,
    pub duration: Duration,
    pub exit_code: Option<i32>,
    /// `timeout` or a spawn error
    pub error: Option<String>,
    pub stdout: String,
    pub stderr: String,
}

impl RunOutcome {
    fn failed(test_id: usize, duration: Duration, error: String) -> Self {
        Self {
            test_id,
            success: false,
            duration,
            exit_code: None,
            error: Some(error),
            stdout: String::new(),
            stderr: String::new(),
        }
    }

    /// Short failure reason for the summary.
    pub fn reason(&self) -> String {
        match (&self.error, self.exit_code) {
            (Some(error), _) => error.clone(),
            (None, Some(code)) => format!("exit code {}", code),
            (None, None) => "exit code unknown".to_string(),
        }
    }
}

/// Aggregate numbers over all runs.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub success_rate: f64,
    /// Mean duration of successful runs
    pub average_duration: Duration,
    pub total_duration: Duration,
}

impl Summary {
    pub fn from_outcomes(outcomes: &[RunOutcome], total_duration: Duration) -> Self {
        let total = outcomes.len();
        let successes: Vec<_> = outcomes.iter().filter(|o| o.success).collect();
        let successful = successes.len();

        let average_duration = if successful > 0 {
            successes.iter().map(|o| o.duration).sum::<Duration>() / successful as u32
        } else {
            Duration::ZERO
        };

        let success_rate = if total > 0 {
            successful as f64 / total as f64 * 100.0
        } else {
            0.0
        };

        Self {
            total,
            successful,
            failed: total - successful,
            success_rate,
            average_duration,
            total_duration,
        }
    }
}

fn test_id_env(test_id: usize) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    format!("{}{}", test_id, nanos)
}

/// Output captured from a child pipe so far.
type Captured = Arc<Mutex<Vec<u8>>>;

/// Read `pipe` into a shared buffer until it closes.
///
/// The buffer stays readable when the run is cut off, so a timed-out run
/// still logs what it printed.
fn capture<R>(pipe: Option<R>) -> (Captured, JoinHandle<()>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let buffer = Captured::default();
    let sink = Arc::clone(&buffer);

    let reader = tokio::spawn(async move {
        let Some(mut pipe) = pipe else {
            return;
        };
        let mut chunk = [0u8; 8192];
        loop {
            match pipe.read(&mut chunk).await {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    if let Ok(mut buffer) = sink.lock() {
                        buffer.extend_from_slice(&chunk[..n]);
                    }
                }
            }
        }
    });

    (buffer, reader)
}

fn captured_text(buffer: &Captured) -> String {
    buffer
        .lock()
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .unwrap_or_default()
}

/// Run the notebook once with a `TEST_ID` unique to this run.
pub async fn run_once(test_id: usize, test: &LoadTest) -> RunOutcome {
    let start = Instant::now();

    let Some((program, args)) = test.runner.split_first() else {
        return RunOutcome::failed(test_id, Duration::ZERO, "empty runner command".to_string());
    };

    let child = Command::new(program)
        .args(args)
        .arg(&test.notebook)
        .env("TEST_ID", test_id_env(test_id))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn();

    let mut child = match child {
        Ok(child) => child,
        Err(e) => return RunOutcome::failed(test_id, Duration::ZERO, e.to_string()),
    };

    let (stdout, stdout_reader) = capture(child.stdout.take());
    let (stderr, stderr_reader) = capture(child.stderr.take());

    let (duration, exit_code, error) =
        match tokio::time::timeout(test.timeout, child.wait()).await {
            Ok(Ok(status)) => {
                let _ = stdout_reader.await;
                let _ = stderr_reader.await;
                if !status.success() {
                    tracing::debug!("Process {} exited with {}", test_id, status);
                }
                (start.elapsed(), status.code(), None)
            }
            Ok(Err(e)) => (start.elapsed(), None, Some(e.to_string())),
            Err(_) => {
                if let Err(e) = child.kill().await {
                    tracing::warn!("Could not kill process {}: {}", test_id, e);
                }
                // Anything the run wrote before the kill is still in the pipes.
                let drained = async {
                    let _ = stdout_reader.await;
                    let _ = stderr_reader.await;
                };
                let _ = tokio::time::timeout(LoadTest::DRAIN_GRACE, drained).await;
                (test.timeout, None, Some("timeout".to_string()))
            }
        };

    RunOutcome {
        test_id,
        success: error.is_none() && exit_code == Some(0),
        duration,
        exit_code,
        error,
        stdout: captured_text(&stdout),
        stderr: captured_text(&stderr),
    }
}

/// Run all processes concurrently and collect outcomes ordered by id.
///
/// Ids start at 1. `on_finish` sees each outcome as its run ends.
pub async fn run_load_test(
    test: &LoadTest,
    mut on_finish: impl FnMut(&RunOutcome),
) -> TaskResult<Vec<RunOutcome>> {
    if test.runner.is_empty() {
        return Err(TaskError::RunnerError("empty runner command".to_string()));
    }

    let mut set = JoinSet::new();
    for test_id in 1..=test.processes {
        let test = test.clone();
        set.spawn(async move { run_once(test_id, &test).await });
    }

    let mut outcomes = Vec::with_capacity(test.processes);
    while let Some(joined) = set.join_next().await {
        let outcome = joined.map_err(|e| TaskError::RunnerError(e.to_string()))?;
        on_finish(&outcome);
        outcomes.push(outcome);
    }
    outcomes.sort_by_key(|o| o.test_id);
    Ok(outcomes)
}

/// Write `<log_dir>/<test_id>` for every run: stdout, a rule, stderr.
pub fn write_logs(log_dir: &Path, outcomes: &[RunOutcome]) -> TaskResult<()> {
    fs::create_dir_all(log_dir)?;
    for outcome in outcomes {
        let path = log_dir.join(outcome.test_id.to_string());
        let body = format!("{}{}\n{}", outcome.stdout, "=".repeat(50), outcome.stderr);
        fs::write(&path, body).map_err(|e| TaskError::WriteError {
            path: path.clone(),
            message: e.to_string(),
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(test_id: usize, success: bool, millis: u64) -> RunOutcome {
        RunOutcome {
            test_id,
            success,
            duration: Duration::from_millis(millis),
            exit_code: Some(if success { 0 } else { 1 }),
            error: None,
            stdout: format!("out {}", test_id),
            stderr: String::new(),
        }
    }

    #[test]
    fn test_summary() {
        let outcomes = vec![outcome(1, true, 100), outcome(2, false, 5), outcome(3, true, 300)];
        let summary = Summary::from_outcomes(&outcomes, Duration::from_secs(1));

        assert_eq!(summary.total, 3);
        assert_eq!(summary.successful, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.average_duration, Duration::from_millis(200));
        assert!((summary.success_rate - 66.666).abs() < 0.01);
    }

    #[test]
    fn test_summary_all_failed() {
        let summary = Summary::from_outcomes(&[outcome(1, false, 10)], Duration::from_secs(1));
        assert_eq!(summary.average_duration, Duration::ZERO);
        assert_eq!(summary.success_rate, 0.0);
    }

    #[test]
    fn test_reason() {
        assert_eq!(outcome(1, false, 1).reason(), "exit code 1");
        let timed_out = RunOutcome::failed(2, Duration::from_secs(1), "timeout".to_string());
        assert_eq!(timed_out.reason(), "timeout");
    }

    #[test]
    fn test_write_logs() {
        let temp = tempfile::TempDir::new().unwrap();
        let log_dir = temp.path().join("logs");
        let mut failed = outcome(2, false, 1);
        failed.stderr = "Traceback".to_string();

        write_logs(&log_dir, &[outcome(1, true, 1), failed]).unwrap();

        let first = fs::read_to_string(log_dir.join("1")).unwrap();
        assert_eq!(first, format!("out 1{}\n", "=".repeat(50)));
        let second = fs::read_to_string(log_dir.join("2")).unwrap();
        assert!(second.ends_with("\nTraceback"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_runs_are_concurrent_and_tagged() {
        let test = LoadTest {
            runner: vec![
                "sh".to_string(),
                "-c".to_string(),
                "echo \"$TEST_ID $1\"".to_string(),
                "sh".to_string(),
            ],
            notebook: PathBuf::from("solutions/05_Benchmarking.ipynb"),
            processes: 4,
            timeout: Duration::from_secs(30),
        };

        let outcomes = run_load_test(&test, |_| {}).await.unwrap();
        assert_eq!(outcomes.len(), 4);
        for (i, outcome) in outcomes.iter().enumerate() {
            assert_eq!(outcome.test_id, i + 1);
            assert!(outcome.success);
            assert!(outcome.stdout.starts_with(&(i + 1).to_string()));
            assert!(outcome.stdout.trim_end().ends_with("solutions/05_Benchmarking.ipynb"));
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout_keeps_partial_output() {
        let test = LoadTest {
            runner: vec![
                "sh".to_string(),
                "-c".to_string(),
                "echo started; echo warming up >&2; exec sleep 5".to_string(),
                "sh".to_string(),
            ],
            notebook: PathBuf::from("nb.ipynb"),
            processes: 1,
            timeout: Duration::from_millis(500),
        };

        let outcomes = run_load_test(&test, |_| {}).await.unwrap();
        assert!(!outcomes[0].success);
        assert_eq!(outcomes[0].reason(), "timeout");
        assert_eq!(outcomes[0].stdout, "started\n");
        assert_eq!(outcomes[0].stderr, "warming up\n");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_progress_sees_every_run() {
        let test = LoadTest {
            runner: vec!["sh".to_string(), "-c".to_string(), "exit $0".to_string()],
            notebook: PathBuf::from("3"),
            processes: 3,
            timeout: Duration::from_secs(30),
        };

        let mut seen = Vec::new();
        let outcomes = run_load_test(&test, |o| seen.push(o.test_id)).await.unwrap();
        seen.sort();
        assert_eq!(seen, vec![1, 2, 3]);
        assert!(outcomes.iter().all(|o| o.exit_code == Some(3)));
    }

    #[tokio::test]
    async fn test_missing_runner() {
        let test = LoadTest {
            runner: vec!["taskstrip-no-such-runner".to_string()],
            notebook: PathBuf::from("nb.ipynb"),
            processes: 2,
            timeout: Duration::from_secs(5),
        };

        let outcomes = run_load_test(&test, |_| {}).await.unwrap();
        assert!(outcomes.iter().all(|o| !o.success && o.error.is_some()));
    }

    #[tokio::test]
    async fn test_empty_runner_rejected() {
        let test = LoadTest {
            runner: Vec::new(),
            notebook: PathBuf::from("nb.ipynb"),
            processes: 1,
            timeout: Duration::from_secs(5),
        };
        assert!(run_load_test(&test, |_| {}).await.is_err());
    }
}
