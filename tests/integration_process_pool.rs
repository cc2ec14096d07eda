//! Integration tests for the process pool and the `fp-audit` binary.
//!
//! These tests spawn the real executable, either as pool workers or as
//! the command-line front end.

use assert_fs::prelude::*;
use assert_fs::TempDir;
use fingerprint_audit::core::comparator::CompareStatus;
use fingerprint_audit::core::fingerprint::{FingerprintConfig, FingerprintMode};
use fingerprint_audit::core::pipeline::{CancellationToken, CompareWorker, ParallelFingerprinter};
use fingerprint_audit::core::pool::{PoolSlot, ProcessPoolLauncher};
use fingerprint_audit::core::report::CompareReport;
use fingerprint_audit::events::{Event, EventChannel};
use predicates::prelude::*;
use std::process::Command;
use std::sync::Arc;

const BIN: &str = env!("CARGO_BIN_EXE_fp-audit");

fn fixture() -> TempDir {
    let temp = TempDir::new().unwrap();
    temp.child("source/a.png").write_binary(b"alpha content").unwrap();
    temp.child("source/b.png").write_binary(b"beta content").unwrap();
    temp.child("result/x.png").write_binary(b"alpha content").unwrap();
    temp.child("result/b.png").write_binary(b"beta content").unwrap();
    temp.child("result/empty.png").touch().unwrap();
    temp
}

#[test]
fn process_pool_fingerprints_in_input_order() {
    let temp = fixture();
    let paths = vec![
        temp.child("source/a.png").path().to_path_buf(),
        temp.child("source/b.png").path().to_path_buf(),
        temp.child("result/empty.png").path().to_path_buf(),
        temp.child("source/missing.png").path().to_path_buf(),
    ];

    let launcher = ProcessPoolLauncher::new(BIN);
    let slot = PoolSlot::new();
    let cancel = CancellationToken::new();
    let fingerprinter = ParallelFingerprinter::new(&launcher, &slot, &cancel);

    let mut calls = Vec::new();
    let run = fingerprinter
        .compute_entries(
            &paths,
            FingerprintConfig::new(FingerprintMode::Exact),
            2,
            |_, done, total| calls.push((done, total)),
        )
        .unwrap();

    assert!(!run.cancelled);
    assert_eq!(run.entries.len(), 4);
    for (entry, path) in run.entries.iter().zip(&paths) {
        assert_eq!(&entry.path, path);
    }
    assert_eq!(run.entries[0].fingerprint.as_ref().map(|f| f.len()), Some(64));
    assert_ne!(run.entries[0].fingerprint, run.entries[1].fingerprint);
    assert!(run.entries[2].error.is_some());
    assert!(run.entries[3].error.is_some());
    assert_eq!(calls, vec![(1, 4), (2, 4), (3, 4), (4, 4)]);
    assert!(!slot.is_bound());
}

#[test]
fn compare_worker_on_process_pool() {
    let temp = fixture();

    let worker = CompareWorker::builder()
        .source_dir(temp.child("source").path())
        .result_dir(temp.child("result").path())
        .workers(2)
        .launcher(Arc::new(ProcessPoolLauncher::new(BIN)))
        .build()
        .unwrap();
    let (sender, receiver) = EventChannel::new();
    worker.run(&sender);
    drop(sender);

    let report = match receiver.iter().last() {
        Some(Event::Done(report)) => report,
        other => panic!("expected Done, got {:?}", other),
    };

    let status_of = |name: &str| {
        report
            .records
            .iter()
            .find(|r| r.result_name == name)
            .map(|r| r.status)
    };
    assert_eq!(status_of("b.png"), Some(CompareStatus::Match));
    assert_eq!(status_of("x.png"), Some(CompareStatus::NameMismatch));
    assert_eq!(status_of("empty.png"), Some(CompareStatus::ReadError));
}

#[test]
fn cli_json_output_is_a_report() {
    let temp = fixture();

    let output = Command::new(BIN)
        .arg("compare")
        .arg(temp.child("source").path())
        .arg(temp.child("result").path())
        .args(["--output", "json", "--workers", "2"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let report: CompareReport = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report.records.len(), 3);
    assert_eq!(report.counts.get(CompareStatus::Match), 1);
    assert_eq!(report.counts.get(CompareStatus::NameMismatch), 1);
    assert_eq!(report.counts.get(CompareStatus::ReadError), 1);
}

#[test]
fn cli_minimal_output_lists_issues() {
    let temp = fixture();

    let output = Command::new(BIN)
        .arg("compare")
        .arg(temp.child("source").path())
        .arg(temp.child("result").path())
        .args(["--output", "minimal", "--threads"])
        .output()
        .unwrap();

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success());
    assert!(predicate::str::contains("NAME_MISMATCH\t").eval(&stdout));
    assert!(predicate::str::contains("READ_ERROR\t").eval(&stdout));
    assert_eq!(stdout.lines().count(), 2);
}

#[test]
fn cli_status_filter_selects_matches() {
    let temp = fixture();

    let output = Command::new(BIN)
        .arg("compare")
        .arg(temp.child("source").path())
        .arg(temp.child("result").path())
        .args(["--output", "minimal", "--status", "match"])
        .output()
        .unwrap();

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.lines().collect::<Vec<_>>().len(), 1);
    assert!(predicate::str::starts_with("MATCH\t").eval(&stdout));
    assert!(predicate::str::ends_with("b.png\n").eval(&stdout));
}

#[test]
fn cli_fail_on_issues_sets_exit_code() {
    let temp = fixture();

    let status = Command::new(BIN)
        .arg("compare")
        .arg(temp.child("source").path())
        .arg(temp.child("result").path())
        .args(["--output", "minimal", "--fail-on-issues"])
        .status()
        .unwrap();

    assert_eq!(status.code(), Some(1));
}

#[test]
fn cli_rejects_missing_source_directory() {
    let temp = fixture();

    let output = Command::new(BIN)
        .arg("compare")
        .arg(temp.child("nope").path())
        .arg(temp.child("result").path())
        .output()
        .unwrap();

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(output.status.code(), Some(1));
    assert!(predicate::str::contains("Source directory is not valid").eval(&stderr));
}

#[test]
fn worker_subcommand_speaks_line_json() {
    use std::io::Write;
    use std::process::Stdio;

    let temp = fixture();
    let path = temp.child("source/a.png");

    let mut child = Command::new(BIN)
        .args(["worker", "--mode", "exact"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .unwrap();
    {
        let mut stdin = child.stdin.take().unwrap();
        let request = serde_json::json!({ "id": 7, "path": path.path() });
        writeln!(stdin, "{}", request).unwrap();
    }
    let output = child.wait_with_output().unwrap();

    assert!(output.status.success());
    let reply: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(reply["id"], 7);
    assert_eq!(reply["fingerprint"].as_str().map(str::len), Some(64));
    assert!(reply["error"].is_null());
}

#[cfg(unix)]
#[test]
fn dying_workers_are_reported_and_replaced() {
    let temp = fixture();
    // Each worker swallows one request and exits without answering
    let launcher = ProcessPoolLauncher::new("sh").with_args(["-c", "head -n1 >/dev/null; exit 1"]);

    let paths = vec![
        temp.child("source/a.png").path().to_path_buf(),
        temp.child("source/b.png").path().to_path_buf(),
        temp.child("result/x.png").path().to_path_buf(),
        temp.child("result/b.png").path().to_path_buf(),
    ];
    let slot = PoolSlot::new();
    let cancel = CancellationToken::new();
    let run = ParallelFingerprinter::new(&launcher, &slot, &cancel)
        .compute_entries(
            &paths,
            FingerprintConfig::new(FingerprintMode::Exact),
            1,
            |_, _, _| {},
        )
        .unwrap();

    assert!(!run.cancelled);
    for entry in &run.entries {
        assert!(entry.fingerprint.is_none());
        let error = entry.error.as_deref().unwrap_or_default();
        assert!(predicate::str::contains("worker process failed").eval(error));
    }

    let worker = CompareWorker::builder()
        .source_dir(temp.child("source").path())
        .result_dir(temp.child("result").path())
        .workers(2)
        .launcher(Arc::new(launcher))
        .build()
        .unwrap();
    let (sender, receiver) = EventChannel::new();
    worker.run(&sender);
    drop(sender);

    match receiver.iter().last() {
        Some(Event::Done(report)) => {
            assert_eq!(report.records.len(), 3);
            assert_eq!(report.counts.get(CompareStatus::ReadError), 3);
        }
        other => panic!("expected Done, got {:?}", other),
    }
}
