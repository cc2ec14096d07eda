//! Integration tests for a full comparison run.
//!
//! These tests verify end-to-end behavior on real directory trees:
//! - One record per result file with the right status
//! - Event ordering and a single terminal event
//! - Perceptual mode across lossless re-encoding

use assert_fs::prelude::*;
use assert_fs::TempDir;
use fingerprint_audit::core::comparator::CompareStatus;
use fingerprint_audit::core::fingerprint::FingerprintMode;
use fingerprint_audit::core::pipeline::CompareWorker;
use fingerprint_audit::core::pool::ThreadPoolLauncher;
use fingerprint_audit::core::report::CompareReport;
use fingerprint_audit::events::{Event, EventChannel, FingerprintStage};
use predicates::prelude::*;
use std::path::Path;
use std::sync::Arc;

/// Source and result directories under one temp root
fn tree() -> (TempDir, assert_fs::fixture::ChildPath, assert_fs::fixture::ChildPath) {
    let temp = TempDir::new().unwrap();
    let source = temp.child("source");
    let result = temp.child("result");
    source.create_dir_all().unwrap();
    result.create_dir_all().unwrap();
    (temp, source, result)
}

fn write_gradient(path: &Path, seed: u8) {
    let img = image::RgbImage::from_fn(48, 32, |x, y| {
        image::Rgb([
            (x as u8).wrapping_mul(5).wrapping_add(seed),
            (y as u8).wrapping_mul(7),
            seed.wrapping_mul(3),
        ])
    });
    img.save(path).unwrap();
}

fn run(source: &Path, result: &Path, mode: FingerprintMode) -> (Vec<Event>, CompareReport) {
    let worker = CompareWorker::builder()
        .source_dir(source)
        .result_dir(result)
        .mode(mode)
        .workers(2)
        .launcher(Arc::new(ThreadPoolLauncher))
        .build()
        .unwrap();

    let (sender, receiver) = EventChannel::new();
    worker.run(&sender);
    drop(sender);
    let events: Vec<Event> = receiver.iter().collect();

    let report = match events.last() {
        Some(Event::Done(report)) => (**report).clone(),
        other => panic!("expected Done, got {:?}", other),
    };
    (events, report)
}

#[test]
fn renamed_copy_is_name_mismatch() {
    let (_temp, source, result) = tree();
    source.child("a.png").write_binary(b"alpha content").unwrap();
    source.child("b.png").write_binary(b"beta content").unwrap();
    result.child("x.png").write_binary(b"alpha content").unwrap();

    let (_, report) = run(source.path(), result.path(), FingerprintMode::Exact);

    assert_eq!(report.records.len(), 1);
    let record = &report.records[0];
    assert_eq!(record.status, CompareStatus::NameMismatch);
    assert_eq!(record.source_candidates.len(), 1);
    assert!(record.source_candidates[0].ends_with("a.png"));
    assert!(predicate::str::contains("a.png").eval(&record.details));
}

#[test]
fn shared_source_content_is_source_duplicate() {
    let (_temp, source, result) = tree();
    source.child("one.png").write_binary(b"same bytes").unwrap();
    source.child("two.png").write_binary(b"same bytes").unwrap();
    result.child("one.png").write_binary(b"same bytes").unwrap();

    let (_, report) = run(source.path(), result.path(), FingerprintMode::Exact);

    let record = &report.records[0];
    assert_eq!(record.status, CompareStatus::SourceDuplicate);
    assert_eq!(record.source_candidates.len(), 2);
    assert_eq!(report.source_duplicates.len(), 1);
    assert!(predicate::str::contains("2 source files").eval(&record.details));
}

#[test]
fn empty_result_file_is_read_error_in_both_modes() {
    for mode in [FingerprintMode::Exact, FingerprintMode::Perceptual] {
        let (_temp, source, result) = tree();
        write_gradient(&source.child("photo.png").path().to_path_buf(), 1);
        result.child("broken.png").touch().unwrap();

        let (_, report) = run(source.path(), result.path(), mode);

        let record = &report.records[0];
        assert_eq!(record.status, CompareStatus::ReadError, "mode {}", mode);
        assert!(record.source_candidates.is_empty());
        assert!(record.result_fingerprint.is_none());
    }
}

#[test]
fn unknown_content_is_fingerprint_not_found() {
    let (_temp, source, result) = tree();
    source.child("a.png").write_binary(b"alpha content").unwrap();
    result.child("report.png").write_binary(b"something else").unwrap();

    let (_, report) = run(source.path(), result.path(), FingerprintMode::Exact);

    assert_eq!(report.records[0].status, CompareStatus::FingerprintNotFound);
    assert!(report.records[0].source_candidates.is_empty());
}

#[test]
fn counts_cover_every_status_and_sum_to_records() {
    let (_temp, source, result) = tree();
    source.child("Holiday_01.png").write_binary(b"one").unwrap();
    source.child("b.jpg").write_binary(b"two").unwrap();
    source.child("notes.txt").write_binary(b"three").unwrap();
    result.child("holiday-01.png").write_binary(b"one").unwrap();
    result.child("renamed.jpg").write_binary(b"two").unwrap();
    result.child("nested").create_dir_all().unwrap();
    result.child("nested/lost.webp").write_binary(b"four").unwrap();
    result.child("ignored.txt").write_binary(b"one").unwrap();

    let (_, report) = run(source.path(), result.path(), FingerprintMode::Exact);

    assert_eq!(report.source_entries.len(), 2);
    assert_eq!(report.records.len(), 3);
    assert_eq!(report.counts.total(), 3);
    assert_eq!(report.counts.iter().count(), 5);
    assert_eq!(report.counts.get(CompareStatus::Match), 1);
    assert_eq!(report.counts.get(CompareStatus::NameMismatch), 1);
    assert_eq!(report.counts.get(CompareStatus::FingerprintNotFound), 1);
    assert_eq!(report.counts.get(CompareStatus::SourceDuplicate), 0);
    assert_eq!(report.issues().count(), 2);
    assert!(!report.is_clean());
}

#[test]
fn events_arrive_in_stage_order() {
    let (_temp, source, result) = tree();
    for i in 0..5u8 {
        source
            .child(format!("s{}.png", i))
            .write_binary(&[i, i, i])
            .unwrap();
    }
    for i in 0..3u8 {
        result
            .child(format!("r{}.png", i))
            .write_binary(&[i, i, i])
            .unwrap();
    }

    let (events, _) = run(source.path(), result.path(), FingerprintMode::Exact);

    assert!(matches!(events.first(), Some(Event::Stage { .. })));
    let scan_done = events
        .iter()
        .position(|e| matches!(e, Event::ScanDone { .. }))
        .unwrap();
    assert!(matches!(
        events[scan_done],
        Event::ScanDone {
            source_total: 5,
            result_total: 3
        }
    ));

    let progress: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            Event::Progress(p) => Some(p.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(progress.len(), 8);
    assert!(progress[..5]
        .iter()
        .all(|p| p.stage == FingerprintStage::Source && p.total == 5));
    assert!(progress[5..]
        .iter()
        .all(|p| p.stage == FingerprintStage::Result && p.total == 3));
    assert_eq!(progress[4].done, 5);
    assert_eq!(progress[7].done, 3);

    let first_progress = events
        .iter()
        .position(|e| matches!(e, Event::Progress(_)))
        .unwrap();
    assert!(scan_done < first_progress);
    assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);
}

#[test]
fn perceptual_mode_matches_across_formats() {
    let (_temp, source, result) = tree();
    write_gradient(&source.child("Sunset_01.png").path().to_path_buf(), 10);
    write_gradient(&source.child("other.png").path().to_path_buf(), 200);
    write_gradient(&result.child("sunset-01.bmp").path().to_path_buf(), 10);

    let (_, exact) = run(source.path(), result.path(), FingerprintMode::Exact);
    assert_eq!(exact.records[0].status, CompareStatus::FingerprintNotFound);

    let (_, perceptual) = run(source.path(), result.path(), FingerprintMode::Perceptual);
    let record = &perceptual.records[0];
    assert_eq!(perceptual.mode, FingerprintMode::Perceptual);
    assert_eq!(record.status, CompareStatus::Match);
    assert_eq!(
        record.details,
        "normalized name match (separators/case ignored)"
    );
    assert_eq!(record.result_fingerprint.as_ref().map(|f| f.len()), Some(16));
}

#[test]
fn invalid_result_directory_reports_the_side() {
    let (_temp, source, _result) = tree();

    let worker = CompareWorker::builder()
        .source_dir(source.path())
        .result_dir("/definitely/not/here")
        .launcher(Arc::new(ThreadPoolLauncher))
        .build()
        .unwrap();
    let (handle, receiver) = worker.spawn().unwrap();
    let events: Vec<Event> = receiver.iter().collect();
    handle.join();

    assert_eq!(events.len(), 1);
    match &events[0] {
        Event::Error { message } => {
            assert!(predicate::str::starts_with("Result directory").eval(message.as_str()))
        }
        other => panic!("expected Error, got {:?}", other),
    }
}

#[test]
fn report_serializes_statuses_by_name() {
    let (_temp, source, result) = tree();
    source.child("a.png").write_binary(b"alpha").unwrap();
    result.child("a.png").write_binary(b"alpha").unwrap();

    let (_, report) = run(source.path(), result.path(), FingerprintMode::Exact);
    let json = serde_json::to_string(&report).unwrap();

    assert!(json.contains("\"MATCH\""));
    assert!(json.contains("\"started_at\""));
    let back: CompareReport = serde_json::from_str(&json).unwrap();
    assert_eq!(back.records, report.records);
}
