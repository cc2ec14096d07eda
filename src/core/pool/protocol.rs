//! Line-delimited JSON exchanged with worker processes.
//!
//! The parent writes one [`FingerprintTask`] per line to the worker's
//! stdin and reads back one [`TaskOutcome`] per line from its stdout. The
//! worker exits when stdin reaches EOF.

use super::{FingerprintTask, TaskOutcome};
use crate::core::fingerprint::FingerprintConfig;
use std::io::{self, BufRead, Write};
use tracing::{debug, warn};

fn invalid_data(e: impl std::fmt::Display) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, e.to_string())
}

/// Worker side: answer every request on `reader` until EOF.
///
/// Returns the number of tasks served. Blank lines are skipped; a line that
/// is not a valid request is an error, since the parent never sends one.
pub fn serve<R: BufRead, W: Write>(
    config: FingerprintConfig,
    reader: R,
    mut writer: W,
) -> io::Result<usize> {
    let mut served = 0;
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let task: FingerprintTask = serde_json::from_str(&line).map_err(invalid_data)?;
        let outcome = TaskOutcome::run(&task, &config);
        if let Some(ref error) = outcome.error {
            debug!(path = ?task.path, %error, "Fingerprint failed");
        }
        serde_json::to_writer(&mut writer, &outcome).map_err(invalid_data)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        served += 1;
    }
    Ok(served)
}

/// Parent side: send one task and wait for its outcome
pub fn exchange<W: Write, R: BufRead>(
    writer: &mut W,
    reader: &mut R,
    task: &FingerprintTask,
) -> io::Result<TaskOutcome> {
    serde_json::to_writer(&mut *writer, task).map_err(invalid_data)?;
    writer.write_all(b"\n")?;
    writer.flush()?;

    let mut line = String::new();
    if reader.read_line(&mut line)? == 0 {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "worker closed its output",
        ));
    }

    let outcome: TaskOutcome = serde_json::from_str(line.trim_end()).map_err(invalid_data)?;
    if outcome.id != task.id {
        warn!(expected = task.id, got = outcome.id, "Worker answered out of order");
        return Err(invalid_data(format!(
            "expected reply for task {}, got {}",
            task.id, outcome.id
        )));
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Cursor;
    use tempfile::TempDir;

    #[test]
    fn serve_answers_each_request_in_order() {
        let dir = TempDir::new().unwrap();
        let good = dir.path().join("good.png");
        fs::write(&good, b"data").unwrap();
        let missing = dir.path().join("missing.png");

        let requests = [
            FingerprintTask { id: 0, path: good },
            FingerprintTask {
                id: 1,
                path: missing,
            },
        ];
        let mut input = String::new();
        for request in &requests {
            input.push_str(&serde_json::to_string(request).unwrap());
            input.push_str("\n\n");
        }

        let mut output = Vec::new();
        let served = serve(
            FingerprintConfig::default(),
            Cursor::new(input),
            &mut output,
        )
        .unwrap();
        assert_eq!(served, 2);

        let replies: Vec<TaskOutcome> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(replies[0].id, 0);
        assert!(replies[0].fingerprint.is_some());
        assert_eq!(replies[1].id, 1);
        assert!(replies[1].error.is_some());
    }

    #[test]
    fn serve_rejects_malformed_requests() {
        let mut output = Vec::new();
        let result = serve(
            FingerprintConfig::default(),
            Cursor::new("not json\n"),
            &mut output,
        );
        assert!(result.is_err());
    }

    #[test]
    fn exchange_reports_closed_worker() {
        let task = FingerprintTask {
            id: 7,
            path: "/a.png".into(),
        };
        let mut sink = Vec::new();
        let mut empty = Cursor::new(Vec::<u8>::new());
        let error = exchange(&mut sink, &mut empty, &task).unwrap_err();
        assert_eq!(error.kind(), io::ErrorKind::UnexpectedEof);
        assert!(String::from_utf8(sink).unwrap().contains("\"id\":7"));
    }

    #[test]
    fn exchange_rejects_mismatched_reply() {
        let task = FingerprintTask {
            id: 1,
            path: "/a.png".into(),
        };
        let reply = TaskOutcome::failed(
            &FingerprintTask {
                id: 2,
                path: "/b.png".into(),
            },
            "x",
        );
        let mut reader = Cursor::new(format!("{}\n", serde_json::to_string(&reply).unwrap()));
        let error = exchange(&mut Vec::new(), &mut reader, &task).unwrap_err();
        assert_eq!(error.kind(), io::ErrorKind::InvalidData);
    }
}
