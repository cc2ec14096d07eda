//! Pool of child worker processes.
//!
//! Each worker slot is a driver thread in this process paired with one
//! child running the `worker` subcommand. The driver pulls tasks from a
//! shared queue, forwards them over the child's stdin and relays the reply
//! into the results channel. Termination kills every child, which makes
//! the blocked drivers see EOF and exit.

use super::protocol::exchange;
use super::{FingerprintTask, PoolLauncher, TaskOutcome, WorkerPool};
use crate::core::fingerprint::FingerprintConfig;
use crate::error::PoolError;
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use std::ffi::OsString;
use std::io::BufReader;
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, warn};

type WorkerIo = (ChildStdin, BufReader<ChildStdout>);

/// Launches [`ProcessWorkerPool`]s running `program worker ...`
#[derive(Debug, Clone)]
pub struct ProcessPoolLauncher {
    program: PathBuf,
    args: Vec<OsString>,
}

impl ProcessPoolLauncher {
    /// Use `program` as the worker executable. It must understand the
    /// `worker --mode <mode> --hash-size <n>` subcommand.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: vec![OsString::from("worker")],
        }
    }

    /// Re-launch the running executable as the worker
    pub fn current_exe() -> Result<Self, PoolError> {
        let program = std::env::current_exe().map_err(PoolError::Executable)?;
        Ok(Self::new(program))
    }

    /// Replace the arguments placed before the mode flags
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }
}

impl PoolLauncher for ProcessPoolLauncher {
    fn launch(
        &self,
        workers: usize,
        config: FingerprintConfig,
    ) -> Result<Arc<dyn WorkerPool>, PoolError> {
        let (task_tx, task_rx) = unbounded::<FingerprintTask>();
        let (results_tx, results_rx) = unbounded();

        let shared = Arc::new(Shared {
            program: self.program.clone(),
            args: self.args.clone(),
            config,
            children: Mutex::new(Vec::new()),
            terminated: AtomicBool::new(false),
            results: results_tx,
        });

        let pool = ProcessWorkerPool {
            shared: Arc::clone(&shared),
            tasks: Mutex::new(Some(task_tx)),
            queued: task_rx.clone(),
            results: results_rx,
            drivers: Mutex::new(Vec::new()),
            stopping: Mutex::new(()),
        };

        for slot in 0..workers {
            let io = match shared.spawn_child() {
                Ok(io) => io,
                Err(e) => {
                    pool.terminate();
                    return Err(e);
                }
            };
            let shared = Arc::clone(&shared);
            let tasks = task_rx.clone();
            let driver = thread::Builder::new()
                .name(format!("fp-worker-{}", slot))
                .spawn(move || drive(shared, tasks, io));
            match driver {
                Ok(handle) => lock(&pool.drivers).push(handle),
                Err(e) => {
                    pool.terminate();
                    return Err(PoolError::Build(e.to_string()));
                }
            }
        }

        debug!(workers, mode = %config.mode, program = ?self.program, "Process pool started");
        Ok(Arc::new(pool))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

struct Shared {
    program: PathBuf,
    args: Vec<OsString>,
    config: FingerprintConfig,
    children: Mutex<Vec<Child>>,
    terminated: AtomicBool,
    results: Sender<TaskOutcome>,
}

impl Shared {
    fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::SeqCst)
    }

    /// Start a child and register it. Registration happens under the same
    /// lock `terminate` kills under, so no child can escape a kill.
    fn spawn_child(&self) -> Result<WorkerIo, PoolError> {
        let mut children = lock(&self.children);
        if self.is_terminated() {
            return Err(PoolError::Closed);
        }

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg("--mode")
            .arg(self.config.mode.to_string())
            .arg("--hash-size")
            .arg(self.config.hash_size.to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source| PoolError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let stdin = child.stdin.take();
        let stdout = child.stdout.take();
        children.push(child);

        match (stdin, stdout) {
            (Some(stdin), Some(stdout)) => Ok((stdin, BufReader::new(stdout))),
            _ => Err(PoolError::Spawn {
                program: self.program.clone(),
                source: std::io::Error::new(
                    std::io::ErrorKind::BrokenPipe,
                    "worker pipes unavailable",
                ),
            }),
        }
    }

    fn kill_all(&self) {
        let mut children = lock(&self.children);
        for child in children.iter_mut() {
            // Already-exited children make kill fail; that is fine.
            let _ = child.kill();
            let _ = child.wait();
        }
        children.clear();
    }

    fn reap_all(&self) {
        let mut children = lock(&self.children);
        for child in children.iter_mut() {
            let _ = child.wait();
        }
        children.clear();
    }
}

/// Driver loop for one worker slot
fn drive(shared: Arc<Shared>, tasks: Receiver<FingerprintTask>, io: WorkerIo) {
    let mut io = Some(io);

    for task in tasks.iter() {
        if shared.is_terminated() {
            break;
        }

        if io.is_none() {
            match shared.spawn_child() {
                Ok(fresh) => io = Some(fresh),
                Err(e) => {
                    if shared.is_terminated() {
                        break;
                    }
                    warn!(error = %e, "Could not restart worker process");
                    let _ = shared.results.send(TaskOutcome::failed(&task, e.to_string()));
                    continue;
                }
            }
        }

        let Some((stdin, stdout)) = io.as_mut() else {
            continue;
        };

        match exchange(stdin, stdout, &task) {
            Ok(outcome) => {
                let _ = shared.results.send(outcome);
            }
            Err(e) => {
                io = None;
                if shared.is_terminated() {
                    break;
                }
                warn!(path = ?task.path, error = %e, "Worker process failed");
                let _ = shared.results.send(TaskOutcome::failed(
                    &task,
                    format!("worker process failed: {}", e),
                ));
            }
        }
    }
    // Dropping `io` closes the child's stdin, which ends its serve loop.
}

/// Worker processes fed through driver threads
pub struct ProcessWorkerPool {
    shared: Arc<Shared>,
    tasks: Mutex<Option<Sender<FingerprintTask>>>,
    queued: Receiver<FingerprintTask>,
    results: Receiver<TaskOutcome>,
    drivers: Mutex<Vec<JoinHandle<()>>>,
    stopping: Mutex<()>,
}

impl ProcessWorkerPool {
    fn join_drivers(&self) {
        let drivers: Vec<_> = lock(&self.drivers).drain(..).collect();
        for driver in drivers {
            let _ = driver.join();
        }
    }
}

impl WorkerPool for ProcessWorkerPool {
    fn submit(&self, task: FingerprintTask) -> Result<(), PoolError> {
        if self.shared.is_terminated() {
            return Err(PoolError::Closed);
        }
        let tasks = lock(&self.tasks);
        let sender = tasks.as_ref().ok_or(PoolError::Closed)?;
        sender.send(task).map_err(|_| PoolError::Closed)
    }

    fn recv_timeout(&self, timeout: Duration) -> Result<TaskOutcome, RecvTimeoutError> {
        self.results.recv_timeout(timeout)
    }

    fn terminate(&self) {
        // Later callers wait here until the first kill has finished.
        let _stopping = lock(&self.stopping);
        if self.shared.terminated.swap(true, Ordering::SeqCst) {
            return;
        }
        lock(&self.tasks).take();
        let dropped = self.queued.try_iter().count();
        self.shared.kill_all();
        self.join_drivers();
        debug!(dropped, "Process pool terminated");
    }

    fn shutdown(&self) {
        lock(&self.tasks).take();
        self.join_drivers();
        self.shared.reap_all();
        debug!("Process pool shut down");
    }

    fn live_workers(&self) -> usize {
        lock(&self.shared.children)
            .iter_mut()
            .map(|child| matches!(child.try_wait(), Ok(None)))
            .filter(|alive| *alive)
            .count()
    }
}

impl Drop for ProcessWorkerPool {
    fn drop(&mut self) {
        if !self.shared.is_terminated() && lock(&self.tasks).is_some() {
            self.terminate();
        }
    }
}
