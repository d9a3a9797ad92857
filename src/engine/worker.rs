//! The worker message protocol and the worker thread loop.
//!
//! Each worker owns an `mpsc::Receiver<WorkerMessage>` inbox and holds a
//! clone of the Supervisor's single `mpsc::Sender<SupervisorMessage>`
//! result channel. Workers share no mutable state with each other -- the
//! only thing that crosses a worker boundary is a task passed by value and
//! the messages it posts back.

use std::path::PathBuf;
use std::sync::mpsc::{Receiver, Sender};
use std::thread;

use tracing::trace;

use crate::engine::stream::{copy_with_hash, digests_match, verify_with_hash};
use crate::engine::types::{CopyTask, VerifyTask};

/// A unit of work sent from the Supervisor to one worker.
pub enum WorkerMessage {
    Task(Task),
    Shutdown,
}

/// Either kind of task a worker can run; which loop it drives depends on
/// which variant it receives.
pub enum Task {
    Copy(CopyTask),
    Verify(VerifyTask),
}

/// A worker's identity, carried in every message it posts so the Supervisor
/// knows which inbox to return to `idle_workers`.
pub type WorkerId = usize;

/// Messages a worker posts back to the Supervisor's single result channel.
pub enum SupervisorMessage {
    Ready {
        worker: WorkerId,
        inbox: Sender<WorkerMessage>,
    },
    Progress {
        worker: WorkerId,
        path: PathBuf,
        bytes_so_far: u64,
        bytes_total: u64,
    },
    Hash {
        worker: WorkerId,
        path: PathBuf,
        digest: String,
    },
    Verified {
        worker: WorkerId,
        path: PathBuf,
        digest: String,
        expected: String,
        matched: bool,
    },
    Error {
        worker: WorkerId,
        path: PathBuf,
        message: String,
    },
    Done {
        worker: WorkerId,
        path: PathBuf,
    },
}

/// Spawn `count` worker threads. Each announces itself with `Ready`, then
/// blocks on its inbox for `Task` or `Shutdown`. Returns the join handles
/// and the per-worker inbox senders the Supervisor uses to dispatch.
pub fn spawn_workers(
    count: usize,
    result_tx: Sender<SupervisorMessage>,
) -> (Vec<thread::JoinHandle<()>>, Vec<Sender<WorkerMessage>>) {
    let mut handles = Vec::with_capacity(count);
    let mut inboxes = Vec::with_capacity(count);

    for worker_id in 0..count {
        let (task_tx, task_rx) = std::sync::mpsc::channel::<WorkerMessage>();
        let result_tx = result_tx.clone();
        let inbox_handle = task_tx.clone();

        let handle = thread::spawn(move || {
            worker_loop(worker_id, task_rx, result_tx, inbox_handle);
        });

        handles.push(handle);
        inboxes.push(task_tx);
    }

    (handles, inboxes)
}

fn worker_loop(
    worker_id: WorkerId,
    inbox: Receiver<WorkerMessage>,
    result_tx: Sender<SupervisorMessage>,
    inbox_handle: Sender<WorkerMessage>,
) {
    trace!(worker_id, "worker ready");
    let _ = result_tx.send(SupervisorMessage::Ready {
        worker: worker_id,
        inbox: inbox_handle,
    });

    loop {
        match inbox.recv() {
            Ok(WorkerMessage::Task(Task::Copy(task))) => {
                run_copy_task(worker_id, &task, &result_tx);
            }
            Ok(WorkerMessage::Task(Task::Verify(task))) => {
                run_verify_task(worker_id, &task, &result_tx);
            }
            Ok(WorkerMessage::Shutdown) => {
                trace!(worker_id, "worker shutting down");
                break;
            }
            Err(_) => break,
        }
    }
}

fn run_copy_task(worker_id: WorkerId, task: &CopyTask, result_tx: &Sender<SupervisorMessage>) {
    let path = task.source.clone();
    let progress_tx = result_tx.clone();
    let progress_path = path.clone();

    let outcome = copy_with_hash(&task.source, &task.dest, |bytes_so_far, bytes_total| {
        let _ = progress_tx.send(SupervisorMessage::Progress {
            worker: worker_id,
            path: progress_path.clone(),
            bytes_so_far,
            bytes_total,
        });
    });

    match outcome {
        Ok(outcome) => {
            let _ = result_tx.send(SupervisorMessage::Hash {
                worker: worker_id,
                path: task.dest.clone(),
                digest: outcome.digest,
            });
        }
        Err(err) => {
            let _ = result_tx.send(SupervisorMessage::Error {
                worker: worker_id,
                path: path.clone(),
                message: err.to_string(),
            });
        }
    }

    let _ = result_tx.send(SupervisorMessage::Done {
        worker: worker_id,
        path,
    });
}

fn run_verify_task(worker_id: WorkerId, task: &VerifyTask, result_tx: &Sender<SupervisorMessage>) {
    let path = task.path.clone();
    let progress_tx = result_tx.clone();
    let progress_path = path.clone();

    let outcome = verify_with_hash(&task.path, |bytes_so_far, bytes_total| {
        let _ = progress_tx.send(SupervisorMessage::Progress {
            worker: worker_id,
            path: progress_path.clone(),
            bytes_so_far,
            bytes_total,
        });
    });

    match outcome {
        Ok(outcome) => {
            let matched = digests_match(&task.expected, &outcome.digest);
            let _ = result_tx.send(SupervisorMessage::Verified {
                worker: worker_id,
                path: path.clone(),
                digest: outcome.digest,
                expected: task.expected.clone(),
                matched,
            });
        }
        Err(err) => {
            let _ = result_tx.send(SupervisorMessage::Error {
                worker: worker_id,
                path: path.clone(),
                message: err.to_string(),
            });
        }
    }

    let _ = result_tx.send(SupervisorMessage::Done {
        worker: worker_id,
        path,
    });
}
