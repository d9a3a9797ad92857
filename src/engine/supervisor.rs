//! The dispatch loop: owns the task queue, the idle-worker set, the active
//! counter, and all aggregated run state. Everything a caller sees --
//! progress events, hash lines, verify counters -- is produced here, never
//! by a worker directly.

use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::time::Duration;

use crate::engine::types::{CancellationToken, CopyTask, HashLine, ProgressEvent, VerifySummary, VerifyTask};
use crate::engine::worker::{spawn_workers, SupervisorMessage, Task, WorkerId, WorkerMessage};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Outcome of one copy-run, before manifest/list files are written.
#[derive(Debug, Default)]
pub struct CopyRunResult {
    pub hash_lines: Vec<HashLine>,
    pub copied: Vec<PathBuf>,
    pub errored: Vec<(PathBuf, String)>,
    pub cancelled: bool,
}

/// Drive a copy-run to completion (or cancellation) and return the
/// aggregated result. Emits the initial `Overall{0, N}` event even when
/// `tasks` is empty.
pub fn run_copy(
    tasks: Vec<CopyTask>,
    thread_count: usize,
    cancel_token: &CancellationToken,
    mut on_progress: impl FnMut(ProgressEvent),
) -> CopyRunResult {
    let total_files = tasks.len() as u64;
    on_progress(ProgressEvent::Overall {
        completed_files: 0,
        total_files,
    });

    if total_files == 0 {
        return CopyRunResult::default();
    }

    let queue: VecDeque<Task> = tasks.into_iter().map(Task::Copy).collect();

    let mut hash_lines = Vec::new();
    let mut copied = Vec::new();
    let mut errored = Vec::new();

    let cancelled = drive(queue, thread_count, total_files, cancel_token, on_progress, |msg| {
        match msg {
            SupervisorMessage::Hash { path, digest, .. } => {
                copied.push(path.clone());
                hash_lines.push(HashLine { digest, dest: path });
            }
            SupervisorMessage::Error { path, message, .. } => {
                errored.push((path, message));
            }
            _ => {}
        }
    });

    CopyRunResult {
        hash_lines,
        copied,
        errored,
        cancelled,
    }
}

/// Drive a verify-run to completion (or cancellation) and return the
/// aggregated summary.
pub fn run_verify(
    tasks: Vec<VerifyTask>,
    thread_count: usize,
    cancel_token: &CancellationToken,
    mut on_progress: impl FnMut(ProgressEvent),
) -> VerifySummary {
    let total_files = tasks.len() as u64;
    on_progress(ProgressEvent::Overall {
        completed_files: 0,
        total_files,
    });

    let mut summary = VerifySummary {
        total: total_files,
        ..Default::default()
    };

    if total_files == 0 {
        return summary;
    }

    let queue: VecDeque<Task> = tasks.into_iter().map(Task::Verify).collect();

    drive(queue, thread_count, total_files, cancel_token, on_progress, |msg| match msg {
        SupervisorMessage::Verified { path, matched, .. } => {
            if matched {
                summary.ok += 1;
            } else {
                summary.mismatched += 1;
                summary.mismatched_paths.push(path);
            }
        }
        SupervisorMessage::Error { path, .. } => {
            summary.errors += 1;
            summary.error_paths.push(path);
        }
        _ => {}
    });

    summary
}

/// The shared dispatch loop underlying both `run_copy` and `run_verify`.
/// Returns whether the run was cut short by cancellation.
///
/// Dispatch runs exactly once per loop iteration, at the tail, after the
/// current message (if any) has been accounted for -- this avoids calling
/// a dispatch helper from multiple result-handling branches.
fn drive(
    mut queue: VecDeque<Task>,
    thread_count: usize,
    total_files: u64,
    cancel_token: &CancellationToken,
    mut on_progress: impl FnMut(ProgressEvent),
    mut on_result: impl FnMut(SupervisorMessage),
) -> bool {
    let thread_count = thread_count.max(1);
    let (result_tx, result_rx) = mpsc::channel::<SupervisorMessage>();
    let (handles, _inboxes) = spawn_workers(thread_count, result_tx);

    let mut known_inboxes: HashMap<WorkerId, Sender<WorkerMessage>> = HashMap::with_capacity(thread_count);
    let mut idle: Vec<WorkerId> = Vec::with_capacity(thread_count);
    let mut active: u64 = 0;
    let mut completed_files: u64 = 0;
    let mut shutting_down = false;
    let mut cancelled = false;

    loop {
        match result_rx.recv_timeout(POLL_INTERVAL) {
            Ok(msg) => handle_message(
                msg,
                &mut known_inboxes,
                &mut idle,
                &mut active,
                &mut completed_files,
                total_files,
                &mut on_progress,
                &mut on_result,
            ),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }

        if cancel_token.is_cancelled() && !shutting_down {
            cancelled = true;
            shutting_down = true;
            // Preserve counters for any results already in flight, without
            // waiting for tasks still mid-copy to finish.
            while let Ok(msg) = result_rx.try_recv() {
                handle_message(
                    msg,
                    &mut known_inboxes,
                    &mut idle,
                    &mut active,
                    &mut completed_files,
                    total_files,
                    &mut on_progress,
                    &mut on_result,
                );
            }
            shutdown_idle(&mut idle, &known_inboxes);
            break;
        }

        if !shutting_down {
            dispatch_once(&mut queue, &mut idle, &known_inboxes, &mut active);
            if queue.is_empty() && active == 0 {
                shutting_down = true;
                shutdown_idle(&mut idle, &known_inboxes);
            }
        }

        if shutting_down && active == 0 {
            break;
        }
    }

    if !cancelled {
        // Every worker received Shutdown above; all are idle, so joining is
        // immediate. On cancellation, workers mid-task are left running and
        // intentionally not joined -- their inbox was never sent Shutdown.
        for handle in handles {
            let _ = handle.join();
        }
    }

    cancelled
}

fn handle_message(
    msg: SupervisorMessage,
    known_inboxes: &mut HashMap<WorkerId, Sender<WorkerMessage>>,
    idle: &mut Vec<WorkerId>,
    active: &mut u64,
    completed_files: &mut u64,
    total_files: u64,
    on_progress: &mut impl FnMut(ProgressEvent),
    on_result: &mut impl FnMut(SupervisorMessage),
) {
    match msg {
        SupervisorMessage::Ready { worker, inbox } => {
            known_inboxes.insert(worker, inbox);
            idle.push(worker);
        }
        SupervisorMessage::Progress {
            path,
            bytes_so_far,
            bytes_total,
            ..
        } => {
            on_progress(ProgressEvent::FileProgress {
                path,
                bytes_so_far,
                bytes_total,
            });
        }
        SupervisorMessage::Done { worker, path } => {
            *completed_files += 1;
            *active -= 1;
            idle.push(worker);
            on_progress(ProgressEvent::FileDone {
                path,
                completed_files: *completed_files,
                total_files,
            });
            on_progress(ProgressEvent::Overall {
                completed_files: *completed_files,
                total_files,
            });
        }
        other => on_result(other),
    }
}

fn dispatch_once(
    queue: &mut VecDeque<Task>,
    idle: &mut Vec<WorkerId>,
    known_inboxes: &HashMap<WorkerId, Sender<WorkerMessage>>,
    active: &mut u64,
) {
    while !queue.is_empty() {
        let Some(worker) = idle.pop() else { break };
        let Some(inbox) = known_inboxes.get(&worker) else { continue };
        let task = queue.pop_front().expect("checked non-empty above");
        if inbox.send(WorkerMessage::Task(task)).is_ok() {
            *active += 1;
        }
    }
}

fn shutdown_idle(idle: &mut Vec<WorkerId>, known_inboxes: &HashMap<WorkerId, Sender<WorkerMessage>>) {
    for worker in idle.drain(..) {
        if let Some(inbox) = known_inboxes.get(&worker) {
            let _ = inbox.send(WorkerMessage::Shutdown);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::types::CancellationToken;

    #[test]
    fn run_copy_empty_input_emits_only_initial_overall() {
        let token = CancellationToken::new();
        let mut events = Vec::new();
        let result = run_copy(Vec::new(), 2, &token, |e| events.push(e));

        assert!(result.hash_lines.is_empty());
        assert_eq!(events.len(), 1);
        assert!(matches!(
            events[0],
            ProgressEvent::Overall {
                completed_files: 0,
                total_files: 0
            }
        ));
    }

    #[test]
    fn run_copy_copies_all_files_and_reports_one_done_each() {
        let dir = tempfile::tempdir().unwrap();
        let src_a = dir.path().join("a.txt");
        let src_b = dir.path().join("b.txt");
        std::fs::write(&src_a, "hello\n").unwrap();
        std::fs::write(&src_b, "world\n").unwrap();
        let dst_a = dir.path().join("out_a.txt");
        let dst_b = dir.path().join("out_b.txt");

        let tasks = vec![
            CopyTask { source: src_a, dest: dst_a.clone() },
            CopyTask { source: src_b, dest: dst_b.clone() },
        ];

        let token = CancellationToken::new();
        let mut completed_counts = Vec::new();
        let result = run_copy(tasks, 2, &token, |e| {
            if let ProgressEvent::FileDone { completed_files, .. } = e {
                completed_counts.push(completed_files);
            }
        });

        assert_eq!(result.hash_lines.len(), 2);
        assert_eq!(result.errored.len(), 0);
        assert_eq!(completed_counts.len(), 2);
        // completed_files is monotonically non-decreasing
        assert!(completed_counts.windows(2).all(|w| w[1] >= w[0]));
        assert!(dst_a.exists());
        assert!(dst_b.exists());
    }

    #[test]
    fn run_copy_isolates_per_task_errors() {
        let dir = tempfile::tempdir().unwrap();
        let good_src = dir.path().join("good.txt");
        std::fs::write(&good_src, "ok\n").unwrap();
        let bad_src = dir.path().join("missing.txt");

        let tasks = vec![
            CopyTask { source: good_src, dest: dir.path().join("out_good.txt") },
            CopyTask { source: bad_src.clone(), dest: dir.path().join("out_bad.txt") },
        ];

        let token = CancellationToken::new();
        let result = run_copy(tasks, 2, &token, |_| {});

        assert_eq!(result.hash_lines.len(), 1);
        assert_eq!(result.errored.len(), 1);
        assert_eq!(result.errored[0].0, bad_src);
    }

    #[test]
    fn run_copy_cancelled_before_dispatch_emits_only_initial_overall() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("a.txt");
        std::fs::write(&src, "hello\n").unwrap();

        let tasks = vec![CopyTask { source: src, dest: dir.path().join("out.txt") }];

        let token = CancellationToken::new();
        token.cancel();

        let mut events = Vec::new();
        let result = run_copy(tasks, 2, &token, |e| events.push(e));

        assert!(result.cancelled);
        assert!(result.hash_lines.is_empty());
    }

    #[test]
    fn run_verify_reports_ok_and_mismatch_and_errors() {
        let dir = tempfile::tempdir().unwrap();
        let ok_path = dir.path().join("ok.bin");
        std::fs::write(&ok_path, [0x00u8, 0x01, 0x02, 0x03]).unwrap();
        let mismatch_path = dir.path().join("mismatch.bin");
        std::fs::write(&mismatch_path, [0x00u8, 0x01, 0x02, 0x04]).unwrap();
        let missing_path = dir.path().join("gone.txt");

        let tasks = vec![
            VerifyTask {
                path: ok_path,
                expected: "a02a05b025b928c039cf1ae7e8ee04e7c190c0db".to_string(),
            },
            VerifyTask {
                path: mismatch_path.clone(),
                expected: "a02a05b025b928c039cf1ae7e8ee04e7c190c0db".to_string(),
            },
            VerifyTask {
                path: missing_path.clone(),
                expected: "a".repeat(40),
            },
        ];

        let token = CancellationToken::new();
        let summary = run_verify(tasks, 2, &token, |_| {});

        assert_eq!(summary.total, 3);
        assert_eq!(summary.ok, 1);
        assert_eq!(summary.mismatched, 1);
        assert_eq!(summary.errors, 1);
        assert_eq!(summary.mismatched_paths, vec![mismatch_path]);
        assert_eq!(summary.error_paths, vec![missing_path]);
    }

    #[test]
    fn run_verify_empty_input_returns_zeroed_summary() {
        let token = CancellationToken::new();
        let summary = run_verify(Vec::new(), 2, &token, |_| {});
        assert_eq!(summary.total, 0);
        assert_eq!(summary.ok, 0);
    }
}
