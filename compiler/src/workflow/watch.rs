use crate::workflow::runner::{Runner, ScanReport};
use anyhow::Context;
use log::{debug, info, warn};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::runtime::Builder as TokioBuilder;
use tokio::{signal, task, time};

/// Raw export files of one result directory with their sizes, sorted by path.
type RawSnapshot = Vec<(PathBuf, u64)>;

fn raw_snapshot(result_dir: &Path, raw_suffix: &str) -> io::Result<RawSnapshot> {
    let mut stack = Vec::new();
    for entry in fs::read_dir(result_dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() && entry.file_name().to_string_lossy().ends_with(raw_suffix) {
            stack.push(entry.path());
        }
    }

    let mut snapshot = Vec::new();
    while let Some(dir) = stack.pop() {
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            let metadata = entry.metadata()?;
            if metadata.is_dir() {
                stack.push(entry.path());
            } else {
                snapshot.push((entry.path(), metadata.len()));
            }
        }
    }
    snapshot.sort();
    Ok(snapshot)
}

/// Holds back result directories whose raw export is still being written.
///
/// A pending directory is released once its raw files and sizes are the same
/// on two consecutive ticks.
#[derive(Debug, Default)]
pub struct SettleTracker {
    last_seen: HashMap<PathBuf, RawSnapshot>,
}

impl SettleTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn settled(&mut self, pending: Vec<PathBuf>, raw_suffix: &str) -> Vec<PathBuf> {
        let mut previous = std::mem::take(&mut self.last_seen);
        let mut settled = Vec::new();
        for result_dir in pending {
            let snapshot = match raw_snapshot(&result_dir, raw_suffix) {
                Ok(snapshot) => snapshot,
                Err(err) => {
                    warn!("cannot inspect {}: {}", result_dir.display(), err);
                    continue;
                }
            };
            if previous.remove(&result_dir).as_ref() == Some(&snapshot) {
                settled.push(result_dir);
            } else {
                debug!("waiting for {} to settle", result_dir.display());
                self.last_seen.insert(result_dir, snapshot);
            }
        }
        settled
    }
}

/// One watcher pass: compile the pending result directories that have settled.
pub fn watch_tick(
    runner: &Runner,
    project_dir: &Path,
    tracker: &mut SettleTracker,
) -> anyhow::Result<ScanReport> {
    let pending = runner.pending_result_dirs(project_dir)?;
    let settled = tracker.settled(pending, &runner.engine().raw_dir_suffix);
    Ok(runner.compile_all(settled))
}

/// Re-scan `project_dir` every `interval` until Ctrl+C.
///
/// Passes run one at a time on the blocking pool, so a result directory is
/// never compiled by two invocations at once.
pub fn watch_project(runner: Runner, project_dir: PathBuf, interval: Duration) -> anyhow::Result<()> {
    let runtime = TokioBuilder::new_current_thread()
        .enable_all()
        .build()
        .context("creating runtime for project watcher")?;

    runtime.block_on(async move {
        let mut ticker = time::interval(interval);
        ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);
        let shutdown = signal::ctrl_c();
        tokio::pin!(shutdown);
        let mut tracker = SettleTracker::new();

        info!("monitoring {} (Ctrl+C to stop)", project_dir.display());
        loop {
            tokio::select! {
                result = &mut shutdown => {
                    result.context("awaiting Ctrl+C")?;
                    break;
                }
                _ = ticker.tick() => {
                    let pass_runner = runner.clone();
                    let pass_dir = project_dir.clone();
                    let mut pass_tracker = std::mem::take(&mut tracker);
                    let (returned, outcome) = task::spawn_blocking(move || {
                        let outcome = watch_tick(&pass_runner, &pass_dir, &mut pass_tracker);
                        (pass_tracker, outcome)
                    })
                    .await
                    .context("joining project scan")?;
                    tracker = returned;
                    if let Err(err) = outcome {
                        warn!("scan of {} failed: {:#}", project_dir.display(), err);
                    }
                }
            }
        }

        let metrics = runner.metrics().snapshot();
        info!(
            "monitoring stopped: {} compiled, {} failed, {} files skipped",
            metrics.compiled, metrics.failed, metrics.skipped_files
        );
        Ok::<(), anyhow::Error>(())
    })
}
