//! Scheduled batch execution
//!
//! The scheduler is an explicit loop rather than a fire-and-forget
//! interval: while running it fires a cycle, then waits out the interval
//! while watching the run-state channel so a stop command ends the loop at
//! the next boundary. An in-flight cycle always finishes; there is no
//! mid-cycle abort. Firing goes through `try_lock` on the runner mutex, so
//! a tick that lands while a cycle is still in flight is a no-op instead
//! of a queued duplicate.
//!
//! Every start tags its loop with a generation token carried on the watch
//! channel; a loop whose token has gone stale exits at the next state
//! check, so a stop followed by a quick restart never leaves two loops
//! ticking.

pub mod rotation;

pub use rotation::{RotationState, SourceRotator};

use crate::batch::CycleRunner;
use crate::models::CycleResult;
use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Whether the scheduled loop is active
///
/// Only admin commands move this; cycle failures never stop the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Stopped,
    Running,
}

/// Watch-channel payload: the run state plus the generation of the loop
/// entitled to act on it
#[derive(Debug, Clone, Copy)]
struct LoopState {
    generation: u64,
    run: RunState,
}

/// Handle controlling the scheduled posting loop
pub struct SchedulerHandle {
    runner: Arc<Mutex<CycleRunner>>,
    interval: Duration,
    state_tx: watch::Sender<LoopState>,
    task: StdMutex<Option<JoinHandle<()>>>,
}

impl SchedulerHandle {
    pub fn new(runner: Arc<Mutex<CycleRunner>>, interval: Duration) -> Self {
        let (state_tx, _) = watch::channel(LoopState {
            generation: 0,
            run: RunState::Stopped,
        });
        Self {
            runner,
            interval,
            state_tx,
            task: StdMutex::new(None),
        }
    }

    pub fn run_state(&self) -> RunState {
        self.state_tx.borrow().run
    }

    pub fn is_running(&self) -> bool {
        self.run_state() == RunState::Running
    }

    /// Start the loop; returns false when it is already running
    pub fn start(&self) -> bool {
        if self.is_running() {
            return false;
        }
        // a fresh generation retires any loop still winding down from a
        // previous start
        let generation = self.state_tx.borrow().generation + 1;
        self.state_tx.send_replace(LoopState {
            generation,
            run: RunState::Running,
        });

        let runner = self.runner.clone();
        let interval = self.interval;
        let rx = self.state_tx.subscribe();
        let handle = tokio::spawn(run_loop(runner, interval, rx, generation));

        if let Ok(mut task) = self.task.lock() {
            if let Some(old) = task.replace(handle) {
                if !old.is_finished() {
                    debug!("previous scheduler task still winding down");
                }
            }
        }
        info!(interval_secs = self.interval.as_secs(), "scheduler started");
        true
    }

    /// Request a stop at the next cycle boundary; returns false when
    /// already stopped
    pub fn stop(&self) -> bool {
        if !self.is_running() {
            return false;
        }
        let generation = self.state_tx.borrow().generation;
        self.state_tx.send_replace(LoopState {
            generation,
            run: RunState::Stopped,
        });
        info!("scheduler stop requested, in-flight cycle will finish");
        true
    }
}

async fn run_loop(
    runner: Arc<Mutex<CycleRunner>>,
    interval: Duration,
    mut rx: watch::Receiver<LoopState>,
    my_generation: u64,
) {
    loop {
        if !loop_active(&rx, my_generation) {
            break;
        }

        if let Some(result) = try_fire(&runner).await {
            let guard = runner.lock().await;
            guard.send_completion_notice(&result).await;
        }

        if !wait_interval(&mut rx, interval, my_generation).await {
            break;
        }
    }
    info!(generation = my_generation, "scheduler loop ended");
}

fn loop_active(rx: &watch::Receiver<LoopState>, my_generation: u64) -> bool {
    let state = *rx.borrow();
    state.run == RunState::Running && state.generation == my_generation
}

/// Sleep out the interval while watching for a stop or a takeover
///
/// Returns true when the full interval elapsed and the loop is still the
/// active generation. A state change that leaves the loop active resumes
/// the same sleep rather than firing early.
async fn wait_interval(
    rx: &mut watch::Receiver<LoopState>,
    interval: Duration,
    my_generation: u64,
) -> bool {
    let sleep = tokio::time::sleep(interval);
    tokio::pin!(sleep);
    loop {
        tokio::select! {
            _ = &mut sleep => return true,
            changed = rx.changed() => {
                if changed.is_err() || !loop_active(rx, my_generation) {
                    return false;
                }
            }
        }
    }
}

/// Fire a cycle unless one is already in flight
///
/// The single-flight guard for scheduled ticks and manual commands alike:
/// a held lock means a cycle is running, so the caller gets `None` instead
/// of a queued second cycle.
pub async fn try_fire(runner: &Arc<Mutex<CycleRunner>>) -> Option<CycleResult> {
    match runner.try_lock() {
        Ok(mut guard) => Some(guard.run_cycle().await),
        Err(_) => {
            debug!("cycle already in flight, skipping trigger");
            None
        }
    }
}
