//! Scheduler loop tests: run-state transitions, stop-at-cycle-boundary
//! semantics and the completion notification.

mod common;

use common::*;
use std::sync::Arc;
use std::time::Duration;
use tapet::models::WallpaperSource;
use tapet::scheduler::{RunState, SchedulerHandle};

#[tokio::test]
async fn start_and_stop_toggle_run_state() {
    let src = WallpaperSource::Pexels;
    let provider = Arc::new(MockProvider::new(src, MockBehavior::Return(vec![])));
    let (runner, _ctx) = build_runner(vec![(src, provider)], Arc::new(MockPoster::new()), settings(1));

    let scheduler = SchedulerHandle::new(runner, Duration::from_secs(3600));
    assert_eq!(scheduler.run_state(), RunState::Stopped);
    assert!(!scheduler.stop());

    assert!(scheduler.start());
    assert!(scheduler.is_running());
    // second start is rejected, not doubled
    assert!(!scheduler.start());

    assert!(scheduler.stop());
    assert!(!scheduler.is_running());
    assert!(!scheduler.stop());
}

#[tokio::test]
async fn scheduled_cycle_fires_and_notifies_admin() {
    let server = image_server().await;
    let src = WallpaperSource::Unsplash;
    let provider = Arc::new(MockProvider::new(
        src,
        MockBehavior::Return(vec![portrait(&server, src, "s1")]),
    ));
    let poster = Arc::new(MockPoster::new());
    let (runner, ctx) = build_runner(vec![(src, provider.clone())], poster, settings(1));

    let scheduler = SchedulerHandle::new(runner, Duration::from_secs(3600));
    scheduler.start();

    // give the first tick time to run its cycle
    tokio::time::sleep(Duration::from_millis(300)).await;
    scheduler.stop();

    assert_eq!(provider.call_count(), 1);
    assert_eq!(ctx.poster.sent_count(), 1);
    let notices = ctx.poster.notices.lock().expect("notices");
    assert_eq!(notices.len(), 1);
    assert!(notices[0].contains("Scheduled batch complete"));
    assert!(notices[0].contains("Unsplash"));
}

#[tokio::test]
async fn stop_lets_the_inflight_cycle_finish() {
    let server = image_server().await;
    let src = WallpaperSource::Pexels;
    let provider = Arc::new(MockProvider::new(
        src,
        MockBehavior::Return(vec![
            portrait(&server, src, "slow1"),
            portrait(&server, src, "slow2"),
        ]),
    ));
    // each send takes long enough that stop lands mid-cycle
    let poster = Arc::new(MockPoster::slow(Duration::from_millis(150)));
    let (runner, ctx) = build_runner(vec![(src, provider.clone())], poster, settings(2));

    let scheduler = SchedulerHandle::new(runner.clone(), Duration::from_millis(50));
    scheduler.start();

    tokio::time::sleep(Duration::from_millis(100)).await;
    // cycle is mid-send; request a stop
    scheduler.stop();

    // wait past the remaining sends and a few would-be intervals
    tokio::time::sleep(Duration::from_millis(600)).await;

    // the in-flight batch completed in full
    assert_eq!(ctx.poster.sent_count(), 2);
    // but no further cycle started after the stop
    assert_eq!(provider.call_count(), 1);
    assert!(!scheduler.is_running());
}

#[tokio::test]
async fn restart_mid_cycle_leaves_a_single_timer() {
    let server = image_server().await;
    let src = WallpaperSource::Pexels;
    let provider = Arc::new(MockProvider::new(
        src,
        MockBehavior::Return(vec![portrait(&server, src, "restart1")]),
    ));
    // the first send is slow enough for a stop and a restart to land while
    // the first cycle is still in flight
    let poster = Arc::new(MockPoster::slow(Duration::from_millis(200)));
    let (runner, _ctx) = build_runner(vec![(src, provider.clone())], poster, settings(1));

    let scheduler = SchedulerHandle::new(runner, Duration::from_millis(500));
    scheduler.start();

    tokio::time::sleep(Duration::from_millis(100)).await;
    scheduler.stop();
    assert!(scheduler.start(), "restart after stop must succeed");

    tokio::time::sleep(Duration::from_millis(2100)).await;
    scheduler.stop();
    tokio::time::sleep(Duration::from_millis(300)).await;

    // a single loop fires at most ~6 cycles in this window; a leaked loop
    // from before the restart would roughly double the cadence
    let calls = provider.call_count();
    assert!(calls >= 3, "restarted loop stopped ticking, saw {calls} cycles");
    assert!(calls <= 6, "expected one timer after restart, saw {calls} cycles");
}

#[tokio::test]
async fn failed_cycles_do_not_stop_the_loop() {
    let provider = Arc::new(MockProvider::new(
        WallpaperSource::Wallhaven,
        MockBehavior::FailPermanent,
    ));
    let (runner, ctx) = build_runner(
        vec![(WallpaperSource::Wallhaven, provider.clone())],
        Arc::new(MockPoster::new()),
        settings(1),
    );

    let scheduler = SchedulerHandle::new(runner, Duration::from_millis(100));
    scheduler.start();

    // long enough for at least two ticks
    tokio::time::sleep(Duration::from_millis(350)).await;
    scheduler.stop();

    assert!(provider.call_count() >= 2, "loop kept ticking after a failed cycle");
    let stats = ctx.stats.lock().await;
    assert!(stats.stats().failed_cycles >= 2);
    let notices = ctx.poster.notices.lock().expect("notices");
    assert!(notices[0].contains("failed"));
}
