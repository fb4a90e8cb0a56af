use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::yield_now;
use tokio::time::advance;

use easel::kernel::debounce::{ActivityDebouncer, QUIET_PERIOD_MS};
use easel::kernel::event::SessionEvent;

#[tokio::test(start_paused = true)]
async fn burst_of_edits_settles_once_after_last() {
    let (tx, mut rx) = mpsc::channel(10);
    let mut debouncer = ActivityDebouncer::new(tx);

    // Three edits, 1s apart. The window restarts each time.
    debouncer.notify_edit(false);
    yield_now().await;
    advance(Duration::from_millis(1000)).await;
    debouncer.notify_edit(false);
    yield_now().await;
    advance(Duration::from_millis(1000)).await;
    debouncer.notify_edit(false);
    yield_now().await;

    // 1999ms after the last edit: still quiet.
    advance(Duration::from_millis(QUIET_PERIOD_MS - 1)).await;
    yield_now().await;
    assert!(rx.try_recv().is_err(), "settle fired before the window elapsed");

    advance(Duration::from_millis(2)).await;
    yield_now().await;

    // VERIFY: exactly one settle, timed from the last edit.
    assert!(matches!(rx.try_recv(), Ok(SessionEvent::Settled)));
    assert!(rx.try_recv().is_err(), "only one settle per quiet window");
}

#[tokio::test(start_paused = true)]
async fn self_inflicted_edits_never_arm_the_window() {
    let (tx, mut rx) = mpsc::channel(10);
    let mut debouncer = ActivityDebouncer::new(tx);

    debouncer.notify_edit(true);
    assert!(!debouncer.is_armed());

    advance(Duration::from_millis(QUIET_PERIOD_MS * 2)).await;
    yield_now().await;
    assert!(rx.try_recv().is_err(), "self-inflicted edit produced a settle");
}

#[tokio::test(start_paused = true)]
async fn self_inflicted_edit_does_not_reset_a_live_window() {
    let (tx, mut rx) = mpsc::channel(10);
    let mut debouncer = ActivityDebouncer::new(tx);

    debouncer.notify_edit(false);
    yield_now().await;
    advance(Duration::from_millis(1500)).await;

    // Staging output mid-window must not push the settle out.
    debouncer.notify_edit(true);
    yield_now().await;

    advance(Duration::from_millis(501)).await;
    yield_now().await;
    assert!(matches!(rx.try_recv(), Ok(SessionEvent::Settled)));
}
