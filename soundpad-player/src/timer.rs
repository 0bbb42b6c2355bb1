//! Countdown timer
//!
//! Auto-stop for playback. A running countdown refreshes the display once a
//! second and, as a backstop against drifting ticks, arms a hard stop one
//! second past the deadline. Whichever fires first at or after the deadline
//! shows the finished line, clears the countdown and stops playback.
//!
//! At most one countdown runs; starting a new one cancels the old one. Each
//! countdown carries an epoch so work scheduled by a replaced countdown
//! recognizes itself as stale.

use crate::playback::PlaybackController;
use crate::state::{SharedState, TimerDisplay};
use parking_lot::Mutex;
use serde::Serialize;
use soundpad_common::human_time::{countdown_finished_status, countdown_status};
use soundpad_common::time;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep_until, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Display refresh period
const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Hard stop fires this long after the deadline
const FALLBACK_GRACE: Duration = Duration::from_secs(1);

struct Running {
    epoch: u64,
    deadline: Instant,
    tick: JoinHandle<()>,
    fallback: JoinHandle<()>,
}

impl Running {
    fn abort(&self) {
        self.tick.abort();
        self.fallback.abort();
    }
}

/// Countdown state for GET /timer
#[derive(Debug, Clone, Serialize)]
pub struct TimerSnapshot {
    pub active: bool,
    pub remaining_ms: Option<i64>,
    pub text: Option<String>,
}

pub struct CountdownTimer {
    state: Arc<SharedState>,
    controller: Arc<PlaybackController>,
    deadline_tx: watch::Sender<Option<Instant>>,
    epoch: AtomicU64,
    running: Mutex<Option<Running>>,
}

impl CountdownTimer {
    /// `deadline_tx` publishes the running deadline to the playback controller,
    /// which consults it before restarting a loop.
    pub fn new(
        state: Arc<SharedState>,
        controller: Arc<PlaybackController>,
        deadline_tx: watch::Sender<Option<Instant>>,
    ) -> Self {
        Self {
            state,
            controller,
            deadline_tx,
            epoch: AtomicU64::new(0),
            running: Mutex::new(None),
        }
    }

    /// Start a countdown of `minutes`, replacing any running one.
    ///
    /// Non-positive or non-finite input only cancels. Returns the deadline
    /// when a countdown was started.
    pub fn start(self: &Arc<Self>, minutes: f64) -> Option<Instant> {
        self.cancel();

        let duration = time::seconds_to_duration(minutes * 60.0);
        if duration.is_zero() {
            debug!(minutes, "Countdown not started");
            return None;
        }

        let now = Instant::now();
        let Some(deadline) = now.checked_add(duration) else {
            warn!(minutes, "Countdown too long, ignoring");
            return None;
        };

        let epoch = {
            let mut running = self.running.lock();
            let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;

            let timer = Arc::clone(self);
            let tick = tokio::spawn(async move {
                let mut ticker = interval_at(now + TICK_PERIOD, TICK_PERIOD);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                loop {
                    ticker.tick().await;
                    if !timer.refresh(epoch) {
                        break;
                    }
                }
            });

            let timer = Arc::clone(self);
            let fallback_at = deadline.checked_add(FALLBACK_GRACE).unwrap_or(deadline);
            let fallback = tokio::spawn(async move {
                sleep_until(fallback_at).await;
                if timer.expire(epoch) {
                    warn!("Countdown tick missed the deadline, hard stop applied");
                }
            });

            *running = Some(Running {
                epoch,
                deadline,
                tick,
                fallback,
            });
            epoch
        };

        self.deadline_tx.send_replace(Some(deadline));
        info!(minutes, "Countdown started");

        self.refresh(epoch);
        Some(deadline)
    }

    /// Stop any countdown and hide its display. Idempotent.
    ///
    /// Returns true if a countdown was running.
    pub fn cancel(&self) -> bool {
        let running = {
            let mut running = self.running.lock();
            self.epoch.fetch_add(1, Ordering::SeqCst);
            running.take()
        };
        self.deadline_tx.send_replace(None);
        self.state.clear_timer_display();

        match running {
            Some(running) => {
                running.abort();
                info!("Countdown cancelled");
                true
            }
            None => false,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.lock().is_some()
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        let deadline = self.running.lock().as_ref().map(|r| r.deadline);
        let display = self.state.timer_display();
        TimerSnapshot {
            active: deadline.is_some(),
            remaining_ms: deadline.map(remaining_ms),
            text: display.map(|d| d.text),
        }
    }

    /// Update the display for countdown `epoch`; expires it at zero.
    ///
    /// Returns false once the countdown is over or replaced.
    fn refresh(&self, epoch: u64) -> bool {
        let deadline = match self.running.lock().as_ref() {
            Some(running) if running.epoch == epoch => running.deadline,
            _ => return false,
        };

        let remaining = remaining_ms(deadline);
        if remaining <= 0 {
            self.expire(epoch);
            return false;
        }

        self.state.set_timer_display(TimerDisplay {
            active: true,
            remaining_ms: remaining,
            text: countdown_status(remaining),
        });
        true
    }

    /// Finish countdown `epoch` if it is still the running one.
    fn expire(&self, epoch: u64) -> bool {
        let running = {
            let mut running = self.running.lock();
            match running.as_ref() {
                Some(r) if r.epoch == epoch => running.take(),
                _ => None,
            }
        };
        let Some(running) = running else {
            return false;
        };

        self.deadline_tx.send_replace(None);
        self.state.set_timer_display(TimerDisplay {
            active: false,
            remaining_ms: 0,
            text: countdown_finished_status(),
        });
        info!("Countdown finished, stopping playback");
        self.controller.stop();

        running.abort();
        true
    }
}

fn remaining_ms(deadline: Instant) -> i64 {
    let now = Instant::now();
    if deadline > now {
        (deadline - now).as_millis() as i64
    } else {
        -((now - deadline).as_millis() as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::SoundId;
    use crate::test_support::{directory_store, running_sink, wait_for, wav_catalog, write_sounds};

    struct Fixture {
        timer: Arc<CountdownTimer>,
        controller: Arc<PlaybackController>,
        state: Arc<SharedState>,
        deadline_rx: watch::Receiver<Option<Instant>>,
        _output: crate::audio::NullOutput,
        _dir: tempfile::TempDir,
    }

    fn fixture(clips: &[(char, u32)]) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        write_sounds(dir.path(), clips);

        let (sink, output) = running_sink();
        let state = Arc::new(SharedState::new());
        let (deadline_tx, deadline_rx) = watch::channel(None);
        let controller = Arc::new(PlaybackController::new(
            Arc::new(wav_catalog(&[])),
            directory_store(dir.path()),
            sink,
            Arc::clone(&state),
            deadline_rx.clone(),
        ));
        let timer = Arc::new(CountdownTimer::new(
            Arc::clone(&state),
            Arc::clone(&controller),
            deadline_tx,
        ));

        Fixture {
            timer,
            controller,
            state,
            deadline_rx,
            _output: output,
            _dir: dir,
        }
    }

    #[test]
    fn test_remaining_ms_sign() {
        let now = Instant::now();
        assert!(remaining_ms(now + Duration::from_secs(5)) > 4_000);
        assert!(remaining_ms(now - Duration::from_secs(5)) <= -5_000);
    }

    #[tokio::test]
    async fn test_start_shows_remaining_immediately() {
        let f = fixture(&[]);

        assert!(f.timer.start(2.0).is_some());
        let display = f.state.timer_display().unwrap();
        assert!(display.active);
        // Whole seconds round down, so a sub-millisecond delay shows 01:59
        assert!(
            display.text == "Timer: 02:00" || display.text == "Timer: 01:59",
            "unexpected text {}",
            display.text
        );
        assert!(f.deadline_rx.borrow().is_some());

        f.timer.cancel();
    }

    #[tokio::test]
    async fn test_non_positive_minutes_only_cancel() {
        let f = fixture(&[]);
        f.timer.start(1.0);

        assert!(f.timer.start(0.0).is_none());
        assert!(!f.timer.is_running());
        assert!(f.state.timer_display().is_none());

        assert!(f.timer.start(-3.0).is_none());
        assert!(f.timer.start(f64::NAN).is_none());
        assert!(!f.timer.is_running());
    }

    #[tokio::test]
    async fn test_cancel_is_idempotent() {
        let f = fixture(&[]);
        assert!(!f.timer.cancel());

        f.timer.start(1.0);
        assert!(f.timer.cancel());
        assert!(f.state.timer_display().is_none());
        assert!(f.deadline_rx.borrow().is_none());
        assert!(!f.timer.cancel());
    }

    #[tokio::test]
    async fn test_tick_refreshes_display() {
        let f = fixture(&[]);
        f.timer.start(1.0);

        tokio::time::sleep(Duration::from_millis(1200)).await;
        let text = f.state.timer_display().unwrap().text;
        assert!(
            text == "Timer: 00:59" || text == "Timer: 00:58",
            "unexpected text {}",
            text
        );

        f.timer.cancel();
    }

    #[tokio::test]
    async fn test_expiry_shows_finished_text_and_goes_idle() {
        let f = fixture(&[]);
        // 300ms
        f.timer.start(0.005);

        assert!(
            wait_for(Duration::from_millis(1500), || !f.timer.is_running()).await,
            "countdown never expired"
        );
        let display = f.state.timer_display().unwrap();
        assert!(!display.active);
        assert_eq!(display.text, "Timer: 00:00 (finished)");
        assert!(f.deadline_rx.borrow().is_none());

        // Cancel hides the finished line
        f.timer.cancel();
        assert!(f.state.timer_display().is_none());
    }

    #[tokio::test]
    async fn test_expiry_stops_playback_within_grace() {
        let f = fixture(&[('A', 5000)]);
        let (_, handle) = f.controller.play(SoundId::parse("A").unwrap());
        assert!(wait_for(Duration::from_secs(2), || f.state.now_playing().is_some()).await);

        let started = Instant::now();
        // 600ms
        f.timer.start(0.01);

        assert!(wait_for(Duration::from_millis(1800), || f.controller.active_sound().is_none()).await);
        assert!(started.elapsed() <= Duration::from_millis(1600));
        assert!(f.state.now_playing().is_none());
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_hard_stop_fires_without_ticks() {
        let f = fixture(&[('A', 5000)]);
        let (_, handle) = f.controller.play(SoundId::parse("A").unwrap());
        assert!(wait_for(Duration::from_secs(2), || f.state.now_playing().is_some()).await);

        let started = Instant::now();
        // 300ms, then silence the refresh ticker so only the hard stop remains
        f.timer.start(0.005);
        f.timer.running.lock().as_ref().unwrap().tick.abort();

        // Past the deadline but inside the grace second: still playing
        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert!(f.timer.is_running());
        assert!(f.controller.active_sound().is_some());

        assert!(
            wait_for(Duration::from_millis(900), || f.controller.active_sound().is_none()).await,
            "hard stop never fired"
        );
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(1300), "stopped early: {:?}", elapsed);
        assert!(elapsed <= Duration::from_millis(1900), "stopped late: {:?}", elapsed);

        assert!(!f.timer.is_running());
        assert_eq!(
            f.state.timer_display().unwrap().text,
            "Timer: 00:00 (finished)"
        );
        assert!(f.state.now_playing().is_none());
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_restart_replaces_previous_countdown() {
        let f = fixture(&[]);
        // Would expire at 300ms if it survived
        f.timer.start(0.005);
        f.timer.start(1.0);

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(f.timer.is_running());
        assert!(f.state.timer_display().unwrap().active);

        f.timer.cancel();
    }

    #[tokio::test]
    async fn test_snapshot() {
        let f = fixture(&[]);
        assert!(!f.timer.snapshot().active);

        f.timer.start(1.0);
        let snapshot = f.timer.snapshot();
        assert!(snapshot.active);
        assert!(snapshot.remaining_ms.unwrap() > 59_000);
        assert!(snapshot.text.unwrap().starts_with("Timer: "));
        f.timer.cancel();
    }
}
