//! Playback controller
//!
//! Owns the single playback session. `play` tears down whatever is
//! sounding, then runs fetch → decode → play → completion as one spawned
//! task. Every `play` and `stop` bumps the session generation; a task whose
//! captured generation no longer matches discards its work instead of
//! touching the sink or the display.

use crate::assets::AssetStore;
use crate::audio::{ClipDecoder, DecodedClip, OutputSink, Resampler, Voice};
use crate::catalog::{SoundCatalog, SoundId};
use crate::error::{Error, Result};
use crate::state::SharedState;
use parking_lot::Mutex;
use serde::Serialize;
use soundpad_common::events::SoundpadEvent;
use soundpad_common::time;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Slowest allowed playback speed
pub const MIN_SPEED: f32 = 0.25;

/// Fastest allowed playback speed
pub const MAX_SPEED: f32 = 4.0;

/// Clamp a requested speed; garbage means normal speed.
pub fn normalize_speed(speed: f32) -> f32 {
    if speed.is_finite() && speed > 0.0 {
        speed.clamp(MIN_SPEED, MAX_SPEED)
    } else {
        1.0
    }
}

/// How a session task ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// Played to the end without looping
    Completed,
    /// A later `play` or `stop` took over
    Superseded,
    /// The countdown had expired when a loop restart was due
    LoopSuppressed,
}

/// Loop settings read at the start of each playback
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoopOptions {
    pub enabled: bool,
    pub interval: Duration,
}

impl Default for LoopOptions {
    fn default() -> Self {
        Self {
            enabled: false,
            interval: Duration::ZERO,
        }
    }
}

#[derive(Debug, Default)]
struct Session {
    sound: Option<SoundId>,
    loop_target: Option<SoundId>,
}

/// Point-in-time view for GET /playback/state
#[derive(Debug, Clone, Serialize)]
pub struct PlaybackSnapshot {
    pub sound_id: Option<String>,
    pub sounding: bool,
    pub loop_target: Option<String>,
    pub now_playing: Option<String>,
    pub loop_enabled: bool,
    pub interval_seconds: f64,
    pub speed: f32,
    pub volume: f32,
}

pub struct PlaybackController {
    catalog: Arc<SoundCatalog>,
    assets: AssetStore,
    sink: Arc<OutputSink>,
    state: Arc<SharedState>,
    generation: AtomicU64,
    session: Mutex<Session>,
    options: Mutex<LoopOptions>,
    speed: Mutex<f32>,
    /// Deadline of the running countdown, if any
    countdown: watch::Receiver<Option<Instant>>,
}

impl PlaybackController {
    pub fn new(
        catalog: Arc<SoundCatalog>,
        assets: AssetStore,
        sink: Arc<OutputSink>,
        state: Arc<SharedState>,
        countdown: watch::Receiver<Option<Instant>>,
    ) -> Self {
        Self {
            catalog,
            assets,
            sink,
            state,
            generation: AtomicU64::new(0),
            session: Mutex::new(Session::default()),
            options: Mutex::new(LoopOptions::default()),
            speed: Mutex::new(1.0),
            countdown,
        }
    }

    /// Start playing `id`, replacing any current session.
    ///
    /// Teardown of the previous session happens before this returns; the
    /// fetch and decode continue on the returned task. Also returns the
    /// generation assigned to the new session.
    pub fn play(self: &Arc<Self>, id: SoundId) -> (u64, JoinHandle<Result<SessionOutcome>>) {
        let generation = {
            let mut session = self.session.lock();
            let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            session.sound = Some(id);
            session.loop_target = None;
            self.sink.clear();
            self.state.clear_now_playing();
            generation
        };

        info!(sound = %id, generation, "Play requested");

        let controller = Arc::clone(self);
        let handle = tokio::spawn(async move { controller.run_session(generation, id).await });
        (generation, handle)
    }

    /// Halt any session, clearing loop target and display. Idempotent.
    ///
    /// Returns true if something was playing or waiting to loop.
    pub fn stop(&self) -> bool {
        let mut session = self.session.lock();
        self.generation.fetch_add(1, Ordering::SeqCst);
        let had_session = session.sound.take().is_some();
        session.loop_target = None;
        let was_sounding = self.sink.clear();
        self.state.clear_now_playing();

        if had_session || was_sounding {
            info!("Playback stopped");
        }
        had_session || was_sounding
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    pub fn current_generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Sound of the current session (sounding, loading, or between loops)
    pub fn active_sound(&self) -> Option<SoundId> {
        self.session.lock().sound
    }

    pub fn loop_target(&self) -> Option<SoundId> {
        self.session.lock().loop_target
    }

    pub fn options(&self) -> LoopOptions {
        *self.options.lock()
    }

    /// Update loop settings; they apply from the next playback start.
    pub fn set_options(&self, enabled: bool, interval_seconds: f64) -> LoopOptions {
        let options = LoopOptions {
            enabled,
            interval: time::seconds_to_duration(interval_seconds),
        };
        *self.options.lock() = options;
        debug!(?options, "Loop options updated");
        options
    }

    pub fn speed(&self) -> f32 {
        *self.speed.lock()
    }

    /// Set playback speed for future starts; returns the normalized value.
    pub fn set_speed(&self, speed: f32) -> f32 {
        let speed = normalize_speed(speed);
        *self.speed.lock() = speed;
        self.state.broadcast_event(SoundpadEvent::SpeedChanged {
            speed,
            timestamp: time::now(),
        });
        speed
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        let (sound, loop_target) = {
            let session = self.session.lock();
            (session.sound, session.loop_target)
        };
        let options = self.options();
        PlaybackSnapshot {
            sound_id: sound.map(|id| id.to_string()),
            sounding: self.sink.active_session().is_some(),
            loop_target: loop_target.map(|id| id.to_string()),
            now_playing: self.state.now_playing().map(|np| np.text),
            loop_enabled: options.enabled,
            interval_seconds: options.interval.as_secs_f64(),
            speed: self.speed(),
            volume: self.sink.gain(),
        }
    }

    fn countdown_expired(&self) -> bool {
        matches!(*self.countdown.borrow(), Some(deadline) if Instant::now() >= deadline)
    }

    async fn run_session(self: Arc<Self>, generation: u64, id: SoundId) -> Result<SessionOutcome> {
        let clip = match self.load_clip(id).await {
            Ok(clip) => clip,
            Err(e) => {
                self.abandon(generation, id, &e);
                return Err(e);
            }
        };

        loop {
            let (ended, options) = self.start_voice(generation, id, &clip);

            if ended.await.is_err() {
                // Voice removed before it finished
                return Ok(SessionOutcome::Superseded);
            }

            if !options.enabled {
                let mut session = self.session.lock();
                if self.is_current(generation) {
                    session.sound = None;
                    self.state.clear_now_playing();
                }
                debug!(sound = %id, "Playback completed");
                return Ok(SessionOutcome::Completed);
            }

            if self.countdown_expired() {
                if self.is_current(generation) {
                    info!(sound = %id, "Countdown expired, not looping");
                    self.stop();
                }
                return Ok(SessionOutcome::LoopSuppressed);
            }

            tokio::time::sleep(options.interval).await;

            {
                let session = self.session.lock();
                if !self.is_current(generation) || session.loop_target != Some(id) {
                    return Ok(SessionOutcome::Superseded);
                }
            }
            debug!(sound = %id, generation, "Loop restart");
        }
    }

    /// Install a voice for `clip` if `generation` is still current.
    ///
    /// Returns the end signal and the loop options in force for this playback.
    fn start_voice(
        &self,
        generation: u64,
        id: SoundId,
        clip: &DecodedClip,
    ) -> (tokio::sync::oneshot::Receiver<()>, LoopOptions) {
        let mut session = self.session.lock();
        let options = self.options();
        let speed = self.speed();

        let (voice, ended) = Voice::new(generation, clip, speed as f64);
        if !self.is_current(generation) {
            debug!(sound = %id, generation, "Discarding stale decode");
            // Dropping `voice` closes `ended`
            return (ended, options);
        }

        self.sink.install(voice);
        session.loop_target = if options.enabled { Some(id) } else { None };
        self.state
            .set_now_playing(&id.to_string(), self.catalog.now_playing_text(id));

        debug!(
            sound = %id,
            generation,
            speed,
            loop_enabled = options.enabled,
            "Voice started"
        );
        (ended, options)
    }

    /// Fetch, decode, and resample `id` to the sink rate
    async fn load_clip(&self, id: SoundId) -> Result<DecodedClip> {
        let relative = id.relative_path(self.catalog.extension());
        let bytes = self.assets.fetch(&relative).await?;

        let extension = self.catalog.extension().to_string();
        let output_rate = self.sink.sample_rate();

        tokio::task::spawn_blocking(move || {
            let clip = ClipDecoder::decode(bytes, &extension)?;
            Resampler::resample_clip(clip, output_rate)
        })
        .await
        .map_err(|e| Error::Internal(format!("Decode task failed: {}", e)))?
    }

    fn abandon(&self, generation: u64, id: SoundId, error: &Error) {
        let mut session = self.session.lock();
        if !self.is_current(generation) {
            debug!(sound = %id, "Stale session failed: {}", error);
            return;
        }

        warn!(sound = %id, "Playback abandoned: {}", error);
        session.sound = None;
        session.loop_target = None;
        self.state.clear_now_playing();
        self.state.broadcast_event(SoundpadEvent::PlaybackFailed {
            sound_id: id.to_string(),
            reason: error.to_string(),
            timestamp: time::now(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{directory_store, running_sink, wait_for, wav_catalog, write_sounds};

    struct Fixture {
        controller: Arc<PlaybackController>,
        state: Arc<SharedState>,
        sink: Arc<OutputSink>,
        deadline_tx: watch::Sender<Option<Instant>>,
        _output: crate::audio::NullOutput,
        _dir: tempfile::TempDir,
    }

    fn fixture(clips: &[(char, u32)]) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        write_sounds(dir.path(), clips);

        let (sink, output) = running_sink();
        let state = Arc::new(SharedState::new());
        let (deadline_tx, deadline_rx) = watch::channel(None);
        let catalog = Arc::new(wav_catalog(&[('B', "lion")]));

        let controller = Arc::new(PlaybackController::new(
            catalog,
            directory_store(dir.path()),
            Arc::clone(&sink),
            Arc::clone(&state),
            deadline_rx,
        ));

        Fixture {
            controller,
            state,
            sink,
            deadline_tx,
            _output: output,
            _dir: dir,
        }
    }

    fn id(letter: &str) -> SoundId {
        SoundId::parse(letter).unwrap()
    }

    #[test]
    fn test_normalize_speed() {
        assert_eq!(normalize_speed(1.5), 1.5);
        assert_eq!(normalize_speed(10.0), MAX_SPEED);
        assert_eq!(normalize_speed(0.1), MIN_SPEED);
        assert_eq!(normalize_speed(0.0), 1.0);
        assert_eq!(normalize_speed(-2.0), 1.0);
        assert_eq!(normalize_speed(f32::NAN), 1.0);
    }

    #[tokio::test]
    async fn test_play_shows_name_and_file_then_clears_on_completion() {
        let f = fixture(&[('B', 150)]);

        let handle = f.controller.play(id("B")).1;
        assert!(
            wait_for(Duration::from_secs(2), || f.state.now_playing().is_some()).await,
            "now playing never shown"
        );
        let text = f.state.now_playing().unwrap().text;
        assert!(text.contains("lion"));
        assert!(text.contains("B.wav"));

        let outcome = handle.await.unwrap().unwrap();
        assert_eq!(outcome, SessionOutcome::Completed);
        assert!(f.state.now_playing().is_none());
        assert!(f.controller.active_sound().is_none());
    }

    #[tokio::test]
    async fn test_unnamed_sound_uses_letter() {
        let f = fixture(&[('C', 100)]);

        let handle = f.controller.play(id("C")).1;
        assert!(wait_for(Duration::from_secs(2), || f.state.now_playing().is_some()).await);
        assert!(f.state.now_playing().unwrap().text.contains("C (C.wav)"));
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_missing_asset_clears_display_and_reports_failure() {
        let f = fixture(&[]);
        let mut events = f.state.subscribe_events();

        let result = f.controller.play(id("Q")).1.await.unwrap();
        assert!(matches!(result, Err(Error::Fetch(_))));
        assert!(f.state.now_playing().is_none());
        assert!(f.controller.active_sound().is_none());

        let mut saw_failure = false;
        while let Ok(event) = events.try_recv() {
            if let SoundpadEvent::PlaybackFailed { sound_id, .. } = event {
                assert_eq!(sound_id, "Q");
                saw_failure = true;
            }
        }
        assert!(saw_failure);
    }

    #[tokio::test]
    async fn test_undecodable_asset_is_decode_error() {
        let f = fixture(&[]);
        std::fs::create_dir_all(f._dir.path().join("sounds")).unwrap();
        std::fs::write(f._dir.path().join("sounds/D.wav"), b"not a wav").unwrap();

        let result = f.controller.play(id("D")).1.await.unwrap();
        assert!(matches!(result, Err(Error::Decode(_))));
        assert!(f.state.now_playing().is_none());
    }

    #[tokio::test]
    async fn test_new_play_supersedes_old_session() {
        let f = fixture(&[('A', 2000), ('B', 2000)]);

        let first = f.controller.play(id("A")).1;
        assert!(wait_for(Duration::from_secs(2), || f.sink.active_session().is_some()).await);

        let second = f.controller.play(id("B")).1;
        assert_eq!(first.await.unwrap().unwrap(), SessionOutcome::Superseded);

        assert!(wait_for(Duration::from_secs(2), || f.state.now_playing().is_some()).await);
        assert_eq!(f.controller.active_sound(), Some(id("B")));
        assert_eq!(f.sink.active_session(), Some(f.controller.current_generation()));

        f.controller.stop();
        assert_eq!(second.await.unwrap().unwrap(), SessionOutcome::Superseded);
    }

    #[tokio::test]
    async fn test_rapid_replay_leaves_one_session() {
        let f = fixture(&[('A', 1000)]);

        let (generations, handles): (Vec<u64>, Vec<_>) =
            (0..5).map(|_| f.controller.play(id("A"))).unzip();
        assert!(generations.windows(2).all(|w| w[1] == w[0] + 1));
        let last_generation = *generations.last().unwrap();
        assert_eq!(f.controller.current_generation(), last_generation);

        assert!(wait_for(Duration::from_secs(2), || f.sink.active_session().is_some()).await);
        assert_eq!(f.sink.active_session(), Some(last_generation));

        f.controller.stop();
        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), SessionOutcome::Superseded);
        }
    }

    #[tokio::test]
    async fn test_stop_is_idempotent_and_clears_everything() {
        let f = fixture(&[('A', 2000)]);
        assert!(!f.controller.stop());

        f.controller.set_options(true, 1.0);
        let handle = f.controller.play(id("A")).1;
        assert!(wait_for(Duration::from_secs(2), || f.controller.loop_target().is_some()).await);

        assert!(f.controller.stop());
        assert!(f.controller.loop_target().is_none());
        assert!(f.state.now_playing().is_none());
        assert!(f.sink.active_session().is_none());
        assert!(!f.controller.stop());

        assert_eq!(handle.await.unwrap().unwrap(), SessionOutcome::Superseded);
    }

    #[tokio::test]
    async fn test_loop_restarts_after_interval() {
        let f = fixture(&[('B', 100)]);
        f.controller.set_options(true, 0.3);

        let handle = f.controller.play(id("B")).1;
        assert!(wait_for(Duration::from_secs(2), || f.sink.active_session().is_some()).await);

        // First playback ends, display stays up through the interval
        assert!(wait_for(Duration::from_secs(2), || f.sink.active_session().is_none()).await);
        let ended_at = Instant::now();
        assert!(f.state.now_playing().is_some());
        assert_eq!(f.controller.loop_target(), Some(id("B")));

        // Restart
        assert!(wait_for(Duration::from_secs(2), || f.sink.active_session().is_some()).await);
        let gap = ended_at.elapsed();
        assert!(gap >= Duration::from_millis(250), "restarted too early: {:?}", gap);
        assert!(gap < Duration::from_millis(900), "restarted too late: {:?}", gap);

        f.controller.stop();
        assert_eq!(handle.await.unwrap().unwrap(), SessionOutcome::Superseded);
    }

    #[tokio::test]
    async fn test_loop_cancelled_by_other_sound_during_interval() {
        let f = fixture(&[('A', 100), ('B', 2000)]);
        f.controller.set_options(true, 0.5);

        let looping = f.controller.play(id("A")).1;
        assert!(wait_for(Duration::from_secs(2), || f.sink.active_session().is_some()).await);
        assert!(wait_for(Duration::from_secs(2), || f.sink.active_session().is_none()).await);

        f.controller.set_options(false, 0.0);
        let other = f.controller.play(id("B")).1;
        assert_eq!(looping.await.unwrap().unwrap(), SessionOutcome::Superseded);
        assert!(wait_for(Duration::from_secs(2), || f.sink.active_session().is_some()).await);
        assert_eq!(f.controller.active_sound(), Some(id("B")));

        f.controller.stop();
        other.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_loop_suppressed_when_countdown_expired() {
        let f = fixture(&[('A', 100)]);
        f.controller.set_options(true, 0.0);
        // Deadline already behind us but not yet cleared
        f.deadline_tx.send_replace(Some(Instant::now()));

        let outcome = f.controller.play(id("A")).1.await.unwrap().unwrap();
        assert_eq!(outcome, SessionOutcome::LoopSuppressed);
        assert!(f.controller.active_sound().is_none());
        assert!(f.state.now_playing().is_none());
    }

    #[tokio::test]
    async fn test_speed_changes_duration() {
        let f = fixture(&[('A', 400)]);
        assert_eq!(f.controller.set_speed(2.0), 2.0);

        let started = Instant::now();
        f.controller.play(id("A")).1.await.unwrap().unwrap();
        let took = started.elapsed();
        assert!(took < Duration::from_millis(380), "double speed took {:?}", took);
    }

    #[tokio::test]
    async fn test_snapshot_reports_options() {
        let f = fixture(&[]);
        f.controller.set_options(true, 2.5);
        f.sink.set_gain(0.5);

        let snapshot = f.controller.snapshot();
        assert!(snapshot.loop_enabled);
        assert_eq!(snapshot.interval_seconds, 2.5);
        assert_eq!(snapshot.volume, 0.5);
        assert!(snapshot.sound_id.is_none());
    }
}
