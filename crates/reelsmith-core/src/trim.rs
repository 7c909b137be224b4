//! Audio trim controller.
//!
//! Owns at most one audio visualization session, bound to the currently
//! selected audio path, and turns the user-adjustable region of that session
//! into `[start, end]` trim bounds for the generation request.
//!
//! The session itself (waveform rendering, playback) lives behind the
//! [`AudioSessionFactory`] and [`AudioSession`] seams. Sessions report back
//! asynchronously (ready, region moved, playback changed); every callback
//! carries the [`SessionId`] it was opened with so events from a torn-down
//! session can be recognised and dropped.

use std::fmt;

use serde::Serialize;

use crate::error::{Error, Result};

/// Identifier handed to a session when it is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Handle to a live visualization/playback session.
pub trait AudioSession: Send {
    /// Install the single adjustable region spanning `[start, end]`.
    fn install_region(&mut self, start: f64, end: f64) -> Result<()>;

    fn play(&mut self) -> Result<()>;

    fn pause(&mut self) -> Result<()>;

    fn is_playing(&self) -> bool;

    /// Play only `[start, end]`.
    fn play_range(&mut self, start: f64, end: f64) -> Result<()>;

    /// Release every resource held by the session. Called exactly once.
    fn destroy(&mut self);
}

/// Creates sessions for audio paths.
pub trait AudioSessionFactory: Send {
    fn open(&mut self, id: SessionId, path: &str) -> Result<Box<dyn AudioSession>>;
}

/// Trim bounds for one audio path. `start <= end` always holds.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AudioTrim {
    pub path: String,
    pub start: f64,
    pub end: f64,
}

struct ActiveSession {
    id: SessionId,
    handle: Box<dyn AudioSession>,
    ready: bool,
}

pub struct AudioTrimController {
    factory: Box<dyn AudioSessionFactory>,
    session: Option<ActiveSession>,
    next_id: u64,
    trim: AudioTrim,
    duration: f64,
    playing: bool,
}

impl AudioTrimController {
    pub fn new(factory: Box<dyn AudioSessionFactory>) -> Self {
        Self {
            factory,
            session: None,
            next_id: 1,
            trim: AudioTrim::default(),
            duration: 0.0,
            playing: false,
        }
    }

    pub fn trim(&self) -> &AudioTrim {
        &self.trim
    }

    /// Full track duration reported by the current session, 0 until ready.
    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn session_id(&self) -> Option<SessionId> {
        self.session.as_ref().map(|s| s.id)
    }

    pub fn is_ready(&self) -> bool {
        self.session.as_ref().map_or(false, |s| s.ready)
    }

    /// Bind the controller to `path`.
    ///
    /// Re-binding the path of the live session is a no-op. Otherwise the
    /// previous session is destroyed, the trim resets to `[0, 0]` and a new
    /// session is opened (none for an empty path). Returns the id of the
    /// session now bound, if any.
    pub fn set_path(&mut self, path: &str) -> Result<Option<SessionId>> {
        if let Some(active) = &self.session {
            if self.trim.path == path {
                return Ok(Some(active.id));
            }
        }

        self.teardown();
        self.trim = AudioTrim {
            path: path.to_string(),
            start: 0.0,
            end: 0.0,
        };
        self.duration = 0.0;

        if path.trim().is_empty() {
            return Ok(None);
        }

        let id = SessionId(self.next_id);
        self.next_id += 1;
        let handle = self.factory.open(id, path).map_err(|e| match e {
            Error::AudioSession(_) => e,
            other => Error::AudioSession(other.to_string()),
        })?;
        tracing::debug!(session_id = %id, path, "Opened audio session");
        self.session = Some(ActiveSession {
            id,
            handle,
            ready: false,
        });
        Ok(Some(id))
    }

    fn current_mut(&mut self, id: SessionId) -> Option<&mut ActiveSession> {
        self.session.as_mut().filter(|s| s.id == id)
    }

    /// The session finished loading and knows the track duration.
    ///
    /// Resets the trim to the full track and installs the region once.
    /// Returns `false` when `id` is not the live session.
    pub fn on_ready(&mut self, id: SessionId, duration: f64) -> Result<bool> {
        let duration = if duration.is_finite() {
            duration.max(0.0)
        } else {
            0.0
        };
        let Some(active) = self.current_mut(id) else {
            tracing::debug!(session_id = %id, "Ignoring ready event from stale audio session");
            return Ok(false);
        };
        if !active.ready {
            active.handle.install_region(0.0, duration)?;
            active.ready = true;
        }
        self.duration = duration;
        self.trim.start = 0.0;
        self.trim.end = duration;
        tracing::debug!(session_id = %id, duration, "Audio session ready");
        Ok(true)
    }

    /// The user moved or resized the region.
    ///
    /// Inverted bounds are swapped, then both are clamped into
    /// `[0, duration]`. Returns the new trim, or `None` when the event was
    /// ignored (stale session, not ready yet, non-finite bounds).
    pub fn on_region_updated(&mut self, id: SessionId, start: f64, end: f64) -> Option<&AudioTrim> {
        if !start.is_finite() || !end.is_finite() {
            return None;
        }
        let duration = self.duration;
        let active = self.current_mut(id)?;
        if !active.ready {
            return None;
        }
        let (lo, hi) = if start > end { (end, start) } else { (start, end) };
        self.trim.start = lo.clamp(0.0, duration);
        self.trim.end = hi.clamp(0.0, duration);
        Some(&self.trim)
    }

    /// Playback state changed on the session side.
    pub fn on_playback_changed(&mut self, id: SessionId, playing: bool) {
        if self.current_mut(id).is_some() {
            self.playing = playing;
        }
    }

    pub fn play(&mut self) -> Result<bool> {
        if self.playing {
            return Ok(true);
        }
        if let Some(active) = self.session.as_mut() {
            active.handle.play()?;
            self.playing = true;
        }
        Ok(self.playing)
    }

    pub fn pause(&mut self) -> Result<bool> {
        if !self.playing {
            return Ok(false);
        }
        if let Some(active) = self.session.as_mut() {
            active.handle.pause()?;
        }
        self.playing = false;
        Ok(false)
    }

    /// Returns the playing state after the toggle.
    pub fn toggle_play_pause(&mut self) -> Result<bool> {
        if self.playing {
            self.pause()
        } else {
            self.play()
        }
    }

    /// Play just the trimmed region. The bounds are left as they are.
    pub fn play_region(&mut self) -> Result<bool> {
        let (start, end) = (self.trim.start, self.trim.end);
        match self.session.as_mut() {
            Some(active) if active.ready => {
                active.handle.play_range(start, end)?;
                self.playing = true;
            }
            _ => {}
        }
        Ok(self.playing)
    }

    /// Destroy the live session, if any.
    pub fn teardown(&mut self) {
        if let Some(mut active) = self.session.take() {
            active.handle.destroy();
            tracing::debug!(session_id = %active.id, "Destroyed audio session");
        }
        self.playing = false;
    }
}

impl Drop for AudioTrimController {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl fmt::Debug for AudioTrimController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioTrimController")
            .field("session_id", &self.session_id())
            .field("trim", &self.trim)
            .field("duration", &self.duration)
            .field("playing", &self.playing)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Ledger {
        opened: Vec<(SessionId, String)>,
        live: usize,
        regions: Vec<(SessionId, f64, f64)>,
        ranges: Vec<(f64, f64)>,
        destroyed: Vec<SessionId>,
    }

    struct FakeSession {
        id: SessionId,
        playing: bool,
        ledger: Arc<Mutex<Ledger>>,
    }

    impl AudioSession for FakeSession {
        fn install_region(&mut self, start: f64, end: f64) -> Result<()> {
            self.ledger.lock().unwrap().regions.push((self.id, start, end));
            Ok(())
        }

        fn play(&mut self) -> Result<()> {
            self.playing = true;
            Ok(())
        }

        fn pause(&mut self) -> Result<()> {
            self.playing = false;
            Ok(())
        }

        fn is_playing(&self) -> bool {
            self.playing
        }

        fn play_range(&mut self, start: f64, end: f64) -> Result<()> {
            self.playing = true;
            self.ledger.lock().unwrap().ranges.push((start, end));
            Ok(())
        }

        fn destroy(&mut self) {
            let mut ledger = self.ledger.lock().unwrap();
            ledger.live -= 1;
            ledger.destroyed.push(self.id);
        }
    }

    struct FakeFactory {
        ledger: Arc<Mutex<Ledger>>,
        fail: bool,
    }

    impl AudioSessionFactory for FakeFactory {
        fn open(&mut self, id: SessionId, path: &str) -> Result<Box<dyn AudioSession>> {
            if self.fail {
                return Err(Error::AudioSession(format!("cannot decode {}", path)));
            }
            let mut ledger = self.ledger.lock().unwrap();
            ledger.opened.push((id, path.to_string()));
            ledger.live += 1;
            Ok(Box::new(FakeSession {
                id,
                playing: false,
                ledger: self.ledger.clone(),
            }))
        }
    }

    fn controller() -> (AudioTrimController, Arc<Mutex<Ledger>>) {
        let ledger = Arc::new(Mutex::new(Ledger::default()));
        let factory = FakeFactory {
            ledger: ledger.clone(),
            fail: false,
        };
        (AudioTrimController::new(Box::new(factory)), ledger)
    }

    #[test]
    fn test_ready_sets_full_duration_and_one_region() {
        let (mut ctl, ledger) = controller();
        let id = ctl.set_path("/music/song.mp3").unwrap().unwrap();
        assert_eq!(ctl.trim().end, 0.0);

        assert!(ctl.on_ready(id, 120.0).unwrap());
        assert_eq!(ctl.trim().start, 0.0);
        assert_eq!(ctl.trim().end, 120.0);

        // A repeated ready event must not add a second region.
        ctl.on_ready(id, 120.0).unwrap();
        assert_eq!(ledger.lock().unwrap().regions, vec![(id, 0.0, 120.0)]);
    }

    #[test]
    fn test_region_drag_sets_exact_bounds() {
        let (mut ctl, _) = controller();
        let id = ctl.set_path("/music/song.mp3").unwrap().unwrap();
        ctl.on_ready(id, 120.0).unwrap();

        let trim = ctl.on_region_updated(id, 10.0, 100.0).unwrap();
        assert_eq!((trim.start, trim.end), (10.0, 100.0));
    }

    #[test]
    fn test_inverted_region_is_swapped_and_clamped() {
        let (mut ctl, _) = controller();
        let id = ctl.set_path("/music/song.mp3").unwrap().unwrap();
        ctl.on_ready(id, 60.0).unwrap();

        let trim = ctl.on_region_updated(id, 50.0, 20.0).unwrap();
        assert_eq!((trim.start, trim.end), (20.0, 50.0));

        let trim = ctl.on_region_updated(id, 90.0, -5.0).unwrap();
        assert_eq!((trim.start, trim.end), (0.0, 60.0));
        assert!(trim.start <= trim.end);
    }

    #[test]
    fn test_region_update_before_ready_or_nan_is_ignored() {
        let (mut ctl, _) = controller();
        let id = ctl.set_path("/music/song.mp3").unwrap().unwrap();
        assert!(ctl.on_region_updated(id, 1.0, 2.0).is_none());

        ctl.on_ready(id, 30.0).unwrap();
        assert!(ctl.on_region_updated(id, f64::NAN, 2.0).is_none());
        assert_eq!(ctl.trim().end, 30.0);
    }

    #[test]
    fn test_path_change_destroys_previous_session() {
        let (mut ctl, ledger) = controller();
        let first = ctl.set_path("/music/a.mp3").unwrap().unwrap();
        ctl.on_ready(first, 90.0).unwrap();
        ctl.on_region_updated(first, 5.0, 50.0);

        let second = ctl.set_path("/music/b.mp3").unwrap().unwrap();
        assert_ne!(first, second);
        assert_eq!(ctl.trim().path, "/music/b.mp3");
        assert_eq!((ctl.trim().start, ctl.trim().end), (0.0, 0.0));

        let ledger = ledger.lock().unwrap();
        assert_eq!(ledger.live, 1);
        assert_eq!(ledger.destroyed, vec![first]);
    }

    #[test]
    fn test_same_path_is_idempotent() {
        let (mut ctl, ledger) = controller();
        let id = ctl.set_path("/music/a.mp3").unwrap();
        assert_eq!(ctl.set_path("/music/a.mp3").unwrap(), id);
        assert_eq!(ledger.lock().unwrap().opened.len(), 1);
    }

    #[test]
    fn test_empty_path_has_no_session() {
        let (mut ctl, ledger) = controller();
        ctl.set_path("/music/a.mp3").unwrap();
        assert_eq!(ctl.set_path("").unwrap(), None);
        assert_eq!(ctl.session_id(), None);
        assert_eq!(ledger.lock().unwrap().live, 0);
    }

    #[test]
    fn test_stale_events_are_ignored() {
        let (mut ctl, ledger) = controller();
        let stale = ctl.set_path("/music/a.mp3").unwrap().unwrap();
        let live = ctl.set_path("/music/b.mp3").unwrap().unwrap();

        assert!(!ctl.on_ready(stale, 300.0).unwrap());
        assert_eq!(ctl.duration(), 0.0);
        assert!(ledger.lock().unwrap().regions.is_empty());

        ctl.on_ready(live, 45.0).unwrap();
        assert!(ctl.on_region_updated(stale, 1.0, 2.0).is_none());
        ctl.on_playback_changed(stale, true);
        assert!(!ctl.is_playing());
        assert_eq!(ctl.trim().end, 45.0);
    }

    #[test]
    fn test_sessions_never_leak() {
        let (mut ctl, ledger) = controller();
        for path in ["/a.mp3", "/b.mp3", "/b.mp3", "", "/c.mp3", "/a.mp3"] {
            ctl.set_path(path).unwrap();
            assert!(ledger.lock().unwrap().live <= 1);
        }
        drop(ctl);
        let ledger = ledger.lock().unwrap();
        assert_eq!(ledger.live, 0);
        assert_eq!(ledger.destroyed.len(), ledger.opened.len());
    }

    #[test]
    fn test_play_pause_toggle() {
        let (mut ctl, _) = controller();
        assert!(!ctl.play().unwrap());

        let id = ctl.set_path("/a.mp3").unwrap().unwrap();
        ctl.on_ready(id, 10.0).unwrap();
        assert!(ctl.toggle_play_pause().unwrap());
        assert!(ctl.play().unwrap());
        assert!(!ctl.toggle_play_pause().unwrap());
        assert!(!ctl.pause().unwrap());

        ctl.on_playback_changed(id, true);
        assert!(ctl.is_playing());
        ctl.set_path("/b.mp3").unwrap();
        assert!(!ctl.is_playing());
    }

    #[test]
    fn test_play_region_keeps_bounds() {
        let (mut ctl, ledger) = controller();
        let id = ctl.set_path("/a.mp3").unwrap().unwrap();
        ctl.on_ready(id, 120.0).unwrap();
        ctl.on_region_updated(id, 10.0, 100.0);

        assert!(ctl.play_region().unwrap());
        assert_eq!(ledger.lock().unwrap().ranges, vec![(10.0, 100.0)]);
        assert_eq!((ctl.trim().start, ctl.trim().end), (10.0, 100.0));
    }

    #[test]
    fn test_factory_failure_leaves_no_session() {
        let ledger = Arc::new(Mutex::new(Ledger::default()));
        let mut ctl = AudioTrimController::new(Box::new(FakeFactory {
            ledger,
            fail: true,
        }));
        let err = ctl.set_path("/broken.mp3").unwrap_err();
        assert!(matches!(err, Error::AudioSession(_)));
        assert_eq!(ctl.session_id(), None);
        assert_eq!(ctl.trim().path, "/broken.mp3");
    }
}
