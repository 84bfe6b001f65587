// src/test.rs
//
// Recording fakes for every host collaborator, and a harness that mounts a
// session engine on top of them.
//
// Every fake shares its state through `Rc<RefCell<..>>`, so a test keeps a
// clone for inspection while the engine owns the boxed original.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

use crate::assets::{AssetId, ClipKind};
use crate::clip::AudioClipState;
use crate::engine::SessionEngine;
use crate::event::Event;
use crate::services::{
    AudioPlayback, Haptics, Navigator, PlaybackError, PlayerHandle, PreferenceError,
    PreferenceStore, ServiceError, Services, TimerId, TimerService,
};
use crate::state::{Command, CommandResult, EngineConfig, SessionConfig};

// ═══════════════════════════════════════════════════════════════════
// Audio
// ═══════════════════════════════════════════════════════════════════

/// One call made on a fake player.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerCall {
    Play,
    Pause,
    Seek(f64),
    SetVolume(f32),
    Release,
}

#[derive(Debug, Default)]
struct PlayerState {
    playing: bool,
    time: f64,
    volume: f32,
    fail_next_play: bool,
    calls: Vec<PlayerCall>,
}

/// Inspection side of a fake player.
#[derive(Clone, Default)]
pub struct FakePlayer {
    state: Rc<RefCell<PlayerState>>,
}

impl FakePlayer {
    pub fn is_playing(&self) -> bool {
        self.state.borrow().playing
    }

    pub fn volume(&self) -> f32 {
        self.state.borrow().volume
    }

    pub fn time(&self) -> f64 {
        self.state.borrow().time
    }

    /// Move the playhead, as if the clip had been playing for a while.
    pub fn set_time(&self, seconds: f64) {
        self.state.borrow_mut().time = seconds;
    }

    pub fn fail_next_play(&self) {
        self.state.borrow_mut().fail_next_play = true;
    }

    pub fn calls(&self) -> Vec<PlayerCall> {
        self.state.borrow().calls.clone()
    }

    /// Successful play calls only.
    pub fn play_count(&self) -> usize {
        self.count(&PlayerCall::Play)
    }

    pub fn release_count(&self) -> usize {
        self.count(&PlayerCall::Release)
    }

    fn count(&self, call: &PlayerCall) -> usize {
        self.state
            .borrow()
            .calls
            .iter()
            .filter(|c| *c == call)
            .count()
    }
}

impl PlayerHandle for FakePlayer {
    fn play(&mut self) -> Result<(), PlaybackError> {
        let mut state = self.state.borrow_mut();
        if state.fail_next_play {
            state.fail_next_play = false;
            return Err(PlaybackError::Failed("scripted failure".into()));
        }
        state.playing = true;
        state.calls.push(PlayerCall::Play);
        Ok(())
    }

    fn pause(&mut self) -> Result<(), PlaybackError> {
        let mut state = self.state.borrow_mut();
        state.playing = false;
        state.calls.push(PlayerCall::Pause);
        Ok(())
    }

    fn seek_to(&mut self, seconds: f64) -> Result<(), PlaybackError> {
        let mut state = self.state.borrow_mut();
        state.time = seconds;
        state.calls.push(PlayerCall::Seek(seconds));
        Ok(())
    }

    fn set_volume(&mut self, volume: f32) {
        let mut state = self.state.borrow_mut();
        state.volume = volume;
        state.calls.push(PlayerCall::SetVolume(volume));
    }

    fn current_time(&self) -> f64 {
        self.state.borrow().time
    }

    fn release(&mut self) {
        let mut state = self.state.borrow_mut();
        state.playing = false;
        state.calls.push(PlayerCall::Release);
    }
}

/// Audio backend handing out one fake player per clip kind.
#[derive(Clone, Default)]
pub struct FakeAudio {
    players: Rc<RefCell<HashMap<ClipKind, FakePlayer>>>,
    loaded: Rc<RefCell<Vec<AssetId>>>,
}

impl FakeAudio {
    pub fn new() -> Self {
        Self::default()
    }

    /// Player for `kind`. Created on first use, so tests may script it
    /// before the engine loads it.
    pub fn player(&self, kind: ClipKind) -> FakePlayer {
        self.players.borrow_mut().entry(kind).or_default().clone()
    }

    pub fn loaded_assets(&self) -> Vec<AssetId> {
        self.loaded.borrow().clone()
    }
}

impl AudioPlayback for FakeAudio {
    fn load(&mut self, clip: ClipKind, asset: AssetId) -> Box<dyn PlayerHandle> {
        self.loaded.borrow_mut().push(asset);
        Box::new(self.player(clip))
    }
}

// ═══════════════════════════════════════════════════════════════════
// Timers
// ═══════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy)]
struct Scheduled {
    token: u64,
    delay: Duration,
}

#[derive(Debug, Default)]
struct TimerState {
    pending: HashMap<TimerId, Scheduled>,
    last_delay: HashMap<TimerId, Duration>,
    schedules: HashMap<TimerId, usize>,
}

/// Timer service that never fires on its own. Tests fire timers by hand.
#[derive(Clone, Default)]
pub struct FakeTimers {
    state: Rc<RefCell<TimerState>>,
}

impl FakeTimers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Token of the scheduled timer, if any.
    pub fn pending(&self, timer: TimerId) -> Option<u64> {
        self.state.borrow().pending.get(&timer).map(|s| s.token)
    }

    /// Remove a one-shot timer that is about to fire.
    pub fn take(&self, timer: TimerId) -> Option<u64> {
        self.state
            .borrow_mut()
            .pending
            .remove(&timer)
            .map(|s| s.token)
    }

    pub fn last_delay(&self, timer: TimerId) -> Option<Duration> {
        self.state.borrow().last_delay.get(&timer).copied()
    }

    pub fn schedule_count(&self, timer: TimerId) -> usize {
        self.state
            .borrow()
            .schedules
            .get(&timer)
            .copied()
            .unwrap_or(0)
    }
}

impl TimerService for FakeTimers {
    fn schedule(&mut self, timer: TimerId, token: u64, delay: Duration, _repeat: bool) {
        let mut state = self.state.borrow_mut();
        state.pending.insert(timer, Scheduled { token, delay });
        state.last_delay.insert(timer, delay);
        *state.schedules.entry(timer).or_insert(0) += 1;
    }

    fn cancel(&mut self, timer: TimerId) {
        self.state.borrow_mut().pending.remove(&timer);
    }
}

// ═══════════════════════════════════════════════════════════════════
// Haptics, navigation, preferences
// ═══════════════════════════════════════════════════════════════════

#[derive(Clone, Default)]
pub struct FakeHaptics {
    count: Rc<RefCell<usize>>,
    fail: Rc<RefCell<bool>>,
}

impl FakeHaptics {
    pub fn count(&self) -> usize {
        *self.count.borrow()
    }

    /// Make every impact fail from now on.
    pub fn fail(&self) {
        *self.fail.borrow_mut() = true;
    }
}

impl Haptics for FakeHaptics {
    fn impact_light(&mut self) -> Result<(), ServiceError> {
        if *self.fail.borrow() {
            return Err(ServiceError::Unavailable);
        }
        *self.count.borrow_mut() += 1;
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct FakeNavigator {
    count: Rc<RefCell<usize>>,
}

impl FakeNavigator {
    pub fn count(&self) -> usize {
        *self.count.borrow()
    }
}

impl Navigator for FakeNavigator {
    fn navigate_home(&mut self) {
        *self.count.borrow_mut() += 1;
    }
}

/// In-memory preference store that can be switched to fail.
#[derive(Debug, Default)]
pub struct FakePrefs {
    values: HashMap<String, String>,
    broken: bool,
}

impl FakePrefs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(key: &str, value: &str) -> Self {
        let mut prefs = Self::new();
        prefs.values.insert(key.to_string(), value.to_string());
        prefs
    }

    pub fn broken() -> Self {
        Self {
            broken: true,
            ..Self::default()
        }
    }

    pub fn value(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }
}

impl PreferenceStore for FakePrefs {
    fn get(&self, key: &str) -> Result<Option<String>, PreferenceError> {
        if self.broken {
            return Err(PreferenceError::Unavailable);
        }
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), PreferenceError> {
        if self.broken {
            return Err(PreferenceError::Write {
                key: key.to_string(),
                message: "read-only".into(),
            });
        }
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════
// Harness
// ═══════════════════════════════════════════════════════════════════

/// Fakes wired into a freshly mounted engine.
pub struct Rig {
    pub audio: FakeAudio,
    pub timers: FakeTimers,
    pub haptics: FakeHaptics,
    pub navigator: FakeNavigator,
}

impl Rig {
    pub fn mount(config: SessionConfig, settings: EngineConfig) -> (SessionEngine, Rig) {
        let rig = Rig {
            audio: FakeAudio::new(),
            timers: FakeTimers::new(),
            haptics: FakeHaptics::default(),
            navigator: FakeNavigator::default(),
        };
        let services = Services::new(
            Box::new(rig.timers.clone()),
            Box::new(rig.haptics.clone()),
            Box::new(rig.navigator.clone()),
        );
        let mut audio = rig.audio.clone();
        let engine = SessionEngine::mount(config, settings, &mut audio, services);
        (engine, rig)
    }
}

/// A mounted engine driven directly, plus its fakes.
pub struct Harness {
    pub engine: SessionEngine,
    pub audio: FakeAudio,
    pub timers: FakeTimers,
    pub haptics: FakeHaptics,
    pub navigator: FakeNavigator,
}

impl Harness {
    pub fn new(config: SessionConfig, settings: EngineConfig) -> Self {
        let (engine, rig) = Rig::mount(config, settings);
        Self {
            engine,
            audio: rig.audio,
            timers: rig.timers,
            haptics: rig.haptics,
            navigator: rig.navigator,
        }
    }

    pub fn send(&mut self, command: Command) -> CommandResult {
        self.engine.handle(Event::Command(command))
    }

    /// Host reports a clip as loaded.
    pub fn load(&mut self, clip: ClipKind, duration_sec: Option<f64>) {
        self.engine.handle(Event::ClipLoaded { clip, duration_sec });
    }

    /// Fire the clock ticker if it is armed. Returns whether it was.
    pub fn tick(&mut self) -> bool {
        match self.timers.pending(TimerId::Clock) {
            Some(token) => {
                self.engine.handle(Event::TimerFired {
                    timer: TimerId::Clock,
                    token,
                });
                true
            }
            None => false,
        }
    }

    pub fn ticks(&mut self, count: u32) {
        for _ in 0..count {
            self.tick();
        }
    }

    /// Run a clip's fade ramp to completion.
    pub fn finish_fade(&mut self, clip: ClipKind) {
        let timer = TimerId::Fade(clip);
        while let Some(token) = self.timers.take(timer) {
            self.engine.handle(Event::TimerFired { timer, token });
        }
    }

    pub fn clip(&self, kind: ClipKind) -> AudioClipState {
        self.engine.clip_state(kind)
    }
}
