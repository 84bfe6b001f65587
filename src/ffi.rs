// C-compatible FFI bindings for Swift/iOS integration.
//
// Safety requirements:
// - All pointers must be non-null unless documented otherwise
// - All handles must be created by this module and not fabricated
// - String parameters must be valid UTF-8 (Swift strings are always valid)
// - Caller must call `meditate_session_destroy` for each `_create`
// - Every call for one session must come from the same thread
// - Host callbacks must not call back into `meditate_*` for the session that
//   invoked them. The engine is mid-update while a callback runs; report
//   timer fires and clip loads after the callback has returned
//
// The host supplies its platform services as a table of C callbacks. Timer
// fires and clip load reports come back in through the `meditate_*` entry
// points below, each of which processes the event to completion before
// returning.

use std::ffi::{CStr, c_char, c_void};
use std::time::Duration;

use log::{debug, warn};
#[cfg(feature = "ios")]
use log::LevelFilter;
#[cfg(feature = "ios")]
use oslog::OsLogger;

use crate::assets::{AssetId, ClipKind};
use crate::bridge::{EngineHandle, SessionHandle, create_bridge};
use crate::engine::SessionEngine;
use crate::event::Event;
use crate::prefs::launch_minutes;
use crate::services::{
    AudioPlayback, Haptics, Navigator, PlaybackError, PlayerHandle, ServiceError, Services,
    TimerId, TimerService,
};
use crate::state::{
    Command, CommandResult, EngineConfig, FadeSettings, ParamValue, RawParams, SessionReadback,
    resolve,
};
use crate::timeline::Phase;

// Logger subsystem identifier
#[cfg(feature = "ios")]
const LOG_SUBSYSTEM: &str = "com.meditate.engine";

// ═══════════════════════════════════════════════════════════════════════════
// Logger Initialization
// ═══════════════════════════════════════════════════════════════════════════

/// Initialize the oslog logger.
///
/// Call once at application startup, before creating a session. Logs show up
/// in Console.app and Xcode's debug console.
#[cfg(feature = "ios")]
#[unsafe(no_mangle)]
pub extern "C" fn meditate_init_logger() {
    OsLogger::new(LOG_SUBSYSTEM)
        .level_filter(LevelFilter::Debug)
        .init()
        .ok();
}

// ═══════════════════════════════════════════════════════════════════════════
// Host Callback Table
// ═══════════════════════════════════════════════════════════════════════════

/// Platform services implemented by the host.
///
/// `ctx` is passed back untouched on every call. Clips are addressed by kind
/// code (0 intro, 1 outro); timers by timer code (0 clock, 1 intro fade,
/// 2 outro fade).
#[repr(C)]
#[derive(Clone, Copy)]
pub struct MeditateHost {
    pub ctx: *mut c_void,

    /// Start loading a bundled file. Completion is reported through
    /// `meditate_clip_loaded`.
    pub load_clip: extern "C" fn(ctx: *mut c_void, clip: u8, file_name: *const c_char),
    /// Returns false if playback could not start.
    pub play: extern "C" fn(ctx: *mut c_void, clip: u8) -> bool,
    pub pause: extern "C" fn(ctx: *mut c_void, clip: u8),
    pub seek: extern "C" fn(ctx: *mut c_void, clip: u8, seconds: f64),
    pub set_volume: extern "C" fn(ctx: *mut c_void, clip: u8, volume: f32),
    pub current_time: extern "C" fn(ctx: *mut c_void, clip: u8) -> f64,
    pub release_clip: extern "C" fn(ctx: *mut c_void, clip: u8),

    /// Fire `meditate_timer_fired(timer, token)` after `delay_ms`, and every
    /// `delay_ms` after that if `repeat`. Replaces any pending `timer`.
    pub schedule_timer:
        extern "C" fn(ctx: *mut c_void, timer: u8, token: u64, delay_ms: u32, repeat: bool),
    pub cancel_timer: extern "C" fn(ctx: *mut c_void, timer: u8),

    /// Returns false if the haptic engine is unavailable.
    pub haptic_light: extern "C" fn(ctx: *mut c_void) -> bool,
    pub navigate_home: extern "C" fn(ctx: *mut c_void),
}

fn asset_c_name(asset: AssetId) -> &'static CStr {
    match asset {
        AssetId::GroundedIntro => c"grounded_intro.mp3",
        AssetId::GroundedOutro => c"grounded_outro.mp3",
    }
}

struct HostPlayer {
    host: MeditateHost,
    clip: u8,
}

impl PlayerHandle for HostPlayer {
    fn play(&mut self) -> Result<(), PlaybackError> {
        if (self.host.play)(self.host.ctx, self.clip) {
            Ok(())
        } else {
            Err(PlaybackError::Failed("host refused to play".into()))
        }
    }

    fn pause(&mut self) -> Result<(), PlaybackError> {
        (self.host.pause)(self.host.ctx, self.clip);
        Ok(())
    }

    fn seek_to(&mut self, seconds: f64) -> Result<(), PlaybackError> {
        (self.host.seek)(self.host.ctx, self.clip, seconds);
        Ok(())
    }

    fn set_volume(&mut self, volume: f32) {
        (self.host.set_volume)(self.host.ctx, self.clip, volume);
    }

    fn current_time(&self) -> f64 {
        (self.host.current_time)(self.host.ctx, self.clip)
    }

    fn release(&mut self) {
        (self.host.release_clip)(self.host.ctx, self.clip);
    }
}

struct HostServices {
    host: MeditateHost,
}

impl AudioPlayback for HostServices {
    fn load(&mut self, clip: ClipKind, asset: AssetId) -> Box<dyn PlayerHandle> {
        let code = clip.code();
        (self.host.load_clip)(self.host.ctx, code, asset_c_name(asset).as_ptr());
        Box::new(HostPlayer {
            host: self.host,
            clip: code,
        })
    }
}

impl TimerService for HostServices {
    fn schedule(&mut self, timer: TimerId, token: u64, delay: Duration, repeat: bool) {
        let delay_ms = u32::try_from(delay.as_millis()).unwrap_or(u32::MAX);
        (self.host.schedule_timer)(self.host.ctx, timer.code(), token, delay_ms, repeat);
    }

    fn cancel(&mut self, timer: TimerId) {
        (self.host.cancel_timer)(self.host.ctx, timer.code());
    }
}

impl Haptics for HostServices {
    fn impact_light(&mut self) -> Result<(), ServiceError> {
        if (self.host.haptic_light)(self.host.ctx) {
            Ok(())
        } else {
            Err(ServiceError::Unavailable)
        }
    }
}

impl Navigator for HostServices {
    fn navigate_home(&mut self) {
        (self.host.navigate_home)(self.host.ctx);
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Opaque Handle Types
// ═══════════════════════════════════════════════════════════════════════════

/// Opaque handle to one mounted session.
pub struct MeditateSession {
    session: SessionHandle,
    engine: EngineHandle,
}

impl MeditateSession {
    /// Queue a command, run the queue, and return the command's result.
    fn command(&mut self, command: Command) -> CommandResult {
        self.session.send(command);
        self.engine.process_events();
        self.session
            .drain_results()
            .pop()
            .unwrap_or(CommandResult::Ignored {
                reason: "no result",
            })
    }

    fn post(&mut self, event: Event) {
        self.engine.event_sender().post(event);
        self.engine.process_events();
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// FFI Result Types
// ═══════════════════════════════════════════════════════════════════════════

/// Session projection for the session screen.
#[repr(C)]
#[derive(Default)]
pub struct MeditateReadback {
    /// 0 idle, 1 running, 2 paused, 3 finished.
    pub state: u8,
    /// 0 intro, 1 meditation, 2 outro.
    pub phase: u8,
    pub elapsed_sec: u32,
    /// Meaningful only when `timed`.
    pub remaining_sec: u32,
    pub timed: bool,
    pub progress: f32,
    pub intro_progress: f32,
    pub meditation_progress: f32,
    pub outro_progress: f32,
    pub meditation_start_sec: u32,
    pub outro_start_sec: u32,
    pub voice_enabled: bool,
    /// 0 grounded, 1 focus, 2 gratitude, 3 none.
    pub intention: u8,
    pub confirmation_pending: bool,
    pub exited: bool,
}

impl From<SessionReadback> for MeditateReadback {
    fn from(r: SessionReadback) -> Self {
        use crate::state::Intention;
        Self {
            state: r.state.code(),
            phase: r.phase.code(),
            elapsed_sec: r.elapsed_sec,
            remaining_sec: r.remaining_sec.unwrap_or(0),
            timed: r.remaining_sec.is_some(),
            progress: r.progress,
            intro_progress: r.intro_progress,
            meditation_progress: r.meditation_progress,
            outro_progress: r.outro_progress,
            meditation_start_sec: r.meditation_start_sec,
            outro_start_sec: r.outro_start_sec,
            voice_enabled: r.voice_enabled,
            intention: match r.intention {
                Intention::Grounded => 0,
                Intention::Focus => 1,
                Intention::Gratitude => 2,
                Intention::None => 3,
            },
            confirmation_pending: r.confirmation_pending,
            exited: r.exited,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Session Creation
// ═══════════════════════════════════════════════════════════════════════════

/// Engine tuning.
#[repr(C)]
pub struct MeditateConfig {
    /// Session clock period in milliseconds (normally 1000).
    pub tick_period_ms: u32,
    /// Volume reached by the narration fade-in.
    pub fade_ceiling: f32,
    /// Number of fade-in volume steps.
    pub fade_steps: u32,
    /// Total fade-in duration in milliseconds.
    pub fade_duration_ms: u32,
    /// Voice guidance state at mount.
    pub voice_enabled: bool,
}

impl Default for MeditateConfig {
    fn default() -> Self {
        let defaults = EngineConfig::default();
        Self {
            tick_period_ms: defaults.tick_period.as_millis() as u32,
            fade_ceiling: defaults.fade.ceiling,
            fade_steps: defaults.fade.steps,
            fade_duration_ms: defaults.fade.duration.as_millis() as u32,
            voice_enabled: defaults.voice_enabled,
        }
    }
}

impl From<&MeditateConfig> for EngineConfig {
    fn from(c: &MeditateConfig) -> Self {
        Self {
            tick_period: Duration::from_millis(u64::from(c.tick_period_ms.max(1))),
            fade: FadeSettings {
                ceiling: c.fade_ceiling.clamp(0.0, 1.0),
                steps: c.fade_steps.max(1),
                duration: Duration::from_millis(u64::from(c.fade_duration_ms)),
            },
            voice_enabled: c.voice_enabled,
        }
    }
}

/// Get the default configuration values.
#[unsafe(no_mangle)]
pub extern "C" fn meditate_default_config() -> MeditateConfig {
    MeditateConfig::default()
}

/// Read an optional C string parameter. NULL and invalid UTF-8 count as absent.
unsafe fn param(ptr: *const c_char) -> Option<ParamValue> {
    if ptr.is_null() {
        return None;
    }
    let value = unsafe { CStr::from_ptr(ptr) }.to_str().ok()?;
    Some(ParamValue::from(value))
}

/// Mount a session from raw navigation parameters.
///
/// Any parameter may be NULL; malformed values fall back to defaults
/// (timed, 10 minutes, grounded). Both clips start loading immediately.
///
/// Returns NULL only if `host` is NULL.
///
/// # Safety
/// - `kind`, `minutes`, `intention` must be NULL or valid C strings
/// - `config` must be NULL or point to a valid MeditateConfig
/// - `host` must point to a valid callback table whose `ctx` stays valid
///   until `meditate_session_destroy`
#[unsafe(no_mangle)]
pub unsafe extern "C" fn meditate_session_create(
    kind: *const c_char,
    minutes: *const c_char,
    intention: *const c_char,
    config: *const MeditateConfig,
    host: *const MeditateHost,
) -> *mut MeditateSession {
    if host.is_null() {
        warn!("meditate_session_create: no host");
        return std::ptr::null_mut();
    }
    let host = unsafe { *host };

    let raw = unsafe {
        RawParams {
            kind: param(kind),
            minutes: param(minutes),
            intention: param(intention),
        }
    };
    let settings = if config.is_null() {
        EngineConfig::default()
    } else {
        EngineConfig::from(unsafe { &*config })
    };

    let services = Services::new(
        Box::new(HostServices { host }),
        Box::new(HostServices { host }),
        Box::new(HostServices { host }),
    );
    let mut audio = HostServices { host };
    let engine = SessionEngine::mount(resolve(&raw), settings, &mut audio, services);
    let (session, engine) = create_bridge(engine);

    Box::into_raw(Box::new(MeditateSession { session, engine }))
}

/// Destroy a session. Stops the clock and releases both clips first.
///
/// # Safety
/// `session` must be a valid pointer returned by `meditate_session_create`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn meditate_session_destroy(session: *mut MeditateSession) {
    if !session.is_null() {
        unsafe { drop(Box::from_raw(session)) };
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Session - Commands
// ═══════════════════════════════════════════════════════════════════════════
//
// Each returns a result code: 0 ok, 1 ignored, 2 confirmation required,
// 3 exited (255 for a NULL session or an unknown phase).

unsafe fn run(session: *mut MeditateSession, command: Command) -> u8 {
    if session.is_null() {
        return CommandResult::INVALID_CODE;
    }
    unsafe { (*session).command(command) }.code()
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn meditate_start(session: *mut MeditateSession) -> u8 {
    unsafe { run(session, Command::Start) }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn meditate_toggle_pause(session: *mut MeditateSession) -> u8 {
    unsafe { run(session, Command::TogglePause) }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn meditate_toggle_voice(session: *mut MeditateSession) -> u8 {
    unsafe { run(session, Command::ToggleVoice) }
}

/// Jump to the start of a phase (0 intro, 1 meditation, 2 outro).
#[unsafe(no_mangle)]
pub unsafe extern "C" fn meditate_seek(session: *mut MeditateSession, phase: u8) -> u8 {
    let Some(phase) = Phase::from_code(phase) else {
        debug!("meditate_seek: unknown phase {}", phase);
        return CommandResult::INVALID_CODE;
    };
    unsafe { run(session, Command::Seek { phase }) }
}

/// Returns 2 when the UI should ask for confirmation, 3 when it already exited.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn meditate_finish(session: *mut MeditateSession) -> u8 {
    unsafe { run(session, Command::Finish) }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn meditate_confirm_finish(session: *mut MeditateSession) -> u8 {
    unsafe { run(session, Command::ConfirmFinish) }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn meditate_cancel_finish(session: *mut MeditateSession) -> u8 {
    unsafe { run(session, Command::CancelFinish) }
}

/// The session screen is going away. Destroy still has to be called.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn meditate_unmount(session: *mut MeditateSession) -> u8 {
    unsafe { run(session, Command::Unmount) }
}

// ═══════════════════════════════════════════════════════════════════════════
// Session - Host Events
// ═══════════════════════════════════════════════════════════════════════════

/// A timer scheduled through `schedule_timer` fired.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn meditate_timer_fired(
    session: *mut MeditateSession,
    timer: u8,
    token: u64,
) {
    if session.is_null() {
        return;
    }
    let Some(timer) = TimerId::from_code(timer) else {
        debug!("meditate_timer_fired: unknown timer {}", timer);
        return;
    };
    unsafe { (*session).post(Event::TimerFired { timer, token }) };
}

/// A clip finished loading. Pass a negative duration if it is not known yet.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn meditate_clip_loaded(
    session: *mut MeditateSession,
    clip: u8,
    duration_sec: f64,
) {
    if session.is_null() {
        return;
    }
    let Some(clip) = ClipKind::from_code(clip) else {
        return;
    };
    let duration_sec = (duration_sec >= 0.0).then_some(duration_sec);
    unsafe { (*session).post(Event::ClipLoaded { clip, duration_sec }) };
}

/// A clip's duration became known after it loaded.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn meditate_clip_duration(
    session: *mut MeditateSession,
    clip: u8,
    duration_sec: f64,
) {
    if session.is_null() {
        return;
    }
    let Some(clip) = ClipKind::from_code(clip) else {
        return;
    };
    unsafe { (*session).post(Event::ClipDuration { clip, duration_sec }) };
}

// ═══════════════════════════════════════════════════════════════════════════
// Readback
// ═══════════════════════════════════════════════════════════════════════════

/// Current session projection.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn meditate_readback(session: *const MeditateSession) -> MeditateReadback {
    if session.is_null() {
        return MeditateReadback::default();
    }
    MeditateReadback::from(unsafe { (*session).engine.readback() })
}

// ═══════════════════════════════════════════════════════════════════════════
// Home Screen
// ═══════════════════════════════════════════════════════════════════════════

/// Minutes a timed launch from the home screen's minutes text will use.
///
/// # Safety
/// `text` must be NULL or a valid C string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn meditate_launch_minutes(text: *const c_char) -> u32 {
    let text = if text.is_null() {
        ""
    } else {
        unsafe { CStr::from_ptr(text) }.to_str().unwrap_or("")
    };
    launch_minutes(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Default)]
    struct Recorder {
        loads: Vec<(u8, String)>,
        playing: [bool; 2],
        clock: Option<u64>,
        homes: u32,
    }

    fn recorder(ctx: *mut c_void) -> &'static RefCell<Recorder> {
        unsafe { &*(ctx as *const RefCell<Recorder>) }
    }

    extern "C" fn load_clip(ctx: *mut c_void, clip: u8, file_name: *const c_char) {
        let name = unsafe { CStr::from_ptr(file_name) }.to_string_lossy().into_owned();
        recorder(ctx).borrow_mut().loads.push((clip, name));
    }
    extern "C" fn play(ctx: *mut c_void, clip: u8) -> bool {
        recorder(ctx).borrow_mut().playing[clip as usize] = true;
        true
    }
    extern "C" fn pause(ctx: *mut c_void, clip: u8) {
        recorder(ctx).borrow_mut().playing[clip as usize] = false;
    }
    extern "C" fn seek(_: *mut c_void, _: u8, _: f64) {}
    extern "C" fn set_volume(_: *mut c_void, _: u8, _: f32) {}
    extern "C" fn current_time(_: *mut c_void, _: u8) -> f64 {
        0.0
    }
    extern "C" fn release_clip(ctx: *mut c_void, clip: u8) {
        recorder(ctx).borrow_mut().playing[clip as usize] = false;
    }
    extern "C" fn schedule_timer(ctx: *mut c_void, timer: u8, token: u64, _: u32, _: bool) {
        if timer == 0 {
            recorder(ctx).borrow_mut().clock = Some(token);
        }
    }
    extern "C" fn cancel_timer(ctx: *mut c_void, timer: u8) {
        if timer == 0 {
            recorder(ctx).borrow_mut().clock = None;
        }
    }
    extern "C" fn haptic_light(_: *mut c_void) -> bool {
        false
    }
    extern "C" fn navigate_home(ctx: *mut c_void) {
        recorder(ctx).borrow_mut().homes += 1;
    }

    fn host(recorder: &RefCell<Recorder>) -> MeditateHost {
        MeditateHost {
            ctx: recorder as *const RefCell<Recorder> as *mut c_void,
            load_clip,
            play,
            pause,
            seek,
            set_volume,
            current_time,
            release_clip,
            schedule_timer,
            cancel_timer,
            haptic_light,
            navigate_home,
        }
    }

    #[test]
    fn test_session_over_c_abi() {
        let rec = RefCell::new(Recorder::default());
        let host = host(&rec);
        let session = unsafe {
            meditate_session_create(
                c"timed".as_ptr(),
                c"1".as_ptr(),
                std::ptr::null(),
                std::ptr::null(),
                &host,
            )
        };
        assert!(!session.is_null());
        assert_eq!(rec.borrow().loads.len(), 2);
        assert_eq!(rec.borrow().loads[0], (0, "grounded_intro.mp3".to_string()));

        unsafe {
            meditate_clip_loaded(session, 0, 5.0);
            meditate_clip_loaded(session, 1, -1.0);
            // Haptics unavailable: start still succeeds.
            assert_eq!(meditate_start(session), 0);
        }
        assert!(rec.borrow().playing[0]);

        for _ in 0..65 {
            let token = rec.borrow().clock.unwrap();
            unsafe { meditate_timer_fired(session, 0, token) };
        }
        let readback = unsafe { meditate_readback(session) };
        assert_eq!(readback.state, 3);
        assert!(readback.timed);
        assert_eq!(readback.remaining_sec, 0);
        assert!(!rec.borrow().playing[0]);
        assert_eq!(rec.borrow().clock, None);

        unsafe {
            assert_eq!(meditate_seek(session, 9), CommandResult::INVALID_CODE);
            assert_eq!(meditate_finish(session), 3);
            meditate_session_destroy(session);
        }
        assert_eq!(rec.borrow().homes, 1);
    }

    #[test]
    fn test_null_handles() {
        unsafe {
            assert_eq!(meditate_start(std::ptr::null_mut()), CommandResult::INVALID_CODE);
            meditate_timer_fired(std::ptr::null_mut(), 0, 1);
            assert_eq!(meditate_readback(std::ptr::null()).state, 0);
            assert!(
                meditate_session_create(
                    std::ptr::null(),
                    std::ptr::null(),
                    std::ptr::null(),
                    std::ptr::null(),
                    std::ptr::null(),
                )
                .is_null()
            );
            assert_eq!(meditate_launch_minutes(c"999".as_ptr()), 180);
            assert_eq!(meditate_launch_minutes(std::ptr::null()), 10);
        }
    }

    #[test]
    fn test_default_config_matches_engine() {
        let config = meditate_default_config();
        assert_eq!(EngineConfig::from(&config), EngineConfig::default());
    }
}
