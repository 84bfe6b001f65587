// src/main.rs
//
// Sanity run: one short narrated session against printing host fakes.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

use meditate::{
    AssetId, AudioPlayback, ClipKind, Command, EngineConfig, EngineState, Event, Haptics,
    Navigator, PlaybackError, PlayerHandle, PreferenceError, PreferenceStore, ServiceError,
    Services, SessionEngine, TimerId, TimerService, create_bridge, load_minutes, resolve,
    save_minutes, timed_launch,
};

/// ===============================
/// Printing host
/// ===============================

struct PrintPlayer {
    clip: ClipKind,
    time: f64,
}

impl PlayerHandle for PrintPlayer {
    fn play(&mut self) -> Result<(), PlaybackError> {
        println!("  [{}] play", self.clip.as_str());
        Ok(())
    }

    fn pause(&mut self) -> Result<(), PlaybackError> {
        println!("  [{}] pause", self.clip.as_str());
        Ok(())
    }

    fn seek_to(&mut self, seconds: f64) -> Result<(), PlaybackError> {
        self.time = seconds;
        Ok(())
    }

    fn set_volume(&mut self, _volume: f32) {}

    fn current_time(&self) -> f64 {
        self.time
    }

    fn release(&mut self) {
        println!("  [{}] release", self.clip.as_str());
    }
}

struct PrintAudio;

impl AudioPlayback for PrintAudio {
    fn load(&mut self, clip: ClipKind, asset: AssetId) -> Box<dyn PlayerHandle> {
        println!("  [{}] load {}", clip.as_str(), asset.file_name());
        Box::new(PrintPlayer { clip, time: 0.0 })
    }
}

/// Pending timers, fired by the main loop instead of a real clock.
#[derive(Clone, Default)]
struct VirtualTimers {
    pending: Rc<RefCell<HashMap<TimerId, u64>>>,
}

impl TimerService for VirtualTimers {
    fn schedule(&mut self, timer: TimerId, token: u64, _delay: Duration, _repeat: bool) {
        self.pending.borrow_mut().insert(timer, token);
    }

    fn cancel(&mut self, timer: TimerId) {
        self.pending.borrow_mut().remove(&timer);
    }
}

impl VirtualTimers {
    fn get(&self, timer: TimerId) -> Option<u64> {
        self.pending.borrow().get(&timer).copied()
    }

    fn take(&self, timer: TimerId) -> Option<u64> {
        self.pending.borrow_mut().remove(&timer)
    }
}

struct PrintHaptics;

impl Haptics for PrintHaptics {
    fn impact_light(&mut self) -> Result<(), ServiceError> {
        println!("  [haptic] light");
        Ok(())
    }
}

struct PrintNavigator;

impl Navigator for PrintNavigator {
    fn navigate_home(&mut self) {
        println!("  [nav] home");
    }
}

#[derive(Default)]
struct MemoryPrefs {
    values: HashMap<String, String>,
}

impl PreferenceStore for MemoryPrefs {
    fn get(&self, key: &str) -> Result<Option<String>, PreferenceError> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), PreferenceError> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// ===============================
/// Main
/// ===============================

fn main() {
    // --------------------------------
    // Home screen
    // --------------------------------

    let mut prefs = MemoryPrefs::default();
    println!("Stored minutes: {}", load_minutes(&prefs));
    let minutes = save_minutes(&mut prefs, "1");
    let config = resolve(&timed_launch(&minutes));
    println!("Launching {:?}", config);

    // --------------------------------
    // Session screen
    // --------------------------------

    let timers = VirtualTimers::default();
    let services = Services::new(
        Box::new(timers.clone()),
        Box::new(PrintHaptics),
        Box::new(PrintNavigator),
    );
    let engine = SessionEngine::mount(config, EngineConfig::default(), &mut PrintAudio, services);
    let (session, mut engine) = create_bridge(engine);

    let host = session.event_sender();
    host.post(Event::ClipLoaded {
        clip: ClipKind::Intro,
        duration_sec: Some(8.0),
    });
    host.post(Event::ClipLoaded {
        clip: ClipKind::Outro,
        duration_sec: Some(12.0),
    });
    session.start();
    engine.process_events();

    println!("Starting session sanity test…");

    while session.state() != EngineState::Finished {
        // Fade ramps finish well inside one clock period.
        for clip in [ClipKind::Intro, ClipKind::Outro] {
            let timer = TimerId::Fade(clip);
            while let Some(token) = timers.take(timer) {
                host.post(Event::TimerFired { timer, token });
                engine.process_events();
            }
        }

        let Some(token) = timers.get(TimerId::Clock) else {
            println!("Clock stopped unexpectedly.");
            break;
        };
        host.post(Event::TimerFired {
            timer: TimerId::Clock,
            token,
        });
        engine.process_events();

        let elapsed = session.elapsed_sec();
        if elapsed % 10 == 0 || elapsed < 10 {
            println!(
                "{:>3}s  {:<10} {} {}",
                elapsed,
                session.phase().as_str(),
                session.display(),
                if session.voice_enabled() { "voice" } else { "silent" }
            );
        }
    }

    session.send(Command::Finish);
    engine.process_events();
    println!("Result: {:?}", session.drain_results().last());
    println!("Sanity test completed.");
}
