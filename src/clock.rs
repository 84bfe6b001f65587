// src/clock.rs

use std::time::Duration;

use log::debug;

use crate::services::{TimerId, TimerService};

/// The session clock.
///
/// This struct:
/// - is the single source of truth for elapsed seconds
/// - owns exactly one repeating host ticker, armed only while running
/// - never moves time backward on its own (only `seek` does)
///
/// Every arm uses a fresh token. Ticks carrying any other token come from a
/// ticker that was already cancelled and are dropped, so two tickers can
/// never advance time concurrently.
#[derive(Debug)]
pub struct SessionClock {
    /// Elapsed whole seconds.
    elapsed: u32,

    started: bool,

    /// Meaningful once started. Starts out true.
    paused: bool,

    period: Duration,

    /// Token of the armed ticker, if any.
    ticker: Option<u64>,

    /// Last token handed out.
    last_token: u64,
}

impl SessionClock {
    pub fn new(period: Duration) -> Self {
        Self {
            elapsed: 0,
            started: false,
            paused: true,
            period,
            ticker: None,
            last_token: 0,
        }
    }

    // -------------------------------
    // MARK: Ticker control
    // -------------------------------

    /// Arm or disarm the ticker to match `started && !paused && !finished`.
    ///
    /// Idempotent in both directions.
    pub fn sync(&mut self, finished: bool, timers: &mut dyn TimerService) {
        let should_run = self.started && !self.paused && !finished;
        match (should_run, self.ticker) {
            (true, None) => {
                self.last_token += 1;
                self.ticker = Some(self.last_token);
                timers.schedule(TimerId::Clock, self.last_token, self.period, true);
            }
            (false, Some(_)) => {
                self.ticker = None;
                timers.cancel(TimerId::Clock);
            }
            _ => {}
        }
    }

    /// Disarm the ticker unconditionally.
    pub fn stop(&mut self, timers: &mut dyn TimerService) {
        self.ticker = None;
        timers.cancel(TimerId::Clock);
    }

    /// A ticker fired. Returns true if time advanced.
    pub fn on_tick(&mut self, token: u64) -> bool {
        if self.ticker != Some(token) {
            debug!("dropping stale clock tick (token {})", token);
            return false;
        }
        self.elapsed = self.elapsed.saturating_add(1);
        true
    }

    // -------------------------------
    // MARK: Mutators (engine-controlled)
    // -------------------------------

    pub fn set_started(&mut self, started: bool) {
        self.started = started;
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    /// Jump to `seconds`. The only way time moves backward.
    pub fn seek(&mut self, seconds: u32) {
        self.elapsed = seconds;
    }

    // -------------------------------
    // MARK: Accessors
    // -------------------------------

    #[inline]
    pub fn elapsed(&self) -> u32 {
        self.elapsed
    }

    #[inline]
    pub fn is_started(&self) -> bool {
        self.started
    }

    #[inline]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    #[inline]
    pub fn ticker_token(&self) -> Option<u64> {
        self.ticker
    }
}
