// src/prefs.rs
//
// Home screen minutes preference and session launch parameters.
//
// The minutes field is free text on the home screen (digits only). What gets
// stored is the minutes a launch would use, clamped and defaulted.

use log::warn;

use crate::services::PreferenceStore;
use crate::state::{DEFAULT_MINUTES, ParamValue, RawParams, resolve_minutes};

/// Storage key of the last chosen minutes.
pub const MINUTES_KEY: &str = "pref:minutes";

/// The minutes field accepts at most this many digits.
pub const MAX_MINUTES_DIGITS: usize = 3;

/// Keep only ASCII digits, at most [`MAX_MINUTES_DIGITS`] of them.
pub fn sanitize_minutes(text: &str) -> String {
    text.chars()
        .filter(char::is_ascii_digit)
        .take(MAX_MINUTES_DIGITS)
        .collect()
}

/// Minutes a launch from `text` will use, clamped to the valid range.
pub fn launch_minutes(text: &str) -> u32 {
    resolve_minutes(Some(text))
}

/// Read the stored minutes text. Missing, empty or unreadable values fall
/// back to the default.
pub fn load_minutes(store: &dyn PreferenceStore) -> String {
    match store.get(MINUTES_KEY) {
        Ok(Some(value)) => match sanitize_minutes(&value) {
            minutes if minutes.is_empty() => DEFAULT_MINUTES.to_string(),
            minutes => minutes,
        },
        Ok(None) => DEFAULT_MINUTES.to_string(),
        Err(e) => {
            warn!("reading {} failed: {}", MINUTES_KEY, e);
            DEFAULT_MINUTES.to_string()
        }
    }
}

/// Store the minutes a launch from `text` would use. Best effort: failures
/// are logged.
///
/// Returns the sanitized text the field should show, which may still be out
/// of range or empty while the user is typing.
pub fn save_minutes(store: &mut dyn PreferenceStore, text: &str) -> String {
    let minutes = sanitize_minutes(text);
    let stored = launch_minutes(&minutes).to_string();
    if let Err(e) = store.set(MINUTES_KEY, &stored) {
        warn!("{}", e);
    }
    minutes
}

/// Launch parameters for a timed session.
pub fn timed_launch(minutes_text: &str) -> RawParams {
    RawParams {
        kind: Some(ParamValue::from("timed")),
        minutes: Some(ParamValue::Single(launch_minutes(minutes_text).to_string())),
        intention: Some(ParamValue::from("grounded")),
    }
}

/// Launch parameters for an open-ended session.
pub fn open_launch() -> RawParams {
    RawParams {
        kind: Some(ParamValue::from("open")),
        minutes: None,
        intention: Some(ParamValue::from("none")),
    }
}
