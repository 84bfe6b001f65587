// Navigation parameters -> SessionConfig.
//
// The navigation layer hands over a loose bag where every field may be
// missing, a single string, or a list of strings (repeated query keys).
// Resolution never fails: anything unusable falls back to a default.

use super::config::{
    DEFAULT_MINUTES, Intention, MAX_MINUTES, MIN_MINUTES, Mode, SessionConfig,
};

/// One raw navigation parameter value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    Single(String),
    List(Vec<String>),
}

impl ParamValue {
    /// Collapse to the first value. An empty list counts as absent.
    pub fn first(&self) -> Option<&str> {
        match self {
            ParamValue::Single(value) => Some(value.as_str()),
            ParamValue::List(values) => values.first().map(String::as_str),
        }
    }

    fn push(&mut self, value: String) {
        match self {
            ParamValue::Single(existing) => {
                let first = std::mem::take(existing);
                *self = ParamValue::List(vec![first, value]);
            }
            ParamValue::List(values) => values.push(value),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Single(value.to_string())
    }
}

/// Raw parameter bag as received from navigation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawParams {
    pub kind: Option<ParamValue>,
    pub minutes: Option<ParamValue>,
    pub intention: Option<ParamValue>,
}

impl RawParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from query-style pairs. Repeated keys accumulate into a list,
    /// unknown keys are dropped.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut params = Self::new();
        for (key, value) in pairs {
            let slot = match key.as_ref() {
                "type" => &mut params.kind,
                "minutes" => &mut params.minutes,
                "intention" => &mut params.intention,
                _ => continue,
            };
            let value = value.into();
            if let Some(existing) = slot.as_mut() {
                existing.push(value);
            } else {
                *slot = Some(ParamValue::Single(value));
            }
        }
        params
    }

    /// Inverse of [`from_pairs`](Self::from_pairs) for the first value of each field.
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::with_capacity(3);
        let fields = [
            ("type", &self.kind),
            ("minutes", &self.minutes),
            ("intention", &self.intention),
        ];
        for (key, field) in fields {
            if let Some(value) = field.as_ref().and_then(ParamValue::first) {
                pairs.push((key, value.to_string()));
            }
        }
        pairs
    }
}

/// Resolve a raw parameter bag into a usable configuration.
pub fn resolve(raw: &RawParams) -> SessionConfig {
    let kind = raw.kind.as_ref().and_then(ParamValue::first);
    let minutes = raw.minutes.as_ref().and_then(ParamValue::first);
    let intention = raw.intention.as_ref().and_then(ParamValue::first);

    let mode = match kind {
        Some("open") => Mode::Open,
        _ => Mode::Timed {
            minutes: resolve_minutes(minutes),
        },
    };

    let intention = intention
        .and_then(Intention::parse)
        .unwrap_or(Intention::Grounded);

    SessionConfig { mode, intention }
}

/// Parse and clamp a minutes value. Missing, unparsable or non-positive
/// input yields the default.
pub fn resolve_minutes(value: Option<&str>) -> u32 {
    match value.and_then(parse_leading_int) {
        Some(n) if n > 0 => n.min(MAX_MINUTES as i64).max(MIN_MINUTES as i64) as u32,
        _ => DEFAULT_MINUTES,
    }
}

/// Lenient integer parse: leading whitespace, optional sign, then as many
/// decimal digits as present. Trailing garbage is ignored.
pub fn parse_leading_int(text: &str) -> Option<i64> {
    let text = text.trim_start();
    let (negative, digits) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };

    let end = digits
        .bytes()
        .position(|b| !b.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }

    // Saturate instead of failing on absurdly long digit runs.
    let magnitude = digits[..end].parse::<i64>().unwrap_or(i64::MAX);
    Some(if negative { -magnitude } else { magnitude })
}
