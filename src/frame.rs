//! Sample frames and raw signal-value normalization.
//!
//! Waveform readers hand the pipeline one [`SampleFrame`] per cycle:
//! a timestamp plus the sampled value of every tracked signal.
//! Values arrive in whatever shape the reader produced, bare
//! integers or text, and the accessors here normalize them on
//! demand. Nothing is interpreted eagerly; a frame that carries
//! malformed values simply fails the recognizer's validity gate.

use std::collections::HashMap;

/// Raw value of one signal in one cycle.
///
/// Single-bit signals are logic levels (`"0"`, `"1"`, or the
/// four-state `"x"`/`"z"`); multi-bit signals are integers or hex
/// strings with or without a `0x` prefix.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum SignalValue {
    /// A numeric sample.
    Int(u64),

    /// A textual sample, as read from the waveform.
    Text(String),
}

impl SignalValue {
    /// Interprets the sample as a single-bit logic level. Returns
    /// `None` for `"x"`, `"z"`, and anything else that is not a
    /// plain 0 or 1; an undriven or unknown control line never
    /// passes a validity gate.
    pub fn as_logic(&self) -> Option<bool> {
        match self {
            SignalValue::Int(0) => Some(false),
            SignalValue::Int(1) => Some(true),
            SignalValue::Int(_) => None,
            SignalValue::Text(s) => match s.trim() {
                "0" => Some(false),
                "1" => Some(true),
                _ => None,
            },
        }
    }

    /// Interprets the sample as an unsigned integer. Text values
    /// accept a `0x`/`0X`-prefixed hex form or plain decimal.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            SignalValue::Int(v) => Some(*v),
            SignalValue::Text(s) => {
                let s = s.trim();
                if let Some(hex) = strip_hex_prefix(s) {
                    u64::from_str_radix(hex, 16).ok()
                } else {
                    s.parse().ok()
                }
            }
        }
    }

    /// Renders the sample as a `0x`-prefixed hex string, losslessly
    /// and without width assumptions. Text samples keep their
    /// original digits (so values wider than any machine integer
    /// survive); integer samples format as lowercase hex. Returns
    /// `None` if the text is not a hex number.
    pub fn as_hex_string(&self) -> Option<String> {
        match self {
            SignalValue::Int(v) => Some(format!("{:#x}", v)),
            SignalValue::Text(s) => {
                let s = s.trim();
                let digits = strip_hex_prefix(s).unwrap_or(s);
                if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
                    return None;
                }
                Some(format!("0x{}", digits))
            }
        }
    }
}

fn strip_hex_prefix(s: &str) -> Option<&str> {
    s.strip_prefix("0x").or_else(|| s.strip_prefix("0X"))
}

impl From<u64> for SignalValue {
    fn from(v: u64) -> Self {
        SignalValue::Int(v)
    }
}

impl From<&str> for SignalValue {
    fn from(s: &str) -> Self {
        SignalValue::Text(s.to_string())
    }
}

impl From<String> for SignalValue {
    fn from(s: String) -> Self {
        SignalValue::Text(s)
    }
}

/// One cycle's snapshot of every tracked signal.
///
/// Timestamps must be non-decreasing across a stream; the pipeline
/// preserves their order but does not reorder on their behalf.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SampleFrame {
    /// Simulation time of the snapshot.
    pub timestamp: u64,

    /// Sampled value of each signal, keyed by the signal name used
    /// in the waveform.
    pub signals: HashMap<String, SignalValue>,
}

impl SampleFrame {
    /// Creates an empty frame at the given timestamp.
    pub fn new(timestamp: u64) -> Self {
        SampleFrame {
            timestamp,
            signals: HashMap::new(),
        }
    }

    /// Adds one signal sample, builder style.
    pub fn with(mut self, name: &str, value: impl Into<SignalValue>) -> Self {
        self.signals.insert(name.to_string(), value.into());
        self
    }

    /// Looks up a signal by its waveform name.
    pub fn signal(&self, name: &str) -> Option<&SignalValue> {
        self.signals.get(name)
    }
}
