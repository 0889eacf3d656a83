//! Bus-protocol recognizers.
//!
//! A recognizer classifies each [`SampleFrame`](crate::SampleFrame),
//! gates on the protocol's validity condition, and pairs an address
//! phase with its data/response phase to produce a
//! [`RawTransaction`](crate::RawTransaction). The concrete protocols
//! are a closed set behind the [`Protocol`] tagged variant; new
//! buses slot in as further variants.

mod ahb;
mod apb;

pub use ahb::Ahb;
pub use apb::Apb;

use std::collections::HashMap;

use crate::{Error, Operation, RawTransaction, SampleFrame, SignalValue};

/// Read-only table mapping a protocol's logical signal names to the
/// signal names actually present in the sample stream. Unmapped
/// names resolve to themselves.
#[derive(Debug, Clone, Default)]
pub struct SignalMapping(HashMap<String, String>);

impl SignalMapping {
    /// Creates the identity mapping.
    pub fn identity() -> Self {
        Self::default()
    }

    /// Maps one logical name to an actual signal name, builder
    /// style.
    pub fn with(mut self, logical: &str, actual: &str) -> Self {
        self.0.insert(logical.to_string(), actual.to_string());
        self
    }

    /// Resolves a logical name to the signal name to look up in a
    /// frame.
    pub fn resolve<'a>(&'a self, logical: &'a str) -> &'a str {
        self.0.get(logical).map(String::as_str).unwrap_or(logical)
    }
}

impl<S: Into<String>, T: Into<String>> std::iter::FromIterator<(S, T)> for SignalMapping {
    fn from_iter<I: IntoIterator<Item = (S, T)>>(iter: I) -> Self {
        SignalMapping(
            iter.into_iter()
                .map(|(s, t)| (s.into(), t.into()))
                .collect(),
        )
    }
}

/// Looks up a logical signal in a frame through the mapping,
/// tolerating absent entries.
fn signal<'f>(
    mapping: &SignalMapping,
    frame: &'f SampleFrame,
    logical: &str,
) -> Option<&'f SignalValue> {
    frame.signal(mapping.resolve(logical))
}

/// True iff the logical signal is present and drives a clean high.
fn is_high(mapping: &SignalMapping, frame: &SampleFrame, logical: &str) -> bool {
    signal(mapping, frame, logical)
        .and_then(SignalValue::as_logic)
        .unwrap_or(false)
}

/// A bus-protocol recognizer.
///
/// The concrete recognizers share a capability set rather than a
/// trait object: every operation dispatches over this enum, and
/// [`Protocol::by_name`] is the registry that constructs one from
/// its stable identifier.
#[derive(Debug, Clone)]
pub enum Protocol {
    /// AMBA AHB: pipelined address/data phases.
    Ahb(Ahb),

    /// AMBA APB: two-phase setup/access handshake.
    Apb(Apb),
}

impl Protocol {
    /// Constructs the recognizer registered under `name`
    /// (case-insensitive).
    pub fn by_name(name: &str, mapping: SignalMapping) -> Result<Protocol, Error> {
        match name.to_ascii_lowercase().as_str() {
            "ahb" => Ok(Protocol::Ahb(Ahb::new(mapping))),
            "apb" => Ok(Protocol::Apb(Apb::new(mapping))),
            _ => Err(Error::UnknownProtocol(name.to_string())),
        }
    }

    /// Stable identifier of the recognized protocol.
    pub fn protocol_name(&self) -> &'static str {
        match self {
            Protocol::Ahb(_) => Ahb::PROTOCOL_NAME,
            Protocol::Apb(_) => Apb::PROTOCOL_NAME,
        }
    }

    /// Logical signals that must be present in the sample stream.
    /// Absence is a fatal configuration error.
    pub fn required_signals(&self) -> &'static [&'static str] {
        match self {
            Protocol::Ahb(_) => Ahb::REQUIRED_SIGNALS,
            Protocol::Apb(_) => Apb::REQUIRED_SIGNALS,
        }
    }

    /// Logical signals that refine decoding when present. When
    /// absent, responses default to OKAY and no wait states are
    /// reported.
    pub fn optional_signals(&self) -> &'static [&'static str] {
        match self {
            Protocol::Ahb(_) => Ahb::OPTIONAL_SIGNALS,
            Protocol::Apb(_) => Apb::OPTIONAL_SIGNALS,
        }
    }

    /// Logical signals whose raw values are big-endian hexadecimal
    /// integers rather than single-bit logic levels.
    pub fn hex_signals(&self) -> &'static [&'static str] {
        match self {
            Protocol::Ahb(_) => Ahb::HEX_SIGNALS,
            Protocol::Apb(_) => Apb::HEX_SIGNALS,
        }
    }

    /// The signal-name mapping this recognizer resolves logical
    /// names through.
    pub fn signal_mapping(&self) -> &SignalMapping {
        match self {
            Protocol::Ahb(p) => p.signal_mapping(),
            Protocol::Apb(p) => p.signal_mapping(),
        }
    }

    /// Whether the frame qualifies as the address phase of a
    /// transaction. A malformed or four-state value in any gating
    /// signal fails the gate.
    pub fn is_valid_transaction(&self, frame: &SampleFrame) -> bool {
        match self {
            Protocol::Ahb(p) => p.is_valid_transaction(frame),
            Protocol::Apb(p) => p.is_valid_transaction(frame),
        }
    }

    /// Direction of the access described by an address-phase frame.
    pub fn transaction_type(&self, frame: &SampleFrame) -> Operation {
        match self {
            Protocol::Ahb(p) => p.transaction_type(frame),
            Protocol::Apb(p) => p.transaction_type(frame),
        }
    }

    /// Pairs an address-phase frame with its lookahead frame into a
    /// [`RawTransaction`]. Returns `None` when the address cannot be
    /// recovered from the frame.
    pub fn extract_transaction(
        &self,
        frame: &SampleFrame,
        next_frame: Option<&SampleFrame>,
    ) -> Option<RawTransaction> {
        match self {
            Protocol::Ahb(p) => p.extract_transaction(frame, next_frame),
            Protocol::Apb(p) => p.extract_transaction(frame, next_frame),
        }
    }

    /// Verifies the signal contract against a frame: every required
    /// logical signal must resolve to a signal the stream carries.
    pub fn check_signals(&self, frame: &SampleFrame) -> Result<(), Error> {
        let mapping = self.signal_mapping();
        for logical in self.required_signals() {
            if frame.signal(mapping.resolve(logical)).is_none() {
                return Err(Error::MissingSignal {
                    protocol: self.protocol_name(),
                    signal: logical,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod registry {
    use super::*;

    #[test]
    fn by_name_is_case_insensitive() {
        assert_eq!(
            Protocol::by_name("AHB", SignalMapping::identity())
                .unwrap()
                .protocol_name(),
            "AHB"
        );
        assert_eq!(
            Protocol::by_name("apb", SignalMapping::identity())
                .unwrap()
                .protocol_name(),
            "APB"
        );
    }

    #[test]
    fn unknown_protocol_is_an_error() {
        assert_eq!(
            Protocol::by_name("axi", SignalMapping::identity()).unwrap_err(),
            Error::UnknownProtocol("axi".to_string()),
        );
    }

    #[test]
    fn mapping_resolves_with_identity_fallback() {
        let mapping = SignalMapping::identity()
            .with("hclk", "clk")
            .with("haddr", "ahb_addr");
        assert_eq!(mapping.resolve("hclk"), "clk");
        assert_eq!(mapping.resolve("haddr"), "ahb_addr");
        assert_eq!(mapping.resolve("hwdata"), "hwdata");
    }
}
