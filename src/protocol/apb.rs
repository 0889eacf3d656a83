//! AMBA APB recognizer.
//!
//! APB transfers run in two phases: a setup cycle (PSEL high,
//! PENABLE low) followed by one or more access cycles (both high).
//! Everything about the transfer is stable during the access phase;
//! only PREADY and PSLVERR, the completion signals, are sampled from
//! the following frame.

use log::trace;

use super::{is_high, signal, SignalMapping};
use crate::{Operation, RawTransaction, Response, SampleFrame, SignalValue};

/// APB protocol recognizer.
#[derive(Debug, Clone)]
pub struct Apb {
    mapping: SignalMapping,
}

impl Apb {
    /// Stable protocol identifier.
    pub const PROTOCOL_NAME: &'static str = "APB";

    /// Signals the recognizer cannot decode without.
    pub const REQUIRED_SIGNALS: &'static [&'static str] =
        &["pclk", "psel", "penable", "paddr", "pwrite", "pwdata", "prdata"];

    /// Signals that refine decoding when present.
    pub const OPTIONAL_SIGNALS: &'static [&'static str] = &["pslverr", "pready"];

    /// Signals interpreted as hexadecimal integers.
    pub const HEX_SIGNALS: &'static [&'static str] = &["paddr", "pwdata", "prdata"];

    /// Creates a recognizer resolving logical names through
    /// `mapping`.
    pub fn new(mapping: SignalMapping) -> Apb {
        Apb { mapping }
    }

    /// The signal-name mapping in effect.
    pub fn signal_mapping(&self) -> &SignalMapping {
        &self.mapping
    }

    fn signal<'f>(&self, frame: &'f SampleFrame, logical: &str) -> Option<&'f SignalValue> {
        signal(&self.mapping, frame, logical)
    }

    /// Access-phase gate: clock, select, and enable all high. Setup
    /// cycles (PENABLE low) are rejected.
    pub fn is_valid_transaction(&self, frame: &SampleFrame) -> bool {
        is_high(&self.mapping, frame, "pclk")
            && is_high(&self.mapping, frame, "psel")
            && is_high(&self.mapping, frame, "penable")
    }

    /// PWRITE high means the master drives data.
    pub fn transaction_type(&self, frame: &SampleFrame) -> Operation {
        if is_high(&self.mapping, frame, "pwrite") {
            Operation::Write
        } else {
            Operation::Read
        }
    }

    /// Maps a PSLVERR sample to its response status. APB has a
    /// single error line, so only OKAY and ERROR are reachable from
    /// well-formed samples.
    pub fn response_status(&self, pslverr: Option<&SignalValue>) -> Response {
        match pslverr.and_then(SignalValue::as_u64) {
            Some(0) => Response::Okay,
            Some(1) => Response::Error,
            _ => Response::Unknown,
        }
    }

    /// Pairs an access-phase frame with the completion signals of
    /// the following frame.
    ///
    /// A low PREADY in the lookahead frame means the slave stretched
    /// the access: the record is emitted with an absent value.
    /// Otherwise write data comes from the access phase's PWDATA and
    /// read data from the completion frame's PRDATA.
    pub fn extract_transaction(
        &self,
        frame: &SampleFrame,
        next_frame: Option<&SampleFrame>,
    ) -> Option<RawTransaction> {
        let address = self.signal(frame, "paddr").and_then(SignalValue::as_hex_string)?;
        let operation = self.transaction_type(frame);

        if let Some(next) = next_frame {
            if self.signal(next, "pready").and_then(SignalValue::as_logic) == Some(false) {
                trace!("wait state at t={} addr={}", frame.timestamp, address);
                return Some(RawTransaction {
                    time: frame.timestamp,
                    address,
                    operation,
                    value: None,
                    response: self
                        .signal(next, "pslverr")
                        .map(|v| self.response_status(Some(v))),
                    wait_state: true,
                });
            }
        }

        let value = match operation {
            Operation::Write => self
                .signal(frame, "pwdata")
                .and_then(SignalValue::as_hex_string),
            Operation::Read => next_frame
                .and_then(|next| self.signal(next, "prdata"))
                .and_then(SignalValue::as_hex_string),
        };
        let response = match next_frame.and_then(|next| self.signal(next, "pslverr")) {
            Some(pslverr) => Some(self.response_status(Some(pslverr))),
            // No error line in the stream: the slave cannot signal
            // anything but success.
            None => Some(Response::Okay),
        };

        Some(RawTransaction {
            time: frame.timestamp,
            address,
            operation,
            value,
            response,
            wait_state: false,
        })
    }
}

#[cfg(test)]
mod pslverr_map {
    use super::*;

    #[test]
    fn error_line_codes() {
        let apb = Apb::new(SignalMapping::identity());
        assert_eq!(apb.response_status(Some(&SignalValue::Int(0))), Response::Okay);
        assert_eq!(apb.response_status(Some(&SignalValue::Int(1))), Response::Error);
        assert_eq!(
            apb.response_status(Some(&SignalValue::Text("1".to_string()))),
            Response::Error,
        );
        assert_eq!(apb.response_status(None), Response::Unknown);
        assert_eq!(
            apb.response_status(Some(&SignalValue::Text("z".to_string()))),
            Response::Unknown,
        );
    }
}
