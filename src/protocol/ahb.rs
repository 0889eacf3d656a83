//! AMBA AHB recognizer.
//!
//! AHB pipelines its phases: the address and control signals of one
//! transfer overlap the data phase of the previous one, so a
//! transaction is reassembled from an address-phase frame plus the
//! following frame. HTRANS gates which cycles carry an address phase
//! at all, and HREADY stretches the data phase with wait states.

use log::trace;

use super::{is_high, signal, SignalMapping};
use crate::{Operation, RawTransaction, Response, SampleFrame, SignalValue};

/// HTRANS transfer types that carry an address phase. IDLE (0) and
/// BUSY (1) cycles are rejected by the validity gate.
const HTRANS_NONSEQ: u64 = 2;
const HTRANS_SEQ: u64 = 3;

/// AHB protocol recognizer.
#[derive(Debug, Clone)]
pub struct Ahb {
    mapping: SignalMapping,
}

impl Ahb {
    /// Stable protocol identifier.
    pub const PROTOCOL_NAME: &'static str = "AHB";

    /// Signals the recognizer cannot decode without.
    pub const REQUIRED_SIGNALS: &'static [&'static str] =
        &["hclk", "htrans", "haddr", "hwrite", "hwdata", "hrdata"];

    /// Signals that refine decoding when present.
    pub const OPTIONAL_SIGNALS: &'static [&'static str] = &["hready", "hresp"];

    /// Signals interpreted as hexadecimal integers.
    pub const HEX_SIGNALS: &'static [&'static str] = &["haddr", "hwdata", "hrdata"];

    /// Creates a recognizer resolving logical names through
    /// `mapping`.
    pub fn new(mapping: SignalMapping) -> Ahb {
        Ahb { mapping }
    }

    /// The signal-name mapping in effect.
    pub fn signal_mapping(&self) -> &SignalMapping {
        &self.mapping
    }

    fn signal<'f>(&self, frame: &'f SampleFrame, logical: &str) -> Option<&'f SignalValue> {
        signal(&self.mapping, frame, logical)
    }

    /// Address-phase gate: a rising clock sample with HTRANS
    /// signalling a NONSEQ or SEQ transfer.
    pub fn is_valid_transaction(&self, frame: &SampleFrame) -> bool {
        if !is_high(&self.mapping, frame, "hclk") {
            return false;
        }
        matches!(
            self.signal(frame, "htrans").and_then(SignalValue::as_u64),
            Some(HTRANS_NONSEQ) | Some(HTRANS_SEQ)
        )
    }

    /// HWRITE high means the master drives data.
    pub fn transaction_type(&self, frame: &SampleFrame) -> Operation {
        if is_high(&self.mapping, frame, "hwrite") {
            Operation::Write
        } else {
            Operation::Read
        }
    }

    /// Maps an HRESP sample to its response status. Accepts numeric
    /// and string forms; anything outside the code set is
    /// [`Response::Unknown`].
    pub fn response_status(&self, hresp: Option<&SignalValue>) -> Response {
        match hresp.and_then(SignalValue::as_u64) {
            Some(0) => Response::Okay,
            Some(1) => Response::Error,
            Some(2) => Response::Retry,
            Some(3) => Response::Split,
            _ => Response::Unknown,
        }
    }

    /// Pairs an address-phase frame with the following frame.
    ///
    /// A low HREADY in the lookahead frame means the slave inserted
    /// a wait state: the record is emitted with an absent value so
    /// the stalled cycle stays visible in the output. Otherwise the
    /// data phase supplies HRDATA for reads and HWDATA for writes,
    /// falling back to the address-phase HWDATA for buses that
    /// capture write data early.
    pub fn extract_transaction(
        &self,
        frame: &SampleFrame,
        next_frame: Option<&SampleFrame>,
    ) -> Option<RawTransaction> {
        let address = self.signal(frame, "haddr").and_then(SignalValue::as_hex_string)?;
        let operation = self.transaction_type(frame);

        if let Some(next) = next_frame {
            if self.signal(next, "hready").and_then(SignalValue::as_logic) == Some(false) {
                trace!("wait state at t={} addr={}", frame.timestamp, address);
                return Some(RawTransaction {
                    time: frame.timestamp,
                    address,
                    operation,
                    value: None,
                    response: self
                        .signal(next, "hresp")
                        .map(|v| self.response_status(Some(v))),
                    wait_state: true,
                });
            }
        }

        let value = match operation {
            Operation::Write => next_frame
                .and_then(|next| self.signal(next, "hwdata"))
                .or_else(|| self.signal(frame, "hwdata"))
                .and_then(SignalValue::as_hex_string),
            Operation::Read => next_frame
                .and_then(|next| self.signal(next, "hrdata"))
                .and_then(SignalValue::as_hex_string),
        };
        let response = match next_frame.and_then(|next| self.signal(next, "hresp")) {
            Some(hresp) => Some(self.response_status(Some(hresp))),
            // No response line in the stream: the slave cannot
            // signal anything but success.
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
mod hresp_map {
    use super::*;

    #[test]
    fn all_codes_in_both_forms() {
        let ahb = Ahb::new(SignalMapping::identity());
        for (code, expected) in &[
            (0u64, Response::Okay),
            (1, Response::Error),
            (2, Response::Retry),
            (3, Response::Split),
        ] {
            assert_eq!(ahb.response_status(Some(&SignalValue::Int(*code))), *expected);
            assert_eq!(
                ahb.response_status(Some(&SignalValue::Text(code.to_string()))),
                *expected,
            );
        }
        assert_eq!(ahb.response_status(None), Response::Unknown);
        assert_eq!(
            ahb.response_status(Some(&SignalValue::Text("invalid".to_string()))),
            Response::Unknown,
        );
        assert_eq!(ahb.response_status(Some(&SignalValue::Int(7))), Response::Unknown);
    }
}
