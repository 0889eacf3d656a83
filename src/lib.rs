//! # `regtrace`
//!
//! A decoder that extracts register-access transactions from
//! digital-logic simulation waveforms and interprets them against a
//! register-map specification. Per-cycle signal samples go in; a
//! stream of bus transactions with field-level register decoding
//! comes out.
//!
//! Two AMBA bus protocols are recognized out of the box:
//!
//! - [`AHB`](protocol::Ahb): pipelined address/data phases, HTRANS
//!   transfer gating, HREADY wait states, and the four-code HRESP
//!   response map.
//!
//! - [`APB`](protocol::Apb): two-phase setup/access handshake with
//!   PSLVERR error reporting and optional PREADY wait states.
//!
//! Register maps are loaded from IP-XACT XML
//! ([`IpxactRegisterMap`](regmap::IpxactRegisterMap)) or YAML
//! ([`YamlRegisterMap`](regmap::YamlRegisterMap)); any other source
//! can participate by implementing [`RegisterMap`](regmap::RegisterMap).
//!
//! Usage is simple:
//! ```
//! use regtrace::{Extractor, Protocol, SampleFrame, SignalMapping, TransactionDecoder};
//! use regtrace::regmap::YamlRegisterMap;
//!
//! let map = YamlRegisterMap::from_str(
//!     "ctrl:
//!        offset: 0x1000
//!        width: 32
//!        registers:
//!          status:
//!            name: STATUS
//!            offset: 0x0
//!            fields:
//!              ready: { bitoffset: 0, width: 1 }",
//! )?;
//!
//! let frames = vec![
//!     SampleFrame::new(100)
//!         .with("pclk", 1)
//!         .with("psel", 1)
//!         .with("penable", 1)
//!         .with("paddr", "0x1000")
//!         .with("pwrite", 1)
//!         .with("pwdata", "0x1")
//!         .with("prdata", "0x0"),
//!     SampleFrame::new(110).with("pready", 1).with("pslverr", 0),
//! ];
//!
//! let protocol = Protocol::by_name("apb", SignalMapping::default())?;
//! let mut extractor = Extractor::new(frames.into_iter(), protocol);
//! let decoder = TransactionDecoder::new(map);
//! for transaction in extractor.decoded(&decoder) {
//!     let transaction = transaction?;
//!     assert_eq!(transaction.register_info.name, "STATUS");
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
#[deny(rustdoc::broken_intra_doc_links)]
mod decoder;
mod frame;
mod iter;
pub mod protocol;
pub mod regmap;

pub use decoder::TransactionDecoder;
pub use frame::{SampleFrame, SignalValue};
pub use iter::{Decoded, Extractor, Transactions};
pub use protocol::{Protocol, SignalMapping};
pub use regmap::{IpxactRegisterMap, RegisterMap, YamlRegisterMap};

/// Register name reported when no register matches a transaction's
/// address, and name prefix of the placeholder fields synthesized for
/// bit ranges no field definition covers.
pub const UNIDENTIFIED: &str = "unidentified";

/// Direction of a bus access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Operation {
    /// The master sampled data from the slave.
    Read,

    /// The master drove data into the slave.
    Write,
}

/// Completion status of a bus access, as reported by the slave's
/// response signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Response {
    /// The access completed successfully (HRESP `0b00`, PSLVERR low).
    Okay,

    /// The slave flagged the access as failed (HRESP `0b01`, PSLVERR
    /// high).
    Error,

    /// AHB only: the master should retry the access (HRESP `0b10`).
    Retry,

    /// AHB only: the access was split off the bus (HRESP `0b11`).
    Split,

    /// The response lines carried a value outside the protocol's
    /// response code set.
    Unknown,
}

/// One bus access paired up from its address and data/response
/// phases, before register-map interpretation.
///
/// Wait-state records (`wait_state` set) represent address phases
/// whose target was not ready: `value` is absent because the data is
/// unobservable, and `response` is absent unless the response lines
/// were sampled anyway. They are still emitted so the waveform stays
/// faithfully represented.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RawTransaction {
    /// Simulation timestamp of the address phase.
    #[serde(rename = "Time")]
    pub time: u64,

    /// Accessed address, as a `0x`-prefixed hex string.
    #[serde(rename = "Address")]
    pub address: String,

    /// Access direction.
    #[serde(rename = "Operation")]
    pub operation: Operation,

    /// Transferred data word, as a `0x`-prefixed hex string. Absent
    /// for wait-state records and when the data-phase signals were
    /// not observable.
    #[serde(rename = "Value")]
    pub value: Option<String>,

    /// Slave response, when the response lines were sampled.
    #[serde(rename = "Response")]
    pub response: Option<Response>,

    /// Whether the target held the bus in a wait state instead of
    /// completing the access.
    #[serde(rename = "WaitState")]
    pub wait_state: bool,
}

/// One decoded slice of a transaction's data word.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DecodedField {
    /// Field name from the register map, or `unidentified[lo:hi]`
    /// for a bit range no definition covers.
    pub name: String,

    /// Position of the field's least significant bit within the
    /// register.
    pub bit_offset: u32,

    /// Number of bits in the field.
    pub bit_width: u32,

    /// Field value as a `0x`-prefixed uppercase hex string,
    /// zero-padded to `ceil(bit_width / 4)` digits.
    pub value: String,

    /// Whether the register map marks this bit range as reserved.
    /// The value is reported but must not be interpreted.
    pub is_reserved: bool,
}

/// Register-map interpretation of one transaction.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RegisterInfo {
    /// Name of the matched register, or [`UNIDENTIFIED`] when the
    /// map has no register at the transaction's address.
    pub name: String,

    /// Whether the matched register defines at least one field.
    pub has_fields: bool,

    /// Decoded fields in ascending `bit_offset` order. Together they
    /// cover every bit of the register exactly once.
    pub fields: Vec<DecodedField>,
}

/// A [`RawTransaction`] together with its register-map
/// interpretation.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DecodedTransaction {
    /// The underlying bus access.
    #[serde(flatten)]
    pub transaction: RawTransaction,

    /// Field-level interpretation of the transaction's value.
    pub register_info: RegisterInfo,
}

/// Set of errors that abort pipeline setup. Per-frame malformations
/// are not represented here; they fail the recognizer's validity
/// gate and the stream continues.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// A signal the protocol cannot decode without is missing from
    /// the sample stream.
    #[error("protocol {protocol} requires signal {signal:?}, which is missing from the sample stream")]
    MissingSignal {
        /// Protocol that requires the signal.
        protocol: &'static str,

        /// Logical name of the missing signal.
        signal: &'static str,
    },

    /// No recognizer is registered under the requested name.
    #[error("unknown protocol: {0:?}")]
    UnknownProtocol(String),
}

/// Set of errors that can occur while loading a register map. All of
/// them are fatal at load time; the resolver never comes up.
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    /// The map file could not be read.
    #[error("failed to read register map: {0}")]
    Io(#[from] std::io::Error),

    /// The map file is not well-formed XML.
    #[error("register map XML is malformed: {0}")]
    Xml(#[from] quick_xml::Error),

    /// The map file is not well-formed YAML.
    #[error("register map YAML is malformed: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The map file parsed but does not describe a valid register
    /// map.
    #[error("register map is invalid: {0}")]
    Schema(String),
}
