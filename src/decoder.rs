//! Register-field decoding of extracted transactions.
//!
//! The decoder resolves a transaction's address against a register
//! map and splits its data word into the register's fields. Values
//! are kept as bit vectors rather than machine integers, so a
//! 128-bit (or wider) register decodes exactly like an 8-bit one.
//! Bit ranges the map does not cover are reported as synthesized
//! `unidentified[lo:hi]` placeholder fields; together with the
//! defined fields they tile the register completely, which makes the
//! decoded form lossless.

use bitvec::prelude::*;
use log::trace;

use crate::regmap::{RegisterDefinition, RegisterMap};
use crate::{DecodedField, DecodedTransaction, RawTransaction, RegisterInfo, UNIDENTIFIED};

/// Decodes [`RawTransaction`]s against a register map.
pub struct TransactionDecoder<M> {
    map: M,
}

impl<M> TransactionDecoder<M>
where
    M: RegisterMap,
{
    /// Creates a decoder over the given resolver.
    pub fn new(map: M) -> TransactionDecoder<M> {
        TransactionDecoder { map }
    }

    /// Returns a reference to the underlying register map.
    pub fn get_ref(&self) -> &M {
        &self.map
    }

    /// Attaches the register-map interpretation to a transaction.
    ///
    /// A resolver miss is not an error: the whole value is reported
    /// as a single unidentified range. A transaction without a value
    /// (a wait state) carries the resolved register name but no
    /// fields.
    pub fn decode(&self, transaction: RawTransaction) -> DecodedTransaction {
        let register = parse_address(&transaction.address)
            .and_then(|address| self.map.find_register_by_address(address));

        let register_info = match (register, transaction.value.as_deref()) {
            (Some(register), Some(value)) => self.decode_register(register, value),
            (Some(register), None) => RegisterInfo {
                name: self.map.register_name(register).to_string(),
                has_fields: false,
                fields: Vec::new(),
            },
            (None, Some(value)) => {
                trace!("no register at {}", transaction.address);
                unidentified_value(value)
            }
            (None, None) => RegisterInfo {
                name: UNIDENTIFIED.to_string(),
                has_fields: false,
                fields: Vec::new(),
            },
        };

        DecodedTransaction {
            transaction,
            register_info,
        }
    }

    fn decode_register(&self, register: &RegisterDefinition, value: &str) -> RegisterInfo {
        let name = self.map.register_name(register).to_string();
        let width = register.size as usize;
        let bits = match parse_hex_bits(value, width) {
            Some(bits) => bits,
            None => {
                return RegisterInfo {
                    name,
                    has_fields: false,
                    fields: Vec::new(),
                }
            }
        };

        let mut fields = Vec::with_capacity(register.fields.len() + 1);
        let mut covered: BitVec<usize, Lsb0> = BitVec::repeat(false, width);
        for definition in &register.fields {
            let lo = (definition.bit_offset as usize).min(width);
            let hi = (lo + definition.bit_width as usize).min(width);
            fields.push(DecodedField {
                name: definition.name.clone(),
                bit_offset: definition.bit_offset,
                bit_width: definition.bit_width,
                value: hex_digits(&bits[lo..hi], digits_for(definition.bit_width as usize)),
                is_reserved: definition.is_reserved,
            });
            for i in lo..hi {
                covered.set(i, true);
            }
        }

        // Every maximal uncovered run becomes a placeholder field,
        // so the decoded fields tile [0, width) exactly.
        let mut run_start = None;
        for i in 0..=width {
            let in_gap = i < width && !covered[i];
            match (in_gap, run_start) {
                (true, None) => run_start = Some(i),
                (false, Some(lo)) => {
                    fields.push(unidentified_field(&bits, lo, i - 1));
                    run_start = None;
                }
                _ => {}
            }
        }

        // Stable sort: definition order breaks ties, though defined
        // fields never overlap in a well-formed map.
        fields.sort_by_key(|f| f.bit_offset);

        RegisterInfo {
            name,
            has_fields: !register.fields.is_empty(),
            fields,
        }
    }
}

/// The whole-value placeholder used when no register matches the
/// address: one unidentified range as wide as the value's hex
/// digits.
fn unidentified_value(value: &str) -> RegisterInfo {
    let width = hex_width(value);
    let fields = match parse_hex_bits(value, width) {
        Some(bits) if width > 0 => vec![unidentified_field(&bits, 0, width - 1)],
        _ => Vec::new(),
    };
    RegisterInfo {
        name: UNIDENTIFIED.to_string(),
        has_fields: false,
        fields,
    }
}

fn unidentified_field(bits: &BitSlice<usize, Lsb0>, lo: usize, hi: usize) -> DecodedField {
    let width = hi - lo + 1;
    DecodedField {
        name: format!("{}[{}:{}]", UNIDENTIFIED, lo, hi),
        bit_offset: lo as u32,
        bit_width: width as u32,
        value: hex_digits(&bits[lo..hi + 1], digits_for(width)),
        is_reserved: false,
    }
}

fn parse_address(address: &str) -> Option<u64> {
    let address = address.trim();
    let digits = address
        .strip_prefix("0x")
        .or_else(|| address.strip_prefix("0X"))
        .unwrap_or(address);
    u64::from_str_radix(digits, 16).ok()
}

/// Bit width implied by a hex string's digit count.
fn hex_width(value: &str) -> usize {
    let value = value.trim();
    let digits = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value);
    digits.len() * 4
}

/// Parses a hex string into `width` bits, least significant bit
/// first. Digits beyond `width` are masked off; missing digits are
/// zero. Returns `None` on a non-hex digit.
fn parse_hex_bits(value: &str, width: usize) -> Option<BitVec<usize, Lsb0>> {
    let value = value.trim();
    let digits = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value);
    if digits.is_empty() {
        return None;
    }
    let mut bits: BitVec<usize, Lsb0> = BitVec::repeat(false, width);
    for (i, c) in digits.chars().rev().enumerate() {
        let nibble = c.to_digit(16)? as usize;
        for b in 0..4 {
            let position = i * 4 + b;
            if position < width && nibble & (1 << b) != 0 {
                bits.set(position, true);
            }
        }
    }
    Some(bits)
}

/// Hex digit count a field of `bit_width` bits zero-pads to.
fn digits_for(bit_width: usize) -> usize {
    (bit_width + 3) / 4
}

/// Renders a bit slice as `0x`-prefixed uppercase hex, zero-padded
/// to `digits`.
fn hex_digits(bits: &BitSlice<usize, Lsb0>, digits: usize) -> String {
    const HEX: &[u8; 16] = b"0123456789ABCDEF";
    let mut out = String::with_capacity(2 + digits);
    out.push_str("0x");
    for d in (0..digits).rev() {
        let mut nibble = 0usize;
        for b in 0..4 {
            let i = d * 4 + b;
            if i < bits.len() && bits[i] {
                nibble |= 1 << b;
            }
        }
        out.push(HEX[nibble] as char);
    }
    out
}
