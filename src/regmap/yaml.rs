//! YAML register-map loader.
//!
//! The document is a mapping of address blocks, each with an
//! `offset`, an optional default `width`, and its `registers`;
//! registers carry an `offset`, an optional `size`, and `fields`
//! keyed by name with `bitoffset`/`width`. Numeric values may be
//! plain integers or quoted `0x` hex strings.

use std::collections::BTreeMap;
use std::path::Path;

use log::debug;

use super::{infer_reserved, parse_number, to_u32, AddressMap, FieldDefinition, RegisterDefinition};
use crate::{MapError, RegisterMap};

/// Register map parsed from a YAML file.
#[derive(Debug, Clone, Default)]
pub struct YamlRegisterMap {
    registers: AddressMap,
}

/// A number that may appear as a YAML integer or as quoted text.
#[derive(Debug, serde::Deserialize)]
#[serde(untagged)]
enum Number {
    Int(u64),
    Text(String),
}

impl Number {
    fn value(&self) -> Result<u64, MapError> {
        match self {
            Number::Int(v) => Ok(*v),
            Number::Text(s) => parse_number(s),
        }
    }

    fn value_u32(&self) -> Result<u32, MapError> {
        to_u32(self.value()?)
    }
}

#[derive(Debug, serde::Deserialize)]
struct FieldDoc {
    bitoffset: Number,
    width: Number,
    #[serde(default)]
    is_reserved: Option<bool>,
    #[serde(default)]
    access: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
struct RegisterDoc {
    #[serde(default)]
    name: Option<String>,
    offset: Number,
    #[serde(default)]
    size: Option<Number>,
    #[serde(default)]
    fields: BTreeMap<String, FieldDoc>,
}

#[derive(Debug, serde::Deserialize)]
struct BlockDoc {
    #[serde(default)]
    offset: Option<Number>,
    #[serde(default)]
    width: Option<Number>,
    #[serde(default)]
    registers: BTreeMap<String, RegisterDoc>,
}

impl YamlRegisterMap {
    /// Loads a register map from a YAML file.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<YamlRegisterMap, MapError> {
        Self::from_str(&std::fs::read_to_string(path)?)
    }

    /// Parses a register map from YAML text.
    pub fn from_str(yaml: &str) -> Result<YamlRegisterMap, MapError> {
        let document: BTreeMap<String, BlockDoc> = serde_yaml::from_str(yaml)?;

        let mut registers = AddressMap::new();
        for (block_name, block) in document {
            let base = match &block.offset {
                Some(n) => n.value()?,
                None => 0,
            };
            let block_width = match &block.width {
                Some(n) => Some(n.value_u32()?),
                None => None,
            };
            for (key, reg) in block.registers {
                // A register that does not declare its own size
                // takes the enclosing block's width.
                let size = match &reg.size {
                    Some(n) => n.value_u32()?,
                    None => block_width.ok_or_else(|| {
                        MapError::Schema(format!(
                            "register {:?} has no size and block {:?} has no width",
                            key, block_name
                        ))
                    })?,
                };
                let mut fields = Vec::with_capacity(reg.fields.len());
                for (field_name, field) in reg.fields {
                    let is_reserved =
                        infer_reserved(&field_name, field.access.as_deref(), field.is_reserved);
                    fields.push(FieldDefinition {
                        name: field_name,
                        bit_offset: field.bitoffset.value_u32()?,
                        bit_width: field.width.value_u32()?,
                        is_reserved,
                    });
                }
                registers.insert(RegisterDefinition {
                    name: reg.name.unwrap_or(key),
                    full_address: base + reg.offset.value()?,
                    size,
                    fields,
                });
            }
        }

        debug!("loaded {} registers from YAML map", registers.len());
        Ok(YamlRegisterMap { registers })
    }
}

impl RegisterMap for YamlRegisterMap {
    fn find_register_by_address(&self, address: u64) -> Option<&RegisterDefinition> {
        self.registers.find_register_by_address(address)
    }
}
