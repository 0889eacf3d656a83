//! IP-XACT register-map loader.
//!
//! Reads the `ipxact:memoryMap / addressBlock / register / field`
//! hierarchy out of an IP-XACT component file. The scan is a
//! streaming event walk that matches on local element names, so it
//! accepts any namespace prefix (or none). Only the subset of the
//! schema the decoder needs is interpreted; everything else is
//! skipped.

use std::path::Path;

use log::debug;
use quick_xml::events::Event;
use quick_xml::Reader;

use super::{infer_reserved, parse_number, parse_u32, AddressMap, FieldDefinition, RegisterDefinition};
use crate::{MapError, RegisterMap};

/// Register map parsed from an IP-XACT component file.
#[derive(Debug, Clone, Default)]
pub struct IpxactRegisterMap {
    registers: AddressMap,
}

#[derive(Default)]
struct FieldCtx {
    name: Option<String>,
    bit_offset: Option<u32>,
    bit_width: Option<u32>,
    access: Option<String>,
}

#[derive(Default)]
struct RegisterCtx {
    name: Option<String>,
    offset: Option<u64>,
    size: Option<u32>,
    fields: Vec<FieldDefinition>,
}

#[derive(Default)]
struct BlockCtx {
    base_address: Option<u64>,
    width: Option<u32>,
    registers: Vec<RegisterCtx>,
}

impl IpxactRegisterMap {
    /// Loads a register map from an IP-XACT file.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<IpxactRegisterMap, MapError> {
        Self::from_str(&std::fs::read_to_string(path)?)
    }

    /// Parses a register map from IP-XACT XML text.
    pub fn from_str(xml: &str) -> Result<IpxactRegisterMap, MapError> {
        let mut reader = Reader::from_str(xml);
        reader.trim_text(true);

        let mut registers = AddressMap::new();
        let mut block: Option<BlockCtx> = None;
        let mut register: Option<RegisterCtx> = None;
        let mut field: Option<FieldCtx> = None;
        let mut text = String::new();

        loop {
            match reader.read_event()? {
                Event::Start(e) => {
                    text.clear();
                    match e.local_name().as_ref() {
                        b"addressBlock" => block = Some(BlockCtx::default()),
                        b"register" if block.is_some() => {
                            register = Some(RegisterCtx::default())
                        }
                        b"field" if register.is_some() => field = Some(FieldCtx::default()),
                        _ => {}
                    }
                }
                Event::Text(t) => {
                    text = t.unescape()?.into_owned();
                }
                Event::End(e) => match e.local_name().as_ref() {
                    b"name" => {
                        if let Some(f) = field.as_mut() {
                            f.name.get_or_insert_with(|| text.clone());
                        } else if let Some(r) = register.as_mut() {
                            r.name.get_or_insert_with(|| text.clone());
                        }
                    }
                    b"baseAddress" => {
                        if let (Some(b), None) = (block.as_mut(), register.as_ref()) {
                            b.base_address = Some(parse_number(&text)?);
                        }
                    }
                    b"width" => {
                        if let (Some(b), None) = (block.as_mut(), register.as_ref()) {
                            b.width = Some(parse_u32(&text)?);
                        }
                    }
                    b"addressOffset" => {
                        if let (Some(r), None) = (register.as_mut(), field.as_ref()) {
                            r.offset = Some(parse_number(&text)?);
                        }
                    }
                    b"size" => {
                        if let (Some(r), None) = (register.as_mut(), field.as_ref()) {
                            r.size = Some(parse_u32(&text)?);
                        }
                    }
                    b"access" => {
                        if let Some(f) = field.as_mut() {
                            f.access = Some(text.clone());
                        }
                    }
                    b"bitOffset" => {
                        if let Some(f) = field.as_mut() {
                            f.bit_offset = Some(parse_u32(&text)?);
                        }
                    }
                    b"bitWidth" => {
                        if let Some(f) = field.as_mut() {
                            f.bit_width = Some(parse_u32(&text)?);
                        }
                    }
                    b"field" => {
                        if let (Some(f), Some(r)) = (field.take(), register.as_mut()) {
                            r.fields.push(finish_field(f)?);
                        }
                    }
                    b"register" => {
                        if let (Some(r), Some(b)) = (register.take(), block.as_mut()) {
                            b.registers.push(r);
                        }
                    }
                    b"addressBlock" => {
                        if let Some(b) = block.take() {
                            finish_block(b, &mut registers)?;
                        }
                    }
                    _ => {}
                },
                Event::Eof => break,
                _ => {}
            }
        }

        debug!("loaded {} registers from IP-XACT map", registers.len());
        Ok(IpxactRegisterMap { registers })
    }
}

fn finish_field(ctx: FieldCtx) -> Result<FieldDefinition, MapError> {
    let name = ctx
        .name
        .ok_or_else(|| MapError::Schema("field without a name".to_string()))?;
    let bit_offset = ctx
        .bit_offset
        .ok_or_else(|| MapError::Schema(format!("field {:?} has no bitOffset", name)))?;
    let bit_width = ctx
        .bit_width
        .ok_or_else(|| MapError::Schema(format!("field {:?} has no bitWidth", name)))?;
    let is_reserved = infer_reserved(&name, ctx.access.as_deref(), None);
    Ok(FieldDefinition {
        name,
        bit_offset,
        bit_width,
        is_reserved,
    })
}

fn finish_block(block: BlockCtx, registers: &mut AddressMap) -> Result<(), MapError> {
    let base = block.base_address.unwrap_or(0);
    for reg in block.registers {
        let name = reg
            .name
            .ok_or_else(|| MapError::Schema("register without a name".to_string()))?;
        let offset = reg
            .offset
            .ok_or_else(|| MapError::Schema(format!("register {:?} has no addressOffset", name)))?;
        // A register that does not declare its own size takes the
        // enclosing block's width.
        let size = reg.size.or(block.width).ok_or_else(|| {
            MapError::Schema(format!(
                "register {:?} has no size and its block has no width",
                name
            ))
        })?;
        registers.insert(RegisterDefinition {
            name,
            full_address: base + offset,
            size,
            fields: reg.fields,
        });
    }
    Ok(())
}

impl RegisterMap for IpxactRegisterMap {
    fn find_register_by_address(&self, address: u64) -> Option<&RegisterDefinition> {
        self.registers.find_register_by_address(address)
    }
}
