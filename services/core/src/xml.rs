//! `edificio` XML serialization.
//!
//! Element names and order are a fixed external contract. The document is
//! written without indentation, declaration and root on the same line.
//! Characters XML 1.0 does not allow (C0 controls other than tab, newline and
//! carriage return, plus U+FFFE and U+FFFF) are dropped from text content.

use std::borrow::Cow;
use std::io::Write;

use quick_xml::escape::partial_escape;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::error::{GeradorError, Result};
use crate::mapper::{Address, BuildingRecord, Party};

pub const ROOT_ELEMENT: &str = "edificio";
pub const SCHEMA_TIPO: &str = "M";
pub const SCHEMA_VERSAO: &str = "7.9.2";

/// Text written for a coordinate that could not be parsed.
pub const NULL_COORDINATE: &str = "";

/// Shortest round-trip decimal, always with a fractional part (`-47.0`).
pub fn format_coordinate(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{v:?}"),
        None => NULL_COORDINATE.to_string(),
    }
}

/// Serialize one record to a complete UTF-8 document.
pub fn to_xml(record: &BuildingRecord) -> Result<Vec<u8>> {
    let mut xml = Writer::new(Vec::new());
    write_edificio(&mut xml, record).map_err(|e| GeradorError::Xml(e.to_string()))?;
    Ok(xml.into_inner())
}

fn write_edificio<W: Write>(xml: &mut Writer<W>, record: &BuildingRecord) -> quick_xml::Result<()> {
    xml.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let mut root = BytesStart::new(ROOT_ELEMENT);
    root.push_attribute(("tipo", SCHEMA_TIPO));
    root.push_attribute(("versao", SCHEMA_VERSAO));
    xml.write_event(Event::Start(root))?;

    write_text_element(xml, "gravado", "false")?;
    write_text_element(xml, "nEdificio", &record.building_id)?;
    write_text_element(xml, "coordX", &format_coordinate(record.longitude))?;
    write_text_element(xml, "coordY", &format_coordinate(record.latitude))?;
    write_text_element(xml, "codigoZona", &record.zone)?;
    write_text_element(xml, "nomeZona", &record.zone)?;
    write_text_element(xml, "localidade", &record.locality)?;
    write_address(xml, &record.address)?;
    write_party(xml, "tecnico", record.technician)?;
    write_party(xml, "empresa", record.company)?;
    write_text_element(xml, "data", &record.generated_at)?;
    write_text_element(xml, "totalUCs", &record.unit_count.to_string())?;
    write_text_element(xml, "ocupacao", record.occupancy)?;
    write_text_element(xml, "numPisos", record.floor_count)?;
    write_text_element(xml, "destinacao", record.destination.as_str())?;

    xml.write_event(Event::End(BytesEnd::new(ROOT_ELEMENT)))?;
    Ok(())
}

fn write_address<W: Write>(xml: &mut Writer<W>, address: &Address) -> quick_xml::Result<()> {
    xml.write_event(Event::Start(BytesStart::new("enderecoEdificio")))?;
    write_text_element(xml, "id", &address.id)?;
    write_text_element(xml, "logradouro", &address.street_line)?;
    write_text_element(xml, "numero_fachada", &address.facade_number)?;
    for (slot, complement) in address.complements.iter().enumerate() {
        let n = slot + 1;
        write_text_element(xml, &format!("id_complemento{n}"), &complement.code.to_string())?;
        write_text_element(xml, &format!("argumento{n}"), &complement.argument)?;
    }
    write_text_element(xml, "cep", &address.postal_code)?;
    write_text_element(xml, "bairro", &address.neighborhood)?;
    write_text_element(xml, "id_roteiro", &address.route_id)?;
    write_text_element(xml, "id_localidade", &address.locality_id)?;
    write_text_element(xml, "cod_lograd", &address.street_code)?;
    xml.write_event(Event::End(BytesEnd::new("enderecoEdificio")))?;
    Ok(())
}

fn write_party<W: Write>(xml: &mut Writer<W>, name: &str, party: Party) -> quick_xml::Result<()> {
    xml.write_event(Event::Start(BytesStart::new(name)))?;
    write_text_element(xml, "id", party.id)?;
    write_text_element(xml, "nome", party.name)?;
    xml.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

/// True for characters in the XML 1.0 `Char` production.
fn is_xml_char(c: char) -> bool {
    matches!(
        c,
        '\t' | '\n' | '\r' | '\u{20}'..='\u{D7FF}' | '\u{E000}'..='\u{FFFD}' | '\u{10000}'..='\u{10FFFF}'
    )
}

fn strip_invalid_chars(text: &str) -> Cow<'_, str> {
    if text.chars().all(is_xml_char) {
        Cow::Borrowed(text)
    } else {
        Cow::Owned(text.chars().filter(|&c| is_xml_char(c)).collect())
    }
}

/// Only `&`, `<` and `>` are escaped in text content, after invalid characters are dropped.
fn write_text_element<W: Write>(xml: &mut Writer<W>, name: &str, text: &str) -> quick_xml::Result<()> {
    let text = strip_invalid_chars(text);
    xml.write_event(Event::Start(BytesStart::new(name)))?;
    xml.write_event(Event::Text(BytesText::from_escaped(partial_escape(&text))))?;
    xml.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}
