//! Parsing des réponses WFS GetFeature (GML 3.2)
//!
//! - `exception` : détection des rapports d'exception OWS
//! - `coords` : listes de coordonnées
//! - `geometry` : construction des géométries
//! - `members` : attributs et géométrie d'une feature

pub mod coords;
pub mod exception;
pub mod geometry;
pub mod members;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::types::{ParseOptions, ParseResult};
use crate::GmlError;

/// Éléments enveloppant les features d'une collection (WFS 2.0 et GML 2/3.1)
const MEMBER_ELEMENTS: &[&str] = &["member", "featureMember", "featureMembers"];

/// Nom local (sans préfixe d'espace de noms) d'un élément
pub(crate) fn local_name(e: &BytesStart) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

/// Valeur d'un attribut par nom local (`gml:id` → `id`, `xlink:href` → `href`)
pub(crate) fn attribute(e: &BytesStart, name: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == name)
        .and_then(|a| a.unescape_value().ok())
        .map(|v| v.into_owned())
}

/// Parse un document `wfs:FeatureCollection` déjà décodé en UTF-8
pub fn parse_document(text: &str, options: &ParseOptions) -> Result<ParseResult, GmlError> {
    let mut reader = Reader::from_str(text);
    reader.trim_text(true);

    let mut result = ParseResult::default();

    // Élément racine
    loop {
        match reader.read_event().map_err(|e| xml_err(&reader, e))? {
            Event::Start(e) => {
                let root = local_name(&e);
                if root != "FeatureCollection" {
                    return Err(GmlError::UnexpectedRoot(root));
                }
                result.number_matched = count_attribute(&e, b"numberMatched");
                result.number_returned = count_attribute(&e, b"numberReturned");
                break;
            }
            Event::Empty(e) => {
                let root = local_name(&e);
                if root != "FeatureCollection" {
                    return Err(GmlError::UnexpectedRoot(root));
                }
                result.number_matched = count_attribute(&e, b"numberMatched");
                result.number_returned = count_attribute(&e, b"numberReturned");
                return Ok(result);
            }
            Event::Eof => return Err(GmlError::xml(reader.buffer_position(), "empty document")),
            _ => {}
        }
    }

    // Membres de la collection
    let mut depth = 0usize;
    loop {
        match reader.read_event().map_err(|e| xml_err(&reader, e))? {
            Event::Start(e) => {
                let name = local_name(&e);
                if MEMBER_ELEMENTS.contains(&name.as_str()) {
                    depth += 1;
                } else if depth > 0 {
                    let feature = members::read_feature(&mut reader, &e, options)
                        .map_err(|err| xml_err(&reader, err))?;
                    match feature {
                        Ok(feature) => result.features.push(feature),
                        Err(err) => {
                            tracing::debug!("Feature ignorée: {}", err);
                            result.errors.push(err);
                        }
                    }
                } else {
                    // boundedBy, additionalObjects...
                    let end = e.to_end().into_owned();
                    reader
                        .read_to_end(end.name())
                        .map_err(|err| xml_err(&reader, err))?;
                }
            }
            Event::End(_) => {
                if depth == 0 {
                    break;
                }
                depth -= 1;
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(result)
}

fn xml_err(reader: &Reader<&[u8]>, e: quick_xml::Error) -> GmlError {
    GmlError::xml(reader.buffer_position(), e.to_string())
}

/// `numberMatched="unknown"` est valide en WFS 2.0 et donne `None`
fn count_attribute(e: &BytesStart, name: &[u8]) -> Option<u64> {
    attribute(e, name).and_then(|v| v.trim().parse().ok())
}
