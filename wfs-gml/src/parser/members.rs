//! Lecture d'un membre de collection : attributs aplatis et géométrie
//!
//! Règles d'aplatissement :
//! - un élément feuille `<ns:nom>valeur</ns:nom>` donne l'attribut `nom` ;
//! - un élément composé donne `{propriété}_{feuille}` pour chacune de ses feuilles
//!   (ex: `inspireId/Identifier/localId` → `inspireId_localId`) ;
//! - un élément vide porte sa valeur dans `xlink:href` s'il existe, sinon `""` ;
//! - le `gml:id` de la feature est exposé comme attribut `gml_id`.

use geo::Geometry;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::geometry::{is_geometry_root, read_geometry};
use super::{attribute, local_name};
use crate::types::{Feature, ParseOptions};
use crate::GmlError;

/// Géométrie candidate rencontrée dans une propriété
struct Candidate {
    property: String,
    geometry: Result<Geometry, String>,
}

/// Lit une feature dont l'élément ouvrant vient d'être lu.
///
/// L'erreur externe est une erreur XML (fatale pour le document), l'erreur
/// interne concerne uniquement cette feature.
pub fn read_feature(
    reader: &mut Reader<&[u8]>,
    start: &BytesStart,
    options: &ParseOptions,
) -> Result<Result<Feature, GmlError>, quick_xml::Error> {
    let id = attribute(start, b"id");
    let feature_type = String::from_utf8_lossy(start.name().as_ref()).into_owned();

    let mut properties: Vec<(String, String)> = Vec::new();
    if let Some(id) = &id {
        properties.push(("gml_id".to_string(), id.clone()));
    }
    let mut candidates: Vec<Candidate> = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = local_name(&e);
                read_property(reader, &name, options, &mut properties, &mut candidates)?;
            }
            Event::Empty(e) => {
                let value = attribute(&e, b"href").unwrap_or_default();
                properties.push((local_name(&e), value));
            }
            Event::End(_) => break,
            Event::Eof => return Err(quick_xml::Error::UnexpectedEof(feature_type)),
            _ => {}
        }
    }

    let label = id.clone().unwrap_or_else(|| feature_type.clone());
    let geometry = match pick_geometry(candidates, &options.geometry_property) {
        Some(Ok(geometry)) => geometry,
        Some(Err(reason)) => return Ok(Err(GmlError::invalid_geometry(label, reason))),
        None => {
            return Ok(Err(GmlError::invalid_geometry(
                label,
                "feature without geometry",
            )))
        }
    };

    Ok(Ok(Feature {
        id,
        feature_type,
        properties,
        geometry,
    }))
}

/// Lit une propriété de la feature jusqu'à sa fermeture
fn read_property(
    reader: &mut Reader<&[u8]>,
    property: &str,
    options: &ParseOptions,
    properties: &mut Vec<(String, String)>,
    candidates: &mut Vec<Candidate>,
) -> Result<(), quick_xml::Error> {
    // pile des éléments ouverts sous la propriété
    let mut stack: Vec<String> = Vec::new();
    let mut text = String::new();
    let mut saw_child = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = local_name(&e);
                if is_geometry_root(&name) {
                    let geometry = read_geometry(reader, &e, options.axis_order)?;
                    candidates.push(Candidate {
                        property: property.to_string(),
                        geometry,
                    });
                    saw_child = true;
                    continue;
                }
                saw_child = true;
                text.clear();
                stack.push(name);
            }
            Event::Empty(e) => {
                saw_child = true;
                let value = attribute(&e, b"href").unwrap_or_default();
                properties.push((nested_key(property, &local_name(&e)), value));
            }
            Event::Text(t) => {
                text.push_str(&t.unescape()?);
            }
            Event::CData(c) => {
                text.push_str(&String::from_utf8_lossy(&c));
            }
            Event::End(_) => match stack.pop() {
                Some(leaf) => {
                    if !text.is_empty() {
                        properties.push((nested_key(property, &leaf), std::mem::take(&mut text)));
                    }
                }
                None => {
                    if !saw_child {
                        properties.push((property.to_string(), std::mem::take(&mut text)));
                    }
                    return Ok(());
                }
            },
            Event::Eof => return Err(quick_xml::Error::UnexpectedEof(property.to_string())),
            _ => {}
        }
    }
}

fn nested_key(property: &str, leaf: &str) -> String {
    format!("{}_{}", property, leaf)
}

/// Géométrie de la propriété désignée, sinon la première géométrie valide
fn pick_geometry(
    candidates: Vec<Candidate>,
    designated: &str,
) -> Option<Result<Geometry, String>> {
    let mut first_error = None;
    let mut first_valid = None;

    for candidate in candidates {
        if candidate.property.eq_ignore_ascii_case(designated) {
            return Some(candidate.geometry);
        }
        match candidate.geometry {
            Ok(g) if first_valid.is_none() => first_valid = Some(g),
            Err(reason) if first_error.is_none() => first_error = Some(reason),
            _ => {}
        }
    }

    match (first_valid, first_error) {
        (Some(g), _) => Some(Ok(g)),
        (None, Some(reason)) => Some(Err(reason)),
        (None, None) => None,
    }
}
