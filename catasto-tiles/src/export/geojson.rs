//! Export GeoJSON en streaming (geozero)

use std::io::Write;

use anyhow::{Context, Result};
use geozero::geojson::GeoJsonWriter;
use geozero::GeozeroGeometry;
use tracing::info;

use super::{selected, ResultSink, SinkOptions};
use crate::lookup::expand_reference;
use crate::report::AcquisitionReport;
use crate::types::{Attributes, Crs, ReconciledFeature};

/// Écrit une FeatureCollection unique sur `W` (stdout pour la CLI)
pub struct GeoJsonSink<W: Write> {
    writer: W,
    crs: Crs,
    options: SinkOptions,
}

impl<W: Write> GeoJsonSink<W> {
    pub fn new(writer: W, crs: Crs, options: SinkOptions) -> Self {
        Self {
            writer,
            crs,
            options,
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> ResultSink for GeoJsonSink<W> {
    fn write(
        &mut self,
        features: &[ReconciledFeature],
        report: &AcquisitionReport,
    ) -> Result<usize> {
        // Header FeatureCollection avec CRS
        write!(
            self.writer,
            r#"{{"type":"FeatureCollection","crs":{{"type":"name","properties":{{"name":"{}"}}}},"features":["#,
            self.crs.urn()
        )?;

        let mut written = 0;
        for feature in selected(features, &self.options) {
            if written > 0 {
                write!(self.writer, ",")?;
            }
            write_feature(&mut self.writer, feature, self.options.expand_reference)
                .context(format!("Failed to write feature {}", feature.feature.identity_key))?;
            written += 1;
        }

        writeln!(self.writer, "]}}")?;
        self.writer.flush()?;

        info!(
            written,
            status = ?report.status,
            "GeoJSON écrit"
        );
        Ok(written)
    }
}

/// Écrit une feature : attributs d'origine puis marquage des doublons
fn write_feature<W: Write>(
    writer: &mut W,
    feature: &ReconciledFeature,
    expand: bool,
) -> Result<()> {
    let raw = &feature.feature;
    write!(
        writer,
        r#"{{"type":"Feature","id":"{}","#,
        escape_json(&raw.identity_key)
    )?;

    write!(writer, r#""geometry":"#)?;
    let mut geom_buf = Vec::new();
    let mut geom_writer = GeoJsonWriter::new(&mut geom_buf);
    raw.geometry.process_geom(&mut geom_writer)?;
    writer.write_all(&geom_buf)?;

    write!(writer, r#","properties":{{"#)?;
    let expanded;
    let attributes: &Attributes = if expand {
        let mut copy = raw.attributes.clone();
        expand_reference(&mut copy);
        expanded = copy;
        &expanded
    } else {
        &raw.attributes
    };
    for (key, value) in attributes.iter() {
        write!(
            writer,
            r#""{}":"{}","#,
            escape_json(key),
            escape_json(value)
        )?;
    }
    write!(
        writer,
        r#""is_duplicate_geometry":{},"duplicate_group_id":"#,
        feature.is_duplicate_geometry
    )?;
    match feature.duplicate_group_id {
        Some(id) => write!(writer, "{}", id)?,
        None => write!(writer, "null")?,
    }
    write!(writer, "}}}}")?;

    Ok(())
}

/// Échappe une chaîne pour JSON
fn escape_json(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '"' => result.push_str("\\\""),
            '\\' => result.push_str("\\\\"),
            '\n' => result.push_str("\\n"),
            '\r' => result.push_str("\\r"),
            '\t' => result.push_str("\\t"),
            c if c.is_control() => {
                result.push_str(&format!("\\u{:04x}", c as u32));
            }
            c => result.push(c),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RawFeature;
    use geo::{polygon, Geometry};

    fn feature(key: &str, group: Option<u32>) -> ReconciledFeature {
        ReconciledFeature {
            feature: RawFeature {
                identity_key: key.to_string(),
                attributes: Attributes::from(vec![
                    ("gml_id".to_string(), key.to_string()),
                    (
                        "nationalCadastralReference".to_string(),
                        "H501D001200.45".to_string(),
                    ),
                    ("label".to_string(), "45 \"bis\"".to_string()),
                ]),
                geometry: Geometry::Polygon(polygon![
                    (x: 12.0, y: 41.0), (x: 12.001, y: 41.0), (x: 12.0, y: 41.001), (x: 12.0, y: 41.0)
                ]),
            },
            is_duplicate_geometry: group.is_some(),
            duplicate_group_id: group,
        }
    }

    fn render(features: &[ReconciledFeature], options: SinkOptions) -> (usize, serde_json::Value) {
        let mut sink = GeoJsonSink::new(Vec::new(), Crs::RDN2008, options);
        let written = sink.write(features, &AcquisitionReport::new()).unwrap();
        let json = serde_json::from_slice(&sink.into_inner()).unwrap();
        (written, json)
    }

    #[test]
    fn test_collection_is_valid_json() {
        let (written, json) = render(
            &[feature("A1", Some(1)), feature("A2", None)],
            SinkOptions::default(),
        );
        assert_eq!(written, 2);
        assert_eq!(json["type"], "FeatureCollection");
        assert_eq!(json["crs"]["properties"]["name"], "urn:ogc:def:crs:EPSG::6706");

        let first = &json["features"][0];
        assert_eq!(first["id"], "A1");
        assert_eq!(first["geometry"]["type"], "Polygon");
        assert_eq!(first["properties"]["label"], "45 \"bis\"");
        assert_eq!(first["properties"]["is_duplicate_geometry"], true);
        assert_eq!(first["properties"]["duplicate_group_id"], 1);
        assert!(json["features"][1]["properties"]["duplicate_group_id"].is_null());
    }

    #[test]
    fn test_only_duplicates() {
        let options = SinkOptions {
            only_duplicates: true,
            ..Default::default()
        };
        let (written, json) = render(&[feature("A1", Some(1)), feature("A2", None)], options);
        assert_eq!(written, 1);
        assert_eq!(json["features"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_expand_reference() {
        let options = SinkOptions {
            expand_reference: true,
            ..Default::default()
        };
        let (_, json) = render(&[feature("A1", None)], options);
        let props = &json["features"][0]["properties"];
        assert_eq!(props["sezione"], "D");
        assert_eq!(props["foglio"], "12");
        assert_eq!(props["allegato"], "0");
        assert_eq!(props["sviluppo"], "0");
    }

    #[test]
    fn test_escape_json() {
        assert_eq!(escape_json("hello"), "hello");
        assert_eq!(escape_json("hello\"world"), "hello\\\"world");
        assert_eq!(escape_json("line\nbreak"), "line\\nbreak");
    }
}
