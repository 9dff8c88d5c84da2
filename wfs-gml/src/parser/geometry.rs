//! Construction des géométries `geo` depuis le GML
//!
//! Le lecteur consomme tout le sous-arbre de l'élément géométrique, même en cas
//! d'erreur, pour que le parsing du document puisse continuer à la feature suivante.

use geo::{
    Coord, Geometry, LineString, MultiLineString, MultiPoint, MultiPolygon, Point, Polygon,
};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::coords;
use super::local_name;
use crate::types::AxisOrder;

/// Éléments GML reconnus comme racine d'une géométrie
const GEOMETRY_ROOTS: &[&str] = &[
    "Point",
    "LineString",
    "Curve",
    "Polygon",
    "Surface",
    "MultiSurface",
    "MultiPolygon",
    "CompositeSurface",
    "MultiCurve",
    "MultiLineString",
    "MultiPoint",
];

/// Vrai si l'élément est la racine d'une géométrie GML
pub fn is_geometry_root(name: &str) -> bool {
    GEOMETRY_ROOTS.contains(&name)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RingRole {
    Exterior,
    Interior,
}

/// Accumulateur des parties géométriques rencontrées dans le sous-arbre
struct Builder {
    axis: AxisOrder,
    dims: usize,
    stack: Vec<String>,
    role: RingRole,
    ring: Vec<Coord>,
    exterior: Option<LineString>,
    interiors: Vec<LineString>,
    line: Vec<Coord>,
    text: String,
    polygons: Vec<Polygon>,
    lines: Vec<LineString>,
    points: Vec<Point>,
    error: Option<String>,
}

impl Builder {
    fn new(axis: AxisOrder, dims: usize) -> Self {
        Self {
            axis,
            dims,
            stack: Vec::new(),
            role: RingRole::Exterior,
            ring: Vec::new(),
            exterior: None,
            interiors: Vec::new(),
            line: Vec::new(),
            text: String::new(),
            polygons: Vec::new(),
            lines: Vec::new(),
            points: Vec::new(),
            error: None,
        }
    }

    fn fail(&mut self, reason: impl Into<String>) {
        if self.error.is_none() {
            self.error = Some(reason.into());
        }
    }

    fn inside(&self, name: &str) -> bool {
        self.stack.iter().any(|n| n == name)
    }

    fn inside_ring(&self) -> bool {
        self.inside("LinearRing") || self.inside("Ring")
    }

    fn start(&mut self, e: &BytesStart) {
        let name = local_name(e);
        match name.as_str() {
            "exterior" | "outerBoundaryIs" => self.role = RingRole::Exterior,
            "interior" | "innerBoundaryIs" => self.role = RingRole::Interior,
            "Polygon" | "PolygonPatch" => {
                self.exterior = None;
                self.interiors.clear();
            }
            "LinearRing" | "Ring" if !self.inside_ring() => self.ring.clear(),
            "LineString" | "Curve" if !self.inside_ring() && !self.inside("Curve") => {
                self.line.clear()
            }
            _ => {}
        }
        if let Some(dims) = srs_dimension(e) {
            self.dims = dims;
        }
        self.text.clear();
        self.stack.push(name);
    }

    fn end(&mut self) {
        let Some(name) = self.stack.pop() else {
            return;
        };

        match name.as_str() {
            "posList" | "pos" | "coordinates" => {
                let parsed = if name == "coordinates" {
                    coords::parse_coordinates(&self.text, self.axis)
                } else {
                    coords::parse_pos_list(&self.text, self.dims, self.axis)
                };
                self.text.clear();
                match parsed {
                    Ok(c) => self.push_coords(c),
                    Err(reason) => self.fail(reason),
                }
            }
            "LinearRing" | "Ring" if !self.inside_ring() => {
                let ring = LineString::new(std::mem::take(&mut self.ring));
                if !ring_ok(&ring) {
                    self.fail(format!("ring with {} points is not closed", ring.0.len()));
                }
                match self.role {
                    RingRole::Exterior => self.exterior = Some(ring),
                    RingRole::Interior => self.interiors.push(ring),
                }
            }
            "Polygon" | "PolygonPatch" => match self.exterior.take() {
                Some(exterior) => {
                    let interiors = std::mem::take(&mut self.interiors);
                    self.polygons.push(Polygon::new(exterior, interiors));
                }
                None => self.fail("polygon without exterior ring"),
            },
            "LineString" | "Curve" if !self.inside_ring() && !self.inside("Curve") => {
                let line = LineString::new(std::mem::take(&mut self.line));
                if line.0.len() < 2 {
                    self.fail("line with less than 2 points");
                }
                self.lines.push(line);
            }
            _ => {}
        }
    }

    fn push_coords(&mut self, coords: Vec<Coord>) {
        if self.inside_ring() {
            append_segment(&mut self.ring, coords);
        } else if self.inside("Point") {
            match coords.first() {
                Some(c) => self.points.push(Point::from(*c)),
                None => self.fail("point without coordinates"),
            }
        } else if self.inside("LineString") || self.inside("Curve") {
            append_segment(&mut self.line, coords);
        }
    }

    fn finish(self, root: &str) -> Result<Geometry, String> {
        if let Some(reason) = self.error {
            return Err(reason);
        }

        let geometry = match root {
            "Point" => self.points.into_iter().next().map(Geometry::Point),
            "LineString" | "Curve" => self.lines.into_iter().next().map(Geometry::LineString),
            "Polygon" | "Surface" if self.polygons.len() == 1 => {
                self.polygons.into_iter().next().map(Geometry::Polygon)
            }
            "Polygon" | "Surface" | "MultiSurface" | "MultiPolygon" | "CompositeSurface" => {
                (!self.polygons.is_empty())
                    .then(|| Geometry::MultiPolygon(MultiPolygon::new(self.polygons)))
            }
            "MultiCurve" | "MultiLineString" => (!self.lines.is_empty())
                .then(|| Geometry::MultiLineString(MultiLineString::new(self.lines))),
            "MultiPoint" => (!self.points.is_empty())
                .then(|| Geometry::MultiPoint(MultiPoint::new(self.points))),
            other => return Err(format!("unsupported geometry type {}", other)),
        };

        geometry.ok_or_else(|| format!("empty {}", root))
    }
}

/// Lit le sous-arbre d'une géométrie GML dont `root` vient d'être ouvert.
///
/// Retourne `Err(raison)` pour une géométrie inexploitable ; le lecteur est
/// toujours positionné après la fermeture de `root`, sauf erreur XML.
pub fn read_geometry(
    reader: &mut Reader<&[u8]>,
    root: &BytesStart,
    axis: AxisOrder,
) -> Result<Result<Geometry, String>, quick_xml::Error> {
    let root_name = local_name(root);
    let mut builder = Builder::new(axis, 2);
    builder.start(root);

    while !builder.stack.is_empty() {
        match reader.read_event()? {
            Event::Start(e) => builder.start(&e),
            Event::Empty(e) => {
                builder.start(&e);
                builder.end();
            }
            Event::Text(t) => match t.unescape() {
                Ok(text) => builder.text.push_str(&text),
                Err(e) => builder.fail(e.to_string()),
            },
            Event::End(_) => builder.end(),
            Event::Eof => {
                return Err(quick_xml::Error::UnexpectedEof(root_name));
            }
            _ => {}
        }
    }

    Ok(builder.finish(&root_name))
}

/// Concatène un segment à une ligne en supprimant le point de jonction dupliqué
fn append_segment(target: &mut Vec<Coord>, segment: Vec<Coord>) {
    let mut iter = segment.into_iter().peekable();
    if let (Some(last), Some(first)) = (target.last(), iter.peek()) {
        if last == first {
            iter.next();
        }
    }
    target.extend(iter);
}

/// Un anneau valide : au moins 4 points, premier == dernier
fn ring_ok(r: &LineString) -> bool {
    if r.0.len() < 4 {
        return false;
    }
    match (r.0.first(), r.0.last()) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

fn srs_dimension(e: &BytesStart) -> Option<usize> {
    e.attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == b"srsDimension")
        .and_then(|a| a.unescape_value().ok())
        .and_then(|v| v.trim().parse().ok())
}
