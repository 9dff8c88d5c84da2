//! Buffer d'une ligne en CRS métrique
//!
//! Le buffer est l'union de rectangles (un par segment) et de disques (un par
//! sommet), ce qui donne des jonctions et extrémités arrondies.

use std::f64::consts::FRAC_PI_2;

use geo::{BooleanOps, Coord, LineString, MultiPolygon, Polygon};

/// Segments par quart de cercle pour les arrondis
pub const QUADRANT_SEGMENTS: usize = 8;

/// Calcule le buffer de `line` à la distance `distance` (unités du CRS)
///
/// Retourne `None` si la ligne n'a aucun sommet ou si la distance n'est pas
/// strictement positive.
pub fn buffer_line(line: &LineString, distance: f64) -> Option<MultiPolygon> {
    if line.0.is_empty() || distance <= 0.0 || !distance.is_finite() {
        return None;
    }

    let mut pieces: Vec<Polygon> = line.0.iter().map(|c| disk(*c, distance)).collect();
    pieces.extend(
        line.lines()
            .filter_map(|segment| segment_rectangle(segment.start, segment.end, distance)),
    );

    let mut result = MultiPolygon::new(Vec::new());
    for piece in pieces {
        result = result.union(&MultiPolygon::new(vec![piece]));
    }
    Some(result)
}

/// Disque approché par un polygone de `4 * QUADRANT_SEGMENTS` côtés
fn disk(center: Coord, radius: f64) -> Polygon {
    let n = 4 * QUADRANT_SEGMENTS;
    let mut ring: Vec<Coord> = (0..n)
        .map(|i| {
            let angle = i as f64 * FRAC_PI_2 / QUADRANT_SEGMENTS as f64;
            Coord {
                x: center.x + radius * angle.cos(),
                y: center.y + radius * angle.sin(),
            }
        })
        .collect();
    ring.push(ring[0]);
    Polygon::new(LineString::new(ring), vec![])
}

/// Rectangle de demi-largeur `half` autour du segment ; `None` si segment nul
fn segment_rectangle(a: Coord, b: Coord, half: f64) -> Option<Polygon> {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len = dx.hypot(dy);
    if len == 0.0 {
        return None;
    }
    // normale unitaire * demi-largeur
    let nx = -dy / len * half;
    let ny = dx / len * half;

    let ring = vec![
        Coord { x: a.x + nx, y: a.y + ny },
        Coord { x: a.x - nx, y: a.y - ny },
        Coord { x: b.x - nx, y: b.y - ny },
        Coord { x: b.x + nx, y: b.y + ny },
        Coord { x: a.x + nx, y: a.y + ny },
    ];
    Some(Polygon::new(LineString::new(ring), vec![]))
}
