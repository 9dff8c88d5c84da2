//! Parsing des listes de coordonnées GML (`posList`, `pos`, `coordinates`)

use geo::Coord;

use crate::types::AxisOrder;

/// Parse un `gml:posList` / `gml:pos` : nombres séparés par des espaces,
/// groupés par `dims`. Les dimensions au-delà de 2 (Z, M) sont ignorées.
pub fn parse_pos_list(text: &str, dims: usize, axis: AxisOrder) -> Result<Vec<Coord>, String> {
    let dims = dims.max(2);
    let values = text
        .split_ascii_whitespace()
        .map(parse_number)
        .collect::<Result<Vec<f64>, String>>()?;

    if values.len() % dims != 0 {
        return Err(format!(
            "{} values is not a multiple of srsDimension {}",
            values.len(),
            dims
        ));
    }

    Ok(values
        .chunks_exact(dims)
        .map(|c| to_coord(c[0], c[1], axis))
        .collect())
}

/// Parse un `gml:coordinates` (GML 2) : tuples séparés par des espaces,
/// composantes séparées par des virgules.
pub fn parse_coordinates(text: &str, axis: AxisOrder) -> Result<Vec<Coord>, String> {
    text.split_ascii_whitespace()
        .map(|tuple| {
            let mut parts = tuple.split(',');
            let a = parts.next().ok_or("empty coordinate tuple")?;
            let b = parts
                .next()
                .ok_or_else(|| format!("incomplete coordinate tuple '{}'", tuple))?;
            Ok(to_coord(parse_number(a)?, parse_number(b)?, axis))
        })
        .collect()
}

fn parse_number(raw: &str) -> Result<f64, String> {
    let value: f64 =
        fast_float::parse(raw).map_err(|_| format!("invalid coordinate '{}'", raw))?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(format!("non-finite coordinate '{}'", raw))
    }
}

fn to_coord(first: f64, second: f64, axis: AxisOrder) -> Coord {
    match axis {
        AxisOrder::LatLon => Coord {
            x: second,
            y: first,
        },
        AxisOrder::LonLat => Coord {
            x: first,
            y: second,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pos_list_lat_lon_is_swapped() {
        let coords = parse_pos_list("41.9 12.5 41.8 12.6", 2, AxisOrder::LatLon).unwrap();
        assert_eq!(coords.len(), 2);
        assert_eq!(coords[0], Coord { x: 12.5, y: 41.9 });
        assert_eq!(coords[1], Coord { x: 12.6, y: 41.8 });
    }

    #[test]
    fn test_pos_list_3d_drops_z() {
        let coords = parse_pos_list("1 2 3 4 5 6", 3, AxisOrder::LonLat).unwrap();
        assert_eq!(coords, vec![Coord { x: 1.0, y: 2.0 }, Coord { x: 4.0, y: 5.0 }]);
    }

    #[test]
    fn test_pos_list_odd_count_is_error() {
        assert!(parse_pos_list("1 2 3", 2, AxisOrder::LonLat).is_err());
    }

    #[test]
    fn test_pos_list_garbage_is_error() {
        assert!(parse_pos_list("1 abc", 2, AxisOrder::LonLat).is_err());
    }

    #[test]
    fn test_gml2_coordinates() {
        let coords = parse_coordinates("12.5,41.9 12.6,41.8", AxisOrder::LonLat).unwrap();
        assert_eq!(coords[1], Coord { x: 12.6, y: 41.8 });
        assert!(parse_coordinates("12.5", AxisOrder::LonLat).is_err());
    }
}
