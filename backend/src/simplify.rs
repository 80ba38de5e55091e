use crate::models::Coordinate;

/// Deterministically decimate `coords` to at most `max_points` evenly spaced
/// entries, keeping the first and last.
///
/// Inputs that already fit are returned unchanged. A `max_points` of one keeps
/// only the first coordinate, and zero keeps nothing.
pub fn simplify(coords: &[Coordinate], max_points: usize) -> Vec<Coordinate> {
    if coords.len() <= max_points {
        return coords.to_vec();
    }
    match max_points {
        0 => Vec::new(),
        1 => vec![coords[0]],
        _ => {
            let last = coords.len() - 1;
            let steps = max_points - 1;
            (0..max_points)
                .map(|i| coords[(i * last + steps / 2) / steps])
                .collect()
        }
    }
}

/// Build `base/lat,lon/lat,lon/...` from the simplified route.
pub fn share_link(base: &str, coords: &[Coordinate], max_points: usize) -> String {
    let mut link = base.trim_end_matches('/').to_string();
    for coord in simplify(coords, max_points) {
        link.push_str(&format!("/{:.6},{:.6}", coord.lat, coord.lon));
    }
    link
}
