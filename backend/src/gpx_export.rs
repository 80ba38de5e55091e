use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use geo_types::Point;
use gpx::{Gpx, GpxVersion, Track, TrackSegment, Waypoint};

use crate::error::RouteError;
use crate::models::{Coordinate, Route};

const CREATOR: &str = "loop_planner";

/// GPX 1.1 track of the loop, base64 encoded. Elevation-aware routes write
/// `<ele>` on every track point.
pub fn encode_route_as_gpx(route: &Route, name: &str) -> Result<String, RouteError> {
    let buffer = write_gpx(route, name)?;
    Ok(BASE64.encode(buffer))
}

pub fn write_gpx(route: &Route, name: &str) -> Result<Vec<u8>, RouteError> {
    let mut gpx = Gpx {
        version: GpxVersion::Gpx11,
        creator: Some(CREATOR.into()),
        ..Default::default()
    };
    let mut track = Track {
        name: Some(name.into()),
        ..Default::default()
    };

    let mut segment = TrackSegment::new();
    if route.is_elevation_aware() {
        segment.points.extend(
            route
                .profile
                .iter()
                .map(|point| to_waypoint(&point.coord, Some(point.elevation))),
        );
    } else {
        segment
            .points
            .extend(route.coords.iter().map(|coord| to_waypoint(coord, None)));
    }
    track.segments.push(segment);
    gpx.tracks.push(track);

    let mut buffer = Vec::new();
    gpx::write(&gpx, &mut buffer)?;
    Ok(buffer)
}

fn to_waypoint(coord: &Coordinate, elevation: Option<f64>) -> Waypoint {
    let mut waypoint = Waypoint::new(Point::new(coord.lon, coord.lat));
    waypoint.elevation = elevation;
    waypoint
}
