use std::time::Duration;

use reqwest::{StatusCode, blocking::Client, header::AUTHORIZATION};
use serde::Deserialize;
use serde_json::json;

use crate::models::Coordinate;

pub const DEFAULT_BASE_URL: &str = "https://api.openrouteservice.org";
pub const DEFAULT_PROFILE: &str = "cycling-regular";

/// OpenRouteService error codes meaning "no route between these points".
const ORS_ROUTE_NOT_FOUND: [u64; 2] = [2009, 2010];

#[derive(Debug, Clone, Copy)]
pub struct DirectionsRequest {
    pub waypoints: [Coordinate; 2],
    pub elevation: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolylinePoint {
    pub coord: Coordinate,
    pub elevation: Option<f64>,
}

/// One routed leg as reported by the service.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectionsLeg {
    pub polyline: Vec<PolylinePoint>,
    pub distance_m: f64,
    pub duration_s: f64,
}

#[derive(Debug, thiserror::Error)]
pub enum DirectionsError {
    #[error("directions request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("directions service rate limit reached")]
    RateLimited,
    #[error("no route found: {0}")]
    NoRoute(String),
    #[error("directions service returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("malformed directions response: {0}")]
    Malformed(String),
}

/// External routing backend consulted by the remote-directions strategy.
///
/// Implementations own their transport timeouts; callers only retry at the
/// bearing level.
pub trait DirectionsService: Send + Sync {
    fn route(&self, request: &DirectionsRequest) -> Result<DirectionsLeg, DirectionsError>;
}

/// Blocking OpenRouteService client.
pub struct OpenRouteService {
    client: Client,
    base_url: String,
    api_key: String,
    profile: String,
}

impl OpenRouteService {
    pub fn new(api_key: impl Into<String>) -> Result<Self, DirectionsError> {
        Self::with_base_url(api_key, DEFAULT_BASE_URL, DEFAULT_PROFILE)
    }

    /// Custom endpoint, e.g. a self-hosted instance.
    pub fn with_base_url(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        profile: impl Into<String>,
    ) -> Result<Self, DirectionsError> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
            profile: profile.into(),
        })
    }

    pub fn endpoint(&self) -> String {
        format!(
            "{}/v2/directions/{}/geojson",
            self.base_url.trim_end_matches('/'),
            self.profile
        )
    }
}

impl DirectionsService for OpenRouteService {
    fn route(&self, request: &DirectionsRequest) -> Result<DirectionsLeg, DirectionsError> {
        let [from, to] = request.waypoints;
        let body = json!({
            "coordinates": [[from.lon, from.lat], [to.lon, to.lat]],
            "elevation": request.elevation,
        });

        tracing::debug!("POST {} {}", self.endpoint(), body);
        let response = self
            .client
            .post(self.endpoint())
            .header(AUTHORIZATION, &self.api_key)
            .json(&body)
            .send()?;

        let status = response.status();
        let text = response.text()?;
        if !status.is_success() {
            return Err(classify_failure(status, &text));
        }
        parse_geojson(&text)
    }
}

#[derive(Deserialize)]
struct FeatureCollection {
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Deserialize)]
struct Feature {
    geometry: Geometry,
    properties: Properties,
}

#[derive(Deserialize)]
struct Geometry {
    coordinates: Vec<Vec<f64>>,
}

#[derive(Deserialize)]
struct Properties {
    summary: Summary,
}

#[derive(Deserialize)]
struct Summary {
    distance: Option<f64>,
    duration: Option<f64>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<u64>,
    #[serde(default)]
    message: Option<String>,
}

/// Turn a GeoJSON directions body into a leg.
pub fn parse_geojson(body: &str) -> Result<DirectionsLeg, DirectionsError> {
    let collection: FeatureCollection =
        serde_json::from_str(body).map_err(|err| DirectionsError::Malformed(err.to_string()))?;
    let feature = collection
        .features
        .into_iter()
        .next()
        .ok_or_else(|| DirectionsError::NoRoute("response has no features".into()))?;

    let polyline = feature
        .geometry
        .coordinates
        .iter()
        .map(|position| match position.as_slice() {
            [lon, lat] => Ok(PolylinePoint {
                coord: Coordinate { lat: *lat, lon: *lon },
                elevation: None,
            }),
            [lon, lat, elevation, ..] => Ok(PolylinePoint {
                coord: Coordinate { lat: *lat, lon: *lon },
                elevation: Some(*elevation),
            }),
            _ => Err(DirectionsError::Malformed(format!(
                "position with {} component(s)",
                position.len()
            ))),
        })
        .collect::<Result<Vec<_>, _>>()?;

    if polyline.is_empty() {
        return Err(DirectionsError::NoRoute("empty polyline".into()));
    }

    let summary = feature.properties.summary;
    let distance_m = summary
        .distance
        .ok_or_else(|| DirectionsError::Malformed("summary has no distance".into()))?;
    let duration_s = summary
        .duration
        .ok_or_else(|| DirectionsError::Malformed("summary has no duration".into()))?;

    Ok(DirectionsLeg {
        polyline,
        distance_m,
        duration_s,
    })
}

fn classify_failure(status: StatusCode, body: &str) -> DirectionsError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return DirectionsError::RateLimited;
    }

    let envelope = serde_json::from_str::<ErrorEnvelope>(body).ok();
    let code = envelope.as_ref().and_then(|e| e.error.code);
    let message = envelope
        .and_then(|e| e.error.message)
        .unwrap_or_else(|| body.chars().take(200).collect());

    let not_found = status == StatusCode::NOT_FOUND
        || code.is_some_and(|code| ORS_ROUTE_NOT_FOUND.contains(&code));
    if not_found {
        DirectionsError::NoRoute(message)
    } else {
        DirectionsError::Status {
            status: status.as_u16(),
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "type": "FeatureCollection",
        "features": [{
            "type": "Feature",
            "geometry": {
                "type": "LineString",
                "coordinates": [[-3.7038, 40.4168, 650.0], [-3.70, 40.42, 662.5], [-3.69, 40.43, 655.0]]
            },
            "properties": {
                "summary": {"distance": 10000.0, "duration": 1800.0}
            }
        }]
    }"#;

    #[test]
    fn test_parse_geojson_leg() {
        let leg = parse_geojson(SAMPLE).expect("leg");
        assert_eq!(leg.polyline.len(), 3);
        assert_eq!(leg.distance_m, 10_000.0);
        assert_eq!(leg.duration_s, 1800.0);
        assert_eq!(leg.polyline[0].coord, Coordinate { lat: 40.4168, lon: -3.7038 });
        assert_eq!(leg.polyline[1].elevation, Some(662.5));
    }

    #[test]
    fn test_parse_geojson_without_elevation() {
        let body = r#"{"features":[{"geometry":{"coordinates":[[1.0,2.0],[1.1,2.1]]},
            "properties":{"summary":{"distance":50.0,"duration":10.0}}}]}"#;
        let leg = parse_geojson(body).expect("leg");
        assert!(leg.polyline.iter().all(|p| p.elevation.is_none()));
    }

    #[test]
    fn test_missing_summary_fields_are_malformed() {
        let body = r#"{"features":[{"geometry":{"coordinates":[[1.0,2.0],[1.1,2.1]]},
            "properties":{"summary":{}}}]}"#;
        assert!(matches!(parse_geojson(body), Err(DirectionsError::Malformed(_))));
    }

    #[test]
    fn test_empty_polyline_is_no_route() {
        let body = r#"{"features":[{"geometry":{"coordinates":[]},
            "properties":{"summary":{"distance":0.0,"duration":0.0}}}]}"#;
        assert!(matches!(parse_geojson(body), Err(DirectionsError::NoRoute(_))));
    }

    #[test]
    fn test_no_features_is_no_route() {
        assert!(matches!(
            parse_geojson(r#"{"features":[]}"#),
            Err(DirectionsError::NoRoute(_))
        ));
    }

    #[test]
    fn test_garbage_is_malformed() {
        assert!(matches!(parse_geojson("<html>"), Err(DirectionsError::Malformed(_))));
    }

    #[test]
    fn test_classify_rate_limit() {
        assert!(matches!(
            classify_failure(StatusCode::TOO_MANY_REQUESTS, ""),
            DirectionsError::RateLimited
        ));
    }

    #[test]
    fn test_classify_route_not_found_code() {
        let body = r#"{"error":{"code":2010,"message":"Could not find routable point"}}"#;
        match classify_failure(StatusCode::BAD_REQUEST, body) {
            DirectionsError::NoRoute(message) => assert!(message.contains("routable point")),
            other => panic!("unexpected: {other}"),
        }
    }

    #[test]
    fn test_classify_other_status() {
        match classify_failure(StatusCode::BAD_GATEWAY, "upstream down") {
            DirectionsError::Status { status, message } => {
                assert_eq!(status, 502);
                assert_eq!(message, "upstream down");
            }
            other => panic!("unexpected: {other}"),
        }
    }

    #[test]
    fn test_endpoint_joins_profile() {
        let service = OpenRouteService::with_base_url("key", "http://localhost:8082/ors/", "cycling-road")
            .expect("client");
        assert_eq!(
            service.endpoint(),
            "http://localhost:8082/ors/v2/directions/cycling-road/geojson"
        );
    }
}
