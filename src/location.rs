//! GeoJSON points and the distance / bounding-box math used for `near` filtering.
//!
//! Coordinates are stored GeoJSON style as `[longitude, latitude]`, the reverse of the
//! usual `(lat, lng)` display order. All angles are decimal degrees, all distances meters.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::f64::consts::PI;
use std::fmt;

use crate::error::{RollError, RollResult};

/// Radius of the Earth in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Kilometers per degree of latitude.
const DEG_LAT_KM: f64 = 110.574235;

/// Kilometers per degree of longitude at the equator.
const DEG_LON_KM: f64 = 110.572833;

const DEG_TO_RAD: f64 = PI / 180.0;

/// Wire form of a GeoJSON geometry: `{"type": "...", "coordinates": [lon, lat]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoJson {
    #[serde(rename = "type")]
    pub kind: String,
    pub coordinates: [f64; 2],
}

/// Object literal with `lat`/`lng` members, as used by map widgets.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLngLiteral {
    pub lat: f64,
    pub lng: f64,
}

/// An immutable GeoJSON `Point`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "GeoJson", into = "GeoJson")]
pub struct GeoJsonPoint {
    coordinates: [f64; 2],
}

impl GeoJsonPoint {
    pub fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            coordinates: [longitude, latitude],
        }
    }

    pub fn from_lat_lng(lat: f64, lng: f64) -> Self {
        Self::new(lng, lat)
    }

    /// Builds a point from a GeoJSON geometry, rejecting anything but `type == "Point"`.
    pub fn from_geo_json(kind: &str, coordinates: [f64; 2]) -> RollResult<Self> {
        if kind != "Point" {
            return Err(RollError::InvalidGeometry(format!(
                "expecting type=Point, got type={}",
                kind
            )));
        }
        Ok(Self { coordinates })
    }

    /// Normalizes any of the accepted JSON shapes into a point:
    ///
    /// * `{"type": "Point", "coordinates": [lon, lat]}`
    /// * `[lon, lat]`
    /// * `{"lat": .., "lng": ..}`
    ///
    /// The serialized form of a point is accepted, so normalizing twice is a no-op.
    pub fn from_value(value: &Value) -> RollResult<Self> {
        if let Some(items) = value.as_array() {
            let [lon, lat] = coordinate_pair(items)?;
            return Ok(Self::new(lon, lat));
        }

        if let Some(obj) = value.as_object() {
            if let (Some(kind), Some(coordinates)) = (obj.get("type"), obj.get("coordinates")) {
                let kind = kind.as_str().ok_or_else(|| {
                    RollError::InvalidGeometry(format!("type must be a string, got {}", kind))
                })?;
                let items = coordinates.as_array().ok_or_else(|| {
                    RollError::InvalidGeometry(format!(
                        "coordinates must be an array, got {}",
                        coordinates
                    ))
                })?;
                return Self::from_geo_json(kind, coordinate_pair(items)?);
            }

            let lat = obj.get("lat").and_then(Value::as_f64);
            let lng = obj.get("lng").and_then(Value::as_f64);
            if let (Some(lat), Some(lng)) = (lat, lng) {
                return Ok(Self::from_lat_lng(lat, lng));
            }
        }

        Err(RollError::InvalidGeometry(format!(
            "expecting something that describes a Point, got {}",
            value
        )))
    }

    pub fn coordinates(&self) -> [f64; 2] {
        self.coordinates
    }

    pub fn longitude(&self) -> f64 {
        self.coordinates[0]
    }

    pub fn latitude(&self) -> f64 {
        self.coordinates[1]
    }

    pub fn to_lat_lng_literal(&self) -> LatLngLiteral {
        LatLngLiteral {
            lat: self.latitude(),
            lng: self.longitude(),
        }
    }

    /// `"lon,lat"` rounded to `precision` decimals.
    pub fn to_lon_lat_string(&self, precision: u32) -> String {
        format!(
            "{},{}",
            round_to(self.longitude(), precision),
            round_to(self.latitude(), precision)
        )
    }

    /// `"lat,lng"` rounded to `precision` decimals, the order map URLs expect.
    pub fn to_lat_lng_string(&self, precision: u32) -> String {
        format!(
            "{},{}",
            round_to(self.latitude(), precision),
            round_to(self.longitude(), precision)
        )
    }

    /// Compares two points after rounding both to `precision` decimals.
    pub fn equals_within(&self, other: &GeoJsonPoint, precision: u32) -> bool {
        self.to_lat_lng_string(precision) == other.to_lat_lng_string(precision)
    }
}

impl From<[f64; 2]> for GeoJsonPoint {
    fn from(coordinates: [f64; 2]) -> Self {
        Self { coordinates }
    }
}

impl From<LatLngLiteral> for GeoJsonPoint {
    fn from(literal: LatLngLiteral) -> Self {
        Self::from_lat_lng(literal.lat, literal.lng)
    }
}

impl TryFrom<GeoJson> for GeoJsonPoint {
    type Error = RollError;

    fn try_from(geo: GeoJson) -> Result<Self, Self::Error> {
        Self::from_geo_json(&geo.kind, geo.coordinates)
    }
}

impl From<GeoJsonPoint> for GeoJson {
    fn from(point: GeoJsonPoint) -> Self {
        GeoJson {
            kind: "Point".to_string(),
            coordinates: point.coordinates,
        }
    }
}

impl fmt::Display for GeoJsonPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_lon_lat_string(6))
    }
}

/// True if `value` looks like a GeoJSON geometry with two numeric coordinates.
pub fn is_geo_json(value: &Value) -> bool {
    let kind_ok = value.get("type").map(Value::is_string).unwrap_or(false);
    let coords_ok = value
        .get("coordinates")
        .and_then(Value::as_array)
        .map(|items| items.len() >= 2 && items[0].is_number() && items[1].is_number())
        .unwrap_or(false);
    kind_ok && coords_ok
}

fn coordinate_pair(items: &[Value]) -> RollResult<[f64; 2]> {
    match items {
        [lon, lat, ..] => match (lon.as_f64(), lat.as_f64()) {
            (Some(lon), Some(lat)) => Ok([lon, lat]),
            _ => Err(RollError::InvalidGeometry(format!(
                "coordinates must be numeric, got [{}, {}]",
                lon, lat
            ))),
        },
        _ => Err(RollError::InvalidGeometry(format!(
            "expecting [lon, lat], got {} component(s)",
            items.len()
        ))),
    }
}

/// Rounds half up, matching how map widgets round URL values.
fn round_to(v: f64, precision: u32) -> f64 {
    let scale = 10f64.powi(precision as i32);
    (v * scale + 0.5).floor() / scale
}

/// Great-circle distance in meters between two points (haversine).
///
/// Returns 0 when either point is missing.
pub fn distance(p1: Option<&GeoJsonPoint>, p2: Option<&GeoJsonPoint>) -> f64 {
    let (p1, p2) = match (p1, p2) {
        (Some(p1), Some(p2)) => (p1, p2),
        _ => return 0.0,
    };

    let (lng1, lat1) = (p1.longitude(), p1.latitude());
    let (lng2, lat2) = (p2.longitude(), p2.latitude());

    let d_lat = (lat2 - lat1) * DEG_TO_RAD;
    let d_lon = (lng2 - lng1) * DEG_TO_RAD;
    let a = (d_lat / 2.0).sin() * (d_lat / 2.0).sin()
        + (lat1 * DEG_TO_RAD).cos()
            * (lat2 * DEG_TO_RAD).cos()
            * (d_lon / 2.0).sin()
            * (d_lon / 2.0).sin();
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_M * c
}

/// Sides of a lat/lon bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpsSides {
    /// latitude
    pub top: f64,
    /// longitude
    pub right: f64,
    /// latitude
    pub bottom: f64,
    /// longitude
    pub left: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GpsBoundingBox {
    pub sides: GpsSides,
    /// `[lon, lat]` corners ordered NW, NE, SE, SW.
    pub corners: [[f64; 2]; 4],
}

/// Square bounding box around a circle of `radius_meters` centered on `[lon, lat]`.
///
/// Equirectangular approximation, not a geodesic circle: the half side is
/// `radius / 110.574235 km` degrees of latitude and
/// `radius / (110.572833 km * cos(lat))` degrees of longitude.
pub fn bounding_box_from_circle(center: [f64; 2], radius_meters: f64) -> GpsBoundingBox {
    let [lon, lat] = center;
    let lat_radian = lat * PI / 180.0;

    let deg_long_km = DEG_LON_KM * lat_radian.cos();
    let delta_lat = radius_meters / 1000.0 / DEG_LAT_KM;
    let delta_long = radius_meters / 1000.0 / deg_long_km;

    let top = lat + delta_lat;
    let bottom = lat - delta_lat;
    let left = lon - delta_long;
    let right = lon + delta_long;

    GpsBoundingBox {
        sides: GpsSides {
            top,
            right,
            bottom,
            left,
        },
        corners: [[left, top], [right, top], [right, bottom], [left, bottom]],
    }
}
