//! Map projections
//!
//! The host map surface works in some projected coordinate system. The
//! engine only needs to bring vertices into a geographic (lon/lat) frame for
//! measurement, so a projection is reduced to that transform and its inverse.

use crate::error::MeasureError;
use crate::geometry::{GeoCoordinate, MapCoordinate};
use crate::metrics::METERS_PER_DEGREE;
use std::str::FromStr;

/// Semi-major axis of the WGS84 ellipsoid, used by spherical Web Mercator
pub const WEB_MERCATOR_RADIUS: f64 = 6_378_137.0;

/// Latitude limit of the square Web Mercator world
pub const WEB_MERCATOR_MAX_LATITUDE: f64 = 85.051_128_779_806_59;

/// Coordinate transform between the map's working projection and EPSG:4326
pub trait Projection {
    /// Projection identifier, e.g. `"EPSG:3857"`
    fn code(&self) -> &str;

    /// Transform a map coordinate to longitude/latitude in degrees
    fn to_geographic(&self, coordinate: MapCoordinate) -> GeoCoordinate;

    /// Transform longitude/latitude in degrees to a map coordinate
    fn from_geographic(&self, coordinate: GeoCoordinate) -> MapCoordinate;

    /// Map units covering one meter on the ground near `at`
    fn map_units_per_meter(&self, at: MapCoordinate) -> f64;
}

/// Plain longitude/latitude (EPSG:4326). Map x is longitude, y latitude.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Geographic;

impl Projection for Geographic {
    fn code(&self) -> &str {
        "EPSG:4326"
    }

    fn to_geographic(&self, coordinate: MapCoordinate) -> GeoCoordinate {
        GeoCoordinate::new(coordinate.x, coordinate.y)
    }

    fn from_geographic(&self, coordinate: GeoCoordinate) -> MapCoordinate {
        MapCoordinate::new(coordinate.lon, coordinate.lat)
    }

    fn map_units_per_meter(&self, _at: MapCoordinate) -> f64 {
        1.0 / METERS_PER_DEGREE
    }
}

/// Spherical Web Mercator (EPSG:3857), the default view projection of most
/// web map clients
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WebMercator;

impl Projection for WebMercator {
    fn code(&self) -> &str {
        "EPSG:3857"
    }

    fn to_geographic(&self, coordinate: MapCoordinate) -> GeoCoordinate {
        let lon = (coordinate.x / WEB_MERCATOR_RADIUS).to_degrees();
        let lat = (2.0 * (coordinate.y / WEB_MERCATOR_RADIUS).exp().atan()
            - std::f64::consts::FRAC_PI_2)
            .to_degrees();
        GeoCoordinate::new(lon, lat)
    }

    fn from_geographic(&self, coordinate: GeoCoordinate) -> MapCoordinate {
        let lat = coordinate
            .lat
            .clamp(-WEB_MERCATOR_MAX_LATITUDE, WEB_MERCATOR_MAX_LATITUDE);
        let x = WEB_MERCATOR_RADIUS * coordinate.lon.to_radians();
        let y = WEB_MERCATOR_RADIUS
            * (std::f64::consts::FRAC_PI_4 + lat.to_radians() / 2.0)
                .tan()
                .ln();
        MapCoordinate::new(x, y)
    }

    fn map_units_per_meter(&self, at: MapCoordinate) -> f64 {
        // Mercator stretches by 1 / cos(lat) away from the equator
        let lat = self
            .to_geographic(at)
            .lat
            .clamp(-WEB_MERCATOR_MAX_LATITUDE, WEB_MERCATOR_MAX_LATITUDE);
        1.0 / lat.to_radians().cos()
    }
}

/// Built-in projections selectable by EPSG code
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ProjectionCode {
    #[serde(rename = "EPSG:4326")]
    Geographic,
    #[default]
    #[serde(rename = "EPSG:3857")]
    WebMercator,
}

impl ProjectionCode {
    /// All built-in projections
    pub const ALL: [ProjectionCode; 2] = [ProjectionCode::Geographic, ProjectionCode::WebMercator];

    /// Boxed projection for hosts that hold `dyn Projection`
    pub fn boxed(self) -> Box<dyn Projection> {
        match self {
            ProjectionCode::Geographic => Box::new(Geographic),
            ProjectionCode::WebMercator => Box::new(WebMercator),
        }
    }
}

impl Projection for ProjectionCode {
    fn code(&self) -> &str {
        match self {
            ProjectionCode::Geographic => Geographic.code(),
            ProjectionCode::WebMercator => WebMercator.code(),
        }
    }

    fn to_geographic(&self, coordinate: MapCoordinate) -> GeoCoordinate {
        match self {
            ProjectionCode::Geographic => Geographic.to_geographic(coordinate),
            ProjectionCode::WebMercator => WebMercator.to_geographic(coordinate),
        }
    }

    fn from_geographic(&self, coordinate: GeoCoordinate) -> MapCoordinate {
        match self {
            ProjectionCode::Geographic => Geographic.from_geographic(coordinate),
            ProjectionCode::WebMercator => WebMercator.from_geographic(coordinate),
        }
    }

    fn map_units_per_meter(&self, at: MapCoordinate) -> f64 {
        match self {
            ProjectionCode::Geographic => Geographic.map_units_per_meter(at),
            ProjectionCode::WebMercator => WebMercator.map_units_per_meter(at),
        }
    }
}

impl FromStr for ProjectionCode {
    type Err = MeasureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "EPSG:4326" | "CRS:84" | "WGS84" => Ok(ProjectionCode::Geographic),
            "EPSG:3857" | "EPSG:900913" | "EPSG:102100" | "EPSG:102113" => {
                Ok(ProjectionCode::WebMercator)
            }
            _ => Err(MeasureError::UnknownProjection(s.to_string())),
        }
    }
}

impl std::fmt::Display for ProjectionCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_geographic_is_identity() {
        let geo = Geographic.to_geographic(MapCoordinate::new(12.5, -33.0));
        assert_eq!(geo, GeoCoordinate::new(12.5, -33.0));
    }

    #[test]
    fn test_web_mercator_known_point() {
        // 1 degree east on the equator
        let map = WebMercator.from_geographic(GeoCoordinate::new(1.0, 0.0));
        assert_abs_diff_eq!(map.x, 111_319.490_793_273_57, epsilon = 1e-6);
        assert_abs_diff_eq!(map.y, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_web_mercator_inverse() {
        let original = GeoCoordinate::new(16.37, 48.21);
        let map = WebMercator.from_geographic(original);
        let back = WebMercator.to_geographic(map);
        assert_abs_diff_eq!(back.lon, original.lon, epsilon = 1e-9);
        assert_abs_diff_eq!(back.lat, original.lat, epsilon = 1e-9);
    }

    #[test]
    fn test_map_units_per_meter() {
        let degrees = Geographic.map_units_per_meter(MapCoordinate::new(0.0, 10.0));
        assert_abs_diff_eq!(degrees * METERS_PER_DEGREE, 1.0, epsilon = 1e-12);

        let equator = WebMercator.map_units_per_meter(MapCoordinate::new(0.0, 0.0));
        assert_abs_diff_eq!(equator, 1.0, epsilon = 1e-12);

        let north = WebMercator.from_geographic(GeoCoordinate::new(0.0, 60.0));
        assert_abs_diff_eq!(WebMercator.map_units_per_meter(north), 2.0, epsilon = 1e-9);
    }

    #[test]
    fn test_parse_codes() {
        assert_eq!(
            "epsg:3857".parse::<ProjectionCode>().unwrap(),
            ProjectionCode::WebMercator
        );
        assert_eq!(
            "EPSG:4326".parse::<ProjectionCode>().unwrap(),
            ProjectionCode::Geographic
        );
        assert!(matches!(
            "EPSG:27700".parse::<ProjectionCode>(),
            Err(MeasureError::UnknownProjection(_))
        ));
    }

    #[test]
    fn test_boxed_dispatch() {
        let projection = ProjectionCode::WebMercator.boxed();
        assert_eq!(projection.code(), "EPSG:3857");
    }
}
