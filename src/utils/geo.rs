use serde::{Deserialize, Serialize};

use crate::errors::{AppError, Result};

const EARTH_RADIUS_KM: f64 = 6371.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.latitude.is_finite() || !(-90.0..=90.0).contains(&self.latitude) {
            return Err(AppError::Validation(format!(
                "Latitude must be between -90 and 90, got {}",
                self.latitude
            )));
        }
        if !self.longitude.is_finite() || !(-180.0..=180.0).contains(&self.longitude) {
            return Err(AppError::Validation(format!(
                "Longitude must be between -180 and 180, got {}",
                self.longitude
            )));
        }
        Ok(())
    }
}

/// Great-circle distance in kilometres.
pub fn haversine_km(a: Coordinates, b: Coordinates) -> f64 {
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();
    let h = (d_lat / 2.0).sin().powi(2)
        + a.latitude.to_radians().cos() * b.latitude.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_KM * c
}

pub fn format_distance(distance_km: f64) -> String {
    if distance_km < 1.0 {
        format!("{}m away", (distance_km * 1000.0).round())
    } else if distance_km < 10.0 {
        format!("{:.1}km away", distance_km)
    } else {
        format!("{}km away", distance_km.round())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Distance {
    pub km: f64,
    pub display: String,
}

impl Distance {
    pub fn between(from: Coordinates, to: Coordinates) -> Self {
        let km = haversine_km(from, to);
        Self {
            km,
            display: format_distance(km),
        }
    }
}

/// Static map image centred on a book box. Without an API key, falls back to
/// an OpenStreetMap page for the same point.
pub fn static_map_url(point: Coordinates, api_key: Option<&str>) -> String {
    match api_key.filter(|key| !key.is_empty()) {
        Some(key) => format!(
            "https://maps.googleapis.com/maps/api/staticmap?center={lat},{lng}&zoom=15&size=300x150&markers=color:red%7C{lat},{lng}&key={key}",
            lat = point.latitude,
            lng = point.longitude,
            key = key,
        ),
        None => format!(
            "https://www.openstreetmap.org/?mlat={lat}&mlon={lng}#map=16/{lat}/{lng}",
            lat = point.latitude,
            lng = point.longitude,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_point_is_zero() {
        let p = Coordinates::new(45.5017, -73.5673);
        assert!(haversine_km(p, p).abs() < 1e-9);
    }

    #[test]
    fn test_montreal_to_quebec() {
        let montreal = Coordinates::new(45.5017, -73.5673);
        let quebec = Coordinates::new(46.8139, -71.2080);
        let km = haversine_km(montreal, quebec);
        assert!((km - 233.0).abs() < 3.0, "got {}", km);
        assert!((haversine_km(quebec, montreal) - km).abs() < 1e-9);
    }

    #[test]
    fn test_format_thresholds() {
        assert_eq!(format_distance(0.4567), "457m away");
        assert_eq!(format_distance(1.0), "1.0km away");
        assert_eq!(format_distance(9.94), "9.9km away");
        assert_eq!(format_distance(12.6), "13km away");
    }

    #[test]
    fn test_validate_ranges() {
        assert!(Coordinates::new(90.0, 180.0).validate().is_ok());
        assert!(Coordinates::new(-90.1, 0.0).validate().is_err());
        assert!(Coordinates::new(0.0, 181.0).validate().is_err());
        assert!(Coordinates::new(f64::NAN, 0.0).validate().is_err());
    }

    #[test]
    fn test_static_map_url() {
        let point = Coordinates::new(45.5, -73.6);
        assert_eq!(
            static_map_url(point, Some("k")),
            "https://maps.googleapis.com/maps/api/staticmap?center=45.5,-73.6&zoom=15&size=300x150&markers=color:red%7C45.5,-73.6&key=k"
        );
        assert!(static_map_url(point, Some("")).starts_with("https://www.openstreetmap.org/"));
    }
}
