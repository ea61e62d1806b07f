//! Geo postings for geo fields.

use std::collections::BTreeMap;

use crate::document::DocId;
use crate::error::{Result, XiphosError};

/// Latitude limit of web-mercator geohashing.
pub const MAX_LATITUDE: f64 = 85.051_128_78;

/// Longitude limit.
pub const MAX_LONGITUDE: f64 = 180.0;

/// A geographical point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    /// Longitude in degrees.
    pub lon: f64,
    /// Latitude in degrees.
    pub lat: f64,
}

impl GeoPoint {
    /// Create a new point, validating its coordinates.
    pub fn new(lon: f64, lat: f64) -> Result<Self> {
        if !(-MAX_LONGITUDE..=MAX_LONGITUDE).contains(&lon) {
            return Err(XiphosError::generic(format!(
                "Invalid longitude: {lon} (must be between -180 and 180)"
            )));
        }
        if !(-MAX_LATITUDE..=MAX_LATITUDE).contains(&lat) {
            return Err(XiphosError::generic(format!(
                "Invalid latitude: {lat} (must be between -{MAX_LATITUDE} and {MAX_LATITUDE})"
            )));
        }
        Ok(GeoPoint { lon, lat })
    }

    /// Parse a point from its longitude and latitude strings.
    pub fn parse(lon: &str, lat: &str) -> Result<Self> {
        let parse = |s: &str, what: &str| {
            s.trim().parse::<f64>().map_err(|_| {
                XiphosError::generic(format!("Could not parse {what} `{s}`"))
            })
        };
        Self::new(parse(lon, "longitude")?, parse(lat, "latitude")?)
    }

    /// Calculate the Haversine distance to another point in kilometers.
    pub fn distance_to(&self, other: &GeoPoint) -> f64 {
        const EARTH_RADIUS_KM: f64 = 6371.0;

        let lat1_rad = self.lat.to_radians();
        let lat2_rad = other.lat.to_radians();
        let delta_lat = (other.lat - self.lat).to_radians();
        let delta_lon = (other.lon - self.lon).to_radians();

        let a = (delta_lat / 2.0).sin().powi(2)
            + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

        EARTH_RADIUS_KM * c
    }
}

/// Document to point postings of one field.
#[derive(Debug, Clone, Default)]
pub struct GeoIndex {
    points: BTreeMap<DocId, GeoPoint>,
}

impl GeoIndex {
    /// Create an empty geo index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and insert the coordinates of a document.
    ///
    /// Malformed or out-of-range coordinates are rejected without touching
    /// the index.
    pub fn add_strings(&mut self, doc_id: DocId, lon: &str, lat: &str) -> Result<()> {
        let point = GeoPoint::parse(lon, lat)?;
        self.points.insert(doc_id, point);
        Ok(())
    }

    /// Remove a document. Returns whether it was present.
    pub fn remove_doc(&mut self, doc_id: DocId) -> bool {
        self.points.remove(&doc_id).is_some()
    }

    /// Point of a document.
    pub fn get(&self, doc_id: DocId) -> Option<&GeoPoint> {
        self.points.get(&doc_id)
    }

    /// Documents within `radius_km` of `center`, in id order.
    pub fn within(&self, center: &GeoPoint, radius_km: f64) -> Vec<DocId> {
        self.points
            .iter()
            .filter(|(_, p)| center.distance_to(p) <= radius_km)
            .map(|(&id, _)| id)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}
