/// Mean earth radius in kilometers
const EARTH_RADIUS: f64 = 6371.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> GeoPoint {
        GeoPoint {
            latitude,
            longitude,
        }
    }

    /// Great-circle distance to `other` in kilometers (haversine formula)
    pub fn distance(&self, other: &GeoPoint) -> f64 {
        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();
        let delta_lat = (other.latitude - self.latitude).to_radians();
        let delta_lon = (other.longitude - self.longitude).to_radians();

        let a = (delta_lat / 2.).sin().powi(2)
            + lat1.cos() * lat2.cos() * (delta_lon / 2.).sin().powi(2);

        2. * EARTH_RADIUS * a.sqrt().min(1.).asin()
    }
}

/// Total length of a path in kilometers.
///
/// Sums the distances between consecutive points. Paths with less than two
/// points have a length of zero.
pub fn track_length(points: &[GeoPoint]) -> f64 {
    points.windows(2).map(|w| w[0].distance(&w[1])).sum()
}
