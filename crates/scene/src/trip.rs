use foundation::ids::TripId;
use foundation::math::GeoCoordinate;
use serde::{Deserialize, Serialize};

/// The slice of a trip record the globe needs.
///
/// Trip stores carry far more (dates, photos, notes); unknown fields are
/// ignored when deserializing so store records can be fed in directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trip {
    pub id: TripId,
    pub coordinates: GeoCoordinate,
}

impl Trip {
    pub fn new(id: impl Into<TripId>, lat: f64, lng: f64) -> Self {
        Self {
            id: id.into(),
            coordinates: GeoCoordinate::new(lat, lng),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Trip;

    #[test]
    fn ignores_store_only_fields() {
        let json = r#"{
            "id": "a1",
            "title": "Icelandic Roadtrip",
            "coordinates": { "lat": 64.1466, "lng": -21.9426 },
            "tags": ["Nature"]
        }"#;
        let trip: Trip = serde_json::from_str(json).expect("trip");
        assert_eq!(trip, Trip::new("a1", 64.1466, -21.9426));
    }
}
