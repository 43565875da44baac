//! Raw listing attributes and prediction requests

use crate::error::PredictionError;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Room type of a listing.
///
/// Unknown strings are kept as `Unrecognized` instead of failing
/// deserialization; they produce an all-zero one-hot group downstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RoomType {
    EntireHome,
    PrivateRoom,
    SharedRoom,
    Unrecognized(String),
}

impl RoomType {
    pub const ALL: [RoomType; 3] = [
        RoomType::EntireHome,
        RoomType::PrivateRoom,
        RoomType::SharedRoom,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            RoomType::EntireHome => "Entire home/apt",
            RoomType::PrivateRoom => "Private room",
            RoomType::SharedRoom => "Shared room",
            RoomType::Unrecognized(raw) => raw,
        }
    }
}

impl From<String> for RoomType {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "Entire home/apt" => RoomType::EntireHome,
            "Private room" => RoomType::PrivateRoom,
            "Shared room" => RoomType::SharedRoom,
            _ => RoomType::Unrecognized(raw),
        }
    }
}

impl From<RoomType> for String {
    fn from(room_type: RoomType) -> Self {
        match room_type {
            RoomType::Unrecognized(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for RoomType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// NYC borough the listing belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NeighbourhoodGroup {
    Manhattan,
    Brooklyn,
    Queens,
    Bronx,
    StatenIsland,
    Unrecognized(String),
}

impl NeighbourhoodGroup {
    pub const ALL: [NeighbourhoodGroup; 5] = [
        NeighbourhoodGroup::Manhattan,
        NeighbourhoodGroup::Brooklyn,
        NeighbourhoodGroup::Queens,
        NeighbourhoodGroup::Bronx,
        NeighbourhoodGroup::StatenIsland,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            NeighbourhoodGroup::Manhattan => "Manhattan",
            NeighbourhoodGroup::Brooklyn => "Brooklyn",
            NeighbourhoodGroup::Queens => "Queens",
            NeighbourhoodGroup::Bronx => "Bronx",
            NeighbourhoodGroup::StatenIsland => "Staten Island",
            NeighbourhoodGroup::Unrecognized(raw) => raw,
        }
    }
}

impl From<String> for NeighbourhoodGroup {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "Manhattan" => NeighbourhoodGroup::Manhattan,
            "Brooklyn" => NeighbourhoodGroup::Brooklyn,
            "Queens" => NeighbourhoodGroup::Queens,
            "Bronx" => NeighbourhoodGroup::Bronx,
            "Staten Island" => NeighbourhoodGroup::StatenIsland,
            _ => NeighbourhoodGroup::Unrecognized(raw),
        }
    }
}

impl From<NeighbourhoodGroup> for String {
    fn from(group: NeighbourhoodGroup) -> Self {
        match group {
            NeighbourhoodGroup::Unrecognized(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for NeighbourhoodGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which scoring path a request runs through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PredictionKind {
    Price,
    Demand,
}

impl PredictionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PredictionKind::Price => "price",
            PredictionKind::Demand => "demand",
        }
    }
}

impl FromStr for PredictionKind {
    type Err = PredictionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "price" => Ok(PredictionKind::Price),
            "demand" => Ok(PredictionKind::Demand),
            other => Err(PredictionError::invalid(format!(
                "unknown prediction_type '{}', expected 'price' or 'demand'",
                other
            ))),
        }
    }
}

impl fmt::Display for PredictionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Listing attributes as submitted by the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawListing {
    pub latitude: f64,
    pub longitude: f64,
    pub room_type: RoomType,
    pub neighbourhood_group: NeighbourhoodGroup,
    pub neighbourhood: String,
    pub minimum_nights: i64,
    pub number_of_reviews: i64,
    /// Missing, null or non-numeric values are read as 0
    #[serde(default, deserialize_with = "lenient_f64")]
    pub reviews_per_month: f64,
    pub calculated_host_listings_count: i64,
    pub availability_365: i64,
}

impl RawListing {
    /// Create a listing with the given categories and neutral defaults
    /// (Times Square coordinates, no reviews, available all year).
    pub fn new(
        room_type: RoomType,
        neighbourhood_group: NeighbourhoodGroup,
        neighbourhood: impl Into<String>,
    ) -> Self {
        Self {
            latitude: 40.7580,
            longitude: -73.9855,
            room_type,
            neighbourhood_group,
            neighbourhood: neighbourhood.into(),
            minimum_nights: 1,
            number_of_reviews: 0,
            reviews_per_month: 0.0,
            calculated_host_listings_count: 1,
            availability_365: 365,
        }
    }

    /// Check the numeric contract. Categorical fields are never rejected.
    pub fn validate(&self) -> Result<(), PredictionError> {
        if !self.latitude.is_finite() || !(-90.0..=90.0).contains(&self.latitude) {
            return Err(PredictionError::invalid(format!(
                "latitude {} is not a valid coordinate",
                self.latitude
            )));
        }
        if !self.longitude.is_finite() || !(-180.0..=180.0).contains(&self.longitude) {
            return Err(PredictionError::invalid(format!(
                "longitude {} is not a valid coordinate",
                self.longitude
            )));
        }
        if self.minimum_nights < 1 {
            return Err(PredictionError::invalid(format!(
                "minimum_nights must be at least 1, got {}",
                self.minimum_nights
            )));
        }
        if self.number_of_reviews < 0 {
            return Err(PredictionError::invalid(format!(
                "number_of_reviews must not be negative, got {}",
                self.number_of_reviews
            )));
        }
        if !self.reviews_per_month.is_finite() || self.reviews_per_month < 0.0 {
            return Err(PredictionError::invalid(format!(
                "reviews_per_month must not be negative, got {}",
                self.reviews_per_month
            )));
        }
        if self.calculated_host_listings_count < 1 {
            return Err(PredictionError::invalid(format!(
                "calculated_host_listings_count must be at least 1, got {}",
                self.calculated_host_listings_count
            )));
        }
        if !(0..=365).contains(&self.availability_365) {
            return Err(PredictionError::invalid(format!(
                "availability_365 must be within 0-365, got {}",
                self.availability_365
            )));
        }
        Ok(())
    }
}

/// A prediction request: the kind to run plus the listing attributes.
///
/// `prediction_type` stays a string until [`PredictionRequest::kind`] so an
/// unknown value is reported as an invalid request rather than a decode error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRequest {
    pub prediction_type: String,
    #[serde(flatten)]
    pub listing: RawListing,
}

impl PredictionRequest {
    pub fn new(kind: PredictionKind, listing: RawListing) -> Self {
        Self {
            prediction_type: kind.as_str().to_string(),
            listing,
        }
    }

    pub fn kind(&self) -> Result<PredictionKind, PredictionError> {
        self.prediction_type.parse()
    }

    /// Resolve the kind and validate the listing
    pub fn validate(&self) -> Result<PredictionKind, PredictionError> {
        let kind = self.kind()?;
        self.listing.validate()?;
        Ok(kind)
    }

    /// Decode a request from a JSON payload, mapping decode failures to
    /// `InvalidRequest`.
    pub fn from_json(payload: &[u8]) -> Result<Self, PredictionError> {
        serde_json::from_slice(payload)
            .map_err(|e| PredictionError::invalid(format!("malformed request: {}", e)))
    }
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    use serde_json::Value;

    let value = Value::deserialize(deserializer)?;
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    Ok(parsed.filter(|v| v.is_finite()).unwrap_or(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn harlem_request(kind: &str) -> serde_json::Value {
        json!({
            "prediction_type": kind,
            "latitude": 40.7580,
            "longitude": -73.9855,
            "room_type": "Entire home/apt",
            "neighbourhood_group": "Manhattan",
            "neighbourhood": "Harlem",
            "minimum_nights": 1,
            "number_of_reviews": 30,
            "reviews_per_month": 2.5,
            "calculated_host_listings_count": 1,
            "availability_365": 100
        })
    }

    #[test]
    fn test_request_deserialization() {
        let payload = serde_json::to_vec(&harlem_request("price")).unwrap();
        let request = PredictionRequest::from_json(&payload).unwrap();

        assert_eq!(request.kind().unwrap(), PredictionKind::Price);
        assert_eq!(request.listing.room_type, RoomType::EntireHome);
        assert_eq!(request.listing.neighbourhood_group, NeighbourhoodGroup::Manhattan);
        assert_eq!(request.listing.reviews_per_month, 2.5);
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_unknown_prediction_type_is_invalid() {
        let payload = serde_json::to_vec(&harlem_request("occupancy")).unwrap();
        let request = PredictionRequest::from_json(&payload).unwrap();

        assert!(matches!(
            request.validate(),
            Err(PredictionError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_reviews_per_month_lenient() {
        let mut value = harlem_request("demand");
        value.as_object_mut().unwrap().remove("reviews_per_month");
        let request: PredictionRequest = serde_json::from_value(value.clone()).unwrap();
        assert_eq!(request.listing.reviews_per_month, 0.0);

        value["reviews_per_month"] = json!(null);
        let request: PredictionRequest = serde_json::from_value(value.clone()).unwrap();
        assert_eq!(request.listing.reviews_per_month, 0.0);

        value["reviews_per_month"] = json!("n/a");
        let request: PredictionRequest = serde_json::from_value(value.clone()).unwrap();
        assert_eq!(request.listing.reviews_per_month, 0.0);

        value["reviews_per_month"] = json!("1.75");
        let request: PredictionRequest = serde_json::from_value(value).unwrap();
        assert_eq!(request.listing.reviews_per_month, 1.75);
    }

    #[test]
    fn test_unrecognized_categories_deserialize() {
        let mut value = harlem_request("price");
        value["room_type"] = json!("Hotel room");
        value["neighbourhood_group"] = json!("Hoboken");
        let request: PredictionRequest = serde_json::from_value(value).unwrap();

        assert_eq!(
            request.listing.room_type,
            RoomType::Unrecognized("Hotel room".to_string())
        );
        assert_eq!(
            request.listing.neighbourhood_group,
            NeighbourhoodGroup::Unrecognized("Hoboken".to_string())
        );
        assert!(request.validate().is_ok());

        let json = serde_json::to_value(&request.listing).unwrap();
        assert_eq!(json["room_type"], "Hotel room");
    }

    #[test]
    fn test_validation_bounds() {
        let base = RawListing::new(RoomType::PrivateRoom, NeighbourhoodGroup::Queens, "Astoria");
        assert!(base.validate().is_ok());

        let cases: [fn(&mut RawListing); 8] = [
            (|l: &mut RawListing| l.latitude = 91.0),
            (|l: &mut RawListing| l.longitude = -180.5),
            (|l: &mut RawListing| l.minimum_nights = 0),
            (|l: &mut RawListing| l.number_of_reviews = -1),
            (|l: &mut RawListing| l.reviews_per_month = -0.5),
            (|l: &mut RawListing| l.calculated_host_listings_count = 0),
            (|l: &mut RawListing| l.availability_365 = 366),
            (|l: &mut RawListing| l.availability_365 = -1),
        ];

        for mutate in cases {
            let mut listing = base.clone();
            mutate(&mut listing);
            assert!(matches!(
                listing.validate(),
                Err(PredictionError::InvalidRequest(_))
            ));
        }
    }

    #[test]
    fn test_malformed_payload_is_invalid() {
        let result = PredictionRequest::from_json(b"{\"prediction_type\": \"price\"");
        assert!(matches!(result, Err(PredictionError::InvalidRequest(_))));
    }
}
