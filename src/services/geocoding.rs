use crate::{
    circuit_breaker::CircuitBreaker, config::GeocodingConfig, errors::ServiceError,
    services::is_valid_pincode,
};
use async_trait::async_trait;
use metrics::counter;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct Coordinates {
    #[serde(alias = "lat")]
    pub latitude: f64,
    #[serde(alias = "lon", alias = "lng")]
    pub longitude: f64,
}

impl Coordinates {
    pub fn validate(&self) -> Result<(), ServiceError> {
        if !self.latitude.is_finite() || !(-90.0..=90.0).contains(&self.latitude) {
            return Err(ServiceError::ValidationError(format!(
                "Latitude {} must be between -90 and 90",
                self.latitude
            )));
        }
        if !self.longitude.is_finite() || !(-180.0..=180.0).contains(&self.longitude) {
            return Err(ServiceError::ValidationError(format!(
                "Longitude {} must be between -180 and 180",
                self.longitude
            )));
        }
        Ok(())
    }
}

/// Address resolved from a point, ready to prefill a checkout form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Address {
    pub line: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub pincode: Option<String>,
    pub country: Option<String>,
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PincodeLocation {
    pub pincode: String,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub coordinates: Option<Coordinates>,
}

#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn reverse(&self, point: Coordinates) -> Result<Address, ServiceError>;

    async fn lookup_pincode(&self, pincode: &str) -> Result<PincodeLocation, ServiceError>;
}

#[derive(Debug, Default, Clone)]
pub struct DisabledGeocoder;

#[async_trait]
impl Geocoder for DisabledGeocoder {
    async fn reverse(&self, _point: Coordinates) -> Result<Address, ServiceError> {
        Err(ServiceError::ServiceUnavailable(
            "Geolocation is disabled".to_string(),
        ))
    }

    async fn lookup_pincode(&self, _pincode: &str) -> Result<PincodeLocation, ServiceError> {
        Err(ServiceError::ServiceUnavailable(
            "Geolocation is disabled".to_string(),
        ))
    }
}

/// Client for a Nominatim-compatible geocoding server
pub struct NominatimGeocoder {
    client: reqwest::Client,
    base_url: String,
    breaker: Arc<CircuitBreaker>,
}

impl NominatimGeocoder {
    pub fn new(config: &GeocodingConfig, breaker: Arc<CircuitBreaker>) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| ServiceError::InternalError(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            breaker,
        })
    }

    async fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value, ServiceError> {
        let response = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .query(query)
            .send()
            .await
            .map_err(|e| {
                counter!("aquacare_geocoding.transport_errors", 1);
                ServiceError::ExternalServiceError(format!("Geocoder unreachable: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ServiceError::ExternalServiceError(format!(
                "Geocoder {} returned {}",
                path, status
            )));
        }
        response
            .json()
            .await
            .map_err(|e| ServiceError::ExternalServiceError(format!("Invalid geocoder response: {}", e)))
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    #[instrument(skip(self))]
    async fn reverse(&self, point: Coordinates) -> Result<Address, ServiceError> {
        let query = [
            ("format", "jsonv2".to_string()),
            ("addressdetails", "1".to_string()),
            ("lat", point.latitude.to_string()),
            ("lon", point.longitude.to_string()),
        ];
        let body = self
            .breaker
            .call(|| self.get_json("/reverse", &query))
            .await?;

        if let Some(error) = body.get("error").and_then(Value::as_str) {
            debug!(error, "Reverse geocoding found nothing");
            return Err(ServiceError::NotFound(format!(
                "No address found for {}, {}",
                point.latitude, point.longitude
            )));
        }
        Ok(address_from_place(&body))
    }

    #[instrument(skip(self))]
    async fn lookup_pincode(&self, pincode: &str) -> Result<PincodeLocation, ServiceError> {
        let query = [
            ("format", "jsonv2".to_string()),
            ("addressdetails", "1".to_string()),
            ("limit", "1".to_string()),
            ("country", "India".to_string()),
            ("postalcode", pincode.to_string()),
        ];
        let body = self
            .breaker
            .call(|| self.get_json("/search", &query))
            .await?;

        let place = body
            .as_array()
            .and_then(|places| places.first())
            .ok_or_else(|| ServiceError::NotFound(format!("Pincode {} not found", pincode)))?;

        let address = address_from_place(place);
        let coordinates = match (coordinate(place.get("lat")), coordinate(place.get("lon"))) {
            (Some(latitude), Some(longitude)) => Some(Coordinates {
                latitude,
                longitude,
            }),
            _ => None,
        };

        Ok(PincodeLocation {
            pincode: pincode.to_string(),
            city: address.city,
            state: address.state,
            country: address.country,
            coordinates,
        })
    }
}

fn coordinate(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::String(s) => s.parse().ok(),
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
}

fn first_field(address: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|k| address.get(*k).and_then(Value::as_str))
        .map(str::to_string)
}

/// Maps a Nominatim place. City falls back through town, village and
/// district since rural results rarely carry a city.
fn address_from_place(place: &Value) -> Address {
    let address = place.get("address").cloned().unwrap_or(Value::Null);

    let line_parts: Vec<String> = ["house_number", "road", "neighbourhood", "suburb"]
        .iter()
        .filter_map(|k| address.get(*k).and_then(Value::as_str))
        .map(str::to_string)
        .collect();

    Address {
        line: (!line_parts.is_empty()).then(|| line_parts.join(", ")),
        city: first_field(&address, &["city", "town", "village", "state_district", "county"]),
        state: first_field(&address, &["state"]),
        pincode: first_field(&address, &["postcode"]).map(|p| p.replace(' ', "")),
        country: first_field(&address, &["country"]),
        display_name: place
            .get("display_name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
    }
}

pub fn geocoder_from_config(
    config: &GeocodingConfig,
    breaker: Arc<CircuitBreaker>,
) -> Result<Arc<dyn Geocoder>, ServiceError> {
    if config.enabled {
        Ok(Arc::new(NominatimGeocoder::new(config, breaker)?))
    } else {
        info!("Geolocation disabled");
        Ok(Arc::new(DisabledGeocoder))
    }
}

/// Input checks in front of the configured [`Geocoder`]
#[derive(Clone)]
pub struct GeocodingService {
    geocoder: Arc<dyn Geocoder>,
}

impl GeocodingService {
    pub fn new(geocoder: Arc<dyn Geocoder>) -> Self {
        Self { geocoder }
    }

    pub async fn reverse(&self, point: Coordinates) -> Result<Address, ServiceError> {
        point.validate()?;
        self.geocoder.reverse(point).await
    }

    pub async fn lookup_pincode(&self, pincode: &str) -> Result<PincodeLocation, ServiceError> {
        let pincode = pincode.trim();
        if !is_valid_pincode(pincode) {
            return Err(ServiceError::ValidationError(format!(
                "Invalid pincode {}",
                pincode
            )));
        }
        self.geocoder.lookup_pincode(pincode).await
    }
}
