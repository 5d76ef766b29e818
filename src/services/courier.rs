//! Courier aggregator wrapper: rate lookup and shipment booking.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metrics::counter;
use reqwest::{Method, StatusCode};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};
use utoipa::ToSchema;

use crate::circuit_breaker::CircuitBreaker;
use crate::config::CourierConfig;
use crate::entities::order::PaymentMethod;
use crate::errors::ServiceError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateRequest {
    pub pickup_pincode: String,
    pub delivery_pincode: String,
    pub weight_kg: f64,
    pub length_cm: f64,
    pub breadth_cm: f64,
    pub height_cm: f64,
    pub cod: bool,
    pub declared_value: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CourierRate {
    pub courier_id: i64,
    pub courier_name: String,
    pub rate: Decimal,
    pub estimated_delivery_days: Option<u32>,
    /// Expected delivery date as reported by the courier
    pub etd: Option<String>,
    pub cod_available: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShipmentItem {
    pub name: String,
    pub sku: String,
    pub units: i32,
    pub selling_price: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShipmentRequest {
    pub order_number: String,
    pub order_date: DateTime<Utc>,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub address_line1: String,
    pub address_line2: Option<String>,
    pub city: String,
    pub state: String,
    pub pincode: String,
    pub payment_method: PaymentMethod,
    pub sub_total: Decimal,
    pub items: Vec<ShipmentItem>,
    pub weight_kg: f64,
    pub length_cm: f64,
    pub breadth_cm: f64,
    pub height_cm: f64,
    /// Courier chosen from the rate list; `None` lets the aggregator pick
    pub courier_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatedShipment {
    pub provider_order_id: String,
    pub provider_shipment_id: String,
    pub awb_code: Option<String>,
    pub courier_id: Option<i64>,
    pub courier_name: Option<String>,
}

/// Outbound courier integration
#[async_trait]
pub trait CourierClient: Send + Sync {
    fn provider(&self) -> &'static str;

    /// Serviceable couriers for the route, in the order the provider returned them
    async fn fetch_rates(&self, request: &RateRequest) -> Result<Vec<CourierRate>, ServiceError>;

    async fn create_shipment(
        &self,
        request: &ShipmentRequest,
    ) -> Result<CreatedShipment, ServiceError>;
}

/// Stand-in used when no courier credentials are configured
#[derive(Debug, Default, Clone)]
pub struct DisabledCourierClient;

#[async_trait]
impl CourierClient for DisabledCourierClient {
    fn provider(&self) -> &'static str {
        "disabled"
    }

    async fn fetch_rates(&self, _request: &RateRequest) -> Result<Vec<CourierRate>, ServiceError> {
        Err(ServiceError::ServiceUnavailable(
            "Courier integration is not configured".to_string(),
        ))
    }

    async fn create_shipment(
        &self,
        _request: &ShipmentRequest,
    ) -> Result<CreatedShipment, ServiceError> {
        Err(ServiceError::ServiceUnavailable(
            "Courier integration is not configured".to_string(),
        ))
    }
}

/// Builds the configured client, falling back to [`DisabledCourierClient`]
pub fn courier_from_config(
    config: &CourierConfig,
    breaker: Arc<CircuitBreaker>,
) -> Result<Arc<dyn CourierClient>, ServiceError> {
    if config.is_configured() {
        Ok(Arc::new(ShiprocketClient::new(config.clone(), breaker)?))
    } else {
        info!("Courier integration disabled; shipping quotes will be unavailable");
        Ok(Arc::new(DisabledCourierClient))
    }
}

/// Shiprocket-compatible REST client. The bearer token is either configured
/// or obtained by logging in, and cached until the API rejects it.
pub struct ShiprocketClient {
    client: reqwest::Client,
    config: CourierConfig,
    token: RwLock<Option<String>>,
    breaker: Arc<CircuitBreaker>,
}

impl ShiprocketClient {
    pub fn new(config: CourierConfig, breaker: Arc<CircuitBreaker>) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| ServiceError::InternalError(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            token: RwLock::new(config.api_token.clone()),
            config,
            breaker,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn token(&self) -> Result<String, ServiceError> {
        if let Some(token) = self.token.read().await.clone() {
            return Ok(token);
        }

        let (email, password) = match (&self.config.email, &self.config.password) {
            (Some(email), Some(password)) => (email.clone(), password.clone()),
            _ => {
                return Err(ServiceError::ServiceUnavailable(
                    "Courier token rejected and no login credentials configured".to_string(),
                ))
            }
        };

        debug!("Logging in to courier API");
        let response = self
            .client
            .post(self.url("/v1/external/auth/login"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let body: Value = response.json().await.map_err(transport_error)?;
        if !status.is_success() {
            return Err(ServiceError::ExternalServiceError(format!(
                "Courier login failed with status {}",
                status
            )));
        }

        let token = body
            .get("token")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                ServiceError::ExternalServiceError("Courier login returned no token".to_string())
            })?
            .to_string();

        *self.token.write().await = Some(token.clone());
        Ok(token)
    }

    /// Sends an authorized request. A 401 drops the cached token and the
    /// request is retried once with a fresh login.
    async fn send(
        &self,
        method: Method,
        path: &str,
        query: Option<&[(&str, String)]>,
        body: Option<&Value>,
    ) -> Result<Value, ServiceError> {
        let mut retried = false;
        loop {
            let token = self.token().await?;
            let mut request = self
                .client
                .request(method.clone(), self.url(path))
                .bearer_auth(&token);
            if let Some(query) = query {
                request = request.query(query);
            }
            if let Some(body) = body {
                request = request.json(body);
            }

            let response = request.send().await.map_err(transport_error)?;
            let status = response.status();

            if status == StatusCode::UNAUTHORIZED && !retried {
                warn!(path, "Courier API rejected token, re-authenticating");
                *self.token.write().await = None;
                retried = true;
                continue;
            }

            let text = response.text().await.map_err(transport_error)?;
            if !status.is_success() {
                counter!("aquacare_courier.errors", 1, "path" => path.to_string());
                let snippet: String = text.chars().take(200).collect();
                return Err(ServiceError::ExternalServiceError(format!(
                    "Courier API {} returned {}: {}",
                    path, status, snippet
                )));
            }

            if text.trim().is_empty() {
                return Ok(Value::Null);
            }
            return serde_json::from_str(&text).map_err(|e| {
                ServiceError::ExternalServiceError(format!("Invalid courier response: {}", e))
            });
        }
    }

    async fn assign_awb(
        &self,
        shipment_id: &str,
        courier_id: Option<i64>,
    ) -> Result<(Option<String>, Option<i64>, Option<String>), ServiceError> {
        let mut payload = json!({ "shipment_id": shipment_id });
        if let Some(courier_id) = courier_id {
            payload["courier_id"] = json!(courier_id);
        }

        let body = self
            .send(
                Method::POST,
                "/v1/external/courier/assign/awb",
                None,
                Some(&payload),
            )
            .await?;

        let data = body
            .pointer("/response/data")
            .cloned()
            .unwrap_or(Value::Null);
        Ok((
            non_empty_str(data.get("awb_code")),
            data.get("courier_company_id").and_then(value_as_i64),
            non_empty_str(data.get("courier_name")),
        ))
    }
}

#[async_trait]
impl CourierClient for ShiprocketClient {
    fn provider(&self) -> &'static str {
        "shiprocket"
    }

    #[instrument(skip(self, request), fields(to = %request.delivery_pincode))]
    async fn fetch_rates(&self, request: &RateRequest) -> Result<Vec<CourierRate>, ServiceError> {
        let query = [
            ("pickup_postcode", request.pickup_pincode.clone()),
            ("delivery_postcode", request.delivery_pincode.clone()),
            ("weight", format!("{:.2}", request.weight_kg)),
            ("length", format!("{:.0}", request.length_cm.ceil())),
            ("breadth", format!("{:.0}", request.breadth_cm.ceil())),
            ("height", format!("{:.0}", request.height_cm.ceil())),
            ("cod", if request.cod { "1" } else { "0" }.to_string()),
            ("declared_value", request.declared_value.round_dp(2).to_string()),
        ];

        let body = self
            .breaker
            .call(|| {
                self.send(
                    Method::GET,
                    "/v1/external/courier/serviceability/",
                    Some(&query),
                    None,
                )
            })
            .await?;

        let rates = parse_rates(&body);
        debug!(count = rates.len(), "Courier rates fetched");
        Ok(rates)
    }

    #[instrument(skip(self, request), fields(order_number = %request.order_number))]
    async fn create_shipment(
        &self,
        request: &ShipmentRequest,
    ) -> Result<CreatedShipment, ServiceError> {
        let payload = adhoc_order_payload(request, &self.config.pickup_location);

        let body = self
            .breaker
            .call(|| {
                self.send(
                    Method::POST,
                    "/v1/external/orders/create/adhoc",
                    None,
                    Some(&payload),
                )
            })
            .await?;

        let provider_order_id = body.get("order_id").and_then(value_as_string);
        let provider_shipment_id = body.get("shipment_id").and_then(value_as_string);
        let (provider_order_id, provider_shipment_id) =
            match (provider_order_id, provider_shipment_id) {
                (Some(order_id), Some(shipment_id)) => (order_id, shipment_id),
                _ => {
                    return Err(ServiceError::ExternalServiceError(
                        "Courier order response missing order_id/shipment_id".to_string(),
                    ))
                }
            };

        let mut created = CreatedShipment {
            provider_order_id,
            provider_shipment_id,
            awb_code: non_empty_str(body.get("awb_code")),
            courier_id: body.get("courier_company_id").and_then(value_as_i64),
            courier_name: non_empty_str(body.get("courier_name")),
        };

        if created.awb_code.is_none() && self.config.auto_assign_awb {
            let shipment_id = created.provider_shipment_id.clone();
            match self
                .breaker
                .call(|| self.assign_awb(&shipment_id, request.courier_id))
                .await
            {
                Ok((awb, courier_id, courier_name)) => {
                    created.awb_code = awb;
                    created.courier_id = courier_id.or(created.courier_id);
                    created.courier_name = courier_name.or(created.courier_name);
                }
                Err(e) => {
                    // The courier order exists; the AWB can be assigned from the courier panel.
                    warn!(error = %e, shipment_id = %shipment_id, "AWB assignment failed");
                    counter!("aquacare_courier.awb_failures", 1);
                }
            }
        }

        info!(
            provider_order_id = %created.provider_order_id,
            awb = created.awb_code.as_deref().unwrap_or("-"),
            "Courier shipment created"
        );
        Ok(created)
    }
}

fn transport_error(e: reqwest::Error) -> ServiceError {
    counter!("aquacare_courier.transport_errors", 1);
    ServiceError::ExternalServiceError(format!("Courier API unreachable: {}", e))
}

fn value_as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn value_as_string(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    }
}

fn non_empty_str(value: Option<&Value>) -> Option<String> {
    value.and_then(value_as_string)
}

fn value_as_decimal(value: &Value) -> Option<Decimal> {
    let raw = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        _ => return None,
    };
    Decimal::from_str(&raw)
        .or_else(|_| Decimal::from_scientific(&raw))
        .ok()
        .map(|d| d.round_dp(2))
}

/// Maps the serviceability payload; couriers without a usable rate are skipped.
fn parse_rates(body: &Value) -> Vec<CourierRate> {
    let companies = body
        .pointer("/data/available_courier_companies")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    companies
        .iter()
        .filter_map(|company| {
            let courier_id = company.get("courier_company_id").and_then(value_as_i64)?;
            let rate = company
                .get("rate")
                .or_else(|| company.get("freight_charge"))
                .and_then(value_as_decimal)?;
            Some(CourierRate {
                courier_id,
                courier_name: company
                    .get("courier_name")
                    .and_then(value_as_string)
                    .unwrap_or_else(|| format!("Courier {}", courier_id)),
                rate,
                estimated_delivery_days: company
                    .get("estimated_delivery_days")
                    .and_then(value_as_i64)
                    .and_then(|d| u32::try_from(d).ok()),
                etd: company.get("etd").and_then(value_as_string),
                cod_available: company
                    .get("cod")
                    .and_then(value_as_i64)
                    .map(|c| c == 1)
                    .unwrap_or(false),
            })
        })
        .collect()
}

fn adhoc_order_payload(request: &ShipmentRequest, pickup_location: &str) -> Value {
    let (first_name, last_name) = match request.customer_name.trim().split_once(' ') {
        Some((first, last)) => (first.to_string(), last.trim().to_string()),
        None => (request.customer_name.trim().to_string(), String::new()),
    };

    let items: Vec<Value> = request
        .items
        .iter()
        .map(|item| {
            json!({
                "name": item.name,
                "sku": item.sku,
                "units": item.units,
                "selling_price": item.selling_price.round_dp(2).to_string(),
            })
        })
        .collect();

    json!({
        "order_id": request.order_number,
        "order_date": request.order_date.format("%Y-%m-%d %H:%M").to_string(),
        "pickup_location": pickup_location,
        "billing_customer_name": first_name,
        "billing_last_name": last_name,
        "billing_address": request.address_line1,
        "billing_address_2": request.address_line2.clone().unwrap_or_default(),
        "billing_city": request.city,
        "billing_pincode": request.pincode,
        "billing_state": request.state,
        "billing_country": "India",
        "billing_email": request.customer_email,
        "billing_phone": request.customer_phone,
        "shipping_is_billing": true,
        "order_items": items,
        "payment_method": match request.payment_method {
            PaymentMethod::Cod => "COD",
            PaymentMethod::Prepaid => "Prepaid",
        },
        "sub_total": request.sub_total.round_dp(2).to_string(),
        "length": request.length_cm,
        "breadth": request.breadth_cm,
        "height": request.height_cm,
        "weight": request.weight_kg,
    })
}
