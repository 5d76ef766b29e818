// Catalog and checkout
pub mod orders;
pub mod products;

// Shipping
pub mod courier;
pub mod packaging;
pub mod shipments;

// Customer care
pub mod bookings;
pub mod call_requests;
pub mod chatbot;

// External Services
pub mod geocoding;

// Seller dashboard
pub mod dashboard;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use rand::{distributions::Alphanumeric, Rng};
use regex::Regex;
use rust_decimal::Decimal;
use validator::ValidationError;

use crate::errors::ServiceError;

static PINCODE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[1-9][0-9]{5}$").expect("valid regex"));

/// Indian postal code: six digits, never starting with zero
pub fn is_valid_pincode(pincode: &str) -> bool {
    PINCODE_RE.is_match(pincode.trim())
}

/// Reduces a phone number to its ten digit national form. A `+91`/`91`
/// country code or a trunk `0` prefix is dropped.
pub fn normalize_phone(raw: &str) -> Result<String, ServiceError> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    let national = match digits.len() {
        12 if digits.starts_with("91") => &digits[2..],
        11 if digits.starts_with('0') => &digits[1..],
        _ => digits.as_str(),
    };

    let valid = national.len() == 10
        && national
            .chars()
            .next()
            .map(|c| matches!(c, '6'..='9'))
            .unwrap_or(false);

    if valid {
        Ok(national.to_string())
    } else {
        Err(ServiceError::ValidationError(format!(
            "Invalid mobile number: {}",
            raw.trim()
        )))
    }
}

/// Human readable reference such as `ORD-20260318-7KQ2ZD`
pub fn generate_reference(prefix: &str, now: DateTime<Utc>) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(|b| (b as char).to_ascii_uppercase())
        .collect();
    format!("{}-{}-{}", prefix, now.format("%Y%m%d"), suffix)
}

/// Page size bounds shared by every list endpoint
#[derive(Debug, Clone, Copy)]
pub struct PageLimits {
    pub default_limit: u64,
    pub max_limit: u64,
}

impl Default for PageLimits {
    fn default() -> Self {
        Self {
            default_limit: 20,
            max_limit: 100,
        }
    }
}

impl PageLimits {
    pub fn from_config(cfg: &crate::config::AppConfig) -> Self {
        Self {
            default_limit: cfg.api_default_page_size,
            max_limit: cfg.api_max_page_size,
        }
    }

    /// Returns `(page, limit)` with page >= 1 and limit within bounds
    pub fn resolve(&self, page: Option<u64>, limit: Option<u64>) -> (u64, u64) {
        let page = page.unwrap_or(1).max(1);
        let limit = limit
            .unwrap_or(self.default_limit)
            .clamp(1, self.max_limit.max(1));
        (page, limit)
    }
}

pub(crate) fn validate_positive_amount(value: &Decimal) -> Result<(), ValidationError> {
    if *value > Decimal::ZERO {
        Ok(())
    } else {
        let mut err = ValidationError::new("positive_amount");
        err.message = Some("Amount must be greater than zero".into());
        Err(err)
    }
}

pub(crate) fn validate_pincode_field(pincode: &str) -> Result<(), ValidationError> {
    if is_valid_pincode(pincode) {
        Ok(())
    } else {
        let mut err = ValidationError::new("pincode");
        err.message = Some("Pincode must be 6 digits and cannot start with 0".into());
        Err(err)
    }
}

pub(crate) fn validate_phone_field(phone: &str) -> Result<(), ValidationError> {
    normalize_phone(phone).map(|_| ()).map_err(|_| {
        let mut err = ValidationError::new("phone");
        err.message = Some("Enter a valid 10 digit mobile number".into());
        err
    })
}

/// Trims and drops empty optional text
pub(crate) fn clean_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
