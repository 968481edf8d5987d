//! Request and response bodies for the HTTP API
//!
//! Requests carry their own boundary validation; domain rules run after it.

use crate::domain::customers::CustomerRegistration;
use crate::domain::pricing::Settlement;
use crate::domain::rentals::{Rental, RentalDetails};
use crate::domain::types::{CustomerId, LicenseType, RiskLevel, VehicleStatus};
use crate::domain::vehicles::VehicleUpdate;
use crate::error::{RentalError, Result};
use chrono::{DateTime, NaiveDate, Utc};
use mottu_common::types::DEFAULT_PAGE_SIZE;
use mottu_common::PageRequest;
use serde::{Deserialize, Serialize};

pub const NAME_LENGTH: (usize, usize) = (3, 150);
pub const MODEL_LENGTH: (usize, usize) = (3, 100);
pub const PLATE_LENGTH: (usize, usize) = (7, 10);
pub const DOCUMENT_DIGITS: usize = 11;
pub const MIN_VEHICLE_YEAR: i32 = 1990;
pub const RISK_AGE_RANGE: (u32, u32) = (18, 100);

fn check_length(field: &str, value: &str, (min, max): (usize, usize)) -> Result<()> {
    let len = value.trim().chars().count();
    if len < min || len > max {
        return Err(RentalError::validation(
            field,
            format!("must be between {min} and {max} characters"),
        ));
    }
    Ok(())
}

fn check_digits(field: &str, value: &str) -> Result<()> {
    if value.len() != DOCUMENT_DIGITS || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(RentalError::validation(
            field,
            format!("must be exactly {DOCUMENT_DIGITS} digits"),
        ));
    }
    Ok(())
}

fn check_year(year: i32, current_year: i32) -> Result<()> {
    if year < MIN_VEHICLE_YEAR || year > current_year + 1 {
        return Err(RentalError::validation(
            "year",
            format!("must be between {MIN_VEHICLE_YEAR} and {}", current_year + 1),
        ));
    }
    Ok(())
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageParams {
    pub page_number: Option<u32>,
    pub page_size: Option<u32>,
}

impl PageParams {
    pub fn to_page_request(&self) -> Result<PageRequest> {
        PageRequest::new(
            self.page_number.unwrap_or(1),
            self.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
        )
        .map_err(|e| RentalError::validation("page", e.to_string()))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateCustomerRequest {
    pub name: String,
    pub national_id: String,
    pub birth_date: NaiveDate,
    pub license_number: String,
    pub license_type: String,
}

impl CreateCustomerRequest {
    pub fn validate(self) -> Result<CustomerRegistration> {
        check_length("name", &self.name, NAME_LENGTH)?;
        check_digits("national_id", &self.national_id)?;
        check_digits("license_number", &self.license_number)?;

        Ok(CustomerRegistration {
            name: self.name.trim().to_string(),
            national_id: self.national_id,
            birth_date: self.birth_date,
            license_number: self.license_number,
            license_type: self.license_type,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateCustomerRequest {
    pub name: String,
}

impl UpdateCustomerRequest {
    pub fn validate(self) -> Result<String> {
        check_length("name", &self.name, NAME_LENGTH)?;
        Ok(self.name.trim().to_string())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EstimateRiskRequest {
    pub age: u32,
    pub license_type: String,
}

impl EstimateRiskRequest {
    pub fn validate(&self) -> Result<LicenseType> {
        let (min, max) = RISK_AGE_RANGE;
        if self.age < min || self.age > max {
            return Err(RentalError::validation(
                "age",
                format!("must be between {min} and {max}"),
            ));
        }
        self.license_type
            .parse::<LicenseType>()
            .map_err(|e| RentalError::validation("license_type", e.to_string()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EstimateRiskResponse {
    pub risk: RiskLevel,
    pub age: u32,
    pub license_type: LicenseType,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateVehicleRequest {
    pub year: i32,
    pub model: String,
    pub plate: String,
}

impl CreateVehicleRequest {
    pub fn validate(self, current_year: i32) -> Result<(i32, String, String)> {
        check_year(self.year, current_year)?;
        check_length("model", &self.model, MODEL_LENGTH)?;
        check_length("plate", &self.plate, PLATE_LENGTH)?;
        Ok((
            self.year,
            self.model.trim().to_string(),
            self.plate.trim().to_ascii_uppercase(),
        ))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateVehicleRequest {
    pub year: i32,
    pub model: String,
    pub status: String,
}

impl UpdateVehicleRequest {
    pub fn validate(self, current_year: i32) -> Result<VehicleUpdate> {
        check_year(self.year, current_year)?;
        check_length("model", &self.model, MODEL_LENGTH)?;
        let status = self
            .status
            .parse::<VehicleStatus>()
            .map_err(|e| RentalError::validation("status", e.to_string()))?;

        Ok(VehicleUpdate {
            year: self.year,
            model: self.model.trim().to_string(),
            status,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateRentalRequest {
    pub customer_id: i64,
    pub expected_end: DateTime<Utc>,
}

impl CreateRentalRequest {
    pub fn customer_id(&self) -> Result<CustomerId> {
        if self.customer_id < 1 {
            return Err(RentalError::validation("customer_id", "must be positive"));
        }
        Ok(CustomerId::new(self.customer_id))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReturnRentalRequest {
    pub returned_at: DateTime<Utc>,
}

/// Rental as served by the read endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RentalResponse {
    #[serde(flatten)]
    pub details: RentalDetails,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settlement: Option<Settlement>,
}

impl From<RentalDetails> for RentalResponse {
    fn from(details: RentalDetails) -> Self {
        let settlement = details.rental.settlement();
        Self {
            details,
            settlement,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReturnRentalResponse {
    pub rental: Rental,
    pub settlement: Settlement,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckResponse {
    pub status: String,
    pub storage: String,
    pub timestamp: DateTime<Utc>,
}
