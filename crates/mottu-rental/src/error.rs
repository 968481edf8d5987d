use thiserror::Error;

#[derive(Debug, Error)]
pub enum RentalError {
    #[error("{field} '{value}' is already registered")]
    DuplicateIdentifier { field: String, value: String },

    #[error("License type {license_type} does not allow renting motorcycles")]
    IneligibleLicense { license_type: String },

    #[error("Customer must be at least {minimum} years old, got {age}")]
    Underage { age: i32, minimum: i32 },

    #[error("Customer not found: {id}")]
    CustomerNotFound { id: String },

    #[error("Vehicle not found: {id}")]
    VehicleNotFound { id: String },

    #[error("Rental not found: {id}")]
    RentalNotFound { id: String },

    #[error("Customer {customer_id} already has an active rental")]
    ActiveRentalExists { customer_id: String },

    #[error("Operation conflicts with active rental: {reason}")]
    ActiveRentalConflict { reason: String },

    #[error("Rental {id} is already completed")]
    AlreadyCompleted { id: String },

    #[error("Return date {returned_at} is before rental start {started_at}")]
    InvalidReturnDate {
        started_at: String,
        returned_at: String,
    },

    #[error("Expected end {expected_end} is before today {today}")]
    InvalidExpectedEnd { expected_end: String, today: String },

    #[error("No vehicle available for rental")]
    NoVehicleAvailable,

    #[error("Vehicle {id} is currently rented")]
    VehicleRented { id: String },

    #[error("Vehicle status cannot be set to {status}")]
    InvalidVehicleStatus { status: String },

    #[error("Validation error: {field} - {message}")]
    Validation { field: String, message: String },

    #[error("Database error during {operation}: {source}")]
    Database {
        operation: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

impl RentalError {
    pub fn database(operation: &str, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        RentalError::Database {
            operation: operation.to_string(),
            source: Box::new(source),
        }
    }

    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        RentalError::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }

    /// Stable machine-readable code
    pub fn error_code(&self) -> &'static str {
        match self {
            RentalError::DuplicateIdentifier { .. } => "MOTTU_DUPLICATE_IDENTIFIER",
            RentalError::IneligibleLicense { .. } => "MOTTU_INELIGIBLE_LICENSE",
            RentalError::Underage { .. } => "MOTTU_UNDERAGE",
            RentalError::CustomerNotFound { .. } => "MOTTU_CUSTOMER_NOT_FOUND",
            RentalError::VehicleNotFound { .. } => "MOTTU_VEHICLE_NOT_FOUND",
            RentalError::RentalNotFound { .. } => "MOTTU_RENTAL_NOT_FOUND",
            RentalError::ActiveRentalExists { .. } => "MOTTU_ACTIVE_RENTAL_EXISTS",
            RentalError::ActiveRentalConflict { .. } => "MOTTU_ACTIVE_RENTAL_CONFLICT",
            RentalError::AlreadyCompleted { .. } => "MOTTU_ALREADY_COMPLETED",
            RentalError::InvalidReturnDate { .. } => "MOTTU_INVALID_RETURN_DATE",
            RentalError::InvalidExpectedEnd { .. } => "MOTTU_INVALID_EXPECTED_END",
            RentalError::NoVehicleAvailable => "MOTTU_NO_VEHICLE_AVAILABLE",
            RentalError::VehicleRented { .. } => "MOTTU_VEHICLE_RENTED",
            RentalError::InvalidVehicleStatus { .. } => "MOTTU_INVALID_VEHICLE_STATUS",
            RentalError::Validation { .. } => "MOTTU_VALIDATION_ERROR",
            RentalError::Database { .. } => "MOTTU_DATABASE_ERROR",
            RentalError::Configuration { .. } => "MOTTU_CONFIG_ERROR",
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            RentalError::CustomerNotFound { .. }
                | RentalError::VehicleNotFound { .. }
                | RentalError::RentalNotFound { .. }
        )
    }

    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            RentalError::DuplicateIdentifier { .. }
                | RentalError::ActiveRentalExists { .. }
                | RentalError::ActiveRentalConflict { .. }
                | RentalError::AlreadyCompleted { .. }
                | RentalError::NoVehicleAvailable
                | RentalError::VehicleRented { .. }
        )
    }

    /// Infrastructure failures, as opposed to rejected business operations
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            RentalError::Database { .. } | RentalError::Configuration { .. }
        )
    }
}

impl From<sqlx::Error> for RentalError {
    fn from(err: sqlx::Error) -> Self {
        RentalError::database("query", err)
    }
}

pub type Result<T> = std::result::Result<T, RentalError>;
