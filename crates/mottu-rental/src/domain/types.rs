use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            pub const fn new(id: i64) -> Self {
                Self(id)
            }

            pub fn value(&self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }
    };
}

entity_id!(
    /// Customer identifier, assigned by the store in ascending order
    CustomerId
);
entity_id!(
    /// Vehicle identifier, assigned by the store in ascending order
    VehicleId
);
entity_id!(
    /// Rental identifier, assigned by the store in ascending order
    RentalId
);

/// Monetary amount with two fractional digits
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    pub const SCALE: u32 = 2;

    pub fn zero() -> Self {
        Self(Decimal::ZERO)
    }

    pub fn from_decimal(amount: Decimal) -> Self {
        Self(amount.round_dp_with_strategy(Self::SCALE, RoundingStrategy::MidpointAwayFromZero))
    }

    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    pub fn add(&self, other: Money) -> Self {
        Self::from_decimal(self.0 + other.0)
    }

    /// Multiply by a whole number of days
    pub fn times_days(&self, days: i64) -> Self {
        Self::from_decimal(self.0 * Decimal::from(days))
    }

    pub fn multiply(&self, factor: Decimal) -> Self {
        Self::from_decimal(self.0 * factor)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown {kind} '{value}'")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseEnumError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

/// Driving license category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LicenseType {
    A,
    B,
    AB,
}

impl LicenseType {
    /// Only motorcycle categories may rent
    pub fn can_rent_motorcycle(&self) -> bool {
        matches!(self, LicenseType::A | LicenseType::AB)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LicenseType::A => "A",
            LicenseType::B => "B",
            LicenseType::AB => "AB",
        }
    }
}

impl fmt::Display for LicenseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LicenseType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A" => Ok(LicenseType::A),
            "B" => Ok(LicenseType::B),
            "AB" => Ok(LicenseType::AB),
            _ => Err(ParseEnumError::new("license type", s)),
        }
    }
}

/// Vehicle availability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VehicleStatus {
    Available,
    Rented,
    Maintenance,
}

impl VehicleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VehicleStatus::Available => "available",
            VehicleStatus::Rented => "rented",
            VehicleStatus::Maintenance => "maintenance",
        }
    }
}

impl fmt::Display for VehicleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VehicleStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "available" => Ok(VehicleStatus::Available),
            "rented" => Ok(VehicleStatus::Rented),
            "maintenance" => Ok(VehicleStatus::Maintenance),
            _ => Err(ParseEnumError::new("vehicle status", s)),
        }
    }
}

/// Rental lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RentalStatus {
    Active,
    Completed,
}

impl RentalStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, RentalStatus::Active)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RentalStatus::Completed)
    }

    pub fn can_transition_to(&self, next: RentalStatus) -> bool {
        matches!((self, next), (RentalStatus::Active, RentalStatus::Completed))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RentalStatus::Active => "active",
            RentalStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for RentalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RentalStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(RentalStatus::Active),
            "completed" => Ok(RentalStatus::Completed),
            _ => Err(ParseEnumError::new("rental status", s)),
        }
    }
}

/// Outcome of the risk classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    High,
    Low,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskLevel::High => f.write_str("High"),
            RiskLevel::Low => f.write_str("Low"),
        }
    }
}
