pub mod clock;
pub mod customers;
pub mod pricing;
pub mod rentals;
pub mod risk;
pub mod types;
pub mod vehicles;

pub use clock::{Clock, FixedClock, SystemClock};
pub use customers::{Customer, CustomerRegistration, CustomerService, NewCustomer};
pub use pricing::{ReturnKind, Settlement};
pub use rentals::{NewRental, Rental, RentalDetails, RentalEngine, RentalTransition, SettledRental};
pub use risk::{RiskClassifier, RuleBasedRiskClassifier};
pub use types::{
    CustomerId, LicenseType, Money, RentalId, RentalStatus, RiskLevel, VehicleId, VehicleStatus,
};
pub use vehicles::{FleetService, NewVehicle, Vehicle, VehicleUpdate};
