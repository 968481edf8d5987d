pub mod memory;
pub mod postgres;
pub mod seed;

use crate::domain::customers::{Customer, NewCustomer};
use crate::domain::rentals::{Rental, RentalDetails, RentalTransition};
use crate::domain::types::{CustomerId, RentalId, VehicleId};
use crate::domain::vehicles::{NewVehicle, Vehicle};
use crate::error::Result;
use async_trait::async_trait;
use mottu_common::PageRequest;

pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use seed::seed_demo_data;

#[async_trait]
pub trait CustomerRepository: Send {
    async fn find_customer(&mut self, id: CustomerId) -> Result<Option<Customer>>;

    /// Same as `find_customer`, but holds the row until the unit of work ends
    async fn find_customer_for_update(&mut self, id: CustomerId) -> Result<Option<Customer>>;

    async fn find_customer_by_national_id(&mut self, national_id: &str)
        -> Result<Option<Customer>>;

    async fn find_customer_by_license_number(
        &mut self,
        license_number: &str,
    ) -> Result<Option<Customer>>;

    async fn insert_customer(&mut self, customer: &NewCustomer) -> Result<Customer>;

    /// Only the name is writable
    async fn update_customer(&mut self, customer: &Customer) -> Result<()>;

    /// Removes the customer and any completed rentals that reference them
    async fn delete_customer(&mut self, id: CustomerId) -> Result<()>;

    async fn list_customers(&mut self, page: PageRequest) -> Result<Vec<Customer>>;

    async fn count_customers(&mut self) -> Result<u64>;
}

#[async_trait]
pub trait VehicleRepository: Send {
    async fn find_vehicle(&mut self, id: VehicleId) -> Result<Option<Vehicle>>;

    /// Same as `find_vehicle`, but holds the row until the unit of work ends
    async fn find_vehicle_for_update(&mut self, id: VehicleId) -> Result<Option<Vehicle>>;

    async fn find_vehicle_by_plate(&mut self, plate: &str) -> Result<Option<Vehicle>>;

    /// Lowest-id vehicle with status Available that no concurrent unit of
    /// work has claimed
    async fn find_first_available_vehicle(&mut self) -> Result<Option<Vehicle>>;

    async fn insert_vehicle(&mut self, vehicle: &NewVehicle) -> Result<Vehicle>;

    async fn update_vehicle(&mut self, vehicle: &Vehicle) -> Result<()>;

    /// Removes the vehicle and any completed rentals that reference it
    async fn delete_vehicle(&mut self, id: VehicleId) -> Result<()>;

    async fn list_vehicles(&mut self, page: PageRequest) -> Result<Vec<Vehicle>>;

    async fn count_vehicles(&mut self) -> Result<u64>;
}

/// Read and delete access to the rental ledger. Inserts and settlements
/// only happen through [`UnitOfWork::apply_transition`].
#[async_trait]
pub trait RentalRepository: Send {
    async fn find_rental(&mut self, id: RentalId) -> Result<Option<RentalDetails>>;

    async fn find_rental_for_update(&mut self, id: RentalId) -> Result<Option<Rental>>;

    async fn find_active_rental_by_customer(
        &mut self,
        customer_id: CustomerId,
    ) -> Result<Option<Rental>>;

    async fn delete_rental(&mut self, id: RentalId) -> Result<()>;

    /// Newest start first
    async fn list_rentals(&mut self, page: PageRequest) -> Result<Vec<RentalDetails>>;

    async fn count_rentals(&mut self) -> Result<u64>;
}

/// Transactional handle over all three registries. Dropping it without
/// calling `commit` discards every write made through it.
#[async_trait]
pub trait UnitOfWork: CustomerRepository + VehicleRepository + RentalRepository + Send {
    /// Writes the rental and its vehicle's status together
    async fn apply_transition(&mut self, transition: &RentalTransition) -> Result<Rental>;

    async fn commit(self: Box<Self>) -> Result<()>;
}

#[async_trait]
pub trait RentalStore: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>>;

    async fn health_check(&self) -> Result<()>;
}
