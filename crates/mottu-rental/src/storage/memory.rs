//! In-process store with the same semantics as the Postgres one.
//!
//! A unit of work holds the store mutex for its whole lifetime. The first
//! write takes a private copy of the state, which replaces the shared state
//! on commit; read-only units of work never copy.

use crate::domain::customers::{Customer, NewCustomer};
use crate::domain::rentals::{Rental, RentalDetails, RentalTransition};
use crate::domain::types::{CustomerId, RentalId, RentalStatus, VehicleId, VehicleStatus};
use crate::domain::vehicles::{NewVehicle, Vehicle};
use crate::error::{RentalError, Result};
use crate::storage::{
    CustomerRepository, RentalRepository, RentalStore, UnitOfWork, VehicleRepository,
};
use async_trait::async_trait;
use mottu_common::PageRequest;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    customers: BTreeMap<CustomerId, Customer>,
    vehicles: BTreeMap<VehicleId, Vehicle>,
    rentals: BTreeMap<RentalId, Rental>,
    last_customer_id: i64,
    last_vehicle_id: i64,
    last_rental_id: i64,
}

impl MemoryState {
    fn details(&self, rental: &Rental) -> RentalDetails {
        RentalDetails {
            rental: rental.clone(),
            customer_name: self
                .customers
                .get(&rental.customer_id)
                .map(|c| c.name.clone())
                .unwrap_or_default(),
            vehicle_plate: self
                .vehicles
                .get(&rental.vehicle_id)
                .map(|v| v.plate.clone())
                .unwrap_or_default(),
        }
    }

    fn active_rental_for_customer(&self, customer_id: CustomerId) -> Option<&Rental> {
        self.rentals
            .values()
            .find(|r| r.customer_id == customer_id && r.is_active())
    }
}

fn page_bounds(page: PageRequest) -> (usize, usize) {
    (page.offset() as usize, page.limit() as usize)
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RentalStore for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>> {
        let guard = self.state.clone().lock_owned().await;
        Ok(Box::new(MemoryUnitOfWork {
            guard,
            working: None,
        }))
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}

pub struct MemoryUnitOfWork {
    guard: OwnedMutexGuard<MemoryState>,
    working: Option<MemoryState>,
}

impl MemoryUnitOfWork {
    fn state(&self) -> &MemoryState {
        self.working.as_ref().unwrap_or(&*self.guard)
    }

    fn state_mut(&mut self) -> &mut MemoryState {
        let guard = &self.guard;
        self.working.get_or_insert_with(|| MemoryState::clone(guard))
    }
}

#[async_trait]
impl CustomerRepository for MemoryUnitOfWork {
    async fn find_customer(&mut self, id: CustomerId) -> Result<Option<Customer>> {
        Ok(self.state().customers.get(&id).cloned())
    }

    async fn find_customer_for_update(&mut self, id: CustomerId) -> Result<Option<Customer>> {
        self.find_customer(id).await
    }

    async fn find_customer_by_national_id(
        &mut self,
        national_id: &str,
    ) -> Result<Option<Customer>> {
        Ok(self
            .state()
            .customers
            .values()
            .find(|c| c.national_id == national_id)
            .cloned())
    }

    async fn find_customer_by_license_number(
        &mut self,
        license_number: &str,
    ) -> Result<Option<Customer>> {
        Ok(self
            .state()
            .customers
            .values()
            .find(|c| c.license_number == license_number)
            .cloned())
    }

    async fn insert_customer(&mut self, customer: &NewCustomer) -> Result<Customer> {
        if self.find_customer_by_national_id(&customer.national_id).await?.is_some() {
            return Err(RentalError::DuplicateIdentifier {
                field: "national_id".to_string(),
                value: customer.national_id.clone(),
            });
        }
        if self
            .find_customer_by_license_number(&customer.license_number)
            .await?
            .is_some()
        {
            return Err(RentalError::DuplicateIdentifier {
                field: "license_number".to_string(),
                value: customer.license_number.clone(),
            });
        }

        let state = self.state_mut();
        state.last_customer_id += 1;
        let stored = Customer {
            id: CustomerId::new(state.last_customer_id),
            name: customer.name.clone(),
            national_id: customer.national_id.clone(),
            birth_date: customer.birth_date,
            license_number: customer.license_number.clone(),
            license_type: customer.license_type,
        };
        state.customers.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn update_customer(&mut self, customer: &Customer) -> Result<()> {
        let stored = self.state_mut().customers.get_mut(&customer.id).ok_or_else(|| {
            RentalError::CustomerNotFound {
                id: customer.id.to_string(),
            }
        })?;
        stored.name = customer.name.clone();
        Ok(())
    }

    async fn delete_customer(&mut self, id: CustomerId) -> Result<()> {
        if self.state().active_rental_for_customer(id).is_some() {
            return Err(RentalError::ActiveRentalConflict {
                reason: format!("customer {} has an active rental", id),
            });
        }
        if !self.state().customers.contains_key(&id) {
            return Err(RentalError::CustomerNotFound { id: id.to_string() });
        }
        let state = self.state_mut();
        state.customers.remove(&id);
        state.rentals.retain(|_, r| r.customer_id != id);
        Ok(())
    }

    async fn list_customers(&mut self, page: PageRequest) -> Result<Vec<Customer>> {
        let (offset, limit) = page_bounds(page);
        Ok(self
            .state()
            .customers
            .values()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn count_customers(&mut self) -> Result<u64> {
        Ok(self.state().customers.len() as u64)
    }
}

#[async_trait]
impl VehicleRepository for MemoryUnitOfWork {
    async fn find_vehicle(&mut self, id: VehicleId) -> Result<Option<Vehicle>> {
        Ok(self.state().vehicles.get(&id).cloned())
    }

    async fn find_vehicle_for_update(&mut self, id: VehicleId) -> Result<Option<Vehicle>> {
        self.find_vehicle(id).await
    }

    async fn find_vehicle_by_plate(&mut self, plate: &str) -> Result<Option<Vehicle>> {
        Ok(self
            .state()
            .vehicles
            .values()
            .find(|v| v.plate == plate)
            .cloned())
    }

    async fn find_first_available_vehicle(&mut self) -> Result<Option<Vehicle>> {
        Ok(self
            .state()
            .vehicles
            .values()
            .find(|v| v.is_available())
            .cloned())
    }

    async fn insert_vehicle(&mut self, vehicle: &NewVehicle) -> Result<Vehicle> {
        if self.find_vehicle_by_plate(&vehicle.plate).await?.is_some() {
            return Err(RentalError::DuplicateIdentifier {
                field: "plate".to_string(),
                value: vehicle.plate.clone(),
            });
        }

        let state = self.state_mut();
        state.last_vehicle_id += 1;
        let stored = Vehicle {
            id: VehicleId::new(state.last_vehicle_id),
            year: vehicle.year,
            model: vehicle.model.clone(),
            plate: vehicle.plate.clone(),
            status: vehicle.status,
        };
        state.vehicles.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn update_vehicle(&mut self, vehicle: &Vehicle) -> Result<()> {
        let stored = self.state_mut().vehicles.get_mut(&vehicle.id).ok_or_else(|| {
            RentalError::VehicleNotFound {
                id: vehicle.id.to_string(),
            }
        })?;
        stored.year = vehicle.year;
        stored.model = vehicle.model.clone();
        stored.status = vehicle.status;
        Ok(())
    }

    async fn delete_vehicle(&mut self, id: VehicleId) -> Result<()> {
        if self
            .state()
            .rentals
            .values()
            .any(|r| r.vehicle_id == id && r.is_active())
        {
            return Err(RentalError::VehicleRented { id: id.to_string() });
        }
        if !self.state().vehicles.contains_key(&id) {
            return Err(RentalError::VehicleNotFound { id: id.to_string() });
        }
        let state = self.state_mut();
        state.vehicles.remove(&id);
        state.rentals.retain(|_, r| r.vehicle_id != id);
        Ok(())
    }

    async fn list_vehicles(&mut self, page: PageRequest) -> Result<Vec<Vehicle>> {
        let (offset, limit) = page_bounds(page);
        Ok(self
            .state()
            .vehicles
            .values()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn count_vehicles(&mut self) -> Result<u64> {
        Ok(self.state().vehicles.len() as u64)
    }
}

#[async_trait]
impl RentalRepository for MemoryUnitOfWork {
    async fn find_rental(&mut self, id: RentalId) -> Result<Option<RentalDetails>> {
        Ok(self
            .state()
            .rentals
            .get(&id)
            .map(|r| self.state().details(r)))
    }

    async fn find_rental_for_update(&mut self, id: RentalId) -> Result<Option<Rental>> {
        Ok(self.state().rentals.get(&id).cloned())
    }

    async fn find_active_rental_by_customer(
        &mut self,
        customer_id: CustomerId,
    ) -> Result<Option<Rental>> {
        Ok(self.state().active_rental_for_customer(customer_id).cloned())
    }

    async fn delete_rental(&mut self, id: RentalId) -> Result<()> {
        let rental = self
            .state()
            .rentals
            .get(&id)
            .ok_or_else(|| RentalError::RentalNotFound { id: id.to_string() })?;
        if rental.is_active() {
            return Err(RentalError::ActiveRentalConflict {
                reason: format!("rental {} is still active", id),
            });
        }
        self.state_mut().rentals.remove(&id);
        Ok(())
    }

    async fn list_rentals(&mut self, page: PageRequest) -> Result<Vec<RentalDetails>> {
        let (offset, limit) = page_bounds(page);
        let mut rentals: Vec<&Rental> = self.state().rentals.values().collect();
        rentals.sort_by(|a, b| {
            b.started_at
                .cmp(&a.started_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(rentals
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|r| self.state().details(r))
            .collect())
    }

    async fn count_rentals(&mut self) -> Result<u64> {
        Ok(self.state().rentals.len() as u64)
    }
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn apply_transition(&mut self, transition: &RentalTransition) -> Result<Rental> {
        match transition {
            RentalTransition::Open(new_rental) => {
                if !self.state().customers.contains_key(&new_rental.customer_id) {
                    return Err(RentalError::CustomerNotFound {
                        id: new_rental.customer_id.to_string(),
                    });
                }
                if self
                    .state()
                    .active_rental_for_customer(new_rental.customer_id)
                    .is_some()
                {
                    return Err(RentalError::ActiveRentalExists {
                        customer_id: new_rental.customer_id.to_string(),
                    });
                }
                let state = self.state_mut();
                let vehicle = state
                    .vehicles
                    .get_mut(&new_rental.vehicle_id)
                    .filter(|v| v.is_available())
                    .ok_or(RentalError::NoVehicleAvailable)?;
                vehicle.status = VehicleStatus::Rented;

                state.last_rental_id += 1;
                let rental = Rental {
                    id: RentalId::new(state.last_rental_id),
                    customer_id: new_rental.customer_id,
                    vehicle_id: new_rental.vehicle_id,
                    started_at: new_rental.started_at,
                    expected_end: new_rental.expected_end,
                    actual_end: None,
                    daily_rate: new_rental.daily_rate,
                    total_charge: None,
                    status: RentalStatus::Active,
                };
                state.rentals.insert(rental.id, rental.clone());
                Ok(rental)
            }
            RentalTransition::Close {
                rental_id,
                vehicle_id,
                returned_at,
                total_charge,
            } => {
                let state = self.state_mut();
                let rental = state.rentals.get_mut(rental_id).ok_or_else(|| {
                    RentalError::RentalNotFound {
                        id: rental_id.to_string(),
                    }
                })?;
                if !rental.is_active() {
                    return Err(RentalError::AlreadyCompleted {
                        id: rental_id.to_string(),
                    });
                }
                rental.actual_end = Some(*returned_at);
                rental.total_charge = Some(*total_charge);
                rental.status = RentalStatus::Completed;
                let closed = rental.clone();

                if let Some(vehicle) = state.vehicles.get_mut(vehicle_id) {
                    vehicle.status = VehicleStatus::Available;
                }
                Ok(closed)
            }
        }
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let MemoryUnitOfWork { mut guard, working } = *self;
        if let Some(working) = working {
            *guard = working;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::rentals::NewRental;
    use crate::domain::types::{LicenseType, Money};
    use chrono::{NaiveDate, TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn customer(national_id: &str, license_number: &str) -> NewCustomer {
        NewCustomer {
            name: "Ana Costa".to_string(),
            national_id: national_id.to_string(),
            birth_date: NaiveDate::from_ymd_opt(1988, 11, 25).unwrap(),
            license_number: license_number.to_string(),
            license_type: LicenseType::AB,
        }
    }

    #[tokio::test]
    async fn test_uncommitted_work_is_discarded() {
        let store = MemoryStore::new();
        {
            let mut uow = store.begin().await.unwrap();
            uow.insert_customer(&customer("45678901233", "65432109877"))
                .await
                .unwrap();
        }

        let mut uow = store.begin().await.unwrap();
        assert_eq!(uow.count_customers().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_reads_share_state_until_first_write() {
        let store = MemoryStore::new();
        let mut uow = store.begin().await.unwrap();
        let stored = uow
            .insert_customer(&customer("45678901233", "65432109877"))
            .await
            .unwrap();
        uow.commit().await.unwrap();

        let mut uow = MemoryUnitOfWork {
            guard: store.state.clone().lock_owned().await,
            working: None,
        };
        assert_eq!(uow.find_customer(stored.id).await.unwrap(), Some(stored.clone()));
        assert_eq!(uow.list_customers(PageRequest::default()).await.unwrap().len(), 1);
        assert!(uow.find_first_available_vehicle().await.unwrap().is_none());
        assert!(uow.working.is_none());

        uow.insert_vehicle(&NewVehicle::available(2022, "Honda Biz 125", "MNO-7890"))
            .await
            .unwrap();
        assert!(uow.working.is_some());
        assert_eq!(uow.count_vehicles().await.unwrap(), 1);
        assert_eq!(uow.guard.vehicles.len(), 0);
        drop(uow);

        let mut uow = store.begin().await.unwrap();
        assert_eq!(uow.count_vehicles().await.unwrap(), 0);
        assert_eq!(uow.count_customers().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_ids_ascend_and_unique_keys_hold() {
        let store = MemoryStore::new();
        let mut uow = store.begin().await.unwrap();
        let first = uow
            .insert_customer(&customer("45678901233", "65432109877"))
            .await
            .unwrap();
        let second = uow
            .insert_customer(&customer("56789012344", "54321098766"))
            .await
            .unwrap();
        assert!(first.id < second.id);

        let err = uow
            .insert_customer(&customer("45678901233", "00000000000"))
            .await
            .unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn test_open_and_close_flip_vehicle_status() {
        let store = MemoryStore::new();
        let mut uow = store.begin().await.unwrap();
        let customer = uow
            .insert_customer(&customer("45678901233", "65432109877"))
            .await
            .unwrap();
        let vehicle = uow
            .insert_vehicle(&NewVehicle::available(2023, "Yamaha NMAX", "JKL-3456"))
            .await
            .unwrap();

        let start = Utc.with_ymd_and_hms(2025, 5, 1, 8, 0, 0).unwrap();
        let rental = uow
            .apply_transition(&RentalTransition::Open(NewRental {
                customer_id: customer.id,
                vehicle_id: vehicle.id,
                started_at: start,
                expected_end: start + chrono::Duration::days(3),
                daily_rate: Money::from_decimal(dec!(30.00)),
            }))
            .await
            .unwrap();
        assert_eq!(
            uow.find_vehicle(vehicle.id).await.unwrap().unwrap().status,
            VehicleStatus::Rented
        );
        assert!(uow.find_first_available_vehicle().await.unwrap().is_none());

        let close = RentalTransition::Close {
            rental_id: rental.id,
            vehicle_id: vehicle.id,
            returned_at: start + chrono::Duration::days(3),
            total_charge: Money::from_decimal(dec!(90.00)),
        };
        let closed = uow.apply_transition(&close).await.unwrap();
        assert_eq!(closed.status, RentalStatus::Completed);
        assert_eq!(
            uow.find_vehicle(vehicle.id).await.unwrap().unwrap().status,
            VehicleStatus::Available
        );

        let err = uow.apply_transition(&close).await.unwrap_err();
        assert!(matches!(err, RentalError::AlreadyCompleted { .. }));
    }

    #[tokio::test]
    async fn test_delete_customer_cascades_completed_rentals() {
        let store = MemoryStore::new();
        let mut uow = store.begin().await.unwrap();
        let customer = uow
            .insert_customer(&customer("45678901233", "65432109877"))
            .await
            .unwrap();
        let vehicle = uow
            .insert_vehicle(&NewVehicle::available(2024, "Honda PCX 160", "STU-2468"))
            .await
            .unwrap();
        let start = Utc.with_ymd_and_hms(2025, 5, 1, 8, 0, 0).unwrap();
        let rental = uow
            .apply_transition(&RentalTransition::Open(NewRental {
                customer_id: customer.id,
                vehicle_id: vehicle.id,
                started_at: start,
                expected_end: start,
                daily_rate: Money::from_decimal(dec!(30.00)),
            }))
            .await
            .unwrap();

        assert!(uow.delete_customer(customer.id).await.is_err());

        uow.apply_transition(&RentalTransition::Close {
            rental_id: rental.id,
            vehicle_id: vehicle.id,
            returned_at: start,
            total_charge: Money::zero(),
        })
        .await
        .unwrap();
        uow.delete_customer(customer.id).await.unwrap();

        assert_eq!(uow.count_rentals().await.unwrap(), 0);
        assert_eq!(uow.count_vehicles().await.unwrap(), 1);
    }
}
