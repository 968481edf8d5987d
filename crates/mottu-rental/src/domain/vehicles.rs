use crate::domain::types::{VehicleId, VehicleStatus};
use crate::error::{RentalError, Result};
use crate::storage::RentalStore;
use mottu_common::{Page, PageRequest};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: VehicleId,
    pub year: i32,
    pub model: String,
    pub plate: String,
    pub status: VehicleStatus,
}

impl Vehicle {
    pub fn is_available(&self) -> bool {
        self.status == VehicleStatus::Available
    }

    pub fn is_rented(&self) -> bool {
        self.status == VehicleStatus::Rented
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewVehicle {
    pub year: i32,
    pub model: String,
    pub plate: String,
    pub status: VehicleStatus,
}

impl NewVehicle {
    pub fn available(year: i32, model: impl Into<String>, plate: impl Into<String>) -> Self {
        Self {
            year,
            model: model.into(),
            plate: plate.into(),
            status: VehicleStatus::Available,
        }
    }
}

/// Externally writable vehicle fields; the plate never changes
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VehicleUpdate {
    pub year: i32,
    pub model: String,
    pub status: VehicleStatus,
}

pub struct FleetService {
    store: Arc<dyn RentalStore>,
}

impl FleetService {
    pub fn new(store: Arc<dyn RentalStore>) -> Self {
        Self { store }
    }

    pub async fn register_vehicle(
        &self,
        year: i32,
        model: String,
        plate: String,
    ) -> Result<Vehicle> {
        let mut uow = self.store.begin().await?;

        if uow.find_vehicle_by_plate(&plate).await?.is_some() {
            warn!("Rejected vehicle registration: plate {} exists", plate);
            return Err(RentalError::DuplicateIdentifier {
                field: "plate".to_string(),
                value: plate,
            });
        }

        let vehicle = uow
            .insert_vehicle(&NewVehicle::available(year, model, plate))
            .await?;
        uow.commit().await?;

        info!("Registered vehicle {} ({})", vehicle.id, vehicle.plate);
        Ok(vehicle)
    }

    pub async fn get_vehicle(&self, id: VehicleId) -> Result<Vehicle> {
        let mut uow = self.store.begin().await?;
        debug!("Loading vehicle {}", id);
        uow.find_vehicle(id)
            .await?
            .ok_or_else(|| RentalError::VehicleNotFound { id: id.to_string() })
    }

    pub async fn list_vehicles(&self, page: PageRequest) -> Result<Page<Vehicle>> {
        let mut uow = self.store.begin().await?;
        let items = uow.list_vehicles(page).await?;
        let total = uow.count_vehicles().await?;
        Ok(Page::new(items, total, page))
    }

    pub async fn update_vehicle(&self, id: VehicleId, update: VehicleUpdate) -> Result<()> {
        if update.status == VehicleStatus::Rented {
            return Err(RentalError::InvalidVehicleStatus {
                status: update.status.to_string(),
            });
        }

        let mut uow = self.store.begin().await?;
        let mut vehicle = uow
            .find_vehicle_for_update(id)
            .await?
            .ok_or_else(|| RentalError::VehicleNotFound { id: id.to_string() })?;

        if vehicle.is_rented() {
            warn!("Rejected update of vehicle {}: currently rented", id);
            return Err(RentalError::VehicleRented { id: id.to_string() });
        }

        vehicle.year = update.year;
        vehicle.model = update.model;
        vehicle.status = update.status;
        uow.update_vehicle(&vehicle).await?;
        uow.commit().await?;

        info!("Updated vehicle {} (status {})", id, vehicle.status);
        Ok(())
    }

    pub async fn delete_vehicle(&self, id: VehicleId) -> Result<()> {
        let mut uow = self.store.begin().await?;
        let vehicle = uow
            .find_vehicle_for_update(id)
            .await?
            .ok_or_else(|| RentalError::VehicleNotFound { id: id.to_string() })?;

        if vehicle.is_rented() {
            warn!("Rejected deletion of vehicle {}: currently rented", id);
            return Err(RentalError::VehicleRented { id: id.to_string() });
        }

        uow.delete_vehicle(id).await?;
        uow.commit().await?;

        info!("Deleted vehicle {}", id);
        Ok(())
    }
}
