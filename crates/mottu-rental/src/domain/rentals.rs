use crate::domain::clock::Clock;
use crate::domain::pricing::{calendar_days_between, daily_rate_for_plan, Settlement};
use crate::domain::types::{CustomerId, Money, RentalId, RentalStatus, VehicleId};
use crate::error::{RentalError, Result};
use crate::storage::RentalStore;
use chrono::{DateTime, Utc};
use mottu_common::{Page, PageRequest};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rental {
    pub id: RentalId,
    pub customer_id: CustomerId,
    pub vehicle_id: VehicleId,
    pub started_at: DateTime<Utc>,
    pub expected_end: DateTime<Utc>,
    pub actual_end: Option<DateTime<Utc>>,
    pub daily_rate: Money,
    pub total_charge: Option<Money>,
    pub status: RentalStatus,
}

impl Rental {
    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// Breakdown of the stored charge, for completed rentals
    pub fn settlement(&self) -> Option<Settlement> {
        let returned_at = self.actual_end?;
        if !self.status.is_terminal() {
            return None;
        }
        Some(Settlement::compute(
            self.started_at,
            self.expected_end,
            returned_at,
            self.daily_rate,
        ))
    }
}

/// Rental with the customer name and vehicle plate loaded alongside
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RentalDetails {
    #[serde(flatten)]
    pub rental: Rental,
    pub customer_name: String,
    pub vehicle_plate: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRental {
    pub customer_id: CustomerId,
    pub vehicle_id: VehicleId,
    pub started_at: DateTime<Utc>,
    pub expected_end: DateTime<Utc>,
    pub daily_rate: Money,
}

/// The only writes that touch a rental and its vehicle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RentalTransition {
    /// Insert an active rental and mark its vehicle Rented
    Open(NewRental),
    /// Complete the rental and mark its vehicle Available
    Close {
        rental_id: RentalId,
        vehicle_id: VehicleId,
        returned_at: DateTime<Utc>,
        total_charge: Money,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SettledRental {
    pub rental: Rental,
    pub settlement: Settlement,
}

pub struct RentalEngine {
    store: Arc<dyn RentalStore>,
    clock: Arc<dyn Clock>,
}

impl RentalEngine {
    pub fn new(store: Arc<dyn RentalStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub async fn create_rental(
        &self,
        customer_id: CustomerId,
        expected_end: DateTime<Utc>,
    ) -> Result<Rental> {
        let now = self.clock.now();
        let mut uow = self.store.begin().await?;

        let customer = uow
            .find_customer_for_update(customer_id)
            .await?
            .ok_or_else(|| RentalError::CustomerNotFound {
                id: customer_id.to_string(),
            })?;

        if !customer.license_type.can_rent_motorcycle() {
            warn!(
                "Rejected rental for customer {}: license {}",
                customer_id, customer.license_type
            );
            return Err(RentalError::IneligibleLicense {
                license_type: customer.license_type.to_string(),
            });
        }

        if let Some(active) = uow.find_active_rental_by_customer(customer_id).await? {
            warn!(
                "Rejected rental for customer {}: rental {} still active",
                customer_id, active.id
            );
            return Err(RentalError::ActiveRentalExists {
                customer_id: customer_id.to_string(),
            });
        }

        let vehicle = uow
            .find_first_available_vehicle()
            .await?
            .ok_or(RentalError::NoVehicleAvailable)?;

        // Settlement needs a non-negative planned day count
        let plan_days = calendar_days_between(now, expected_end);
        if plan_days < 0 {
            return Err(RentalError::InvalidExpectedEnd {
                expected_end: expected_end.to_rfc3339(),
                today: now.date_naive().to_string(),
            });
        }
        let daily_rate = daily_rate_for_plan(plan_days);

        let rental = uow
            .apply_transition(&RentalTransition::Open(NewRental {
                customer_id,
                vehicle_id: vehicle.id,
                started_at: now,
                expected_end,
                daily_rate,
            }))
            .await?;
        uow.commit().await?;

        info!(
            "Opened rental {} for customer {} on vehicle {} ({} days at {})",
            rental.id, customer_id, vehicle.plate, plan_days, daily_rate
        );
        Ok(rental)
    }

    pub async fn end_rental(
        &self,
        rental_id: RentalId,
        returned_at: DateTime<Utc>,
    ) -> Result<SettledRental> {
        let mut uow = self.store.begin().await?;

        let rental = uow
            .find_rental_for_update(rental_id)
            .await?
            .ok_or_else(|| RentalError::RentalNotFound {
                id: rental_id.to_string(),
            })?;

        if !rental.status.can_transition_to(RentalStatus::Completed) {
            warn!("Rejected settlement of rental {}: already completed", rental_id);
            return Err(RentalError::AlreadyCompleted {
                id: rental_id.to_string(),
            });
        }

        if returned_at < rental.started_at {
            return Err(RentalError::InvalidReturnDate {
                started_at: rental.started_at.to_rfc3339(),
                returned_at: returned_at.to_rfc3339(),
            });
        }

        let settlement = Settlement::compute(
            rental.started_at,
            rental.expected_end,
            returned_at,
            rental.daily_rate,
        );

        let rental = uow
            .apply_transition(&RentalTransition::Close {
                rental_id,
                vehicle_id: rental.vehicle_id,
                returned_at,
                total_charge: settlement.total,
            })
            .await?;
        uow.commit().await?;

        info!(
            "Closed rental {}: {} of {} days, total {}",
            rental_id, settlement.actual_days, settlement.expected_days, settlement.total
        );
        Ok(SettledRental { rental, settlement })
    }

    pub async fn delete_rental(&self, rental_id: RentalId) -> Result<()> {
        let mut uow = self.store.begin().await?;

        let rental = uow
            .find_rental_for_update(rental_id)
            .await?
            .ok_or_else(|| RentalError::RentalNotFound {
                id: rental_id.to_string(),
            })?;

        if rental.is_active() {
            warn!("Rejected deletion of rental {}: still active", rental_id);
            return Err(RentalError::ActiveRentalConflict {
                reason: format!("rental {} is still active", rental_id),
            });
        }

        uow.delete_rental(rental_id).await?;
        uow.commit().await?;

        info!("Deleted rental {}", rental_id);
        Ok(())
    }

    pub async fn get_rental(&self, rental_id: RentalId) -> Result<RentalDetails> {
        let mut uow = self.store.begin().await?;
        debug!("Loading rental {}", rental_id);
        uow.find_rental(rental_id)
            .await?
            .ok_or_else(|| RentalError::RentalNotFound {
                id: rental_id.to_string(),
            })
    }

    pub async fn list_rentals(&self, page: PageRequest) -> Result<Page<RentalDetails>> {
        let mut uow = self.store.begin().await?;
        let items = uow.list_rentals(page).await?;
        let total = uow.count_rentals().await?;
        Ok(Page::new(items, total, page))
    }
}
