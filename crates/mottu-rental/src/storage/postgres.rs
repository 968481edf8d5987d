use crate::config::Config;
use crate::domain::customers::{Customer, NewCustomer};
use crate::domain::rentals::{Rental, RentalDetails, RentalTransition};
use crate::domain::types::{
    CustomerId, LicenseType, Money, RentalId, RentalStatus, VehicleId, VehicleStatus,
};
use crate::domain::vehicles::{NewVehicle, Vehicle};
use crate::error::{RentalError, Result};
use crate::storage::{
    CustomerRepository, RentalRepository, RentalStore, UnitOfWork, VehicleRepository,
};
use async_trait::async_trait;
use mottu_common::PageRequest;
use rust_decimal::Decimal;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::info;

pub type PgTx<'a> = Transaction<'a, Postgres>;

const CUSTOMER_COLUMNS: &str =
    "id, name, national_id, birth_date, license_number, license_type";
const VEHICLE_COLUMNS: &str = "id, year, model, plate, status";
const RENTAL_COLUMNS: &str =
    "id, customer_id, vehicle_id, started_at, expected_end, actual_end, daily_rate, total_charge, status";

const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(config: &Config) -> Result<Self> {
        info!("Connecting to database: {}", config.database_display());
        let pool = PgPoolOptions::new()
            .max_connections(config.database.max_connections)
            .min_connections(config.database.min_connections)
            .acquire_timeout(config.acquire_timeout())
            .idle_timeout(config.idle_timeout())
            .connect(&config.database.url)
            .await
            .map_err(|e| RentalError::database("connect", e))?;
        Ok(Self { pool })
    }

    pub async fn run_migrations(&self) -> Result<()> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| RentalError::database("migrate", e))?;
        info!("Database migrations completed successfully");
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl RentalStore for PgStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RentalError::database("begin", e))?;
        Ok(Box::new(PgUnitOfWork { tx }))
    }

    async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| RentalError::database("health_check", e))?;
        Ok(())
    }
}

/// One transaction; rolled back on drop unless committed
pub struct PgUnitOfWork {
    tx: PgTx<'static>,
}

fn db_error(operation: &str) -> impl FnOnce(sqlx::Error) -> RentalError + '_ {
    move |e| RentalError::database(operation, e)
}

/// Constraint name for errors raised with the given SQLSTATE
fn violated_constraint(err: &sqlx::Error, code: &str) -> Option<String> {
    match err {
        sqlx::Error::Database(db) if db.code().as_deref() == Some(code) => {
            db.constraint().map(str::to_string)
        }
        _ => None,
    }
}

fn decode_enum<T>(operation: &str, raw: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.parse::<T>()
        .map_err(|e| RentalError::database(operation, e))
}

fn customer_from_row(r: &PgRow) -> Result<Customer> {
    let license: String = r.get("license_type");
    Ok(Customer {
        id: CustomerId::new(r.get("id")),
        name: r.get("name"),
        national_id: r.get("national_id"),
        birth_date: r.get("birth_date"),
        license_number: r.get("license_number"),
        license_type: decode_enum::<LicenseType>("decode_customer", &license)?,
    })
}

fn vehicle_from_row(r: &PgRow) -> Result<Vehicle> {
    let status: String = r.get("status");
    Ok(Vehicle {
        id: VehicleId::new(r.get("id")),
        year: r.get("year"),
        model: r.get("model"),
        plate: r.get("plate"),
        status: decode_enum::<VehicleStatus>("decode_vehicle", &status)?,
    })
}

fn rental_from_row(r: &PgRow) -> Result<Rental> {
    let status: String = r.get("status");
    Ok(Rental {
        id: RentalId::new(r.get("id")),
        customer_id: CustomerId::new(r.get("customer_id")),
        vehicle_id: VehicleId::new(r.get("vehicle_id")),
        started_at: r.get("started_at"),
        expected_end: r.get("expected_end"),
        actual_end: r.get("actual_end"),
        daily_rate: Money::from_decimal(r.get::<Decimal, _>("daily_rate")),
        total_charge: r
            .get::<Option<Decimal>, _>("total_charge")
            .map(Money::from_decimal),
        status: decode_enum::<RentalStatus>("decode_rental", &status)?,
    })
}

fn rental_details_from_row(r: &PgRow) -> Result<RentalDetails> {
    Ok(RentalDetails {
        rental: rental_from_row(r)?,
        customer_name: r.get("customer_name"),
        vehicle_plate: r.get("vehicle_plate"),
    })
}

#[async_trait]
impl CustomerRepository for PgUnitOfWork {
    async fn find_customer(&mut self, id: CustomerId) -> Result<Option<Customer>> {
        let row = sqlx::query(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id = $1"
        ))
        .bind(id.value())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(db_error("find_customer"))?;

        row.as_ref().map(customer_from_row).transpose()
    }

    async fn find_customer_for_update(&mut self, id: CustomerId) -> Result<Option<Customer>> {
        let row = sqlx::query(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id = $1 FOR UPDATE"
        ))
        .bind(id.value())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(db_error("find_customer_for_update"))?;

        row.as_ref().map(customer_from_row).transpose()
    }

    async fn find_customer_by_national_id(
        &mut self,
        national_id: &str,
    ) -> Result<Option<Customer>> {
        let row = sqlx::query(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE national_id = $1"
        ))
        .bind(national_id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(db_error("find_customer_by_national_id"))?;

        row.as_ref().map(customer_from_row).transpose()
    }

    async fn find_customer_by_license_number(
        &mut self,
        license_number: &str,
    ) -> Result<Option<Customer>> {
        let row = sqlx::query(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE license_number = $1"
        ))
        .bind(license_number)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(db_error("find_customer_by_license_number"))?;

        row.as_ref().map(customer_from_row).transpose()
    }

    async fn insert_customer(&mut self, customer: &NewCustomer) -> Result<Customer> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO customers (name, national_id, birth_date, license_number, license_type)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {CUSTOMER_COLUMNS}
            "#
        ))
        .bind(&customer.name)
        .bind(&customer.national_id)
        .bind(customer.birth_date)
        .bind(&customer.license_number)
        .bind(customer.license_type.as_str())
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| match violated_constraint(&e, UNIQUE_VIOLATION).as_deref() {
            Some("customers_national_id_key") => RentalError::DuplicateIdentifier {
                field: "national_id".to_string(),
                value: customer.national_id.clone(),
            },
            Some("customers_license_number_key") => RentalError::DuplicateIdentifier {
                field: "license_number".to_string(),
                value: customer.license_number.clone(),
            },
            _ => RentalError::database("insert_customer", e),
        })?;

        customer_from_row(&row)
    }

    async fn update_customer(&mut self, customer: &Customer) -> Result<()> {
        let result =
            sqlx::query("UPDATE customers SET name = $2, updated_at = NOW() WHERE id = $1")
                .bind(customer.id.value())
                .bind(&customer.name)
                .execute(&mut *self.tx)
                .await
                .map_err(db_error("update_customer"))?;

        if result.rows_affected() == 0 {
            return Err(RentalError::CustomerNotFound {
                id: customer.id.to_string(),
            });
        }
        Ok(())
    }

    async fn delete_customer(&mut self, id: CustomerId) -> Result<()> {
        sqlx::query("DELETE FROM rentals WHERE customer_id = $1 AND status = 'completed'")
            .bind(id.value())
            .execute(&mut *self.tx)
            .await
            .map_err(db_error("delete_customer_rentals"))?;

        let result = sqlx::query("DELETE FROM customers WHERE id = $1")
            .bind(id.value())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| {
                if violated_constraint(&e, FOREIGN_KEY_VIOLATION).is_some() {
                    RentalError::ActiveRentalConflict {
                        reason: format!("customer {} has an active rental", id),
                    }
                } else {
                    RentalError::database("delete_customer", e)
                }
            })?;

        if result.rows_affected() == 0 {
            return Err(RentalError::CustomerNotFound { id: id.to_string() });
        }
        Ok(())
    }

    async fn list_customers(&mut self, page: PageRequest) -> Result<Vec<Customer>> {
        let rows = sqlx::query(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers ORDER BY id LIMIT $1 OFFSET $2"
        ))
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&mut *self.tx)
        .await
        .map_err(db_error("list_customers"))?;

        rows.iter().map(customer_from_row).collect()
    }

    async fn count_customers(&mut self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM customers")
            .fetch_one(&mut *self.tx)
            .await
            .map_err(db_error("count_customers"))?;
        Ok(count.max(0) as u64)
    }
}

#[async_trait]
impl VehicleRepository for PgUnitOfWork {
    async fn find_vehicle(&mut self, id: VehicleId) -> Result<Option<Vehicle>> {
        let row = sqlx::query(&format!(
            "SELECT {VEHICLE_COLUMNS} FROM vehicles WHERE id = $1"
        ))
        .bind(id.value())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(db_error("find_vehicle"))?;

        row.as_ref().map(vehicle_from_row).transpose()
    }

    async fn find_vehicle_for_update(&mut self, id: VehicleId) -> Result<Option<Vehicle>> {
        let row = sqlx::query(&format!(
            "SELECT {VEHICLE_COLUMNS} FROM vehicles WHERE id = $1 FOR UPDATE"
        ))
        .bind(id.value())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(db_error("find_vehicle_for_update"))?;

        row.as_ref().map(vehicle_from_row).transpose()
    }

    async fn find_vehicle_by_plate(&mut self, plate: &str) -> Result<Option<Vehicle>> {
        let row = sqlx::query(&format!(
            "SELECT {VEHICLE_COLUMNS} FROM vehicles WHERE plate = $1"
        ))
        .bind(plate)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(db_error("find_vehicle_by_plate"))?;

        row.as_ref().map(vehicle_from_row).transpose()
    }

    async fn find_first_available_vehicle(&mut self) -> Result<Option<Vehicle>> {
        let row = sqlx::query(&format!(
            r#"
            SELECT {VEHICLE_COLUMNS}
            FROM vehicles
            WHERE status = 'available'
            ORDER BY id
            LIMIT 1
            FOR UPDATE SKIP LOCKED
            "#
        ))
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(db_error("find_first_available_vehicle"))?;

        row.as_ref().map(vehicle_from_row).transpose()
    }

    async fn insert_vehicle(&mut self, vehicle: &NewVehicle) -> Result<Vehicle> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO vehicles (year, model, plate, status)
            VALUES ($1, $2, $3, $4)
            RETURNING {VEHICLE_COLUMNS}
            "#
        ))
        .bind(vehicle.year)
        .bind(&vehicle.model)
        .bind(&vehicle.plate)
        .bind(vehicle.status.as_str())
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| match violated_constraint(&e, UNIQUE_VIOLATION).as_deref() {
            Some("vehicles_plate_key") => RentalError::DuplicateIdentifier {
                field: "plate".to_string(),
                value: vehicle.plate.clone(),
            },
            _ => RentalError::database("insert_vehicle", e),
        })?;

        vehicle_from_row(&row)
    }

    async fn update_vehicle(&mut self, vehicle: &Vehicle) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE vehicles
            SET year = $2, model = $3, status = $4, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(vehicle.id.value())
        .bind(vehicle.year)
        .bind(&vehicle.model)
        .bind(vehicle.status.as_str())
        .execute(&mut *self.tx)
        .await
        .map_err(db_error("update_vehicle"))?;

        if result.rows_affected() == 0 {
            return Err(RentalError::VehicleNotFound {
                id: vehicle.id.to_string(),
            });
        }
        Ok(())
    }

    async fn delete_vehicle(&mut self, id: VehicleId) -> Result<()> {
        sqlx::query("DELETE FROM rentals WHERE vehicle_id = $1 AND status = 'completed'")
            .bind(id.value())
            .execute(&mut *self.tx)
            .await
            .map_err(db_error("delete_vehicle_rentals"))?;

        let result = sqlx::query("DELETE FROM vehicles WHERE id = $1")
            .bind(id.value())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| {
                if violated_constraint(&e, FOREIGN_KEY_VIOLATION).is_some() {
                    RentalError::VehicleRented { id: id.to_string() }
                } else {
                    RentalError::database("delete_vehicle", e)
                }
            })?;

        if result.rows_affected() == 0 {
            return Err(RentalError::VehicleNotFound { id: id.to_string() });
        }
        Ok(())
    }

    async fn list_vehicles(&mut self, page: PageRequest) -> Result<Vec<Vehicle>> {
        let rows = sqlx::query(&format!(
            "SELECT {VEHICLE_COLUMNS} FROM vehicles ORDER BY id LIMIT $1 OFFSET $2"
        ))
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&mut *self.tx)
        .await
        .map_err(db_error("list_vehicles"))?;

        rows.iter().map(vehicle_from_row).collect()
    }

    async fn count_vehicles(&mut self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM vehicles")
            .fetch_one(&mut *self.tx)
            .await
            .map_err(db_error("count_vehicles"))?;
        Ok(count.max(0) as u64)
    }
}

const RENTAL_DETAILS_SELECT: &str = r#"
    SELECT r.id, r.customer_id, r.vehicle_id, r.started_at, r.expected_end, r.actual_end,
           r.daily_rate, r.total_charge, r.status,
           c.name AS customer_name, v.plate AS vehicle_plate
    FROM rentals r
    JOIN customers c ON c.id = r.customer_id
    JOIN vehicles v ON v.id = r.vehicle_id
"#;

#[async_trait]
impl RentalRepository for PgUnitOfWork {
    async fn find_rental(&mut self, id: RentalId) -> Result<Option<RentalDetails>> {
        let row = sqlx::query(&format!("{RENTAL_DETAILS_SELECT} WHERE r.id = $1"))
            .bind(id.value())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(db_error("find_rental"))?;

        row.as_ref().map(rental_details_from_row).transpose()
    }

    async fn find_rental_for_update(&mut self, id: RentalId) -> Result<Option<Rental>> {
        let row = sqlx::query(&format!(
            "SELECT {RENTAL_COLUMNS} FROM rentals WHERE id = $1 FOR UPDATE"
        ))
        .bind(id.value())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(db_error("find_rental_for_update"))?;

        row.as_ref().map(rental_from_row).transpose()
    }

    async fn find_active_rental_by_customer(
        &mut self,
        customer_id: CustomerId,
    ) -> Result<Option<Rental>> {
        let row = sqlx::query(&format!(
            "SELECT {RENTAL_COLUMNS} FROM rentals WHERE customer_id = $1 AND status = 'active'"
        ))
        .bind(customer_id.value())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(db_error("find_active_rental_by_customer"))?;

        row.as_ref().map(rental_from_row).transpose()
    }

    async fn delete_rental(&mut self, id: RentalId) -> Result<()> {
        let result = sqlx::query("DELETE FROM rentals WHERE id = $1 AND status = 'completed'")
            .bind(id.value())
            .execute(&mut *self.tx)
            .await
            .map_err(db_error("delete_rental"))?;

        if result.rows_affected() == 0 {
            return Err(RentalError::RentalNotFound { id: id.to_string() });
        }
        Ok(())
    }

    async fn list_rentals(&mut self, page: PageRequest) -> Result<Vec<RentalDetails>> {
        let rows = sqlx::query(&format!(
            "{RENTAL_DETAILS_SELECT} ORDER BY r.started_at DESC, r.id DESC LIMIT $1 OFFSET $2"
        ))
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&mut *self.tx)
        .await
        .map_err(db_error("list_rentals"))?;

        rows.iter().map(rental_details_from_row).collect()
    }

    async fn count_rentals(&mut self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM rentals")
            .fetch_one(&mut *self.tx)
            .await
            .map_err(db_error("count_rentals"))?;
        Ok(count.max(0) as u64)
    }
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn apply_transition(&mut self, transition: &RentalTransition) -> Result<Rental> {
        match transition {
            RentalTransition::Open(new_rental) => {
                let claimed = sqlx::query(
                    r#"
                    UPDATE vehicles SET status = 'rented', updated_at = NOW()
                    WHERE id = $1 AND status = 'available'
                    "#,
                )
                .bind(new_rental.vehicle_id.value())
                .execute(&mut *self.tx)
                .await
                .map_err(db_error("claim_vehicle"))?;

                if claimed.rows_affected() == 0 {
                    return Err(RentalError::NoVehicleAvailable);
                }

                let row = sqlx::query(&format!(
                    r#"
                    INSERT INTO rentals
                    (customer_id, vehicle_id, started_at, expected_end, daily_rate, status)
                    VALUES ($1, $2, $3, $4, $5, 'active')
                    RETURNING {RENTAL_COLUMNS}
                    "#
                ))
                .bind(new_rental.customer_id.value())
                .bind(new_rental.vehicle_id.value())
                .bind(new_rental.started_at)
                .bind(new_rental.expected_end)
                .bind(new_rental.daily_rate.as_decimal())
                .fetch_one(&mut *self.tx)
                .await
                .map_err(|e| match violated_constraint(&e, UNIQUE_VIOLATION).as_deref() {
                    Some("rentals_one_active_per_customer") => RentalError::ActiveRentalExists {
                        customer_id: new_rental.customer_id.to_string(),
                    },
                    Some("rentals_one_active_per_vehicle") => RentalError::NoVehicleAvailable,
                    _ => RentalError::database("open_rental", e),
                })?;

                rental_from_row(&row)
            }
            RentalTransition::Close {
                rental_id,
                vehicle_id,
                returned_at,
                total_charge,
            } => {
                let row = sqlx::query(&format!(
                    r#"
                    UPDATE rentals
                    SET actual_end = $2, total_charge = $3, status = 'completed', updated_at = NOW()
                    WHERE id = $1 AND status = 'active'
                    RETURNING {RENTAL_COLUMNS}
                    "#
                ))
                .bind(rental_id.value())
                .bind(*returned_at)
                .bind(total_charge.as_decimal())
                .fetch_optional(&mut *self.tx)
                .await
                .map_err(db_error("close_rental"))?
                .ok_or_else(|| RentalError::AlreadyCompleted {
                    id: rental_id.to_string(),
                })?;

                sqlx::query(
                    r#"
                    UPDATE vehicles SET status = 'available', updated_at = NOW()
                    WHERE id = $1
                    "#,
                )
                .bind(vehicle_id.value())
                .execute(&mut *self.tx)
                .await
                .map_err(db_error("release_vehicle"))?;

                rental_from_row(&row)
            }
        }
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let PgUnitOfWork { tx } = *self;
        tx.commit().await.map_err(db_error("commit"))
    }
}
