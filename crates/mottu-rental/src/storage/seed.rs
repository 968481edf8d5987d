//! Demo fleet and customers for an empty store

use crate::domain::customers::NewCustomer;
use crate::domain::types::{LicenseType, VehicleStatus};
use crate::domain::vehicles::NewVehicle;
use crate::error::{RentalError, Result};
use crate::storage::RentalStore;
use chrono::NaiveDate;
use tracing::info;

struct DemoCustomer {
    name: &'static str,
    national_id: &'static str,
    birth_date: (i32, u32, u32),
    license_number: &'static str,
    license_type: LicenseType,
}

const DEMO_CUSTOMERS: &[DemoCustomer] = &[
    DemoCustomer {
        name: "João Silva",
        national_id: "12345678900",
        birth_date: (1990, 5, 20),
        license_number: "98765432100",
        license_type: LicenseType::AB,
    },
    DemoCustomer {
        name: "Maria Santos",
        national_id: "23456789011",
        birth_date: (1985, 8, 15),
        license_number: "87654321099",
        license_type: LicenseType::A,
    },
    DemoCustomer {
        name: "Pedro Oliveira",
        national_id: "34567890122",
        birth_date: (1992, 3, 10),
        license_number: "76543210988",
        license_type: LicenseType::A,
    },
    DemoCustomer {
        name: "Ana Costa",
        national_id: "45678901233",
        birth_date: (1988, 11, 25),
        license_number: "65432109877",
        license_type: LicenseType::AB,
    },
    DemoCustomer {
        name: "Carlos Pereira",
        national_id: "56789012344",
        birth_date: (1995, 7, 5),
        license_number: "54321098766",
        license_type: LicenseType::B,
    },
];

const DEMO_VEHICLES: &[(i32, &str, &str, VehicleStatus)] = &[
    (2024, "Honda Pop 110i", "ABC-1234", VehicleStatus::Available),
    (2023, "Yamaha Factor 150", "DEF-5678", VehicleStatus::Available),
    (2024, "Honda CG 160", "GHI-9012", VehicleStatus::Available),
    (2023, "Yamaha NMAX", "JKL-3456", VehicleStatus::Available),
    (2024, "Honda Biz 125", "MNO-7890", VehicleStatus::Available),
    (2023, "Yamaha Fazer 250", "PQR-1357", VehicleStatus::Available),
    (2024, "Honda PCX 160", "STU-2468", VehicleStatus::Available),
    (2022, "Yamaha XRE 300", "VWX-3691", VehicleStatus::Maintenance),
];

/// Inserts the demo data when the store has neither customers nor
/// vehicles. Returns whether anything was written.
pub async fn seed_demo_data(store: &dyn RentalStore) -> Result<bool> {
    let mut uow = store.begin().await?;

    if uow.count_customers().await? > 0 || uow.count_vehicles().await? > 0 {
        info!("Store already has data, skipping demo seed");
        return Ok(false);
    }

    for demo in DEMO_CUSTOMERS {
        let (year, month, day) = demo.birth_date;
        let birth_date =
            NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| RentalError::Configuration {
                message: format!("invalid demo birth date for {}", demo.name),
            })?;
        uow.insert_customer(&NewCustomer {
            name: demo.name.to_string(),
            national_id: demo.national_id.to_string(),
            birth_date,
            license_number: demo.license_number.to_string(),
            license_type: demo.license_type,
        })
        .await?;
    }

    for (year, model, plate, status) in DEMO_VEHICLES {
        uow.insert_vehicle(&NewVehicle {
            year: *year,
            model: model.to_string(),
            plate: plate.to_string(),
            status: *status,
        })
        .await?;
    }

    uow.commit().await?;
    info!(
        "Seeded {} demo customers and {} demo vehicles",
        DEMO_CUSTOMERS.len(),
        DEMO_VEHICLES.len()
    );
    Ok(true)
}
