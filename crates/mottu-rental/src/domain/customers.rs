use crate::domain::clock::Clock;
use crate::domain::types::{CustomerId, LicenseType};
use crate::error::{RentalError, Result};
use crate::storage::RentalStore;
use chrono::{Datelike, NaiveDate};
use mottu_common::{Page, PageRequest};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const MINIMUM_RENTAL_AGE: i32 = 18;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub name: String,
    pub national_id: String,
    pub birth_date: NaiveDate,
    pub license_number: String,
    pub license_type: LicenseType,
}

/// Customer row about to be inserted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCustomer {
    pub name: String,
    pub national_id: String,
    pub birth_date: NaiveDate,
    pub license_number: String,
    pub license_type: LicenseType,
}

/// Registration input before eligibility rules; the license type is still
/// the caller's raw text.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CustomerRegistration {
    pub name: String,
    pub national_id: String,
    pub birth_date: NaiveDate,
    pub license_number: String,
    pub license_type: String,
}

/// Completed years between `birth_date` and `today`
pub fn age_on(birth_date: NaiveDate, today: NaiveDate) -> i32 {
    let mut age = today.year() - birth_date.year();
    if (today.month(), today.day()) < (birth_date.month(), birth_date.day()) {
        age -= 1;
    }
    age
}

pub fn parse_rental_license(raw: &str) -> Result<LicenseType> {
    match raw.parse::<LicenseType>() {
        Ok(license) if license.can_rent_motorcycle() => Ok(license),
        _ => Err(RentalError::IneligibleLicense {
            license_type: raw.to_string(),
        }),
    }
}

pub struct CustomerService {
    store: Arc<dyn RentalStore>,
    clock: Arc<dyn Clock>,
}

impl CustomerService {
    pub fn new(store: Arc<dyn RentalStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub async fn register_customer(&self, registration: CustomerRegistration) -> Result<Customer> {
        let mut uow = self.store.begin().await?;

        if uow
            .find_customer_by_national_id(&registration.national_id)
            .await?
            .is_some()
        {
            warn!("Rejected registration: national ID already registered");
            return Err(RentalError::DuplicateIdentifier {
                field: "national_id".to_string(),
                value: registration.national_id,
            });
        }
        if uow
            .find_customer_by_license_number(&registration.license_number)
            .await?
            .is_some()
        {
            warn!("Rejected registration: license number already registered");
            return Err(RentalError::DuplicateIdentifier {
                field: "license_number".to_string(),
                value: registration.license_number,
            });
        }

        let license_type = match parse_rental_license(&registration.license_type) {
            Ok(license_type) => license_type,
            Err(e) => {
                warn!(
                    "Rejected registration: license type '{}' not eligible",
                    registration.license_type
                );
                return Err(e);
            }
        };

        let today = self.clock.now().date_naive();
        let age = age_on(registration.birth_date, today);
        if age < MINIMUM_RENTAL_AGE {
            warn!("Rejected registration: customer is {} years old", age);
            return Err(RentalError::Underage {
                age,
                minimum: MINIMUM_RENTAL_AGE,
            });
        }

        let customer = uow
            .insert_customer(&NewCustomer {
                name: registration.name,
                national_id: registration.national_id,
                birth_date: registration.birth_date,
                license_number: registration.license_number,
                license_type,
            })
            .await?;
        uow.commit().await?;

        info!(
            "Registered customer {} with license {}",
            customer.id, customer.license_type
        );
        Ok(customer)
    }

    pub async fn get_customer(&self, id: CustomerId) -> Result<Customer> {
        let mut uow = self.store.begin().await?;
        debug!("Loading customer {}", id);
        uow.find_customer(id)
            .await?
            .ok_or_else(|| RentalError::CustomerNotFound { id: id.to_string() })
    }

    pub async fn list_customers(&self, page: PageRequest) -> Result<Page<Customer>> {
        let mut uow = self.store.begin().await?;
        let items = uow.list_customers(page).await?;
        let total = uow.count_customers().await?;
        Ok(Page::new(items, total, page))
    }

    pub async fn rename_customer(&self, id: CustomerId, name: String) -> Result<()> {
        let mut uow = self.store.begin().await?;
        let mut customer = uow
            .find_customer_for_update(id)
            .await?
            .ok_or_else(|| RentalError::CustomerNotFound { id: id.to_string() })?;

        if uow.find_active_rental_by_customer(id).await?.is_some() {
            warn!("Rejected rename of customer {}: rental in progress", id);
            return Err(RentalError::ActiveRentalConflict {
                reason: format!("customer {} has an active rental", id),
            });
        }

        customer.name = name;
        uow.update_customer(&customer).await?;
        uow.commit().await?;

        info!("Renamed customer {}", id);
        Ok(())
    }

    pub async fn delete_customer(&self, id: CustomerId) -> Result<()> {
        let mut uow = self.store.begin().await?;
        uow.find_customer_for_update(id)
            .await?
            .ok_or_else(|| RentalError::CustomerNotFound { id: id.to_string() })?;

        if uow.find_active_rental_by_customer(id).await?.is_some() {
            warn!("Rejected deletion of customer {}: rental in progress", id);
            return Err(RentalError::ActiveRentalConflict {
                reason: format!("customer {} has an active rental", id),
            });
        }

        uow.delete_customer(id).await?;
        uow.commit().await?;

        info!("Deleted customer {}", id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::clock::FixedClock;
    use crate::storage::MemoryStore;
    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn service() -> CustomerService {
        let clock = FixedClock::new(Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap());
        CustomerService::new(Arc::new(MemoryStore::new()), Arc::new(clock))
    }

    fn registration(national_id: &str, license_number: &str, license: &str) -> CustomerRegistration {
        CustomerRegistration {
            name: "Maria Santos".to_string(),
            national_id: national_id.to_string(),
            birth_date: date(1985, 8, 15),
            license_number: license_number.to_string(),
            license_type: license.to_string(),
        }
    }

    #[test]
    fn test_age_before_and_after_birthday() {
        assert_eq!(age_on(date(2007, 6, 15), date(2025, 6, 15)), 18);
        assert_eq!(age_on(date(2007, 6, 16), date(2025, 6, 15)), 17);
        assert_eq!(age_on(date(2007, 5, 31), date(2025, 6, 15)), 18);
        assert_eq!(age_on(date(2004, 2, 29), date(2022, 2, 28)), 17);
        assert_eq!(age_on(date(2004, 2, 29), date(2022, 3, 1)), 18);
    }

    #[test]
    fn test_parse_rental_license() {
        assert_eq!(parse_rental_license("a").unwrap(), LicenseType::A);
        assert_eq!(parse_rental_license("AB").unwrap(), LicenseType::AB);
        assert!(matches!(
            parse_rental_license("B"),
            Err(RentalError::IneligibleLicense { .. })
        ));
        assert!(matches!(
            parse_rental_license("motorcycle"),
            Err(RentalError::IneligibleLicense { .. })
        ));
    }

    #[tokio::test]
    async fn test_register_customer() {
        let service = service();
        let customer = service
            .register_customer(registration("23456789011", "87654321099", "a"))
            .await
            .unwrap();

        assert_eq!(customer.license_type, LicenseType::A);
        assert_eq!(service.get_customer(customer.id).await.unwrap(), customer);
    }

    #[tokio::test]
    async fn test_duplicate_national_id_checked_first() {
        let service = service();
        service
            .register_customer(registration("23456789011", "87654321099", "A"))
            .await
            .unwrap();

        let err = service
            .register_customer(registration("23456789011", "87654321099", "B"))
            .await
            .unwrap_err();
        match err {
            RentalError::DuplicateIdentifier { field, .. } => assert_eq!(field, "national_id"),
            other => panic!("unexpected error: {other}"),
        }

        let err = service
            .register_customer(registration("99999999999", "87654321099", "A"))
            .await
            .unwrap_err();
        match err {
            RentalError::DuplicateIdentifier { field, .. } => assert_eq!(field, "license_number"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_license_checked_before_age() {
        let service = service();
        let mut young_b = registration("11111111111", "22222222222", "B");
        young_b.birth_date = date(2010, 1, 1);

        let err = service.register_customer(young_b).await.unwrap_err();
        assert!(matches!(err, RentalError::IneligibleLicense { .. }));
    }

    #[tokio::test]
    async fn test_underage_customer_rejected() {
        let service = service();
        let mut minor = registration("11111111111", "22222222222", "AB");
        minor.birth_date = date(2007, 6, 16);

        let err = service.register_customer(minor).await.unwrap_err();
        assert!(matches!(err, RentalError::Underage { age: 17, minimum: 18 }));

        let page = service.list_customers(PageRequest::default()).await.unwrap();
        assert_eq!(page.total_count, 0);
    }

    #[tokio::test]
    async fn test_rename_and_delete_missing_customer() {
        let service = service();
        let missing = CustomerId::new(42);

        assert!(service
            .rename_customer(missing, "Nobody".to_string())
            .await
            .unwrap_err()
            .is_not_found());
        assert!(service.delete_customer(missing).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_rename_keeps_identity_fields() {
        let service = service();
        let customer = service
            .register_customer(registration("23456789011", "87654321099", "A"))
            .await
            .unwrap();

        service
            .rename_customer(customer.id, "Maria S. Oliveira".to_string())
            .await
            .unwrap();

        let renamed = service.get_customer(customer.id).await.unwrap();
        assert_eq!(renamed.name, "Maria S. Oliveira");
        assert_eq!(renamed.national_id, customer.national_id);
        assert_eq!(renamed.license_number, customer.license_number);
    }

    proptest! {
        #[test]
        fn prop_age_never_exceeds_year_difference(
            birth_offset in 0i64..40_000,
            span in 0i64..40_000,
        ) {
            let birth = date(1920, 1, 1) + chrono::Duration::days(birth_offset);
            let today = birth + chrono::Duration::days(span);
            let age = age_on(birth, today);
            prop_assert!(age >= 0);
            prop_assert!(age <= today.year() - birth.year());
            prop_assert!(age >= today.year() - birth.year() - 1);
        }
    }
}
