use crate::domain::types::{LicenseType, RiskLevel};

pub const DEFAULT_YOUNG_RIDER_AGE: u32 = 25;

#[cfg_attr(test, mockall::automock)]
pub trait RiskClassifier: Send + Sync {
    fn estimate_risk(&self, age: u32, license_type: LicenseType) -> RiskLevel;
}

/// Flags young riders and anyone without a motorcycle license
#[derive(Debug, Clone, Copy)]
pub struct RuleBasedRiskClassifier {
    young_rider_age: u32,
}

impl RuleBasedRiskClassifier {
    pub fn new(young_rider_age: u32) -> Self {
        Self { young_rider_age }
    }
}

impl Default for RuleBasedRiskClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_YOUNG_RIDER_AGE)
    }
}

impl RiskClassifier for RuleBasedRiskClassifier {
    fn estimate_risk(&self, age: u32, license_type: LicenseType) -> RiskLevel {
        if age < self.young_rider_age || !license_type.can_rent_motorcycle() {
            RiskLevel::High
        } else {
            RiskLevel::Low
        }
    }
}
