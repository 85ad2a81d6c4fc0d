use super::IncomeFrequency;

/// Fixed primary key of the single profile row.
pub const PROFILE_ID: i64 = 1;

/// The one-per-database user profile. All monetary fields are minor-unit
/// (centavo) amounts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub id: i64,
    pub income_amount: i64,
    pub fixed_bills_amount: i64,
    pub savings_goal_amount: i64,
    pub income_frequency: IncomeFrequency,
    /// Day of the period on which the budget cycle resets.
    pub reset_day: u32,
    pub currency: String,
    pub setup_completed: bool,
}

impl Default for UserProfile {
    fn default() -> Self {
        Self {
            id: PROFILE_ID,
            income_amount: 0,
            fixed_bills_amount: 0,
            savings_goal_amount: 0,
            income_frequency: IncomeFrequency::Monthly,
            reset_day: 1,
            currency: "₱".to_string(),
            setup_completed: false,
        }
    }
}
