mod category;
mod frequency;
mod profile;
mod transaction;

pub use category::Category;
pub use frequency::IncomeFrequency;
pub use profile::{UserProfile, PROFILE_ID};
pub use transaction::{format_centavos, Transaction, TransactionKind};
