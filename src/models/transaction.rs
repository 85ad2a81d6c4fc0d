use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionKind {
    Income,
    Expense,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub id: Option<i64>,
    /// Signed minor-unit amount; the app records both kinds as positive and
    /// tells them apart by `category_id`.
    pub amount_centavos: i64,
    /// `None` marks income; a category marks an expense.
    pub category_id: Option<i64>,
    pub description: Option<String>,
    pub date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    pub fn new(
        amount_centavos: i64,
        category_id: Option<i64>,
        description: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            amount_centavos,
            category_id,
            description,
            date: now,
            created_at: now,
        }
    }

    pub fn kind(&self) -> TransactionKind {
        if self.category_id.is_none() {
            TransactionKind::Income
        } else {
            TransactionKind::Expense
        }
    }

    pub fn is_income(&self) -> bool {
        self.kind() == TransactionKind::Income
    }

    pub fn abs_amount(&self) -> i64 {
        self.amount_centavos.abs()
    }
}

/// Render a minor-unit amount as `SYMBOL123.45` for display.
pub fn format_centavos(amount: i64, currency: &str) -> String {
    let sign = if amount < 0 { "-" } else { "" };
    let abs = amount.unsigned_abs();
    format!("{sign}{currency}{}.{:02}", abs / 100, abs % 100)
}
