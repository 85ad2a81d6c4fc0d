#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IncomeFrequency {
    Weekly,
    #[default]
    Monthly,
    Irregular,
}

impl IncomeFrequency {
    /// Name the frequency is persisted under.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Weekly => "WEEKLY",
            Self::Monthly => "MONTHLY",
            Self::Irregular => "IRREGULAR",
        }
    }

    /// Strict decode of a stored name. Unknown strings are rejected rather
    /// than silently mapped to a default.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "WEEKLY" => Some(Self::Weekly),
            "MONTHLY" => Some(Self::Monthly),
            "IRREGULAR" => Some(Self::Irregular),
            _ => None,
        }
    }

    pub fn all() -> &'static [IncomeFrequency] {
        &[Self::Weekly, Self::Monthly, Self::Irregular]
    }
}

impl std::fmt::Display for IncomeFrequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
