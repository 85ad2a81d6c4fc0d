#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub id: Option<i64>,
    pub name: String,
    /// Icon identifier string, e.g. "food" or "transport".
    pub icon: String,
    /// Packed ARGB color.
    pub color: u32,
}

impl Category {
    pub fn new(name: String, icon: String, color: u32) -> Self {
        Self {
            id: None,
            name,
            icon,
            color,
        }
    }

    /// Find a category by ID in a slice.
    pub fn find_by_id(categories: &[Category], id: i64) -> Option<&Category> {
        categories.iter().find(|c| c.id == Some(id))
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}
