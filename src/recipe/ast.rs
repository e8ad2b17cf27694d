// Syntax tree for chart recipes, before names are resolved

/// A parsed recipe: `kind(value by key[, series]) | modifier | ...`
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecipe {
    pub kind: String,
    /// `None` for a bare measure (scatter)
    pub reduction: Option<String>,
    pub measure: String,
    pub key: String,
    pub series: Option<String>,
    pub modifiers: Vec<Modifier>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Modifier {
    Top(usize),
    Order(String),
    Title(String),
}
