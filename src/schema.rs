//! Canonical sales fields and header resolution.
//!
//! Every input column is matched to a [`Field`] through a list of accepted
//! headers. The primary header (first alias) is the name used in error
//! messages.

use crate::error::{ReportError, Result};
use crate::table::Table;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Product,
    Subcategory,
    Weekday,
    UnitPrice,
    Quantity,
    Amount,
    DiscountRate,
    DiscountAmount,
    WasteRate,
    WasteAmount,
    Temperature,
}

impl Field {
    pub const ALL: [Field; 11] = [
        Field::Product,
        Field::Subcategory,
        Field::Weekday,
        Field::UnitPrice,
        Field::Quantity,
        Field::Amount,
        Field::DiscountRate,
        Field::DiscountAmount,
        Field::WasteRate,
        Field::WasteAmount,
        Field::Temperature,
    ];

    /// Built-in accepted headers, primary first
    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            Field::Product => &["商品名", "product", "product_name"],
            Field::Subcategory => &["サブカテゴリ", "subcategory", "sub_category"],
            Field::Weekday => &["曜日", "weekday", "day_of_week"],
            Field::UnitPrice => &["単価", "unit_price", "price"],
            Field::Quantity => &["数量", "販売数量", "quantity", "quantity_sold", "qty"],
            Field::Amount => &["金額", "amount", "sales", "revenue"],
            Field::DiscountRate => &["値引き率", "discount_rate"],
            Field::DiscountAmount => &["値引き額", "discount_amount", "discount"],
            Field::WasteRate => &["廃棄率", "waste_rate"],
            Field::WasteAmount => &["廃棄額", "waste_amount", "waste"],
            Field::Temperature => &["気温", "temperature", "temp"],
        }
    }

    pub fn primary_header(self) -> &'static str {
        self.aliases()[0]
    }
}

impl FromStr for Field {
    type Err = String;

    /// Parse the snake_case field name used in configuration
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let field = match s.trim() {
            "product" => Field::Product,
            "subcategory" => Field::Subcategory,
            "weekday" => Field::Weekday,
            "unit_price" => Field::UnitPrice,
            "quantity" => Field::Quantity,
            "amount" => Field::Amount,
            "discount_rate" => Field::DiscountRate,
            "discount_amount" => Field::DiscountAmount,
            "waste_rate" => Field::WasteRate,
            "waste_amount" => Field::WasteAmount,
            "temperature" => Field::Temperature,
            other => return Err(format!("unknown field '{other}'")),
        };
        Ok(field)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.primary_header())
    }
}

/// Fields every sales export carries
pub fn default_required_fields() -> Vec<Field> {
    vec![Field::Subcategory, Field::Weekday, Field::UnitPrice, Field::Quantity]
}

/// Header lookup table: built-in aliases plus deployment extras
#[derive(Debug, Clone, Default)]
pub struct ColumnAliases {
    extra: HashMap<Field, Vec<String>>,
}

impl ColumnAliases {
    pub fn new(extra: HashMap<Field, Vec<String>>) -> Self {
        Self { extra }
    }

    fn candidates(&self, field: Field) -> impl Iterator<Item = &str> + '_ {
        field
            .aliases()
            .iter()
            .copied()
            .chain(self.extra.get(&field).into_iter().flatten().map(String::as_str))
    }

    /// Find the column index of a field, if the table carries it
    pub fn locate(&self, table: &Table, field: Field) -> Option<usize> {
        self.candidates(field).find_map(|name| table.column_index(name))
    }
}

/// Column indices resolved for one table
#[derive(Debug, Clone, Default)]
pub struct ResolvedColumns {
    columns: HashMap<Field, usize>,
}

impl ResolvedColumns {
    pub fn index(&self, field: Field) -> Option<usize> {
        self.columns.get(&field).copied()
    }

    pub fn has(&self, field: Field) -> bool {
        self.columns.contains_key(&field)
    }
}

/// Resolve every known field and fail if any required one is absent.
///
/// All missing columns are collected before failing.
pub fn validate(table: &Table, required: &[Field], aliases: &ColumnAliases) -> Result<ResolvedColumns> {
    let columns: HashMap<Field, usize> = Field::ALL
        .iter()
        .filter_map(|&field| aliases.locate(table, field).map(|idx| (field, idx)))
        .collect();

    let mut missing: Vec<String> = Vec::new();
    for field in required {
        if !columns.contains_key(field) {
            let name = field.primary_header().to_string();
            if !missing.contains(&name) {
                missing.push(name);
            }
        }
    }

    if !missing.is_empty() {
        return Err(ReportError::Schema { missing });
    }

    Ok(ResolvedColumns { columns })
}
