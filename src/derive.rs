//! Field derivation: turns a validated table into typed sales records.

use crate::error::{ReportError, Result};
use crate::schema::{Field, ResolvedColumns};
use crate::table::{Cell, Table};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

/// Guard for ratios computed against revenue
pub const REVENUE_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Weekday {
    pub const ALL: [Weekday; 7] = [
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
        Weekday::Saturday,
        Weekday::Sunday,
    ];

    /// Monday = 0 .. Sunday = 6
    pub fn index(self) -> usize {
        self as usize
    }

    /// Canonical label used on chart axes
    pub fn label(self) -> &'static str {
        match self {
            Weekday::Monday => "月曜日",
            Weekday::Tuesday => "火曜日",
            Weekday::Wednesday => "水曜日",
            Weekday::Thursday => "木曜日",
            Weekday::Friday => "金曜日",
            Weekday::Saturday => "土曜日",
            Weekday::Sunday => "日曜日",
        }
    }

    /// Normalize a Japanese or English weekday label
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw
            .trim()
            .trim_start_matches(['(', '（', '['])
            .trim_end_matches([')', '）', ']'])
            .trim();

        let mut chars = trimmed.chars();
        if let Some(first) = chars.next() {
            let rest = chars.as_str();
            if matches!(rest, "" | "曜" | "曜日") {
                let day = match first {
                    '月' => Some(Weekday::Monday),
                    '火' => Some(Weekday::Tuesday),
                    '水' => Some(Weekday::Wednesday),
                    '木' => Some(Weekday::Thursday),
                    '金' => Some(Weekday::Friday),
                    '土' => Some(Weekday::Saturday),
                    '日' => Some(Weekday::Sunday),
                    _ => None,
                };
                if day.is_some() {
                    return day;
                }
            }
        }

        match trimmed.to_lowercase().as_str() {
            "monday" | "mon" => Some(Weekday::Monday),
            "tuesday" | "tue" | "tues" => Some(Weekday::Tuesday),
            "wednesday" | "wed" => Some(Weekday::Wednesday),
            "thursday" | "thu" | "thur" | "thurs" => Some(Weekday::Thursday),
            "friday" | "fri" => Some(Weekday::Friday),
            "saturday" | "sat" => Some(Weekday::Saturday),
            "sunday" | "sun" => Some(Weekday::Sunday),
            _ => None,
        }
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One sales row after derivation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    pub product: Option<String>,
    pub subcategory: Option<String>,
    pub weekday: Option<Weekday>,
    pub unit_price: Option<f64>,
    pub quantity: Option<f64>,
    pub revenue: f64,
    pub discount_rate: Option<f64>,
    pub waste_rate: Option<f64>,
    pub temperature: Option<f64>,
}

/// Typed records plus the set of fields the table actually provided
#[derive(Debug, Clone, Default)]
pub struct SalesFrame {
    pub records: Vec<Record>,
    available: HashSet<Field>,
    revenue_available: bool,
}

impl SalesFrame {
    pub fn new(records: Vec<Record>, available: HashSet<Field>, revenue_available: bool) -> Self {
        Self {
            records,
            available,
            revenue_available,
        }
    }

    /// Whether the field is present in the source table or was derived
    pub fn has(&self, field: Field) -> bool {
        self.available.contains(&field)
    }

    pub fn has_revenue(&self) -> bool {
        self.revenue_available
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Read a numeric field, rejecting text in a numeric column
fn numeric(table: &Table, columns: &ResolvedColumns, field: Field, row: usize) -> Result<Option<f64>> {
    let Some(col) = columns.index(field) else {
        return Ok(None);
    };
    match table.cell(row, col) {
        Cell::Null => Ok(None),
        Cell::Number(n, _) => Ok(Some(*n)),
        Cell::Text(s) => Err(ReportError::Parse(format!(
            "failed to parse '{}' as number in column '{}' at row {}",
            s,
            table.headers[col],
            row + 1
        ))),
    }
}

fn label(table: &Table, columns: &ResolvedColumns, field: Field, row: usize) -> Option<String> {
    columns
        .index(field)
        .and_then(|col| table.cell(row, col).as_label())
}

/// Derive revenue, ratios and weekday buckets for every row
pub fn derive_records(table: &Table, columns: &ResolvedColumns) -> Result<SalesFrame> {
    let from_price = columns.has(Field::UnitPrice) && columns.has(Field::Quantity);
    let from_amount = !from_price && columns.has(Field::Amount);
    let derive_discount = !columns.has(Field::DiscountRate) && columns.has(Field::DiscountAmount);
    let derive_waste = !columns.has(Field::WasteRate) && columns.has(Field::WasteAmount);

    let mut records = Vec::with_capacity(table.len());
    for row in 0..table.len() {
        let unit_price = numeric(table, columns, Field::UnitPrice, row)?;
        let quantity = numeric(table, columns, Field::Quantity, row)?;

        let revenue = if from_price {
            unit_price.unwrap_or(0.0) * quantity.unwrap_or(0.0)
        } else if from_amount {
            numeric(table, columns, Field::Amount, row)?.unwrap_or(0.0)
        } else {
            0.0
        };

        let discount_rate = if derive_discount {
            numeric(table, columns, Field::DiscountAmount, row)?
                .map(|amount| amount / revenue.max(REVENUE_EPSILON))
        } else {
            numeric(table, columns, Field::DiscountRate, row)?
        };

        let waste_rate = if derive_waste {
            numeric(table, columns, Field::WasteAmount, row)?
                .map(|amount| amount / revenue.max(REVENUE_EPSILON))
        } else {
            numeric(table, columns, Field::WasteRate, row)?
        };

        let weekday = columns.index(Field::Weekday).and_then(|col| match table.cell(row, col) {
            Cell::Text(s) => Weekday::parse(s),
            _ => None,
        });

        records.push(Record {
            product: label(table, columns, Field::Product, row),
            subcategory: label(table, columns, Field::Subcategory, row),
            weekday,
            unit_price,
            quantity,
            revenue,
            discount_rate,
            waste_rate,
            temperature: numeric(table, columns, Field::Temperature, row)?,
        });
    }

    let mut available: HashSet<Field> = Field::ALL.iter().copied().filter(|&f| columns.has(f)).collect();
    if derive_discount {
        available.insert(Field::DiscountRate);
    }
    if derive_waste {
        available.insert(Field::WasteRate);
    }

    Ok(SalesFrame::new(records, available, from_price || from_amount))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{validate, ColumnAliases};

    fn frame(csv: &str) -> Result<SalesFrame> {
        let table = Table::from_csv_bytes(csv.as_bytes(), b',')?;
        let columns = validate(&table, &[], &ColumnAliases::default())?;
        derive_records(&table, &columns)
    }

    #[test]
    fn test_weekday_parse_japanese() {
        assert_eq!(Weekday::parse("月曜日"), Some(Weekday::Monday));
        assert_eq!(Weekday::parse("火曜"), Some(Weekday::Tuesday));
        assert_eq!(Weekday::parse("(水)"), Some(Weekday::Wednesday));
        assert_eq!(Weekday::parse("（日）"), Some(Weekday::Sunday));
        assert_eq!(Weekday::parse("不明"), None);
    }

    #[test]
    fn test_weekday_parse_english() {
        assert_eq!(Weekday::parse("Thursday"), Some(Weekday::Thursday));
        assert_eq!(Weekday::parse("sat"), Some(Weekday::Saturday));
        assert_eq!(Weekday::parse("FRI"), Some(Weekday::Friday));
        assert_eq!(Weekday::parse("Funday"), None);
    }

    #[test]
    fn test_weekday_order() {
        let indices: Vec<usize> = Weekday::ALL.iter().map(|d| d.index()).collect();
        assert_eq!(indices, vec![0, 1, 2, 3, 4, 5, 6]);
        assert!(Weekday::Monday < Weekday::Sunday);
    }

    #[test]
    fn test_revenue_is_exact_product() {
        let frame = frame("単価,数量\n0.1,3\n19.99,7\n100,2\n").unwrap();
        assert_eq!(frame.records[0].revenue, 0.1 * 3.0);
        assert_eq!(frame.records[1].revenue, 19.99 * 7.0);
        assert_eq!(frame.records[2].revenue, 200.0);
        assert!(frame.has_revenue());
    }

    #[test]
    fn test_null_price_yields_zero_revenue() {
        let frame = frame("単価,数量\n,3\n").unwrap();
        assert_eq!(frame.records[0].revenue, 0.0);
    }

    #[test]
    fn test_amount_column_used_without_price() {
        let frame = frame("金額,曜日\n500,月曜日\n,火曜日\n").unwrap();
        assert_eq!(frame.records[0].revenue, 500.0);
        assert_eq!(frame.records[1].revenue, 0.0);
        assert!(frame.has_revenue());
    }

    #[test]
    fn test_no_revenue_source() {
        let frame = frame("曜日\n月曜日\n").unwrap();
        assert!(!frame.has_revenue());
    }

    #[test]
    fn test_discount_rate_derived_from_amount() {
        let frame = frame("単価,数量,値引き額,廃棄額\n100,2,20,0\n0,5,10,\n").unwrap();
        assert!(frame.has(Field::DiscountRate));
        assert!(frame.has(Field::WasteRate));
        assert_eq!(frame.records[0].discount_rate, Some(0.1));
        assert_eq!(frame.records[0].waste_rate, Some(0.0));
        // Zero revenue is guarded, not a division by zero
        let rate = frame.records[1].discount_rate.unwrap();
        assert!(rate.is_finite());
        assert_eq!(frame.records[1].waste_rate, None);
    }

    #[test]
    fn test_discount_rate_column_preferred() {
        let frame = frame("単価,数量,値引き率,値引き額\n100,2,0.3,20\n").unwrap();
        assert_eq!(frame.records[0].discount_rate, Some(0.3));
    }

    #[test]
    fn test_text_in_numeric_column_is_parse_error() {
        let err = frame("単価,数量\n100,2\nabc,1\n").unwrap_err();
        let msg = err.to_string();
        assert!(matches!(err, ReportError::Parse(_)));
        assert!(msg.contains("単価"));
        assert!(msg.contains("row 2"));
    }

    #[test]
    fn test_weekday_and_labels() {
        let frame = frame("商品名,サブカテゴリ,曜日,気温\nおにぎり,米飯,Mon,21.5\n123,,不明,\n").unwrap();
        let first = &frame.records[0];
        assert_eq!(first.weekday, Some(Weekday::Monday));
        assert_eq!(first.subcategory.as_deref(), Some("米飯"));
        assert_eq!(first.temperature, Some(21.5));
        let second = &frame.records[1];
        assert_eq!(second.product.as_deref(), Some("123"));
        assert_eq!(second.subcategory, None);
        assert_eq!(second.weekday, None);
    }

    #[test]
    fn test_numeric_looking_products_stay_distinct() {
        use crate::aggregate::{aggregate, ChartData};
        use crate::chart::{ChartKind, ChartSpec, Dimension, Measure, Reduction};

        let frame = frame("商品名,単価,数量\n001,1,10\n1,1,20\n1.50,1,30\nABC,1,40\n").unwrap();
        let spec = ChartSpec::new("p", "p", ChartKind::Bar, Dimension::Product, Measure::Revenue, Reduction::Sum);
        let data = aggregate(&frame, &spec).unwrap();
        assert_eq!(
            data,
            ChartData::Categories(vec![
                ("001".to_string(), 10.0),
                ("1".to_string(), 20.0),
                ("1.50".to_string(), 30.0),
                ("ABC".to_string(), 40.0),
            ])
        );
    }
}
