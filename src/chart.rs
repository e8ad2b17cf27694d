//! Chart definitions and the default catalog.

use crate::derive::Record;
use crate::schema::Field;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default truncation for top-N charts
pub const DEFAULT_TOP_N: usize = 10;

/// Group-by key of a chart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Product,
    Subcategory,
    Weekday,
    DiscountRate,
    WasteRate,
    Temperature,
}

impl Dimension {
    pub fn field(self) -> Field {
        match self {
            Dimension::Product => Field::Product,
            Dimension::Subcategory => Field::Subcategory,
            Dimension::Weekday => Field::Weekday,
            Dimension::DiscountRate => Field::DiscountRate,
            Dimension::WasteRate => Field::WasteRate,
            Dimension::Temperature => Field::Temperature,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Dimension::Product => "product",
            Dimension::Subcategory => "subcategory",
            Dimension::Weekday => "weekday",
            Dimension::DiscountRate => "discount_rate",
            Dimension::WasteRate => "waste_rate",
            Dimension::Temperature => "temperature",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        [
            Dimension::Product,
            Dimension::Subcategory,
            Dimension::Weekday,
            Dimension::DiscountRate,
            Dimension::WasteRate,
            Dimension::Temperature,
        ]
        .into_iter()
        .find(|d| d.name() == name)
    }

    /// Numeric value of the key, for continuous axes
    pub fn numeric_value(self, record: &Record) -> Option<f64> {
        match self {
            Dimension::DiscountRate => record.discount_rate,
            Dimension::WasteRate => record.waste_rate,
            Dimension::Temperature => record.temperature,
            Dimension::Product | Dimension::Subcategory | Dimension::Weekday => None,
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, Dimension::DiscountRate | Dimension::WasteRate | Dimension::Temperature)
    }
}

/// Value column of a chart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Measure {
    Revenue,
    Quantity,
    UnitPrice,
    DiscountRate,
    WasteRate,
    Temperature,
}

impl Measure {
    pub fn value(self, record: &Record) -> Option<f64> {
        match self {
            Measure::Revenue => Some(record.revenue),
            Measure::Quantity => record.quantity,
            Measure::UnitPrice => record.unit_price,
            Measure::DiscountRate => record.discount_rate,
            Measure::WasteRate => record.waste_rate,
            Measure::Temperature => record.temperature,
        }
    }

    /// Source field, `None` for revenue which is derived
    pub fn field(self) -> Option<Field> {
        match self {
            Measure::Revenue => None,
            Measure::Quantity => Some(Field::Quantity),
            Measure::UnitPrice => Some(Field::UnitPrice),
            Measure::DiscountRate => Some(Field::DiscountRate),
            Measure::WasteRate => Some(Field::WasteRate),
            Measure::Temperature => Some(Field::Temperature),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Measure::Revenue => "revenue",
            Measure::Quantity => "quantity",
            Measure::UnitPrice => "unit_price",
            Measure::DiscountRate => "discount_rate",
            Measure::WasteRate => "waste_rate",
            Measure::Temperature => "temperature",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        [
            Measure::Revenue,
            Measure::Quantity,
            Measure::UnitPrice,
            Measure::DiscountRate,
            Measure::WasteRate,
            Measure::Temperature,
        ]
        .into_iter()
        .find(|m| m.name() == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reduction {
    Sum,
    Mean,
    Count,
    /// Raw values, scatter only
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Order {
    /// By category key, numeric when every key is a number
    Key,
    /// Monday through Sunday
    Weekday,
    ValueAsc,
    ValueDesc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    Bar,
    HorizontalBar,
    Pie,
    Scatter,
    Line,
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChartKind::Bar => "bar",
            ChartKind::HorizontalBar => "barh",
            ChartKind::Pie => "pie",
            ChartKind::Scatter => "scatter",
            ChartKind::Line => "line",
        };
        f.write_str(name)
    }
}

/// A named aggregation plus a rendering recipe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSpec {
    pub id: String,
    pub title: String,
    pub kind: ChartKind,
    pub key: Dimension,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series: Option<Dimension>,
    pub measure: Measure,
    pub reduction: Reduction,
    pub order: Order,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_n: Option<usize>,
}

impl ChartSpec {
    /// A categorical chart with key ordering picked from the dimension
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        kind: ChartKind,
        key: Dimension,
        measure: Measure,
        reduction: Reduction,
    ) -> Self {
        let order = if key == Dimension::Weekday { Order::Weekday } else { Order::Key };
        Self {
            id: id.into(),
            title: title.into(),
            kind,
            key,
            series: None,
            measure,
            reduction,
            order,
            top_n: None,
        }
    }

    pub fn with_series(mut self, series: Dimension) -> Self {
        self.series = Some(series);
        self
    }

    pub fn with_order(mut self, order: Order) -> Self {
        self.order = order;
        self
    }

    /// Keep the `n` largest values, descending
    pub fn with_top_n(mut self, n: usize) -> Self {
        self.top_n = Some(n);
        self.order = Order::ValueDesc;
        self
    }

    /// Fields that must be present for this chart to be drawn
    pub fn required_fields(&self) -> Vec<Field> {
        let mut fields = vec![self.key.field()];
        if let Some(series) = self.series {
            fields.push(series.field());
        }
        if let Some(field) = self.measure.field() {
            if !fields.contains(&field) {
                fields.push(field);
            }
        }
        fields
    }

    /// Check that kind, reduction and dimensions fit together
    pub fn check(&self) -> Result<(), String> {
        match self.kind {
            ChartKind::Scatter => {
                if self.reduction != Reduction::None {
                    return Err(format!("scatter chart '{}' takes raw values, not {:?}", self.id, self.reduction));
                }
                if !self.key.is_numeric() {
                    return Err(format!("scatter chart '{}' needs a numeric x axis, got {}", self.id, self.key.name()));
                }
            }
            _ if self.reduction == Reduction::None => {
                return Err(format!("{} chart '{}' needs a reduction", self.kind, self.id));
            }
            _ => {}
        }
        if self.series.is_some() && self.kind != ChartKind::Line {
            return Err(format!("only line charts may have a series key ('{}')", self.id));
        }
        if self.top_n == Some(0) {
            return Err(format!("chart '{}' has top(0)", self.id));
        }
        if self.order == Order::Weekday && self.key != Dimension::Weekday {
            return Err(format!("chart '{}' uses weekday order on {}", self.id, self.key.name()));
        }
        Ok(())
    }
}

/// The twelve charts of the sales report, in manifest order
pub fn default_catalog(top_n: usize) -> Vec<ChartSpec> {
    use ChartKind::*;
    use Dimension as D;
    use Measure as M;

    vec![
        ChartSpec::new("subcat_sales", "サブカテゴリ別売上", HorizontalBar, D::Subcategory, M::Revenue, Reduction::Sum)
            .with_order(Order::ValueDesc),
        ChartSpec::new("weekday_sales", "曜日別売上", Bar, D::Weekday, M::Revenue, Reduction::Sum),
        ChartSpec::new("discount_avg_sales", "値引き率ごとの平均売上", Bar, D::DiscountRate, M::Revenue, Reduction::Mean),
        ChartSpec::new("waste_avg_sales", "廃棄率ごとの平均売上", Bar, D::WasteRate, M::Revenue, Reduction::Mean),
        ChartSpec::new("temp_vs_sales", "気温と売上の関係", Scatter, D::Temperature, M::Revenue, Reduction::None),
        ChartSpec::new("top10_sales", format!("売上金額トップ{top_n}商品"), HorizontalBar, D::Product, M::Revenue, Reduction::Sum)
            .with_top_n(top_n),
        ChartSpec::new("top10_discount", format!("値引き率トップ{top_n}商品"), HorizontalBar, D::Product, M::DiscountRate, Reduction::Mean)
            .with_top_n(top_n),
        ChartSpec::new("top10_waste", format!("廃棄率トップ{top_n}商品"), HorizontalBar, D::Product, M::WasteRate, Reduction::Mean)
            .with_top_n(top_n),
        ChartSpec::new("temp_vs_subcat_sales", "気温とサブカテゴリ別売上", Line, D::Temperature, M::Revenue, Reduction::Mean)
            .with_series(D::Subcategory),
        ChartSpec::new("weekday_vs_subcat", "曜日とサブカテゴリの売上傾向", Line, D::Weekday, M::Revenue, Reduction::Mean)
            .with_series(D::Subcategory),
        ChartSpec::new("subcat_pie", "サブカテゴリ別売上構成", Pie, D::Subcategory, M::Revenue, Reduction::Sum),
        ChartSpec::new("weekday_pie", "曜日別売上構成", Pie, D::Weekday, M::Revenue, Reduction::Sum),
    ]
}
