//! Aggregation of sales records into chart-ready data.

use crate::chart::{ChartKind, ChartSpec, Dimension, Order, Reduction};
use crate::derive::{Record, SalesFrame, Weekday};
use crate::manifest::SkipReason;
use crate::table::format_number;
use std::cmp::Ordering;
use std::collections::HashMap;

/// Aggregated data for one chart
#[derive(Debug, Clone, PartialEq)]
pub enum ChartData {
    /// Ordered (category, value) pairs for bar and pie charts
    Categories(Vec<(String, f64)>),
    /// Raw (x, y) pairs for scatter plots
    Points(Vec<(f64, f64)>),
    /// One value per x label for each named series
    Series {
        x_labels: Vec<String>,
        series: Vec<(String, Vec<Option<f64>>)>,
    },
}

impl ChartData {
    /// Number of categories, points, or x positions
    pub fn len(&self) -> usize {
        match self {
            ChartData::Categories(c) => c.len(),
            ChartData::Points(p) => p.len(),
            ChartData::Series { x_labels, .. } => x_labels.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Key {
    Day(Weekday),
    Label(String),
}

impl Key {
    fn label(&self) -> String {
        match self {
            Key::Day(day) => day.label().to_string(),
            Key::Label(s) => s.clone(),
        }
    }
}

fn key_of(dimension: Dimension, record: &Record) -> Option<Key> {
    match dimension {
        Dimension::Product => record.product.clone().map(Key::Label),
        Dimension::Subcategory => record.subcategory.clone().map(Key::Label),
        Dimension::Weekday => record.weekday.map(Key::Day),
        Dimension::DiscountRate | Dimension::WasteRate | Dimension::Temperature => dimension
            .numeric_value(record)
            .map(|n| Key::Label(format_number(n))),
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Acc {
    sum: f64,
    count: usize,
}

impl Acc {
    fn push(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    fn reduce(&self, reduction: Reduction) -> Option<f64> {
        match reduction {
            Reduction::Sum => Some(self.sum),
            Reduction::Count => Some(self.count as f64),
            Reduction::Mean if self.count > 0 => Some(self.sum / self.count as f64),
            Reduction::Mean | Reduction::None => None,
        }
    }
}

/// Groups in first-seen order
#[derive(Debug, Default)]
struct Groups {
    keys: Vec<Key>,
    accs: Vec<Acc>,
    index: HashMap<String, usize>,
}

impl Groups {
    fn entry(&mut self, key: Key) -> &mut Acc {
        let label = key.label();
        let idx = match self.index.get(&label) {
            Some(&idx) => idx,
            None => {
                self.keys.push(key);
                self.accs.push(Acc::default());
                self.index.insert(label, self.keys.len() - 1);
                self.keys.len() - 1
            }
        };
        &mut self.accs[idx]
    }

    /// Add zero-valued entries for days that never occurred
    fn fill_weekdays(&mut self) {
        for day in Weekday::ALL {
            self.entry(Key::Day(day));
        }
    }
}

/// Aggregate a frame for one chart, or explain why the chart is skipped
pub fn aggregate(frame: &SalesFrame, spec: &ChartSpec) -> Result<ChartData, SkipReason> {
    check_columns(frame, spec)?;

    let data = match (spec.kind, spec.series) {
        (ChartKind::Scatter, _) => scatter_points(frame, spec),
        (ChartKind::Line, Some(series)) => series_data(frame, spec, series),
        _ => categories(frame, spec),
    };

    if data.is_empty() {
        return Err(SkipReason::NoData);
    }
    if let ChartData::Categories(pairs) = &data {
        if pairs.iter().all(|(_, v)| *v == 0.0) {
            return Err(SkipReason::AllZero);
        }
    }
    Ok(data)
}

fn check_columns(frame: &SalesFrame, spec: &ChartSpec) -> Result<(), SkipReason> {
    if spec.measure.field().is_none() && !frame.has_revenue() {
        return Err(SkipReason::MissingColumn("revenue".to_string()));
    }
    for field in spec.required_fields() {
        if !frame.has(field) {
            return Err(SkipReason::MissingColumn(field.primary_header().to_string()));
        }
    }
    Ok(())
}

fn categories(frame: &SalesFrame, spec: &ChartSpec) -> ChartData {
    let mut groups = Groups::default();
    for record in &frame.records {
        let (Some(key), Some(value)) = (key_of(spec.key, record), spec.measure.value(record)) else {
            continue;
        };
        groups.entry(key).push(value);
    }

    let fills_days = spec.order == Order::Weekday
        && matches!(spec.reduction, Reduction::Sum | Reduction::Count)
        && !groups.keys.is_empty();
    if fills_days {
        groups.fill_weekdays();
    }

    let mut pairs: Vec<(Key, f64)> = groups
        .keys
        .into_iter()
        .zip(groups.accs)
        .filter_map(|(key, acc)| acc.reduce(spec.reduction).map(|v| (key, v)))
        .collect();

    order_pairs(&mut pairs, spec.order);
    if let Some(n) = spec.top_n {
        pairs.truncate(n);
    }

    ChartData::Categories(pairs.into_iter().map(|(k, v)| (k.label(), v)).collect())
}

fn scatter_points(frame: &SalesFrame, spec: &ChartSpec) -> ChartData {
    let points = frame
        .records
        .iter()
        .filter_map(|r| Some((spec.key.numeric_value(r)?, spec.measure.value(r)?)))
        .collect();
    ChartData::Points(points)
}

fn series_data(frame: &SalesFrame, spec: &ChartSpec, series_dim: Dimension) -> ChartData {
    let mut x_groups = Groups::default();
    let mut cells: HashMap<(String, String), Acc> = HashMap::new();
    let mut series_names: Vec<String> = Vec::new();

    for record in &frame.records {
        let (Some(x), Some(s), Some(value)) = (
            key_of(spec.key, record),
            key_of(series_dim, record),
            spec.measure.value(record),
        ) else {
            continue;
        };
        let x_label = x.label();
        let s_label = s.label();
        x_groups.entry(x).push(value);
        if !series_names.contains(&s_label) {
            series_names.push(s_label.clone());
        }
        cells.entry((x_label, s_label)).or_default().push(value);
    }

    if series_names.is_empty() {
        return ChartData::Series {
            x_labels: Vec::new(),
            series: Vec::new(),
        };
    }
    if spec.order == Order::Weekday {
        x_groups.fill_weekdays();
    }

    // Series order follows their labels, as pandas unstack does
    series_names.sort();

    let mut xs: Vec<(Key, f64)> = x_groups
        .keys
        .into_iter()
        .zip(x_groups.accs)
        .map(|(key, acc)| (key, acc.sum))
        .collect();
    order_pairs(&mut xs, spec.order);
    if let Some(n) = spec.top_n {
        xs.truncate(n);
    }
    let x_labels: Vec<String> = xs.into_iter().map(|(k, _)| k.label()).collect();

    let series = series_names
        .into_iter()
        .map(|name| {
            let values = x_labels
                .iter()
                .map(|x| {
                    cells
                        .get(&(x.clone(), name.clone()))
                        .and_then(|acc| acc.reduce(spec.reduction))
                })
                .collect();
            (name, values)
        })
        .collect();

    ChartData::Series { x_labels, series }
}

fn order_pairs(pairs: &mut [(Key, f64)], order: Order) {
    match order {
        Order::Key | Order::Weekday => sort_by_key(pairs),
        Order::ValueAsc => pairs.sort_by(|a, b| a.1.total_cmp(&b.1)),
        Order::ValueDesc => pairs.sort_by(|a, b| b.1.total_cmp(&a.1)),
    }
}

/// Days by index, numeric labels numerically, anything else lexicographically
fn sort_by_key(pairs: &mut [(Key, f64)]) {
    let all_numeric = pairs.iter().all(|(k, _)| match k {
        Key::Label(s) => s.parse::<f64>().is_ok(),
        Key::Day(_) => false,
    });

    pairs.sort_by(|(a, _), (b, _)| match (a, b) {
        (Key::Day(x), Key::Day(y)) => x.cmp(y),
        (Key::Label(x), Key::Label(y)) if all_numeric => {
            let fx = x.parse::<f64>().unwrap_or(f64::NAN);
            let fy = y.parse::<f64>().unwrap_or(f64::NAN);
            fx.partial_cmp(&fy).unwrap_or(Ordering::Equal)
        }
        (Key::Label(x), Key::Label(y)) => x.cmp(y),
        (Key::Day(_), Key::Label(_)) => Ordering::Less,
        (Key::Label(_), Key::Day(_)) => Ordering::Greater,
    });
}
