//! Deployment configuration, read from TOML.
//!
//! Every key is optional:
//!
//! ```toml
//! output_dir = "images"
//! url_prefix = "/images"
//! public_base_url = "https://reports.example.com"
//! required_fields = ["subcategory", "weekday", "unit_price", "quantity"]
//! top_n = 10
//!
//! [aliases]
//! temperature = ["最高気温"]
//!
//! [render]
//! width = 800
//! height = 600
//! type = "png"
//! font_family = "Noto Sans CJK JP"
//!
//! [[charts]]
//! id = "qty_by_product"
//! recipe = "barh(sum(quantity) by product) | top(5)"
//! ```

use crate::chart::{default_catalog, ChartSpec, DEFAULT_TOP_N};
use crate::error::{ReportError, Result};
use crate::palette::parse_color;
use crate::recipe::parse_recipe;
use crate::schema::{default_required_fields, ColumnAliases, Field};
use crate::RenderOptions;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// Largest accepted canvas width or height, in pixels
pub const MAX_CANVAS_SIDE: u32 = 8192;

#[derive(Debug, Clone, Deserialize)]
pub struct ReportConfig {
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "default_url_prefix")]
    pub url_prefix: String,
    #[serde(default)]
    pub public_base_url: String,
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
    #[serde(default = "default_required_fields")]
    pub required_fields: Vec<Field>,
    /// Extra accepted headers per field, keyed by snake_case field name
    #[serde(default)]
    pub aliases: HashMap<String, Vec<String>>,
    #[serde(default = "default_top_n")]
    pub top_n: usize,
    #[serde(default)]
    pub render: RenderOptions,
    /// Replaces the default catalog when non-empty
    #[serde(default)]
    pub charts: Vec<CustomChart>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CustomChart {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    pub recipe: String,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("images")
}
fn default_url_prefix() -> String {
    "/images".to_string()
}
fn default_delimiter() -> char {
    ','
}
fn default_top_n() -> usize {
    DEFAULT_TOP_N
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            url_prefix: default_url_prefix(),
            public_base_url: String::new(),
            delimiter: default_delimiter(),
            required_fields: default_required_fields(),
            aliases: HashMap::new(),
            top_n: DEFAULT_TOP_N,
            render: RenderOptions::default(),
            charts: Vec::new(),
        }
    }
}

impl ReportConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).map_err(|e| ReportError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ReportError::Config(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        if self.top_n == 0 {
            return Err(ReportError::Config("top_n must be at least 1".to_string()));
        }
        if !self.delimiter.is_ascii() {
            return Err(ReportError::Config(format!("delimiter '{}' is not ASCII", self.delimiter)));
        }
        if self.render.width == 0 || self.render.height == 0 {
            return Err(ReportError::Config("render width and height must be positive".to_string()));
        }
        if self.render.width > MAX_CANVAS_SIDE || self.render.height > MAX_CANVAS_SIDE {
            return Err(ReportError::Config(format!(
                "render width and height must not exceed {}",
                MAX_CANVAS_SIDE
            )));
        }
        if let Some(color) = &self.render.bar_color {
            if parse_color(color).is_none() {
                return Err(ReportError::Config(format!("unrecognised bar_color '{}'", color)));
            }
        }
        self.column_aliases()?;

        let mut seen = HashSet::new();
        for chart in &self.charts {
            let valid_id = !chart.id.is_empty()
                && chart.id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
            if !valid_id {
                return Err(ReportError::Config(format!(
                    "chart id '{}' may only contain ASCII letters, digits, '_' and '-'",
                    chart.id
                )));
            }
            if !seen.insert(chart.id.as_str()) {
                return Err(ReportError::Config(format!("duplicate chart id '{}'", chart.id)));
            }
        }
        Ok(())
    }

    pub fn delimiter_byte(&self) -> u8 {
        // validate() guarantees ASCII
        self.delimiter as u8
    }

    pub fn column_aliases(&self) -> Result<ColumnAliases> {
        let mut extra = HashMap::new();
        for (name, headers) in &self.aliases {
            let field: Field = name.parse().map_err(ReportError::Config)?;
            extra.insert(field, headers.clone());
        }
        Ok(ColumnAliases::new(extra))
    }

    /// Chart specs for this deployment, in manifest order
    pub fn catalog(&self) -> Result<Vec<ChartSpec>> {
        if self.charts.is_empty() {
            return Ok(default_catalog(self.top_n));
        }
        self.charts
            .iter()
            .map(|chart| {
                let mut spec = parse_recipe(&chart.id, &chart.recipe)
                    .map_err(|e| ReportError::Config(format!("chart '{}': {}", chart.id, e)))?;
                if let Some(title) = &chart.title {
                    spec.title = title.clone();
                }
                Ok(spec)
            })
            .collect()
    }
}
