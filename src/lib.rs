// Library exports for salesgraph

pub mod aggregate;
pub mod chart;
pub mod config;
pub mod derive;
pub mod error;
pub mod manifest;
pub mod palette;
pub mod pipeline;
pub mod recipe;
pub mod render;
pub mod schema;
pub mod table;

pub use config::ReportConfig;
pub use error::ReportError;
pub use manifest::{ChartOutcome, Manifest, SkipReason};
pub use pipeline::ReportPipeline;

use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
pub enum OutputFormat {
    #[serde(rename = "png")]
    #[default]
    Png,
    #[serde(rename = "svg")]
    Svg,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Svg => "svg",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RenderOptions {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default, rename = "type")]
    pub format: OutputFormat,
    /// Needs CJK glyphs for Japanese labels
    #[serde(default = "default_font_family")]
    pub font_family: String,
    #[serde(default)]
    pub bar_color: Option<String>,
}

fn default_width() -> u32 { 800 }
fn default_height() -> u32 { 600 }
fn default_font_family() -> String { "sans-serif".to_string() }

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            format: OutputFormat::Png,
            font_family: default_font_family(),
            bar_color: None,
        }
    }
}
