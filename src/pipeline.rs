//! Request-scoped report generation.
//!
//! Each call owns its table and writes under a fresh request directory, so
//! concurrent requests share nothing but the configuration.

use crate::aggregate::aggregate;
use crate::chart::ChartSpec;
use crate::config::ReportConfig;
use crate::derive::{derive_records, SalesFrame};
use crate::error::{ReportError, Result};
use crate::manifest::{ChartOutcome, Manifest, SkipReason};
use crate::render::render_chart;
use crate::schema::{validate, ColumnAliases};
use crate::table::Table;
use std::path::PathBuf;
use tracing::{debug, info, info_span, warn};
use uuid::Uuid;

pub struct ReportPipeline {
    config: ReportConfig,
    catalog: Vec<ChartSpec>,
    aliases: ColumnAliases,
}

impl ReportPipeline {
    pub fn new(config: ReportConfig) -> Result<Self> {
        config.validate()?;
        let catalog = config.catalog()?;
        let aliases = config.column_aliases()?;
        Ok(Self {
            config,
            catalog,
            aliases,
        })
    }

    pub fn config(&self) -> &ReportConfig {
        &self.config
    }

    pub fn catalog(&self) -> &[ChartSpec] {
        &self.catalog
    }

    pub fn find_chart(&self, id: &str) -> Option<&ChartSpec> {
        self.catalog.iter().find(|c| c.id == id)
    }

    pub fn load(&self, bytes: &[u8]) -> Result<Table> {
        Table::from_csv_bytes(bytes, self.config.delimiter_byte())
    }

    /// Validate required columns and derive typed records
    pub fn prepare(&self, table: &Table) -> Result<SalesFrame> {
        let columns = validate(table, &self.config.required_fields, &self.aliases)?;
        derive_records(table, &columns)
    }

    /// Full report for raw CSV bytes
    pub fn generate(&self, bytes: &[u8]) -> Result<Manifest> {
        let table = self.load(bytes)?;
        self.generate_from_table(&table)
    }

    /// Full report for an already parsed table
    pub fn generate_from_table(&self, table: &Table) -> Result<Manifest> {
        let request_id = Uuid::new_v4();
        let span = info_span!("report", %request_id);
        let _guard = span.enter();

        let frame = self.prepare(table)?;
        info!(rows = frame.len(), charts = self.catalog.len(), "generating report");

        let request_dir = self.config.output_dir.join(request_id.to_string());
        let mut outcomes = Vec::with_capacity(self.catalog.len());
        for spec in &self.catalog {
            let outcome = self.process_chart(&frame, spec, request_id, &request_dir)?;
            outcomes.push(outcome);
        }

        let manifest = Manifest::from_outcomes(request_id, outcomes);
        info!(
            rendered = manifest.charts.len(),
            skipped = manifest.skipped.len(),
            "report finished"
        );
        Ok(manifest)
    }

    /// Aggregate, draw and store one chart. Only storage failures are errors.
    fn process_chart(
        &self,
        frame: &SalesFrame,
        spec: &ChartSpec,
        request_id: Uuid,
        request_dir: &std::path::Path,
    ) -> Result<ChartOutcome> {
        let skipped = |reason: SkipReason| {
            warn!(chart = %spec.id, %reason, "chart skipped");
            ChartOutcome::Skipped {
                id: spec.id.clone(),
                title: spec.title.clone(),
                reason,
            }
        };

        let data = match aggregate(frame, spec) {
            Ok(data) => data,
            Err(reason) => return Ok(skipped(reason)),
        };
        debug!(chart = %spec.id, entries = data.len(), "aggregated");

        let bytes = match render_chart(spec, &data, &self.config.render) {
            Ok(bytes) => bytes,
            Err(e) => return Ok(skipped(SkipReason::RenderFailed(format!("{e:#}")))),
        };

        let file_name = format!("{}.{}", spec.id, self.config.render.format.extension());
        std::fs::create_dir_all(request_dir)?;
        let path: PathBuf = request_dir.join(&file_name);
        std::fs::write(&path, &bytes)?;

        Ok(ChartOutcome::Rendered {
            id: spec.id.clone(),
            title: spec.title.clone(),
            url: self.chart_url(request_id, &file_name),
            path,
        })
    }

    fn chart_url(&self, request_id: Uuid, file_name: &str) -> String {
        format!(
            "{}{}/{}/{}",
            self.config.public_base_url.trim_end_matches('/'),
            self.config.url_prefix.trim_end_matches('/'),
            request_id,
            file_name
        )
    }

    /// Single-chart mode: image bytes for one spec, nothing written to disk
    pub fn render_single(&self, table: &Table, spec: &ChartSpec) -> Result<Vec<u8>> {
        let frame = self.prepare(table)?;
        let data = aggregate(&frame, spec).map_err(|reason| ReportError::ChartUnavailable {
            id: spec.id.clone(),
            reason: reason.to_string(),
        })?;
        render_chart(spec, &data, &self.config.render).map_err(|e| ReportError::Render(format!("{e:#}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::{ChartKind, Dimension, Measure, Reduction};

    fn pipeline_in(dir: &std::path::Path) -> ReportPipeline {
        let config = ReportConfig {
            output_dir: dir.to_path_buf(),
            ..ReportConfig::default()
        };
        ReportPipeline::new(config).unwrap()
    }

    #[test]
    fn test_chart_url() {
        let config = ReportConfig {
            public_base_url: "https://graph.example.com/".to_string(),
            ..ReportConfig::default()
        };
        let pipeline = ReportPipeline::new(config).unwrap();
        let url = pipeline.chart_url(Uuid::nil(), "a.png");
        assert_eq!(
            url,
            "https://graph.example.com/images/00000000-0000-0000-0000-000000000000/a.png"
        );
    }

    #[test]
    fn test_schema_error_before_any_output() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline_in(dir.path());
        let err = pipeline.generate("曜日,単価,数量\n月曜日,1,1\n".as_bytes()).unwrap_err();
        assert_eq!(err.status_code(), 400);
        assert!(err.to_string().contains("サブカテゴリ"));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_no_data_rows_skips_everything() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline_in(dir.path());
        let manifest = pipeline.generate("サブカテゴリ,曜日,単価,数量\n".as_bytes()).unwrap();
        assert!(manifest.charts.is_empty());
        assert_eq!(manifest.skipped.len(), 12);
    }

    #[test]
    fn test_render_single_unavailable_chart() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline_in(dir.path());
        let table = pipeline.load("サブカテゴリ,曜日,単価,数量\nX,月曜日,1,1\n".as_bytes()).unwrap();
        let spec = ChartSpec::new("t", "t", ChartKind::Bar, Dimension::Temperature, Measure::Revenue, Reduction::Mean);
        let err = pipeline.render_single(&table, &spec).unwrap_err();
        assert!(matches!(err, ReportError::ChartUnavailable { .. }));
        assert!(err.to_string().contains("気温"));
    }
}
