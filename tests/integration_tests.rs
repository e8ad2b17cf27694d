use pretty_assertions::assert_eq;
use salesgraph::aggregate::{aggregate, ChartData};
use salesgraph::chart::{default_catalog, DEFAULT_TOP_N};
use salesgraph::{ReportConfig, ReportPipeline, SkipReason};
use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

const WEEK: [&str; 7] = ["月曜日", "火曜日", "水曜日", "木曜日", "金曜日", "土曜日", "日曜日"];

fn pipeline_in(dir: &Path) -> ReportPipeline {
    let config = ReportConfig {
        output_dir: dir.to_path_buf(),
        ..ReportConfig::default()
    };
    ReportPipeline::new(config).expect("default config is valid")
}

fn fixture(name: &str) -> Vec<u8> {
    fs::read(format!("test/{}", name)).expect("Failed to read test CSV")
}

fn categories(pipeline: &ReportPipeline, csv: &[u8], chart_id: &str) -> Vec<(String, f64)> {
    let table = pipeline.load(csv).unwrap();
    let frame = pipeline.prepare(&table).unwrap();
    let spec = pipeline.find_chart(chart_id).unwrap();
    match aggregate(&frame, spec).unwrap() {
        ChartData::Categories(pairs) => pairs,
        other => panic!("expected categories, got {:?}", other),
    }
}

/// Helper function to run salesgraph with stdin input
fn run_salesgraph(args: &[&str], stdin: &[u8]) -> (i32, Vec<u8>, String) {
    let mut child = Command::new(env!("CARGO_BIN_EXE_salesgraph"))
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to spawn process");

    if let Some(mut handle) = child.stdin.take() {
        handle.write_all(stdin).expect("Failed to write to stdin");
    }

    let output = child.wait_with_output().expect("Failed to wait for process");
    (
        output.status.code().unwrap_or(-1),
        output.stdout,
        String::from_utf8_lossy(&output.stderr).to_string(),
    )
}

/// Check if bytes are a valid PNG
fn is_valid_png(bytes: &[u8]) -> bool {
    bytes.len() > 8 && bytes[0..8] == [137, 80, 78, 71, 13, 10, 26, 10]
}

#[test]
fn test_end_to_end_full_report() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = pipeline_in(dir.path());
    let manifest = pipeline.generate(&fixture("sales_week.csv")).unwrap();

    assert_eq!(manifest.charts.len(), 12, "skipped: {:?}", manifest.skipped);
    assert!(manifest.skipped.is_empty());

    let expected: Vec<String> = default_catalog(DEFAULT_TOP_N).into_iter().map(|c| c.title).collect();
    assert_eq!(manifest.titles(), expected.iter().map(String::as_str).collect::<Vec<_>>());

    let request = manifest.request_id.to_string();
    for entry in &manifest.charts {
        assert!(entry.url.starts_with(&format!("/images/{}/", request)), "{}", entry.url);
        assert!(entry.url.ends_with(".png"));
        assert!(entry.path.starts_with(dir.path().join(&request)));
        let bytes = fs::read(&entry.path).unwrap();
        assert!(is_valid_png(&bytes), "{} is not a valid PNG", entry.path.display());
    }
}

#[test]
fn test_missing_required_column_is_client_error() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = pipeline_in(dir.path());
    let err = pipeline.generate(&fixture("missing_price.csv")).unwrap_err();
    assert_eq!(err.status_code(), 400);
    assert!(err.to_string().contains("単価"), "{}", err);
    assert!(!err.to_string().contains("数量"));
}

#[test]
fn test_revenue_is_price_times_quantity() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = pipeline_in(dir.path());
    let table = pipeline.load(&fixture("sales_week.csv")).unwrap();
    let frame = pipeline.prepare(&table).unwrap();
    assert_eq!(frame.len(), 14);
    for record in &frame.records {
        let expected = record.unit_price.unwrap() * record.quantity.unwrap();
        assert_eq!(record.revenue, expected);
    }
}

#[test]
fn test_two_row_example_sums() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = pipeline_in(dir.path());
    let csv = fixture("two_rows.csv");

    let by_subcategory = categories(&pipeline, &csv, "subcat_sales");
    assert_eq!(
        by_subcategory,
        vec![("SubcatX".to_string(), 200.0), ("SubcatY".to_string(), 200.0)]
    );

    let by_weekday = categories(&pipeline, &csv, "weekday_sales");
    let expected: Vec<(String, f64)> = WEEK
        .iter()
        .enumerate()
        .map(|(i, day)| (day.to_string(), if i < 2 { 200.0 } else { 0.0 }))
        .collect();
    assert_eq!(by_weekday, expected);
}

#[test]
fn test_weekday_order_is_calendar_order() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = pipeline_in(dir.path());
    // Fixture starts on Sunday and covers every day
    let labels: Vec<String> = categories(&pipeline, &fixture("sales_week.csv"), "weekday_sales")
        .into_iter()
        .map(|(label, _)| label)
        .collect();
    assert_eq!(labels, WEEK.to_vec());
}

#[test]
fn test_top_n_charts_are_truncated_descending() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = pipeline_in(dir.path());
    let csv = fixture("many_products.csv");

    for id in ["top10_sales", "top10_discount", "top10_waste"] {
        let pairs = categories(&pipeline, &csv, id);
        assert!(pairs.len() <= 10, "{} returned {} entries", id, pairs.len());
        assert!(pairs.windows(2).all(|w| w[0].1 >= w[1].1), "{} not descending", id);
    }

    let top_sales = categories(&pipeline, &csv, "top10_sales");
    assert_eq!(top_sales.len(), 10);
    assert_eq!(top_sales[0], ("P13".to_string(), 130.0));
}

#[test]
fn test_empty_grouping_column_skips_only_its_charts() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = pipeline_in(dir.path());
    let manifest = pipeline.generate(&fixture("empty_temperature.csv")).unwrap();

    let no_data: HashSet<&str> = manifest
        .skipped
        .iter()
        .filter(|s| s.reason == SkipReason::NoData)
        .map(|s| s.id.as_str())
        .collect();
    assert_eq!(
        no_data,
        HashSet::from(["temp_vs_sales", "temp_vs_subcat_sales"])
    );

    // Discount and waste columns are absent, so their charts are skipped too
    for entry in &manifest.skipped {
        if entry.reason != SkipReason::NoData {
            assert!(matches!(entry.reason, SkipReason::MissingColumn(_)), "{:?}", entry);
        }
    }

    let rendered = manifest.titles();
    assert!(rendered.contains(&"サブカテゴリ別売上"));
    assert!(rendered.contains(&"曜日別売上"));
    assert_eq!(manifest.charts.len() + manifest.skipped.len(), 12);
}

#[test]
fn test_two_runs_write_disjoint_paths() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = pipeline_in(dir.path());
    let csv = fixture("two_rows.csv");

    let first = pipeline.generate(&csv).unwrap();
    let second = pipeline.generate(&csv).unwrap();
    assert_ne!(first.request_id, second.request_id);

    let first_paths: HashSet<_> = first.charts.iter().map(|c| c.path.clone()).collect();
    assert!(!first.charts.is_empty());
    assert!(second.charts.iter().all(|c| !first_paths.contains(&c.path)));
    assert!(first.charts.iter().all(|c| c.path.exists()));
}

#[test]
fn test_svg_output_from_config() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = ReportConfig::from_toml_str("[render]\ntype = \"svg\"").unwrap();
    config.output_dir = dir.path().to_path_buf();
    let pipeline = ReportPipeline::new(config).unwrap();

    let manifest = pipeline.generate(&fixture("two_rows.csv")).unwrap();
    let entry = &manifest.charts[0];
    assert!(entry.url.ends_with(".svg"));
    let text = fs::read_to_string(&entry.path).unwrap();
    assert!(text.contains("<svg"));
}

#[test]
fn test_cli_generate_prints_manifest() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().to_str().unwrap();
    let (code, stdout, stderr) = run_salesgraph(&["generate", "--output-dir", out], &fixture("sales_week.csv"));
    assert_eq!(code, 0, "stderr: {}", stderr);

    let manifest: serde_json::Value = serde_json::from_slice(&stdout).unwrap();
    assert_eq!(manifest["charts"].as_array().unwrap().len(), 12);
    assert_eq!(manifest["charts"][0]["title"], "サブカテゴリ別売上");
}

#[test]
fn test_cli_generate_missing_column_exits_with_client_error() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().to_str().unwrap();
    let (code, stdout, stderr) = run_salesgraph(&["generate", "--output-dir", out], &fixture("missing_price.csv"));
    assert_eq!(code, 2);
    assert!(stdout.is_empty());
    assert!(stderr.contains("単価"), "stderr: {}", stderr);
}

#[test]
fn test_cli_chart_by_id() {
    let (code, stdout, stderr) = run_salesgraph(&["chart", "weekday_pie"], &fixture("sales_week.csv"));
    assert_eq!(code, 0, "stderr: {}", stderr);
    assert!(is_valid_png(&stdout));
}

#[test]
fn test_cli_chart_by_recipe() {
    let (code, stdout, stderr) = run_salesgraph(
        &["chart", "bar(mean(quantity) by subcategory) | order(desc)"],
        &fixture("sales_week.csv"),
    );
    assert_eq!(code, 0, "stderr: {}", stderr);
    assert!(is_valid_png(&stdout));
}

#[test]
fn test_cli_chart_bad_recipe() {
    let (code, _, stderr) = run_salesgraph(&["chart", "bar(sum(profit) by product)"], &fixture("two_rows.csv"));
    assert_eq!(code, 2);
    assert!(stderr.contains("profit"), "stderr: {}", stderr);
}

#[test]
fn test_cli_chart_unavailable() {
    let (code, _, stderr) = run_salesgraph(&["chart", "temp_vs_sales"], &fixture("two_rows.csv"));
    assert_eq!(code, 2);
    assert!(stderr.contains("temp_vs_sales"), "stderr: {}", stderr);
}

#[test]
fn test_cli_json_input() {
    let json = r#"[
        {"product": "ProductA", "subcategory": "SubcatX", "weekday": "Monday", "unit_price": 100, "quantity": 2},
        {"product": "ProductB", "subcategory": "SubcatY", "weekday": "Tuesday", "unit_price": 50, "quantity": 4}
    ]"#;
    let (code, stdout, stderr) = run_salesgraph(&["chart", "subcat_pie", "--json"], json.as_bytes());
    assert_eq!(code, 0, "stderr: {}", stderr);
    assert!(is_valid_png(&stdout));
}

#[test]
fn test_cli_catalog() {
    let (code, stdout, _) = run_salesgraph(&["catalog"], b"");
    assert_eq!(code, 0);
    let catalog: serde_json::Value = serde_json::from_slice(&stdout).unwrap();
    let ids: Vec<&str> = catalog
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids.len(), 12);
    assert_eq!(ids[0], "subcat_sales");
    assert_eq!(ids[11], "weekday_pie");
}
