use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use salesgraph::recipe::parse_recipe;
use salesgraph::table::Table;
use salesgraph::{ReportConfig, ReportError, ReportPipeline};
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "salesgraph")]
#[command(about = "Generate sales report charts from tabular data", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render the whole catalog and print the manifest as JSON
    Generate {
        #[command(flatten)]
        input: InputArgs,

        /// Overrides `output_dir` from the configuration
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Render one chart and write the image to stdout
    Chart {
        /// Catalog id (e.g. 'weekday_sales') or a recipe (e.g. 'bar(sum(revenue) by product)')
        chart: String,

        #[command(flatten)]
        input: InputArgs,
    },
    /// List the configured charts
    Catalog,
}

#[derive(Args, Debug)]
struct InputArgs {
    /// Input table; stdin when omitted
    #[arg(long)]
    input: Option<PathBuf>,

    /// Input is a JSON array of row objects instead of delimited text
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            let client = e
                .downcast_ref::<ReportError>()
                .is_some_and(ReportError::is_client_error);
            if client {
                ExitCode::from(2)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => ReportConfig::from_path(path)?,
        None => ReportConfig::default(),
    };

    match cli.command {
        Command::Generate { input, output_dir } => {
            if let Some(dir) = output_dir {
                config.output_dir = dir;
            }
            let pipeline = ReportPipeline::new(config)?;
            let table = read_table(&pipeline, &input)?;
            let manifest = pipeline.generate_from_table(&table)?;
            let json = manifest.to_json().context("Failed to serialize manifest")?;
            write_stdout(format!("{}\n", json).as_bytes())
        }
        Command::Chart { chart, input } => {
            let pipeline = ReportPipeline::new(config)?;
            let spec = if chart.contains('(') {
                parse_recipe("custom", &chart).map_err(ReportError::from)?
            } else {
                pipeline
                    .find_chart(&chart)
                    .cloned()
                    .ok_or_else(|| ReportError::ChartUnavailable {
                        id: chart.clone(),
                        reason: "no such chart in the catalog".to_string(),
                    })?
            };
            let table = read_table(&pipeline, &input)?;
            let bytes = pipeline.render_single(&table, &spec)?;
            write_stdout(&bytes)
        }
        Command::Catalog => {
            let pipeline = ReportPipeline::new(config)?;
            let json = serde_json::to_string_pretty(pipeline.catalog()).context("Failed to serialize catalog")?;
            write_stdout(format!("{}\n", json).as_bytes())
        }
    }
}

fn read_table(pipeline: &ReportPipeline, args: &InputArgs) -> Result<Table> {
    let bytes = match &args.input {
        Some(path) => std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?,
        None => {
            let mut buf = Vec::new();
            io::stdin()
                .read_to_end(&mut buf)
                .context("Failed to read table from stdin")?;
            buf
        }
    };

    let table = if args.json {
        let value: serde_json::Value =
            serde_json::from_slice(&bytes).map_err(|e| ReportError::Parse(e.to_string()))?;
        Table::from_json(&value)?
    } else {
        pipeline.load(&bytes)?
    };
    Ok(table)
}

fn write_stdout(bytes: &[u8]) -> Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    handle.write_all(bytes).context("Failed to write to stdout")?;
    handle.flush().context("Failed to flush stdout")?;
    Ok(())
}
