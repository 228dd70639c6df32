use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use dimple_qc::{
    export::{write_table, write_table_file},
    hypothesis::TestResultRow,
    metric::{Metric, MetricInfo, metric_catalog},
    reference::{Reference, ReferenceFeature},
    selection::{PositionRange, SelectionCriteria},
    session::{QcReport, QcSession, QcSettings},
    summary::SummaryTable,
};
use serde::Serialize;
use std::{collections::BTreeMap, path::PathBuf};

/// Per-base quality control for mutagenesis amplicon libraries
#[derive(Parser, Debug)]
#[command(name = "dimple_qc", version)]
struct Cli {
    /// Settings JSON (noise_floor, significance_level, reverse_complement)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write the enriched per-base table as TSV
    Table {
        #[command(flatten)]
        input: InputArgs,

        /// Output file, stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Only the columns shown in the dashboard table
        #[arg(long)]
        tabular: bool,
    },

    /// Print mean and std per partition
    Summary {
        #[command(flatten)]
        input: InputArgs,

        /// Summarize all positions together instead of per partition
        #[arg(long)]
        whole: bool,
    },

    /// Compare selected and unselected positions metric by metric
    Test {
        #[command(flatten)]
        input: InputArgs,
    },

    /// Print headlines, summaries and tests together
    Report {
        #[command(flatten)]
        input: InputArgs,
    },

    /// List the selectable features of a reference
    Features {
        /// Reference FASTA or GenBank file
        #[arg(short, long)]
        reference: PathBuf,
    },

    /// List the metric columns with display names and descriptions
    Metrics,
}

#[derive(Args, Debug)]
struct InputArgs {
    /// Per-base TSV file
    #[arg(short, long)]
    per_base: PathBuf,

    /// Reference FASTA or GenBank file
    #[arg(short, long)]
    reference: Option<PathBuf>,

    /// First selected position
    #[arg(long)]
    low: Option<u64>,

    /// Position after the last selected one
    #[arg(long)]
    high: Option<u64>,

    /// Select the reference feature with this label (repeatable)
    #[arg(short, long = "feature")]
    features: Vec<String>,

    /// Treat the per-base file as the reverse strand of the reference
    #[arg(long)]
    reverse_complement: bool,
}

impl InputArgs {
    fn selection(&self) -> SelectionCriteria {
        let range = match (self.low, self.high) {
            (None, None) => None,
            (low, high) => Some(PositionRange::new(
                low.unwrap_or(0),
                high.unwrap_or(u64::MAX),
            )),
        };
        SelectionCriteria {
            range,
            features: self.features.clone(),
        }
    }
}

#[derive(Serialize)]
struct ReportOutput<'a> {
    sequence_length: u64,
    selected_positions: usize,
    subpool_codon_fraction: f64,
    headlines: BTreeMap<String, String>,
    split_summary: &'a SummaryTable,
    whole_summary: &'a SummaryTable,
    tests: &'a [TestResultRow],
}

impl<'a> ReportOutput<'a> {
    fn new(report: &'a QcReport) -> Self {
        let headlines = [
            (Metric::ReadsAll, 0),
            (Metric::EffectiveEntropy, 2),
            (Metric::VariantFraction, 2),
        ]
        .into_iter()
        .map(|(metric, decimals)| {
            (
                format!("Average {}", metric.display_name()),
                report.headline(metric, decimals),
            )
        })
        .collect();
        Self {
            sequence_length: report.table.sequence_length(),
            selected_positions: report.table.selected_count(),
            subpool_codon_fraction: report.table.subpool_codon_fraction(),
            headlines,
            split_summary: &report.split_summary,
            whole_summary: &report.whole_summary,
            tests: &report.tests,
        }
    }
}

#[derive(Serialize)]
struct FeatureSummary<'a> {
    selectable: Vec<String>,
    features: &'a [ReferenceFeature],
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let text =
        serde_json::to_string_pretty(value).context("Could not serialize JSON output")?;
    println!("{text}");
    Ok(())
}

fn load_settings(cli: &Cli) -> Result<QcSettings> {
    match &cli.config {
        Some(path) => {
            let path = path.to_string_lossy();
            QcSettings::load_from_path(&path).with_context(|| format!("Loading settings '{path}'"))
        }
        None => Ok(QcSettings::default()),
    }
}

fn run_session(settings: QcSettings, input: &InputArgs) -> Result<QcSession> {
    let mut settings = settings;
    settings.reverse_complement |= input.reverse_complement;

    let mut session = QcSession::new(settings);
    session
        .load_per_base(&input.per_base)
        .with_context(|| format!("Reading per-base file '{}'", input.per_base.display()))?;
    if let Some(reference) = &input.reference {
        session.load_reference(reference);
        if session.reference().is_none() {
            log::warn!("continuing without reference");
        }
    }
    session.set_selection(input.selection());
    Ok(session)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let settings = load_settings(&cli)?;

    match &cli.command {
        Commands::Table {
            input,
            output,
            tabular,
        } => {
            let session = run_session(settings, input)?;
            let table = &session.report().table;
            match output {
                Some(path) => {
                    write_table_file(table, path, *tabular)
                        .with_context(|| format!("Writing table '{}'", path.display()))?;
                    log::info!("wrote {} positions to '{}'", table.len(), path.display());
                }
                None => write_table(table, std::io::stdout().lock(), *tabular)?,
            }
            Ok(())
        }
        Commands::Summary { input, whole } => {
            let session = run_session(settings, input)?;
            let report = session.report();
            if *whole {
                print_json(&report.whole_summary)
            } else {
                print_json(&report.split_summary)
            }
        }
        Commands::Test { input } => {
            let session = run_session(settings, input)?;
            print_json(&session.report().tests)
        }
        Commands::Report { input } => {
            let session = run_session(settings, input)?;
            print_json(&ReportOutput::new(session.report()))
        }
        Commands::Features { reference } => {
            let reference = Reference::from_path(reference)
                .with_context(|| format!("Loading reference '{}'", reference.display()))?;
            print_json(&FeatureSummary {
                selectable: reference.selectable_feature_names(),
                features: reference.features(),
            })
        }
        Commands::Metrics => {
            let catalog: Vec<MetricInfo> = metric_catalog();
            print_json(&catalog)
        }
    }
}
