//! Cab Risk CLI Module
//!
//! Command-line interface for scoring bookings and cleaning booking data.

use clap::{Parser, Subcommand};
use colored::*;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::time::Instant;

use crate::features::{validate_booking, BookingRecord, RiskProfile};
use crate::inference::{
    ModelStats, PredictionResult, PredictionService, PredictorConfig, RiskCategory,
    DECISION_THRESHOLD,
};
use crate::preprocessing::{CleaningConfig, DataQualityProcessor};
use crate::utils::{generate_sample_data, load_csv, save_csv};

// ─── Output ────────────────────────────────────────────────────────────────────

const CARD_WIDTH: usize = 56;
const LABEL_WIDTH: usize = 14;

fn label(s: &str) -> ColoredString {
    s.truecolor(140, 140, 140)
}

fn faint(s: &str) -> ColoredString {
    s.truecolor(100, 100, 100)
}

enum CardRow {
    Field(String, ColoredString),
    Text(String),
    Divider,
}

/// Bordered result panel. Widths are measured on the unstyled text.
#[derive(Default)]
struct Card {
    rows: Vec<CardRow>,
}

impl Card {
    fn field(mut self, name: &str, value: ColoredString) -> Self {
        self.rows.push(CardRow::Field(name.to_string(), value));
        self
    }

    /// Free text, wrapped on word boundaries
    fn text(mut self, text: &str) -> Self {
        let mut line = String::new();
        for word in text.split_whitespace() {
            if !line.is_empty() && line.chars().count() + 1 + word.chars().count() > CARD_WIDTH {
                self.rows.push(CardRow::Text(std::mem::take(&mut line)));
            }
            if !line.is_empty() {
                line.push(' ');
            }
            line.push_str(word);
        }
        if !line.is_empty() {
            self.rows.push(CardRow::Text(line));
        }
        self
    }

    fn divider(mut self) -> Self {
        self.rows.push(CardRow::Divider);
        self
    }

    fn render(&self) -> String {
        let edge = "─".repeat(CARD_WIDTH + 2);
        let border = |l: char, r: char| format!("  {}\n", faint(&format!("{}{}{}", l, edge, r)));
        let framed = |content: String, visible: usize| {
            let pad = " ".repeat(CARD_WIDTH.saturating_sub(visible));
            format!("  {} {}{} {}\n", faint("│"), content, pad, faint("│"))
        };

        let mut out = border('┌', '┐');
        for row in &self.rows {
            out.push_str(&match row {
                CardRow::Field(name, value) => framed(
                    format!("{} {}", label(&format!("{:<LABEL_WIDTH$}", name)), value),
                    LABEL_WIDTH + 1 + value.chars().count(),
                ),
                CardRow::Text(text) => framed(text.clone(), text.chars().count()),
                CardRow::Divider => border('├', '┤'),
            });
        }
        out.push_str(&border('└', '┘'));
        out
    }
}

/// Progress line: the action when started, the outcome and timing when finished.
struct Step(Instant);

impl Step {
    fn start(action: &str) -> Self {
        print!("  {} {}... ", "›".truecolor(120, 170, 255), action);
        let _ = std::io::stdout().flush();
        Self(Instant::now())
    }

    fn finish(self, detail: &str) {
        println!(
            "{} {} {}",
            "done".truecolor(100, 210, 120),
            faint(detail),
            faint(&format!("({:.1?})", self.0.elapsed()))
        );
    }
}

fn heading(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", faint(&"─".repeat(CARD_WIDTH + 4)));
}

fn category_colored(category: RiskCategory) -> ColoredString {
    match category {
        RiskCategory::VeryLow => category.label().truecolor(100, 210, 120),
        RiskCategory::Low => category.label().truecolor(160, 210, 100),
        RiskCategory::Medium => category.label().yellow(),
        RiskCategory::High => category.label().truecolor(255, 150, 60),
        RiskCategory::Critical => category.label().red().bold(),
    }
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "cab-risk")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Cab booking cancellation risk scoring and data cleaning")]
#[command(long_about = None)]
pub struct Cli {
    /// Prediction config file (JSON)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Model artifact, overrides the config
    #[arg(long, global = true)]
    pub model: Option<PathBuf>,

    /// Model metadata sidecar, overrides the config
    #[arg(long, global = true)]
    pub metadata: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Score a single booking
    Predict {
        /// Booking record as a JSON file
        #[arg(short, long, conflicts_with = "sample")]
        input: Option<PathBuf>,

        /// Use a preset booking (low, medium, high, random)
        #[arg(short, long)]
        sample: Option<String>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Score every row of a CSV file
    Batch {
        /// Input CSV
        #[arg(short, long)]
        input: PathBuf,

        /// Output CSV with result columns
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Rows per partition
        #[arg(long)]
        batch_size: Option<usize>,

        /// Worker threads for large files
        #[arg(long)]
        workers: Option<usize>,
    },

    /// Clean a raw booking CSV
    Clean {
        /// Input CSV
        #[arg(short, long)]
        input: PathBuf,

        /// Cleaned CSV; the report is written beside it
        #[arg(short, long)]
        output: PathBuf,

        /// Cleaning config file (JSON)
        #[arg(long)]
        cleaning_config: Option<PathBuf>,
    },

    /// Report data quality of a CSV
    Quality {
        /// Input CSV
        #[arg(short, long)]
        input: PathBuf,

        /// Label column
        #[arg(short, long, default_value = "Car_Cancellation")]
        target: String,
    },

    /// Write a synthetic booking CSV
    Sample {
        /// Output CSV
        #[arg(short, long)]
        output: PathBuf,

        /// Number of rows
        #[arg(short = 'n', long, default_value = "1000")]
        rows: usize,

        /// Random seed
        #[arg(long, default_value = "42")]
        seed: u64,
    },

    /// Show the loaded model
    Info,
}

// ─── Setup ─────────────────────────────────────────────────────────────────────

/// Build the prediction config from the optional file and flag overrides
pub fn resolve_config(
    config: Option<&Path>,
    model: Option<&Path>,
    metadata: Option<&Path>,
) -> anyhow::Result<PredictorConfig> {
    let mut resolved = match config {
        Some(path) => PredictorConfig::from_file(path)?,
        None => PredictorConfig::default(),
    };
    if let Some(path) = model {
        resolved = resolved.with_model_path(path);
    }
    if let Some(path) = metadata {
        resolved = resolved.with_metadata_path(path);
    }
    Ok(resolved)
}

fn load_service(config: &PredictorConfig) -> anyhow::Result<PredictionService> {
    let step = Step::start("Loading model");
    let service = PredictionService::load(config)?;
    step.finish(&format!("{} features", service.schema().len()));
    Ok(service)
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_predict(
    config: &PredictorConfig,
    input: Option<&Path>,
    sample: Option<&str>,
    json: bool,
) -> anyhow::Result<()> {
    let record = match (input, sample) {
        (Some(path), _) => {
            let content = std::fs::read_to_string(path)?;
            let record = serde_json::from_str::<BookingRecord>(&content)?;
            validate_booking(&record)?;
            record
        }
        (None, Some(profile)) => BookingRecord::sample(profile.parse::<RiskProfile>()?),
        (None, None) => anyhow::bail!("either --input or --sample is required"),
    };

    if json {
        let service = PredictionService::load(config)?;
        let result = service.predict_one(&record)?;
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    heading("Predict");
    let service = load_service(config)?;
    let result = service.predict_one(&record)?;
    print_prediction(&result);
    Ok(())
}

fn print_prediction(result: &PredictionResult) {
    println!();
    print!("{}", prediction_card(result).render());

    for warning in &result.warnings {
        println!("  {} {}", "!".yellow(), warning);
    }
    println!();
}

fn prediction_card(result: &PredictionResult) -> Card {
    let decision = if result.high_risk {
        "likely to cancel".red()
    } else {
        "likely to complete".green()
    };
    Card::default()
        .field("Probability", format!("{:.1}%", result.probability * 100.0).white())
        .field("Risk", category_colored(result.risk_category))
        .field("Decision", decision)
        .field("Confidence", result.confidence.to_string().white())
        .divider()
        .text(&result.recommendation)
}

pub fn cmd_batch(
    config: &PredictorConfig,
    input: &Path,
    output: Option<&Path>,
    batch_size: Option<usize>,
    workers: Option<usize>,
) -> anyhow::Result<()> {
    heading("Batch");

    let mut config = config.clone();
    if let Some(size) = batch_size {
        config = config.with_batch_size(size);
    }
    if let Some(n) = workers {
        config = config.with_n_workers(n);
    }
    let service = load_service(&config)?;

    let step = Step::start("Loading data");
    let df = load_csv(input)?;
    step.finish(&format!("{} rows × {} cols", df.height(), df.width()));

    let step = Step::start("Scoring");
    let (mut results, warnings) =
        service.predict_batch_with_warnings(&df, &AtomicBool::new(false))?;
    step.finish(&format!("{} range warnings", warnings.len()));
    for warning in &warnings {
        println!("  {} {}", "!".yellow(), warning);
    }

    let summary = service.summarize(&results)?;
    println!();
    let mut card = Card::default()
        .field("Rows", summary.total.to_string().white().bold())
        .field(
            &format!("p > {}", DECISION_THRESHOLD),
            summary.predicted_cancellations.to_string().white(),
        )
        .field("p ≥ 0.30", summary.high_risk.to_string().white())
        .field("p ≥ 0.50", summary.critical.to_string().white())
        .field("Mean", format!("{:.1}%", summary.mean_probability * 100.0).white())
        .divider();
    for (category, count) in &summary.category_counts {
        card = card.field(category.label(), count.to_string().normal());
    }
    println!();
    print!("{}", card.render());

    if let Some(path) = output {
        let step = Step::start(&format!("Saving → {}", path.display()));
        save_csv(&mut results, path)?;
        step.finish(&format!("{} rows × {} cols", results.height(), results.width()));
    }
    println!();
    Ok(())
}

pub fn cmd_clean(input: &Path, output: &Path, cleaning_config: Option<&Path>) -> anyhow::Result<()> {
    heading("Clean");

    let config = match cleaning_config {
        Some(path) => CleaningConfig::from_file(path)?,
        None => CleaningConfig::default(),
    };
    let processor = DataQualityProcessor::new(config);

    let step = Step::start("Loading data");
    let raw = load_csv(input)?;
    step.finish(&format!("{} rows × {} cols", raw.height(), raw.width()));

    let step = Step::start("Cleaning");
    let (cleaned, report) = processor.clean(&raw)?;
    step.finish(&format!("{} steps", report.cleaning_steps.len()));

    println!();
    for step in &report.cleaning_steps {
        println!("  {} {}", "✓".truecolor(100, 210, 120), step);
    }
    for step in &report.feature_engineering {
        println!("  {} {}", "+".truecolor(120, 170, 255), step);
    }

    let quality = processor.validate_data_quality(&cleaned)?;
    println!();
    println!("  {:<16} {}", label("Quality score"), format!("{}/100", quality.quality_score).white().bold());

    let step = Step::start(&format!("Saving → {}", output.display()));
    let report_path = processor.export(&cleaned, &report, output)?;
    step.finish(&format!("report at {}", report_path.display()));
    println!();
    Ok(())
}

pub fn cmd_quality(input: &Path, target: &str) -> anyhow::Result<()> {
    heading("Quality");

    let df = load_csv(input)?;
    let config = CleaningConfig::default().with_target(target);
    let report = DataQualityProcessor::new(config).validate_data_quality(&df)?;

    println!("  {:<16} {} rows × {} cols", label("Shape"), report.shape.0, report.shape.1);
    println!("  {:<16} {}", label("Missing"), report.total_missing());
    println!("  {:<16} {}", label("Duplicates"), report.duplicate_rows);
    println!("  {:<16} {:.2} MB", label("Memory"), report.memory_usage_mb);
    println!("  {:<16} {}", label("Score"), format!("{}/100", report.quality_score).white().bold());

    if !report.issues.is_empty() {
        println!();
        for issue in &report.issues {
            println!("  {} {}", "!".yellow(), issue);
        }
    }

    let missing: Vec<_> = report.missing_values.iter().filter(|(_, n)| **n > 0).collect();
    if !missing.is_empty() {
        println!();
        println!("  {:<24} {:>8}", label("Column"), label("Missing"));
        println!("  {}", faint(&"─".repeat(34)));
        for (column, count) in missing {
            println!("  {:<24} {:>8}", column, count);
        }
    }
    println!();
    Ok(())
}

pub fn cmd_sample(output: &Path, rows: usize, seed: u64) -> anyhow::Result<()> {
    heading("Sample");

    let step = Step::start(&format!("Generating {} bookings", rows));
    let mut df = generate_sample_data(rows, seed)?;
    step.finish(&format!("seed {}", seed));

    let step = Step::start(&format!("Saving → {}", output.display()));
    save_csv(&mut df, output)?;
    step.finish(&format!("{} rows × {} cols", df.height(), df.width()));
    println!();
    Ok(())
}

pub fn cmd_info(config: &PredictorConfig) -> anyhow::Result<()> {
    heading("Model");

    let service = PredictionService::load_or_unavailable(config);
    let info = match service.model_info() {
        Ok(info) => info,
        Err(e) => {
            println!("  {} {}", "✗".red(), e);
            println!();
            return Ok(());
        }
    };

    println!("  {:<16} {}", label("Type"), info.model_type.white());
    println!("  {:<16} {}", label("Version"), info.version.white());
    println!("  {:<16} {}", label("Features"), info.feature_count.to_string().white());
    println!("  {:<16} {}", label("Threshold"), DECISION_THRESHOLD.to_string().white());

    match &info.stats {
        ModelStats::Available(stats) => {
            let fmt = |v: Option<f64>| v.map_or_else(|| "-".to_string(), |v| format!("{:.4}", v));
            println!("  {:<16} {}", label("Trained"), stats.training_date.as_deref().unwrap_or("-"));
            println!("  {:<16} {}", label("Test AUC"), fmt(stats.test_auc));
            println!("  {:<16} {}", label("CV AUC"), fmt(stats.cv_auc));
            println!("  {:<16} {}", label("Accuracy"), fmt(stats.accuracy));
        }
        ModelStats::Unavailable => {
            println!("  {:<16} {}", label("Stats"), faint("unavailable"));
        }
    }

    println!();
    println!("  {}", label("Input order"));
    for (i, name) in info.features.iter().enumerate() {
        println!("  {:>4}  {}", faint(&i.to_string()), name);
    }
    println!();
    Ok(())
}

/// Dispatch a parsed command line
pub fn run(cli: Cli) -> anyhow::Result<()> {
    let config = || resolve_config(cli.config.as_deref(), cli.model.as_deref(), cli.metadata.as_deref());

    match &cli.command {
        Commands::Predict { input, sample, json } => {
            cmd_predict(&config()?, input.as_deref(), sample.as_deref(), *json)
        }
        Commands::Batch { input, output, batch_size, workers } => {
            cmd_batch(&config()?, input, output.as_deref(), *batch_size, *workers)
        }
        Commands::Clean { input, output, cleaning_config } => {
            cmd_clean(input, output, cleaning_config.as_deref())
        }
        Commands::Quality { input, target } => cmd_quality(input, target),
        Commands::Sample { output, rows, seed } => cmd_sample(output, *rows, *seed),
        Commands::Info => cmd_info(&config()?),
    }
}
