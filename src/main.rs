use anyhow::{Context, Result};
use bakeoff::{BakeoffRequest, BakeoffRunner};
use clap::{Parser, Subcommand, ValueEnum};
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};
use core_types::DatasetFormat;
use indicatif::{ProgressBar, ProgressStyle};
use scoring::{ScoringPipeline, ScoringRequest};
use std::path::PathBuf;
use storage::{BlobStore, RunRepository};
use tokio::sync::mpsc;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = configuration::load_config(cli.config.as_deref())
        .context("Failed to load configuration")?;
    configuration::init_tracing(&settings.logging)?;

    tracing::info!("Wirewatch CLI application started.");

    match cli.command {
        Commands::Bakeoff(args) => handle_bakeoff(args, &settings).await?,
        Commands::Score(args) => handle_score(args, &settings).await?,
        Commands::InspectArtifact(args) => handle_inspect(args).await?,
    }

    tracing::info!("Wirewatch CLI application finished.");
    Ok(())
}

// ==============================================================================
// CLI Structure
// ==============================================================================

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to a wirewatch.toml settings file.
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train the candidate field on a labelled dataset and pick a champion.
    Bakeoff(BakeoffArgs),
    /// Score a dataset with a previously trained model artifact.
    Score(ScoreArgs),
    /// Print the headline facts of a serialized model artifact.
    InspectArtifact(InspectArgs),
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Csv,
    Xlsx,
}

impl From<FormatArg> for DatasetFormat {
    fn from(value: FormatArg) -> Self {
        match value {
            FormatArg::Csv => DatasetFormat::Csv,
            FormatArg::Xlsx => DatasetFormat::Xlsx,
        }
    }
}

#[derive(Parser)]
struct BakeoffArgs {
    /// Path or file:// URL of the labelled training dataset.
    #[arg(long)]
    dataset: String,
    #[arg(long, value_enum, default_value = "csv")]
    format: FormatArg,
    /// Label column; auto-detected when omitted.
    #[arg(long)]
    label: Option<String>,
    #[arg(long)]
    review_rate: Option<f64>,
    /// Directory to write all candidate artifacts into.
    #[arg(long)]
    artifacts_dir: Option<PathBuf>,
    /// Write the long Markdown report here.
    #[arg(long)]
    report_out: Option<PathBuf>,
}

#[derive(Parser)]
struct ScoreArgs {
    /// Path or file:// URL of the dataset to score.
    #[arg(long)]
    dataset: String,
    #[arg(long, value_enum, default_value = "csv")]
    format: FormatArg,
    /// Path or file:// URL of the model artifact.
    #[arg(long)]
    artifact: String,
    #[arg(long)]
    review_rate: Option<f64>,
    /// Fixed score threshold; derived from the review rate when omitted.
    #[arg(long)]
    threshold: Option<f64>,
    /// Where to write the scored CSV.
    #[arg(long, short)]
    output: Option<PathBuf>,
    /// Where to write the findings as JSON.
    #[arg(long)]
    findings_out: Option<PathBuf>,
}

#[derive(Parser)]
struct InspectArgs {
    /// Path or file:// URL of the model artifact.
    #[arg(long)]
    artifact: String,
}

// ==============================================================================
// Command Handlers
// ==============================================================================

async fn handle_bakeoff(args: BakeoffArgs, settings: &configuration::Settings) -> Result<()> {
    let repo = RunRepository::new();
    let runner = BakeoffRunner::new(BlobStore::new(), repo.clone());

    let mut request = BakeoffRequest::new(&args.dataset, args.format.into());
    request.label_column = args.label;
    request.review_rate = args.review_rate.unwrap_or(settings.bakeoff.review_rate);
    request.parallel = settings.bakeoff.parallel;
    request.rubric = settings.rubric.to_rubric_config();
    for candidate in &mut request.candidates {
        candidate.hyperparams.seed = settings.bakeoff.seed;
    }
    request.artifact_url_prefix = args
        .artifacts_dir
        .as_ref()
        .map(|dir| dir.display().to_string());

    let total = request.candidates.len() as u64;
    let progress_bar = ProgressBar::new(total);
    progress_bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("=>-"),
    );

    let (sender, mut receiver) = mpsc::unbounded_channel::<bakeoff::progress::Progress>();
    let bar = progress_bar.clone();
    let watcher = tokio::spawn(async move {
        while let Some(event) = receiver.recv().await {
            bar.set_position(event.done as u64);
            bar.set_message(event.current_algorithm);
        }
    });

    let outcome = runner.run(&request, Some(sender), None).await?;
    let _ = watcher.await;
    progress_bar.finish_with_message("bake-off complete");

    println!("\n{}\n", outcome.summary);
    print_leaderboard(&outcome);

    if let Some(path) = args.report_out {
        tokio::fs::write(&path, outcome.report.as_bytes())
            .await
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        println!("Report written to {}", path.display());
    }
    if let Some(url) = &outcome.champion_artifact_url {
        println!("Champion artifact: {url}");
    }
    Ok(())
}

fn print_leaderboard(outcome: &bakeoff::BakeoffOutcome) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            "Rank", "Algorithm", "Score", "PR-AUC", "Recall@RR", "Precision@RR", "Status",
        ]);

    for (position, ranked) in outcome.ranking.ranking.iter().enumerate() {
        let candidate = &outcome.candidates[ranked.index];
        let status = match &candidate.error {
            Some(_) => "error".to_string(),
            None if ranked.passed_constraints => "pass".to_string(),
            None => "fail".to_string(),
        };
        table.add_row(vec![
            Cell::new(position + 1),
            Cell::new(candidate.spec.algorithm.tag()),
            Cell::new(format!("{:.4}", ranked.score)),
            Cell::new(format!("{:.4}", candidate.metrics.pr_auc)),
            Cell::new(format!("{:.4}", candidate.metrics.recall_at_review_rate)),
            Cell::new(format!("{:.4}", candidate.metrics.precision_at_review_rate)),
            Cell::new(status),
        ]);
    }
    println!("{table}");
}

async fn handle_score(args: ScoreArgs, settings: &configuration::Settings) -> Result<()> {
    let pipeline = ScoringPipeline::new(BlobStore::new(), RunRepository::new());

    let mut request = ScoringRequest::new(&args.dataset, args.format.into(), &args.artifact);
    request.review_rate = args.review_rate.unwrap_or(settings.bakeoff.review_rate);
    request.threshold = args.threshold;
    request.scored_output_url = args.output.as_ref().map(|p| p.display().to_string());

    let outcome = pipeline.run(&request).await?;

    println!(
        "Scored {} rows; flagged {} at threshold {:.6}.",
        outcome.summary.row_count, outcome.summary.flagged_count, outcome.summary.threshold_used
    );
    if let Some(metrics) = &outcome.summary.metrics_if_labels_present {
        println!(
            "Against labels: precision {:.4}, recall {:.4}, F1 {:.4}.",
            metrics.precision, metrics.recall, metrics.f1
        );
    }
    if !outcome.summary.global_shap_top_features.is_empty() {
        println!("Top features by global |SHAP|:");
        for (name, value) in outcome.summary.global_shap_top_features.iter().take(5) {
            println!("  {name}: {value:.5}");
        }
    }

    let mut findings_table = Table::new();
    findings_table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Rank", "Wire", "Score", "Reasons"]);
    for finding in outcome.findings.iter().take(10) {
        let reasons: Vec<&str> =
            finding.reason_codes.iter().map(|r| r.code.as_str()).collect();
        findings_table.add_row(vec![
            Cell::new(finding.rank),
            Cell::new(&finding.wire_id),
            Cell::new(format!("{:.6}", finding.score)),
            Cell::new(reasons.join(", ")),
        ]);
    }
    println!("{findings_table}");

    if let Some(path) = args.findings_out {
        let json = serde_json::to_vec_pretty(&outcome.findings)?;
        tokio::fs::write(&path, json)
            .await
            .with_context(|| format!("Failed to write findings to {}", path.display()))?;
        println!("Findings written to {}", path.display());
    }
    if let Some(path) = args.output {
        println!("Scored dataset written to {}", path.display());
    }
    Ok(())
}

async fn handle_inspect(args: InspectArgs) -> Result<()> {
    let blob = BlobStore::new();
    let bytes = blob.get(&args.artifact).await?;
    let (model, context) =
        models::deserialize_artifact(&bytes).context("Failed to deserialize artifact")?;

    println!("Algorithm:      {}", model.algorithm.tag());
    println!("Features:       {}", model.feature_names.len());
    match context {
        Some(context) => {
            println!("Numeric stats:  {}", context.numeric_stats.len());
            println!("Categoricals:   {}", context.categorical_mappings.len());
        }
        None => println!("Normalization context: absent (artifact not scoreable)"),
    }
    Ok(())
}
