mod analyze;
mod display;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use sentable_ai::config::{DEFAULT_MAX_LENGTH, DEFAULT_ONNX_FILE, DEFAULT_REVISION};
use sentable_ai::labels::parse_label_override;
use sentable_ai::{ClassifierConfig, ModelSource};
use sentable_core::Category;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "sentable", version, about = "Sentiment analysis over tabular files")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the columns of a file and their types.
    Columns {
        /// Parquet, CSV, or spreadsheet file.
        file: PathBuf,
    },
    /// Print the first rows of a file.
    Preview {
        file: PathBuf,
        #[arg(long, short = 'n', default_value = "5")]
        rows: usize,
    },
    /// Classify a text column and export the augmented table.
    Analyze(AnalyzeArgs),
    /// Show the sentiment distribution of an already-analyzed file.
    Summarize { file: PathBuf },
}

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Parquet, CSV, or spreadsheet file.
    pub file: PathBuf,

    /// Column holding the text to classify.
    #[arg(long, short = 'c')]
    pub column: String,

    /// Where to write the augmented table (.parquet or .csv).
    #[arg(long, short = 'o', default_value = "sentiment_output.parquet")]
    pub output: PathBuf,

    #[command(flatten)]
    pub model: ModelArgs,

    /// Classify rows on all cores.
    #[arg(long, env = "SENTABLE_PARALLEL")]
    pub parallel: bool,

    /// Also write the category counts as JSON.
    #[arg(long)]
    pub summary_json: Option<PathBuf>,

    /// Rows of the result to preview.
    #[arg(long, default_value = "5")]
    pub preview_rows: usize,
}

#[derive(Args, Debug)]
pub struct ModelArgs {
    /// Local directory with model.onnx, tokenizer.json, config.json.
    #[arg(
        long,
        env = "SENTABLE_MODEL_DIR",
        default_value = "models/sentiment",
        conflicts_with = "hub_repo"
    )]
    pub model_dir: PathBuf,

    /// Hugging Face repository to download the model from.
    #[arg(long, env = "SENTABLE_HUB_REPO")]
    pub hub_repo: Option<String>,

    #[arg(long, env = "SENTABLE_REVISION", default_value = DEFAULT_REVISION)]
    pub revision: String,

    /// Download cache for hub models.
    #[arg(long, env = "SENTABLE_CACHE_DIR", default_value = "models/hub")]
    pub cache_dir: PathBuf,

    /// ONNX file path inside the hub repository.
    #[arg(long, env = "SENTABLE_ONNX_FILE", default_value = DEFAULT_ONNX_FILE)]
    pub onnx_file: String,

    /// Map a model label to a category, e.g. `LABEL_0=Negative`. Repeatable.
    #[arg(long = "label-map", value_parser = parse_label_override)]
    pub label_map: Vec<(String, Category)>,

    /// Tokens kept per text.
    #[arg(long, env = "SENTABLE_MAX_LENGTH", default_value_t = DEFAULT_MAX_LENGTH)]
    pub max_length: usize,
}

impl ModelArgs {
    pub fn to_config(&self) -> ClassifierConfig {
        let source = match &self.hub_repo {
            Some(repo) => ModelSource::Hub {
                repo: repo.clone(),
                revision: self.revision.clone(),
                cache_dir: self.cache_dir.clone(),
            },
            None => ModelSource::Local(self.model_dir.clone()),
        };
        ClassifierConfig {
            source,
            max_length: self.max_length,
            label_overrides: self.label_map.iter().cloned().collect(),
            onnx_file: self.onnx_file.clone(),
        }
    }
}

fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("sentable=info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact(),
        )
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();
    tracing::debug!("sentable v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Command::Columns { file } => {
            let table = sentable_store::read_table(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            display::print_columns(&table);
        }
        Command::Preview { file, rows } => {
            let table = sentable_store::read_table(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            display::print_preview(&table, rows)?;
        }
        Command::Analyze(args) => {
            let stats = analyze::run_analyze(&args).await?;
            eprintln!(
                "  Classified {} rows ({} labeled) in {:.1}s, wrote {}",
                stats.total_rows,
                stats.counts.labeled(),
                stats.elapsed_secs,
                args.output.display()
            );
        }
        Command::Summarize { file } => {
            let table = sentable_store::read_table(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let counts = sentable_ai::aggregate_table(&table)
                .with_context(|| format!("summarizing {}", file.display()))?;
            print!("{}", display::render_summary(&counts, display::use_colour()));
        }
    }
    Ok(())
}
