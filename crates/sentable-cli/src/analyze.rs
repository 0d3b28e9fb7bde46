//! Analyze pipeline: read a table, classify one column, print the result,
//! and export the augmented table.

use std::path::Path;
use std::time::Instant;

use anyhow::Context;
use sentable_ai::{AggregateCounts, Classifier, OnnxLoader, RunOptions, run_batch_with};
use sentable_store::TableFormat;
use tokio_util::sync::CancellationToken;

use crate::AnalyzeArgs;
use crate::display;

#[derive(Debug)]
pub struct AnalyzeStats {
    pub total_rows: usize,
    pub counts: AggregateCounts,
    pub elapsed_secs: f64,
}

/// Run the pipeline with the ONNX classifier, cancelling on Ctrl-C.
///
/// Ctrl-C during model loading (hub download, session build) takes effect
/// once loading returns; no row is classified after it.
pub async fn run_analyze(args: &AnalyzeArgs) -> anyhow::Result<AnalyzeStats> {
    let cancel = CancellationToken::new();
    let watcher = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("\n  Interrupted, stopping...");
                cancel.cancel();
            }
        }
    });

    let classifier = Classifier::install_global(OnnxLoader::new(args.model.to_config()));
    let result = run_analyze_with(args, classifier, cancel).await;
    watcher.abort();
    result
}

/// Run the full pipeline: check output → read file → classify column →
/// preview + summary → write output.
pub async fn run_analyze_with(
    args: &AnalyzeArgs,
    classifier: &'static Classifier,
    cancel: CancellationToken,
) -> anyhow::Result<AnalyzeStats> {
    let start = Instant::now();

    // 0. Reject an unwritable output before any expensive work.
    TableFormat::for_output(&args.output)
        .with_context(|| format!("output {}", args.output.display()))?;

    // 1. Read the source table.
    let table = sentable_store::read_table(&args.file)
        .with_context(|| format!("reading {}", args.file.display()))?;
    eprintln!(
        "  Read {} rows from {}",
        table.num_rows(),
        args.file.display()
    );

    // 2. Classify on a blocking thread; the token stops it between rows.
    let options = RunOptions::default()
        .parallel(args.parallel)
        .with_cancel(cancel);
    let column = args.column.clone();
    let augmented = tokio::task::spawn_blocking(move || {
        run_batch_with(&table, &column, classifier, &options)
    })
    .await
    .context("classification task panicked")?
    .with_context(|| format!("analyzing column {:?}", args.column))?;

    // 3. Show what came out.
    let counts = augmented.aggregate();
    println!("Preview of results:");
    display::print_preview(augmented.table(), args.preview_rows)?;
    println!();
    print!("{}", display::render_summary(&counts, display::use_colour()));

    // 4. Export.
    sentable_store::write_table(augmented.table(), &args.output)
        .with_context(|| format!("writing {}", args.output.display()))?;
    if let Some(path) = &args.summary_json {
        write_summary_json(&counts, path)?;
    }

    Ok(AnalyzeStats {
        total_rows: augmented.num_rows(),
        counts,
        elapsed_secs: start.elapsed().as_secs_f64(),
    })
}

/// Write the category counts as pretty JSON.
pub fn write_summary_json(counts: &AggregateCounts, path: &Path) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(counts).context("serializing summary")?;
    std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}
