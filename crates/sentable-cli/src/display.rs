//! Terminal output: column listings, table previews, and the sentiment
//! distribution chart.

use std::fmt::Write as _;
use std::io::IsTerminal;

use arrow::util::pretty::pretty_format_batches;
use sentable_ai::AggregateCounts;
use sentable_core::{Category, Table};

const BAR_WIDTH: usize = 40;

// ── Palette ──

/// Chart colour per category, as RGB.
pub fn category_colour(category: Category) -> (u8, u8, u8) {
    match category {
        Category::Positive => (0x63, 0xE6, 0x6E), // light green
        Category::Negative => (0xFF, 0x77, 0x00), // orange
        Category::Neutral => (0xD3, 0xD3, 0xD3),  // grey
    }
}

/// Colour only when stdout is a terminal and `NO_COLOR` is unset.
pub fn use_colour() -> bool {
    std::io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none()
}

fn paint(text: &str, (r, g, b): (u8, u8, u8)) -> String {
    format!("\x1b[38;2;{r};{g};{b}m{text}\x1b[0m")
}

// ── Public API ──

/// Print each column name with its Arrow type.
pub fn print_columns(table: &Table) {
    let width = table
        .column_names()
        .iter()
        .map(|n| n.len())
        .max()
        .unwrap_or(0)
        .max(6);
    println!("{:<width$}  type", "column");
    for field in table.schema().fields() {
        println!("{:<width$}  {}", field.name(), type_label(field.data_type()));
    }
    println!("({} rows)", table.num_rows());
}

/// Pretty-print the first `rows` rows.
pub fn print_preview(table: &Table, rows: usize) -> anyhow::Result<()> {
    println!("{}", render_preview(table, rows)?);
    Ok(())
}

pub fn render_preview(table: &Table, rows: usize) -> anyhow::Result<String> {
    // Unions render as `{id=value}`; show their plain text instead.
    let table = sentable_store::flatten_unions(table)?;
    let mut head = Vec::new();
    let mut remaining = rows;
    for batch in table.batches() {
        if remaining == 0 {
            break;
        }
        let take = remaining.min(batch.num_rows());
        head.push(batch.slice(0, take));
        remaining -= take;
    }
    if head.is_empty() {
        head.push(arrow::record_batch::RecordBatch::new_empty(
            table.schema().clone(),
        ));
    }
    Ok(pretty_format_batches(&head)?.to_string())
}

/// Distribution chart: one bar per category, sized by share of labeled rows.
pub fn render_summary(counts: &AggregateCounts, colour: bool) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Sentiment distribution");

    for (category, count) in counts.iter() {
        let share = counts.share(category);
        let filled = (share * BAR_WIDTH as f64).round() as usize;
        let bar = "█".repeat(filled);
        let bar = if colour {
            paint(&bar, category_colour(category))
        } else {
            bar
        };
        let _ = writeln!(
            out,
            "  {:<9} {:>6}  {:>5.1}%  {bar}",
            category.as_str(),
            count,
            share * 100.0
        );
    }

    if counts.unknown() > 0 {
        let _ = writeln!(out, "  {:<9} {:>6}", "Unknown", counts.unknown());
    }
    let _ = writeln!(
        out,
        "  {} of {} rows labeled, {} without text",
        counts.labeled() + counts.unknown(),
        counts.total(),
        counts.absent()
    );
    out
}

fn type_label(data_type: &arrow::datatypes::DataType) -> String {
    use arrow::datatypes::DataType;
    match data_type {
        DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View => "text".to_string(),
        DataType::Union(_, _) => "mixed".to_string(),
        DataType::Dictionary(_, value) => type_label(value),
        other => other.to_string(),
    }
}
