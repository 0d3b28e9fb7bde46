//! Per-category counts over a `sentiment` column.

use std::collections::BTreeMap;

use arrow::array::{Array, ArrayRef};
use sentable_core::schema::SENTIMENT_COLUMN;
use sentable_core::{Category, Cell, Table, decode_dictionary};
use serde::Serialize;

use crate::error::EngineError;

/// Counts per category plus the total row count.
///
/// Every category is always present, so lookups never miss. `unknown`
/// counts label strings that name no category; it stays 0 for tables the
/// runner produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggregateCounts {
    counts: BTreeMap<Category, usize>,
    unknown: usize,
    total: usize,
}

impl AggregateCounts {
    /// All-zero counts for a table of `total` rows.
    pub fn empty(total: usize) -> Self {
        Self {
            counts: Category::ALL.iter().map(|&c| (c, 0)).collect(),
            unknown: 0,
            total,
        }
    }

    pub fn count(&self, category: Category) -> usize {
        self.counts.get(&category).copied().unwrap_or(0)
    }

    /// All rows, including those without a label.
    pub fn total(&self) -> usize {
        self.total
    }

    /// Rows labeled with a known category.
    pub fn labeled(&self) -> usize {
        self.counts.values().sum()
    }

    pub fn unknown(&self) -> usize {
        self.unknown
    }

    /// Rows with no label at all.
    pub fn absent(&self) -> usize {
        self.total - self.labeled() - self.unknown
    }

    /// Fraction of labeled rows (known or unknown) in `category`; 0 when
    /// nothing was labeled.
    pub fn share(&self, category: Category) -> f64 {
        let denom = self.labeled() + self.unknown;
        if denom == 0 {
            0.0
        } else {
            self.count(category) as f64 / denom as f64
        }
    }

    /// `(category, count)` for every category, in [`Category::ALL`] order.
    pub fn iter(&self) -> impl Iterator<Item = (Category, usize)> + '_ {
        Category::ALL.iter().map(|&c| (c, self.count(c)))
    }
}

/// Aggregate any table with a `sentiment` column, e.g. a re-loaded export.
pub fn aggregate_table(table: &Table) -> Result<AggregateCounts, EngineError> {
    let idx = table
        .column_index(SENTIMENT_COLUMN)
        .ok_or_else(|| EngineError::ColumnNotFound {
            column: SENTIMENT_COLUMN.to_string(),
            available: table.column_names().iter().map(|s| s.to_string()).collect(),
        })?;

    let columns = table
        .batches()
        .iter()
        .map(|b| decode_dictionary(b.column(idx)))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(tally(&columns))
}

/// Count labels across the chunks of one column.
pub(crate) fn tally(columns: &[ArrayRef]) -> AggregateCounts {
    let total = columns.iter().map(|c| c.len()).sum();
    let mut out = AggregateCounts::empty(total);

    for col in columns {
        for row in 0..col.len() {
            match Cell::at(col.as_ref(), row) {
                Cell::Empty => {}
                Cell::Text(label) => match Category::from_label(label) {
                    Some(cat) => *out.counts.entry(cat).or_insert(0) += 1,
                    None => out.unknown += 1,
                },
                _ => out.unknown += 1,
            }
        }
    }

    out
}
