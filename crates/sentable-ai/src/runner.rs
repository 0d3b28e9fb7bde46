//! Batch runner: classify one column of a table and append the results.
//!
//! The runner type-guards every cell. Only [`Cell::Text`] reaches the
//! classifier; numbers, blanks, and everything else become
//! [`ClassificationResult::Absent`] without a model call. Infrastructure
//! failures abort the whole batch, and no partial table is ever returned.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use arrow::array::{Array, ArrayRef, Float32Array, StringArray};
use arrow::datatypes::{Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use rayon::prelude::*;
use sentable_core::schema::{
    CONFIDENCE_COLUMN, SENTIMENT_COLUMN, confidence_field, sentiment_field,
};
use sentable_core::{Cell, ClassificationResult, Table, decode_dictionary};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::adapter::{Classifier, SentimentModel};
use crate::aggregate::{AggregateCounts, tally};
use crate::error::EngineError;

/// Knobs for [`run_batch_with`].
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Classify the rows of each record batch on the rayon pool.
    pub parallel: bool,
    /// Stop row iteration when cancelled.
    pub cancel: Option<CancellationToken>,
}

impl RunOptions {
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|t| t.is_cancelled())
    }
}

/// Source table plus `sentiment` and `confidence` columns, row-aligned.
#[derive(Debug, Clone)]
pub struct AugmentedTable {
    table: Table,
    source_column: String,
    results: Vec<ClassificationResult>,
}

impl AugmentedTable {
    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn into_table(self) -> Table {
        self.table
    }

    /// The column that was classified.
    pub fn source_column(&self) -> &str {
        &self.source_column
    }

    pub fn num_rows(&self) -> usize {
        self.table.num_rows()
    }

    /// Per-row results in row order.
    pub fn results(&self) -> &[ClassificationResult] {
        &self.results
    }

    /// Category counts over the `sentiment` column.
    pub fn aggregate(&self) -> AggregateCounts {
        aggregate(self)
    }
}

/// Category counts of an augmented table.
pub fn aggregate(augmented: &AugmentedTable) -> AggregateCounts {
    let table = &augmented.table;
    match table.column_index(SENTIMENT_COLUMN) {
        Some(idx) => {
            let columns: Vec<ArrayRef> = table
                .batches()
                .iter()
                .map(|b| Arc::clone(b.column(idx)))
                .collect();
            tally(&columns)
        }
        // The runner always writes the column.
        None => AggregateCounts::empty(table.num_rows()),
    }
}

/// Classify `column` of `table` with default options.
pub fn run_batch(
    table: &Table,
    column: &str,
    classifier: &Classifier,
) -> Result<AugmentedTable, EngineError> {
    run_batch_with(table, column, classifier, &RunOptions::default())
}

/// Classify `column` of `table`.
///
/// Fails with [`EngineError::ColumnNotFound`] before doing any work if the
/// column is missing, and with [`EngineError::ModelUnavailable`] before any
/// row is processed if the model cannot be loaded. A cancellation requested
/// while the model loads is honoured as soon as loading returns.
pub fn run_batch_with(
    table: &Table,
    column: &str,
    classifier: &Classifier,
    options: &RunOptions,
) -> Result<AugmentedTable, EngineError> {
    let col_idx = table
        .column_index(column)
        .ok_or_else(|| EngineError::ColumnNotFound {
            column: column.to_string(),
            available: table.column_names().iter().map(|s| s.to_string()).collect(),
        })?;

    let model = classifier
        .model()
        .map_err(|source| EngineError::ModelUnavailable { row: None, source })?;

    let total = table.num_rows();
    // Loading cannot be interrupted; a cancel that arrived meanwhile wins here.
    if options.is_cancelled() {
        return Err(EngineError::Cancelled {
            processed: 0,
            total,
        });
    }

    let layout = OutputLayout::new(table.schema());
    info!(
        column,
        rows = total,
        batches = table.batches().len(),
        parallel = options.parallel,
        "classifying column"
    );

    let start = Instant::now();
    let mut batches = Vec::with_capacity(table.batches().len());
    let mut results = Vec::with_capacity(total);
    let mut offset = 0usize;

    for batch in table.batches() {
        let values = decode_dictionary(batch.column(col_idx))?;
        let batch_results = if options.parallel {
            classify_parallel(model.as_ref(), values.as_ref(), offset, total, options)?
        } else {
            classify_sequential(model.as_ref(), values.as_ref(), offset, total, options)?
        };

        batches.push(layout.append(batch, &batch_results)?);
        results.extend(batch_results);
        offset += batch.num_rows();
        debug!(processed = offset, total, "classified record batch");
    }

    let labeled = results.iter().filter(|r| !r.is_absent()).count();
    info!(
        rows = total,
        labeled,
        absent = total - labeled,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "column classified"
    );

    Ok(AugmentedTable {
        table: Table::try_new(Arc::clone(&layout.schema), batches)?,
        source_column: column.to_string(),
        results,
    })
}

/// Type guard: only text reaches the model.
fn classify_cell(
    model: &dyn SentimentModel,
    values: &dyn Array,
    row: usize,
    global_row: usize,
) -> Result<ClassificationResult, EngineError> {
    match Cell::at(values, row) {
        Cell::Text(text) => model
            .predict(text)
            .map(ClassificationResult::from)
            .map_err(|source| EngineError::ModelUnavailable {
                row: Some(global_row),
                source,
            }),
        _ => Ok(ClassificationResult::Absent),
    }
}

fn classify_sequential(
    model: &dyn SentimentModel,
    values: &dyn Array,
    offset: usize,
    total: usize,
    options: &RunOptions,
) -> Result<Vec<ClassificationResult>, EngineError> {
    let mut out = Vec::with_capacity(values.len());
    for row in 0..values.len() {
        if options.is_cancelled() {
            return Err(EngineError::Cancelled {
                processed: offset + row,
                total,
            });
        }
        out.push(classify_cell(model, values, row, offset + row)?);
    }
    Ok(out)
}

fn classify_parallel(
    model: &dyn SentimentModel,
    values: &dyn Array,
    offset: usize,
    total: usize,
    options: &RunOptions,
) -> Result<Vec<ClassificationResult>, EngineError> {
    let done = AtomicUsize::new(0);
    let out = (0..values.len())
        .into_par_iter()
        .map(|row| {
            if options.is_cancelled() {
                return Err(EngineError::Cancelled {
                    processed: offset + done.load(Ordering::Relaxed),
                    total,
                });
            }
            let result = classify_cell(model, values, row, offset + row);
            done.fetch_add(1, Ordering::Relaxed);
            result
        })
        .collect::<Result<Vec<_>, _>>()?;

    // Rows that raced past the last check still finished; the batch did not.
    if options.is_cancelled() {
        return Err(EngineError::Cancelled {
            processed: offset + done.load(Ordering::Relaxed),
            total,
        });
    }
    Ok(out)
}

/// Where the two output columns go in the augmented schema.
///
/// Existing `sentiment`/`confidence` columns are overwritten in place, so
/// re-running on an exported table does not duplicate them.
struct OutputLayout {
    schema: SchemaRef,
    sentiment: usize,
    confidence: usize,
}

impl OutputLayout {
    fn new(source: &Schema) -> Self {
        let mut fields: Vec<_> = source.fields().iter().map(|f| f.as_ref().clone()).collect();

        let sentiment = match source.index_of(SENTIMENT_COLUMN) {
            Ok(i) => {
                fields[i] = sentiment_field();
                i
            }
            Err(_) => {
                fields.push(sentiment_field());
                fields.len() - 1
            }
        };
        let confidence = match source.index_of(CONFIDENCE_COLUMN) {
            Ok(i) => {
                fields[i] = confidence_field();
                i
            }
            Err(_) => {
                fields.push(confidence_field());
                fields.len() - 1
            }
        };

        let schema = Schema::new_with_metadata(fields, source.metadata().clone());
        Self {
            schema: Arc::new(schema),
            sentiment,
            confidence,
        }
    }

    fn append(
        &self,
        batch: &RecordBatch,
        results: &[ClassificationResult],
    ) -> Result<RecordBatch, EngineError> {
        let sentiment: StringArray = results
            .iter()
            .map(|r| r.category().map(|c| c.as_str()))
            .collect();
        let confidence: Float32Array = results.iter().map(|r| r.confidence()).collect();

        let mut columns: Vec<ArrayRef> = batch.columns().to_vec();
        place(&mut columns, self.sentiment, Arc::new(sentiment));
        place(&mut columns, self.confidence, Arc::new(confidence));

        Ok(RecordBatch::try_new(Arc::clone(&self.schema), columns)?)
    }
}

fn place(columns: &mut Vec<ArrayRef>, idx: usize, array: ArrayRef) {
    if idx < columns.len() {
        columns[idx] = array;
    } else {
        columns.push(array);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::LoadResult;
    use crate::adapter::tests::KeywordModel;
    use crate::error::ModelError;
    use arrow::array::{AsArray, Int64Array};
    use arrow::datatypes::{DataType, Field, Float32Type};
    use sentable_core::{Category, MixedColumnBuilder, Prediction};

    /// The four-row example: text, number, text, blank.
    fn mixed_comments() -> Table {
        let mut comment = MixedColumnBuilder::new();
        comment.append_text("Great!");
        comment.append_number(42.0);
        comment.append_text("Terrible");
        comment.append_empty();
        let comment = comment.finish().unwrap();

        let schema = Schema::new(vec![
            Field::new("id", DataType::Int64, false),
            Field::new("comment", comment.data_type().clone(), true),
        ]);
        let batch = RecordBatch::try_new(
            Arc::new(schema),
            vec![Arc::new(Int64Array::from(vec![1, 2, 3, 4])), comment],
        )
        .unwrap();
        Table::from_batches(vec![batch]).unwrap()
    }

    fn text_batch(values: Vec<Option<&str>>) -> RecordBatch {
        let schema = Schema::new(vec![Field::new("comment", DataType::Utf8, true)]);
        RecordBatch::try_new(Arc::new(schema), vec![Arc::new(StringArray::from(values))]).unwrap()
    }

    fn keyword_classifier() -> (Classifier, Arc<KeywordModel>) {
        let model = Arc::new(KeywordModel::default());
        (Classifier::from_model(model.clone()), model)
    }

    fn sentiments(augmented: &AugmentedTable) -> Vec<Option<Category>> {
        augmented.results().iter().map(|r| r.category()).collect()
    }

    #[test]
    fn mixed_column_scenario() {
        let table = mixed_comments();
        let (clf, model) = keyword_classifier();

        let augmented = run_batch(&table, "comment", &clf).unwrap();

        assert_eq!(augmented.num_rows(), 4);
        assert_eq!(
            sentiments(&augmented),
            vec![
                Some(Category::Positive),
                None,
                Some(Category::Negative),
                None
            ]
        );
        // Only the two text cells reached the model.
        assert_eq!(model.calls.load(Ordering::SeqCst), 2);

        let counts = augmented.aggregate();
        assert_eq!(counts.count(Category::Positive), 1);
        assert_eq!(counts.count(Category::Negative), 1);
        assert_eq!(counts.count(Category::Neutral), 0);
        assert_eq!(counts.total(), 4);
    }

    #[test]
    fn output_columns_appended_in_row_order() {
        let table = mixed_comments();
        let (clf, _) = keyword_classifier();
        let augmented = run_batch(&table, "comment", &clf).unwrap();

        let out = augmented.table();
        assert_eq!(out.column_names(), vec!["id", "comment", "sentiment", "confidence"]);

        let batch = &out.batches()[0];
        let sentiment = batch.column(2).as_string::<i32>();
        assert_eq!(sentiment.value(0), "Positive");
        assert!(sentiment.is_null(1));
        assert_eq!(sentiment.value(2), "Negative");
        assert!(sentiment.is_null(3));

        let confidence = batch.column(3).as_primitive::<Float32Type>();
        assert!((0.0..=1.0).contains(&confidence.value(0)));
        assert!(confidence.is_null(1));
        assert!(confidence.is_null(3));

        // Source columns untouched.
        assert_eq!(batch.column(0).as_ref(), table.batches()[0].column(0).as_ref());
    }

    #[test]
    fn missing_column_fails_without_touching_table() {
        let table = mixed_comments();
        let (clf, model) = keyword_classifier();

        let err = run_batch(&table, "nonexistent_column", &clf).unwrap_err();
        match err {
            EngineError::ColumnNotFound { column, available } => {
                assert_eq!(column, "nonexistent_column");
                assert_eq!(available, vec!["id", "comment"]);
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
        assert_eq!(table.num_columns(), 2);
    }

    #[test]
    fn load_failure_surfaces_before_any_row() {
        let table = mixed_comments();
        let clf = Classifier::new(|| -> LoadResult {
            Err(ModelError::Fetch("network unreachable".into()))
        });

        let err = run_batch(&table, "comment", &clf).unwrap_err();
        assert!(matches!(
            err,
            EngineError::ModelUnavailable {
                row: None,
                source: ModelError::Fetch(_)
            }
        ));
    }

    struct FailOn(&'static str);

    impl SentimentModel for FailOn {
        fn predict(&self, text: &str) -> Result<Prediction, ModelError> {
            if text == self.0 {
                Err(ModelError::Inference("session closed".into()))
            } else {
                Ok(Prediction::new(Category::Neutral, 0.5))
            }
        }
    }

    #[test]
    fn inference_failure_aborts_with_row() {
        let table = Table::from_batches(vec![
            text_batch(vec![Some("a"), Some("b")]),
            text_batch(vec![Some("c"), Some("boom")]),
        ])
        .unwrap();
        let clf = Classifier::from_model(Arc::new(FailOn("boom")));

        let err = run_batch(&table, "comment", &clf).unwrap_err();
        assert!(matches!(
            err,
            EngineError::ModelUnavailable { row: Some(3), .. }
        ));
    }

    #[test]
    fn all_absent_counts_zero() {
        let schema = Schema::new(vec![Field::new("comment", DataType::Int64, true)]);
        let batch = RecordBatch::try_new(
            Arc::new(schema),
            vec![Arc::new(Int64Array::from(vec![Some(1), None, Some(3)]))],
        )
        .unwrap();
        let table = Table::from_batches(vec![batch]).unwrap();
        let (clf, model) = keyword_classifier();

        let augmented = run_batch(&table, "comment", &clf).unwrap();
        let counts = augmented.aggregate();
        for cat in Category::ALL {
            assert_eq!(counts.count(cat), 0);
        }
        assert_eq!(counts.total(), 3);
        assert_eq!(counts.absent(), 3);
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn runs_are_idempotent() {
        let table = mixed_comments();
        let (clf, _) = keyword_classifier();

        let first = run_batch(&table, "comment", &clf).unwrap();
        let second = run_batch(&table, "comment", &clf).unwrap();
        assert_eq!(first.results(), second.results());
        assert_eq!(first.table().batches(), second.table().batches());
        assert_eq!(first.aggregate(), second.aggregate());
    }

    #[test]
    fn parallel_matches_sequential() {
        let rows: Vec<Option<&str>> = (0..500)
            .map(|i| match i % 4 {
                0 => Some("great day"),
                1 => Some("terrible day"),
                2 => None,
                _ => Some("a day"),
            })
            .collect();
        let table =
            Table::from_batches(vec![text_batch(rows[..300].to_vec()), text_batch(rows[300..].to_vec())])
                .unwrap();
        let (clf, _) = keyword_classifier();

        let seq = run_batch(&table, "comment", &clf).unwrap();
        let par =
            run_batch_with(&table, "comment", &clf, &RunOptions::default().parallel(true)).unwrap();

        assert_eq!(seq.results(), par.results());
        assert_eq!(seq.table().batches(), par.table().batches());
        assert_eq!(par.num_rows(), 500);
    }

    #[test]
    fn cancelled_run_returns_no_table() {
        let table = mixed_comments();
        let (clf, model) = keyword_classifier();
        let token = CancellationToken::new();
        token.cancel();

        for parallel in [false, true] {
            let options = RunOptions::default()
                .parallel(parallel)
                .with_cancel(token.clone());
            let err = run_batch_with(&table, "comment", &clf, &options).unwrap_err();
            assert!(matches!(err, EngineError::Cancelled { total: 4, .. }));
        }
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn cancel_during_model_load_stops_before_first_row() {
        // Only blanks, so no row-level check would ever see the token.
        let schema = Schema::new(vec![Field::new("comment", DataType::Utf8, true)]);
        let batch = RecordBatch::try_new(
            Arc::new(schema),
            vec![Arc::new(StringArray::from(vec![None::<&str>, None]))],
        )
        .unwrap();
        let table = Table::from_batches(vec![batch]).unwrap();

        let token = CancellationToken::new();
        let loader_token = token.clone();
        let clf = Classifier::new(move || -> LoadResult {
            loader_token.cancel();
            Ok(Arc::new(KeywordModel::default()))
        });

        let options = RunOptions::default().with_cancel(token);
        let err = run_batch_with(&table, "comment", &clf, &options).unwrap_err();
        assert!(matches!(
            err,
            EngineError::Cancelled {
                processed: 0,
                total: 2
            }
        ));
        assert!(clf.is_ready());
    }

    #[test]
    fn existing_output_columns_replaced_in_place() {
        let table = mixed_comments();
        let (clf, _) = keyword_classifier();

        let once = run_batch(&table, "comment", &clf).unwrap();
        let twice = run_batch(once.table(), "comment", &clf).unwrap();

        assert_eq!(
            twice.table().column_names(),
            vec!["id", "comment", "sentiment", "confidence"]
        );
        assert_eq!(once.results(), twice.results());
    }

    #[test]
    fn dictionary_text_is_classified() {
        use arrow::array::DictionaryArray;
        use arrow::datatypes::Int32Type;

        let dict: DictionaryArray<Int32Type> =
            vec!["love it", "hate it", "love it"].into_iter().collect();
        let schema = Schema::new(vec![Field::new("comment", dict.data_type().clone(), false)]);
        let batch = RecordBatch::try_new(Arc::new(schema), vec![Arc::new(dict)]).unwrap();
        let table = Table::from_batches(vec![batch]).unwrap();
        let (clf, _) = keyword_classifier();

        let augmented = run_batch(&table, "comment", &clf).unwrap();
        assert_eq!(
            sentiments(&augmented),
            vec![
                Some(Category::Positive),
                Some(Category::Negative),
                Some(Category::Positive)
            ]
        );
    }

    #[test]
    fn empty_table_yields_empty_augmented_table() {
        let table = Table::empty(text_batch(vec![]).schema());
        let (clf, _) = keyword_classifier();

        let augmented = run_batch(&table, "comment", &clf).unwrap();
        assert_eq!(augmented.num_rows(), 0);
        assert!(augmented.table().has_column(SENTIMENT_COLUMN));
        assert_eq!(augmented.aggregate().total(), 0);
    }
}
