//! Row ordering policies.
//!
//! Callers promise that rows arrive ascending by the table's sort key. An
//! append-only writer trusts that promise; a merge-aware writer verifies it
//! inside each ordering domain (the span of writes between two flushes). Equal
//! adjacent keys are ascending input and are left for the merge to resolve.

use arrow::{
    datatypes::SchemaRef,
    record_batch::RecordBatch,
    row::{OwnedRow, RowConverter, SortField},
};

use super::TabletWriterError;

/// Ordering policy applied to every batch before it is absorbed.
pub trait RowOrder: Send + 'static {
    /// Validate `batch` against the rows already accepted in the current domain.
    ///
    /// Must not change any state when it returns an error.
    fn check(&mut self, batch: &RecordBatch) -> Result<(), TabletWriterError>;

    /// Start a new ordering domain; called after every flush.
    fn reset(&mut self);
}

/// Append-only policy: rows are trusted to be sorted and never inspected.
#[derive(Debug, Default, Clone, Copy)]
pub struct TrustedOrder;

impl RowOrder for TrustedOrder {
    fn check(&mut self, _batch: &RecordBatch) -> Result<(), TabletWriterError> {
        Ok(())
    }

    fn reset(&mut self) {}
}

/// Merge-aware policy: keys must never descend within one domain.
pub struct SortKeyOrder {
    sort_key: Vec<usize>,
    converter: RowConverter,
    last: Option<OwnedRow>,
}

impl SortKeyOrder {
    /// Build a policy comparing the columns at `sort_key` indices of `schema`.
    pub fn new(schema: &SchemaRef, sort_key: Vec<usize>) -> Result<Self, TabletWriterError> {
        let fields = schema.fields();
        if sort_key.is_empty() {
            return Err(TabletWriterError::InvalidSortKey {
                column: 0,
                fields: fields.len(),
            });
        }
        let mut sort_fields = Vec::with_capacity(sort_key.len());
        for &column in &sort_key {
            let field = fields
                .get(column)
                .ok_or(TabletWriterError::InvalidSortKey {
                    column,
                    fields: fields.len(),
                })?;
            sort_fields.push(SortField::new(field.data_type().clone()));
        }
        Ok(Self {
            sort_key,
            converter: RowConverter::new(sort_fields)?,
            last: None,
        })
    }

    pub fn sort_key(&self) -> &[usize] {
        &self.sort_key
    }
}

impl RowOrder for SortKeyOrder {
    fn check(&mut self, batch: &RecordBatch) -> Result<(), TabletWriterError> {
        if batch.num_rows() == 0 {
            return Ok(());
        }
        let columns: Vec<_> = self
            .sort_key
            .iter()
            .map(|&column| batch.column(column).clone())
            .collect();
        let rows = self.converter.convert_columns(&columns)?;

        if let Some(last) = &self.last {
            if last.row() > rows.row(0) {
                return Err(TabletWriterError::OutOfOrder { row: 0 });
            }
        }
        for row in 1..rows.num_rows() {
            if rows.row(row - 1) > rows.row(row) {
                return Err(TabletWriterError::OutOfOrder { row });
            }
        }
        self.last = Some(rows.row(rows.num_rows() - 1).owned());
        Ok(())
    }

    fn reset(&mut self) {
        self.last = None;
    }
}

impl std::fmt::Debug for SortKeyOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SortKeyOrder")
            .field("sort_key", &self.sort_key)
            .field("has_last", &self.last.is_some())
            .finish()
    }
}
