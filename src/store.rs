use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;

/// One sheet row, keyed by column header.
pub type Record = HashMap<String, String>;

/// Row-oriented CRUD against the spreadsheet backend, keyed by sheet name.
///
/// Row numbers are 1-based sheet coordinates: row 1 is the header, row 2 the
/// first data row. Operations are not retried here; failures propagate to the
/// webhook boundary.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// All data rows of a sheet, in sheet order. Missing sheets yield an error.
    async fn get_all(&self, sheet: &str) -> Result<Vec<Record>>;

    /// Append one row, ordered by the sheet's header row. Columns absent from
    /// the record are written empty.
    async fn append(&self, sheet: &str, record: &Record) -> Result<()>;

    /// Overwrite a single cell given an A1 reference like "C5".
    async fn update_cell(&self, sheet: &str, cell: &str, value: &str) -> Result<()>;

    /// Overwrite an entire data row.
    async fn update_row(&self, sheet: &str, row_number: u32, record: &Record) -> Result<()>;

    /// Row number of the first row whose `column` equals `value`, or `None`.
    /// An unknown column is an error.
    async fn find_row(&self, sheet: &str, column: &str, value: &str) -> Result<Option<u32>>;
}
