use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::Local;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::config::SheetsConfig;
use crate::store::{Record, RecordStore};

/// Google Sheets v4 REST adapter.
///
/// One client is constructed at startup and shared across requests. All
/// mutating calls are serialized through `write_lock` so concurrent webhook
/// requests cannot interleave their read-header/write-row sequences.
pub struct GoogleSheetsClient {
    client: reqwest::Client,
    config: SheetsConfig,
    write_lock: Mutex<()>,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetMeta>,
}

#[derive(Debug, Deserialize)]
struct SheetMeta {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
struct SheetProperties {
    title: String,
}

#[derive(Debug, Deserialize)]
struct CreatedSpreadsheet {
    #[serde(rename = "spreadsheetId")]
    spreadsheet_id: String,
}

/// Convert raw sheet rows into records keyed by the header row. Rows shorter
/// than the header are padded with empty strings.
fn rows_to_records(headers: &[String], rows: &[Vec<String>]) -> Vec<Record> {
    rows.iter()
        .map(|row| {
            headers
                .iter()
                .enumerate()
                .map(|(i, header)| {
                    (header.clone(), row.get(i).cloned().unwrap_or_default())
                })
                .collect()
        })
        .collect()
}

/// Order a record's values by the sheet's headers. Missing columns are empty.
fn record_to_row(headers: &[String], record: &Record) -> Vec<String> {
    headers
        .iter()
        .map(|header| record.get(header).cloned().unwrap_or_default())
        .collect()
}

impl GoogleSheetsClient {
    pub fn new(config: SheetsConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
            write_lock: Mutex::new(()),
        }
    }

    fn values_url(&self, spreadsheet_id: &str, range: &str) -> String {
        format!(
            "{}/spreadsheets/{}/values/{}",
            self.config.api_url, spreadsheet_id, range
        )
    }

    async fn check(&self, response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            bail!("Sheets API error ({}): {}", status, error_body);
        }
        Ok(response)
    }

    async fn fetch_values(&self, spreadsheet_id: &str, range: &str) -> Result<Vec<Vec<String>>> {
        let response = self
            .client
            .get(self.values_url(spreadsheet_id, range))
            .bearer_auth(&self.config.api_token)
            .send()
            .await
            .with_context(|| format!("Failed to fetch range {range}"))?;

        let value_range: ValueRange = self
            .check(response)
            .await?
            .json()
            .await
            .with_context(|| format!("Failed to parse values for range {range}"))?;
        Ok(value_range.values)
    }

    async fn fetch_headers(&self, sheet: &str) -> Result<Vec<String>> {
        let mut rows = self
            .fetch_values(&self.config.spreadsheet_id, &format!("{sheet}!1:1"))
            .await?;
        if rows.is_empty() {
            bail!("Sheet {sheet} has no header row");
        }
        Ok(rows.remove(0))
    }

    async fn put_values(
        &self,
        spreadsheet_id: &str,
        range: &str,
        values: Vec<Vec<String>>,
        input_option: &str,
    ) -> Result<()> {
        let url = format!(
            "{}?valueInputOption={}",
            self.values_url(spreadsheet_id, range),
            input_option
        );
        let response = self
            .client
            .put(&url)
            .bearer_auth(&self.config.api_token)
            .json(&json!({ "values": values }))
            .send()
            .await
            .with_context(|| format!("Failed to update range {range}"))?;
        self.check(response).await?;
        Ok(())
    }

    /// Copy every sheet into a new timestamped backup spreadsheet.
    pub async fn create_backup(&self) -> Result<()> {
        let meta_url = format!(
            "{}/spreadsheets/{}?fields=sheets.properties.title",
            self.config.api_url, self.config.spreadsheet_id
        );
        let response = self
            .client
            .get(&meta_url)
            .bearer_auth(&self.config.api_token)
            .send()
            .await
            .context("Failed to fetch spreadsheet metadata")?;
        let meta: SpreadsheetMeta = self
            .check(response)
            .await?
            .json()
            .await
            .context("Failed to parse spreadsheet metadata")?;

        let title = format!("Backup_{}", Local::now().format("%Y%m%d_%H%M%S"));
        let create_url = format!("{}/spreadsheets", self.config.api_url);
        let response = self
            .client
            .post(&create_url)
            .bearer_auth(&self.config.api_token)
            .json(&json!({ "properties": { "title": title } }))
            .send()
            .await
            .context("Failed to create backup spreadsheet")?;
        let backup: CreatedSpreadsheet = self
            .check(response)
            .await?
            .json()
            .await
            .context("Failed to parse created spreadsheet")?;

        for sheet in &meta.sheets {
            let name = &sheet.properties.title;
            let rows = self.fetch_values(&self.config.spreadsheet_id, name).await?;
            if rows.is_empty() {
                continue;
            }

            // A fresh spreadsheet only has its default sheet; add each tab first.
            let batch_url = format!(
                "{}/spreadsheets/{}:batchUpdate",
                self.config.api_url, backup.spreadsheet_id
            );
            let response = self
                .client
                .post(&batch_url)
                .bearer_auth(&self.config.api_token)
                .json(&json!({
                    "requests": [{ "addSheet": { "properties": { "title": name } } }]
                }))
                .send()
                .await
                .with_context(|| format!("Failed to add backup sheet {name}"))?;
            self.check(response).await?;

            self.put_values(&backup.spreadsheet_id, &format!("{name}!A1"), rows, "RAW")
                .await?;
        }

        info!("Spreadsheet backup created: {}", backup.spreadsheet_id);
        Ok(())
    }
}

#[async_trait]
impl RecordStore for GoogleSheetsClient {
    async fn get_all(&self, sheet: &str) -> Result<Vec<Record>> {
        let rows = self.fetch_values(&self.config.spreadsheet_id, sheet).await?;
        match rows.split_first() {
            Some((headers, data)) => Ok(rows_to_records(headers, data)),
            None => Ok(Vec::new()),
        }
    }

    async fn append(&self, sheet: &str, record: &Record) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let headers = self.fetch_headers(sheet).await?;
        let row = record_to_row(&headers, record);

        let url = format!(
            "{}:append?valueInputOption=USER_ENTERED&insertDataOption=INSERT_ROWS",
            self.values_url(&self.config.spreadsheet_id, sheet)
        );
        debug!("Appending row to sheet {}", sheet);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_token)
            .json(&json!({ "values": [row] }))
            .send()
            .await
            .with_context(|| format!("Failed to append to sheet {sheet}"))?;
        self.check(response).await?;
        Ok(())
    }

    async fn update_cell(&self, sheet: &str, cell: &str, value: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.put_values(
            &self.config.spreadsheet_id,
            &format!("{sheet}!{cell}"),
            vec![vec![value.to_string()]],
            "USER_ENTERED",
        )
        .await
    }

    async fn update_row(&self, sheet: &str, row_number: u32, record: &Record) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let headers = self.fetch_headers(sheet).await?;
        let row = record_to_row(&headers, record);
        self.put_values(
            &self.config.spreadsheet_id,
            &format!("{sheet}!A{row_number}"),
            vec![row],
            "USER_ENTERED",
        )
        .await
    }

    async fn find_row(&self, sheet: &str, column: &str, value: &str) -> Result<Option<u32>> {
        let rows = self.fetch_values(&self.config.spreadsheet_id, sheet).await?;
        let Some((headers, data)) = rows.split_first() else {
            return Ok(None);
        };
        let col_idx = headers
            .iter()
            .position(|h| h == column)
            .with_context(|| format!("Column '{column}' not found"))?;

        for (i, row) in data.iter().enumerate() {
            if row.get(col_idx).map(String::as_str) == Some(value) {
                // +2: skip the header row, sheet rows are 1-based
                return Ok(Some(i as u32 + 2));
            }
        }
        Ok(None)
    }
}
