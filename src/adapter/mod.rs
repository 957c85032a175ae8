// src/adapter/mod.rs
//
// A table-reading adapter configured entirely from YAML. Sources whose rates
// sit in one HTML table need no code of their own.

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, sync::Arc};
use tracing::{debug, instrument, warn};
use url::Url;

use crate::crawl::{Adapter, Sink};
use crate::error::{ExtractError, LocateError, RateError, TermError};
use crate::fetch::Fetch;
use crate::model::{CanonicalRecord, Kind, RatioBounds, RecordBuilder, Term};
use crate::normalize::{parse_date, parse_month, parse_rate, parse_term};
use crate::table::{
    parse_table, table_after_anchor, table_with_caption, Cursor, ParsedTable, TokenStream,
};

fn default_true() -> bool {
    true
}

/// How to find the table in the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Locate {
    /// The `skip`-th table after the first text containing `anchor`. Each
    /// fallback anchor is tried in turn if the primary one fails.
    Anchor {
        anchor: String,
        #[serde(default)]
        skip: usize,
        #[serde(default)]
        fallback_anchors: Vec<String>,
    },
    /// The first table whose caption contains `caption`.
    Caption { caption: String },
}

/// How rows map to records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Layout {
    /// One record per row: a term label cell and a rate cell.
    TermRows {
        term_column: usize,
        value_column: usize,
        #[serde(default)]
        changed_on_column: Option<usize>,
    },
    /// Header cells are term labels, each row is one month of averages.
    MonthRows {
        #[serde(default)]
        month_column: usize,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub source: String,
    pub url: String,
    pub kind: Kind,
    pub locate: Locate,
    pub layout: Layout,
    /// Overrides for the fetch client's default headers.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Treat a 3xx answer as "no data" instead of reading its body.
    #[serde(default = "default_true")]
    pub reject_redirects: bool,
    #[serde(default)]
    pub ratio_bounds: Option<RatioBounds>,
    #[serde(default)]
    pub group_discount: bool,
}

impl SourceConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.source.trim().is_empty() {
            anyhow::bail!("source name is empty");
        }
        Url::parse(&self.url).with_context(|| format!("url {:?}", self.url))?;
        match (&self.layout, self.kind) {
            (Layout::MonthRows { .. }, Kind::AverageRate) => {}
            (Layout::MonthRows { .. }, kind) => {
                anyhow::bail!("month_rows layout needs kind average_rate, got {kind:?}")
            }
            (Layout::TermRows { .. }, Kind::AverageRate) => {
                anyhow::bail!("average_rate sources need the month_rows layout")
            }
            (Layout::TermRows { .. }, _) => {}
        }
        if self.ratio_bounds.is_some() && self.kind != Kind::RatioDiscounted {
            anyhow::bail!("ratio_bounds only apply to ratio_discounted sources");
        }
        if self.group_discount && self.kind != Kind::UnionDiscounted {
            anyhow::bail!("group_discount only applies to union_discounted sources");
        }
        Ok(())
    }
}

/// Fetches one document, locates one table and turns its rows into records.
pub struct TableAdapter {
    config: SourceConfig,
    fetcher: Arc<dyn Fetch>,
    year_pivot: u8,
}

impl TableAdapter {
    pub fn new(config: SourceConfig, fetcher: Arc<dyn Fetch>, year_pivot: u8) -> Self {
        Self {
            config,
            fetcher,
            year_pivot,
        }
    }

    /// Fetch and read the configured table. Cell-level problems drop the
    /// cell or row; document-level problems are returned.
    pub async fn extract(
        &self,
        observed_at: DateTime<Utc>,
    ) -> Result<Vec<CanonicalRecord>, ExtractError> {
        let url = &self.config.url;
        let headers: Vec<(String, String)> = self
            .config
            .headers
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        let doc = self.fetcher.fetch(url, &headers).await?;
        if doc.is_redirect() && self.config.reject_redirects {
            return Err(ExtractError::UnwantedRedirect {
                url: url.clone(),
                status: doc.status,
            });
        }
        if !doc.is_success() && !doc.is_redirect() {
            return Err(ExtractError::BadStatus {
                url: url.clone(),
                status: doc.status,
            });
        }

        let tokens = TokenStream::parse(&doc.body);
        let table = parse_table(self.locate(&tokens)?);
        if table.is_empty() {
            return Err(ExtractError::EmptyTable { url: url.clone() });
        }
        debug!(
            header = ?table.header(),
            rows = table.rows().len(),
            "table located"
        );
        Ok(self.records_from_table(&table, observed_at))
    }

    fn locate<'a>(&self, tokens: &'a TokenStream) -> Result<Cursor<'a>, LocateError> {
        match &self.config.locate {
            Locate::Caption { caption } => table_with_caption(tokens, caption),
            Locate::Anchor {
                anchor,
                skip,
                fallback_anchors,
            } => {
                let primary = match table_after_anchor(tokens, anchor, *skip) {
                    Ok(cursor) => return Ok(cursor),
                    Err(e) => e,
                };
                for fallback in fallback_anchors {
                    match table_after_anchor(tokens, fallback, *skip) {
                        Ok(cursor) => {
                            debug!(anchor = %fallback, "using fallback anchor");
                            return Ok(cursor);
                        }
                        Err(e) => debug!(error = %e, "fallback anchor failed"),
                    }
                }
                Err(primary)
            }
        }
    }

    /// Map parsed rows to records according to the configured layout.
    pub fn records_from_table(
        &self,
        table: &ParsedTable,
        observed_at: DateTime<Utc>,
    ) -> Vec<CanonicalRecord> {
        match self.config.layout {
            Layout::TermRows {
                term_column,
                value_column,
                changed_on_column,
            } => table
                .rows()
                .iter()
                .filter_map(|row| {
                    self.term_row(row, term_column, value_column, changed_on_column, observed_at)
                })
                .collect(),
            Layout::MonthRows { month_column } => {
                self.month_rows(table, month_column, observed_at)
            }
        }
    }

    fn term_row(
        &self,
        row: &[String],
        term_column: usize,
        value_column: usize,
        changed_on_column: Option<usize>,
        observed_at: DateTime<Utc>,
    ) -> Option<CanonicalRecord> {
        let source = &self.config.source;
        let (Some(term_cell), Some(value_cell)) = (row.get(term_column), row.get(value_column))
        else {
            warn!(source = %source, ?row, "row too short");
            return None;
        };
        let term = self.term_or_skip(term_cell)?;
        let value = self.rate_or_skip(value_cell, term)?;

        let mut builder =
            CanonicalRecord::builder(source, self.config.kind, term, value, observed_at);
        if let Some(cell) = changed_on_column.and_then(|c| row.get(c)) {
            match parse_date(cell, self.year_pivot) {
                Ok(date) => builder = builder.changed_on(date),
                Err(e) => warn!(source = %source, %term, error = %e, "ignoring change date"),
            }
        }
        self.finish(builder)
    }

    fn month_rows(
        &self,
        table: &ParsedTable,
        month_column: usize,
        observed_at: DateTime<Utc>,
    ) -> Vec<CanonicalRecord> {
        let source = &self.config.source;
        let terms: Vec<(usize, Term)> = table
            .header()
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != month_column)
            .filter_map(|(i, label)| self.term_or_skip(label).map(|t| (i, t)))
            .collect();
        if terms.is_empty() {
            warn!(source = %source, header = ?table.header(), "no term columns in header");
            return Vec::new();
        }

        let today = observed_at.date_naive();
        let mut records = Vec::new();
        for row in table.rows() {
            let Some(month_cell) = row.get(month_column) else {
                warn!(source = %source, ?row, "row without month cell");
                continue;
            };
            let month = match parse_month(month_cell, today) {
                Ok(m) => m,
                Err(e) => {
                    // repeated header rows inside the body are not worth a warning
                    if let Err(TermError::HeaderRow(_)) = parse_term(month_cell) {
                        debug!(source = %source, cell = %month_cell, "skipping header row");
                    } else {
                        warn!(source = %source, error = %e, "skipping row");
                    }
                    continue;
                }
            };
            for &(col, term) in &terms {
                let Some(cell) = row.get(col) else { continue };
                let Some(value) = self.rate_or_skip(cell, term) else {
                    continue;
                };
                let builder =
                    CanonicalRecord::builder(source, self.config.kind, term, value, observed_at)
                        .reference_month(month);
                records.extend(self.finish(builder));
            }
        }
        records
    }

    fn term_or_skip(&self, cell: &str) -> Option<Term> {
        match parse_term(cell) {
            Ok(term) => Some(term),
            Err(TermError::HeaderRow(label)) => {
                debug!(source = %self.config.source, %label, "header label");
                None
            }
            Err(e) => {
                warn!(source = %self.config.source, error = %e, "skipping cell");
                None
            }
        }
    }

    fn rate_or_skip(&self, cell: &str, term: Term) -> Option<f64> {
        match parse_rate(cell) {
            Ok(v) => Some(v),
            Err(RateError::NoData(_)) => {
                debug!(source = %self.config.source, %term, "no rate published");
                None
            }
            Err(e) => {
                warn!(source = %self.config.source, %term, error = %e, "skipping cell");
                None
            }
        }
    }

    fn finish(&self, mut builder: RecordBuilder) -> Option<CanonicalRecord> {
        if let Some(RatioBounds { min, max }) = self.config.ratio_bounds {
            builder = builder.ratio_bounds(min, max);
        }
        if self.config.group_discount {
            builder = builder.group_discount(true);
        }
        builder
            .build()
            .map_err(|e| warn!(source = %self.config.source, error = %e, "invalid record"))
            .ok()
    }
}

#[async_trait]
impl Adapter for TableAdapter {
    fn source(&self) -> &str {
        &self.config.source
    }

    #[instrument(level = "info", skip(self, sink), fields(source = %self.config.source))]
    async fn run(&self, sink: Sink) -> anyhow::Result<()> {
        let records = self
            .extract(sink.observed_at())
            .await
            .with_context(|| format!("extracting {}", self.config.url))?;
        if records.is_empty() {
            warn!("table located but no usable rows");
        }
        for record in records {
            if !sink.emit(record).await {
                warn!("sink closed, dropping remaining records");
                break;
            }
        }
        Ok(())
    }
}
