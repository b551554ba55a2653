//! Streaming CSV selection.
//!
//! # Responsibilities
//! - Split the body into records with `csv-core`, across chunk boundaries
//! - Map header titles onto raw row keys (BOM stripped from the header only)
//! - Prefilter record text, filter parsed rows, skip `offset` matches, keep `size`
//! - Stop reading as soon as `size` rows are collected
//!
//! # States
//! ```text
//! AwaitingHeader ──first non-blank record──▶ ParsingRows ──size reached──▶ EarlyStop
//!                                                        └──end of body──▶ StreamExhausted
//! ```

use std::collections::HashMap;

use csv_core::ReadRecordResult;
use futures_util::StreamExt;

use crate::dataset::headers::header_key;
use crate::dataset::{normalize, DatasetKind, LineFilter, RawRow, RowFilter};
use crate::upstream::client::{BodyStream, UpstreamClient, UpstreamRequest};
use crate::upstream::error::{snippet, FetchError};

/// What to select from a CSV body.
#[derive(Debug, Clone)]
pub struct CsvPlan {
    pub kind: DatasetKind,
    pub size: usize,
    pub offset: u64,
    pub line_filter: LineFilter,
    pub row_filter: RowFilter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CsvState {
    AwaitingHeader,
    ParsingRows,
}

/// Whether the reader should keep going after a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

/// How reading ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamOutcome {
    /// `size` rows were collected; the rest of the body was not read.
    EarlyStop,
    /// The body ended first; fewer than `size` rows may have been collected.
    StreamExhausted,
}

/// Rows selected from one CSV body.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub rows: Vec<RawRow>,
    pub outcome: StreamOutcome,
}

/// Incremental record splitter. Quoted fields may span chunks and lines.
struct RecordReader {
    core: csv_core::Reader,
    output: Vec<u8>,
    output_len: usize,
    ends: Vec<usize>,
    ends_len: usize,
}

impl RecordReader {
    fn new() -> Self {
        Self {
            core: csv_core::Reader::new(),
            output: vec![0; 4096],
            output_len: 0,
            ends: vec![0; 32],
            ends_len: 0,
        }
    }

    /// Feed one chunk; an empty `input` marks the end of the body.
    fn feed<F>(&mut self, mut input: &[u8], on_record: &mut F) -> Flow
    where
        F: FnMut(Vec<String>) -> Flow,
    {
        loop {
            let (result, nin, nout, nend) = self.core.read_record(
                input,
                &mut self.output[self.output_len..],
                &mut self.ends[self.ends_len..],
            );
            input = &input[nin..];
            self.output_len += nout;
            self.ends_len += nend;

            match result {
                ReadRecordResult::InputEmpty | ReadRecordResult::End => return Flow::Continue,
                ReadRecordResult::OutputFull => {
                    let grown = self.output.len() * 2;
                    self.output.resize(grown, 0);
                }
                ReadRecordResult::OutputEndsFull => {
                    let grown = self.ends.len() * 2;
                    self.ends.resize(grown, 0);
                }
                ReadRecordResult::Record => {
                    let fields = self.take_fields();
                    if on_record(fields) == Flow::Stop {
                        return Flow::Stop;
                    }
                }
            }
        }
    }

    fn take_fields(&mut self) -> Vec<String> {
        let mut start = 0;
        let fields = self.ends[..self.ends_len]
            .iter()
            .map(|&end| {
                let field = String::from_utf8_lossy(&self.output[start..end]).into_owned();
                start = end;
                field
            })
            .collect();
        self.output_len = 0;
        self.ends_len = 0;
        fields
    }
}

/// Record-at-a-time selector. Feed it records with `push_record`.
#[derive(Debug)]
pub struct CsvSelector {
    plan: CsvPlan,
    state: CsvState,
    headers: Vec<String>,
    skipped: u64,
    rows: Vec<RawRow>,
}

impl CsvSelector {
    pub fn new(plan: CsvPlan) -> Self {
        Self {
            rows: Vec::with_capacity(plan.size.min(64)),
            plan,
            state: CsvState::AwaitingHeader,
            headers: Vec::new(),
            skipped: 0,
        }
    }

    pub fn push_record(&mut self, mut fields: Vec<String>) -> Flow {
        if fields.iter().all(|f| f.trim().is_empty()) {
            return Flow::Continue;
        }

        if self.state == CsvState::AwaitingHeader {
            if let Some(first) = fields.first_mut() {
                if let Some(stripped) = first.strip_prefix('\u{feff}') {
                    *first = stripped.to_string();
                }
            }
            self.headers = fields
                .iter()
                .map(|title| header_key(self.plan.kind, title))
                .collect();
            self.state = CsvState::ParsingRows;
            return Flow::Continue;
        }

        if !self.plan.line_filter.accepts(&fields.join(",")) {
            return Flow::Continue;
        }

        let row = RawRow::Csv(record(&self.headers, fields));
        if !self.plan.row_filter.is_empty()
            && !self.plan.row_filter.matches(&normalize(&row, self.plan.kind))
        {
            return Flow::Continue;
        }

        if self.skipped < self.plan.offset {
            self.skipped += 1;
            return Flow::Continue;
        }

        self.rows.push(row);
        if self.rows.len() >= self.plan.size {
            Flow::Stop
        } else {
            Flow::Continue
        }
    }

    pub fn finish(self, outcome: StreamOutcome) -> Selection {
        Selection {
            rows: self.rows,
            outcome,
        }
    }
}

/// Zip header keys with fields. Missing trailing fields are absent; extra
/// fields are dropped. When two titles map to one key the first non-empty
/// value is kept.
fn record(headers: &[String], fields: Vec<String>) -> HashMap<String, String> {
    let mut map: HashMap<String, String> = HashMap::with_capacity(headers.len());
    for (key, value) in headers.iter().zip(fields) {
        match map.get(key) {
            Some(existing) if !existing.is_empty() => {}
            _ => {
                map.insert(key.clone(), value);
            }
        }
    }
    map
}

/// Read a body record by record into the selector. The body is dropped,
/// and the upstream connection with it, as soon as the selector stops.
pub async fn select_rows(mut body: BodyStream, mut selector: CsvSelector) -> Result<Selection, FetchError> {
    let mut reader = RecordReader::new();
    let mut push = |fields: Vec<String>| selector.push_record(fields);

    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(|e| FetchError::Stream(e.to_string()))?;
        if chunk.is_empty() {
            continue;
        }
        if reader.feed(&chunk, &mut push) == Flow::Stop {
            drop(body);
            return Ok(selector.finish(StreamOutcome::EarlyStop));
        }
    }

    let outcome = match reader.feed(&[], &mut push) {
        Flow::Stop => StreamOutcome::EarlyStop,
        Flow::Continue => StreamOutcome::StreamExhausted,
    };
    Ok(selector.finish(outcome))
}

/// GET a CSV download and select rows from it.
pub async fn fetch_csv_rows(
    client: &dyn UpstreamClient,
    url: &str,
    plan: CsvPlan,
    snippet_chars: usize,
) -> Result<Selection, FetchError> {
    let request = UpstreamRequest::get(url).with_header("accept", "text/csv");
    let response = client.get(request).await?;
    if !response.is_success() {
        let status = response.status;
        let text = response.text().await?;
        return Err(FetchError::Status {
            status,
            snippet: snippet(&text, snippet_chars),
        });
    }
    select_rows(response.body, CsvSelector::new(plan)).await
}
