//! Record writer supporting JSON Lines and human-readable modes.

use crate::backend::{BackendError, DenylistEntry, IndexRecord, Outcome};
use crate::core::{AggregatedRecord, BackendOutcomes, Identifier, ParseError};
use serde::Serialize;
use std::borrow::Cow;
use std::io::{self, Write};

/// Output mode for CLI results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    Json,
}

/// Per-backend status in JSON output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Status {
    Found,
    NotFound,
    Error,
}

impl<T> From<&Outcome<T>> for Status {
    fn from(outcome: &Outcome<T>) -> Self {
        match outcome {
            Outcome::Found(_) => Status::Found,
            Outcome::NotFound => Status::NotFound,
            Outcome::Error(_) => Status::Error,
        }
    }
}

/// JSON shape of one aggregated record
#[derive(Debug, Serialize)]
pub struct RecordJson<'a> {
    pub cid: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub denylist: Option<DenylistJson<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dudewhere: Option<ListJson<'a, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dynamo: Option<ListJson<'a, IndexRecord>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DenylistJson<'a> {
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_deny_list: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ListJson<'a, T: Clone + Serialize> {
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Cow<'a, [T]>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<'a, T: Clone + Serialize> From<&'a Outcome<Vec<T>>> for ListJson<'a, T> {
    fn from(outcome: &'a Outcome<Vec<T>>) -> Self {
        let (value, error) = match outcome {
            Outcome::Found(items) => (Some(Cow::Borrowed(items.as_slice())), None),
            Outcome::NotFound => (Some(Cow::Owned(Vec::new())), None),
            Outcome::Error(err) => (None, Some(err.to_string())),
        };
        Self {
            status: Status::from(outcome),
            value,
            error,
        }
    }
}

impl<'a> DenylistJson<'a> {
    /// `queried` is the URL asked, reported with an absent answer
    pub fn new(outcome: &'a Outcome<DenylistEntry>, queried: Option<&'a str>) -> Self {
        let status = Status::from(outcome);
        match outcome {
            Outcome::Found(entry) => Self {
                status,
                on_deny_list: Some(true),
                url: Some(entry.url.as_str()),
                error: None,
            },
            Outcome::NotFound => Self {
                status,
                on_deny_list: Some(false),
                url: queried,
                error: None,
            },
            Outcome::Error(err) => Self {
                status,
                on_deny_list: None,
                url: None,
                error: Some(err.to_string()),
            },
        }
    }
}

impl<'a> RecordJson<'a> {
    pub fn new(record: &'a AggregatedRecord) -> Self {
        match &record.outcome {
            Err(e) => Self {
                cid: &record.input,
                error: Some(e.to_string()),
                denylist: None,
                dudewhere: None,
                dynamo: None,
            },
            Ok(outcomes) => Self {
                cid: &record.input,
                error: None,
                denylist: outcomes
                    .denylist
                    .as_ref()
                    .map(|o| DenylistJson::new(o, outcomes.denylist_url.as_deref())),
                dudewhere: outcomes.dudewhere.as_ref().map(ListJson::from),
                dynamo: outcomes.index.as_ref().map(ListJson::from),
            },
        }
    }
}

/// JSON shape of one `mh` result
#[derive(Debug, Serialize)]
struct MultihashJson<'a> {
    cid: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    multihash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Writes records to `out`, one line (JSON) or one block (human) each
#[derive(Debug)]
pub struct OutputWriter<W: Write> {
    pub mode: OutputMode,
    out: W,
}

impl OutputWriter<io::Stdout> {
    /// Writer on the process stdout
    pub fn stdout(json: bool) -> Self {
        Self::new(io::stdout(), json)
    }
}

impl<W: Write> OutputWriter<W> {
    pub fn new(out: W, json: bool) -> Self {
        Self {
            mode: if json { OutputMode::Json } else { OutputMode::Human },
            out,
        }
    }

    /// Print one aggregated record
    pub fn record(&mut self, record: &AggregatedRecord) -> io::Result<()> {
        match self.mode {
            OutputMode::Json => {
                serde_json::to_writer(&mut self.out, &RecordJson::new(record))?;
                writeln!(self.out)
            }
            OutputMode::Human => {
                let block = render_human(record);
                writeln!(self.out, "{}", block)
            }
        }?;
        self.out.flush()
    }

    /// Print a group of records; JSON mode emits one array per group
    pub fn batch(&mut self, records: &[AggregatedRecord]) -> io::Result<()> {
        match self.mode {
            OutputMode::Json => {
                let rows: Vec<RecordJson<'_>> = records.iter().map(RecordJson::new).collect();
                serde_json::to_writer(&mut self.out, &rows)?;
                writeln!(self.out)?;
                self.out.flush()
            }
            OutputMode::Human => records.iter().try_for_each(|r| self.record(r)),
        }
    }

    /// Print the base58btc multihash for one input
    pub fn multihash(
        &mut self,
        input: &str,
        parsed: &Result<Identifier, ParseError>,
    ) -> io::Result<()> {
        match (self.mode, parsed) {
            (OutputMode::Json, _) => {
                let row = MultihashJson {
                    cid: input,
                    multihash: parsed.as_ref().ok().map(Identifier::base58_multihash),
                    error: parsed.as_ref().err().map(ToString::to_string),
                };
                serde_json::to_writer(&mut self.out, &row)?;
                writeln!(self.out)
            }
            (OutputMode::Human, Ok(id)) => writeln!(self.out, "{}", id.base58_multihash()),
            (OutputMode::Human, Err(e)) => writeln!(self.out, "\u{26a0}\u{fe0f} {}", e),
        }?;
        self.out.flush()
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

/// CAR segment of a dudewhere key (`{root}/{car}`)
pub fn car_segment(key: &str) -> &str {
    key.split('/').nth(1).unwrap_or(key)
}

/// Human-readable block for one record
pub fn render_human(record: &AggregatedRecord) -> String {
    let outcomes = match &record.outcome {
        Ok(outcomes) => outcomes,
        Err(e) => return format!("{}\n\u{26a0}\u{fe0f} {}", record.input, e),
    };

    let mut lines = vec![record.input.clone()];
    render_outcomes(outcomes, &mut lines);
    lines.join("\n")
}

fn render_outcomes(outcomes: &BackendOutcomes, lines: &mut Vec<String>) {
    match &outcomes.denylist {
        Some(Outcome::Found(_)) => lines.push("\u{274c} blocked. cid found on denylist".to_string()),
        Some(Outcome::NotFound) => lines.push("\u{1f7e2} ok. cid not on denylist".to_string()),
        Some(Outcome::Error(err)) => lines.push(error_line(err)),
        None => {}
    }

    match &outcomes.dudewhere {
        Some(Outcome::Found(keys)) => {
            lines.extend(keys.iter().map(|k| format!("\u{1f698} {}", car_segment(k))))
        }
        Some(Outcome::NotFound) => lines.push("\u{1f698} missing dudewhere mapping".to_string()),
        Some(Outcome::Error(err)) => lines.push(error_line(err)),
        None => {}
    }

    match &outcomes.index {
        Some(Outcome::Found(rows)) => lines.extend(rows.iter().map(|row| {
            format!(
                "\u{2139}\u{fe0f}  {}",
                serde_json::to_string(row).unwrap_or_default()
            )
        })),
        Some(Outcome::NotFound) => lines.push(format!(
            "\u{2139}\u{fe0f} no block index for {}",
            outcomes.identifier.base58_multihash()
        )),
        Some(Outcome::Error(err)) => lines.push(error_line(err)),
        None => {}
    }
}

fn error_line(err: &BackendError) -> String {
    format!("\u{26a0}\u{fe0f} {}", err)
}
