// CSV serialization of history
// Values containing a comma, quote, or line break are quoted with internal quotes doubled,
// so parsing the export reproduces every field exactly

use std::borrow::Cow;

use thiserror::Error;

use crate::types::{ActionId, HistoryRecord};

pub const HEADERS: [&str; 6] = ["Timestamp", "Action", "Input", "Output", "Tone", "Language"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CsvError {
    #[error("unterminated quoted field starting on line {0}")]
    UnterminatedQuote(usize),

    #[error("unexpected quote on line {0}")]
    StrayQuote(usize),

    #[error("header does not match: expected {expected}")]
    BadHeader { expected: String },

    #[error("row {row} has {found} fields, expected {expected}")]
    FieldCount {
        row: usize,
        found: usize,
        expected: usize,
    },
}

/// Quote a single value if it needs it
pub fn escape_field(value: &str) -> Cow<'_, str> {
    if value.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", value.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(value)
    }
}

/// Render records (in the given order) as CSV with a header row
pub fn history_to_csv(records: &[HistoryRecord]) -> String {
    let mut lines = Vec::with_capacity(records.len() + 1);
    lines.push(HEADERS.join(","));

    for record in records {
        let fields = [
            record.timestamp.as_str(),
            record.action.as_str(),
            record.input.as_str(),
            record.output.as_str(),
            record.tone.as_str(),
            record.language.as_str(),
        ];
        let row: Vec<Cow<'_, str>> = fields.iter().map(|f| escape_field(f)).collect();
        lines.push(row.join(","));
    }

    lines.join("\n")
}

/// Split CSV text into rows of unescaped fields
pub fn parse_csv(text: &str) -> Result<Vec<Vec<String>>, CsvError> {
    let mut rows = Vec::new();
    let mut row = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut line = 1;
    let mut quote_line = 1;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                '\n' => {
                    line += 1;
                    field.push(c);
                }
                _ => field.push(c),
            }
            continue;
        }

        match c {
            '"' if field.is_empty() => {
                in_quotes = true;
                quote_line = line;
            }
            '"' => return Err(CsvError::StrayQuote(line)),
            ',' => row.push(std::mem::take(&mut field)),
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => {
                row.push(std::mem::take(&mut field));
                rows.push(std::mem::take(&mut row));
                line += 1;
            }
            _ => field.push(c),
        }
    }

    if in_quotes {
        return Err(CsvError::UnterminatedQuote(quote_line));
    }
    if !field.is_empty() || !row.is_empty() {
        row.push(field);
        rows.push(row);
    }

    Ok(rows)
}

/// Read back an export produced by [`history_to_csv`]
///
/// Ids are not part of the export; they are re-derived from the timestamp.
pub fn parse_history_csv(text: &str) -> Result<Vec<HistoryRecord>, CsvError> {
    let mut rows = parse_csv(text)?.into_iter();

    match rows.next() {
        Some(header) if header.iter().map(String::as_str).eq(HEADERS) => {}
        None => return Ok(Vec::new()),
        Some(_) => {
            return Err(CsvError::BadHeader {
                expected: HEADERS.join(","),
            })
        }
    }

    rows.enumerate()
        .map(|(idx, row)| {
            let [timestamp, action, input, output, tone, language]: [String; 6] =
                row.try_into().map_err(|row: Vec<String>| CsvError::FieldCount {
                    row: idx + 2,
                    found: row.len(),
                    expected: HEADERS.len(),
                })?;

            let id = chrono::DateTime::parse_from_rfc3339(&timestamp)
                .map(|t| t.timestamp_millis())
                .unwrap_or(idx as i64);

            Ok(HistoryRecord {
                id,
                timestamp,
                input,
                output,
                action: ActionId::from(action),
                tone,
                language,
            })
        })
        .collect()
}
