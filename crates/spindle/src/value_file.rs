//! Line-oriented value files: the intermediate storage format for columns.
//!
//! A raw value file holds one tagged line per source field. A sorted value
//! file alternates a tagged value line with a decimal occurrence-count line,
//! forming a run-length encoded stream of distinct values.

use std::cmp::Ordering;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Lines, Write};
use std::path::{Path, PathBuf};

use crate::error::{Result, SpindleError};

/// Tag byte for a text value line.
const TAG_TEXT: char = 'v';
/// Tag byte for a null marker line.
const TAG_NULL: char = 'n';
/// Sentinel that replaces embedded newlines inside a value.
const NEWLINE_SENTINEL: char = '\0';

/// A single column value: either text or the null marker.
///
/// The ordering is byte-lexicographic on text, with null sorting after every
/// text value. This is the ordering the sort and discovery phases rely on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldValue {
    Text(String),
    Null,
}

impl FieldValue {
    /// Encode this value as one tagged line (without the trailing newline).
    fn encode(&self) -> String {
        match self {
            FieldValue::Text(text) => {
                let mut line = String::with_capacity(text.len() + 1);
                line.push(TAG_TEXT);
                for ch in text.chars() {
                    line.push(if ch == '\n' { NEWLINE_SENTINEL } else { ch });
                }
                line
            }
            FieldValue::Null => TAG_NULL.to_string(),
        }
    }

    /// Decode a tagged line back into a value.
    fn decode(line: &str, path: &Path) -> Result<Self> {
        let mut chars = line.chars();
        match chars.next() {
            Some(TAG_TEXT) => {
                let rest = &line[TAG_TEXT.len_utf8()..];
                let text = rest
                    .chars()
                    .map(|ch| if ch == NEWLINE_SENTINEL { '\n' } else { ch })
                    .collect();
                Ok(FieldValue::Text(text))
            }
            Some(TAG_NULL) if chars.next().is_none() => Ok(FieldValue::Null),
            _ => Err(SpindleError::Corrupt {
                path: path.to_path_buf(),
                message: format!("unrecognized value line: {line:?}"),
            }),
        }
    }
}

impl Ord for FieldValue {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (FieldValue::Text(a), FieldValue::Text(b)) => a.as_bytes().cmp(b.as_bytes()),
            (FieldValue::Text(_), FieldValue::Null) => Ordering::Less,
            (FieldValue::Null, FieldValue::Text(_)) => Ordering::Greater,
            (FieldValue::Null, FieldValue::Null) => Ordering::Equal,
        }
    }
}

impl PartialOrd for FieldValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Appends raw values to a column's value file during ingestion.
pub struct ValueWriter {
    path: PathBuf,
    inner: BufWriter<File>,
}

impl ValueWriter {
    pub fn create(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let file = File::create(&path).map_err(|e| SpindleError::io(&path, e))?;
        Ok(Self {
            path,
            inner: BufWriter::new(file),
        })
    }

    pub fn append(&mut self, value: &FieldValue) -> Result<()> {
        writeln!(self.inner, "{}", value.encode()).map_err(|e| SpindleError::io(&self.path, e))
    }

    pub fn finish(mut self) -> Result<()> {
        self.inner
            .flush()
            .map_err(|e| SpindleError::io(&self.path, e))
    }
}

/// Streams raw (unsorted, uncounted) values back out of a value file.
pub struct ValueReader {
    path: PathBuf,
    lines: Lines<BufReader<File>>,
}

impl ValueReader {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let file = File::open(&path).map_err(|e| SpindleError::io(&path, e))?;
        Ok(Self {
            lines: BufReader::new(file).lines(),
            path,
        })
    }

    pub fn next_value(&mut self) -> Result<Option<FieldValue>> {
        match self.lines.next() {
            None => Ok(None),
            Some(line) => {
                let line = line.map_err(|e| SpindleError::io(&self.path, e))?;
                FieldValue::decode(&line, &self.path).map(Some)
            }
        }
    }
}

/// Writes a sorted run-length encoded value file.
pub struct RunWriter {
    path: PathBuf,
    inner: BufWriter<File>,
}

impl RunWriter {
    pub fn create(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let file = File::create(&path).map_err(|e| SpindleError::io(&path, e))?;
        Ok(Self {
            path,
            inner: BufWriter::new(file),
        })
    }

    pub fn write_run(&mut self, value: &FieldValue, count: u64) -> Result<()> {
        writeln!(self.inner, "{}\n{}", value.encode(), count)
            .map_err(|e| SpindleError::io(&self.path, e))
    }

    pub fn finish(mut self) -> Result<()> {
        self.inner
            .flush()
            .map_err(|e| SpindleError::io(&self.path, e))
    }
}

/// Forward-only cursor over a sorted run-length encoded value file.
pub struct RunReader {
    path: PathBuf,
    lines: Lines<BufReader<File>>,
}

impl RunReader {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let file = File::open(&path).map_err(|e| SpindleError::io(&path, e))?;
        Ok(Self {
            lines: BufReader::new(file).lines(),
            path,
        })
    }

    /// Pull the next (value, occurrence count) run, or `None` at end of file.
    ///
    /// A value line without its count line means the file was truncated.
    pub fn next_run(&mut self) -> Result<Option<(FieldValue, u64)>> {
        let value_line = match self.lines.next() {
            None => return Ok(None),
            Some(line) => line.map_err(|e| SpindleError::io(&self.path, e))?,
        };
        let value = FieldValue::decode(&value_line, &self.path)?;

        let count_line = self.lines.next().ok_or_else(|| SpindleError::Corrupt {
            path: self.path.clone(),
            message: "value line without occurrence count".to_string(),
        })?;
        let count_line = count_line.map_err(|e| SpindleError::io(&self.path, e))?;
        let count: u64 = count_line.parse().map_err(|_| SpindleError::Corrupt {
            path: self.path.clone(),
            message: format!("invalid occurrence count: {count_line:?}"),
        })?;

        Ok(Some((value, count)))
    }
}
