//! Readers for the `;`-delimited source files.
//!
//! A [`RecordSource`] yields the records of one file, after its header line, as
//! [`SourceRecord`]s tagged with their line number. A [`SourceCatalog`] knows where the source for
//! each [`Entity`] lives.

use crate::error::ImportError;
use crate::mapping::Entity;
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Cursor, Read};
use std::path::PathBuf;

/// The field delimiter used by every source file.
pub const DELIMITER: u8 = b';';

/// One data record of a source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRecord {
    /// 1-based line number in the source file (the header is line 1).
    pub line: u64,
    pub fields: Vec<String>,
}

/// A record that could not be read at all.
#[derive(Debug)]
pub enum ReadError {
    /// The record is unreadable but the following records can still be read.
    Record { line: u64, reason: String },
    /// The underlying reader failed; nothing more can be read.
    Io(io::Error),
}

/// A lazy, finite, non-restartable sequence of records from one source.
pub trait RecordSource: Iterator<Item = Result<SourceRecord, ReadError>> {
    /// The name of the source, used when reporting failures.
    fn name(&self) -> &str;
}

/// Record source over any reader of `;`-delimited text with a header line.
pub struct CsvSource<R> {
    name: String,
    records: csv::StringRecordsIntoIter<R>,
}

impl<R: Read> CsvSource<R> {
    pub fn new(name: impl Into<String>, reader: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .delimiter(DELIMITER)
            .quoting(false)
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        Self {
            name: name.into(),
            records: reader.into_records(),
        }
    }
}

impl CsvSource<File> {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ImportError> {
        let path = path.into();
        let file = File::open(&path).map_err(|source| ImportError::OpenSource {
            path: path.clone(),
            source,
        })?;

        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        Ok(Self::new(name, file))
    }
}

impl<R: Read> Iterator for CsvSource<R> {
    type Item = Result<SourceRecord, ReadError>;

    fn next(&mut self) -> Option<Self::Item> {
        let result = self.records.next()?;

        Some(match result {
            Ok(record) => Ok(SourceRecord {
                line: record.position().map_or(0, |pos| pos.line()),
                fields: record.iter().map(str::to_string).collect(),
            }),
            Err(err) => {
                let line = err.position().map_or(0, |pos| pos.line());
                let reason = err.to_string();
                match err.into_kind() {
                    csv::ErrorKind::Io(io_err) => Err(ReadError::Io(io_err)),
                    _ => Err(ReadError::Record { line, reason }),
                }
            }
        })
    }
}

impl<R: Read> RecordSource for CsvSource<R> {
    fn name(&self) -> &str {
        &self.name
    }
}

/// Opens the record source for each entity.
pub trait SourceCatalog {
    type Source: RecordSource;

    fn open(&self, entity: Entity) -> Result<Self::Source, ImportError>;
}

/// Sources read from the fixed file names inside one directory.
#[derive(Debug, Clone)]
pub struct DirectoryCatalog {
    dir: PathBuf,
}

impl DirectoryCatalog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_of(&self, entity: Entity) -> PathBuf {
        self.dir.join(entity.source_file())
    }
}

impl SourceCatalog for DirectoryCatalog {
    type Source = CsvSource<File>;

    fn open(&self, entity: Entity) -> Result<Self::Source, ImportError> {
        CsvSource::open(self.path_of(entity))
    }
}

/// Sources held in memory, keyed by entity. Entities without registered text have no source.
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    files: HashMap<Entity, String>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the full text (header included) of an entity's source.
    pub fn with(mut self, entity: Entity, contents: impl Into<String>) -> Self {
        self.files.insert(entity, contents.into());
        self
    }

    pub fn insert(&mut self, entity: Entity, contents: impl Into<String>) {
        self.files.insert(entity, contents.into());
    }
}

impl SourceCatalog for MemoryCatalog {
    type Source = CsvSource<Cursor<Vec<u8>>>;

    fn open(&self, entity: Entity) -> Result<Self::Source, ImportError> {
        let contents = self
            .files
            .get(&entity)
            .ok_or(ImportError::MissingSource(entity.source_file()))?;

        Ok(CsvSource::new(
            entity.source_file(),
            Cursor::new(contents.clone().into_bytes()),
        ))
    }
}
