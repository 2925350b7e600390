//! The reload pipeline: clears every table and bulk-loads all nine sources in dependency order.
//!
//! The whole reload runs in one transaction. Rows that are malformed or that the database rejects
//! for a constraint are skipped and recorded in the [`ImportReport`] with their source line;
//! anything else aborts the reload and rolls it back, leaving the tables as they were.

use crate::config::AttemptHistory;
use crate::error::ImportError;
use crate::mapping::{Entity, EntityMapping, Value};
use crate::schema;
use crate::source::{ReadError, RecordSource, SourceCatalog};
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel::sql_types::{Date, Integer, Nullable, Text};
use diesel::sqlite::Sqlite;
use std::fmt;
use tracing::{debug, info, info_span, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportOptions {
    pub attempt_history: AttemptHistory,
}

/// Why a row was skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The record could not be read or mapped to typed columns.
    Malformed,
    /// The row references a parent row that does not exist.
    Referential,
    /// The row's key is already taken.
    Duplicate,
    /// Any other constraint the row violates.
    Constraint,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureKind::Malformed => "malformed",
            FailureKind::Referential => "referential",
            FailureKind::Duplicate => "duplicate",
            FailureKind::Constraint => "constraint",
        };
        f.write_str(name)
    }
}

/// A skipped source row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowFailure {
    pub line: u64,
    pub kind: FailureKind,
    pub message: String,
}

/// The outcome of loading one source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceReport {
    pub entity: Entity,
    pub source: String,
    pub loaded: usize,
    pub failures: Vec<RowFailure>,
}

impl SourceReport {
    fn new(entity: Entity, source: &str) -> Self {
        Self {
            entity,
            source: source.to_string(),
            loaded: 0,
            failures: Vec::new(),
        }
    }

    pub fn skipped(&self) -> usize {
        self.failures.len()
    }

    fn fail(&mut self, line: u64, kind: FailureKind, message: String) {
        warn!(source = %self.source, line, %kind, "skipping row: {message}");
        self.failures.push(RowFailure {
            line,
            kind,
            message,
        });
    }
}

/// The outcome of a whole reload, one entry per source in load order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub sources: Vec<SourceReport>,
}

impl ImportReport {
    pub fn source(&self, entity: Entity) -> Option<&SourceReport> {
        self.sources.iter().find(|report| report.entity == entity)
    }

    pub fn loaded(&self) -> usize {
        self.sources.iter().map(|report| report.loaded).sum()
    }

    pub fn skipped(&self) -> usize {
        self.sources.iter().map(SourceReport::skipped).sum()
    }

    pub fn is_clean(&self) -> bool {
        self.skipped() == 0
    }
}

/// Replaces the contents of every table with the records of `catalog`'s sources.
pub fn reload<C: SourceCatalog>(
    conn: &mut SqliteConnection,
    catalog: &C,
    options: ImportOptions,
) -> Result<ImportReport, ImportError> {
    let _span = info_span!("reload").entered();

    let report = conn.transaction::<_, ImportError, _>(|conn| {
        check_performance_key(conn, options.attempt_history)?;

        for entity in Entity::LOAD_ORDER.iter().rev() {
            let deleted = clear_table(conn, *entity)?;
            debug!(table = entity.table(), deleted, "cleared table");
        }

        let mut report = ImportReport::default();
        for entity in Entity::LOAD_ORDER {
            let source = catalog.open(entity)?;
            report
                .sources
                .push(load_source(conn, entity.mapping(), source, options)?);
        }

        Ok(report)
    })?;

    info!(
        loaded = report.loaded(),
        skipped = report.skipped(),
        "reload complete"
    );
    Ok(report)
}

#[derive(QueryableByName)]
struct KeyColumn {
    #[diesel(sql_type = Text)]
    name: String,
}

/// Fails if `academic_performance` was created for a different attempt history than `history`.
fn check_performance_key(
    conn: &mut SqliteConnection,
    history: AttemptHistory,
) -> Result<(), ImportError> {
    let found: Vec<String> = diesel::sql_query(
        "SELECT name FROM pragma_table_info('academic_performance') WHERE pk > 0 ORDER BY pk",
    )
    .load::<KeyColumn>(conn)?
    .into_iter()
    .map(|column| column.name)
    .collect();

    // A missing table is reported by the first statement that touches it.
    if found.is_empty() || found == history.key_columns() {
        return Ok(());
    }

    Err(ImportError::AttemptHistoryMismatch {
        configured: history,
        expected: history.key_columns().join(", "),
        found: found.join(", "),
    })
}

fn clear_table(conn: &mut SqliteConnection, entity: Entity) -> QueryResult<usize> {
    match entity {
        Entity::Department => diesel::delete(schema::department::table).execute(conn),
        Entity::Direction => diesel::delete(schema::direction::table).execute(conn),
        Entity::Qualification => diesel::delete(schema::qualification::table).execute(conn),
        Entity::Curriculum => diesel::delete(schema::curriculum::table).execute(conn),
        Entity::AcademicGroup => diesel::delete(schema::acad_group::table).execute(conn),
        Entity::Subject => diesel::delete(schema::subject::table).execute(conn),
        Entity::Student => diesel::delete(schema::student::table).execute(conn),
        Entity::CurriculumSubject => {
            diesel::delete(schema::curriculum_subject::table).execute(conn)
        }
        Entity::AcademicPerformance => {
            diesel::delete(schema::academic_performance::table).execute(conn)
        }
    }
}

fn load_source<S: RecordSource>(
    conn: &mut SqliteConnection,
    mapping: &EntityMapping,
    source: S,
    options: ImportOptions,
) -> Result<SourceReport, ImportError> {
    let _span = info_span!("load", table = mapping.table).entered();

    let sql = insert_statement(mapping, options.attempt_history);
    let mut report = SourceReport::new(mapping.entity, source.name());
    let mut last_line = 1;

    for record in source {
        let record = match record {
            Ok(record) => record,
            Err(ReadError::Record { line, reason }) => {
                last_line = line;
                report.fail(line, FailureKind::Malformed, reason);
                continue;
            }
            Err(ReadError::Io(err)) => {
                return Err(ImportError::ReadSource {
                    source_name: report.source,
                    line: last_line + 1,
                    reason: err.to_string(),
                });
            }
        };
        last_line = record.line;

        let values = match mapping.parse_record(&record.fields) {
            Ok(values) => values,
            Err(err) => {
                report.fail(record.line, FailureKind::Malformed, err.to_string());
                continue;
            }
        };

        match insert_row(conn, &sql, values) {
            Ok(_) => report.loaded += 1,
            Err(err) => match rejection_kind(&err) {
                Some(kind) => report.fail(record.line, kind, err.to_string()),
                None => return Err(err.into()),
            },
        }
    }

    info!(
        source = %report.source,
        loaded = report.loaded,
        skipped = report.skipped(),
        "loaded source"
    );
    Ok(report)
}

/// Builds the parameterized insert for `mapping`'s columns.
pub fn insert_statement(mapping: &EntityMapping, history: AttemptHistory) -> String {
    let columns: Vec<&str> = mapping.columns().collect();
    let placeholders = vec!["?"; columns.len()].join(", ");

    let mut sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        mapping.table,
        columns.join(", "),
        placeholders
    );

    // The latest imported attempt for a student and subject replaces the earlier one.
    if mapping.entity == Entity::AcademicPerformance && history == AttemptHistory::Latest {
        sql.push_str(
            " ON CONFLICT (student_id, curriculum_subject_id) \
             DO UPDATE SET score = excluded.score, attempt = excluded.attempt",
        );
    }

    sql
}

fn insert_row(conn: &mut SqliteConnection, sql: &str, values: Vec<Value>) -> QueryResult<usize> {
    let mut query = diesel::sql_query(sql).into_boxed::<Sqlite>();

    for value in values {
        query = match value {
            Value::Integer(value) => query.bind::<Integer, _>(value),
            Value::Text(value) => query.bind::<Text, _>(value),
            Value::OptionalText(value) => query.bind::<Nullable<Text>, _>(value),
            Value::Date(value) => query.bind::<Date, _>(value),
        };
    }

    query.execute(conn)
}

/// Classifies a failed insert as a per-row rejection, or `None` if it is fatal.
fn rejection_kind(err: &DieselError) -> Option<FailureKind> {
    let DieselError::DatabaseError(kind, info) = err else {
        return None;
    };

    match kind {
        DatabaseErrorKind::ForeignKeyViolation => Some(FailureKind::Referential),
        DatabaseErrorKind::UniqueViolation => Some(FailureKind::Duplicate),
        DatabaseErrorKind::CheckViolation | DatabaseErrorKind::NotNullViolation => {
            Some(FailureKind::Constraint)
        }
        _ => {
            let message = info.message();
            if message.starts_with("FOREIGN KEY constraint failed") {
                Some(FailureKind::Referential)
            } else if message.starts_with("UNIQUE constraint failed") {
                Some(FailureKind::Duplicate)
            } else if message.contains("constraint failed") {
                Some(FailureKind::Constraint)
            } else {
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::{ACADEMIC_PERFORMANCE, DEPARTMENT};

    #[test]
    fn insert_statement_binds_every_mapped_column() {
        assert_eq!(
            insert_statement(&DEPARTMENT, AttemptHistory::Latest),
            "INSERT INTO department (department_id, title) VALUES (?, ?)"
        );
    }

    #[test]
    fn latest_attempt_policy_upserts_performance_rows() {
        let latest = insert_statement(&ACADEMIC_PERFORMANCE, AttemptHistory::Latest);
        assert!(latest.starts_with(
            "INSERT INTO academic_performance (student_id, curriculum_subject_id, score, attempt) \
             VALUES (?, ?, ?, ?)"
        ));
        assert!(latest.contains("ON CONFLICT (student_id, curriculum_subject_id)"));

        let keep = insert_statement(&ACADEMIC_PERFORMANCE, AttemptHistory::Keep);
        assert!(!keep.contains("ON CONFLICT"));
    }

    #[test]
    fn report_totals_sum_over_sources() {
        let mut departments = SourceReport::new(Entity::Department, "department.csv");
        departments.loaded = 3;
        departments.fail(4, FailureKind::Malformed, "`title` is empty".into());

        let mut subjects = SourceReport::new(Entity::Subject, "subject.csv");
        subjects.loaded = 2;

        let report = ImportReport {
            sources: vec![departments, subjects],
        };

        assert_eq!(report.loaded(), 5);
        assert_eq!(report.skipped(), 1);
        assert!(!report.is_clean());
        assert_eq!(report.source(Entity::Subject).unwrap().loaded, 2);
        assert!(report.source(Entity::Student).is_none());
    }
}
