use crate::config::AttemptHistory;
use crate::error::{ConnectionError, DdlError, ImportError, QueryError};
use crate::import::{self, ImportOptions, ImportReport};
use crate::integrity::{self, ForeignKeyViolation};
use crate::mapping::Entity;
use crate::models::Student;
use crate::schema;
use crate::session::{self, SessionTarget};
use crate::source::SourceCatalog;
use crate::stipend::{self, StipendRow, StipendTiers};
use chrono::NaiveDate;
use diesel::prelude::*;
use diesel::result::QueryResult;

/// The manager for rebuilding, loading, and reporting on the academic records schema.
///
/// Owns one session for its whole lifetime; every stage runs against it in turn.
pub struct RecordsManager {
    db: SqliteConnection,
    attempt_history: AttemptHistory,
}

impl RecordsManager {
    /// Creates a new `RecordsManager` with a session on `target`, creating the schema if needed.
    pub fn connect(
        target: &SessionTarget,
        attempt_history: AttemptHistory,
    ) -> Result<Self, ConnectionError> {
        Ok(Self::with_connection(
            session::ensure_session(target)?,
            attempt_history,
        ))
    }

    /// Wraps an already prepared connection.
    pub fn with_connection(db: SqliteConnection, attempt_history: AttemptHistory) -> Self {
        Self {
            db,
            attempt_history,
        }
    }

    /// Drops and recreates every table.
    pub fn reset_schema(&mut self) -> Result<(), DdlError> {
        crate::ddl::reset_schema(&mut self.db, self.attempt_history)
    }

    /// Replaces the contents of every table with the records from `catalog`.
    pub fn reload<C: SourceCatalog>(&mut self, catalog: &C) -> Result<ImportReport, ImportError> {
        let options = ImportOptions {
            attempt_history: self.attempt_history,
        };
        import::reload(&mut self.db, catalog, options)
    }

    /// Computes the stipend report as of the given date.
    pub fn stipends(
        &mut self,
        as_of: NaiveDate,
        tiers: StipendTiers,
    ) -> Result<Vec<StipendRow>, QueryError> {
        stipend::compute_stipends(&mut self.db, as_of, tiers)
    }

    /// Lists every foreign key that does not resolve.
    pub fn foreign_key_violations(&mut self) -> QueryResult<Vec<ForeignKeyViolation>> {
        integrity::foreign_key_violations(&mut self.db)
    }

    /// Returns the number of rows in an entity's table.
    pub fn num_rows(&mut self, entity: Entity) -> QueryResult<usize> {
        use schema::*;

        let count: i64 = match entity {
            Entity::Department => department::table.count().get_result(&mut self.db)?,
            Entity::Direction => direction::table.count().get_result(&mut self.db)?,
            Entity::Qualification => qualification::table.count().get_result(&mut self.db)?,
            Entity::Curriculum => curriculum::table.count().get_result(&mut self.db)?,
            Entity::AcademicGroup => acad_group::table.count().get_result(&mut self.db)?,
            Entity::Subject => subject::table.count().get_result(&mut self.db)?,
            Entity::Student => student::table.count().get_result(&mut self.db)?,
            Entity::CurriculumSubject => {
                curriculum_subject::table.count().get_result(&mut self.db)?
            }
            Entity::AcademicPerformance => {
                academic_performance::table.count().get_result(&mut self.db)?
            }
        };

        Ok(count as usize)
    }

    /// Retrieves all students, ordered by group and surname.
    pub fn get_students(&mut self) -> QueryResult<Vec<Student>> {
        use schema::student::dsl::*;

        student
            .select(Student::as_select())
            .order_by((group_id.asc(), lastname.asc(), student_id.asc()))
            .load(&mut self.db)
    }
}
