//! Dropping and recreating the academic records schema.

use crate::config::AttemptHistory;
use crate::error::{DdlError, DdlStep};
use crate::mapping::Entity;
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use tracing::{debug, info};

// Numeric keys are `INTEGER PRIMARY KEY` row ids bound from each source's leading id column, so a
// skipped row leaves a gap and never renumbers the rows after it.

const DEPARTMENT: &str = r#"
CREATE TABLE department (
    department_id INTEGER PRIMARY KEY NOT NULL,
    title TEXT NOT NULL CHECK (length(title) <= 60)
);
"#;

const DIRECTION: &str = r#"
CREATE TABLE direction (
    direction_id TEXT PRIMARY KEY NOT NULL CHECK (length(direction_id) <= 15),
    title TEXT NOT NULL CHECK (length(title) <= 40)
);
"#;

const QUALIFICATION: &str = r#"
CREATE TABLE qualification (
    qualification_id INTEGER PRIMARY KEY NOT NULL,
    title TEXT NOT NULL DEFAULT 'Бакалавриат'
        CHECK (title IN ('Бакалавриат', 'Магистратура', 'Специалитет'))
);
"#;

const CURRICULUM: &str = r#"
CREATE TABLE curriculum (
    curriculum_id INTEGER PRIMARY KEY NOT NULL,
    start_year INTEGER NOT NULL,
    direction_id TEXT NOT NULL
        REFERENCES direction (direction_id) ON DELETE RESTRICT ON UPDATE CASCADE
);
"#;

const ACAD_GROUP: &str = r#"
CREATE TABLE acad_group (
    group_id TEXT PRIMARY KEY NOT NULL CHECK (length(group_id) <= 6),
    curriculum_id INTEGER NOT NULL
        REFERENCES curriculum (curriculum_id) ON DELETE RESTRICT ON UPDATE CASCADE,
    qualification_id INTEGER NOT NULL
        REFERENCES qualification (qualification_id) ON DELETE RESTRICT ON UPDATE CASCADE
);
"#;

const SUBJECT: &str = r#"
CREATE TABLE subject (
    subject_code TEXT PRIMARY KEY NOT NULL CHECK (length(subject_code) <= 50),
    title TEXT NOT NULL CHECK (length(title) <= 100),
    department_id INTEGER NOT NULL
        REFERENCES department (department_id) ON DELETE RESTRICT ON UPDATE CASCADE
);
"#;

const STUDENT: &str = r#"
CREATE TABLE student (
    student_id INTEGER PRIMARY KEY NOT NULL,
    lastname TEXT NOT NULL CHECK (length(lastname) <= 40),
    firstname TEXT NOT NULL CHECK (length(firstname) <= 40),
    middlename TEXT DEFAULT NULL CHECK (length(middlename) <= 40),
    group_id TEXT NOT NULL
        REFERENCES acad_group (group_id) ON DELETE RESTRICT ON UPDATE CASCADE,
    gender TEXT NOT NULL CHECK (gender IN ('М', 'Ж')),
    birth TEXT NOT NULL
);

CREATE INDEX student_name ON student (lastname, firstname, middlename);
CREATE INDEX student_group ON student (group_id);
"#;

const CURRICULUM_SUBJECT: &str = r#"
CREATE TABLE curriculum_subject (
    curriculum_subject_id INTEGER PRIMARY KEY NOT NULL,
    curriculum_id INTEGER NOT NULL
        REFERENCES curriculum (curriculum_id) ON DELETE RESTRICT ON UPDATE CASCADE,
    subject_code TEXT NOT NULL
        REFERENCES subject (subject_code) ON DELETE RESTRICT ON UPDATE CASCADE,
    semester INTEGER NOT NULL CHECK (semester >= 1),
    hours INTEGER NOT NULL CHECK (hours > 0),
    reporting_form TEXT NOT NULL CHECK (reporting_form IN ('Экзамен', 'Зачет', 'Диф.зачет'))
);

CREATE INDEX curriculum_subject_semester ON curriculum_subject (curriculum_id, semester);
"#;

/// Returns the statements creating `entity`'s table and its indexes.
pub fn create_statement(entity: Entity, history: AttemptHistory) -> String {
    match entity {
        Entity::Department => DEPARTMENT.to_string(),
        Entity::Direction => DIRECTION.to_string(),
        Entity::Qualification => QUALIFICATION.to_string(),
        Entity::Curriculum => CURRICULUM.to_string(),
        Entity::AcademicGroup => ACAD_GROUP.to_string(),
        Entity::Subject => SUBJECT.to_string(),
        Entity::Student => STUDENT.to_string(),
        Entity::CurriculumSubject => CURRICULUM_SUBJECT.to_string(),
        Entity::AcademicPerformance => format!(
            r#"
CREATE TABLE academic_performance (
    student_id INTEGER NOT NULL
        REFERENCES student (student_id) ON DELETE RESTRICT ON UPDATE CASCADE,
    curriculum_subject_id INTEGER NOT NULL
        REFERENCES curriculum_subject (curriculum_subject_id) ON DELETE RESTRICT ON UPDATE CASCADE,
    score INTEGER NOT NULL DEFAULT 56 CHECK (score BETWEEN 0 AND 100),
    attempt INTEGER NOT NULL DEFAULT 1 CHECK (attempt >= 1),
    PRIMARY KEY ({})
);
"#,
            history.key_columns().join(", ")
        ),
    }
}

/// Drops every table, children first, and recreates them, parents first, in one transaction.
///
/// Either the whole schema is rebuilt or nothing changes: the first failing statement rolls the
/// reset back and is returned.
pub fn reset_schema(conn: &mut SqliteConnection, history: AttemptHistory) -> Result<(), DdlError> {
    info!(?history, "resetting schema");

    conn.transaction::<_, DdlError, _>(|conn| {
        for entity in Entity::LOAD_ORDER.iter().rev() {
            let table = entity.table();
            debug!(table, "dropping table");
            conn.batch_execute(&format!("DROP TABLE IF EXISTS {table};"))
                .map_err(|source| DdlError::Statement {
                    table,
                    step: DdlStep::Drop,
                    source,
                })?;
        }

        for entity in Entity::LOAD_ORDER {
            let table = entity.table();
            debug!(table, "creating table");
            conn.batch_execute(&create_statement(entity, history))
                .map_err(|source| DdlError::Statement {
                    table,
                    step: DdlStep::Create,
                    source,
                })?;
        }

        Ok(())
    })?;

    info!(tables = Entity::LOAD_ORDER.len(), "schema reset complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema;
    use diesel::sql_types::Text;

    #[derive(QueryableByName, Debug, PartialEq)]
    struct TableName {
        #[diesel(sql_type = Text)]
        name: String,
    }

    fn tables(conn: &mut SqliteConnection) -> Vec<String> {
        diesel::sql_query(
            "SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name",
        )
        .load::<TableName>(conn)
        .unwrap()
        .into_iter()
        .map(|table| table.name)
        .collect()
    }

    fn connection() -> SqliteConnection {
        let mut conn = SqliteConnection::establish(":memory:").unwrap();
        conn.batch_execute("PRAGMA foreign_keys = ON;").unwrap();
        conn
    }

    #[test]
    fn reset_creates_all_tables_and_is_rerunnable() {
        let mut conn = connection();

        reset_schema(&mut conn, AttemptHistory::Latest).unwrap();
        let first = tables(&mut conn);
        reset_schema(&mut conn, AttemptHistory::Latest).unwrap();
        let second = tables(&mut conn);

        let mut expected: Vec<String> = Entity::LOAD_ORDER
            .iter()
            .map(|entity| entity.table().to_string())
            .collect();
        expected.sort();

        assert_eq!(first, expected);
        assert_eq!(second, expected);
    }

    #[test]
    fn reset_empties_populated_tables() {
        let mut conn = connection();
        reset_schema(&mut conn, AttemptHistory::Latest).unwrap();

        conn.batch_execute(
            "INSERT INTO department (title) VALUES ('Mathematics');
             INSERT INTO subject (subject_code, title, department_id) VALUES ('MATH', 'Algebra', 1);",
        )
        .unwrap();

        reset_schema(&mut conn, AttemptHistory::Latest).unwrap();

        let departments: i64 = schema::department::table.count().get_result(&mut conn).unwrap();
        let subjects: i64 = schema::subject::table.count().get_result(&mut conn).unwrap();
        assert_eq!((departments, subjects), (0, 0));
    }

    #[test]
    fn foreign_keys_are_enforced_after_reset() {
        let mut conn = connection();
        reset_schema(&mut conn, AttemptHistory::Latest).unwrap();

        let orphan = conn.batch_execute(
            "INSERT INTO subject (subject_code, title, department_id) VALUES ('MATH', 'Algebra', 42);",
        );
        assert!(orphan.is_err());
    }

    #[test]
    fn enumerations_are_closed() {
        let mut conn = connection();
        reset_schema(&mut conn, AttemptHistory::Latest).unwrap();

        assert!(conn
            .batch_execute("INSERT INTO qualification (title) VALUES ('Магистратура');")
            .is_ok());
        assert!(conn
            .batch_execute("INSERT INTO qualification (title) VALUES ('Master');")
            .is_err());
    }

    #[test]
    fn attempt_history_extends_the_performance_key() {
        assert!(create_statement(Entity::AcademicPerformance, AttemptHistory::Latest)
            .contains("PRIMARY KEY (student_id, curriculum_subject_id)"));
        assert!(create_statement(Entity::AcademicPerformance, AttemptHistory::Keep)
            .contains("PRIMARY KEY (student_id, curriculum_subject_id, attempt)"));
    }

    #[test]
    fn failed_reset_rolls_back() {
        let mut conn = connection();
        reset_schema(&mut conn, AttemptHistory::Latest).unwrap();
        // A table outside the schema still referencing `department` blocks dropping it.
        conn.batch_execute(
            "CREATE TABLE external_ref (department_id INTEGER REFERENCES department (department_id));
             INSERT INTO department (title) VALUES ('Mathematics');
             INSERT INTO external_ref (department_id) VALUES (1);",
        )
        .unwrap();

        let err = reset_schema(&mut conn, AttemptHistory::Latest).unwrap_err();
        assert!(matches!(
            err,
            DdlError::Statement {
                table: "department",
                step: DdlStep::Drop,
                ..
            }
        ));

        // Tables dropped before the failure are back.
        let mut expected: Vec<String> = Entity::LOAD_ORDER
            .iter()
            .map(|entity| entity.table().to_string())
            .chain(["external_ref".to_string()])
            .collect();
        expected.sort();
        assert_eq!(tables(&mut conn), expected);
    }
}
