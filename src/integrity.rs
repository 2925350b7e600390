//! Post-load referential integrity check.

use diesel::prelude::*;
use diesel::sql_types::{BigInt, Nullable, Text};

/// A row whose foreign key does not resolve to an existing parent row.
#[derive(Debug, Clone, PartialEq, Eq, QueryableByName)]
pub struct ForeignKeyViolation {
    #[diesel(sql_type = Text)]
    pub table: String,
    #[diesel(sql_type = Nullable<BigInt>)]
    pub rowid: Option<i64>,
    #[diesel(sql_type = Text)]
    pub parent: String,
}

/// Lists every dangling foreign key in the schema. Empty after a successful reload.
pub fn foreign_key_violations(conn: &mut SqliteConnection) -> QueryResult<Vec<ForeignKeyViolation>> {
    diesel::sql_query("SELECT \"table\", rowid, parent FROM pragma_foreign_key_check")
        .load::<ForeignKeyViolation>(conn)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AttemptHistory;
    use crate::ddl::reset_schema;
    use diesel::connection::SimpleConnection;

    #[test]
    fn dangling_references_are_listed() {
        let mut conn = SqliteConnection::establish(":memory:").unwrap();
        reset_schema(&mut conn, AttemptHistory::Latest).unwrap();
        assert!(foreign_key_violations(&mut conn).unwrap().is_empty());

        // With enforcement off, an orphan can be written and must then be found.
        conn.batch_execute(
            "PRAGMA foreign_keys = OFF;
             INSERT INTO subject (subject_code, title, department_id) VALUES ('MATH', 'Algebra', 7);",
        )
        .unwrap();

        let violations = foreign_key_violations(&mut conn).unwrap();
        assert_eq!(
            violations,
            vec![ForeignKeyViolation {
                table: "subject".to_string(),
                rowid: Some(1),
                parent: "department".to_string(),
            }]
        );
    }
}
