//! Row types for the academic records tables and the closed enumerations stored in them.
//!
//! Enumerations are persisted as their source tokens (e.g. `Экзамен` for an exam) so the tables
//! stay readable by other consumers of the same data. Each enum converts to and from its token
//! and maps onto a diesel `Text` column.

use crate::schema::{
    academic_performance, acad_group, curriculum, curriculum_subject, department, direction,
    qualification, student, subject,
};
use chrono::NaiveDate;
use diesel::backend::Backend;
use diesel::deserialize::{self, FromSql};
use diesel::prelude::*;
use diesel::serialize::{self, IsNull, Output, ToSql};
use diesel::sql_types::Text;
use diesel::sqlite::Sqlite;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A token that is not part of an enumeration's closed set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} token `{token}`")]
pub struct UnknownToken {
    pub kind: &'static str,
    pub token: String,
}

/// Declares a closed enumeration whose variants are stored as fixed text tokens.
macro_rules! token_enum {
    (
        $(#[$meta:meta])*
        $name:ident as $kind:literal {
            $($(#[$vmeta:meta])* $variant:ident => $token:literal,)+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, diesel::AsExpression, diesel::FromSqlRow)]
        #[diesel(sql_type = diesel::sql_types::Text)]
        pub enum $name {
            $($(#[$vmeta])* $variant,)+
        }

        impl $name {
            /// Every accepted token, in declaration order.
            pub const TOKENS: &'static [&'static str] = &[$($token,)+];

            /// The token this variant is stored as.
            pub fn token(self) -> &'static str {
                match self {
                    $(Self::$variant => $token,)+
                }
            }
        }

        impl FromStr for $name {
            type Err = UnknownToken;

            fn from_str(token: &str) -> Result<Self, Self::Err> {
                match token {
                    $($token => Ok(Self::$variant),)+
                    _ => Err(UnknownToken {
                        kind: $kind,
                        token: token.to_string(),
                    }),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.token())
            }
        }

        impl ToSql<Text, Sqlite> for $name {
            fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Sqlite>) -> serialize::Result {
                out.set_value(self.token());
                Ok(IsNull::No)
            }
        }

        impl FromSql<Text, Sqlite> for $name {
            fn from_sql(bytes: <Sqlite as Backend>::RawValue<'_>) -> deserialize::Result<Self> {
                let token = <String as FromSql<Text, Sqlite>>::from_sql(bytes)?;
                Ok(token.parse::<$name>()?)
            }
        }
    };
}

token_enum! {
    /// Student gender as recorded in the student source file.
    Gender as "gender" {
        Male => "М",
        Female => "Ж",
    }
}

token_enum! {
    /// How a curriculum subject is assessed.
    ReportingForm as "reporting form" {
        Exam => "Экзамен",
        /// Pass/fail credit. Never affects the stipend.
        PassFail => "Зачет",
        DifferentiatedPass => "Диф.зачет",
    }
}

token_enum! {
    /// Degree level of an academic group.
    QualificationLevel as "qualification" {
        Bachelor => "Бакалавриат",
        Master => "Магистратура",
        Specialist => "Специалитет",
    }
}

impl ReportingForm {
    /// Forms whose scores count towards the stipend.
    pub const GRADED: [ReportingForm; 2] = [ReportingForm::Exam, ReportingForm::DifferentiatedPass];

    pub fn is_graded(self) -> bool {
        Self::GRADED.contains(&self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable)]
#[diesel(table_name = department)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Department {
    pub department_id: i32,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable)]
#[diesel(table_name = direction)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Direction {
    pub direction_id: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable)]
#[diesel(table_name = qualification)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Qualification {
    pub qualification_id: i32,
    pub title: QualificationLevel,
}

#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable)]
#[diesel(table_name = curriculum)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Curriculum {
    pub curriculum_id: i32,
    pub start_year: i32,
    pub direction_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable)]
#[diesel(table_name = acad_group)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct AcademicGroup {
    pub group_id: String,
    pub curriculum_id: i32,
    pub qualification_id: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable)]
#[diesel(table_name = subject)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Subject {
    pub subject_code: String,
    pub title: String,
    pub department_id: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable)]
#[diesel(table_name = curriculum_subject)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct CurriculumSubject {
    pub curriculum_subject_id: i32,
    pub curriculum_id: i32,
    pub subject_code: String,
    pub semester: i32,
    pub hours: i32,
    pub reporting_form: ReportingForm,
}

#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable)]
#[diesel(table_name = student)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Student {
    pub student_id: i32,
    pub lastname: String,
    pub firstname: String,
    pub middlename: Option<String>,
    pub group_id: String,
    pub gender: Gender,
    pub birth: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable)]
#[diesel(table_name = academic_performance)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct AcademicPerformance {
    pub student_id: i32,
    pub curriculum_subject_id: i32,
    pub score: i32,
    pub attempt: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_round_trip_through_from_str() {
        for token in ReportingForm::TOKENS {
            let form: ReportingForm = token.parse().unwrap();
            assert_eq!(form.token(), *token);
        }
        assert_eq!("Ж".parse::<Gender>(), Ok(Gender::Female));
        assert_eq!(
            "Магистратура".parse::<QualificationLevel>(),
            Ok(QualificationLevel::Master)
        );
    }

    #[test]
    fn unknown_tokens_are_rejected() {
        let err = "Exam".parse::<ReportingForm>().unwrap_err();
        assert_eq!(err.kind, "reporting form");
        assert_eq!(err.token, "Exam");
    }

    #[test]
    fn only_exams_and_differentiated_passes_are_graded() {
        assert!(ReportingForm::Exam.is_graded());
        assert!(ReportingForm::DifferentiatedPass.is_graded());
        assert!(!ReportingForm::PassFail.is_graded());
    }
}
