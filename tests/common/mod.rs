#![allow(dead_code)]

use chrono::NaiveDate;
use diesel::prelude::*;
use std::path::Path;
use stipend::config::AttemptHistory;
use stipend::ddl::reset_schema;
use stipend::mapping::Entity;
use stipend::session::{SessionTarget, ensure_session};
use stipend::source::MemoryCatalog;
use tempfile::TempDir;

pub const DEPARTMENTS: &str = "\
id;title
1;Applied Mathematics
2;Physics
";

pub const DIRECTIONS: &str = "\
id;title
09.03.04;Software Engineering
01.03.02;Applied Mathematics
";

pub const QUALIFICATIONS: &str = "\
id;title
1;Бакалавриат
2;Магистратура
";

pub const CURRICULA: &str = "\
id;start_year;direction_id
1;2022;09.03.04
2;2023;01.03.02
";

pub const GROUPS: &str = "\
group_id;curriculum_id;qualification_id
PI-22;1;1
PM-23;2;1
";

pub const SUBJECTS: &str = "\
code;title;department_id
MATH1;Calculus;1
PHYS1;Physics;2
PE1;Physical Education;2
";

pub const STUDENTS: &str = "\
id;lastname;firstname;middlename;group_id;gender;birth
1;Smirnov;Ivan;Petrovich;PI-22;М;2004-03-01
2;Antonova;Maria;;PI-22;Ж;2004-07-12
3;Kuznetsov;Oleg;Igorevich;PM-23;М;2005-01-20
";

pub const CURRICULUM_SUBJECTS: &str = "\
id;curriculum_id;subject_code;semester;hours;reporting_form
1;1;MATH1;3;144;Экзамен
2;1;PHYS1;3;108;Диф.зачет
3;1;PE1;3;72;Зачет
4;2;MATH1;1;144;Экзамен
";

pub const PERFORMANCE: &str = "\
student_id;subject_id;score;attempt
1;1;90;1
1;2;88;1
1;3;40;1
2;1;80;1
2;2;75;1
3;4;95;1
";

/// Every source of the reference data set.
pub fn sources() -> Vec<(Entity, &'static str)> {
    vec![
        (Entity::Department, DEPARTMENTS),
        (Entity::Direction, DIRECTIONS),
        (Entity::Qualification, QUALIFICATIONS),
        (Entity::Curriculum, CURRICULA),
        (Entity::AcademicGroup, GROUPS),
        (Entity::Subject, SUBJECTS),
        (Entity::Student, STUDENTS),
        (Entity::CurriculumSubject, CURRICULUM_SUBJECTS),
        (Entity::AcademicPerformance, PERFORMANCE),
    ]
}

/// The reference data set as an in-memory catalog.
pub fn catalog() -> MemoryCatalog {
    sources()
        .into_iter()
        .fold(MemoryCatalog::new(), |catalog, (entity, text)| {
            catalog.with(entity, text)
        })
}

/// Writes the reference data set into `dir` under the fixed source file names.
pub fn write_sources(dir: &Path) {
    for (entity, text) in sources() {
        std::fs::write(dir.join(entity.source_file()), text).unwrap();
    }
}

/// A fresh schema in a scratch directory. Keep the directory alive as long as the connection.
pub fn fresh_schema(history: AttemptHistory) -> (TempDir, SqliteConnection) {
    let dir = tempfile::tempdir().unwrap();
    let mut conn = ensure_session(&SessionTarget::new(dir.path(), "records")).unwrap();
    reset_schema(&mut conn, history).unwrap();
    (dir, conn)
}

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}
