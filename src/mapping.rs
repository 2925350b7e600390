//! Declarative description of how each source file maps onto its table.
//!
//! Every [`Entity`] has one static [`EntityMapping`]: the table it loads, the file it is read
//! from, the entities it references, and the positional fields it takes from each record. The
//! import pipeline is driven entirely by this table.

use crate::error::RowError;
use crate::models::{Gender, QualificationLevel, ReportingForm};
use chrono::NaiveDate;
use FieldKind::{Date, Integer, OptionalText, Text, Token, Year};

/// The nine entities of the academic records schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Entity {
    Department,
    Direction,
    Qualification,
    Curriculum,
    AcademicGroup,
    Subject,
    Student,
    CurriculumSubject,
    AcademicPerformance,
}

impl Entity {
    /// All entities with every parent strictly before its children.
    ///
    /// Tables are created and loaded in this order, and dropped and cleared in reverse.
    pub const LOAD_ORDER: [Entity; 9] = [
        Entity::Department,
        Entity::Direction,
        Entity::Qualification,
        Entity::Curriculum,
        Entity::AcademicGroup,
        Entity::Subject,
        Entity::Student,
        Entity::CurriculumSubject,
        Entity::AcademicPerformance,
    ];

    pub fn mapping(self) -> &'static EntityMapping {
        match self {
            Entity::Department => &DEPARTMENT,
            Entity::Direction => &DIRECTION,
            Entity::Qualification => &QUALIFICATION,
            Entity::Curriculum => &CURRICULUM,
            Entity::AcademicGroup => &ACAD_GROUP,
            Entity::Subject => &SUBJECT,
            Entity::Student => &STUDENT,
            Entity::CurriculumSubject => &CURRICULUM_SUBJECT,
            Entity::AcademicPerformance => &ACADEMIC_PERFORMANCE,
        }
    }

    pub fn table(self) -> &'static str {
        self.mapping().table
    }

    pub fn source_file(self) -> &'static str {
        self.mapping().source_file
    }
}

/// How a single source field is parsed and validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Required, non-empty text of at most `max` characters.
    Text { max: usize },
    /// Text of at most `max` characters; an empty field becomes `NULL`.
    OptionalText { max: usize },
    Integer { min: i32, max: i32 },
    /// A calendar year.
    Year,
    /// An ISO `YYYY-MM-DD` date.
    Date,
    /// One of a closed set of tokens.
    Token(&'static [&'static str]),
}

/// One column of a table and where its value comes from in the source record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldMapping {
    pub index: usize,
    pub column: &'static str,
    pub kind: FieldKind,
}

impl FieldMapping {
    const fn new(index: usize, column: &'static str, kind: FieldKind) -> Self {
        Self {
            index,
            column,
            kind,
        }
    }

    /// Parses a raw field according to this mapping.
    pub fn parse(&self, raw: &str) -> Result<Value, RowError> {
        let raw = raw.trim();
        let column = self.column;

        match self.kind {
            FieldKind::Text { max } => {
                if raw.is_empty() {
                    return Err(RowError::Empty { column });
                }
                check_length(column, raw, max)?;
                Ok(Value::Text(raw.to_string()))
            }
            FieldKind::OptionalText { max } => {
                if raw.is_empty() {
                    return Ok(Value::OptionalText(None));
                }
                check_length(column, raw, max)?;
                Ok(Value::OptionalText(Some(raw.to_string())))
            }
            FieldKind::Integer { min, max } => parse_integer(column, raw, min, max).map(Value::Integer),
            FieldKind::Year => parse_integer(column, raw, MIN_YEAR, MAX_YEAR).map(Value::Integer),
            FieldKind::Date => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .map(Value::Date)
                .map_err(|_| RowError::InvalidDate {
                    column,
                    value: raw.to_string(),
                }),
            FieldKind::Token(allowed) => {
                if allowed.contains(&raw) {
                    Ok(Value::Text(raw.to_string()))
                } else {
                    Err(RowError::UnknownToken {
                        column,
                        value: raw.to_string(),
                        allowed,
                    })
                }
            }
        }
    }
}

const MIN_YEAR: i32 = 1900;
const MAX_YEAR: i32 = 2100;

fn check_length(column: &'static str, raw: &str, max: usize) -> Result<(), RowError> {
    if raw.chars().count() > max {
        return Err(RowError::TooLong { column, max });
    }
    Ok(())
}

fn parse_integer(column: &'static str, raw: &str, min: i32, max: i32) -> Result<i32, RowError> {
    let value: i64 = raw.parse().map_err(|_| RowError::InvalidInteger {
        column,
        value: raw.to_string(),
    })?;

    if value < i64::from(min) || value > i64::from(max) {
        return Err(RowError::OutOfRange {
            column,
            value,
            min,
            max,
        });
    }

    Ok(value as i32)
}

/// A parsed, typed column value ready to be bound to an insert statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Integer(i32),
    Text(String),
    OptionalText(Option<String>),
    Date(NaiveDate),
}

/// Everything the pipeline needs to know to load one entity.
#[derive(Debug)]
pub struct EntityMapping {
    pub entity: Entity,
    pub table: &'static str,
    pub source_file: &'static str,
    /// Entities this one references through foreign keys.
    pub parents: &'static [Entity],
    pub fields: &'static [FieldMapping],
}

impl EntityMapping {
    /// The number of fields a record must have for every mapped index to be present.
    pub fn min_fields(&self) -> usize {
        self.fields
            .iter()
            .map(|field| field.index + 1)
            .max()
            .unwrap_or(0)
    }

    pub fn columns(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|field| field.column)
    }

    /// Maps the fields of one source record onto typed column values, in column order.
    pub fn parse_record<S: AsRef<str>>(&self, fields: &[S]) -> Result<Vec<Value>, RowError> {
        let expected = self.min_fields();
        if fields.len() < expected {
            return Err(RowError::MissingField {
                expected,
                found: fields.len(),
            });
        }

        self.fields
            .iter()
            .map(|field| field.parse(fields[field.index].as_ref()))
            .collect()
    }
}

/// Upper bound for any row-id style reference.
const ID_MAX: i32 = i32::MAX;

pub static DEPARTMENT: EntityMapping = EntityMapping {
    entity: Entity::Department,
    table: "department",
    source_file: "department.csv",
    parents: &[],
    fields: &[
        FieldMapping::new(0, "department_id", Integer { min: 1, max: ID_MAX }),
        FieldMapping::new(1, "title", Text { max: 60 }),
    ],
};

pub static DIRECTION: EntityMapping = EntityMapping {
    entity: Entity::Direction,
    table: "direction",
    source_file: "direction.csv",
    parents: &[],
    fields: &[
        FieldMapping::new(0, "direction_id", Text { max: 15 }),
        FieldMapping::new(1, "title", Text { max: 40 }),
    ],
};

pub static QUALIFICATION: EntityMapping = EntityMapping {
    entity: Entity::Qualification,
    table: "qualification",
    source_file: "qualification.csv",
    parents: &[],
    fields: &[
        FieldMapping::new(0, "qualification_id", Integer { min: 1, max: ID_MAX }),
        FieldMapping::new(1, "title", Token(QualificationLevel::TOKENS)),
    ],
};

pub static CURRICULUM: EntityMapping = EntityMapping {
    entity: Entity::Curriculum,
    table: "curriculum",
    source_file: "curriculum.csv",
    parents: &[Entity::Direction],
    fields: &[
        FieldMapping::new(0, "curriculum_id", Integer { min: 1, max: ID_MAX }),
        FieldMapping::new(1, "start_year", Year),
        FieldMapping::new(2, "direction_id", Text { max: 15 }),
    ],
};

pub static ACAD_GROUP: EntityMapping = EntityMapping {
    entity: Entity::AcademicGroup,
    table: "acad_group",
    source_file: "acad_group.csv",
    parents: &[Entity::Curriculum, Entity::Qualification],
    fields: &[
        FieldMapping::new(0, "group_id", Text { max: 6 }),
        FieldMapping::new(1, "curriculum_id", Integer { min: 1, max: ID_MAX }),
        FieldMapping::new(2, "qualification_id", Integer { min: 1, max: ID_MAX }),
    ],
};

pub static SUBJECT: EntityMapping = EntityMapping {
    entity: Entity::Subject,
    table: "subject",
    source_file: "subject.csv",
    parents: &[Entity::Department],
    fields: &[
        FieldMapping::new(0, "subject_code", Text { max: 50 }),
        FieldMapping::new(1, "title", Text { max: 100 }),
        FieldMapping::new(2, "department_id", Integer { min: 1, max: ID_MAX }),
    ],
};

pub static STUDENT: EntityMapping = EntityMapping {
    entity: Entity::Student,
    table: "student",
    source_file: "student.csv",
    parents: &[Entity::AcademicGroup],
    fields: &[
        FieldMapping::new(0, "student_id", Integer { min: 1, max: ID_MAX }),
        FieldMapping::new(1, "lastname", Text { max: 40 }),
        FieldMapping::new(2, "firstname", Text { max: 40 }),
        FieldMapping::new(3, "middlename", OptionalText { max: 40 }),
        FieldMapping::new(4, "group_id", Text { max: 6 }),
        FieldMapping::new(5, "gender", Token(Gender::TOKENS)),
        FieldMapping::new(6, "birth", Date),
    ],
};

pub static CURRICULUM_SUBJECT: EntityMapping = EntityMapping {
    entity: Entity::CurriculumSubject,
    table: "curriculum_subject",
    source_file: "curriculum_subject.csv",
    parents: &[Entity::Curriculum, Entity::Subject],
    fields: &[
        FieldMapping::new(0, "curriculum_subject_id", Integer { min: 1, max: ID_MAX }),
        FieldMapping::new(1, "curriculum_id", Integer { min: 1, max: ID_MAX }),
        FieldMapping::new(2, "subject_code", Text { max: 50 }),
        FieldMapping::new(3, "semester", Integer { min: 1, max: 12 }),
        FieldMapping::new(4, "hours", Integer { min: 1, max: 10_000 }),
        FieldMapping::new(5, "reporting_form", Token(ReportingForm::TOKENS)),
    ],
};

pub static ACADEMIC_PERFORMANCE: EntityMapping = EntityMapping {
    entity: Entity::AcademicPerformance,
    table: "academic_performance",
    source_file: "academic_performance.csv",
    parents: &[Entity::Student, Entity::CurriculumSubject],
    fields: &[
        FieldMapping::new(0, "student_id", Integer { min: 1, max: ID_MAX }),
        FieldMapping::new(1, "curriculum_subject_id", Integer { min: 1, max: ID_MAX }),
        FieldMapping::new(2, "score", Integer { min: 0, max: 100 }),
        FieldMapping::new(3, "attempt", Integer { min: 1, max: 10 }),
    ],
};
