//! Stipend eligibility for the current semester.
//!
//! A curriculum's current semester is derived from its start year and the evaluation date. For
//! every student, the lowest first-attempt score across the exams and differentiated passes of
//! that semester decides the stipend tier.

use crate::error::QueryError;
use crate::models::ReportingForm;
use crate::schema::{academic_performance, acad_group, curriculum, curriculum_subject, student};
use chrono::{Datelike, NaiveDate};
use diesel::prelude::*;
use std::collections::HashMap;
use std::iter::Peekable;
use tracing::{debug, info};

/// The highest semester the current-semester rule produces (four years of two semesters).
pub const LAST_SEMESTER: i32 = 8;

/// Returns the semester a curriculum started in `start_year` is in on `as_of`, or `None` if the
/// curriculum has not started yet or has already ended.
///
/// February through June is the spring (odd) semester of the academic year that began the
/// previous autumn; every other month belongs to the autumn (even) semester.
pub fn current_semester(start_year: i32, as_of: NaiveDate) -> Option<i32> {
    let years = as_of.year() - start_year;
    if !(1..=LAST_SEMESTER / 2).contains(&years) {
        return None;
    }

    if (2..=6).contains(&as_of.month()) {
        Some(2 * years - 1)
    } else {
        Some(2 * years)
    }
}

/// Score thresholds and amounts of the stipend tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StipendTiers {
    /// Lowest minimum score earning tier A.
    pub tier_a_min: i32,
    pub tier_a_amount: i32,
    /// Lowest minimum score earning tier B.
    pub tier_b_min: i32,
    pub tier_b_amount: i32,
}

impl Default for StipendTiers {
    fn default() -> Self {
        Self {
            tier_a_min: 71,
            tier_a_amount: 2100,
            tier_b_min: 86,
            tier_b_amount: 3100,
        }
    }
}

impl StipendTiers {
    /// The stipend earned by a student whose lowest qualifying score is `min_score`.
    pub fn amount_for(&self, min_score: i32) -> i32 {
        if min_score >= self.tier_b_min {
            self.tier_b_amount
        } else if min_score >= self.tier_a_min {
            self.tier_a_amount
        } else {
            0
        }
    }
}

/// One line of the stipend report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StipendRow {
    pub student_id: i32,
    pub lastname: String,
    pub firstname: String,
    pub middlename: Option<String>,
    pub group_id: String,
    pub amount: i32,
}

/// A first-attempt score of a graded subject, joined with its student.
#[derive(Debug, Queryable)]
pub struct ScoreRow {
    pub student_id: i32,
    pub lastname: String,
    pub firstname: String,
    pub middlename: Option<String>,
    pub group_id: String,
    pub curriculum_id: i32,
    pub semester: i32,
    pub score: i32,
}

/// Computes the current semester of every curriculum that has one on `as_of`.
pub fn active_semesters(
    conn: &mut SqliteConnection,
    as_of: NaiveDate,
) -> QueryResult<HashMap<i32, i32>> {
    let curricula = curriculum::table
        .select((curriculum::curriculum_id, curriculum::start_year))
        .load::<(i32, i32)>(conn)?;

    Ok(curricula
        .into_iter()
        .filter_map(|(id, start_year)| {
            current_semester(start_year, as_of).map(|semester| (id, semester))
        })
        .collect())
}

/// Streams the stipend report for `as_of`, ordered by group and surname.
///
/// Rows are produced lazily from the open query. Use [`compute_stipends`] to get all rows or an
/// error.
pub fn stream_stipends(
    conn: &mut SqliteConnection,
    as_of: NaiveDate,
    tiers: StipendTiers,
) -> Result<Stipends<impl Iterator<Item = QueryResult<ScoreRow>>>, QueryError> {
    let semesters = active_semesters(conn, as_of)?;
    debug!(%as_of, curricula = semesters.len(), "active curricula");

    let active: Vec<i32> = semesters.keys().copied().collect();

    let rows = academic_performance::table
        .inner_join(student::table.inner_join(acad_group::table))
        .inner_join(curriculum_subject::table)
        .filter(curriculum_subject::curriculum_id.eq(acad_group::curriculum_id))
        .filter(curriculum_subject::curriculum_id.eq_any(active))
        .filter(curriculum_subject::reporting_form.eq_any(ReportingForm::GRADED.to_vec()))
        .filter(academic_performance::attempt.eq(1))
        .order_by((
            student::group_id.asc(),
            student::lastname.asc(),
            student::student_id.asc(),
        ))
        .select((
            student::student_id,
            student::lastname,
            student::firstname,
            student::middlename,
            student::group_id,
            curriculum_subject::curriculum_id,
            curriculum_subject::semester,
            academic_performance::score,
        ))
        .load_iter::<ScoreRow, diesel::connection::DefaultLoadingMode>(conn)?;

    Ok(Stipends {
        rows: rows.peekable(),
        semesters,
        tiers,
    })
}

/// Runs the stipend report for `as_of` to completion.
pub fn compute_stipends(
    conn: &mut SqliteConnection,
    as_of: NaiveDate,
    tiers: StipendTiers,
) -> Result<Vec<StipendRow>, QueryError> {
    let rows = stream_stipends(conn, as_of, tiers)?.collect::<QueryResult<Vec<_>>>()?;
    info!(%as_of, students = rows.len(), "computed stipends");
    Ok(rows)
}

/// Folds per-subject score rows into one [`StipendRow`] per student.
///
/// The underlying rows must be ordered so that all rows of a student are adjacent.
pub struct Stipends<I: Iterator<Item = QueryResult<ScoreRow>>> {
    rows: Peekable<I>,
    semesters: HashMap<i32, i32>,
    tiers: StipendTiers,
}

impl<I: Iterator<Item = QueryResult<ScoreRow>>> Stipends<I> {
    fn in_current_semester(&self, row: &ScoreRow) -> bool {
        self.semesters.get(&row.curriculum_id) == Some(&row.semester)
    }
}

impl<I: Iterator<Item = QueryResult<ScoreRow>>> Iterator for Stipends<I> {
    type Item = QueryResult<StipendRow>;

    fn next(&mut self) -> Option<Self::Item> {
        let first = loop {
            match self.rows.next()? {
                Ok(row) if self.in_current_semester(&row) => break row,
                Ok(_) => continue,
                Err(err) => return Some(Err(err)),
            }
        };

        let mut min_score = first.score;
        loop {
            match self.rows.peek() {
                Some(Ok(row)) if row.student_id == first.student_id => {}
                _ => break,
            }
            if let Some(Ok(row)) = self.rows.next() {
                if self.in_current_semester(&row) {
                    min_score = min_score.min(row.score);
                }
            }
        }

        Some(Ok(StipendRow {
            student_id: first.student_id,
            lastname: first.lastname,
            firstname: first.firstname,
            middlename: first.middlename,
            group_id: first.group_id,
            amount: self.tiers.amount_for(min_score),
        }))
    }
}
