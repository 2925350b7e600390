mod common;

use common::{catalog, date, fresh_schema, write_sources};
use pretty_assertions::assert_eq;
use stipend::config::{AttemptHistory, Settings};
use stipend::display::format_stipend_row;
use stipend::import::{ImportOptions, reload};
use stipend::mapping::Entity;
use stipend::source::DirectoryCatalog;
use stipend::stipend::{StipendRow, StipendTiers, compute_stipends, stream_stipends};

fn summary(rows: &[StipendRow]) -> Vec<(i32, &str, &str, i32)> {
    rows.iter()
        .map(|row| {
            (
                row.student_id,
                row.lastname.as_str(),
                row.group_id.as_str(),
                row.amount,
            )
        })
        .collect()
}

#[test]
fn report_follows_group_and_surname_order() {
    let (_dir, mut conn) = fresh_schema(AttemptHistory::Latest);
    reload(&mut conn, &catalog(), ImportOptions::default()).unwrap();

    let rows = compute_stipends(&mut conn, date(2024, 4, 15), StipendTiers::default()).unwrap();

    assert_eq!(
        summary(&rows),
        vec![
            (2, "Antonova", "PI-22", 2100),
            (1, "Smirnov", "PI-22", 3100),
            (3, "Kuznetsov", "PM-23", 3100),
        ]
    );
    assert_eq!(
        rows.iter().map(format_stipend_row).collect::<Vec<_>>(),
        vec![
            "2 Antonova Maria - PI-22 2100",
            "1 Smirnov Ivan Petrovich PI-22 3100",
            "3 Kuznetsov Oleg Igorevich PM-23 3100",
        ]
    );
}

#[test]
fn streamed_rows_match_the_computed_report() {
    let (_dir, mut conn) = fresh_schema(AttemptHistory::Latest);
    reload(&mut conn, &catalog(), ImportOptions::default()).unwrap();
    let as_of = date(2024, 4, 15);

    let streamed: Vec<StipendRow> = stream_stipends(&mut conn, as_of, StipendTiers::default())
        .unwrap()
        .map(Result::unwrap)
        .collect();
    let computed = compute_stipends(&mut conn, as_of, StipendTiers::default()).unwrap();

    assert_eq!(streamed, computed);
}

#[test]
fn lowest_graded_score_decides_the_tier() {
    let (_dir, mut conn) = fresh_schema(AttemptHistory::Latest);

    // One curriculum in its third semester; A scored 80 and B scored 60 on its only exam.
    let students = "\
id;lastname;firstname;middlename;group_id;gender;birth
1;Alekseev;Artem;;PI-22;М;2004-02-02
2;Borisova;Bella;;PI-22;Ж;2004-05-05
";
    let subjects = "\
id;curriculum_id;subject_code;semester;hours;reporting_form
1;1;MATH1;3;144;Экзамен
";
    let performance = "\
student_id;subject_id;score;attempt
1;1;80;1
2;1;60;1
";
    let catalog = catalog()
        .with(Entity::Student, students)
        .with(Entity::CurriculumSubject, subjects)
        .with(Entity::AcademicPerformance, performance);
    reload(&mut conn, &catalog, ImportOptions::default()).unwrap();

    let rows = compute_stipends(&mut conn, date(2024, 4, 1), StipendTiers::default()).unwrap();

    assert_eq!(
        summary(&rows),
        vec![(1, "Alekseev", "PI-22", 2100), (2, "Borisova", "PI-22", 0)]
    );
}

#[test]
fn retakes_pass_fail_and_other_semesters_are_ignored() {
    let (_dir, mut conn) = fresh_schema(AttemptHistory::Keep);

    let subjects = format!("{}5;1;PE1;4;72;Экзамен\n", common::CURRICULUM_SUBJECTS);
    // Student 1 retook MATH1 with a low score; student 2 failed the fourth-semester exam.
    let performance = format!("{}1;1;50;2\n2;5;10;1\n", common::PERFORMANCE);
    let catalog = catalog()
        .with(Entity::CurriculumSubject, subjects)
        .with(Entity::AcademicPerformance, performance);
    let options = ImportOptions {
        attempt_history: AttemptHistory::Keep,
    };
    assert!(reload(&mut conn, &catalog, options).unwrap().is_clean());

    let rows = compute_stipends(&mut conn, date(2024, 4, 15), StipendTiers::default()).unwrap();

    assert_eq!(
        summary(&rows),
        vec![
            (2, "Antonova", "PI-22", 2100),
            (1, "Smirnov", "PI-22", 3100),
            (3, "Kuznetsov", "PM-23", 3100),
        ]
    );
}

#[test]
fn finished_and_future_curricula_produce_no_rows() {
    let (_dir, mut conn) = fresh_schema(AttemptHistory::Latest);
    reload(&mut conn, &catalog(), ImportOptions::default()).unwrap();

    // Curriculum 2 has not started yet in 2023; both have ended by 2028.
    let early = compute_stipends(&mut conn, date(2023, 4, 15), StipendTiers::default()).unwrap();
    assert_eq!(early, vec![]);

    let late = compute_stipends(&mut conn, date(2028, 4, 15), StipendTiers::default()).unwrap();
    assert_eq!(late, vec![]);
}

#[test]
fn custom_tiers_are_applied() {
    let (_dir, mut conn) = fresh_schema(AttemptHistory::Latest);
    reload(&mut conn, &catalog(), ImportOptions::default()).unwrap();
    let tiers = StipendTiers {
        tier_a_min: 60,
        tier_a_amount: 1000,
        tier_b_min: 90,
        tier_b_amount: 5000,
    };

    let rows = compute_stipends(&mut conn, date(2024, 4, 15), tiers).unwrap();

    assert_eq!(
        rows.iter().map(|row| row.amount).collect::<Vec<_>>(),
        vec![1000, 1000, 5000]
    );
}

#[test]
fn manager_runs_the_whole_pipeline_from_files() {
    let root = tempfile::tempdir().unwrap();
    let data = tempfile::tempdir().unwrap();
    write_sources(data.path());

    let mut settings = Settings::default();
    settings.database.root = root.path().join("schemas");
    settings.database.schema = "records".to_string();

    let mut manager = stipend::create_default_manager(&settings).unwrap();
    assert!(root.path().join("schemas").join("records.sqlite3").exists());

    manager.reset_schema().unwrap();
    let report = manager.reload(&DirectoryCatalog::new(data.path())).unwrap();
    assert!(report.is_clean());
    assert_eq!(manager.num_rows(Entity::AcademicPerformance).unwrap(), 6);
    assert_eq!(manager.foreign_key_violations().unwrap(), vec![]);

    let students: Vec<String> = manager
        .get_students()
        .unwrap()
        .into_iter()
        .map(|student| student.lastname)
        .collect();
    assert_eq!(students, vec!["Antonova", "Smirnov", "Kuznetsov"]);

    let rows = manager
        .stipends(date(2024, 4, 15), settings.tiers())
        .unwrap();
    assert_eq!(rows.len(), 3);

    // A second session on the same schema sees the loaded data.
    drop(manager);
    let mut reopened = stipend::create_default_manager(&settings).unwrap();
    assert_eq!(reopened.num_rows(Entity::Student).unwrap(), 3);
}
