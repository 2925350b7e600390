use crate::import::ImportReport;
use crate::integrity::ForeignKeyViolation;
use crate::stipend::StipendRow;
use tabled::{Table, Tabled, settings::Style};

/// Placeholder printed for a missing middle name, keeping every line at six fields.
const NO_MIDDLE_NAME: &str = "-";

/// Formats one report row as six whitespace-separated fields.
pub fn format_stipend_row(row: &StipendRow) -> String {
    format!(
        "{} {} {} {} {} {}",
        row.student_id,
        row.lastname,
        row.firstname,
        row.middlename.as_deref().unwrap_or(NO_MIDDLE_NAME),
        row.group_id,
        row.amount
    )
}

/// Prints the stipend report, one student per line.
pub fn print_stipends(rows: &[StipendRow]) {
    for row in rows {
        println!("{}", format_stipend_row(row));
    }
}

/// Pretty prints the stipend report as a table.
pub fn show_stipends_table(rows: &[StipendRow]) {
    #[derive(Tabled)]
    struct ReportLine {
        id: i32,
        lastname: String,
        firstname: String,
        middlename: String,
        group: String,
        stipend: i32,
    }

    let lines: Vec<ReportLine> = rows
        .iter()
        .map(|row| ReportLine {
            id: row.student_id,
            lastname: row.lastname.clone(),
            firstname: row.firstname.clone(),
            middlename: row.middlename.clone().unwrap_or_default(),
            group: row.group_id.clone(),
            stipend: row.amount,
        })
        .collect();

    let mut table = Table::new(lines);
    table.with(Style::modern());

    println!("Stipends:\n{table}");
}

/// Pretty prints how many rows of each source were loaded and skipped, followed by every
/// skipped row.
pub fn show_import_summary(report: &ImportReport) {
    #[derive(Tabled)]
    struct SourceLine {
        source: String,
        loaded: usize,
        skipped: usize,
    }

    let lines: Vec<SourceLine> = report
        .sources
        .iter()
        .map(|source| SourceLine {
            source: source.source.clone(),
            loaded: source.loaded,
            skipped: source.skipped(),
        })
        .collect();

    let mut table = Table::new(lines);
    table.with(Style::modern());
    println!("Import summary:\n{table}");

    if report.is_clean() {
        return;
    }

    #[derive(Tabled)]
    struct FailureLine {
        source: String,
        line: u64,
        kind: String,
        reason: String,
    }

    let failures: Vec<FailureLine> = report
        .sources
        .iter()
        .flat_map(|source| {
            source.failures.iter().map(|failure| FailureLine {
                source: source.source.clone(),
                line: failure.line,
                kind: failure.kind.to_string(),
                reason: failure.message.clone(),
            })
        })
        .collect();

    let mut table = Table::new(failures);
    table.with(Style::modern());
    println!("Skipped rows:\n{table}");
}

/// Pretty prints dangling foreign keys, if any.
pub fn show_violations(violations: &[ForeignKeyViolation]) {
    if violations.is_empty() {
        println!("All foreign keys resolve.");
        return;
    }

    #[derive(Tabled)]
    struct ViolationLine {
        table: String,
        rowid: String,
        parent: String,
    }

    let lines: Vec<ViolationLine> = violations
        .iter()
        .map(|violation| ViolationLine {
            table: violation.table.clone(),
            rowid: violation
                .rowid
                .map_or_else(|| "?".to_string(), |rowid| rowid.to_string()),
            parent: violation.parent.clone(),
        })
        .collect();

    let mut table = Table::new(lines);
    table.with(Style::modern());
    println!("Dangling foreign keys:\n{table}");
}
