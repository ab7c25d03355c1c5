//! Output formatting helpers for the human-readable report.

use std::io::Write;

use enrollsync::reconcile::{LinkOutcome, PseudonymOutcome, Reconciliation, RunStats};
use enrollsync::report::{SampleRow, ScopeReport, percentage};

/// Progress markers per line.
pub const PROGRESS_WIDTH: usize = 50;

/// Diagnostics printed in a summary.
pub const SUMMARY_DIAGNOSTICS: usize = 10;

/// Print a table with aligned columns in human-readable format.
///
/// `headers` and each row in `rows` must have the same length.
pub fn print_table(headers: &[&str], rows: &[Vec<String>]) {
    if rows.is_empty() {
        return;
    }

    let col_count = headers.len();
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate().take(col_count) {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    println!("{}", render_line(headers, &widths));
    for row in rows {
        let cells: Vec<&str> = row.iter().map(String::as_str).collect();
        println!("{}", render_line(&cells, &widths));
    }
}

fn render_line(cells: &[&str], widths: &[usize]) -> String {
    let line: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(cell, &width)| format!("{cell:<width$}"))
        .collect();
    line.join("  ").trim_end().to_string()
}

/// An extra sample column: header and how to fill it.
pub type ExtraColumn<'a> = (&'a str, &'a dyn Fn(&SampleRow) -> String);

/// Print sampled enrollments, or a placeholder when there are none.
pub fn print_samples(title: &str, rows: &[SampleRow], extra: Option<ExtraColumn<'_>>) {
    println!();
    println!("{title}:");
    if rows.is_empty() {
        println!("  (none)");
        return;
    }

    let mut headers = vec!["ENROLLMENT", "USER", "NAME", "LOGIN", "SIS USER ID", "LINKED"];
    if let Some((header, _)) = extra {
        headers.push(header);
    }
    let table: Vec<Vec<String>> = rows
        .iter()
        .map(|row| {
            let mut cells = vec![
                row.enrollment_id.to_string(),
                row.user_id.to_string(),
                row.name.clone().unwrap_or_else(|| "(missing user)".into()),
                or_dash(row.login.as_deref()),
                or_dash(row.sis_user_id.as_deref()),
                row.linked_pseudonym
                    .map_or_else(|| "-".to_string(), |id| id.to_string()),
            ];
            if let Some((_, cell)) = extra {
                cells.push(cell(row));
            }
            cells
        })
        .collect();
    print_table(&headers, &table);
}

fn or_dash(value: Option<&str>) -> String {
    value.unwrap_or("-").to_string()
}

/// Print the scope figures shared by analyze and verify.
pub fn print_scope_report(report: &ScopeReport) {
    let users = report.distinct_users;
    let line = |label: &str, part: u64, whole: u64| {
        println!(
            "  {label:<34}{part:>8} / {whole:<8} ({:.1}%)",
            percentage(part, whole)
        );
    };

    println!("  {:<34}{:>8}", "Enrollments in scope", report.total_enrollments);
    println!("  {:<34}{:>8}", "Distinct users", users);
    line("Users with a login", report.users_with_pseudonym, users);
    line("Users with a SIS user id", report.users_with_sis_user_id, users);
    line(
        "Enrollments linked to a login",
        report.linked_enrollments,
        report.total_enrollments,
    );
}

/// Print capped diagnostics followed by how many were left out.
pub fn print_diagnostics(title: &str, lines: &[String], total: u64) {
    if total == 0 {
        return;
    }
    println!();
    println!("{title}:");
    for line in lines.iter().take(SUMMARY_DIAGNOSTICS) {
        println!("  {line}");
    }
    let shown = lines.len().min(SUMMARY_DIAGNOSTICS) as u64;
    if total > shown {
        println!("  ... and {} more", total - shown);
    }
}

/// Print the counters of an update pass.
pub fn print_update_summary(total: u64, stats: &RunStats) {
    println!();
    println!("Update summary:");
    println!("  {:<12}{:>8}", "In scope", total);
    println!("  {:<12}{:>8}", "Processed", stats.processed);
    println!("  {:<12}{:>8}", "Created", stats.created);
    println!("  {:<12}{:>8}", "Updated", stats.updated);
    println!("  {:<12}{:>8}", "Unchanged", stats.unchanged);
    println!("  {:<12}{:>8}", "Linked", stats.linked);
    println!("  {:<12}{:>8}", "Skipped", stats.skipped);
    println!("  {:<12}{:>8}", "Failed", stats.failed);
    print_diagnostics("Problems", stats.diagnostics(), stats.diagnostics_total());
}

/// The markers an enrollment's result prints, in order.
///
/// `C` created, `U` updated, `S` skipped, `F` failed, `L` linked. Records
/// that needed nothing print nothing.
pub fn markers(result: &Reconciliation) -> Vec<char> {
    let mut marks = Vec::with_capacity(2);
    match result.pseudonym {
        PseudonymOutcome::Created => marks.push('C'),
        PseudonymOutcome::Updated => marks.push('U'),
        PseudonymOutcome::Skipped { .. } => marks.push('S'),
        PseudonymOutcome::Failed { .. } => marks.push('F'),
        PseudonymOutcome::Unchanged => {}
    }
    match result.link {
        LinkOutcome::Linked => marks.push('L'),
        LinkOutcome::Failed { .. } => marks.push('F'),
        LinkOutcome::AlreadyLinked | LinkOutcome::NotAttempted => {}
    }
    marks
}

/// Single-character progress output, wrapped every [`PROGRESS_WIDTH`] markers.
pub struct Progress<W: Write> {
    out: W,
    written: usize,
}

impl Progress<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write> Progress<W> {
    pub fn new(out: W) -> Self {
        Self { out, written: 0 }
    }

    /// Print the markers for one result.
    ///
    /// Progress is best effort; a closed stdout does not stop the run.
    pub fn record(&mut self, result: &Reconciliation) {
        for mark in markers(result) {
            let _ = write!(self.out, "{mark}");
            self.written += 1;
            if self.written % PROGRESS_WIDTH == 0 {
                let _ = writeln!(self.out);
            }
        }
        let _ = self.out.flush();
    }

    /// End a partial line.
    pub fn finish(&mut self) {
        if self.written % PROGRESS_WIDTH != 0 {
            let _ = writeln!(self.out);
        }
        let _ = self.out.flush();
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}
