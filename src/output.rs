use colored::{Color, Colorize};

use crate::models::{Action, Decision, Report};
use crate::rules::format_date;

const HEADERS: [&str; 5] = ["IMAGE", "TAG", "RULE", "STATUS", "EXPIRE DATE"];
const TAG_WIDTH: usize = 18;

/// One uncolored table row with the colors its cells are printed in
struct Row {
    cells: [String; 5],
    rule_color: Color,
    status_color: Color,
}

impl Row {
    fn from_decision(decision: &Decision, dry_run: bool) -> Self {
        let (rule, rule_color) = match decision.action {
            Action::Blank => ("-".to_string(), Color::Magenta),
            Action::Skip => ("skip".to_string(), Color::Blue),
            Action::Exist => ("exist".to_string(), Color::Green),
            Action::Keep => (rule_name(decision), Color::Cyan),
            Action::Expire => (rule_name(decision), Color::Yellow),
            Action::ExpireDefault => ("expire".to_string(), Color::Red),
        };

        let (state, status_color) = status(decision, dry_run);

        let date = match (decision.action, &decision.expires_at) {
            (Action::Blank, _) => "-".to_string(),
            (Action::Exist, _) => decision.existing_expiration.clone().unwrap_or_default(),
            (_, Some(date)) => format_date(date),
            (_, None) => "0".to_string(),
        };

        let tag = decision
            .tag
            .as_deref()
            .map_or_else(|| "-".to_string(), |t| t.chars().take(TAG_WIDTH).collect());

        Self {
            cells: [decision.repository.clone(), tag, rule, state.to_string(), date],
            rule_color,
            status_color,
        }
    }
}

fn rule_name(decision: &Decision) -> String {
    decision.rule.clone().unwrap_or_default()
}

fn status(decision: &Decision, dry_run: bool) -> (&'static str, Color) {
    if decision.action == Action::Blank {
        ("BLANK", Color::Magenta)
    } else if decision.applied {
        ("CHANGED", Color::Green)
    } else if !decision.wants_change() {
        ("SKIP", Color::Blue)
    } else if dry_run {
        ("DRY-RUN", Color::Yellow)
    } else {
        ("FAILED", Color::Red)
    }
}

pub fn print_dry_run_banner() {
    println!(
        "{}",
        "Run in dry run mode, do not change anything."
            .yellow()
            .bold()
            .underline()
    );
}

/// Print the decision table
pub fn print_report(report: &Report, dry_run: bool) {
    let rows: Vec<Row> = report
        .decisions
        .iter()
        .map(|d| Row::from_decision(d, dry_run))
        .collect();

    let mut widths = HEADERS.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(&row.cells) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let header: Vec<String> = HEADERS
        .iter()
        .zip(widths)
        .map(|(h, w)| format!("{:<w$}", h, w = w))
        .collect();
    println!("{}", header.join("  ").bold());

    for row in &rows {
        // Pad before coloring so escape codes do not count towards width
        let [image, tag, rule, state, date] = &row.cells;
        println!(
            "{:<w0$}  {:<w1$}  {}  {}  {}",
            image,
            tag,
            format!("{:<w$}", rule, w = widths[2]).color(row.rule_color),
            format!("{:<w$}", state, w = widths[3]).color(row.status_color),
            date.color(row.rule_color),
            w0 = widths[0],
            w1 = widths[1],
        );
    }
}

/// Print final summary
pub fn print_summary(report: &Report, dry_run: bool) {
    println!(
        "{} Changed {} tags expiration of {} tags in {} repositories",
        "Done.".green().bold(),
        report.changed.to_string().green().bold(),
        report.tags,
        report.repositories,
    );
    if dry_run && report.pending > 0 {
        println!(
            "{} {} tags would change without --dry-run",
            "DRY RUN:".yellow().bold(),
            report.pending,
        );
    }
    if report.failed > 0 {
        println!(
            "{} {} tag updates failed, see errors above",
            "WARNING:".red().bold(),
            report.failed.to_string().red().bold(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decision(action: Action, seconds: u64, applied: bool) -> Decision {
        Decision {
            tag: Some("a-very-long-tag-name-that-gets-cut".into()),
            action,
            expiration_seconds: seconds,
            applied,
            ..Decision::blank("acme/app")
        }
    }

    #[test]
    fn test_status_labels() {
        assert_eq!(status(&Decision::blank("acme/app"), false).0, "BLANK");
        assert_eq!(status(&decision(Action::Expire, 60, true), false).0, "CHANGED");
        assert_eq!(status(&decision(Action::Keep, 0, false), false).0, "SKIP");
        assert_eq!(status(&decision(Action::Expire, 60, false), true).0, "DRY-RUN");
        assert_eq!(status(&decision(Action::Expire, 60, false), false).0, "FAILED");
    }

    #[test]
    fn test_row_truncates_tag() {
        let row = Row::from_decision(&decision(Action::Skip, 0, false), false);
        assert_eq!(row.cells[1], "a-very-long-tag-na");
        assert_eq!(row.cells[2], "skip");
        assert_eq!(row.cells[4], "0");
    }

    #[test]
    fn test_row_for_blank_repository() {
        let row = Row::from_decision(&Decision::blank("acme/empty"), false);
        assert_eq!(row.cells, [
            "acme/empty".to_string(),
            "-".to_string(),
            "-".to_string(),
            "BLANK".to_string(),
            "-".to_string(),
        ]);
    }

    #[test]
    fn test_row_shows_existing_expiration() {
        let mut d = decision(Action::Exist, 0, false);
        d.existing_expiration = Some("Thu, 01 Jan 2026 00:00:00 -0000".into());
        let row = Row::from_decision(&d, false);
        assert_eq!(row.cells[2], "exist");
        assert_eq!(row.cells[4], "Thu, 01 Jan 2026 00:00:00 -0000");
    }

    #[test]
    fn test_row_uses_rule_name() {
        let mut d = decision(Action::Keep, 0, false);
        d.rule = Some("release".into());
        assert_eq!(Row::from_decision(&d, false).cells[2], "release");
        assert_eq!(
            Row::from_decision(&decision(Action::ExpireDefault, 60, false), true).cells[2],
            "expire"
        );
    }
}
