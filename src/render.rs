//! Task body rendering.
//!
//! The author treats rendering as opaque: it asks a [`TaskRenderer`] for the
//! body and only appends its marker line afterwards. [`FrontMatterRenderer`]
//! is the default layout, the front matter calendar plugins for Markdown
//! vaults read back.

use crate::task::{TaskRecord, DATE_FORMAT, TIME_FORMAT};

/// Pure function from a task to its file body.
pub trait TaskRenderer: Send + Sync {
    fn render(&self, task: &TaskRecord) -> String;
}

impl<F> TaskRenderer for F
where
    F: Fn(&TaskRecord) -> String + Send + Sync,
{
    fn render(&self, task: &TaskRecord) -> String {
        self(task)
    }
}

/// YAML front matter layout:
///
/// ```text
/// ---
/// title: Meeting
/// allDay: false
/// date: 2025-02-12
/// startTime: 14:30
/// endTime: 17:21
/// type: single
/// ---
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct FrontMatterRenderer;

impl TaskRenderer for FrontMatterRenderer {
    fn render(&self, task: &TaskRecord) -> String {
        let mut lines = Vec::with_capacity(9);
        lines.push("---".to_string());
        lines.push(format!("title: {}", yaml_scalar(task.title())));
        lines.push(format!("allDay: {}", task.is_all_day()));
        lines.push(format!("date: {}", task.start_date().format(DATE_FORMAT)));
        if let Some(end) = task.end_date() {
            lines.push(format!("endDate: {}", end.format(DATE_FORMAT)));
        }
        if let Some(span) = task.times() {
            lines.push(format!("startTime: {}", span.start.format(TIME_FORMAT)));
            lines.push(format!("endTime: {}", span.end.format(TIME_FORMAT)));
        }
        lines.push("type: single".to_string());
        lines.push("---".to_string());

        let mut body = lines.join("\n");
        body.push('\n');
        body
    }
}

/// Quote a scalar when plain YAML would misread it.
fn yaml_scalar(value: &str) -> String {
    const SPECIAL: &[char] = &[
        ':', '#', '\'', '"', '[', ']', '{', '}', ',', '&', '*', '!', '|', '>', '%', '@', '`', '\\',
    ];
    let reserved = matches!(
        value.to_ascii_lowercase().as_str(),
        "true" | "false" | "yes" | "no" | "on" | "off" | "null" | "~"
    );
    let needs_quotes = value.is_empty()
        || reserved
        || value.trim() != value
        || value.starts_with(['-', '?'])
        || value.contains(SPECIAL)
        || value.parse::<f64>().is_ok();

    if needs_quotes {
        // JSON strings are valid YAML double-quoted scalars.
        serde_json::to_string(value).unwrap_or_else(|_| format!("\"{value}\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{parse_date, parse_time};

    #[test]
    fn renders_all_day_single_date() {
        let task = TaskRecord::builder("Full Day Task Same Day", parse_date("2025-02-12").unwrap())
            .build()
            .unwrap();
        let body = FrontMatterRenderer.render(&task);
        assert_eq!(
            body,
            "---\ntitle: Full Day Task Same Day\nallDay: true\ndate: 2025-02-12\ntype: single\n---\n"
        );
    }

    #[test]
    fn renders_timed_multi_day() {
        let task = TaskRecord::builder(
            "Scheduled Time Task multiple days",
            parse_date("2025-02-12").unwrap(),
        )
        .end_date(parse_date("2025-02-13").unwrap())
        .times(parse_time("15:04").unwrap(), parse_time("09:49").unwrap())
        .build()
        .unwrap();
        let body = FrontMatterRenderer.render(&task);
        assert!(body.contains("allDay: false\n"));
        assert!(body.contains("endDate: 2025-02-13\n"));
        assert!(body.contains("startTime: 15:04\nendTime: 09:49\n"));
        assert!(body.ends_with("---\n"));
    }

    #[test]
    fn quotes_ambiguous_titles() {
        assert_eq!(yaml_scalar("Plain title"), "Plain title");
        assert_eq!(yaml_scalar("yes"), "\"yes\"");
        assert_eq!(yaml_scalar("2025"), "\"2025\"");
        assert_eq!(yaml_scalar("#tagged"), "\"#tagged\"");
        assert_eq!(yaml_scalar("- item"), "\"- item\"");
    }

    #[test]
    fn closures_are_renderers() {
        let renderer = |task: &TaskRecord| format!("# {}\n", task.title());
        let task = TaskRecord::builder("Closure", parse_date("2025-02-12").unwrap())
            .build()
            .unwrap();
        assert_eq!(renderer.render(&task), "# Closure\n");
    }
}
