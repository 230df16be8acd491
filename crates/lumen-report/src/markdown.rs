//! Markdown report output.
//!
//! The document has a title, a summary table, the question excerpt, a
//! turn-by-turn timeline, the recommendations and a footer.

use chrono::{DateTime, Utc};
use std::fmt::Write;

use crate::{Report, TimelineEntry};

/// Maximum length of evaluator feedback shown in the timeline table.
const MAX_FEEDBACK_DISPLAY_LENGTH: usize = 100;

/// Renders a [`Report`] as Markdown.
pub struct MarkdownGenerator<'a> {
    report: &'a Report,
}

impl<'a> MarkdownGenerator<'a> {
    /// Creates a new Markdown generator for the given report.
    #[must_use]
    pub const fn new(report: &'a Report) -> Self {
        Self { report }
    }

    /// Generates the complete Markdown document.
    #[must_use]
    pub fn generate(&self) -> String {
        let mut output = String::new();

        self.write_title(&mut output);
        self.write_summary(&mut output);
        self.write_question(&mut output);
        self.write_timeline(&mut output);
        self.write_recommendations(&mut output);
        Self::write_footer(&mut output);

        output
    }

    fn write_title(&self, output: &mut String) {
        let _ = writeln!(
            output,
            "# Lumen Session Report: {}\n",
            escape_markdown(&capitalize(&self.report.subject))
        );
    }

    fn write_summary(&self, output: &mut String) {
        let summary = &self.report.summary;

        let _ = writeln!(output, "## Summary\n");
        let _ = writeln!(output, "| Metric | Value |");
        let _ = writeln!(output, "|--------|-------|");
        let _ = writeln!(output, "| Status | {} |", summary.status.description());
        let _ = writeln!(output, "| Language | {} |", escape_markdown(&summary.language));
        let _ = writeln!(
            output,
            "| Turns | {} of {} |",
            summary.turns, summary.max_turns
        );
        let _ = writeln!(
            output,
            "| Comprehension | {}% → {}% ({}) |",
            summary.initial_score,
            summary.final_score,
            format_change(self.report.net_change())
        );
        let _ = writeln!(output, "| Peak | {}% |", summary.peak_score);
        let _ = writeln!(
            output,
            "| Badge | {} |",
            escape_markdown(&summary.final_badge)
        );
        let _ = writeln!(
            output,
            "| Verdicts | {} correct, {} partial, {} incorrect |",
            summary.correct, summary.partial, summary.incorrect
        );
        let _ = writeln!(
            output,
            "| Longest Wrong Streak | {} |",
            summary.longest_wrong_streak
        );
        let _ = writeln!(
            output,
            "| Duration | {} |",
            format_duration(summary.duration_seconds)
        );
        let _ = writeln!(output);
    }

    fn write_question(&self, output: &mut String) {
        let _ = writeln!(output, "## Question\n");

        if self.report.question_excerpt.is_empty() {
            let _ = writeln!(output, "*No question text recorded.*\n");
            return;
        }

        let _ = writeln!(output, "> {}\n", escape_markdown(&self.report.question_excerpt));
    }

    fn write_timeline(&self, output: &mut String) {
        let _ = writeln!(output, "## Timeline\n");

        if self.report.timeline.is_empty() {
            let _ = writeln!(output, "*No replies recorded.*\n");
            return;
        }

        let _ = writeln!(
            output,
            "| Turn | Time | Verdict | Change | Score | Badge | Scorer | Feedback |"
        );
        let _ = writeln!(
            output,
            "|------|------|---------|--------|-------|-------|--------|----------|"
        );

        for entry in &self.report.timeline {
            Self::write_timeline_entry(output, entry);
        }

        let _ = writeln!(output);
    }

    fn write_timeline_entry(output: &mut String, entry: &TimelineEntry) {
        let feedback = entry
            .feedback
            .as_deref()
            .map(|f| escape_markdown(&truncate(f, MAX_FEEDBACK_DISPLAY_LENGTH)))
            .unwrap_or_default();

        let turn = entry.turn;
        let time = format_timestamp(&entry.timestamp);
        let icon = entry.verdict.icon();
        let verdict = entry.verdict;
        let change = format_change(i64::from(entry.delta));
        let score = entry.score;
        let badge = escape_markdown(&entry.badge);
        let source = escape_markdown(&entry.source);
        let _ = writeln!(
            output,
            "| #{turn} | {time} | {icon} {verdict} | {change} | {score}% | {badge} | {source} | {feedback} |"
        );
    }

    fn write_recommendations(&self, output: &mut String) {
        let _ = writeln!(output, "## Recommendations\n");

        if self.report.recommendations.is_empty() {
            let _ = writeln!(output, "*No specific recommendations.*\n");
            return;
        }

        let mut sorted: Vec<_> = self.report.recommendations.iter().collect();
        sorted.sort_by_key(|r| r.priority);

        for (index, rec) in sorted.iter().enumerate() {
            let _ = writeln!(
                output,
                "{}. **[{}]** {}",
                index + 1,
                escape_markdown(&rec.category),
                escape_markdown(&rec.description),
            );
        }

        let _ = writeln!(output);
    }

    fn write_footer(output: &mut String) {
        let _ = writeln!(output, "---");
        let timestamp = format_timestamp(&Utc::now());
        let _ = writeln!(output, "*Generated by Lumen at {timestamp}*");
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Formats a duration in seconds, e.g. 65 -> "1m 5s".
fn format_duration(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    let mut parts = Vec::new();

    if hours > 0 {
        parts.push(format!("{hours}h"));
    }
    if minutes > 0 {
        parts.push(format!("{minutes}m"));
    }
    if secs > 0 || parts.is_empty() {
        parts.push(format!("{secs}s"));
    }

    parts.join(" ")
}

/// Formats a timestamp as "YYYY-MM-DD HH:MM:SS UTC".
fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

/// Formats a signed score change with an explicit sign.
fn format_change(change: i64) -> String {
    if change > 0 {
        format!("+{change}")
    } else {
        change.to_string()
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

/// Escapes special Markdown characters so student text renders literally.
fn escape_markdown(text: &str) -> String {
    let mut result = String::with_capacity(text.len());

    for ch in text.chars() {
        match ch {
            '*' | '_' | '`' | '#' | '[' | ']' | '(' | ')' | '!' | '\\' | '<' | '>' | '|' => {
                result.push('\\');
                result.push(ch);
            }
            // table cells cannot contain raw newlines
            '\n' => result.push_str("<br>"),
            _ => result.push(ch),
        }
    }

    result
}

/// Truncates to `max_chars` characters, adding an ellipsis if needed.
fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max_chars).collect();
        format!("{cut}...")
    }
}

// ============================================================================
// Tests
// ============================================================================
