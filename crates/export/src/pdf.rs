//! Paginated PDF report rendering.
//!
//! Rendering is behind [`ReportRenderer`] so the application layer can be
//! tested without font files on disk; [`GenpdfRenderer`] is the production
//! implementation.

use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use genpdf::{Element, elements, fonts, style::Style};

use vaptrack_core::{DomainError, DomainResult, ProjectId, UserId};
use vaptrack_domain::Finding;

const TITLE: &str = "VAPT Report";

/// Wrap column for body text at 10pt on A4 with the configured margins.
const WRAP_COLUMNS: usize = 90;

/// Descriptions are capped at this many rendered lines, with a truncation
/// marker when longer.
const DESC_MAX_LINES: usize = 6;

/// Everything needed to render one report file.
#[derive(Debug, Clone)]
pub struct ReportDoc {
    pub project_id: ProjectId,
    pub tester_id: UserId,
    pub generated_at: DateTime<Utc>,
    pub summary: String,
    pub findings: Vec<Finding>,
}

pub trait ReportRenderer: Send + Sync {
    /// Render `doc` to a new file at `dest`. Never overwrites semantics:
    /// callers choose a fresh path per generation.
    fn render(&self, doc: &ReportDoc, dest: &Path) -> DomainResult<()>;
}

/// Greedy word wrap to at most `columns` characters per line.
///
/// Words longer than a full line are hard-split so no line ever exceeds the
/// column budget.
pub fn wrap_text(text: &str, columns: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let mut word = word;
        while word.chars().count() > columns {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            let split_at = word
                .char_indices()
                .nth(columns)
                .map(|(i, _)| i)
                .unwrap_or(word.len());
            lines.push(word[..split_at].to_string());
            word = &word[split_at..];
        }

        if current.is_empty() {
            current.push_str(word);
        } else if current.chars().count() + 1 + word.chars().count() <= columns {
            current.push(' ');
            current.push_str(word);
        } else {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Description lines for one finding: wrapped, capped, marker appended.
fn description_lines(description: &str) -> Vec<String> {
    let mut lines = wrap_text(description, WRAP_COLUMNS);
    if lines.len() > DESC_MAX_LINES {
        lines.truncate(DESC_MAX_LINES);
        lines.push("…".to_string());
    }
    lines
}

/// genpdf-backed renderer (A4, Liberation Sans).
pub struct GenpdfRenderer {
    font_dirs: Vec<PathBuf>,
}

impl Default for GenpdfRenderer {
    fn default() -> Self {
        Self {
            font_dirs: vec![
                PathBuf::from("./fonts"),
                PathBuf::from("/usr/share/fonts/truetype/liberation"),
            ],
        }
    }
}

impl GenpdfRenderer {
    pub fn new(font_dirs: Vec<PathBuf>) -> Self {
        Self { font_dirs }
    }

    fn load_fonts(&self) -> DomainResult<fonts::FontFamily<fonts::FontData>> {
        for dir in &self.font_dirs {
            if let Ok(family) = fonts::from_files(dir, "LiberationSans", None) {
                return Ok(family);
            }
        }
        Err(DomainError::store(
            "no usable font directory found (install Liberation fonts)".to_string(),
        ))
    }
}

impl ReportRenderer for GenpdfRenderer {
    fn render(&self, doc: &ReportDoc, dest: &Path) -> DomainResult<()> {
        let mut pdf = genpdf::Document::new(self.load_fonts()?);
        pdf.set_title(TITLE);

        // Header block re-emitted on every page, so pagination inside the
        // summary or a description block keeps the report self-describing.
        let (project_id, tester_id) = (doc.project_id, doc.tester_id);
        let generated_at = doc.generated_at.to_rfc3339_opts(SecondsFormat::Secs, true);
        let mut decorator = genpdf::SimplePageDecorator::new();
        decorator.set_margins(15);
        decorator.set_header(move |_page| {
            let mut header = elements::LinearLayout::vertical();
            header.push(
                elements::Paragraph::new(TITLE).styled(Style::new().bold().with_font_size(14)),
            );
            header.push(elements::Paragraph::new(format!("Project ID: {project_id}")));
            header.push(elements::Paragraph::new(format!("Tester ID: {tester_id}")));
            header.push(elements::Paragraph::new(format!("Generated At: {generated_at}")));
            header.push(elements::Break::new(1));
            header.styled(Style::new().with_font_size(10))
        });
        pdf.set_page_decorator(decorator);

        let body = Style::new().with_font_size(10);
        let section = Style::new().bold().with_font_size(12);

        pdf.push(elements::Paragraph::new("Summary").styled(section));
        for line in wrap_text(&doc.summary, WRAP_COLUMNS) {
            pdf.push(elements::Paragraph::new(line).styled(body));
        }

        pdf.push(elements::Break::new(1));
        pdf.push(elements::Paragraph::new("Findings").styled(section));

        if doc.findings.is_empty() {
            pdf.push(elements::Paragraph::new("No findings yet.").styled(body));
        } else {
            for (idx, finding) in doc.findings.iter().enumerate() {
                let mut line = elements::Paragraph::default();
                line.push_styled(
                    format!("{}. {}", idx + 1, finding.title),
                    Style::new().bold().with_font_size(11),
                );
                line.push_styled(format!("    Severity: {}", finding.severity), body);
                pdf.push(line);

                for desc_line in description_lines(&finding.description) {
                    pdf.push(
                        elements::Paragraph::new(desc_line)
                            .styled(body)
                            .padded(genpdf::Margins::trbl(0, 0, 0, 6)),
                    );
                }
                pdf.push(elements::Break::new(1));
            }
        }

        pdf.render_to_file(dest)
            .map_err(|e| DomainError::store(format!("pdf render failed: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_at_column_budget() {
        let lines = wrap_text("alpha beta gamma delta", 11);
        assert_eq!(lines, vec!["alpha beta", "gamma delta"]);
        assert!(lines.iter().all(|l| l.chars().count() <= 11));
    }

    #[test]
    fn empty_text_wraps_to_nothing() {
        assert!(wrap_text("", WRAP_COLUMNS).is_empty());
        assert!(wrap_text("   ", WRAP_COLUMNS).is_empty());
    }

    #[test]
    fn oversized_words_are_hard_split() {
        let lines = wrap_text(&"x".repeat(25), 10);
        assert_eq!(lines.len(), 3);
        assert!(lines.iter().all(|l| l.chars().count() <= 10));
    }

    #[test]
    fn long_descriptions_truncate_with_marker() {
        let description = "word ".repeat(400);
        let lines = description_lines(&description);
        assert_eq!(lines.len(), DESC_MAX_LINES + 1);
        assert_eq!(lines.last().unwrap(), "…");
    }

    #[test]
    fn short_descriptions_are_untouched() {
        let lines = description_lines("a concise description");
        assert_eq!(lines, vec!["a concise description"]);
    }
}
