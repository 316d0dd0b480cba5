//! Rendering a decrypted report into a document

use std::fmt::Write as _;

use serde_json::Value;

use crate::error::CoreResult;
use crate::record::ReportRecord;
use crate::report::Report;
use crate::wizard::{Page, Question};

/// Turns a report into a downloadable document.
///
/// The record is borrowed for the call only; implementations must not keep it.
pub trait ReportExporter: Send + Sync {
    fn content_type(&self) -> &'static str;

    fn render(&self, report: &Report, record: &ReportRecord, pages: &[Page]) -> CoreResult<Vec<u8>>;
}

/// Question/answer listing in wizard order
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextExporter;

impl PlainTextExporter {
    pub fn render_text(&self, report: &Report, record: &ReportRecord, pages: &[Page]) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Report {}", report.id);
        let _ = writeln!(out, "Status: {}", report.status);
        let _ = writeln!(out, "Created: {}", report.created_at);
        if let Some(submitted_at) = report.submitted_at {
            let _ = writeln!(out, "Submitted: {submitted_at}");
        }

        let contact = &report.contact;
        for (label, value) in [
            ("Name", &contact.contact_name),
            ("Email", &contact.contact_email),
            ("Phone", &contact.contact_phone),
            ("Notes", &contact.contact_notes),
        ] {
            if let Some(value) = value {
                let _ = writeln!(out, "Contact {label}: {value}");
            }
        }

        for (index, page) in pages.iter().enumerate() {
            let _ = writeln!(out, "\nPage {}", index + 1);
            for question in &page.questions {
                let answer = record
                    .get(&question.field_name())
                    .map(|value| display_answer(question, value))
                    .unwrap_or_default();
                let _ = writeln!(out, "Q: {}", question.text);
                let _ = writeln!(out, "A: {answer}");
            }
        }
        out
    }
}

impl ReportExporter for PlainTextExporter {
    fn content_type(&self) -> &'static str {
        "text/plain; charset=utf-8"
    }

    fn render(&self, report: &Report, record: &ReportRecord, pages: &[Page]) -> CoreResult<Vec<u8>> {
        Ok(self.render_text(report, record, pages).into_bytes())
    }
}

/// Choice ids become choice text
fn display_answer(question: &Question, value: &Value) -> String {
    let choice_text = |id: &str| {
        question
            .kind
            .choices()
            .and_then(|choices| choices.iter().find(|c| c.id.to_string() == id))
            .map_or_else(|| id.to_string(), |c| c.text.clone())
    };

    match value {
        Value::Null => String::new(),
        Value::String(s) if question.kind.choices().is_some() => choice_text(s),
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => choice_text(s),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Answers;
    use crate::wizard::{Choice, QuestionKind};
    use serde_json::json;
    use uuid::Uuid;

    #[test]
    fn test_plain_text_lists_answers_in_page_order() {
        let pages = vec![Page {
            id: 1,
            position: 0,
            sites: vec![1],
            questions: vec![
                Question {
                    id: 1,
                    text: "What happened?".into(),
                    position: 0,
                    kind: QuestionKind::TextArea { max_length: 100 },
                },
                Question {
                    id: 2,
                    text: "Where?".into(),
                    position: 1,
                    kind: QuestionKind::Checkbox {
                        choices: vec![
                            Choice { id: 10, text: "On campus".into(), position: 0 },
                            Choice { id: 11, text: "Off campus".into(), position: 1 },
                        ],
                    },
                },
            ],
        }];
        let report = Report::new(Uuid::new_v4(), 1);
        let record = ReportRecord::new(Answers::from([
            ("question_1".into(), json!("a thing")),
            ("question_2".into(), json!(["10", "11"])),
        ]));

        let text = PlainTextExporter.render_text(&report, &record, &pages);
        assert!(text.contains("Q: What happened?\nA: a thing"));
        assert!(text.contains("A: On campus, Off campus"));
        assert_eq!(
            PlainTextExporter.render(&report, &record, &pages).unwrap(),
            text.into_bytes()
        );
    }
}
