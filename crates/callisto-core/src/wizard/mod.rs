//! Reporting wizard
//!
//! Pages are configuration; answers are collected page by page into the
//! report's encrypted record through [`crate::ReportAggregate::update`].

mod engine;
mod question;

pub use engine::{PageView, QuestionView, StepOutcome, WizardEngine};
pub use question::{sort_pages, Choice, Page, Question, QuestionKind};
