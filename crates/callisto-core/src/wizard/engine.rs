//! Page navigation and answer collection

use std::sync::Arc;

use callisto_crypto::Passphrase;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use super::question::{Page, Question};
use crate::error::{CoreError, CoreResult, ValidationErrors};
use crate::export::ReportExporter;
use crate::record::{Answers, ReportRecord};
use crate::report::ReportAggregate;
use crate::store::PageStore;

/// A question with its previously stored answer
#[derive(Debug, Clone, Serialize)]
pub struct QuestionView {
    pub field: String,
    #[serde(flatten)]
    pub question: Question,
    pub initial: Option<Value>,
}

/// One rendered wizard step
#[derive(Debug, Clone, Serialize)]
pub struct PageView {
    pub step: usize,
    pub total_steps: usize,
    pub page_id: u64,
    pub questions: Vec<QuestionView>,
}

impl PageView {
    fn render(step: usize, total_steps: usize, page: &Page, record: &ReportRecord) -> Self {
        let questions = page
            .questions
            .iter()
            .map(|q| {
                let field = q.field_name();
                let initial = record.get(&field).filter(|v| !v.is_null()).cloned();
                QuestionView {
                    field,
                    question: q.clone(),
                    initial,
                }
            })
            .collect();
        Self {
            step,
            total_steps,
            page_id: page.id,
            questions,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepOutcome {
    Next(usize),
    /// Last page saved; the report is ready for review and submission
    Done,
}

#[derive(Clone)]
pub struct WizardEngine {
    pages: Arc<dyn PageStore>,
    reports: ReportAggregate,
}

impl WizardEngine {
    pub fn new(pages: Arc<dyn PageStore>, reports: ReportAggregate) -> Self {
        Self { pages, reports }
    }

    /// Pages shown on a site, in wizard order
    pub async fn pages(&self, site_id: u32) -> CoreResult<Vec<Page>> {
        self.pages.pages_for_site(site_id).await
    }

    pub async fn current_page(
        &self,
        report_id: &Uuid,
        site_id: u32,
        step: usize,
        passphrase: &Passphrase,
    ) -> CoreResult<PageView> {
        let pages = self.pages(site_id).await?;
        let page = page_at(&pages, step)?;
        let record = self.reports.decrypt(report_id, passphrase).await?;
        Ok(PageView::render(step, pages.len(), page, &record))
    }

    /// Jump to any step. Answers are keyed, so nothing entered elsewhere is lost.
    pub async fn goto(
        &self,
        report_id: &Uuid,
        site_id: u32,
        step: usize,
        passphrase: &Passphrase,
    ) -> CoreResult<PageView> {
        self.current_page(report_id, site_id, step, passphrase).await
    }

    /// Validate and save the answers for `step`, then move forward
    pub async fn advance(
        &self,
        report_id: &Uuid,
        site_id: u32,
        step: usize,
        submitted: Answers,
        passphrase: &Passphrase,
    ) -> CoreResult<StepOutcome> {
        let pages = self.pages(site_id).await?;
        let page = page_at(&pages, step)?;
        let cleaned = clean_page(page, &submitted)?;

        self.reports.update(report_id, passphrase, cleaned).await?;
        tracing::debug!(report = %report_id, step, "wizard step saved");

        if step + 1 < pages.len() {
            Ok(StepOutcome::Next(step + 1))
        } else {
            Ok(StepOutcome::Done)
        }
    }

    /// Every page with its answers, for the review screen
    pub async fn review(
        &self,
        report_id: &Uuid,
        site_id: u32,
        passphrase: &Passphrase,
    ) -> CoreResult<Vec<PageView>> {
        let pages = self.pages(site_id).await?;
        let record = self.reports.decrypt(report_id, passphrase).await?;
        Ok(pages
            .iter()
            .enumerate()
            .map(|(step, page)| PageView::render(step, pages.len(), page, &record))
            .collect())
    }

    /// Render the decrypted report into a document
    pub async fn export(
        &self,
        exporter: &dyn ReportExporter,
        report_id: &Uuid,
        site_id: u32,
        passphrase: &Passphrase,
    ) -> CoreResult<Vec<u8>> {
        let pages = self.pages(site_id).await?;
        let report = self.reports.get(report_id).await?;
        let record = self.reports.decrypt(report_id, passphrase).await?;
        exporter.render(&report, &record, &pages)
    }
}

fn page_at(pages: &[Page], step: usize) -> CoreResult<&Page> {
    pages
        .get(step)
        .ok_or_else(|| CoreError::NotFound(format!("wizard step {step}")))
}

/// Clean the answers for one page; keys for other pages are ignored
fn clean_page(page: &Page, submitted: &Answers) -> CoreResult<Answers> {
    let mut errors = ValidationErrors::default();
    let mut cleaned = Answers::new();

    for question in &page.questions {
        let field = question.field_name();
        let Some(value) = submitted.get(&field) else {
            continue;
        };
        match question.clean(value) {
            Ok(value) => {
                cleaned.insert(field, value);
            }
            Err(message) => errors.add(field, message),
        }
    }

    errors.into_result()?;
    Ok(cleaned)
}
