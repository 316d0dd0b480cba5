//! Wizard configuration: pages, questions, choices

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

const DEFAULT_MAX_LENGTH: usize = 500;
const DEFAULT_TEXTAREA_LENGTH: usize = 10_000;

fn default_max_length() -> usize {
    DEFAULT_MAX_LENGTH
}

fn default_textarea_length() -> usize {
    DEFAULT_TEXTAREA_LENGTH
}

/// One wizard step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    /// Creation order; breaks position ties
    pub id: u64,
    #[serde(default)]
    pub position: i32,
    /// Sites the page is shown on
    #[serde(default)]
    pub sites: Vec<u32>,
    #[serde(default)]
    pub questions: Vec<Question>,
}

impl Page {
    pub fn is_on_site(&self, site_id: u32) -> bool {
        self.sites.contains(&site_id)
    }

    /// Questions and choices in display order
    pub fn sorted(mut self) -> Self {
        self.questions.sort_by_key(|q| (q.position, q.id));
        for question in &mut self.questions {
            if let Some(choices) = question.kind.choices_mut() {
                choices.sort_by_key(|c| (c.position, c.id));
            }
        }
        self
    }
}

/// Sort pages (and everything inside them) into wizard order
pub fn sort_pages(pages: Vec<Page>) -> Vec<Page> {
    let mut pages: Vec<Page> = pages.into_iter().map(Page::sorted).collect();
    pages.sort_by_key(|p| (p.position, p.id));
    pages
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: u64,
    pub text: String,
    #[serde(default)]
    pub position: i32,
    #[serde(flatten)]
    pub kind: QuestionKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    pub id: u64,
    pub text: String,
    #[serde(default)]
    pub position: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum QuestionKind {
    SingleLineText {
        #[serde(default = "default_max_length")]
        max_length: usize,
    },
    TextArea {
        #[serde(default = "default_textarea_length")]
        max_length: usize,
    },
    /// Single selection rendered as a dropdown
    Choice { choices: Vec<Choice> },
    Checkbox { choices: Vec<Choice> },
    RadioButton { choices: Vec<Choice> },
}

impl QuestionKind {
    pub fn choices(&self) -> Option<&[Choice]> {
        match self {
            QuestionKind::Choice { choices }
            | QuestionKind::Checkbox { choices }
            | QuestionKind::RadioButton { choices } => Some(choices),
            _ => None,
        }
    }

    fn choices_mut(&mut self) -> Option<&mut Vec<Choice>> {
        match self {
            QuestionKind::Choice { choices }
            | QuestionKind::Checkbox { choices }
            | QuestionKind::RadioButton { choices } => Some(choices),
            _ => None,
        }
    }
}

impl Question {
    /// Key under which the answer is stored in the record
    pub fn field_name(&self) -> String {
        format!("question_{}", self.id)
    }

    /// Validate and normalize a submitted value.
    ///
    /// `null` and empty strings mean "unanswered". Choice answers are stored
    /// as the choice id in string form.
    pub fn clean(&self, value: &Value) -> Result<Value, String> {
        if value.is_null() || value.as_str() == Some("") {
            return Ok(Value::Null);
        }

        match &self.kind {
            QuestionKind::SingleLineText { max_length } | QuestionKind::TextArea { max_length } => {
                let text = value.as_str().ok_or("Enter a valid value.")?;
                let length = text.chars().count();
                if length > *max_length {
                    return Err(format!(
                        "Ensure this value has at most {max_length} characters (it has {length})."
                    ));
                }
                Ok(Value::String(text.to_string()))
            }
            QuestionKind::Choice { choices } | QuestionKind::RadioButton { choices } => {
                clean_choice(choices, value).map(Value::String)
            }
            QuestionKind::Checkbox { choices } => {
                let items = value.as_array().ok_or("Enter a list of values.")?;
                let mut seen = HashSet::new();
                let mut cleaned = Vec::with_capacity(items.len());
                for item in items {
                    let id = clean_choice(choices, item)?;
                    if seen.insert(id.clone()) {
                        cleaned.push(Value::String(id));
                    }
                }
                Ok(Value::Array(cleaned))
            }
        }
    }
}

fn clean_choice(choices: &[Choice], value: &Value) -> Result<String, String> {
    let raw = match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => return Err("Enter a valid value.".into()),
    };
    if choices.iter().any(|c| c.id.to_string() == raw) {
        Ok(raw)
    } else {
        Err(format!(
            "Select a valid choice. {raw} is not one of the available choices."
        ))
    }
}
