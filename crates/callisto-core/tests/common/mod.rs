//! Shared fixtures for service-level tests

#![allow(dead_code)]

use std::sync::Arc;

use callisto_core::notification::OutboundEmail;
use callisto_core::store::memory::InMemoryPageStore;
use callisto_core::wizard::Choice;
use callisto_core::{
    Backends, MatchPolicy, OutboxNotifier, Page, Question, QuestionKind, Services, SiteProfile,
    StaticSiteSettings,
};
use callisto_crypto::KdfParams;

pub const SITE: u32 = 1;
pub const COORDINATOR: &str = "coordinator@example.edu";

pub struct Harness {
    pub services: Services,
    pub outbox: Arc<OutboxNotifier>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_policy(MatchPolicy::default())
    }

    pub fn with_policy(policy: MatchPolicy) -> Self {
        let mut backends = Backends::in_memory();
        backends.pages = Arc::new(InMemoryPageStore::with_pages(pages()));

        let outbox = Arc::new(OutboxNotifier::new(
            backends.notifications.clone(),
            backends.reports.clone(),
            backends.pages.clone(),
        ));
        let sites = Arc::new(StaticSiteSettings::new([SiteProfile {
            id: SITE,
            coordinator_emails: vec![COORDINATOR.into()],
            coordinator_public_key: None,
        }]));
        let services = Services::new(
            backends,
            outbox.clone(),
            sites,
            KdfParams::insecure_for_tests(),
            policy,
        );
        Self { services, outbox }
    }

    /// Queued messages with the given template name
    pub fn sent(&self, name: &str) -> Vec<OutboundEmail> {
        self.outbox
            .outbox()
            .into_iter()
            .filter(|email| email.name == name)
            .collect()
    }
}

/// Two pages on the test site: free text, then a radio question
pub fn pages() -> Vec<Page> {
    vec![
        Page {
            id: 2,
            position: 1,
            sites: vec![SITE],
            questions: vec![Question {
                id: 2,
                text: "Did you tell anyone?".into(),
                position: 0,
                kind: QuestionKind::RadioButton {
                    choices: vec![
                        Choice {
                            id: 1,
                            text: "Yes".into(),
                            position: 0,
                        },
                        Choice {
                            id: 2,
                            text: "No".into(),
                            position: 1,
                        },
                    ],
                },
            }],
        },
        Page {
            id: 1,
            position: 0,
            sites: vec![SITE],
            questions: vec![Question {
                id: 1,
                text: "What happened?".into(),
                position: 0,
                kind: QuestionKind::SingleLineText { max_length: 100 },
            }],
        },
    ]
}
