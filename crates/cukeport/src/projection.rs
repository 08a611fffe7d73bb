// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Turning a finished test case attempt into reportable items

use std::collections::HashMap;

use cukeport_client::Attribute;
use cukeport_messages::{Hook, PickleStep, Tag, TestCaseAttempt, TestStep};

use crate::attributes::extract_attributes;
use crate::error::ReportError;
use crate::format::step_display_name;
use crate::hierarchy::StepDescriptor;
use crate::status::is_failing;

/// Name of a hook step run before any gherkin step
pub const BEFORE_HOOK: &str = "Before";
/// Name of a hook step run after a gherkin step
pub const AFTER_HOOK: &str = "After";

/// Hook names announced by the runner
#[derive(Debug, Default)]
pub struct Registry {
    hook_names: HashMap<String, String>,
}

impl Registry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a hook; only named hooks contribute a display name
    pub fn register_hook(&mut self, hook: &Hook) {
        if let Some(name) = hook.name.as_deref().filter(|n| !n.is_empty()) {
            self.hook_names.insert(hook.id.clone(), name.to_string());
        }
    }

    /// Registered name of a hook
    #[must_use]
    pub fn hook_name(&self, hook_id: &str) -> Option<&str> {
        self.hook_names.get(hook_id).map(String::as_str)
    }
}

/// Everything needed to report one test case attempt
#[derive(Debug, Clone, PartialEq)]
pub struct TestCaseProjection {
    /// Feature (suite) name
    pub feature_name: String,
    /// Feature tags
    pub feature_tags: Vec<Tag>,
    /// Feature description
    pub feature_description: String,
    /// Scenario name
    pub name: String,
    /// Scenario tags
    pub tags: Vec<Tag>,
    /// Attributes from directive log lines
    pub attributes: Vec<Attribute>,
    /// Whether this is not the first attempt
    pub is_retry: bool,
    /// Steps in execution order, hooks included
    pub steps: Vec<StepDescriptor>,
}

impl TestCaseProjection {
    /// Check if any step fails the test case
    #[must_use]
    pub fn any_step_failed(&self) -> bool {
        self.steps.iter().any(|step| is_failing(step.status))
    }
}

/// Project an attempt onto reportable items
///
/// # Errors
///
/// Returns `ReportError::MissingFeature` if the attempt's gherkin document
/// has no feature.
pub fn project(
    attempt: &TestCaseAttempt,
    registry: &Registry,
) -> Result<TestCaseProjection, ReportError> {
    let feature = attempt
        .gherkin_document
        .feature
        .as_ref()
        .ok_or_else(|| ReportError::MissingFeature {
            uri: attempt.gherkin_document.uri.clone(),
        })?;

    let test_steps = &attempt.test_case.test_steps;
    let steps = test_steps
        .iter()
        .enumerate()
        .map(|(index, test_step)| {
            let result = attempt.step_result(&test_step.id);
            StepDescriptor {
                name: step_name(attempt, test_step, &test_steps[..index], registry),
                status: result.status,
                duration: result.duration,
                message: result.message,
                attachments: attempt.step_attachments(&test_step.id).to_vec(),
            }
        })
        .collect();

    let attributes = extract_attributes(
        test_steps
            .iter()
            .flat_map(|step| attempt.step_attachments(&step.id)),
    );

    Ok(TestCaseProjection {
        feature_name: feature.name.clone(),
        feature_tags: feature.tags.clone(),
        feature_description: feature.description.clone(),
        name: attempt.pickle.name.clone(),
        tags: attempt.pickle.tags.clone(),
        attributes,
        is_retry: attempt.is_retry(),
        steps,
    })
}

/// Display name of a test step
///
/// Gherkin steps use their text. Anything else, including a step whose
/// pickle step is missing, is a hook: its registered name, or `Before` when
/// no gherkin step precedes it and `After` otherwise.
fn step_name(
    attempt: &TestCaseAttempt,
    test_step: &TestStep,
    preceding: &[TestStep],
    registry: &Registry,
) -> String {
    if let Some(pickle_step) = pickle_step(attempt, test_step) {
        return step_display_name(pickle_step);
    }

    if let Some(name) = test_step
        .hook_id
        .as_deref()
        .and_then(|id| registry.hook_name(id))
    {
        return name.to_string();
    }

    if preceding
        .iter()
        .all(|step| pickle_step(attempt, step).is_none())
    {
        BEFORE_HOOK.to_string()
    } else {
        AFTER_HOOK.to_string()
    }
}

fn pickle_step<'a>(attempt: &'a TestCaseAttempt, test_step: &TestStep) -> Option<&'a PickleStep> {
    let id = test_step.pickle_step_id.as_deref()?;
    attempt.pickle.steps.iter().find(|step| step.id == id)
}
