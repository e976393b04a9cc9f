use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::NavigationError;

/// Named end states the wizard can jump to without knowing their index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalState {
    Success,
    Failure,
    SubmittedProperties,
}

impl TerminalState {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Success => "Listing Submitted",
            Self::Failure => "Submission Failed",
            Self::SubmittedProperties => "Submitted Properties",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkflowDefinition {
    pub key: &'static str,
    pub name: &'static str,
    pub step_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub terminal: Option<TerminalState>,
}

impl WorkflowDefinition {
    pub const fn new(key: &'static str, name: &'static str, step_count: usize) -> Self {
        Self {
            key,
            name,
            step_count,
            terminal: None,
        }
    }

    pub const fn terminal(state: TerminalState, key: &'static str) -> Self {
        Self {
            key,
            name: state.label(),
            step_count: 1,
            terminal: Some(state),
        }
    }

    pub const fn last_step_index(&self) -> usize {
        self.step_count - 1
    }

    pub const fn is_terminal(&self) -> bool {
        self.terminal.is_some()
    }
}

/// Validated, ordered sequence of workflows fixed for the wizard's lifetime.
#[derive(Debug, Clone)]
pub struct WizardBlueprint {
    workflows: Vec<WorkflowDefinition>,
}

impl WizardBlueprint {
    pub fn new(workflows: Vec<WorkflowDefinition>) -> Result<Self, NavigationError> {
        if workflows.is_empty() {
            return Err(NavigationError::EmptyBlueprint);
        }

        let mut keys = HashSet::with_capacity(workflows.len());
        let mut terminals = HashSet::new();
        for workflow in &workflows {
            if workflow.step_count == 0 {
                return Err(NavigationError::EmptyWorkflow(workflow.key.to_string()));
            }
            if !keys.insert(workflow.key) {
                return Err(NavigationError::DuplicateWorkflow(workflow.key.to_string()));
            }
            if let Some(terminal) = workflow.terminal {
                if !terminals.insert(terminal) {
                    return Err(NavigationError::DuplicateTerminal(terminal));
                }
            }
        }

        Ok(Self { workflows })
    }

    /// The listing wizard: data-entry workflows, the review/submit workflow,
    /// then the terminal screens.
    pub fn standard() -> Self {
        Self {
            workflows: standard_workflows(),
        }
    }

    pub fn workflows(&self) -> &[WorkflowDefinition] {
        &self.workflows
    }

    pub fn len(&self) -> usize {
        self.workflows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workflows.is_empty()
    }

    pub fn get(&self, workflow_index: usize) -> Option<&WorkflowDefinition> {
        self.workflows.get(workflow_index)
    }

    pub fn index_of(&self, key: &str) -> Option<usize> {
        self.workflows.iter().position(|workflow| workflow.key == key)
    }

    pub fn terminal_index(&self, state: TerminalState) -> Option<usize> {
        self.workflows
            .iter()
            .position(|workflow| workflow.terminal == Some(state))
    }
}

impl Default for WizardBlueprint {
    fn default() -> Self {
        Self::standard()
    }
}

fn standard_workflows() -> Vec<WorkflowDefinition> {
    vec![
        WorkflowDefinition::new("property_basics", "Property Basics", 4),
        WorkflowDefinition::new("location", "Location", 3),
        WorkflowDefinition::new("structure", "Rooms & Structure", 5),
        WorkflowDefinition::new("features", "Features & House Rules", 4),
        WorkflowDefinition::new("pricing_availability", "Pricing & Availability", 3),
        WorkflowDefinition::new("photos", "Photos", 3),
        WorkflowDefinition::new("contact_review", "Contact & Review", 2),
        WorkflowDefinition::terminal(TerminalState::Success, "submission_success"),
        WorkflowDefinition::terminal(TerminalState::Failure, "submission_failure"),
        WorkflowDefinition::terminal(
            TerminalState::SubmittedProperties,
            "submitted_properties",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_blueprint_is_valid() {
        let standard = WizardBlueprint::standard();
        let rebuilt = WizardBlueprint::new(standard.workflows().to_vec()).expect("valid");
        assert_eq!(rebuilt.len(), standard.len());
        assert_eq!(standard.index_of("contact_review"), Some(6));
        assert_eq!(standard.terminal_index(TerminalState::Success), Some(7));
    }

    #[test]
    fn rejects_empty_and_zero_step_definitions() {
        assert!(matches!(
            WizardBlueprint::new(Vec::new()),
            Err(NavigationError::EmptyBlueprint)
        ));
        assert!(matches!(
            WizardBlueprint::new(vec![WorkflowDefinition::new("broken", "Broken", 0)]),
            Err(NavigationError::EmptyWorkflow(key)) if key == "broken"
        ));
    }

    #[test]
    fn rejects_duplicate_keys_and_terminals() {
        assert!(matches!(
            WizardBlueprint::new(vec![
                WorkflowDefinition::new("a", "A", 1),
                WorkflowDefinition::new("a", "Again", 2),
            ]),
            Err(NavigationError::DuplicateWorkflow(_))
        ));
        assert!(matches!(
            WizardBlueprint::new(vec![
                WorkflowDefinition::terminal(TerminalState::Success, "done"),
                WorkflowDefinition::terminal(TerminalState::Success, "done_again"),
            ]),
            Err(NavigationError::DuplicateTerminal(TerminalState::Success))
        ));
    }
}
