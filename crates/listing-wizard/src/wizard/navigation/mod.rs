mod blueprint;
mod controller;

pub use blueprint::{TerminalState, WizardBlueprint, WorkflowDefinition};
pub use controller::{PositionView, WizardController, WizardPosition};

#[derive(Debug, thiserror::Error)]
pub enum NavigationError {
    #[error("a wizard needs at least one workflow")]
    EmptyBlueprint,
    #[error("workflow '{0}' must have at least one step")]
    EmptyWorkflow(String),
    #[error("workflow key '{0}' is defined more than once")]
    DuplicateWorkflow(String),
    #[error("terminal state {0:?} is defined more than once")]
    DuplicateTerminal(TerminalState),
    #[error("position ({workflow_index}, {step_index}) is outside the wizard")]
    OutOfBounds {
        workflow_index: usize,
        step_index: usize,
    },
    #[error("no workflow named '{0}'")]
    UnknownWorkflow(String),
    #[error("wizard has no {0:?} terminal")]
    MissingTerminal(TerminalState),
}
