use serde::Serialize;

use super::blueprint::{TerminalState, WizardBlueprint, WorkflowDefinition};
use super::NavigationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct WizardPosition {
    pub workflow_index: usize,
    pub step_index: usize,
}

impl WizardPosition {
    pub const fn new(workflow_index: usize, step_index: usize) -> Self {
        Self {
            workflow_index,
            step_index,
        }
    }
}

/// Serializable snapshot of where the wizard currently is.
#[derive(Debug, Clone, Serialize)]
pub struct PositionView {
    pub workflow_index: usize,
    pub step_index: usize,
    pub workflow_key: &'static str,
    pub workflow_name: &'static str,
    pub step_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub terminal: Option<TerminalState>,
    pub can_advance: bool,
    pub can_go_back: bool,
}

/// Tracks the wizard's workflow/step position. Screens never write it directly.
#[derive(Debug, Clone)]
pub struct WizardController {
    blueprint: WizardBlueprint,
    position: WizardPosition,
}

impl WizardController {
    pub fn new(blueprint: WizardBlueprint) -> Self {
        Self {
            blueprint,
            position: WizardPosition::default(),
        }
    }

    pub fn position(&self) -> WizardPosition {
        self.position
    }

    pub fn blueprint(&self) -> &WizardBlueprint {
        &self.blueprint
    }

    pub fn current_workflow(&self) -> &WorkflowDefinition {
        &self.blueprint.workflows()[self.position.workflow_index]
    }

    fn on_terminal(&self) -> bool {
        self.current_workflow().is_terminal()
    }

    /// Index of the workflow after the current one, unless that is a terminal screen.
    fn following_workflow(&self) -> Option<usize> {
        let index = self.position.workflow_index + 1;
        self.blueprint
            .get(index)
            .filter(|workflow| !workflow.is_terminal())
            .map(|_| index)
    }

    fn preceding_workflow(&self) -> Option<usize> {
        let index = self.position.workflow_index.checked_sub(1)?;
        self.blueprint
            .get(index)
            .filter(|workflow| !workflow.is_terminal())
            .map(|_| index)
    }

    pub fn can_advance(&self) -> bool {
        !self.on_terminal()
            && (self.position.step_index + 1 < self.current_workflow().step_count
                || self.following_workflow().is_some())
    }

    pub fn can_go_back(&self) -> bool {
        !self.on_terminal()
            && (self.position.step_index > 0 || self.preceding_workflow().is_some())
    }

    /// Advances one step, crossing into the next workflow at a boundary.
    /// Terminal workflows are never entered this way; at the last step before
    /// them, and on a terminal screen, this is a no-op.
    pub fn next(&mut self) -> WizardPosition {
        if self.on_terminal() {
            return self.position;
        }

        if self.position.step_index + 1 < self.current_workflow().step_count {
            self.position.step_index += 1;
        } else if let Some(index) = self.following_workflow() {
            self.position = WizardPosition::new(index, 0);
        }

        self.position
    }

    /// Steps back, landing on the last step of the previous workflow at a boundary.
    /// At the initial position and on a terminal screen this is a no-op.
    pub fn prev(&mut self) -> WizardPosition {
        if self.on_terminal() {
            return self.position;
        }

        if self.position.step_index > 0 {
            self.position.step_index -= 1;
        } else if let Some(index) = self.preceding_workflow() {
            let previous = &self.blueprint.workflows()[index];
            self.position = WizardPosition::new(index, previous.last_step_index());
        }

        self.position
    }

    /// Moves directly to a position; out-of-range targets leave the position unchanged.
    pub fn jump_to(
        &mut self,
        workflow_index: usize,
        step_index: usize,
    ) -> Result<WizardPosition, NavigationError> {
        let workflow = self
            .blueprint
            .get(workflow_index)
            .ok_or(NavigationError::OutOfBounds {
                workflow_index,
                step_index,
            })?;
        if step_index >= workflow.step_count {
            return Err(NavigationError::OutOfBounds {
                workflow_index,
                step_index,
            });
        }

        self.position = WizardPosition::new(workflow_index, step_index);
        Ok(self.position)
    }

    pub fn jump_to_workflow(&mut self, key: &str) -> Result<WizardPosition, NavigationError> {
        let index = self
            .blueprint
            .index_of(key)
            .ok_or_else(|| NavigationError::UnknownWorkflow(key.to_string()))?;
        self.jump_to(index, 0)
    }

    pub fn jump_to_terminal(
        &mut self,
        state: TerminalState,
    ) -> Result<WizardPosition, NavigationError> {
        let index = self
            .blueprint
            .terminal_index(state)
            .ok_or(NavigationError::MissingTerminal(state))?;
        self.jump_to(index, 0)
    }

    pub fn view(&self) -> PositionView {
        let workflow = self.current_workflow();
        PositionView {
            workflow_index: self.position.workflow_index,
            step_index: self.position.step_index,
            workflow_key: workflow.key,
            workflow_name: workflow.name,
            step_count: workflow.step_count,
            terminal: workflow.terminal,
            can_advance: self.can_advance(),
            can_go_back: self.can_go_back(),
        }
    }
}

impl Default for WizardController {
    fn default() -> Self {
        Self::new(WizardBlueprint::standard())
    }
}
