use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::{AppEnvironment, SubmissionConfig};

use super::draft::{ContactInfo, DraftError, DraftStore, PropertyDraft};
use super::navigation::{
    NavigationError, PositionView, TerminalState, WizardBlueprint, WizardController,
};
use super::photos::PhotoPipeline;
use super::schema::ListingSchema;
use super::submission::{
    HttpListingTransport, ListingTransport, SubmissionCoordinator, SubmissionError,
    SubmissionOutcome, SubmissionState,
};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

static SESSION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_session_id() -> SessionId {
    let id = SESSION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    SessionId(format!("wiz-{id:06}"))
}

/// Result of the most recent submission attempt, kept for the review screen.
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionRecord {
    #[serde(flatten)]
    pub outcome: SubmissionOutcome,
    pub user_message: String,
    pub finished_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub session_id: SessionId,
    pub position: PositionView,
    pub draft: PropertyDraft,
    pub can_undo: bool,
    pub submission_state: SubmissionState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_submission: Option<SubmissionRecord>,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("wizard session '{0}' not found")]
    NotFound(SessionId),
    #[error(transparent)]
    Draft(#[from] DraftError),
    #[error("nothing to undo")]
    NothingToUndo,
    #[error(transparent)]
    Navigation(#[from] NavigationError),
    #[error(transparent)]
    Submission(#[from] SubmissionError),
}

/// One lister's pass through the wizard: draft, position and submission state.
#[derive(Debug)]
pub struct WizardSession {
    id: SessionId,
    draft: Mutex<DraftStore>,
    navigation: Mutex<WizardController>,
    coordinator: SubmissionCoordinator,
    last_submission: Mutex<Option<SubmissionRecord>>,
}

impl WizardSession {
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn draft(&self) -> Arc<PropertyDraft> {
        self.draft.lock().expect("draft mutex poisoned").read()
    }

    pub fn update_draft(&self, partial: &Value) -> Result<Arc<PropertyDraft>, SessionError> {
        let mut store = self.draft.lock().expect("draft mutex poisoned");
        Ok(store.update(partial)?)
    }

    pub fn undo_draft(&self) -> Result<Arc<PropertyDraft>, SessionError> {
        let mut store = self.draft.lock().expect("draft mutex poisoned");
        store.undo().ok_or(SessionError::NothingToUndo)
    }

    pub fn next(&self) -> PositionView {
        let mut navigation = self.navigation.lock().expect("navigation mutex poisoned");
        navigation.next();
        navigation.view()
    }

    pub fn prev(&self) -> PositionView {
        let mut navigation = self.navigation.lock().expect("navigation mutex poisoned");
        navigation.prev();
        navigation.view()
    }

    pub fn jump(&self, target: JumpTarget) -> Result<PositionView, SessionError> {
        let mut navigation = self.navigation.lock().expect("navigation mutex poisoned");
        match target {
            JumpTarget::Position {
                workflow_index,
                step_index,
            } => navigation.jump_to(workflow_index, step_index)?,
            JumpTarget::Workflow { workflow } => navigation.jump_to_workflow(&workflow)?,
            JumpTarget::Terminal { terminal } => navigation.jump_to_terminal(terminal)?,
        };
        Ok(navigation.view())
    }

    /// Submits the current draft. Any backend outcome moves the wizard to the
    /// matching terminal; photo failures and refused submits leave it in place.
    pub async fn submit(&self, contact: &ContactInfo) -> Result<SubmissionRecord, SessionError> {
        let draft = self.draft();
        let outcome = self.coordinator.submit(&draft, contact).await?;

        let terminal = if outcome.is_success() {
            TerminalState::Success
        } else {
            TerminalState::Failure
        };
        if let Err(err) = self
            .navigation
            .lock()
            .expect("navigation mutex poisoned")
            .jump_to_terminal(terminal)
        {
            tracing::warn!(error = %err, "wizard blueprint lacks a submission terminal");
        }

        let record = SubmissionRecord {
            user_message: outcome.user_message().to_string(),
            outcome,
            finished_at: Utc::now(),
        };
        *self
            .last_submission
            .lock()
            .expect("submission mutex poisoned") = Some(record.clone());
        Ok(record)
    }

    /// Starts a fresh listing: defaults draft, first step, idle coordinator.
    pub fn restart(&self) -> Result<SessionView, SessionError> {
        self.coordinator.reset()?;
        self.draft.lock().expect("draft mutex poisoned").reset();
        self.navigation
            .lock()
            .expect("navigation mutex poisoned")
            .jump_to(0, 0)?;
        *self
            .last_submission
            .lock()
            .expect("submission mutex poisoned") = None;
        Ok(self.view())
    }

    pub fn view(&self) -> SessionView {
        let (draft, can_undo) = {
            let store = self.draft.lock().expect("draft mutex poisoned");
            (store.read().as_ref().clone(), store.can_undo())
        };
        SessionView {
            session_id: self.id.clone(),
            position: self
                .navigation
                .lock()
                .expect("navigation mutex poisoned")
                .view(),
            draft,
            can_undo,
            submission_state: self.coordinator.state(),
            last_submission: self
                .last_submission
                .lock()
                .expect("submission mutex poisoned")
                .clone(),
        }
    }
}

/// Request body for direct jumps: a raw position, a workflow key, or a terminal.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum JumpTarget {
    Position {
        workflow_index: usize,
        step_index: usize,
    },
    Workflow {
        workflow: String,
    },
    Terminal {
        terminal: TerminalState,
    },
}

/// Shared collaborators every new session is built from.
#[derive(Debug, Clone)]
pub struct SessionTemplate {
    pub schema: Arc<ListingSchema>,
    pub blueprint: WizardBlueprint,
    pub transport: Arc<dyn ListingTransport>,
    pub photos: PhotoPipeline,
    pub log_corrections: bool,
}

impl SessionTemplate {
    pub fn new(transport: Arc<dyn ListingTransport>) -> Self {
        Self {
            schema: Arc::new(ListingSchema::standard()),
            blueprint: WizardBlueprint::standard(),
            transport,
            photos: PhotoPipeline::default(),
            log_corrections: true,
        }
    }

    /// Sessions posting to the configured backend over HTTP.
    pub fn from_config(config: &SubmissionConfig, environment: AppEnvironment) -> Self {
        Self {
            photos: PhotoPipeline::from_config(config),
            log_corrections: environment.logs_corrections(),
            ..Self::new(Arc::new(HttpListingTransport::from_config(config)))
        }
    }
}

/// In-memory registry of active wizard sessions.
#[derive(Debug)]
pub struct SessionRegistry {
    template: SessionTemplate,
    sessions: Mutex<HashMap<SessionId, Arc<WizardSession>>>,
}

impl SessionRegistry {
    pub fn new(template: SessionTemplate) -> Self {
        Self {
            template,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn create(&self) -> Arc<WizardSession> {
        let template = &self.template;
        let coordinator = SubmissionCoordinator::new(template.transport.clone())
            .with_schema(template.schema.clone())
            .with_photo_pipeline(template.photos.clone())
            .with_correction_logging(template.log_corrections);

        let session = Arc::new(WizardSession {
            id: next_session_id(),
            draft: Mutex::new(DraftStore::new(&template.schema)),
            navigation: Mutex::new(WizardController::new(template.blueprint.clone())),
            coordinator,
            last_submission: Mutex::new(None),
        });

        self.sessions
            .lock()
            .expect("session mutex poisoned")
            .insert(session.id.clone(), session.clone());
        tracing::debug!(session_id = %session.id, "wizard session created");
        session
    }

    pub fn get(&self, id: &SessionId) -> Result<Arc<WizardSession>, SessionError> {
        self.sessions
            .lock()
            .expect("session mutex poisoned")
            .get(id)
            .cloned()
            .ok_or_else(|| SessionError::NotFound(id.clone()))
    }

    /// Ends a session, discarding its draft.
    pub fn remove(&self, id: &SessionId) -> Result<(), SessionError> {
        self.sessions
            .lock()
            .expect("session mutex poisoned")
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| SessionError::NotFound(id.clone()))
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().expect("session mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
