//! Stateful core of the property listing wizard.
//!
//! Screens write into a [`DraftStore`] and move a [`WizardController`]; the
//! review screen hands the draft to a [`SubmissionCoordinator`], which
//! normalizes it against the [`ListingSchema`], encodes photos through the
//! [`PhotoPipeline`], and transmits the result.

pub mod coercion;
pub mod draft;
pub mod navigation;
pub mod normalizer;
pub mod photos;
pub mod router;
pub mod schema;
pub mod session;
pub mod submission;

#[cfg(test)]
mod tests;

pub use draft::{ContactInfo, DraftError, DraftStore, PropertyDraft};
pub use navigation::{
    NavigationError, PositionView, TerminalState, WizardBlueprint, WizardController,
    WizardPosition, WorkflowDefinition,
};
pub use normalizer::{normalize, Correction, CorrectionKind, NormalizedListing, NormalizedPayload};
pub use photos::{
    FsPhotoReader, Photo, PhotoError, PhotoFile, PhotoPipeline, PhotoReadError, PhotoReader,
};
pub use router::wizard_router;
pub use schema::{FieldShape, FieldSource, FieldSpec, ListingSchema};
pub use session::{
    JumpTarget, SessionError, SessionId, SessionRegistry, SessionTemplate, SessionView,
    SubmissionRecord, WizardSession,
};
pub use submission::{
    HttpListingTransport, ListingTransport, SubmissionCoordinator, SubmissionError,
    SubmissionOutcome, SubmissionState, TransportError, TransportResponse,
};
