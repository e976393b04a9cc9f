mod coordinator;
mod outcome;
mod transport;

pub use coordinator::{SubmissionCoordinator, SubmissionError, SubmissionState};
pub use outcome::{interpret, SubmissionOutcome};
pub use transport::{HttpListingTransport, ListingTransport, TransportError, TransportResponse};
