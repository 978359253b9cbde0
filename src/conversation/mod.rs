//! The conversation driver: submit a prompt, detect when the reply is done,
//! pull out any code artifact, save the turn.

mod artifact;
mod detector;
mod driver;
mod retry;
mod submitter;

pub use artifact::ArtifactExtractor;
pub use detector::CompletionDetector;
pub use driver::{ask, RunDriver};
pub use retry::{retry_bounded, wait_for_element, wait_for_visible, RetryPolicy, ELEMENT_POLL_INTERVAL};
pub use submitter::MessageSubmitter;
