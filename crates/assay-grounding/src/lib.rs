//! Assay Grounding
//!
//! Post-completion groundedness validation. An answer is scored against the
//! tool calls the model issued and the data those tools returned:
//! - numbers in the answer must appear in the data
//! - capitalized names and emails should appear in the data
//! - the answer should cite its sources
//! - the answer must not hedge with approximation phrases
//!
//! Validation never fails a request; it only produces a report.

pub mod config;
pub mod extract;
pub mod finding;
pub mod rules;
pub mod validator;

pub use config::GroundingConfig;
pub use finding::{GroundednessReport, GroundingRule, ValidationFinding};
pub use validator::{GroundednessValidator, GroundingError, ValidationInput};
