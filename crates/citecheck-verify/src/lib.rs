//! Verification of citation clusters against external case-law sources.
//!
//! [`VerificationMaster`] walks an ordered chain of [`Verifier`] sources for
//! each cluster and accepts the first candidate that passes the
//! [validation gate](gate::validate). A cluster no source can confirm stays
//! unverified; that is a normal outcome, not an error.

pub mod cache;
pub mod courtlistener;
pub mod error;
pub mod gate;
pub mod limiter;
pub mod master;
pub mod outcome;
pub mod query;
pub mod source;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod web;

pub use cache::VerificationCache;
pub use courtlistener::{CitationLookup, CourtListener, OpinionSearch};
pub use error::SourceError;
pub use gate::{GateConfig, Rejection, validate};
pub use limiter::SourceLimiter;
pub use master::VerificationMaster;
pub use outcome::{OutcomeStatus, VerificationAttempt, VerificationOutcome, normalize_date};
pub use query::{Candidate, ClusterQuery};
pub use source::Verifier;
pub use web::HtmlSearch;
