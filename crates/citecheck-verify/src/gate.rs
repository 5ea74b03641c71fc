//! The validation gate every candidate from every source must pass.
//!
//! A candidate is accepted only when the cluster has a usable case name, the
//! candidate's name shares enough distinctive tokens with it, and the
//! candidate's court is compatible with the jurisdiction the reporters imply.
//! There is deliberately one gate and one caller
//! ([`VerificationMaster`](crate::VerificationMaster)).

use citecheck_core::names;
use thiserror::Error;

use crate::query::{Candidate, ClusterQuery};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Rejection {
    #[error("cluster has no usable case name")]
    NoUsableName,
    #[error("candidate has no name")]
    EmptyName,
    #[error("name overlap {score:.2} below {threshold:.2} ({candidate:?})")]
    LowOverlap {
        score: f32,
        threshold: f32,
        candidate: String,
    },
    #[error("candidate court is {found}, citation implies {expected}")]
    JurisdictionMismatch { expected: String, found: String },
}

/// Thresholds for [`validate`].
#[derive(Debug, Clone, Copy)]
pub struct GateConfig {
    pub min_overlap: f32,
    pub min_name_len: usize,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            min_overlap: 0.5,
            min_name_len: 5,
        }
    }
}

impl From<&citecheck_core::VerifyConfig> for GateConfig {
    fn from(config: &citecheck_core::VerifyConfig) -> Self {
        Self {
            min_overlap: config.min_overlap,
            min_name_len: config.min_name_len,
        }
    }
}

/// Whether the query carries a name worth sending to a source.
pub fn has_usable_name(query: &ClusterQuery, gate: &GateConfig) -> bool {
    names::is_usable_case_name(query.case_name.as_deref(), gate.min_name_len)
}

/// Accept or reject one candidate. Returns the overlap score on acceptance.
pub fn validate(query: &ClusterQuery, candidate: &Candidate, gate: &GateConfig) -> Result<f32, Rejection> {
    if !has_usable_name(query, gate) {
        return Err(Rejection::NoUsableName);
    }
    let Some(extracted) = query.case_name.as_deref() else {
        return Err(Rejection::NoUsableName);
    };
    if candidate.name.trim().is_empty() {
        return Err(Rejection::EmptyName);
    }

    let score = names::overlap_score(extracted, &candidate.name);
    if score < gate.min_overlap {
        return Err(Rejection::LowOverlap {
            score,
            threshold: gate.min_overlap,
            candidate: candidate.name.clone(),
        });
    }

    if !query.jurisdiction.is_compatible_with(&candidate.jurisdiction) {
        return Err(Rejection::JurisdictionMismatch {
            expected: query.jurisdiction.to_string(),
            found: candidate.jurisdiction.to_string(),
        });
    }
    Ok(score)
}
