//! Core types shared by every Citecheck engine: citations, clusters, the
//! reporter table, jurisdiction rules, case-name tokens, and configuration.

pub mod citation;
pub mod cluster;
pub mod config;
pub mod jurisdiction;
pub mod names;
pub mod reporter;

pub use citation::{CanonicalIdentity, Citation, CitationId, CitationKind, Span};
pub use cluster::{Cluster, ClusterId, ProcessResult};
pub use config::{
    ClusterConfig, Config, ConfigError, ExtractConfig, PipelineConfig, VerifyConfig,
};
pub use jurisdiction::Jurisdiction;
pub use reporter::{ReporterSpec, normalize_citation};
