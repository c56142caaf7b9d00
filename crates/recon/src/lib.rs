//! `accessgrid-recon`: Profile access reconciliation engine.
//!
//! Pure engine crate: receives pre-loaded assignment rows and conflict
//! rules, returns common/exclusive sets, a presence matrix, and the
//! conflicts co-held by the selected profiles. No CLI or IO dependencies.

pub mod cache;
pub mod conflict;
pub mod engine;
pub mod error;
pub mod index;
pub mod model;
pub mod summary;

pub use cache::{PreparedTables, ReconCache};
pub use conflict::ConflictIndex;
pub use engine::{run, run_indexed, CancelToken};
pub use error::ReconError;
pub use index::AccessIndex;
pub use model::{
    AccessAssignment, AccessTuple, AnalysisResult, ConflictDetail, ConflictRule, MatrixRow,
    MatrixScope, ReconOptions,
};
pub use summary::{compute_summary, ReconSummary};
