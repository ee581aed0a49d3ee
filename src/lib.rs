//! slim-stream — realtime online SLIM recommender core.
//!
//! Consumes a stream of timestamped (user, item) interaction events, keeps
//! time-decayed interaction aggregates, incrementally learns a sparse
//! item-item coefficient matrix, and serves top-N recommendations from
//! immutable snapshots while updates continue.

pub mod config;
pub mod engine;
pub mod format;
pub mod index;
pub mod model;
pub mod types;

// Re-export commonly used types at the crate root
pub use config::{
    AggregationMode, CoordinatorConfig, DecayConfig, LearnerConfig, LearningRate,
    OptimizerConfig, SlimConfig, StoreConfig,
};
pub use engine::{
    BatchReport, Decay, FitReport, Learner, LearnerStats, QueryEngine, RecommendOptions,
    Recommendation, StepReport, UpdateCoordinator, WriteEngine,
};
pub use format::{CoefficientRecord, InteractionRecord, ModelExport, SlimReader, SlimWriter};
pub use index::{IdTable, InteractionEntry, InteractionStore, SparseRow};
pub use model::{
    CoefficientMatrix, ModelSnapshot, ModelState, ModelStats, Recommender, Scorer, SlimModel,
};
pub use types::{
    now_micros, FileHeader, InteractionEvent, InteractionEventBuilder, SlimError, SlimResult,
    MAX_ID_LEN,
};
