//! High-level operations: decay, learning, writes, queries and publication.

pub mod coordinator;
pub mod decay;
pub mod learner;
pub mod optimizer;
pub mod query;
pub mod write;

pub use coordinator::UpdateCoordinator;
pub use decay::Decay;
pub use learner::{Learner, LearnerStats, StepReport};
pub use optimizer::{Ftrl, Optimizer, ProximalSgd};
pub use query::{QueryEngine, RecommendOptions, Recommendation};
pub use write::{BatchReport, FitReport, WriteEngine};
