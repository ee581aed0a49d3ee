//! In-memory model: coefficient matrix, state, snapshots and the SLIM model.

pub mod coefficients;
pub mod recommender;
pub mod slim;
pub mod snapshot;
pub mod state;

pub use coefficients::CoefficientMatrix;
pub use recommender::{Recommender, Scorer};
pub use slim::SlimModel;
pub use snapshot::{ModelSnapshot, ModelStats};
pub use state::ModelState;
