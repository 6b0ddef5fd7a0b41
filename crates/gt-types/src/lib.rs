pub mod dataset;
pub mod errors;
pub mod metrics;
pub mod model;
pub mod params;
pub mod seed;

pub use dataset::*;
pub use errors::*;
pub use metrics::*;
pub use model::*;
pub use params::*;
pub use seed::derive_seed;
