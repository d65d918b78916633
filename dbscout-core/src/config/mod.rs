//! Configuration types for the engine and its bundled adapters.
//!
//! - `SamplingPolicy`: empirical constants driving the sampler decision tree
//! - `PoolConfig`: pool sizing and session settings for the sqlx adapters
//!
//! # Security
//! These structs never hold connection strings or credentials.

mod pool;
mod sampling;

pub use pool::PoolConfig;
pub use sampling::SamplingPolicy;
