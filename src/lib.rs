pub mod analysis;
pub mod buckets;
pub mod churn;
pub mod classifier;
pub mod cli;
pub mod config;
pub mod developers;
pub mod error;
pub mod extract;
pub mod git;
pub mod lint;
pub mod model;
pub mod repos;
pub mod scan;
pub mod store;
pub mod util;

pub use error::{DashError, Result};
