pub mod metrics;
pub mod models;
pub mod similarity;
pub mod source;
