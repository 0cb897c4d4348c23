use crate::error::BenchError;

pub type Result<T> = std::result::Result<T, BenchError>;
