pub mod benchmark_service;
pub mod compare_service;
pub mod embed_service;
