pub mod analytics;
pub mod benchmarks;
pub mod cache;
pub mod classifier;
pub mod comparator;
pub mod keywords;
pub mod model;
pub mod patterns;
pub mod scorers;
pub mod semantic;
pub mod service;
