// Core modules: record model, filtering, export encoding, analytics, and error modeling.
pub mod analytics;
pub mod error;
pub mod export;
pub mod filter;
pub mod record;
