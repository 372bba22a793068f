pub mod error;
pub mod types;
pub mod config;
pub mod normalize;
pub mod source;
pub mod records;
pub mod boundary;
pub mod aggregate;
pub mod trend;
pub mod geo_join;
pub mod scope;
pub mod context;
pub mod dashboard;

pub use error::VigiaguaError;
pub use types::*;

/// Standard result type for all vigiagua operations
pub type VigiaguaResult<T> = Result<T, VigiaguaError>;
