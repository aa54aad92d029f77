pub mod codec;
pub mod ec;
pub mod error;
pub mod metadata;
pub mod tables;
pub mod types;

pub use error::*;
pub use metadata::*;
pub use types::*;
