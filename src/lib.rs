//! PDF417 barcode builder and scanning decoder.
//!
//! ```
//! use pdf417ism::{PDF417Builder, PDF417Reader, RenderOptions};
//!
//! let symbol = PDF417Builder::new(b"hello pdf417").build().unwrap();
//! let image = symbol.to_image(&RenderOptions::default());
//! let decoded = PDF417Reader::read(&image).unwrap();
//! assert_eq!(decoded.bytes, b"hello pdf417");
//! ```

pub mod builder;
mod common;
pub mod reader;

pub use builder::{Compaction, PDF417Builder, RenderOptions, PDF417};
pub use common::error::{PDF417Error, PDF417Result};
pub use common::metadata::ECLevel;
pub use common::types::{BitMatrix, ResultPoint};
pub use reader::{DecoderResult, PDF417Reader};
