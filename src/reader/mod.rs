mod barcode_value;
mod bounding_box;
mod codeword;
mod codeword_decoder;
mod column;
mod detection_result;
mod locate;
mod scan;

pub use locate::SymbolLocation;

use image::GrayImage;
use tracing::info;

use crate::common::error::{PDF417Error, PDF417Result};
use crate::common::types::{BitMatrix, ResultPoint};

// Reader
//------------------------------------------------------------------------------

/// Outcome of a successful decode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecoderResult {
    /// Payload text, charset-converted where the symbol requested it.
    pub text: String,
    /// Raw byte-compaction content, exact regardless of charset.
    pub bytes: Vec<u8>,
    /// The corrected codeword stream, Symbol Length Descriptor first.
    pub codewords: Vec<u16>,
    pub ec_level: u8,
    pub errors_corrected: usize,
    pub erasures: usize,
}

pub struct PDF417Reader;

impl PDF417Reader {
    /// Locates and decodes a symbol in a grayscale image.
    pub fn read(image: &GrayImage) -> PDF417Result<DecoderResult> {
        Self::read_matrix(&BitMatrix::from_gray(image))
    }

    /// Locates and decodes a symbol in a binarized image.
    pub fn read_matrix(image: &BitMatrix) -> PDF417Result<DecoderResult> {
        info!(width = image.width(), height = image.height(), "reading symbol");
        let location = locate::locate(image).ok_or(PDF417Error::NotFound)?;
        scan::decode(
            image,
            location.top_left,
            location.bottom_left,
            location.top_right,
            location.bottom_right,
            location.min_codeword_width,
            location.max_codeword_width,
        )
    }

    /// Decodes with corner points supplied by an external detector. Corners
    /// may be missing individually; at least one top and one bottom corner
    /// are required.
    #[allow(clippy::too_many_arguments)]
    pub fn decode(
        image: &BitMatrix,
        top_left: Option<ResultPoint>,
        bottom_left: Option<ResultPoint>,
        top_right: Option<ResultPoint>,
        bottom_right: Option<ResultPoint>,
        min_codeword_width: i32,
        max_codeword_width: i32,
    ) -> PDF417Result<DecoderResult> {
        scan::decode(
            image,
            top_left,
            bottom_left,
            top_right,
            bottom_right,
            min_codeword_width,
            max_codeword_width,
        )
    }
}
