use std::fmt::{Debug, Display, Error, Formatter};

// Error
//------------------------------------------------------------------------------

#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum PDF417Error {
    // Builder
    EmptyData,
    DataTooLong,
    InvalidECLevel,
    InvalidColumnCount,
    InvalidCodeword,
    NonNumericData,

    // Reader
    NotFound,
    Format,
    Checksum,
}

impl Display for PDF417Error {
    fn fmt(&self, f: &mut Formatter) -> Result<(), Error> {
        let msg = match *self {
            // Builder
            Self::EmptyData => "Empty data",
            Self::DataTooLong => "Data does not fit in 928 codewords",
            Self::InvalidECLevel => "Error correction level must be within 0..=8",
            Self::InvalidColumnCount => "Column count must be within 1..=30",
            Self::InvalidCodeword => "Codeword values must be within 0..=928",
            Self::NonNumericData => "Numeric compaction requires ASCII digits",

            // Reader
            Self::NotFound => "Symbol not found",
            Self::Format => "Symbol structure is invalid",
            Self::Checksum => "Too many errors to correct successfully",
        };
        f.write_str(msg)
    }
}

impl std::error::Error for PDF417Error {}

pub type PDF417Result<T> = Result<T, PDF417Error>;
