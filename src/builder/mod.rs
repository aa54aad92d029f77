mod symbol;

pub use symbol::{RenderOptions, PDF417};

use tracing::debug;

use crate::common::codec::{encode_bytes, encode_numeric, PAD};
use crate::common::ec::ec_codewords;
use crate::common::error::{PDF417Error, PDF417Result};
use crate::common::metadata::{
    ECLevel, MAX_CODEWORDS_IN_BARCODE, MAX_COLUMNS_IN_BARCODE, MAX_ROWS_IN_BARCODE,
    MIN_ROWS_IN_BARCODE, NUMBER_OF_CODEWORDS,
};

// Builder
//------------------------------------------------------------------------------

/// Payload compaction choice. `Auto` picks numeric compaction for long
/// digit-only payloads and byte compaction otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compaction {
    #[default]
    Auto,
    Byte,
    Numeric,
}

pub struct PDF417Builder<'a> {
    data: &'a [u8],
    raw_codewords: Option<Vec<u16>>,
    columns: usize,
    ec_level: ECLevel,
    compaction: Compaction,
}

impl<'a> PDF417Builder<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            raw_codewords: None,
            columns: 3,
            ec_level: ECLevel::default(),
            compaction: Compaction::Auto,
        }
    }

    /// Builds from pre-compacted codewords instead of a byte payload.
    pub fn from_codewords(codewords: Vec<u16>) -> Self {
        Self {
            data: &[],
            raw_codewords: Some(codewords),
            columns: 3,
            ec_level: ECLevel::default(),
            compaction: Compaction::Auto,
        }
    }

    pub fn data(&mut self, data: &'a [u8]) -> &mut Self {
        self.data = data;
        self
    }

    pub fn columns(&mut self, columns: usize) -> &mut Self {
        self.columns = columns;
        self
    }

    pub fn ec_level(&mut self, ec_level: ECLevel) -> &mut Self {
        self.ec_level = ec_level;
        self
    }

    pub fn compaction(&mut self, compaction: Compaction) -> &mut Self {
        self.compaction = compaction;
        self
    }

    pub fn metadata(&self) -> String {
        format!(
            "{{ Columns: {}, Ec level: {}, Compaction: {:?} }}",
            self.columns, self.ec_level, self.compaction
        )
    }

    pub fn build(&self) -> PDF417Result<PDF417> {
        if !(1..=MAX_COLUMNS_IN_BARCODE).contains(&self.columns) {
            return Err(PDF417Error::InvalidColumnCount);
        }

        let mode_codewords = match &self.raw_codewords {
            Some(codewords) => {
                if codewords.iter().any(|&c| c >= NUMBER_OF_CODEWORDS) {
                    return Err(PDF417Error::InvalidCodeword);
                }
                codewords.clone()
            }
            None => {
                if self.data.is_empty() {
                    return Err(PDF417Error::EmptyData);
                }
                let digits = self.data.iter().all(u8::is_ascii_digit);
                match self.compaction {
                    Compaction::Numeric => {
                        encode_numeric(std::str::from_utf8(self.data).map_err(|_| PDF417Error::NonNumericData)?)?
                    }
                    Compaction::Byte => encode_bytes(self.data),
                    Compaction::Auto if digits && self.data.len() >= 13 => {
                        encode_numeric(std::str::from_utf8(self.data).unwrap_or_default())?
                    }
                    Compaction::Auto => encode_bytes(self.data),
                }
            }
        };

        let num_ec = self.ec_level.codewords();
        let data_count = 1 + mode_codewords.len();
        let rows = (data_count + num_ec).div_ceil(self.columns).max(MIN_ROWS_IN_BARCODE);
        if rows > MAX_ROWS_IN_BARCODE {
            return Err(PDF417Error::DataTooLong);
        }
        let symbol_length = rows * self.columns - num_ec;
        if symbol_length > MAX_CODEWORDS_IN_BARCODE || symbol_length < data_count {
            return Err(PDF417Error::DataTooLong);
        }

        let mut codewords = Vec::with_capacity(rows * self.columns);
        codewords.push(symbol_length as u16);
        codewords.extend_from_slice(&mode_codewords);
        codewords.resize(symbol_length, PAD);
        let ec = ec_codewords(&codewords, num_ec);
        codewords.extend(ec);
        debug!(
            rows,
            columns = self.columns,
            data = data_count,
            pads = symbol_length - data_count,
            ec = num_ec,
            "symbol laid out"
        );

        Ok(PDF417::new(codewords, rows, self.columns, self.ec_level))
    }
}
