pub mod decoder;
pub mod encoder;

pub use decoder::*;
pub use encoder::*;

// Compaction mode codewords
//------------------------------------------------------------------------------

pub(crate) const TEXT_COMPACTION_LATCH: u16 = 900;
pub(crate) const BYTE_COMPACTION_LATCH: u16 = 901;
pub(crate) const NUMERIC_COMPACTION_LATCH: u16 = 902;
pub(crate) const BYTE_SHIFT: u16 = 913;
pub(crate) const BYTE_COMPACTION_LATCH_6: u16 = 924;
pub(crate) const ECI_USER_DEFINED: u16 = 925;
pub(crate) const ECI_GENERAL_PURPOSE: u16 = 926;
pub(crate) const ECI_CHARSET: u16 = 927;
pub(crate) const MACRO_TERMINATOR: u16 = 922;
pub(crate) const MACRO_OPTIONAL_FIELD: u16 = 923;
pub(crate) const MACRO_CONTROL_BLOCK: u16 = 928;

/// Padding fills unused data positions and reads back as a text latch.
pub(crate) const PAD: u16 = TEXT_COMPACTION_LATCH;

pub(crate) const MAX_NUMERIC_CODEWORDS: usize = 15;
pub(crate) const MAX_NUMERIC_DIGITS_PER_GROUP: usize = 44;
