use encoding_rs::Encoding;

use super::*;
use crate::common::error::{PDF417Error, PDF417Result};

// Bit-stream parser
//------------------------------------------------------------------------------
// Turns a corrected codeword stream into payload text. Codeword 0 is the
// Symbol Length Descriptor; parsing covers indexes 1..SLD and switches
// between the three compaction families on latch codewords. The default
// mode is text compaction.

const MIXED_CHARS: &[u8; 25] = b"0123456789&\r\t,:#-.$/+%*=^";
const PUNCT_CHARS: &[u8; 29] = b";<>@[\\]_`~!\r\t,:\n-.$/\"|*()?{}'";

/// Decoded payload. `bytes` holds the raw byte-compaction content, which is
/// exact where `text` may have gone through a charset conversion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedPayload {
    pub text: String,
    pub bytes: Vec<u8>,
}

struct Output {
    text: String,
    bytes: Vec<u8>,
    encoding: Option<&'static Encoding>,
}

impl Output {
    fn push_char(&mut self, ch: char) {
        self.text.push(ch);
    }

    fn push_bytes(&mut self, bytes: &[u8]) {
        self.bytes.extend_from_slice(bytes);
        match self.encoding {
            // Default interpretation is ISO-8859-1.
            None => self.text.push_str(&encoding_rs::mem::decode_latin1(bytes)),
            Some(encoding) => {
                let (converted, _, _) = encoding.decode(bytes);
                self.text.push_str(&converted);
            }
        }
    }

    fn set_eci(&mut self, value: u16) {
        self.encoding = match value {
            1 | 3 => None,
            26 => Some(encoding_rs::UTF_8),
            25 => Some(encoding_rs::UTF_16BE),
            _ => None,
        };
    }
}

/// Parses `codewords` (SLD first) into text. Callers have already verified
/// `4 <= codewords[0] as usize <= codewords.len()`.
pub fn decode_bitstream(codewords: &[u16]) -> PDF417Result<ParsedPayload> {
    let sld = codewords[0] as usize;
    let mut out = Output { text: String::new(), bytes: Vec::new(), encoding: None };

    let mut code_index = 1;
    while code_index < sld {
        let code = codewords[code_index];
        code_index += 1;
        match code {
            TEXT_COMPACTION_LATCH => {
                code_index = text_compaction(codewords, sld, code_index, &mut out)?;
            }
            BYTE_COMPACTION_LATCH | BYTE_COMPACTION_LATCH_6 => {
                code_index = byte_compaction(code, codewords, sld, code_index, &mut out);
            }
            NUMERIC_COMPACTION_LATCH => {
                code_index = numeric_compaction(codewords, sld, code_index, &mut out)?;
            }
            BYTE_SHIFT => {
                if code_index >= sld {
                    return Err(PDF417Error::Format);
                }
                out.push_bytes(&[(codewords[code_index] & 0xFF) as u8]);
                code_index += 1;
            }
            ECI_CHARSET => {
                if code_index >= sld {
                    return Err(PDF417Error::Format);
                }
                out.set_eci(codewords[code_index]);
                code_index += 1;
            }
            ECI_GENERAL_PURPOSE => code_index += 2,
            ECI_USER_DEFINED => code_index += 1,
            MACRO_CONTROL_BLOCK | MACRO_OPTIONAL_FIELD | MACRO_TERMINATOR => {
                return Err(PDF417Error::Format);
            }
            _ => {
                // No latch: text compaction resumes from this codeword.
                code_index -= 1;
                code_index = text_compaction(codewords, sld, code_index, &mut out)?;
            }
        }
    }
    if out.text.is_empty() && out.bytes.is_empty() {
        return Err(PDF417Error::Format);
    }
    Ok(ParsedPayload { text: out.text, bytes: out.bytes })
}

// Text compaction
//------------------------------------------------------------------------------

#[derive(Clone, Copy, PartialEq, Eq)]
enum SubMode {
    Alpha,
    Lower,
    Mixed,
    Punct,
    AlphaShift,
    PunctShift,
}

/// Collects half-codeword values until the next mode latch, then runs the
/// submode state machine over them. Byte shifts inside text mode carry their
/// byte in a parallel array.
fn text_compaction(
    codewords: &[u16],
    sld: usize,
    mut code_index: usize,
    out: &mut Output,
) -> PDF417Result<usize> {
    let mut half_codes: Vec<u16> = Vec::with_capacity((sld - code_index) * 2);
    let mut shift_bytes: Vec<u8> = Vec::with_capacity((sld - code_index) * 2);

    while code_index < sld {
        let code = codewords[code_index];
        code_index += 1;
        if code < TEXT_COMPACTION_LATCH {
            half_codes.push(code / 30);
            shift_bytes.push(0);
            half_codes.push(code % 30);
            shift_bytes.push(0);
        } else if code == TEXT_COMPACTION_LATCH {
            // Explicit latch inside text mode resets the submode.
            half_codes.push(TEXT_COMPACTION_LATCH);
            shift_bytes.push(0);
        } else if code == BYTE_SHIFT {
            if code_index >= sld {
                return Err(PDF417Error::Format);
            }
            half_codes.push(BYTE_SHIFT);
            shift_bytes.push((codewords[code_index] & 0xFF) as u8);
            code_index += 1;
        } else if matches!(
            code,
            BYTE_COMPACTION_LATCH
                | BYTE_COMPACTION_LATCH_6
                | NUMERIC_COMPACTION_LATCH
                | ECI_USER_DEFINED
                | ECI_GENERAL_PURPOSE
                | ECI_CHARSET
                | MACRO_CONTROL_BLOCK
                | MACRO_OPTIONAL_FIELD
                | MACRO_TERMINATOR
        ) {
            code_index -= 1;
            break;
        }
        // Reserved codewords are skipped.
    }

    decode_text(&half_codes, &shift_bytes, out);
    Ok(code_index)
}

fn decode_text(half_codes: &[u16], shift_bytes: &[u8], out: &mut Output) {
    let mut sub_mode = SubMode::Alpha;
    let mut prior_to_shift = SubMode::Alpha;

    for (&code, &shift_byte) in half_codes.iter().zip(shift_bytes) {
        let mut ch = None;
        match sub_mode {
            SubMode::Alpha => match code {
                0..=25 => ch = Some((b'A' + code as u8) as char),
                26 => ch = Some(' '),
                27 => sub_mode = SubMode::Lower,
                28 => sub_mode = SubMode::Mixed,
                29 => {
                    prior_to_shift = sub_mode;
                    sub_mode = SubMode::PunctShift;
                }
                BYTE_SHIFT => out.push_bytes(&[shift_byte]),
                TEXT_COMPACTION_LATCH => sub_mode = SubMode::Alpha,
                _ => {}
            },
            SubMode::Lower => match code {
                0..=25 => ch = Some((b'a' + code as u8) as char),
                26 => ch = Some(' '),
                27 => {
                    prior_to_shift = sub_mode;
                    sub_mode = SubMode::AlphaShift;
                }
                28 => sub_mode = SubMode::Mixed,
                29 => {
                    prior_to_shift = sub_mode;
                    sub_mode = SubMode::PunctShift;
                }
                BYTE_SHIFT => out.push_bytes(&[shift_byte]),
                TEXT_COMPACTION_LATCH => sub_mode = SubMode::Alpha,
                _ => {}
            },
            SubMode::Mixed => match code {
                0..=24 => ch = Some(MIXED_CHARS[code as usize] as char),
                25 => sub_mode = SubMode::Punct,
                26 => ch = Some(' '),
                27 => sub_mode = SubMode::Lower,
                28 => sub_mode = SubMode::Alpha,
                29 => {
                    prior_to_shift = sub_mode;
                    sub_mode = SubMode::PunctShift;
                }
                BYTE_SHIFT => out.push_bytes(&[shift_byte]),
                TEXT_COMPACTION_LATCH => sub_mode = SubMode::Alpha,
                _ => {}
            },
            SubMode::Punct => match code {
                0..=28 => ch = Some(PUNCT_CHARS[code as usize] as char),
                29 => sub_mode = SubMode::Alpha,
                BYTE_SHIFT => out.push_bytes(&[shift_byte]),
                TEXT_COMPACTION_LATCH => sub_mode = SubMode::Alpha,
                _ => {}
            },
            SubMode::AlphaShift => {
                sub_mode = prior_to_shift;
                match code {
                    0..=25 => ch = Some((b'A' + code as u8) as char),
                    26 => ch = Some(' '),
                    TEXT_COMPACTION_LATCH => sub_mode = SubMode::Alpha,
                    _ => {}
                }
            }
            SubMode::PunctShift => {
                sub_mode = prior_to_shift;
                match code {
                    0..=28 => ch = Some(PUNCT_CHARS[code as usize] as char),
                    29 => sub_mode = SubMode::Alpha,
                    BYTE_SHIFT => out.push_bytes(&[shift_byte]),
                    TEXT_COMPACTION_LATCH => sub_mode = SubMode::Alpha,
                    _ => {}
                }
            }
        }
        if let Some(ch) = ch {
            out.push_char(ch);
        }
    }
}

// Byte compaction
//------------------------------------------------------------------------------

/// Groups of 5 codewords unpack into 6 bytes (base 900 to base 256). Under
/// latch 901 the trailing group (5 or fewer codewords) maps one codeword to
/// one byte; under latch 924 only complete groups carry data.
fn byte_compaction(
    mode: u16,
    codewords: &[u16],
    sld: usize,
    mut code_index: usize,
    out: &mut Output,
) -> usize {
    let mut codes: Vec<u16> = Vec::new();
    while code_index < sld && codewords[code_index] < TEXT_COMPACTION_LATCH {
        codes.push(codewords[code_index]);
        code_index += 1;
    }

    let trailing = match codes.len() % 5 {
        0 if mode == BYTE_COMPACTION_LATCH && !codes.is_empty() => 5,
        rem if mode == BYTE_COMPACTION_LATCH => rem,
        _ => codes.len() % 5,
    };
    let full = codes.len() - trailing;

    for group in codes[..full].chunks_exact(5) {
        let mut value = 0u64;
        for &code in group {
            value = value * 900 + u64::from(code);
        }
        let unpacked: [u8; 6] = core::array::from_fn(|j| (value >> (8 * (5 - j))) as u8);
        out.push_bytes(&unpacked);
    }
    if mode == BYTE_COMPACTION_LATCH {
        for &code in &codes[full..] {
            out.push_bytes(&[(code & 0xFF) as u8]);
        }
    }
    code_index
}

// Numeric compaction
//------------------------------------------------------------------------------

/// Groups of at most 15 codewords form a base-900 big integer whose decimal
/// expansion starts with an implied leading 1.
fn numeric_compaction(
    codewords: &[u16],
    sld: usize,
    mut code_index: usize,
    out: &mut Output,
) -> PDF417Result<usize> {
    let mut group: Vec<u16> = Vec::with_capacity(MAX_NUMERIC_CODEWORDS);
    while code_index < sld {
        let code = codewords[code_index];
        if code >= TEXT_COMPACTION_LATCH {
            break;
        }
        code_index += 1;
        group.push(code);
        if group.len() == MAX_NUMERIC_CODEWORDS {
            out.text.push_str(&base900_to_decimal(&group)?);
            group.clear();
        }
    }
    if !group.is_empty() {
        out.text.push_str(&base900_to_decimal(&group)?);
    }
    Ok(code_index)
}

fn base900_to_decimal(codes: &[u16]) -> PDF417Result<String> {
    // Little-endian decimal digits; 15 codewords stay under 45 digits.
    let mut digits: Vec<u8> = vec![0];
    for &code in codes {
        let mut carry = u32::from(code);
        for d in digits.iter_mut() {
            let value = u32::from(*d) * 900 + carry;
            *d = (value % 10) as u8;
            carry = value / 10;
        }
        while carry > 0 {
            digits.push((carry % 10) as u8);
            carry /= 10;
        }
    }
    // The most significant digit is the implied leading 1.
    if digits.last() != Some(&1) {
        return Err(PDF417Error::Format);
    }
    Ok(digits.iter().rev().skip(1).map(|&d| (b'0' + d) as char).collect())
}
