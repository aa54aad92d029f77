use pdf417ism::{
    BitMatrix, ECLevel, PDF417Builder, PDF417Error, PDF417Reader, RenderOptions, PDF417,
};
use test_case::test_case;

const MODULES_PER_CODEWORD: usize = 17;

fn options(module_width: usize, row_height: usize) -> RenderOptions {
    RenderOptions { module_width, row_height, quiet_zone: 2 }
}

fn decode_with_corners(
    symbol: &PDF417,
    matrix: &BitMatrix,
    options: &RenderOptions,
) -> Result<pdf417ism::DecoderResult, PDF417Error> {
    let [top_left, bottom_left, top_right, bottom_right] = symbol.corner_points(options);
    let width = symbol.codeword_width(options);
    PDF417Reader::decode(
        matrix,
        Some(top_left),
        Some(bottom_left),
        Some(top_right),
        Some(bottom_right),
        width,
        width,
    )
}

/// Pixel rectangle of one matrix cell: start pattern and left indicator sit
/// before data column 0.
fn cell_rect(
    options: &RenderOptions,
    row: usize,
    column: usize,
) -> (usize, usize, usize, usize) {
    let quiet = options.quiet_zone * options.module_width;
    let x = quiet + MODULES_PER_CODEWORD * (2 + column) * options.module_width;
    let y = quiet + row * options.row_height;
    (x, y, MODULES_PER_CODEWORD * options.module_width, options.row_height)
}

#[test_case(b"hello pdf417", 3, 2, 2, 6; "plain text")]
#[test_case(b"x", 1, 0, 1, 3; "single byte single column")]
#[test_case(b"The quick brown fox jumps over the lazy dog", 5, 3, 2, 4; "wide symbol")]
#[test_case(b"\x00\x01\xfe\xff binary \x80", 4, 4, 3, 5; "binary payload")]
#[test_case(b"abcdef", 2, 1, 1, 4; "full byte group")]
fn test_clean_round_trip(data: &[u8], columns: usize, ec_level: u8, mw: usize, rh: usize) {
    let symbol = PDF417Builder::new(data)
        .columns(columns)
        .ec_level(ECLevel::new(ec_level).unwrap())
        .build()
        .unwrap();
    let options = options(mw, rh);
    let matrix = symbol.to_matrix(&options);

    let decoded = decode_with_corners(&symbol, &matrix, &options).unwrap();
    assert_eq!(decoded.bytes, data);
    assert_eq!(decoded.errors_corrected, 0);
    assert_eq!(decoded.erasures, 0);
    assert_eq!(decoded.codewords.len(), symbol.rows() * symbol.columns());
    assert_eq!(decoded.codewords, symbol.codewords());
}

#[test]
fn test_numeric_round_trip() {
    let digits = b"00123456789012345678901234567890123456789";
    let symbol = PDF417Builder::new(digits).columns(4).build().unwrap();
    let options = options(2, 6);
    let decoded = decode_with_corners(&symbol, &symbol.to_matrix(&options), &options).unwrap();
    assert_eq!(decoded.text.as_bytes(), digits);
}

#[test_case(1; "single pixel modules")]
#[test_case(2; "double width")]
#[test_case(3; "triple width")]
fn test_read_through_locator(module_width: usize) {
    let symbol = PDF417Builder::new(b"located payload")
        .columns(3)
        .ec_level(ECLevel::new(2).unwrap())
        .build()
        .unwrap();
    let options = RenderOptions { module_width, row_height: 3 * module_width, quiet_zone: 2 };
    let decoded = PDF417Reader::read(&symbol.to_image(&options)).unwrap();
    assert_eq!(decoded.bytes, b"located payload");
    assert_eq!(decoded.errors_corrected, 0);
    assert_eq!(decoded.erasures, 0);
}

#[test]
fn test_decode_is_deterministic() {
    let symbol = PDF417Builder::new(b"same in, same out").build().unwrap();
    let options = RenderOptions::default();
    let matrix = symbol.to_matrix(&options);
    let first = decode_with_corners(&symbol, &matrix, &options).unwrap();
    let second = decode_with_corners(&symbol, &matrix, &options).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_corrupted_codeword_is_corrected() {
    // Two symbols differing in exactly one data cell; grafting that cell's
    // pixels from the second render produces one consistently wrong
    // codeword that error correction must repair.
    let raw = vec![450u16, 99, 120, 333, 512, 40, 7, 88, 100, 200, 300];
    let mut wrong_raw = raw.clone();
    wrong_raw[2] = 500;
    let level = ECLevel::new(1).unwrap();
    let symbol = PDF417Builder::from_codewords(raw).columns(4).ec_level(level).build().unwrap();
    let wrong =
        PDF417Builder::from_codewords(wrong_raw).columns(4).ec_level(level).build().unwrap();
    let options = options(2, 6);
    let mut matrix = symbol.to_matrix(&options);
    let wrong_matrix = wrong.to_matrix(&options);

    // Raw index 2 lands at flat codeword index 3: row 0, column 3.
    let (x, y, w, h) = cell_rect(&options, 0, 3);
    for xx in x..x + w {
        for yy in y..y + h {
            matrix.set(xx, yy, wrong_matrix.get(xx, yy));
        }
    }

    let decoded = decode_with_corners(&symbol, &matrix, &options).unwrap();
    assert_eq!(decoded.codewords, symbol.codewords());
    assert_eq!(decoded.errors_corrected, 1);
    assert_eq!(decoded.erasures, 0);
}

#[test]
fn test_missing_codeword_becomes_erasure() {
    // The erased cell's true value is 0, so the zero-filled erasure needs
    // no correction. The cell's first bar stays so the neighbouring
    // codeword's trailing space keeps its boundary.
    let raw = vec![450u16, 99, 0, 333, 512, 40, 7, 88, 100, 200, 300];
    let symbol = PDF417Builder::from_codewords(raw)
        .columns(4)
        .ec_level(ECLevel::new(1).unwrap())
        .build()
        .unwrap();
    let options = options(2, 6);
    let mut matrix = symbol.to_matrix(&options);

    let (x, y, w, h) = cell_rect(&options, 0, 3);
    let mut first_bar_end = x;
    while matrix.get(first_bar_end, y) {
        first_bar_end += 1;
    }
    for xx in first_bar_end..x + w {
        for yy in y..y + h {
            matrix.set(xx, yy, false);
        }
    }

    let decoded = decode_with_corners(&symbol, &matrix, &options).unwrap();
    assert_eq!(decoded.codewords, symbol.codewords());
    assert_eq!(decoded.erasures, 1);
    assert_eq!(decoded.errors_corrected, 0);
}

#[test]
fn test_too_many_erasures_fail_checksum() {
    let symbol = PDF417Builder::new(b"too many holes!!!!!!!!")
        .columns(3)
        .ec_level(ECLevel::new(1).unwrap())
        .build()
        .unwrap();
    let options = options(2, 6);
    let mut matrix = symbol.to_matrix(&options);

    for (row, column) in [(0, 1), (0, 2), (1, 0), (1, 1), (1, 2), (2, 0)] {
        let (x, y, w, h) = cell_rect(&options, row, column);
        for xx in x..x + w {
            for yy in y..y + h {
                matrix.set(xx, yy, false);
            }
        }
    }

    assert_eq!(
        decode_with_corners(&symbol, &matrix, &options),
        Err(PDF417Error::Checksum)
    );
}

#[test]
fn test_ambiguous_cell_resolved_by_backtracking() {
    // Half the image rows of one cell carry a smaller wrong value, so the
    // cell votes a tie and the wrong candidate is enumerated first.
    let raw = vec![450u16, 99, 700, 333, 512];
    let mut wrong_raw = raw.clone();
    wrong_raw[2] = 100;
    let level = ECLevel::new(0).unwrap();
    let symbol = PDF417Builder::from_codewords(raw).columns(4).ec_level(level).build().unwrap();
    let wrong =
        PDF417Builder::from_codewords(wrong_raw).columns(4).ec_level(level).build().unwrap();
    let options = options(2, 6);
    let mut matrix = symbol.to_matrix(&options);
    let wrong_matrix = wrong.to_matrix(&options);

    let (x, y, w, h) = cell_rect(&options, 0, 3);
    for yy in y + h / 2..y + h {
        for xx in x..x + w {
            matrix.set(xx, yy, wrong_matrix.get(xx, yy));
        }
    }

    let decoded = decode_with_corners(&symbol, &matrix, &options).unwrap();
    assert_eq!(decoded.codewords, symbol.codewords());
}

#[test]
fn test_mismatched_indicators_not_found() {
    // A composite of two symbols whose row count, column count and EC level
    // all disagree between the left and right indicator columns.
    let left_symbol = PDF417Builder::new(b"aa")
        .columns(2)
        .ec_level(ECLevel::new(0).unwrap())
        .build()
        .unwrap();
    let right_symbol = PDF417Builder::new(b"0123456789012345678901234567890123456789")
        .columns(4)
        .ec_level(ECLevel::new(2).unwrap())
        .build()
        .unwrap();
    assert_ne!(left_symbol.rows(), right_symbol.rows());

    let options = options(2, 6);
    let left_matrix = left_symbol.to_matrix(&options);
    let right_matrix = right_symbol.to_matrix(&options);
    let offset = left_matrix.width();
    let mut composite = BitMatrix::new(
        offset + right_matrix.width(),
        left_matrix.height().max(right_matrix.height()),
    );
    for x in 0..left_matrix.width() {
        for y in 0..left_matrix.height() {
            composite.set(x, y, left_matrix.get(x, y));
        }
    }
    for x in 0..right_matrix.width() {
        for y in 0..right_matrix.height() {
            composite.set(offset + x, y, right_matrix.get(x, y));
        }
    }

    let [top_left, bottom_left, _, _] = left_symbol.corner_points(&options);
    let [_, _, mut top_right, mut bottom_right] = right_symbol.corner_points(&options);
    top_right.x += offset as f32;
    bottom_right.x += offset as f32;

    assert_eq!(
        PDF417Reader::decode(
            &composite,
            Some(top_left),
            Some(bottom_left),
            Some(top_right),
            Some(bottom_right),
            left_symbol.codeword_width(&options),
            left_symbol.codeword_width(&options),
        ),
        Err(PDF417Error::NotFound)
    );
}

#[test]
fn test_diagonal_corners_decode() {
    let symbol = PDF417Builder::new(b"two corners are enough")
        .columns(3)
        .ec_level(ECLevel::new(2).unwrap())
        .build()
        .unwrap();
    let options = options(2, 6);
    let matrix = symbol.to_matrix(&options);
    let [top_left, _, _, bottom_right] = symbol.corner_points(&options);
    let width = symbol.codeword_width(&options);

    let decoded = PDF417Reader::decode(
        &matrix,
        Some(top_left),
        None,
        None,
        Some(bottom_right),
        width,
        width,
    )
    .unwrap();
    assert_eq!(decoded.bytes, b"two corners are enough");
}

#[test]
fn test_right_indicator_only_decode() {
    let symbol = PDF417Builder::new(b"right side up")
        .columns(3)
        .ec_level(ECLevel::new(2).unwrap())
        .build()
        .unwrap();
    let options = options(2, 6);
    let matrix = symbol.to_matrix(&options);
    let [_, _, top_right, bottom_right] = symbol.corner_points(&options);
    let width = symbol.codeword_width(&options);

    let decoded = PDF417Reader::decode(
        &matrix,
        None,
        None,
        Some(top_right),
        Some(bottom_right),
        width,
        width,
    )
    .unwrap();
    assert_eq!(decoded.bytes, b"right side up");
}

#[cfg(test)]
mod pdf417_proptests {
    use super::*;
    use proptest::prelude::*;

    fn payload_strategy() -> impl Strategy<Value = Vec<u8>> {
        proptest::collection::vec(any::<u8>(), 1..60)
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(48))]

        #[test]
        fn proptest_round_trip(
            data in payload_strategy(),
            columns in 2usize..=6,
            ec_level in 0u8..=4,
            module_width in 1usize..=2,
        ) {
            let symbol = PDF417Builder::new(&data)
                .columns(columns)
                .ec_level(ECLevel::new(ec_level).unwrap())
                .build()
                .unwrap();
            let options = options(module_width, 3 * module_width);
            let matrix = symbol.to_matrix(&options);
            let decoded = decode_with_corners(&symbol, &matrix, &options).unwrap();
            prop_assert_eq!(&decoded.bytes, &data);
            prop_assert_eq!(decoded.errors_corrected, 0);
            prop_assert_eq!(decoded.erasures, 0);
        }
    }
}
