use itertools::{Itertools, MinMaxResult};

use crate::common::metadata::{MODULES_IN_CODEWORD, MODULES_IN_STOP_PATTERN};
use crate::common::types::{BitMatrix, ResultPoint};

// Symbol locator
//------------------------------------------------------------------------------
// Finds the start and stop patterns by run-length ratio matching along image
// rows. Good enough for flatbed and synthetic scans; skewed rows simply
// fail to match and are skipped, and the scanning decoder tolerates the
// resulting partial indicator coverage.

const START_RUNS: [i32; 8] = [8, 1, 1, 1, 1, 1, 1, 3];
const STOP_RUNS: [i32; 9] = [7, 1, 1, 3, 1, 1, 1, 2, 1];

#[derive(Debug, Clone, Copy)]
pub struct SymbolLocation {
    pub top_left: Option<ResultPoint>,
    pub bottom_left: Option<ResultPoint>,
    pub top_right: Option<ResultPoint>,
    pub bottom_right: Option<ResultPoint>,
    pub min_codeword_width: i32,
    pub max_codeword_width: i32,
}

pub fn locate(image: &BitMatrix) -> Option<SymbolLocation> {
    // (y, x, codeword width estimate) per matched row.
    let mut start_matches: Vec<(i32, i32, i32)> = Vec::new();
    let mut stop_matches: Vec<(i32, i32, i32)> = Vec::new();

    for y in 0..image.height() as i32 {
        let runs = run_lengths(image, y);
        if let Some((_, end_x, width)) = find_pattern(&runs, &START_RUNS, false) {
            // The left row indicator begins where the start pattern ends.
            start_matches.push((y, end_x, width));
        }
        if let Some((start_x, _, width)) = find_pattern(&runs, &STOP_RUNS, true) {
            // The right row indicator ends just before the stop pattern.
            let codeword_width =
                width * MODULES_IN_CODEWORD as i32 / MODULES_IN_STOP_PATTERN as i32;
            stop_matches.push((y, start_x - 1, codeword_width));
        }
    }
    if start_matches.is_empty() && stop_matches.is_empty() {
        return None;
    }

    let corner = |m: &(i32, i32, i32)| ResultPoint::new(m.1 as f32, m.0 as f32);
    let (min_codeword_width, max_codeword_width) =
        match start_matches.iter().chain(&stop_matches).map(|m| m.2).minmax() {
            MinMaxResult::NoElements => return None,
            MinMaxResult::OneElement(width) => (width, width),
            MinMaxResult::MinMax(min, max) => (min, max),
        };

    Some(SymbolLocation {
        top_left: start_matches.first().map(corner),
        bottom_left: start_matches.last().map(corner),
        top_right: stop_matches.first().map(corner),
        bottom_right: stop_matches.last().map(corner),
        min_codeword_width,
        max_codeword_width,
    })
}

/// Run-length segments of one image row as `(start_x, length, is_black)`.
fn run_lengths(image: &BitMatrix, y: i32) -> Vec<(i32, i32, bool)> {
    let width = image.width() as i32;
    let mut runs = Vec::new();
    let mut run_start = 0i32;
    let mut color = image.get(0, y as usize);
    for x in 1..width {
        let pixel = image.get(x as usize, y as usize);
        if pixel != color {
            runs.push((run_start, x - run_start, color));
            run_start = x;
            color = pixel;
        }
    }
    runs.push((run_start, width - run_start, color));
    runs
}

/// First (or last) window of black-led runs matching the pattern ratios
/// within half a module. Returns `(start_x, end_x, total_width)`.
fn find_pattern(
    runs: &[(i32, i32, bool)],
    pattern: &[i32],
    last: bool,
) -> Option<(i32, i32, i32)> {
    let pattern_total: i32 = pattern.iter().sum();
    let mut found = None;
    for window in runs.windows(pattern.len()) {
        if !window[0].2 {
            continue;
        }
        let total: i32 = window.iter().map(|r| r.1).sum();
        let matches = window
            .iter()
            .zip(pattern)
            .all(|(&(_, run, _), &expected)| 2 * (run * pattern_total - expected * total).abs() < total);
        if matches {
            let start_x = window[0].0;
            let end_x = start_x + total;
            let codeword_width = total * MODULES_IN_CODEWORD as i32 / pattern_total;
            found = Some((start_x, end_x, codeword_width));
            if !last {
                return found;
            }
        }
    }
    found
}

#[cfg(test)]
mod locate_tests {
    use test_case::test_case;

    use super::*;
    use crate::builder::{PDF417Builder, RenderOptions};
    use crate::common::metadata::ECLevel;

    #[test_case(1; "single pixel modules")]
    #[test_case(2; "double width")]
    #[test_case(3; "triple width")]
    fn test_locates_rendered_symbol(module_width: usize) {
        let symbol = PDF417Builder::new(b"locator test")
            .columns(2)
            .ec_level(ECLevel::new(1).unwrap())
            .build()
            .unwrap();
        let options =
            RenderOptions { module_width, row_height: 2 * module_width + 1, quiet_zone: 3 };
        let matrix = symbol.to_matrix(&options);

        let location = locate(&matrix).expect("symbol located");
        let expected = symbol.corner_points(&options);
        let found = [
            location.top_left.unwrap(),
            location.bottom_left.unwrap(),
            location.top_right.unwrap(),
            location.bottom_right.unwrap(),
        ];

        // Located corners stay within one module of the rendered geometry.
        let tolerance = module_width as f32;
        for (found, expected) in found.iter().zip(&expected) {
            assert!(
                (found.x - expected.x).abs() <= tolerance,
                "corner x {} vs {} at module width {module_width}",
                found.x,
                expected.x
            );
            assert!(
                (found.y - expected.y).abs() <= tolerance,
                "corner y {} vs {} at module width {module_width}",
                found.y,
                expected.y
            );
        }

        let nominal = symbol.codeword_width(&options);
        assert!((location.min_codeword_width - nominal).abs() <= module_width as i32);
        assert!((location.max_codeword_width - nominal).abs() <= module_width as i32);
        assert!(location.min_codeword_width <= location.max_codeword_width);
    }

    #[test]
    fn test_blank_image_yields_nothing() {
        assert!(locate(&BitMatrix::new(80, 20)).is_none());
    }
}
