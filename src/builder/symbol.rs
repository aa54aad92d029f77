use image::GrayImage;

use crate::common::metadata::{ECLevel, MODULES_IN_CODEWORD, MODULES_IN_STOP_PATTERN};
use crate::common::tables::SymbolTables;
use crate::common::types::{BitMatrix, ResultPoint};

// PDF417 symbol
//------------------------------------------------------------------------------
// A fully laid out symbol: Symbol Length Descriptor, data, padding and EC
// codewords arranged row-major. Every row renders as start pattern, left
// row indicator, data codewords, right row indicator, stop pattern, using
// the cluster table of `row % 3`.

const START_PATTERN: u32 = 0b1_1111_1110_1010_1000;
const STOP_PATTERN: u32 = 0b11_1111_1010_0010_1001;

/// Pixel geometry for rendering. The quiet zone is measured in modules and
/// applied on all four sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    pub module_width: usize,
    pub row_height: usize,
    pub quiet_zone: usize,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self { module_width: 2, row_height: 6, quiet_zone: 2 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PDF417 {
    codewords: Vec<u16>,
    rows: usize,
    columns: usize,
    ec_level: ECLevel,
}

impl PDF417 {
    pub(crate) fn new(codewords: Vec<u16>, rows: usize, columns: usize, ec_level: ECLevel) -> Self {
        debug_assert_eq!(codewords.len(), rows * columns);
        Self { codewords, rows, columns, ec_level }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn ec_level(&self) -> ECLevel {
        self.ec_level
    }

    /// The full codeword stream, Symbol Length Descriptor first.
    pub fn codewords(&self) -> &[u16] {
        &self.codewords
    }

    fn left_indicator_value(&self, row: usize) -> u16 {
        let field = match row % 3 {
            0 => (self.rows - 1) / 3,
            1 => self.ec_level.level() as usize * 3 + (self.rows - 1) % 3,
            _ => self.columns - 1,
        };
        ((row / 3) * 30 + field) as u16
    }

    fn right_indicator_value(&self, row: usize) -> u16 {
        let field = match row % 3 {
            0 => self.columns - 1,
            1 => (self.rows - 1) / 3,
            _ => self.ec_level.level() as usize * 3 + (self.rows - 1) % 3,
        };
        ((row / 3) * 30 + field) as u16
    }

    fn width_in_modules(&self, options: &RenderOptions) -> usize {
        2 * options.quiet_zone
            + MODULES_IN_CODEWORD * (self.columns + 3)
            + MODULES_IN_STOP_PATTERN
    }

    pub fn to_matrix(&self, options: &RenderOptions) -> BitMatrix {
        let quiet = options.quiet_zone * options.module_width;
        let width = self.width_in_modules(options) * options.module_width;
        let height = self.rows * options.row_height + 2 * quiet;
        let mut matrix = BitMatrix::new(width, height);

        let tables = SymbolTables::get();
        for row in 0..self.rows {
            let cluster = ((row % 3) * 3) as u8;
            let y = quiet + row * options.row_height;
            let mut x = quiet;
            x = paint(&mut matrix, x, y, options, START_PATTERN, MODULES_IN_CODEWORD);
            x = paint(
                &mut matrix,
                x,
                y,
                options,
                tables.pattern(cluster, self.left_indicator_value(row)),
                MODULES_IN_CODEWORD,
            );
            for &codeword in &self.codewords[row * self.columns..(row + 1) * self.columns] {
                x = paint(
                    &mut matrix,
                    x,
                    y,
                    options,
                    tables.pattern(cluster, codeword),
                    MODULES_IN_CODEWORD,
                );
            }
            x = paint(
                &mut matrix,
                x,
                y,
                options,
                tables.pattern(cluster, self.right_indicator_value(row)),
                MODULES_IN_CODEWORD,
            );
            paint(&mut matrix, x, y, options, STOP_PATTERN, MODULES_IN_STOP_PATTERN);
        }
        matrix
    }

    pub fn to_image(&self, options: &RenderOptions) -> GrayImage {
        self.to_matrix(options).to_gray()
    }

    /// Corner points of the row indicator columns, in the order the
    /// scanning decoder takes them: top-left, bottom-left, top-right,
    /// bottom-right. The left pair anchors the first pixel of the left
    /// indicator; the right pair the last pixel of the right indicator.
    pub fn corner_points(&self, options: &RenderOptions) -> [ResultPoint; 4] {
        let quiet = options.quiet_zone * options.module_width;
        let left_x = quiet + MODULES_IN_CODEWORD * options.module_width;
        let right_x = quiet
            + MODULES_IN_CODEWORD * (self.columns + 3) * options.module_width
            - 1;
        let top_y = quiet;
        let bottom_y = quiet + self.rows * options.row_height - 1;
        [
            ResultPoint::new(left_x as f32, top_y as f32),
            ResultPoint::new(left_x as f32, bottom_y as f32),
            ResultPoint::new(right_x as f32, top_y as f32),
            ResultPoint::new(right_x as f32, bottom_y as f32),
        ]
    }

    /// Nominal codeword width in pixels at these options.
    pub fn codeword_width(&self, options: &RenderOptions) -> i32 {
        (MODULES_IN_CODEWORD * options.module_width) as i32
    }
}

fn paint(
    matrix: &mut BitMatrix,
    x: usize,
    y: usize,
    options: &RenderOptions,
    pattern: u32,
    modules: usize,
) -> usize {
    for module in 0..modules {
        if (pattern >> (modules - 1 - module)) & 1 == 1 {
            for px in 0..options.module_width {
                for py in 0..options.row_height {
                    matrix.set(x + module * options.module_width + px, y + py, true);
                }
            }
        }
    }
    x + modules * options.module_width
}
