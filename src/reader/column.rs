use super::barcode_value::BarcodeValue;
use super::bounding_box::BoundingBox;
use super::codeword::Codeword;
use crate::common::metadata::{BarcodeMetadata, MAX_ROWS_IN_BARCODE, MIN_ROWS_IN_BARCODE};

// DetectionResultColumn
//------------------------------------------------------------------------------
// A dense column of optional codewords indexed by image row. Row indicator
// columns additionally know how to vote out their barcode geometry and
// assign barcode row numbers to their codewords.

const MAX_NEARBY_DISTANCE: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Data,
    LeftIndicator,
    RightIndicator,
}

#[derive(Debug, Clone)]
pub struct DetectionResultColumn {
    bounding_box: BoundingBox,
    codewords: Vec<Option<Codeword>>,
    kind: ColumnKind,
}

impl DetectionResultColumn {
    pub fn new(bounding_box: &BoundingBox, kind: ColumnKind) -> Self {
        let height = (bounding_box.max_y() - bounding_box.min_y() + 1) as usize;
        Self { bounding_box: *bounding_box, codewords: vec![None; height], kind }
    }

    pub fn kind(&self) -> ColumnKind {
        self.kind
    }

    pub fn is_left_indicator(&self) -> bool {
        self.kind == ColumnKind::LeftIndicator
    }

    pub fn is_indicator(&self) -> bool {
        self.kind != ColumnKind::Data
    }

    pub fn bounding_box(&self) -> &BoundingBox {
        &self.bounding_box
    }

    pub fn image_row_to_index(&self, image_row: i32) -> usize {
        (image_row - self.bounding_box.min_y()) as usize
    }

    pub fn index_to_image_row(&self, index: usize) -> i32 {
        self.bounding_box.min_y() + index as i32
    }

    pub fn codewords(&self) -> &[Option<Codeword>] {
        &self.codewords
    }

    pub fn codewords_mut(&mut self) -> &mut [Option<Codeword>] {
        &mut self.codewords
    }

    pub fn codeword(&self, image_row: i32) -> Option<Codeword> {
        self.codewords.get(self.image_row_to_index(image_row)).copied().flatten()
    }

    pub fn set_codeword(&mut self, image_row: i32, codeword: Codeword) {
        let index = self.image_row_to_index(image_row);
        self.codewords[index] = Some(codeword);
    }

    /// Exact hit, or the closest codeword within a few rows.
    pub fn codeword_nearby(&self, image_row: i32) -> Option<Codeword> {
        if let Some(codeword) = self.codeword(image_row) {
            return Some(codeword);
        }
        let index = self.image_row_to_index(image_row);
        if index >= self.codewords.len() {
            return None;
        }
        for distance in 1..MAX_NEARBY_DISTANCE {
            if index >= distance {
                if let Some(codeword) = self.codewords[index - distance] {
                    return Some(codeword);
                }
            }
            if index + distance < self.codewords.len() {
                if let Some(codeword) = self.codewords[index + distance] {
                    return Some(codeword);
                }
            }
        }
        None
    }

    // Row indicator derivation
    //--------------------------------------------------------------------------

    /// Votes the barcode geometry out of this indicator column. Each
    /// codeword's `value % 30` contributes one metadata field selected by its
    /// row mod 3; the right indicator's schedule is rotated by two rows.
    /// Inconsistent codewords are removed on success.
    pub fn barcode_metadata(&mut self) -> Option<BarcodeMetadata> {
        let mut column_count = BarcodeValue::new();
        let mut row_count_upper = BarcodeValue::new();
        let mut row_count_lower = BarcodeValue::new();
        let mut ec_level = BarcodeValue::new();

        let is_left = self.is_left_indicator();
        for codeword in self.codewords.iter_mut().flatten() {
            codeword.set_row_number_as_row_indicator();
            let indicator_value = codeword.value() % 30;
            let mut row_number = codeword.row_number();
            if !is_left {
                row_number += 2;
            }
            match row_number % 3 {
                0 => row_count_upper.set_value(indicator_value * 3 + 1),
                1 => {
                    ec_level.set_value(indicator_value / 3);
                    row_count_lower.set_value(indicator_value % 3);
                }
                _ => column_count.set_value(indicator_value + 1),
            }
        }

        let column_count = *column_count.values().first()?;
        let row_count_upper = *row_count_upper.values().first()?;
        let row_count_lower = *row_count_lower.values().first()?;
        let ec_level = *ec_level.values().first()?;
        let row_count = (row_count_upper + row_count_lower) as usize;
        if column_count < 1
            || !(MIN_ROWS_IN_BARCODE..=MAX_ROWS_IN_BARCODE).contains(&row_count)
        {
            return None;
        }

        let metadata = BarcodeMetadata::new(
            column_count as usize,
            row_count_upper as usize,
            row_count_lower as usize,
            ec_level as u8,
        );
        self.remove_incorrect_codewords(&metadata);
        Some(metadata)
    }

    fn remove_incorrect_codewords(&mut self, metadata: &BarcodeMetadata) {
        let is_left = self.is_left_indicator();
        for slot in self.codewords.iter_mut() {
            let Some(codeword) = slot else { continue };
            let indicator_value = codeword.value() % 30;
            let mut row_number = codeword.row_number();
            if row_number > metadata.row_count() as i32 {
                *slot = None;
                continue;
            }
            if !is_left {
                row_number += 2;
            }
            let consistent = match row_number % 3 {
                0 => (indicator_value * 3 + 1) as usize == metadata.row_count_upper(),
                1 => {
                    (indicator_value / 3) as u8 == metadata.ec_level()
                        && (indicator_value % 3) as usize == metadata.row_count_lower()
                }
                _ => (indicator_value + 1) as usize == metadata.column_count(),
            };
            if !consistent {
                *slot = None;
            }
        }
    }

    /// Number of detected codewords per barcode row.
    pub fn row_heights(&mut self) -> Option<Vec<i32>> {
        let metadata = self.barcode_metadata()?;
        self.adjust_incomplete_indicator_row_numbers(&metadata);
        let mut heights = vec![0i32; metadata.row_count()];
        for codeword in self.codewords.iter().flatten() {
            let row_number = codeword.row_number();
            if row_number >= 0 && (row_number as usize) < heights.len() {
                heights[row_number as usize] += 1;
            }
        }
        Some(heights)
    }

    fn indicator_row_range(&self) -> (usize, usize) {
        let top = if self.is_left_indicator() {
            self.bounding_box.top_left()
        } else {
            self.bounding_box.top_right()
        };
        let bottom = if self.is_left_indicator() {
            self.bounding_box.bottom_left()
        } else {
            self.bounding_box.bottom_right()
        };
        (self.image_row_to_index(top.y as i32), self.image_row_to_index(bottom.y as i32))
    }

    /// Full cleanup pass for an installed indicator column: derive row
    /// numbers, drop metadata-inconsistent codewords, then walk the column
    /// discarding codewords whose row number jumps backwards or further than
    /// nearby detections can explain.
    pub fn adjust_complete_indicator_row_numbers(&mut self, metadata: &BarcodeMetadata) {
        for codeword in self.codewords.iter_mut().flatten() {
            codeword.set_row_number_as_row_indicator();
        }
        self.remove_incorrect_codewords(metadata);

        let (first_row, last_row) = self.indicator_row_range();
        let mut barcode_row = -1i32;
        let mut max_row_height = 1i32;
        let mut current_row_height = 0i32;
        for index in first_row..last_row {
            let Some(codeword) = self.codewords[index] else { continue };
            let row_number = codeword.row_number();
            let row_difference = row_number - barcode_row;
            if row_difference == 0 {
                current_row_height += 1;
            } else if row_difference == 1 {
                max_row_height = max_row_height.max(current_row_height);
                current_row_height = 1;
                barcode_row = row_number;
            } else if row_difference < 0
                || row_number >= metadata.row_count() as i32
                || row_difference > index as i32
            {
                self.codewords[index] = None;
            } else {
                let checked_rows = if max_row_height > 2 {
                    (max_row_height - 2) * row_difference
                } else {
                    row_difference
                };
                let mut close_previous_found = checked_rows >= index as i32;
                for i in 1..=checked_rows as usize {
                    if close_previous_found {
                        break;
                    }
                    close_previous_found = self.codewords[index - i].is_some();
                }
                if close_previous_found {
                    self.codewords[index] = None;
                } else {
                    barcode_row = row_number;
                    current_row_height = 1;
                }
            }
        }
    }

    /// Lighter pass used before row heights are known: derive row numbers
    /// and only drop codewords claiming rows past the metadata row count.
    fn adjust_incomplete_indicator_row_numbers(&mut self, metadata: &BarcodeMetadata) {
        let (first_row, last_row) = self.indicator_row_range();
        let mut barcode_row = -1i32;
        for index in first_row..last_row {
            let Some(codeword) = &mut self.codewords[index] else { continue };
            codeword.set_row_number_as_row_indicator();
            let row_number = codeword.row_number();
            if row_number == barcode_row {
                continue;
            }
            if row_number >= metadata.row_count() as i32 && row_number - barcode_row != 1 {
                self.codewords[index] = None;
            } else {
                barcode_row = row_number;
            }
        }
    }
}

#[cfg(test)]
mod column_tests {
    use super::*;
    use crate::common::types::ResultPoint;

    fn test_box() -> BoundingBox {
        BoundingBox::new(
            200,
            60,
            Some(ResultPoint::new(10.0, 0.0)),
            Some(ResultPoint::new(10.0, 59.0)),
            Some(ResultPoint::new(180.0, 0.0)),
            Some(ResultPoint::new(180.0, 59.0)),
        )
        .unwrap()
    }

    fn indicator_codeword(row: usize, rows: usize, columns: usize, ec_level: u8) -> Codeword {
        let field = match row % 3 {
            0 => (rows - 1) / 3,
            1 => ec_level as usize * 3 + (rows - 1) % 3,
            _ => columns - 1,
        };
        let value = ((row / 3) * 30 + field) as u16;
        let cluster = ((row % 3) * 3) as u8;
        Codeword::new(10, 27, cluster, value)
    }

    #[test]
    fn test_codeword_nearby_window() {
        let mut column = DetectionResultColumn::new(&test_box(), ColumnKind::Data);
        let codeword = Codeword::new(10, 27, 0, 42);
        column.set_codeword(20, codeword);

        assert_eq!(column.codeword_nearby(20), Some(codeword));
        assert_eq!(column.codeword_nearby(17), Some(codeword));
        assert_eq!(column.codeword_nearby(24), Some(codeword));
        assert_eq!(column.codeword_nearby(25), None);
        assert_eq!(column.codeword(21), None);
    }

    #[test]
    fn test_metadata_voting() {
        // 12 rows, 4 columns, EC level 2, three image rows per barcode row.
        let mut column = DetectionResultColumn::new(&test_box(), ColumnKind::LeftIndicator);
        for row in 0..12 {
            for repeat in 0..3 {
                let image_row = (row * 3 + repeat) as i32;
                column.set_codeword(image_row, indicator_codeword(row, 12, 4, 2));
            }
        }
        let metadata = column.barcode_metadata().unwrap();
        assert_eq!(metadata.row_count(), 12);
        assert_eq!(metadata.column_count(), 4);
        assert_eq!(metadata.ec_level(), 2);
    }

    #[test]
    fn test_right_indicator_schedule_is_rotated() {
        let mut column = DetectionResultColumn::new(&test_box(), ColumnKind::RightIndicator);
        for row in 0..9 {
            for repeat in 0..3 {
                let image_row = (row * 3 + repeat) as i32;
                // Right indicator fields: columns, rows, ec by row % 3.
                let field = match row % 3 {
                    0 => 4 - 1,
                    1 => (9 - 1) / 3,
                    _ => 2 * 3 + (9 - 1) % 3,
                };
                let value = ((row / 3) * 30 + field) as u16;
                let cluster = ((row % 3) * 3) as u8;
                column.set_codeword(image_row, Codeword::new(150, 167, cluster, value));
            }
        }
        let metadata = column.barcode_metadata().unwrap();
        assert_eq!(metadata.row_count(), 9);
        assert_eq!(metadata.column_count(), 4);
        assert_eq!(metadata.ec_level(), 2);
    }

    #[test]
    fn test_metadata_fails_without_all_fields() {
        let mut column = DetectionResultColumn::new(&test_box(), ColumnKind::LeftIndicator);
        // Only rows with row % 3 == 0 present: EC level and column count
        // never get a vote.
        for row in [0usize, 3, 6] {
            column.set_codeword((row * 3) as i32, indicator_codeword(row, 9, 3, 1));
        }
        assert_eq!(column.barcode_metadata(), None);
    }

    #[test]
    fn test_row_heights() {
        let mut column = DetectionResultColumn::new(&test_box(), ColumnKind::LeftIndicator);
        for row in 0..12 {
            let repeats = if row == 5 { 1 } else { 3 };
            for repeat in 0..repeats {
                let image_row = (row * 3 + repeat) as i32;
                column.set_codeword(image_row, indicator_codeword(row, 12, 4, 2));
            }
        }
        let heights = column.row_heights().unwrap();
        assert_eq!(heights.len(), 12);
        assert_eq!(heights[5], 1);
        assert_eq!(heights[0], 3);
        assert_eq!(heights[11], 3);
    }
}
