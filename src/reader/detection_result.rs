use super::bounding_box::BoundingBox;
use super::codeword::Codeword;
use super::column::DetectionResultColumn;
use crate::common::metadata::{BarcodeMetadata, MAX_CODEWORDS_IN_BARCODE};

// DetectionResult
//------------------------------------------------------------------------------
// The full arrangement of detected columns: left indicator at 0, data
// columns 1..=column_count, right indicator at column_count + 1. Before the
// barcode matrix is read off, codewords with unknown or implausible row
// numbers are repaired from the indicators and from bucket-compatible
// neighbours, iterating until the unadjusted count stops shrinking.

const ADJUST_ROW_NUMBER_SKIP: usize = 2;

#[derive(Debug)]
pub struct DetectionResult {
    metadata: BarcodeMetadata,
    bounding_box: BoundingBox,
    columns: Vec<Option<DetectionResultColumn>>,
}

impl DetectionResult {
    pub fn new(metadata: BarcodeMetadata, bounding_box: BoundingBox) -> Self {
        let columns = vec![None; metadata.column_count() + 2];
        Self { metadata, bounding_box, columns }
    }

    pub fn column_count(&self) -> usize {
        self.metadata.column_count()
    }

    pub fn row_count(&self) -> usize {
        self.metadata.row_count()
    }

    pub fn ec_level(&self) -> u8 {
        self.metadata.ec_level()
    }

    pub fn metadata(&self) -> &BarcodeMetadata {
        &self.metadata
    }

    pub fn bounding_box(&self) -> &BoundingBox {
        &self.bounding_box
    }

    pub fn set_bounding_box(&mut self, bounding_box: BoundingBox) {
        self.bounding_box = bounding_box;
    }

    /// Column lookup tolerating out-of-range indexes.
    pub fn column(&self, index: i32) -> Option<&DetectionResultColumn> {
        if index < 0 || index as usize >= self.columns.len() {
            return None;
        }
        self.columns[index as usize].as_ref()
    }

    pub fn has_column(&self, index: usize) -> bool {
        self.columns[index].is_some()
    }

    pub fn set_column(&mut self, index: usize, column: DetectionResultColumn) {
        self.columns[index] = Some(column);
    }

    /// Runs row-number repair and hands out the final columns.
    pub fn adjusted_columns(&mut self) -> &[Option<DetectionResultColumn>] {
        let metadata = self.metadata;
        let last = self.columns.len() - 1;
        for index in [0, last] {
            if let Some(column) = &mut self.columns[index] {
                column.adjust_complete_indicator_row_numbers(&metadata);
            }
        }

        let mut unadjusted = MAX_CODEWORDS_IN_BARCODE as i32;
        loop {
            let previous = unadjusted;
            unadjusted = self.adjust_row_numbers();
            if unadjusted == 0 || unadjusted >= previous {
                break;
            }
        }
        &self.columns
    }

    fn adjust_row_numbers(&mut self) -> i32 {
        let unadjusted = self.adjust_row_numbers_by_row();
        if unadjusted == 0 {
            return 0;
        }
        for barcode_column in 1..=self.column_count() {
            let Some(column) = &self.columns[barcode_column] else { continue };
            let rows_to_fix: Vec<usize> = column
                .codewords()
                .iter()
                .enumerate()
                .filter_map(|(row, codeword)| match codeword {
                    Some(codeword) if !codeword.has_valid_row_number() => Some(row),
                    _ => None,
                })
                .collect();
            for row in rows_to_fix {
                self.adjust_cell_row_number(barcode_column, row);
            }
        }
        unadjusted
    }

    fn adjust_row_numbers_by_row(&mut self) -> i32 {
        self.adjust_row_numbers_from_both_indicators();
        let unadjusted = self.adjust_row_numbers_from_indicator(true);
        unadjusted + self.adjust_row_numbers_from_indicator(false)
    }

    /// Where both indicators agree on a row number, stamp it onto the whole
    /// image row; codewords whose bucket cannot sit on that row are dropped.
    fn adjust_row_numbers_from_both_indicators(&mut self) {
        let last = self.columns.len() - 1;
        let agreed: Vec<Option<i32>> = {
            let (Some(left), Some(right)) = (&self.columns[0], &self.columns[last]) else {
                return;
            };
            left.codewords()
                .iter()
                .zip(right.codewords())
                .map(|(left, right)| match (left, right) {
                    (Some(left), Some(right)) if left.row_number() == right.row_number() => {
                        Some(left.row_number())
                    }
                    _ => None,
                })
                .collect()
        };

        for barcode_column in 1..last {
            let Some(column) = &mut self.columns[barcode_column] else { continue };
            for (row, row_number) in agreed.iter().enumerate() {
                let Some(row_number) = *row_number else { continue };
                if row >= column.codewords().len() {
                    break;
                }
                let slot = &mut column.codewords_mut()[row];
                let Some(codeword) = slot else { continue };
                codeword.set_row_number(row_number);
                if !codeword.has_valid_row_number() {
                    *slot = None;
                }
            }
        }
    }

    /// Floods row numbers inward from one indicator, giving up on an image
    /// row after two consecutive codewords that cannot take the number.
    fn adjust_row_numbers_from_indicator(&mut self, left: bool) -> i32 {
        let last = self.columns.len() - 1;
        let indicator_index = if left { 0 } else { last };
        let Some(indicator) = &self.columns[indicator_index] else { return 0 };
        let indicator_rows: Vec<Option<i32>> =
            indicator.codewords().iter().map(|c| c.map(|cw| cw.row_number())).collect();

        let column_order: Vec<usize> =
            if left { (1..last).collect() } else { (1..=last).rev().collect() };

        let mut unadjusted = 0;
        for (row, indicator_row) in indicator_rows.iter().enumerate() {
            let Some(indicator_row) = *indicator_row else { continue };
            let mut invalid_row_counts = 0usize;
            for &barcode_column in &column_order {
                if invalid_row_counts >= ADJUST_ROW_NUMBER_SKIP {
                    break;
                }
                let Some(column) = &mut self.columns[barcode_column] else { continue };
                if row >= column.codewords().len() {
                    continue;
                }
                let Some(codeword) = &mut column.codewords_mut()[row] else { continue };
                invalid_row_counts =
                    adjust_row_number_if_valid(indicator_row, invalid_row_counts, codeword);
                if !codeword.has_valid_row_number() {
                    unadjusted += 1;
                }
            }
        }
        unadjusted
    }

    /// Copies the row number of the first bucket-compatible neighbour, in a
    /// fixed near-to-far order over the same and adjacent columns.
    fn adjust_cell_row_number(&mut self, barcode_column: usize, row: usize) {
        let Some(current) = &self.columns[barcode_column] else { return };
        let Some(codeword) = current.codewords()[row] else { return };
        let height = current.codewords().len();

        let prev_index =
            if self.columns[barcode_column - 1].is_some() { barcode_column - 1 } else { barcode_column };
        let next_index = if barcode_column + 1 < self.columns.len()
            && self.columns[barcode_column + 1].is_some()
        {
            barcode_column + 1
        } else {
            prev_index
        };

        let neighbor = |column_index: usize, neighbor_row: i32| -> Option<Codeword> {
            if neighbor_row < 0 || neighbor_row as usize >= height {
                return None;
            }
            self.columns[column_index].as_ref().and_then(|c| c.codewords()[neighbor_row as usize])
        };

        let row = row as i32;
        let others = [
            neighbor(barcode_column, row - 1),
            neighbor(barcode_column, row + 1),
            neighbor(prev_index, row),
            neighbor(next_index, row),
            neighbor(prev_index, row - 1),
            neighbor(next_index, row - 1),
            neighbor(prev_index, row + 1),
            neighbor(next_index, row + 1),
            neighbor(barcode_column, row - 2),
            neighbor(barcode_column, row + 2),
            neighbor(prev_index, row - 2),
            neighbor(next_index, row - 2),
            neighbor(prev_index, row + 2),
            neighbor(next_index, row + 2),
        ];

        let adopted = others.into_iter().flatten().find_map(|other| {
            (other.has_valid_row_number() && other.bucket() == codeword.bucket())
                .then(|| other.row_number())
        });
        if let Some(row_number) = adopted {
            let mut fixed = codeword;
            fixed.set_row_number(row_number);
            if let Some(column) = &mut self.columns[barcode_column] {
                column.codewords_mut()[row as usize] = Some(fixed);
            }
        }
    }
}

fn adjust_row_number_if_valid(
    indicator_row: i32,
    mut invalid_row_counts: usize,
    codeword: &mut Codeword,
) -> usize {
    if !codeword.has_valid_row_number() {
        if codeword.is_valid_row_number(indicator_row) {
            codeword.set_row_number(indicator_row);
            invalid_row_counts = 0;
        } else {
            invalid_row_counts += 1;
        }
    }
    invalid_row_counts
}
