use tracing::debug;

use super::barcode_value::BarcodeValue;
use super::bounding_box::BoundingBox;
use super::codeword::Codeword;
use super::codeword_decoder;
use super::column::{ColumnKind, DetectionResultColumn};
use super::detection_result::DetectionResult;
use super::DecoderResult;
use crate::common::codec::decode_bitstream;
use crate::common::ec;
use crate::common::error::{PDF417Error, PDF417Result};
use crate::common::metadata::{BarcodeMetadata, BARS_IN_MODULE, MAX_CODEWORDS_IN_BARCODE};
use crate::common::types::{BitMatrix, ResultPoint};

// Scanning decoder
//------------------------------------------------------------------------------
// Walks the raster between the corner points one image row at a time,
// segments rows into codewords, reconciles the row indicator columns,
// assembles the voting matrix and drives error correction with bounded
// backtracking over ambiguous cells.

const CODEWORD_SKEW_SIZE: i32 = 2;
const MAX_ERRORS: usize = 3;
const MAX_EC_CODEWORDS: usize = 512;
const AMBIGUOUS_TRIES: usize = 100;

/// Decodes the symbol between the given corner points. `min_codeword_width`
/// and `max_codeword_width` seed the plausible pixel width of a codeword and
/// drift towards the observed widths while scanning.
#[allow(clippy::too_many_arguments)]
pub fn decode(
    image: &BitMatrix,
    top_left: Option<ResultPoint>,
    bottom_left: Option<ResultPoint>,
    top_right: Option<ResultPoint>,
    bottom_right: Option<ResultPoint>,
    mut min_codeword_width: i32,
    mut max_codeword_width: i32,
) -> PDF417Result<DecoderResult> {
    let mut bounding_box =
        BoundingBox::new(image.width(), image.height(), top_left, bottom_left, top_right, bottom_right)?;

    let mut left_indicator: Option<DetectionResultColumn> = None;
    let mut right_indicator: Option<DetectionResultColumn> = None;
    let mut metadata: Option<BarcodeMetadata> = None;
    for pass in 0..2 {
        if let Some(start) = top_left {
            left_indicator = Some(row_indicator_column(
                image,
                &bounding_box,
                start,
                true,
                min_codeword_width,
                max_codeword_width,
            ));
        }
        if let Some(start) = top_right {
            right_indicator = Some(row_indicator_column(
                image,
                &bounding_box,
                start,
                false,
                min_codeword_width,
                max_codeword_width,
            ));
        }
        let (merged_metadata, merged_box) = merge(&mut left_indicator, &mut right_indicator)?;
        metadata = Some(merged_metadata);

        if pass == 0 {
            if let Some(merged_box) = merged_box {
                // The indicators may reveal rows above or below the initial
                // box; rescan with the grown box once.
                if merged_box.min_y() < bounding_box.min_y()
                    || merged_box.max_y() > bounding_box.max_y()
                {
                    bounding_box = merged_box;
                    continue;
                }
            }
        }
        break;
    }
    let metadata = metadata.ok_or(PDF417Error::NotFound)?;
    debug!(
        rows = metadata.row_count(),
        columns = metadata.column_count(),
        ec_level = metadata.ec_level(),
        "row indicators merged"
    );

    let mut detection_result = DetectionResult::new(metadata, bounding_box);
    let max_barcode_column = detection_result.column_count() + 1;
    if let Some(column) = left_indicator {
        detection_result.set_column(0, column);
    }
    if let Some(column) = right_indicator {
        detection_result.set_column(max_barcode_column, column);
    }

    let left_to_right = detection_result.has_column(0);
    for offset in 1..=max_barcode_column {
        let barcode_column =
            if left_to_right { offset } else { max_barcode_column - offset };
        if detection_result.has_column(barcode_column) {
            // The opposite row indicator was already decoded.
            continue;
        }
        let kind = if barcode_column == 0 {
            ColumnKind::LeftIndicator
        } else if barcode_column == max_barcode_column {
            ColumnKind::RightIndicator
        } else {
            ColumnKind::Data
        };
        let mut column = DetectionResultColumn::new(&bounding_box, kind);

        let mut previous_start_column = -1;
        for image_row in bounding_box.min_y()..=bounding_box.max_y() {
            let mut start_column = start_column_for(
                &detection_result,
                &column,
                barcode_column as i32,
                image_row,
                left_to_right,
            );
            if start_column < 0 || start_column > bounding_box.max_x() {
                if previous_start_column == -1 {
                    continue;
                }
                start_column = previous_start_column;
            }
            let codeword = detect_codeword(
                image,
                bounding_box.min_x(),
                bounding_box.max_x(),
                left_to_right,
                start_column,
                image_row,
                min_codeword_width,
                max_codeword_width,
            );
            if let Some(codeword) = codeword {
                column.set_codeword(image_row, codeword);
                previous_start_column = start_column;
                min_codeword_width = min_codeword_width.min(codeword.width());
                max_codeword_width = max_codeword_width.max(codeword.width());
            }
        }
        detection_result.set_column(barcode_column, column);
    }

    create_decoder_result(&mut detection_result)
}

// Row traversal
//------------------------------------------------------------------------------

fn pixel(image: &BitMatrix, column: i32, row: i32) -> bool {
    column >= 0 && row >= 0 && image.get(column as usize, row as usize)
}

/// Backs the start column onto the leading edge of the codeword: a
/// left-to-right codeword must begin on black with white immediately
/// before. Gives up beyond the skew tolerance.
fn adjust_codeword_start_column(
    image: &BitMatrix,
    min_column: i32,
    max_column: i32,
    mut left_to_right: bool,
    codeword_start_column: i32,
    image_row: i32,
) -> i32 {
    let mut corrected = codeword_start_column;
    let mut increment = if left_to_right { -1 } else { 1 };
    for _ in 0..2 {
        while (if left_to_right { corrected >= min_column } else { corrected < max_column })
            && left_to_right == pixel(image, corrected, image_row)
        {
            if (codeword_start_column - corrected).abs() > CODEWORD_SKEW_SIZE {
                return codeword_start_column;
            }
            corrected += increment;
        }
        increment = -increment;
        left_to_right = !left_to_right;
    }
    corrected
}

/// Accumulates the 8 run lengths of one codeword. Reaching the scan
/// boundary with 7 modules is accepted; the boundary closes the last run.
fn module_bit_count(
    image: &BitMatrix,
    min_column: i32,
    max_column: i32,
    left_to_right: bool,
    start_column: i32,
    image_row: i32,
) -> Option<[i32; BARS_IN_MODULE]> {
    let mut image_column = start_column;
    let mut counts = [0i32; BARS_IN_MODULE];
    let mut module_number = 0usize;
    let increment = if left_to_right { 1 } else { -1 };
    let mut previous_pixel = left_to_right;

    while (if left_to_right { image_column < max_column } else { image_column >= min_column })
        && module_number < counts.len()
    {
        if pixel(image, image_column, image_row) == previous_pixel {
            counts[module_number] += 1;
            image_column += increment;
        } else {
            module_number += 1;
            previous_pixel = !previous_pixel;
        }
    }
    let boundary = if left_to_right { max_column } else { min_column };
    if module_number == counts.len()
        || (image_column == boundary && module_number == counts.len() - 1)
    {
        return Some(counts);
    }
    None
}

fn check_codeword_skew(codeword_size: i32, min_codeword_width: i32, max_codeword_width: i32) -> bool {
    min_codeword_width - CODEWORD_SKEW_SIZE <= codeword_size
        && codeword_size <= max_codeword_width + CODEWORD_SKEW_SIZE
}

#[allow(clippy::too_many_arguments)]
fn detect_codeword(
    image: &BitMatrix,
    min_column: i32,
    max_column: i32,
    left_to_right: bool,
    start_column: i32,
    image_row: i32,
    min_codeword_width: i32,
    max_codeword_width: i32,
) -> Option<Codeword> {
    let start_column = adjust_codeword_start_column(
        image,
        min_column,
        max_column,
        left_to_right,
        start_column,
        image_row,
    );
    let mut counts =
        module_bit_count(image, min_column, max_column, left_to_right, start_column, image_row)?;

    let codeword_bit_count: i32 = counts.iter().sum();
    let (start_column, end_column) = if left_to_right {
        (start_column, start_column + codeword_bit_count)
    } else {
        counts.reverse();
        (start_column - codeword_bit_count, start_column)
    };

    // The drifting width bounds are derived from the whole barcode and can
    // be off locally; the skew constant gives them slack.
    if !check_codeword_skew(codeword_bit_count, min_codeword_width, max_codeword_width) {
        return None;
    }

    let (cluster, value) = codeword_decoder::decode(&counts)?;
    Some(Codeword::new(start_column, end_column, cluster, value))
}

/// Walks an indicator column downwards from the start point and then
/// upwards, tracking the per-row start column to follow skewed bars.
fn row_indicator_column(
    image: &BitMatrix,
    bounding_box: &BoundingBox,
    start_point: ResultPoint,
    left_to_right: bool,
    min_codeword_width: i32,
    max_codeword_width: i32,
) -> DetectionResultColumn {
    let kind = if left_to_right { ColumnKind::LeftIndicator } else { ColumnKind::RightIndicator };
    let mut column = DetectionResultColumn::new(bounding_box, kind);

    for pass in 0..2 {
        let increment: i32 = if pass == 0 { 1 } else { -1 };
        let mut start_column = start_point.x as i32;
        let mut image_row = start_point.y as i32;
        while image_row <= bounding_box.max_y() && image_row >= bounding_box.min_y() {
            let codeword = detect_codeword(
                image,
                0,
                image.width() as i32,
                left_to_right,
                start_column,
                image_row,
                min_codeword_width,
                max_codeword_width,
            );
            if let Some(codeword) = codeword {
                column.set_codeword(image_row, codeword);
                start_column =
                    if left_to_right { codeword.start_x() } else { codeword.end_x() };
            }
            image_row += increment;
        }
    }
    column
}

// Metadata reconciliation
//------------------------------------------------------------------------------

/// Weak agreement rule: with both indicators decoded, the merge is rejected
/// only when column count, EC level and row count all three disagree; the
/// left indicator wins partial disagreements.
fn barcode_metadata(
    left_indicator: &mut Option<DetectionResultColumn>,
    right_indicator: &mut Option<DetectionResultColumn>,
) -> Option<BarcodeMetadata> {
    let left_metadata = left_indicator.as_mut().and_then(|c| c.barcode_metadata());
    let Some(left_metadata) = left_metadata else {
        return right_indicator.as_mut().and_then(|c| c.barcode_metadata());
    };
    let Some(right_metadata) = right_indicator.as_mut().and_then(|c| c.barcode_metadata())
    else {
        return Some(left_metadata);
    };

    if left_metadata.column_count() != right_metadata.column_count()
        && left_metadata.ec_level() != right_metadata.ec_level()
        && left_metadata.row_count() != right_metadata.row_count()
    {
        return None;
    }
    Some(left_metadata)
}

/// Extends an indicator's bounding box over barcode rows it missed at the
/// top and bottom, estimated from the tallest observed row.
fn adjust_bounding_box(
    indicator: Option<&mut DetectionResultColumn>,
) -> PDF417Result<Option<BoundingBox>> {
    let Some(indicator) = indicator else { return Ok(None) };
    let Some(row_heights) = indicator.row_heights() else { return Ok(None) };
    let max_row_height = row_heights.iter().copied().max().unwrap_or(0);

    let mut missing_start_rows = 0i32;
    for &height in &row_heights {
        missing_start_rows += max_row_height - height;
        if height > 0 {
            break;
        }
    }
    for codeword in indicator.codewords() {
        if missing_start_rows <= 0 || codeword.is_some() {
            break;
        }
        missing_start_rows -= 1;
    }

    let mut missing_end_rows = 0i32;
    for &height in row_heights.iter().rev() {
        missing_end_rows += max_row_height - height;
        if height > 0 {
            break;
        }
    }
    for codeword in indicator.codewords().iter().rev() {
        if missing_end_rows <= 0 || codeword.is_some() {
            break;
        }
        missing_end_rows -= 1;
    }

    indicator
        .bounding_box()
        .add_missing_rows(missing_start_rows, missing_end_rows, indicator.is_left_indicator())
        .map(Some)
}

fn merge(
    left_indicator: &mut Option<DetectionResultColumn>,
    right_indicator: &mut Option<DetectionResultColumn>,
) -> PDF417Result<(BarcodeMetadata, Option<BoundingBox>)> {
    if left_indicator.is_none() && right_indicator.is_none() {
        return Err(PDF417Error::NotFound);
    }
    let metadata =
        barcode_metadata(left_indicator, right_indicator).ok_or(PDF417Error::NotFound)?;
    let left_box = adjust_bounding_box(left_indicator.as_mut())?;
    let right_box = adjust_bounding_box(right_indicator.as_mut())?;
    let merged = BoundingBox::merge(left_box, right_box)?;
    Ok((metadata, merged))
}

// Start column inference
//------------------------------------------------------------------------------

fn is_valid_barcode_column(detection_result: &DetectionResult, barcode_column: i32) -> bool {
    barcode_column >= 0 && barcode_column <= detection_result.column_count() as i32 + 1
}

/// Next expected pixel column, inferred in order from: the previous
/// column's codeword on this row, a nearby codeword in the current column,
/// a nearby one in the previous column, any codeword further back (offset
/// by the skipped width), and finally the bounding box edge.
fn start_column_for(
    detection_result: &DetectionResult,
    current_column: &DetectionResultColumn,
    barcode_column: i32,
    image_row: i32,
    left_to_right: bool,
) -> i32 {
    let offset: i32 = if left_to_right { 1 } else { -1 };

    let far_edge =
        |codeword: &Codeword| if left_to_right { codeword.end_x() } else { codeword.start_x() };
    let near_edge =
        |codeword: &Codeword| if left_to_right { codeword.start_x() } else { codeword.end_x() };

    if is_valid_barcode_column(detection_result, barcode_column - offset) {
        if let Some(codeword) =
            detection_result.column(barcode_column - offset).and_then(|c| c.codeword(image_row))
        {
            return far_edge(&codeword);
        }
    }
    if let Some(codeword) = current_column.codeword_nearby(image_row) {
        return near_edge(&codeword);
    }
    if is_valid_barcode_column(detection_result, barcode_column - offset) {
        if let Some(codeword) = detection_result
            .column(barcode_column - offset)
            .and_then(|c| c.codeword_nearby(image_row))
        {
            return far_edge(&codeword);
        }
    }

    let mut skipped_columns = 0;
    let mut column_index = barcode_column;
    while is_valid_barcode_column(detection_result, column_index - offset) {
        column_index -= offset;
        if let Some(column) = detection_result.column(column_index) {
            if let Some(codeword) = column.codewords().iter().flatten().next() {
                return far_edge(codeword) + offset * skipped_columns * codeword.width();
            }
        }
        skipped_columns += 1;
    }

    if left_to_right {
        detection_result.bounding_box().min_x()
    } else {
        detection_result.bounding_box().max_x()
    }
}

// Matrix assembly and error correction
//------------------------------------------------------------------------------

fn create_barcode_matrix(detection_result: &mut DetectionResult) -> Vec<Vec<BarcodeValue>> {
    let row_count = detection_result.row_count();
    let column_count = detection_result.column_count();
    let mut matrix = vec![vec![BarcodeValue::new(); column_count + 2]; row_count];

    for (column, result_column) in detection_result.adjusted_columns().iter().enumerate() {
        let Some(result_column) = result_column else { continue };
        for codeword in result_column.codewords().iter().flatten() {
            let row_number = codeword.row_number();
            if row_number >= 0 && (row_number as usize) < matrix.len() {
                // Row numbers past the metadata row count are dropped.
                matrix[row_number as usize][column].set_value(codeword.value());
            }
        }
    }
    matrix
}

fn number_of_ec_codewords(ec_level: u8) -> usize {
    2 << ec_level
}

/// The first data cell is the Symbol Length Descriptor. An empty or
/// disagreeing cell is replaced with the count derived from the row
/// indicators, which is the more reliable source.
fn adjust_codeword_count(
    detection_result: &DetectionResult,
    matrix: &mut [Vec<BarcodeValue>],
) -> PDF417Result<()> {
    let calculated = detection_result.column_count() as i64 * detection_result.row_count() as i64
        - number_of_ec_codewords(detection_result.ec_level()) as i64;
    if calculated < 1 || calculated > MAX_CODEWORDS_IN_BARCODE as i64 {
        return Err(PDF417Error::NotFound);
    }
    let calculated = calculated as u16;

    let observed = matrix[0][1].values();
    if observed.is_empty() || observed[0] != calculated {
        matrix[0][1] = BarcodeValue::new();
        matrix[0][1].set_value(calculated);
    }
    Ok(())
}

fn create_decoder_result(detection_result: &mut DetectionResult) -> PDF417Result<DecoderResult> {
    let mut matrix = create_barcode_matrix(detection_result);
    adjust_codeword_count(detection_result, &mut matrix)?;

    let row_count = detection_result.row_count();
    let column_count = detection_result.column_count();
    let mut codewords = vec![0u16; row_count * column_count];
    let mut erasures: Vec<usize> = Vec::new();
    let mut ambiguous_indexes: Vec<usize> = Vec::new();
    let mut ambiguous_values: Vec<Vec<u16>> = Vec::new();

    for row in 0..row_count {
        for column in 0..column_count {
            let values = matrix[row][column + 1].values();
            let codeword_index = row * column_count + column;
            match values.len() {
                0 => erasures.push(codeword_index),
                1 => codewords[codeword_index] = values[0],
                _ => {
                    ambiguous_indexes.push(codeword_index);
                    ambiguous_values.push(values);
                }
            }
        }
    }
    debug!(
        codewords = codewords.len(),
        erasures = erasures.len(),
        ambiguous = ambiguous_indexes.len(),
        "barcode matrix assembled"
    );

    decode_with_ambiguous_values(
        detection_result.ec_level(),
        codewords,
        &erasures,
        &ambiguous_indexes,
        &ambiguous_values,
    )
}

/// Bounded backtracking over ambiguous cells: each cell starts at its most
/// confident value and the counters advance like a mixed-radix number on
/// every checksum failure. Any other outcome is final.
fn decode_with_ambiguous_values(
    ec_level: u8,
    mut codewords: Vec<u16>,
    erasures: &[usize],
    ambiguous_indexes: &[usize],
    ambiguous_values: &[Vec<u16>],
) -> PDF417Result<DecoderResult> {
    let mut choice = vec![0usize; ambiguous_indexes.len()];

    for _ in 0..AMBIGUOUS_TRIES {
        for (i, &index) in ambiguous_indexes.iter().enumerate() {
            codewords[index] = ambiguous_values[i][choice[i]];
        }
        match decode_codewords(&mut codewords, ec_level, erasures) {
            Err(PDF417Error::Checksum) => {}
            result => return result,
        }

        if choice.is_empty() {
            return Err(PDF417Error::Checksum);
        }
        let mut advanced = false;
        for (i, position) in choice.iter_mut().enumerate() {
            if *position < ambiguous_values[i].len() - 1 {
                *position += 1;
                advanced = true;
                break;
            }
            *position = 0;
        }
        if !advanced {
            return Err(PDF417Error::Checksum);
        }
    }
    Err(PDF417Error::Checksum)
}

fn correct_errors(
    codewords: &mut [u16],
    erasures: &[usize],
    num_ec_codewords: usize,
) -> PDF417Result<usize> {
    if erasures.len() > num_ec_codewords / 2 + MAX_ERRORS || num_ec_codewords > MAX_EC_CODEWORDS {
        // Too many erasures to correct, or the EC level is corrupted.
        return Err(PDF417Error::Checksum);
    }
    ec::decode(codewords, num_ec_codewords, erasures)
}

/// The Symbol Length Descriptor must cover the array; zero is repaired from
/// the array length when the EC count leaves room.
fn verify_codeword_count(codewords: &mut [u16], num_ec_codewords: usize) -> PDF417Result<()> {
    if codewords.len() < 4 {
        // SLD, one data codeword and two EC codewords at minimum.
        return Err(PDF417Error::Format);
    }
    let declared = codewords[0] as usize;
    if declared > codewords.len() {
        return Err(PDF417Error::Format);
    }
    if declared == 0 {
        if num_ec_codewords < codewords.len() {
            codewords[0] = (codewords.len() - num_ec_codewords) as u16;
        } else {
            return Err(PDF417Error::Format);
        }
    }
    Ok(())
}

fn decode_codewords(
    codewords: &mut [u16],
    ec_level: u8,
    erasures: &[usize],
) -> PDF417Result<DecoderResult> {
    if codewords.is_empty() {
        return Err(PDF417Error::Format);
    }
    let num_ec_codewords = 1usize << (ec_level + 1);
    let errors_corrected = correct_errors(codewords, erasures, num_ec_codewords)?;
    verify_codeword_count(codewords, num_ec_codewords)?;

    let payload = decode_bitstream(codewords)?;
    Ok(DecoderResult {
        text: payload.text,
        bytes: payload.bytes,
        codewords: codewords.to_vec(),
        ec_level,
        errors_corrected,
        erasures: erasures.len(),
    })
}
