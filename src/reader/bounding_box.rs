use crate::common::error::{PDF417Error, PDF417Result};
use crate::common::types::ResultPoint;

// BoundingBox
//------------------------------------------------------------------------------
// Axis-aligned scanning region built from up to four corner points. A
// missing corner is synthesized from its side partner (x) and its row
// partner (y); a fully missing side falls back to the image edge. At least
// one top and one bottom corner must be present.

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    image_width: usize,
    image_height: usize,
    top_left: ResultPoint,
    bottom_left: ResultPoint,
    top_right: ResultPoint,
    bottom_right: ResultPoint,
    min_x: i32,
    max_x: i32,
    min_y: i32,
    max_y: i32,
}

impl BoundingBox {
    pub fn new(
        image_width: usize,
        image_height: usize,
        top_left: Option<ResultPoint>,
        bottom_left: Option<ResultPoint>,
        top_right: Option<ResultPoint>,
        bottom_right: Option<ResultPoint>,
    ) -> PDF417Result<Self> {
        if top_left.is_none() && top_right.is_none() {
            return Err(PDF417Error::NotFound);
        }
        if bottom_left.is_none() && bottom_right.is_none() {
            return Err(PDF417Error::NotFound);
        }

        let (top_left, bottom_left) =
            complete_side(top_left, bottom_left, top_right, bottom_right, 0.0);
        let (top_right, bottom_right) = complete_side(
            top_right,
            bottom_right,
            Some(top_left),
            Some(bottom_left),
            (image_width - 1) as f32,
        );

        let min_x = top_left.x.min(bottom_left.x) as i32;
        let max_x = top_right.x.max(bottom_right.x) as i32;
        let min_y = top_left.y.min(top_right.y) as i32;
        let max_y = bottom_left.y.max(bottom_right.y) as i32;
        if min_x < 0
            || min_x > max_x
            || max_x >= image_width as i32
            || min_y < 0
            || min_y > max_y
            || max_y >= image_height as i32
        {
            return Err(PDF417Error::NotFound);
        }

        Ok(Self {
            image_width,
            image_height,
            top_left,
            bottom_left,
            top_right,
            bottom_right,
            min_x,
            max_x,
            min_y,
            max_y,
        })
    }

    /// Union of two partial boxes; `None` when neither side produced one.
    pub fn merge(
        left: Option<BoundingBox>,
        right: Option<BoundingBox>,
    ) -> PDF417Result<Option<BoundingBox>> {
        match (left, right) {
            (None, None) => Ok(None),
            (Some(left), None) => Ok(Some(left)),
            (None, Some(right)) => Ok(Some(right)),
            (Some(left), Some(right)) => Self::new(
                left.image_width,
                left.image_height,
                Some(left.top_left),
                Some(left.bottom_left),
                Some(right.top_right),
                Some(right.bottom_right),
            )
            .map(Some),
        }
    }

    /// Extends the box vertically to cover barcode rows the indicator column
    /// missed. Fails when the extension would run past the image.
    pub fn add_missing_rows(
        &self,
        missing_start_rows: i32,
        missing_end_rows: i32,
        is_left: bool,
    ) -> PDF417Result<BoundingBox> {
        let mut top_left = self.top_left;
        let mut bottom_left = self.bottom_left;
        let mut top_right = self.top_right;
        let mut bottom_right = self.bottom_right;

        if missing_start_rows > 0 {
            let top = if is_left { self.top_left } else { self.top_right };
            let new_min_y = top.y as i32 - missing_start_rows;
            if new_min_y < 0 {
                return Err(PDF417Error::NotFound);
            }
            let new_top = ResultPoint::new(top.x, new_min_y as f32);
            if is_left {
                top_left = new_top;
            } else {
                top_right = new_top;
            }
        }
        if missing_end_rows > 0 {
            let bottom = if is_left { self.bottom_left } else { self.bottom_right };
            let new_max_y = bottom.y as i32 + missing_end_rows;
            if new_max_y > self.image_height as i32 - 1 {
                return Err(PDF417Error::NotFound);
            }
            let new_bottom = ResultPoint::new(bottom.x, new_max_y as f32);
            if is_left {
                bottom_left = new_bottom;
            } else {
                bottom_right = new_bottom;
            }
        }

        Self::new(
            self.image_width,
            self.image_height,
            Some(top_left),
            Some(bottom_left),
            Some(top_right),
            Some(bottom_right),
        )
    }

    pub fn min_x(&self) -> i32 {
        self.min_x
    }

    pub fn max_x(&self) -> i32 {
        self.max_x
    }

    pub fn min_y(&self) -> i32 {
        self.min_y
    }

    pub fn max_y(&self) -> i32 {
        self.max_y
    }

    pub fn top_left(&self) -> ResultPoint {
        self.top_left
    }

    pub fn bottom_left(&self) -> ResultPoint {
        self.bottom_left
    }

    pub fn top_right(&self) -> ResultPoint {
        self.top_right
    }

    pub fn bottom_right(&self) -> ResultPoint {
        self.bottom_right
    }
}

/// Completes one side of the box. `top`/`bottom` are this side's corners,
/// `other_top`/`other_bottom` the opposite side's, `edge_x` the image edge
/// this side collapses to when fully absent.
fn complete_side(
    top: Option<ResultPoint>,
    bottom: Option<ResultPoint>,
    other_top: Option<ResultPoint>,
    other_bottom: Option<ResultPoint>,
    edge_x: f32,
) -> (ResultPoint, ResultPoint) {
    match (top, bottom) {
        (Some(top), Some(bottom)) => (top, bottom),
        (Some(top), None) => {
            let y = other_bottom.map_or(top.y, |p| p.y);
            (top, ResultPoint::new(top.x, y))
        }
        (None, Some(bottom)) => {
            let y = other_top.map_or(bottom.y, |p| p.y);
            (ResultPoint::new(bottom.x, y), bottom)
        }
        (None, None) => {
            // Caller guarantees the opposite side exists.
            let top_y = other_top.map_or(0.0, |p| p.y);
            let bottom_y = other_bottom.map_or(0.0, |p| p.y);
            (ResultPoint::new(edge_x, top_y), ResultPoint::new(edge_x, bottom_y))
        }
    }
}
