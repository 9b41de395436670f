//! Conversion between scene space and raster space.
//!
//! Scene space is normalized, `x, y` in `[-1, 1]`, origin at the center, +y up.
//! Raster space is column/row, origin top-left, +row down.

/// Raster column for a scene `x`. May land outside `[0, width)`; see [`clamp_to_raster`].
pub fn scene_column(x: f32, width: usize) -> i64 {
    (((x + 1.0) / 2.0) * width as f32).round() as i64
}

/// Raster row for a scene `y` (the vertical flip is baked in).
pub fn scene_row(y: f32, height: usize) -> i64 {
    (((2.0 - (y + 1.0)) / 2.0) * height as f32).round() as i64
}

pub fn column_to_x(col: i64, width: usize) -> f32 {
    (col as f32 / width as f32) * 2.0 - 1.0
}

pub fn row_to_y(row: i64, height: usize) -> f32 {
    ((height as f32 - row as f32) / height as f32) * 2.0 - 1.0
}

/// Pull a possibly out-of-range `(col, row)` back inside a non-empty raster.
/// Returns `None` when the raster has no pixels at all.
pub fn clamp_to_raster(col: i64, row: i64, width: usize, height: usize) -> Option<(usize, usize)> {
    if width == 0 || height == 0 {
        return None;
    }
    let col = col.clamp(0, width as i64 - 1) as usize;
    let row = row.clamp(0, height as i64 - 1) as usize;
    Some((col, row))
}
