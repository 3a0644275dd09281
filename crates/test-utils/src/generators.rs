//! Generators for synthetic land/sea masks.
//!
//! Masks are `Vec<bool>` in row-major order (row 0 first), `true` for land.
//! Small masks are easiest to write as ASCII art with [`mask_from_ascii`].

/// Parses an ASCII mask: `#` is land, anything else is water.
///
/// # Panics
///
/// Panics if the rows have different lengths.
///
/// # Example
///
/// ```
/// use test_utils::mask_from_ascii;
///
/// let (width, height, mask) = mask_from_ascii(&[
///     "...",
///     ".#.",
///     "...",
/// ]);
/// assert_eq!((width, height), (3, 3));
/// assert!(mask[4]);
/// assert_eq!(mask.iter().filter(|&&m| m).count(), 1);
/// ```
pub fn mask_from_ascii(rows: &[&str]) -> (usize, usize, Vec<bool>) {
    let height = rows.len();
    let width = rows.first().map_or(0, |r| r.len());
    let mut mask = Vec::with_capacity(width * height);

    for row in rows {
        assert_eq!(row.len(), width, "ragged ASCII mask row: {:?}", row);
        mask.extend(row.chars().map(|c| c == '#'));
    }

    (width, height, mask)
}

/// A rectangular island with `margin` water cells on every side.
pub fn island_mask(width: usize, height: usize, margin: usize) -> Vec<bool> {
    let mut mask = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            let inside = row >= margin
                && col >= margin
                && row + margin < height
                && col + margin < width;
            mask.push(inside);
        }
    }
    mask
}

/// An island with a rectangular lake of `lake_height` x `lake_width` cells
/// whose top-left corner sits at `(lake_row, lake_col)`.
pub fn island_with_lake(
    width: usize,
    height: usize,
    margin: usize,
    lake_row: usize,
    lake_col: usize,
    lake_height: usize,
    lake_width: usize,
) -> Vec<bool> {
    let mut mask = island_mask(width, height, margin);
    for row in lake_row..lake_row + lake_height {
        for col in lake_col..lake_col + lake_width {
            mask[row * width + col] = false;
        }
    }
    mask
}

/// Deterministic pseudo-random mask with roughly `land_fraction` land cells.
///
/// Uses a fixed linear congruential generator so the same seed always
/// yields the same mask.
pub fn scattered_mask(width: usize, height: usize, land_fraction: f64, seed: u64) -> Vec<bool> {
    let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
    (0..width * height)
        .map(|_| {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            ((state >> 33) as f64 / (1u64 << 31) as f64) < land_fraction
        })
        .collect()
}

/// Cell-centre axes of a 1km grid whose first cell centre sits at `(500, 500)`.
pub fn km_axes(width: usize, height: usize) -> (Vec<f64>, Vec<f64>) {
    let x = (0..width).map(|j| 500.0 + j as f64 * 1000.0).collect();
    let y = (0..height).map(|i| 500.0 + i as f64 * 1000.0).collect();
    (x, y)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_from_ascii_diagonal() {
        let (width, height, mask) = mask_from_ascii(&["#..", ".#.", "..#"]);
        assert_eq!((width, height), (3, 3));
        assert_eq!(mask, [true, false, false, false, true, false, false, false, true]);
    }

    #[test]
    fn test_island_mask() {
        let (_, _, expected) = mask_from_ascii(&[".....", ".###.", ".###.", "....."]);
        assert_eq!(island_mask(5, 4, 1), expected);
    }

    #[test]
    fn test_island_with_lake() {
        let mask = island_with_lake(7, 7, 1, 3, 3, 1, 1);
        assert!(!mask[3 * 7 + 3]);
        assert_eq!(mask.iter().filter(|&&m| m).count(), 24);
    }

    #[test]
    fn test_scattered_mask_is_deterministic() {
        let a = scattered_mask(32, 32, 0.5, 7);
        let b = scattered_mask(32, 32, 0.5, 7);
        assert_eq!(a, b);

        let land = a.iter().filter(|&&m| m).count();
        assert!(land > 300 && land < 724, "land = {}", land);
    }

    #[test]
    fn test_km_axes() {
        let (x, y) = km_axes(3, 2);
        assert_eq!(x, vec![500.0, 1500.0, 2500.0]);
        assert_eq!(y, vec![500.0, 1500.0]);
    }
}
