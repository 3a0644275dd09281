//! Core types for grid processing.

use chess_common::{CellSource, CoastalClass, GridAxes};

/// A dense row-major 2D grid of per-cell values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask<T> {
    width: usize,
    height: usize,
    data: Vec<T>,
}

/// Land (`true`) / no land per cell.
pub type LandMask = Mask<bool>;

/// Coastal classification per cell.
pub type CoastalMask = Mask<CoastalClass>;

impl<T: Clone> Mask<T> {
    /// A mask with every cell set to `value`.
    pub fn filled(width: usize, height: usize, value: T) -> Self {
        Self {
            width,
            height,
            data: vec![value; width * height],
        }
    }
}

impl<T> Mask<T> {
    /// Wrap row-major data. Returns `None` if the length does not match.
    pub fn from_vec(width: usize, height: usize, data: Vec<T>) -> Option<Self> {
        (data.len() == width * height).then_some(Self {
            width,
            height,
            data,
        })
    }

    /// Wrap row-major data whose length the caller derived from
    /// `width * height`.
    pub(crate) fn from_parts(width: usize, height: usize, data: Vec<T>) -> Self {
        debug_assert_eq!(data.len(), width * height, "mask data length");
        Self { width, height, data }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    pub fn get(&self, row: usize, col: usize) -> &T {
        &self.data[row * self.width + col]
    }

    pub fn set(&mut self, row: usize, col: usize, value: T) {
        self.data[row * self.width + col] = value;
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn rows(&self) -> std::slice::Chunks<'_, T> {
        self.data.chunks(self.width.max(1))
    }

    /// Apply `f` to every cell.
    pub fn map<U>(&self, f: impl Fn(&T) -> U) -> Mask<U> {
        Mask {
            width: self.width,
            height: self.height,
            data: self.data.iter().map(f).collect(),
        }
    }

    /// Number of cells for which `f` holds.
    pub fn count(&self, f: impl Fn(&T) -> bool) -> usize {
        self.data.iter().filter(|v| f(v)).count()
    }

    /// Iterate `(row, col, value)` in row-major order.
    pub fn indexed(&self) -> impl Iterator<Item = (usize, usize, &T)> {
        let width = self.width.max(1);
        self.data
            .iter()
            .enumerate()
            .map(move |(k, v)| (k / width, k % width, v))
    }
}

/// The labelled mask plus the axes it was derived from.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelledGrid {
    pub axes: GridAxes,
    pub mask: Mask<CellSource>,
}

impl LabelledGrid {
    /// Cells with data in either source.
    pub fn land_mask(&self) -> LandMask {
        self.mask.map(|source| source.has_data())
    }

    /// Integer view: 0 no data, 1 bias-corrected, 2 non-bias-corrected.
    pub fn label_values(&self) -> Mask<u8> {
        self.mask.map(|source| source.label_value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_vec_checks_length() {
        assert!(Mask::from_vec(3, 2, vec![0u8; 5]).is_none());
        let mask = Mask::from_vec(3, 2, vec![0u8, 1, 2, 3, 4, 5]).unwrap();
        assert_eq!(*mask.get(1, 0), 3);
        assert_eq!(mask.shape(), (2, 3));
    }

    #[test]
    fn test_from_parts_keeps_data() {
        let mask = Mask::from_parts(2, 1, vec![true, false]);
        assert_eq!(mask.shape(), (1, 2));
        assert!(*mask.get(0, 0));
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "mask data length")]
    fn test_from_parts_rejects_length_mismatch() {
        Mask::from_parts(3, 2, vec![0u8; 5]);
    }

    #[test]
    fn test_indexed_and_rows() {
        let mask = Mask::from_vec(2, 2, vec!['a', 'b', 'c', 'd']).unwrap();
        let cells: Vec<_> = mask.indexed().map(|(r, c, v)| (r, c, *v)).collect();
        assert_eq!(cells[3], (1, 1, 'd'));
        assert_eq!(mask.rows().count(), 2);
    }

    #[test]
    fn test_map_and_count() {
        let mask = Mask::from_vec(2, 2, vec![1, 5, 0, 7]).unwrap();
        let positive = mask.map(|v| *v > 0);
        assert_eq!(positive.count(|&p| p), 3);
    }
}
