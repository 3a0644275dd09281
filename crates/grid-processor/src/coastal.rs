//! Coastal proximity classification of land cells.
//!
//! Every stage is a pure function of its inputs:
//!
//! ```text
//! land mask ─┬─► fill_small_holes ──► coastline_mask ───────────┐
//!            │                                                   ├─► classify
//!            └─► fill_holes ──► squared_distance_to_water ──────┘
//! ```
//!
//! Inland bands are computed from an exact squared Euclidean distance
//! transform rather than by repeated erosion: a land cell is removed by an
//! erosion with the disk `x² + y² <= r²` exactly when some water cell lies
//! within that disk, i.e. when its squared distance to water is at most `r²`.
//! Cells outside the raster count as water.

use std::collections::VecDeque;

use rayon::prelude::*;
use tracing::{debug, info, instrument};

use chess_common::CoastalClass;

use crate::config::{Connectivity, GridProcessorConfig};
use crate::types::{CoastalMask, LandMask, Mask};

/// Derives [`CoastalClass`] per cell from a land mask.
#[derive(Debug, Clone, Copy)]
pub struct CoastalClassifier {
    hole_fill_threshold: usize,
    connectivity: Connectivity,
}

impl CoastalClassifier {
    pub fn new(hole_fill_threshold: usize, connectivity: Connectivity) -> Self {
        Self {
            hole_fill_threshold,
            connectivity,
        }
    }

    pub fn from_config(config: &GridProcessorConfig) -> Self {
        Self::new(config.hole_fill_threshold, config.connectivity)
    }

    /// Classify every cell of `land`. Non-land cells are [`CoastalClass::Ocean`].
    #[instrument(skip_all, fields(width = land.width(), height = land.height()))]
    pub fn classify(&self, land: &LandMask) -> CoastalMask {
        let small_filled = fill_small_holes(land, self.hole_fill_threshold, self.connectivity);
        debug!(
            filled = small_filled.count(|&l| l) - land.count(|&l| l),
            threshold = self.hole_fill_threshold,
            "Filled small water bodies"
        );

        let coastline = coastline_mask(land, &small_filled);
        let distance = squared_distance_to_water(&fill_holes(land, self.connectivity));
        let classes = classify(land, &coastline, &distance);

        info!(
            coastline = classes.count(|&c| c == CoastalClass::Coastline),
            within_10km = classes.count(|&c| c == CoastalClass::Within10Km),
            land = classes.count(|&c| c == CoastalClass::Land),
            "Classified coastal proximity"
        );

        classes
    }
}

/// Fill water bodies enclosed by land that have at most `threshold` cells.
///
/// Water connected to the raster border is never enclosed.
pub fn fill_small_holes(land: &LandMask, threshold: usize, connectivity: Connectivity) -> LandMask {
    let (height, width) = land.shape();
    let cells = land.as_slice();
    let mut filled = land.clone();
    let mut seen = vec![false; cells.len()];
    let mut queue = VecDeque::new();
    let mut component = Vec::new();

    for start in 0..cells.len() {
        if cells[start] || seen[start] {
            continue;
        }

        seen[start] = true;
        queue.push_back(start);
        component.clear();
        let mut touches_border = false;

        while let Some(k) = queue.pop_front() {
            component.push(k);
            let (row, col) = (k / width, k % width);
            if row == 0 || col == 0 || row + 1 == height || col + 1 == width {
                touches_border = true;
            }

            for &(dr, dc) in connectivity.offsets() {
                let (nr, nc) = (row as isize + dr, col as isize + dc);
                if nr < 0 || nc < 0 || nr >= height as isize || nc >= width as isize {
                    continue;
                }
                let nk = nr as usize * width + nc as usize;
                if !cells[nk] && !seen[nk] {
                    seen[nk] = true;
                    queue.push_back(nk);
                }
            }
        }

        if !touches_border && component.len() <= threshold {
            let out = filled.as_mut_slice();
            for &k in &component {
                out[k] = true;
            }
        }
    }

    filled
}

/// Fill every enclosed water body regardless of size.
pub fn fill_holes(land: &LandMask, connectivity: Connectivity) -> LandMask {
    fill_small_holes(land, usize::MAX, connectivity)
}

/// Land cells (of `land`) with at least one non-land cell in their 3x3
/// window of `filled`. Cells outside the raster count as non-land.
pub fn coastline_mask(land: &LandMask, filled: &LandMask) -> LandMask {
    let (height, width) = land.shape();
    let mut coastline = Mask::filled(width, height, false);

    for (row, col, &is_land) in land.indexed() {
        if !is_land {
            continue;
        }
        let neighbours = neighbour_count(filled, row, col);
        if neighbours > 0 && neighbours < 9 {
            coastline.set(row, col, true);
        }
    }

    coastline
}

/// Land cells in the 3x3 window centred on `(row, col)`, the cell included.
pub fn neighbour_count(mask: &LandMask, row: usize, col: usize) -> u8 {
    let (height, width) = mask.shape();
    let mut count = 0;

    for r in row.saturating_sub(1)..=(row + 1).min(height - 1) {
        for c in col.saturating_sub(1)..=(col + 1).min(width - 1) {
            if *mask.get(r, c) {
                count += 1;
            }
        }
    }

    count
}

/// Squared Euclidean distance, in cells, from each cell to the nearest
/// non-land cell. Cells outside the raster count as non-land, so every value
/// is finite.
pub fn squared_distance_to_water(land: &LandMask) -> Mask<f64> {
    let (height, width) = land.shape();
    let (padded_h, padded_w) = (height + 2, width + 2);

    // Larger than any real squared distance on the padded grid; kept finite
    // so the envelope arithmetic stays exact.
    let far = ((padded_h + padded_w) * (padded_h + padded_w)) as f64;

    let columns: Vec<Vec<f64>> = (0..padded_w)
        .into_par_iter()
        .map(|pc| {
            let f: Vec<f64> = (0..padded_h)
                .map(|pr| {
                    let interior = pr >= 1 && pr <= height && pc >= 1 && pc <= width;
                    if interior && *land.get(pr - 1, pc - 1) {
                        far
                    } else {
                        0.0
                    }
                })
                .collect();
            distance_1d(&f)
        })
        .collect();

    let rows: Vec<Vec<f64>> = (1..=height)
        .into_par_iter()
        .map(|pr| {
            let f: Vec<f64> = columns.iter().map(|column| column[pr]).collect();
            let mut d = distance_1d(&f);
            d.truncate(width + 1);
            d.remove(0);
            d
        })
        .collect();

    Mask::from_parts(width, height, rows.concat())
}

/// Land cells within `radius` cells of water: `land AND NOT erode(filled, disk(radius))`.
pub fn inland_band(land: &LandMask, distance: &Mask<f64>, radius: u32) -> LandMask {
    let r2 = f64::from(radius * radius);
    let data = land
        .as_slice()
        .iter()
        .zip(distance.as_slice())
        .map(|(&l, &d2)| l && d2 <= r2)
        .collect();

    Mask::from_parts(land.width(), land.height(), data)
}

/// Assemble the final classes: land, then bands widest to narrowest, then
/// coastline, each overwriting the previous.
pub fn classify(land: &LandMask, coastline: &LandMask, distance: &Mask<f64>) -> CoastalMask {
    let mut classes = land.map(|&l| if l { CoastalClass::Land } else { CoastalClass::Ocean });

    for band in CoastalClass::BANDS.iter().rev() {
        let Some(radius) = band.band_radius() else {
            continue;
        };
        let members = inland_band(land, distance, radius);
        for (k, &member) in members.as_slice().iter().enumerate() {
            if member {
                classes.as_mut_slice()[k] = *band;
            }
        }
    }

    for (k, &is_coast) in coastline.as_slice().iter().enumerate() {
        if is_coast {
            classes.as_mut_slice()[k] = CoastalClass::Coastline;
        }
    }

    classes
}

/// Lower envelope of parabolas (Felzenszwalb & Huttenlocher) for one line.
fn distance_1d(f: &[f64]) -> Vec<f64> {
    let n = f.len();
    let mut d = vec![0.0; n];
    if n == 0 {
        return d;
    }

    let mut v = vec![0usize; n];
    let mut z = vec![0.0f64; n + 1];
    let mut k = 0usize;
    z[0] = f64::NEG_INFINITY;
    z[1] = f64::INFINITY;

    for q in 1..n {
        let mut s = parabola_intersection(f, q, v[k]);
        while s <= z[k] {
            k -= 1;
            s = parabola_intersection(f, q, v[k]);
        }
        k += 1;
        v[k] = q;
        z[k] = s;
        z[k + 1] = f64::INFINITY;
    }

    k = 0;
    for (q, out) in d.iter_mut().enumerate() {
        while z[k + 1] < q as f64 {
            k += 1;
        }
        let dq = q as f64 - v[k] as f64;
        *out = dq * dq + f[v[k]];
    }

    d
}

fn parabola_intersection(f: &[f64], q: usize, p: usize) -> f64 {
    let (qf, pf) = (q as f64, p as f64);
    ((f[q] + qf * qf) - (f[p] + pf * pf)) / (2.0 * (qf - pf))
}
