// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The iteration grid, and the row ranges it is handed out in.

use error::Error;

/// A contiguous range of image rows, `[start_row, end_row)`, together
/// with the size of the whole image.  This is what both the block
/// partitioner and the coordinator hand to a worker.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct WorkUnit {
    /// First row of the range.
    pub start_row: usize,
    /// One past the last row of the range.
    pub end_row: usize,
    /// Width of the full image.
    pub width: usize,
    /// Height of the full image.
    pub height: usize,
}

impl WorkUnit {
    /// A unit covering exactly one row.
    pub fn row(row: usize, width: usize, height: usize) -> Self {
        WorkUnit {
            start_row: row,
            end_row: row + 1,
            width,
            height,
        }
    }

    /// A unit covering the whole image.
    pub fn whole(width: usize, height: usize) -> Self {
        WorkUnit {
            start_row: 0,
            end_row: height,
            width,
            height,
        }
    }

    /// Number of rows in the range.
    pub fn rows(&self) -> usize {
        self.end_row - self.start_row
    }

    /// Number of pixels in the range.
    pub fn len(&self) -> usize {
        self.rows() * self.width
    }

    /// True if the range holds no rows.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Offset of the range's first pixel in the row-major grid.
    pub fn displacement(&self) -> usize {
        self.start_row * self.width
    }

    /// A zeroed buffer for the worker to fill.
    pub fn buffer(&self) -> Result<Vec<u32>, Error> {
        zeroed(self.len())
    }
}

// Allocation failure comes back as an error instead of an abort.
fn zeroed(len: usize) -> Result<Vec<u32>, Error> {
    let mut cells: Vec<u32> = Vec::new();
    cells
        .try_reserve_exact(len)
        .map_err(|_| Error::Allocation(len))?;
    cells.resize(len, 0);
    Ok(cells)
}

/// A `width` x `height`, row-major grid of iteration counts.
#[derive(Clone, Debug, PartialEq)]
pub struct IterationGrid {
    width: usize,
    height: usize,
    cells: Vec<u32>,
}

impl IterationGrid {
    /// Allocate a zeroed grid.  Allocation failure is reported rather
    /// than left to the allocator to abort on.
    pub fn new(width: usize, height: usize) -> Result<Self, Error> {
        let len = width
            .checked_mul(height)
            .ok_or(Error::Allocation(usize::max_value()))?;
        Ok(IterationGrid {
            width,
            height,
            cells: zeroed(len)?,
        })
    }

    /// Width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// The iteration count at column `x`, row `y`.
    pub fn get(&self, x: usize, y: usize) -> u32 {
        self.cells[y * self.width + x]
    }

    /// One row of the grid.
    pub fn row(&self, y: usize) -> &[u32] {
        &self.cells[y * self.width..(y + 1) * self.width]
    }

    /// Copy a finished row into place.
    pub fn write_row(&mut self, y: usize, row: &[u32]) {
        self.write_block(&WorkUnit::row(y, self.width, self.height), row)
    }

    /// Copy a finished block into place at its displacement.
    pub fn write_block(&mut self, unit: &WorkUnit, block: &[u32]) {
        let start = unit.displacement();
        self.cells[start..start + block.len()].copy_from_slice(block);
    }

    /// The range of the grid a work unit covers, for a worker that
    /// renders straight into it.
    pub fn block_mut(&mut self, unit: &WorkUnit) -> &mut [u32] {
        let start = unit.displacement();
        &mut self.cells[start..start + unit.len()]
    }

    /// Every count, row-major.
    pub fn cells(&self) -> &[u32] {
        &self.cells
    }

    /// The sum of every count in the grid.
    pub fn total(&self) -> u64 {
        self.cells.iter().map(|&c| u64::from(c)).sum()
    }
}
