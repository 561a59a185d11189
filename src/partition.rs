// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Static block partitioning.
//!
//! The image is cut into one contiguous band of rows per rank.  Every
//! rank gets `height / ranks` rows, and the first `height % ranks`
//! ranks get one more.  Rank 0 scatters the bands, everyone renders
//! their own, and rank 0 gathers them back: one round trip, no
//! further coordination.  Rank 0 renders its own band straight into
//! the grid, so the only other buffers are the bands in flight.

use comm::{gather, scatter, Communicator, COORDINATOR};
use error::Error;
use grid::{IterationGrid, WorkUnit};
use kernel::{render_unit, FractalParameters};
use numeric::Precision;
use planes::PlaneMapper;

/// Which rows each rank owns.
#[derive(Clone, Debug, PartialEq)]
pub struct BlockLayout {
    units: Vec<WorkUnit>,
}

impl BlockLayout {
    /// Split `height` rows of `width` pixels across `ranks` ranks.
    pub fn new(width: usize, height: usize, ranks: usize) -> Self {
        assert!(ranks > 0);
        let (base, remaining) = (height / ranks, height % ranks);
        let mut start_row = 0;
        let units = (0..ranks)
            .map(|rank| {
                let rows = if rank < remaining { base + 1 } else { base };
                let unit = WorkUnit {
                    start_row,
                    end_row: start_row + rows,
                    width,
                    height,
                };
                start_row += rows;
                unit
            })
            .collect();
        BlockLayout { units }
    }

    /// The band belonging to `rank`.
    pub fn unit(&self, rank: usize) -> &WorkUnit {
        &self.units[rank]
    }

    /// Every band, in rank order.
    pub fn units(&self) -> &[WorkUnit] {
        &self.units
    }
}

/// Render the image as one band per rank.  Rank 0 passes in the grid
/// and gets it back filled; the others pass `None`.  Returns the sum
/// of this rank's escape times.
pub fn block_partition<C, P>(
    comm: &mut C,
    mapper: &PlaneMapper<P>,
    params: &FractalParameters<P::Real>,
    grid: Option<&mut IterationGrid>,
) -> Result<u64, Error>
where
    C: Communicator,
    P: Precision,
{
    let layout = BlockLayout::new(mapper.width(), mapper.height(), comm.size());
    let rank = comm.rank();

    if rank == COORDINATOR {
        for (r, unit) in layout.units().iter().enumerate() {
            debug!(
                "rank {}: rows {}..{}, {} elements at displacement {}",
                r,
                unit.start_row,
                unit.end_row,
                unit.len(),
                unit.displacement()
            );
        }
    }

    let bands = if rank == COORDINATOR {
        Some(layout.units())
    } else {
        None
    };
    let band = scatter(comm, COORDINATOR, bands)?;

    let count = match grid {
        Some(grid) => {
            let count = render_unit(mapper, params, &band, grid.block_mut(&band));
            if let Some(blocks) = gather(comm, COORDINATOR, Vec::new())? {
                let others = layout.units().iter().zip(blocks).enumerate();
                for (source, (unit, block)) in others.filter(|&(r, _)| r != rank) {
                    if block.len() != unit.len() {
                        return Err(Error::Protocol {
                            source,
                            expected: "BLOCK the size of its band",
                            got: format!("BLOCK of {} cells", block.len()),
                        });
                    }
                    grid.write_block(unit, &block);
                }
            }
            count
        }
        None => {
            let mut block = band.buffer()?;
            let count = render_unit(mapper, params, &band, &mut block);
            gather(comm, COORDINATOR, block)?;
            count
        }
    };
    debug!("rank {} rendered rows {}..{}", rank, band.start_row, band.end_row);
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use comm::{LocalGroup, Message};
    use kernel::Mode;
    use num::Complex;
    use numeric::Fixed;
    use planes::Viewport;

    #[test]
    fn remainder_rows_go_to_the_first_ranks() {
        let layout = BlockLayout::new(5, 10, 4);
        let rows: Vec<usize> = layout.units().iter().map(WorkUnit::rows).collect();
        assert_eq!(rows, vec![3, 3, 2, 2]);
        let starts: Vec<usize> = layout.units().iter().map(|u| u.start_row).collect();
        assert_eq!(starts, vec![0, 3, 6, 8]);
        assert_eq!(layout.unit(2).displacement(), 30);
    }

    #[test]
    fn bands_cover_every_row_exactly_once() {
        for height in 0..40 {
            for ranks in 1..12 {
                let layout = BlockLayout::new(3, height, ranks);
                assert_eq!(layout.units().len(), ranks);
                let total: usize = layout.units().iter().map(WorkUnit::rows).sum();
                assert_eq!(total, height);
                let mut next = 0;
                for unit in layout.units() {
                    assert_eq!(unit.start_row, next);
                    next = unit.end_row;
                }
                assert_eq!(next, height);
                let (max, min) = (
                    layout.units().iter().map(WorkUnit::rows).max().unwrap(),
                    layout.units().iter().map(WorkUnit::rows).min().unwrap(),
                );
                assert!(max - min <= 1);
            }
        }
    }

    #[test]
    fn workers_are_sent_their_band_not_a_buffer() {
        let viewport = Viewport::new(&Fixed, 0.0, 0.0, 2.0, 2.0);
        let mapper = PlaneMapper::new(Fixed, 4, 5, viewport).unwrap();
        let params = FractalParameters {
            mode: Mode::Mandelbrot,
            c: Complex::new(0.0, 0.0),
            max_iterations: 10,
        };
        let layout = BlockLayout::new(4, 5, 2);

        let outcomes = LocalGroup::new(2)
            .run(|comm| {
                if comm.rank() == COORDINATOR {
                    let mut grid = IterationGrid::new(4, 5)?;
                    block_partition(comm, &mapper, &params, Some(&mut grid))?;
                    Ok(Some(grid))
                } else {
                    match comm.receive_from(COORDINATOR)? {
                        Message::Band(band) => assert_eq!(&band, layout.unit(1)),
                        other => panic!("expected a band, got {:?}", other),
                    }
                    comm.send(COORDINATOR, Message::Block(vec![7; 8]))?;
                    Ok(None)
                }
            })
            .unwrap();

        let grid = outcomes[0].as_ref().unwrap();
        assert_eq!(grid.row(3), &[7, 7, 7, 7]);
        assert_eq!(grid.row(4), &[7, 7, 7, 7]);
        assert_eq!(grid.get(2, 2), 10);
    }

    #[test]
    fn a_short_block_is_a_protocol_error() {
        let viewport = Viewport::new(&Fixed, 0.0, 0.0, 2.0, 2.0);
        let mapper = PlaneMapper::new(Fixed, 4, 4, viewport).unwrap();
        let params = FractalParameters {
            mode: Mode::Mandelbrot,
            c: Complex::new(0.0, 0.0),
            max_iterations: 10,
        };
        let outcome = LocalGroup::new(2).run(|comm| {
            if comm.rank() == COORDINATOR {
                let mut grid = IterationGrid::new(4, 4)?;
                block_partition(comm, &mapper, &params, Some(&mut grid))
            } else {
                comm.receive_from(COORDINATOR)?;
                comm.send(COORDINATOR, Message::Block(vec![1, 2, 3]))?;
                Ok(0)
            }
        });
        match outcome {
            Err(Error::Protocol { source, .. }) => assert_eq!(source, 1),
            other => panic!("expected a protocol error, got {:?}", other),
        }
    }

    #[test]
    fn two_bands_reassemble_the_serial_image() {
        let viewport = Viewport::new(&Fixed, -0.5, 0.0, 1.5, 1.25);
        let mapper = PlaneMapper::new(Fixed, 13, 7, viewport).unwrap();
        let params = FractalParameters {
            mode: Mode::Julia,
            c: Complex::new(-0.4, 0.6),
            max_iterations: 80,
        };

        let whole = WorkUnit::whole(13, 7);
        let mut serial = whole.buffer().unwrap();
        let serial_count = render_unit(&mapper, &params, &whole, &mut serial);

        let outcomes = LocalGroup::new(2)
            .run(|comm| {
                if comm.rank() == COORDINATOR {
                    let mut grid = IterationGrid::new(13, 7)?;
                    let count = block_partition(comm, &mapper, &params, Some(&mut grid))?;
                    Ok((count, Some(grid)))
                } else {
                    let count = block_partition(comm, &mapper, &params, None)?;
                    Ok((count, None))
                }
            })
            .unwrap();

        let grid = outcomes[0].1.as_ref().unwrap();
        assert_eq!(grid.cells(), &serial[..]);
        assert_eq!(outcomes[0].0 + outcomes[1].0, serial_count);
    }
}
