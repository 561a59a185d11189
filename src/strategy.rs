// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Picks how the image is split up, runs it, and times it.

use comm::{barrier, reduce_max_elapsed, reduce_sum, share_allocation, Communicator, COORDINATOR};
use coordinator::{work, Coordinator};
use error::Error;
use grid::{IterationGrid, WorkUnit};
use kernel::{render_unit, FractalParameters};
use numeric::Precision;
use partition::block_partition;
use planes::PlaneMapper;
use std::fmt;
use std::time::{Duration, Instant};

/// How the rows of the image are distributed.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Strategy {
    /// One rank renders everything.
    Serial,
    /// Each rank renders one contiguous band.
    StaticBlock,
    /// Rank 0 hands out single rows to whoever is idle.
    DynamicCoordinator,
}

impl Strategy {
    /// Two ranks split the image down the middle; any more and it is
    /// worth giving one of them up to coordination.
    pub fn select(size: usize) -> Strategy {
        match size {
            0 | 1 => Strategy::Serial,
            2 => Strategy::StaticBlock,
            _ => Strategy::DynamicCoordinator,
        }
    }
}

/// Everything a rank needs to render: the geometry and the fractal.
/// Every rank holds its own copy.
#[derive(Clone, Debug)]
pub struct Job<P: Precision> {
    /// Image size and viewport.
    pub mapper: PlaneMapper<P>,
    /// Mode, constant, and iteration cap.
    pub params: FractalParameters<P::Real>,
}

/// What rank 0 reports about a run.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Benchmark {
    /// The number of ranks that took part.
    pub workers: usize,
    /// The longest wall-clock time any rank spent rendering.
    pub elapsed: Duration,
    /// Every escape time in the image, summed.
    pub total_iterations: u64,
}

impl fmt::Display for Benchmark {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let seconds = self.elapsed.as_secs() as f64 + f64::from(self.elapsed.subsec_nanos()) * 1e-9;
        write!(f, "{}  {:.6}  {}", self.workers, seconds, self.total_iterations)
    }
}

/// The finished product, on rank 0.
#[derive(Clone, Debug)]
pub struct Rendering {
    /// The assembled grid.
    pub grid: IterationGrid,
    /// How long it took, and how much work it was.
    pub benchmark: Benchmark,
}

fn describe<P: Precision>(size: usize, strategy: Strategy, job: &Job<P>) {
    let (mapper, params) = (&job.mapper, &job.params);
    let v = mapper.viewport();
    info!(
        "{} ranks, {:?}, {}x{} pixels, {} iterations at most",
        size,
        strategy,
        mapper.width(),
        mapper.height(),
        params.max_iterations
    );
    info!(
        "flag {} ({:?}), c = {:?} + {:?}i",
        params.mode.flag(),
        params.mode,
        params.c.re,
        params.c.im
    );
    info!(
        "center ({:?}, {:?}), radii ({:?}, {:?})",
        v.x(),
        v.y(),
        v.xr(),
        v.yr()
    );
    debug!(
        "x from {:?} to {:?}, y from {:?} to {:?}",
        v.xmin(),
        v.xmax(),
        v.ymin(),
        v.ymax()
    );
}

/// Render `job` across the group.  Every rank calls this; rank 0 gets
/// the assembled image back and everybody else gets `None`.
pub fn render<C, P>(comm: &mut C, job: &Job<P>) -> Result<Option<Rendering>, Error>
where
    C: Communicator,
    P: Precision,
{
    let rank = comm.rank();
    let strategy = Strategy::select(comm.size());
    let allocated = if rank == COORDINATOR {
        describe(comm.size(), strategy, job);
        Some(IterationGrid::new(job.mapper.width(), job.mapper.height()))
    } else {
        None
    };

    // Nobody starts until rank 0 knows it has somewhere to put the
    // answer.
    let failed = match allocated {
        Some(Err(Error::Allocation(cells))) => Some(cells),
        _ => None,
    };
    share_allocation(comm, COORDINATOR, failed)?;
    let mut grid = match allocated {
        Some(grid) => Some(grid?),
        None => None,
    };

    debug!("rank {} waiting for the others", rank);
    barrier(comm)?;
    let start = Instant::now();

    let count = match strategy {
        Strategy::Serial => match grid {
            Some(ref mut grid) => {
                let unit = WorkUnit::whole(job.mapper.width(), job.mapper.height());
                render_unit(&job.mapper, &job.params, &unit, grid.block_mut(&unit))
            }
            None => 0,
        },
        Strategy::StaticBlock => block_partition(comm, &job.mapper, &job.params, grid.as_mut())?,
        Strategy::DynamicCoordinator => match grid {
            Some(ref mut grid) => {
                Coordinator::new(grid, comm.size()).run(comm)?;
                0
            }
            None => work(comm, &job.mapper, &job.params)?,
        },
    };

    let elapsed = start.elapsed();
    debug!("rank {} finished in {:?}", rank, elapsed);
    barrier(comm)?;

    let total = reduce_sum(comm, COORDINATOR, count)?;
    let longest = reduce_max_elapsed(comm, COORDINATOR, elapsed)?;

    Ok(match (grid, total, longest) {
        (Some(grid), Some(total_iterations), Some(elapsed)) => Some(Rendering {
            grid,
            benchmark: Benchmark {
                workers: comm.size(),
                elapsed,
                total_iterations,
            },
        }),
        _ => None,
    })
}
