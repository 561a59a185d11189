// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Dynamic, pull-based row assignment.
//!
//! Rank 0 does no rendering.  It hands one row to every worker, and
//! each time a worker reports a finished row it is given the next
//! unassigned one.  Workers that finish quickly (rows that escape
//! fast) come back sooner and so end up doing more rows, which is all
//! the load balancing there is.  Once every row is back, every worker
//! is told it is done.

use comm::{Communicator, Message, Rank, COORDINATOR};
use error::Error;
use grid::{IterationGrid, WorkUnit};
use kernel::{render_unit, FractalParameters};
use numeric::Precision;
use planes::PlaneMapper;

/// Where the coordinator is in its pass.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum State {
    /// Handing each worker its first row.
    DispatchingInitial,
    /// Waiting for finished rows and handing out new ones.
    AwaitingResults,
    /// Every row is in; telling the workers to stop.
    Draining,
    /// Every worker has been told.
    Finished,
}

/// The coordinator's side of the dynamic protocol.  Owns the grid for
/// the length of the pass, and is the only thing that writes to it.
#[derive(Debug)]
pub struct Coordinator<'g> {
    grid: &'g mut IterationGrid,
    state: State,
    // The row each worker currently holds, indexed by rank.
    tracker: Vec<Option<usize>>,
    // How many rows each worker has returned, indexed by rank.
    completed: Vec<usize>,
    next_row: usize,
    received: usize,
}

impl<'g> Coordinator<'g> {
    /// A coordinator for a group of `size` ranks, rank 0 included,
    /// that will fill `grid`.
    pub fn new(grid: &'g mut IterationGrid, size: usize) -> Self {
        Coordinator {
            grid,
            state: State::DispatchingInitial,
            tracker: vec![None; size],
            completed: vec![0; size],
            next_row: 0,
            received: 0,
        }
    }

    /// Where the pass is.
    pub fn state(&self) -> State {
        self.state
    }

    /// How many rows each rank returned.  Rank 0 is always zero.
    pub fn completed(&self) -> &[usize] {
        &self.completed
    }

    /// How many rows have been written into the grid.
    pub fn received(&self) -> usize {
        self.received
    }

    /// Run the whole pass, from the first assignment to the last
    /// `DONE`.
    pub fn run<C: Communicator>(&mut self, comm: &mut C) -> Result<(), Error> {
        let height = self.grid.height();
        info!(
            "coordinator: {} rows across {} workers",
            height,
            comm.size() - 1
        );

        for worker in 1..comm.size() {
            self.assign_next(comm, worker)?;
        }
        self.state = State::AwaitingResults;
        if height == 0 {
            self.state = State::Draining;
        }

        while self.state == State::AwaitingResults {
            let (source, message) = comm.receive_any()?;
            match message {
                Message::Result { row, iterations } => {
                    self.record(comm, source, row, &iterations)?
                }
                other => {
                    return Err(Error::Protocol {
                        source,
                        expected: "RESULT",
                        got: other.kind().to_string(),
                    })
                }
            }
        }

        for worker in 1..comm.size() {
            comm.send(worker, Message::Done)?;
        }
        self.state = State::Finished;

        for (worker, rows) in self.completed.iter().enumerate().skip(1) {
            info!("rows completed on rank {}: {}", worker, rows);
        }
        Ok(())
    }

    // Give `worker` the next row, if there is one.  A worker with no
    // row simply waits for DONE.
    fn assign_next<C: Communicator>(&mut self, comm: &mut C, worker: Rank) -> Result<(), Error> {
        if self.next_row >= self.grid.height() {
            self.tracker[worker] = None;
            return Ok(());
        }
        comm.send(worker, Message::Assign(self.next_row))?;
        self.tracker[worker] = Some(self.next_row);
        self.next_row += 1;
        Ok(())
    }

    fn record<C: Communicator>(
        &mut self,
        comm: &mut C,
        source: Rank,
        reported: usize,
        iterations: &[u32],
    ) -> Result<(), Error> {
        let height = self.grid.height();
        let tracked = self.tracker.get(source).cloned().unwrap_or(None);
        let row = match tracked {
            Some(row) if row < height => row,
            _ => {
                warn!(
                    "ignoring row {} from rank {}: tracked row is {:?}",
                    reported, source, tracked
                );
                return Ok(());
            }
        };
        if row != reported {
            debug!("rank {} reported row {} but holds row {}", source, reported, row);
        }
        // The row would never be written, and the pass would never end.
        if iterations.len() != self.grid.width() {
            return Err(Error::Protocol {
                source,
                expected: "RESULT one row wide",
                got: format!("RESULT of {} cells", iterations.len()),
            });
        }

        self.grid.write_row(row, iterations);
        self.tracker[source] = None;
        self.completed[source] += 1;
        self.received += 1;
        debug!(
            "completed: {:.1}%",
            (self.received as f64 / height as f64) * 100.0
        );

        if self.received == height {
            self.state = State::Draining;
            Ok(())
        } else {
            self.assign_next(comm, source)
        }
    }
}

/// A worker's side of the dynamic protocol: wait for a row, render it,
/// send it back, until told to stop.  Returns the sum of this
/// worker's escape times.
pub fn work<C, P>(
    comm: &mut C,
    mapper: &PlaneMapper<P>,
    params: &FractalParameters<P::Real>,
) -> Result<u64, Error>
where
    C: Communicator,
    P: Precision,
{
    let mut total = 0;
    loop {
        match comm.receive_from(COORDINATOR)? {
            Message::Assign(row) => {
                let unit = WorkUnit::row(row, mapper.width(), mapper.height());
                let mut iterations = unit.buffer()?;
                total += render_unit(mapper, params, &unit, &mut iterations);
                comm.send(COORDINATOR, Message::Result { row, iterations })?;
            }
            Message::Done => {
                debug!("rank {} done", comm.rank());
                return Ok(total);
            }
            other => {
                return Err(Error::Protocol {
                    source: COORDINATOR,
                    expected: "ASSIGN or DONE",
                    got: other.kind().to_string(),
                })
            }
        }
    }
}
