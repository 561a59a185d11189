// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Message passing between ranks.
//!
//! The engine only ever sees a `Communicator`: its own rank, the size
//! of the group, and blocking send and receive.  The collectives the
//! static partitioner and the run bookkeeping need (scatter, gather,
//! reduce, barrier) are written once on top of that.  `LocalGroup`
//! is the bootstrap that ships with the crate: one scoped thread per
//! rank, and one channel inbox per rank.  The ranks share nothing
//! else.

use crossbeam;
use crossbeam::channel::{unbounded, Receiver, Select, Sender};
use error::Error;
use grid::WorkUnit;
use std::collections::VecDeque;
use std::time::Duration;

/// The identity of one member of the group.
pub type Rank = usize;

/// The rank that owns the assembled grid, gathers the blocks, and runs
/// the dynamic coordinator.
pub const COORDINATOR: Rank = 0;

/// Everything ranks say to each other.
#[derive(Clone, Debug, PartialEq)]
pub enum Message {
    /// Coordinator to worker: compute this row.
    Assign(usize),
    /// Worker to coordinator: the row you gave me, finished.
    Result {
        /// The row the worker believes it computed.
        row: usize,
        /// Its escape times, `width` of them.
        iterations: Vec<u32>,
    },
    /// Coordinator to worker: there is nothing left to compute.
    Done,
    /// Rank 0 to everyone: the grid is in place (`None`), or the
    /// number of cells that could not be allocated.
    Ready(Option<usize>),
    /// The band of rows a rank is to render, from a scatter.
    Band(WorkUnit),
    /// One rank's rendered band, for a gather.
    Block(Vec<u32>),
    /// One rank's contribution to a sum.
    Count(u64),
    /// One rank's contribution to a maximum of wall-clock times.
    Elapsed(Duration),
    /// A barrier arrival or release.
    Barrier,
}

impl Message {
    /// A short name for logs and protocol errors.
    pub fn kind(&self) -> &'static str {
        match *self {
            Message::Assign(_) => "ASSIGN",
            Message::Result { .. } => "RESULT",
            Message::Done => "DONE",
            Message::Ready(_) => "READY",
            Message::Band(_) => "BAND",
            Message::Block(_) => "BLOCK",
            Message::Count(_) => "COUNT",
            Message::Elapsed(_) => "ELAPSED",
            Message::Barrier => "BARRIER",
        }
    }

    fn unexpected(self, source: Rank, expected: &'static str) -> Error {
        Error::Protocol {
            source,
            expected,
            got: self.kind().to_string(),
        }
    }
}

/// The channel abstraction a process group provides.  Sends and
/// receives block until they can be matched; nothing times out.
pub trait Communicator {
    /// This member's rank, `0..size()`.
    fn rank(&self) -> Rank;

    /// The number of members in the group.
    fn size(&self) -> usize;

    /// Send a message to `dest`.
    fn send(&mut self, dest: Rank, message: Message) -> Result<(), Error>;

    /// Wait for the next message from `source`.  Messages from other
    /// ranks that arrive meanwhile are kept for later.
    fn receive_from(&mut self, source: Rank) -> Result<Message, Error>;

    /// Wait for the next message from anyone, and say who sent it.
    fn receive_any(&mut self) -> Result<(Rank, Message), Error>;
}

/// Hand `bands[r]` to rank `r` and return this rank's own band.  Only
/// `root` supplies `bands`, one per rank.
pub fn scatter<C: Communicator>(
    comm: &mut C,
    root: Rank,
    bands: Option<&[WorkUnit]>,
) -> Result<WorkUnit, Error> {
    if comm.rank() != root {
        return match comm.receive_from(root)? {
            Message::Band(band) => Ok(band),
            other => Err(other.unexpected(root, "BAND")),
        };
    }

    let bands = bands.unwrap_or(&[]);
    assert!(bands.len() == comm.size());
    for (rank, band) in bands.iter().enumerate().filter(|&(r, _)| r != root) {
        comm.send(rank, Message::Band(*band))?;
    }
    Ok(bands[root])
}

/// Tell every rank whether `root` got its grid.  `failed` is the cell
/// count `root` could not allocate, and is only read on `root`.  If
/// there was a failure every rank returns it, so nobody is left
/// waiting on a root that has gone.
pub fn share_allocation<C: Communicator>(
    comm: &mut C,
    root: Rank,
    failed: Option<usize>,
) -> Result<(), Error> {
    let failed = if comm.rank() == root {
        for rank in (0..comm.size()).filter(|&r| r != root) {
            comm.send(rank, Message::Ready(failed))?;
        }
        failed
    } else {
        match comm.receive_from(root)? {
            Message::Ready(failed) => failed,
            other => return Err(other.unexpected(root, "READY")),
        }
    };
    match failed {
        Some(cells) => Err(Error::Allocation(cells)),
        None => Ok(()),
    }
}

/// Collect every rank's block on `root`, in rank order.  Other ranks
/// get `None`.
pub fn gather<C: Communicator>(
    comm: &mut C,
    root: Rank,
    block: Vec<u32>,
) -> Result<Option<Vec<Vec<u32>>>, Error> {
    if comm.rank() != root {
        comm.send(root, Message::Block(block))?;
        return Ok(None);
    }

    let mut blocks = Vec::with_capacity(comm.size());
    let mut own = Some(block);
    for rank in 0..comm.size() {
        if rank == root {
            blocks.push(own.take().unwrap_or_default());
            continue;
        }
        match comm.receive_from(rank)? {
            Message::Block(block) => blocks.push(block),
            other => return Err(other.unexpected(rank, "BLOCK")),
        }
    }
    Ok(Some(blocks))
}

/// Sum every rank's `value` on `root`.
pub fn reduce_sum<C: Communicator>(comm: &mut C, root: Rank, value: u64) -> Result<Option<u64>, Error> {
    if comm.rank() != root {
        comm.send(root, Message::Count(value))?;
        return Ok(None);
    }
    let mut total = value;
    for rank in (0..comm.size()).filter(|&r| r != root) {
        match comm.receive_from(rank)? {
            Message::Count(v) => total += v,
            other => return Err(other.unexpected(rank, "COUNT")),
        }
    }
    Ok(Some(total))
}

/// The longest of every rank's `elapsed`, on `root`.
pub fn reduce_max_elapsed<C: Communicator>(
    comm: &mut C,
    root: Rank,
    elapsed: Duration,
) -> Result<Option<Duration>, Error> {
    if comm.rank() != root {
        comm.send(root, Message::Elapsed(elapsed))?;
        return Ok(None);
    }
    let mut longest = elapsed;
    for rank in (0..comm.size()).filter(|&r| r != root) {
        match comm.receive_from(rank)? {
            Message::Elapsed(e) => longest = longest.max(e),
            other => return Err(other.unexpected(rank, "ELAPSED")),
        }
    }
    Ok(Some(longest))
}

/// Block until every rank has arrived.
pub fn barrier<C: Communicator>(comm: &mut C) -> Result<(), Error> {
    if comm.rank() != COORDINATOR {
        comm.send(COORDINATOR, Message::Barrier)?;
        return match comm.receive_from(COORDINATOR)? {
            Message::Barrier => Ok(()),
            other => Err(other.unexpected(COORDINATOR, "BARRIER")),
        };
    }
    for rank in 1..comm.size() {
        match comm.receive_from(rank)? {
            Message::Barrier => {}
            other => return Err(other.unexpected(rank, "BARRIER")),
        }
    }
    for rank in 1..comm.size() {
        comm.send(rank, Message::Barrier)?;
    }
    Ok(())
}

#[derive(Debug)]
struct Envelope {
    source: Rank,
    message: Message,
}

/// One member of a `LocalGroup`.
#[derive(Debug)]
pub struct LocalComm {
    rank: Rank,
    // Every other rank's inbox.  There is no sender to our own, so the
    // inbox disconnects once every peer has gone.
    outboxes: Vec<Option<Sender<Envelope>>>,
    inbox: Receiver<Envelope>,
    // Arrived, but not yet asked for by `receive_from`.
    pending: VecDeque<Envelope>,
    // Shared by the whole group.  A rank that fails posts one token
    // per member, and anyone still waiting takes one and gives up.
    alarm: Sender<()>,
    alarmed: Receiver<()>,
}

impl LocalComm {
    // The next envelope off the inbox, unless the inbox has
    // disconnected or another rank has failed.
    fn next(&self, waiting_on: Rank) -> Result<Envelope, Error> {
        let mut select = Select::new();
        let inbox = select.recv(&self.inbox);
        select.recv(&self.alarmed);
        let operation = select.select();
        if operation.index() == inbox {
            operation
                .recv(&self.inbox)
                .map_err(|_| Error::Disconnected(waiting_on))
        } else {
            let _ = operation.recv(&self.alarmed);
            Err(Error::Disconnected(waiting_on))
        }
    }
}

// Sounds the group's alarm if the rank it watches leaves without
// succeeding, panics included.
struct HangUp {
    alarm: Sender<()>,
    size: usize,
    armed: bool,
}

impl Drop for HangUp {
    fn drop(&mut self) {
        if self.armed {
            for _ in 0..self.size {
                let _ = self.alarm.send(());
            }
        }
    }
}

impl Communicator for LocalComm {
    fn rank(&self) -> Rank {
        self.rank
    }

    fn size(&self) -> usize {
        self.outboxes.len()
    }

    fn send(&mut self, dest: Rank, message: Message) -> Result<(), Error> {
        let envelope = Envelope {
            source: self.rank,
            message,
        };
        match self.outboxes.get(dest) {
            Some(&Some(ref outbox)) => outbox.send(envelope).map_err(|_| Error::Disconnected(dest)),
            _ => Err(Error::Disconnected(dest)),
        }
    }

    fn receive_from(&mut self, source: Rank) -> Result<Message, Error> {
        if let Some(index) = self.pending.iter().position(|e| e.source == source) {
            if let Some(envelope) = self.pending.remove(index) {
                return Ok(envelope.message);
            }
        }
        loop {
            let envelope = self.next(source)?;
            if envelope.source == source {
                return Ok(envelope.message);
            }
            self.pending.push_back(envelope);
        }
    }

    fn receive_any(&mut self) -> Result<(Rank, Message), Error> {
        let envelope = match self.pending.pop_front() {
            Some(envelope) => envelope,
            None => self.next(self.rank)?,
        };
        Ok((envelope.source, envelope.message))
    }
}

/// An in-process group of ranks wired together with channels.
pub struct LocalGroup {
    members: Vec<LocalComm>,
}

impl LocalGroup {
    /// Create `size` connected members.
    pub fn new(size: usize) -> Self {
        let (outboxes, inboxes): (Vec<_>, Vec<_>) = (0..size).map(|_| unbounded()).unzip();
        let (alarm, alarmed) = unbounded();
        let members = inboxes
            .into_iter()
            .enumerate()
            .map(|(rank, inbox)| LocalComm {
                rank,
                outboxes: outboxes
                    .iter()
                    .enumerate()
                    .map(|(dest, outbox)| if dest == rank { None } else { Some(outbox.clone()) })
                    .collect(),
                inbox,
                pending: VecDeque::new(),
                alarm: alarm.clone(),
                alarmed: alarmed.clone(),
            })
            .collect();
        LocalGroup { members }
    }

    /// Hand the members out individually, in rank order.
    pub fn into_members(self) -> Vec<LocalComm> {
        self.members
    }

    /// Run `task` once per rank, each on its own thread with its own
    /// communicator, and return what every rank returned, in rank
    /// order.  When a rank fails, the ranks still waiting on a message
    /// give up with `Disconnected`; the error returned is the first
    /// one that isn't that.
    pub fn run<T, F>(self, task: F) -> Result<Vec<T>, Error>
    where
        T: Send,
        F: Fn(&mut LocalComm) -> Result<T, Error> + Sync,
    {
        let task = &task;
        let outcomes = crossbeam::scope(|spawner| {
            let handles: Vec<_> = self
                .members
                .into_iter()
                .map(|mut comm| {
                    let mut hang_up = HangUp {
                        alarm: comm.alarm.clone(),
                        size: comm.size(),
                        armed: true,
                    };
                    spawner.spawn(move |_| {
                        let outcome = task(&mut comm);
                        hang_up.armed = outcome.is_err();
                        outcome
                    })
                })
                .collect();
            handles
                .into_iter()
                .enumerate()
                .map(|(rank, handle)| handle.join().unwrap_or(Err(Error::Panicked(rank))))
                .collect::<Vec<_>>()
        })
        .map_err(|_| Error::Panicked(COORDINATOR))?;

        let mut values = Vec::with_capacity(outcomes.len());
        let mut hung_up = None;
        for outcome in outcomes {
            match outcome {
                Ok(value) => values.push(value),
                Err(Error::Disconnected(rank)) => {
                    if hung_up.is_none() {
                        hung_up = Some(Error::Disconnected(rank));
                    }
                }
                Err(err) => return Err(err),
            }
        }
        match hung_up {
            Some(err) => Err(err),
            None => Ok(values),
        }
    }
}
