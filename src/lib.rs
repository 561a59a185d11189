#![deny(missing_docs)]
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Distributed Mandelbrot and Julia set renderer
//!
//! Every pixel of the image is a point on the complex plane.  Square
//! it and add a constant, over and over, and either the result flies
//! off to infinity or it doesn't.  How many steps it takes to leave
//! the disk of radius 2 is that pixel's escape time, and the grid of
//! escape times is the picture.
//!
//! Every pixel is independent of every other, so the work splits
//! cleanly across a group of ranks that talk only by message passing.
//! How it is split depends on how many there are: one rank renders
//! the whole thing, two ranks each take half the rows in a single
//! scatter and gather, and any more than that turns rank 0 into a
//! coordinator handing out one row at a time to whichever rank is
//! idle.  The arithmetic can be plain `f64`, or arbitrary precision for
//! zooms deep enough that neighbouring pixels are the same `f64`; the
//! distribution doesn't care which.

extern crate crossbeam;
#[macro_use]
extern crate failure;
extern crate itertools;
#[macro_use]
extern crate log;
extern crate num;
extern crate rug;

#[cfg(test)]
extern crate rand;
#[cfg(test)]
extern crate tempfile;

pub mod comm;
pub mod coordinator;
pub mod error;
pub mod grid;
pub mod kernel;
pub mod numeric;
pub mod params;
pub mod partition;
pub mod planes;
pub mod strategy;

pub use comm::{Communicator, LocalGroup};
pub use error::Error;
pub use grid::IterationGrid;
pub use kernel::{iterate, FractalParameters, Mode};
pub use numeric::{Arbitrary, Fixed, Precision};
pub use params::ParameterFile;
pub use planes::{PlaneMapper, Viewport};
pub use strategy::{render, Benchmark, Job, Rendering, Strategy};
