// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The one error type shared by the engine, the collectives, and the
//! parameter reader.

use comm::Rank;
use std::io;

/// Everything that can stop a render.  None of these are retried; the
/// caller is expected to abort the run and report the message.
#[derive(Debug, Fail)]
pub enum Error {
    /// The iteration grid (or a block of it) could not be allocated.
    #[fail(display = "could not allocate {} cells for the iteration grid", _0)]
    Allocation(usize),

    /// A value in the parameter source could not be read as the type
    /// the field requires.
    #[fail(display = "could not parse {} from {:?}", field, value)]
    Parse {
        /// The name of the field being read.
        field: &'static str,
        /// The offending text.
        value: String,
    },

    /// The mode flag was neither 0 (Mandelbrot) nor 1 (Julia).
    #[fail(display = "unknown fractal mode flag {}", _0)]
    Mode(i64),

    /// A rank hung up its channel before the protocol was finished.
    #[fail(display = "rank {} is unreachable", _0)]
    Disconnected(Rank),

    /// A message arrived that the current protocol step cannot use.
    #[fail(display = "rank {} sent {} while {} was expected", source, got, expected)]
    Protocol {
        /// The rank that sent the message.
        source: Rank,
        /// What the receiver was waiting for.
        expected: &'static str,
        /// A short description of what it received instead.
        got: String,
    },

    /// A rank's thread panicked.
    #[fail(display = "rank {} panicked", _0)]
    Panicked(Rank),

    /// Reading the parameter file or writing the image failed.
    #[fail(display = "{}", _0)]
    Io(#[cause] io::Error),
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(err)
    }
}
