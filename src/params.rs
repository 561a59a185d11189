// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The parameter file: one value per line, in a fixed order.
//!
//! ```text
//! 0                 mode flag: 0 Mandelbrot, 1 Julia
//! -0.8              c, real part
//! 0.156             c, imaginary part
//! -0.5              center, real part
//! 0                 center, imaginary part
//! 1.5               radius along the real axis
//! 1.5               radius along the imaginary axis
//! 600               image height
//! 800               image width
//! 1000              maximum iterations
//! julia.bmp         output file
//! ```
//!
//! The real-valued lines are kept as text until a backend is chosen,
//! so that an arbitrary-precision run reads every digit written.  A
//! file that stops early leaves the remaining fields at their
//! defaults.

use error::Error;
use kernel::{FractalParameters, Mode};
use num::Complex;
use numeric::Precision;
use planes::{PlaneMapper, Viewport};
use std::fs;
use std::path::Path;
use std::str::FromStr;
use strategy::Job;

/// The raw contents of a parameter file.
#[derive(Clone, Debug, PartialEq)]
pub struct ParameterFile {
    /// 0 for Mandelbrot, 1 for Julia.
    pub flag: i64,
    /// Real part of the Julia constant, as written.
    pub c_real: String,
    /// Imaginary part of the Julia constant, as written.
    pub c_imag: String,
    /// Real part of the viewport center, as written.
    pub x: String,
    /// Imaginary part of the viewport center, as written.
    pub y: String,
    /// Real-axis radius, as written.
    pub xr: String,
    /// Imaginary-axis radius, as written.
    pub yr: String,
    /// Image height in pixels.
    pub height: usize,
    /// Image width in pixels.
    pub width: usize,
    /// Iteration cap.
    pub max_iterations: u32,
    /// Where the image goes.
    pub output: String,
}

impl Default for ParameterFile {
    fn default() -> Self {
        ParameterFile {
            flag: 0,
            c_real: "0".to_string(),
            c_imag: "0".to_string(),
            x: "0".to_string(),
            y: "0".to_string(),
            xr: "1".to_string(),
            yr: "1".to_string(),
            height: 0,
            width: 0,
            max_iterations: 0,
            output: "julia.bmp".to_string(),
        }
    }
}

const FIELDS: [&str; 11] = [
    "mode flag",
    "c real",
    "c imaginary",
    "center x",
    "center y",
    "radius x",
    "radius y",
    "height",
    "width",
    "max iterations",
    "output",
];

fn number<T: FromStr>(field: &'static str, text: &str) -> Result<T, Error> {
    text.trim().parse::<T>().map_err(|_| Error::Parse {
        field,
        value: text.trim().to_string(),
    })
}

impl ParameterFile {
    /// Read the file at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let text = fs::read_to_string(path)?;
        text.parse()
    }

    /// Build a job for `precision` out of these parameters.
    pub fn job<P: Precision>(&self, precision: P) -> Result<Job<P>, Error> {
        let p = &precision;
        let viewport = Viewport::new(
            p,
            p.parse(FIELDS[3], &self.x)?,
            p.parse(FIELDS[4], &self.y)?,
            p.parse(FIELDS[5], &self.xr)?,
            p.parse(FIELDS[6], &self.yr)?,
        );
        let params = FractalParameters {
            mode: Mode::from_flag(self.flag)?,
            c: Complex::new(p.parse(FIELDS[1], &self.c_real)?, p.parse(FIELDS[2], &self.c_imag)?),
            max_iterations: self.max_iterations,
        };
        let mapper = PlaneMapper::new(precision.clone(), self.width, self.height, viewport)?;
        Ok(Job { mapper, params })
    }
}

impl FromStr for ParameterFile {
    type Err = Error;

    fn from_str(text: &str) -> Result<Self, Error> {
        let mut params = ParameterFile::default();
        let mut lines = text.lines();
        for (index, &field) in FIELDS.iter().enumerate() {
            let line = match lines.next() {
                Some(line) => line.trim(),
                None => {
                    warn!("parameter file has no {}; using the default", field);
                    continue;
                }
            };
            match index {
                0 => params.flag = number(field, line)?,
                1 => params.c_real = line.to_string(),
                2 => params.c_imag = line.to_string(),
                3 => params.x = line.to_string(),
                4 => params.y = line.to_string(),
                5 => params.xr = line.to_string(),
                6 => params.yr = line.to_string(),
                7 => params.height = number(field, line)?,
                8 => params.width = number(field, line)?,
                9 => params.max_iterations = number(field, line)?,
                _ => {
                    if let Some(name) = line.split_whitespace().next() {
                        params.output = name.to_string();
                    }
                }
            }
        }
        Ok(params)
    }
}
