// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The escape-time kernel.
//!
//! Both the Mandelbrot and the Julia sets come out of the same loop:
//! start the orbit at the pixel's point, and repeatedly square it and
//! add a constant until it either leaves the disk of radius 2 or the
//! iteration cap is hit.  The only difference between the two is
//! which constant gets added.  For the Mandelbrot set it is the
//! pixel's own point; for a Julia set it is the fixed parameter `c`
//! that picks which Julia set is drawn.

use error::Error;
use grid::WorkUnit;
use itertools::iproduct;
use num::Complex;
use numeric::Precision;
use planes::{Pixel, PlaneMapper};

// |z|^2 at which an orbit counts as escaped.
const ESCAPE_RADIUS_SQR: f64 = 4.0;

/// Which set is being drawn.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Mode {
    /// Each pixel adds its own point at every step.
    Mandelbrot,
    /// Every pixel adds the run's constant `c` at every step.
    Julia,
}

impl Mode {
    /// Read the parameter source's mode flag: 0 is Mandelbrot, 1 is
    /// Julia.
    pub fn from_flag(flag: i64) -> Result<Mode, Error> {
        match flag {
            0 => Ok(Mode::Mandelbrot),
            1 => Ok(Mode::Julia),
            other => Err(Error::Mode(other)),
        }
    }

    /// The inverse of `from_flag`.
    pub fn flag(self) -> i64 {
        match self {
            Mode::Mandelbrot => 0,
            Mode::Julia => 1,
        }
    }
}

/// Everything about the fractal that is not geometry.  Fixed for the
/// whole run.
#[derive(Clone, Debug)]
pub struct FractalParameters<R> {
    /// Mandelbrot or Julia.
    pub mode: Mode,
    /// The Julia constant.  Ignored in Mandelbrot mode.
    pub c: Complex<R>,
    /// The iteration cap.
    pub max_iterations: u32,
}

/// Iterate `z <- z^2 + step` from `z`, and return how many steps it
/// took for `|z|^2` to reach 4, or `limit` if it never did.  A point
/// that starts outside the disk returns 0.
pub fn escape_time<P: Precision>(
    precision: &P,
    z: Complex<P::Real>,
    step: &Complex<P::Real>,
    limit: u32,
) -> u32 {
    let p = precision;
    let (mut re, mut im) = (z.re, z.im);
    let mut re2 = p.mul(&re, &re);
    let mut im2 = p.mul(&im, &im);
    let mut iteration = 0;
    while iteration < limit && !p.at_least(&p.add(&re2, &im2), ESCAPE_RADIUS_SQR) {
        // (a + bi)^2 = (a^2 - b^2) + 2abi
        let ab = p.mul(&re, &im);
        im = p.add(&p.add(&ab, &ab), &step.im);
        re = p.add(&p.sub(&re2, &im2), &step.re);
        re2 = p.mul(&re, &re);
        im2 = p.mul(&im, &im);
        iteration += 1;
    }
    iteration
}

/// The escape time of a single point under `params`.
pub fn iterate<P: Precision>(
    precision: &P,
    point: &Complex<P::Real>,
    params: &FractalParameters<P::Real>,
) -> u32 {
    match params.mode {
        Mode::Mandelbrot => escape_time(precision, point.clone(), point, params.max_iterations),
        Mode::Julia => escape_time(precision, point.clone(), &params.c, params.max_iterations),
    }
}

/// Fill `block` with the escape times of every pixel in `unit`, and
/// return the sum of those escape times.  `block` is the unit's rows,
/// row-major, starting at the unit's first row.
pub fn render_unit<P: Precision>(
    mapper: &PlaneMapper<P>,
    params: &FractalParameters<P::Real>,
    unit: &WorkUnit,
    block: &mut [u32],
) -> u64 {
    assert!(block.len() == unit.len());
    let origin = Pixel(0, unit.start_row);
    let precision = mapper.precision();
    let limit = params.max_iterations;
    let pixels = iproduct!(0..unit.rows(), 0..unit.width);

    let mut total = 0;
    match params.mode {
        Mode::Mandelbrot => {
            for ((row, column), cell) in pixels.zip(block.iter_mut()) {
                let point = mapper.pixel_to_point(Pixel(column, row), origin);
                *cell = escape_time(precision, point.clone(), &point, limit);
                total += u64::from(*cell);
            }
        }
        Mode::Julia => {
            for ((row, column), cell) in pixels.zip(block.iter_mut()) {
                let point = mapper.pixel_to_point(Pixel(column, row), origin);
                *cell = escape_time(precision, point, &params.c, limit);
                total += u64::from(*cell);
            }
        }
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use numeric::{Arbitrary, Fixed};
    use planes::Viewport;
    use rand::distributions::{Distribution, Uniform};
    use rand::thread_rng;

    fn mandelbrot(max_iterations: u32) -> FractalParameters<f64> {
        FractalParameters {
            mode: Mode::Mandelbrot,
            c: Complex::new(0.0, 0.0),
            max_iterations,
        }
    }

    fn classic(size: usize) -> PlaneMapper<Fixed> {
        let v = Viewport::new(&Fixed, -0.5, 0.0, 1.5, 1.5);
        PlaneMapper::new(Fixed, size, size, v).unwrap()
    }

    #[test]
    fn mode_flags() {
        assert_eq!(Mode::from_flag(0).unwrap(), Mode::Mandelbrot);
        assert_eq!(Mode::from_flag(1).unwrap(), Mode::Julia);
        assert!(Mode::from_flag(2).is_err());
        assert_eq!(Mode::Julia.flag(), 1);
    }

    #[test]
    fn zero_cap_means_zero_everywhere() {
        let params = mandelbrot(0);
        for &(re, im) in &[(0.0, 0.0), (-2.0, -1.5), (0.3, 0.5), (10.0, 10.0)] {
            assert_eq!(iterate(&Fixed, &Complex::new(re, im), &params), 0);
        }
    }

    #[test]
    fn origin_never_escapes() {
        let params = mandelbrot(500);
        assert_eq!(iterate(&Fixed, &Complex::new(0.0, 0.0), &params), 500);
        let julia = FractalParameters {
            mode: Mode::Julia,
            ..params
        };
        assert_eq!(iterate(&Fixed, &Complex::new(0.0, 0.0), &julia), 500);
    }

    #[test]
    fn known_escape_times() {
        let params = mandelbrot(50);
        // Starts outside the disk.
        assert_eq!(iterate(&Fixed, &Complex::new(-2.0, -1.5), &params), 0);
        // 1 -> 2
        assert_eq!(iterate(&Fixed, &Complex::new(1.0, 0.0), &params), 1);
        // -2 -> 2 -> 2 -> ... sits on the boundary.
        assert_eq!(iterate(&Fixed, &Complex::new(-2.0, 0.0), &params), 0);
        // -1 -> 0 -> -1 -> 0, a cycle.
        assert_eq!(iterate(&Fixed, &Complex::new(-1.0, 0.0), &params), 50);
    }

    #[test]
    fn julia_adds_the_constant_not_the_point() {
        let julia = FractalParameters {
            mode: Mode::Julia,
            c: Complex::new(1.0, 0.0),
            max_iterations: 50,
        };
        // 0 -> 1 -> 2
        assert_eq!(iterate(&Fixed, &Complex::new(0.0, 0.0), &julia), 2);
        // The same point in Mandelbrot mode never moves.
        assert_eq!(iterate(&Fixed, &Complex::new(0.0, 0.0), &mandelbrot(50)), 50);
    }

    #[test]
    fn classic_four_by_four() {
        let mapper = classic(4);
        let unit = WorkUnit::whole(4, 4);
        let mut block = unit.buffer().unwrap();
        let total = render_unit(&mapper, &mandelbrot(50), &unit, &mut block);
        // Pixel (0, 0) is -2 - 1.5i.
        assert!(block[0] <= 2);
        // Pixel (2, 2) is -0.5 + 0i, inside the main cardioid.
        assert_eq!(block[2 * 4 + 2], 50);
        assert_eq!(total, block.iter().map(|&c| u64::from(c)).sum::<u64>());
    }

    #[test]
    fn iterate_is_deterministic() {
        let range = Uniform::new(-2.0_f64, 2.0);
        let mut rng = thread_rng();
        for _ in 0..200 {
            let point = Complex::new(range.sample(&mut rng), range.sample(&mut rng));
            let mandel = mandelbrot(256);
            let julia = FractalParameters {
                mode: Mode::Julia,
                c: Complex::new(-0.8, 0.156),
                max_iterations: 256,
            };
            assert_eq!(iterate(&Fixed, &point, &mandel), iterate(&Fixed, &point, &mandel));
            assert_eq!(iterate(&Fixed, &point, &julia), iterate(&Fixed, &point, &julia));
        }
    }

    #[test]
    fn block_rows_match_whole_image_rows() {
        let mapper = classic(9);
        let params = mandelbrot(64);
        let whole = WorkUnit::whole(9, 9);
        let mut all = whole.buffer().unwrap();
        render_unit(&mapper, &params, &whole, &mut all);
        let part = WorkUnit {
            start_row: 4,
            end_row: 7,
            width: 9,
            height: 9,
        };
        let mut some = part.buffer().unwrap();
        render_unit(&mapper, &params, &part, &mut some);
        assert_eq!(&all[part.displacement()..part.displacement() + part.len()], &some[..]);
    }

    #[test]
    fn backends_agree_on_exact_inputs() {
        let a = Arbitrary::with_digits(100);
        let v = Viewport::new(&a, a.from_f64(-0.5), a.from_f64(0.0), a.from_f64(1.5), a.from_f64(1.5));
        let big = PlaneMapper::new(a, 4, 4, v).unwrap();
        let small = classic(4);
        let unit = WorkUnit::whole(4, 4);
        for &mode in &[Mode::Mandelbrot, Mode::Julia] {
            let big_params = FractalParameters {
                mode,
                c: Complex::new(a.from_f64(-0.75), a.from_f64(0.25)),
                max_iterations: 4,
            };
            let small_params = FractalParameters {
                mode,
                c: Complex::new(-0.75, 0.25),
                max_iterations: 4,
            };
            let (mut x, mut y) = (unit.buffer().unwrap(), unit.buffer().unwrap());
            let tx = render_unit(&big, &big_params, &unit, &mut x);
            let ty = render_unit(&small, &small_params, &unit, &mut y);
            assert_eq!(x, y);
            assert_eq!(tx, ty);
        }
    }
}
