//! Contains the PlaneMapper struct, which describes a relationship
//! between a rectangle on the integral plane with an origin at 0,0,
//! and a rectangle on the complex plane described by a Viewport.  All
//! of the complex-side arithmetic is done by the backend's Precision,
//! so a deep zoom keeps every digit of its pixel spacing.
use error::Error;
use num::Complex;
use numeric::Precision;

/// Describes the x, y of a pixel in the image: column, then row.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Pixel(pub usize, pub usize);

/// A region of the complex plane, given as a center and two radii.
/// The corners are derived once at construction and never change.
#[derive(Clone, Debug)]
pub struct Viewport<R> {
    x: R,
    y: R,
    xr: R,
    yr: R,
    xmin: R,
    xmax: R,
    ymin: R,
    ymax: R,
}

impl<R: Clone> Viewport<R> {
    /// Derive the corners from a center and radii.
    pub fn new<P: Precision<Real = R>>(precision: &P, x: R, y: R, xr: R, yr: R) -> Self {
        Viewport {
            xmin: precision.sub(&x, &xr),
            xmax: precision.add(&x, &xr),
            ymin: precision.sub(&y, &yr),
            ymax: precision.add(&y, &yr),
            x,
            y,
            xr,
            yr,
        }
    }

    /// Real part of the center.
    pub fn x(&self) -> &R {
        &self.x
    }

    /// Imaginary part of the center.
    pub fn y(&self) -> &R {
        &self.y
    }

    /// Half the width of the region.
    pub fn xr(&self) -> &R {
        &self.xr
    }

    /// Half the height of the region.
    pub fn yr(&self) -> &R {
        &self.yr
    }

    /// `x - xr`
    pub fn xmin(&self) -> &R {
        &self.xmin
    }

    /// `x + xr`
    pub fn xmax(&self) -> &R {
        &self.xmax
    }

    /// `y - yr`
    pub fn ymin(&self) -> &R {
        &self.ymin
    }

    /// `y + yr`
    pub fn ymax(&self) -> &R {
        &self.ymax
    }
}

/// Maps pixels of a `width` x `height` image onto a Viewport.  Cheap
/// to clone; every rank keeps its own.
#[derive(Clone, Debug)]
pub struct PlaneMapper<P: Precision> {
    precision: P,
    width: usize,
    height: usize,
    viewport: Viewport<P::Real>,
    // The size of one pixel on the complex plane, horizontally and
    // vertically.
    xgap: P::Real,
    ygap: P::Real,
}

impl<P: Precision> PlaneMapper<P> {
    /// Constructor.  Takes the image size and the viewport, and
    /// precomputes the per-pixel gaps.  An empty image is an error:
    /// there is no scale to compute.
    pub fn new(
        precision: P,
        width: usize,
        height: usize,
        viewport: Viewport<P::Real>,
    ) -> Result<PlaneMapper<P>, Error> {
        if width == 0 || height == 0 {
            return Err(Error::Parse {
                field: "image size",
                value: format!("{}x{}", width, height),
            });
        }
        let xgap = precision.div_count(&precision.sub(&viewport.xmax, &viewport.xmin), width);
        let ygap = precision.div_count(&precision.sub(&viewport.ymax, &viewport.ymin), height);
        Ok(PlaneMapper {
            precision,
            width,
            height,
            viewport,
            xgap,
            ygap,
        })
    }

    /// The backend this mapper computes with.
    pub fn precision(&self) -> &P {
        &self.precision
    }

    /// The image width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// The image height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// The region of the complex plane being rendered.
    pub fn viewport(&self) -> &Viewport<P::Real> {
        &self.viewport
    }

    /// The total number of pixels in the image.
    pub fn len(&self) -> usize {
        self.width * self.height
    }

    /// Describes that the image has no pixels.  Never true for a mapper
    /// built through `new`.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Given a pixel inside a block whose upper-left corner sits at
    /// `origin` in the full image, return the point on the complex
    /// plane that pixel covers.  The block origin lets a worker place
    /// its rows without knowing anything about the other workers.
    pub fn pixel_to_point(&self, pixel: Pixel, origin: Pixel) -> Complex<P::Real> {
        let p = &self.precision;
        let column = p.from_count(pixel.0 + origin.0);
        let row = p.from_count(pixel.1 + origin.1);
        Complex::new(
            p.add(&self.viewport.xmin, &p.mul(&column, &self.xgap)),
            p.add(&self.viewport.ymin, &p.mul(&row, &self.ygap)),
        )
    }

    /// Given a point on the complex plane, map that as closely as
    /// possible to a pixel of the full image.  Points outside the
    /// viewport have no pixel.
    pub fn point_to_pixel(&self, point: &Complex<f64>) -> Option<Pixel> {
        let p = &self.precision;
        let left = (point.re - p.to_f64(&self.viewport.xmin)) / p.to_f64(&self.xgap);
        let top = (point.im - p.to_f64(&self.viewport.ymin)) / p.to_f64(&self.ygap);
        let (left, top) = (left.round(), top.round());
        if left < 0.0 || top < 0.0 || left >= self.width as f64 || top >= self.height as f64 {
            return None;
        }
        Some(Pixel(left as usize, top as usize))
    }
}
