#[macro_use]
extern crate criterion;
extern crate num;
extern crate parajulia;

use criterion::Criterion;
use num::Complex;
use parajulia::grid::WorkUnit;
use parajulia::kernel::render_unit;
use parajulia::{render, Arbitrary, FractalParameters, Job, LocalGroup, Mode, PlaneMapper, Precision, Viewport};

fn job<P: Precision>(precision: P, size: usize) -> Job<P> {
    let p = &precision;
    let viewport = Viewport::new(p, p.from_f64(-0.5), p.from_f64(0.0), p.from_f64(1.5), p.from_f64(1.5));
    Job {
        params: FractalParameters {
            mode: Mode::Mandelbrot,
            c: Complex::new(p.from_f64(0.0), p.from_f64(0.0)),
            max_iterations: 200,
        },
        mapper: PlaneMapper::new(precision.clone(), size, size, viewport).unwrap(),
    }
}

fn serial_fixed(c: &mut Criterion) {
    let job = job(parajulia::Fixed, 64);
    let unit = WorkUnit::whole(64, 64);
    c.bench_function("serial f64 64x64", move |b| {
        b.iter(|| {
            let mut block = unit.buffer().unwrap();
            render_unit(&job.mapper, &job.params, &unit, &mut block)
        })
    });
}

fn serial_arbitrary(c: &mut Criterion) {
    let job = job(Arbitrary::with_digits(50), 16);
    let unit = WorkUnit::whole(16, 16);
    c.bench_function("serial 50 digits 16x16", move |b| {
        b.iter(|| {
            let mut block = unit.buffer().unwrap();
            render_unit(&job.mapper, &job.params, &unit, &mut block)
        })
    });
}

fn dynamic_fixed(c: &mut Criterion) {
    let job = job(parajulia::Fixed, 64);
    c.bench_function("dynamic f64 64x64, 4 ranks", move |b| {
        b.iter(|| LocalGroup::new(4).run(|comm| render(comm, &job)).unwrap())
    });
}

criterion_group!(benches, serial_fixed, serial_arbitrary, dynamic_fixed);
criterion_main!(benches);
