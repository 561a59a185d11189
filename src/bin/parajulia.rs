extern crate clap;
extern crate env_logger;
extern crate image;
extern crate num_cpus;
extern crate parajulia;

use clap::{App, Arg, ArgMatches};
use image::ColorType;
use parajulia::{render, Arbitrary, Error, Fixed, IterationGrid, Job, LocalGroup, ParameterFile, Precision};
use std::iter;
use std::str::FromStr;

fn validate_range<T: FromStr + Ord>(
    s: &str,
    low: T,
    high: T,
    isnotanumber_err: &str,
    isnotinrange_err: &str,
) -> Result<(), String> {
    match T::from_str(s) {
        Ok(i) => {
            if i >= low && i <= high {
                Ok(())
            } else {
                Err(isnotinrange_err.to_string())
            }
        }
        Err(_) => Err(isnotanumber_err.to_string()),
    }
}

const PARAMS: &str = "params";
const OUTPUT: &str = "output";
const WORKERS: &str = "workers";
const DIGITS: &str = "digits";
const QUIET: &str = "quiet";

const MAX_WORKERS: usize = 256;

fn args<'a>() -> ArgMatches<'a> {
    App::new("parajulia")
        .version("0.1.0")
        .author("Elf M. Sternberg <elf.sternberg@gmail.com>")
        .about("Distributed Mandelbrot and Julia set renderer")
        .arg(
            Arg::with_name(PARAMS)
                .required(true)
                .index(1)
                .help("Parameter file, one value per line"),
        )
        .arg(
            Arg::with_name(OUTPUT)
                .required(false)
                .long(OUTPUT)
                .short("o")
                .takes_value(true)
                .help("Output file; overrides the one named in the parameter file"),
        )
        .arg(
            Arg::with_name(WORKERS)
                .required(false)
                .long(WORKERS)
                .short("w")
                .takes_value(true)
                .validator(|s| {
                    validate_range(
                        &s,
                        1,
                        MAX_WORKERS,
                        "Could not parse worker count",
                        &format!("Worker count must be between 1 and {}", MAX_WORKERS),
                    )
                })
                .help("Number of ranks in the group [default: one per CPU]"),
        )
        .arg(
            Arg::with_name(DIGITS)
                .required(false)
                .long(DIGITS)
                .short("d")
                .takes_value(true)
                .validator(|s| {
                    validate_range(
                        &s,
                        1,
                        100_000,
                        "Could not parse digit count",
                        "Digit count must be between 1 and 100000",
                    )
                })
                .help("Use arbitrary precision with this many significant digits"),
        )
        .arg(
            Arg::with_name(QUIET)
                .required(false)
                .long(QUIET)
                .short("q")
                .help("Do not print the benchmark line"),
        )
        .get_matches()
}

// Points in the set are black; everything else is a grey ramp on how
// quickly it escaped.
fn shade(grid: &IterationGrid, max_iterations: u32) -> Vec<u8> {
    grid.cells()
        .iter()
        .flat_map(|&count| {
            let v = if count >= max_iterations {
                0
            } else {
                255 - ((u64::from(count) * 255) / u64::from(max_iterations.max(1))) as u8
            };
            iter::repeat(v).take(3)
        })
        .collect()
}

fn write_image(outfile: &str, grid: &IterationGrid, max_iterations: u32) -> Result<(), Error> {
    let pixels = shade(grid, max_iterations);
    image::save_buffer(
        outfile,
        &pixels,
        grid.width() as u32,
        grid.height() as u32,
        ColorType::RGB(8),
    )?;
    Ok(())
}

fn run<P: Precision>(job: Job<P>, workers: usize, outfile: &str, quiet: bool) -> Result<(), Error> {
    let outcomes = LocalGroup::new(workers).run(|comm| {
        let job = job.clone();
        render(comm, &job)
    })?;

    for rendering in outcomes.into_iter().flatten() {
        write_image(outfile, &rendering.grid, job.params.max_iterations)?;
        if !quiet {
            println!("{}", rendering.benchmark);
        }
    }
    Ok(())
}

fn main() {
    env_logger::init();
    let matches = args();

    let result = ParameterFile::open(matches.value_of(PARAMS).unwrap()).and_then(|params| {
        let workers = matches
            .value_of(WORKERS)
            .map(|w| usize::from_str(w).expect("Could not parse worker count."))
            .unwrap_or_else(num_cpus::get);
        let outfile = matches.value_of(OUTPUT).unwrap_or(&params.output).to_string();
        let quiet = matches.is_present(QUIET);
        match matches.value_of(DIGITS) {
            Some(digits) => {
                let digits = u32::from_str(digits).expect("Could not parse digit count.");
                run(params.job(Arbitrary::with_digits(digits))?, workers, &outfile, quiet)
            }
            None => run(params.job(Fixed)?, workers, &outfile, quiet),
        }
    });

    if let Err(e) = result {
        eprintln!("Render failure: {}", e);
        std::process::exit(1);
    }
}
