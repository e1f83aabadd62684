//! Couples a time-varying synthetic velocity field to the model.
//!
//! Each step samples velocities at a fixed set of horizontal positions,
//! applies them for the length of the step, advances the model, and then
//! re-reads elevation at those positions so the next field is generated on
//! the updated surface.

use serde::Serialize;
use tecto_bridge::{ArrayView, ArrayViewMut, bridge};
use tecto_synth::{ElevationChange, ElevationStats, Grid, rotational_field_at};

use crate::args::{Cli, DriveArgs};
use crate::commands::common::{Failure, OpenModel, print_json, require_positive};

const CENTER: [f64; 2] = [5.0, 5.0];
// Neighbours used to read elevation back at the tracked points.
const SAMPLE_K: i32 = 5;
const SAMPLE_POWER: f64 = 1.0;
const TIME_EPS: f64 = 1e-9;

#[derive(Serialize)]
struct StepRecord {
    step: usize,
    from: f64,
    to: f64,
    elapsed: f64,
    change: ElevationChange,
}

#[derive(Serialize)]
struct Report {
    initial: ElevationStats,
    steps: Vec<StepRecord>,
    total: ElevationChange,
    duration: f64,
}

pub(crate) fn run(cli: &Cli, args: &DriveArgs) -> Result<(), Failure> {
    require_positive("dt", args.dt)?;
    require_positive("duration", args.duration)?;
    if args.samples == 0 {
        return Err(Failure::Startup("--samples must be at least 1".into()));
    }
    let model = OpenModel::create(&args.config)?;
    let h = model.handle();
    let b = bridge();

    let mut grid = Grid::regular(args.samples, 1.0, 9.0, 0.0);
    let mut heights = vec![0.0; grid.len()];
    let read = |grid: &Grid, out: &mut [f64]| -> Result<(), Failure> {
        let coords = ArrayView::vectors(grid.coords()).map_err(bad_buffer)?;
        let mut out = ArrayViewMut::scalars(out);
        b.interpolate_scalar_field(h, coords, SAMPLE_K, SAMPLE_POWER, &mut out)?;
        Ok(())
    };
    read(&grid, &mut heights)?;
    grid.set_heights(&heights);
    let initial_heights = heights.clone();
    let initial = ElevationStats::of(&heights);

    let start = b.current_time(h)?;
    let target = start + args.duration;
    let mut now = start;
    let mut steps = Vec::new();
    while now < target - TIME_EPS {
        let step_dt = args.dt.min(target - now);
        let before = grid.heights();
        let velocities = rotational_field_at(now, grid.coords(), CENTER, args.amplitude);
        b.apply_velocity_field(
            h,
            ArrayView::vectors(grid.coords()).map_err(bad_buffer)?,
            ArrayView::vectors(&velocities).map_err(bad_buffer)?,
            step_dt,
            args.k,
            args.power,
        )?;
        let elapsed = b.run_for_dt(h, step_dt, false)?;
        read(&grid, &mut heights)?;
        grid.set_heights(&heights);

        let next = b.current_time(h)?;
        if next <= now {
            return Err(Failure::Operation(format!(
                "model clock did not advance past {now}"
            )));
        }
        let change = ElevationChange::between(&before, &heights).unwrap_or_default();
        tracing::info!(
            step = steps.len() + 1,
            t = next,
            rms = change.rms_change,
            "step complete"
        );
        if !cli.json {
            println!(
                "step {:>3}: t {now:.2} -> {next:.2}  mean {:.6}  rms change {:.6}  ({elapsed:.2}s)",
                steps.len() + 1,
                change.after.mean,
                change.rms_change,
            );
        }
        steps.push(StepRecord {
            step: steps.len() + 1,
            from: now,
            to: next,
            elapsed,
            change,
        });
        now = next;
    }

    let total = ElevationChange::between(&initial_heights, &heights).unwrap_or_default();
    let report = Report {
        initial,
        steps,
        total,
        duration: now - start,
    };
    if cli.json {
        return print_json(&report);
    }
    println!(
        "ran {:.2} time units in {} steps",
        report.duration,
        report.steps.len()
    );
    println!(
        "elevation  before: min {:.6} max {:.6} mean {:.6}",
        initial.min, initial.max, initial.mean
    );
    println!(
        "           after:  min {:.6} max {:.6} mean {:.6}",
        total.after.min, total.after.max, total.after.mean
    );
    println!(
        "change     min {:.6} max {:.6} mean {:.6} rms {:.6}, {} significant of {}",
        total.min_change,
        total.max_change,
        total.mean_change,
        total.rms_change,
        total.significant,
        heights.len()
    );
    Ok(())
}

fn bad_buffer(e: tecto_bridge::ArgumentError) -> Failure {
    Failure::Operation(e.to_string())
}
