use serde::Serialize;
use tecto_bridge::bridge;

use crate::args::{Cli, StepsArgs};
use crate::commands::common::{Failure, OpenModel, print_json, require_positive};

#[derive(Serialize)]
struct Report {
    requested: u32,
    completed: u32,
    time: f64,
}

pub(crate) fn run(cli: &Cli, args: &StepsArgs) -> Result<(), Failure> {
    require_positive("dt", args.dt)?;
    let model = OpenModel::create(&args.config)?;
    let b = bridge();
    let report = b.run_for_steps(model.handle(), args.steps, args.dt, args.verbose)?;
    let time = b.current_time(model.handle())?;
    if cli.json {
        print_json(&Report {
            requested: report.requested,
            completed: report.completed,
            time,
        })?;
    } else {
        println!(
            "completed {}/{} steps, t = {time}",
            report.completed, report.requested
        );
    }
    if report.is_partial() {
        return Err(Failure::Operation(format!(
            "run stopped after {} of {} steps",
            report.completed, report.requested
        )));
    }
    Ok(())
}
