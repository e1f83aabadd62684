use serde::Serialize;
use tecto_bridge::bridge;

use crate::args::{Cli, UntilArgs};
use crate::commands::common::{Failure, OpenModel, print_json, require_positive};

#[derive(Serialize)]
struct Report {
    steps: u32,
    time: f64,
}

pub(crate) fn run(cli: &Cli, args: &UntilArgs) -> Result<(), Failure> {
    require_positive("dt", args.dt)?;
    let model = OpenModel::create(&args.config)?;
    let b = bridge();
    let steps = b.run_until_time(model.handle(), args.target, args.dt, args.verbose)?;
    let time = b.current_time(model.handle())?;
    if cli.json {
        print_json(&Report { steps, time })
    } else {
        println!("{steps} steps, t = {time}");
        Ok(())
    }
}
