use serde::Serialize;
use tecto_bridge::{ArrayView, bridge};
use tecto_synth::{ElevationStats, Grid};

use crate::args::{Cli, ProbeArgs};
use crate::commands::common::{Failure, OpenModel, print_json};

#[derive(Serialize)]
struct Row {
    k: i32,
    power: f64,
    #[serde(flatten)]
    stats: ElevationStats,
}

#[derive(Serialize)]
struct Report {
    points: usize,
    rows: Vec<Row>,
}

pub(crate) fn run(cli: &Cli, args: &ProbeArgs) -> Result<(), Failure> {
    if args.grid == 0 {
        return Err(Failure::Startup("--grid must be at least 1".into()));
    }
    let model = OpenModel::create(&args.config)?;
    let grid = Grid::regular(args.grid, 0.0, 10.0, 0.0);
    let coords =
        ArrayView::vectors(grid.coords()).map_err(|e| Failure::Operation(e.to_string()))?;

    let sweep = args
        .k
        .iter()
        .map(|&k| (k, 1.0))
        .chain(args.power.iter().map(|&p| (3, p)));
    let mut rows = Vec::new();
    for (k, power) in sweep {
        let values = bridge().interpolate_scalar_field_vec(model.handle(), coords, k, power)?;
        rows.push(Row {
            k,
            power,
            stats: ElevationStats::of(&values),
        });
    }

    if cli.json {
        return print_json(&Report {
            points: grid.len(),
            rows,
        });
    }
    println!("interpolating at {} points", grid.len());
    for r in &rows {
        println!(
            "  k={} power={}: min {:.6} max {:.6} mean {:.6}",
            r.k, r.power, r.stats.min, r.stats.max, r.stats.mean
        );
    }
    Ok(())
}
