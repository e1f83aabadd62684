use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tecto_bridge::BridgeConfig;

/// Drive a landscape evolution model hosted in the embedded interpreter.
#[derive(Parser, Debug)]
#[command(name = "tecto", version)]
pub(crate) struct Cli {
    /// Guest module name (overrides TECTO_GUEST_MODULE)
    #[arg(long, global = true)]
    pub module: Option<String>,

    /// Directory searched for the guest module; repeatable, first wins
    #[arg(long = "guest-path", global = true)]
    pub guest_path: Vec<PathBuf>,

    /// Print one JSON object instead of text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Command {
    /// Start the bridge and list the resolved entry points
    Check,
    /// Run a fixed number of steps
    Steps(StepsArgs),
    /// Run until the model clock reaches a target time
    Until(UntilArgs),
    /// Couple a synthetic velocity field to the model and track elevation
    Drive(DriveArgs),
    /// Sweep interpolation parameters over a sampling grid
    Probe(ProbeArgs),
}

#[derive(Args, Debug)]
pub(crate) struct StepsArgs {
    /// Model configuration file
    pub config: PathBuf,
    #[arg(short = 'n', long, default_value = "1")]
    pub steps: u32,
    #[arg(long)]
    pub dt: f64,
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Args, Debug)]
pub(crate) struct UntilArgs {
    pub config: PathBuf,
    #[arg(short, long)]
    pub target: f64,
    #[arg(long)]
    pub dt: f64,
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Args, Debug)]
pub(crate) struct DriveArgs {
    pub config: PathBuf,
    /// Simulated time to cover
    #[arg(long, default_value = "5.0")]
    pub duration: f64,
    #[arg(long, default_value = "1.0")]
    pub dt: f64,
    /// Neighbours used when applying velocities
    #[arg(short, long, default_value = "3")]
    pub k: i32,
    #[arg(short, long, default_value = "1.0")]
    pub power: f64,
    #[arg(long, default_value = "0.1")]
    pub amplitude: f64,
    /// Side of the tracked sampling grid
    #[arg(long, default_value = "8")]
    pub samples: usize,
}

#[derive(Args, Debug)]
pub(crate) struct ProbeArgs {
    pub config: PathBuf,
    /// Side of the query grid
    #[arg(long, default_value = "11")]
    pub grid: usize,
    /// Neighbour counts swept at power 1
    #[arg(short, long, value_delimiter = ',', default_value = "1,3,5")]
    pub k: Vec<i32>,
    /// Powers swept at k = 3
    #[arg(short, long, value_delimiter = ',', default_value = "0.5,1.0,2.0")]
    pub power: Vec<f64>,
}

impl Cli {
    pub(crate) fn bridge_config(&self) -> BridgeConfig {
        let mut cfg = BridgeConfig::from_env();
        if let Some(m) = &self.module {
            cfg = cfg.with_module(m.clone());
        }
        // Each insert goes to the front, so walk backwards to keep flag order.
        for p in self.guest_path.iter().rev() {
            cfg = cfg.with_search_path(p.clone());
        }
        cfg
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn guest_paths_keep_flag_order() {
        let cli = Cli::parse_from([
            "tecto",
            "--guest-path",
            "/first",
            "--guest-path",
            "/second",
            "check",
        ]);
        let cfg = cli.bridge_config();
        assert_eq!(cfg.search_paths[0], PathBuf::from("/first"));
        assert_eq!(cfg.search_paths[1], PathBuf::from("/second"));
    }

    #[test]
    fn probe_lists_split_on_commas() {
        let cli = Cli::parse_from(["tecto", "probe", "m.cfg", "-k", "2,4", "--json"]);
        assert!(cli.json);
        let Command::Probe(p) = cli.command else {
            panic!("expected probe");
        };
        assert_eq!(p.k, vec![2, 4]);
        assert_eq!(p.power, vec![0.5, 1.0, 2.0]);
    }
}
