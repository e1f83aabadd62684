use crate::args::{Cli, Command};
use crate::commands::common::Failure;

pub(crate) mod check;
pub(crate) mod common;
pub(crate) mod drive;
pub(crate) mod probe;
pub(crate) mod steps;
pub(crate) mod until;

pub(crate) fn dispatch(cli: &Cli) -> Result<(), Failure> {
    common::start(cli)?;
    match &cli.command {
        Command::Check => check::run(cli),
        Command::Steps(a) => steps::run(cli, a),
        Command::Until(a) => until::run(cli, a),
        Command::Drive(a) => drive::run(cli, a),
        Command::Probe(a) => probe::run(cli, a),
    }
}
