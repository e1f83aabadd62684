use serde::Serialize;
use tecto_bridge::bridge;

use crate::args::Cli;
use crate::commands::common::{Failure, print_json};

#[derive(Serialize)]
struct Report<'a> {
    module: &'a str,
    origin: Option<&'a str>,
    entry_points: &'a [&'static str],
}

pub(crate) fn run(cli: &Cli) -> Result<(), Failure> {
    let info = bridge()
        .info()
        .ok_or_else(|| Failure::Startup("bridge is not running".into()))?;
    if cli.json {
        return print_json(&Report {
            module: &info.module,
            origin: info.origin.as_deref(),
            entry_points: &info.entry_points,
        });
    }
    println!("module: {}", info.module);
    if let Some(origin) = &info.origin {
        println!("origin: {origin}");
    }
    println!("entry points:");
    for name in &info.entry_points {
        println!("  {name}");
    }
    Ok(())
}
