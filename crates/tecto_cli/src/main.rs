use clap::Parser;
use tracing_subscriber::EnvFilter;

mod args;
mod commands;

// Use mimalloc for better memory management
#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("tecto=info,tecto_bridge=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = args::Cli::parse();
    init_logging();

    let code = match commands::dispatch(&cli) {
        Ok(()) => 0,
        Err(failure) => {
            eprintln!("error: {failure}");
            failure.exit_code()
        }
    };
    // Every model guard has been dropped by now.
    tecto_bridge::bridge().shutdown();
    std::process::exit(code);
}
