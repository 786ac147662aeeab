//! Demo binary: loads a config file, starts the engine, and prints every
//! event it emits until interrupted. Exercises [`elevator_core::Engine`]
//! the way a transport layer would, without actually opening a socket —
//! the core never owns a socket itself.

use clap::Parser;

use elevator_core::{logging, Engine};

#[derive(Parser)]
#[clap(name = "elevator-core")]
#[clap(about = "Run a single-car elevator engine and print its events")]
struct Cli {
    /// Path to a TOML config file.
    #[clap(short, long, default_value = "config.toml")]
    config: String,

    /// Floor to call immediately after startup, for a quick smoke run.
    #[clap(short = 'f', long)]
    call: Option<i64>,
}

fn main() {
    logging::init();
    let cli = Cli::parse();

    let config = match elevator_core::load_config_file(&cli.config) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("failed to load {}: {err}", cli.config);
            std::process::exit(1);
        }
    };

    let engine = Engine::start_with_config(config);
    let events = engine.events();

    if let Some(floor) = cli.call {
        if let Err(err) = engine.add_call(floor) {
            eprintln!("addCall({floor}) rejected: {err}");
        }
    }

    while let Ok(event) = events.recv() {
        println!("{}", serde_json::to_string(&event).unwrap_or_default());
    }
}
