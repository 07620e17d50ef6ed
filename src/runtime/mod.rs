//! Terminal front end: loads settings, builds the core and runs the key loop.

use std::env;
use std::path::PathBuf;
use std::time::Instant;

use crossbeam_channel::unbounded;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};

use crate::app::Command;

mod event_loop;
mod settings;
mod startup;

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = startup::Args::parse(env::args().skip(1))?;
    if args.help {
        println!("{}", startup::USAGE);
        println!("{}", event_loop::KEYS);
        return Ok(());
    }

    let settings = settings::load_settings();
    if args.dump_config {
        print!("{}", settings.to_toml()?);
        return Ok(());
    }

    let dir = args
        .dir
        .or_else(|| env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."));

    let (events_tx, events_rx) = unbounded();
    let mut app = startup::build_app(&settings, events_tx);
    app.handle(Command::OpenFolder(dir), Instant::now());

    enable_raw_mode()?;
    let mut state = event_loop::EventLoopState::default();
    let run_result = event_loop::run(&mut app, &settings, &events_rx, &mut state);

    app.shutdown();
    disable_raw_mode()?;

    run_result
}
