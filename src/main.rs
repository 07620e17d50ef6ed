mod app;
mod backend;
mod config;
mod engine;
mod error;
mod library;
mod playlist;
mod runtime;
mod thumbnail;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    runtime::run()
}
