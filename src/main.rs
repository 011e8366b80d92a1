mod app;
mod config;
mod engine;
mod error;
mod library;
mod progress;
mod resolver;
mod runtime;
mod sequencer;
mod timeline;
mod ui;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    runtime::run()
}
