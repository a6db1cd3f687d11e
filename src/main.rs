mod audio;
mod bluetooth;
mod config;
mod controller;
mod disc;
mod error;
mod library;
mod logging;
mod runtime;
mod source;
mod streaming;
mod ui;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    runtime::run()
}
