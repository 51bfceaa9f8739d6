mod cli;
mod controller;
mod inspect;
mod journal;
mod prefs;
mod resolver;
mod runtime;
mod share;
mod state;
mod stream;
mod surface;

use anyhow::Result;

fn main() -> Result<()> {
    env_logger::init();
    match cli::parse()? {
        cli::Command::Run(args) => runtime::execute(args),
        cli::Command::Inspect(args) => inspect::execute(args),
    }
}
