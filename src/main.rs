use anyhow::Result;
use clap::Parser;

use crate::args::{Args, Command};

mod args;
mod cassette;
mod commands;
mod formats;
mod misc;
mod parser;
mod stats;
mod sync;
mod wave;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    match args.subcommand {
        Command::Decode(decode) => commands::decode::decode(decode),
    }
}
