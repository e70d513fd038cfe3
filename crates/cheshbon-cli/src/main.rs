use anyhow::Result;
use clap::Parser;

mod args;
mod cmd;
mod io;
mod output;
mod render;

fn main() -> Result<()> {
    let cli = args::Cli::parse();
    output::init(cli.json);

    let code = cmd::dispatch(cli)?;
    std::process::exit(code);
}
