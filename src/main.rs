use clap::Parser;
use kline_backtester::cli::{run, Cli};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}
