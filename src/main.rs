use clap::Parser;
use finprompt::cli::{Cli, run};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}
