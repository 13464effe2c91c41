use clap::Parser;
use refcache::cli::{run, Cli};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}
