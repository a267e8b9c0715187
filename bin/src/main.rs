use clap::Parser;
use console::style;

mod cli;
mod error;
mod panic_hook;

#[tokio::main]
async fn main() {
    panic_hook::set();
    lookback_utils::log::init("info");

    let cli = cli::Cli::parse();
    if let Err(err) = cli.cmd.handle().await {
        eprintln!("{} {err}", style("error:").red());
        std::process::exit(err.exit_code());
    }
}
