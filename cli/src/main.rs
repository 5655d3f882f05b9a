mod commands;
mod terminal;

use commands::{CommandLine, Commands, discover, networks};
use terminal::{logging, print};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let commands = CommandLine::parse_args();

    logging::init_logging(commands.verbose);

    match commands.command {
        Commands::Networks => {
            print::header("local networks");
            networks::networks();
            Ok(())
        }
        Commands::Discover(args) => {
            print::header("getting ready for discovery");
            discover::discover(args).await
        }
    }
}
