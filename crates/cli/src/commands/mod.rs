use clap::Subcommand;

pub mod catalog;
pub mod clean;
pub mod config;
pub mod keys;
pub mod sessions;
pub mod tickets;

use self::keys::KeyCommands;
use self::tickets::TicketCommands;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the ticket kinds, prefixes, storage regions and policies in use
    Catalog,

    /// Print the effective configuration and where it came from
    Config,

    /// Manage cipher key material
    Keys {
        #[command(subcommand)]
        command: KeyCommands,
    },

    /// Inspect and remove stored tickets
    #[command(visible_alias = "t")]
    Tickets {
        #[command(subcommand)]
        command: TicketCommands,
    },

    /// List the live single sign-on sessions of a principal
    Sessions {
        /// Principal identifier
        principal: String,

        /// Only print the number of sessions
        #[arg(long)]
        count: bool,
    },

    /// Remove expired tickets
    Clean {
        /// Keep running the periodic cleaner until interrupted
        #[arg(long)]
        watch: bool,
    },
}
