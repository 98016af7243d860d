use clap::{Parser, Subcommand};

/// Catalog sync: marketplace listings for the dealership site
#[derive(Parser)]
#[command(name = "catalog-sync", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server (default)
    Serve {
        /// Port to bind, overrides PORT
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Run one listing sync and print the report
    Sync,

    /// Make sure a valid marketplace token is stored and print its expiry
    RefreshToken,

    /// Apply pending database migrations
    Migrate,
}
