#![forbid(unsafe_code)]
//! Inspect a blocker chain: print its status or a block as JSON

use blocker::config::load_config;
use blocker::node::{init_tracing, Node};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "blocker-node", version, about = "Blocker ledger node")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "blocker.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the current height, tip hash and genesis address
    Status,
    /// Print a block as JSON
    Block {
        #[arg(long, conflicts_with = "hash")]
        height: Option<u64>,
        /// Hex-encoded block hash
        #[arg(long)]
        hash: Option<String>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;
    init_tracing(&config.logging.filter);

    let node = Node::init(config)?;
    let chain = &node.chain;

    match cli.command {
        Command::Status => {
            println!("height:          {}", chain.height());
            println!("tip:             {}", hex::encode(chain.tip_hash()?));
            println!("genesis address: {}", chain.genesis_address());
        }
        Command::Block { height, hash } => {
            let block = match (height, hash) {
                (_, Some(hash)) => chain.get_block_by_hash(&hex::decode(hash)?)?,
                (Some(height), None) => chain.get_block_by_height(height)?,
                (None, None) => chain.get_block_by_height(chain.height())?,
            };
            println!("{}", serde_json::to_string_pretty(&block)?);
        }
    }

    Ok(())
}
