//! AtlasORM Inspect Binary
//!
//! Read-only tooling over a `MemStore` snapshot file.

use std::collections::BTreeMap;
use std::path::PathBuf;

use atlasorm::{MemStore, OrmError, PrefixStore, Result, Schema, Sequence};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

/// AtlasORM snapshot inspector
#[derive(Parser, Debug)]
#[command(name = "atlasorm-inspect")]
#[command(about = "Inspect tables, indexes and sequences in an AtlasORM snapshot")]
#[command(version)]
struct Args {
    /// Snapshot file
    #[arg(short, long, default_value = "./atlasorm.snapshot")]
    snapshot: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Count entries per namespace prefix
    Stats,

    /// List entries under a hex key prefix
    Scan {
        /// Key prefix in hex, e.g. `10` or `1000000000000000`
        prefix: String,

        /// Walk the range in descending key order
        #[arg(short, long)]
        reverse: bool,

        /// Maximum entries to print
        #[arg(short, long, default_value = "50")]
        limit: usize,
    },

    /// Print the current value of a sequence
    Seq {
        /// Sequence prefix byte in hex, e.g. `11` or `0x11`
        prefix: String,
    },
}

fn main() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,atlasorm=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    let args = Args::parse();

    tracing::info!("AtlasORM Inspect v{}", atlasorm::VERSION);
    tracing::info!("Snapshot: {}", args.snapshot.display());

    if let Err(e) = run(&args) {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<()> {
    let store = MemStore::load_snapshot(&args.snapshot)?;

    match &args.command {
        Commands::Stats => {
            let mut counts: BTreeMap<u8, usize> = BTreeMap::new();
            for (key, _) in store.entries() {
                if let Some(&prefix) = key.first() {
                    *counts.entry(prefix).or_default() += 1;
                }
            }
            println!("{} entries", store.len());
            for (prefix, count) in counts {
                println!("0x{:02x}\t{}", prefix, count);
            }
        }

        Commands::Scan {
            prefix,
            reverse,
            limit,
        } => {
            let prefix = parse_hex(prefix)?;
            let scoped = PrefixStore::new(&store, prefix);
            for item in scoped.scan(None, None, *reverse)?.take(*limit) {
                let (key, value) = item?;
                println!("{}\t{} bytes\t{}", hex::encode(&key), value.len(), hex::encode(&value));
            }
        }

        Commands::Seq { prefix } => {
            let prefix = parse_prefix_byte(prefix)?;
            let sequence = Sequence::new(&Schema::new(), prefix)?;
            println!("{}", sequence.cur_val(&store)?);
        }
    }

    Ok(())
}

fn parse_hex(s: &str) -> Result<Vec<u8>> {
    let s = s.trim_start_matches("0x");
    hex::decode(s).map_err(|e| OrmError::InvalidArgument(format!("bad hex {:?}: {}", s, e)))
}

fn parse_prefix_byte(s: &str) -> Result<u8> {
    match parse_hex(s)?.as_slice() {
        [byte] => Ok(*byte),
        _ => Err(OrmError::InvalidArgument(format!(
            "expected a single prefix byte, got {:?}",
            s
        ))),
    }
}
