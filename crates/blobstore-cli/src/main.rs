//! blobstore - fetch and store byte sequences named by a hash
//!
//! Subcommands:
//! - `blobstore store` - Store stdin, print the object name
//! - `blobstore fetch <name>` - Write the named object to stdout
//! - `blobstore algorithms` - List supported hash functions

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use blobstore::{Blobstore, ContentStore, HashAlgorithm};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod config;

use config::CliConfig;

const CONFIG_HELP: &str = "\
Configuration:
  Settings come from flags, then BLOBSTORE_DIRNAME / BLOBSTORE_HASHFUNC,
  then a TOML file named .blobstore.toml in the working directory or home
  directory. YAML .blobstore files are not read.

  Example .blobstore.toml:
    dirname = \"/var/lib/blobs\"
    hashfunc = \"sha256\"";

#[derive(Parser)]
#[command(name = "blobstore")]
#[command(about = "Fetch and store byte sequences named by a hash")]
#[command(version)]
#[command(after_help = CONFIG_HELP)]
struct Cli {
    /// Filesystem directory name
    #[arg(short, long, global = true, env = "BLOBSTORE_DIRNAME")]
    dirname: Option<PathBuf>,

    /// Hash function name (md5, sha1, sha256, sha512)
    #[arg(short = 'f', long, global = true, env = "BLOBSTORE_HASHFUNC")]
    hashfunc: Option<String>,

    /// TOML config file (default: ./.blobstore.toml, then ~/.blobstore.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Store the bytes from stdin
    #[command(visible_aliases = ["put", "save", "write"])]
    Store,

    /// Fetch the named object from storage
    #[command(visible_aliases = ["get", "read"])]
    Fetch {
        /// Object name, as printed by `store`
        name: String,
    },

    /// List supported hash functions
    Algorithms,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // stdout carries object bytes, so logs go to stderr
    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Commands::Store => {
            let store = open_store(cli.config, cli.dirname, cli.hashfunc)?;
            let name = store
                .store(io::stdin().lock())
                .context("failed to store stdin")?;
            println!("{}", name);
        }
        Commands::Fetch { name } => {
            let store = open_store(cli.config, cli.dirname, cli.hashfunc)?;
            let Some(mut reader) = store
                .fetch(&name)
                .with_context(|| format!("failed to fetch {}", name))?
            else {
                bail!("object {} not found", name);
            };

            let mut stdout = io::stdout().lock();
            io::copy(&mut reader, &mut stdout).context("failed to write object to stdout")?;
            stdout.flush().context("failed to flush stdout")?;
        }
        Commands::Algorithms => {
            for algorithm in HashAlgorithm::ALL {
                println!("{}", algorithm);
            }
        }
    }

    Ok(())
}

fn open_store(
    config_path: Option<PathBuf>,
    dirname: Option<PathBuf>,
    hashfunc: Option<String>,
) -> Result<Blobstore> {
    let config = CliConfig::load(config_path.as_deref())?
        .merge(dirname, hashfunc)
        .into_store_config()?;

    Blobstore::new(&config).context("failed to open blobstore")
}
