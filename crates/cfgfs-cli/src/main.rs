//! cfgfs command-line front-end.
//!
//! Drives the virtual config filesystem one operation at a time, the way a
//! shell session against a mounted tree would.
//!
//! Usage:
//!   cfgfs --config mounts.toml ls /servers/alpha/server.config
//!   cfgfs --config mounts.toml cat /servers/alpha/server.config/java/java_xmx
//!   cfgfs --config mounts.toml write /servers/alpha/server.config/java/java_xmx 1024
//!   cfgfs --config mounts.toml mounts

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt};

use cfgfs_kernel::{ConfigFs, FileType, MountConfig, VfsOps};

/// Browse and edit config files as a directory tree.
#[derive(Parser, Debug)]
#[command(name = "cfgfs")]
#[command(about = "Virtual filesystem over application config files")]
struct Args {
    /// Mount configuration (TOML, `[[mount]]` tables)
    #[arg(short, long, default_value = "mounts.toml")]
    config: PathBuf,

    /// Log at debug level (RUST_LOG overrides)
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show attributes of a path
    Stat { path: String },
    /// List a directory
    Ls { path: String },
    /// Print a leaf value
    Cat { path: String },
    /// Set a leaf value
    Write { path: String, value: String },
    /// Create an empty leaf, or a section one level below a sectioned source
    Touch { path: String },
    /// Create a section
    Mkdir { path: String },
    /// Remove a leaf or section
    Rm { path: String },
    /// Remove a section and its options
    Rmdir { path: String },
    /// List configured mounts
    Mounts,
}

fn kind_char(kind: FileType) -> char {
    match kind {
        FileType::Directory => 'd',
        FileType::File => '-',
    }
}

async fn run(fs: &ConfigFs, command: Command) -> Result<()> {
    match command {
        Command::Stat { path } => {
            let attr = fs.getattr(Path::new(&path)).await?;
            println!(
                "{}{:o} nlink={} size={} {}",
                kind_char(attr.kind),
                attr.perm,
                attr.nlink,
                attr.size,
                path
            );
        }
        Command::Ls { path } => {
            for entry in fs.readdir(Path::new(&path)).await? {
                if entry.name == "." || entry.name == ".." {
                    continue;
                }
                let suffix = if entry.kind.is_dir() { "/" } else { "" };
                println!("{}{}", entry.name, suffix);
            }
        }
        Command::Cat { path } => {
            print!("{}", String::from_utf8_lossy(&fs.read(Path::new(&path)).await?));
        }
        Command::Write { path, value } => {
            let path = Path::new(&path);
            // Writing to a missing option in an existing section creates it.
            let n = fs.write(path, value.as_bytes()).await?;
            tracing::debug!(path = %path.display(), bytes = n, "wrote");
        }
        Command::Touch { path } => {
            fs.create(Path::new(&path)).await?;
        }
        Command::Mkdir { path } => {
            fs.mkdir(Path::new(&path)).await?;
        }
        Command::Rm { path } => {
            fs.remove(Path::new(&path)).await?;
        }
        Command::Rmdir { path } => {
            fs.rmdir(Path::new(&path)).await?;
        }
        Command::Mounts => {
            for info in fs.mounts().list_mounts() {
                println!(
                    "{}\t{}\t{}{}",
                    info.path,
                    info.style,
                    info.source.display(),
                    if info.read_only { "\t(ro)" } else { "" }
                );
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Logs go to stderr; stdout carries values.
    let default_level = if args.verbose { "debug" } else { "info" };
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let config = MountConfig::load(&args.config)
        .with_context(|| format!("loading mounts from {}", args.config.display()))?;
    let fs = ConfigFs::from_config(&config).context("mounting sources")?;
    tracing::debug!(mounts = config.mounts.len(), "ready");

    run(&fs, args.command).await
}
