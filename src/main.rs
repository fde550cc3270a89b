use bobfile::{Bob, Config};
use clap::{Parser, Subcommand};
use std::io::{Read, Write};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "bob", version = "1.0.0", about = "The BOB container format CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an empty container
    Create {
        path: PathBuf,
        #[arg(long, default_value = "0")]
        blocksize: u64,
        #[arg(long, default_value = "0")]
        cuesize: u64,
    },
    /// Replace the stored object with the contents of a file (or stdin)
    Set {
        path: PathBuf,
        input: Option<PathBuf>,
        #[arg(long)]
        stdin: bool,
    },
    /// Print (or write out) the current object
    Get {
        path: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Report resolved blocksize/cuesize and current payload length
    Info {
        path: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    match Cli::parse().command {
        // ── Create ───────────────────────────────────────────────────────────
        Commands::Create { path, blocksize, cuesize } => {
            let cfg = Config::default()
                .with_blocksize(blocksize)
                .with_cuesize(cuesize);
            let bob = Bob::create(cfg, &path)?;
            println!(
                "Created: {}  (blocksize={}, cuesize={})",
                path.display(),
                bob.resolved_blocksize(),
                bob.resolved_cuesize(),
            );
            bob.close()?;
        }

        // ── Set ──────────────────────────────────────────────────────────────
        Commands::Set { path, input, stdin } => {
            let bytes = read_input(input.as_ref(), stdin)?;
            let mut bob = Bob::open(&path)?;
            bob.set(&bytes)?;
            bob.close()?;
            println!("Set {} ({} B)", path.display(), bytes.len());
        }

        // ── Get ──────────────────────────────────────────────────────────────
        Commands::Get { path, output } => {
            let bob = Bob::open(&path)?;
            let current = bob.current();
            match output {
                Some(out) => {
                    std::fs::write(&out, current)?;
                    println!("Wrote {} B to {}", current.len(), out.display());
                }
                None => {
                    std::io::stdout().write_all(current)?;
                }
            }
        }

        // ── Info ─────────────────────────────────────────────────────────────
        Commands::Info { path } => {
            let bob = Bob::open(&path)?;
            let file_size = std::fs::metadata(&path)?.len();

            println!("── BOB container ─────────────────────────────────────────");
            println!("  Path        {}", path.display());
            println!("  File size   {} B", file_size);
            println!("  Block size  {} B", bob.resolved_blocksize());
            println!("  Cue size    {} B", bob.resolved_cuesize());
            println!("  Payload     {} B", bob.current().len());
        }
    }

    Ok(())
}

// ── helpers ──────────────────────────────────────────────────────────────────

fn read_input(input: Option<&PathBuf>, stdin: bool) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    if stdin || input.is_none() {
        let mut buf = Vec::new();
        std::io::stdin().read_to_end(&mut buf)?;
        Ok(buf)
    } else {
        Ok(std::fs::read(input.unwrap())?)
    }
}
