//! AtlasBlob CLI Client
//!
//! Command-line interface for interacting with AtlasBlob.

use std::io::Write;

use atlasblob::network::Client;
use atlasblob::{BlobError, ByteRange};
use clap::{Parser, Subcommand};

/// AtlasBlob CLI
#[derive(Parser, Debug)]
#[command(name = "atlasblob-cli")]
#[command(about = "CLI for the AtlasBlob object store")]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:7070")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create an object
    Put {
        /// Object id
        id: String,

        /// Content
        data: String,
    },

    /// Append to an object (created if absent)
    Append {
        /// Object id
        id: String,

        /// Content to append
        data: String,
    },

    /// Read an object, or a range of it
    Get {
        /// Object id
        id: String,

        /// First byte to read
        #[arg(short, long, default_value = "0")]
        offset: u64,

        /// Number of bytes to read (default: to the end)
        #[arg(short, long)]
        length: Option<u64>,
    },

    /// Delete an object
    #[command(alias = "delete")]
    Del {
        /// Object id
        id: String,
    },

    /// Show the length of an object
    Info {
        /// Object id
        id: String,
    },

    /// Ping the server
    Ping,
}

fn main() {
    let args = Args::parse();

    if let Err(e) = run(args) {
        eprintln!("error ({}): {}", e.kind().as_str(), e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), BlobError> {
    let mut client = Client::connect(&args.server)?;

    match args.command {
        Commands::Put { id, data } => {
            client.put(id.as_bytes(), data.as_bytes())?;
            println!("OK");
        }
        Commands::Append { id, data } => {
            let range = client.append(id.as_bytes(), data.as_bytes())?;
            println!("offset={} length={}", range.offset, range.length.unwrap_or(0));
        }
        Commands::Get { id, offset, length } => {
            let body = client.read(id.as_bytes(), ByteRange::new(offset, length))?;
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&body)?;
            stdout.flush()?;
        }
        Commands::Del { id } => {
            client.delete(id.as_bytes())?;
            println!("OK");
        }
        Commands::Info { id } => {
            let length = client.info(id.as_bytes())?;
            println!("{}", length);
        }
        Commands::Ping => {
            client.ping()?;
            println!("PONG");
        }
    }

    Ok(())
}
