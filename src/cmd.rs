use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(about)]
pub struct Cli {
    /// Log debug output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create an empty repository
    Init {
        /// Root path
        root_path: Option<PathBuf>,
    },

    /// Print the contents of an object
    CatFile {
        /// Pretty-print the object payload
        #[arg(short = 'p')]
        pretty: bool,

        /// Object hash
        hash: String,
    },

    /// Compute the blob hash of a file
    HashObject {
        /// Store the blob in the object database
        #[arg(short = 'w')]
        write: bool,

        /// File to hash
        path: PathBuf,
    },

    /// List the entries of a tree
    LsTree {
        /// Only print entry names
        #[arg(long)]
        name_only: bool,

        /// Tree hash
        hash: String,
    },

    /// Store the working directory as a tree
    WriteTree {
        /// Sort entries in git's canonical order
        #[arg(long)]
        sorted: bool,

        /// Record files as 100644/100755 instead of their permission bits
        #[arg(long)]
        normalize_modes: bool,
    },

    /// Create a commit object for a tree
    CommitTree {
        /// Tree hash
        tree: String,

        /// Parent commit hash
        #[arg(short = 'p')]
        parent: Option<String>,

        /// Commit message
        #[arg(short = 'm')]
        message: String,
    },
}
