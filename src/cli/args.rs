use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "sha1copy", version, about = "Batch file copier with SHA-1 manifests")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v for verbose, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode: suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Copy every file listed in LIST_FILE into DEST, hashing as it goes
    Cp(CpArgs),

    /// Re-hash every file named in a manifest and report mismatches
    Verify(VerifyArgs),
}

#[derive(clap::Args, Debug)]
pub struct CpArgs {
    /// UTF-8 text file, one source path per line
    pub list_file: PathBuf,

    /// Destination directory; source paths are mirrored beneath it
    pub dest: PathBuf,

    /// Worker thread count; defaults to the host's logical CPU count
    #[arg(long)]
    pub threads: Option<usize>,

    /// Also write copied.txt and errored.txt alongside hashes.sha1
    #[arg(long)]
    pub save_lists: bool,
}

#[derive(clap::Args, Debug)]
pub struct VerifyArgs {
    /// Manifest file to verify (e.g. out/hashes.sha1)
    pub manifest_file: PathBuf,

    /// Worker thread count; defaults to the host's logical CPU count
    #[arg(long)]
    pub threads: Option<usize>,
}
