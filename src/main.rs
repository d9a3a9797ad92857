use std::path::PathBuf;

use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

mod cli;
mod config;

use cli::args::{Cli, Commands, CpArgs, VerifyArgs};
use config::types::Verbosity;
use sha1copy::{copy_from_list, verify_from_manifest, CopyError, CopyOptions, ProgressEvent, VerifyOptions};

fn main() {
    let cli = Cli::parse();
    let verbosity = Verbosity::from((cli.quiet, cli.verbose));

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(verbosity.as_tracing_filter())),
        )
        .with_writer(std::io::stderr)
        .init();

    debug!(?verbosity, "starting sha1copy");

    if let Err(err) = run(cli, verbosity) {
        display_error(&err);
        std::process::exit(1);
    }
}

fn run(cli: Cli, verbosity: Verbosity) -> Result<(), CopyError> {
    match cli.command {
        Commands::Cp(args) => run_cp(args, verbosity),
        Commands::Verify(args) => run_verify(args, verbosity),
    }
}

fn run_cp(args: CpArgs, verbosity: Verbosity) -> Result<(), CopyError> {
    let quiet = verbosity == Verbosity::Quiet;
    let opts = CopyOptions {
        thread_count: args.threads,
        save_lists: args.save_lists,
        on_progress: Some(Box::new(move |event| log_progress(event, quiet))),
        cancel_token: None,
    };

    copy_from_list(&args.list_file, &args.dest, opts)?;
    info!("copy run complete");
    if !quiet {
        eprintln!("done: manifest written to {}", manifest_path(&args.dest).display());
    }
    Ok(())
}

fn run_verify(args: VerifyArgs, verbosity: Verbosity) -> Result<(), CopyError> {
    let quiet = verbosity == Verbosity::Quiet;
    let opts = VerifyOptions {
        thread_count: args.threads,
        on_progress: Some(Box::new(move |event| log_progress(event, quiet))),
        cancel_token: None,
    };

    let summary = verify_from_manifest(&args.manifest_file, opts)?;

    if !quiet {
        eprintln!(
            "total: {}  ok: {}  mismatched: {}  errors: {}",
            summary.total, summary.ok, summary.mismatched, summary.errors
        );
        for path in &summary.mismatched_paths {
            eprintln!("  mismatch: {}", path.display());
        }
        for path in &summary.error_paths {
            eprintln!("  error: {}", path.display());
        }
    }

    if summary.mismatched > 0 || summary.errors > 0 {
        std::process::exit(1);
    }
    Ok(())
}

fn manifest_path(dest_dir: &std::path::Path) -> PathBuf {
    dest_dir.join("hashes.sha1")
}

/// The CLI's progress sink: logs every event, and prints a one-line overall
/// update to stderr when not running quiet. No terminal redraws -- this is
/// the "simple logger sink" the engine is built to consume.
fn log_progress(event: ProgressEvent, quiet: bool) {
    match event {
        ProgressEvent::FileProgress {
            path,
            bytes_so_far,
            bytes_total,
        } => {
            tracing::trace!(path = %path.display(), bytes_so_far, bytes_total, "progress");
        }
        ProgressEvent::FileDone {
            path,
            completed_files,
            total_files,
        } => {
            tracing::debug!(path = %path.display(), completed_files, total_files, "file done");
        }
        ProgressEvent::Overall {
            completed_files,
            total_files,
        } => {
            tracing::info!(completed_files, total_files, "overall");
            if !quiet {
                eprint!("\r{}/{} files", completed_files, total_files);
                if completed_files == total_files {
                    eprintln!();
                }
            }
        }
    }
}

fn display_error(err: &CopyError) {
    eprintln!("error: {}", err);
    if let Some(suggestion) = err.suggestion() {
        eprintln!("  hint: {}", suggestion);
    }
}
