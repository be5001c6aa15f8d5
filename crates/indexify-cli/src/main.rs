#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::doc_markdown)]

mod commands;
mod logging;

use clap::Parser;
use indexify_core::{MarkerMode, RewriteOptions};
use miette::Result;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "indexify")]
#[command(author, version, about = "Rewrite directory imports to explicit index.js entries", long_about = None)]
struct Cli {
    /// Increase logging verbosity (-v for DEBUG, -vv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit JSON formatted output (stable, machine-readable)
    #[arg(long, global = true)]
    json: bool,

    /// Override the working directory
    #[arg(long, global = true, value_name = "PATH")]
    cwd: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every command that resolves imports.
#[derive(clap::Args, Debug, Clone)]
struct ResolveFlags {
    /// Config file (default: indexify.config.json or .indexifyrc.json in the working directory)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Dependency directory name, or an absolute local package root
    #[arg(long, value_name = "DIR")]
    modules_dir: Option<String>,

    /// Only rewrite bare imports of declared peer dependencies
    #[arg(long)]
    peer_only: bool,

    /// Log every rewrite decision
    #[arg(long, env = "INDEXIFY_VERBOSE")]
    log_decisions: bool,

    /// Dump scenario metadata for every import
    #[arg(long, env = "INDEXIFY_DEBUG")]
    debug: bool,
}

impl ResolveFlags {
    fn overrides(&self) -> RewriteOptions {
        let mut options = RewriteOptions::new()
            .with_peer_only(self.peer_only)
            .with_verbose(self.log_decisions)
            .with_debug(self.debug);
        if let Some(dir) = &self.modules_dir {
            options = options.with_modules_dir(dir.clone());
        }
        options
    }
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Rewrite directory imports in source files
    Rewrite {
        /// Files or directories to process (default: the working directory)
        paths: Vec<PathBuf>,

        /// Write changed files and markers (default is a dry run)
        #[arg(long)]
        write: bool,

        /// Ignore existing markers and write none
        #[arg(long)]
        force: bool,

        /// Honor existing markers but write none
        #[arg(long)]
        no_marks: bool,

        /// Marker addressing: one per file and source, or one per resolved directory
        #[arg(long, value_name = "MODE")]
        marker_mode: Option<MarkerMode>,

        /// Also process files inside dependency directories
        #[arg(long)]
        include_node_modules: bool,

        #[command(flatten)]
        resolve: ResolveFlags,
    },

    /// Explain how one import specifier is classified
    Explain {
        /// Import source, e.g. "lodash/utils" or "./components"
        specifier: String,

        /// File the import appears in (default: <cwd>/index.js)
        #[arg(long, value_name = "FILE")]
        from: Option<PathBuf>,

        #[command(flatten)]
        resolve: ResolveFlags,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let cwd = cli
        .cwd
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."));

    match cli.command {
        Commands::Rewrite {
            paths,
            write,
            force,
            no_marks,
            marker_mode,
            include_node_modules,
            resolve,
        } => {
            let mut overrides = resolve
                .overrides()
                .with_force(force)
                .with_no_marks(no_marks);
            if let Some(mode) = marker_mode {
                overrides = overrides.with_marker_mode(mode);
            }
            let args = commands::rewrite::RewriteArgs {
                paths,
                write,
                include_node_modules,
                config: resolve.config,
                overrides,
            };
            commands::rewrite::run(&cwd, &args, cli.verbose, cli.json)
        }
        Commands::Explain {
            specifier,
            from,
            resolve,
        } => {
            let overrides = resolve.overrides();
            commands::explain::run(
                &cwd,
                &specifier,
                from.as_deref(),
                resolve.config.as_deref(),
                &overrides,
                cli.verbose,
                cli.json,
            )
        }
    }
}
