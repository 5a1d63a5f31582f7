//! gitlet: a small local version-control system.
//!
//! # Usage
//!
//! ```bash
//! gitlet init
//! gitlet add hello.txt
//! gitlet commit "add hello"
//! gitlet branch feature
//! gitlet checkout feature
//! gitlet checkout -- hello.txt
//! gitlet checkout 3f2a91c -- hello.txt
//! gitlet merge master
//! gitlet add-remote origin ../other/.gitlet
//! gitlet pull origin master
//! ```
//!
//! Set `GITLET_LOG` (e.g. `GITLET_LOG=gitlet=debug`) for diagnostics on
//! stderr.

mod output;

use anyhow::Result;
use chrono::Local;
use clap::error::ErrorKind;
use clap::{Parser, Subcommand};
use gitlet_core::{GitletError, MergeOutcome, Repository};
use std::io::{self, Write};
use std::path::Path;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "gitlet")]
#[command(author = "Gitlet Contributors")]
#[command(version = "0.1.0")]
#[command(about = "A small local version-control system")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a repository in the current directory
    Init,

    /// Stage a file
    Add { file: String },

    /// Unstage a file, deleting it if the head commit tracks it
    Rm { file: String },

    /// Commit the staged snapshot
    Commit { message: Option<String> },

    /// Restore a file, or switch branches
    ///
    /// `checkout -- <file>`, `checkout <commit> -- <file>`, `checkout <branch>`
    Checkout {
        target: Option<String>,
        #[arg(last = true)]
        file: Vec<String>,
    },

    /// Check out a commit and move the current branch to it
    Reset { commit: String },

    /// First-parent history of the current branch
    Log,

    /// Every commit ever made
    GlobalLog,

    /// Ids of commits with the given message
    Find { message: String },

    Status,

    /// Create a branch at the head commit
    Branch { name: String },

    RmBranch { name: String },

    /// Merge a branch into the current branch
    Merge { branch: String },

    /// Register another repository's `.gitlet` directory
    AddRemote { name: String, path: String },

    RmRemote { name: String },

    /// Copy a remote branch into `<remote>/<branch>`
    Fetch { remote: String, branch: String },

    /// Publish the current branch to a remote branch
    Push { remote: String, branch: String },

    /// Fetch then merge `<remote>/<branch>`
    Pull { remote: String, branch: String },
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_env("GITLET_LOG").unwrap_or_else(|_| EnvFilter::new("gitlet=warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let stdout = io::stdout();
    let mut out = stdout.lock();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let message = match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                    let _ = err.print();
                    return ExitCode::SUCCESS;
                }
                ErrorKind::InvalidSubcommand => "No command with that name exists.",
                _ => "Incorrect operands.",
            };
            let _ = writeln!(out, "{}", message);
            return ExitCode::SUCCESS;
        }
    };
    let Some(command) = cli.command else {
        let _ = writeln!(out, "Please enter a command.");
        return ExitCode::SUCCESS;
    };

    let result = std::env::current_dir()
        .map_err(anyhow::Error::from)
        .and_then(|cwd| run(command, &cwd, &mut out));
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => match err.downcast_ref::<GitletError>() {
            Some(user) if !user.is_fatal() => {
                let _ = writeln!(out, "{}", user);
                ExitCode::SUCCESS
            }
            _ => {
                tracing::error!(error = %err, "command failed");
                eprintln!("fatal: {:#}", err);
                ExitCode::FAILURE
            }
        },
    }
}

fn run(command: Commands, work_dir: &Path, out: &mut dyn Write) -> Result<()> {
    if let Commands::Init = command {
        Repository::init(work_dir)?;
        return Ok(());
    }
    let mut repo = Repository::open(work_dir)?;

    match command {
        Commands::Init => Ok(()),
        Commands::Add { file } => {
            repo.add(&file)?;
            save(&repo)
        }
        Commands::Rm { file } => {
            repo.rm(&file)?;
            save(&repo)
        }
        Commands::Commit { message } => {
            repo.commit(message.as_deref().unwrap_or(""))?;
            save(&repo)
        }
        Commands::Checkout { target, file } => cmd_checkout(&mut repo, target, file, out),
        Commands::Reset { commit } => {
            repo.reset(&commit)?;
            save(&repo)
        }
        Commands::Log => cmd_log(&repo, out),
        Commands::GlobalLog => cmd_global_log(&repo, out),
        Commands::Find { message } => {
            for id in repo.find(&message)? {
                writeln!(out, "{}", id)?;
            }
            Ok(())
        }
        Commands::Status => output::write_status(out, &repo.status()?),
        Commands::Branch { name } => {
            repo.create_branch(&name)?;
            save(&repo)
        }
        Commands::RmBranch { name } => {
            repo.remove_branch(&name)?;
            save(&repo)
        }
        Commands::Merge { branch } => {
            let outcome = repo.merge(&branch)?;
            save(&repo)?;
            report_merge(&outcome, out)
        }
        Commands::AddRemote { name, path } => {
            repo.add_remote(&name, Path::new(&path))?;
            save(&repo)
        }
        Commands::RmRemote { name } => {
            repo.remove_remote(&name)?;
            save(&repo)
        }
        Commands::Fetch { remote, branch } => {
            let report = repo.fetch(&remote, &branch)?;
            tracing::debug!(
                branch = %report.branch,
                commits = report.stats.commits,
                blobs = report.stats.blobs,
                "fetch complete"
            );
            save(&repo)
        }
        Commands::Push { remote, branch } => {
            let report = repo.push(&remote, &branch)?;
            tracing::debug!(tip = %report.tip, commits = report.stats.commits, "push complete");
            Ok(())
        }
        Commands::Pull { remote, branch } => {
            let report = repo.pull(&remote, &branch)?;
            save(&repo)?;
            report_merge(&report.merge, out)
        }
    }
}

fn save(repo: &Repository) -> Result<()> {
    repo.save()?;
    Ok(())
}

/// Commit ids on the command line are lowercase hex
fn is_commit_id(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

fn cmd_checkout(
    repo: &mut Repository,
    target: Option<String>,
    file: Vec<String>,
    out: &mut dyn Write,
) -> Result<()> {
    match (target, file.as_slice()) {
        (None, [file]) => repo.checkout_file(file)?,
        (Some(id), [file]) if is_commit_id(&id) => repo.checkout_file_at(&id, file)?,
        (Some(branch), []) => {
            repo.checkout_branch(&branch)?;
            save(repo)?;
        }
        _ => writeln!(out, "Incorrect operands.")?,
    }
    Ok(())
}

fn cmd_log(repo: &Repository, out: &mut dyn Write) -> Result<()> {
    for commit in repo.log()? {
        output::write_log_entry(out, &commit, &Local)?;
    }
    Ok(())
}

fn cmd_global_log(repo: &Repository, out: &mut dyn Write) -> Result<()> {
    for commit in repo.global_log()? {
        output::write_log_entry(out, &commit, &Local)?;
    }
    Ok(())
}

fn report_merge(outcome: &MergeOutcome, out: &mut dyn Write) -> Result<()> {
    match outcome {
        MergeOutcome::FastForwarded(_) => writeln!(out, "Current branch fast-forwarded.")?,
        MergeOutcome::AlreadyAncestor => {
            writeln!(out, "Given branch is an ancestor of the current branch.")?
        }
        MergeOutcome::Merged { conflicts, .. } if !conflicts.is_empty() => {
            writeln!(out, "Encountered a merge conflict.")?
        }
        MergeOutcome::Merged { .. } => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_commit_id() {
        assert!(is_commit_id("3f2a91c"));
        assert!(is_commit_id("0123456789abcdef"));
        assert!(!is_commit_id(""));
        assert!(!is_commit_id("3F2A"));
        assert!(!is_commit_id("master"));
    }

    #[test]
    fn test_parse_checkout_forms() {
        let cli = Cli::try_parse_from(["gitlet", "checkout", "--", "a.txt"]).unwrap();
        let Some(Commands::Checkout { target, file }) = cli.command else {
            panic!("expected checkout");
        };
        assert_eq!(target, None);
        assert_eq!(file, vec!["a.txt"]);

        let cli = Cli::try_parse_from(["gitlet", "checkout", "abc123", "--", "a.txt"]).unwrap();
        let Some(Commands::Checkout { target, file }) = cli.command else {
            panic!("expected checkout");
        };
        assert_eq!(target.as_deref(), Some("abc123"));
        assert_eq!(file, vec!["a.txt"]);

        let cli = Cli::try_parse_from(["gitlet", "checkout", "dev"]).unwrap();
        let Some(Commands::Checkout { target, file }) = cli.command else {
            panic!("expected checkout");
        };
        assert_eq!(target.as_deref(), Some("dev"));
        assert!(file.is_empty());
    }

    #[test]
    fn test_parse_errors() {
        let err = Cli::try_parse_from(["gitlet", "frobnicate"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidSubcommand);
        let err = Cli::try_parse_from(["gitlet", "add"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
        let err = Cli::try_parse_from(["gitlet", "add", "a", "b"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownArgument);
        assert!(Cli::try_parse_from(["gitlet"]).unwrap().command.is_none());
    }
}
