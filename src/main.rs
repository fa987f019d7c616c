use std::{
    env,
    io::{self, Write},
    path::PathBuf,
};

use anyhow::{bail, Context};
use clap::Parser;
use cmd::Commands;
use minigit::{
    repository::{
        object::Tree,
        workspace::{EntryOrder, ModePolicy},
    },
    ObjectKind, Oid, Repository,
};
use tracing_subscriber::EnvFilter;

mod cmd;

fn main() -> Result<(), anyhow::Error> {
    let cli = cmd::Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(io::stderr)
        .init();

    match &cli.command {
        Commands::Init { root_path } => {
            let root = match root_path {
                Some(root) => root.to_path_buf(),
                None => current_dir()?,
            };
            let repo = Repository::open(root);
            repo.init()
                .with_context(|| "Could not initialize repository")?;
            println!("Initialized git directory in {}", repo.git_dir().display());
        }
        Commands::CatFile { pretty, hash } => {
            if !pretty {
                bail!("Must pass -p to cat-file");
            }
            let repo = Repository::open(current_dir()?);
            let object = repo
                .read_object(&parse_oid(hash)?)
                .with_context(|| format!("Could not read object {hash}"))?;

            let mut stdout = io::stdout().lock();
            match object.kind {
                ObjectKind::Tree => {
                    for entry in Tree::parse(&object.data)?.entries() {
                        writeln!(stdout, "{entry}")?;
                    }
                }
                ObjectKind::Blob | ObjectKind::Commit => stdout.write_all(&object.data)?,
            }
        }
        Commands::HashObject { write, path } => {
            let repo = Repository::open(current_dir()?);
            let oid = repo
                .hash_object(path, *write)
                .with_context(|| format!("Could not hash {}", path.display()))?;
            println!("{oid}");
        }
        Commands::LsTree { name_only, hash } => {
            let repo = Repository::open(current_dir()?);
            let tree = repo
                .read_tree(&parse_oid(hash)?)
                .with_context(|| format!("Could not read tree {hash}"))?;

            let mut stdout = io::stdout().lock();
            for entry in tree.entries() {
                if *name_only {
                    writeln!(stdout, "{}", entry.name())?;
                } else {
                    writeln!(stdout, "{entry}")?;
                }
            }
        }
        Commands::WriteTree {
            sorted,
            normalize_modes,
        } => {
            let repo = Repository::open(current_dir()?);
            let order = if *sorted {
                EntryOrder::Canonical
            } else {
                EntryOrder::Filesystem
            };
            let modes = if *normalize_modes {
                ModePolicy::Normalized
            } else {
                ModePolicy::Permissions
            };
            let oid = repo
                .write_tree(order, modes)
                .with_context(|| "Could not write tree")?;
            println!("{oid}");
        }
        Commands::CommitTree {
            tree,
            parent,
            message,
        } => {
            let repo = Repository::open(current_dir()?);
            let parent = parent.as_deref().map(parse_oid).transpose()?;
            let oid = repo
                .commit_tree(parse_oid(tree)?, parent, message.to_owned())
                .with_context(|| "Could not create commit")?;
            println!("{oid}");
        }
    }

    Ok(())
}

fn current_dir() -> Result<PathBuf, anyhow::Error> {
    env::current_dir().with_context(|| "Can't get current working directory")
}

fn parse_oid(hash: &str) -> Result<Oid, anyhow::Error> {
    hash.parse::<Oid>()
        .with_context(|| format!("Invalid object hash '{hash}'"))
}
