//! treesync CLI - Command line interface for treesync
//!
//! Snapshots directories into Git-compatible trees, diffs and patches tree
//! snapshots, encodes Git deltas, and pulls replicas from an HTTP peer.

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use treesync::{
    delta, ChangeSet, EntryMode, FlatTree, Hash, LoggingConfig, ReadonlyTree, WriteableTree,
};
use walkdir::WalkDir;

#[derive(Parser)]
#[command(name = "treesync")]
#[command(about = "Git-compatible content trees, deltas and replica sync")]
#[command(version)]
struct Cli {
    /// Output format (json or text)
    #[arg(short, long, default_value = "json")]
    format: OutputFormat,

    /// Log level for stderr diagnostics
    #[arg(long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
enum OutputFormat {
    Json,
    Text,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the Git blob id of a file
    HashObject {
        /// File to hash
        file: PathBuf,
    },

    /// Walk a directory into a flat tree
    Snapshot {
        /// Directory to snapshot
        dir: PathBuf,
        /// Write the flat tree here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Check every sha declared by a flat tree file
    Verify {
        /// Flat tree JSON file
        tree: PathBuf,
    },

    /// Print the change-set turning one flat tree into another
    Diff {
        /// Starting flat tree
        from: PathBuf,
        /// Target flat tree
        to: PathBuf,
    },

    /// Apply a change-set to a flat tree
    Apply {
        /// Flat tree the changes start from
        tree: PathBuf,
        /// Change-set JSON file
        changes: PathBuf,
        /// Write the resulting flat tree here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    // === Delta Commands ===
    /// Git delta encoding of blob content
    #[command(subcommand)]
    Delta(DeltaCommands),

    // === Sync Commands ===
    /// Pull a replica from an HTTP peer
    Pull {
        /// Replica state file, created if missing
        #[arg(short, long, default_value = "replica.json")]
        state: PathBuf,
        /// Peer URL (defaults to TREESYNC_REMOTE_URL)
        #[arg(short, long)]
        url: Option<String>,
    },
}

#[derive(Subcommand)]
enum DeltaCommands {
    /// Encode `target` as a delta against `base`
    Create {
        base: PathBuf,
        target: PathBuf,
        /// Delta output file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Rebuild a target from `base` and a delta
    Apply {
        base: PathBuf,
        delta: PathBuf,
        /// Reconstructed output file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Show the lengths declared by a delta header
    Info { delta: PathBuf },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    treesync::init_logging(&LoggingConfig {
        level: cli.log_level.clone(),
        ..Default::default()
    })?;

    match cli.command {
        Commands::HashObject { file } => {
            let data = fs::read(&file).with_context(|| format!("reading {}", file.display()))?;
            output(
                cli.format,
                &serde_json::json!({
                    "sha": Hash::blob(&data),
                    "size": data.len(),
                }),
            )?;
        }

        Commands::Snapshot { dir, output: out } => {
            let tree = snapshot(&dir)?;
            let flat = tree.flat();
            match out {
                Some(path) => {
                    write_json(&path, &flat)?;
                    output(
                        cli.format,
                        &serde_json::json!({
                            "status": "ok",
                            "sha": tree.sha(),
                            "entries": flat.tree.len(),
                        }),
                    )?;
                }
                None => output(cli.format, &flat)?,
            }
        }

        Commands::Verify { tree } => {
            let flat: FlatTree = read_json(&tree)?;
            let tree = ReadonlyTree::from_flat(&flat)?;
            output(
                cli.format,
                &serde_json::json!({
                    "status": "ok",
                    "sha": tree.sha(),
                    "leaves": tree.iter().count(),
                }),
            )?;
        }

        Commands::Diff { from, to } => {
            let from = ReadonlyTree::from_flat(&read_json(&from)?)?;
            let to = ReadonlyTree::from_flat(&read_json(&to)?)?;
            output(cli.format, &from.diff(&to))?;
        }

        Commands::Apply {
            tree,
            changes,
            output: out,
        } => {
            let tree = ReadonlyTree::from_flat(&read_json(&tree)?)?;
            let changes: ChangeSet = read_json(&changes)?;
            let result = tree.with_changes(&changes)?;
            match out {
                Some(path) => {
                    write_json(&path, &result.flat())?;
                    output(
                        cli.format,
                        &serde_json::json!({
                            "status": "ok",
                            "from": tree.sha(),
                            "sha": result.sha(),
                            "added": changes.added_count(),
                            "removed": changes.removed_count(),
                        }),
                    )?;
                }
                None => output(cli.format, &result.flat())?,
            }
        }

        Commands::Delta(DeltaCommands::Create {
            base,
            target,
            output: out,
        }) => {
            let base = read_bytes(&base)?;
            let target = read_bytes(&target)?;
            let encoded = delta::create(&base, &target);
            fs::write(&out, &encoded).with_context(|| format!("writing {}", out.display()))?;
            output(
                cli.format,
                &serde_json::json!({
                    "status": "ok",
                    "base_len": base.len(),
                    "result_len": target.len(),
                    "delta_len": encoded.len(),
                }),
            )?;
        }

        Commands::Delta(DeltaCommands::Apply {
            base,
            delta: delta_path,
            output: out,
        }) => {
            let base = read_bytes(&base)?;
            let encoded = read_bytes(&delta_path)?;
            let result = delta::apply(&base, &encoded)?;
            fs::write(&out, &result).with_context(|| format!("writing {}", out.display()))?;
            output(
                cli.format,
                &serde_json::json!({
                    "status": "ok",
                    "sha": Hash::blob(&result),
                    "size": result.len(),
                }),
            )?;
        }

        Commands::Delta(DeltaCommands::Info { delta: delta_path }) => {
            let encoded = read_bytes(&delta_path)?;
            let (base_len, result_len) = delta::header(&encoded)?;
            output(
                cli.format,
                &serde_json::json!({
                    "base_len": base_len,
                    "result_len": result_len,
                    "delta_len": encoded.len(),
                }),
            )?;
        }

        Commands::Pull { state, url } => {
            let summary = pull(&state, url)?;
            output(cli.format, &summary)?;
        }
    }

    Ok(())
}

// === Helpers ===

#[cfg(feature = "sync")]
fn pull(state: &Path, url: Option<String>) -> anyhow::Result<serde_json::Value> {
    use treesync::{HttpPeer, Replica, SyncConfig};

    let mut config = SyncConfig::from_env()?;
    if let Some(url) = url {
        config = config.with_url(url);
    }
    let peer = HttpPeer::new(config)?;

    let mut replica = if state.exists() {
        Replica::from_state(&read_json(state)?)?
    } else {
        Replica::new()
    };
    let result = replica.pull(&peer)?;
    if result.changed() {
        write_json(state, &replica.state())?;
    }
    Ok(serde_json::json!({
        "status": "ok",
        "result": result,
        "sha": replica.tree().sha(),
    }))
}

#[cfg(not(feature = "sync"))]
fn pull(_state: &Path, _url: Option<String>) -> anyhow::Result<serde_json::Value> {
    anyhow::bail!("treesync was built without the `sync` feature")
}

/// Build a tree from every file below `dir`, skipping `.git`
fn snapshot(dir: &Path) -> anyhow::Result<ReadonlyTree> {
    let mut tree = WriteableTree::new();
    let walker = WalkDir::new(dir)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || e.file_name() != ".git");

    for entry in walker {
        let entry = entry?;
        let file_type = entry.file_type();
        if file_type.is_dir() {
            continue;
        }

        let relative = entry.path().strip_prefix(dir)?;
        let segments: Vec<&str> = relative
            .components()
            .map(|c| {
                c.as_os_str()
                    .to_str()
                    .ok_or_else(|| anyhow::anyhow!("non UTF-8 path: {}", relative.display()))
            })
            .collect::<anyhow::Result<_>>()?;
        let path = segments.join("/");

        let (sha, mode) = if file_type.is_symlink() {
            let target = fs::read_link(entry.path())?;
            let target = target.to_string_lossy();
            (Hash::blob(target.as_bytes()), EntryMode::Symlink)
        } else {
            let data = fs::read(entry.path())?;
            (Hash::blob(&data), file_mode(&entry.metadata()?))
        };
        tree.add(&path, sha, mode)?;
    }

    Ok(tree.compile())
}

#[cfg(unix)]
fn file_mode(metadata: &fs::Metadata) -> EntryMode {
    use std::os::unix::fs::PermissionsExt;
    if metadata.permissions().mode() & 0o111 != 0 {
        EntryMode::Executable
    } else {
        EntryMode::File
    }
}

#[cfg(not(unix))]
fn file_mode(_metadata: &fs::Metadata) -> EntryMode {
    EntryMode::File
}

fn read_bytes(path: &Path) -> anyhow::Result<Vec<u8>> {
    fs::read(path).with_context(|| format!("reading {}", path.display()))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let content =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("parsing {}", path.display()))
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> anyhow::Result<()> {
    let content = serde_json::to_string_pretty(value)?;
    fs::write(path, content).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

fn output<T: Serialize>(format: OutputFormat, value: &T) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string(value)?),
        OutputFormat::Text => println!("{}", serde_json::to_string_pretty(value)?),
    }
    Ok(())
}
