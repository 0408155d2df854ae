/*!
 * sandboxctl - Sandboxed Storage Command Line
 *
 * Drives the broker over a local directory with the simulated token API:
 * - Grant and list bookmarks
 * - Read, write and list items under held scopes
 * - Console picker for access recovery
 */

use anyhow::Context;
use clap::{Parser, Subcommand};
use dialoguer::{Error as DialoguerError, Input};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use sandboxed_storage::{
    init_tracing, AccessDenialResponse, BrokerConfig, BrokerResult, FileSystem, LocalFS,
    NativePicker, PickerRequest, SandboxBroker, SandboxedFs, SimulatedPlatform, StorageItem,
};

/// File holding persisted bookmarks when no preferences path is configured
const DEFAULT_PREFERENCES_FILE: &str = ".sandboxctl-preferences.json";

#[derive(Parser)]
#[command(name = "sandboxctl")]
#[command(version)]
#[command(about = "Security-scoped bookmark broker over a local directory")]
struct Cli {
    /// Access denial response for items without their own
    #[arg(long, global = true)]
    policy: Option<AccessDenialResponse>,

    /// Directory the broker's paths are rooted in
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Grant access to a path, as a picker selection would, and bookmark it
    Grant {
        path: PathBuf,
        #[arg(long)]
        folder: bool,
    },
    /// List persisted bookmarks
    Bookmarks,
    /// Remove the bookmark for a path
    Forget { path: PathBuf },
    /// Print a file
    Read { path: PathBuf },
    /// Replace a file's contents
    Write { path: PathBuf, text: String },
    /// List a folder
    Ls {
        folder: PathBuf,
        #[arg(short, long)]
        pattern: Option<String>,
    },
}

impl Command {
    /// Anchor relative paths at the storage root
    fn rooted(self) -> Self {
        let root = |path: PathBuf| Path::new("/").join(path);
        match self {
            Command::Grant { path, folder } => Command::Grant {
                path: root(path),
                folder,
            },
            Command::Bookmarks => Command::Bookmarks,
            Command::Forget { path } => Command::Forget { path: root(path) },
            Command::Read { path } => Command::Read { path: root(path) },
            Command::Write { path, text } => Command::Write {
                path: root(path),
                text,
            },
            Command::Ls { folder, pattern } => Command::Ls {
                folder: root(folder),
                pattern,
            },
        }
    }
}

/// Picker answered on the terminal
///
/// The typed path is granted on the simulated platform, as a real picker
/// selection would be.
struct ConsolePicker {
    platform: Arc<SimulatedPlatform>,
}

impl NativePicker for ConsolePicker {
    fn pick(&self, request: &PickerRequest) -> Option<PathBuf> {
        let initial = match &request.suggested_name {
            Some(name) => request.starting_path.join(name),
            None => request.starting_path.clone(),
        };

        let answer: String = match Input::new()
            .with_prompt(format!("{} ({})", request.prompt, request.kind))
            .with_initial_text(initial.display().to_string())
            .allow_empty(true)
            .interact_text()
        {
            Ok(value) => value,
            Err(DialoguerError::IO(err)) if err.kind() == ErrorKind::Interrupted => return None,
            Err(err) => {
                tracing::warn!(error = %err, "console picker failed");
                return None;
            }
        };

        let answer = answer.trim();
        if answer.is_empty() {
            return None;
        }
        let selected = PathBuf::from(answer);
        self.platform.grant(&selected);
        Some(selected)
    }
}

fn build_broker(cli: &Cli) -> BrokerResult<(Arc<SimulatedPlatform>, SandboxBroker)> {
    let mut config = BrokerConfig::from_env()?;
    if let Some(policy) = cli.policy {
        config = config.with_default_policy(policy);
    }
    if let Some(root) = &cli.root {
        config = config.with_storage_root(root);
    }
    if config.preferences_path.is_none() {
        let path = config.storage_root.join(DEFAULT_PREFERENCES_FILE);
        config = config.with_preferences_path(path);
    }

    let local: Arc<dyn FileSystem> = Arc::new(LocalFS::new(&config.storage_root));
    let platform = Arc::new(SimulatedPlatform::with_filesystem(local.clone()));
    let filesystem = Arc::new(SandboxedFs::new(local, platform.clone()));

    let broker = SandboxBroker::builder()
        .with_config(config)
        .platform(platform.clone())
        .filesystem(filesystem)
        .picker(Arc::new(ConsolePicker {
            platform: platform.clone(),
        }))
        .build()?;
    Ok((platform, broker))
}

async fn run(platform: &SimulatedPlatform, broker: &SandboxBroker, command: Command) -> BrokerResult<()> {
    match command {
        Command::Grant { path, folder } => {
            platform.grant(&path);
            let kind = if folder { "folder" } else { "file" };
            match broker.get_or_create_bookmark(&path) {
                Some(bookmark) => println!(
                    "granted {} {} ({} byte token)",
                    kind,
                    bookmark.handle,
                    bookmark.token.len()
                ),
                None => println!("{} could not be bookmarked", path.display()),
            }
        }
        Command::Bookmarks => {
            let records = broker.bookmarks();
            if records.is_empty() {
                println!("no bookmarks");
            }
            for record in records {
                println!("{}\t{} bytes", record.path, record.token.len());
            }
        }
        Command::Forget { path } => {
            if broker.forget_bookmark(&path)? {
                println!("forgot {}", path.display());
            } else {
                println!("no bookmark for {}", path.display());
            }
        }
        Command::Read { path } => {
            let mut file = StorageItem::file(&path);
            match broker.read_text(&mut file).await? {
                Some(text) => print!("{}", text),
                None => eprintln!("access to {} was denied", path.display()),
            }
        }
        Command::Write { path, text } => {
            let mut file = StorageItem::file(&path);
            if broker.write_text(&mut file, &text).await? {
                println!("wrote {} bytes to {}", text.len(), file.path().display());
            } else {
                eprintln!("access to {} was denied", path.display());
            }
        }
        Command::Ls { folder, pattern } => {
            let mut folder = StorageItem::folder(&folder);
            match broker.items(&mut folder, pattern.as_deref()).await? {
                Some(items) => {
                    for item in items {
                        let suffix = if item.is_folder() { "/" } else { "" };
                        println!("{}{}", item.name(), suffix);
                    }
                }
                None => eprintln!("access to {} was denied", folder.path().display()),
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let (platform, broker) = build_broker(&cli).context("failed to start the sandbox broker")?;
    info!(root = %broker.config().storage_root.display(), "sandboxctl ready");

    if let Err(e) = run(&platform, &broker, cli.command.rooted()).await {
        eprintln!("{:?}", miette::Report::new(e));
        std::process::exit(1);
    }
    Ok(())
}
