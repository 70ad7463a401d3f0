use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use console::style;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

use filedash::auth::{self, Session, TokenStore};
use filedash::config::Config;
use filedash::workspace::{
    AutoConfirm, Confirmer, DirectorySink, FileRecord, FileSelection, Paging, PromptConfirm, Scope,
    SortBy, WorkspaceController, WorkspacePorts, DEFAULT_PAGE_SIZE,
};
use filedash::HttpFileApi;

/// Browse and manage files on a filedash storage backend.
#[derive(Parser, Debug)]
#[command(name = "filedash", version, about, long_about = None)]
struct Cli {
    /// Config file (defaults to the per-user config directory).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Store a bearer token. Without arguments, prints the login URL.
    Login {
        #[arg(long, conflicts_with = "callback_url")]
        token: Option<String>,
        /// Full URL the OAuth flow redirected to (contains `?token=`).
        #[arg(long)]
        callback_url: Option<String>,
    },
    /// Forget the stored token.
    Logout,
    /// Show the identity of the stored token.
    Whoami,
    /// List files.
    List(ListArgs),
    /// List the distinct file types of the current listing.
    Types(ListArgs),
    /// Upload up to 10 files in one batch.
    Upload {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Delete a file by id.
    Delete {
        id: String,
        /// Do not ask for confirmation.
        #[arg(short, long)]
        yes: bool,
    },
    /// Download a file by id into the download directory.
    Download {
        id: String,
        /// Save as this name. Without it the name is looked up in the first
        /// page of the listing (every user's files for admins).
        #[arg(long)]
        name: Option<String>,
    },
    /// Configuration helpers.
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Print the JSON schema of the config file.
    Schema,
    /// Print the effective configuration.
    Show,
}

#[derive(clap::Args, Debug)]
struct ListArgs {
    /// Search by file name.
    #[arg(long, conflicts_with = "content")]
    name: Option<String>,
    /// Search by file content.
    #[arg(long)]
    content: Option<String>,
    /// Only files of this type.
    #[arg(long = "type")]
    file_type: Option<String>,
    #[arg(long, value_enum, default_value_t = SortArg::Date)]
    sort: SortArg,
    /// Oldest / smallest first.
    #[arg(long)]
    asc: bool,
    /// Every user's files (admin only).
    #[arg(long)]
    all: bool,
    /// 1-based page of the listing.
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    page: u32,
    /// Files per page.
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE, value_parser = clap::value_parser!(u32).range(1..))]
    limit: u32,
}

#[derive(Clone, Copy, Debug, Default, ValueEnum)]
enum SortArg {
    #[default]
    Date,
    Size,
}

impl From<SortArg> for SortBy {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::Date => SortBy::Date,
            SortArg::Size => SortBy::Size,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    filedash::logging::init(&config.logging.level)?;
    debug!(base_url = %config.api.base_url, "Loaded configuration");

    let store = TokenStore::new(config.token_path());
    match cli.command {
        Commands::Login {
            token,
            callback_url,
        } => login(&config, &store, token, callback_url).await,
        Commands::Logout => {
            store.clear().await?;
            println!("Logged out");
            Ok(())
        }
        Commands::Whoami => {
            let session = resolve_session(&config, &store).await?.context("Not logged in")?;
            println!("{} <{}>", session.name(), session.email());
            println!("user id: {}", session.user_id());
            println!("role:    {}", session.role().as_str());
            Ok(())
        }
        Commands::List(args) => {
            let workspace = connect(&config, &store, Arc::new(PromptConfirm)).await?;
            load_listing(&workspace, &args).await?;
            render_files(&workspace.view());
            Ok(())
        }
        Commands::Types(args) => {
            let workspace = connect(&config, &store, Arc::new(PromptConfirm)).await?;
            load_listing(&workspace, &args).await?;
            for file_type in workspace.file_types() {
                if file_type.is_empty() {
                    println!("{}", style("(none)").dim());
                } else {
                    println!("{file_type}");
                }
            }
            Ok(())
        }
        Commands::Upload { paths } => {
            let mut selection = FileSelection::from_paths(&paths).await?;
            let workspace = connect(&config, &store, Arc::new(PromptConfirm)).await?;
            workspace.upload(&mut selection).await;
            check(&workspace)?;
            println!("Uploaded {} file(s)", paths.len());
            render_files(&workspace.view());
            Ok(())
        }
        Commands::Delete { id, yes } => {
            let confirmer: Arc<dyn Confirmer> = if yes {
                Arc::new(AutoConfirm(true))
            } else {
                Arc::new(PromptConfirm)
            };
            let workspace = connect(&config, &store, confirmer).await?;
            workspace.delete_file(&id).await;
            check(&workspace)?;
            render_files(&workspace.view());
            Ok(())
        }
        Commands::Download { id, name } => {
            let workspace = connect(&config, &store, Arc::new(PromptConfirm)).await?;
            let name = match name {
                Some(name) => name,
                None => resolve_name(&workspace, &id).await?,
            };
            let saved = workspace.download_file(&id, &name).await;
            check(&workspace)?;
            if let Some(path) = saved {
                println!("Saved {}", path.display());
            }
            Ok(())
        }
        Commands::Config { command } => match command {
            ConfigCommands::Schema => {
                println!("{}", Config::json_schema()?);
                Ok(())
            }
            ConfigCommands::Show => {
                print!("{}", toml::to_string_pretty(&config)?);
                Ok(())
            }
        },
    }
}

async fn login(
    config: &Config,
    store: &TokenStore,
    token: Option<String>,
    callback_url: Option<String>,
) -> Result<()> {
    let token = match (token, callback_url) {
        (Some(token), _) => token,
        (None, Some(url)) => auth::token_from_callback(&url).context("Callback URL has no token")?,
        (None, None) => {
            println!("Open this URL to sign in, then run `filedash login --callback-url <url>`:");
            println!("{}", auth::login_url(&config.api.base_url));
            return Ok(());
        }
    };
    let session = Session::from_token(&token).context("Token rejected")?;
    store.save(&token).await?;
    println!("Logged in as {} ({})", session.name(), session.role().as_str());
    Ok(())
}

async fn resolve_session(config: &Config, store: &TokenStore) -> Result<Option<Session>> {
    let token = match &config.token_override {
        Some(token) => Some(token.clone()),
        None => store.load().await?,
    };
    Ok(Session::resolve(token.as_deref()))
}

/// Builds the workspace without loading anything; each command issues its
/// own requests.
async fn connect(
    config: &Config,
    store: &TokenStore,
    confirmer: Arc<dyn Confirmer>,
) -> Result<WorkspaceController> {
    let session = resolve_session(config, store).await?.context("Not logged in")?;
    let ports = WorkspacePorts {
        api: Arc::new(HttpFileApi::new(
            &config.api.base_url,
            session.token(),
            config.request_timeout(),
        )?),
        confirmer,
        downloads: Arc::new(DirectorySink::new(config.download_dir())),
    };
    Ok(WorkspaceController::new(session, ports).with_request_timeout(config.request_timeout()))
}

/// Applies the list flags and loads the listing with a single request.
async fn load_listing(workspace: &WorkspaceController, args: &ListArgs) -> Result<()> {
    workspace.set_sort_by(args.sort.into());
    if args.asc {
        workspace.toggle_sort_order();
    }
    workspace.set_paging(Paging::page(args.page, args.limit));
    if let Some(file_type) = &args.file_type {
        workspace.set_type_filter(file_type.clone());
    }
    if let Some(term) = &args.name {
        workspace.set_filename_term(term.clone());
    }
    if let Some(term) = &args.content {
        workspace.set_content_term(term.clone());
    }

    if args.all {
        workspace.set_scope(Scope::All).await?;
    } else if args.name.is_some() {
        workspace.run_filename_search().await;
    } else if args.content.is_some() {
        workspace.run_content_search().await;
    } else {
        workspace.refresh().await;
    }
    check(workspace)
}

/// Finds the listed name of `id` on the first page of the caller's files,
/// then of every user's files when the session is an admin.
async fn resolve_name(workspace: &WorkspaceController, id: &str) -> Result<String> {
    workspace.refresh().await;
    check(workspace)?;
    if let Some(name) = listed_name(workspace, id) {
        return Ok(name);
    }
    if workspace.session().is_admin() {
        workspace.set_scope(Scope::All).await?;
        check(workspace)?;
        if let Some(name) = listed_name(workspace, id) {
            return Ok(name);
        }
    }
    bail!("File {id} is not among the first {DEFAULT_PAGE_SIZE} listed files; pass --name")
}

fn listed_name(workspace: &WorkspaceController, id: &str) -> Option<String> {
    workspace
        .state()
        .files
        .into_iter()
        .find(|f| f.id == id)
        .map(|f| f.name)
}

/// Turns the workspace error banner into a failing exit.
fn check(workspace: &WorkspaceController) -> Result<()> {
    match workspace.state().error {
        Some(banner) => bail!(banner),
        None => Ok(()),
    }
}

fn render_files(files: &[FileRecord]) {
    if files.is_empty() {
        println!("{}", style("No files").dim());
        return;
    }
    for file in files {
        let owner = file
            .owner
            .as_deref()
            .map(|o| format!("  {}", style(o).cyan()))
            .unwrap_or_default();
        println!(
            "{}  {}  {}  {:>10}  {}{}",
            style(&file.id).dim(),
            style(&file.name).bold(),
            file.file_type,
            human_size(file.size),
            file.created_at.as_str(),
            owner
        );
    }
}

fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}
