// latex-proxy-client - main.rs
//
// Command-line entry point. Handles:
// 1. CLI argument parsing
// 2. Config loading and logging initialisation (debug mode support)
// 3. Wiring storage, session, API client, and store together
// 4. Running one command and reporting failures through the toast queue

use clap::{Parser, Subcommand, ValueEnum};
use latex_proxy_client::api::client::ApiClient;
use latex_proxy_client::api::transport::ReqwestTransport;
use latex_proxy_client::app::notifications::{self, show_toast};
use latex_proxy_client::app::session::Session;
use latex_proxy_client::app::store::AppStore;
use latex_proxy_client::app::sync;
use latex_proxy_client::core::model::{ToastType, User};
use latex_proxy_client::platform::config::{self, PlatformPaths};
use latex_proxy_client::platform::storage::{self, FileStorage, KeyValueStore};
use latex_proxy_client::util::{self, constants};
use std::path::PathBuf;
use std::sync::Arc;

/// latex-proxy - command-line client for the latex-proxy backend.
#[derive(Parser, Debug)]
#[command(name = "latex-proxy", version, about)]
struct Cli {
    /// Backend base URL (overridden by LATEX_PROXY_API_URL).
    #[arg(long = "api-url", global = true)]
    api_url: Option<String>,

    /// Directory holding the persisted token and UI state.
    #[arg(long = "data-dir", global = true)]
    data_dir: Option<PathBuf>,

    /// Enable debug logging (equivalent to RUST_LOG=debug).
    #[arg(short = 'd', long = "debug", global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in and remember the token.
    Login {
        login: String,
        #[arg(short, long)]
        password: String,
    },
    /// Create an account and sign in with it.
    Register {
        login: String,
        #[arg(short, long)]
        password: String,
    },
    /// Forget the stored token.
    Logout,
    /// Show the signed-in user.
    Whoami,
    /// List profiles; the selected one is marked with '*'.
    Profiles,
    /// Make a profile active on the server and select it locally.
    Select { profile_id: String },
    /// List the tabs of the selected profile.
    Tabs,
    /// Show a page of the request log.
    Logs {
        #[arg(short, long, default_value_t = constants::DEFAULT_LOG_PAGE)]
        page: u32,
    },
    /// Turn request logging on or off.
    Logging { state: Switch },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Switch {
    On,
    Off,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    let platform_paths = PlatformPaths::resolve();
    let (mut app_config, mut warnings) = config::load_config(&platform_paths.config_dir);
    app_config.apply_base_url_overrides(
        std::env::var(constants::API_BASE_URL_ENV).ok(),
        cli.api_url.as_deref(),
        &mut warnings,
    );

    util::logging::init(
        cli.debug,
        app_config.log_level.as_deref(),
        app_config.log_file.as_deref(),
    );

    tracing::info!(
        version = constants::APP_VERSION,
        debug = cli.debug,
        api = %app_config.api_base_url,
        "latex-proxy starting"
    );
    for warning in &warnings {
        tracing::warn!("{}", warning);
    }

    let data_dir = cli.data_dir.clone().unwrap_or(platform_paths.data_dir);
    let storage: Arc<dyn KeyValueStore> =
        Arc::new(FileStorage::open(&storage::storage_path(&data_dir)));
    let session = Arc::new(Session::new(storage));

    let transport = match ReqwestTransport::new() {
        Ok(t) => Arc::new(t),
        Err(e) => {
            tracing::error!(error = %e, "Cannot build HTTP client");
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };
    let api = ApiClient::new(&app_config.api_base_url, session.clone(), transport);
    let mut store = AppStore::new(session);

    let succeeded = match run(cli.command, &api, &mut store).await {
        Ok(()) => true,
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            show_toast(ToastType::Error, &e.message(), None);
            false
        }
    };

    for toast in notifications::drain_global() {
        eprintln!("[{}] {}", toast.kind, toast.message);
    }

    if !succeeded {
        std::process::exit(1);
    }
}

async fn run(
    command: Command,
    api: &ApiClient,
    store: &mut AppStore,
) -> Result<(), latex_proxy_client::util::error::ApiError> {
    match command {
        Command::Login { login, password } => {
            let user = sync::sign_in(api, store, &login, &password).await?;
            show_toast(ToastType::Success, &format!("Signed in as {}", user.login), None);
        }
        Command::Register { login, password } => {
            let user = sync::sign_up(api, store, &login, &password).await?;
            show_toast(ToastType::Success, &format!("Registered {}", user.login), None);
        }
        Command::Logout => {
            sync::sign_out(store);
            show_toast(ToastType::Info, "Signed out", None);
        }
        Command::Whoami => {
            require_login(store)?;
            let user = api.get_user().await?;
            print_user(&user);
            store.set_user(Some(user));
        }
        Command::Profiles => {
            require_login(store)?;
            sync::refresh(api, store).await?;
            let state = store.snapshot();
            if state.profiles.is_empty() {
                println!("No profiles.");
            }
            for profile in &state.profiles {
                let marker = if state.selected_profile_id.as_deref() == Some(profile.id.as_str()) {
                    '*'
                } else {
                    ' '
                };
                println!(
                    "{marker} {:<24} {:<32} {} tab(s)",
                    profile.id,
                    profile.name,
                    profile.tabs.len()
                );
            }
        }
        Command::Select { profile_id } => {
            require_login(store)?;
            sync::select_profile(api, store, &profile_id).await?;
            show_toast(ToastType::Success, &format!("Selected profile {profile_id}"), None);
        }
        Command::Tabs => {
            require_login(store)?;
            sync::refresh(api, store).await?;
            match store.current_profile() {
                None => println!("No profile selected."),
                Some(profile) => {
                    let active = profile.active_tab_id.as_deref();
                    for tab in &profile.tabs {
                        let marker = if Some(tab.id.as_str()) == active { '*' } else { ' ' };
                        let state = if tab.enabled { "on " } else { "off" };
                        println!("{marker} [{state}] {:<6} {}", tab.role, tab.title);
                    }
                }
            }
        }
        Command::Logs { page } => {
            require_login(store)?;
            let logs = api.get_logs(page).await?;
            println!(
                "Page {}/{} ({} request(s) total)",
                logs.page, logs.total_pages, logs.total
            );
            for entry in &logs.logs {
                println!(
                    "{}  {:<5} {:<24} {}",
                    entry.created_at.format("%Y-%m-%d %H:%M:%S"),
                    entry.status.map(|s| s.to_string()).unwrap_or_else(|| "-".to_string()),
                    entry.model.as_deref().unwrap_or("-"),
                    entry.error.as_deref().unwrap_or("")
                );
            }
        }
        Command::Logging { state } => {
            require_login(store)?;
            let enabled = matches!(state, Switch::On);
            sync::set_logging(api, store, enabled).await?;
            let label = if enabled { "enabled" } else { "disabled" };
            show_toast(ToastType::Success, &format!("Request logging {label}"), None);
        }
    }
    Ok(())
}

/// Fail early with the same message shape the backend uses for 401s.
fn require_login(store: &AppStore) -> Result<(), latex_proxy_client::util::error::ApiError> {
    if store.state().is_authenticated() {
        return Ok(());
    }
    Err(latex_proxy_client::util::error::ApiError::Request {
        status: 401,
        message: "Not signed in. Run `latex-proxy login <name> --password <pw>` first.".to_string(),
    })
}

fn print_user(user: &User) {
    println!("{} ({})", user.login, user.id);
    println!(
        "  active profile: {}",
        user.active_profile_id.as_deref().unwrap_or("-")
    );
    println!(
        "  request logging: {}",
        if user.logging_enabled { "on" } else { "off" }
    );
    println!("  member since: {}", user.created_at.format("%Y-%m-%d"));
}
