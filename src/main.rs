//! Board CLI - Lightweight task-board client
//!
//! Boards, lists and cards from the terminal, over the board REST API.

mod api;
mod auth;
mod config;
mod models;
#[cfg(test)]
mod testing;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api::client::ApiClient;
use auth::navigator::{LOGIN_PATH, REGISTER_PATH};
use auth::SessionNavigator;
use config::Config;
use models::UserProfile;

#[derive(Parser)]
#[command(name = "board-cli")]
#[command(about = "Lightweight CLI client for a Kanban task board", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in with email and password
    Login {
        #[arg(short, long)]
        email: String,

        /// Password (prompted from stdin if omitted; typed input is echoed)
        #[arg(short, long, env = "BOARD_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Create an account and log in
    Register {
        #[arg(short, long)]
        name: String,

        #[arg(short, long)]
        email: String,

        /// Password (prompted from stdin if omitted; typed input is echoed)
        #[arg(short, long, env = "BOARD_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Use a token issued by the identity provider
    ImportToken {
        /// The provider's ID token (JWT)
        token: String,

        #[arg(long)]
        email: String,

        #[arg(long)]
        name: Option<String>,

        /// Provider user id
        #[arg(long)]
        id: Option<String>,
    },

    /// Log out and clear cached credentials
    Logout,

    /// Show current authentication status
    Status,

    /// Show the signed-in user
    Whoami {
        /// Fetch the profile from the server and update the cache
        #[arg(long)]
        remote: bool,
    },

    /// Show effective configuration
    Config {
        /// Write the effective configuration to the config file
        #[arg(long)]
        init: bool,
    },

    #[command(flatten)]
    Resource(BoardCommand),
}

/// Commands that work on boards, lists, cards and users
#[derive(Subcommand)]
enum BoardCommand {
    /// List boards
    Boards {
        /// Only boards you own
        #[arg(long)]
        mine: bool,
    },

    /// Show a board with its lists and cards
    Board { id: i64 },

    /// Create a board (default lists are added by the server)
    BoardCreate {
        name: String,

        #[arg(long)]
        private: bool,
    },

    /// Rename a board
    BoardRename { id: i64, name: String },

    /// Delete a board
    BoardDelete { id: i64 },

    /// List all lists
    Lists,

    /// Show a list and its cards
    ListShow { id: i64 },

    /// Add a list to a board
    ListCreate { board_id: i64, name: String },

    /// Rename a list
    ListRename { id: i64, name: String },

    /// Delete a list
    ListDelete { id: i64 },

    /// List all cards with their state
    Cards,

    /// Create a card in a "To Do" list
    CardCreate {
        list_id: i64,
        title: String,

        #[arg(short, long)]
        label: Option<String>,
    },

    /// Show a card and its activity log
    CardShow { id: i64 },

    /// Delete a card
    CardDelete { id: i64 },

    /// Move a card to another list (id or name) on its board
    CardMove {
        id: i64,

        /// Board the card lives on
        #[arg(short, long)]
        board: i64,

        /// Target list id or name
        #[arg(short, long)]
        to: String,
    },

    /// Set a card's workflow state
    CardTransition { id: i64, state: String },

    /// Assign a card to a user, or unassign it
    CardAssign {
        id: i64,

        /// User id; omit to unassign
        #[arg(short, long)]
        user: Option<String>,
    },

    /// Change a card's title and/or label
    CardEdit {
        id: i64,

        #[arg(short, long)]
        title: Option<String>,

        #[arg(short, long)]
        label: Option<String>,
    },

    /// Show a card's activity log
    CardHistory { id: i64 },

    /// List users
    Users,

    /// Change a user's name and/or email
    UserUpdate {
        id: String,

        #[arg(short, long)]
        name: Option<String>,

        #[arg(short, long)]
        email: Option<String>,
    },
}

fn read_password(given: Option<String>) -> Result<String> {
    if let Some(p) = given {
        return Ok(p);
    }
    eprint!("Password: ");
    let mut line = String::new();
    std::io::stdin()
        .read_line(&mut line)
        .context("Failed to read password")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let start_path = match cli.command {
        Commands::Login { .. } => LOGIN_PATH,
        Commands::Register { .. } => REGISTER_PATH,
        _ => "/boards",
    };
    let navigator = Arc::new(SessionNavigator::new(start_path));

    match cli.command {
        Commands::Login { email, password } => {
            tracing::info!("Logging in...");
            let password = read_password(password)?;
            let client = ApiClient::from_env(navigator.clone())?;
            let profile = auth::session::login(&client, &navigator, &email, &password).await?;
            println!("Logged in as {} <{}>.", profile.name, profile.email);
        }
        Commands::Register {
            name,
            email,
            password,
        } => {
            let password = read_password(password)?;
            let client = ApiClient::from_env(navigator.clone())?;
            let profile =
                auth::session::register(&client, &navigator, &name, &email, &password).await?;
            println!("Registered and logged in as {} <{}>.", profile.name, profile.email);
        }
        Commands::ImportToken {
            token,
            email,
            name,
            id,
        } => {
            let client = ApiClient::from_env(navigator.clone())?;
            let mut profile = UserProfile::from_email(&email);
            if let Some(name) = name {
                profile.name = name;
            }
            profile.id = id;
            auth::session::import_token(client.store().as_ref(), &token, profile)?;
            println!("Token stored.");
        }
        Commands::Logout => {
            tracing::info!("Logging out...");
            let store = auth::tokens::default_store();
            auth::session::logout(store.as_ref());
        }
        Commands::Status => {
            let config = Config::load()?;
            let store = auth::tokens::default_store();
            auth::session::status(store.as_ref(), &config);
        }
        Commands::Whoami { remote } => {
            let client = ApiClient::from_env(navigator)?;
            auth::session::whoami(&client, remote).await?;
        }
        Commands::Config { init } => {
            let config = Config::load()?;
            if init {
                config.save()?;
                println!("Wrote {}", Config::config_path()?.display());
            }
            println!("Config file:      {}", Config::config_path()?.display());
            println!("Credentials file: {}", Config::credentials_path()?.display());
            print!("{}", toml::to_string_pretty(&config).context("Failed to serialize config")?);
        }
        Commands::Resource(command) => {
            let client = ApiClient::from_env(navigator)?;
            run_board_command(&client, command).await?;
        }
    }

    Ok(())
}

async fn run_board_command(client: &ApiClient, command: BoardCommand) -> Result<()> {
    match command {
        BoardCommand::Boards { mine } => api::list_boards(client, mine).await,
        BoardCommand::Board { id } => api::show_board(client, id).await,
        BoardCommand::BoardCreate { name, private } => {
            api::create_board(client, &name, private).await
        }
        BoardCommand::BoardRename { id, name } => api::rename_board(client, id, &name).await,
        BoardCommand::BoardDelete { id } => api::delete_board(client, id).await,
        BoardCommand::Lists => api::list_lists(client).await,
        BoardCommand::ListShow { id } => api::show_list(client, id).await,
        BoardCommand::ListCreate { board_id, name } => {
            api::create_list(client, board_id, &name).await
        }
        BoardCommand::ListRename { id, name } => api::rename_list(client, id, &name).await,
        BoardCommand::ListDelete { id } => api::delete_list(client, id).await,
        BoardCommand::Cards => api::list_cards(client).await,
        BoardCommand::CardCreate {
            list_id,
            title,
            label,
        } => api::create_card(client, list_id, &title, label.as_deref()).await,
        BoardCommand::CardShow { id } => api::show_card(client, id).await,
        BoardCommand::CardDelete { id } => api::delete_card(client, id).await,
        BoardCommand::CardMove { id, board, to } => api::move_card(client, board, id, &to).await,
        BoardCommand::CardTransition { id, state } => {
            api::transition_card(client, id, &state).await
        }
        BoardCommand::CardAssign { id, user } => {
            api::assign_card(client, id, user.as_deref()).await
        }
        BoardCommand::CardEdit { id, title, label } => {
            api::edit_card(client, id, title.as_deref(), label.as_deref()).await
        }
        BoardCommand::CardHistory { id } => api::card_history(client, id).await,
        BoardCommand::Users => api::list_users(client).await,
        BoardCommand::UserUpdate { id, name, email } => {
            api::update_user(client, &id, name.as_deref(), email.as_deref()).await
        }
    }
}
