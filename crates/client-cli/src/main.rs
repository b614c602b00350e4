use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use shared::{
    api_priority_from_ui, api_status_from_ui, ui_priority_from_api, ui_status_from_api,
    AiSuggestion, Todo, TodoFilters, TodoInput, UiPriority, UiStatus,
};
use taskdeck::client::ApiClient;
use taskdeck::config::{Config, DismissalMode};
use taskdeck::poller::{visibility_channel, SuggestionPoller};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "taskdeck")]
#[command(about = "Todo manager client - todos, AI suggestions, and admin over the server API")]
#[command(version)]
struct Cli {
    /// Server base URL (overrides config)
    #[arg(long)]
    server: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the sign-in URL to open in a browser
    Login {
        /// Use the Outlook sign-in flow instead of Google
        #[arg(long)]
        outlook: bool,
    },
    /// Sign out and clear the local session
    Logout,
    /// Show the currently signed-in user
    Whoami,
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Manage todos
    Todo {
        #[command(subcommand)]
        action: TodoAction,
    },
    /// Rewrite a description with the AI rephrase endpoint
    Rephrase {
        /// Text to rewrite
        text: String,
    },
    /// Work with AI task suggestions
    Suggest {
        #[command(subcommand)]
        action: SuggestAction,
    },
    /// Manage linked mail providers
    Providers {
        #[command(subcommand)]
        action: ProviderAction,
    },
    /// Admin-only views and actions
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Set a configuration value
    Set {
        /// Configuration key (base_url, timeout_secs, dismissals)
        key: String,
        /// Configuration value
        value: String,
    },
    /// Get a configuration value
    Get {
        /// Configuration key
        key: String,
    },
    /// Show all configuration
    Show,
    /// Get the config file path
    Path,
}

#[derive(Subcommand)]
enum TodoAction {
    /// List todos, optionally filtered
    List {
        /// Filter by status (to-do, in-progress, done)
        #[arg(long)]
        status: Option<UiStatus>,
        /// Filter by priority (low, normal, high)
        #[arg(long)]
        priority: Option<UiPriority>,
        /// Full-text search
        #[arg(long)]
        q: Option<String>,
        /// Due on or after (YYYY-MM-DD)
        #[arg(long)]
        due_from: Option<NaiveDate>,
        /// Due on or before (YYYY-MM-DD)
        #[arg(long)]
        due_to: Option<NaiveDate>,
    },
    /// Create a todo
    Add {
        title: String,
        #[arg(long)]
        description: Option<String>,
        /// Priority (low, normal, high)
        #[arg(long)]
        priority: Option<UiPriority>,
        /// Due date (YYYY-MM-DD)
        #[arg(long)]
        due: Option<NaiveDate>,
    },
    /// Update fields on a todo
    Edit {
        id: i64,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        /// Status (to-do, in-progress, done)
        #[arg(long)]
        status: Option<UiStatus>,
        /// Priority (low, normal, high)
        #[arg(long)]
        priority: Option<UiPriority>,
        /// Due date (YYYY-MM-DD)
        #[arg(long)]
        due: Option<NaiveDate>,
    },
    /// Mark a todo done
    Done { id: i64 },
    /// Delete a todo
    Rm { id: i64 },
}

#[derive(Subcommand)]
enum SuggestAction {
    /// List current suggestions
    List,
    /// Regenerate suggestions server-side
    Refresh,
    /// Accept a suggestion
    Accept { id: i64 },
    /// Dismiss a suggestion
    Dismiss { id: i64 },
    /// Turn a suggestion into a todo
    Add { id: i64 },
    /// Turn every current suggestion into a todo
    AddAll,
    /// Dismiss every current suggestion
    DismissAll,
    /// Poll for suggestions until interrupted
    Watch,
}

#[derive(Subcommand)]
enum ProviderAction {
    /// List linked providers
    List,
    /// Disconnect a provider (e.g. gmail, outlook)
    Disconnect { provider: String },
    /// Enable or disable ingestion for a provider
    Toggle {
        provider: String,
        /// "on" or "off"
        state: String,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Usage summary
    Summary,
    /// List users
    Users {
        #[arg(long, default_value_t = 20)]
        limit: i64,
        #[arg(long, default_value_t = 0)]
        offset: i64,
        /// Filter by role (admin, user)
        #[arg(long)]
        role: Option<String>,
    },
    /// List auth/audit events
    Events {
        #[arg(long, default_value_t = 20)]
        limit: i64,
        #[arg(long, default_value_t = 0)]
        offset: i64,
    },
    /// List per-user provider integrations
    Integrations {
        #[arg(long, default_value_t = 20)]
        limit: i64,
        #[arg(long, default_value_t = 0)]
        offset: i64,
    },
    /// Change a user's role or enabled flag
    UpdateUser {
        id: i64,
        #[arg(long)]
        role: Option<String>,
        /// "on" or "off"
        #[arg(long)]
        enabled: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "taskdeck=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        // Config never needs a client (or a network).
        Commands::Config { action } => handle_config_command(action),
        command => {
            let mut config = Config::load().unwrap_or_default();
            if let Some(server) = cli.server {
                config.api.base_url = Some(server);
            }
            let client = ApiClient::from_config(&config)?;
            run_command(&client, command).await
        }
    }
}

async fn run_command(client: &ApiClient, command: Commands) -> Result<()> {
    match command {
        Commands::Config { action } => return handle_config_command(action),
        Commands::Login { outlook } => {
            let url = if outlook {
                client.auth.outlook_login_url()
            } else {
                client.auth.login_url()
            };
            println!("Open this URL in your browser to sign in:");
            println!("  {}", url);
        }
        Commands::Logout => {
            client.auth.logout().await;
            // Cached data belongs to the signed-out user.
            client.cache.clear();
        }
        Commands::Whoami => {
            let user = client.auth.require_user().await?;
            match user.name {
                Some(ref name) => println!("{} <{}>", name, user.email),
                None => println!("{}", user.email),
            }
            if user.is_admin() {
                println!("role: admin");
            }
        }
        Commands::Todo { action } => {
            client.auth.require_user().await?;
            handle_todo_command(client, action).await?;
        }
        Commands::Rephrase { text } => {
            client.auth.require_user().await?;
            println!("{}", client.ai.rephrase(&text).await?);
        }
        Commands::Suggest { action } => {
            client.auth.require_user().await?;
            handle_suggest_command(client, action).await?;
        }
        Commands::Providers { action } => {
            client.auth.require_user().await?;
            handle_provider_command(client, action).await?;
        }
        Commands::Admin { action } => {
            client.auth.require_admin().await?;
            handle_admin_command(client, action).await?;
        }
    }

    Ok(())
}

fn handle_config_command(action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Set { key, value } => {
            let mut config = Config::load().unwrap_or_default();
            match key.as_str() {
                "base_url" => config.api.base_url = Some(value),
                "timeout_secs" => config.api.timeout_secs = Some(value.parse()?),
                "dismissals" => {
                    config.suggestions.dismissals =
                        value.parse::<DismissalMode>().map_err(anyhow::Error::msg)?
                }
                _ => anyhow::bail!(
                    "Unknown config key: {}. Valid keys: base_url, timeout_secs, dismissals",
                    key
                ),
            }
            config.save()?;
            println!("Configuration saved");
        }
        ConfigAction::Get { key } => {
            let config = Config::load()?;
            let value = match key.as_str() {
                "base_url" => config.api.base_url.unwrap_or_default(),
                "timeout_secs" => config
                    .api
                    .timeout_secs
                    .map(|t| t.to_string())
                    .unwrap_or_default(),
                "dismissals" => config.suggestions.dismissals.to_string(),
                _ => anyhow::bail!("Unknown config key: {}", key),
            };
            println!("{}", value);
        }
        ConfigAction::Show => {
            let config = Config::load()?;
            println!("base_url: {}", config.api.base_url.unwrap_or_default());
            println!(
                "timeout_secs: {}",
                config
                    .api
                    .timeout_secs
                    .map(|t| t.to_string())
                    .unwrap_or_default()
            );
            println!("dismissals: {}", config.suggestions.dismissals);
        }
        ConfigAction::Path => {
            let path = Config::config_path()?;
            println!("{}", path.display());
        }
    }
    Ok(())
}

async fn handle_todo_command(client: &ApiClient, action: TodoAction) -> Result<()> {
    match action {
        TodoAction::List {
            status,
            priority,
            q,
            due_from,
            due_to,
        } => {
            let filters = TodoFilters {
                status: status.map(api_status_from_ui),
                priority: priority.map(api_priority_from_ui),
                q,
                due_from,
                due_to,
            };
            let todos = client.todos.list(&filters).await?;
            if todos.is_empty() {
                println!("No todos");
            } else {
                for todo in &todos {
                    print_todo(todo);
                }
            }
        }
        TodoAction::Add {
            title,
            description,
            priority,
            due,
        } => {
            let input = TodoInput {
                title: Some(title),
                description,
                priority: priority.map(api_priority_from_ui),
                due_date: due,
                ..Default::default()
            };
            let todo = client.todos.create(&input, &TodoFilters::default()).await?;
            println!("Created #{}: {}", todo.id, todo.title);
        }
        TodoAction::Edit {
            id,
            title,
            description,
            status,
            priority,
            due,
        } => {
            let input = TodoInput {
                title,
                description,
                status: status.map(api_status_from_ui),
                priority: priority.map(api_priority_from_ui),
                due_date: due,
            };
            if input == TodoInput::default() {
                anyhow::bail!("Nothing to update");
            }
            let todo = client
                .todos
                .update(id, &input, &TodoFilters::default())
                .await?;
            print_todo(&todo);
        }
        TodoAction::Done { id } => {
            let input = TodoInput {
                status: Some(api_status_from_ui(UiStatus::Done)),
                ..Default::default()
            };
            let todo = client
                .todos
                .update(id, &input, &TodoFilters::default())
                .await?;
            println!("Done #{}: {}", todo.id, todo.title);
        }
        TodoAction::Rm { id } => {
            client.todos.delete(id, &TodoFilters::default()).await?;
            println!("Deleted #{}", id);
        }
    }
    Ok(())
}

async fn handle_suggest_command(client: &ApiClient, action: SuggestAction) -> Result<()> {
    match action {
        SuggestAction::List => {
            print_suggestions(&client.suggestions.list().await?);
        }
        SuggestAction::Refresh => {
            print_suggestions(&client.suggestions.refresh().await?);
        }
        SuggestAction::Accept { id } => {
            let s = client.suggestions.accept(id).await?;
            println!("Accepted #{}: {}", s.id, s.title);
        }
        SuggestAction::Dismiss { id } => {
            client.suggestions.dismiss(id).await?;
            println!("Dismissed #{}", id);
        }
        SuggestAction::Add { id } => {
            let list = client.suggestions.list().await?;
            let suggestion = list
                .iter()
                .find(|s| s.id == id)
                .ok_or_else(|| anyhow::anyhow!("No suggestion #{}", id))?;
            let todo = client
                .suggestions
                .add_to_todos(&client.todos, suggestion, &TodoFilters::default())
                .await?;
            println!("Created todo #{}: {}", todo.id, todo.title);
        }
        SuggestAction::AddAll => {
            let outcome = client
                .suggestions
                .add_all(&client.todos, &TodoFilters::default())
                .await?;
            println!("{}", outcome.summary("Added"));
            for (id, reason) in &outcome.failed {
                eprintln!("  #{}: {}", id, reason);
            }
        }
        SuggestAction::DismissAll => {
            let ids: Vec<i64> = client
                .suggestions
                .list()
                .await?
                .iter()
                .map(|s| s.id)
                .collect();
            if ids.is_empty() {
                println!("No suggestions");
                return Ok(());
            }
            let outcome = client.suggestions.dismiss_all(&ids).await;
            println!("{}", outcome.summary("Dismissed"));
            for (id, reason) in &outcome.failed {
                eprintln!("  #{}: {}", id, reason);
            }
        }
        SuggestAction::Watch => {
            let list = client.suggestions.list().await?;
            print_suggestions(&list);

            // The terminal is always "visible"; the channel exists so the
            // poller loop has an owner to outlive.
            let (_visibility, rx) = visibility_channel(true);
            let suggestions = client.suggestions.clone();
            let poller = SuggestionPoller::spawn(rx, !list.is_empty(), move || {
                let suggestions = suggestions.clone();
                async move {
                    let has = suggestions.poll_once().await;
                    if let Some(list) = suggestions.cached() {
                        print_suggestions(&list);
                    }
                    has
                }
            });

            tracing::info!("watching for suggestions, press Ctrl-C to stop");
            tokio::signal::ctrl_c().await?;
            poller.stop();
        }
    }
    Ok(())
}

async fn handle_provider_command(client: &ApiClient, action: ProviderAction) -> Result<()> {
    match action {
        ProviderAction::List => {
            for p in client.providers.list().await? {
                let linked = if p.linked { "linked" } else { "not linked" };
                let ingest = if p.ingest_enabled { "on" } else { "off" };
                println!("{:<12} {}  ingest: {}", p.provider, linked, ingest);
            }
        }
        ProviderAction::Disconnect { provider } => {
            client.providers.disconnect(&provider).await?;
            println!("Disconnected {}", provider);
        }
        ProviderAction::Toggle { provider, state } => {
            let enabled = parse_on_off(&state)?;
            client.providers.toggle_ingest(&provider, enabled).await?;
            println!(
                "Ingestion {} for {}",
                if enabled { "enabled" } else { "disabled" },
                provider
            );
        }
    }
    Ok(())
}

async fn handle_admin_command(client: &ApiClient, action: AdminAction) -> Result<()> {
    match action {
        AdminAction::Summary => {
            let summary = client.admin.summary().await?;
            println!("total users:       {}", summary.total_users);
            println!("active (24h):      {}", summary.active_users_24h);
        }
        AdminAction::Users {
            limit,
            offset,
            role,
        } => {
            let page = client.admin.users(limit, offset, role.as_deref()).await?;
            for user in &page.items {
                let role = user.role.as_deref().unwrap_or("user");
                let enabled = match user.is_enabled {
                    Some(false) => " (disabled)",
                    _ => "",
                };
                println!("#{:<6} {:<30} {}{}", user.id, user.email, role, enabled);
            }
            print_page_footer(page.items.len(), page.total, page.offset);
        }
        AdminAction::Events { limit, offset } => {
            let page = client.admin.events(limit, offset).await?;
            for event in &page.items {
                let when = event
                    .created_at
                    .map(|t| t.to_rfc3339())
                    .unwrap_or_default();
                println!(
                    "#{:<6} {:<24} {:<20} {}",
                    event.id,
                    event.event_type,
                    event.email.as_deref().unwrap_or("-"),
                    when
                );
            }
            print_page_footer(page.items.len(), page.total, page.offset);
        }
        AdminAction::Integrations { limit, offset } => {
            let page = client.admin.integrations(limit, offset).await?;
            for row in &page.items {
                println!(
                    "#{:<6} {:<30} gmail: {}  outlook: {}",
                    row.id,
                    row.email,
                    integration_state(row.gmail_linked, row.gmail_ingest_enabled),
                    integration_state(row.outlook_linked, row.outlook_ingest_enabled),
                );
            }
            print_page_footer(page.items.len(), page.total, page.offset);
        }
        AdminAction::UpdateUser { id, role, enabled } => {
            let patch = shared::AdminUserPatch {
                role,
                is_enabled: enabled.as_deref().map(parse_on_off).transpose()?,
            };
            client.admin.update_user(id, patch).await?;
            println!("Updated user #{}", id);
        }
    }
    Ok(())
}

fn parse_on_off(s: &str) -> Result<bool> {
    match s {
        "on" => Ok(true),
        "off" => Ok(false),
        other => anyhow::bail!("Expected 'on' or 'off', got '{}'", other),
    }
}

fn integration_state(linked: bool, ingest: bool) -> &'static str {
    match (linked, ingest) {
        (false, _) => "-",
        (true, false) => "linked",
        (true, true) => "ingesting",
    }
}

fn print_todo(todo: &Todo) {
    let due = todo
        .due_date
        .map(|d| format!("  due {}", d))
        .unwrap_or_default();
    println!(
        "#{:<6} [{}] [{}] {}{}",
        todo.id,
        ui_status_from_api(todo.status),
        ui_priority_from_api(todo.priority),
        todo.title,
        due
    );
    if let Some(description) = &todo.description {
        if !description.is_empty() {
            println!("        {}", description);
        }
    }
}

fn print_suggestions(list: &[AiSuggestion]) {
    if list.is_empty() {
        println!("No suggestions");
        return;
    }
    for s in list {
        println!("#{:<6} {}  ({:.0}%)", s.id, s.title, s.confidence * 100.0);
        if let Some(detail) = &s.detail {
            if !detail.is_empty() {
                println!("        {}", detail);
            }
        }
    }
}
