mod client;
mod search;
mod store;
mod visited;

use std::path::PathBuf;

use clap::{ArgGroup, CommandFactory, Parser, Subcommand};
use nearbite_core::SCAN_POSITIONS;
use tracing_subscriber::EnvFilter;

use crate::client::{ApiClient, SearchParams};
use crate::store::{LocalVisitedStore, SessionFile};
use crate::visited::Target;

#[derive(Debug, Parser)]
#[command(name = "nearbite")]
#[command(about = "Scan for nearby restaurants and track where you have eaten")]
struct Cli {
    /// Base URL of the nearbite server.
    #[arg(
        long,
        global = true,
        env = "NEARBITE_SERVER_URL",
        default_value = "http://localhost:3000"
    )]
    server: String,

    /// Directory holding the local visited list and session cookie.
    #[arg(long, global = true, env = "NEARBITE_DATA_DIR", default_value = ".nearbite")]
    data_dir: PathBuf,

    /// Per-request timeout; a scan page enriches up to 20 places.
    #[arg(long, global = true, default_value_t = 60)]
    timeout_secs: u64,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Scan outward from a place or coordinate, one ring position per page.
    #[command(group(ArgGroup::new("origin").required(true).args(["query", "lat"])))]
    Search {
        /// Address or place name to geocode.
        #[arg(long)]
        query: Option<String>,
        #[arg(long, requires = "lng", allow_hyphen_values = true)]
        lat: Option<f64>,
        #[arg(long, requires = "lat", allow_hyphen_values = true)]
        lng: Option<f64>,
        /// Search radius in km (0-10, default 5).
        #[arg(long)]
        radius_km: Option<f64>,
        /// Number of scan positions to fetch.
        #[arg(long, default_value_t = 1, conflicts_with = "all")]
        pages: usize,
        /// Fetch every remaining position in the scan plan.
        #[arg(long)]
        all: bool,
        /// Print only places that take reservations.
        #[arg(long)]
        only_reservable: bool,
    },
    /// List text-search candidates for a place name.
    Resolve { query: String },
    /// Manage visited marks.
    Visited {
        #[command(subcommand)]
        command: VisitedCommands,
    },
    /// Sign in to sync visited marks with the server.
    Login {
        #[arg(long, env = "NEARBITE_USERNAME")]
        username: String,
        #[arg(long, env = "NEARBITE_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Sign out and forget the stored session.
    Logout,
    /// Show which account the stored session belongs to.
    Whoami,
}

#[derive(Debug, Subcommand)]
enum VisitedCommands {
    List {
        /// Use the signed-in account instead of the local list.
        #[arg(long)]
        cloud: bool,
    },
    Mark {
        place_id: String,
        #[arg(long)]
        cloud: bool,
    },
    Unmark {
        place_id: String,
        #[arg(long)]
        cloud: bool,
    },
    /// Upload every locally visited place to the signed-in account.
    Import,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    let session = SessionFile::in_dir(&cli.data_dir);
    let local = LocalVisitedStore::in_dir(&cli.data_dir);
    let api = ApiClient::new(&cli.server, cli.timeout_secs)?.with_session(session.load().await?);

    match command {
        Commands::Search {
            query,
            lat,
            lng,
            radius_km,
            pages,
            all,
            only_reservable,
        } => {
            let params = SearchParams {
                query,
                center: lat.zip(lng),
                radius_km,
            };
            let max_pages = if all {
                usize::from(SCAN_POSITIONS)
            } else {
                pages
            };
            let visited = visited::visited_for_search(&local, &api).await?;
            search::run_search(&api, &params, max_pages, only_reservable, &visited).await?;
        }
        Commands::Resolve { query } => search::run_resolve(&api, &query).await?,
        Commands::Visited { command } => run_visited(command, &local, &api).await?,
        Commands::Login { username, password } => {
            let cookie = api.login(&username, &password).await?;
            session.save(&cookie).await?;
            println!("signed in as {username}");
        }
        Commands::Logout => {
            if let Err(e) = api.logout().await {
                tracing::warn!(error = %e, "server logout failed; clearing local session anyway");
            }
            session.clear().await?;
            println!("signed out");
        }
        Commands::Whoami => match api.me().await? {
            Some(username) => println!("{username}"),
            None => println!("not signed in"),
        },
    }

    Ok(())
}

async fn run_visited(
    command: VisitedCommands,
    local: &LocalVisitedStore,
    api: &ApiClient,
) -> anyhow::Result<()> {
    let target = |cloud: bool| {
        if cloud {
            Target::Cloud(api)
        } else {
            Target::Local(local)
        }
    };
    match command {
        VisitedCommands::List { cloud } => visited::run_visited_list(target(cloud)).await,
        VisitedCommands::Mark { place_id, cloud } => {
            visited::run_visited_set(target(cloud), &place_id, true).await
        }
        VisitedCommands::Unmark { place_id, cloud } => {
            visited::run_visited_set(target(cloud), &place_id, false).await
        }
        VisitedCommands::Import => visited::run_visited_import(local, api).await,
    }
}
