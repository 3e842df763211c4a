use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// GeoDrill - Drilling-path polling worker
#[derive(Parser, Debug)]
#[command(name = "geodrill")]
#[command(about = "Poll a drilling simulator and track well trajectories", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Output results in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Storage backend to use (memory or postgres)
    #[arg(long, global = true, default_value = "memory")]
    pub storage: StorageBackend,

    /// Poll worker configuration file (defaults to ./geodrill.toml when present)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Storage backend selection
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum StorageBackend {
    /// In-memory storage (default, state is lost when the command exits)
    Memory,
    /// PostgreSQL persistent storage
    Postgres,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage projects
    Project(ProjectArgs),

    /// Poll a project's drilling source in the foreground
    Poll(PollArgs),

    /// Clear a project's polling flag so its running poll stops
    Stop(ProjectRef),

    /// Clear a project's path and metrics
    Reset(ResetArgs),

    /// Show a project's progress and trajectory
    Status(StatusArgs),

    /// Inspect configuration
    Config(ConfigArgs),

    /// Manage database operations
    Db(DbArgs),
}

#[derive(Parser, Debug)]
pub struct ProjectArgs {
    #[command(subcommand)]
    pub command: ProjectCommand,
}

#[derive(Subcommand, Debug)]
pub enum ProjectCommand {
    /// Create a project
    Create(CreateProjectArgs),

    /// List projects
    List,
}

#[derive(Parser, Debug)]
pub struct CreateProjectArgs {
    /// Project name
    pub name: String,

    /// Base URL of the drilling simulator
    #[arg(long)]
    pub url: Option<String>,

    /// Seconds between polling iterations
    #[arg(long)]
    pub interval: Option<u64>,
}

#[derive(Parser, Debug)]
pub struct ProjectRef {
    /// Project ID
    pub project_id: String,
}

#[derive(Parser, Debug)]
#[command(group(clap::ArgGroup::new("target").required(true).args(["project", "url"])))]
pub struct PollArgs {
    /// Existing project to poll
    #[arg(long)]
    pub project: Option<String>,

    /// Create a throwaway project against this simulator URL and poll it
    #[arg(long)]
    pub url: Option<String>,

    /// Name of the throwaway project
    #[arg(long, default_value = "ad-hoc")]
    pub name: String,

    /// Seconds between iterations of the throwaway project
    #[arg(long, requires = "url")]
    pub interval: Option<u64>,

    /// Number of iterations to run
    #[arg(long, short = 'n')]
    pub iterations: Option<u32>,

    /// Path template appended to the simulator URL, containing {index}
    #[arg(long, value_name = "TEMPLATE")]
    pub source_path: Option<String>,

    /// Depth increment used when a step length is missing
    #[arg(long)]
    pub fallback_step: Option<f64>,

    /// Upper bound on iterations per run
    #[arg(long)]
    pub max_iterations: Option<u32>,

    /// Directory receiving frame images
    #[arg(long, env = "GEODRILL_OBJECT_ROOT", default_value = "./data/objects")]
    pub object_root: PathBuf,

    /// Public URL prefix of stored frame images
    #[arg(long, env = "GEODRILL_PUBLIC_BASE_URL", default_value = "http://localhost:3001/objects")]
    pub public_base_url: String,
}

#[derive(Parser, Debug)]
pub struct ResetArgs {
    /// Project ID
    pub project_id: String,

    /// Skip the confirmation prompt
    #[arg(long, short = 'y')]
    pub yes: bool,
}

#[derive(Parser, Debug)]
pub struct StatusArgs {
    /// Project ID
    pub project_id: String,

    /// Number of trailing path points to show
    #[arg(long, default_value = "10")]
    pub points: usize,

    /// Show recent activity messages
    #[arg(long)]
    pub messages: bool,
}

#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show effective poll worker settings and where each came from
    Show,
}

#[derive(Parser, Debug)]
pub struct DbArgs {
    /// Database management command
    #[command(subcommand)]
    pub command: DbCommand,
}

#[derive(Subcommand, Debug)]
pub enum DbCommand {
    /// Apply pending schema migrations
    Migrate,

    /// Show applied and pending migrations
    Status,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_poll_with_project() {
        let cli = Cli::try_parse_from([
            "geodrill", "poll", "--project", "abc", "-n", "3", "--fallback-step", "7.5",
        ])
        .unwrap();

        match cli.command {
            Commands::Poll(args) => {
                assert_eq!(args.project.as_deref(), Some("abc"));
                assert_eq!(args.iterations, Some(3));
                assert_eq!(args.fallback_step, Some(7.5));
                assert!(args.url.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_poll_requires_target() {
        assert!(Cli::try_parse_from(["geodrill", "poll"]).is_err());
        assert!(Cli::try_parse_from([
            "geodrill", "poll", "--project", "abc", "--url", "http://sim.local",
        ])
        .is_err());
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::try_parse_from([
            "geodrill", "status", "abc", "--json", "--storage", "postgres",
        ])
        .unwrap();

        assert!(cli.json);
        assert!(matches!(cli.storage, StorageBackend::Postgres));
    }

    #[test]
    fn test_reset_yes_flag() {
        let cli = Cli::try_parse_from(["geodrill", "reset", "abc", "-y"]).unwrap();
        match cli.command {
            Commands::Reset(args) => assert!(args.yes),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_command_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
