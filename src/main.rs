use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use envelope_share::cli::{
    handle_envelope_command, handle_invite_command, handle_member_command,
    handle_profile_command, handle_transaction_command, handle_user_command, CliContext,
    EnvelopeCommands, InviteCommands, MemberCommands, ProfileCommands, TransactionCommands,
    UserCommands,
};
use envelope_share::config::{paths::SharePaths, settings::Settings};
use envelope_share::storage::{initialize_storage, Storage};

/// Environment variable holding a tracing filter directive
const LOG_ENV: &str = "ENVSHARE_LOG";

#[derive(Parser)]
#[command(
    name = "envshare",
    version,
    about = "Shared envelope budgeting from the command line",
    long_about = "envshare keeps envelope budgets that several people share. \
                  Each budget profile has an owner, admins and members; every \
                  expense recorded against an envelope keeps its spent total exact."
)]
struct Cli {
    /// E-mail of the acting user
    #[arg(long, global = true, env = "ENVSHARE_USER")]
    user: Option<String>,

    /// Budget profile ID to act within (defaults to your first profile)
    #[arg(long, global = true, env = "ENVSHARE_PROFILE")]
    profile: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the data directory
    Init,

    /// Show current configuration and paths
    Config,

    /// User records
    #[command(subcommand)]
    User(UserCommands),

    /// Budget profile management
    #[command(subcommand)]
    Profile(ProfileCommands),

    /// Profile membership and roles
    #[command(subcommand)]
    Member(MemberCommands),

    /// Invitations to join a profile
    #[command(subcommand)]
    Invite(InviteCommands),

    /// Envelope management
    #[command(subcommand, alias = "env")]
    Envelope(EnvelopeCommands),

    /// Transaction management
    #[command(subcommand, alias = "txn")]
    Transaction(TransactionCommands),

    /// Show recent audit log entries
    Audit {
        /// Number of entries to show
        #[arg(short = 'n', long, default_value = "20")]
        limit: usize,
    },
}

fn init_tracing(settings: &Settings) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new(&settings.log_filter))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize paths and settings
    let paths = SharePaths::new()?;
    let settings = Settings::load_or_create(&paths)?;
    init_tracing(&settings);

    // Initialize storage
    let mut storage = Storage::new(paths.clone())?;
    storage.load_all()?;

    let ctx = CliContext::new(&storage, &settings, cli.user, cli.profile);

    match cli.command {
        Some(Commands::Init) => {
            println!("Initializing envshare at: {}", paths.base_dir().display());
            initialize_storage(&paths)?;
            println!("Initialization complete!");
            println!();
            println!("Next steps:");
            println!("  envshare user register you@example.com");
            println!("  envshare --user you@example.com profile create Household --seed");
        }
        Some(Commands::Config) => {
            println!("envshare Configuration");
            println!("======================");
            println!("Base directory:   {}", paths.base_dir().display());
            println!("Data directory:   {}", paths.data_dir().display());
            println!("Audit log:        {}", paths.audit_log().display());
            println!("Initialized:      {}", paths.is_initialized());
            println!();
            println!("Settings:");
            println!("  Default currency: {}", settings.default_currency);
            println!("  Invitation TTL:   {} days", settings.invitation_ttl_days);
            println!("  Log filter:       {}", settings.log_filter);
        }
        Some(Commands::User(cmd)) => handle_user_command(&ctx, cmd)?,
        Some(Commands::Profile(cmd)) => handle_profile_command(&ctx, cmd)?,
        Some(Commands::Member(cmd)) => handle_member_command(&ctx, cmd)?,
        Some(Commands::Invite(cmd)) => handle_invite_command(&ctx, cmd)?,
        Some(Commands::Envelope(cmd)) => handle_envelope_command(&ctx, cmd)?,
        Some(Commands::Transaction(cmd)) => handle_transaction_command(&ctx, cmd)?,
        Some(Commands::Audit { limit }) => {
            let entries = storage.audit().read_recent(limit)?;
            if entries.is_empty() {
                println!("No audit entries.");
            }
            for entry in entries {
                println!("{}", entry.format_human_readable());
            }
        }
        None => {
            println!("envshare - shared envelope budgeting");
            println!();
            println!("Run 'envshare --help' for usage information.");
        }
    }

    Ok(())
}
