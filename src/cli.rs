use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

use crate::controllers::dashboard::DEFAULT_CHART_DAYS;
use crate::types::{Role, RoleFilter, Status, StatusFilter};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Compact,
}

#[derive(Parser)]
#[command(name = "admin")]
#[command(about = "Admin client for user management, analytics and signed exports", version)]
#[command(after_help = "EXAMPLES:
    admin users list                  List verified users, first page
    admin users list --page 2         Show the second page
    admin users create -e a@a.com     Create a user
    admin export json --dir ./out     Save a JSON export
    admin export decode               Decode the binary export and show it")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (table, json, compact)
    #[arg(long, short = 'o', global = true, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Output as JSON (alias for --format json)
    #[arg(long, global = true, hide = true)]
    pub json: bool,

    /// Suppress success messages
    #[arg(long, short, global = true)]
    pub quiet: bool,

    /// Show debug logs and detailed error information
    #[arg(long, short, global = true)]
    pub verbose: bool,
}

impl Cli {
    /// Get the effective output format, considering --json flag
    pub fn output_format(&self) -> OutputFormat {
        if self.json {
            OutputFormat::Json
        } else {
            self.format
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage users
    #[command(
        alias = "u",
        after_help = "EXAMPLES:
    admin users list --search alice --role admin
    admin users show 42
    admin users update 42 --status inactive
    admin users delete 42"
    )]
    Users {
        #[command(subcommand)]
        action: UserCommands,
    },
    /// Show user statistics
    #[command(after_help = "EXAMPLES:
    admin stats
    admin stats --format json")]
    Stats,
    /// Show new users per day
    #[command(after_help = "EXAMPLES:
    admin chart
    admin chart --days 30")]
    Chart {
        /// Number of days to include
        #[arg(long, short, default_value_t = DEFAULT_CHART_DAYS)]
        days: u32,
    },
    /// Show stats and chart together
    #[command(after_help = "EXAMPLES:
    admin dashboard --days 14")]
    Dashboard {
        /// Number of days to include in the chart
        #[arg(long, short, default_value_t = DEFAULT_CHART_DAYS)]
        days: u32,
    },
    /// Export users
    #[command(after_help = "EXAMPLES:
    admin export json
    admin export binary --dir ./exports
    admin export decode")]
    Export {
        #[command(subcommand)]
        action: ExportCommands,
    },
    /// Inspect signing keys and verify signatures
    #[command(after_help = "EXAMPLES:
    admin crypto public-key
    admin crypto verify --data <HASH> --signature <SIG>")]
    Crypto {
        #[command(subcommand)]
        action: CryptoCommands,
    },
    /// Check backend health
    Health,
    /// Store an API token for later requests
    #[command(after_help = "EXAMPLES:
    admin login eyJhbGciOi...")]
    Login {
        /// Bearer token issued by the backend
        token: String,
    },
    /// Forget the stored API token
    Logout,
    /// Generate shell completions
    #[command(after_help = "EXAMPLES:
    admin completions bash > ~/.bash_completion.d/admin
    admin completions zsh > ~/.zfunc/_admin
    admin completions fish > ~/.config/fish/completions/admin.fish")]
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
    /// Initialize configuration file interactively
    #[command(after_help = "EXAMPLES:
    admin init")]
    Init,
}

#[derive(Subcommand)]
pub enum UserCommands {
    /// List users that pass signature verification
    #[command(
        alias = "ls",
        after_help = "EXAMPLES:
    admin users list --page 2 --limit 25
    admin users list --search example.com --status active"
    )]
    List(UserListArgs),
    /// Show one user
    #[command(alias = "v")]
    Show {
        /// User ID
        id: String,
    },
    /// Create a user
    #[command(
        alias = "c",
        after_help = "EXAMPLES:
    admin users create -e alice@example.com --role admin"
    )]
    Create(UserCreateArgs),
    /// Update a user
    #[command(
        alias = "up",
        after_help = "EXAMPLES:
    admin users update 42 --role admin --status inactive"
    )]
    Update(UserUpdateArgs),
    /// Delete a user
    #[command(
        alias = "rm",
        after_help = "EXAMPLES:
    admin users delete 42
    admin users delete 42 --yes"
    )]
    Delete {
        /// User ID
        id: String,

        /// Skip the confirmation prompt
        #[arg(long, short)]
        yes: bool,
    },
}

#[derive(Args, Clone)]
pub struct UserListArgs {
    /// Page number (starting at 1)
    #[arg(long, short, default_value = "1", value_parser = clap::value_parser!(u32).range(1..))]
    pub page: u32,

    /// Users per page (default from config, 10 if unset)
    #[arg(long, short, value_parser = clap::value_parser!(u32).range(1..))]
    pub limit: Option<u32>,

    /// Case-insensitive search over email, role and status
    #[arg(long, short)]
    pub search: Option<String>,

    /// Filter by role
    #[arg(long, value_enum, default_value = "all")]
    pub role: RoleFilter,

    /// Filter by status
    #[arg(long, value_enum, default_value = "all")]
    pub status: StatusFilter,
}

#[derive(Args)]
pub struct UserCreateArgs {
    /// Email address
    #[arg(long, short)]
    pub email: String,

    /// Role
    #[arg(long, short, value_enum, default_value = "user")]
    pub role: Role,

    /// Status
    #[arg(long, short, value_enum, default_value = "active")]
    pub status: Status,
}

#[derive(Args)]
pub struct UserUpdateArgs {
    /// User ID
    pub id: String,

    /// New email address
    #[arg(long, short)]
    pub email: Option<String>,

    /// New role
    #[arg(long, short, value_enum)]
    pub role: Option<Role>,

    /// New status
    #[arg(long, short, value_enum)]
    pub status: Option<Status>,
}

#[derive(Subcommand)]
pub enum ExportCommands {
    /// Save all users as pretty-printed JSON
    Json(ExportArgs),
    /// Save the binary export
    Binary(ExportArgs),
    /// Fetch the binary export and show its decoded contents
    Decode,
}

#[derive(Args)]
pub struct ExportArgs {
    /// Directory to save into (default from config, else current directory)
    #[arg(long, short)]
    pub dir: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum CryptoCommands {
    /// Show the backend's signing key
    PublicKey,
    /// Ask the backend to verify a signature
    Verify {
        /// Signed data (the email hash)
        #[arg(long, short)]
        data: String,

        /// Signature to check
        #[arg(long, short)]
        signature: String,
    },
}
