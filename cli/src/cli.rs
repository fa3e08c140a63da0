//! Command-line surface.
//!
//! ## Commands
//!
//! - `solguard login|register|logout|whoami`
//! - `solguard projects list|show|create|update|delete`
//! - `solguard analysis run|show|history`
//! - `solguard ai analyze|suggest|generate|vulnerability|patterns|model-configs`
//! - `solguard roles mine|all|assign|remove`
//! - `solguard audit-logs [--page N] [--limit N] [filters]`
//! - `solguard can <PERMISSION>`

use std::path::PathBuf;

use clap::Args;
use clap::Parser;
use clap::Subcommand;

#[derive(Debug, Parser)]
#[command(name = "solguard", version, about = "SolGuard dashboard client")]
pub struct Cli {
    /// Backend API root (overrides config file and environment).
    #[arg(long = "base-url", global = true, value_name = "URL")]
    pub base_url: Option<String>,

    /// Configuration home (defaults to $SOLGUARD_HOME or ~/.solguard).
    #[arg(long = "home", global = true, value_name = "DIR")]
    pub home: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Sign in. The password is read from $SOLGUARD_PASSWORD or stdin.
    Login(LoginArgs),
    /// Create an account and sign in.
    Register(RegisterArgs),
    /// Sign out and forget the stored credential.
    Logout,
    /// Show the signed-in user.
    Whoami,
    #[command(subcommand)]
    Projects(ProjectsCommand),
    #[command(subcommand)]
    Analysis(AnalysisCommand),
    #[command(subcommand)]
    Ai(AiCommand),
    #[command(subcommand)]
    Roles(RolesCommand),
    /// List audit log entries (requires `view_audit_logs`).
    AuditLogs(AuditArgs),
    /// Check whether the signed-in user holds a permission.
    Can(CanArgs),
}

#[derive(Debug, Args)]
pub struct LoginArgs {
    #[arg(long)]
    pub email: String,
}

#[derive(Debug, Args)]
pub struct RegisterArgs {
    #[arg(long)]
    pub email: String,

    #[arg(long)]
    pub name: String,
}

#[derive(Debug, Subcommand)]
pub enum ProjectsCommand {
    List,
    Show {
        id: String,
    },
    Create {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        description: String,
    },
    Update {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    Delete {
        id: String,
    },
}

#[derive(Debug, Subcommand)]
pub enum AnalysisCommand {
    /// Analyze one file of a project.
    Run {
        #[arg(long = "project")]
        project_id: String,
        #[arg(long = "file")]
        file_path: String,
    },
    Show {
        id: String,
    },
    /// Every analysis of a project, newest first.
    History {
        #[arg(long = "project")]
        project_id: String,
    },
}

#[derive(Debug, Subcommand)]
pub enum AiCommand {
    Analyze(CodeArgs),
    Suggest(CodeArgs),
    Generate {
        #[arg(long = "project")]
        project_id: String,
        /// What the generated code must do.
        requirements: String,
    },
    Vulnerability {
        #[arg(long = "project")]
        project_id: String,
        vulnerability_id: String,
    },
    Patterns {
        #[arg(long = "project")]
        project_id: String,
    },
    ModelConfigs {
        #[arg(long = "project")]
        project_id: String,
    },
}

#[derive(Debug, Args)]
pub struct CodeArgs {
    #[arg(long = "project")]
    pub project_id: String,

    /// Source file to send; `-` reads stdin.
    pub file: PathBuf,
}

#[derive(Debug, Subcommand)]
pub enum RolesCommand {
    /// Roles of the signed-in user.
    Mine,
    /// Every role defined on the server.
    All,
    Assign {
        #[arg(long = "user")]
        user_id: i64,
        #[arg(long = "role")]
        role_id: i64,
    },
    Remove {
        #[arg(long = "user")]
        user_id: i64,
        #[arg(long = "role")]
        role_id: i64,
    },
}

#[derive(Debug, Args)]
pub struct AuditArgs {
    #[arg(long, default_value_t = 1)]
    pub page: u32,

    #[arg(long, default_value_t = 10)]
    pub limit: u32,

    #[arg(long)]
    pub entity_type: Option<String>,

    #[arg(long)]
    pub entity_id: Option<i64>,

    #[arg(long)]
    pub user_id: Option<i64>,
}

#[derive(Debug, Args)]
pub struct CanArgs {
    pub permission: String,
}
