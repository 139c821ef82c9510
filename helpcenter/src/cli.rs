use std::fmt;

use clap::{Parser, Subcommand, ValueEnum};
use log::LevelFilter;

use crate::models::{FeedbackScore, Priority};

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Help center backend URL
    #[arg(long, env = "HELPCENTER_URL", global = true)]
    pub base_url: Option<String>,

    /// Workspace identifier sent with every request
    #[arg(long, env = "HELPCENTER_WORKSPACE_ID", global = true)]
    pub workspace_id: Option<String>,

    /// Log verbosity
    #[arg(short, long, value_name = "LEVEL", default_value_t = LogLevel::Info, global = true)]
    pub log_level: LogLevel,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Show workspace branding and greeting
    Workspace,

    /// Print the category / sub-category / article navigation tree
    Tree,

    /// Search article titles across all categories
    Search {
        /// Text to look for, matched case-insensitively
        query: String,
    },

    /// Read an article
    Article {
        id: String,

        /// Print a table of contents before the article
        #[arg(long)]
        toc: bool,

        /// Print plain text instead of rendered markdown
        #[arg(long)]
        plain: bool,
    },

    /// Rate an article
    Feedback {
        id: String,

        #[arg(value_enum)]
        score: FeedbackScore,
    },

    /// Sign in with an email verification code
    Login {
        /// Email address, prompted for when missing
        #[arg(long)]
        email: Option<String>,

        /// Display name (optional)
        #[arg(long)]
        name: Option<String>,
    },

    /// Forget the stored token
    Logout,

    /// Show the signed-in user
    Whoami,

    /// Messages with the support team
    Inbox {
        #[command(subcommand)]
        action: Option<InboxAction>,
    },

    /// Support tickets
    Tickets {
        /// Filter by title or status
        #[arg(long)]
        search: Option<String>,

        #[command(subcommand)]
        action: Option<TicketAction>,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum InboxAction {
    /// Send a message
    Send { message: String },

    /// Keep printing new messages as they arrive
    Watch,
}

#[derive(Subcommand, Debug, Clone)]
pub enum TicketAction {
    /// Show one ticket
    Show { id: String },

    /// Open a new ticket
    Create {
        #[arg(long)]
        title: String,

        #[arg(long)]
        description: String,

        #[arg(long, value_enum, default_value_t = Priority::Low)]
        priority: Priority,

        /// Id of an already uploaded file, repeatable
        #[arg(long = "attachment", value_name = "FILE_ID")]
        attachments: Vec<String>,
    },

    /// Refresh the ticket list periodically
    Watch,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Off,
}

impl From<LogLevel> for LevelFilter {
    fn from(log_level: LogLevel) -> Self {
        match log_level {
            LogLevel::Trace => LevelFilter::Trace,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Off => LevelFilter::Off,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "trace"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
            LogLevel::Off => write!(f, "off"),
        }
    }
}
