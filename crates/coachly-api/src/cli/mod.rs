//! CLI command definitions for the `coachly` binary.
//!
//! Uses clap derive macros for argument parsing. The CLI follows a noun-verb
//! pattern (e.g., `coachly coach create`, `coachly session begin`).

pub mod chat;
pub mod coach;
pub mod session;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

use coachly_core::session::lifecycle::RecapDecision;
use coachly_types::conversation::SessionKind;
use coachly_types::quota::Entitlement;
use coachly_types::user::UserId;

use crate::state::AppState;

/// Talk to your coaches, one numbered session at a time.
#[derive(Parser)]
#[command(name = "coachly", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Act as this user id instead of the local user.
    #[arg(long, global = true, env = "COACHLY_USER")]
    pub user: Option<String>,

    /// Treat the user as premium (no message limit).
    #[arg(long, global = true)]
    pub premium: bool,

    /// Also export tracing spans as OpenTelemetry to stdout.
    #[arg(long, global = true, hide = true)]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// The acting user: `--user` when given, else the persisted local user.
    pub async fn resolve_user(&self, state: &AppState) -> anyhow::Result<UserId> {
        match self.user.as_deref().map(str::trim).filter(|u| !u.is_empty()) {
            Some(raw) => raw
                .parse::<UserId>()
                .with_context(|| format!("invalid user id '{raw}'")),
            None => state.local_user().await,
        }
    }

    pub fn entitlement(&self) -> Entitlement {
        Entitlement::from(self.premium)
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Browse and manage coaches.
    Coach {
        #[command(subcommand)]
        action: CoachCommand,
    },

    /// Begin, end, and browse coaching sessions.
    Session {
        #[command(subcommand)]
        action: SessionCommand,
    },

    /// Chat interactively in an existing session.
    Chat {
        /// Session (conversation) id.
        conversation: String,
    },

    /// Start the REST API server.
    Serve {
        /// Port to listen on.
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to.
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum CoachCommand {
    /// Create a new coach (prompts for anything not given as a flag).
    Create(CreateCoachArgs),

    /// List public coaches, or your private ones with --mine.
    #[command(alias = "ls")]
    List {
        #[arg(long)]
        mine: bool,
    },

    /// Show a coach's profile.
    Show {
        /// Coach id.
        id: String,
    },

    /// Delete a coach you created, with all its sessions.
    #[command(alias = "rm")]
    Delete {
        /// Coach id.
        id: String,

        /// Skip confirmation prompt.
        #[arg(long)]
        force: bool,
    },
}

#[derive(Args, Clone, Default)]
pub struct CreateCoachArgs {
    #[arg(long)]
    pub name: Option<String>,

    /// Short headline, e.g. "Productivity Coach".
    #[arg(long)]
    pub title: Option<String>,

    #[arg(long)]
    pub description: Option<String>,

    /// System prompt that defines how the coach talks.
    #[arg(long)]
    pub prompt: Option<String>,

    /// Specialty (repeatable).
    #[arg(long = "specialty")]
    pub specialties: Vec<String>,

    /// Personality trait (repeatable).
    #[arg(long = "trait")]
    pub traits: Vec<String>,

    #[arg(long)]
    pub avatar_url: Option<String>,

    /// Video persona (replica) id; enables video sessions.
    #[arg(long)]
    pub video_persona: Option<String>,

    /// List the coach publicly.
    #[arg(long)]
    pub public: bool,
}

#[derive(Subcommand)]
pub enum SessionCommand {
    /// Begin a new session with a coach, archiving the current one.
    Begin {
        /// Coach id.
        coach: String,

        /// Session kind (text, video).
        #[arg(long, default_value = "text")]
        kind: SessionKind,

        /// Answer the recap offer without prompting (accept, decline).
        #[arg(long, value_parser = parse_decision)]
        recap: Option<RecapDecision>,
    },

    /// End (archive) a session.
    End {
        /// Session id.
        id: String,
    },

    /// List your sessions grouped by coach.
    #[command(alias = "ls")]
    List {
        /// Only sessions of this kind (text, video).
        #[arg(long)]
        kind: Option<SessionKind>,
    },

    /// Show a session and its messages.
    Show {
        /// Session id.
        id: String,
    },
}

fn parse_decision(s: &str) -> Result<RecapDecision, String> {
    match s.trim().to_ascii_lowercase().as_str() {
        "accept" | "yes" | "y" => Ok(RecapDecision::Accept),
        "decline" | "no" | "n" => Ok(RecapDecision::Decline),
        other => Err(format!("expected 'accept' or 'decline', got '{other}'")),
    }
}

/// Truncate to at most `max` characters, adding an ellipsis when cut.
pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        let cut: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{cut}...")
    } else {
        s.to_string()
    }
}

pub(crate) fn spinner(message: impl Into<std::borrow::Cow<'static, str>>) -> indicatif::ProgressBar {
    let spinner = indicatif::ProgressBar::new_spinner();
    if let Ok(style) = indicatif::ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(message);
    spinner.enable_steady_tick(std::time::Duration::from_millis(80));
    spinner
}
