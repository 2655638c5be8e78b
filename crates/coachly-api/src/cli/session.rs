//! Session CLI commands: begin (with recap prompt), end, list, show.

use anyhow::{Context, Result};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;
use dialoguer::Confirm;

use coachly_core::session::lifecycle::{
    PendingSession, RecapDecision, RecapResolution, SessionStart, StartedSession,
};
use coachly_types::conversation::{Conversation, ConversationId, ConversationStatus, SessionKind};
use coachly_types::error::SessionError;
use coachly_types::message::{Message, SenderType};
use coachly_types::user::UserId;

use super::coach::parse_coach_id;
use super::{spinner, truncate};
use crate::state::AppState;

pub(crate) fn parse_session_id(raw: &str) -> Result<ConversationId> {
    raw.trim()
        .parse::<ConversationId>()
        .map_err(|_| anyhow::anyhow!("invalid session id '{raw}'"))
}

/// Load a session owned by `user`.
pub(crate) async fn owned_session(state: &AppState, user: UserId, raw: &str) -> Result<Conversation> {
    let id = parse_session_id(raw)?;
    let conversation = state.session_manager.get_session(&id).await?;
    if conversation.user_id != user {
        return Err(SessionError::ConversationNotFound.into());
    }
    Ok(conversation)
}

/// Begin a session, resolving a recap offer interactively or from `--recap`.
///
/// ```bash
/// coachly session begin <coach-id>
/// coachly session begin <coach-id> --recap accept --json
/// ```
pub async fn begin_session(
    state: &AppState,
    user: UserId,
    coach: &str,
    kind: SessionKind,
    recap: Option<RecapDecision>,
    json: bool,
) -> Result<()> {
    let coach_id = parse_coach_id(coach)?;
    let outcome = state
        .session_manager
        .begin_session(user, coach_id, kind)
        .await?;

    let started = match outcome {
        SessionStart::Started(started) => started,
        SessionStart::RecapOffered(pending) => {
            match resolve_offer(state, pending, recap, json).await? {
                Some(started) => started,
                None => {
                    if !json {
                        println!("  Cancelled. No new session was started.");
                    }
                    return Ok(());
                }
            }
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&started)?);
        return Ok(());
    }
    print_started(&started);
    Ok(())
}

/// Walk the recap offer to a started session. `None` means the user backed out.
async fn resolve_offer(
    state: &AppState,
    pending: PendingSession,
    recap: Option<RecapDecision>,
    json: bool,
) -> Result<Option<StartedSession>> {
    let decision = match recap {
        Some(decision) => decision,
        // Non-interactive output never blocks on a prompt.
        None if json => RecapDecision::Decline,
        None => {
            let accept = Confirm::new()
                .with_prompt(format!(
                    "Welcome back to {}! Get a recap of your last session before starting session {}?",
                    style(&pending.coach.name).cyan(),
                    pending.session_number
                ))
                .default(true)
                .interact()?;
            if accept {
                RecapDecision::Accept
            } else {
                RecapDecision::Decline
            }
        }
    };

    let progress = (decision == RecapDecision::Accept && !json)
        .then(|| spinner("Summarizing your last session..."));
    let resolution = state.session_manager.resolve_recap(pending, decision).await;
    if let Some(progress) = progress {
        progress.finish_and_clear();
    }

    match resolution? {
        RecapResolution::Started(started) => Ok(Some(started)),
        RecapResolution::SummaryUnavailable { pending, reason } => {
            tracing::warn!(error = %reason, "recap unavailable");
            let prompt = !json && recap.is_none();
            let notice = recap_unavailable_notice(&reason, !prompt);
            if json {
                // Keep stdout parseable.
                eprintln!("{notice}");
            } else {
                println!("  {} {notice}", style("!").yellow().bold());
            }
            let continue_without = !prompt
                || Confirm::new()
                    .with_prompt("Continue without a recap?")
                    .default(true)
                    .interact()?;
            if !continue_without {
                return Ok(None);
            }
            match state
                .session_manager
                .resolve_recap(pending, RecapDecision::Decline)
                .await?
            {
                RecapResolution::Started(started) => Ok(Some(started)),
                RecapResolution::SummaryUnavailable { reason, .. } => {
                    Err(anyhow::anyhow!("could not start session: {reason}"))
                }
            }
        }
    }
}

fn recap_unavailable_notice(reason: &impl std::fmt::Display, continuing: bool) -> String {
    let notice = format!("Couldn't summarize your last session: {reason}");
    if continuing {
        format!("{notice}. Continuing without a recap.")
    } else {
        notice
    }
}

fn print_started(started: &StartedSession) {
    let conversation = &started.conversation;
    println!();
    println!(
        "  {} {} started",
        style("✓").green().bold(),
        style(&conversation.title).bold()
    );
    if let Some(archived) = started.archived {
        println!(
            "  {}",
            style(format!("Previous session {archived} archived")).dim()
        );
    }
    println!();
    print_message(&started.greeting, "Coach");
    println!();
    println!(
        "  Continue with: {}",
        style(format!("coachly chat {}", conversation.id)).yellow()
    );
    println!();
}

/// End (archive) a session.
pub async fn end_session(state: &AppState, user: UserId, id: &str, json: bool) -> Result<()> {
    let conversation = owned_session(state, user, id).await?;
    let ended = state.session_manager.end_session(&conversation.id).await?;
    state.close_chat(&ended.id);

    if json {
        println!("{}", serde_json::to_string_pretty(&ended)?);
    } else {
        println!(
            "  {} {} ended.",
            style("✓").green().bold(),
            style(&ended.title).bold()
        );
    }
    Ok(())
}

/// List the user's sessions grouped by coach.
pub async fn list_sessions(
    state: &AppState,
    user: UserId,
    kind: Option<SessionKind>,
    json: bool,
) -> Result<()> {
    let groups = state.session_manager.list_sessions(&user, kind).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&groups)?);
        return Ok(());
    }

    if groups.is_empty() {
        println!();
        println!(
            "  {} No sessions yet. Browse coaches with: {}",
            style("i").blue().bold(),
            style("coachly coach list").yellow()
        );
        println!();
        return Ok(());
    }

    for group in &groups {
        let coach_name = match state.coach_service.get_coach(&group.coach_id).await {
            Ok(coach) => coach.name,
            Err(e) => {
                tracing::debug!(coach_id = %group.coach_id, error = %e, "coach lookup failed");
                group.coach_id.to_string()
            }
        };

        let mut table = Table::new();
        table.load_preset(presets::UTF8_FULL_CONDENSED);
        table.set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec![
            Cell::new("Session").fg(Color::White),
            Cell::new("Kind").fg(Color::White),
            Cell::new("Status").fg(Color::White),
            Cell::new("Last Message").fg(Color::White),
            Cell::new("Recap").fg(Color::White),
            Cell::new("ID").fg(Color::White),
        ]);

        for conversation in &group.sessions {
            let status = match conversation.status {
                ConversationStatus::Active => Cell::new("● active").fg(Color::Green),
                ConversationStatus::Archived => Cell::new("◌ archived").fg(Color::DarkGrey),
            };
            table.add_row(vec![
                Cell::new(&conversation.title).fg(Color::Cyan),
                Cell::new(conversation.kind.to_string()),
                status,
                Cell::new(conversation.last_message_at.format("%Y-%m-%d %H:%M").to_string()),
                Cell::new(
                    conversation
                        .session_summary
                        .as_deref()
                        .map(|s| truncate(s, 40))
                        .unwrap_or_else(|| "-".to_string()),
                ),
                Cell::new(conversation.id.to_string()).fg(Color::DarkGrey),
            ]);
        }

        println!();
        println!("  {}", style(&coach_name).cyan().bold());
        println!("{table}");
    }
    println!();
    Ok(())
}

/// Show a session and its full message log.
pub async fn show_session(state: &AppState, user: UserId, id: &str, json: bool) -> Result<()> {
    let conversation = owned_session(state, user, id).await?;
    let chat = state
        .chat(&conversation.id)
        .await
        .context("failed to load session messages")?;
    let messages = chat.messages().await;

    if json {
        let body = serde_json::json!({
            "session": conversation,
            "messages": messages,
        });
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    println!();
    println!(
        "  {} with {}",
        style(&conversation.title).bold(),
        style(&chat.coach().name).cyan()
    );
    println!(
        "  {}",
        style(format!(
            "{} · {} · started {}",
            conversation.kind,
            conversation.status,
            conversation.created_at.format("%Y-%m-%d %H:%M UTC")
        ))
        .dim()
    );
    if let Some(summary) = &conversation.session_summary {
        println!();
        println!("  {} {}", style("Recap:").bold(), summary);
    }
    println!();
    for message in &messages {
        print_message(message, &chat.coach().name);
    }
    println!();
    Ok(())
}

/// Print one message with a sender label.
pub(crate) fn print_message(message: &Message, coach_name: &str) {
    match message.sender {
        SenderType::User => println!("  {} {}", style("You >").green().bold(), message.content),
        SenderType::Coach => {
            let label = if message.is_recap() {
                format!("{coach_name} (recap) >")
            } else {
                format!("{coach_name} >")
            };
            println!("  {} {}", style(label).cyan().bold(), message.content);
        }
    }
}
