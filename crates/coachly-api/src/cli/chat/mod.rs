//! Interactive chat loop for an open session.
//!
//! Reads lines from the terminal, sends them through the session's
//! [`ChatController`](coachly_core::chat::controller::ChatController), and
//! prints the coach's replies. Failed replies leave the user's message in
//! place and can be retried with `/retry`.

pub mod commands;

use anyhow::Result;
use console::style;
use dialoguer::Input;

use coachly_types::error::SendError;
use coachly_types::quota::{Entitlement, QuotaStatus, QuotaWarning};
use coachly_types::user::UserId;

use self::commands::ChatCommand;
use super::session::{owned_session, print_message};
use super::spinner;
use crate::state::{AppState, ConcreteChat};

/// Run the interactive chat loop for a session the user owns.
pub async fn run_chat(
    state: &AppState,
    user: UserId,
    entitlement: Entitlement,
    conversation: &str,
) -> Result<()> {
    let conversation = owned_session(state, user, conversation).await?;
    let chat = state.chat(&conversation.id).await?;
    let coach_name = chat.coach().name.clone();

    print_banner(&chat);
    for message in chat.messages().await {
        print_message(&message, &coach_name);
    }
    println!();
    if !conversation.is_active() {
        println!(
            "  {}",
            style("This session is archived. Begin a new one with `coachly session begin`.").dim()
        );
        println!();
    }

    loop {
        let Some(line) = read_line().await? else {
            println!("\n  {}", style("Chat closed. Your session stays open.").dim());
            break;
        };

        if let Some(command) = commands::parse(&line) {
            match command {
                ChatCommand::Help => commands::print_help(),
                ChatCommand::Exit => {
                    println!("  {}", style("Chat closed. Your session stays open.").dim());
                    break;
                }
                ChatCommand::Retry => retry(&chat, &coach_name).await?,
                ChatCommand::Quota => print_quota(&chat.quota(entitlement).await),
                ChatCommand::History => {
                    println!();
                    for message in chat.messages().await {
                        print_message(&message, &coach_name);
                    }
                    println!();
                }
                ChatCommand::Video => {
                    let progress = spinner("Setting up a video call...");
                    let result = chat.join_video().await;
                    progress.finish_and_clear();
                    match result {
                        Ok(video) => println!(
                            "  {} Join your call: {}",
                            style("▶").green().bold(),
                            style(&video.conversation_url).cyan().underlined()
                        ),
                        Err(e) => println!(
                            "  {} Video is not available: {e}",
                            style("!").yellow().bold()
                        ),
                    }
                }
                ChatCommand::End => {
                    let ended = state.session_manager.end_session(&conversation.id).await?;
                    state.close_chat(&ended.id);
                    println!("  {} {} ended.", style("✓").green().bold(), ended.title);
                    break;
                }
                ChatCommand::Unknown(cmd) => println!(
                    "  {} Unknown command {cmd}. Type /help for commands.",
                    style("?").yellow().bold()
                ),
            }
            continue;
        }

        if line.trim().is_empty() {
            continue;
        }
        send(&chat, &coach_name, &line, entitlement).await?;
    }

    Ok(())
}

fn print_banner(chat: &ConcreteChat) {
    let coach = chat.coach();
    let conversation = chat.conversation();
    println!();
    println!("  {}", style(&coach.name).cyan().bold());
    println!("  {}", style(&coach.title).dim());
    println!();
    println!(
        "  {}  {}",
        style("Session:").bold(),
        style(&conversation.title).dim()
    );
    println!();
    println!("  {}", style("Type /help for commands, Ctrl+D to exit").dim());
    println!("  {}", style("---").dim());
    println!();
}

/// Read one line. `None` on end of input.
async fn read_line() -> Result<Option<String>> {
    let prompt = format!("{}", style("You").green().bold());
    let result = tokio::task::spawn_blocking(move || {
        Input::<String>::new()
            .with_prompt(prompt)
            .allow_empty(true)
            .interact_text()
    })
    .await?;

    match result {
        Ok(line) => Ok(Some(line)),
        Err(dialoguer::Error::IO(e))
            if matches!(
                e.kind(),
                std::io::ErrorKind::UnexpectedEof | std::io::ErrorKind::Interrupted
            ) =>
        {
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

async fn send(chat: &ConcreteChat, coach_name: &str, text: &str, entitlement: Entitlement) -> Result<()> {
    let progress = spinner(format!("{coach_name} is typing..."));
    let result = chat.send_message(text, entitlement).await;
    progress.finish_and_clear();

    match result {
        Ok(exchange) => {
            print_message(&exchange.reply, coach_name);
            if let Some(notice) = quota_notice(&chat.quota(entitlement).await) {
                println!("  {}", style(notice).yellow());
            }
        }
        Err(SendError::QuotaExceeded { limit }) => {
            println!();
            println!(
                "  {} You've used all {limit} free messages in this session.",
                style("★").magenta().bold()
            );
            println!(
                "  {}",
                style("Upgrade to premium for unlimited coaching (--premium).").magenta()
            );
            println!();
        }
        Err(SendError::ReplyFailed { reason, .. }) => {
            println!(
                "  {} {coach_name} couldn't reply: {reason}",
                style("!").yellow().bold()
            );
            println!("  {}", style("Your message was saved. Type /retry to try again.").dim());
        }
        Err(e @ SendError::ReplyNotStored { .. }) => {
            println!("  {} {e}", style("!").yellow().bold());
            println!("  {}", style("Type /retry to try again.").dim());
        }
        Err(SendError::EmptyMessage) => {}
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

async fn retry(chat: &ConcreteChat, coach_name: &str) -> Result<()> {
    let progress = spinner(format!("{coach_name} is typing..."));
    let result = chat.retry_reply().await;
    progress.finish_and_clear();

    match result {
        Ok(reply) => print_message(&reply, coach_name),
        Err(SendError::NothingToRetry) => {
            println!("  {}", style("Nothing to retry.").dim());
        }
        Err(SendError::ReplyFailed { reason, .. }) => {
            println!(
                "  {} {coach_name} still couldn't reply: {reason}",
                style("!").yellow().bold()
            );
        }
        Err(e @ SendError::ReplyNotStored { .. }) => {
            println!("  {} {e}", style("!").yellow().bold());
        }
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

fn print_quota(status: &QuotaStatus) {
    match status.remaining {
        None => println!("  {}", style("Premium: unlimited messages.").green()),
        Some(remaining) => println!(
            "  {} of {} free messages left in this session.",
            style(remaining).bold(),
            status.limit
        ),
    }
}

/// Upsell line to show after a send, if any.
fn quota_notice(status: &QuotaStatus) -> Option<String> {
    match (status.warning, status.remaining) {
        (QuotaWarning::Approaching, Some(1)) => Some("1 free message left in this session.".to_string()),
        (QuotaWarning::Approaching, Some(n)) => Some(format!("{n} free messages left in this session.")),
        (QuotaWarning::Blocked, _) => Some(format!(
            "You've reached the {} message free limit. Upgrade to premium to keep going.",
            status.limit
        )),
        _ => None,
    }
}
