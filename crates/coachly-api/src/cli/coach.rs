//! Coach catalogue CLI commands: create, list, show, delete.

use anyhow::Result;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;
use dialoguer::{Confirm, Input};

use coachly_types::coach::{Coach, CoachId, CreateCoachRequest};
use coachly_types::user::UserId;

use super::{CreateCoachArgs, spinner, truncate};
use crate::state::AppState;

fn prompt_if_missing(value: Option<String>, prompt: &str) -> Result<String> {
    match value {
        Some(v) => Ok(v),
        None => Ok(Input::<String>::new().with_prompt(prompt).interact_text()?),
    }
}

/// Split a comma separated answer into trimmed, non-empty items.
fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Create a coach from flags, prompting for any required field not given.
///
/// ```bash
/// coachly coach create --name Sarah --title "Productivity Coach" \
///     --description "Routines that stick" --prompt "You are Sarah..." \
///     --specialty habits --specialty focus --public
/// ```
pub async fn create_coach(
    state: &AppState,
    creator: UserId,
    args: CreateCoachArgs,
    json: bool,
) -> Result<()> {
    let name = prompt_if_missing(args.name, "Coach name")?;
    let title = prompt_if_missing(args.title, "Title")?;
    let description = prompt_if_missing(args.description, "Short description")?;
    let system_prompt = prompt_if_missing(args.prompt, "System prompt")?;
    let specialties = if args.specialties.is_empty() && !json {
        let raw: String = Input::new()
            .with_prompt("Specialties (comma separated)")
            .interact_text()?;
        split_list(&raw)
    } else {
        args.specialties
    };

    let request = CreateCoachRequest {
        name,
        title,
        description,
        system_prompt,
        specialties,
        personality_traits: args.traits,
        avatar_url: args.avatar_url,
        video_persona_id: args.video_persona,
        is_public: args.public,
    };

    let coach = state.coach_service.create_coach(creator, request).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&coach)?);
        return Ok(());
    }

    println!();
    println!("  {} Coach created!", style("✓").green().bold());
    println!();
    println!("  {}  {}", style("Name:").bold(), style(&coach.name).cyan());
    println!("  {}    {}", style("ID:").bold(), style(coach.id.to_string()).dim());
    println!(
        "  {} {}",
        style("Listed:").bold(),
        if coach.is_public { "public" } else { "private" }
    );
    println!();
    println!(
        "  Start a session: {}",
        style(format!("coachly session begin {}", coach.id)).yellow()
    );
    println!();
    Ok(())
}

/// List public coaches (most used first) or the caller's private coaches.
pub async fn list_coaches(state: &AppState, user: UserId, mine: bool, json: bool) -> Result<()> {
    let coaches = if mine {
        state.coach_service.list_private(&user).await?
    } else {
        state.coach_service.list_public().await?
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&coaches)?);
        return Ok(());
    }

    if coaches.is_empty() {
        println!();
        println!(
            "  {} No coaches found. Create one with: {}",
            style("i").blue().bold(),
            style("coachly coach create").yellow()
        );
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Name").fg(Color::White),
        Cell::new("Title").fg(Color::White),
        Cell::new("Specialties").fg(Color::White),
        Cell::new("Sessions").fg(Color::White),
        Cell::new("Video").fg(Color::White),
        Cell::new("ID").fg(Color::White),
    ]);

    for coach in &coaches {
        table.add_row(vec![
            Cell::new(&coach.name).fg(Color::Cyan),
            Cell::new(truncate(&coach.title, 30)),
            Cell::new(truncate(&coach.specialties.join(", "), 40)),
            Cell::new(coach.use_count),
            if coach.supports_video() {
                Cell::new("yes").fg(Color::Green)
            } else {
                Cell::new("-").fg(Color::DarkGrey)
            },
            Cell::new(coach.id.to_string()).fg(Color::DarkGrey),
        ]);
    }

    println!();
    println!("{table}");
    println!();
    println!(
        "  {} coach{}",
        style(coaches.len()).bold(),
        if coaches.len() == 1 { "" } else { "es" }
    );
    println!();
    Ok(())
}

/// Show a coach's full profile.
pub async fn show_coach(state: &AppState, user: UserId, id: &str, json: bool) -> Result<()> {
    let coach = state
        .coach_service
        .get_visible(&user, &parse_coach_id(id)?)
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&coach)?);
        return Ok(());
    }

    print_profile(&coach);
    Ok(())
}

fn print_profile(coach: &Coach) {
    println!();
    println!("  {}", style(&coach.name).cyan().bold());
    println!("  {}", style(&coach.title).dim());
    println!();
    println!("  {}", coach.description);
    println!();

    println!("  {}", style("── Details ──").dim());
    println!("  {}   {}", style("Specialties:").bold(), coach.specialties.join(", "));
    if !coach.personality_traits.is_empty() {
        println!(
            "  {}   {}",
            style("Personality:").bold(),
            coach.personality_traits.join(", ")
        );
    }
    println!(
        "  {}        {}",
        style("Listed:").bold(),
        if coach.is_public { "public" } else { "private" }
    );
    println!(
        "  {}         {}",
        style("Video:").bold(),
        if coach.supports_video() { "available" } else { "text only" }
    );
    println!("  {}      {}", style("Sessions:").bold(), coach.use_count);
    println!("  {}            {}", style("ID:").bold(), style(coach.id.to_string()).dim());
    println!(
        "  {}       {}",
        style("Created:").bold(),
        coach.created_at.format("%Y-%m-%d %H:%M UTC")
    );
    println!();
}

/// Delete a coach the user created, after confirmation.
pub async fn delete_coach(
    state: &AppState,
    user: UserId,
    id: &str,
    force: bool,
    json: bool,
) -> Result<()> {
    let coach = state.coach_service.get_coach(&parse_coach_id(id)?).await?;

    if !force && !json {
        let confirmed = Confirm::new()
            .with_prompt(format!(
                "Permanently delete coach '{}' and all sessions with them?",
                style(&coach.name).red().bold()
            ))
            .default(false)
            .interact()?;
        if !confirmed {
            println!("  Cancelled.");
            return Ok(());
        }
    }

    let progress = spinner(format!("Deleting {}...", coach.name));
    let result = state.coach_service.delete_coach(&user, &coach.id).await;
    progress.finish_and_clear();
    result?;

    if json {
        println!("{}", serde_json::json!({ "deleted": true, "id": coach.id.to_string() }));
    } else {
        println!("  {} Coach '{}' deleted.", style("✓").red().bold(), coach.name);
    }
    Ok(())
}

pub(crate) fn parse_coach_id(raw: &str) -> Result<CoachId> {
    raw.trim()
        .parse::<CoachId>()
        .map_err(|_| anyhow::anyhow!("invalid coach id '{raw}'"))
}
