//! API client module for the task-board service

mod boards;
mod cards;
pub mod client;
mod lists;
mod users;

use anyhow::{bail, Context, Result};

use crate::models::{Board, Card, CardMetadata, TaskList, UserProfile, UserUpdate};
use client::ApiClient;

/// Truncate for one-line display (char_indices avoids mid-codepoint panic).
fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let end = text
        .char_indices()
        .nth(max.saturating_sub(3))
        .map(|(i, _)| i)
        .unwrap_or(text.len());
    format!("{}...", &text[..end])
}

fn card_line(card: &Card) -> String {
    let title = card.title.as_deref().unwrap_or("(untitled)");
    let mut line = format!("#{} {}", card.id, truncate(title, 60));
    if let Some(ref label) = card.label {
        line.push_str(&format!(" [{}]", label));
    }
    if let Some(ref user) = card.assigned_user {
        line.push_str(&format!(" @{}", user.name.as_deref().unwrap_or(&user.id)));
    }
    line
}

/// Find a list on `board` by id or by name.
fn resolve_list<'a>(board: &'a Board, target: &str) -> Option<&'a TaskList> {
    if let Ok(id) = target.parse::<i64>() {
        if let Some(list) = board.lists.iter().find(|l| l.id == id) {
            return Some(list);
        }
    }
    board.list_named(target)
}

/// List boards (public plus own private ones)
pub async fn list_boards(client: &ApiClient, mine: bool) -> Result<()> {
    let boards = if mine {
        client.my_boards().await?
    } else {
        client.list_boards().await?
    };

    let me = client.store().get_cached_user().and_then(|u| u.id);
    let visible: Vec<&Board> = boards
        .iter()
        .filter(|b| mine || b.visible_to(me.as_deref()))
        .collect();

    println!("\nBoards:");
    println!("{:-<60}", "");
    for board in &visible {
        let privacy = if board.is_private { " (private)" } else { "" };
        println!("{:>5}  {}{}", board.id, board.name, privacy);
        if let Some(ref owner) = board.owner_name {
            println!("       owner: {}", owner);
        }
    }
    if visible.is_empty() {
        println!("  (no boards found)");
    }

    Ok(())
}

/// Show a board with its lists and cards
pub async fn show_board(client: &ApiClient, id: i64) -> Result<()> {
    let board = client.get_board(id).await?;

    println!("\n{} (#{})", board.name, board.id);
    println!("{:=<60}", "");
    for list in &board.lists {
        println!("\n{} (list #{}, {} cards)", list.name, list.id, list.cards.len());
        println!("{:-<60}", "");
        for card in &list.cards {
            println!("  {}", card_line(card));
        }
    }
    if board.lists.is_empty() {
        println!("  (no lists)");
    }

    Ok(())
}

pub async fn create_board(client: &ApiClient, name: &str, private: bool) -> Result<()> {
    let owner = client.store().get_cached_user().map(|u| u.name);
    let board = client.create_board(name, private, owner.as_deref()).await?;
    println!("Created board #{} '{}'.", board.id, board.name);
    Ok(())
}

pub async fn rename_board(client: &ApiClient, id: i64, name: &str) -> Result<()> {
    let board = client.get_board(id).await?;
    let updated = client.rename_board(&board, name).await?;
    println!("Board #{} renamed to '{}'.", updated.id, updated.name);
    Ok(())
}

pub async fn delete_board(client: &ApiClient, id: i64) -> Result<()> {
    client.delete_board(id).await?;
    println!("Board #{} deleted.", id);
    Ok(())
}

/// All lists across the boards the caller can see
pub async fn list_lists(client: &ApiClient) -> Result<()> {
    let lists = client.list_lists().await?;

    println!("\nLists:");
    println!("{:-<60}", "");
    for list in &lists {
        println!("{:>5}  {} ({} cards)", list.id, list.name, list.cards.len());
    }
    if lists.is_empty() {
        println!("  (no lists found)");
    }
    Ok(())
}

pub async fn show_list(client: &ApiClient, id: i64) -> Result<()> {
    let list = client.get_list(id).await?;

    println!("\n{} (list #{})", list.name, list.id);
    println!("{:-<60}", "");
    for card in &list.cards {
        println!("  {}", card_line(card));
    }
    if list.cards.is_empty() {
        println!("  (no cards)");
    }
    Ok(())
}

pub async fn create_list(client: &ApiClient, board_id: i64, name: &str) -> Result<()> {
    let list = client.create_list(board_id, name).await?;
    println!("Created list #{} '{}'.", list.id, list.name);
    Ok(())
}

pub async fn rename_list(client: &ApiClient, id: i64, name: &str) -> Result<()> {
    let list = client.rename_list(id, name).await?;
    println!("List #{} renamed to '{}'.", list.id, list.name);
    Ok(())
}

pub async fn delete_list(client: &ApiClient, id: i64) -> Result<()> {
    client.delete_list(id).await?;
    println!("List #{} deleted.", id);
    Ok(())
}

pub async fn list_cards(client: &ApiClient) -> Result<()> {
    let cards = client.list_cards().await?;

    println!("\nCards:");
    println!("{:-<60}", "");
    for card in &cards {
        let state = card.current_state.as_deref().unwrap_or("-");
        println!("  {:<14} {}", state, card_line(card));
    }
    if cards.is_empty() {
        println!("  (no cards found)");
    }
    Ok(())
}

pub async fn create_card(
    client: &ApiClient,
    list_id: i64,
    title: &str,
    label: Option<&str>,
) -> Result<()> {
    let card = client.create_card(list_id, title, label).await?;
    println!("Created {}", card_line(&card));
    Ok(())
}

/// Show one card with its activity log
pub async fn show_card(client: &ApiClient, id: i64) -> Result<()> {
    let card = client.get_card(id).await?;

    println!("\n{}", card_line(&card));
    println!("  State:   {}", card.current_state.as_deref().unwrap_or("(none)"));
    if let Some(ref due) = card.due_date {
        println!("  Due:     {}", due);
    }
    if let Some(ref desc) = card.description {
        println!("  Details: {}", desc);
    }
    for comment in &card.comments {
        println!("  > {}", comment);
    }
    if !card.state_history.is_empty() {
        println!("  History:");
        for entry in &card.state_history {
            println!("    - {}", entry);
        }
    }
    Ok(())
}

pub async fn delete_card(client: &ApiClient, id: i64) -> Result<()> {
    client.delete_card(id).await?;
    println!("Card #{} deleted.", id);
    Ok(())
}

/// Move a card to another list of its board, adopting the list's name as state.
pub async fn move_card(client: &ApiClient, board_id: i64, card_id: i64, to: &str) -> Result<()> {
    let board = client.get_board(board_id).await?;
    let target = resolve_list(&board, to)
        .with_context(|| format!("No list '{}' on board #{}", to, board_id))?;

    if board.list_of_card(card_id).map(|l| l.id) == Some(target.id) {
        println!("Card #{} is already in '{}'.", card_id, target.name);
        return Ok(());
    }

    client.drop_card(card_id, target).await?;
    println!("Card #{} moved to '{}'.", card_id, target.name);
    Ok(())
}

pub async fn transition_card(client: &ApiClient, id: i64, state: &str) -> Result<()> {
    let message = client.transition_card(id, state).await?;
    println!("{}", message);
    Ok(())
}

pub async fn assign_card(client: &ApiClient, id: i64, user_id: Option<&str>) -> Result<()> {
    let message = client.assign_card(id, user_id).await?;
    println!("{}", message);
    Ok(())
}

pub async fn edit_card(
    client: &ApiClient,
    id: i64,
    title: Option<&str>,
    label: Option<&str>,
) -> Result<()> {
    let metadata = CardMetadata { title, label };
    if metadata.is_empty() {
        bail!("Nothing to change: pass --title and/or --label");
    }
    let card = client.update_card_metadata(id, &metadata).await?;
    println!("Updated {}", card_line(&card));
    Ok(())
}

pub async fn card_history(client: &ApiClient, id: i64) -> Result<()> {
    let history = client.card_history(id).await?;

    println!("\nHistory of card #{}:", id);
    for entry in &history {
        println!("  - {}", entry);
    }
    if history.is_empty() {
        println!("  (no activity)");
    }
    Ok(())
}

pub async fn list_users(client: &ApiClient) -> Result<()> {
    let users = client.list_users().await?;

    println!("\nUsers:");
    println!("{:-<60}", "");
    for user in &users {
        println!(
            "{}  {} <{}>",
            user.id,
            user.name.as_deref().unwrap_or("Unknown User"),
            user.email.as_deref().unwrap_or("")
        );
    }
    Ok(())
}

/// Change a user's name and/or email. Updating yourself refreshes the
/// cached profile.
pub async fn update_user(
    client: &ApiClient,
    id: &str,
    name: Option<&str>,
    email: Option<&str>,
) -> Result<()> {
    if name.is_none() && email.is_none() {
        bail!("Nothing to change: pass --name and/or --email");
    }

    let user = client.update_user(id, &UserUpdate { name, email }).await?;
    let is_me = client
        .store()
        .get_cached_user()
        .and_then(|u| u.id)
        .as_deref()
        == Some(user.id.as_str());

    let profile = UserProfile::from(user);
    if is_me {
        client.store().set_cached_user(&profile);
    }
    println!("Updated {} <{}>.", profile.name, profile.email);
    Ok(())
}
