//! Feed listing and like commands.

use super::{CommandResult, OutputFormat, Session};
use photofeed_engine::{FeedHandle, FeedView, Photo};
use tracing::debug;

/// Loads `pages` pages and prints the photos.
pub async fn list(session: &Session, pages: u32, format: OutputFormat) -> CommandResult {
    let services = session.services()?;
    let feed = services.feed();
    let mut view = FeedView::new();

    for _ in 0..pages {
        let loaded = feed.fetch_next_page().await?;
        debug!(page = loaded.page, rows = ?loaded.inserted, "page loaded");
        if loaded.inserted.is_empty() {
            break;
        }
    }
    let snapshot = feed.snapshot().await?;
    view.sync(&snapshot.photos);

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&snapshot)?),
        OutputFormat::Text => {
            for (index, photo) in view.photos().iter().enumerate() {
                println!("{}", describe(index, photo));
            }
            println!(
                "{} photos, {} pages loaded",
                view.len(),
                snapshot.last_loaded_page
            );
        }
    }
    Ok(())
}

/// Loads pages until row `index` exists, then toggles its like.
pub async fn like(session: &Session, index: usize) -> CommandResult {
    let services = session.services()?;
    let feed = services.feed();
    load_until(feed, index).await?;

    let liked = feed.toggle_like(index).await?;
    let snapshot = feed.snapshot().await?;
    if let Some(photo) = snapshot.photos.get(index) {
        println!("{}", describe(index, photo));
    }
    println!("{}", if liked { "Liked" } else { "Unliked" });
    Ok(())
}

async fn load_until(feed: &FeedHandle, index: usize) -> CommandResult {
    loop {
        let len = feed.snapshot().await?.photos.len();
        if index < len {
            return Ok(());
        }
        let loaded = feed.fetch_next_page().await?;
        if loaded.inserted.is_empty() {
            return Err(format!("feed has only {len} photos").into());
        }
    }
}

fn describe(index: usize, photo: &Photo) -> String {
    let marker = if photo.is_liked { "♥" } else { " " };
    let created = photo
        .created_at
        .map(|t| t.format("%Y-%m-%d").to_string())
        .unwrap_or_default();
    format!(
        "{index:>4} {marker} {:<12} {:>5}x{:<5} {:<10} {}",
        photo.id,
        photo.size.width,
        photo.size.height,
        created,
        photo.description.as_deref().unwrap_or("")
    )
}
