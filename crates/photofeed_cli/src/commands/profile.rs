//! Profile command.

use super::{CommandResult, OutputFormat, Session};
use serde::Serialize;

#[derive(Debug, Serialize)]
struct ProfileOutput {
    #[serde(flatten)]
    profile: photofeed_engine::Profile,
    #[serde(skip_serializing_if = "Option::is_none")]
    avatar_url: Option<String>,
}

/// Prints the logged-in user's profile, optionally with the avatar URL.
pub async fn run(session: &Session, avatar: bool, format: OutputFormat) -> CommandResult {
    let services = session.services()?;
    let profile = services.profile().fetch_profile().await?;
    let avatar_url = if avatar {
        Some(
            services
                .profile()
                .fetch_avatar_url(&profile.username)
                .await?,
        )
    } else {
        None
    };

    match format {
        OutputFormat::Json => {
            let output = ProfileOutput {
                profile,
                avatar_url,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Text => {
            println!("{} ({})", profile.name, profile.login_name);
            if !profile.bio.is_empty() {
                println!("{}", profile.bio);
            }
            if let Some(url) = avatar_url {
                println!("Avatar: {url}");
            }
        }
    }
    Ok(())
}
