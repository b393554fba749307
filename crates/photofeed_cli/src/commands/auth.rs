//! Login and logout commands.

use super::{CommandResult, Session};
use photofeed_engine::CredentialStore;
use tracing::info;

/// Prints the authorization page URL.
pub fn authorize_url(session: &Session) -> CommandResult {
    let url = session.config().authorize_url()?;
    println!("{url}");
    Ok(())
}

/// Exchanges `code` for an access token and stores it.
pub async fn login(session: &Session, code: &str) -> CommandResult {
    let services = session.services()?;
    let token = services.auth().exchange_code(code).await?;
    info!(path = %session.token_file.display(), "access token stored");
    println!("Logged in ({} token, scopes: {})", token.token_type, token.scope);
    Ok(())
}

/// Removes the stored access token.
pub async fn logout(session: &Session) -> CommandResult {
    let store = session.credentials();
    if store.get().is_none() {
        println!("Not logged in");
        return Ok(());
    }
    session.services()?.logout().await?;
    println!("Logged out");
    Ok(())
}
