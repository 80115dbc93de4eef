//! Connected-user listing for a representative.

use parley_session::SessionError;

use crate::app::App;

pub async fn run(app: &App, representative: &str) -> Result<(), SessionError> {
    let users = app.api.connected_users(representative).await?;
    if users.is_empty() {
        println!("no connected users");
        return Ok(());
    }
    for user in users {
        println!("{}\t{}", user.conversation_id, user.user_name);
    }
    Ok(())
}
