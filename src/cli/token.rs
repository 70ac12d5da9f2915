use anyhow::Result;

use crate::config::Config;

/// Prints a bearer token for `sub`, for clients syncing through the REST api.
pub fn token(config: &Config, sub: &str) -> Result<()> {
    if sub.is_empty() {
        anyhow::bail!("subject must not be empty");
    }

    let token = crate::auth::generate_token(&config.jwt, sub)?;
    println!("{token}");

    Ok(())
}
