//! Interactive first-run setup.
//!
//! Creates the token store when missing, then insists on an existing
//! admin identity before issuing the first secret. The secret is printed
//! once, together with a ready-to-use login URL, and never stored.

use crate::auth::{keys, TokenStore};
use crate::config::Config;
use crate::exec::CommandExecutor;
use crate::identity::IdentityResolver;
use anyhow::Result;
use std::sync::Arc;

pub async fn run(config: &Config, executor: Arc<dyn CommandExecutor>) -> Result<()> {
    println!("Running setup...");
    if TokenStore::create_if_missing(&config.token_store_path)? {
        println!("Initialising new token store...");
    }
    let store = TokenStore::open(&config.token_store_path)?;
    let resolver = IdentityResolver::new(executor);

    let username = loop {
        let input: String = dialoguer::Input::new()
            .with_prompt("Enter user to generate key for (must be a valid user in the 'sudo' group)")
            .interact_text()?;
        let candidate = input.trim().to_string();
        if resolver.exists(&candidate).await && resolver.is_admin(&candidate).await {
            break candidate;
        }
        println!("'{candidate}' is not an existing user in the admin group, try again.");
    };

    let secret = keys::generate_secret();
    store.insert(&keys::hash_secret(&secret), &username)?;

    println!("Generated the following key. Keep it safe!:");
    println!("{secret}");
    println!("Alternatively, save this URL:");
    println!("{}", config.login_url(&secret));
    Ok(())
}
