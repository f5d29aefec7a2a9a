use crate::error::Result;
use crate::output::print_message;
use crate::session::{FileTokenStore, TokenStore};

pub fn login(token: &str) -> Result<()> {
    let store = FileTokenStore::load()?;
    store.set_token(token.trim())?;

    print_message(&format!("Token saved to {}", store.path().display()));
    Ok(())
}

pub fn logout() -> Result<()> {
    let store = FileTokenStore::load()?;
    store.clear();

    print_message("Logged out");
    Ok(())
}
