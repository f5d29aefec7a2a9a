use std::io::{self, Write};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tabled::Tabled;
use tokio::sync::watch;

use crate::cli::{UserCreateArgs, UserListArgs, UserUpdateArgs};
use crate::client::UserApi;
use crate::config::Config;
use crate::controllers::listing::UserListing;
use crate::error::{AdminError, ApiError, Result};
use crate::output::{
    format_date, is_json_output, print_item, print_message, print_table, role_colored,
    status_colored, truncate,
};
use crate::types::{NewUser, Pagination, User, UserFilters, UserUpdate};

const EMAIL_PATTERN: &str = r"^[^\s@]+@[^\s@]+\.[^\s@]+$";

#[derive(Tabled)]
struct UserRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Email")]
    email: String,
    #[tabled(rename = "Role")]
    role: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Created")]
    created: String,
    #[tabled(rename = "Signature")]
    signature: String,
}

impl From<&User> for UserRow {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            email: user.email.clone(),
            role: role_colored(user.role),
            status: status_colored(user.status),
            created: format_date(&user.created_at),
            signature: truncate(&user.signature, 16),
        }
    }
}

#[derive(Serialize)]
struct ListingOutput<'a> {
    users: Vec<&'a User>,
    pagination: Option<&'a Pagination>,
}

static EMAIL_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(EMAIL_PATTERN).expect("email regex should compile"));

fn is_valid_email(email: &str) -> bool {
    EMAIL_REGEX.is_match(email.trim())
}

fn validate_email(email: &str) -> Result<()> {
    if is_valid_email(email) {
        Ok(())
    } else {
        Err(AdminError::InvalidEmail(email.to_string()))
    }
}

fn confirm_delete(id: &str) -> bool {
    print!("Delete user {id}? [y/N] ");
    if io::stdout().flush().is_err() {
        return false;
    }

    let mut input = String::new();
    io::stdin().read_line(&mut input).is_ok() && input.trim().eq_ignore_ascii_case("y")
}

/// Print a progress line to stderr each time a delete starts.
async fn report_deleting(mut busy: watch::Receiver<Option<String>>) {
    while busy.changed().await.is_ok() {
        if let Some(id) = busy.borrow_and_update().clone() {
            eprintln!("Deleting user {id}...");
        }
    }
}

/// Surface the error a listing operation left behind.
fn listing_result<A: UserApi + ?Sized>(listing: &UserListing<'_, A>) -> Result<()> {
    match listing.error() {
        Some(message) => Err(ApiError::Other(message.to_string()).into()),
        None => Ok(()),
    }
}

pub async fn list<A: UserApi + ?Sized>(
    api: &A,
    config: &Config,
    args: UserListArgs,
) -> Result<()> {
    let filters = UserFilters {
        search: args.search.unwrap_or_default(),
        role: args.role,
        status: args.status,
    };
    let mut listing =
        UserListing::new(api, args.limit.unwrap_or(config.page_size())).with_filters(filters);

    listing.set_page(args.page).await;
    listing_result(&listing)?;

    let visible = listing.visible_users();

    if is_json_output() {
        print_item(
            &ListingOutput {
                users: visible,
                pagination: listing.pagination(),
            },
            |_| {},
        );
        return Ok(());
    }

    if visible.is_empty() {
        println!("No verified users on this page");
    } else {
        print_table(&visible, |u| UserRow::from(*u));
    }

    if let Some(p) = listing.pagination() {
        let hidden = listing.verified_users().len() - visible.len();
        let mut footer = format!("Page {} of {} ({} total)", p.page, p.total_pages, p.total);
        if hidden > 0 {
            footer.push_str(&format!(", {hidden} filtered out"));
        }
        println!("{footer}");
    }

    Ok(())
}

pub async fn show<A: UserApi + ?Sized>(api: &A, id: &str) -> Result<()> {
    let user = api.get_user(id).await?;

    print_item(&user, |u| {
        println!("{}", u.email);
        println!();
        println!("ID:        {}", u.id);
        println!("Role:      {}", role_colored(u.role));
        println!("Status:    {}", status_colored(u.status));
        println!("Created:   {}", format_date(&u.created_at));
        println!("Hash:      {}", if u.email_hash.is_empty() { "-" } else { &u.email_hash });
        println!("Signature: {}", if u.signature.is_empty() { "-" } else { &u.signature });
    });

    Ok(())
}

pub async fn create<A: UserApi + ?Sized>(
    api: &A,
    config: &Config,
    args: UserCreateArgs,
) -> Result<()> {
    validate_email(&args.email)?;

    let new_user = NewUser {
        email: args.email.trim().to_string(),
        role: args.role,
        status: args.status,
    };

    let mut listing = UserListing::new(api, config.page_size());
    let created = listing.create_user(&new_user).await?;

    print_message(&format!("Created user {} - {}", created.id, created.email));
    Ok(())
}

pub async fn update<A: UserApi + ?Sized>(
    api: &A,
    config: &Config,
    args: UserUpdateArgs,
) -> Result<()> {
    if let Some(email) = &args.email {
        validate_email(email)?;
    }

    let update = UserUpdate {
        email: args.email.map(|e| e.trim().to_string()),
        role: args.role,
        status: args.status,
    };

    if update.is_empty() {
        print_message("No updates specified");
        return Ok(());
    }

    let mut listing = UserListing::new(api, config.page_size());
    let updated = listing.update_user(&args.id, &update).await?;

    print_message(&format!("Updated user {} - {}", updated.id, updated.email));
    Ok(())
}

pub async fn delete<A: UserApi + ?Sized>(
    api: &A,
    config: &Config,
    id: &str,
    yes: bool,
) -> Result<()> {
    let mut listing = UserListing::new(api, config.page_size());
    let busy = listing.subscribe_deleting();

    let deleted = tokio::select! {
        result = listing.delete_user(id, |id| yes || confirm_delete(id)) => result?,
        // the sender lives in `listing`, so this only ends if it is gone
        () = report_deleting(busy) => false,
    };

    if deleted {
        print_message(&format!("Deleted user {id}"));
    } else {
        println!("Aborted.");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_pattern_compiles() {
        assert!(Regex::new(EMAIL_PATTERN).is_ok());
        Lazy::force(&EMAIL_REGEX);
    }

    #[test]
    fn test_email_validation() {
        assert!(is_valid_email("alice@example.com"));
        assert!(is_valid_email("  bob@mail.example.org "));
        assert!(!is_valid_email("alice"));
        assert!(!is_valid_email("alice@example"));
        assert!(!is_valid_email("al ice@example.com"));
        assert!(matches!(
            validate_email("nope"),
            Err(AdminError::InvalidEmail(e)) if e == "nope"
        ));
    }
}
