use colored::Colorize;

use crate::client::UserApi;
use crate::error::Result;
use crate::output::print_item;

pub async fn check<A: UserApi + ?Sized>(api: &A) -> Result<()> {
    let report = api.health().await?;

    print_item(&report, |r| {
        println!("{}", "Backend is reachable".green());
        if let Some(fields) = r.as_object() {
            for (key, value) in fields {
                let value = value
                    .as_str()
                    .map(str::to_string)
                    .unwrap_or_else(|| value.to_string());
                println!("  {key}: {value}");
            }
        }
    });

    Ok(())
}
