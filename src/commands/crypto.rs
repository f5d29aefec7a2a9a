use colored::Colorize;
use serde_json::json;

use crate::client::UserApi;
use crate::error::Result;
use crate::output::{is_json_output, print_item};

pub async fn public_key<A: UserApi + ?Sized>(api: &A) -> Result<()> {
    let key = api.public_key().await?;

    print_item(&key, |k| {
        if !k.algorithm.is_empty() {
            println!("Algorithm:      {}", k.algorithm);
        }
        if !k.hash_algorithm.is_empty() {
            println!("Hash algorithm: {}", k.hash_algorithm);
        }
        println!();
        println!("{}", k.public_key.trim_end());
    });

    Ok(())
}

pub async fn verify<A: UserApi + ?Sized>(api: &A, data: &str, signature: &str) -> Result<()> {
    let valid = api.verify_signature(data, signature).await?;

    if is_json_output() {
        print_item(&json!({ "valid": valid }), |_| {});
    } else if valid {
        println!("{}", "Signature is valid".green());
    } else {
        println!("{}", "Signature is NOT valid".red());
    }

    Ok(())
}
