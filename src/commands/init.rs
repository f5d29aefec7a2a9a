use std::io::{self, Write};

use crate::config::{Config, DEFAULT_API_URL, DEFAULT_PAGE_SIZE};
use crate::error::{AdminError, Result};

fn prompt(message: &str) -> Result<String> {
    print!("{message}");
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

pub async fn run() -> Result<()> {
    let config_path = Config::config_path()?;

    if config_path.exists() {
        let answer = prompt(&format!(
            "Config file already exists at {}. Overwrite? [y/N] ",
            config_path.display()
        ))?;

        if !answer.eq_ignore_ascii_case("y") {
            println!("Aborted.");
            return Ok(());
        }
    }

    println!("Admin Panel Configuration");
    println!("=========================\n");

    let api_url = prompt(&format!("API base URL [{DEFAULT_API_URL}]: "))?;
    if !api_url.is_empty() {
        url::Url::parse(&api_url).map_err(|_| AdminError::InvalidUrl(api_url.clone()))?;
    }

    let page_size = prompt(&format!("Users per page [{DEFAULT_PAGE_SIZE}]: "))?;
    let page_size = page_size.parse::<u32>().ok().filter(|n| *n > 0);

    let export_dir = prompt("Export directory [current directory]: ")?;

    let config = Config {
        api_url: (!api_url.is_empty()).then_some(api_url),
        page_size,
        export_dir: (!export_dir.is_empty()).then(|| export_dir.into()),
        ..Config::default()
    };

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| AdminError::ConfigRead {
            path: config_path.clone(),
            source: e,
        })?;
    }

    let contents = toml::to_string_pretty(&config)?;

    std::fs::write(&config_path, contents).map_err(|e| AdminError::ConfigRead {
        path: config_path.clone(),
        source: e,
    })?;

    let schema_path = config.ensure_schema()?;

    println!("\nConfig saved to {}", config_path.display());
    println!("Binary export schema at {}", schema_path.display());
    println!("Run 'admin login <TOKEN>' to authenticate, then 'admin users list'.");

    Ok(())
}
