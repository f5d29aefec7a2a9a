use tabled::Tabled;

use crate::cli::ExportArgs;
use crate::client::UserApi;
use crate::config::Config;
use crate::controllers::export::{Exporter, FileDownloads};
use crate::decoder::Decoder;
use crate::error::Result;
use crate::output::{
    format_date, is_json_output, print_item, print_message, print_table, role_colored,
    status_colored,
};
use crate::types::{ExportMetadata, User};

#[derive(Tabled)]
struct DecodedRow {
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
}

impl From<&User> for DecodedRow {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            email: user.email.clone(),
            role: role_colored(user.role),
            status: status_colored(user.status),
            created: format_date(&user.created_at),
        }
    }
}

fn describe(metadata: &ExportMetadata) -> String {
    let mut parts = Vec::new();
    if let Some(count) = metadata.count {
        parts.push(format!("{count} users"));
    }
    if let Some(format) = &metadata.format {
        parts.push(format.clone());
    }
    if let Some(size) = metadata.size {
        parts.push(format!("{size} bytes"));
    }
    parts.join(", ")
}

pub async fn json<A: UserApi + ?Sized>(
    api: &A,
    config: &Config,
    decoder: &Decoder,
    args: ExportArgs,
) -> Result<()> {
    let sink = FileDownloads::new(config.resolve_export_dir(args.dir));
    let mut exporter = Exporter::new(api, sink, decoder);

    let path = exporter.export_json().await?;

    print_message(&format!("Saved JSON export to {}", path.display()));
    Ok(())
}

pub async fn binary<A: UserApi + ?Sized>(
    api: &A,
    config: &Config,
    decoder: &Decoder,
    args: ExportArgs,
) -> Result<()> {
    let sink = FileDownloads::new(config.resolve_export_dir(args.dir));
    let mut exporter = Exporter::new(api, sink, decoder);

    exporter.export_binary().await?;

    let details = exporter.metadata().map(describe).unwrap_or_default();
    if let Some(path) = exporter.saved_path() {
        if details.is_empty() {
            print_message(&format!("Saved binary export to {}", path.display()));
        } else {
            print_message(&format!("Saved binary export to {} ({details})", path.display()));
        }
    }
    Ok(())
}

/// Fetch the binary export and print what it contains without saving it.
pub async fn decode<A: UserApi + ?Sized>(
    api: &A,
    config: &Config,
    decoder: &Decoder,
) -> Result<()> {
    let sink = FileDownloads::new(config.resolve_export_dir(None));
    let mut exporter = Exporter::new(api, sink, decoder);

    let collection = exporter.decode_and_display().await?;

    if is_json_output() {
        print_item(&collection, |_| {});
        return Ok(());
    }

    println!("Exported at:    {}", format_date(&collection.exported_at));
    println!("Total count:    {}", collection.total_count);
    println!("Algorithm:      {}", collection.algorithm);
    println!("Hash algorithm: {}", collection.hash_algorithm);
    if let Some(metadata) = exporter.metadata() {
        let details = describe(metadata);
        if !details.is_empty() {
            println!("Headers:        {details}");
        }
    }
    println!();

    if collection.users.is_empty() {
        println!("No users in export");
    } else {
        print_table(&collection.users, |u| DecodedRow::from(u));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_metadata() {
        let metadata = ExportMetadata {
            count: Some(3),
            format: Some("protobuf".into()),
            size: Some(120),
        };
        assert_eq!(describe(&metadata), "3 users, protobuf, 120 bytes");
        assert_eq!(describe(&ExportMetadata::default()), "");
    }
}
