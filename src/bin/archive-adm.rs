use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use pacs_archive::acl::AccessControlEntry;
use pacs_archive::config::Config;
use pacs_archive::peers::ApplicationEntity;
use serde_json::Value as JsonValue;

#[derive(Parser, Debug)]
#[command(name = "archive-adm", about = "Administer a PACS archive database")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Manage the access control list
    Authorization {
        #[command(subcommand)]
        action: AuthorizationCmd,
    },
    /// Manage the move destinations
    Peers {
        #[command(subcommand)]
        action: PeersCmd,
    },
    /// Store a DICOM file in the archive
    Import { file: PathBuf },
    /// Write a stored instance to a DICOM file
    Export { sop_instance_uid: String, file: PathBuf },
}

#[derive(Subcommand, Debug)]
enum AuthorizationCmd {
    List,
    Add {
        /// User name, `*` for any authenticated user, empty for anonymous
        #[arg(long)]
        principal: String,
        /// Echo, Query, Retrieve, Store or `*`
        #[arg(long)]
        service: String,
        /// JSON object restricting the visible data sets
        #[arg(long)]
        constraint: Option<String>,
    },
    Remove {
        #[arg(long)]
        principal: String,
        #[arg(long)]
        service: String,
    },
}

#[derive(Subcommand, Debug)]
enum PeersCmd {
    List,
    Add { ae_title: String, host: String, port: u16 },
    Remove { ae_title: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::from_file(&cli.config)?;
    let archive = pacs_archive::build_archive(&config)?;

    match cli.cmd {
        Cmd::Authorization { action } => match action {
            AuthorizationCmd::List => {
                for entry in archive.acl().get_entries().await? {
                    println!(
                        "{:<16} {:<10} {}",
                        display_principal(&entry.principal),
                        entry.service,
                        entry.constraint
                    );
                }
            }
            AuthorizationCmd::Add {
                principal,
                service,
                constraint,
            } => {
                let constraint = match constraint {
                    Some(text) => serde_json::from_str(&text).context("Invalid constraint")?,
                    None => JsonValue::Object(Default::default()),
                };
                archive
                    .acl()
                    .add_entry(&AccessControlEntry::new(principal, service, constraint))
                    .await?;
            }
            AuthorizationCmd::Remove { principal, service } => {
                let removed = archive.acl().remove_entries(&principal, &service).await?;
                println!("Removed {} entries", removed);
            }
        },
        Cmd::Peers { action } => match action {
            PeersCmd::List => {
                for peer in archive.peers().list().await? {
                    println!("{:<16} {}:{}", peer.ae_title, peer.host, peer.port);
                }
            }
            PeersCmd::Add {
                ae_title,
                host,
                port,
            } => {
                archive
                    .peers()
                    .add(&ApplicationEntity::new(ae_title, host, port))
                    .await?;
            }
            PeersCmd::Remove { ae_title } => {
                let removed = archive.peers().remove(&ae_title).await?;
                println!("Removed {} peers", removed);
            }
        },
        Cmd::Import { file } => {
            let data_set = dicom_json_tool::read_part10(&file)
                .with_context(|| format!("Cannot read {}", file.display()))?;
            let uid = data_set
                .as_string(dimse::tags::SOP_INSTANCE_UID, 0)
                .unwrap_or_default()
                .to_string();
            if archive.storage().exists(&uid).await? {
                println!("{} already stored", uid);
            } else {
                archive.storage().store(&data_set).await?;
                println!("Stored {}", uid);
            }
        }
        Cmd::Export {
            sop_instance_uid,
            file,
        } => {
            let data_set = archive.storage().retrieve(&sop_instance_uid).await?;
            dicom_json_tool::write_part10(&file, &data_set)
                .with_context(|| format!("Cannot write {}", file.display()))?;
            println!("Wrote {}", file.display());
        }
    }
    Ok(())
}

fn display_principal(principal: &str) -> &str {
    if principal.is_empty() {
        "(anonymous)"
    } else {
        principal
    }
}
