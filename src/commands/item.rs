use clap::{Args, Subcommand};

use super::{resolve_user, OutputFormat};
use diary::{Item, SearchParams, Storage, StorageError};

#[derive(Args)]
pub struct ItemCommand {
    /// Login of the user whose diary to use
    #[arg(long, short, global = true)]
    pub user: Option<String>,

    #[command(subcommand)]
    pub command: ItemSubcommand,
}

#[derive(Subcommand)]
pub enum ItemSubcommand {
    /// Show the item for a date
    Get {
        /// Date (YYYY-MM-DD)
        date: String,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Create or overwrite the item for a date
    Put {
        /// Date (YYYY-MM-DD)
        date: String,

        #[arg(long, default_value = "")]
        title: String,

        #[arg(long, default_value = "")]
        body: String,

        /// Tags (can be repeated)
        #[arg(long = "tag", value_name = "TAG")]
        tags: Vec<String>,

        /// Metadata recorded on the change (can be repeated)
        #[arg(long = "metadata", value_name = "VALUE")]
        metadata: Vec<String>,
    },

    /// Delete the item for a date
    Delete {
        /// Date (YYYY-MM-DD)
        date: String,

        /// Metadata recorded on the change (can be repeated)
        #[arg(long = "metadata", value_name = "VALUE")]
        metadata: Vec<String>,
    },

    /// List items, newest first
    List {
        /// Case-insensitive text in title or body
        #[arg(long)]
        search: Option<String>,

        /// Match items with any of these tags (can be repeated)
        #[arg(long = "tag", value_name = "TAG")]
        tags: Vec<String>,

        /// Exact date
        #[arg(long)]
        date: Option<String>,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

impl ItemCommand {
    pub async fn run(&self, storage: &Storage) -> Result<(), Box<dyn std::error::Error>> {
        let Some(login) = self.user.as_deref() else {
            return Err("--user is required".into());
        };
        let user_id = resolve_user(storage, login).await?;

        match &self.command {
            ItemSubcommand::Get { date, format } => {
                let item = match storage.items().get(&user_id, date).await {
                    Ok(item) => item,
                    Err(StorageError::NotFound) => {
                        return Err(format!("No item for {}", date).into())
                    }
                    Err(e) => return Err(e.into()),
                };

                match format {
                    OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&item)?),
                    OutputFormat::Text => print!("{}", item),
                }
                Ok(())
            }

            ItemSubcommand::Put {
                date,
                title,
                body,
                tags,
                metadata,
            } => {
                if date.trim().is_empty() {
                    return Err("Date cannot be empty".into());
                }

                let item = Item::new(date.as_str(), title.as_str())
                    .with_body(body.as_str())
                    .with_tags(diary::models::normalize_tags(tags));

                let receipt = storage.put_item(&user_id, &item, metadata).await?;
                println!(
                    "Item {} {} (change #{})",
                    item.date, receipt.operation, receipt.change_id
                );
                Ok(())
            }

            ItemSubcommand::Delete { date, metadata } => {
                match storage.delete_item(&user_id, date, metadata).await {
                    Ok(receipt) => {
                        println!("Item {} deleted (change #{})", date, receipt.change_id);
                        Ok(())
                    }
                    Err(StorageError::NotFound) => Err(format!("No item for {}", date).into()),
                    Err(e) => Err(e.into()),
                }
            }

            ItemSubcommand::List {
                search,
                tags,
                date,
                format,
            } => {
                let params = SearchParams {
                    date: date.clone(),
                    search_text: search.clone(),
                    tags: diary::models::normalize_tags(tags),
                };
                let (items, total) = storage.items().list(&user_id, &params).await?;

                if items.is_empty() {
                    println!("No items found");
                    return Ok(());
                }

                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&items)?);
                    }
                    OutputFormat::Text => {
                        println!("{:<12}  {:<40}  TAGS", "DATE", "TITLE");
                        println!("{}", "-".repeat(70));
                        for item in &items {
                            let title = if item.title.chars().count() > 40 {
                                let short: String = item.title.chars().take(37).collect();
                                format!("{}...", short)
                            } else {
                                item.title.clone()
                            };
                            println!("{:<12}  {:<40}  {}", item.date, title, item.tags.join(", "));
                        }
                        println!("\nTotal: {} item(s)", total);
                    }
                }
                Ok(())
            }
        }
    }
}
