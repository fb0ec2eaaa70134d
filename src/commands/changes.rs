//! Reads the change log the way a syncing client would.

use clap::Args;

use super::{resolve_user, OutputFormat};
use diary::{Storage, SyncLimits, SyncReader};

/// Show one page of a user's change log
#[derive(Args)]
pub struct ChangesCommand {
    /// Login of the user whose log to read
    #[arg(long, short)]
    user: String,

    /// Return changes with an id greater than this
    #[arg(long, default_value_t = 0)]
    since: i64,

    /// Page size (0 uses the configured default)
    #[arg(long, default_value_t = 0)]
    limit: i64,

    /// Only print the latest change id
    #[arg(long)]
    latest: bool,

    /// Output format
    #[arg(long, short, value_enum, default_value = "text")]
    format: OutputFormat,
}

impl ChangesCommand {
    pub async fn run(
        &self,
        storage: &Storage,
        limits: SyncLimits,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let user_id = resolve_user(storage, &self.user).await?;
        let reader = SyncReader::new(storage.changes().clone(), limits);

        if self.latest {
            println!("{}", reader.latest_id(&user_id).await?);
            return Ok(());
        }

        let page = reader.get_changes(&user_id, self.since, self.limit).await?;

        match self.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&page)?),
            OutputFormat::Text => {
                if page.changes.is_empty() {
                    println!("No changes after #{}", self.since.max(0));
                    return Ok(());
                }
                for change in &page.changes {
                    println!("{}", change);
                }
                if page.has_more {
                    println!("\nMore changes available: --since {}", page.next_id);
                }
            }
        }
        Ok(())
    }
}
