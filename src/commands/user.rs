use clap::{Args, Subcommand};

use super::OutputFormat;
use diary::Storage;

#[derive(Args)]
pub struct UserCommand {
    #[command(subcommand)]
    pub command: UserSubcommand,
}

#[derive(Subcommand)]
pub enum UserSubcommand {
    /// Create a user, or replace the password hash of an existing one
    Add {
        login: String,

        /// Already hashed password
        #[arg(long)]
        password_hash: String,
    },

    /// List all users
    List {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

impl UserCommand {
    pub async fn run(&self, storage: &Storage) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            UserSubcommand::Add {
                login,
                password_hash,
            } => {
                if login.trim().is_empty() {
                    return Err("Login cannot be empty".into());
                }
                let user = storage.users().upsert_user(login, password_hash).await?;
                println!("{} {}", user.id, user.login);
                Ok(())
            }

            UserSubcommand::List { format } => {
                let users = storage.users().list_users().await?;
                if users.is_empty() {
                    println!("No users found");
                    return Ok(());
                }

                match format {
                    OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&users)?),
                    OutputFormat::Text => {
                        println!("{:<36}  {:<20}  START", "ID", "LOGIN");
                        println!("{}", "-".repeat(80));
                        for user in &users {
                            println!(
                                "{:<36}  {:<20}  {}",
                                user.id,
                                user.login,
                                user.start_date.format("%Y-%m-%d")
                            );
                        }
                        println!("\nTotal: {} user(s)", users.len());
                    }
                }
                Ok(())
            }
        }
    }
}
