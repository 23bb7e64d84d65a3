use anyhow::Result;
use console::style;

use super::AppContext;
use crate::core::terminal::{GuideSection, print_error, print_info, print_success, print_warn};
use crate::core::vault::Credential;

fn print_token_help() {
    GuideSection::new("blogpanel token")
        .command("set", "Store a GitHub token (prompts when omitted)")
        .command("status", "Show whether a token is stored")
        .command("clear", "Remove the stored token")
        .blank()
        .text("The token needs the 'repo' and 'workflow' scopes on the managed repository.")
        .hint("blogpanel token set", "")
        .hint("blogpanel token set ghp_xxxxxxxxxxxx", "")
        .print();
    println!();
}

pub(super) async fn run_token_command(ctx: &AppContext, args: &[String]) -> Result<bool> {
    let sub_cmd = args.get(2).map(String::as_str).unwrap_or("");

    match sub_cmd {
        "set" => {
            let token = match args.get(3) {
                Some(t) => t.clone(),
                None => {
                    print_info("Create a token at https://github.com/settings/tokens");
                    inquire::Password::new("GitHub token:")
                        .without_confirmation()
                        .with_help_message("Stored encrypted in the local vault, never logged")
                        .prompt()?
                }
            };
            let token = token.trim().to_string();
            if token.is_empty() {
                print_warn("No token provided. Aborting.");
                return Ok(false);
            }
            ctx.credentials.set(Credential::new(token)).await?;
            print_success("GitHub token saved.");
            Ok(true)
        }
        "clear" | "rm" => {
            ctx.credentials.clear().await?;
            print_success("GitHub token removed.");
            Ok(true)
        }
        "status" | "" => {
            let configured = ctx.credentials.get().await.is_some();
            let state = if configured {
                style("CONFIGURED").green().bold().to_string()
            } else {
                style("NOT SET").yellow().bold().to_string()
            };
            GuideSection::new("GitHub token")
                .status("Token", &state)
                .status(
                    "Vault",
                    &ctx.data_dir.join("vault.db").display().to_string(),
                )
                .print();
            println!();
            Ok(configured)
        }
        "help" | "--help" | "-h" => {
            print_token_help();
            Ok(true)
        }
        other => {
            print_error(&format!("Unknown token command: {}", other));
            print_token_help();
            Ok(false)
        }
    }
}
