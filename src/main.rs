mod cli;
mod core;
mod logging;
mod platform;

use crate::core::terminal;

#[tokio::main]
async fn main() {
    match cli::run_main().await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            let err_msg = format!("{:#}", e);
            if err_msg.contains("canceled") || err_msg.contains("OperationCanceled") {
                terminal::print_warn("Cancelled.");
            } else {
                terminal::print_error(&err_msg);
            }
            std::process::exit(1);
        }
    }
}
