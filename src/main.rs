mod cli;
mod core;
mod interfaces;
mod logging;

use crate::core::terminal;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    if let Err(e) = cli::run_main().await {
        terminal::print_error(&format!("Error: {}", e));
        std::process::exit(1);
    }
}
