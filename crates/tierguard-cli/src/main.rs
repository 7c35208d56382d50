// Tierguard CLI entry point

use tierguard_cli::{output, router::CommandRouter};

#[tokio::main]
async fn main() {
    if let Err(e) = CommandRouter::route().await {
        output::print_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}
