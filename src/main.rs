use anyhow::Result;
use cardboard::cli;

#[tokio::main]
async fn main() -> Result<()> {
    cli::run().await
}
