//! Remote background removal CLI tool
//!
//! Command-line front end for the remote-bgremove session workflow.

use remote_bgremove::cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    cli::main().await
}
