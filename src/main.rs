//! logz demo entry point.

use logz::cli::{self, Cli};
use logz::core::Result;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    cli::execute(cli).await
}
