#[cfg(feature = "dhat-heap")]
#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

use anyhow::{anyhow, Result};
use clap::Parser;

use structedit::cli::{self, CliArgs};

fn main() -> Result<()> {
    #[cfg(feature = "dhat-heap")]
    let _profiler = dhat::Profiler::new_heap();

    structedit::tracing::init();

    let config = CliArgs::parse().into_config().map_err(|e| anyhow!(e))?;
    cli::run(config)
}
