use anyhow::Result;
use tracing::Level;
use tracing_subscriber::fmt;

/// One-shot renders stay quiet unless `verbose`, which also turns on the
/// `debug!` output of layout and font resolution.
pub fn init(verbose: bool) -> Result<()> {
    if !verbose {
        return Ok(());
    }
    install(Level::DEBUG);
    Ok(())
}

/// Server and bot modes always log at info.
pub fn init_service(verbose: bool) -> Result<()> {
    install(if verbose { Level::DEBUG } else { Level::INFO });
    Ok(())
}

fn install(level: Level) {
    let _ = fmt()
        .with_max_level(level)
        .with_target(false)
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .try_init();
}
