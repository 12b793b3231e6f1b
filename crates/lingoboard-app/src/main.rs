//! Main application entry point (native).

#[cfg(feature = "native")]
fn main() {
    use clap::Parser;

    let args = lingoboard_app::CliArgs::parse();
    env_logger::init();
    log::info!("Starting Lingoboard");

    if let Err(e) = pollster::block_on(run(args)) {
        log::error!("{}", e);
        eprintln!("lingoboard: {e}");
        std::process::exit(1);
    }
}

#[cfg(feature = "native")]
async fn run(args: lingoboard_app::CliArgs) -> lingoboard_app::AppResult<()> {
    use lingoboard_app::{AppConfig, Session, ShortcutRegistry, load_script};
    use lingoboard_core::LogActivityLogger;
    use lingoboard_core::storage::{FileStorage, create_default_storage};
    use std::sync::Arc;

    if args.shortcuts {
        ShortcutRegistry::print_all();
        return Ok(());
    }

    let config = AppConfig::load(args.config.as_deref())?;
    let storage = match &config.storage_dir {
        Some(dir) => Arc::new(FileStorage::new(dir.clone())?),
        None => create_default_storage()?,
    };
    log::info!("{}: boards in {}", config.title, storage.base_path().display());

    let events = match &args.script {
        Some(path) => load_script(path)?,
        None => Vec::new(),
    };

    let mut session = Session::open(&config, storage, Arc::new(LogActivityLogger)).await;
    session.replay(&events).await;
    let summary = session.finish().await?;
    println!("{summary}");
    Ok(())
}

#[cfg(not(feature = "native"))]
fn main() {
    panic!("Native feature not enabled. Use `cargo run --features native`");
}
