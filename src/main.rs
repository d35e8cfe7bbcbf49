use clap::Parser;
use tracing_subscriber::EnvFilter;
use ui_scrape::cli::commands::{
    cmd_delete_app, cmd_hierarchy, cmd_replay, cmd_scrape, cmd_screens, cmd_stats,
    cmd_transitions,
};
use ui_scrape::cli::config::{Cli, Commands, load_config};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = load_config(cli.config.as_deref());
    let db = config.db_path(cli.db.as_deref());

    match cli.command {
        Commands::Scrape {
            tree,
            app,
            activity,
            title,
            at_ms,
        } => {
            cmd_scrape(&config, &db, &tree, &app, &activity, title.as_deref(), at_ms)?;
        }
        Commands::Replay { events } => cmd_replay(&config, &db, &events)?,
        Commands::Stats { app } => cmd_stats(&db, &app)?,
        Commands::Hierarchy { app } => cmd_hierarchy(&db, &app)?,
        Commands::Screens { app } => cmd_screens(&db, &app)?,
        Commands::Transitions { app } => cmd_transitions(&db, &app)?,
        Commands::DeleteApp { app } => cmd_delete_app(&db, &app)?,
    }

    Ok(())
}

/// RUST_LOG wins; otherwise -v raises the default level.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
