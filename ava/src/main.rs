use anyhow::Result;
use ava::cli::{Cli, Commands, WidgetArgs};
use ava::{AppContext, commands};
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    match cli.command {
        // Decoding needs no backend or widget context.
        Commands::Decode(args) => commands::handle_decode(args)?,
        command => run(command, &cli.widget, &cli.headers).await?,
    }

    Ok(())
}

async fn run(command: Commands, widget: &WidgetArgs, headers: &[(String, String)]) -> Result<()> {
    let mut cx = AppContext::new(widget, headers).await?;

    match command {
        Commands::Config => commands::handle_config(&cx)?,
        Commands::Send(args) => commands::handle_send(args, &cx).await?,
        Commands::Evaluate(args) => commands::handle_evaluate(args, &cx).await?,
        Commands::Upload(args) => commands::handle_upload(args, &cx).await?,
        Commands::Notify(args) => commands::handle_notify(args, &mut cx)?,
        Commands::Decode(args) => commands::handle_decode(args)?,
    }

    Ok(())
}

fn init_tracing(verbose: u8, quiet: bool) {
    let level = if quiet {
        "error"
    } else {
        match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
