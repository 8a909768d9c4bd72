//! WSOPTV CLI binary entry point.

use clap::Parser;
use wsoptv::app::AppContext;
use wsoptv::cli::{AuthCommands, Cli, Commands};
use wsoptv::config::ClientConfig;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match ClientConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(2);
        }
    };
    let app = AppContext::new(config);

    let result = match cli.command {
        Commands::Auth(auth_args) => match auth_args.command {
            AuthCommands::Login(args) => {
                wsoptv::cli::auth::handle_login(&app, &args.username, args.password).await
            }
            AuthCommands::Status => wsoptv::cli::auth::handle_status(&app).await,
            AuthCommands::Logout => wsoptv::cli::auth::handle_logout(&app).await,
        },
        Commands::Contents(args) => wsoptv::cli::browse::handle_contents(&app, args).await,
        Commands::Search(args) => wsoptv::cli::browse::handle_search(&app, args).await,
        Commands::Stream(args) => wsoptv::cli::browse::handle_stream(&app, args).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
