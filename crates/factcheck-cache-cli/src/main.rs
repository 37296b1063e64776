mod cli;
mod commands;
mod output;

use anyhow::Result;
use clap::Parser;
use factcheck_cache::{CacheService, load_config, observability};

use cli::{Cli, Commands, OutputFormat};
use output::print_error;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        print_error(&format!("{e:#}"));
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    observability::init_logging(&cli.log_level);
    let format = cli.format.unwrap_or_default();

    let config = load_config(cli.config.as_deref())?;
    let cache = CacheService::new(config).await?;

    let result = dispatch(&cache, &cli.command, format).await;
    cache.close().await;
    result
}

async fn dispatch(cache: &CacheService, command: &Commands, format: OutputFormat) -> Result<()> {
    match command {
        Commands::Stats => commands::inspect::stats(cache, format).await,
        Commands::Health => commands::inspect::health(cache, format).await,
        Commands::Keys(args) => commands::inspect::keys(cache, args, format).await,
        Commands::Namespaces => commands::inspect::namespaces(cache, format).await,
        Commands::Monitor(args) => commands::inspect::monitor(cache, args, format).await,
        Commands::Get(args) => commands::entries::get(cache, args, format).await,
        Commands::Set(args) => commands::entries::set(cache, args).await,
        Commands::Delete(args) => commands::entries::delete(cache, args).await,
        Commands::Clear(args) => commands::entries::clear(cache, args).await,
        Commands::Cleanup => commands::entries::cleanup(cache).await,
        Commands::Backup(args) => commands::backup::backup(cache, args, format).await,
        Commands::Restore(args) => commands::backup::restore(cache, args, format).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_set() {
        let cli = Cli::try_parse_from([
            "factcache",
            "set",
            "claim:123",
            r#"{"status":"VERIFIED"}"#,
            "--ttl",
            "60",
            "-n",
            "factcheck",
        ])
        .unwrap();
        match cli.command {
            Commands::Set(args) => {
                assert_eq!(args.key, "claim:123");
                assert_eq!(args.ttl, Some(60));
                assert_eq!(args.namespace, "factcheck");
            }
            _ => panic!("expected set"),
        }
    }

    #[test]
    fn test_namespace_defaults() {
        let cli = Cli::try_parse_from(["factcache", "get", "k"]).unwrap();
        match cli.command {
            Commands::Get(args) => assert_eq!(args.namespace, factcheck_cache::DEFAULT_NAMESPACE),
            _ => panic!("expected get"),
        }
    }
}
