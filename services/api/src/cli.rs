use crate::report::{
    run_catalog_show, run_catalog_validate, run_diagnose, CatalogArgs, DiagnoseArgs,
};
use crate::server;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use storefit::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "storefit",
    about = "Diagnose food-service stores from questionnaire answers",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Evaluate one answer set and print the diagnosis as JSON
    Diagnose(DiagnoseArgs),
    /// Inspect the question/rule catalog
    Catalog {
        #[command(subcommand)]
        command: CatalogCommand,
    },
}

#[derive(Subcommand, Debug)]
enum CatalogCommand {
    /// Load and validate the catalog, then exit
    Validate(CatalogArgs),
    /// Print dimensions, types and rule order
    Show(CatalogArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Catalog JSON to use instead of STOREFIT_CATALOG or the built-in one
    #[arg(long)]
    pub(crate) catalog: Option<PathBuf>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Diagnose(args) => run_diagnose(args),
        Command::Catalog {
            command: CatalogCommand::Validate(args),
        } => run_catalog_validate(args),
        Command::Catalog {
            command: CatalogCommand::Show(args),
        } => run_catalog_show(args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serve_is_the_default_command() {
        let cli = Cli::try_parse_from(["storefit-api"]).expect("parses");
        assert!(cli.command.is_none());
    }

    #[test]
    fn parses_diagnose_flags() {
        let cli = Cli::try_parse_from([
            "storefit-api",
            "diagnose",
            "--answers",
            "-",
            "--pretty",
            "--explain",
        ])
        .expect("parses");

        match cli.command {
            Some(Command::Diagnose(args)) => {
                assert_eq!(args.answers, PathBuf::from("-"));
                assert!(args.pretty);
                assert!(args.explain);
                assert!(args.catalog.is_none());
            }
            other => panic!("expected diagnose, got {other:?}"),
        }
    }

    #[test]
    fn parses_catalog_subcommands() {
        let cli = Cli::try_parse_from([
            "storefit-api",
            "catalog",
            "validate",
            "--catalog",
            "custom.json",
        ])
        .expect("parses");

        assert!(matches!(
            cli.command,
            Some(Command::Catalog {
                command: CatalogCommand::Validate(CatalogArgs { catalog: Some(_) })
            })
        ));
    }

    #[test]
    fn diagnose_requires_answers() {
        assert!(Cli::try_parse_from(["storefit-api", "diagnose"]).is_err());
    }
}
