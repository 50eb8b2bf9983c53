//! hubform - declarative GitHub resources from the command line.
//!
//! Every command works on JSON (or JSON5) files: a configuration file holds
//! the attributes of one resource or data source, a state file holds the
//! record `{"id": ..., "attributes": {...}}` the last operation produced.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use hubform_config::Config;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter.
const LOG_ENV: &str = "HUBFORM_LOG";

#[derive(Debug, Parser)]
#[command(name = "hubform")]
#[command(version)]
#[command(about = "Declarative GitHub resources and data sources")]
#[command(after_long_help = r#"EXAMPLES
    Create or replace a repository secret:
        $ hubform apply github_actions_secret --config secret.json5 --state secret.state.json

    Adopt an existing label:
        $ hubform import github_issue_label hello-world/bug --state label.state.json

    Look up collaborators:
        $ hubform read-data github_collaborators --config collaborators.json5

ENVIRONMENT VARIABLES
    GITHUB_TOKEN                 Personal access token
    GITHUB_OWNER                 Owner of the managed objects (or GITHUB_ORGANIZATION)
    GITHUB_BASE_URL              REST endpoint, for GitHub Enterprise Server
    GITHUB_APP_ID                GitHub App id
    GITHUB_APP_INSTALLATION_ID   GitHub App installation id
    GITHUB_APP_PEM_FILE          GitHub App private key
    HUBFORM_LOG                  Log filter (default: warn)
"#)]
struct Cli {
    /// Provider configuration file (defaults to the standard search path)
    #[arg(long, global = true, env = "HUBFORM_CONFIG")]
    config_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List every resource and data-source type
    Types,
    /// Print the attribute schema of a type
    Schema {
        /// Resource or data-source type
        type_name: String,
    },
    /// Validate configuration without contacting GitHub
    Validate {
        /// Resource or data-source type
        type_name: String,
        /// Attribute file
        #[arg(long)]
        config: PathBuf,
    },
    /// Show what applying configuration would do
    Plan {
        /// Resource type
        type_name: String,
        /// Attribute file
        #[arg(long)]
        config: PathBuf,
        /// State file; a missing file plans a create
        #[arg(long)]
        state: Option<PathBuf>,
    },
    /// Create or replace a resource so it matches configuration
    Apply {
        /// Resource type
        type_name: String,
        /// Attribute file
        #[arg(long)]
        config: PathBuf,
        /// State file, written after the operation
        #[arg(long)]
        state: PathBuf,
    },
    /// Read a resource back, clearing its identity if it is gone or drifted
    Refresh {
        /// Resource type
        type_name: String,
        /// State file
        #[arg(long)]
        state: PathBuf,
    },
    /// Delete a resource and its state file
    Destroy {
        /// Resource type
        type_name: String,
        /// State file
        #[arg(long)]
        state: PathBuf,
    },
    /// Adopt an existing remote object
    Import {
        /// Resource type
        type_name: String,
        /// Import identifier, such as `<repository>/<secret_name>`
        import_id: String,
        /// State file to write
        #[arg(long)]
        state: PathBuf,
    },
    /// Verify the configured credentials
    Check,
    /// Perform a data-source lookup
    ReadData {
        /// Data-source type
        type_name: String,
        /// Attribute file
        #[arg(long)]
        config: PathBuf,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn load_config(path: Option<&PathBuf>) -> anyhow::Result<Config> {
    use anyhow::Context;

    match path {
        Some(path) => {
            let mut config = Config::load_from(path)
                .with_context(|| format!("loading provider configuration from {}", path.display()))?;
            config.apply_env();
            config.validate()?;
            Ok(config)
        }
        None => Config::load().await.context("loading provider configuration"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let provider = hubform_github::Provider::new();
    let offline = commands::Offline { provider: &provider };

    match cli.command {
        Command::Types => offline.types(),
        Command::Schema { type_name } => offline.schema(&type_name),
        Command::Validate { type_name, config } => offline.validate(&type_name, &config),
        Command::Plan {
            type_name,
            config,
            state,
        } => offline.plan(&type_name, &config, state.as_deref()),
        command => {
            let config = load_config(cli.config_file.as_ref()).await?;
            let client = hubform_github::GitHubClient::from_config(&config).await?;
            let online = commands::Online {
                provider: &provider,
                client: &client,
            };
            match command {
                Command::Apply {
                    type_name,
                    config,
                    state,
                } => online.apply(&type_name, &config, &state).await,
                Command::Refresh { type_name, state } => online.refresh(&type_name, &state).await,
                Command::Destroy { type_name, state } => online.destroy(&type_name, &state).await,
                Command::Import {
                    type_name,
                    import_id,
                    state,
                } => online.import(&type_name, &import_id, &state).await,
                Command::ReadData { type_name, config } => online.read_data(&type_name, &config).await,
                Command::Check => online.check().await,
                Command::Types | Command::Schema { .. } | Command::Validate { .. } | Command::Plan { .. } => {
                    Ok(())
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn import_takes_positional_id() {
        let cli = Cli::try_parse_from([
            "hubform",
            "import",
            "github_issue_label",
            "hello-world/bug",
            "--state",
            "label.json",
        ])
        .unwrap();
        match cli.command {
            Command::Import {
                type_name,
                import_id,
                state,
            } => {
                assert_eq!(type_name, "github_issue_label");
                assert_eq!(import_id, "hello-world/bug");
                assert_eq!(state, PathBuf::from("label.json"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn config_file_is_global() {
        let cli = Cli::try_parse_from(["hubform", "types", "--config-file", "p.json5"]).unwrap();
        assert_eq!(cli.config_file, Some(PathBuf::from("p.json5")));
    }
}
