//! testmate: question-bank tests and practice from the terminal.

use std::path::PathBuf;
use std::process;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use testmate_core::model::{ConfigId, RepositoryRef, TestId};
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

use commands::{Runtime, parse_repository};
use config::{FileConfig, Overrides, Settings};

#[derive(Parser)]
#[command(
    name = "testmate",
    version,
    about = "Question-bank tests and practice from the terminal"
)]
struct Cli {
    /// SQLite database URL or file path
    #[arg(long, global = true)]
    db: Option<String>,

    /// Question bank directory
    #[arg(long, global = true)]
    bank: Option<PathBuf>,

    /// Profile that results and statuses are filed under
    #[arg(long, global = true)]
    profile: Option<String>,

    /// Config file path (defaults to ./testmate.toml when present)
    #[arg(long = "config", global = true, value_name = "FILE")]
    config_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the domains, topics and repositories of the bank
    Structure,

    /// List the questions of a repository
    Questions {
        /// Repository as DOMAIN/TOPIC/REPOSITORY
        #[arg(value_parser = parse_repository)]
        repository: RepositoryRef,

        /// Include the expected answers
        #[arg(long)]
        answers: bool,
    },

    /// Search question text, options, answers and explanations
    Search {
        #[arg(value_parser = parse_repository)]
        repository: RepositoryRef,

        /// Case-insensitive text to look for
        query: String,
    },

    /// Manage saved test configurations
    #[command(subcommand)]
    Config(ConfigCommand),

    /// Take a test or practice a repository
    Take(TakeArgs),

    /// Show saved test results
    Results {
        /// Show one result question by question
        #[arg(long)]
        id: Option<TestId>,
    },

    /// Inspect or reset practice progress
    #[command(subcommand)]
    Practice(PracticeCommand),

    /// Repository status labels of the current profile
    #[command(subcommand)]
    Status(StatusCommand),

    /// Delete one question from a repository
    DeleteQuestion {
        #[arg(value_parser = parse_repository)]
        repository: RepositoryRef,

        /// 1-based question number
        number: usize,
    },

    /// Move questions into a sibling repository of the same topic
    MoveQuestions {
        #[arg(value_parser = parse_repository)]
        repository: RepositoryRef,

        /// Target repository name; created when missing
        #[arg(long)]
        to: String,

        /// 1-based question numbers
        #[arg(required = true, num_args = 1..)]
        numbers: Vec<usize>,
    },

    /// Write a small sample question bank
    Seed,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Save a named question range of a repository
    Create {
        #[arg(value_parser = parse_repository)]
        repository: RepositoryRef,

        /// Configuration name (derived from the repository and range when omitted)
        #[arg(long)]
        name: Option<String>,

        /// First question, 1-based
        #[arg(long, default_value_t = 1)]
        start: u32,

        /// Last question, inclusive (defaults to the last question)
        #[arg(long)]
        end: Option<u32>,
    },

    /// List the configurations of a repository
    List {
        #[arg(value_parser = parse_repository)]
        repository: RepositoryRef,
    },

    /// Delete a configuration and its attempts
    Delete { id: ConfigId },

    /// Show the attempts of a configuration
    Attempts { id: ConfigId },
}

#[derive(Subcommand)]
enum PracticeCommand {
    /// Accuracy of a repository's practice progress
    Stats {
        #[arg(value_parser = parse_repository)]
        repository: RepositoryRef,
    },

    /// Forget the practice progress of a repository
    Clear {
        #[arg(value_parser = parse_repository)]
        repository: RepositoryRef,
    },

    /// List every repository with practice progress
    List,
}

#[derive(Subcommand)]
enum StatusCommand {
    /// List statuses
    List,

    /// Set the status label of a repository
    Set {
        #[arg(value_parser = parse_repository)]
        repository: RepositoryRef,

        status: String,
    },
}

#[derive(Args)]
struct TakeArgs {
    /// Repository as DOMAIN/TOPIC/REPOSITORY
    #[arg(value_parser = parse_repository, required_unless_present = "config")]
    repository: Option<RepositoryRef>,

    /// Run a saved configuration instead
    #[arg(long = "config-id", value_name = "ID", conflicts_with_all = ["repository", "practice", "start", "end"])]
    config: Option<ConfigId>,

    /// Practice mode: answers are tracked, no result is saved
    #[arg(long)]
    practice: bool,

    /// First question, 1-based
    #[arg(long)]
    start: Option<u32>,

    /// Last question, inclusive
    #[arg(long)]
    end: Option<u32>,

    /// Continue from earlier answers (default in practice mode)
    #[arg(long, conflicts_with = "fresh")]
    resume: bool,

    /// Ignore earlier answers (default in test mode)
    #[arg(long)]
    fresh: bool,
}

impl TakeArgs {
    fn into_options(self) -> commands::take::TakeOptions {
        let resume = match (self.resume, self.fresh) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        };
        commands::take::TakeOptions {
            repository: self.repository,
            config: self.config,
            practice: self.practice,
            start: self.start,
            end: self.end,
            resume,
        }
    }
}

fn init_tracing(fallback: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let file = FileConfig::load(cli.config_file.as_deref())?;
    let flags = Overrides {
        database_url: cli.db,
        bank_dir: cli.bank,
        profile: cli.profile,
    };
    let settings = Settings::resolve(file, Overrides::from_env(), flags)?;
    init_tracing(&settings.log_filter);

    let rt = Runtime::open(&settings).await?;

    match cli.command {
        Commands::Structure => commands::structure::execute(&rt).await,
        Commands::Questions {
            repository,
            answers,
        } => commands::questions::execute(&rt, repository, answers).await,
        Commands::Search { repository, query } => {
            commands::search::execute(&rt, repository, query).await
        }
        Commands::Config(command) => match command {
            ConfigCommand::Create {
                repository,
                name,
                start,
                end,
            } => commands::test_config::create(&rt, repository, name, start, end).await,
            ConfigCommand::List { repository } => {
                commands::test_config::list(&rt, repository).await
            }
            ConfigCommand::Delete { id } => commands::test_config::delete(&rt, id).await,
            ConfigCommand::Attempts { id } => commands::test_config::attempts(&rt, id).await,
        },
        Commands::Take(args) => commands::take::execute(&rt, args.into_options()).await,
        Commands::Results { id } => commands::results::execute(&rt, id).await,
        Commands::Practice(command) => match command {
            PracticeCommand::Stats { repository } => {
                commands::practice::stats(&rt, repository).await
            }
            PracticeCommand::Clear { repository } => {
                commands::practice::clear(&rt, repository).await
            }
            PracticeCommand::List => commands::practice::list(&rt).await,
        },
        Commands::Status(command) => match command {
            StatusCommand::List => commands::status::list(&rt).await,
            StatusCommand::Set { repository, status } => {
                commands::status::set(&rt, repository, status).await
            }
        },
        Commands::DeleteQuestion { repository, number } => {
            commands::edit::delete_question(&rt, repository, number).await
        }
        Commands::MoveQuestions {
            repository,
            to,
            numbers,
        } => commands::edit::move_questions(&rt, repository, to, numbers).await,
        Commands::Seed => commands::seed::execute(&rt).await,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_tree_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn take_flags_resolve_resume() {
        let cli = Cli::try_parse_from(["testmate", "take", "Math/Basics/Mixed", "--fresh"]).unwrap();
        let Commands::Take(args) = cli.command else {
            panic!("expected take");
        };
        let options = args.into_options();
        assert_eq!(options.resume, Some(false));
        assert_eq!(options.repository.unwrap().key(), "Math/Basics/Mixed");

        assert!(Cli::try_parse_from(["testmate", "take"]).is_err());
        assert!(Cli::try_parse_from(["testmate", "take", "--config-id", "3", "--practice"]).is_err());
        assert!(Cli::try_parse_from(["testmate", "take", "A/B/C", "--resume", "--fresh"]).is_err());
    }
}
