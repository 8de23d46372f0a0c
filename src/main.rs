use clap::{Parser, Subcommand};
use std::path::PathBuf;
use talent_search::Result;
use talent_search::commands::{
    add_resumes, clear, list_resumes, repair, search, show_resume, show_status, verify,
};
use talent_search::config::{run_interactive_config, show_config};
use talent_search::search::SearchFilters;

#[derive(Parser)]
#[command(name = "talent-search")]
#[command(about = "Semantic resume search with AI-generated candidate analysis")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure the embedding and generation services
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Add or update resumes from a JSON file (one object or an array)
    Add {
        /// Path to the JSON file
        file: PathBuf,
    },
    /// List all stored resumes
    List,
    /// Show a single resume
    Show {
        /// Resume ID
        id: i64,
    },
    /// Find the resumes that best match a query
    Search {
        /// What you are looking for, e.g. "senior python developer"
        query: String,
        /// Number of matches to return
        #[arg(long, short = 'k')]
        top_k: Option<usize>,
        /// Only include candidates whose location contains this text
        #[arg(long)]
        location: Option<String>,
        /// Only include candidates with at least this many years of experience
        #[arg(long)]
        min_years: Option<f64>,
        /// Skip the generated analysis
        #[arg(long)]
        no_analysis: bool,
    },
    /// Re-embed resumes that have no usable embedding
    Repair,
    /// Report resumes that have no usable embedding
    Verify,
    /// Delete every stored resume
    Clear {
        /// Do not ask for confirmation
        #[arg(long, short = 'y')]
        yes: bool,
    },
    /// Show status of the database, the embedding service and the index
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Config { show } => {
            if show {
                show_config()?;
            } else {
                run_interactive_config()?;
            }
        }
        Commands::Add { file } => {
            add_resumes(&file).await?;
        }
        Commands::List => {
            list_resumes().await?;
        }
        Commands::Show { id } => {
            show_resume(id).await?;
        }
        Commands::Search {
            query,
            top_k,
            location,
            min_years,
            no_analysis,
        } => {
            let filters = SearchFilters {
                location,
                min_experience_years: min_years,
            };
            search(&query, top_k, filters, !no_analysis).await?;
        }
        Commands::Repair => {
            repair().await?;
        }
        Commands::Verify => {
            verify().await?;
        }
        Commands::Clear { yes } => {
            clear(yes).await?;
        }
        Commands::Status => {
            show_status().await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn cli_parsing() {
        let cli = Cli::try_parse_from(["talent-search", "list"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            assert!(matches!(parsed.command, Commands::List));
        }
    }

    #[test]
    fn add_command_with_file() {
        let cli = Cli::try_parse_from(["talent-search", "add", "resumes.json"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Add { file } = parsed.command {
                assert_eq!(file, PathBuf::from("resumes.json"));
            }
        }
    }

    #[test]
    fn search_command_defaults() {
        let cli = Cli::try_parse_from(["talent-search", "search", "python developer"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Search {
                query,
                top_k,
                location,
                min_years,
                no_analysis,
            } = parsed.command
            {
                assert_eq!(query, "python developer");
                assert_eq!(top_k, None);
                assert_eq!(location, None);
                assert_eq!(min_years, None);
                assert!(!no_analysis);
            }
        }
    }

    #[test]
    fn search_command_with_filters() {
        let cli = Cli::try_parse_from([
            "talent-search",
            "search",
            "data engineer",
            "-k",
            "3",
            "--location",
            "Lisbon",
            "--min-years",
            "2.5",
            "--no-analysis",
        ]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Search {
                top_k,
                location,
                min_years,
                no_analysis,
                ..
            } = parsed.command
            {
                assert_eq!(top_k, Some(3));
                assert_eq!(location, Some("Lisbon".to_string()));
                assert_eq!(min_years, Some(2.5));
                assert!(no_analysis);
            }
        }
    }

    #[test]
    fn show_requires_numeric_id() {
        assert!(Cli::try_parse_from(["talent-search", "show", "7"]).is_ok());
        assert!(Cli::try_parse_from(["talent-search", "show", "seven"]).is_err());
    }

    #[test]
    fn clear_yes_flag() {
        let cli = Cli::try_parse_from(["talent-search", "clear", "--yes"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Clear { yes } = parsed.command {
                assert!(yes);
            }
        }
    }

    #[test]
    fn config_show_flag() {
        let cli = Cli::try_parse_from(["talent-search", "config", "--show"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Config { show } = parsed.command {
                assert!(show);
            }
        }
    }

    #[test]
    fn invalid_command() {
        let cli = Cli::try_parse_from(["talent-search", "invalid"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::InvalidSubcommand);
        }
    }

    #[test]
    fn help_message() {
        let cli = Cli::try_parse_from(["talent-search", "--help"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::DisplayHelp);
        }
    }
}
