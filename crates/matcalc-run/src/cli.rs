use clap::{Parser, Subcommand};
use matcalc_repl::{ErrorPolicy, Repl};
use miette::miette;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use crate::config::{Config, DEFAULT_LOG_LEVEL};

#[derive(Parser, Debug, Default)]
#[command(name = "matcalc")]
#[command(author = env!("CARGO_PKG_AUTHORS"))]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(after_help = "# Examples:\n\n\
    ## To start an interactive session:\n\
    matcalc\n\n\
    ## To start with a limit of 10 operations:\n\
    matcalc -n 10 repl\n\n\
    ## To execute a command file, skipping failing lines:\n\
    matcalc run --on-error continue ops.txt")]
#[command(
    about = "matcalc is an interactive calculator that builds and evaluates matrix operations.",
    long_about = None
)]
pub struct Cli {
    #[clap(subcommand)]
    commands: Option<Commands>,

    /// Maximum number of operations (2 - 100), asked at startup when omitted
    #[arg(short = 'n', long, global = true)]
    max_operations: Option<usize>,

    /// Log filter directives, e.g. `debug` or `matcalc_lang=trace`
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Do not load or save the line editor history
    #[arg(long, global = true, default_value_t = false)]
    no_history: bool,

    /// What to do when a command in a file fails
    #[arg(long, global = true, value_parser = parse_policy)]
    on_error: Option<ErrorPolicy>,
}

#[derive(Clone, Debug, Subcommand)]
enum Commands {
    /// Start an interactive session (the default)
    Repl,
    /// Execute the commands of a file and exit
    Run {
        /// Path to the command file
        file: PathBuf,
    },
}

fn parse_policy(s: &str) -> Result<ErrorPolicy, String> {
    s.parse::<ErrorPolicy>()
        .map_err(|_| format!("expected one of ask, continue, stop, got '{}'", s))
}

impl Cli {
    /// Applies command-line flags on top of `config`.
    pub fn config(&self, mut config: Config) -> Config {
        if self.max_operations.is_some() {
            config.max_operations = self.max_operations;
        }
        if let Some(log_level) = &self.log_level {
            config.log_level = log_level.clone();
        }
        if self.no_history {
            config.history = false;
        }
        if let Some(on_error) = self.on_error {
            config.on_error = on_error;
        }
        config
    }

    pub fn run(&self) -> miette::Result<()> {
        let config = self.config(Config::from_env());
        init_tracing(&config.log_level);
        tracing::debug!(?config, "starting");

        let repl = Repl::new(config.max_operations)
            .with_history(config.history)
            .with_error_policy(config.on_error);

        match &self.commands {
            Some(Commands::Repl) | None => repl.run(),
            Some(Commands::Run { file }) => {
                let report = repl.run_file(file)?;

                if report.failures.is_empty() {
                    Ok(())
                } else {
                    Err(miette!(
                        "{} command(s) failed in \"{}\"",
                        report.failures.len(),
                        file.display()
                    ))
                }
            }
        }
    }
}

fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL));

    if tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .try_init()
        .is_err()
    {
        eprintln!("Warning: a tracing subscriber is already installed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::parse_from([
            "matcalc",
            "-n",
            "12",
            "--log-level",
            "debug",
            "--no-history",
            "--on-error",
            "stop",
        ]);
        let config = cli.config(Config::default());

        assert_eq!(config.max_operations, Some(12));
        assert_eq!(config.log_level, "debug");
        assert!(!config.history);
        assert_eq!(config.on_error, ErrorPolicy::Stop);
    }

    #[test]
    fn test_config_kept_without_flags() {
        let base = Config {
            max_operations: Some(7),
            log_level: "info".to_string(),
            history: false,
            on_error: ErrorPolicy::Continue,
        };
        let cli = Cli::parse_from(["matcalc"]);

        assert_eq!(cli.config(base.clone()), base);
    }

    #[rstest]
    #[case::repl(&["matcalc", "repl"])]
    #[case::run(&["matcalc", "run", "ops.txt"])]
    #[case::default(&["matcalc"])]
    #[case::global_flags_after_subcommand(&["matcalc", "run", "--on-error", "continue", "-n", "5", "ops.txt"])]
    fn test_subcommands_parse(#[case] args: &[&str]) {
        assert!(Cli::try_parse_from(args).is_ok());
    }

    #[test]
    fn test_invalid_policy() {
        assert!(Cli::try_parse_from(["matcalc", "--on-error", "maybe"]).is_err());
    }
}
