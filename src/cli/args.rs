use clap::{ArgAction, Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "seltl")]
#[command(about = "Double-tap a modifier key to translate the selected text")]
#[command(version)]
pub struct Args {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only print translations
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Settings overrides shared by `run` and `translate`.
#[derive(ClapArgs, Debug, Clone, Default)]
pub struct Overrides {
    /// Target language (e.g. English, Chinese, 日本語)
    #[arg(short = 't', long = "to")]
    pub to: Option<String>,

    /// Provider name from the config file
    #[arg(short = 'p', long)]
    pub provider: Option<String>,

    /// Model name
    #[arg(short = 'm', long)]
    pub model: Option<String>,

    /// Prompt skill (general, code, or one from the config file)
    #[arg(short = 's', long)]
    pub skill: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Listen for hotkeys and translate the selection (default)
    Run {
        #[command(flatten)]
        overrides: Overrides,
    },
    /// Translate text once and exit
    Translate {
        /// Text to translate
        text: Option<String>,

        /// Read the text from a file
        #[arg(short = 'f', long, conflicts_with = "text")]
        file: Option<PathBuf>,

        /// Disable cache
        #[arg(short = 'n', long)]
        no_cache: bool,

        #[command(flatten)]
        overrides: Overrides,
    },
    /// List supported target languages
    Languages,
    /// Inspect or clear the translation cache
    Cache {
        #[command(subcommand)]
        command: CacheCommand,
    },
    /// Inspect or create the configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
    /// List or clear past translations
    History {
        #[command(subcommand)]
        command: HistoryCommand,
    },
}

#[derive(Subcommand, Debug)]
pub enum CacheCommand {
    /// Show the number of cached translations
    Stats,
    /// Remove every cached translation
    Clear,
}

#[derive(Subcommand, Debug)]
pub enum HistoryCommand {
    /// Show recent translations, newest first
    List {
        /// Number of translations to show
        #[arg(short = 'n', long, default_value_t = 20)]
        limit: usize,

        /// Only show translations containing this text
        #[arg(long)]
        search: Option<String>,
    },
    /// Remove every recorded translation
    Clear,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the config file location
    Path,
    /// Write a config file filled with the defaults
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },
    /// Print the effective settings
    Show {
        #[command(flatten)]
        overrides: Overrides,
    },
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_args_are_well_formed() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_no_subcommand_parses() {
        let args = Args::try_parse_from(["seltl", "-vv"]).unwrap();
        assert_eq!(args.verbose, 2);
        assert!(args.command.is_none());
    }

    #[test]
    fn test_translate_overrides() {
        let args = Args::try_parse_from([
            "seltl", "translate", "hello", "--to", "日本語", "-s", "code", "-n",
        ])
        .unwrap();

        let Some(Command::Translate {
            text,
            file,
            no_cache,
            overrides,
        }) = args.command
        else {
            panic!("expected translate");
        };
        assert_eq!(text.as_deref(), Some("hello"));
        assert!(file.is_none());
        assert!(no_cache);
        assert_eq!(overrides.to.as_deref(), Some("日本語"));
        assert_eq!(overrides.skill.as_deref(), Some("code"));
    }

    #[test]
    fn test_translate_text_conflicts_with_file() {
        let result = Args::try_parse_from(["seltl", "translate", "hi", "--file", "a.txt"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_config_init_force_flag() {
        let args = Args::try_parse_from(["seltl", "config", "init", "--force"]).unwrap();
        assert!(matches!(
            args.command,
            Some(Command::Config {
                command: ConfigCommand::Init { force: true }
            })
        ));
    }

    #[test]
    fn test_history_list_defaults() {
        let args = Args::try_parse_from(["seltl", "history", "list"]).unwrap();
        let Some(Command::History {
            command: HistoryCommand::List { limit, search },
        }) = args.command
        else {
            panic!("expected history list");
        };
        assert_eq!(limit, 20);
        assert!(search.is_none());
    }

    #[test]
    fn test_global_quiet_after_subcommand() {
        let args = Args::try_parse_from(["seltl", "cache", "stats", "-q"]).unwrap();
        assert!(args.quiet);
        assert!(matches!(
            args.command,
            Some(Command::Cache {
                command: CacheCommand::Stats
            })
        ));
    }
}
