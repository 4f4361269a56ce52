use anyhow::Result;
use clap::Parser;
use std::process::ExitCode;

use seltl::cli::commands::{cache, config, history, run, translate};
use seltl::cli::{Args, CacheCommand, Command, ConfigCommand, HistoryCommand, Overrides};
use seltl::logging;
use seltl::translation::print_languages;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();
    logging::init(args.verbose);

    let command = args.command.unwrap_or(Command::Run {
        overrides: Overrides::default(),
    });

    match command {
        Command::Languages => {
            print_languages();
        }
        Command::Cache { command } => match command {
            CacheCommand::Stats => cache::print_stats()?,
            CacheCommand::Clear => cache::clear()?,
        },
        Command::Config { command } => match command {
            ConfigCommand::Path => config::print_path()?,
            ConfigCommand::Init { force } => config::init(force)?,
            ConfigCommand::Show { overrides } => config::show(overrides)?,
        },
        Command::History { command } => match command {
            HistoryCommand::List { limit, search } => history::list(limit, search.as_deref())?,
            HistoryCommand::Clear => history::clear()?,
        },
        Command::Translate {
            text,
            file,
            no_cache,
            overrides,
        } => {
            let options = translate::TranslateOptions {
                text,
                file,
                no_cache,
                quiet: args.quiet,
                overrides,
            };
            if !translate::run_translate(options).await? {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::Run { overrides } => {
            run::run(run::RunOptions {
                quiet: args.quiet,
                overrides,
            })
            .await?;
        }
    }

    Ok(ExitCode::SUCCESS)
}
