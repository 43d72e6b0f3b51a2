use colored::Colorize;
use commands::command_argument_builder;
use indicatif::ProgressBar;
use std::process::ExitCode;
use webtree::handlers::{
    handle_crawl, handle_expand, handle_show, handle_validate, init_tracing, print_banner,
};

mod commands;

/// Exit status of `validate` for a tree that misses the quality bar.
const EXIT_INVALID_TREE: u8 = 2;

fn main() -> ExitCode {
    let cmd = command_argument_builder();
    let chosen_command = cmd.get_matches();
    let quiet = chosen_command.get_flag("quiet");

    let progress = ProgressBar::new_spinner();
    init_tracing(quiet, &progress);

    // Show banner unless --quiet flag is set
    if !quiet {
        print_banner();
    }

    let result = match chosen_command.subcommand() {
        Some(("crawl", sub)) => handle_crawl(sub, &progress, quiet).map(|_| ExitCode::SUCCESS),
        Some(("expand", sub)) => handle_expand(sub, &progress, quiet).map(|_| ExitCode::SUCCESS),
        Some(("show", sub)) => handle_show(sub).map(|_| ExitCode::SUCCESS),
        Some(("validate", sub)) => handle_validate(sub).map(|valid| {
            if valid {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(EXIT_INVALID_TREE)
            }
        }),
        // No subcommand provided, just show the banner
        _ => Ok(ExitCode::SUCCESS),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {:#}", "✗".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

pub const CLAP_STYLING: clap::builder::styling::Styles = clap::builder::styling::Styles::styled()
    .header(clap_cargo::style::HEADER)
    .usage(clap_cargo::style::USAGE)
    .literal(clap_cargo::style::LITERAL)
    .placeholder(clap_cargo::style::PLACEHOLDER)
    .error(clap_cargo::style::ERROR)
    .valid(clap_cargo::style::VALID)
    .invalid(clap_cargo::style::INVALID);
