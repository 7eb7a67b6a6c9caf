use commands::command_argument_builder;
use sitewright::handlers::{handle_convert, handle_crawl, handle_record, handle_scenario_check, print_banner};

mod commands;

#[tokio::main]
async fn main() {
    let cmd = command_argument_builder();
    let chosen_command = cmd.get_matches();
    let quiet = chosen_command.get_flag("quiet");

    // Show banner unless --quiet flag is set
    if !quiet {
        print_banner();
    }

    match chosen_command.subcommand() {
        Some(("crawl", primary_command)) => handle_crawl(primary_command).await,
        Some(("convert", primary_command)) => handle_convert(primary_command),
        Some(("record", primary_command)) => handle_record(primary_command),
        Some(("scenario", primary_command)) => match primary_command.subcommand() {
            Some(("check", secondary_command)) => handle_scenario_check(secondary_command),
            _ => unreachable!("clap should ensure we don't get here"),
        },
        // No subcommand provided, just show the banner
        None => {}
        _ => unreachable!("clap should ensure we don't get here"),
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
