use crate::CLAP_STYLING;
use clap::{arg, command};
use std::path::PathBuf;

pub(crate) fn command_argument_builder() -> clap::Command {
    clap::Command::new("sitewright")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("sitewright")
        .styles(CLAP_STYLING)
        .arg(arg!(-q --"quiet" "Suppress banner and non-essential output").required(false))
        .subcommand_required(false)
        .subcommand(
            command!("crawl")
                .about(
                    "Crawl a website in a real browser, replaying a scenario on the start page \
                first, then check every external link found.",
                )
                .arg(
                    arg!(-u --"url" <URL>)
                        .required(true)
                        .help("The start URL. https:// is assumed when no scheme is given"),
                )
                .arg(
                    arg!(-d --"depth" <DEPTH>)
                        .required(false)
                        .help("Maximum link depth to follow from the start page")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("1"),
                )
                .arg(
                    arg!(-s --"scenario" <PATH>)
                        .required(false)
                        .help("Scenario file to replay when its URL pattern matches the start URL")
                        .value_parser(clap::value_parser!(PathBuf)),
                )
                .arg(
                    arg!(--"headed")
                        .help("Show the browser window instead of running headless")
                        .required(false),
                )
                .arg(
                    arg!(--"chrome-path" <PATH>)
                        .required(false)
                        .help("Path to the Chrome or Chromium executable")
                        .value_parser(clap::value_parser!(PathBuf)),
                )
                .arg(
                    arg!(-c --"concurrency" <N>)
                        .required(false)
                        .help("Number of external links checked at the same time")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("16"),
                )
                .arg(
                    arg!(--"probe-timeout" <SECS>)
                        .required(false)
                        .help("Timeout for each external link check, in seconds")
                        .value_parser(clap::value_parser!(u64))
                        .default_value("10"),
                )
                .arg(
                    arg!(-f --"format" <FORMAT>)
                        .required(false)
                        .help("Report format")
                        .value_parser(["text", "json"])
                        .default_value("text"),
                )
                .arg(arg!(-v --"verbose" "Show debug logging").required(false)),
        )
        .subcommand(
            command!("convert")
                .about("Convert a recorded Playwright codegen script into a scenario file")
                .arg(
                    arg!(<SCRIPT>)
                        .help("The recorded Python script")
                        .value_parser(clap::value_parser!(PathBuf)),
                )
                .arg(
                    arg!(-o --"output" <PATH>)
                        .required(false)
                        .help("Where to write the scenario JSON. Printed to stdout when omitted")
                        .value_parser(clap::value_parser!(PathBuf)),
                ),
        )
        .subcommand(
            command!("record")
                .about(
                    "Record a scenario by driving a browser with Playwright codegen, then convert \
                the recorded script into a scenario file.",
                )
                .arg(arg!(<URL>).help("The page to start recording on. https:// is assumed when no scheme is given"))
                .arg(
                    arg!(-o --"output" <PATH>)
                        .required(false)
                        .help("Where to write the scenario JSON. Printed to stdout when omitted")
                        .value_parser(clap::value_parser!(PathBuf)),
                )
                .arg(
                    arg!(--"script" <PATH>)
                        .required(false)
                        .help("Where Playwright saves the recorded script. Defaults to recorded_actions_<timestamp>.py")
                        .value_parser(clap::value_parser!(PathBuf)),
                )
                .arg(
                    arg!(--"playwright" <PATH>)
                        .required(false)
                        .help("The playwright executable")
                        .value_parser(clap::value_parser!(PathBuf))
                        .default_value("playwright"),
                ),
        )
        .subcommand(
            command!("scenario")
                .about("Work with scenario files")
                .subcommand_required(true)
                .subcommand(
                    command!("check")
                        .about("Validate a scenario file and list its actions")
                        .arg(
                            arg!(<FILE>)
                                .help("The scenario JSON file")
                                .value_parser(clap::value_parser!(PathBuf)),
                        ),
                ),
        )
}
