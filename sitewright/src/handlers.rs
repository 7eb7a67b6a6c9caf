use anyhow::{Context, bail};
use chrono::Local;
use clap::ArgMatches;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use sitewright_core::crawl::{CrawlMessage, CrawlMessageCallback, CrawlOptions, execute_crawl};
use sitewright_core::report::generate_crawl_report;
use sitewright_core::scenario::{Scenario, load_scenario};
use sitewright_core::translate::{count_by_type, translate_file};
use sitewright_scanner::selector::{describe_selector, parse_descriptor};
use sitewright_scanner::{ActionRecord, ChromeLauncher, CrawlStatus, LogLevel, SessionOptions, ValidatorOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "text" | "txt" => Some(OutputFormat::Text),
            "json" => Some(OutputFormat::Json),
            _ => None,
        }
    }
}

/// Result of checking one scenario action without a browser
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionCheck {
    Ready(String),
    Skipped(String),
    Invalid(String),
}

pub fn print_banner() {
    eprintln!(
        "{} {}",
        "sitewright".cyan().bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
}

/// Install the tracing subscriber. Progress lines are printed from crawl
/// messages, so tracing only shows warnings unless `--verbose` or `RUST_LOG`
/// asks for more.
pub fn init_tracing(verbose: bool) {
    let default = if verbose {
        "sitewright=debug,sitewright_core=debug,sitewright_scanner=debug"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Turn user input into a start URL, assuming https when no scheme is given
pub fn normalize_start_url(input: &str) -> Option<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }

    let with_scheme = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };

    Url::parse(&with_scheme)
        .ok()
        .filter(|u| u.host_str().is_some())
        .map(|u| u.to_string())
}

pub fn expand_path(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    PathBuf::from(shellexpand::tilde(raw.as_ref()).as_ref())
}

/// One display line for a crawl message, `None` for messages that are
/// handled elsewhere
pub fn format_message(message: &CrawlMessage) -> Option<String> {
    match message {
        CrawlMessage::Log { level, message } => Some(match level {
            LogLevel::Info => message.clone(),
            LogLevel::Warn => format!("{} {}", "[!]".yellow().bold(), message),
            LogLevel::Error => format!("{} {}", "✗".red().bold(), message),
        }),
        CrawlMessage::PageCrawled { record, .. } => Some(match record.status {
            CrawlStatus::Crawled => format!(
                "{} [{}] {} (depth {})",
                "✓".green().bold(),
                record.status_code,
                record.url,
                record.depth
            ),
            CrawlStatus::Error(ref reason) => format!(
                "{} [{}] {}: {}",
                "✗".red().bold(),
                record.status_code,
                record.url,
                reason
            ),
        }),
        CrawlMessage::ScenarioFinished(outcome) => Some(format!("{} Scenario: {}", "→".cyan(), outcome)),
        CrawlMessage::Finished { .. } | CrawlMessage::Fatal(_) => None,
    }
}

/// Check every action of a scenario the way the interpreter would, without
/// touching a page
pub fn check_actions(actions: &[ActionRecord]) -> Vec<ActionCheck> {
    actions
        .iter()
        .enumerate()
        .map(|(i, record)| {
            let index = i + 1;
            match record.validate() {
                Ok(None) => ActionCheck::Skipped(format!(
                    "{}. {}: unknown action type, will be skipped",
                    index,
                    record.type_name()
                )),
                Err(e) => ActionCheck::Invalid(format!("{}. {}", index, e)),
                Ok(Some(action)) => match action.selector() {
                    Some(selector) => match parse_descriptor(selector) {
                        Ok(_) => ActionCheck::Ready(format!(
                            "{}. {} on {}",
                            index,
                            action.type_name(),
                            describe_selector(selector)
                        )),
                        Err(e) => ActionCheck::Invalid(format!("{}. {}: {}", index, action.type_name(), e)),
                    },
                    None => ActionCheck::Ready(format!("{}. {}", index, action.type_name())),
                },
            }
        })
        .collect()
}

fn exit_with(message: impl std::fmt::Display) -> ! {
    eprintln!("{} {}", "✗".red().bold(), message);
    std::process::exit(1);
}

fn print_troubleshooting() {
    eprintln!("\nTroubleshooting:");
    eprintln!("  1. Check your internet connection");
    eprintln!("  2. Verify the website is accessible in a regular browser");
    eprintln!("  3. The website might be blocking automated browsers");
    eprintln!("  4. Make sure Chrome or Chromium is installed, or pass --chrome-path");
}

fn crawl_options(sub_matches: &ArgMatches, start_url: String) -> CrawlOptions {
    let depth = *sub_matches.get_one::<usize>("depth").unwrap_or(&1);
    let headed = sub_matches.get_flag("headed");
    let concurrency = *sub_matches.get_one::<usize>("concurrency").unwrap_or(&16);
    let probe_timeout = *sub_matches.get_one::<u64>("probe-timeout").unwrap_or(&10);

    let scenario = sub_matches.get_one::<PathBuf>("scenario").map(|path| {
        match load_scenario(&expand_path(path)) {
            Ok(scenario) => {
                eprintln!(
                    "{} Scenario '{}' loaded for URL pattern '{}'",
                    "✓".green().bold(),
                    scenario.name,
                    scenario.target_url_pattern
                );
                scenario
            }
            Err(e) => exit_with(e),
        }
    });

    let mut session = SessionOptions::default().headless(!headed);
    session.chrome_path = sub_matches.get_one::<PathBuf>("chrome-path").map(|p| expand_path(p));

    let mut options = CrawlOptions::new(start_url);
    options.max_depth = depth;
    options.scenario = scenario;
    options.session = session;
    options.validator = ValidatorOptions {
        timeout: Duration::from_secs(probe_timeout),
        concurrency,
        ..Default::default()
    };
    options
}

pub async fn handle_crawl(sub_matches: &ArgMatches) {
    init_tracing(sub_matches.get_flag("verbose"));

    let raw_url = sub_matches.get_one::<String>("url").map(String::as_str).unwrap_or_default();
    let Some(start_url) = normalize_start_url(raw_url) else {
        exit_with(format!("Please enter a valid URL (got '{}')", raw_url));
    };
    let format = sub_matches
        .get_one::<String>("format")
        .and_then(|f| OutputFormat::from_name(f))
        .unwrap_or(OutputFormat::Text);

    let options = crawl_options(sub_matches, start_url.clone());
    tracing::debug!("Crawl options: {:?}", options);

    eprintln!("\n🕷️  Crawling {}", start_url);
    eprintln!("Max depth: {}", options.max_depth);
    eprintln!(
        "Browser: {}",
        if options.session.headless { "headless" } else { "headed" }
    );
    eprintln!("Link checks: {} at a time\n", options.validator.concurrency);

    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
        spinner.set_style(style);
    }
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner.set_message("Starting crawl...");

    let pb = spinner.clone();
    let callback: CrawlMessageCallback = Arc::new(move |message: &CrawlMessage| {
        if let CrawlMessage::PageCrawled { visited, .. } = message {
            pb.set_message(format!("Crawling... {} pages visited", visited));
        }
        if let Some(line) = format_message(message) {
            pb.println(line);
        }
    });

    let report = match execute_crawl(options, ChromeLauncher, Some(callback)).await {
        Ok(report) => report,
        Err(e) => {
            spinner.finish_and_clear();
            eprintln!("{} {}", "✗".red().bold(), e);
            print_troubleshooting();
            std::process::exit(1);
        }
    };
    spinner.finish_with_message(format!("Crawl complete! {} pages visited", report.pages.len()));

    match format {
        OutputFormat::Text => {
            println!("\n{} Crawl complete!\n", "✓".green().bold());
            print!("{}", generate_crawl_report(&report));
        }
        OutputFormat::Json => match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{}", json),
            Err(e) => exit_with(format!("Failed to serialize report: {}", e)),
        },
    }
}

fn convert(script: &Path, output: Option<&Path>) -> anyhow::Result<Scenario> {
    let scenario = translate_file(script).with_context(|| format!("Failed to convert {}", script.display()))?;
    match output {
        Some(path) => scenario
            .save(path)
            .with_context(|| format!("Failed to write {}", path.display()))?,
        None => println!("{}", scenario.to_json()?),
    }
    Ok(scenario)
}

pub fn handle_convert(sub_matches: &ArgMatches) {
    let Some(script) = sub_matches.get_one::<PathBuf>("SCRIPT").map(|p| expand_path(p)) else {
        exit_with("No script given");
    };
    let output = sub_matches.get_one::<PathBuf>("output").map(|p| expand_path(p));
    convert_and_report(&script, output);
}

fn convert_and_report(script: &Path, output: Option<PathBuf>) {
    let scenario = match convert(script, output.as_deref()) {
        Ok(scenario) => scenario,
        Err(e) => exit_with(format!("{:#}", e)),
    };

    eprintln!(
        "{} Extracted {} actions from {}",
        "✓".green().bold(),
        scenario.actions.len(),
        script.display()
    );
    for (kind, count) in count_by_type(&scenario.actions) {
        eprintln!("  • {}: {}", kind, count);
    }
    if let Some(path) = output {
        eprintln!(
            "{} Scenario '{}' written to {}",
            "✓".green().bold(),
            scenario.name,
            path.display()
        );
    }
}

/// `playwright codegen` invocation that records Python into `script`
pub fn codegen_command(playwright: &Path, url: &str, script: &Path) -> Command {
    let mut command = Command::new(playwright);
    command
        .arg("codegen")
        .arg(url)
        .arg("-o")
        .arg(script)
        .args(["--target", "python", "-b", "chromium"]);
    command
}

pub fn default_script_path() -> PathBuf {
    PathBuf::from(format!("recorded_actions_{}.py", Local::now().format("%Y%m%d_%H%M%S")))
}

/// Run Playwright codegen and wait until the user closes its window
pub fn run_codegen(playwright: &Path, url: &str, script: &Path) -> anyhow::Result<()> {
    if let Some(parent) = script.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let status = match codegen_command(playwright, url, script).status() {
        Ok(status) => status,
        Err(e) if e.kind() == io::ErrorKind::NotFound => bail!(
            "'{}' was not found. Install Playwright with 'pip install playwright' and then run 'playwright install'",
            playwright.display()
        ),
        Err(e) => return Err(e).with_context(|| format!("Failed to start {}", playwright.display())),
    };
    if !status.success() {
        bail!("Playwright codegen exited with {}", status);
    }
    if !script.exists() {
        bail!("Playwright did not write {}", script.display());
    }
    Ok(())
}

pub fn handle_record(sub_matches: &ArgMatches) {
    let raw_url = sub_matches.get_one::<String>("URL").map(String::as_str).unwrap_or_default();
    let Some(url) = normalize_start_url(raw_url) else {
        exit_with(format!("Please enter a valid URL (got '{}')", raw_url));
    };
    let playwright = sub_matches
        .get_one::<PathBuf>("playwright")
        .map(|p| expand_path(p))
        .unwrap_or_else(|| PathBuf::from("playwright"));
    let script = sub_matches
        .get_one::<PathBuf>("script")
        .map(|p| expand_path(p))
        .unwrap_or_else(default_script_path);
    let output = sub_matches.get_one::<PathBuf>("output").map(|p| expand_path(p));

    eprintln!("\n🎬 Recording a scenario for {}", url);
    eprintln!("Work in the browser window, then close the Playwright Inspector to finish.\n");
    if let Err(e) = run_codegen(&playwright, &url, &script) {
        exit_with(format!("{:#}", e));
    }
    eprintln!("{} Recorded actions saved to {}", "✓".green().bold(), script.display());

    convert_and_report(&script, output);
}

pub fn handle_scenario_check(sub_matches: &ArgMatches) {
    let Some(file) = sub_matches.get_one::<PathBuf>("FILE").map(|p| expand_path(p)) else {
        exit_with("No scenario file given");
    };
    let scenario = match load_scenario(&file) {
        Ok(scenario) => scenario,
        Err(e) => exit_with(e),
    };

    println!("Scenario: {}", scenario.name.bold());
    println!("Target URL pattern: {}", scenario.target_url_pattern);
    println!("Actions: {}\n", scenario.actions.len());

    if scenario.actions.is_empty() {
        exit_with("Scenario has no actions");
    }

    let mut invalid = 0;
    for check in check_actions(&scenario.actions) {
        match check {
            ActionCheck::Ready(line) => println!("  {} {}", "✓".green().bold(), line),
            ActionCheck::Skipped(line) => println!("  {} {}", "[!]".yellow().bold(), line),
            ActionCheck::Invalid(line) => {
                invalid += 1;
                println!("  {} {}", "✗".red().bold(), line);
            }
        }
    }

    if invalid > 0 {
        exit_with(format!("{} invalid action(s)", invalid));
    }
    println!("\n{} Scenario is valid", "✓".green().bold());
}
