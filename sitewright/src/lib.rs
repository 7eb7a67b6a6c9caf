// Include handlers module directly from handlers.rs
#[path = "handlers.rs"]
pub mod handlers;

// Re-export commonly used handler functions for convenience
pub use handlers::{
    ActionCheck, OutputFormat, check_actions, codegen_command, expand_path, format_message, normalize_start_url,
    run_codegen,
};

// Re-export crawl functionality from sitewright-core
pub use sitewright_core::{CrawlOptions, CrawlReport, execute_crawl, generate_crawl_report};
