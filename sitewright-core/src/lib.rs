pub mod crawl;
pub mod error;
pub mod report;
pub mod scenario;
pub mod translate;

pub use crawl::{CrawlMessage, CrawlMessageCallback, CrawlOptions, ScenarioOutcome, execute_crawl};
pub use error::{CrawlError, ScenarioError, TranslationError};
pub use report::{CrawlReport, LinkRow, LinkTables, build_link_tables, generate_crawl_report};
pub use scenario::{Scenario, load_scenario};
pub use translate::{Translation, translate_file, translate_script};
