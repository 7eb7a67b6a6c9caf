use crate::crawl::ScenarioOutcome;
use chrono::{DateTime, Utc};
use colored::Colorize;
use serde::Serialize;
use sitewright_scanner::links::{extract_url_path, host_of};
use sitewright_scanner::{LinkStatus, PageMap, PageStatus};
use std::collections::BTreeMap;
use uuid::Uuid;

const DIVIDER: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";

/// One external link as found on one page
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkRow {
    pub source_page: String,
    pub url: String,
    pub status: LinkStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkTables {
    pub external: Vec<LinkRow>,
    pub broken: Vec<LinkRow>,
}

/// Everything a crawl run hands to reporting
#[derive(Debug, Clone, Serialize)]
pub struct CrawlReport {
    pub run_id: Uuid,
    pub start_url: String,
    pub max_depth: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub scenario: ScenarioOutcome,
    pub pages: PageMap,
    pub external_links: Vec<LinkRow>,
    pub broken_links: Vec<LinkRow>,
}

/// Join probe results back to the pages that reference each URL.
///
/// Rows follow page visit order, then link order within the page. A URL with
/// no probe result is left out.
pub fn build_link_tables(pages: &PageMap, statuses: &BTreeMap<String, LinkStatus>) -> LinkTables {
    let mut tables = LinkTables::default();
    for (page_url, page) in pages {
        for url in &page.external_links {
            let Some(status) = statuses.get(url) else {
                continue;
            };
            let row = LinkRow {
                source_page: page_url.clone(),
                url: url.clone(),
                status: *status,
            };
            if status.is_broken() {
                tables.broken.push(row.clone());
            }
            tables.external.push(row);
        }
    }
    tables
}

fn colorize_page_status(status: PageStatus) -> String {
    let text = status.to_string();
    match status {
        PageStatus::Code(100..=199) => text.white().to_string(),
        PageStatus::Code(200..=299) => text.green().to_string(),
        PageStatus::Code(300..=399) => text.cyan().to_string(),
        PageStatus::Code(400..=499) => text.yellow().to_string(),
        PageStatus::Code(500..=599) | PageStatus::Error | PageStatus::Timeout => text.red().to_string(),
        _ => text,
    }
}

fn link_marker(status: &LinkStatus) -> &'static str {
    match status {
        LinkStatus::Code(200..=299) => "✓",
        LinkStatus::Code(300..=399) => "⟳",
        LinkStatus::Code(400..=499) => "✗",
        _ => "‼",
    }
}

/// Generate the text summary of a crawl run
pub fn generate_crawl_report(report: &CrawlReport) -> String {
    let pages = &report.pages;
    let mut out = String::new();

    out.push_str(DIVIDER);
    out.push_str("\n\n# Summary:\n");
    out.push_str(&format!("  Start URL: {}\n", report.start_url));
    out.push_str(&format!("  Max depth: {}\n", report.max_depth));
    out.push_str(&format!("  Pages crawled: {}\n", pages.len()));
    let errors = pages.values().filter(|p| p.is_error()).count();
    out.push_str(&format!("  Pages with errors: {}\n", errors));
    let total_links: usize = pages.values().map(|p| p.links_count).sum();
    out.push_str(&format!("  Total links found: {}\n", total_links));
    out.push_str(&format!("  External links: {}\n", report.external_links.len()));
    out.push_str(&format!("  Broken links: {}\n", report.broken_links.len()));
    out.push_str(&format!("  Scenario: {}\n", report.scenario));
    let elapsed = report.finished_at - report.started_at;
    out.push_str(&format!(
        "  Duration: {:.1}s\n",
        elapsed.num_milliseconds() as f64 / 1000.0
    ));

    out.push('\n');
    out.push_str(DIVIDER);
    out.push_str("\n\n");

    // Pages grouped by host, visit order within each host
    let mut by_host: BTreeMap<String, Vec<_>> = BTreeMap::new();
    for page in pages.values() {
        let host = host_of(&page.url).unwrap_or_default();
        by_host.entry(host).or_default().push(page);
    }
    for (host, host_pages) in &by_host {
        out.push_str(&format!("## {}\n", host));
        out.push_str(&format!("  {} pages found\n\n", host_pages.len()));
        for page in host_pages {
            out.push_str(&format!(
                "  {} {} {}\n",
                colorize_page_status(page.status_code),
                extract_url_path(&page.url),
                page.title.dimmed()
            ));
        }
        out.push('\n');
    }

    out.push_str("## Broken links\n");
    if report.broken_links.is_empty() {
        out.push_str("  None\n\n");
    } else {
        let mut by_status: BTreeMap<String, Vec<&LinkRow>> = BTreeMap::new();
        for row in &report.broken_links {
            by_status.entry(row.status.to_string()).or_default().push(row);
        }
        for (status, rows) in &by_status {
            out.push_str(&format!("  Status: {} - {} link(s)\n", status, rows.len()));
            for row in rows {
                out.push_str(&format!("    • On page [{}]: Link [{}]\n", row.source_page, row.url));
            }
        }
        out.push('\n');
    }

    out.push_str("## External links\n");
    if report.external_links.is_empty() {
        out.push_str("  None\n");
        return out;
    }

    let mut domains: BTreeMap<String, Vec<&LinkRow>> = BTreeMap::new();
    for row in &report.external_links {
        domains.entry(host_of(&row.url).unwrap_or_default()).or_default().push(row);
    }
    let successful = report
        .external_links
        .iter()
        .filter(|row| matches!(row.status, LinkStatus::Code(200..=399)))
        .count();
    out.push_str(&format!("  Total unique domains: {}\n", domains.len()));
    out.push_str(&format!("  Total external links: {}\n", report.external_links.len()));
    out.push_str(&format!("  Successful links (2xx/3xx): {}\n", successful));
    out.push_str(&format!(
        "  Problem links (4xx/5xx/Errors): {}\n\n",
        report.external_links.len() - successful
    ));

    let mut by_frequency: Vec<(&String, usize)> = domains.iter().map(|(d, rows)| (d, rows.len())).collect();
    by_frequency.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    out.push_str("  Domains (by frequency):\n");
    for (domain, count) in by_frequency {
        out.push_str(&format!("    • {}: {} link(s)\n", domain, count));
    }
    out.push('\n');

    for (domain, rows) in &domains {
        out.push_str(&format!("### {} ({} links)\n", domain, rows.len()));
        for row in rows {
            out.push_str(&format!(
                "  [{} {}] {}\n    Source: {}\n",
                row.status,
                link_marker(&row.status),
                row.url,
                row.source_page
            ));
        }
        out.push('\n');
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use sitewright_scanner::ProbeError;

    #[test]
    fn test_link_marker() {
        assert_eq!(link_marker(&LinkStatus::Code(200)), "✓");
        assert_eq!(link_marker(&LinkStatus::Code(301)), "⟳");
        assert_eq!(link_marker(&LinkStatus::Code(404)), "✗");
        assert_eq!(link_marker(&LinkStatus::Code(503)), "‼");
        assert_eq!(link_marker(&LinkStatus::Error(ProbeError::Timeout)), "‼");
    }
}
