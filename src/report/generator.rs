//! Report generation.
//!
//! This module turns the explorer's current views into Markdown or
//! JSON for the terminal or a file.

use crate::analysis::{net_title_change, total_word_count, unique_titles};
use crate::models::{
    Agency, HistoricalData, Report, ReportMetadata, SelectionReport, TitleChange, TitleData,
};
use crate::search::count_nodes;
use crate::state::Explorer;
use anyhow::Result;
use chrono::Utc;
use std::sync::Arc;

/// Build a report from the explorer's current read views.
pub fn build_report(explorer: &Explorer, api_url: &str) -> Report {
    let filtered = explorer.filtered_agencies();
    let query = explorer.search_query().trim().to_string();

    let metadata = ReportMetadata {
        api_url: api_url.to_string(),
        generated_at: Utc::now(),
        search_query: (!query.is_empty()).then_some(query),
        total_agencies: count_nodes(&explorer.agencies()),
        matching_agencies: count_nodes(&filtered),
    };

    let selection = explorer.selected_agency().map(|agency| {
        let mut title_data = explorer.title_data();
        title_data.sort_by_key(|d| d.title);
        let changes = explorer.selected_agency_changes();

        SelectionReport {
            slug: agency.slug.clone(),
            name: agency.label().to_string(),
            summary: explorer.analytics_summary_of_selected().unwrap_or_default(),
            unique_titles: explorer.unique_titles_of_selected(),
            total_word_count: total_word_count(&title_data),
            title_data,
            selected_title: explorer.title_analytics(),
            history_summary: explorer.history_summary(),
            history: explorer.selected_agency_history(),
            net_title_change: net_title_change(&changes),
            changes,
        }
    });

    Report {
        metadata,
        agencies: filtered,
        selection,
    }
}

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &Report) -> String {
    let mut output = String::new();

    output.push_str("# CFR Explorer Report\n\n");
    output.push_str(&generate_metadata_section(&report.metadata));
    output.push_str(&generate_agency_tree_section(&report.agencies));

    if let Some(ref selection) = report.selection {
        output.push_str(&generate_selection_section(selection));
    }

    output.push_str(&generate_footer());

    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Data Source:** {}\n", metadata.api_url));
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    if let Some(ref query) = metadata.search_query {
        section.push_str(&format!("- **Search:** `{}`\n", query));
        section.push_str(&format!(
            "- **Matching Agencies:** {} of {}\n",
            metadata.matching_agencies, metadata.total_agencies
        ));
    } else {
        section.push_str(&format!("- **Agencies:** {}\n", metadata.total_agencies));
    }
    section.push('\n');

    section
}

/// Generate the agency tree as a nested list.
fn generate_agency_tree_section(agencies: &[Arc<Agency>]) -> String {
    let mut section = String::new();

    section.push_str("## Agencies\n\n");

    if agencies.is_empty() {
        section.push_str("No agencies to show.\n\n");
        return section;
    }

    for agency in agencies {
        push_agency_line(&mut section, agency, 0);
    }
    section.push('\n');

    section
}

fn push_agency_line(out: &mut String, agency: &Agency, depth: usize) {
    let titles = unique_titles(agency);
    let titles = if titles.is_empty() {
        String::new()
    } else {
        let list: Vec<String> = titles.iter().map(|t| t.to_string()).collect();
        format!(" (titles {})", list.join(", "))
    };

    out.push_str(&format!(
        "{}- **{}** `{}`{}\n",
        "  ".repeat(depth),
        agency.label(),
        agency.slug,
        titles
    ));

    for child in &agency.children {
        push_agency_line(out, child, depth + 1);
    }
}

/// Generate the selected agency section.
fn generate_selection_section(selection: &SelectionReport) -> String {
    let mut section = String::new();

    section.push_str(&format!("## {}\n\n", selection.name));

    section.push_str("| References | Unique Titles | Child Agencies | Total Words |\n");
    section.push_str("|:---:|:---:|:---:|:---:|\n");
    section.push_str(&format!(
        "| {} | {} | {} | {} |\n\n",
        selection.summary.total_references,
        selection.summary.unique_title_count,
        selection.summary.child_agency_count,
        selection.total_word_count
    ));

    if let Some(ref title) = selection.selected_title {
        section.push_str(&format!("### Title {}\n\n", title.title));
        section.push_str(&format!("- **Word Count:** {}\n", title.word_count));
        let updated = if title.last_updated.is_empty() {
            "n/a"
        } else {
            title.last_updated.as_str()
        };
        section.push_str(&format!("- **Last Updated:** {}\n", updated));
        section.push_str(&format!("- **References:** {}\n\n", title.reference_count));
    }

    section.push_str(&generate_titles_table(&selection.unique_titles, &selection.title_data));
    section.push_str(&generate_history_table(&selection.history));
    section.push_str(&generate_changes_table(&selection.changes));

    section
}

/// Word counts per referenced title; titles without data show a dash.
fn generate_titles_table(titles: &[u32], title_data: &[TitleData]) -> String {
    if titles.is_empty() {
        return String::new();
    }

    let mut table = String::new();
    table.push_str("### Titles\n\n");
    table.push_str("| Title | Words | As Of |\n");
    table.push_str("|:---:|---:|:---:|\n");

    for title in titles {
        match title_data.iter().find(|d| d.title == *title) {
            Some(data) => table.push_str(&format!(
                "| {} | {} | {} |\n",
                title, data.word_count, data.last_updated
            )),
            None => table.push_str(&format!("| {} | - | - |\n", title)),
        }
    }
    table.push('\n');

    table
}

fn generate_history_table(history: &[HistoricalData]) -> String {
    if history.is_empty() {
        return String::new();
    }

    let mut table = String::new();
    table.push_str("### Word Count History\n\n");
    table.push_str("| Date | Words |\n");
    table.push_str("|:---|---:|\n");
    for point in history {
        table.push_str(&format!("| {} | {} |\n", point.date, point.word_count));
    }
    table.push('\n');

    table
}

fn generate_changes_table(changes: &[TitleChange]) -> String {
    if changes.is_empty() {
        return String::new();
    }

    let mut table = String::new();
    table.push_str("### Title Changes\n\n");
    table.push_str("| Date | Titles | Change |\n");
    table.push_str("|:---|:---:|:---:|\n");
    for change in changes {
        table.push_str(&format!(
            "| {} | {} | {:+} |\n",
            change.date, change.title_count, change.difference
        ));
    }
    table.push('\n');

    table
}

/// Generate the report footer.
fn generate_footer() -> String {
    "---\n\n*Report generated by CFR Explorer*\n".to_string()
}

/// Generate a JSON report.
pub fn generate_json_report(report: &Report) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}
