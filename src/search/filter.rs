//! Hierarchical agency search.
//!
//! Filtering keeps every agency that matches the query plus the ancestors
//! needed to reach it. Nodes whose children get pruned are rebuilt; nodes
//! whose subtree survives intact are shared with the input.

use crate::models::Agency;
use std::sync::Arc;

/// Filter an agency forest by a free-text query.
///
/// A blank query returns the forest as is.
pub fn filter_agencies(forest: &[Arc<Agency>], query: &str) -> Vec<Arc<Agency>> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return forest.to_vec();
    }

    filter_level(forest, &needle)
}

/// Returns true if the agency itself matches a lowercased, trimmed needle.
pub fn matches_query(agency: &Agency, needle: &str) -> bool {
    agency.label().to_lowercase().contains(needle)
        || agency
            .cfr_references
            .iter()
            .any(|r| r.title.to_string().contains(needle))
}

fn filter_level(nodes: &[Arc<Agency>], needle: &str) -> Vec<Arc<Agency>> {
    nodes
        .iter()
        .filter_map(|node| filter_node(node, needle))
        .collect()
}

fn filter_node(node: &Arc<Agency>, needle: &str) -> Option<Arc<Agency>> {
    let children = filter_level(&node.children, needle);

    if children.is_empty() && !matches_query(node, needle) {
        return None;
    }

    if same_nodes(&children, &node.children) {
        return Some(Arc::clone(node));
    }

    Some(Arc::new(Agency {
        children,
        ..Agency::clone(node)
    }))
}

fn same_nodes(a: &[Arc<Agency>], b: &[Arc<Agency>]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| Arc::ptr_eq(x, y))
}

/// Find an agency anywhere in the forest by slug (depth-first, pre-order).
pub fn find_by_slug(forest: &[Arc<Agency>], slug: &str) -> Option<Arc<Agency>> {
    for node in forest {
        if node.slug == slug {
            return Some(Arc::clone(node));
        }
        if let Some(found) = find_by_slug(&node.children, slug) {
            return Some(found);
        }
    }
    None
}

/// Total number of agencies in the forest, children included.
pub fn count_nodes(forest: &[Arc<Agency>]) -> usize {
    forest
        .iter()
        .map(|node| 1 + count_nodes(&node.children))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CfrReference;

    fn agency(slug: &str, display: &str, titles: &[u32], children: Vec<Arc<Agency>>) -> Arc<Agency> {
        Arc::new(Agency {
            name: display.to_string(),
            short_name: None,
            display_name: display.to_string(),
            sortable_name: display.to_string(),
            slug: slug.to_string(),
            children,
            cfr_references: titles.iter().map(|t| CfrReference::title(*t)).collect(),
        })
    }

    /// root -> parent -> {grandchild (title 40), other (title 7)}, plus a sibling root.
    fn sample_forest() -> Vec<Arc<Agency>> {
        let grandchild = agency("air", "Office of Air", &[40], vec![]);
        let other = agency("water", "Office of Water", &[7], vec![]);
        let parent = agency("programs", "Programs", &[], vec![grandchild, other]);
        let root = agency("root", "Root Department", &[1], vec![parent]);
        let sibling = agency("labor", "Department of Labor", &[29], vec![]);
        vec![root, sibling]
    }

    fn slugs(forest: &[Arc<Agency>]) -> Vec<String> {
        forest.iter().map(|a| a.slug.clone()).collect()
    }

    fn any_match_in_subtree(agency: &Agency, needle: &str) -> bool {
        matches_query(agency, needle)
            || agency
                .children
                .iter()
                .any(|c| any_match_in_subtree(c, needle))
    }

    fn assert_no_false_inclusions(forest: &[Arc<Agency>], needle: &str) {
        for node in forest {
            assert!(any_match_in_subtree(node, needle), "{} included without a match", node.slug);
            assert_no_false_inclusions(&node.children, needle);
        }
    }

    #[test]
    fn test_blank_query_is_identity() {
        let forest = sample_forest();
        for query in ["", "   ", "\t"] {
            let filtered = filter_agencies(&forest, query);
            assert_eq!(filtered.len(), forest.len());
            assert!(filtered.iter().zip(&forest).all(|(a, b)| Arc::ptr_eq(a, b)));
        }
    }

    #[test]
    fn test_grandchild_title_match_keeps_ancestors() {
        let forest = sample_forest();
        let filtered = filter_agencies(&forest, "40");

        assert_eq!(slugs(&filtered), vec!["root"]);
        let parent = &filtered[0].children[0];
        assert_eq!(parent.slug, "programs");
        assert_eq!(slugs(&parent.children), vec!["air"]);
    }

    #[test]
    fn test_filter_does_not_mutate_input() {
        let forest = sample_forest();
        let _ = filter_agencies(&forest, "40");

        let parent = &forest[0].children[0];
        assert_eq!(slugs(&parent.children), vec!["air", "water"]);
    }

    #[test]
    fn test_pruned_nodes_are_new_and_untouched_nodes_are_shared() {
        let forest = sample_forest();
        let filtered = filter_agencies(&forest, "40");

        assert!(!Arc::ptr_eq(&filtered[0], &forest[0]));
        assert!(!Arc::ptr_eq(&filtered[0].children[0], &forest[0].children[0]));
        assert!(Arc::ptr_eq(
            &filtered[0].children[0].children[0],
            &forest[0].children[0].children[0]
        ));
    }

    #[test]
    fn test_name_match_is_case_insensitive_and_trimmed() {
        let forest = sample_forest();
        let filtered = filter_agencies(&forest, "  LABOR ");
        assert_eq!(slugs(&filtered), vec!["labor"]);
        assert!(Arc::ptr_eq(&filtered[0], &forest[1]));
    }

    #[test]
    fn test_matching_node_kept_with_children_pruned() {
        let forest = sample_forest();
        // Only the root itself matches "root"
        let filtered = filter_agencies(&forest, "root");
        assert_eq!(slugs(&filtered), vec!["root"]);
        assert!(filtered[0].children.is_empty());
    }

    #[test]
    fn test_title_substring_match() {
        let forest = sample_forest();
        // "2" is a substring of 29 only
        let filtered = filter_agencies(&forest, "2");
        assert_eq!(slugs(&filtered), vec!["labor"]);
    }

    #[test]
    fn test_order_preserved() {
        let forest = sample_forest();
        let filtered = filter_agencies(&forest, "office");
        let parent = &filtered[0].children[0];
        assert_eq!(slugs(&parent.children), vec!["air", "water"]);
        assert!(Arc::ptr_eq(&filtered[0], &forest[0]));
    }

    #[test]
    fn test_no_false_inclusions() {
        let forest = sample_forest();
        for query in ["40", "office", "dep", "7", "zzz", "of"] {
            let needle = query.trim().to_lowercase();
            assert_no_false_inclusions(&filter_agencies(&forest, query), &needle);
        }
    }

    #[test]
    fn test_filter_is_idempotent() {
        let forest = sample_forest();
        for query in ["40", "office", "dep", "7", "zzz", "water"] {
            let once = filter_agencies(&forest, query);
            let twice = filter_agencies(&once, query);
            assert_eq!(once, twice, "query {:?}", query);
        }
    }

    #[test]
    fn test_no_match_returns_empty() {
        assert!(filter_agencies(&sample_forest(), "nothing here").is_empty());
    }

    #[test]
    fn test_find_by_slug_and_count() {
        let forest = sample_forest();
        assert_eq!(count_nodes(&forest), 5);
        assert_eq!(find_by_slug(&forest, "water").map(|a| a.slug.clone()), Some("water".to_string()));
        assert!(find_by_slug(&forest, "missing").is_none());
    }
}
