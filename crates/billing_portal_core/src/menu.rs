//! crates/billing_portal_core/src/menu.rs
//!
//! Filters the static navigation tree against a user's scopes and marks the
//! node matching the current route.

use serde::Serialize;

use crate::access::{canonical_path, has_page_access, hide_menu_accordion_item, ScopeSet};
use crate::domain::MenuItem;

/// A menu node that survived filtering, ready to be drawn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedMenuItem {
    pub title: String,
    pub url: Option<String>,
    pub icon: Option<String>,
    /// The current route is this node or one of its descendants.
    pub active: bool,
    /// Groups start expanded when active. Recomputed on every render.
    pub expanded: bool,
    pub children: Vec<RenderedMenuItem>,
}

pub fn build_menu(
    tree: &[MenuItem],
    scopes: Option<&ScopeSet>,
    current_path: &str,
) -> Vec<RenderedMenuItem> {
    let current = canonical_path(current_path);
    tree.iter()
        .filter_map(|item| render(item, scopes, &current))
        .collect()
}

fn render(item: &MenuItem, scopes: Option<&ScopeSet>, current: &str) -> Option<RenderedMenuItem> {
    if item.force_hidden {
        return None;
    }

    if item.children.is_empty() {
        let url = item.url.as_deref()?;
        if !has_page_access(scopes, url) {
            return None;
        }
        return Some(RenderedMenuItem {
            title: item.title.clone(),
            url: Some(url.to_string()),
            icon: item.icon.clone(),
            active: canonical_path(url) == current,
            expanded: false,
            children: Vec::new(),
        });
    }

    if hide_menu_accordion_item(&item.title, &item.children, scopes) {
        return None;
    }
    let children: Vec<RenderedMenuItem> = item
        .children
        .iter()
        .filter_map(|child| render(child, scopes, current))
        .collect();
    // Reachable children may all be force-hidden.
    if children.is_empty() {
        return None;
    }

    let active = matches_route(item, current);
    Some(RenderedMenuItem {
        title: item.title.clone(),
        url: item.url.clone(),
        icon: item.icon.clone(),
        active,
        expanded: active,
        children,
    })
}

fn matches_route(item: &MenuItem, current: &str) -> bool {
    let own = item
        .url
        .as_deref()
        .is_some_and(|url| canonical_path(url) == current);
    own || item
        .descendant_urls()
        .into_iter()
        .any(|url| canonical_path(url) == current)
}
