//! crates/billing_portal_core/src/access.rs
//!
//! Access-control decisions over a user's scope list. Everything here is pure:
//! no I/O, no clocks, no shared state.

use std::collections::HashSet;

use tracing::trace;

use crate::domain::{MenuItem, DASHBOARD_PATH};

/// Pages every signed-in user may open regardless of scopes.
pub const PUBLIC_PAGES: [&str; 3] = ["/", "/login", DASHBOARD_PATH];

/// Set view over a user's scopes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScopeSet {
    raw: HashSet<String>,
    paths: HashSet<String>,
}

impl ScopeSet {
    pub fn new<I, S>(scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut raw = HashSet::new();
        let mut paths = HashSet::new();
        for scope in scopes {
            let scope = scope.as_ref().trim();
            if scope.is_empty() {
                continue;
            }
            if scope.starts_with('/') {
                paths.insert(canonical_path(scope));
            }
            raw.insert(scope.to_string());
        }
        Self { raw, paths }
    }

    pub fn contains(&self, scope: &str) -> bool {
        self.raw.contains(scope)
    }

    pub fn contains_path(&self, path: &str) -> bool {
        self.paths.contains(&canonical_path(path))
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    pub fn len(&self) -> usize {
        self.raw.len()
    }
}

/// Strips query and fragment and the trailing slash; an empty path becomes `/`.
pub fn canonical_path(path: &str) -> String {
    let end = path.find(['?', '#']).unwrap_or(path.len());
    let trimmed = path[..end].trim().trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}

pub fn is_public_page(path: &str) -> bool {
    let path = canonical_path(path);
    PUBLIC_PAGES.contains(&path.as_str())
}

/// True iff `path` is in `scopes` or is a public page. Absent scopes deny
/// everything, public pages included.
pub fn has_page_access(scopes: Option<&ScopeSet>, path: &str) -> bool {
    let Some(scopes) = scopes else {
        return false;
    };
    is_public_page(path) || scopes.contains_path(path)
}

/// True iff the action's scope string is held. Absent scopes deny.
pub fn has_action_access(scopes: Option<&ScopeSet>, action: impl AsRef<str>) -> bool {
    scopes.is_some_and(|scopes| scopes.contains(action.as_ref()))
}

/// True iff no descendant of the accordion is reachable, in which case the
/// whole group must not render.
pub fn hide_menu_accordion_item(
    title: &str,
    children: &[MenuItem],
    scopes: Option<&ScopeSet>,
) -> bool {
    let Some(scopes) = scopes else {
        return true;
    };
    let hide = !children.iter().any(|child| {
        let own = child.url.as_deref().is_some_and(|url| scopes.contains_path(url));
        own || child
            .descendant_urls()
            .into_iter()
            .any(|url| scopes.contains_path(url))
    });
    if hide {
        trace!(accordion = title, "hiding accordion with no reachable children");
    }
    hide
}
