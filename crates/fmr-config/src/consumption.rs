//! Config consumption map + unused-key guard.
//!
//! "Consumed pointers" are JSON Pointer prefixes. A leaf under any consumed
//! prefix is considered read by the selected report mode; any other leaf is
//! unused. Callers choose whether unused keys warn or fail.
//!
//! Examples:
//! - consumed prefix "/data" consumes "/data/root" and "/data/years/start"
//! - "/categories/stock_index" is consumed only by the category report

use std::collections::BTreeSet;

use anyhow::{bail, Result};
use fmr_schemas::ReportMode;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnusedKeyPolicy {
    Warn,
    Fail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnusedKeyReport {
    pub mode: String,
    /// Consumed JSON-pointer prefixes used for this analysis (sorted, unique)
    pub consumed_prefixes: Vec<String>,
    /// Unused leaf pointers (sorted)
    pub unused_leaf_pointers: Vec<String>,
}

impl UnusedKeyReport {
    pub fn is_clean(&self) -> bool {
        self.unused_leaf_pointers.is_empty()
    }
}

/// Keys read regardless of mode.
const COMMON: &[&str] = &[
    "/data/root",
    "/data/years",
    "/calendar",
    "/accounts/exclude_pattern",
    "/report/mode",
    "/report/output",
    "/report/write_index",
];

/// Registry of consumed JSON-pointer prefixes per mode, on top of [`COMMON`].
///
/// Must reflect what the pipeline actually reads for that mode.
pub fn consumed_pointers_for_mode(mode: ReportMode) -> &'static [&'static str] {
    match mode {
        ReportMode::Nav => &["/report/join_policy"],
        ReportMode::Category => &[
            "/report/join_policy",
            "/categories/stock_index",
            "/categories/net_value_products",
        ],
        ReportMode::IfMargin => &["/report/join_policy", "/categories/if_products"],
        ReportMode::Positions => &[],
    }
}

/// Produce an unused-key report for a given mode.
/// If `policy == Fail`, returns an error when unused keys exist.
pub fn report_unused_keys(
    mode: ReportMode,
    config_json: &Value,
    policy: UnusedKeyPolicy,
) -> Result<UnusedKeyReport> {
    let consumed: BTreeSet<String> = COMMON
        .iter()
        .chain(consumed_pointers_for_mode(mode))
        .map(|p| normalize_pointer(p))
        .collect();
    let consumed_prefixes: Vec<String> = consumed.into_iter().collect();

    let mut leaves: Vec<String> = Vec::new();
    collect_leaf_pointers(config_json, "", &mut leaves);

    let mut unused: Vec<String> = leaves
        .into_iter()
        .filter(|lp| !consumed_prefixes.iter().any(|cp| is_prefix_pointer(cp, lp)))
        .collect();
    unused.sort();
    unused.dedup();

    let report = UnusedKeyReport {
        mode: mode.as_str().to_string(),
        consumed_prefixes,
        unused_leaf_pointers: unused,
    };

    if policy == UnusedKeyPolicy::Fail && !report.is_clean() {
        bail!(
            "CONFIG_UNUSED_KEYS (mode={}): {} unused config leaf key(s) detected. \
            Remove them or update the consumed registry. First few: {}",
            report.mode,
            report.unused_leaf_pointers.len(),
            preview_list(&report.unused_leaf_pointers, 12)
        );
    }

    Ok(report)
}

/// Normalize JSON pointer: leading "/", no trailing "/" unless it's just "/".
fn normalize_pointer(p: &str) -> String {
    let mut s = p.trim().to_string();
    if s.is_empty() {
        return "/".to_string();
    }
    if !s.starts_with('/') {
        s.insert(0, '/');
    }
    while s.ends_with('/') && s.len() > 1 {
        s.pop();
    }
    s
}

/// "/a/b" consumes "/a/b" and "/a/b/c" but NOT "/a/bc".
fn is_prefix_pointer(prefix: &str, leaf: &str) -> bool {
    if prefix == "/" || leaf == prefix {
        return true;
    }
    leaf.starts_with(prefix) && leaf[prefix.len()..].starts_with('/')
}

fn collect_leaf_pointers(v: &Value, prefix: &str, out: &mut Vec<String>) {
    match v {
        Value::Object(map) => {
            for (k, vv) in map.iter() {
                let next = format!("{}/{}", prefix, escape_pointer_token(k));
                collect_leaf_pointers(vv, &next, out);
            }
        }
        Value::Array(arr) if !arr.is_empty() => {
            for (i, vv) in arr.iter().enumerate() {
                let next = format!("{}/{}", prefix, i);
                collect_leaf_pointers(vv, &next, out);
            }
        }
        _ => {
            let p = if prefix.is_empty() {
                "/".to_string()
            } else {
                prefix.to_string()
            };
            out.push(p);
        }
    }
}

fn escape_pointer_token(s: &str) -> String {
    s.replace('~', "~0").replace('/', "~1")
}

fn preview_list(items: &[String], n: usize) -> String {
    let take = items.iter().take(n).cloned().collect::<Vec<_>>();
    format!("{:?}", take)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_respects_segment_boundary() {
        assert!(is_prefix_pointer("/data/root", "/data/root"));
        assert!(is_prefix_pointer("/calendar", "/calendar/exchange"));
        assert!(!is_prefix_pointer("/data/root", "/data/rootless"));
        assert!(is_prefix_pointer("/", "/anything"));
    }

    #[test]
    fn normalize_adds_slash_and_trims_trailing() {
        assert_eq!(normalize_pointer("data/"), "/data");
        assert_eq!(normalize_pointer(""), "/");
    }

    #[test]
    fn empty_array_is_a_leaf() {
        let v = serde_json::json!({"categories": {"net_value_products": []}});
        let mut leaves = Vec::new();
        collect_leaf_pointers(&v, "", &mut leaves);
        assert_eq!(leaves, vec!["/categories/net_value_products".to_string()]);
    }
}
