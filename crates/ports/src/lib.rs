//! # rally-metrics-ports
//!
//! Port traits for the rally-metrics hexagonal architecture.
//!
//! This crate defines the interfaces between the metrics store and its
//! collaborators. It depends only on `domain` and `shared`.

/// Returns the ports crate version.
#[must_use]
pub const fn ports_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

pub mod client_factory;
pub mod clock;
pub mod document_store;
pub mod logger;
pub mod template;

pub use client_factory::*;
pub use clock::*;
pub use document_store::*;
pub use logger::*;
pub use template::*;

// Re-export selected domain types used in port signatures, so adapter crates
// can implement ports without directly depending on `rally-metrics-domain`.
pub use rally_metrics_domain::{DocType, IndexName, MetricDocument, MetricValue};

#[cfg(test)]
mod tests {
    use super::*;
    use rally_metrics_domain::domain_crate_version;
    use rally_metrics_shared::shared_crate_version;

    fn workspace_deps() -> Vec<String> {
        let cargo_toml = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/Cargo.toml"));
        let mut deps = Vec::new();
        let mut in_deps = false;

        for raw_line in cargo_toml.lines() {
            let line = raw_line.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            if line.starts_with('[') {
                in_deps = line == "[dependencies]" || line == "[dev-dependencies]";
                continue;
            }
            if in_deps && line.starts_with("rally-metrics-") {
                let key = line.split('=').next().unwrap_or("").trim();
                deps.push(key.split('.').next().unwrap_or("").trim().to_string());
            }
        }

        deps
    }

    #[test]
    fn ports_depends_only_on_domain_and_shared() {
        let deps = workspace_deps();
        let allowed = ["rally-metrics-domain", "rally-metrics-shared"];

        for dep in &deps {
            assert!(
                allowed.contains(&dep.as_str()),
                "unexpected dependency found: {dep}"
            );
        }
        for expected in allowed {
            assert!(
                deps.iter().any(|dep| dep == expected),
                "missing dependency: {expected}"
            );
        }
    }

    #[test]
    fn ports_can_use_domain_and_shared() {
        assert!(!ports_crate_version().is_empty());
        assert!(!domain_crate_version().is_empty());
        assert!(!shared_crate_version().is_empty());
    }
}
