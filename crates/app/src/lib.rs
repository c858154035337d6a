//! # rally-metrics-app
//!
//! Trial metrics store use case.
//! This crate depends on `ports`, `domain`, and `shared`.

pub mod metrics_store;

/// Crate version, used by dependency smoke tests.
#[must_use]
pub const fn app_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

pub use metrics_store::{MAX_RESULT_WINDOW, MetricsStore, MetricsStoreDeps, StoreState};

#[cfg(test)]
mod tests {
    use super::*;
    use rally_metrics_domain::domain_crate_version;
    use rally_metrics_ports::ports_crate_version;
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
                in_deps = line == "[dependencies]";
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
    fn app_can_use_ports_domain_shared() {
        assert!(!app_crate_version().is_empty());
        assert!(!ports_crate_version().is_empty());
        assert!(!domain_crate_version().is_empty());
        assert!(!shared_crate_version().is_empty());
    }

    #[test]
    fn app_depends_only_on_inner_layers() {
        let allowed = [
            "rally-metrics-ports",
            "rally-metrics-domain",
            "rally-metrics-shared",
        ];
        for dep in workspace_deps() {
            assert!(
                allowed.contains(&dep.as_str()),
                "unexpected dependency: {dep}"
            );
        }
    }
}
