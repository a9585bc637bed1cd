//! Static and media serving by uWSGI itself
//!
//! When assets are neither synced to external storage nor hosted on another
//! domain, uWSGI maps the URL prefixes straight to the filesystem and serves
//! them from offload threads.

use crate::config::{required, Settings};
use crate::error::Result;
use std::path::Path;
use tracing::debug;

/// One year, for files whose names change whenever their content does
pub const FAR_FUTURE_EXPIRES_SECS: u64 = 31_536_000;

/// Filenames carrying a 10-16 hex digit content hash before the extension
pub const HASHED_FILENAME_PATTERN: &str = r".*\.[0-9a-f]{10,16}\.[a-z]+";

/// Name of the uWSGI cache region holding resolved static paths
pub const STATIC_PATHS_CACHE: &str = "staticpaths";

/// Outcome of static-serving planning
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticPlan {
    /// uWSGI serves at least one asset class itself
    pub serve_static: bool,
    /// uWSGI options to append, in order
    pub directives: Vec<String>,
}

/// Decide whether uWSGI serves static/media files and build its options.
///
/// Syncing to external storage is the caller's concern; this only looks at
/// whether each asset class is hosted on another domain.
pub fn plan_static_serving(settings: &Settings) -> Result<StaticPlan> {
    let mut plan = StaticPlan::default();

    if !settings.static_url_is_on_other_domain {
        let url = required("STATIC_URL", &settings.static_url)?;
        let root = required("STATIC_ROOT", &settings.static_root)?;
        let root = Path::new(root);

        plan.serve_static = true;
        plan.directives.push(static_map(url, root));
        // django-compressor output
        plan.directives.push(static_expires(
            &root.join(settings.compress_output_dir()).join(".*"),
        ));
        plan.directives
            .push(static_expires(&root.join(HASHED_FILENAME_PATTERN)));
    }

    if !settings.media_url_is_on_other_domain {
        let url = required("MEDIA_URL", &settings.media_url)?;
        let root = required("MEDIA_ROOT", &settings.media_root)?;

        plan.serve_static = true;
        plan.directives.push(static_map(url, Path::new(root)));
    }

    if plan.serve_static {
        plan.directives.extend([
            "--offload-threads=2".to_string(),
            "--static-cache-paths=86400".to_string(),
            format!("--static-cache-paths-name={}", STATIC_PATHS_CACHE),
            format!(
                "--cache2=name={},items=5000,blocksize=1k,purge_lru,ignore_full",
                STATIC_PATHS_CACHE
            ),
            "--static-gzip-all".to_string(),
        ]);
    }

    debug!(
        serve_static = plan.serve_static,
        directives = plan.directives.len(),
        "Planned static file serving"
    );
    Ok(plan)
}

fn static_map(url: &str, root: &Path) -> String {
    format!("--static-map={}={}", url, root.display())
}

fn static_expires(pattern: &Path) -> String {
    format!(
        "--static-expires={} {}",
        pattern.display(),
        FAR_FUTURE_EXPIRES_SECS
    )
}
