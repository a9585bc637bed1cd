//! Environment composition for the launched process
//!
//! uWSGI reads `UWSGI_*` variables as if they were command-line options, so
//! the adaptive-scaling ("cheaper") defaults are passed through the
//! environment where an operator can still override each one.

use crate::config::Settings;
use crate::error::{LaunchError, Result};
use crate::flag::parse_flag;
use std::collections::BTreeMap;
use std::ffi::{OsStr, OsString};
use tracing::debug;

/// Ordered `KEY -> value` environment for the child process.
///
/// Keys and values are OS strings: inherited variables that are not valid
/// UTF-8 reach the child unchanged.
pub type Environment = BTreeMap<OsString, OsString>;

/// Variable that toggles the cheaper defaults from the inherited environment
pub const CHEAPER_FLAG: &str = "ENABLE_UWSGI_CHEAPER";

/// Always-on defaults
const BASE_DEFAULTS: &[(&str, &str)] = &[("UWSGI_ENABLE_THREADS", "1")];

/// Busyness-based worker scaling, starting from a single worker
const CHEAPER_DEFAULTS: &[(&str, &str)] = &[
    ("UWSGI_CHEAPER", "1"),
    ("UWSGI_CHEAPER_ALGO", "busyness"),
    ("UWSGI_CHEAPER_INITIAL", "1"),
    ("UWSGI_CHEAPER_BUSINESS_VERBOSE", "1"),
    ("UWSGI_CHEAPER_BUSINESS_BACKLOG_ALERT", "10"),
    ("UWSGI_CHEAPER_OVERLOAD", "30"),
];

/// Look up a variable that holds valid UTF-8
pub fn var<'a>(env: &'a Environment, key: &str) -> Option<&'a str> {
    env.get(OsStr::new(key)).and_then(|v| v.to_str())
}

/// Compute only the defaults this launcher contributes, before the overlay
pub fn default_environment<I, K, V>(inherited: I, settings: &Settings) -> Result<Environment>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<OsStr>,
    V: AsRef<OsStr>,
{
    let inherited_flag = inherited
        .into_iter()
        .find(|(k, _)| k.as_ref() == OsStr::new(CHEAPER_FLAG))
        .map(|(_, v)| v.as_ref().to_os_string());

    let cheaper = match inherited_flag {
        Some(value) => value.to_str().and_then(parse_flag).ok_or_else(|| {
            LaunchError::config(format!(
                "{}={:?} is not a boolean-ish value",
                CHEAPER_FLAG, value
            ))
        })?,
        None => settings.enable_uwsgi_cheaper,
    };

    let mut env: Environment = BASE_DEFAULTS
        .iter()
        .map(|(k, v)| (OsString::from(*k), OsString::from(*v)))
        .collect();

    if cheaper {
        env.extend(
            CHEAPER_DEFAULTS
                .iter()
                .map(|(k, v)| (OsString::from(*k), OsString::from(*v))),
        );
    }

    debug!(cheaper, defaults = env.len(), "Computed uWSGI environment defaults");
    Ok(env)
}

/// Compose the full child environment: computed defaults overlaid with the
/// inherited environment, so inherited values always win.
pub fn compose_environment<I, K, V>(inherited: I, settings: &Settings) -> Result<Environment>
where
    I: IntoIterator<Item = (K, V)> + Clone,
    K: AsRef<OsStr>,
    V: AsRef<OsStr>,
{
    let mut env = default_environment(inherited.clone(), settings)?;
    env.extend(
        inherited
            .into_iter()
            .map(|(k, v)| (k.as_ref().to_os_string(), v.as_ref().to_os_string())),
    );
    Ok(env)
}
