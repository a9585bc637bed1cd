//! Launch mode decision and dispatch

use crate::artifacts::ArtifactWriter;
use crate::command::CommandSpec;
use crate::config::Settings;
use crate::env::{compose_environment, default_environment, Environment};
use crate::error::{LaunchError, Result};
use crate::exec::ProcessReplacer;
use crate::proxy::plan_proxy_launch;
use crate::render::TemplateRenderer;
use crate::uwsgi::build_app_server_command;
use std::convert::Infallible;
use std::ffi::OsString;
use std::fmt;
use tracing::info;

/// How the application is started
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchMode {
    /// uWSGI alone on the public port
    Direct,
    /// nginx on the public port, uWSGI on the backend port, under forego
    Proxied,
}

impl LaunchMode {
    /// Proxied when nginx, pagespeed, or browser caching is enabled
    pub fn from_settings(settings: &Settings) -> Self {
        if settings.proxy_enabled() {
            LaunchMode::Proxied
        } else {
            LaunchMode::Direct
        }
    }
}

impl fmt::Display for LaunchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LaunchMode::Direct => f.write_str("direct"),
            LaunchMode::Proxied => f.write_str("proxied"),
        }
    }
}

/// Everything needed to replace the process
#[derive(Debug, Clone)]
pub struct LaunchPlan {
    pub mode: LaunchMode,
    pub command: CommandSpec,
    /// Full child environment
    pub env: Environment,
    /// Variables this launcher contributes (before the inherited overlay)
    pub defaults: Environment,
}

/// Decides on a launch mode and performs it
pub struct Launcher<'a> {
    renderer: &'a dyn TemplateRenderer,
    writer: &'a dyn ArtifactWriter,
    replacer: &'a dyn ProcessReplacer,
    inherited: Vec<(OsString, OsString)>,
}

impl<'a> Launcher<'a> {
    pub fn new(
        renderer: &'a dyn TemplateRenderer,
        writer: &'a dyn ArtifactWriter,
        replacer: &'a dyn ProcessReplacer,
    ) -> Self {
        Self {
            renderer,
            writer,
            replacer,
            inherited: Vec::new(),
        }
    }

    /// Environment inherited by the child (normally `std::env::vars_os()`)
    pub fn with_inherited_env<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<OsString>,
        V: Into<OsString>,
    {
        self.inherited = vars
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self
    }

    /// Build the command and environment. In proxied mode this renders and
    /// writes the nginx configuration and the Procfile.
    pub fn prepare(&self, settings: &Settings) -> Result<LaunchPlan> {
        let mode = LaunchMode::from_settings(settings);
        let inherited = || self.inherited.iter().map(|(k, v)| (k.as_os_str(), v.as_os_str()));

        let env = compose_environment(inherited(), settings)?;
        let defaults = default_environment(inherited(), settings)?;

        let command = match mode {
            LaunchMode::Proxied => plan_proxy_launch(settings, self.renderer, self.writer)?,
            LaunchMode::Direct => build_app_server_command(settings, Some(settings.port))?,
        };

        info!(mode = %mode, program = command.program(), "Launch prepared");
        Ok(LaunchPlan {
            mode,
            command,
            env,
            defaults,
        })
    }

    /// Prepare and replace the current process. Only returns on failure.
    pub fn launch(&self, settings: &Settings) -> Result<Infallible> {
        let plan = self.prepare(settings)?;
        Err(self.replacer.replace(&plan.command, &plan.env))
    }
}

/// Convenience wrapper: decide and launch in one call
pub fn decide_and_launch(settings: &Settings, launcher: &Launcher<'_>) -> LaunchError {
    match launcher.launch(settings) {
        Ok(never) => match never {},
        Err(e) => e,
    }
}
