//! Launch behind nginx
//!
//! nginx and uWSGI run side by side under forego. uWSGI binds to the
//! internal BACKEND_PORT while nginx takes the public port.

use crate::artifacts::ArtifactWriter;
use crate::command::CommandSpec;
use crate::config::{required, Settings};
use crate::error::{LaunchError, Result};
use crate::procfile::{supervisor_command, Procfile};
use crate::render::{TemplateRenderer, NGINX_TEMPLATE};
use crate::uwsgi::build_app_server_command;
use std::path::Path;
use tracing::info;

/// Reverse proxy binary
pub const NGINX_PROGRAM: &str = "nginx";

/// Procfile role of the reverse proxy
pub const PROXY_ROLE: &str = "nginx";

/// Procfile role of the application server
pub const APP_ROLE: &str = "django";

/// Build the Procfile for nginx + uWSGI on the backend port
pub fn build_procfile(settings: &Settings, backend_port: u16) -> Result<Procfile> {
    let uwsgi = build_app_server_command(settings, Some(backend_port))?;

    let mut procfile = Procfile::new();
    procfile.add(PROXY_ROLE, &CommandSpec::new(NGINX_PROGRAM));
    procfile.add(APP_ROLE, &uwsgi);
    Ok(procfile)
}

/// Prepare a proxied launch and return the supervisor command.
///
/// Both output paths and BACKEND_PORT are checked before anything is
/// rendered or written. The nginx configuration is written first, then the
/// Procfile; each replaces any previous file.
pub fn plan_proxy_launch(
    settings: &Settings,
    renderer: &dyn TemplateRenderer,
    writer: &dyn ArtifactWriter,
) -> Result<CommandSpec> {
    let conf_path = required("NGINX_CONF_PATH", &settings.nginx_conf_path)?;
    let procfile_path = required("NGINX_PROCFILE_PATH", &settings.nginx_procfile_path)?;
    let backend_port = settings
        .backend_port
        .ok_or_else(|| LaunchError::config("BACKEND_PORT must be configured"))?;

    if backend_port == settings.port {
        return Err(LaunchError::config(format!(
            "BACKEND_PORT must differ from PORT (both are {})",
            backend_port
        )));
    }

    let procfile = build_procfile(settings, backend_port)?;
    let nginx_conf = renderer.render(NGINX_TEMPLATE, &settings.template_context())?;

    writer.write(Path::new(conf_path), &nginx_conf)?;
    writer.write(Path::new(procfile_path), &procfile.render())?;

    info!(
        conf = conf_path,
        procfile = procfile_path,
        backend_port,
        pagespeed = settings.enable_pagespeed,
        browsercache = settings.enable_browsercache,
        "Prepared nginx launch"
    );

    Ok(supervisor_command(procfile_path))
}
