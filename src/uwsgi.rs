//! uWSGI command construction

use crate::command::CommandSpec;
use crate::config::Settings;
use crate::error::Result;
use crate::static_files::plan_static_serving;
use tracing::info;

/// Application server binary
pub const UWSGI_PROGRAM: &str = "uwsgi";

/// WSGI entry module loaded by each worker
pub const WSGI_MODULE: &str = "wsgi";

/// Build the uWSGI invocation.
///
/// Binds to `port` when given, else to the public `PORT`. Static and media
/// serving options are appended unless assets are synced to external storage.
pub fn build_app_server_command(settings: &Settings, port: Option<u16>) -> Result<CommandSpec> {
    let port = port.unwrap_or(settings.port);

    let mut cmd = CommandSpec::new(UWSGI_PROGRAM);
    cmd.extend([
        format!("--module={}", WSGI_MODULE),
        format!("--http=0.0.0.0:{}", port),
        "--master".to_string(),
        format!("--workers={}", settings.django_web_workers),
        format!("--max-requests={}", settings.django_web_max_requests),
        format!("--harakiri={}", settings.django_web_timeout),
        // one application instance per worker, loaded after fork
        "--lazy-apps".to_string(),
    ]);

    if !settings.enable_syncing {
        let plan = plan_static_serving(settings)?;
        if plan.serve_static {
            cmd.extend(plan.directives);
        }
    }

    info!(command = %cmd, "Built uWSGI command");
    Ok(cmd)
}
