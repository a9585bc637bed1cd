//! Integration tests for launch decisions
//!
//! Exercises the full path from a settings file to the command handed to the
//! process replacer, with real template rendering and real file writes into a
//! temporary directory.

use std::cell::RefCell;
use std::ffi::OsStr;
use std::path::Path;
use tempfile::TempDir;
use webstart::artifacts::{ArtifactWriter, FsWriter};
use webstart::command::CommandSpec;
use webstart::config::Settings;
use webstart::env::{var, Environment};
use webstart::exec::ProcessReplacer;
use webstart::launch::{decide_and_launch, LaunchMode, Launcher};
use webstart::render::JinjaRenderer;
use webstart::LaunchError;

// ============================================================================
// Test doubles
// ============================================================================

#[derive(Default)]
struct RecordingReplacer {
    calls: RefCell<Vec<(CommandSpec, Environment)>>,
}

impl ProcessReplacer for RecordingReplacer {
    fn replace(&self, command: &CommandSpec, env: &Environment) -> LaunchError {
        self.calls.borrow_mut().push((command.clone(), env.clone()));
        LaunchError::ProcessLaunch {
            program: command.program().to_string(),
            source: std::io::Error::new(std::io::ErrorKind::Other, "intercepted"),
        }
    }
}

/// Fails every write and counts attempts
#[derive(Default)]
struct FailingWriter {
    attempts: RefCell<usize>,
}

impl ArtifactWriter for FailingWriter {
    fn write(&self, path: &Path, _contents: &str) -> webstart::Result<()> {
        *self.attempts.borrow_mut() += 1;
        Err(LaunchError::Filesystem {
            path: path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
        })
    }
}

const DIRECT: &str = r#"
ENABLE_NGINX = false
ENABLE_PAGESPEED = false
ENABLE_BROWSERCACHE = false
PORT = 80
DJANGO_WEB_WORKERS = 4
DJANGO_WEB_MAX_REQUESTS = 1000
DJANGO_WEB_TIMEOUT = 30
ENABLE_SYNCING = true
"#;

fn proxied_settings(tmp: &TempDir) -> Settings {
    let source = DIRECT.replace("ENABLE_NGINX = false", "ENABLE_NGINX = true")
        + &format!(
            "BACKEND_PORT = 8001\nNGINX_CONF_PATH = {:?}\nNGINX_PROCFILE_PATH = {:?}\n",
            tmp.path().join("proxy/app.conf").to_str().unwrap(),
            tmp.path().join("proxy/procfile").to_str().unwrap(),
        );
    Settings::from_toml_str(&source).unwrap()
}

// ============================================================================
// Direct mode
// ============================================================================

mod direct_mode {
    use super::*;

    #[test]
    fn test_direct_scenario() {
        let tmp = TempDir::new().unwrap();
        let settings_path = tmp.path().join("settings.toml");
        std::fs::write(&settings_path, DIRECT).unwrap();
        let settings = Settings::load(&settings_path).unwrap();

        assert_eq!(LaunchMode::from_settings(&settings), LaunchMode::Direct);

        let renderer = JinjaRenderer::default();
        let replacer = RecordingReplacer::default();
        let launcher = Launcher::new(&renderer, &FsWriter, &replacer);
        let err = decide_and_launch(&settings, &launcher);
        assert!(matches!(err, LaunchError::ProcessLaunch { .. }));

        let calls = replacer.calls.borrow();
        assert_eq!(calls.len(), 1);
        let args = calls[0].0.args();
        assert_eq!(calls[0].0.program(), "uwsgi");
        assert!(args.contains(&"--http=0.0.0.0:80".to_string()));
        assert!(args.contains(&"--workers=4".to_string()));
        assert!(args.contains(&"--max-requests=1000".to_string()));
        assert!(args.contains(&"--harakiri=30".to_string()));
        assert!(!calls[0].0.has_option("--static-map"));
        assert!(!calls[0].0.has_option("--static-expires"));

        // nothing but the settings file was written
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_direct_mode_serves_local_assets() {
        let source = DIRECT.replace("ENABLE_SYNCING = true", "ENABLE_SYNCING = false")
            + r#"
STATIC_URL = "/static/"
STATIC_ROOT = "/app/static"
MEDIA_URL = "/media/"
MEDIA_ROOT = "/app/media"
"#;
        let settings = Settings::from_toml_str(&source).unwrap();
        let renderer = JinjaRenderer::default();
        let replacer = RecordingReplacer::default();
        let launcher = Launcher::new(&renderer, &FsWriter, &replacer);

        let plan = launcher.prepare(&settings).unwrap();
        let args = plan.command.args();
        assert!(args.contains(&"--static-map=/static/=/app/static".to_string()));
        assert!(args.contains(&"--static-map=/media/=/app/media".to_string()));
        assert_eq!(args.iter().filter(|a| a.starts_with("--cache2=")).count(), 1);
    }
}

// ============================================================================
// Proxied mode
// ============================================================================

mod proxied_mode {
    use super::*;

    #[test]
    fn test_proxied_scenario() {
        let tmp = TempDir::new().unwrap();
        let settings = proxied_settings(&tmp);
        assert_eq!(LaunchMode::from_settings(&settings), LaunchMode::Proxied);

        let renderer = JinjaRenderer::default();
        let replacer = RecordingReplacer::default();
        let launcher = Launcher::new(&renderer, &FsWriter, &replacer);
        let _ = decide_and_launch(&settings, &launcher);

        let procfile_path = tmp.path().join("proxy/procfile");
        let conf_path = tmp.path().join("proxy/app.conf");

        let procfile = std::fs::read_to_string(&procfile_path).unwrap();
        let lines: Vec<&str> = procfile.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "nginx: nginx");
        assert!(lines[1].starts_with("django: "));
        assert!(lines[1].contains("--http=0.0.0.0:8001"));

        let conf = std::fs::read_to_string(&conf_path).unwrap();
        assert!(conf.contains("server 127.0.0.1:8001;"));
        assert!(conf.contains("listen 80;"));

        let calls = replacer.calls.borrow();
        assert_eq!(
            calls[0].0.argv(),
            vec!["forego", "start", "-f", procfile_path.to_str().unwrap()]
        );
    }

    #[test]
    fn test_procfile_parses_back() {
        let tmp = TempDir::new().unwrap();
        let settings = proxied_settings(&tmp);
        let renderer = JinjaRenderer::default();
        let replacer = RecordingReplacer::default();

        Launcher::new(&renderer, &FsWriter, &replacer)
            .prepare(&settings)
            .unwrap();

        let content = std::fs::read_to_string(tmp.path().join("proxy/procfile")).unwrap();
        let django = content
            .lines()
            .find_map(|line| line.strip_prefix("django: "))
            .unwrap();
        let argv = shell_words::split(django).unwrap();
        assert_eq!(argv[0], "uwsgi");
        assert!(argv.contains(&"--lazy-apps".to_string()));
    }

    #[test]
    fn test_relaunch_overwrites_identically() {
        let tmp = TempDir::new().unwrap();
        let settings = proxied_settings(&tmp);
        let renderer = JinjaRenderer::default();
        let replacer = RecordingReplacer::default();
        let launcher = Launcher::new(&renderer, &FsWriter, &replacer);

        let conf_path = tmp.path().join("proxy/app.conf");
        let procfile_path = tmp.path().join("proxy/procfile");

        launcher.prepare(&settings).unwrap();
        let first = (
            std::fs::read(&conf_path).unwrap(),
            std::fs::read(&procfile_path).unwrap(),
        );

        std::fs::write(&conf_path, "stale").unwrap();
        launcher.prepare(&settings).unwrap();
        let second = (
            std::fs::read(&conf_path).unwrap(),
            std::fs::read(&procfile_path).unwrap(),
        );

        assert_eq!(first, second);
    }

    #[test]
    fn test_pagespeed_renders_pagespeed_section() {
        let tmp = TempDir::new().unwrap();
        let source = DIRECT.replace("ENABLE_PAGESPEED = false", "ENABLE_PAGESPEED = \"yes\"")
            + &format!(
                "BACKEND_PORT = 8001\nNGINX_CONF_PATH = {:?}\nNGINX_PROCFILE_PATH = {:?}\n",
                tmp.path().join("nginx.conf").to_str().unwrap(),
                tmp.path().join("Procfile").to_str().unwrap(),
            );
        let settings = Settings::from_toml_str(&source).unwrap();
        let renderer = JinjaRenderer::default();
        let replacer = RecordingReplacer::default();

        let plan = Launcher::new(&renderer, &FsWriter, &replacer)
            .prepare(&settings)
            .unwrap();

        assert_eq!(plan.mode, LaunchMode::Proxied);
        let conf = std::fs::read_to_string(tmp.path().join("nginx.conf")).unwrap();
        assert!(conf.contains("pagespeed on;"));
        assert!(!conf.contains("expires max;"));
    }

    #[test]
    fn test_missing_conf_path_writes_nothing() {
        let source = DIRECT.replace("ENABLE_NGINX = false", "ENABLE_NGINX = true")
            + "BACKEND_PORT = 8001\nNGINX_PROCFILE_PATH = \"/tmp/procfile\"\n";
        let settings = Settings::from_toml_str(&source).unwrap();
        let renderer = JinjaRenderer::default();
        let writer = FailingWriter::default();
        let replacer = RecordingReplacer::default();

        let err = decide_and_launch(&settings, &Launcher::new(&renderer, &writer, &replacer));

        assert!(matches!(err, LaunchError::Configuration(_)));
        assert_eq!(*writer.attempts.borrow(), 0);
        assert!(replacer.calls.borrow().is_empty());
    }

    #[test]
    fn test_write_failure_aborts_launch() {
        let tmp = TempDir::new().unwrap();
        let settings = proxied_settings(&tmp);
        let renderer = JinjaRenderer::default();
        let writer = FailingWriter::default();
        let replacer = RecordingReplacer::default();

        let err = decide_and_launch(&settings, &Launcher::new(&renderer, &writer, &replacer));

        assert!(matches!(err, LaunchError::Filesystem { .. }));
        assert_eq!(*writer.attempts.borrow(), 1);
        assert!(replacer.calls.borrow().is_empty());
    }
}

// ============================================================================
// Environment
// ============================================================================

mod environment {
    use super::*;

    #[test]
    fn test_inherited_env_overrides_defaults() {
        let settings = Settings::from_toml_str(DIRECT).unwrap();
        let renderer = JinjaRenderer::default();
        let replacer = RecordingReplacer::default();
        let launcher = Launcher::new(&renderer, &FsWriter, &replacer).with_inherited_env([
            ("UWSGI_CHEAPER_ALGO", "spare"),
            ("DATABASE_URL", "postgres://db/app"),
        ]);

        let _ = launcher.launch(&settings);

        let calls = replacer.calls.borrow();
        let env = &calls[0].1;
        assert_eq!(var(env, "UWSGI_CHEAPER_ALGO"), Some("spare"));
        assert_eq!(var(env, "DATABASE_URL"), Some("postgres://db/app"));
        assert_eq!(var(env, "UWSGI_CHEAPER"), Some("1"));
    }

    #[test]
    fn test_cheaper_disabled_from_environment() {
        let settings = Settings::from_toml_str(DIRECT).unwrap();
        let renderer = JinjaRenderer::default();
        let replacer = RecordingReplacer::default();
        let launcher = Launcher::new(&renderer, &FsWriter, &replacer)
            .with_inherited_env([("ENABLE_UWSGI_CHEAPER", "0")]);

        let plan = launcher.prepare(&settings).unwrap();
        assert_eq!(plan.defaults.len(), 1);
        assert!(!plan.env.contains_key(OsStr::new("UWSGI_CHEAPER")));
    }
}
