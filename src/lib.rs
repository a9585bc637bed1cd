//! Webstart - deployment launcher for a uWSGI-served web application
//!
//! This library decides how a web application is started:
//! - Directly under uWSGI, bound to the public port
//! - Behind nginx (optionally with pagespeed/browser caching), supervised by
//!   forego through a generated Procfile
//!
//! It builds the exact command lines, renders the nginx configuration,
//! composes the child environment, and finally replaces the current process.

pub mod artifacts;
pub mod command;
pub mod config;
pub mod env;
pub mod error;
pub mod exec;
pub mod flag;
pub mod launch;
pub mod procfile;
pub mod proxy;
pub mod render;
pub mod static_files;
pub mod uwsgi;

pub use error::{LaunchError, Result};
