//! Template rendering for generated configuration files

use crate::error::{LaunchError, Result};
use crate::flag::parse_flag;
use minijinja::{Environment, ErrorKind, UndefinedBehavior, Value};
use std::borrow::Cow;
use std::path::PathBuf;
use tracing::debug;

/// Template name of the nginx configuration
pub const NGINX_TEMPLATE: &str = "nginx.conf";

const BUILTIN_NGINX_TEMPLATE: &str = include_str!("../templates/nginx.conf");

/// Renders a named template against a context.
pub trait TemplateRenderer {
    fn render(&self, name: &str, context: &serde_json::Value) -> Result<String>;
}

/// minijinja-backed renderer.
///
/// Looks for `<template_dir>/<name>` first, then falls back to the built-in
/// templates. Undefined variables are errors, so a template can only use
/// optional settings behind an `is defined` test.
#[derive(Debug, Clone, Default)]
pub struct JinjaRenderer {
    template_dir: Option<PathBuf>,
}

impl JinjaRenderer {
    pub fn new(template_dir: Option<PathBuf>) -> Self {
        Self { template_dir }
    }

    fn source(&self, name: &str) -> Result<Cow<'static, str>> {
        if let Some(dir) = &self.template_dir {
            let path = dir.join(name);
            if path.is_file() {
                debug!(path = %path.display(), "Using template override");
                return std::fs::read_to_string(&path)
                    .map(Cow::Owned)
                    .map_err(|e| template_error(name, e));
            }
        }

        match name {
            NGINX_TEMPLATE => Ok(Cow::Borrowed(BUILTIN_NGINX_TEMPLATE)),
            _ => Err(template_error(name, "template not found")),
        }
    }
}

impl TemplateRenderer for JinjaRenderer {
    fn render(&self, name: &str, context: &serde_json::Value) -> Result<String> {
        let source = self.source(name)?;

        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        env.add_filter("flag", flag_filter);
        env.add_template(name, source.as_ref())
            .map_err(|e| template_error(name, e))?;

        let tmpl = env.get_template(name).map_err(|e| template_error(name, e))?;
        tmpl.render(context).map_err(|e| template_error(name, e))
    }
}

/// `{{ value|flag }}`: boolean-ish normalization inside templates
fn flag_filter(value: Value) -> std::result::Result<bool, minijinja::Error> {
    match value.as_str() {
        Some(s) => parse_flag(s).ok_or_else(|| {
            minijinja::Error::new(
                ErrorKind::InvalidOperation,
                format!("{:?} is not a boolean-ish value", s),
            )
        }),
        None => Ok(value.is_true()),
    }
}

fn template_error(name: &str, err: impl std::fmt::Display) -> LaunchError {
    LaunchError::Template {
        name: name.to_string(),
        message: err.to_string(),
    }
}
