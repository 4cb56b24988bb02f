//! Command-line interface.
//!
//! This module defines the CLI arguments using clap's derive macros and
//! the command implementations the binary dispatches to. The engine
//! itself lives in the library; commands only wire stores, configs, and
//! formatters together.

use std::io::Write;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::bundler;
use crate::config::{self, PluginRegistry, RawConfig, ResolvedStyleguide};
use crate::error::{OaslintError, Result};
use crate::output::{
    CheckstyleFormatter, JsonFormatter, OutputFormat, ProblemFormatter, StylishFormatter,
};
use crate::problems::IgnoreFile;
use crate::resolver::RefResolver;
use crate::source::SourceStore;
use crate::{lint_document, Document};

/// oaslint - OpenAPI linter and transformer.
#[derive(Debug, Parser)]
#[command(name = "oaslint")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to config file (overrides discovery of oaslint.yaml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Lint API documents
    Lint(LintArgs),

    /// Bundle external refs into one document
    Bundle(BundleArgs),

    /// Reorder top-level keys into the canonical order
    Normalize(NormalizeArgs),
}

/// Arguments for the `lint` command.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct LintArgs {
    /// Documents to lint; the config's APIs when omitted
    pub files: Vec<String>,

    /// Output format: stylish, json, checkstyle
    #[arg(long, default_value = "stylish")]
    pub format: String,

    /// Path to an ignore file
    #[arg(long)]
    pub ignore_file: Option<PathBuf>,
}

/// Arguments for the `bundle` command.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct BundleArgs {
    /// Documents to bundle; the config's APIs when omitted
    pub files: Vec<String>,

    /// Fully inline refs instead of collecting them into components
    #[arg(long)]
    pub dereferenced: bool,

    /// Output format: yaml, json
    #[arg(long, default_value = "yaml")]
    pub format: String,

    /// Write to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Arguments for the `normalize` command.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct NormalizeArgs {
    /// Document to normalize
    pub file: String,

    /// Output format: yaml, json
    #[arg(long, default_value = "yaml")]
    pub format: String,
}

/// Outcome of a dispatched command.
pub struct CommandResult {
    pub exit_code: i32,
}

/// Dispatches commands against a working directory.
pub struct CommandDispatcher {
    cwd: PathBuf,
    plugins: PluginRegistry,
}

impl CommandDispatcher {
    /// Create a dispatcher rooted at a directory.
    pub fn new(cwd: PathBuf) -> Self {
        Self {
            cwd,
            plugins: PluginRegistry::new(),
        }
    }

    /// Register plugins before dispatching.
    pub fn with_plugins(mut self, plugins: PluginRegistry) -> Self {
        self.plugins = plugins;
        self
    }

    /// Run the selected command.
    pub fn dispatch(&self, cli: &Cli) -> Result<CommandResult> {
        match &cli.command {
            Commands::Lint(args) => self.lint(cli, args),
            Commands::Bundle(args) => self.bundle(cli, args),
            Commands::Normalize(args) => self.normalize(args),
        }
    }

    fn load_config(&self, cli: &Cli) -> Result<(RawConfig, Option<String>)> {
        let path = match &cli.config {
            Some(path) => Some(path.clone()),
            None => config::discover_config(&self.cwd),
        };
        match path {
            Some(path) => {
                let raw = RawConfig::load(&path)?;
                Ok((raw, Some(path.to_string_lossy().into_owned())))
            }
            None => Ok((RawConfig::default(), None)),
        }
    }

    /// The documents to operate on: explicit files, or the config's APIs.
    fn roots(
        &self,
        files: &[String],
        resolved: &config::ResolvedConfig,
    ) -> Result<Vec<(String, Option<String>)>> {
        if !files.is_empty() {
            return Ok(files.iter().map(|f| (f.clone(), None)).collect());
        }
        let roots: Vec<_> = resolved
            .apis
            .iter()
            .map(|(alias, api)| (api.root.clone(), Some(alias.clone())))
            .collect();
        if roots.is_empty() {
            return Err(OaslintError::ConfigError {
                message: "No documents given and no APIs configured".to_string(),
            });
        }
        Ok(roots)
    }

    fn lint(&self, cli: &Cli, args: &LintArgs) -> Result<CommandResult> {
        let format = OutputFormat::parse(&args.format).ok_or_else(|| OaslintError::ConfigError {
            message: format!("Unknown output format `{}`", args.format),
        })?;
        let (raw, config_uri) = self.load_config(cli)?;
        let resolved = config::resolve_config(&raw, config_uri.as_deref(), &self.plugins)?;

        let ignore = match &args.ignore_file {
            Some(path) => Some(IgnoreFile::load(path)?),
            None => {
                let default = self.cwd.join(".oaslint.lint-ignore.yaml");
                if default.exists() {
                    Some(IgnoreFile::load(&default)?)
                } else {
                    None
                }
            }
        };

        let store = SourceStore::new();
        let resolver = RefResolver::new(&store);
        let mut all_problems = Vec::new();
        let mut totals = crate::problems::Totals::default();

        for (root, alias) in self.roots(&args.files, &resolved)? {
            let styleguide: &ResolvedStyleguide = match &alias {
                Some(alias) => &resolved.apis[alias].styleguide,
                None => &resolved.styleguide,
            };
            tracing::debug!(root = root.as_str(), "linting document");
            let document = Document::open(&store, &root)?;
            let result = lint_document(&document, styleguide, &resolver, ignore.clone())?;
            totals.errors += result.totals.errors;
            totals.warnings += result.totals.warnings;
            totals.ignored += result.totals.ignored;
            all_problems.extend(result.problems);
        }

        let mut stdout = std::io::stdout().lock();
        match format {
            OutputFormat::Stylish => StylishFormatter::new(!cli.no_color)
                .format(&all_problems, &totals, &store, &mut stdout)?,
            OutputFormat::Json => {
                JsonFormatter::new().format(&all_problems, &totals, &store, &mut stdout)?
            }
            OutputFormat::Checkstyle => {
                CheckstyleFormatter::new().format(&all_problems, &totals, &store, &mut stdout)?
            }
        }

        Ok(CommandResult {
            exit_code: if totals.errors > 0 { 1 } else { 0 },
        })
    }

    fn bundle(&self, cli: &Cli, args: &BundleArgs) -> Result<CommandResult> {
        let (raw, config_uri) = self.load_config(cli)?;
        let resolved = config::resolve_config(&raw, config_uri.as_deref(), &self.plugins)?;
        let store = SourceStore::new();
        let resolver = RefResolver::new(&store);

        let mut chunks = Vec::new();
        for (root, alias) in self.roots(&args.files, &resolved)? {
            let styleguide = match &alias {
                Some(alias) => &resolved.apis[alias].styleguide,
                None => &resolved.styleguide,
            };
            let document = Document::open(&store, &root)?;
            let value = if args.dereferenced {
                bundler::dereference(&document, &resolver)?
            } else {
                bundler::bundle(&document, &resolver, Some(styleguide))?
            };
            chunks.push(self.serialize(&value, &args.format)?);
        }
        let text = chunks.join("---\n");

        match &args.output {
            Some(path) => std::fs::write(path, text)?,
            None => {
                let mut stdout = std::io::stdout().lock();
                stdout.write_all(text.as_bytes())?;
            }
        }
        Ok(CommandResult { exit_code: 0 })
    }

    fn normalize(&self, args: &NormalizeArgs) -> Result<CommandResult> {
        let store = SourceStore::new();
        let document = Document::open(&store, &args.file)?;
        let value = bundler::normalize(&document)?;
        let text = self.serialize(&value, &args.format)?;
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(text.as_bytes())?;
        Ok(CommandResult { exit_code: 0 })
    }

    fn serialize(&self, value: &serde_yaml::Value, format: &str) -> Result<String> {
        match format {
            "yaml" => bundler::to_yaml_string(value),
            "json" => bundler::to_json_string(value),
            other => Err(OaslintError::ConfigError {
                message: format!("Unknown output format `{}`", other),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_lint_command() {
        let cli = Cli::parse_from(["oaslint", "lint", "openapi.yaml", "--format", "json"]);
        let Commands::Lint(args) = &cli.command else {
            panic!("expected lint command");
        };
        assert_eq!(args.files, vec!["openapi.yaml"]);
        assert_eq!(args.format, "json");
    }

    #[test]
    fn parses_bundle_flags() {
        let cli = Cli::parse_from(["oaslint", "bundle", "a.yaml", "--dereferenced", "-o", "out.yaml"]);
        let Commands::Bundle(args) = &cli.command else {
            panic!("expected bundle command");
        };
        assert!(args.dereferenced);
        assert_eq!(args.output.as_deref(), Some(std::path::Path::new("out.yaml")));
    }

    #[test]
    fn global_flags_apply_before_subcommand() {
        let cli = Cli::parse_from(["oaslint", "--no-color", "lint", "a.yaml"]);
        assert!(cli.no_color);
    }
}
