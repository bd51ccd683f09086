//! CLI argument parsing types.
//!
//! This module provides the command-line interface structure for the cesapi binary.

use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use crate::error::{CesError, Result};
use crate::filter::FilterSet;
use crate::query::Query;
use crate::resolver::ResolveOptions;

/// CES API command-line interface.
#[derive(Parser, Debug)]
#[command(name = "cesapi", about = "Course Evaluations & Surveys API CLI", version)]
pub struct Cli {
    /// Output results as JSON instead of a table.
    #[arg(long, global = true, default_value = "false")]
    pub json: bool,

    /// CES instance URL, without `/api`.
    #[arg(long, global = true, env = "CES_API_URL")]
    pub url: Option<String>,

    /// CES API key.
    #[arg(long, global = true, env = "CES_API_KEY", hide_env_values = true)]
    pub token: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show registered entity kinds and their relationships.
    Kinds,

    /// List a kind from its root endpoint.
    List {
        /// Entity kind, e.g. `Course`.
        kind: String,

        #[command(flatten)]
        selection: Selection,
    },

    /// List a kind, then follow relationships or project a column.
    ///
    /// Each name is applied to the result of the previous one; only the
    /// last may be a column.
    Traverse {
        /// Entity kind to start from.
        kind: String,

        /// Relationship or column names.
        #[arg(required = true, num_args = 1..)]
        names: Vec<String>,

        #[command(flatten)]
        selection: Selection,

        /// Maximum concurrent requests per relationship.
        #[arg(long, default_value_t = 1)]
        concurrency: usize,

        /// Add a `_source_row_index` column to traversed rows.
        #[arg(long)]
        tag_source_rows: bool,

        /// Give up on a relationship after this many seconds.
        #[arg(long)]
        deadline: Option<u64>,
    },
}

/// Server-side parameters and client-side filters for the starting listing.
#[derive(Args, Debug, Clone, Default)]
pub struct Selection {
    /// Query parameter sent to the server, as `key=value`.
    #[arg(long = "param", value_parser = parse_param)]
    pub params: Vec<(String, String)>,

    /// Client-side filter, as `column=expr` (e.g. `status=>2`, `name=Bio*`).
    #[arg(long = "filter")]
    pub filters: Vec<String>,
}

impl Selection {
    pub fn query(&self) -> Query {
        self.params.iter().cloned().collect()
    }

    /// Parse the filter arguments.
    ///
    /// # Errors
    ///
    /// Returns [`CesError::InvalidFilter`] for a malformed filter.
    pub fn filter_set(&self) -> Result<FilterSet> {
        FilterSet::from_pairs(&self.filters)
    }
}

/// Build resolve options from traverse flags.
pub fn resolve_options(concurrency: usize, tag_source_rows: bool, deadline: Option<u64>) -> ResolveOptions {
    let mut options = ResolveOptions::default().with_concurrency(concurrency);
    if tag_source_rows {
        options = options.with_source_rows();
    }
    if let Some(secs) = deadline {
        options = options.with_deadline(Duration::from_secs(secs));
    }
    options
}

fn parse_param(raw: &str) -> core::result::Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected key=value, got '{raw}'")),
    }
}

impl Cli {
    /// The configured URL and token.
    ///
    /// # Errors
    ///
    /// Returns [`CesError::ConfigMissing`] if either is unset.
    pub fn credentials(&self) -> Result<(&str, &str)> {
        let url = self.url.as_deref().ok_or_else(|| {
            CesError::ConfigMissing("--url or CES_API_URL".to_string())
        })?;
        let token = self.token.as_deref().ok_or_else(|| {
            CesError::ConfigMissing("--token or CES_API_KEY".to_string())
        })?;
        Ok((url, token))
    }
}
