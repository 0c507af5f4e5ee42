// SPDX-License-Identifier: MIT OR Apache-2.0
//! Command line parsing.

use crate::CliError;
use std::path::{Path, PathBuf};

/// Usage text shown with command line errors
pub const USAGE: &str = "usage: ordoplay_shaderc <graph.ron> [--settings <file>] [--out <dir>] [--metadata]
       ordoplay_shaderc --list-nodes";

/// Parsed command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Args {
    /// Graph document; `None` only with `--list-nodes`
    pub input: Option<PathBuf>,
    /// Compiler settings file
    pub settings: Option<PathBuf>,
    /// Output directory; stdout when unset
    pub out_dir: Option<PathBuf>,
    /// Also write JSON metadata
    pub metadata: bool,
    /// Print the node registry
    pub list_nodes: bool,
}

impl Args {
    /// Parse arguments, program name excluded
    pub fn parse<I>(args: I) -> Result<Self, CliError>
    where
        I: IntoIterator<Item = String>,
    {
        let mut input = None;
        let mut settings = None;
        let mut out_dir = None;
        let mut metadata = false;
        let mut list_nodes = false;

        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--settings" => settings = Some(value(&mut args, "--settings")?),
                "--out" => out_dir = Some(value(&mut args, "--out")?),
                "--metadata" => metadata = true,
                "--list-nodes" => list_nodes = true,
                flag if flag.starts_with("--") => {
                    return Err(CliError::Usage(format!("Unknown option {flag}")));
                }
                path => {
                    if input.replace(PathBuf::from(path)).is_some() {
                        return Err(CliError::Usage("Only one graph document may be given".to_string()));
                    }
                }
            }
        }

        if input.is_none() && !list_nodes {
            return Err(CliError::Usage("Missing graph document".to_string()));
        }
        Ok(Self {
            input,
            settings,
            out_dir,
            metadata,
            list_nodes,
        })
    }

    /// Base name of the output files
    pub fn stem(&self) -> String {
        self.input
            .as_deref()
            .and_then(Path::file_stem)
            .map_or_else(|| "shader".to_string(), |stem| stem.to_string_lossy().into_owned())
    }
}

fn value(args: &mut impl Iterator<Item = String>, flag: &str) -> Result<PathBuf, CliError> {
    args.next()
        .map(PathBuf::from)
        .ok_or_else(|| CliError::Usage(format!("{flag} needs a value")))
}
