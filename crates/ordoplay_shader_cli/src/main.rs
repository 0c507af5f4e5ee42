// SPDX-License-Identifier: MIT OR Apache-2.0
//! `ordoplay_shaderc`: compiles a shader graph document to GLSL.
//!
//! ```text
//! ordoplay_shaderc <graph.ron> [--settings <file>] [--out <dir>] [--metadata]
//! ordoplay_shaderc --list-nodes
//! ```

mod args;
mod metadata;

use args::Args;
use metadata::ShaderMetadata;
use ordoplay_shader_graph::{
    create_shader_registry, CompilerSettings, DocumentError, EvaluationError, Graph, NodeCategory,
    SettingsError, ShaderCompiler, ShaderSource,
};
use std::path::{Path, PathBuf};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Command line errors
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Bad command line
    #[error("{0}\n\n{usage}", usage = args::USAGE)]
    Usage(String),

    /// File could not be read or written
    #[error("{}: {source}", path.display())]
    Io {
        /// File involved
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// Settings file rejected
    #[error(transparent)]
    Settings(#[from] SettingsError),

    /// Graph document rejected
    #[error(transparent)]
    Document(#[from] DocumentError),

    /// Compile pass aborted
    #[error(transparent)]
    Evaluation(#[from] EvaluationError),

    /// Metadata could not be encoded
    #[error("Failed to encode metadata: {0}")]
    Json(#[from] serde_json::Error),
}

fn main() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("ordoplay_shader_graph=info,ordoplay_shaderc=info"));

    // stdout carries the shader text
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let result = Args::parse(std::env::args().skip(1)).and_then(|args| run(&args));
    if let Err(e) = result {
        tracing::error!("{e}");
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), CliError> {
    if args.list_nodes {
        list_nodes();
    }
    let Some(input) = &args.input else {
        return Ok(());
    };

    let settings = match &args.settings {
        Some(path) => CompilerSettings::load(path)?,
        None => CompilerSettings::default(),
    };

    let text = read(input)?;
    let graph = Graph::load(&text)?;
    for node in graph.nodes() {
        if let Some(message) = node.validation_state().message() {
            tracing::warn!(node = %node.id(), kind = node.type_name(), "{message}");
        }
    }

    let mut compiler = ShaderCompiler::new(settings);
    let source = graph.compile(&mut compiler)?;
    let metadata = ShaderMetadata::from_compiler(&graph.name, &compiler);
    tracing::info!(
        graph = %graph.name,
        nodes = graph.node_count(),
        textures = metadata.textures.len(),
        uniforms = metadata.uniforms.len(),
        "compiled"
    );

    let stem = args.stem();
    match &args.out_dir {
        Some(dir) => write_outputs(dir, &stem, &source, args.metadata.then_some(&metadata)),
        None => {
            println!("// {stem}.vert\n{}", source.vertex);
            println!("// {stem}.frag\n{}", source.fragment);
            if args.metadata {
                println!("{}", serde_json::to_string_pretty(&metadata)?);
            }
            Ok(())
        }
    }
}

fn list_nodes() {
    let registry = create_shader_registry();
    for category in [
        NodeCategory::Output,
        NodeCategory::Input,
        NodeCategory::Texture,
        NodeCategory::Math,
        NodeCategory::Utility,
        NodeCategory::Custom,
    ] {
        println!("{category:?}");
        for node_type in registry.types_in_category(category) {
            println!("  {:<18} {:<18} {}", node_type.id, node_type.name, node_type.description);
        }
    }
}

fn write_outputs(
    dir: &Path,
    stem: &str,
    shader: &ShaderSource,
    metadata: Option<&ShaderMetadata>,
) -> Result<(), CliError> {
    std::fs::create_dir_all(dir).map_err(|source| CliError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    write(&dir.join(format!("{stem}.vert")), &shader.vertex)?;
    write(&dir.join(format!("{stem}.frag")), &shader.fragment)?;
    if let Some(metadata) = metadata {
        write(&dir.join(format!("{stem}.json")), &serde_json::to_string_pretty(metadata)?)?;
    }
    Ok(())
}

fn read(path: &Path) -> Result<String, CliError> {
    std::fs::read_to_string(path).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn write(path: &Path, contents: &str) -> Result<(), CliError> {
    std::fs::write(path, contents).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::info!(path = %path.display(), "wrote");
    Ok(())
}
