//! The build pipeline: validate, load, prune, write, emit.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Instant;

use log::{debug, info, warn};

use crate::config::Config;
use crate::descriptor::encode_schema;
use crate::emit::{write_generated, Emitter};
use crate::load::Loader;
use crate::prune::prune;
use crate::schema::Schema;
use crate::Error;

/// Summary of a pipeline run.
#[derive(Debug, Clone)]
pub struct Report {
    /// Types in the schema as loaded.
    pub loaded_types: usize,
    /// Types left after pruning.
    pub retained_types: usize,
    /// Include rules that matched no type.
    pub unused_includes: Vec<String>,
    /// Exclude rules that matched no type.
    pub unused_excludes: Vec<String>,
    /// Files written by the emitter, in generation order.
    pub generated: Vec<PathBuf>,
    /// The pruned schema.
    pub schema: Schema,
}

/// Run the whole pipeline for `config`.
///
/// Configuration is validated before anything is loaded. Without an emitter
/// the pruned FileDescriptorSet is the only output, so
/// [`Config::file_descriptor_set_path`] must be set and protoc must not be
/// skipped.
pub fn run(
    config: &Config,
    loader: &dyn Loader,
    emitter: Option<&dyn Emitter>,
) -> Result<Report, Error> {
    if config.proto_files.is_empty() {
        return Err(Error::NoProtoFiles);
    }
    let rules = config.rules()?;
    if config.skip_protoc && config.file_descriptor_set_path.is_none() {
        return Err(Error::MissingDescriptorPath);
    }
    let descriptor_out = config.descriptor_set_output();
    if emitter.is_none() && descriptor_out.is_none() {
        return Err(Error::NothingToGenerate);
    }
    let out_dir = match emitter {
        Some(_) => Some(config.resolve_out_dir()?),
        None => None,
    };

    let source_dirs = config.source_directories();
    let start = Instant::now();
    let schema = loader.load(&source_dirs, &config.proto_files)?;
    for file in schema.files() {
        debug!("  {} ({} types)", file.name(), file.types().len());
    }
    info!(
        "Loaded {} proto files in {:?}",
        schema.files().len(),
        start.elapsed()
    );

    let loaded_types = schema.type_count();
    let mut unused_includes = Vec::new();
    let mut unused_excludes = Vec::new();
    let schema = if rules.is_empty() {
        schema
    } else {
        let start = Instant::now();
        let (pruned, usage) = prune(schema, rules)?;
        for rule in usage.unused_roots() {
            warn!("Unused include: {}", rule);
            unused_includes.push(rule.to_string());
        }
        for rule in usage.unused_prunes() {
            warn!("Unused exclude: {}", rule);
            unused_excludes.push(rule.to_string());
        }
        info!(
            "Pruned schema from {} types to {} types in {:?}",
            loaded_types,
            pruned.type_count(),
            start.elapsed()
        );
        pruned
    };

    if let Some(path) = descriptor_out {
        write_descriptor_set(path, &schema)?;
        info!("Wrote pruned FileDescriptorSet to {}", path.display());
    }

    let mut generated = Vec::new();
    if let (Some(emitter), Some(out_dir)) = (emitter, out_dir) {
        let requested: HashSet<&str> = config
            .proto_files
            .iter()
            .map(|file| normalize(file))
            .collect();
        let nodes = schema
            .files()
            .iter()
            .filter(|file| requested.contains(normalize(file.name())))
            .flat_map(|file| file.types())
            .filter(|node| node.is_top_level());

        for node in nodes {
            let start = Instant::now();
            let output = emitter.generate(&schema, node, &config.options)?;
            let path = write_generated(&out_dir, &output)?;
            info!("Generated {} in {:?}", output.target, start.elapsed());
            generated.push(path);
        }
    }

    Ok(Report {
        loaded_types,
        retained_types: schema.type_count(),
        unused_includes,
        unused_excludes,
        generated,
        schema,
    })
}

fn write_descriptor_set(path: &Path, schema: &Schema) -> Result<(), Error> {
    let write_error = |source| Error::Write {
        target: "FileDescriptorSet".to_string(),
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(write_error)?;
    }
    std::fs::write(path, encode_schema(schema)).map_err(write_error)
}

/// Requested names are compared the way protoc reports them.
fn normalize(file: &str) -> &str {
    let mut file = file;
    while let Some(rest) = file.strip_prefix("./") {
        file = rest;
    }
    file
}
