//! Configuration for loading, pruning and emitting a protobuf schema.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::emit::Emitter;
use crate::load::{DescriptorSetLoader, Loader, ProtocLoader};
use crate::pipeline::{self, Report};
use crate::rules::RuleSet;
use crate::Error;

/// Source directory used when no proto paths are configured.
const DEFAULT_SOURCE_DIRECTORY: &str = "proto";

/// Settings forwarded untouched to the [`Emitter`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationOptions {
    /// Generate compact code.
    pub compact: bool,
    /// Emit annotations on generated types.
    pub annotations: bool,
    /// Name of the generator profile to apply, if any.
    pub profile: Option<String>,
    /// Maps proto type names (e.g. `.google.protobuf.Timestamp`) to types
    /// provided elsewhere.
    pub extern_paths: HashMap<String, String>,
}

/// Configuration for a pruning build.
///
/// ```rust,no_run
/// # fn main() -> Result<(), protoprune_build::Error> {
/// protoprune_build::Config::new()
///     .proto_path("proto")
///     .proto_file("shop/order.proto")
///     .include("shop.Order")
///     .exclude("shop.internal.*")
///     .file_descriptor_set_path("target/shop.bin")
///     .compile()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// Fallback source directory. Defaults to `proto`.
    pub(crate) proto_source_directory: PathBuf,

    /// Source directories handed to the loader; overrides the fallback.
    pub(crate) proto_paths: Vec<PathBuf>,

    /// Files to load, relative to a source directory.
    pub(crate) proto_files: Vec<String>,

    /// Include rules.
    pub(crate) includes: Vec<String>,

    /// Exclude rules.
    pub(crate) excludes: Vec<String>,

    /// Output directory for generated files. Defaults to `OUT_DIR`.
    pub(crate) out_dir: Option<PathBuf>,

    /// Path to the protoc executable.
    pub(crate) protoc_path: Option<PathBuf>,

    /// Additional arguments for protoc.
    pub(crate) protoc_args: Vec<String>,

    /// Skip running protoc, use pre-existing FileDescriptorSet.
    pub(crate) skip_protoc: bool,

    /// FileDescriptorSet to read when skipping protoc, or to write the pruned
    /// set to otherwise.
    pub(crate) file_descriptor_set_path: Option<PathBuf>,

    pub(crate) options: GenerationOptions,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            proto_source_directory: PathBuf::from(DEFAULT_SOURCE_DIRECTORY),
            proto_paths: Vec::new(),
            proto_files: Vec::new(),
            includes: Vec::new(),
            excludes: Vec::new(),
            out_dir: None,
            protoc_path: None,
            protoc_args: Vec::new(),
            skip_protoc: false,
            file_descriptor_set_path: None,
            options: GenerationOptions::default(),
        }
    }
}

impl Config {
    /// Create a new Config with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Directory searched when no [`proto_path`](Self::proto_path) is given.
    pub fn proto_source_directory(&mut self, path: impl AsRef<Path>) -> &mut Self {
        self.proto_source_directory = path.as_ref().to_path_buf();
        self
    }

    /// Add a source directory for resolving `.proto` files and imports.
    pub fn proto_path(&mut self, path: impl AsRef<Path>) -> &mut Self {
        self.proto_paths.push(path.as_ref().to_path_buf());
        self
    }

    /// Add a `.proto` file to load, relative to a source directory.
    pub fn proto_file(&mut self, file: impl Into<String>) -> &mut Self {
        self.proto_files.push(file.into());
        self
    }

    /// Keep `identifier` (a type name or `package.*`) and everything it references.
    pub fn include(&mut self, identifier: impl Into<String>) -> &mut Self {
        self.includes.push(identifier.into());
        self
    }

    /// Drop `identifier` (a type name or `package.*`) even if it is included.
    pub fn exclude(&mut self, identifier: impl Into<String>) -> &mut Self {
        self.excludes.push(identifier.into());
        self
    }

    /// Set the output directory for generated files.
    pub fn out_dir(&mut self, path: impl AsRef<Path>) -> &mut Self {
        self.out_dir = Some(path.as_ref().to_path_buf());
        self
    }

    /// Set path to the protoc executable.
    pub fn protoc_path(&mut self, path: impl AsRef<Path>) -> &mut Self {
        self.protoc_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Add an argument to pass to protoc.
    pub fn protoc_arg(&mut self, arg: impl Into<String>) -> &mut Self {
        self.protoc_args.push(arg.into());
        self
    }

    /// Skip running protoc; read the FileDescriptorSet at
    /// [`file_descriptor_set_path`](Self::file_descriptor_set_path) instead.
    pub fn skip_protoc_run(&mut self) -> &mut Self {
        self.skip_protoc = true;
        self
    }

    /// Where to write the pruned FileDescriptorSet, or where to read the
    /// input from when protoc is skipped.
    pub fn file_descriptor_set_path(&mut self, path: impl AsRef<Path>) -> &mut Self {
        self.file_descriptor_set_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Ask the emitter for compact output.
    pub fn compact(&mut self, compact: bool) -> &mut Self {
        self.options.compact = compact;
        self
    }

    /// Ask the emitter to annotate generated types.
    pub fn annotations(&mut self, annotations: bool) -> &mut Self {
        self.options.annotations = annotations;
        self
    }

    /// Select a named emitter profile.
    pub fn profile(&mut self, profile: impl Into<String>) -> &mut Self {
        self.options.profile = Some(profile.into());
        self
    }

    /// Declare an externally provided protobuf type.
    ///
    /// ```ignore
    /// config.extern_path(".google.protobuf.Timestamp", "prost_types::Timestamp");
    /// ```
    pub fn extern_path(
        &mut self,
        proto_path: impl Into<String>,
        target_path: impl Into<String>,
    ) -> &mut Self {
        self.options
            .extern_paths
            .insert(proto_path.into(), target_path.into());
        self
    }

    pub fn generation_options(&self) -> &GenerationOptions {
        &self.options
    }

    /// Directories handed to the loader.
    pub fn source_directories(&self) -> Vec<PathBuf> {
        if self.proto_paths.is_empty() {
            vec![self.proto_source_directory.clone()]
        } else {
            self.proto_paths.clone()
        }
    }

    /// Validate the include and exclude rules.
    pub fn rules(&self) -> Result<RuleSet, Error> {
        let mut builder = RuleSet::builder();
        for include in &self.includes {
            builder.add_root(include.as_str());
        }
        for exclude in &self.excludes {
            builder.prune(exclude.as_str());
        }
        builder.build()
    }

    /// The loader implied by this configuration.
    pub fn loader(&self) -> Result<Box<dyn Loader>, Error> {
        if self.skip_protoc {
            let path = self
                .file_descriptor_set_path
                .as_ref()
                .ok_or(Error::MissingDescriptorPath)?;
            return Ok(Box::new(DescriptorSetLoader::new(path)));
        }

        let mut loader = ProtocLoader::new();
        if let Some(protoc) = &self.protoc_path {
            loader.protoc_path(protoc);
        }
        for arg in &self.protoc_args {
            loader.arg(arg.as_str());
        }
        Ok(Box::new(loader))
    }

    /// Where the pruned FileDescriptorSet is written, if anywhere.
    pub(crate) fn descriptor_set_output(&self) -> Option<&Path> {
        if self.skip_protoc {
            None
        } else {
            self.file_descriptor_set_path.as_deref()
        }
    }

    pub(crate) fn resolve_out_dir(&self) -> Result<PathBuf, Error> {
        self.out_dir
            .clone()
            .or_else(|| std::env::var_os("OUT_DIR").map(Into::into))
            .ok_or(Error::MissingOutDir)
    }

    /// Load and prune, writing only the pruned FileDescriptorSet.
    pub fn compile(&self) -> Result<Report, Error> {
        let loader = self.loader()?;
        pipeline::run(self, loader.as_ref(), None)
    }

    /// Load, prune and generate every top-level type of the requested files.
    pub fn compile_with_emitter(&self, emitter: &dyn Emitter) -> Result<Report, Error> {
        let loader = self.loader()?;
        pipeline::run(self, loader.as_ref(), Some(emitter))
    }

    /// Run the pipeline with a custom loader.
    pub fn compile_with(
        &self,
        loader: &dyn Loader,
        emitter: Option<&dyn Emitter>,
    ) -> Result<Report, Error> {
        pipeline::run(self, loader, emitter)
    }
}
