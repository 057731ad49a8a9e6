//! Schema loaders.
//!
//! A [`Loader`] turns source directories and `.proto` file names into a closed
//! [`Schema`]. The crate never parses `.proto` syntax itself: [`ProtocLoader`]
//! delegates to protoc, [`DescriptorSetLoader`] reads protoc's output from an
//! earlier run.

use std::path::{Path, PathBuf};

use crate::descriptor::decode_file_descriptor_set;
use crate::protoc::{find_protoc, invoke_protoc};
use crate::schema::Schema;
use crate::Error;

/// Produces a schema from `.proto` files.
pub trait Loader {
    /// Load `files` (relative to one of `source_dirs`) and everything they import.
    fn load(&self, source_dirs: &[PathBuf], files: &[String]) -> Result<Schema, Error>;
}

impl<F> Loader for F
where
    F: Fn(&[PathBuf], &[String]) -> Result<Schema, Error>,
{
    fn load(&self, source_dirs: &[PathBuf], files: &[String]) -> Result<Schema, Error> {
        self(source_dirs, files)
    }
}

/// Loads a schema by running protoc.
#[derive(Debug, Clone, Default)]
pub struct ProtocLoader {
    protoc_path: Option<PathBuf>,
    args: Vec<String>,
}

impl ProtocLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use this protoc instead of searching `$PROTOC` and `PATH`.
    pub fn protoc_path(&mut self, path: impl AsRef<Path>) -> &mut Self {
        self.protoc_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Add an argument to pass to protoc.
    pub fn arg(&mut self, arg: impl Into<String>) -> &mut Self {
        self.args.push(arg.into());
        self
    }
}

impl Loader for ProtocLoader {
    fn load(&self, source_dirs: &[PathBuf], files: &[String]) -> Result<Schema, Error> {
        let protoc = find_protoc(self.protoc_path.as_deref())?;
        let bytes = invoke_protoc(&protoc, files, source_dirs, &self.args)?;
        Schema::from_descriptor_set(decode_file_descriptor_set(bytes)?)
    }
}

/// Loads a previously generated FileDescriptorSet.
///
/// The set must have been produced with `--include_imports`.
#[derive(Debug, Clone)]
pub struct DescriptorSetLoader {
    path: PathBuf,
}

impl DescriptorSetLoader {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Loader for DescriptorSetLoader {
    fn load(&self, _source_dirs: &[PathBuf], _files: &[String]) -> Result<Schema, Error> {
        let bytes = std::fs::read(&self.path)?;
        Schema::from_descriptor_set(decode_file_descriptor_set(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::fixtures::{field, file, file_set, message, TYPE_MESSAGE};

    #[test]
    fn test_descriptor_set_loader() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("set.bin");
        let a = message("A", &[field("b", 1, TYPE_MESSAGE, Some(".pkg.B"))], &[], &[]);
        let b = message("B", &[], &[], &[]);
        std::fs::write(&path, file_set(&[file("a.proto", "pkg", &[], &[a, b], &[], &[])])).unwrap();

        let loader = DescriptorSetLoader::new(&path);
        assert_eq!(loader.path(), path);
        let schema = loader.load(&[], &[]).unwrap();
        assert_eq!(schema.type_count(), 2);
        assert!(schema.get("pkg.A").unwrap().references().contains("pkg.B"));
    }

    #[test]
    fn test_descriptor_set_loader_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = DescriptorSetLoader::new(dir.path().join("missing.bin"));
        assert!(matches!(missing.load(&[], &[]), Err(Error::Io(_))));

        let path = dir.path().join("garbage.bin");
        std::fs::write(&path, [0x0a, 0xff]).unwrap();
        let garbage = DescriptorSetLoader::new(&path);
        assert!(matches!(garbage.load(&[], &[]), Err(Error::Decode(_))));
    }

    #[test]
    fn test_closure_loader() {
        let loader = |dirs: &[PathBuf], files: &[String]| -> Result<Schema, Error> {
            assert_eq!(dirs, [PathBuf::from("proto")]);
            assert_eq!(files, ["a.proto".to_string()]);
            Ok(Schema::default())
        };
        let schema = Loader::load(&loader, &[PathBuf::from("proto")], &["a.proto".to_string()]);
        assert!(schema.unwrap().is_empty());
    }

    #[test]
    fn test_protoc_loader_reports_failures() {
        let mut loader = ProtocLoader::new();
        loader.protoc_path("/nonexistent/protoc").arg("--fatal_warnings");
        let err = loader.load(&[PathBuf::from("proto")], &["a.proto".to_string()]);
        assert!(matches!(err, Err(Error::Io(_))));
    }
}
