//! Hand-off to downstream code generators.

use std::path::{Component, Path, PathBuf};

use crate::config::GenerationOptions;
use crate::schema::{Schema, TypeNode};
use crate::Error;

/// Output of an [`Emitter`] for one top-level type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generated {
    /// Name of the generated artifact, used in logs and errors.
    pub target: String,
    /// Destination relative to the output directory.
    pub path: PathBuf,
    pub contents: String,
}

/// A code generator for retained types.
///
/// Called once per top-level type of each requested file, after pruning.
/// `schema` is the pruned schema, so every reference of `node` resolves in it.
pub trait Emitter {
    fn generate(
        &self,
        schema: &Schema,
        node: &TypeNode,
        options: &GenerationOptions,
    ) -> Result<Generated, Error>;
}

impl<F> Emitter for F
where
    F: Fn(&Schema, &TypeNode, &GenerationOptions) -> Result<Generated, Error>,
{
    fn generate(
        &self,
        schema: &Schema,
        node: &TypeNode,
        options: &GenerationOptions,
    ) -> Result<Generated, Error> {
        self(schema, node, options)
    }
}

/// Write `generated` below `out_dir`, creating parent directories.
pub(crate) fn write_generated(out_dir: &Path, generated: &Generated) -> Result<PathBuf, Error> {
    let relative = generated.path.components().all(|c| matches!(c, Component::Normal(_)));
    if !relative || generated.path.as_os_str().is_empty() {
        return Err(Error::Emit {
            target: generated.target.clone(),
            message: format!(
                "output path {} must be relative to the output directory",
                generated.path.display()
            ),
        });
    }

    let path = out_dir.join(&generated.path);
    let write_error = |source| Error::Write {
        target: generated.target.clone(),
        path: path.clone(),
        source,
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(write_error)?;
    }
    std::fs::write(&path, &generated.contents).map_err(write_error)?;
    Ok(path)
}
