//! Protoc invocation utilities.

use std::path::{Path, PathBuf};
use std::process::Command;

use bytes::Bytes;
use log::debug;

use crate::Error;

/// Find the protoc executable: `explicit` if given, then `$PROTOC`, then `PATH`.
pub(crate) fn find_protoc(explicit: Option<&Path>) -> Result<PathBuf, Error> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }

    if let Some(path) = std::env::var_os("PROTOC").map(PathBuf::from) {
        if path.exists() {
            return Ok(path);
        }
        debug!("Ignoring PROTOC={}, file does not exist", path.display());
    }

    which::which("protoc").map_err(|_| Error::ProtocNotFound)
}

/// Run protoc over `protos` and return the encoded FileDescriptorSet,
/// imports included.
pub(crate) fn invoke_protoc(
    protoc: &Path,
    protos: &[String],
    includes: &[PathBuf],
    extra_args: &[String],
) -> Result<Bytes, Error> {
    let tempdir = tempfile::tempdir()?;
    let descriptor_path = tempdir.path().join("descriptor.bin");

    let mut cmd = Command::new(protoc);
    for include in includes {
        cmd.arg("-I").arg(include);
    }
    cmd.arg("--descriptor_set_out")
        .arg(&descriptor_path)
        .arg("--include_imports")
        .args(extra_args)
        .args(protos);

    debug!("Running {:?}", cmd);
    let output = cmd.output()?;

    if !output.status.success() {
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        let combined = match (stdout.trim().is_empty(), stderr.trim().is_empty()) {
            (true, _) => stderr.into_owned(),
            (_, true) => stdout.into_owned(),
            _ => format!("{}\n{}", stdout, stderr),
        };
        return Err(Error::ProtocFailed(combined));
    }

    Ok(Bytes::from(std::fs::read(&descriptor_path)?))
}
