//! Flattening layered documents through the external rasterizer CLI

use log::debug;
use std::process::Command;

use super::{decode_file, RasterError, SourceKey};
use crate::sprite::Layers;

/// Build the rasterizer command line for one source key, writing the
/// flattened bitmap to `output`.
pub(crate) fn command_args(key: &SourceKey, output: &std::path::Path) -> Vec<std::ffi::OsString> {
    let mut args: Vec<std::ffi::OsString> =
        vec!["-b".into(), key.path.clone().into(), "--color-mode".into(), "rgb".into()];
    if let Some(frame) = key.frame {
        args.push("--frame-range".into());
        args.push(format!("{},{}", frame, frame).into());
    }
    for layer in &key.layers {
        args.push("--layer".into());
        args.push(layer.into());
    }
    for layer in &key.ignore_layers {
        args.push("--ignore-layer".into());
        args.push(layer.into());
    }
    args.push("--save-as".into());
    args.push(output.as_os_str().to_os_string());
    args
}

/// Run the rasterizer for `key` and decode its output.
///
/// The output goes through a temporary PNG that is removed afterwards. A
/// non-zero exit is returned verbatim as [`RasterError::ExitStatus`].
pub(crate) fn rasterize(executable: &str, key: &SourceKey) -> Result<Layers, RasterError> {
    let io_error = |source| RasterError::Io {
        command: executable.to_string(),
        path: key.path.clone(),
        source,
    };

    let output = tempfile::Builder::new()
        .prefix("tilegfx-")
        .suffix(".png")
        .tempfile()
        .map_err(io_error)?;

    let args = command_args(key, output.path());
    debug!("running {} {:?}", executable, args);
    let status = Command::new(executable).args(&args).status().map_err(io_error)?;
    if !status.success() {
        return Err(RasterError::ExitStatus {
            command: executable.to_string(),
            path: key.path.clone(),
            code: status.code(),
        });
    }

    decode_file(output.path())
}
