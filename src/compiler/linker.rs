//! Linker: emits the object file and invokes the system linker.

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::errors::{self, Phase};

use super::compiler::CodeGen;

/// Write `<output>.o` next to the requested output, then link it against
/// libc with `ld`. The linker's exit code is not interpreted; only a
/// failure to spawn it is fatal.
pub fn link(g: &CodeGen<'_, '_>, output_path: &Path) {
    let mut object_os = output_path.as_os_str().to_owned();
    object_os.push(".o");
    let object_path = PathBuf::from(object_os);

    g.write_object_file(&object_path);

    let result = Command::new("ld")
        .arg("-o")
        .arg(output_path)
        .arg(&object_path)
        .arg("-lc")
        .status();

    if let Err(err) = result {
        errors::fatal_with_hint(
            Phase::Linker,
            format!("failed to run ld: {err}"),
            Some("Make sure a system linker is on your PATH".into()),
        );
    }
}
