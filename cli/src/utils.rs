use anyhow::Context;
use anyhow::Result;
use std::path::Path;

pub(crate) fn read_to_string<P: AsRef<Path>>(path: P) -> Result<String> {
    std::fs::read_to_string(&path)
        .with_context(|| format!("Could not read {}", path.as_ref().display()))
}

pub(crate) fn read_bytes<P: AsRef<Path>>(path: P) -> Result<Vec<u8>> {
    std::fs::read(&path).with_context(|| format!("Could not read {}", path.as_ref().display()))
}
