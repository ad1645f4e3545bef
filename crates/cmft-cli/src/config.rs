//! `--config <file.toml>` escape hatch for scripted/batch runs: the file
//! supplies every filter/layout knob, `--input`/`--output` on the command
//! line (if given) still win, so the same config can drive a batch over
//! many source files.

use crate::cli::CmftArgs;
use anyhow::Context;

pub fn resolve(mut args: CmftArgs) -> anyhow::Result<CmftArgs> {
    let Some(path) = args.config.take() else {
        return Ok(args);
    };

    let text = std::fs::read_to_string(&path)
        .with_context(|| format!("reading config file {}", path.display()))?;
    let mut merged: CmftArgs = toml::from_str(&text)
        .with_context(|| format!("parsing config file {}", path.display()))?;

    merged.config = None;
    merged.input = args.input;
    merged.output = args.output;
    Ok(merged)
}
