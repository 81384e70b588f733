use std::path::Path;

use anyhow::{bail, Context, Result};
use luz_expr::{is_valid_name, NameTable, Value};

/// Parse a `--names` JSON object. Strings are typed like calendar values (`HH:MM` → time,
/// integer → number, anything else → text); JSON integers become numbers.
pub fn parse_names_json(json: &str) -> Result<NameTable> {
    let parsed: serde_json::Value = serde_json::from_str(json).context("invalid names JSON")?;
    let Some(object) = parsed.as_object() else {
        bail!("names JSON must be an object of NAME: value pairs");
    };

    let mut names = NameTable::new();
    for (name, value) in object {
        if !is_valid_name(name) {
            bail!("`{name}` is not a valid template name");
        }
        let value = match value {
            serde_json::Value::String(s) => Value::infer(s),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(n) => Value::Number(n),
                None => bail!("`{name}`: only integer numbers are supported (got {n})"),
            },
            other => bail!("`{name}`: unsupported value {other}"),
        };
        names.set(name.clone(), value);
    }
    Ok(names)
}

pub fn load_names_file(path: &Path) -> Result<NameTable> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read names file {}", path.display()))?;
    parse_names_json(&json).with_context(|| format!("in {}", path.display()))
}

/// `NAME=VALUE` from `--set`.
pub fn parse_assignment(raw: &str) -> std::result::Result<(String, Value), String> {
    let Some((name, value)) = raw.split_once('=') else {
        return Err(format!("expected NAME=VALUE, got `{raw}`"));
    };
    let name = name.trim();
    if !is_valid_name(name) {
        return Err(format!("`{name}` is not a valid template name"));
    }
    Ok((name.to_string(), Value::infer(value)))
}
