use std::collections::BTreeMap;

use crate::error::ConfigError;

/// Parameter values given on the command line.
pub type Overrides = BTreeMap<String, String>;

/// Split `name=value`. The value may itself contain `=` and may be empty; the name may not.
pub fn parse_override(raw: &str) -> Result<(String, String), ConfigError> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| ConfigError::InvalidOverride(raw.to_string()))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(ConfigError::InvalidOverride(raw.to_string()));
    }
    Ok((name.to_string(), value.to_string()))
}

/// Collect overrides, rejecting a name given twice.
pub(crate) fn collect<I, S>(raw: I) -> Result<Overrides, ConfigError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out = Overrides::new();
    for item in raw {
        let (name, value) = parse_override(item.as_ref())?;
        if out.insert(name.clone(), value).is_some() {
            return Err(ConfigError::DuplicateOverride(name));
        }
    }
    Ok(out)
}
