//! `${name}` parameter references in declarations.
//!
//! Values are resolved with the precedence explicit override, then the parameter's environment variable, then its default.
//! Only string fields are interpolated. `$$` is an escaped `$`; a `$` not followed by `{` is kept as is,
//! so shell variables in unit commands survive untouched.

use std::collections::BTreeMap;
use std::path::PathBuf;

use berth_model::{ImageSource, Parameter, StackDeclaration, StorageSpec};
use tracing::{debug, trace};

use crate::error::ParamError;

/// Resolved value for every declared parameter.
pub type ParameterValues = BTreeMap<String, String>;

/// Resolve declared parameters.
///
/// `env` looks up environment variables; pass `|_| None` to ignore the environment.
/// An override for a name that is not declared is an error, so typos on the command line do not pass silently.
pub fn resolve_values<F>(
    declared: &BTreeMap<String, Parameter>,
    overrides: &BTreeMap<String, String>,
    env: F,
) -> Result<ParameterValues, ParamError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(unknown) = overrides.keys().find(|k| !declared.contains_key(*k)) {
        return Err(ParamError::UnknownOverride(unknown.clone()));
    }

    let mut values = ParameterValues::new();
    for (name, param) in declared {
        let (value, source) = match overrides.get(name) {
            Some(v) => (v.clone(), "override"),
            None => match param.env.as_deref().and_then(&env) {
                Some(v) => (v, "env"),
                None => (param.default.clone(), "default"),
            },
        };
        trace!(parameter = %name, source, "parameter resolved");
        values.insert(name.clone(), value);
    }
    Ok(values)
}

/// Substitute `${name}` references in `input`.
pub fn interpolate(input: &str, values: &ParameterValues) -> Result<String, ParamError> {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(i) = rest.find('$') {
        out.push_str(&rest[..i]);
        let after = &rest[i + 1..];

        if let Some(tail) = after.strip_prefix('$') {
            out.push('$');
            rest = tail;
        } else if let Some(body) = after.strip_prefix('{') {
            let end = body
                .find('}')
                .ok_or_else(|| ParamError::Unterminated(input.to_string()))?;
            let name = body[..end].trim();
            let value = values.get(name).ok_or_else(|| ParamError::Undeclared {
                name: name.to_string(),
                input: input.to_string(),
            })?;
            out.push_str(value);
            rest = &body[end + 1..];
        } else {
            out.push('$');
            rest = after;
        }
    }
    out.push_str(rest);
    Ok(out)
}

/// Whether `input` contains at least one `${name}` reference. Escaped `$${...}` does not count.
pub fn has_reference(input: &str) -> bool {
    let mut rest = input;
    while let Some(i) = rest.find('$') {
        let after = &rest[i + 1..];
        if let Some(tail) = after.strip_prefix('$') {
            rest = tail;
        } else if after.starts_with('{') {
            return true;
        } else {
            rest = after;
        }
    }
    false
}

/// Copy of `decl` with every string field interpolated.
pub fn apply_parameters(
    decl: &StackDeclaration,
    values: &ParameterValues,
) -> Result<StackDeclaration, ParamError> {
    let sub = |s: &mut String| -> Result<(), ParamError> {
        if s.contains('$') {
            *s = interpolate(s, values)?;
        }
        Ok(())
    };

    let mut out = decl.clone();

    sub(&mut out.stack.name)?;
    sub(&mut out.stack.account)?;
    sub(&mut out.stack.region)?;
    sub(&mut out.stack.cluster_name)?;
    sub(&mut out.service.name)?;

    if let StorageSpec::Existing {
        file_system_id,
        security_group_id,
    } = &mut out.storage
    {
        sub(file_system_id)?;
        sub(security_group_id)?;
    }

    for v in &mut out.task.volumes {
        sub(&mut v.name)?;
        sub(&mut v.root_directory)?;
    }

    for unit in &mut out.task.units {
        match &mut unit.image {
            ImageSource::Private { repository, tag } => {
                sub(repository)?;
                sub(tag)?;
            }
            ImageSource::Public { reference } => sub(reference)?,
        }
        unit.env = unit.env.map_values(|v| interpolate(v, values))?;
        if let Some(cmd) = &mut unit.command {
            cmd.iter_mut().try_for_each(sub)?;
        }
        if let Some(hc) = &mut unit.health_check {
            hc.command.iter_mut().try_for_each(sub)?;
        }
        if let Some(dir) = &mut unit.working_directory {
            let mut s = dir.to_string_lossy().into_owned();
            sub(&mut s)?;
            *dir = PathBuf::from(s);
        }
        if let Some(log) = &mut unit.logging {
            sub(&mut log.stream_prefix)?;
        }
        for m in &mut unit.mounts {
            sub(&mut m.source_volume)?;
        }
    }

    debug!(parameters = values.len(), "parameters applied");
    Ok(out)
}

/// Apply every parameter at its default, ignoring the environment.
pub fn apply_defaults(decl: &StackDeclaration) -> Result<StackDeclaration, ParamError> {
    let values = resolve_values(&decl.parameters, &BTreeMap::new(), |_| None)?;
    apply_parameters(decl, &values)
}
