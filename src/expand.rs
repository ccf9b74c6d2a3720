use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;

/// Name under which the case root is exposed to path expansion.
pub const CASE_ROOT_VAR: &str = "CASE_ROOT";

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ExpandError {
    #[error("unknown variable '{name}' in '{input}'")]
    UnknownVariable { name: String, input: String },
    #[error("unterminated '${{' in '{0}'")]
    UnterminatedBrace(String),
    #[error("cannot expand '~' in '{0}': HOME is not set")]
    NoHome(String),
}

/// Variables consulted before the process environment.
pub type Vars = HashMap<String, String>;

/// Expands `$NAME`, `${NAME}` and a leading `~` in `input`.
///
/// Names resolve from `vars` first and then from the process environment.
/// A name starts with a letter or `_`. An unresolved name is an error; a
/// `$` not followed by a name is kept.
pub fn expand(input: &str, vars: &Vars) -> Result<PathBuf, ExpandError> {
    let lookup = |name: &str| -> Result<String, ExpandError> {
        vars.get(name)
            .cloned()
            .or_else(|| std::env::var(name).ok())
            .ok_or_else(|| ExpandError::UnknownVariable {
                name: name.to_string(),
                input: input.to_string(),
            })
    };

    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    if rest == "~" || rest.starts_with("~/") {
        let home = std::env::var("HOME").map_err(|_| ExpandError::NoHome(input.to_string()))?;
        out.push_str(&home);
        rest = &rest[1..];
    }

    while let Some(idx) = rest.find('$') {
        out.push_str(&rest[..idx]);
        let after = &rest[idx + 1..];

        if let Some(braced) = after.strip_prefix('{') {
            let end = braced
                .find('}')
                .ok_or_else(|| ExpandError::UnterminatedBrace(input.to_string()))?;
            out.push_str(&lookup(&braced[..end])?);
            rest = &braced[end + 1..];
            continue;
        }

        let starts_name = after
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
        let len = if starts_name {
            after
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .unwrap_or(after.len())
        } else {
            0
        };
        if len == 0 {
            out.push('$');
        } else {
            out.push_str(&lookup(&after[..len])?);
        }
        rest = &after[len..];
    }
    out.push_str(rest);

    Ok(PathBuf::from(out))
}
