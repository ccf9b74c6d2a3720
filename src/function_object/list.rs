use serde_yaml::Value;

use super::{Constructor, FunctionObject, FunctionObjectError, Options, Registry, RunHandle};

/// The function objects of one run, in configuration order.
pub struct FunctionObjectList<'t> {
    run: RunHandle<'t>,
    objects: Vec<Box<dyn FunctionObject + 't>>,
}

impl<'t> FunctionObjectList<'t> {
    /// Constructs every enabled entry of `functions`. Each entry maps a name
    /// to an options block carrying at least a `type`.
    pub fn new(
        run: RunHandle<'t>,
        registry: &Registry,
        functions: &Options,
    ) -> Result<Self, FunctionObjectError> {
        let mut objects = Vec::with_capacity(functions.len());

        for entry in entries(functions)? {
            let constructor = lookup(registry, &entry)?;
            log::debug!("{}: constructing {}", entry.name, entry.type_name);
            objects.push(constructor(entry.name, run, entry.options)?);
        }

        Ok(Self { run, objects })
    }

    /// Checks the shape of `functions` against `registry` without
    /// constructing anything. Returns the enabled `(name, type)` pairs.
    pub fn check<'a>(
        registry: &Registry,
        functions: &'a Options,
    ) -> Result<Vec<(&'a str, &'a str)>, FunctionObjectError> {
        entries(functions)?
            .into_iter()
            .map(|entry| lookup(registry, &entry).map(|_| (entry.name, entry.type_name)))
            .collect()
    }

    /// Brings the list in line with `functions`: objects whose name and
    /// type are unchanged re-read their options, new entries are
    /// constructed and entries no longer present are dropped.
    ///
    /// Entry shape and types are checked before anything changes. If an
    /// object then rejects its options the objects not yet reconciled are
    /// kept as they were.
    pub fn read(
        &mut self,
        registry: &Registry,
        functions: &Options,
    ) -> Result<(), FunctionObjectError> {
        let entries = entries(functions)?;
        let constructors = entries
            .iter()
            .map(|entry| lookup(registry, entry))
            .collect::<Result<Vec<_>, _>>()?;

        let mut previous = std::mem::take(&mut self.objects);
        let mut result = Ok(());

        for (entry, constructor) in entries.into_iter().zip(constructors) {
            let reused = previous
                .iter()
                .position(|o| o.name() == entry.name && o.type_name() == entry.type_name)
                .map(|i| previous.remove(i));

            match reused {
                Some(mut object) => {
                    let read = object.read(entry.options);
                    self.objects.push(object);
                    if let Err(e) = read {
                        result = Err(e);
                        break;
                    }
                }
                None => {
                    log::info!("{}: constructing {}", entry.name, entry.type_name);
                    match constructor(entry.name, self.run, entry.options) {
                        Ok(object) => self.objects.push(object),
                        Err(e) => {
                            result = Err(e);
                            break;
                        }
                    }
                }
            }
        }

        if result.is_err() {
            self.objects.append(&mut previous);
        } else {
            for object in previous {
                log::info!("{}: removed", object.name());
            }
        }

        result
    }

    pub fn execute(&mut self) -> bool {
        self.objects.iter_mut().fold(true, |ok, o| o.execute() && ok)
    }

    pub fn write(&mut self) -> bool {
        self.objects.iter_mut().fold(true, |ok, o| o.write() && ok)
    }

    pub fn end(&mut self) -> bool {
        self.objects.iter_mut().fold(true, |ok, o| o.end() && ok)
    }

    pub fn names(&self) -> Vec<(&str, &'static str)> {
        self.objects
            .iter()
            .map(|o| (o.name(), o.type_name()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

struct Entry<'a> {
    name: &'a str,
    type_name: &'a str,
    options: &'a Options,
}

fn entries(functions: &Options) -> Result<Vec<Entry<'_>>, FunctionObjectError> {
    let mut entries = Vec::with_capacity(functions.len());

    for (key, value) in functions {
        let name = key.as_str().ok_or(FunctionObjectError::InvalidName)?;
        let options = value
            .as_mapping()
            .ok_or_else(|| FunctionObjectError::NotAMapping(name.to_string()))?;

        if !enabled(options) {
            log::info!("{}: disabled", name);
            continue;
        }

        let type_name = options
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| FunctionObjectError::MissingType(name.to_string()))?;

        entries.push(Entry {
            name,
            type_name,
            options,
        });
    }

    Ok(entries)
}

fn lookup(registry: &Registry, entry: &Entry<'_>) -> Result<Constructor, FunctionObjectError> {
    registry
        .get(entry.type_name)
        .ok_or_else(|| FunctionObjectError::UnknownType {
            name: entry.name.to_string(),
            type_name: entry.type_name.to_string(),
        })
}

fn enabled(options: &Options) -> bool {
    options
        .get("enabled")
        .and_then(Value::as_bool)
        .unwrap_or(true)
}
