use crate::{
    Error, Result, media,
    resolve::{DEFAULT_ROLE, ResolvedInput},
};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoleSchema {
    pub name: String,
    pub accepted_extensions: Vec<String>,
}

impl RoleSchema {
    pub fn new(name: impl Into<String>, accepted_extensions: &[&str]) -> Self {
        Self {
            name: name.into(),
            accepted_extensions: accepted_extensions
                .iter()
                .map(|ext| ext.to_lowercase())
                .collect(),
        }
    }

    pub fn accepts(&self, extension: Option<&str>) -> bool {
        extension.is_some_and(|ext| {
            let ext = ext.to_lowercase();
            self.accepted_extensions.iter().any(|accepted| *accepted == ext)
        })
    }
}

/// Inputs a model expects, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelSchema {
    roles: Vec<RoleSchema>,
}

impl ModelSchema {
    pub fn new(roles: Vec<RoleSchema>) -> Result<Self> {
        if roles.is_empty() {
            return Err(Error::config("model declares no inputs"));
        }

        let mut names = HashSet::new();
        for role in &roles {
            if !names.insert(role.name.as_str()) {
                return Err(Error::config(format!(
                    "input role '{}' is declared twice",
                    role.name
                )));
            }
        }

        Ok(Self { roles })
    }

    pub fn single(accepted_extensions: &[&str]) -> Result<Self> {
        Self::new(vec![RoleSchema::new(DEFAULT_ROLE, accepted_extensions)])
    }

    /// Builds the schema from a config's `model.io.input`.
    ///
    /// Entries that are objects with a `format` are roles of a multi-input
    /// model. Without any, the top-level `format` describes the single
    /// `default` input.
    pub fn from_io(input: &Value) -> Result<Self> {
        let Value::Object(map) = input else {
            return Err(Error::config("model.io.input must be an object"));
        };

        let mut roles = Vec::new();
        for (name, entry) in map {
            if let Some(format) = entry.as_object().and_then(|e| e.get("format")) {
                roles.push(role_from_format(name, format)?);
            }
        }

        if roles.is_empty() {
            let format = map
                .get("format")
                .ok_or_else(|| Error::config("model.io.input has no 'format'"))?;
            roles.push(role_from_format(DEFAULT_ROLE, format)?);
        }

        Self::new(roles)
    }

    pub fn roles(&self) -> &[RoleSchema] {
        &self.roles
    }

    pub fn role(&self, name: &str) -> Option<&RoleSchema> {
        self.roles.iter().find(|role| role.name == name)
    }

    pub fn is_multi_input(&self) -> bool {
        self.roles.len() > 1 || self.roles[0].name != DEFAULT_ROLE
    }
}

fn role_from_format(name: &str, format: &Value) -> Result<RoleSchema> {
    let formats: Vec<&str> = match format {
        Value::String(s) => vec![s.as_str()],
        Value::Array(items) => items.iter().filter_map(Value::as_str).collect(),
        _ => Vec::new(),
    };

    let mut accepted = Vec::new();
    for format in formats {
        let extensions = media::extensions_for(format);
        if extensions.is_empty() {
            return Err(Error::config(format!(
                "input '{}' declares unknown format '{}'",
                name, format
            )));
        }
        for ext in extensions {
            if !accepted.contains(&ext) {
                accepted.push(ext);
            }
        }
    }

    if accepted.is_empty() {
        return Err(Error::config(format!("input '{}' declares no formats", name)));
    }

    Ok(RoleSchema {
        name: name.to_string(),
        accepted_extensions: accepted,
    })
}

/// Checks resolved inputs against the schema: the role sets must match
/// exactly, then every file type must be accepted by its role.
pub fn validate(resolved: &[ResolvedInput], schema: &ModelSchema) -> Result<()> {
    let mut supplied = HashSet::new();
    for input in resolved {
        if !supplied.insert(input.role.as_str()) {
            return Err(Error::schema_mismatch(format!(
                "input '{}' was supplied more than once",
                input.role
            )));
        }
    }

    let missing: Vec<&str> = schema
        .roles()
        .iter()
        .map(|role| role.name.as_str())
        .filter(|name| !supplied.contains(name))
        .collect();
    let unexpected: Vec<&str> = resolved
        .iter()
        .map(|input| input.role.as_str())
        .filter(|role| schema.role(role).is_none())
        .collect();

    if !missing.is_empty() || !unexpected.is_empty() {
        let expected: Vec<&str> = schema.roles().iter().map(|r| r.name.as_str()).collect();
        return Err(Error::schema_mismatch(format!(
            "model expects inputs [{}]; missing [{}]; unexpected [{}]",
            expected.join(", "),
            missing.join(", "),
            unexpected.join(", ")
        )));
    }

    for input in resolved {
        let Some(role) = schema.role(&input.role) else {
            continue;
        };
        if !role.accepts(input.extension.as_deref()) {
            return Err(Error::unsupported_file_type(format!(
                "Incorrect file type. Input '{}' accepts [{}] but received {}",
                input.role,
                role.accepted_extensions.join(", "),
                input.extension_or_unknown()
            )));
        }
    }

    Ok(())
}
