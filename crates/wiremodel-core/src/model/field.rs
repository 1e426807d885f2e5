//! Field specifications and field-level resolution

use crate::convert::{ChildModel, ConvertItemOptions, ConverterRegistry, Direction, DispatchRequest, Params};
use crate::value::Value;
use crate::Result;
use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;

/// Escape hatch replacing the registry for one direction of a field
pub type CustomConvertFn =
    Arc<dyn Fn(&Value, &FieldSpec, &ConvertItemOptions) -> Result<Value> + Send + Sync>;

/// Hook returning a replacement source before dispatch
pub type PresolveFn = Arc<dyn Fn(&Value) -> Result<Value> + Send + Sync>;

/// One direction of a [`FieldSpec`]
#[derive(Clone, Default)]
pub struct SideSpec {
    /// Converter type name
    pub type_name: Option<String>,
    /// Unset inherits from the policy
    pub required: Option<bool>,
    pub date_format: Option<String>,
    pub child_model: Option<ChildModel>,
    pub params: Params,
    pub custom_fn: Option<CustomConvertFn>,
    pub presolve: Option<PresolveFn>,
}

impl SideSpec {
    pub fn type_name(&self) -> &str {
        self.type_name.as_deref().unwrap_or("")
    }

    /// Explicit override, else whether the policy requires every declared field
    pub fn is_required(&self, policy_required: bool) -> bool {
        self.required.unwrap_or(policy_required)
    }
}

impl fmt::Debug for SideSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SideSpec")
            .field("type_name", &self.type_name)
            .field("required", &self.required)
            .field("date_format", &self.date_format)
            .field("child_model", &self.child_model)
            .field("params", &self.params)
            .field("custom_fn", &self.custom_fn.is_some())
            .field("presolve", &self.presolve.is_some())
            .finish()
    }
}

/// One transformation stage of a field
#[derive(Debug, Clone, Default)]
pub struct FieldSpec {
    pub wire: SideSpec,
    pub model: SideSpec,
    /// Run even when the source field is absent
    pub force_apply: bool,
}

impl FieldSpec {
    pub fn side(&self, direction: Direction) -> &SideSpec {
        match direction {
            Direction::ToWire => &self.wire,
            Direction::ToModel => &self.model,
        }
    }

    pub(crate) fn side_mut(&mut self, direction: Direction) -> &mut SideSpec {
        match direction {
            Direction::ToWire => &mut self.wire,
            Direction::ToModel => &mut self.model,
        }
    }
}

/// Ordered stages of a field; the output of one stage feeds the next
#[derive(Debug, Clone, Default)]
pub struct FieldStages(Vec<FieldSpec>);

impl FieldStages {
    pub fn new(stages: Vec<FieldSpec>) -> Self {
        Self(stages)
    }

    pub fn first(&self) -> Option<&FieldSpec> {
        self.0.first()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FieldSpec> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn is_force_apply(&self) -> bool {
        self.0.iter().any(|stage| stage.force_apply)
    }
}

impl From<FieldSpec> for FieldStages {
    fn from(spec: FieldSpec) -> Self {
        Self(vec![spec])
    }
}

impl From<Vec<FieldSpec>> for FieldStages {
    fn from(stages: Vec<FieldSpec>) -> Self {
        Self(stages)
    }
}

impl<'a> IntoIterator for &'a FieldStages {
    type Item = &'a FieldSpec;
    type IntoIter = std::slice::Iter<'a, FieldSpec>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Model-side field name to its stages
#[derive(Debug, Clone, Default)]
pub struct ConversionTable {
    fields: IndexMap<String, FieldStages>,
}

impl ConversionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, stages: impl Into<FieldStages>) {
        self.fields.insert(name.into(), stages.into());
    }

    pub fn remove(&mut self, name: &str) -> Option<FieldStages> {
        self.fields.shift_remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&FieldStages> {
        self.fields.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldStages)> {
        self.fields.iter().map(|(name, stages)| (name.as_str(), stages))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Names of the fields with a force-applied stage
    pub fn force_apply_fields(&self) -> Vec<String> {
        self.fields
            .iter()
            .filter(|(_, stages)| stages.is_force_apply())
            .map(|(name, _)| name.clone())
            .collect()
    }
}

/// Run `source` through every stage of a field for the direction in `options`
pub fn resolve_field(
    source: &Value,
    stages: &FieldStages,
    key: &str,
    options: &ConvertItemOptions,
    registry: &ConverterRegistry,
) -> Result<Value> {
    let policy_required = options.policy.is_required();
    let mut current = source.clone();

    for stage in stages {
        let side = stage.side(options.direction);

        if let Some(custom) = &side.custom_fn {
            current = custom(&current, stage, options)?;
            continue;
        }
        if let Some(presolve) = &side.presolve {
            current = presolve(&current)?;
        }

        let date_format = side
            .date_format
            .as_deref()
            .filter(|format| !format.is_empty())
            .or_else(|| Some(options.default_date_format.as_str()).filter(|f| !f.is_empty()));
        let request = DispatchRequest {
            key,
            type_name: side.type_name(),
            required: side.is_required(policy_required),
            params: Some(&side.params),
            child_model: side.child_model.as_ref(),
            date_format,
        };
        current = registry.dispatch(&current, &request, options)?;
    }
    Ok(current)
}
