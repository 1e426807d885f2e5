//! Inline templates
//!
//! A template is a conversion table literal used in place of a declared model
//! type for a nested field or a top-level transform.

use super::{ConversionTable, DataModel, DynamicKeyTypeFn, FieldStages, ModelType};
use crate::convert::Direction;
use crate::value::Object;
use crate::ConvertPolicy;
use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;

/// Debug name of template instances
pub const TEMPLATE_MODEL_NAME: &str = "InlineTemplate";

#[derive(Clone, Default)]
pub struct TemplateDefinition {
    pub conversion_table: ConversionTable,
    /// Unset keeps the model default
    pub convert_policy: Option<ConvertPolicy>,
    pub dynamic_key_type: Option<DynamicKeyTypeFn>,
    /// Wire-side name to model-side name
    pub name_mapper: Option<IndexMap<String, String>>,
}

impl fmt::Debug for TemplateDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateDefinition")
            .field("conversion_table", &self.conversion_table)
            .field("convert_policy", &self.convert_policy)
            .field("name_mapper", &self.name_mapper)
            .finish_non_exhaustive()
    }
}

impl TemplateDefinition {
    pub fn new(conversion_table: ConversionTable) -> Self {
        Self {
            conversion_table,
            ..Self::default()
        }
    }

    pub fn with_policy(mut self, policy: ConvertPolicy) -> Self {
        self.convert_policy = Some(policy);
        self
    }

    pub fn with_dynamic_key_type(
        mut self,
        f: impl Fn(&str, Direction) -> Option<FieldStages> + Send + Sync + 'static,
    ) -> Self {
        self.dynamic_key_type = Some(Arc::new(f));
        self
    }

    pub fn with_name_mapper<I, W, M>(mut self, wire_to_model: I) -> Self
    where
        I: IntoIterator<Item = (W, M)>,
        W: Into<String>,
        M: Into<String>,
    {
        self.name_mapper = Some(
            wire_to_model
                .into_iter()
                .map(|(wire, model)| (wire.into(), model.into()))
                .collect(),
        );
        self
    }

    /// A configured instance, optionally seeded with model-side properties.
    ///
    /// The instance carries a model type backed by this template, so it can
    /// be cloned like a declared model.
    pub fn instantiate(self: &Arc<Self>, initial: Option<Object>) -> DataModel {
        let mut model = self.build();
        let template = Arc::clone(self);
        model.model_type = Some(ModelType::new(TEMPLATE_MODEL_NAME, move || template.build()));
        if let Some(initial) = initial {
            model.extend(initial);
        }
        model
    }

    fn build(&self) -> DataModel {
        let mut model = DataModel::new(TEMPLATE_MODEL_NAME).with_table(self.conversion_table.clone());
        if let Some(policy) = self.convert_policy {
            model.config.convert_policy = policy;
        }
        model.config.dynamic_key_type = self.dynamic_key_type.clone();
        if let Some(mapper) = &self.name_mapper {
            model.set_name_mapper(mapper.iter().map(|(wire, name)| (wire.clone(), name.clone())));
        }
        model
    }
}
