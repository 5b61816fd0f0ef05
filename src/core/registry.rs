//! Name → model lookup shared by every front-end.

use std::sync::Arc;

use crate::error::{SebitError, SebitResult};
use crate::models::{JournalBook, Model, CALCULATORS};

/// An ordered set of models addressed by name.
#[derive(Default)]
pub struct ModelRegistry {
    models: Vec<Arc<dyn Model>>,
}

impl std::fmt::Debug for ModelRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelRegistry")
            .field("models", &self.names())
            .finish()
    }
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The twelve calculators followed by `journal`.
    pub fn standard(journal: JournalBook) -> Self {
        let mut registry = Self::new();
        for calculator in CALCULATORS {
            registry.register(calculator);
        }
        registry.register(journal);
        registry
    }

    /// Add a model; a model with the same name is replaced in place.
    pub fn register(&mut self, model: impl Model + 'static) {
        let model: Arc<dyn Model> = Arc::new(model);
        match self.models.iter().position(|m| m.name() == model.name()) {
            Some(idx) => self.models[idx] = model,
            None => self.models.push(model),
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Model>> {
        self.models.iter().find(|m| m.name() == name).cloned()
    }

    /// Like [`get`](Self::get), with the unknown-model error listing what exists.
    pub fn resolve(&self, name: &str) -> SebitResult<Arc<dyn Model>> {
        self.get(name).ok_or_else(|| SebitError::UnknownModel {
            name: name.to_string(),
            available: self.names().join(", "),
        })
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.models.iter().map(|m| m.name()).collect()
    }

    /// `(name, label)` pairs in registration order.
    pub fn entries(&self) -> Vec<(&'static str, &'static str)> {
        self.models.iter().map(|m| (m.name(), m.label())).collect()
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}
