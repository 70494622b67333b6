use serde::Serialize;

use crate::model::ids::{ConceptId, ModuleId};

/// A subject area such as Algebra.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Module {
    pub id: ModuleId,
    /// Stable slug, e.g. `number_theory`.
    pub name: String,
    pub display_name: String,
    pub description: Option<String>,
    pub icon: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewModule {
    pub name: String,
    pub display_name: String,
    pub description: Option<String>,
    pub icon: Option<String>,
}

/// A named sub-topic of a module with a Markdown explanation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Concept {
    pub id: ConceptId,
    pub module_id: ModuleId,
    pub name: String,
    pub explanation: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewConcept {
    pub module_id: ModuleId,
    pub name: String,
    pub explanation: String,
}
