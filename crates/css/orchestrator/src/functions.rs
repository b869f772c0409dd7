//! User-defined CSS functions (`@function --name(--param) { result: … }`)
//! registered by the embedder, and the per-call argument context.
//! Spec: <https://drafts.csswg.org/css-mixins-1/>

use css_variables::VariableData;
use std::collections::HashMap;
use std::sync::Arc;

/// A user-defined function: its parameter names (with leading `--`) and the
/// result expression of its body.
#[derive(Clone, Debug)]
pub struct FunctionDefinition {
    pub parameters: Vec<String>,
    pub body: Arc<VariableData>,
}

/// Functions visible to the cascade, keyed by case-sensitive dashed name.
#[derive(Debug, Default)]
pub struct FunctionRegistry {
    functions: HashMap<String, FunctionDefinition>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a function. `parameters` are dashed names bound in call
    /// order; `body_text` is the result expression, which may itself
    /// reference `var()`/`attr()`/other functions.
    pub fn register(&mut self, name: &str, parameters: Vec<String>, body_text: &str) {
        self.functions.insert(
            name.to_owned(),
            FunctionDefinition {
                parameters,
                body: VariableData::new(body_text, false, false),
            },
        );
    }

    pub fn lookup(&self, name: &str) -> Option<&FunctionDefinition> {
        self.functions.get(name)
    }
}

/// Arguments bound for the duration of evaluating one function body and its
/// nested calls; argument references shadow custom properties.
#[derive(Debug, Default)]
pub(crate) struct FunctionContext {
    pub(crate) arguments: HashMap<String, Arc<VariableData>>,
}
