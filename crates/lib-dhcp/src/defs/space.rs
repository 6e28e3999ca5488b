use std::collections::HashMap;
use std::sync::Arc;

use crate::defs::{DefinitionError, OptionDefinition};

/// Option definitions of one option space, keyed both by code and by name.
#[derive(Debug, Clone, Default)]
pub struct OptionSpaceTable {
    by_code: HashMap<u8, Arc<OptionDefinition>>,
    by_name: HashMap<String, Arc<OptionDefinition>>,
}

impl OptionSpaceTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, space: &str, def: OptionDefinition) -> Result<(), DefinitionError> {
        def.validate()?;
        if self.by_code.contains_key(&def.code()) {
            return Err(DefinitionError::Duplicate {
                space: space.to_string(),
                code: def.code(),
            });
        }
        if self.by_name.contains_key(def.name()) {
            return Err(DefinitionError::DuplicateName {
                space: space.to_string(),
                name: def.name().to_string(),
            });
        }

        let def = Arc::new(def);
        self.by_code.insert(def.code(), def.clone());
        self.by_name.insert(def.name().to_string(), def);
        Ok(())
    }

    pub fn get_by_code(&self, code: u8) -> Option<&OptionDefinition> {
        self.by_code.get(&code).map(Arc::as_ref)
    }

    pub fn get_by_name(&self, name: &str) -> Option<&OptionDefinition> {
        self.by_name.get(name).map(Arc::as_ref)
    }

    pub fn len(&self) -> usize {
        self.by_code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_code.is_empty()
    }
}
