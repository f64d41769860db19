//! Named-type registry for one generation run

use crate::types::TypeDeclaration;
use indexmap::IndexMap;
use thiserror::Error;

/// Highest numeric suffix tried before giving up on a base name
const MAX_SUFFIX: u32 = 10_000;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// A fixed name already holds a different declaration
    #[error("type name '{0}' is already declared with a different shape")]
    Conflict(String),

    #[error("no free name left for '{0}'")]
    Exhausted(String),
}

#[derive(Debug, Clone)]
enum Slot {
    /// Held for a component schema that has not been declared yet
    Reserved,
    Declared(TypeDeclaration),
}

/// Interns declarations by sanitized name
///
/// Structurally identical declarations share one name; a different
/// declaration under a taken name gets the first free numeric suffix
/// (`EventItemsObject`, `EventItemsObject1`, ...).
#[derive(Debug, Clone, Default)]
pub struct NameRegistry {
    slots: IndexMap<String, Slot>,
}

impl NameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold a name for a declaration that must keep it
    ///
    /// Returns the reserved name, suffixed if the base was already taken.
    pub fn reserve(&mut self, base: &str) -> Result<String, RegistryError> {
        let name = self.free_name(base, |_| false)?;
        self.slots.insert(name.clone(), Slot::Reserved);
        Ok(name)
    }

    /// Fill a name exactly
    ///
    /// Succeeds when the name is free, reserved, or already holds the same
    /// structure; a different declaration under the name is a conflict.
    pub fn define(&mut self, decl: TypeDeclaration) -> Result<String, RegistryError> {
        match self.slots.get(&decl.name) {
            Some(Slot::Declared(existing)) if existing.same_structure(&decl) => {
                tracing::debug!(name = %decl.name, "reusing declaration");
                Ok(decl.name)
            }
            Some(Slot::Declared(_)) => Err(RegistryError::Conflict(decl.name)),
            Some(Slot::Reserved) | None => {
                let name = decl.name.clone();
                self.slots.insert(name.clone(), Slot::Declared(decl));
                Ok(name)
            }
        }
    }

    /// Add a synthesized declaration, reusing or suffixing as needed
    ///
    /// Reserved names are never handed out here.
    pub fn intern(&mut self, mut decl: TypeDeclaration) -> Result<String, RegistryError> {
        let name = self.free_name(&decl.name, |existing| existing.same_structure(&decl))?;

        if let Some(Slot::Declared(_)) = self.slots.get(&name) {
            tracing::debug!(name = %name, "reusing declaration");
            return Ok(name);
        }

        if name != decl.name {
            tracing::debug!(base = %decl.name, name = %name, "suffixed colliding type name");
        }
        decl.name = name.clone();
        self.slots.insert(name.clone(), Slot::Declared(decl));
        Ok(name)
    }

    /// First candidate that is free or holds a matching declaration
    fn free_name(
        &self,
        base: &str,
        matches: impl Fn(&TypeDeclaration) -> bool,
    ) -> Result<String, RegistryError> {
        for suffix in 0..=MAX_SUFFIX {
            let candidate = if suffix == 0 {
                base.to_string()
            } else {
                format!("{base}{suffix}")
            };
            match self.slots.get(&candidate) {
                None => return Ok(candidate),
                Some(Slot::Declared(existing)) if matches(existing) => return Ok(candidate),
                Some(_) => continue,
            }
        }
        Err(RegistryError::Exhausted(base.to_string()))
    }

    pub fn get(&self, name: &str) -> Option<&TypeDeclaration> {
        match self.slots.get(name) {
            Some(Slot::Declared(decl)) => Some(decl),
            _ => None,
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.slots.contains_key(name)
    }

    /// Number of declared types
    pub fn len(&self) -> usize {
        self.declarations().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Declared types in insertion order
    pub fn declarations(&self) -> impl Iterator<Item = &TypeDeclaration> {
        self.slots.values().filter_map(|slot| match slot {
            Slot::Declared(decl) => Some(decl),
            Slot::Reserved => None,
        })
    }
}
