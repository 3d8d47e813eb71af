//! Persona provider port.
//!
//! The engine only needs to look personas up by name. Where they come from
//! (built-ins, a user file) is an infrastructure concern.

use std::collections::HashMap;

use colloquy_types::persona::{ConversationMode, Persona};

/// Resolves persona names to immutable persona snapshots.
pub trait PersonaProvider: Send + Sync {
    /// Look up a persona by name, case-insensitively.
    fn resolve(&self, name: &str) -> Option<Persona>;

    /// Whether `name` resolves to a persona.
    fn is_valid(&self, name: &str) -> bool {
        self.resolve(name).is_some()
    }

    /// Render the system prompt `persona` should receive for this conversation.
    fn render_system_prompt(
        &self,
        persona: &Persona,
        mode: ConversationMode,
        roster: &str,
    ) -> String {
        persona.render_system_prompt(mode, roster)
    }

    /// All known personas, in display order.
    fn list(&self) -> Vec<Persona>;
}

/// In-memory provider backed by a fixed list.
///
/// Later entries with the same canonical name replace earlier ones but keep
/// the earlier position.
#[derive(Debug, Clone, Default)]
pub struct StaticPersonaProvider {
    personas: Vec<Persona>,
    index: HashMap<String, usize>,
}

impl StaticPersonaProvider {
    pub fn new(personas: impl IntoIterator<Item = Persona>) -> Self {
        let mut provider = Self::default();
        for persona in personas {
            provider.insert(persona);
        }
        provider
    }

    /// Add a persona, replacing any existing one with the same name.
    pub fn insert(&mut self, persona: Persona) {
        let key = Persona::canonical_name(&persona.name);
        match self.index.get(&key) {
            Some(&pos) => self.personas[pos] = persona,
            None => {
                self.index.insert(key, self.personas.len());
                self.personas.push(persona);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.personas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.personas.is_empty()
    }
}

impl PersonaProvider for StaticPersonaProvider {
    fn resolve(&self, name: &str) -> Option<Persona> {
        self.index
            .get(&Persona::canonical_name(name))
            .map(|&pos| self.personas[pos].clone())
    }

    fn list(&self) -> Vec<Persona> {
        self.personas.clone()
    }
}
