//! Replay modules available to delegated songs, by kind.

use std::collections::BTreeMap;

use sq_bridge::{EngineModule, ReplayModule, SongDecoder};

use crate::error::{ControllerError, Result};

type Factory = Box<dyn Fn() -> Box<dyn ReplayModule> + Send + Sync>;

/// Creates a fresh [`ReplayModule`] for a delegated song's `kind`.
#[derive(Default)]
pub struct ModuleRegistry {
    factories: BTreeMap<String, Factory>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory, replacing any previous one for `kind`.
    pub fn register<F>(&mut self, kind: &str, factory: F)
    where
        F: Fn() -> Box<dyn ReplayModule> + Send + Sync + 'static,
    {
        self.factories.insert(kind.to_owned(), Box::new(factory));
    }

    /// Play `kind` binaries with the built-in engine, decoded by `decoder`.
    pub fn register_engine_module<D>(&mut self, kind: &str, decoder: D)
    where
        D: SongDecoder + Clone + Sync + 'static,
    {
        self.register(kind, move || Box::new(EngineModule::new(decoder.clone())));
    }

    pub fn create(&self, kind: &str) -> Result<Box<dyn ReplayModule>> {
        self.factories
            .get(kind)
            .map(|factory| factory())
            .ok_or_else(|| ControllerError::UnknownModule(kind.to_owned()))
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.factories.contains_key(kind)
    }

    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use sq_bridge::ModuleError;
    use sq_ir::Song;

    use super::*;

    fn decode(_: &[u8]) -> std::result::Result<Song, ModuleError> {
        Err(ModuleError::Load("unsupported".into()))
    }

    #[test]
    fn unknown_kind_is_an_error() {
        let mut registry = ModuleRegistry::new();
        registry.register_engine_module("mod", decode);
        assert!(registry.contains("mod"));
        assert!(registry.create("mod").is_ok());
        assert!(matches!(
            registry.create("ahx"),
            Err(ControllerError::UnknownModule(kind)) if kind == "ahx"
        ));
        assert_eq!(registry.kinds().collect::<Vec<_>>(), vec!["mod"]);
    }
}
