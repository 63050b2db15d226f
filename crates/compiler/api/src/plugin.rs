use std::fmt;
use std::path::Path;

use trackable_compiler_backend::{CodegenExtension, TrackableCodegenExtension};
use trackable_compiler_frontend::{Configuration, MemberSynthesizer, SyntheticResolveExtension};

use crate::load_configuration;

/// The extension lists of the host compiler. Extensions run in the order
/// they appear here.
#[derive(Default)]
pub struct ExtensionRegistry {
    resolve: Vec<Box<dyn SyntheticResolveExtension>>,
    codegen: Vec<Box<dyn CodegenExtension>>,
}

impl ExtensionRegistry {
    pub fn register_resolve(&mut self, extension: Box<dyn SyntheticResolveExtension>) {
        self.resolve.push(extension);
    }

    pub fn register_resolve_first(&mut self, extension: Box<dyn SyntheticResolveExtension>) {
        self.resolve.insert(0, extension);
    }

    pub fn register_codegen(&mut self, extension: Box<dyn CodegenExtension>) {
        self.codegen.push(extension);
    }

    pub fn register_codegen_first(&mut self, extension: Box<dyn CodegenExtension>) {
        self.codegen.insert(0, extension);
    }

    #[inline]
    pub fn resolve_extensions(&self) -> &[Box<dyn SyntheticResolveExtension>] {
        &self.resolve
    }

    #[inline]
    pub fn codegen_extensions(&self) -> &[Box<dyn CodegenExtension>] {
        &self.codegen
    }

    pub fn is_empty(&self) -> bool {
        self.resolve.is_empty() && self.codegen.is_empty()
    }
}

impl fmt::Debug for ExtensionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtensionRegistry")
            .field("resolve", &self.resolve.len())
            .field("codegen", &self.codegen.len())
            .finish()
    }
}

/// Registrar that wires the accessor synthesis into a host compiler.
#[derive(Debug, Clone, Default)]
pub struct TrackablePlugin {
    config: Configuration,
}

impl TrackablePlugin {
    pub fn new(config: Configuration) -> Self {
        Self { config }
    }

    /// Reads the options from the `.trackable.toml` file in `dir`.
    pub fn from_dir(dir: impl AsRef<Path>) -> anyhow::Result<Self> {
        load_configuration(dir).map(Self::new)
    }

    #[inline]
    pub fn config(&self) -> &Configuration {
        &self.config
    }

    /// Installs the resolution and codegen extensions ahead of any others.
    /// Nothing is installed when the plugin is disabled.
    pub fn register(&self, registry: &mut ExtensionRegistry) {
        if !self.config.enabled() {
            log::info!("Trackable is disabled, no extensions registered");
            return;
        }
        registry.register_resolve_first(Box::new(MemberSynthesizer::new(self.config.clone())));
        registry.register_codegen_first(Box::new(TrackableCodegenExtension::new(
            self.config.clone(),
        )));
    }
}

#[cfg(test)]
mod tests {
    use trackable_compiler_backend::{ClassFile, EmitError};
    use trackable_compiler_frontend::{DeclId, MessageCollector, Symbols};

    use super::*;

    struct Noop;

    impl SyntheticResolveExtension for Noop {
        fn generate_synthetic_members(
            &self,
            _symbols: &mut Symbols,
            _id: DeclId,
            _messages: &mut dyn MessageCollector,
        ) {
        }
    }

    impl CodegenExtension for Noop {
        fn generate_class_syntax(
            &self,
            _symbols: &Symbols,
            _id: DeclId,
            _class: &mut ClassFile,
        ) -> Result<(), EmitError> {
            Ok(())
        }
    }

    #[test]
    fn registers_ahead_of_existing_extensions() {
        let mut registry = ExtensionRegistry::default();
        registry.register_resolve(Box::new(Noop));
        registry.register_codegen(Box::new(Noop));

        TrackablePlugin::default().register(&mut registry);

        assert_eq!(registry.resolve_extensions().len(), 2);
        assert_eq!(registry.codegen_extensions().len(), 2);
        assert_eq!(
            format!("{registry:?}"),
            "ExtensionRegistry { resolve: 2, codegen: 2 }"
        );
    }

    #[test]
    fn disabled_plugin_registers_nothing() {
        let mut registry = ExtensionRegistry::default();
        TrackablePlugin::new(Configuration::builder().enabled(false).build())
            .register(&mut registry);

        assert!(registry.is_empty());
    }
}
