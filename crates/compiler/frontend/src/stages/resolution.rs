use crate::{
    AccessorDescriptor, Configuration, DeclId, Diagnostic, MessageCollector, Symbols,
};

pub mod constants;
mod derive_accessor;
mod matcher;
mod overrides;
mod restriction;

pub use derive_accessor::derive_accessor;
pub use matcher::{is_trackable, trackable_ancestor};
pub use overrides::resolve_override;
pub use restriction::check_restriction;

/// Hook invoked by the host while it resolves the members of a class-like
/// declaration. The host may call it more than once for the same
/// declaration.
pub trait SyntheticResolveExtension {
    fn generate_synthetic_members(
        &self,
        symbols: &mut Symbols,
        id: DeclId,
        messages: &mut dyn MessageCollector,
    );
}

#[derive(Debug, Clone)]
pub struct MemberSynthesizer {
    config: Configuration,
}

impl MemberSynthesizer {
    pub fn new(config: Configuration) -> Self {
        Self { config }
    }

    #[inline]
    pub fn config(&self) -> &Configuration {
        &self.config
    }

    /// Registers the accessor of `id` if it is trackable and returns it.
    /// Repeated calls return the accessor registered by the first one, and
    /// a declaration that was refused is not reported again.
    pub fn synthesize<'s>(
        &self,
        symbols: &'s mut Symbols,
        id: DeclId,
        messages: &mut dyn MessageCollector,
    ) -> Option<&'s AccessorDescriptor> {
        if !self.config.enabled() {
            return None;
        }
        if symbols.accessor(id).is_some() {
            return symbols.accessor(id);
        }
        if symbols.is_rejected(id) {
            return None;
        }

        let annotation = self.config.trackable_annotation();
        let name = self.config.accessor_name();

        let descriptor = {
            let decl = symbols.get(id)?;

            let Some(origin) = trackable_ancestor(symbols, id, annotation) else {
                messages.trace(&format!("{} is not trackable", decl.name()));
                return None;
            };
            if let Err(diagnostic) = check_restriction(decl, annotation) {
                messages.trace(&format!("{} is a data or inline class", decl.name()));
                messages.diagnostic(&diagnostic);
                None
            } else if decl.member(name).is_some() {
                let diagnostic = Diagnostic::AccessorNameTaken(name.to_owned(), decl.span());
                messages.diagnostic(&diagnostic);
                None
            } else {
                let literal = resolve_override(decl, annotation, self.config.track_with())
                    .unwrap_or_else(|| decl.simple_name());
                messages.trace(&format!(
                    "{} is trackable through {}, {name}() returns \"{literal}\"",
                    decl.name(),
                    symbols[origin].name()
                ));
                Some(derive_accessor(id, decl, name, literal))
            }
        };
        let Some(descriptor) = descriptor else {
            symbols.reject(id);
            return None;
        };

        match symbols.register_accessor(descriptor) {
            Ok(descriptor) => Some(descriptor),
            Err(err) => {
                log::error!("could not register the accessor of {id}: {err}");
                None
            }
        }
    }
}

impl SyntheticResolveExtension for MemberSynthesizer {
    fn generate_synthetic_members(
        &self,
        symbols: &mut Symbols,
        id: DeclId,
        messages: &mut dyn MessageCollector,
    ) {
        self.synthesize(symbols, id, messages);
    }
}
