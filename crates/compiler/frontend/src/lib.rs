mod config;
mod diagnostic;
mod stages;
mod symbols;
mod utils;

pub use config::Configuration;
pub use diagnostic::{
    Diagnostic, LogCollector, Message, MessageCollector, Reporter, Severity, UnknownSource,
};
pub use stages::{
    check_restriction, constants, derive_accessor, is_trackable, resolve_override,
    trackable_ancestor, MemberSynthesizer, SyntheticResolveExtension,
};
pub use symbols::{
    predef, AccessorDescriptor, Ancestors, Annotation, ConstValue, DeclId, Declaration,
    DeclarationFlags, DeclarationShape, FqName, Member, MemberFlags, NameRedefinition,
    RegistrationError, Symbols,
};
pub use trackable_ast as ast;

type IndexMap<K, V, S = hashbrown::DefaultHashBuilder> = indexmap::IndexMap<K, V, S>;
