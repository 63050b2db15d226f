mod resolution;

pub use resolution::{
    check_restriction, constants, derive_accessor, is_trackable, resolve_override,
    trackable_ancestor, MemberSynthesizer, SyntheticResolveExtension,
};
