use crate::{AccessorDescriptor, DeclId, Declaration, DeclarationShape, MemberFlags};

pub fn derive_accessor(
    owner: DeclId,
    decl: &Declaration,
    name: &str,
    literal: &str,
) -> AccessorDescriptor {
    AccessorDescriptor::new(owner, name, literal, accessor_flags(decl))
}

// classes that can be subclassed keep the accessor overridable, every
// subclass gets its own
fn accessor_flags(decl: &Declaration) -> MemberFlags {
    let flags = MemberFlags::new()
        .with_is_public(true)
        .with_is_synthetic(true);
    match decl.shape() {
        DeclarationShape::Interface => flags.with_is_abstract(true),
        _ if decl.flags().is_open() || decl.flags().is_abstract() => flags,
        _ => flags.with_is_final(true),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DeclarationFlags, Symbols};

    fn derive(decl: Declaration) -> AccessorDescriptor {
        let mut symbols = Symbols::default();
        let id = symbols.add_declaration(decl).unwrap();
        derive_accessor(id, &symbols[id], "track", "Literal")
    }

    #[test]
    fn final_class_gets_final_accessor() {
        let descriptor = derive(Declaration::new("a.A", DeclarationShape::Class));
        let flags = descriptor.flags();

        assert_eq!(descriptor.literal(), "Literal");
        assert!(flags.is_public() && flags.is_final() && flags.is_synthetic());
        assert!(!flags.is_abstract());
    }

    #[test]
    fn open_class_and_interface_keep_it_overridable() {
        let open = derive(
            Declaration::new("a.Open", DeclarationShape::Class)
                .with_flags(DeclarationFlags::new().with_is_open(true)),
        );
        assert!(!open.flags().is_final());

        let interface = derive(Declaration::new("a.I", DeclarationShape::Interface));
        assert!(interface.flags().is_abstract());
        assert!(!interface.flags().is_final());
    }
}
