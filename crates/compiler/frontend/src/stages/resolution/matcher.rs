use crate::{DeclId, FqName, Symbols};

/// Finds the closest declaration in the hierarchy of `id`, `id` included,
/// that carries `annotation` directly.
pub fn trackable_ancestor(symbols: &Symbols, id: DeclId, annotation: &FqName) -> Option<DeclId> {
    symbols
        .ancestors_with_self(id)
        .find(|(_, decl)| decl.has_annotation(annotation))
        .map(|(id, _)| id)
}

#[inline]
pub fn is_trackable(symbols: &Symbols, id: DeclId, annotation: &FqName) -> bool {
    trackable_ancestor(symbols, id, annotation).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Annotation, Declaration, DeclarationShape};

    const TRACKABLE: &str = "a.Trackable";

    fn add(symbols: &mut Symbols, decl: Declaration) -> DeclId {
        symbols.add_declaration(decl).unwrap()
    }

    #[test]
    fn direct_annotation_is_trackable() {
        let mut symbols = Symbols::default();
        let id = add(
            &mut symbols,
            Declaration::new("a.A", DeclarationShape::Class)
                .with_annotation(Annotation::new(TRACKABLE)),
        );

        assert_eq!(
            trackable_ancestor(&symbols, id, &TRACKABLE.into()),
            Some(id)
        );
    }

    #[test]
    fn unrelated_annotations_are_ignored() {
        let mut symbols = Symbols::default();
        let id = add(
            &mut symbols,
            Declaration::new("a.A", DeclarationShape::Class)
                .with_annotation(Annotation::new("a.Other")),
        );

        assert!(!is_trackable(&symbols, id, &TRACKABLE.into()));
    }

    #[test]
    fn annotation_propagates_through_mixed_hierarchy() {
        let mut symbols = Symbols::default();
        let root = add(
            &mut symbols,
            Declaration::new("a.Root", DeclarationShape::Interface)
                .with_annotation(Annotation::new(TRACKABLE)),
        );
        let middle = add(
            &mut symbols,
            Declaration::new("a.Middle", DeclarationShape::Interface).with_interface(root),
        );
        let base = add(
            &mut symbols,
            Declaration::new("a.Base", DeclarationShape::Class).with_interface(middle),
        );
        let leaf = add(
            &mut symbols,
            Declaration::new("a.Leaf", DeclarationShape::Class).with_superclass(base),
        );

        assert_eq!(
            trackable_ancestor(&symbols, leaf, &TRACKABLE.into()),
            Some(root)
        );
    }
}
