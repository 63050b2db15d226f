use crate::{Declaration, FqName};

/// Reads the override literal from the annotation placed on `decl` itself.
/// Annotations on ancestors are never consulted.
pub fn resolve_override<'a>(decl: &'a Declaration, annotation: &FqName, key: &str) -> Option<&'a str> {
    let value = decl.annotation(annotation)?.arg(key)?;
    let literal = value.as_str();
    if literal.is_none() {
        log::debug!(
            "ignoring non-string '{key}' argument on {}: {value:?}",
            decl.name()
        );
    }
    literal
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Annotation, DeclarationShape};

    const TRACKABLE: &str = "a.Trackable";

    #[test]
    fn reads_string_argument() {
        let decl = Declaration::new("a.A", DeclarationShape::Class)
            .with_annotation(Annotation::new(TRACKABLE).with_arg("trackWith", "Custom"));

        assert_eq!(
            resolve_override(&decl, &TRACKABLE.into(), "trackWith"),
            Some("Custom")
        );
    }

    #[test]
    fn ignores_other_keys_and_non_strings() {
        let decl = Declaration::new("a.A", DeclarationShape::Class).with_annotation(
            Annotation::new(TRACKABLE)
                .with_arg("name", "Custom")
                .with_arg("trackWith", 42i64),
        );

        assert_eq!(resolve_override(&decl, &TRACKABLE.into(), "trackWith"), None);
        assert_eq!(resolve_override(&decl, &TRACKABLE.into(), "other"), None);
    }

    #[test]
    fn ignores_arguments_of_other_annotations() {
        let decl = Declaration::new("a.A", DeclarationShape::Class)
            .with_annotation(Annotation::new("a.Other").with_arg("trackWith", "Custom"));

        assert_eq!(resolve_override(&decl, &TRACKABLE.into(), "trackWith"), None);
    }
}
