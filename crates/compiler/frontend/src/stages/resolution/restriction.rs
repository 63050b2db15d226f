use crate::{Declaration, DeclarationShape, Diagnostic, FqName};

pub fn check_restriction(decl: &Declaration, annotation: &FqName) -> Result<(), Diagnostic> {
    match decl.shape() {
        DeclarationShape::ValueAggregate | DeclarationShape::Wrapper => Err(
            Diagnostic::UnsupportedShape(annotation.simple_name().to_owned(), decl.span()),
        ),
        DeclarationShape::Class | DeclarationShape::Interface | DeclarationShape::Object => {
            Ok(())
        }
    }
}
