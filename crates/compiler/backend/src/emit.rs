use thiserror::Error;
use trackable_compiler_frontend::{
    AccessorDescriptor, Configuration, DeclId, DeclarationShape, FqName, Symbols,
};

use crate::{AccessFlags, ClassFile, ClassFileError, Code, Instr};

/// The JVM descriptor of every generated accessor.
pub const ACCESSOR_DESCRIPTOR: &str = "()Ljava/lang/String;";

/// Hook invoked by the host backend while it generates the body of a class.
pub trait CodegenExtension {
    fn generate_class_syntax(
        &self,
        symbols: &Symbols,
        id: DeclId,
        class: &mut ClassFile,
    ) -> Result<(), EmitError>;
}

#[derive(Debug, Clone)]
pub struct TrackableCodegenExtension {
    config: Configuration,
}

impl TrackableCodegenExtension {
    pub fn new(config: Configuration) -> Self {
        Self { config }
    }
}

impl CodegenExtension for TrackableCodegenExtension {
    fn generate_class_syntax(
        &self,
        symbols: &Symbols,
        id: DeclId,
        class: &mut ClassFile,
    ) -> Result<(), EmitError> {
        if !self.config.enabled() {
            return Ok(());
        }
        let decl = symbols.get(id).ok_or(EmitError::UnknownClass(id))?;
        let name = self.config.accessor_name();
        if !decl.member(name).is_some_and(|member| member.is_synthetic()) {
            return Ok(());
        }

        let descriptor = symbols
            .accessor(id)
            .filter(|descriptor| descriptor.name() == name)
            .ok_or_else(|| EmitError::MissingDescriptor {
                class: decl.name().clone(),
                member: name.to_owned(),
            })?;
        emit_accessor(class, decl.shape(), descriptor).map_err(|err| {
            log::error!("failed to emit {}.{name}(): {err}", decl.name());
            err
        })
    }
}

/// Writes the accessor described by `descriptor` into `class`. Classes and
/// objects get a body that returns the literal, interfaces only declare it.
pub fn emit_accessor(
    class: &mut ClassFile,
    shape: DeclarationShape,
    descriptor: &AccessorDescriptor,
) -> Result<(), EmitError> {
    let access = AccessFlags::from(descriptor.flags());
    let code = match shape {
        DeclarationShape::Interface => None,
        DeclarationShape::Class | DeclarationShape::Object => {
            let ldc = class.load_string(descriptor.literal())?;
            Some(Code::new(1, 1, [ldc, Instr::Areturn]))
        }
        DeclarationShape::ValueAggregate | DeclarationShape::Wrapper => {
            return Err(EmitError::UnexpectedShape(FqName::from(class.name())));
        }
    };

    log::debug!(
        "emitting {}.{}() returning \"{}\"",
        class.name(),
        descriptor.name(),
        descriptor.literal()
    );
    class.add_method(access, descriptor.name(), ACCESSOR_DESCRIPTOR, code)?;
    Ok(())
}

#[derive(Debug, Error)]
pub enum EmitError {
    #[error("{class} has a synthetic '{member}' member with no registered accessor")]
    MissingDescriptor { class: FqName, member: String },
    #[error("declaration {0} does not exist")]
    UnknownClass(DeclId),
    #[error("{0} cannot hold a generated accessor")]
    UnexpectedShape(FqName),
    #[error("invalid class file: {0}")]
    ClassFile(#[from] ClassFileError),
}

#[cfg(test)]
mod tests {
    use trackable_compiler_frontend::MemberFlags;

    use super::*;
    use crate::OBJECT;

    fn descriptor(flags: MemberFlags) -> AccessorDescriptor {
        let mut symbols = Symbols::default();
        let id = symbols
            .add_declaration(trackable_compiler_frontend::Declaration::new(
                "a.A",
                DeclarationShape::Class,
            ))
            .unwrap();
        AccessorDescriptor::new(id, "track", "Literal", flags)
    }

    #[test]
    fn class_accessor_returns_the_literal() {
        let mut class = ClassFile::new("a/A", OBJECT, AccessFlags::new()).unwrap();
        let flags = MemberFlags::new().with_is_public(true).with_is_final(true);
        emit_accessor(&mut class, DeclarationShape::Class, &descriptor(flags)).unwrap();

        let method = class.method("track", ACCESSOR_DESCRIPTOR).unwrap();
        let code = method.code().unwrap();
        assert_eq!(method.access().into_bits(), 0x0011);
        assert_eq!((code.max_stack(), code.max_locals()), (1, 1));

        let [Instr::Ldc(index), Instr::Areturn] = code.instrs() else {
            panic!("unexpected body: {:?}", code.instrs());
        };
        assert_eq!(class.constants().string_at(u16::from(*index)), Some("Literal"));
    }

    #[test]
    fn value_shapes_have_no_accessor_form() {
        let mut class = ClassFile::new("a/D", OBJECT, AccessFlags::new()).unwrap();
        let flags = MemberFlags::new().with_is_public(true);

        let err = emit_accessor(&mut class, DeclarationShape::Wrapper, &descriptor(flags))
            .unwrap_err();
        assert!(matches!(err, EmitError::UnexpectedShape(_)));
        assert!(class.methods().is_empty());
    }
}
