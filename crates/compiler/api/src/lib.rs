use std::fmt;
use std::fs;
use std::io;
use std::path::Path;

use bon::bon;
pub use trackable_ast as ast;
use trackable_ast::SourceMap;
pub use trackable_compiler_backend::{
    emit_accessor, AccessFlags, ClassFile, ClassFileError, Code, CodegenExtension, Constant,
    ConstantPool, EmitError, Instr, MethodInfo, TrackableCodegenExtension, ACCESSOR_DESCRIPTOR,
};
use trackable_compiler_backend::OBJECT;
pub use trackable_compiler_frontend::{
    constants, AccessorDescriptor, Annotation, ConstValue, Configuration, DeclId, Declaration,
    DeclarationFlags, DeclarationShape, Diagnostic, FqName, LogCollector, Member, MemberFlags,
    MemberSynthesizer, Message, MessageCollector, Reporter, Severity, Symbols,
    SyntheticResolveExtension, UnknownSource,
};
use thiserror::Error;

mod config;
mod plugin;

pub use config::{load_configuration, parse_configuration, CONFIG_FILE_NAME};
pub use plugin::{ExtensionRegistry, TrackablePlugin};

type IndexMap<K, V, S = hashbrown::DefaultHashBuilder> = indexmap::IndexMap<K, V, S>;

const CONSTRUCTOR: &str = "<init>";
const CONSTRUCTOR_DESCRIPTOR: &str = "()V";

/// A single compiler invocation over declarations that were already parsed
/// and type checked by the host.
pub struct Compilation<'ctx> {
    symbols: Symbols,
    registry: &'ctx ExtensionRegistry,
    diagnostics: Diagnostics,
}

#[bon]
impl<'ctx> Compilation<'ctx> {
    /// Runs every resolve extension over the user defined declarations.
    /// Hosts that resolve incrementally visit declarations more than once,
    /// `resolution_passes` reproduces that.
    #[builder(finish_fn = compile)]
    pub fn new(
        symbols: Symbols,
        registry: &'ctx ExtensionRegistry,
        #[builder(default = 1)] resolution_passes: usize,
    ) -> Self {
        let mut symbols = symbols;
        let mut reporter = Reporter::<Message>::default();
        let user_defined = symbols
            .user_defined()
            .map(|(id, _)| id)
            .collect::<Vec<_>>();

        for _ in 0..resolution_passes {
            for &id in &user_defined {
                for extension in registry.resolve_extensions() {
                    extension.generate_synthetic_members(&mut symbols, id, &mut reporter);
                }
            }
        }

        Self {
            symbols,
            registry,
            diagnostics: Diagnostics(reporter.into_reported()),
        }
    }

    /// Generates a class file for every user defined declaration. Nothing
    /// is generated when a fatal diagnostic was reported.
    pub fn flush(self) -> Result<(ClassOutput, Diagnostics), FlushError> {
        if self.diagnostics.has_fatal_errors() {
            return Err(FlushError::CompilationErrors(self.diagnostics));
        }

        let mut output = ClassOutput::default();
        for (id, decl) in self.symbols.user_defined() {
            let class = self
                .generate_class(id)
                .map_err(|err| FlushError::Emit(decl.name().clone(), err))?;
            output.insert(class.name().to_owned(), class.to_bytes()?);
        }
        Ok((output, self.diagnostics))
    }

    fn generate_class(&self, id: DeclId) -> Result<ClassFile, EmitError> {
        let decl = self.symbols.get(id).ok_or(EmitError::UnknownClass(id))?;
        let internal_name = |id: DeclId| {
            self.symbols
                .get(id)
                .map(|decl| decl.name().internal_name())
                .ok_or(EmitError::UnknownClass(id))
        };

        let super_name = match decl.superclass() {
            Some(superclass) => internal_name(superclass)?,
            None => OBJECT.to_owned(),
        };
        let public = AccessFlags::new().with_is_public(true);
        let access = match decl.shape() {
            DeclarationShape::Interface => public.with_is_interface(true).with_is_abstract(true),
            _ if decl.flags().is_abstract() => public.with_is_super(true).with_is_abstract(true),
            _ if decl.flags().is_open() => public.with_is_super(true),
            _ => public.with_is_super(true).with_is_final(true),
        };

        let mut class = ClassFile::new(&decl.name().internal_name(), &super_name, access)?;
        for &interface in decl.interfaces() {
            class.add_interface(&internal_name(interface)?)?;
        }

        if !decl.shape().is_interface() {
            let init = class
                .constants_mut()
                .method_ref(&super_name, CONSTRUCTOR, CONSTRUCTOR_DESCRIPTOR)?;
            let body = Code::new(
                1,
                1,
                [Instr::AloadZero, Instr::InvokeSpecial(init), Instr::Return],
            );
            class.add_method(public, CONSTRUCTOR, CONSTRUCTOR_DESCRIPTOR, Some(body))?;
        }

        for extension in self.registry.codegen_extensions() {
            extension.generate_class_syntax(&self.symbols, id, &mut class)?;
        }
        Ok(class)
    }

    #[inline]
    pub fn symbols(&self) -> &Symbols {
        &self.symbols
    }

    #[inline]
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }
}

/// Class files produced by a compilation, keyed by internal name.
#[derive(Debug, Default)]
pub struct ClassOutput {
    classes: IndexMap<String, Vec<u8>>,
}

impl ClassOutput {
    pub fn get(&self, internal_name: &str) -> Option<&[u8]> {
        self.classes.get(internal_name).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = (&str, &[u8])> {
        self.classes
            .iter()
            .map(|(name, bytes)| (name.as_str(), bytes.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Writes every class to `<dir>/<internal name>.class`.
    pub fn save(&self, dir: impl AsRef<Path>) -> io::Result<()> {
        for (name, bytes) in &self.classes {
            let path = dir.as_ref().join(format!("{name}.class"));
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&path, bytes)?;
            log::debug!("wrote {}", path.display());
        }
        Ok(())
    }

    fn insert(&mut self, name: String, bytes: Vec<u8>) {
        self.classes.insert(name, bytes);
    }
}

#[derive(Debug)]
pub struct Diagnostics(Vec<Message>);

impl Diagnostics {
    pub fn has_fatal_errors(&self) -> bool {
        self.0.iter().any(Message::is_fatal)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn dump(&self, sources: &SourceMap) -> Result<(), UnknownSource> {
        let mut warnings = 0;
        let mut errors = 0;

        for message in self {
            log::log!(message.severity().level(), "{}", message.display(sources)?);
            match message.severity() {
                Severity::Error => errors += 1,
                Severity::Warning => warnings += 1,
                Severity::Logging | Severity::Info => {}
            }
        }
        log::info!("Completed with {warnings} warnings and {errors} errors");
        Ok(())
    }
}

impl IntoIterator for Diagnostics {
    type IntoIter = std::vec::IntoIter<Message>;
    type Item = Message;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type IntoIter = std::slice::Iter<'a, Message>;
    type Item = &'a Message;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl From<Vec<Message>> for Diagnostics {
    fn from(messages: Vec<Message>) -> Self {
        Self(messages)
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.into_iter().try_for_each(|m| writeln!(f, "{m}"))
    }
}

#[derive(Debug, Error)]
pub enum FlushError {
    #[error("fatal diagnostics found")]
    CompilationErrors(Diagnostics),
    #[error("code generation failed for {0}: {1}")]
    Emit(FqName, #[source] EmitError),
    #[error("class file error: {0}")]
    ClassFile(#[from] ClassFileError),
}
