mod access;
mod class_file;
mod constant_pool;
mod emit;
mod instr;

pub use access::AccessFlags;
pub use class_file::{ClassFile, ClassFileError, Code, MethodInfo, MAGIC, OBJECT};
pub use constant_pool::{Constant, ConstantPool};
pub use emit::{
    emit_accessor, CodegenExtension, EmitError, TrackableCodegenExtension, ACCESSOR_DESCRIPTOR,
};
pub use instr::Instr;

type IndexSet<A, S = hashbrown::DefaultHashBuilder> = indexmap::IndexSet<A, S>;
