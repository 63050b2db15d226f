use std::fmt;
use std::io::{self, Cursor, Read, Write};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use thiserror::Error;

use crate::{AccessFlags, Constant, ConstantPool, Instr};

pub const MAGIC: u32 = 0xCAFE_BABE;
pub const OBJECT: &str = "java/lang/Object";

// Java 8, the oldest target that does not need stack map frames for
// straight line code.
const MAJOR_VERSION: u16 = 52;
const CODE_ATTRIBUTE: &str = "Code";

/// An in-memory JVM class file. Fields and class level attributes are not
/// modelled, nothing this backend emits needs them.
#[derive(Debug, Clone)]
pub struct ClassFile {
    minor_version: u16,
    major_version: u16,
    pool: ConstantPool,
    access: AccessFlags,
    this_class: u16,
    super_class: u16,
    interfaces: Vec<u16>,
    methods: Vec<MethodInfo>,
    code_attribute: Option<u16>,
}

impl ClassFile {
    pub fn new(
        name: &str,
        super_name: &str,
        access: AccessFlags,
    ) -> Result<Self, ClassFileError> {
        let mut pool = ConstantPool::new();
        let this_class = pool.class(name)?;
        let super_class = pool.class(super_name)?;
        Ok(Self {
            minor_version: 0,
            major_version: MAJOR_VERSION,
            pool,
            access,
            this_class,
            super_class,
            interfaces: Vec::new(),
            methods: Vec::new(),
            code_attribute: None,
        })
    }

    pub fn name(&self) -> &str {
        self.pool
            .class_name_at(self.this_class)
            .unwrap_or_default()
    }

    pub fn super_name(&self) -> Option<&str> {
        self.pool.class_name_at(self.super_class)
    }

    #[inline]
    pub fn access(&self) -> AccessFlags {
        self.access
    }

    #[inline]
    pub fn major_version(&self) -> u16 {
        self.major_version
    }

    #[inline]
    pub fn constants(&self) -> &ConstantPool {
        &self.pool
    }

    #[inline]
    pub fn constants_mut(&mut self) -> &mut ConstantPool {
        &mut self.pool
    }

    pub fn add_interface(&mut self, internal_name: &str) -> Result<(), ClassFileError> {
        let index = self.pool.class(internal_name)?;
        if !self.interfaces.contains(&index) {
            self.interfaces.push(index);
        }
        Ok(())
    }

    pub fn interfaces(&self) -> impl Iterator<Item = &str> {
        self.interfaces
            .iter()
            .filter_map(|&index| self.pool.class_name_at(index))
    }

    /// Loads the string constant `str` onto the operand stack.
    pub fn load_string(&mut self, str: &str) -> Result<Instr, ClassFileError> {
        Ok(Instr::load_constant(self.pool.string(str)?))
    }

    /// Adds a method. Abstract and native methods are passed without code.
    pub fn add_method(
        &mut self,
        access: AccessFlags,
        name: &str,
        descriptor: &str,
        code: Option<Code>,
    ) -> Result<(), ClassFileError> {
        if self.method(name, descriptor).is_some() {
            return Err(ClassFileError::DuplicateMethod(
                name.to_owned(),
                descriptor.to_owned(),
            ));
        }
        if let Some(code) = &code {
            code.check_len()?;
            self.code_attribute = Some(self.pool.utf8(CODE_ATTRIBUTE)?);
        }
        let name_index = self.pool.utf8(name)?;
        let descriptor_index = self.pool.utf8(descriptor)?;
        self.methods.push(MethodInfo {
            access,
            name: name.to_owned(),
            descriptor: descriptor.to_owned(),
            name_index,
            descriptor_index,
            code,
        });
        Ok(())
    }

    pub fn method(&self, name: &str, descriptor: &str) -> Option<&MethodInfo> {
        self.methods
            .iter()
            .find(|method| method.name == name && method.descriptor == descriptor)
    }

    #[inline]
    pub fn methods(&self) -> &[MethodInfo] {
        &self.methods
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, ClassFileError> {
        let mut bytes = Vec::new();
        self.write(&mut bytes)?;
        Ok(bytes)
    }

    pub fn write(&self, out: &mut impl Write) -> Result<(), ClassFileError> {
        out.write_u32::<BigEndian>(MAGIC)?;
        out.write_u16::<BigEndian>(self.minor_version)?;
        out.write_u16::<BigEndian>(self.major_version)?;
        self.pool.write(out)?;
        out.write_u16::<BigEndian>(self.access.into_bits())?;
        out.write_u16::<BigEndian>(self.this_class)?;
        out.write_u16::<BigEndian>(self.super_class)?;

        write_len(out, self.interfaces.len())?;
        for &interface in &self.interfaces {
            out.write_u16::<BigEndian>(interface)?;
        }

        // fields
        out.write_u16::<BigEndian>(0)?;

        write_len(out, self.methods.len())?;
        for method in &self.methods {
            self.write_method(method, out)?;
        }

        // attributes
        out.write_u16::<BigEndian>(0)?;
        Ok(())
    }

    fn write_method(&self, method: &MethodInfo, out: &mut impl Write) -> Result<(), ClassFileError> {
        out.write_u16::<BigEndian>(method.access.into_bits())?;
        out.write_u16::<BigEndian>(method.name_index)?;
        out.write_u16::<BigEndian>(method.descriptor_index)?;

        let Some(code) = &method.code else {
            out.write_u16::<BigEndian>(0)?;
            return Ok(());
        };
        let code_attribute = self.code_attribute.ok_or(ClassFileError::BadConstantRef(0))?;

        let code_len = code.check_len()?;
        out.write_u16::<BigEndian>(1)?;
        out.write_u16::<BigEndian>(code_attribute)?;
        // max_stack, max_locals, code_length, exception and attribute counts
        out.write_u32::<BigEndian>(2 + 2 + 4 + code_len + 2 + 2)?;
        out.write_u16::<BigEndian>(code.max_stack)?;
        out.write_u16::<BigEndian>(code.max_locals)?;
        out.write_u32::<BigEndian>(code_len)?;
        for instr in &code.instrs {
            instr.write(out)?;
        }
        out.write_u16::<BigEndian>(0)?;
        out.write_u16::<BigEndian>(0)?;
        Ok(())
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ClassFileError> {
        Self::read(&mut Cursor::new(bytes))
    }

    /// Reads back the subset of the format produced by [`ClassFile::write`].
    /// Fields and unknown attributes are skipped.
    pub fn read(input: &mut impl Read) -> Result<Self, ClassFileError> {
        let magic = input.read_u32::<BigEndian>()?;
        if magic != MAGIC {
            return Err(ClassFileError::BadMagic(magic));
        }
        let minor_version = input.read_u16::<BigEndian>()?;
        let major_version = input.read_u16::<BigEndian>()?;
        let pool = ConstantPool::read(input)?;
        let access = AccessFlags::from_bits(input.read_u16::<BigEndian>()?);
        let this_class = class_ref(&pool, input.read_u16::<BigEndian>()?)?;
        let super_class = class_ref(&pool, input.read_u16::<BigEndian>()?)?;

        let interface_count = input.read_u16::<BigEndian>()?;
        let interfaces = (0..interface_count)
            .map(|_| class_ref(&pool, input.read_u16::<BigEndian>()?))
            .collect::<Result<Vec<_>, _>>()?;

        let field_count = input.read_u16::<BigEndian>()?;
        for _ in 0..field_count {
            // access, name, descriptor
            skip(input, 6)?;
            skip_attributes(input)?;
        }

        let method_count = input.read_u16::<BigEndian>()?;
        let methods = (0..method_count)
            .map(|_| read_method(&pool, input))
            .collect::<Result<Vec<_>, _>>()?;

        skip_attributes(input)?;

        let code_attribute = pool.iter().find_map(|(index, constant)| {
            matches!(constant, Constant::Utf8(name) if name == CODE_ATTRIBUTE).then_some(index)
        });
        Ok(Self {
            minor_version,
            major_version,
            pool,
            access,
            this_class,
            super_class,
            interfaces,
            methods,
            code_attribute,
        })
    }
}

impl fmt::Display for ClassFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.access.is_interface() {
            "interface"
        } else {
            "class"
        };
        for modifier in modifiers(self.access) {
            if !(self.access.is_interface() && modifier == "abstract") {
                write!(f, "{modifier} ")?;
            }
        }
        write!(f, "{kind} {}", self.name())?;
        if let Some(super_name) = self.super_name() {
            write!(f, " extends {super_name}")?;
        }
        let mut interfaces = self.interfaces().peekable();
        if interfaces.peek().is_some() {
            write!(f, " implements {}", interfaces.collect::<Vec<_>>().join(", "))?;
        }

        for method in &self.methods {
            write!(f, "\n ")?;
            for modifier in modifiers(method.access) {
                write!(f, " {modifier}")?;
            }
            write!(f, " {}{}", method.name, method.descriptor)?;

            let Some(code) = &method.code else {
                continue;
            };
            write!(
                f,
                "\n    stack={}, locals={}",
                code.max_stack, code.max_locals
            )?;
            for instr in &code.instrs {
                write!(f, "\n    {instr}")?;
                match instr {
                    Instr::Ldc(_) | Instr::LdcW(_) => {
                        if let Some(str) = instr.constant().and_then(|i| self.pool.string_at(i)) {
                            write!(f, " // String {str}")?;
                        }
                    }
                    Instr::InvokeSpecial(index) => {
                        if let Some((class, name, desc)) = self.pool.method_ref_at(*index) {
                            write!(f, " // Method {class}.{name}:{desc}")?;
                        }
                    }
                    Instr::AloadZero | Instr::Areturn | Instr::Return => {}
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodInfo {
    access: AccessFlags,
    name: String,
    descriptor: String,
    name_index: u16,
    descriptor_index: u16,
    code: Option<Code>,
}

impl MethodInfo {
    #[inline]
    pub fn access(&self) -> AccessFlags {
        self.access
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn descriptor(&self) -> &str {
        &self.descriptor
    }

    #[inline]
    pub fn code(&self) -> Option<&Code> {
        self.code.as_ref()
    }
}

/// The body of a concrete method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Code {
    max_stack: u16,
    max_locals: u16,
    instrs: Vec<Instr>,
}

impl Code {
    pub fn new(max_stack: u16, max_locals: u16, instrs: impl IntoIterator<Item = Instr>) -> Self {
        Self {
            max_stack,
            max_locals,
            instrs: instrs.into_iter().collect(),
        }
    }

    #[inline]
    pub fn max_stack(&self) -> u16 {
        self.max_stack
    }

    #[inline]
    pub fn max_locals(&self) -> u16 {
        self.max_locals
    }

    #[inline]
    pub fn instrs(&self) -> &[Instr] {
        &self.instrs
    }

    fn check_len(&self) -> Result<u32, ClassFileError> {
        let len = self.instrs.iter().map(Instr::size).sum::<usize>();
        if len == 0 || len > usize::from(u16::MAX) {
            return Err(ClassFileError::InvalidCodeLength(len));
        }
        // bounded above
        Ok(len as u32)
    }
}

fn read_method(pool: &ConstantPool, input: &mut impl Read) -> Result<MethodInfo, ClassFileError> {
    let access = AccessFlags::from_bits(input.read_u16::<BigEndian>()?);
    let name_index = input.read_u16::<BigEndian>()?;
    let descriptor_index = input.read_u16::<BigEndian>()?;
    let name = utf8_ref(pool, name_index)?;
    let descriptor = utf8_ref(pool, descriptor_index)?;

    let mut code = None;
    let attribute_count = input.read_u16::<BigEndian>()?;
    for _ in 0..attribute_count {
        let attribute_name = utf8_ref(pool, input.read_u16::<BigEndian>()?)?;
        let len = input.read_u32::<BigEndian>()?;
        if attribute_name == CODE_ATTRIBUTE {
            code = Some(read_code(input)?);
        } else {
            skip(input, u64::from(len))?;
        }
    }

    Ok(MethodInfo {
        access,
        name: name.to_owned(),
        descriptor: descriptor.to_owned(),
        name_index,
        descriptor_index,
        code,
    })
}

fn read_code(input: &mut impl Read) -> Result<Code, ClassFileError> {
    let max_stack = input.read_u16::<BigEndian>()?;
    let max_locals = input.read_u16::<BigEndian>()?;
    let code_len = input.read_u32::<BigEndian>()?;
    if code_len == 0 || code_len > u32::from(u16::MAX) {
        return Err(ClassFileError::InvalidCodeLength(code_len as usize));
    }
    let mut bytes = vec![0; code_len as usize];
    input.read_exact(&mut bytes)?;

    let mut cursor = Cursor::new(bytes.as_slice());
    let mut instrs = Vec::new();
    while cursor.position() < u64::from(code_len) {
        instrs.push(Instr::read(&mut cursor)?);
    }

    // exception table entries are 8 bytes each
    let exception_count = input.read_u16::<BigEndian>()?;
    skip(input, u64::from(exception_count) * 8)?;
    skip_attributes(input)?;

    Ok(Code {
        max_stack,
        max_locals,
        instrs,
    })
}

fn skip_attributes(input: &mut impl Read) -> Result<(), ClassFileError> {
    let count = input.read_u16::<BigEndian>()?;
    for _ in 0..count {
        let _name = input.read_u16::<BigEndian>()?;
        let len = input.read_u32::<BigEndian>()?;
        skip(input, u64::from(len))?;
    }
    Ok(())
}

fn skip(input: &mut impl Read, len: u64) -> Result<(), ClassFileError> {
    let skipped = io::copy(&mut input.take(len), &mut io::sink())?;
    if skipped != len {
        return Err(ClassFileError::Truncated);
    }
    Ok(())
}

fn class_ref(pool: &ConstantPool, index: u16) -> Result<u16, ClassFileError> {
    pool.class_name_at(index)
        .map(|_| index)
        .ok_or(ClassFileError::BadConstantRef(index))
}

fn utf8_ref(pool: &ConstantPool, index: u16) -> Result<&str, ClassFileError> {
    pool.utf8_at(index)
        .ok_or(ClassFileError::BadConstantRef(index))
}

fn write_len(out: &mut impl Write, len: usize) -> Result<(), ClassFileError> {
    let len = u16::try_from(len).map_err(|_| ClassFileError::TooManyEntries(len))?;
    out.write_u16::<BigEndian>(len)?;
    Ok(())
}

fn modifiers(access: AccessFlags) -> impl Iterator<Item = &'static str> {
    [
        (access.is_public(), "public"),
        (access.is_private(), "private"),
        (access.is_protected(), "protected"),
        (access.is_static(), "static"),
        (access.is_final(), "final"),
        (access.is_abstract(), "abstract"),
        (access.is_synthetic(), "synthetic"),
    ]
    .into_iter()
    .filter_map(|(set, name)| set.then_some(name))
}

#[derive(Debug, Error)]
pub enum ClassFileError {
    #[error("unexpected end of class file")]
    Truncated,
    #[error("not a class file, found magic {0:#010x}")]
    BadMagic(u32),
    #[error("unsupported constant pool tag {0}")]
    UnsupportedConstant(u8),
    #[error("constant pool contains duplicate entries")]
    DuplicateConstant,
    #[error("invalid constant pool reference #{0}")]
    BadConstantRef(u16),
    #[error("invalid modified UTF-8 in the constant pool")]
    InvalidUtf8,
    #[error("string of {0} bytes does not fit in the constant pool")]
    StringTooLong(usize),
    #[error("too many constant pool entries")]
    PoolOverflow,
    #[error("{0} entries do not fit in a class file table")]
    TooManyEntries(usize),
    #[error("unsupported opcode {0:#04x}")]
    UnsupportedOpcode(u8),
    #[error("invalid code length: {0} bytes")]
    InvalidCodeLength(usize),
    #[error("method {0}{1} is already defined")]
    DuplicateMethod(String, String),
    #[error("I/O error: {0}")]
    Io(io::Error),
}

impl From<io::Error> for ClassFileError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::UnexpectedEof => Self::Truncated,
            _ => Self::Io(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn accessor_class() -> ClassFile {
        let mut class = ClassFile::new(
            "a/A",
            OBJECT,
            AccessFlags::new().with_is_public(true).with_is_super(true),
        )
        .unwrap();
        let ldc = class.load_string("A").unwrap();
        class
            .add_method(
                AccessFlags::new().with_is_public(true).with_is_final(true),
                "track",
                "()Ljava/lang/String;",
                Some(Code::new(1, 1, [ldc, Instr::Areturn])),
            )
            .unwrap();
        class
    }

    #[test]
    fn header_is_written_big_endian() {
        let bytes = accessor_class().to_bytes().unwrap();

        assert_eq!(bytes[..4], [0xCAu8, 0xFE, 0xBA, 0xBE]);
        assert_eq!(bytes[4..8], [0x00u8, 0x00, 0x00, 52]);
    }

    #[test]
    fn written_class_reads_back() {
        let class = accessor_class();
        let read = ClassFile::from_bytes(&class.to_bytes().unwrap()).unwrap();

        assert_eq!(read.name(), "a/A");
        assert_eq!(read.super_name(), Some(OBJECT));
        assert_eq!(read.access(), class.access());
        assert_eq!(read.methods(), class.methods());
        assert_eq!(read.to_string(), class.to_string());
    }

    #[test]
    fn duplicate_methods_are_rejected() {
        let mut class = accessor_class();
        let err = class
            .add_method(
                AccessFlags::new().with_is_public(true),
                "track",
                "()Ljava/lang/String;",
                None,
            )
            .unwrap_err();

        assert!(matches!(err, ClassFileError::DuplicateMethod(..)));
    }

    #[test]
    fn truncated_input_is_reported() {
        let bytes = accessor_class().to_bytes().unwrap();
        let err = ClassFile::from_bytes(&bytes[..bytes.len() - 3]).unwrap_err();
        assert!(matches!(err, ClassFileError::Truncated));

        let err = ClassFile::from_bytes(&[0xDE, 0xAD, 0xBE, 0xEF]).unwrap_err();
        assert!(matches!(err, ClassFileError::BadMagic(0xDEAD_BEEF)));
    }

    #[test]
    fn empty_code_is_rejected() {
        let mut class = accessor_class();
        let err = class
            .add_method(AccessFlags::new(), "empty", "()V", Some(Code::new(0, 0, [])))
            .unwrap_err();
        assert!(matches!(err, ClassFileError::InvalidCodeLength(0)));
    }
}
