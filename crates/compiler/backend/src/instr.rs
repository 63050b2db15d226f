use std::fmt;
use std::io::{Read, Write};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use crate::ClassFileError;

mod opcode {
    pub const LDC: u8 = 0x12;
    pub const LDC_W: u8 = 0x13;
    pub const ALOAD_0: u8 = 0x2a;
    pub const ARETURN: u8 = 0xb0;
    pub const RETURN: u8 = 0xb1;
    pub const INVOKESPECIAL: u8 = 0xb7;
}

/// The subset of JVM instructions needed for accessors and default
/// constructors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instr {
    AloadZero,
    Ldc(u8),
    LdcW(u16),
    InvokeSpecial(u16),
    Areturn,
    Return,
}

impl Instr {
    /// Picks the narrowest instruction that loads constant `index`.
    pub fn load_constant(index: u16) -> Self {
        match u8::try_from(index) {
            Ok(index) => Self::Ldc(index),
            Err(_) => Self::LdcW(index),
        }
    }

    pub fn opcode(&self) -> u8 {
        match self {
            Self::AloadZero => opcode::ALOAD_0,
            Self::Ldc(_) => opcode::LDC,
            Self::LdcW(_) => opcode::LDC_W,
            Self::InvokeSpecial(_) => opcode::INVOKESPECIAL,
            Self::Areturn => opcode::ARETURN,
            Self::Return => opcode::RETURN,
        }
    }

    /// Encoded size in bytes.
    pub fn size(&self) -> usize {
        match self {
            Self::AloadZero | Self::Areturn | Self::Return => 1,
            Self::Ldc(_) => 2,
            Self::LdcW(_) | Self::InvokeSpecial(_) => 3,
        }
    }

    /// The constant pool entry the instruction refers to, if any.
    pub fn constant(&self) -> Option<u16> {
        match self {
            Self::Ldc(index) => Some(u16::from(*index)),
            Self::LdcW(index) | Self::InvokeSpecial(index) => Some(*index),
            Self::AloadZero | Self::Areturn | Self::Return => None,
        }
    }

    pub fn write(&self, out: &mut impl Write) -> Result<(), ClassFileError> {
        out.write_u8(self.opcode())?;
        match self {
            Self::Ldc(index) => out.write_u8(*index)?,
            Self::LdcW(index) | Self::InvokeSpecial(index) => out.write_u16::<BigEndian>(*index)?,
            Self::AloadZero | Self::Areturn | Self::Return => {}
        }
        Ok(())
    }

    pub fn read(input: &mut impl Read) -> Result<Self, ClassFileError> {
        let instr = match input.read_u8()? {
            opcode::ALOAD_0 => Self::AloadZero,
            opcode::LDC => Self::Ldc(input.read_u8()?),
            opcode::LDC_W => Self::LdcW(input.read_u16::<BigEndian>()?),
            opcode::INVOKESPECIAL => Self::InvokeSpecial(input.read_u16::<BigEndian>()?),
            opcode::ARETURN => Self::Areturn,
            opcode::RETURN => Self::Return,
            other => return Err(ClassFileError::UnsupportedOpcode(other)),
        };
        Ok(instr)
    }
}

impl fmt::Display for Instr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AloadZero => f.write_str("aload_0"),
            Self::Ldc(index) => write!(f, "ldc #{index}"),
            Self::LdcW(index) => write!(f, "ldc_w #{index}"),
            Self::InvokeSpecial(index) => write!(f, "invokespecial #{index}"),
            Self::Areturn => f.write_str("areturn"),
            Self::Return => f.write_str("return"),
        }
    }
}
