use std::io::{Read, Write};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use crate::{ClassFileError, IndexSet};

mod tag {
    pub const UTF8: u8 = 1;
    pub const CLASS: u8 = 7;
    pub const STRING: u8 = 8;
    pub const METHOD_REF: u8 = 10;
    pub const NAME_AND_TYPE: u8 = 12;
}

/// The constant kinds this backend emits.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Constant {
    Utf8(String),
    Class(u16),
    String(u16),
    MethodRef { class: u16, name_and_type: u16 },
    NameAndType { name: u16, descriptor: u16 },
}

impl Constant {
    fn tag(&self) -> u8 {
        match self {
            Self::Utf8(_) => tag::UTF8,
            Self::Class(_) => tag::CLASS,
            Self::String(_) => tag::STRING,
            Self::MethodRef { .. } => tag::METHOD_REF,
            Self::NameAndType { .. } => tag::NAME_AND_TYPE,
        }
    }

    fn write(&self, out: &mut impl Write) -> Result<(), ClassFileError> {
        out.write_u8(self.tag())?;
        match self {
            Self::Utf8(str) => {
                let bytes = mutf8::encode(str);
                let len = u16::try_from(bytes.len())
                    .map_err(|_| ClassFileError::StringTooLong(bytes.len()))?;
                out.write_u16::<BigEndian>(len)?;
                out.write_all(&bytes)?;
            }
            Self::Class(index) | Self::String(index) => out.write_u16::<BigEndian>(*index)?,
            Self::MethodRef {
                class,
                name_and_type,
            } => {
                out.write_u16::<BigEndian>(*class)?;
                out.write_u16::<BigEndian>(*name_and_type)?;
            }
            Self::NameAndType { name, descriptor } => {
                out.write_u16::<BigEndian>(*name)?;
                out.write_u16::<BigEndian>(*descriptor)?;
            }
        }
        Ok(())
    }

    fn read(input: &mut impl Read) -> Result<Self, ClassFileError> {
        let constant = match input.read_u8()? {
            tag::UTF8 => {
                let len = input.read_u16::<BigEndian>()?;
                let mut bytes = vec![0; len as usize];
                input.read_exact(&mut bytes)?;
                Self::Utf8(mutf8::decode(&bytes).ok_or(ClassFileError::InvalidUtf8)?)
            }
            tag::CLASS => Self::Class(input.read_u16::<BigEndian>()?),
            tag::STRING => Self::String(input.read_u16::<BigEndian>()?),
            tag::METHOD_REF => Self::MethodRef {
                class: input.read_u16::<BigEndian>()?,
                name_and_type: input.read_u16::<BigEndian>()?,
            },
            tag::NAME_AND_TYPE => Self::NameAndType {
                name: input.read_u16::<BigEndian>()?,
                descriptor: input.read_u16::<BigEndian>()?,
            },
            other => return Err(ClassFileError::UnsupportedConstant(other)),
        };
        Ok(constant)
    }
}

/// A deduplicating constant pool. Indices are 1-based as in the class file.
#[derive(Debug, Default, Clone)]
pub struct ConstantPool {
    entries: IndexSet<Constant>,
}

impl ConstantPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, constant: Constant) -> Result<u16, ClassFileError> {
        if let Some(idx) = self.entries.get_index_of(&constant) {
            return Ok(Self::to_index(idx));
        }
        // the pool count is written as len + 1 and must fit in u16
        if self.entries.len() + 1 >= usize::from(u16::MAX) {
            return Err(ClassFileError::PoolOverflow);
        }
        let (idx, _) = self.entries.insert_full(constant);
        Ok(Self::to_index(idx))
    }

    pub fn utf8(&mut self, str: &str) -> Result<u16, ClassFileError> {
        self.add(Constant::Utf8(str.to_owned()))
    }

    pub fn class(&mut self, internal_name: &str) -> Result<u16, ClassFileError> {
        let name = self.utf8(internal_name)?;
        self.add(Constant::Class(name))
    }

    pub fn string(&mut self, str: &str) -> Result<u16, ClassFileError> {
        let utf8 = self.utf8(str)?;
        self.add(Constant::String(utf8))
    }

    pub fn name_and_type(&mut self, name: &str, descriptor: &str) -> Result<u16, ClassFileError> {
        let name = self.utf8(name)?;
        let descriptor = self.utf8(descriptor)?;
        self.add(Constant::NameAndType { name, descriptor })
    }

    pub fn method_ref(
        &mut self,
        class: &str,
        name: &str,
        descriptor: &str,
    ) -> Result<u16, ClassFileError> {
        let class = self.class(class)?;
        let name_and_type = self.name_and_type(name, descriptor)?;
        self.add(Constant::MethodRef {
            class,
            name_and_type,
        })
    }

    #[inline]
    pub fn get(&self, index: u16) -> Option<&Constant> {
        self.entries.get_index(usize::from(index).checked_sub(1)?)
    }

    pub fn utf8_at(&self, index: u16) -> Option<&str> {
        match self.get(index)? {
            Constant::Utf8(str) => Some(str.as_str()),
            _ => None,
        }
    }

    /// Resolves a `Class` entry to its internal name.
    pub fn class_name_at(&self, index: u16) -> Option<&str> {
        match self.get(index)? {
            Constant::Class(name) => self.utf8_at(*name),
            _ => None,
        }
    }

    /// Resolves a `String` entry to its contents.
    pub fn string_at(&self, index: u16) -> Option<&str> {
        match self.get(index)? {
            Constant::String(utf8) => self.utf8_at(*utf8),
            _ => None,
        }
    }

    /// Resolves a `MethodRef` entry to its class, name and descriptor.
    pub fn method_ref_at(&self, index: u16) -> Option<(&str, &str, &str)> {
        let Constant::MethodRef {
            class,
            name_and_type,
        } = self.get(index)?
        else {
            return None;
        };
        let Constant::NameAndType { name, descriptor } = self.get(*name_and_type)? else {
            return None;
        };
        Some((
            self.class_name_at(*class)?,
            self.utf8_at(*name)?,
            self.utf8_at(*descriptor)?,
        ))
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = (u16, &Constant)> {
        self.entries
            .iter()
            .enumerate()
            .map(|(i, constant)| (Self::to_index(i), constant))
    }

    pub(crate) fn write(&self, out: &mut impl Write) -> Result<(), ClassFileError> {
        out.write_u16::<BigEndian>(Self::to_index(self.entries.len()))?;
        self.entries
            .iter()
            .try_for_each(|constant| constant.write(out))
    }

    pub(crate) fn read(input: &mut impl Read) -> Result<Self, ClassFileError> {
        let count = input.read_u16::<BigEndian>()?;
        let mut pool = Self::new();
        for _ in 1..count {
            let constant = Constant::read(input)?;
            if !pool.entries.insert(constant) {
                return Err(ClassFileError::DuplicateConstant);
            }
        }
        Ok(pool)
    }

    #[inline]
    fn to_index(position: usize) -> u16 {
        // positions are bounded by `add`
        (position + 1) as u16
    }
}

/// The modified UTF-8 used by class files: NUL takes two bytes and
/// supplementary characters are stored as surrogate pairs.
mod mutf8 {
    pub fn encode(str: &str) -> Vec<u8> {
        let mut out = Vec::with_capacity(str.len());
        for ch in str.chars() {
            match ch {
                '\0' => out.extend_from_slice(&[0xC0, 0x80]),
                ch if (ch as u32) < 0x10000 => {
                    let mut buf = [0; 3];
                    out.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
                }
                ch => {
                    let mut units = [0; 2];
                    for &unit in ch.encode_utf16(&mut units).iter() {
                        out.extend_from_slice(&[
                            0xE0 | (unit >> 12) as u8,
                            0x80 | ((unit >> 6) & 0x3F) as u8,
                            0x80 | (unit & 0x3F) as u8,
                        ]);
                    }
                }
            }
        }
        out
    }

    pub fn decode(bytes: &[u8]) -> Option<String> {
        let mut units = Vec::with_capacity(bytes.len());
        let mut it = bytes.iter().copied();
        while let Some(b0) = it.next() {
            let unit = match b0 {
                0x01..=0x7F => u16::from(b0),
                0xC0..=0xDF => {
                    let b1 = continuation(it.next()?)?;
                    (u16::from(b0 & 0x1F) << 6) | b1
                }
                0xE0..=0xEF => {
                    let b1 = continuation(it.next()?)?;
                    let b2 = continuation(it.next()?)?;
                    (u16::from(b0 & 0x0F) << 12) | (b1 << 6) | b2
                }
                _ => return None,
            };
            units.push(unit);
        }
        String::from_utf16(&units).ok()
    }

    #[inline]
    fn continuation(byte: u8) -> Option<u16> {
        (byte & 0xC0 == 0x80).then_some(u16::from(byte & 0x3F))
    }
}
