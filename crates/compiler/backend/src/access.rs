use bitfield_struct::bitfield;
use trackable_compiler_frontend::MemberFlags;

/// JVM `access_flags` shared by classes and methods. Bits that mean
/// different things for fields (`volatile`, `transient`) alias `bridge`
/// and `varargs`.
#[bitfield(u16)]
#[derive(PartialEq, Eq)]
pub struct AccessFlags {
    pub is_public: bool,
    pub is_private: bool,
    pub is_protected: bool,
    pub is_static: bool,
    pub is_final: bool,
    /// `ACC_SUPER` on classes, `ACC_SYNCHRONIZED` on methods.
    pub is_super: bool,
    pub is_bridge: bool,
    pub is_varargs: bool,
    pub is_native: bool,
    pub is_interface: bool,
    pub is_abstract: bool,
    pub is_strict: bool,
    pub is_synthetic: bool,
    pub is_annotation: bool,
    pub is_enum: bool,

    #[bits(1)]
    __: u8,
}

/// `MemberFlags::is_synthetic` only marks plugin generated members and is
/// never written as `ACC_SYNTHETIC`.
impl From<MemberFlags> for AccessFlags {
    fn from(flags: MemberFlags) -> Self {
        Self::new()
            .with_is_public(flags.is_public())
            .with_is_final(flags.is_final())
            .with_is_abstract(flags.is_abstract())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bits_match_the_class_file_format() {
        assert_eq!(AccessFlags::new().with_is_public(true).into_bits(), 0x0001);
        assert_eq!(AccessFlags::new().with_is_final(true).into_bits(), 0x0010);
        assert_eq!(AccessFlags::new().with_is_super(true).into_bits(), 0x0020);
        assert_eq!(AccessFlags::new().with_is_interface(true).into_bits(), 0x0200);
        assert_eq!(AccessFlags::new().with_is_abstract(true).into_bits(), 0x0400);
        assert_eq!(AccessFlags::new().with_is_synthetic(true).into_bits(), 0x1000);
        assert_eq!(AccessFlags::new().with_is_enum(true).into_bits(), 0x4000);
    }

    #[test]
    fn member_flags_carry_over_without_synthetic() {
        let member = MemberFlags::new()
            .with_is_public(true)
            .with_is_final(true)
            .with_is_synthetic(true);
        let access = AccessFlags::from(member);
        assert_eq!(access.into_bits(), 0x0011);
        assert!(!access.is_synthetic());
    }
}
