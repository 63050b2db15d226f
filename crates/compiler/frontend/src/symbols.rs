use std::borrow::Borrow;
use std::collections::VecDeque;
use std::{fmt, ops};

use bitfield_struct::bitfield;
use hashbrown::hash_map::Entry;
use hashbrown::{HashMap, HashSet};
use serde::Deserialize;
use smallvec::SmallVec;
use thiserror::Error;
use trackable_ast::Span;

use crate::IndexMap;

pub mod predef {
    pub const STRING: &str = "kotlin.String";
}

/// The declaration table of a single compilation.
///
/// Declarations keep the identity they were added with for the whole
/// compilation, so the resolution and codegen phases can refer to them by
/// [`DeclId`].
#[derive(Debug, Default, Clone)]
pub struct Symbols {
    decls: IndexMap<FqName, Declaration>,
    accessors: HashMap<DeclId, AccessorDescriptor>,
    rejected: HashSet<DeclId>,
}

impl Symbols {
    pub fn add_declaration(&mut self, decl: Declaration) -> Result<DeclId, NameRedefinition> {
        match self.decls.entry(decl.name.clone()) {
            indexmap::map::Entry::Occupied(entry) => Err(NameRedefinition(entry.key().clone())),
            indexmap::map::Entry::Vacant(entry) => {
                let id = DeclId(entry.index());
                entry.insert(decl);
                Ok(id)
            }
        }
    }

    #[inline]
    pub fn get(&self, id: DeclId) -> Option<&Declaration> {
        self.decls.get_index(id.0).map(|(_, decl)| decl)
    }

    #[inline]
    pub fn by_name(&self, name: &str) -> Option<DeclId> {
        self.decls.get_index_of(name).map(DeclId)
    }

    pub fn declarations(&self) -> impl ExactSizeIterator<Item = (DeclId, &Declaration)> {
        self.decls
            .values()
            .enumerate()
            .map(|(i, decl)| (DeclId(i), decl))
    }

    /// Declarations that are compiled in this pass, as opposed to the ones
    /// loaded from the classpath.
    pub fn user_defined(&self) -> impl Iterator<Item = (DeclId, &Declaration)> {
        self.declarations()
            .filter(|(_, decl)| decl.is_user_defined())
    }

    /// Walks the declaration and all of its ancestors, superclasses and
    /// superinterfaces alike, visiting each of them once.
    #[inline]
    pub fn ancestors_with_self(&self, id: DeclId) -> Ancestors<'_> {
        Ancestors {
            symbols: self,
            queue: VecDeque::from([id]),
            visited: HashSet::new(),
        }
    }

    pub fn add_member(
        &mut self,
        id: DeclId,
        name: impl Into<String>,
        member: Member,
    ) -> Result<(), RegistrationError> {
        let (_, decl) = self
            .decls
            .get_index_mut(id.0)
            .ok_or(RegistrationError::UnknownDeclaration(id))?;
        decl.add_member(name.into(), member)
    }

    #[inline]
    pub fn accessor(&self, id: DeclId) -> Option<&AccessorDescriptor> {
        self.accessors.get(&id)
    }

    pub fn accessors(&self) -> impl Iterator<Item = &AccessorDescriptor> {
        self.accessors.values()
    }

    /// Marks a declaration whose accessor was refused, so later passes
    /// leave it alone.
    #[inline]
    pub fn reject(&mut self, id: DeclId) {
        self.rejected.insert(id);
    }

    #[inline]
    pub fn is_rejected(&self, id: DeclId) -> bool {
        self.rejected.contains(&id)
    }

    /// Attaches a synthetic accessor to its owner. The member becomes visible
    /// to lookups and the descriptor is kept for codegen. A declaration can
    /// hold at most one accessor.
    pub fn register_accessor(
        &mut self,
        descriptor: AccessorDescriptor,
    ) -> Result<&AccessorDescriptor, RegistrationError> {
        let owner = descriptor.owner;
        let (_, decl) = self
            .decls
            .get_index_mut(owner.0)
            .ok_or(RegistrationError::UnknownDeclaration(owner))?;

        match self.accessors.entry(owner) {
            Entry::Occupied(_) => Err(RegistrationError::AlreadyRegistered(owner)),
            Entry::Vacant(entry) => {
                let member = Member::new(descriptor.flags, predef::STRING, decl.span);
                decl.add_member(descriptor.name.clone(), member)?;
                Ok(entry.insert(descriptor))
            }
        }
    }
}

impl ops::Index<DeclId> for Symbols {
    type Output = Declaration;

    #[inline]
    fn index(&self, index: DeclId) -> &Self::Output {
        self.get(index).expect("declaration id not found")
    }
}

#[derive(Debug)]
pub struct Ancestors<'a> {
    symbols: &'a Symbols,
    queue: VecDeque<DeclId>,
    visited: HashSet<DeclId>,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = (DeclId, &'a Declaration);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(id) = self.queue.pop_front() {
            if !self.visited.insert(id) {
                continue;
            }
            let Some(decl) = self.symbols.get(id) else {
                continue;
            };
            self.queue.extend(decl.supertypes());
            return Some((id, decl));
        }
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DeclId(usize);

impl fmt::Display for DeclId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A dot separated, fully qualified name such as `com.example.Foo`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(transparent)]
pub struct FqName(String);

impl FqName {
    #[inline]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn simple_name(&self) -> &str {
        self.0.rsplit_once('.').map_or(&self.0, |(_, name)| name)
    }

    pub fn package(&self) -> Option<&str> {
        self.0.rsplit_once('.').map(|(package, _)| package)
    }

    /// The slash separated form used by class files.
    pub fn internal_name(&self) -> String {
        self.0.replace('.', "/")
    }
}

impl Borrow<str> for FqName {
    #[inline]
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for FqName {
    #[inline]
    fn from(name: &str) -> Self {
        Self(name.to_owned())
    }
}

impl From<String> for FqName {
    #[inline]
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl fmt::Display for FqName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeclarationShape {
    Class,
    Interface,
    Object,
    /// A class with generated structural equality and copy members.
    ValueAggregate,
    /// A single field class that is represented by its field at runtime.
    Wrapper,
}

impl DeclarationShape {
    #[inline]
    pub fn is_interface(self) -> bool {
        matches!(self, Self::Interface)
    }
}

#[bitfield(u8)]
#[derive(PartialEq, Eq)]
pub struct DeclarationFlags {
    pub is_open: bool,
    pub is_abstract: bool,

    #[bits(6)]
    __: u8,
}

#[derive(Debug, Clone)]
pub struct Declaration {
    name: FqName,
    shape: DeclarationShape,
    flags: DeclarationFlags,
    annotations: Vec<Annotation>,
    superclass: Option<DeclId>,
    interfaces: SmallVec<[DeclId; 2]>,
    members: IndexMap<String, Member>,
    span: Option<Span>,
}

impl Declaration {
    pub fn new(name: impl Into<FqName>, shape: DeclarationShape) -> Self {
        Self {
            name: name.into(),
            shape,
            flags: DeclarationFlags::default(),
            annotations: Vec::new(),
            superclass: None,
            interfaces: SmallVec::new(),
            members: IndexMap::default(),
            span: None,
        }
    }

    pub fn with_flags(mut self, flags: DeclarationFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_annotation(mut self, annotation: Annotation) -> Self {
        self.annotations.push(annotation);
        self
    }

    pub fn with_superclass(mut self, superclass: DeclId) -> Self {
        self.superclass = Some(superclass);
        self
    }

    pub fn with_interface(mut self, interface: DeclId) -> Self {
        self.interfaces.push(interface);
        self
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    #[inline]
    pub fn name(&self) -> &FqName {
        &self.name
    }

    #[inline]
    pub fn simple_name(&self) -> &str {
        self.name.simple_name()
    }

    #[inline]
    pub fn shape(&self) -> DeclarationShape {
        self.shape
    }

    #[inline]
    pub fn flags(&self) -> DeclarationFlags {
        self.flags
    }

    #[inline]
    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    pub fn annotation(&self, name: &FqName) -> Option<&Annotation> {
        self.annotations.iter().find(|ann| ann.name() == name)
    }

    #[inline]
    pub fn has_annotation(&self, name: &FqName) -> bool {
        self.annotation(name).is_some()
    }

    #[inline]
    pub fn superclass(&self) -> Option<DeclId> {
        self.superclass
    }

    #[inline]
    pub fn interfaces(&self) -> &[DeclId] {
        &self.interfaces
    }

    /// Direct supertypes, the superclass first.
    pub fn supertypes(&self) -> impl Iterator<Item = DeclId> + '_ {
        self.superclass
            .into_iter()
            .chain(self.interfaces.iter().copied())
    }

    #[inline]
    pub fn member(&self, name: &str) -> Option<&Member> {
        self.members.get(name)
    }

    pub fn members(&self) -> impl ExactSizeIterator<Item = (&str, &Member)> {
        self.members.iter().map(|(name, member)| (name.as_str(), member))
    }

    #[inline]
    pub fn span(&self) -> Option<Span> {
        self.span
    }

    pub fn is_user_defined(&self) -> bool {
        self.span.is_some()
    }

    fn add_member(&mut self, name: String, member: Member) -> Result<(), RegistrationError> {
        match self.members.entry(name) {
            indexmap::map::Entry::Occupied(entry) => {
                Err(RegistrationError::MemberRedefinition(entry.key().clone()))
            }
            indexmap::map::Entry::Vacant(entry) => {
                entry.insert(member);
                Ok(())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    name: FqName,
    args: IndexMap<String, ConstValue>,
}

impl Annotation {
    pub fn new(name: impl Into<FqName>) -> Self {
        Self {
            name: name.into(),
            args: IndexMap::default(),
        }
    }

    pub fn with_arg(mut self, key: impl Into<String>, value: impl Into<ConstValue>) -> Self {
        self.args.insert(key.into(), value.into());
        self
    }

    #[inline]
    pub fn name(&self) -> &FqName {
        &self.name
    }

    #[inline]
    pub fn arg(&self, key: &str) -> Option<&ConstValue> {
        self.args.get(key)
    }
}

/// A compile-time constant annotation argument.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstValue {
    String(String),
    Int(i64),
    Bool(bool),
}

impl ConstValue {
    #[inline]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(str) => Some(str.as_str()),
            _ => None,
        }
    }
}

impl From<&str> for ConstValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<String> for ConstValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for ConstValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<bool> for ConstValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

#[bitfield(u8)]
#[derive(PartialEq, Eq)]
pub struct MemberFlags {
    pub is_public: bool,
    pub is_final: bool,
    pub is_abstract: bool,
    pub is_synthetic: bool,

    #[bits(4)]
    __: u8,
}

#[derive(Debug, Clone)]
pub struct Member {
    flags: MemberFlags,
    return_type: FqName,
    span: Option<Span>,
}

impl Member {
    pub fn new(flags: MemberFlags, return_type: impl Into<FqName>, span: Option<Span>) -> Self {
        Self {
            flags,
            return_type: return_type.into(),
            span,
        }
    }

    #[inline]
    pub fn flags(&self) -> MemberFlags {
        self.flags
    }

    #[inline]
    pub fn return_type(&self) -> &FqName {
        &self.return_type
    }

    #[inline]
    pub fn span(&self) -> Option<Span> {
        self.span
    }

    #[inline]
    pub fn is_synthetic(&self) -> bool {
        self.flags.is_synthetic()
    }
}

/// Everything codegen needs to materialize a synthesized accessor. The
/// literal is resolved once, when the accessor is registered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessorDescriptor {
    owner: DeclId,
    name: String,
    literal: String,
    flags: MemberFlags,
}

impl AccessorDescriptor {
    pub fn new(
        owner: DeclId,
        name: impl Into<String>,
        literal: impl Into<String>,
        flags: MemberFlags,
    ) -> Self {
        Self {
            owner,
            name: name.into(),
            literal: literal.into(),
            flags,
        }
    }

    #[inline]
    pub fn owner(&self) -> DeclId {
        self.owner
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn literal(&self) -> &str {
        &self.literal
    }

    #[inline]
    pub fn flags(&self) -> MemberFlags {
        self.flags
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("'{0}' is already defined")]
pub struct NameRedefinition(FqName);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistrationError {
    #[error("declaration {0} does not exist")]
    UnknownDeclaration(DeclId),
    #[error("declaration {0} already has an accessor")]
    AlreadyRegistered(DeclId),
    #[error("a member named '{0}' is already declared")]
    MemberRedefinition(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn class(name: &str) -> Declaration {
        Declaration::new(name, DeclarationShape::Class)
    }

    #[test]
    fn ancestors_visit_diamond_once() {
        let mut symbols = Symbols::default();
        let root = symbols
            .add_declaration(Declaration::new("a.Root", DeclarationShape::Interface))
            .unwrap();
        let left = symbols
            .add_declaration(
                Declaration::new("a.Left", DeclarationShape::Interface).with_interface(root),
            )
            .unwrap();
        let right = symbols
            .add_declaration(
                Declaration::new("a.Right", DeclarationShape::Interface).with_interface(root),
            )
            .unwrap();
        let leaf = symbols
            .add_declaration(class("a.Leaf").with_interface(left).with_interface(right))
            .unwrap();

        let visited = symbols
            .ancestors_with_self(leaf)
            .map(|(id, _)| id)
            .collect::<Vec<_>>();
        assert_eq!(visited, [leaf, left, right, root]);
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut symbols = Symbols::default();
        symbols.add_declaration(class("a.A")).unwrap();

        assert_eq!(
            symbols.add_declaration(class("a.A")),
            Err(NameRedefinition(FqName::from("a.A")))
        );
    }

    #[test]
    fn accessor_is_registered_once() {
        let mut symbols = Symbols::default();
        let id = symbols.add_declaration(class("a.A")).unwrap();
        let flags = MemberFlags::new().with_is_public(true).with_is_synthetic(true);

        let registered = symbols
            .register_accessor(AccessorDescriptor::new(id, "track", "A", flags))
            .unwrap();
        assert_eq!(registered.literal(), "A");

        let res = symbols.register_accessor(AccessorDescriptor::new(id, "track", "B", flags));
        assert_eq!(res, Err(RegistrationError::AlreadyRegistered(id)));
        assert_eq!(symbols.accessor(id).map(AccessorDescriptor::literal), Some("A"));
        assert_eq!(symbols[id].members().len(), 1);
    }

    #[test]
    fn names_expose_simple_and_internal_forms() {
        let name = FqName::from("com.example.Tracked");
        assert_eq!(name.simple_name(), "Tracked");
        assert_eq!(name.package(), Some("com.example"));
        assert_eq!(name.internal_name(), "com/example/Tracked");
        assert_eq!(FqName::from("Root").simple_name(), "Root");
    }
}
