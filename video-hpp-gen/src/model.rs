//! Registry model shared by the reader, the resolve passes and the emitter.
//!
//! Types and extensions live in arenas addressed by [`TypeId`] and
//! [`ExtensionId`]. Cross references (struct members, require lists,
//! `required_by` back-references) store ids or names, never borrows, so the
//! resolve passes can rewrite one extension's require list while reading the
//! rest of the model.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::diag::Warning;

/// Index of a [`TypeEntry`] in [`Registry::types`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TypeId(pub usize);

/// Index of an [`Extension`] in [`Registry::extensions`], which is also its
/// declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ExtensionId(pub usize);

/// Category of a declared type, as given by its `category` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCategory {
    Define,
    Enum,
    Struct,
    ExternalType,
    Include,
    Unknown,
}

/// One `<type>` of the `<types>` section.
#[derive(Debug)]
pub struct TypeEntry {
    pub name: String,
    pub line: usize,
    pub def: TypeDef,
    /// Extensions that emit this type. Filled by the reader and the
    /// closure pass; a checked registry has exactly one owner per struct.
    pub required_by: BTreeSet<ExtensionId>,
}

impl TypeEntry {
    pub fn category(&self) -> TypeCategory {
        match self.def {
            TypeDef::Define(_) => TypeCategory::Define,
            TypeDef::Enum(_) => TypeCategory::Enum,
            TypeDef::Struct(_) => TypeCategory::Struct,
            TypeDef::ExternalType { .. } => TypeCategory::ExternalType,
            TypeDef::Include => TypeCategory::Include,
            TypeDef::Unknown => TypeCategory::Unknown,
        }
    }

    pub fn as_struct(&self) -> Option<&StructDef> {
        match &self.def {
            TypeDef::Struct(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_enum(&self) -> Option<&EnumDef> {
        match &self.def {
            TypeDef::Enum(e) => Some(e),
            _ => None,
        }
    }
}

/// Category-specific payload of a [`TypeEntry`].
#[derive(Debug)]
pub enum TypeDef {
    /// `#define` macro; `requires` names another define it expands to.
    Define(DefineDef),
    Enum(EnumDef),
    Struct(StructDef),
    /// A type provided by an included header (`uint32_t` from `stdint`).
    ExternalType { requires: String },
    Include,
    /// The bare `<type name="int"/>` fallback.
    Unknown,
}

#[derive(Debug, Default)]
pub struct DefineDef {
    pub requires: Option<String>,
}

/// An enum type. `values` stays empty until its `<enums>` block is read.
#[derive(Debug, Default)]
pub struct EnumDef {
    pub values: Vec<EnumValue>,
}

#[derive(Debug, Clone)]
pub struct EnumValue {
    /// Raw registry name, e.g. `STD_VIDEO_H264_PROFILE_IDC_HIGH`.
    pub name: String,
    /// Decimal or hex literal.
    pub value: String,
    pub line: usize,
}

#[derive(Debug, Default)]
pub struct StructDef {
    pub members: Vec<Member>,
}

/// A struct member: `<type>T</type> <name>n</name>` plus modifiers.
#[derive(Debug, Clone)]
pub struct Member {
    pub ty: TypeInfo,
    pub name: String,
    /// Array dimensions, outermost first. Each is a decimal literal or a
    /// constant name.
    pub array_sizes: Vec<String>,
    /// Bitfield width. Never set together with `array_sizes`.
    pub bit_count: Option<String>,
    pub line: usize,
}

/// A member's declared type, split into the text around the base name.
///
/// `const <type>int8_t</type>*` → prefix `const`, name `int8_t`, postfix `*`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeInfo {
    pub prefix: String,
    pub name: String,
    pub postfix: String,
}

impl TypeInfo {
    /// C++ spelling of this type. Names starting with `type_prefix` are
    /// stripped and qualified with `namespace`; others are kept as-is.
    pub fn compose(&self, namespace: &str, type_prefix: &str) -> String {
        let base = match self.name.strip_prefix(type_prefix) {
            Some(stripped) if !type_prefix.is_empty() => format!("{namespace}::{stripped}"),
            _ => self.name.clone(),
        };
        let mut out = String::new();
        if !self.prefix.is_empty() {
            out.push_str(&self.prefix);
            out.push(' ');
        }
        out.push_str(&base);
        if !self.postfix.is_empty() {
            out.push(' ');
            out.push_str(&self.postfix);
        }
        out
    }
}

/// A `<require><enum name value/>` constant of one extension.
#[derive(Debug, Clone)]
pub struct Constant {
    pub value: String,
    pub line: usize,
}

/// The merged `<require>` blocks of one extension.
#[derive(Debug, Default)]
pub struct RequireData {
    pub constants: BTreeMap<String, Constant>,
    /// Required types in emission order.
    pub types: Vec<TypeId>,
    pub line: usize,
}

/// One `<extension>`.
#[derive(Debug)]
pub struct Extension {
    pub name: String,
    /// The extension whose codec header this one includes.
    pub depends: Option<ExtensionId>,
    pub require: RequireData,
    pub line: usize,
}

/// The complete registry.
#[derive(Debug, Default)]
pub struct Registry {
    /// Copyright banner, already turned into `//` comment lines.
    pub copyright: String,
    pub types: Vec<TypeEntry>,
    type_index: HashMap<String, TypeId>,
    pub extensions: Vec<Extension>,
    pub warnings: Vec<Warning>,
}

impl Registry {
    /// Add a type. Returns `None` if the name is already taken.
    pub fn add_type(&mut self, name: &str, line: usize, def: TypeDef) -> Option<TypeId> {
        if self.type_index.contains_key(name) {
            return None;
        }
        let id = TypeId(self.types.len());
        self.types.push(TypeEntry {
            name: name.to_string(),
            line,
            def,
            required_by: BTreeSet::new(),
        });
        self.type_index.insert(name.to_string(), id);
        Some(id)
    }

    pub fn type_id(&self, name: &str) -> Option<TypeId> {
        self.type_index.get(name).copied()
    }

    pub fn contains_type(&self, name: &str) -> bool {
        self.type_index.contains_key(name)
    }

    pub fn get(&self, id: TypeId) -> &TypeEntry {
        &self.types[id.0]
    }

    pub fn get_mut(&mut self, id: TypeId) -> &mut TypeEntry {
        &mut self.types[id.0]
    }

    /// Look up a type by name.
    pub fn lookup(&self, name: &str) -> Option<&TypeEntry> {
        self.type_id(name).map(|id| self.get(id))
    }

    /// True if `name` is declared with the given category.
    pub fn is_category(&self, name: &str, category: TypeCategory) -> bool {
        self.lookup(name).is_some_and(|t| t.category() == category)
    }

    /// Id of the struct named `name`, if it is one.
    pub fn struct_id(&self, name: &str) -> Option<TypeId> {
        self.type_id(name)
            .filter(|id| self.get(*id).category() == TypeCategory::Struct)
    }

    /// Ids of the struct types referenced by the members of struct `id`, in
    /// member order. Repeated references are reported once.
    pub fn member_structs(&self, id: TypeId) -> Vec<TypeId> {
        let mut out = Vec::new();
        if let Some(s) = self.get(id).as_struct() {
            for member in &s.members {
                if let Some(dep) = self.struct_id(&member.ty.name) {
                    if !out.contains(&dep) {
                        out.push(dep);
                    }
                }
            }
        }
        out
    }

    /// All structs, in declaration order.
    pub fn structs(&self) -> impl Iterator<Item = (TypeId, &TypeEntry, &StructDef)> {
        self.types
            .iter()
            .enumerate()
            .filter_map(|(i, t)| t.as_struct().map(|s| (TypeId(i), t, s)))
    }

    pub fn extension(&self, id: ExtensionId) -> &Extension {
        &self.extensions[id.0]
    }

    pub fn extension_id(&self, name: &str) -> Option<ExtensionId> {
        self.extensions
            .iter()
            .position(|e| e.name == name)
            .map(ExtensionId)
    }

    /// Names of the types `ext` requires, in list order.
    pub fn required_type_names(&self, ext: ExtensionId) -> Vec<&str> {
        self.extension(ext)
            .require
            .types
            .iter()
            .map(|id| self.get(*id).name.as_str())
            .collect()
    }
}
