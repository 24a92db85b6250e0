// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! Type table - every type the front end produced, addressed by id.
//!
//! Structural types (pointers, tuples, signatures, slices, maps) are interned
//! by the builder, so two equal ids always mean identical types and two
//! different ids mean different types. Named types are nominal: each
//! declaration gets its own id even when the underlying types agree.

use crate::FuncId;

/// Bound on pointer, named and alias layers followed by the walks below.
/// `type T *T` is legal Go, and unchecked programs may hold worse.
const MAX_LAYERS: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct TypeId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct FieldId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct MethodId(pub u32);

/// Shape of a type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum TypeKind {
    /// Predeclared type (`int`, `string`, `bool`, ...).
    Basic(String),
    /// Declared type with its own identity.
    /// `underlying` is `None` only while the builder is still filling it in.
    Named {
        package: String,
        name: String,
        underlying: Option<TypeId>,
        /// Concrete methods declared on the type (value or pointer receiver).
        methods: Vec<MethodId>,
    },
    /// Transparent alias of another type.
    Alias {
        package: String,
        name: String,
        target: TypeId,
    },
    Pointer(TypeId),
    Struct(Vec<FieldId>),
    /// Interface method set, flattened: embedded interfaces contribute their
    /// own `MethodId`s so a method keeps its identity across embedding.
    Interface(Vec<MethodId>),
    Tuple(Vec<TypeId>),
    Signature {
        recv: Option<TypeId>,
        params: Vec<TypeId>,
        results: Vec<TypeId>,
    },
    Slice(TypeId),
    Map {
        key: TypeId,
        value: TypeId,
    },
}

impl TypeKind {
    /// True for the kinds the builder interns by structure.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            TypeKind::Basic(_)
                | TypeKind::Pointer(_)
                | TypeKind::Tuple(_)
                | TypeKind::Signature { .. }
                | TypeKind::Slice(_)
                | TypeKind::Map { .. }
        )
    }
}

/// A struct field. Each struct literal owns its fields, so a `FieldId`
/// identifies the field of exactly one struct type.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Field {
    pub name: String,
    pub ty: TypeId,
    #[cfg_attr(feature = "serde", serde(default))]
    pub embedded: bool,
}

/// A method: either an interface method (abstract) or a concrete method
/// declared on a named type.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Method {
    pub name: String,
    pub signature: TypeId,
    /// Implementing function for concrete methods.
    #[cfg_attr(feature = "serde", serde(default))]
    pub func: Option<FuncId>,
}

/// All types, fields and methods of a program.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TypeTable {
    pub(crate) types: Vec<TypeKind>,
    pub(crate) fields: Vec<Field>,
    pub(crate) methods: Vec<Method>,
}

impl TypeTable {
    pub fn get(&self, id: TypeId) -> &TypeKind {
        &self.types[id.0 as usize]
    }

    pub fn field(&self, id: FieldId) -> &Field {
        &self.fields[id.0 as usize]
    }

    pub fn method(&self, id: MethodId) -> &Method {
        &self.methods[id.0 as usize]
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (TypeId, &TypeKind)> {
        self.types
            .iter()
            .enumerate()
            .map(|(i, k)| (TypeId(i as u32), k))
    }

    /// Strip aliases.
    pub fn unalias(&self, mut id: TypeId) -> TypeId {
        for _ in 0..MAX_LAYERS {
            match self.get(id) {
                TypeKind::Alias { target, .. } => id = *target,
                _ => break,
            }
        }
        id
    }

    /// Underlying type: named and alias layers removed.
    pub fn underlying(&self, id: TypeId) -> TypeId {
        let mut id = self.unalias(id);
        for _ in 0..MAX_LAYERS {
            match self.get(id) {
                TypeKind::Named { underlying: Some(u), .. } if *u != id => id = self.unalias(*u),
                _ => break,
            }
        }
        id
    }

    /// Pointee of a pointer type (aliases are looked through).
    pub fn pointer_elem(&self, id: TypeId) -> Option<TypeId> {
        match self.get(self.unalias(id)) {
            TypeKind::Pointer(elem) => Some(*elem),
            _ => None,
        }
    }

    /// Elements of a tuple type.
    pub fn tuple_elems(&self, id: TypeId) -> Option<&[TypeId]> {
        match self.get(id) {
            TypeKind::Tuple(elems) => Some(elems),
            _ => None,
        }
    }

    /// The signature behind a function-typed value.
    pub fn signature(&self, id: TypeId) -> Option<(Option<TypeId>, &[TypeId], &[TypeId])> {
        match self.get(self.underlying(id)) {
            TypeKind::Signature { recv, params, results } => Some((*recv, params, results)),
            _ => None,
        }
    }

    /// Struct fields reached by descending through pointer, alias and named
    /// layers.
    pub fn struct_fields(&self, id: TypeId) -> Option<&[FieldId]> {
        self.struct_fields_at(id, 0)
    }

    fn struct_fields_at(&self, id: TypeId, depth: usize) -> Option<&[FieldId]> {
        if depth > MAX_LAYERS {
            return None;
        }
        match self.get(id) {
            TypeKind::Pointer(elem) => self.struct_fields_at(*elem, depth + 1),
            TypeKind::Alias { target, .. } => self.struct_fields_at(*target, depth + 1),
            TypeKind::Named { underlying: Some(u), .. } => self.struct_fields_at(*u, depth + 1),
            TypeKind::Struct(fields) => Some(fields),
            _ => None,
        }
    }

    /// Field `index` of the struct behind `id`.
    pub fn field_at(&self, id: TypeId, index: u32) -> Option<FieldId> {
        self.struct_fields(id)?.get(index as usize).copied()
    }

    /// Field named `name` of the struct behind `id`.
    pub fn field_named(&self, id: TypeId, name: &str) -> Option<FieldId> {
        self.struct_fields(id)?
            .iter()
            .copied()
            .find(|f| self.field(*f).name == name)
    }

    /// Named type or alias declared as `package.name`.
    pub fn find_named(&self, package: &str, name: &str) -> Option<TypeId> {
        self.iter().find_map(|(id, kind)| match kind {
            TypeKind::Named { package: p, name: n, .. }
            | TypeKind::Alias { package: p, name: n, .. }
                if p == package && n == name =>
            {
                Some(id)
            }
            _ => None,
        })
    }

    /// True if some named type or alias is declared in `package`.
    pub fn has_package(&self, package: &str) -> bool {
        self.types.iter().any(|kind| match kind {
            TypeKind::Named { package: p, .. } | TypeKind::Alias { package: p, .. } => p == package,
            _ => false,
        })
    }

    /// Existing pointer type to `elem`, if the program ever mentions one.
    pub fn find_pointer(&self, elem: TypeId) -> Option<TypeId> {
        self.iter().find_map(|(id, kind)| match kind {
            TypeKind::Pointer(e) if *e == elem => Some(id),
            _ => None,
        })
    }

    /// Concrete methods declared on a named type.
    pub fn declared_methods(&self, id: TypeId) -> &[MethodId] {
        match self.get(id) {
            TypeKind::Named { methods, .. } => methods,
            _ => &[],
        }
    }

    /// Human-readable rendering, Go style: `*net/http.Response`.
    pub fn type_string(&self, id: TypeId) -> String {
        let mut out = String::new();
        self.write_type(&mut out, id, 0);
        out
    }

    fn write_type(&self, out: &mut String, id: TypeId, depth: usize) {
        // Anonymous recursive types cannot appear, but a malformed input could.
        if depth > 16 {
            out.push_str("...");
            return;
        }
        match self.get(id) {
            TypeKind::Basic(name) => out.push_str(name),
            TypeKind::Named { package, name, .. } | TypeKind::Alias { package, name, .. } => {
                if !package.is_empty() {
                    out.push_str(package);
                    out.push('.');
                }
                out.push_str(name);
            }
            TypeKind::Pointer(elem) => {
                out.push('*');
                self.write_type(out, *elem, depth + 1);
            }
            TypeKind::Struct(fields) => {
                out.push_str("struct{");
                for (i, f) in fields.iter().enumerate() {
                    if i > 0 {
                        out.push_str("; ");
                    }
                    let field = self.field(*f);
                    out.push_str(&field.name);
                    out.push(' ');
                    self.write_type(out, field.ty, depth + 1);
                }
                out.push('}');
            }
            TypeKind::Interface(methods) => {
                out.push_str("interface{");
                for (i, m) in methods.iter().enumerate() {
                    if i > 0 {
                        out.push_str("; ");
                    }
                    out.push_str(&self.method(*m).name);
                    out.push_str("()");
                }
                out.push('}');
            }
            TypeKind::Tuple(elems) => {
                out.push('(');
                self.write_list(out, elems, depth);
                out.push(')');
            }
            TypeKind::Signature { params, results, .. } => {
                out.push_str("func(");
                self.write_list(out, params, depth);
                out.push(')');
                match results.len() {
                    0 => {}
                    1 => {
                        out.push(' ');
                        self.write_type(out, results[0], depth + 1);
                    }
                    _ => {
                        out.push_str(" (");
                        self.write_list(out, results, depth);
                        out.push(')');
                    }
                }
            }
            TypeKind::Slice(elem) => {
                out.push_str("[]");
                self.write_type(out, *elem, depth + 1);
            }
            TypeKind::Map { key, value } => {
                out.push_str("map[");
                self.write_type(out, *key, depth + 1);
                out.push(']');
                self.write_type(out, *value, depth + 1);
            }
        }
    }

    fn write_list(&self, out: &mut String, ids: &[TypeId], depth: usize) {
        for (i, t) in ids.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            self.write_type(out, *t, depth + 1);
        }
    }
}
