// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Target descriptor resolution.
//!
//! Turns the configured names into type, field and method identities once,
//! so the tracer only ever compares ids.

use closecheck_ir::{FieldId, FuncId, MethodId, Program, TypeId, TypeKind, TypeTable};

use crate::{ConfigError, TargetConfig};

/// Resolved identities of the checked resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetDescriptor {
    /// Type whose values own the resource (e.g. `*net/http.Response`).
    pub container: TypeId,
    /// Field of the container holding the resource.
    pub resource_field: FieldId,
    /// Declared type of that field (e.g. `io.ReadCloser`).
    pub resource: TypeId,
    pub release: MethodId,
    /// Function implementing `release` when it is a concrete method.
    pub release_func: Option<FuncId>,
}

impl TargetDescriptor {
    pub fn resolve(program: &Program, config: &TargetConfig) -> Result<Self, ConfigError> {
        let types = &program.types;
        let (is_pointer, name) = match config.type_name.strip_prefix('*') {
            Some(rest) => (true, rest),
            None => (false, config.type_name.as_str()),
        };

        if !types.has_package(&config.package) {
            return Err(ConfigError::PackageNotFound {
                package: config.package.clone(),
            });
        }
        let type_not_found = || ConfigError::TypeNotFound {
            package: config.package.clone(),
            name: config.type_name.clone(),
        };
        let named = types.find_named(&config.package, name).ok_or_else(type_not_found)?;
        let container = if is_pointer {
            types.find_pointer(named).ok_or_else(type_not_found)?
        } else {
            named
        };

        let type_name = types.type_string(container);
        if types.struct_fields(container).is_none() {
            return Err(ConfigError::NotAStruct {
                type_name,
                field: config.field.clone(),
            });
        }
        let resource_field = types
            .field_named(container, &config.field)
            .ok_or_else(|| ConfigError::FieldNotFound {
                type_name: type_name.clone(),
                field: config.field.clone(),
            })?;
        let resource = types.field(resource_field).ty;

        let release = method_of(types, resource, &config.method, 0).ok_or_else(|| ConfigError::MethodNotFound {
            type_name: types.type_string(resource),
            method: config.method.clone(),
        })?;
        let release_func = types.method(release).func;

        tracing::debug!(
            container = %type_name,
            resource = %types.type_string(resource),
            release = %config.method,
            "resolved target descriptor"
        );

        Ok(Self {
            container,
            resource_field,
            resource,
            release,
            release_func,
        })
    }
}

/// Method `name` of `ty`: among an interface's methods, a named type's
/// declared methods (also through a pointer), then the underlying type.
fn method_of(types: &TypeTable, ty: TypeId, name: &str, depth: usize) -> Option<MethodId> {
    if depth > 8 {
        return None;
    }
    let by_name = |ms: &[MethodId]| ms.iter().copied().find(|m| types.method(*m).name == name);
    let direct = match types.get(ty) {
        TypeKind::Interface(methods) => by_name(methods),
        TypeKind::Named { methods, .. } => by_name(methods),
        TypeKind::Pointer(elem) => by_name(types.declared_methods(types.unalias(*elem))),
        _ => None,
    };
    direct.or_else(|| {
        let underlying = types.underlying(ty);
        if underlying != ty {
            method_of(types, underlying, name, depth + 1)
        } else {
            None
        }
    })
}
