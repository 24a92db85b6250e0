// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! ProgramBuilder - helper for program construction by front ends and tests.

use std::collections::HashMap;

use crate::{
    Block, BlockId, CallCommon, Callee, Field, FieldId, FileId, FuncId, Function, Instr, InstrId,
    InstrKind, Method, MethodId, Pos, Program, TypeId, TypeKind, TypeTable, Value, ValueId,
    ValueKind,
};

pub struct ProgramBuilder {
    types: TypeTable,
    interned: HashMap<TypeKind, TypeId>,
    files: Vec<String>,
    values: Vec<Value>,
    instrs: Vec<Instr>,
    funcs: Vec<Function>,
}

impl Default for ProgramBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgramBuilder {
    pub fn new() -> Self {
        Self {
            types: TypeTable::default(),
            interned: HashMap::new(),
            files: Vec::new(),
            values: Vec::new(),
            instrs: Vec::new(),
            funcs: Vec::new(),
        }
    }

    pub fn file(&mut self, name: impl Into<String>) -> FileId {
        let name = name.into();
        if let Some(i) = self.files.iter().position(|f| *f == name) {
            return FileId(i as u32);
        }
        self.files.push(name);
        FileId(self.files.len() as u32 - 1)
    }

    // === Types ===

    fn push_type(&mut self, kind: TypeKind) -> TypeId {
        self.types.types.push(kind);
        TypeId(self.types.types.len() as u32 - 1)
    }

    fn intern(&mut self, kind: TypeKind) -> TypeId {
        if let Some(id) = self.interned.get(&kind) {
            return *id;
        }
        let id = self.push_type(kind.clone());
        self.interned.insert(kind, id);
        id
    }

    pub fn basic(&mut self, name: &str) -> TypeId {
        self.intern(TypeKind::Basic(name.to_string()))
    }

    /// Declare a named type. Its underlying type is set separately so that
    /// self-referential types can be built.
    pub fn named(&mut self, package: &str, name: &str) -> TypeId {
        self.push_type(TypeKind::Named {
            package: package.to_string(),
            name: name.to_string(),
            underlying: None,
            methods: Vec::new(),
        })
    }

    pub fn set_underlying(&mut self, named: TypeId, underlying: TypeId) {
        if let TypeKind::Named { underlying: u, .. } = &mut self.types.types[named.0 as usize] {
            *u = Some(underlying);
        }
    }

    pub fn alias(&mut self, package: &str, name: &str, target: TypeId) -> TypeId {
        self.push_type(TypeKind::Alias {
            package: package.to_string(),
            name: name.to_string(),
            target,
        })
    }

    pub fn pointer(&mut self, elem: TypeId) -> TypeId {
        self.intern(TypeKind::Pointer(elem))
    }

    pub fn slice(&mut self, elem: TypeId) -> TypeId {
        self.intern(TypeKind::Slice(elem))
    }

    pub fn map(&mut self, key: TypeId, value: TypeId) -> TypeId {
        self.intern(TypeKind::Map { key, value })
    }

    pub fn tuple(&mut self, elems: &[TypeId]) -> TypeId {
        self.intern(TypeKind::Tuple(elems.to_vec()))
    }

    pub fn signature(&mut self, recv: Option<TypeId>, params: &[TypeId], results: &[TypeId]) -> TypeId {
        self.intern(TypeKind::Signature {
            recv,
            params: params.to_vec(),
            results: results.to_vec(),
        })
    }

    pub fn struct_type(&mut self, fields: &[(&str, TypeId)]) -> TypeId {
        let ids = fields
            .iter()
            .map(|(name, ty)| {
                self.types.fields.push(Field {
                    name: name.to_string(),
                    ty: *ty,
                    embedded: false,
                });
                FieldId(self.types.fields.len() as u32 - 1)
            })
            .collect();
        self.push_type(TypeKind::Struct(ids))
    }

    fn push_method(&mut self, method: Method) -> MethodId {
        self.types.methods.push(method);
        MethodId(self.types.methods.len() as u32 - 1)
    }

    /// Abstract interface method. `signature` defaults to `func()`.
    pub fn interface_method(&mut self, name: &str, signature: Option<TypeId>) -> MethodId {
        let signature = match signature {
            Some(s) => s,
            None => self.signature(None, &[], &[]),
        };
        self.push_method(Method {
            name: name.to_string(),
            signature,
            func: None,
        })
    }

    /// Interface type. Pass embedded interfaces' methods along with the
    /// declared ones so they keep their identity.
    pub fn interface(&mut self, methods: &[MethodId]) -> TypeId {
        self.push_type(TypeKind::Interface(methods.to_vec()))
    }

    /// Concrete method on a named type, optionally backed by a function.
    pub fn add_method(&mut self, named: TypeId, name: &str, signature: TypeId, func: Option<FuncId>) -> MethodId {
        let id = self.push_method(Method {
            name: name.to_string(),
            signature,
            func,
        });
        if let TypeKind::Named { methods, .. } = &mut self.types.types[named.0 as usize] {
            methods.push(id);
        }
        id
    }

    pub fn invalid_type(&mut self) -> TypeId {
        self.basic("invalid type")
    }

    // === Values ===

    fn push_value(&mut self, ty: TypeId, name: String, kind: ValueKind) -> ValueId {
        self.values.push(Value {
            ty,
            name,
            kind,
            referrers: Vec::new(),
        });
        ValueId(self.values.len() as u32 - 1)
    }

    pub fn constant(&mut self, ty: TypeId, text: &str) -> ValueId {
        self.push_value(ty, text.to_string(), ValueKind::Const(text.to_string()))
    }

    /// Address of a package-level variable of type `ty`.
    pub fn global(&mut self, package: &str, name: &str, ty: TypeId) -> ValueId {
        let ptr = self.pointer(ty);
        self.push_value(
            ptr,
            name.to_string(),
            ValueKind::Global {
                package: package.to_string(),
            },
        )
    }

    pub fn func_value(&mut self, func: FuncId) -> ValueId {
        let f = &self.funcs[func.0 as usize];
        let (ty, name) = (f.signature, f.name.clone());
        self.push_value(ty, name, ValueKind::Func(func))
    }

    // === Functions ===

    /// Declare a function. Without a body it stays external.
    pub fn declare(&mut self, package: &str, name: &str, signature: TypeId, file: FileId) -> FuncId {
        let id = FuncId(self.funcs.len() as u32);
        self.funcs.push(Function {
            id,
            package: package.to_string(),
            name: name.to_string(),
            signature,
            params: Vec::new(),
            free_vars: Vec::new(),
            blocks: Vec::new(),
            parent: None,
            pos: Pos::new(file, 0, 0),
        });
        id
    }

    /// Declare an anonymous function nested in `parent`.
    pub fn declare_closure(&mut self, parent: FuncId, signature: TypeId) -> FuncId {
        let (package, name, pos) = {
            let p = &self.funcs[parent.0 as usize];
            let n = self.funcs.iter().filter(|f| f.parent == Some(parent)).count() + 1;
            (p.package.clone(), format!("{}$func{}", p.name, n), p.pos)
        };
        let id = self.declare(&package, &name, signature, pos.file);
        self.funcs[id.0 as usize].parent = Some(parent);
        id
    }

    /// Start (or continue) building the body of `func`.
    pub fn body(&mut self, func: FuncId) -> FunctionBuilder<'_> {
        let f = &mut self.funcs[func.0 as usize];
        if f.blocks.is_empty() {
            f.blocks.push(Block {
                id: BlockId(0),
                instrs: Vec::new(),
            });
        }
        let pos = f.pos;
        let next_temp = f.blocks.iter().map(|b| b.instrs.len() as u32).sum();
        FunctionBuilder {
            prog: self,
            func,
            current: BlockId(0),
            pos,
            next_temp,
        }
    }

    pub fn finish(self) -> Program {
        let mut program = Program {
            types: self.types,
            files: self.files,
            values: self.values,
            instrs: self.instrs,
            funcs: self.funcs,
        };
        program.link();
        program
    }
}

/// Appends instructions to one function, at a movable "current" block and
/// source position.
pub struct FunctionBuilder<'a> {
    prog: &'a mut ProgramBuilder,
    func: FuncId,
    current: BlockId,
    pos: Pos,
    next_temp: u32,
}

impl<'a> FunctionBuilder<'a> {
    pub fn id(&self) -> FuncId {
        self.func
    }

    fn function(&mut self) -> &mut Function {
        &mut self.prog.funcs[self.func.0 as usize]
    }

    /// Set the source position of the following instructions.
    pub fn at(&mut self, line: u32, column: u32) -> &mut Self {
        self.pos.line = line;
        self.pos.column = column;
        self
    }

    pub fn param(&mut self, name: &str, ty: TypeId) -> ValueId {
        let index = self.function().params.len() as u32;
        let v = self.prog.push_value(
            ty,
            name.to_string(),
            ValueKind::Param {
                func: self.func,
                index,
            },
        );
        self.function().params.push(v);
        v
    }

    pub fn free_var(&mut self, name: &str, ty: TypeId) -> ValueId {
        let index = self.function().free_vars.len() as u32;
        let v = self.prog.push_value(
            ty,
            name.to_string(),
            ValueKind::FreeVar {
                func: self.func,
                index,
            },
        );
        self.function().free_vars.push(v);
        v
    }

    pub fn new_block(&mut self) -> BlockId {
        let f = self.function();
        let id = BlockId(f.blocks.len() as u32);
        f.blocks.push(Block {
            id,
            instrs: Vec::new(),
        });
        id
    }

    pub fn switch_to(&mut self, block: BlockId) {
        self.current = block;
    }

    fn push(&mut self, kind: InstrKind, result_ty: Option<TypeId>, name: Option<&str>) -> Option<ValueId> {
        let id = InstrId(self.prog.instrs.len() as u32);
        let result = result_ty.map(|ty| {
            let name = match name {
                Some(n) => n.to_string(),
                None => format!("t{}", self.next_temp),
            };
            self.next_temp += 1;
            self.prog.push_value(ty, name, ValueKind::Instr(id))
        });
        self.prog.instrs.push(Instr {
            kind,
            func: self.func,
            block: self.current,
            pos: self.pos,
            result,
        });
        let block = self.current.0 as usize;
        self.function().blocks[block].instrs.push(id);
        result
    }

    fn push_value(&mut self, kind: InstrKind, ty: TypeId, name: Option<&str>) -> ValueId {
        match self.push(kind, Some(ty), name) {
            Some(v) => v,
            None => unreachable!("instruction with a result type defines a value"),
        }
    }

    fn result_type(&mut self, callee: &Callee) -> TypeId {
        let sig = match callee {
            Callee::Static(f) => self.prog.funcs[f.0 as usize].signature,
            Callee::Value(v) => self.prog.values[v.0 as usize].ty,
            Callee::Invoke { method, .. } => self.prog.types.method(*method).signature,
        };
        let results = match self.prog.types.signature(sig).map(|(_, _, r)| r.to_vec()) {
            Some(results) => results,
            None => return self.prog.invalid_type(),
        };
        if results.len() == 1 {
            results[0]
        } else {
            self.prog.tuple(&results)
        }
    }

    // === Calls ===

    /// Call; the result is the single result, or a tuple of all of them.
    pub fn call(&mut self, callee: Callee, args: &[ValueId]) -> ValueId {
        let ty = self.result_type(&callee);
        let call = CallCommon {
            callee,
            args: args.to_vec(),
        };
        self.push_value(InstrKind::Call(call), ty, None)
    }

    pub fn call_static(&mut self, func: FuncId, args: &[ValueId]) -> ValueId {
        self.call(Callee::Static(func), args)
    }

    pub fn call_value(&mut self, func: ValueId, args: &[ValueId]) -> ValueId {
        self.call(Callee::Value(func), args)
    }

    pub fn invoke(&mut self, recv: ValueId, method: MethodId, args: &[ValueId]) -> ValueId {
        self.call(Callee::Invoke { recv, method }, args)
    }

    pub fn defer(&mut self, callee: Callee, args: &[ValueId]) {
        let call = CallCommon {
            callee,
            args: args.to_vec(),
        };
        self.push(InstrKind::Defer(call), None, None);
    }

    pub fn defer_static(&mut self, func: FuncId, args: &[ValueId]) {
        self.defer(Callee::Static(func), args);
    }

    pub fn defer_value(&mut self, func: ValueId, args: &[ValueId]) {
        self.defer(Callee::Value(func), args);
    }

    pub fn defer_invoke(&mut self, recv: ValueId, method: MethodId, args: &[ValueId]) {
        self.defer(Callee::Invoke { recv, method }, args);
    }

    // === Memory and projections ===

    pub fn extract(&mut self, tuple: ValueId, index: u32) -> ValueId {
        let tuple_ty = self.prog.values[tuple.0 as usize].ty;
        let elem = self
            .prog
            .types
            .tuple_elems(tuple_ty)
            .and_then(|elems| elems.get(index as usize).copied());
        let ty = match elem {
            Some(ty) => ty,
            None => self.prog.invalid_type(),
        };
        self.push_value(InstrKind::Extract { tuple, index }, ty, None)
    }

    pub fn field_addr(&mut self, base: ValueId, field: u32) -> ValueId {
        let base_ty = self.prog.values[base.0 as usize].ty;
        let ty = match self.prog.types.field_at(base_ty, field) {
            Some(f) => {
                let field_ty = self.prog.types.field(f).ty;
                self.prog.pointer(field_ty)
            }
            None => self.prog.invalid_type(),
        };
        self.push_value(InstrKind::FieldAddr { base, field }, ty, None)
    }

    /// `field_addr` by field name; unknown names address field 0 of an
    /// invalid type.
    pub fn field_addr_named(&mut self, base: ValueId, name: &str) -> ValueId {
        let base_ty = self.prog.values[base.0 as usize].ty;
        let index = self
            .prog
            .types
            .struct_fields(base_ty)
            .and_then(|fs| fs.iter().position(|f| self.prog.types.field(*f).name == name));
        match index {
            Some(i) => self.field_addr(base, i as u32),
            None => {
                let ty = self.prog.invalid_type();
                self.push_value(InstrKind::FieldAddr { base, field: u32::MAX }, ty, None)
            }
        }
    }

    pub fn deref(&mut self, addr: ValueId) -> ValueId {
        let addr_ty = self.prog.values[addr.0 as usize].ty;
        let ty = match self.prog.types.pointer_elem(addr_ty) {
            Some(elem) => elem,
            None => self.prog.invalid_type(),
        };
        self.push_value(InstrKind::Deref { addr }, ty, None)
    }

    pub fn store(&mut self, addr: ValueId, value: ValueId) {
        self.push(InstrKind::Store { addr, value }, None, None);
    }

    /// Heap cell for variable `name` of type `ty`; the value is its address.
    pub fn alloc(&mut self, name: &str, ty: TypeId) -> ValueId {
        let ptr = self.prog.pointer(ty);
        self.push_value(InstrKind::Alloc { heap: true }, ptr, Some(name))
    }

    pub fn upcast(&mut self, value: ValueId, iface: TypeId) -> ValueId {
        self.push_value(InstrKind::InterfaceUpcast { value }, iface, None)
    }

    pub fn make_closure(&mut self, func: FuncId, bindings: &[ValueId]) -> ValueId {
        let ty = self.prog.funcs[func.0 as usize].signature;
        let kind = InstrKind::MakeClosure {
            func,
            bindings: bindings.to_vec(),
        };
        self.push_value(kind, ty, None)
    }

    // === Control flow and the rest ===

    pub fn ret(&mut self, results: &[ValueId]) {
        let kind = InstrKind::Return {
            results: results.to_vec(),
        };
        self.push(kind, None, None);
    }

    pub fn jump(&mut self, target: BlockId) {
        let kind = InstrKind::Other {
            op: format!("jump {}", target.0),
            operands: Vec::new(),
        };
        self.push(kind, None, None);
    }

    pub fn branch(&mut self, cond: ValueId, then_block: BlockId, else_block: BlockId) {
        let kind = InstrKind::Other {
            op: format!("if {} {}", then_block.0, else_block.0),
            operands: vec![cond],
        };
        self.push(kind, None, None);
    }

    pub fn constant(&mut self, ty: TypeId, text: &str) -> ValueId {
        self.prog.constant(ty, text)
    }

    /// Instruction the analysis has no rule for.
    pub fn other(&mut self, op: &str, operands: &[ValueId], ty: Option<TypeId>) -> Option<ValueId> {
        let kind = InstrKind::Other {
            op: op.to_string(),
            operands: operands.to_vec(),
        };
        self.push(kind, ty, None)
    }
}
