use std::rc::Rc;

use crate::chunk::Chunk;
use crate::table::Table;
use crate::value::{ObjRef, Value};

/// A compiled function body: name, arity, and the bytecode that implements
/// it. Shared by value (`Rc`) rather than living in the GC arena — functions
/// are immutable once compiled and never form a cycle with anything the
/// collector needs to reclaim, so reference counting them is cheaper than
/// giving every one an arena slot.
#[derive(Debug)]
pub struct LoxFunction {
    pub name: Option<ObjRef>, // None for the top-level script
    pub arity: usize,
    pub upvalue_count: usize,
    pub chunk: Chunk,
}

impl LoxFunction {
    pub fn new(name: Option<ObjRef>) -> Self {
        LoxFunction { name, arity: 0, upvalue_count: 0, chunk: Chunk::new() }
    }
}

/// Describes where a closure's Nth upvalue is captured from, as emitted by
/// the compiler alongside `Op::Closure`.
#[derive(Debug, Clone, Copy)]
pub struct UpvalueDesc {
    pub is_local: bool,
    pub index: u8,
}

#[derive(Debug)]
pub struct Closure {
    pub function: Rc<LoxFunction>,
    pub upvalues: Vec<ObjRef>, // each points at an Obj::Upvalue
}

/// An upvalue is either "open" (pointing at a slot still live on the VM
/// stack) or "closed" (the value has been hoisted into this object because
/// the frame that owned the slot returned). Real closures share a single
/// open upvalue across every closure that captured the same local, matching
/// clox's semantics for mutation visible across sibling closures.
#[derive(Debug, Clone, Copy)]
pub enum Upvalue {
    Open(usize),  // absolute index into the VM value stack
    Closed(Value),
}

#[derive(Debug)]
pub struct Class {
    pub name: ObjRef,
    pub methods: Table<ObjRef>, // name -> Obj::Closure
}

impl Class {
    pub fn new(name: ObjRef) -> Self {
        Class { name, methods: Table::new() }
    }
}

#[derive(Debug)]
pub struct Instance {
    pub class: ObjRef,
    pub fields: Table<Value>,
}

impl Instance {
    pub fn new(class: ObjRef) -> Self {
        Instance { class, fields: Table::new() }
    }
}

#[derive(Debug)]
pub struct BoundMethod {
    pub receiver: Value,
    pub method: ObjRef, // Obj::Closure
}

pub type NativeFn = fn(&[Value]) -> Result<Value, String>;

/// Every heap-allocated Lox value. Strings live here too (rather than being
/// plain `Rc<str>`) so the collector can account for and reclaim them the
/// same way it does every other object — string-heavy programs are the
/// common case clox's GC is built to handle.
#[derive(Debug)]
pub enum Obj {
    String(String, u32), // bytes + cached FNV-1a hash
    Function(Rc<LoxFunction>),
    Closure(Closure),
    Upvalue(Upvalue),
    Class(Class),
    Instance(Instance),
    BoundMethod(BoundMethod),
    Native(String, NativeFn),
}

impl Obj {
    pub fn type_name(&self) -> &'static str {
        match self {
            Obj::String(..) => "string",
            Obj::Function(_) => "function",
            Obj::Closure(_) => "function",
            Obj::Upvalue(_) => "upvalue",
            Obj::Class(_) => "class",
            Obj::Instance(_) => "instance",
            Obj::BoundMethod(_) => "bound method",
            Obj::Native(..) => "native function",
        }
    }
}
