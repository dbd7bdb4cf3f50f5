use num_enum::{IntoPrimitive, TryFromPrimitive};

/// The bytecode instruction set (Lox VM).
///
/// Every instruction is encoded as one opcode byte followed by zero or more
/// operand bytes. Operand widths:
///   - `[u8]`  → one-byte operand (slot index, arg count, upvalue count)
///   - `[u16]` → two-byte big-endian operand (constant/name pool index)
///   - jump/loop offsets are two-byte big-endian, unsigned (direction is implied by the opcode)
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
pub enum Op {
    /// `Constant [u16]` — push constants[idx]
    Constant,
    Nil,
    True,
    False,

    Pop,

    /// `GetLocal [u8]` — push frame.slots[idx]
    GetLocal,
    /// `SetLocal [u8]` — frame.slots[idx] = peek(0), does not pop
    SetLocal,
    /// `GetGlobal [u16]` — push globals[names[idx]]
    GetGlobal,
    /// `DefineGlobal [u16]` — globals[names[idx]] = pop()
    DefineGlobal,
    /// `SetGlobal [u16]` — globals[names[idx]] = peek(0), does not pop
    SetGlobal,
    /// `GetUpvalue [u8]`
    GetUpvalue,
    /// `SetUpvalue [u8]`
    SetUpvalue,
    /// `GetProperty [u16:name_idx]` — pop instance, push instance.field (or bound method)
    GetProperty,
    /// `SetProperty [u16:name_idx]` — pop value, pop instance, instance.field = value, push value
    SetProperty,
    /// `GetSuper [u16:name_idx]` — pop superclass, pop instance, push bound method
    GetSuper,

    Equal,
    Greater,
    Less,

    Add,
    Subtract,
    Multiply,
    Divide,
    Not,
    Negate,

    Print,

    /// `Jump [u16]` — unconditional forward jump
    Jump,
    /// `JumpIfFalse [u16]` — forward jump if peek(0) is falsy, does not pop
    JumpIfFalse,
    /// `Loop [u16]` — unconditional backward jump
    Loop,

    /// `Call [u8:argc]`
    Call,
    /// `Invoke [u16:name_idx] [u8:argc]` — fused GetProperty + Call for method calls
    Invoke,
    /// `SuperInvoke [u16:name_idx] [u8:argc]` — fused GetSuper + Call
    SuperInvoke,
    /// `Closure [u16:fn_idx] [u8:n_upvalues] then, per upvalue: [u8:is_local] [u8:index]`
    Closure,
    /// `CloseUpvalue` — closes the local at the top of the stack, then pops it
    CloseUpvalue,
    Return,

    /// `Class [u16:name_idx]` — push new class
    Class,
    /// `Inherit` — pop subclass, peek(0) = superclass; copies superclass methods
    Inherit,
    /// `Method [u16:name_idx]` — pop closure, bind as method on peek(0) (the class)
    Method,
}



impl Op {
    /// Number of operand bytes that follow this opcode. `Closure`'s operand
    /// count is variable (depends on upvalue count) so it is handled
    /// separately by callers that walk the bytecode.
    pub fn operand_bytes(self) -> usize {
        match self {
            Op::Constant
            | Op::GetGlobal
            | Op::DefineGlobal
            | Op::SetGlobal
            | Op::GetProperty
            | Op::SetProperty
            | Op::GetSuper
            | Op::Jump
            | Op::JumpIfFalse
            | Op::Loop
            | Op::Class
            | Op::Method => 2,
            Op::GetLocal | Op::SetLocal | Op::GetUpvalue | Op::SetUpvalue | Op::Call => 1,
            Op::Invoke | Op::SuperInvoke => 3, // [u16 name] [u8 argc]
            _ => 0,
        }
    }
}

impl std::fmt::Display for Op {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}
