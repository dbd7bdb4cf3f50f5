use thiserror::Error;

/// A single syntax error, already formatted the way the compiler reports it
/// at the point of failure (clox-style `[line N] Error at 'lexeme': message`,
/// or `[line N] Error at end: message` when the error token is EOF). The
/// compiler keeps going after one of these to surface as many as it can in a
/// single pass rather than bailing out on the first.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("[line {line}] Error{}: {message}", at_clause(*.at_eof, .lexeme))]
pub struct CompileError {
    pub line: usize,
    pub lexeme: String,
    pub at_eof: bool,
    pub message: String,
}

fn at_clause(at_eof: bool, lexeme: &str) -> String {
    if at_eof {
        " at end".to_string()
    } else if lexeme.is_empty() {
        String::new()
    } else {
        format!(" at '{}'", lexeme)
    }
}

/// Runtime faults raised by the VM while executing a chunk. Each carries
/// enough detail to render clox's one-line runtime error plus the call stack
/// trace the VM appends separately.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeError {
    #[error("Operand must be a number.")]
    OperandMustBeNumber,
    #[error("Operands must be numbers.")]
    OperandsMustBeNumbers,
    #[error("Operands must be two numbers or two strings.")]
    OperandsMustMatch,
    #[error("Undefined variable '{0}'.")]
    UndefinedVariable(String),
    #[error("Only instances have properties.")]
    OnlyInstancesHaveProperties,
    #[error("Undefined property '{0}'.")]
    UndefinedProperty(String),
    #[error("Can only call functions and classes.")]
    NotCallable,
    #[error("Expected {expected} arguments but got {got}.")]
    ArityMismatch { expected: usize, got: usize },
    #[error("Superclass must be a class.")]
    SuperclassMustBeClass,
    #[error("Only instances have fields.")]
    OnlyInstancesHaveFields,
    #[error("Stack overflow.")]
    StackOverflow,
    #[error("{0}")]
    Native(String),
}

/// The top-level failure modes a whole `lox` run can end in, mapped
/// one-to-one onto the CLI's process exit codes.
#[derive(Debug, Error)]
pub enum LoxError {
    #[error("{}", .0.iter().map(ToString::to_string).collect::<Vec<_>>().join("\n"))]
    Compile(Vec<CompileError>),
    #[error("{0}\n{trace}", trace = .1.join("\n"))]
    Runtime(RuntimeError, Vec<String>),
}

impl LoxError {
    /// The `sysexits.h` code clox's `main` returns for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            LoxError::Compile(_) => 65,
            LoxError::Runtime(..) => 70,
        }
    }
}

pub type VmResult<T> = Result<T, RuntimeError>;
