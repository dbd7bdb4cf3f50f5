pub mod chunk;
pub mod compiler;
pub mod error;
pub mod gc;
pub mod object;
pub mod opcode;
pub mod stdlib;
pub mod table;
pub mod value;
pub mod vm;

pub use compiler::Compiler;
pub use error::{CompileError, LoxError, RuntimeError, VmResult};
pub use gc::Heap;
pub use value::Value;
pub use vm::Vm;

/// Compiles and runs `source` in a fresh [`Vm`]. This is the entry point the
/// CLI drives for one-shot file execution.
pub fn interpret(source: &str) -> Result<Value, LoxError> {
    let mut vm = Vm::new();
    interpret_in(&mut vm, source)
}

/// Compiles and runs `source` against an existing [`Vm`], so globals and
/// function/class definitions persist across calls — what the REPL needs to
/// let one line build on the next. On a runtime error the VM's stack trace is
/// captured in the returned [`LoxError::Runtime`].
pub fn interpret_in(vm: &mut Vm, source: &str) -> Result<Value, LoxError> {
    let function = Compiler::compile(source, vm.heap_mut()).map_err(LoxError::Compile)?;
    vm.interpret(function).map_err(|e| {
        let trace = vm.build_trace();
        LoxError::Runtime(e, trace)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Compiles and runs `src` against a VM whose `print` output is captured
    /// rather than sent to the real stdout, returning exactly what was
    /// printed so callers can `assert_eq!` against it.
    fn run_ok(src: &str) -> String {
        let (mut vm, stdout) = Vm::capturing_stdout();
        let function = Compiler::compile(src, vm.heap_mut()).expect("compile error");
        vm.interpret(function).unwrap_or_else(|e| panic!("runtime error: {e}"));
        String::from_utf8(stdout.borrow().clone()).expect("print output must be valid UTF-8")
    }

    fn expect_compile_error(src: &str) {
        let mut vm = Vm::new();
        assert!(Compiler::compile(src, vm.heap_mut()).is_err());
    }

    fn expect_runtime_error(src: &str) -> RuntimeError {
        let mut vm = Vm::new();
        let function = Compiler::compile(src, vm.heap_mut()).expect("expected a clean compile");
        vm.interpret(function).expect_err("expected a runtime error")
    }

    // ── End-to-end scenarios from the language spec ────────────────────────

    #[test]
    fn arithmetic_precedence() {
        assert_eq!(run_ok("print 1 + 2 * 3;"), "7\n");
    }

    #[test]
    fn string_concatenation() {
        assert_eq!(run_ok(r#"var a = "hi "; var b = "world"; print a + b;"#), "hi world\n");
    }

    #[test]
    fn recursive_fibonacci() {
        assert_eq!(run_ok("fun f(x) { if (x < 2) return 1; return f(x-1) + f(x-2); } print f(6);"), "13\n");
    }

    #[test]
    fn closures_share_captured_local() {
        let out = run_ok(
            "fun mk() { var i = 0; fun inc() { i = i + 1; return i; } return inc; }
             var c = mk(); print c(); print c(); print c();",
        );
        assert_eq!(out, "1\n2\n3\n");
    }

    #[test]
    fn single_inheritance_and_super() {
        let out = run_ok(
            "class A { greet() { print \"A\"; } }
             class B < A { greet() { super.greet(); print \"B\"; } }
             B().greet();",
        );
        assert_eq!(out, "A\nB\n");
    }

    #[test]
    fn initializer_and_field_mutation() {
        let out = run_ok(
            "class Box { init(x) { this.x = x; } }
             var b = Box(7); print b.x; b.x = b.x + 1; print b.x;",
        );
        assert_eq!(out, "7\n8\n");
    }

    // ── Error scenarios ──────────────────────────────────────────────────

    #[test]
    fn undefined_global_is_a_runtime_error() {
        let err = expect_runtime_error("print a;");
        assert_eq!(err, RuntimeError::UndefinedVariable("a".to_string()));
    }

    #[test]
    fn mixed_type_addition_is_a_runtime_error() {
        let err = expect_runtime_error(r#"1 + "x";"#);
        assert_eq!(err, RuntimeError::OperandsMustMatch);
    }

    #[test]
    fn non_numeric_binary_arithmetic_reports_plural_operands_message() {
        let err = expect_runtime_error(r#"3 - "x";"#);
        assert_eq!(err, RuntimeError::OperandsMustBeNumbers);
        assert_eq!(err.to_string(), "Operands must be numbers.");
    }

    #[test]
    fn non_numeric_comparison_reports_plural_operands_message() {
        let err = expect_runtime_error(r#"5 < "x";"#);
        assert_eq!(err, RuntimeError::OperandsMustBeNumbers);
    }

    #[test]
    fn negating_a_non_number_reports_singular_operand_message() {
        let err = expect_runtime_error(r#"-"x";"#);
        assert_eq!(err, RuntimeError::OperandMustBeNumber);
        assert_eq!(err.to_string(), "Operand must be a number.");
    }

    #[test]
    fn class_cannot_inherit_from_itself() {
        expect_compile_error("fun f() { return; } class C < C {}");
    }

    #[test]
    fn setting_a_field_on_a_non_instance_is_a_runtime_error() {
        let err = expect_runtime_error("var x = 1; x.y = 2;");
        assert_eq!(err, RuntimeError::OnlyInstancesHaveFields);
    }

    #[test]
    fn getting_a_property_on_a_non_instance_is_a_runtime_error() {
        let err = expect_runtime_error("var x = 1; print x.y;");
        assert_eq!(err, RuntimeError::OnlyInstancesHaveProperties);
    }

    #[test]
    fn repl_style_interpretation_persists_globals_across_calls() {
        let (mut vm, stdout) = Vm::capturing_stdout();
        let a = Compiler::compile("var x = 1;", vm.heap_mut()).expect("compile error");
        vm.interpret(a).expect("runtime error");
        let b = Compiler::compile("x = x + 1; print x;", vm.heap_mut()).expect("compile error");
        vm.interpret(b).expect("runtime error");
        assert_eq!(String::from_utf8(stdout.borrow().clone()).unwrap(), "2\n");
    }

    // ── Values, truthiness, control flow ─────────────────────────────────

    #[test]
    fn nil_and_false_are_falsey() {
        assert_eq!(run_ok("if (nil) { print \"no\"; } if (false) { print \"no\"; } print \"ok\";"), "ok\n");
    }

    #[test]
    fn while_loop_accumulates() {
        assert_eq!(run_ok("var i = 0; var s = 0; while (i < 5) { s = s + i; i = i + 1; } print s;"), "10\n");
    }

    #[test]
    fn for_loop_desugars_correctly() {
        assert_eq!(run_ok("var s = 0; for (var i = 0; i < 5; i = i + 1) { s = s + i; } print s;"), "10\n");
    }

    #[test]
    fn logical_operators_short_circuit() {
        assert_eq!(run_ok("print true or (1/0 == 1); print false and (1/0 == 1);"), "true\nfalse\n");
    }

    #[test]
    fn functions_are_first_class_values() {
        assert_eq!(run_ok("fun id(x) { return x; } var f = id; print f(42);"), "42\n");
    }

    #[test]
    fn bound_methods_keep_receiver() {
        let out = run_ok(
            "class Counter { init() { this.n = 0; } bump() { this.n = this.n + 1; return this.n; } }
             var c = Counter(); var m = c.bump; print m(); print m();",
        );
        assert_eq!(out, "1\n2\n");
    }

    #[test]
    fn clock_native_returns_a_number() {
        assert_eq!(run_ok("var t = clock(); print t >= 0;"), "true\n");
    }

    #[test]
    fn calling_a_non_callable_is_a_runtime_error() {
        let err = expect_runtime_error("var x = 1; x();");
        assert_eq!(err, RuntimeError::NotCallable);
    }

    #[test]
    fn arity_mismatch_is_a_runtime_error() {
        let err = expect_runtime_error("fun f(a, b) { return a + b; } f(1);");
        assert!(matches!(err, RuntimeError::ArityMismatch { expected: 2, got: 1 }));
    }

    #[test]
    fn this_outside_class_is_a_compile_error() {
        expect_compile_error("print this;");
    }

    #[test]
    fn super_without_superclass_is_a_compile_error() {
        expect_compile_error("class A { f() { super.f(); } }");
    }
}
