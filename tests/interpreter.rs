#[cfg(test)]
mod interpreter_tests {
    use std::io::BufWriter;

    use rox::error::LoxError;
    use rox::interpreter::{Flow, Interpreter};
    use rox::parser::Parser;
    use rox::resolver::Resolver;
    use rox::scanner::Scanner;
    use rox::session::{RunError, Session};
    use rox::value::Value;

    /// Run a program in a fresh session; return what it printed and how it ended.
    fn run(source: &str) -> (String, Result<(), RunError>) {
        let mut session = Session::with_output(Vec::new());
        let result = session.run(source);
        let output = String::from_utf8(session.output().clone()).expect("utf-8 output");
        (output, result)
    }

    fn output_of(source: &str) -> String {
        let (output, result) = run(source);
        if let Err(e) = result {
            panic!("program failed: {}", e);
        }
        output
    }

    fn runtime_error(source: &str) -> (String, String) {
        match run(source) {
            (output, Err(RunError::Runtime(e))) => (output, e.to_string()),
            (_, other) => panic!("expected runtime error, got {:?}", other),
        }
    }

    // ── expressions ─────────────────────────────────────────────────────

    #[test]
    fn test_arithmetic() {
        assert_eq!(output_of("print (1 + 2) * 3;"), "9\n");
        assert_eq!(output_of("print 10 / 4;"), "2.5\n");
        assert_eq!(output_of("print -(3 - 5);"), "2\n");
        assert_eq!(output_of("print 1 / 0 > 1000;"), "true\n");
    }

    #[test]
    fn test_string_concatenation() {
        assert_eq!(output_of("print \"a\" + \"b\";"), "ab\n");
    }

    #[test]
    fn test_mixed_plus_is_a_runtime_error() {
        let (_, message) = runtime_error("print 1 + \"a\";");
        assert_eq!(
            message,
            "Operands of '+' must be two numbers or two strings.\n[line 1]"
        );
    }

    #[test]
    fn test_operator_type_errors_name_the_operator() {
        assert_eq!(
            runtime_error("print -\"x\";").1,
            "Operand of '-' must be a number.\n[line 1]"
        );
        assert_eq!(
            runtime_error("print 1 < nil;").1,
            "Operands of '<' must be numbers.\n[line 1]"
        );
        assert_eq!(
            runtime_error("\n\nprint \"a\" * 2;").1,
            "Operands of '*' must be numbers.\n[line 3]"
        );
    }

    #[test]
    fn test_comparison_and_equality() {
        let out = output_of(
            "print 1 < 2; print 2 <= 2; print 3 > 4; print 3 >= 4;
             print nil == nil; print 1 == \"1\"; print \"a\" == \"a\"; print true != false;",
        );
        assert_eq!(out, "true\ntrue\nfalse\nfalse\ntrue\nfalse\ntrue\ntrue\n");
    }

    #[test]
    fn test_truthiness() {
        let out = output_of(
            "if (0) print \"zero\"; if (\"\") print \"empty\";
             if (nil) print \"nil\"; else print \"else\"; print !nil; print !0;",
        );
        assert_eq!(out, "zero\nempty\nelse\ntrue\nfalse\n");
    }

    #[test]
    fn test_logical_operators_short_circuit_and_return_operands() {
        let out = output_of(
            "print nil or \"x\"; print 1 and 2; print false and undefined; print 1 or undefined;",
        );
        assert_eq!(out, "x\n2\nfalse\n1\n");
    }

    // ── scoping ─────────────────────────────────────────────────────────

    #[test]
    fn test_block_shadowing() {
        assert_eq!(
            output_of("var a = 1; { var a = 2; print a; } print a;"),
            "2\n1\n"
        );
    }

    #[test]
    fn test_assignment_reaches_outer_scope() {
        assert_eq!(
            output_of("var a = 1; { a = 2; { a = a + 1; } } print a;"),
            "3\n"
        );
    }

    #[test]
    fn test_closure_sees_binding_at_definition() {
        let out = output_of(
            "var a = \"global\";
             {
               fun showA() { print a; }
               showA();
               var a = \"block\";
               showA();
               print a;
             }",
        );
        assert_eq!(out, "global\nglobal\nblock\n");
    }

    #[test]
    fn test_undefined_variable() {
        let (_, message) = runtime_error("print nope;");
        assert_eq!(message, "Undefined variable 'nope'.\n[line 1]");

        let (_, message) = runtime_error("nope = 1;");
        assert_eq!(message, "Undefined variable 'nope'.\n[line 1]");
    }

    #[test]
    fn test_global_redeclaration_is_allowed() {
        assert_eq!(output_of("var a = 1; var a = 2; print a;"), "2\n");
    }

    #[test]
    fn test_local_redeclaration_stops_before_running() {
        let (output, result) = run("print \"before\"; { var a = 1; var a = 2; }");

        assert_eq!(output, "");
        assert!(matches!(result, Err(RunError::Static(ref errors)) if errors.len() == 1));
    }

    // ── control flow ────────────────────────────────────────────────────

    #[test]
    fn test_loops() {
        assert_eq!(
            output_of("var i = 0; while (i < 3) { print i; i = i + 1; }"),
            "0\n1\n2\n"
        );
        assert_eq!(
            output_of("var sum = 0; for (var i = 1; i <= 4; i = i + 1) sum = sum + i; print sum;"),
            "10\n"
        );
    }

    #[test]
    fn test_for_loop_closures_share_one_variable() {
        let out = output_of(
            "var f; for (var i = 0; i < 3; i = i + 1) { if (i == 1) { fun g() { print i; } f = g; } } f();",
        );
        assert_eq!(out, "3\n");
    }

    // ── functions ───────────────────────────────────────────────────────

    #[test]
    fn test_recursion() {
        let out = output_of(
            "fun fib(n) { if (n < 2) return n; return fib(n - 1) + fib(n - 2); } print fib(10);",
        );
        assert_eq!(out, "55\n");
    }

    #[test]
    fn test_return_unwinds_out_of_loops() {
        let out = output_of(
            "fun first(limit) { var i = 0; while (true) { if (i >= limit) return i; i = i + 1; } }
             print first(4);",
        );
        assert_eq!(out, "4\n");
    }

    #[test]
    fn test_function_without_return_yields_nil() {
        assert_eq!(output_of("fun f() {} print f();"), "nil\n");
        assert_eq!(output_of("fun f() { return; } print f();"), "nil\n");
    }

    #[test]
    fn test_closure_counter() {
        let out = output_of(
            "fun makeCounter() {
               var count = 0;
               fun increment() { count = count + 1; return count; }
               return increment;
             }
             var a = makeCounter();
             var b = makeCounter();
             print a(); print a(); print a();
             print b();",
        );
        assert_eq!(out, "1\n2\n3\n1\n");
    }

    #[test]
    fn test_sibling_closures_share_state() {
        let out = output_of(
            "var get; var set;
             {
               var x = 1;
               fun g() { return x; }
               fun s(v) { x = v; }
               get = g; set = s;
             }
             set(42);
             print get();",
        );
        assert_eq!(out, "42\n");
    }

    #[test]
    fn test_arity_mismatch() {
        let (_, message) = runtime_error("fun f(a, b) {} f(1);");
        assert_eq!(message, "Expected 2 arguments but got 1.\n[line 1]");

        let (_, message) = runtime_error("fun f(a, b) {} f(1, 2, 3);");
        assert_eq!(message, "Expected 2 arguments but got 3.\n[line 1]");
    }

    #[test]
    fn test_calling_a_non_callable() {
        let (_, message) = runtime_error("5();");
        assert_eq!(message, "Can only call functions and classes.\n[line 1]");

        let (_, message) = runtime_error("\"str\"();");
        assert_eq!(message, "Can only call functions and classes.\n[line 1]");
    }

    #[test]
    fn test_native_clock() {
        assert_eq!(output_of("print clock() > 0;"), "true\n");
        assert_eq!(output_of("print clock;"), "<native fn>\n");

        let (_, message) = runtime_error("clock(1);");
        assert_eq!(message, "Expected 0 arguments but got 1.\n[line 1]");
    }

    #[test]
    fn test_function_display_and_identity() {
        let out = output_of("fun f() {} var g = f; print f; print f == g; print f == clock;");
        assert_eq!(out, "<fn f>\ntrue\nfalse\n");
    }

    // ── classes ─────────────────────────────────────────────────────────

    #[test]
    fn test_fields_and_methods() {
        let out = output_of(
            "class Point {
               init(x, y) { this.x = x; this.y = y; }
               sum() { return this.x + this.y; }
             }
             var p = Point(1, 2);
             print p.sum();
             p.x = 10;
             print p.sum();
             print p;
             print Point;",
        );
        assert_eq!(out, "3\n12\nPoint instance\nPoint\n");
    }

    #[test]
    fn test_fields_shadow_methods() {
        let out = output_of(
            "class A { m() { return \"method\"; } }
             var a = A();
             print a.m();
             fun f() { return \"field\"; }
             a.m = f;
             print a.m();",
        );
        assert_eq!(out, "method\nfield\n");
    }

    #[test]
    fn test_bound_method_keeps_its_instance() {
        let out = output_of(
            "class Person {
               init(name) { this.name = name; }
               greet() { print \"hi \" + this.name; }
             }
             var greet = Person(\"ann\").greet;
             greet();",
        );
        assert_eq!(out, "hi ann\n");
    }

    #[test]
    fn test_instances_compare_by_identity() {
        let out = output_of("class A {} var a = A(); var b = A(); print a == b; print a == a;");
        assert_eq!(out, "false\ntrue\n");
    }

    #[test]
    fn test_inherited_method_sees_subclass_this() {
        let out = output_of(
            "class A {
               name() { return \"A\"; }
               describe() { print this.name(); }
             }
             class B < A { name() { return \"B\"; } }
             B().describe();
             A().describe();",
        );
        assert_eq!(out, "B\nA\n");
    }

    #[test]
    fn test_super_calls_start_above_the_defining_class() {
        let out = output_of(
            "class A { method() { print \"A method\"; } }
             class B < A {
               method() { print \"B method\"; }
               test() { super.method(); }
             }
             class C < B {}
             C().test();",
        );
        assert_eq!(out, "A method\n");
    }

    #[test]
    fn test_inherited_initializer_sets_arity() {
        let out = output_of(
            "class A { init(x) { this.x = x; } }
             class B < A {}
             print B(7).x;",
        );
        assert_eq!(out, "7\n");

        let (_, message) = runtime_error("class A { init(x) {} } A();");
        assert_eq!(message, "Expected 1 arguments but got 0.\n[line 1]");
    }

    #[test]
    fn test_initializer_returns_instance() {
        let out = output_of(
            "class P {
               init(x) { this.x = x; if (x > 0) return; this.x = -1; }
             }
             var p = P(3);
             print p.x;
             print p;
             print p.init(0);
             print p.x;",
        );
        assert_eq!(out, "3\nP instance\nP instance\n-1\n");
    }

    #[test]
    fn test_class_can_name_itself_in_methods() {
        assert_eq!(
            output_of("class A { make() { return A(); } } print A().make();"),
            "A instance\n"
        );
    }

    #[test]
    fn test_property_errors() {
        assert_eq!(
            runtime_error("var x = 1; print x.y;").1,
            "Only instances have properties.\n[line 1]"
        );
        assert_eq!(
            runtime_error("var x = 1; x.y = 2;").1,
            "Only instances have fields.\n[line 1]"
        );
        assert_eq!(
            runtime_error("class A {} print A().missing;").1,
            "Undefined property 'missing'.\n[line 1]"
        );
    }

    #[test]
    fn test_superclass_must_be_a_class() {
        let (_, message) = runtime_error("var NotClass = 1; class B < NotClass {}");
        assert_eq!(message, "Superclass must be a class.\n[line 1]");
    }

    // ── error propagation ───────────────────────────────────────────────

    #[test]
    fn test_runtime_error_stops_remaining_statements() {
        let (output, result) = run("print 1;\nprint -\"x\";\nprint 2;");

        assert_eq!(output, "1\n");
        let err = result.expect_err("runtime error");
        assert_eq!(err.exit_code(), 70);
    }

    #[test]
    fn test_runtime_error_inside_call_restores_scope() {
        let mut session = Session::with_output(Vec::new());

        assert!(session
            .run("var a = \"global\"; fun f() { var a = \"local\"; nope(); }")
            .is_ok());
        assert!(session.run("f();").is_err());
        assert!(session.run("print a;").is_ok());

        assert_eq!(session.output().as_slice(), b"global\n");
    }

    // ── direct interpreter use ──────────────────────────────────────────

    #[test]
    fn test_return_is_a_flow_not_an_error() {
        let (tokens, _) = Scanner::new("return 1;").scan_all();
        let statements = Parser::new(tokens).parse().expect("parse");

        let mut interpreter = Interpreter::with_output(Vec::new());
        let flow = interpreter.execute(&statements[0]).expect("no error");

        assert_eq!(flow, Flow::Return(Value::Number(1.0)));
    }

    #[test]
    fn test_interpreter_with_resolved_locals() {
        let (tokens, _) = Scanner::new("{ var a = 1; { a = a + 1; print a; } }").scan_all();
        let statements = Parser::new(tokens).parse().expect("parse");
        let locals = Resolver::new().resolve(&statements).expect("resolve");

        let mut interpreter = Interpreter::with_output(Vec::new());
        interpreter.resolve(locals);
        interpreter.interpret(&statements).expect("run");

        assert_eq!(interpreter.output().as_slice(), b"2\n");
    }

    #[test]
    fn test_output_is_flushed_when_a_runtime_error_stops_the_program() {
        let (tokens, _) = Scanner::new("print \"before\"; print -nil;").scan_all();
        let statements = Parser::new(tokens).parse().expect("parse");

        let mut interpreter = Interpreter::with_output(BufWriter::new(Vec::new()));
        assert!(interpreter.interpret(&statements).is_err());

        assert_eq!(interpreter.output().get_ref().as_slice(), b"before\n");
    }

    #[test]
    fn test_class_declared_in_a_block() {
        let out = output_of(
            "{ class Local { make() { return Local(); } } print Local().make(); }",
        );
        assert_eq!(out, "Local instance\n");
    }

    #[test]
    fn test_runtime_error_has_line() {
        let (tokens, _) = Scanner::new("\nprint nil + 1;").scan_all();
        let statements = Parser::new(tokens).parse().expect("parse");

        let mut interpreter = Interpreter::with_output(Vec::new());
        let err = interpreter.interpret(&statements).expect_err("type error");

        assert!(matches!(err, LoxError::Runtime { line: 2, .. }));
    }
}
