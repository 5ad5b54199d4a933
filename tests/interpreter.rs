#[cfg(test)]
mod interpreter_tests {
    use rox as lox;

    use std::cell::RefCell;
    use std::io::{self, Write};
    use std::rc::Rc;

    use lox::error::LoxError;
    use lox::runner::{Lox, RunReport};
    use lox::value::Value;

    /// Cloneable in-memory sink so a test can read what the session printed.
    #[derive(Clone, Default)]
    struct Captured(Rc<RefCell<Vec<u8>>>);

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Captured {
        fn text(&self) -> String {
            String::from_utf8(self.0.borrow().clone()).unwrap()
        }
    }

    fn session() -> (Lox, Captured) {
        let out = Captured::default();
        (Lox::with_output(Box::new(out.clone())), out)
    }

    fn run(source: &str) -> (RunReport, String) {
        let (mut lox, out) = session();
        let report = lox.run(source);
        (report, out.text())
    }

    fn run_ok(source: &str) -> String {
        let (report, output) = run(source);
        let errors: Vec<String> = report.errors().map(|e| e.to_string()).collect();
        assert!(errors.is_empty(), "unexpected errors: {:?}", errors);
        output
    }

    fn runtime_error(source: &str) -> String {
        let (report, _) = run(source);
        assert!(!report.had_error());
        report
            .runtime_error
            .expect("expected a runtime error")
            .to_string()
    }

    #[test]
    fn test_arithmetic_and_number_formatting() {
        assert_eq!(
            run_ok("print 1 + 2; print 7 / 2; print 2 * 3.5; print -0.5 + 0.5; print 1 / 0;"),
            "3\n3.5\n7\n0\ninf\n"
        );
    }

    #[test]
    fn test_strings_and_equality() {
        let source = r#"
            print "foo" + "bar";
            print nil == nil;
            print nil == false;
            print 1 == "1";
            print "a" != "b";
            print 0 == -0;
        "#;

        assert_eq!(run_ok(source), "foobar\ntrue\nfalse\nfalse\ntrue\ntrue\n");
    }

    #[test]
    fn test_truthiness_and_short_circuit() {
        let source = r#"
            print !nil;
            print !0;
            print false and (1/0);
            print true or (1/0);
            print nil or "fallback";
            print 1 and 2;
            if ("") print "empty string is truthy";
        "#;

        assert_eq!(
            run_ok(source),
            "true\nfalse\nfalse\ntrue\nfallback\n2\nempty string is truthy\n"
        );
    }

    #[test]
    fn test_short_circuit_skips_side_effects() {
        let source = r#"
            var calls = 0;
            fun bump() { calls = calls + 1; return true; }
            true or bump();
            false and bump();
            print calls;
        "#;

        assert_eq!(run_ok(source), "0\n");
    }

    #[test]
    fn test_block_scoping_and_shadowing() {
        let source = r#"
            var a = "global a";
            var b = "global b";
            {
                var a = "outer a";
                {
                    var a = "inner a";
                    print a;
                    print b;
                }
                print a;
            }
            print a;
        "#;

        assert_eq!(
            run_ok(source),
            "inner a\nglobal b\nouter a\nglobal a\n"
        );
    }

    #[test]
    fn test_closure_binds_lexically() {
        let source = r#"
            var a = "global";
            {
                fun showA() { print a; }
                showA();
                var a = "block";
                showA();
            }
        "#;

        assert_eq!(run_ok(source), "global\nglobal\n");
    }

    #[test]
    fn test_closures_keep_their_state() {
        let source = r#"
            fun makeCounter() {
                var i = 0;
                fun count() { i = i + 1; print i; }
                return count;
            }
            var counter = makeCounter();
            counter();
            counter();
        "#;

        assert_eq!(run_ok(source), "1\n2\n");
    }

    #[test]
    fn test_loops() {
        let source = r#"
            for (var i = 0; i < 3; i = i + 1) print i;
            var n = 3;
            while (n > 0) { print n; n = n - 1; }
        "#;

        assert_eq!(run_ok(source), "0\n1\n2\n3\n2\n1\n");
    }

    #[test]
    fn test_for_loop_closures_share_the_loop_variable() {
        let source = r#"
            var f;
            for (var i = 0; i < 2; i = i + 1) {
                fun g() { print i; }
                f = g;
            }
            f();
        "#;

        assert_eq!(run_ok(source), "2\n");
    }

    #[test]
    fn test_recursion() {
        let source = r#"
            fun fib(n) {
                if (n < 2) return n;
                return fib(n - 1) + fib(n - 2);
            }
            print fib(15);
        "#;

        assert_eq!(run_ok(source), "610\n");
    }

    #[test]
    fn test_return_from_loop_inside_function() {
        let source = r#"
            fun first(limit) {
                for (var i = 0; ; i = i + 1) {
                    if (i == limit) return i;
                }
            }
            print first(4);
            fun nothing() {}
            print nothing();
        "#;

        assert_eq!(run_ok(source), "4\nnil\n");
    }

    #[test]
    fn test_callable_display() {
        let source = r#"
            fun f() {}
            class K {}
            print f;
            print clock;
            print K;
            print K();
        "#;

        assert_eq!(run_ok(source), "<fn f>\n<native fn clock>\nK\n<K>\n");
    }

    #[test]
    fn test_clock_returns_a_number() {
        assert_eq!(run_ok("print clock() > 0;"), "true\n");
    }

    #[test]
    fn test_classes_fields_and_methods() {
        let source = r#"
            class Counter {
                init(start) { this.n = start; }
                inc() { this.n = this.n + 1; return this; }
            }
            var c = Counter(5);
            c.inc().inc();
            print c.n;
            var m = c.inc;
            m();
            print c.n;
            c.extra = "field";
            print c.extra;
        "#;

        assert_eq!(run_ok(source), "7\n8\nfield\n");
    }

    #[test]
    fn test_initializer_returns_the_instance() {
        let source = r#"
            class Foo {
                init() {
                    this.x = 1;
                    return;
                    this.x = 2;
                }
            }
            var foo = Foo();
            print foo.x;
            print foo.init() == foo;
        "#;

        assert_eq!(run_ok(source), "1\ntrue\n");
    }

    #[test]
    fn test_runtime_error_messages() {
        assert_eq!(
            runtime_error("print -\"x\";"),
            "Operand must be a number.\n[line 1]"
        );
        assert_eq!(
            runtime_error("print 1 < \"2\";"),
            "Operands must be numbers.\n[line 1]"
        );
        assert_eq!(
            runtime_error("print 1 + \"a\";"),
            "Operands must be two numbers or two strings.\n[line 1]"
        );
        assert_eq!(
            runtime_error("print undefinedName;"),
            "Undefined variable 'undefinedName'.\n[line 1]"
        );
        assert_eq!(
            runtime_error("\"str\"();"),
            "Can only call functions and classes.\n[line 1]"
        );
        assert_eq!(
            runtime_error("fun f(a, b) {}\nf(1);"),
            "Expected 2 arguments but got 1.\n[line 2]"
        );
        assert_eq!(
            runtime_error("var x = 1; print x.y;"),
            "Only instances have properties.\n[line 1]"
        );
        assert_eq!(
            runtime_error("var x = 1; x.y = 2;"),
            "Only instances have fields.\n[line 1]"
        );
        assert_eq!(
            runtime_error("class A {} print A().missing;"),
            "Undefined property 'missing'.\n[line 1]"
        );
    }

    #[test]
    fn test_operand_errors_carry_the_operator() {
        for (source, operator) in [
            ("print 1 < \"2\";", "<"),
            ("print nil * 2;", "*"),
            ("print 3 >= false;", ">="),
            ("print -\"x\";", "-"),
        ] {
            let (report, _) = run(source);

            match report.runtime_error {
                Some(LoxError::Runtime { lexeme, .. }) => assert_eq!(lexeme, operator),
                other => panic!("expected a runtime error for {}, got {:?}", source, other),
            }
        }
    }

    #[test]
    fn test_deep_recursion_runs_on_the_default_stack() {
        let source = r#"
            fun sum(n) {
                if (n == 0) return 0;
                return n + sum(n - 1);
            }
            print sum(1000);
        "#;

        assert_eq!(run_ok(source), "500500\n");
    }

    #[test]
    fn test_unbounded_recursion_is_a_runtime_error() {
        let message = runtime_error("fun f() { f(); } f();");

        assert_eq!(message, "Stack overflow.\n[line 1]");
    }

    #[test]
    fn test_deeply_nested_source() {
        let depth = 1000;
        let parens = format!("print {}1{};", "(".repeat(depth), ")".repeat(depth));
        assert_eq!(run_ok(&parens), "1\n");

        let blocks = format!("{}print 2;{}", "{".repeat(depth), "}".repeat(depth));
        assert_eq!(run_ok(&blocks), "2\n");

        let negations = format!("print {}true;", "!".repeat(depth + 1));
        assert_eq!(run_ok(&negations), "false\n");
    }

    #[test]
    fn test_scope_is_restored_after_runtime_error() {
        let (mut lox, out) = session();

        let failed = lox.run("fun g() { { var z = 1; nope; } } g();");
        assert!(failed.had_runtime_error());

        // defined in globals, not in the scope that was active when g failed
        assert_eq!(lox.run("var later = 2;").exit_code(), 0);
        assert_eq!(lox.run("{ print later; }").exit_code(), 0);
        assert_eq!(lox.run("fun h() { return later; } print h();").exit_code(), 0);
        assert!(lox.run("print z;").had_runtime_error());

        assert_eq!(out.text(), "2\n2\n");
    }

    #[test]
    fn test_runtime_error_keeps_earlier_output() {
        let (report, output) = run("print 1;\nprint nope;\nprint 3;");

        assert_eq!(output, "1\n");
        assert!(report.had_runtime_error());
        assert_eq!(report.exit_code(), 70);

        let error = report.runtime_error.as_ref().unwrap();
        assert_eq!(error.line(), Some(2));
        assert_eq!(error.message(), "Undefined variable 'nope'.");
    }

    #[test]
    fn test_static_errors_skip_execution() {
        let (report, output) = run("print 1;\nprint (;");

        assert_eq!(output, "");
        assert_eq!(report.parse_errors.len(), 1);
        assert_eq!(report.exit_code(), 65);

        let (report, output) = run("print 1; { var a = 1; var a = 2; }");

        assert_eq!(output, "");
        assert_eq!(report.resolve_errors.len(), 1);
        assert_eq!(report.exit_code(), 65);
    }

    #[test]
    fn test_lex_and_parse_errors_are_both_reported() {
        let (report, _) = run("var @ = 1;\nprint ;");

        assert_eq!(report.lex_errors.len(), 1);
        assert!(!report.parse_errors.is_empty());
        assert!(report.resolve_errors.is_empty());
    }

    #[test]
    fn test_session_state_survives_between_runs() {
        let (mut lox, out) = session();

        assert!(!lox.run("var greeting = \"hi\";").had_error());
        assert!(!lox.run("fun make() { var local = greeting; fun get() { return local; } return get; }").had_error());
        assert!(!lox.run("var get = make();").had_error());

        // a bad line does not end the session
        assert!(lox.run("print ;").had_error());

        assert_eq!(lox.run("print get();").exit_code(), 0);
        assert_eq!(out.text(), "hi\n");
    }

    #[test]
    fn test_evaluate_single_expression() {
        let (mut lox, _) = session();

        let report = lox.evaluate("(1 + 2) * 3");
        assert_eq!(report.value, Some(Value::Number(9.0)));
        assert_eq!(report.exit_code(), 0);

        let report = lox.evaluate("\"a\" + \"b\"");
        assert_eq!(report.value.map(|v| v.to_string()), Some("ab".to_string()));

        let report = lox.evaluate("-true");
        assert!(report.value.is_none());
        assert_eq!(report.exit_code(), 70);

        let report = lox.evaluate("1 +");
        assert_eq!(report.exit_code(), 65);
    }
}
