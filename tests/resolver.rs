#[cfg(test)]
mod resolver_tests {
    use rox as lox;

    use lox::interpreter::Interpreter;
    use lox::parser::Parser;
    use lox::resolver::Resolver;
    use lox::scanner::scan_tokens;

    fn resolve_errors(source: &str) -> Vec<String> {
        let (tokens, lex_errors) = scan_tokens(source);
        assert!(lex_errors.is_empty());

        let (stmts, parse_errors) = Parser::new(&tokens).parse();
        assert!(parse_errors.is_empty(), "parse errors: {:?}", parse_errors);

        let mut interpreter = Interpreter::with_output(Box::new(std::io::sink()));
        Resolver::new(&mut interpreter)
            .resolve(&stmts)
            .iter()
            .map(|e| e.to_string())
            .collect()
    }

    #[test]
    fn test_clean_program_has_no_errors() {
        let source = "
            var a = 1;
            fun outer() {
                var b = a;
                fun inner() { return b; }
                return inner;
            }
            class C { init() { this.v = 1; } get() { return this.v; } }
            for (var i = 0; i < 2; i = i + 1) { var j = i; }
        ";

        assert!(resolve_errors(source).is_empty());
    }

    #[test]
    fn test_redeclaration_in_same_local_scope() {
        assert_eq!(
            resolve_errors("{ var a = 1; var a = 2; }"),
            vec!["[line 1] Error at 'a': Already a variable with this name in this scope."]
        );
    }

    #[test]
    fn test_shadowing_and_global_redeclaration_are_fine() {
        assert!(resolve_errors("{ var a = 1; { var a = 2; } }").is_empty());
        assert!(resolve_errors("var a = 1; var a = 2;").is_empty());
    }

    #[test]
    fn test_duplicate_parameters() {
        assert_eq!(
            resolve_errors("fun f(x, x) {}"),
            vec!["[line 1] Error at 'x': Already a variable with this name in this scope."]
        );
    }

    #[test]
    fn test_read_in_own_initializer() {
        assert_eq!(
            resolve_errors("var a = 1; { var a = a; }"),
            vec!["[line 1] Error at 'a': Can't read local variable in its own initializer."]
        );

        // globals are late-bound, so this is left to runtime
        assert!(resolve_errors("var b = b;").is_empty());
    }

    #[test]
    fn test_return_at_top_level() {
        assert_eq!(
            resolve_errors("return 1;"),
            vec!["[line 1] Error at 'return': Can't return from top-level code."]
        );
    }

    #[test]
    fn test_this_outside_class() {
        assert_eq!(
            resolve_errors("print this;\nfun f() { return this; }"),
            vec![
                "[line 1] Error at 'this': Can't use 'this' outside of a class.",
                "[line 2] Error at 'this': Can't use 'this' outside of a class.",
            ]
        );
    }

    #[test]
    fn test_initializer_return_rules() {
        assert_eq!(
            resolve_errors("class A { init() { return 1; } }"),
            vec!["[line 1] Error at 'return': Can't return a value from an initializer."]
        );

        assert!(resolve_errors("class A { init() { return; } }").is_empty());
    }

    #[test]
    fn test_errors_are_collected() {
        let source = "return 1;\n{ var x = 1; var x = 2; }\nprint this;";

        assert_eq!(resolve_errors(source).len(), 3);
    }
}
