#[cfg(test)]
mod parser_tests {
    use rox as lox;

    use lox::ast::{Expr, Stmt};
    use lox::ast_printer::AstPrinter;
    use lox::error::LoxError;
    use lox::parser::Parser;
    use lox::scanner::scan_tokens;

    fn print_expr(source: &str) -> String {
        let (tokens, lex_errors) = scan_tokens(source);
        assert!(lex_errors.is_empty(), "lexical errors: {:?}", lex_errors);

        let (expr, errors) = Parser::new(&tokens).parse_expression();
        assert!(errors.is_empty(), "parse errors: {:?}", errors);

        AstPrinter::print(&expr.expect("expression"))
    }

    fn parse_program(source: &str) -> (Vec<Stmt>, Vec<LoxError>) {
        let (tokens, _) = scan_tokens(source);
        Parser::new(&tokens).parse()
    }

    fn messages(errors: &[LoxError]) -> Vec<String> {
        errors.iter().map(|e| e.to_string()).collect()
    }

    #[test]
    fn test_grouping_and_precedence() {
        assert_eq!(print_expr("(1 + 2) * 3"), "(* (group (+ 1 2)) 3)");
        assert_eq!(print_expr("1 + 2 * 3"), "(+ 1 (* 2 3))");
        assert_eq!(print_expr("-1 < 2 == !false"), "(== (< (- 1) 2) (! false))");
    }

    #[test]
    fn test_binary_operators_are_left_associative() {
        assert_eq!(print_expr("1 / 2 / 3"), "(/ (/ 1 2) 3)");
        assert_eq!(print_expr("1 - 2 + 3"), "(+ (- 1 2) 3)");
    }

    #[test]
    fn test_literals() {
        assert_eq!(print_expr("\"hello\""), "\"hello\"");
        assert_eq!(print_expr("2.5"), "2.5");
        assert_eq!(print_expr("10.0"), "10");
        assert_eq!(print_expr("nil"), "nil");
    }

    #[test]
    fn test_logical_and_assignment() {
        assert_eq!(print_expr("a or b and c"), "(or a (and b c))");
        assert_eq!(print_expr("a = b = 1"), "(= a (= b 1))");
    }

    #[test]
    fn test_call_chains_and_properties() {
        assert_eq!(print_expr("a(1)(2).b"), "(. (call (call a 1) 2) b)");
        assert_eq!(print_expr("obj.field = 3"), "(= (. obj field) 3)");
        assert_eq!(print_expr("f()"), "(call f)");
    }

    #[test]
    fn test_deeply_nested_grouping() {
        let depth = 1000;
        let source = format!("{}1{}", "(".repeat(depth), ")".repeat(depth));

        let expected = format!("{}1{}", "(group ".repeat(depth), ")".repeat(depth));
        assert_eq!(print_expr(&source), expected);
    }

    #[test]
    fn test_missing_expression() {
        let (tokens, _) = scan_tokens("(72 +)");
        let (expr, errors) = Parser::new(&tokens).parse_expression();

        assert!(expr.is_none());
        assert_eq!(
            messages(&errors),
            vec!["[line 1] Error at ')': Expect expression."]
        );
    }

    #[test]
    fn test_error_at_end() {
        let (stmts, errors) = parse_program("print 1");

        assert!(stmts.is_empty());
        assert_eq!(
            messages(&errors),
            vec!["[line 1] Error at end: Expect ';' after value."]
        );
    }

    #[test]
    fn test_invalid_assignment_target_is_not_fatal() {
        let (stmts, errors) = parse_program("1 + 2 = 3;\nprint 4;");

        assert_eq!(
            messages(&errors),
            vec!["[line 1] Error at '=': Invalid assignment target."]
        );

        // both statements survive
        assert_eq!(stmts.len(), 2);
        assert!(matches!(stmts[1], Stmt::Print(_)));
    }

    #[test]
    fn test_synchronize_reports_every_bad_statement() {
        let source = "var = 1;\nprint 2;\nvar x 3;\nfun f() { return 1; }";
        let (stmts, errors) = parse_program(source);

        assert_eq!(
            messages(&errors),
            vec![
                "[line 1] Error at '=': Expect variable name.",
                "[line 3] Error at '3': Expect ';' after variable declaration.",
            ]
        );

        assert_eq!(stmts.len(), 2);
        assert!(matches!(stmts[0], Stmt::Print(_)));
        assert!(matches!(stmts[1], Stmt::Function(_)));
    }

    #[test]
    fn test_for_loop_keeps_its_clauses() {
        let (stmts, errors) = parse_program("for (var i = 0; i < 3; i = i + 1) print i;");

        assert!(errors.is_empty());
        match &stmts[0] {
            Stmt::For {
                initializer,
                condition,
                increment,
                ..
            } => {
                assert!(matches!(initializer.as_deref(), Some(Stmt::Var { .. })));
                assert!(condition.is_some());
                assert!(increment.is_some());
            }
            other => panic!("expected a for statement, got {:?}", other),
        }
    }

    #[test]
    fn test_class_declaration() {
        let (stmts, errors) = parse_program("class Point { init(x) { this.x = x; } norm() { return 0; } }");

        assert!(errors.is_empty());
        match &stmts[0] {
            Stmt::Class { name, methods } => {
                assert_eq!(name.lexeme, "Point");
                let names: Vec<&str> = methods.iter().map(|m| m.name.lexeme.as_str()).collect();
                assert_eq!(names, vec!["init", "norm"]);
                assert_eq!(methods[0].params.len(), 1);
            }
            other => panic!("expected a class, got {:?}", other),
        }
    }

    #[test]
    fn test_too_many_arguments() {
        let args: Vec<String> = (0..256).map(|i| i.to_string()).collect();
        let source = format!("f({});", args.join(", "));
        let (stmts, errors) = parse_program(&source);

        assert_eq!(errors.len(), 1);
        assert!(errors[0]
            .to_string()
            .ends_with("Can't have more than 255 arguments."));

        // reported, not fatal
        assert_eq!(stmts.len(), 1);
    }

    #[test]
    fn test_expression_ids_continue_from_offset() {
        let (tokens, _) = scan_tokens("a = b;");
        let mut parser = Parser::new(&tokens).starting_at(10);
        let (stmts, errors) = parser.parse();

        assert!(errors.is_empty());
        assert_eq!(parser.next_id(), 13);

        match &stmts[0] {
            Stmt::Expression(Expr::Assign { id, value, .. }) => {
                assert!(id.0 >= 10);
                match value.as_ref() {
                    Expr::Variable { id: inner, .. } => assert_ne!(id, inner),
                    other => panic!("expected a variable, got {:?}", other),
                }
            }
            other => panic!("expected an assignment, got {:?}", other),
        }
    }
}
