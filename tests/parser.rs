mod common;

#[cfg(test)]
mod parser_tests {
    use super::common::{parse, sexprs};
    use lox::ast::{Expr, Stmt};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("print 1 + 2 * 3;", "(print (+ 1 (* 2 3)))")]
    #[case("print (1 + 2) * 3;", "(print (* (group (+ 1 2)) 3))")]
    #[case("1 - 2 - 3;", "(; (- (- 1 2) 3))")]
    #[case("2 ^ 3 ^ 2;", "(; (^ (^ 2 3) 2))")]
    #[case("-2 ^ 2;", "(; (^ (- 2) 2))")]
    #[case("a % b \\ c / d;", "(; (/ (\\ (% a b) c) d))")]
    #[case("1 + 2 ^ 3 * 4;", "(; (+ 1 (* (^ 2 3) 4)))")]
    #[case("!!true;", "(; (! (! true)))")]
    #[case("a < b == c >= d;", "(; (== (< a b) (>= c d)))")]
    #[case("a or b and c;", "(; (or a (and b c)))")]
    #[case("a = b = 3;", "(; (= a (= b 3)))")]
    #[case("print 2.50;", "(print 2.5)")]
    #[case("print \"hi\";", "(print hi)")]
    #[case("print nil;", "(print nil)")]
    fn test_parser_01_expression_precedence(#[case] source: &str, #[case] expected: &str) {
        assert_eq!(sexprs(source), vec![expected]);
    }

    #[rstest]
    #[case("var a;", "(var a)")]
    #[case("var a = 1;", "(var a 1)")]
    #[case("{ var a = 1; print a; }", "(block (var a 1) (print a))")]
    #[case("if (a) print 1;", "(if a (print 1))")]
    #[case("if (a) print 1; else print 2;", "(if-else a (print 1) (print 2))")]
    #[case("while (a) print a;", "(while a (print a))")]
    #[case("while (true) { break; continue; }", "(while true (block (break) (continue)))")]
    #[case("fun add(a, b) { return a + b; }", "(fun add(a b) (return (+ a b)))")]
    #[case("fun noop() { return; }", "(fun noop() (return))")]
    #[case("f(1, 2)(3);", "(; (call (call f 1 2) 3))")]
    #[case("a.b.c = 1;", "(; (set (. a b) c 1))")]
    fn test_parser_02_statements(#[case] source: &str, #[case] expected: &str) {
        assert_eq!(sexprs(source), vec![expected]);
    }

    #[test]
    fn test_parser_03_for_loop_desugars_to_while() {
        assert_eq!(
            sexprs("for (var i = 0; i < 3; i = i + 1) print i;"),
            vec!["(block (var i 0) (while (< i 3) (print i) (= i (+ i 1))))"]
        );
        assert_eq!(sexprs("for (;;) break;"), vec!["(while true (break))"]);
        assert_eq!(
            sexprs("for (i = 0; ; ) print i;"),
            vec!["(block (; (= i 0)) (while true (print i)))"]
        );
    }

    #[test]
    fn test_parser_04_class_declaration() {
        let source = "class B < A {\n  init(x) { this.x = x; }\n  m() { return super.m(); }\n}";

        assert_eq!(
            sexprs(source),
            vec!["(class B < A (fun init(x) (; (set this x x))) (fun m() (return (call (super m)))))"]
        );
    }

    #[test]
    fn test_parser_05_variables_get_distinct_ids() {
        let (statements, _) = parse("a; a;");

        let ids: Vec<_> = statements
            .iter()
            .map(|stmt| match stmt {
                Stmt::Expression(Expr::Variable { id, .. }) => *id,
                other => panic!("unexpected statement {:?}", other),
            })
            .collect();

        assert_ne!(ids[0], ids[1]);
    }

    #[rstest]
    #[case("print 1 2;", "1:9: LoxParseError: Expected ';' after value.")]
    #[case("1 + ;", "1:5: LoxParseError: Expected expression.")]
    #[case("var 1 = 2;", "1:5: LoxParseError: Expected variable name.")]
    #[case("(1 + 2;", "1:7: LoxParseError: Expected ')' after expression.")]
    #[case("if 1) print 1;", "1:4: LoxParseError: Expected '(' after 'if'.")]
    #[case("while (a print a;", "1:10: LoxParseError: Expected ')' after condition.")]
    #[case("fun (a) {}", "1:5: LoxParseError: Expected function name.")]
    #[case("class A { m( {} }", "1:14: LoxParseError: Expected parameter name.")]
    #[case("class { }", "1:7: LoxParseError: Expected class name.")]
    #[case("a.1;", "1:3: LoxParseError: Expected property name after '.'.")]
    #[case("// trailing dot\n123.;", "2:5: LoxParseError: Expected property name after '.'.")]
    #[case("super;", "1:6: LoxParseError: Expected '.' after 'super'.")]
    #[case("break 1;", "1:7: LoxParseError: Expected ';' after 'break'.")]
    fn test_parser_06_error_messages(#[case] source: &str, #[case] expected: &str) {
        let (_, errors) = parse(source);

        assert_eq!(errors.first().map(String::as_str), Some(expected));
    }

    #[test]
    fn test_parser_07_invalid_assignment_target_is_not_fatal() {
        let (statements, errors) = parse("1 = 2;\nprint 3;");

        assert_eq!(errors, vec!["1:3: LoxParseError: Invalid assignment target."]);
        assert_eq!(statements.len(), 2);
    }

    #[test]
    fn test_parser_08_recovers_and_reports_every_error() {
        let (statements, errors) = parse("var = 1;\nprint 2;\nvar b 3;\nprint 4;");

        assert_eq!(
            errors,
            vec![
                "1:5: LoxParseError: Expected variable name.",
                "3:7: LoxParseError: Expected ';' after variable declaration.",
            ]
        );
        assert_eq!(statements.len(), 2);
    }

    #[test]
    fn test_parser_09_too_many_arguments() {
        let args: Vec<String> = (0..256).map(|n| n.to_string()).collect();
        let source = format!("f({});", args.join(", "));

        let (statements, errors) = parse(&source);

        assert_eq!(errors.len(), 1);
        assert!(errors[0].ends_with("Can't have more than 255 arguments."));
        assert_eq!(statements.len(), 1);
    }

    #[test]
    fn test_parser_10_empty_program() {
        let (statements, errors) = parse("// only a comment\n");

        assert!(statements.is_empty());
        assert!(errors.is_empty());
    }
}
