mod common;

#[cfg(test)]
mod interpreter_tests {
    use super::common::{errors_of, output_of, run, scratch_dir, Session};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn print(expr: &str) -> String {
        output_of(&format!("print {};", expr)).trim_end().to_string()
    }

    // ───────────────────────────── operators ──────────────────────────────

    #[rstest]
    #[case("1 + 2", "3")]
    #[case("1 + 2.5", "3.5")]
    #[case("5 - 7", "-2")]
    #[case("3 * 4", "12")]
    #[case("8 / 2", "4.0")]
    #[case("7 / 2", "3.5")]
    #[case("10 \\ 3", "3")]
    #[case("-7 \\ 2", "-4")]
    #[case("7.5 \\ 2", "3.0")]
    #[case("13 % 5", "3")]
    #[case("5.5 % 2", "1.5")]
    #[case("2 ^ 3", "8")]
    #[case("2 ^ -1", "0.5")]
    #[case("2.0 ^ 3", "8.0")]
    #[case("-(3)", "-3")]
    #[case("-2.5", "-2.5")]
    #[case("1 / 0", "nan")]
    #[case("1.0 / 0", "nan")]
    #[case("1 % 0", "nan")]
    #[case("1 \\ 0", "nan")]
    #[case("\"con\" + \"cat\"", "concat")]
    #[case("10000000000000000.0", "1e+16")]
    #[case("0.00001", "1e-05")]
    #[case("2.0 ^ 60", "1.152921504606847e+18")]
    fn test_interpreter_01_arithmetic(#[case] expr: &str, #[case] expected: &str) {
        assert_eq!(print(expr), expected);
    }

    #[test]
    fn test_interpreter_02_integer_overflow_promotes_to_float() {
        assert_eq!(
            print("9223372036854775807 * 2 == 18446744073709551614.0"),
            "True"
        );
    }

    #[rstest]
    #[case("1 < 2", "True")]
    #[case("2 <= 2.0", "True")]
    #[case("3 > 4", "False")]
    #[case("4 >= 4", "True")]
    #[case("(1 / 0) < 1", "False")]
    #[case("(1 / 0) >= 1", "False")]
    #[case("1 == 1", "True")]
    #[case("1 == 1.0", "False")]
    #[case("true == 1", "False")]
    #[case("nil == nil", "True")]
    #[case("nil == false", "False")]
    #[case("\"a\" == \"a\"", "True")]
    #[case("1 != 2", "True")]
    #[case("(1 / 0) == (1 / 0)", "False")]
    fn test_interpreter_03_comparison_and_equality(#[case] expr: &str, #[case] expected: &str) {
        assert_eq!(print(expr), expected);
    }

    #[rstest]
    #[case("!0", "False")]
    #[case("!nil", "True")]
    #[case("!\"\"", "False")]
    #[case("nil or 2", "2")]
    #[case("1 or undefined_name", "1")]
    #[case("1 and 2", "2")]
    #[case("false and undefined_name", "False")]
    fn test_interpreter_04_truthiness_and_logic(#[case] expr: &str, #[case] expected: &str) {
        assert_eq!(print(expr), expected);
    }

    // ───────────────────────────── runtime errors ─────────────────────────

    #[rstest]
    #[case("print -\"a\";", "1:7: LoxRuntimeError: Operands must be numbers.")]
    #[case(
        "print 1 + \"a\";",
        "1:9: LoxRuntimeError: Operands must either be both numbers or both strings."
    )]
    #[case("print 1 < \"a\";", "1:9: LoxRuntimeError: Operands must be numbers.")]
    #[case("print true * 2;", "1:12: LoxRuntimeError: Operands must be numbers.")]
    #[case("print x;", "1:7: LoxRuntimeError: Undefined variable 'x'.")]
    #[case("x = 1;", "1:1: LoxRuntimeError: Undefined variable 'x'.")]
    #[case("\"str\"();", "1:7: LoxRuntimeError: Can only call functions and classes.")]
    #[case(
        "fun f(a, b) {} f(1);",
        "1:19: LoxRuntimeError: Expected 2 arguments but got 1."
    )]
    #[case("print 1.x;", "1:9: LoxRuntimeError: Only instances have properties.")]
    #[case("var a = 1; a.x = 2;", "1:14: LoxRuntimeError: Only instances have fields.")]
    #[case("class A {} print A().bar;", "1:22: LoxRuntimeError: Undefined property 'bar'.")]
    #[case(
        "var NotClass = 1; class B < NotClass {}",
        "1:29: LoxRuntimeError: Superclass must be a class."
    )]
    #[case("class A {} A(1);", "1:15: LoxRuntimeError: Expected 0 arguments but got 1.")]
    fn test_interpreter_05_runtime_errors(#[case] source: &str, #[case] expected: &str) {
        assert_eq!(errors_of(source), vec![expected]);
    }

    #[test]
    fn test_interpreter_06_runtime_error_ends_the_run() {
        let (output, errors) = run("print 1;\nprint -nil;\nprint 2;");

        assert_eq!(output, "1\n");
        assert_eq!(
            errors,
            vec!["2:7: LoxRuntimeError: Operands must be numbers."]
        );
    }

    #[test]
    fn test_interpreter_07_runtime_errors_are_classified() {
        let diagnostics = Session::new().run_diagnostics("print -nil;");

        assert!(diagnostics.had_runtime_error());
        assert!(!diagnostics.had_error());
    }

    // ───────────────────────────── functions ──────────────────────────────

    #[test]
    fn test_interpreter_08_closures_capture_their_environment() {
        let source = r#"
fun makeCounter() {
  var i = 0;
  fun count() {
    i = i + 1;
    return i;
  }
  return count;
}

var a = makeCounter();
var b = makeCounter();
print a();
print a();
print b();
"#;

        assert_eq!(output_of(source), "1\n2\n1\n");
    }

    #[test]
    fn test_interpreter_09_recursion() {
        let source = r#"
fun fib(n) {
  if (n < 2) return n;
  return fib(n - 1) + fib(n - 2);
}
print fib(15);
"#;

        assert_eq!(output_of(source), "610\n");
    }

    #[test]
    fn test_interpreter_10_function_without_return_yields_nil() {
        assert_eq!(output_of("fun f() {} print f();"), "nil\n");
    }

    #[test]
    fn test_interpreter_11_return_unwinds_loops() {
        let source = r#"
fun firstOver(limit) {
  for (var i = 0; ; i = i + 1) {
    while (true) {
      if (i > limit) return i;
      break;
    }
  }
}
print firstOver(3);
"#;

        assert_eq!(output_of(source), "4\n");
    }

    #[rstest]
    #[case("fun f() {} print f;", "<fn f>\n")]
    #[case("class A {} print A;", "<cls A>\n")]
    #[case("class A {} print A();", "<inst A>\n")]
    #[case("print clock;", "<builtin fn clock>\n")]
    #[case("fun f() {} print f == f;", "True\n")]
    fn test_interpreter_12_callable_display_and_identity(
        #[case] source: &str,
        #[case] expected: &str,
    ) {
        assert_eq!(output_of(source), expected);
    }

    // ───────────────────────────── loops ──────────────────────────────────

    #[test]
    fn test_interpreter_13_break() {
        let source = r#"
for (var i = 0; i < 5; i = i + 1) {
  if (i == 3) break;
  print i;
}
"#;

        assert_eq!(output_of(source), "0\n1\n2\n");
    }

    #[test]
    fn test_interpreter_14_continue_still_runs_the_increment() {
        let source = r#"
for (var i = 0; i < 6; i = i + 1) {
  if (i % 2 == 0) continue;
  print i;
}
"#;

        assert_eq!(output_of(source), "1\n3\n5\n");
    }

    #[test]
    fn test_interpreter_15_break_only_leaves_the_innermost_loop() {
        let source = r#"
var i = 0;
while (i < 2) {
  var j = 0;
  while (true) {
    if (j == 2) break;
    print i * 10 + j;
    j = j + 1;
  }
  i = i + 1;
}
"#;

        assert_eq!(output_of(source), "0\n1\n10\n11\n");
    }

    // ───────────────────────────── classes ────────────────────────────────

    #[test]
    fn test_interpreter_16_fields_and_methods() {
        let source = r#"
class Cake {
  taste() {
    return "The " + this.flavor + " cake is delicious";
  }
}

var cake = Cake();
cake.flavor = "German chocolate";
print cake.taste();

var detached = cake.taste;
print detached();
"#;

        assert_eq!(
            output_of(source),
            "The German chocolate cake is delicious\nThe German chocolate cake is delicious\n"
        );
    }

    #[test]
    fn test_interpreter_17_initializer() {
        let source = r#"
class Point {
  init(x, y) {
    this.x = x;
    this.y = y;
  }
}
var p = Point(1, 2);
print p.x + p.y;
print p.init(5, 6) == p;
print p.x;
"#;

        assert_eq!(output_of(source), "3\nTrue\n5\n");
    }

    #[test]
    fn test_interpreter_18_fields_shadow_methods() {
        let source = r#"
class A {
  m() { return "method"; }
}
var a = A();
a.m = "field";
print a.m;
"#;

        assert_eq!(output_of(source), "field\n");
    }

    #[test]
    fn test_interpreter_19_inheritance_and_super() {
        let source = r#"
class A {
  method() { print "A method"; }
}

class B < A {
  method() { print "B method"; }
  test() { super.method(); }
}

class C < B {}

C().test();
C().method();
"#;

        assert_eq!(output_of(source), "A method\nB method\n");
    }

    #[test]
    fn test_interpreter_20_inherited_initializer() {
        let source = r#"
class Base {
  init(n) { this.n = n; }
}
class Derived < Base {
  double() { return this.n * 2; }
}
print Derived(21).double();
"#;

        assert_eq!(output_of(source), "42\n");
    }

    #[test]
    fn test_interpreter_21_bound_method_equality() {
        let source = r#"
class A {
  m() {}
}
var a = A();
var b = A();
print a.m == a.m;
print a.m == b.m;
print a == a;
print a == b;
"#;

        assert_eq!(output_of(source), "True\nFalse\nTrue\nFalse\n");
    }

    #[test]
    fn test_interpreter_22_undefined_super_method() {
        let source = r#"
class A {}
class B < A {
  m() { return super.missing(); }
}
B().m();
"#;

        assert_eq!(
            errors_of(source),
            vec!["4:22: LoxRuntimeError: Undefined property 'missing'."]
        );
    }

    // ───────────────────────────── builtins ───────────────────────────────

    #[rstest]
    #[case("len(\"héllo\")", "5")]
    #[case("abs(-3)", "3")]
    #[case("abs(-2.5)", "2.5")]
    #[case("floor(2.7)", "2")]
    #[case("ceil(2.1)", "3")]
    #[case("floor(3)", "3")]
    #[case("max(1, 2.5)", "2.5")]
    #[case("min(1, 2.5)", "1")]
    #[case("ord(\"A\")", "65")]
    #[case("clock() > 0", "True")]
    fn test_interpreter_23_builtins(#[case] expr: &str, #[case] expected: &str) {
        assert_eq!(print(expr), expected);
    }

    #[rstest]
    #[case("len(1);", "1:6: LoxRuntimeError: Object of type 'int' has no length.")]
    #[case(
        "ord(\"ab\");",
        "1:9: LoxRuntimeError: ord() expected a character, but string of length 2 found."
    )]
    #[case("abs(nil);", "1:8: LoxRuntimeError: Expected a number but got nil.")]
    #[case("clock(1);", "1:8: LoxRuntimeError: Expected 0 arguments but got 1.")]
    fn test_interpreter_24_builtin_errors(#[case] source: &str, #[case] expected: &str) {
        assert_eq!(errors_of(source), vec![expected]);
    }

    #[test]
    fn test_interpreter_25_read_text() {
        let path = scratch_dir("read_text").join("note.txt");
        std::fs::write(&path, "hello from disk").unwrap();

        let source = format!("print read_text(\"{}\");", path.display());

        assert_eq!(output_of(&source), "hello from disk\n");
    }

    #[test]
    fn test_interpreter_26_builtins_can_be_shadowed() {
        assert_eq!(output_of("var len = 3; print len;"), "3\n");
    }
    // ───────────────────────────── arrays ─────────────────────────────────

    #[test]
    fn test_interpreter_27_array_methods() {
        let source = r#"
var arr = array(1);
print arr;
arr.append("foo");
print arr;
arr.appendleft("bar");
print arr;
arr.reverse();
print arr;
var a = arr.pop();
print a;
print arr;
var b = arr.popleft();
print b;
print arr;
arr.clear();
print arr;
arr.append("foo");
arr.append("bar");
print arr.join("");
print len(arr);
"#;

        assert_eq!(
            output_of(source),
            "[nil]\n[nil, 'foo']\n['bar', nil, 'foo']\n['foo', nil, 'bar']\nbar\n\
             ['foo', nil]\nfoo\n[nil]\n[]\nfoobar\n2\n"
        );
    }

    #[test]
    fn test_interpreter_28_nested_arrays_print_recursively() {
        let source = r#"
var arr = array(1);
arr.append(array(1));
print arr;

var arr2 = array(1);
arr2.append(array(1));
arr.append(arr2);
print arr;
"#;

        assert_eq!(output_of(source), "[nil, [nil]]\n[nil, [nil], [nil, [nil]]]\n");
    }

    #[test]
    fn test_interpreter_29_array_indexing_and_slicing() {
        let source = r#"
var a = array(2);
a.set(0, "x");
print a.get(0);
print a.get(-1);

var letters = string_array("abcdef");
print letters.slice(1, 5, 2);
print letters.slice(nil, nil, 3);
print letters.slice(4, 2, 1);
print letters;
"#;

        assert_eq!(
            output_of(source),
            "x\nnil\n['b', 'd']\n['a', 'd']\n[]\n['a', 'b', 'c', 'd', 'e', 'f']\n"
        );
    }

    #[test]
    fn test_interpreter_30_arrays_are_shared_references() {
        let source = r#"
var a = array(0);
var b = a;
b.append(true);
b.append(1.5);
print a;
print a == b;
print a == array(0);
print a.append;
"#;

        assert_eq!(
            output_of(source),
            "[True, 1.5]\nTrue\nFalse\n<builtin fn append>\n"
        );
    }

    #[rstest]
    #[case(
        "var arr = array(0);\narr.pop();",
        "2:5: LoxRuntimeError: Cannot pop from empty array."
    )]
    #[case(
        "var arr = array(0);\narr.popleft();",
        "2:5: LoxRuntimeError: Cannot pop from empty array."
    )]
    #[case(
        "var arr = array(0);\narr.butts();",
        "2:5: LoxRuntimeError: Undefined method: 'butts'."
    )]
    #[case("var a = array(0); a.get(0);", "1:21: LoxRuntimeError: Index out of range.")]
    #[case(
        "var a = array(1); a.set(1, 2);",
        "1:21: LoxRuntimeError: Assignment index out of range."
    )]
    #[case(
        "var a = array(1); a.join(\"\");",
        "1:21: LoxRuntimeError: Sequence item 0: expected string, nil found."
    )]
    #[case(
        "var a = array(0); a.append(1, 2);",
        "1:32: LoxRuntimeError: Expected 1 arguments but got 2."
    )]
    #[case("var a = array(0); a.x = 1;", "1:21: LoxRuntimeError: Only instances have fields.")]
    fn test_interpreter_31_array_errors(#[case] source: &str, #[case] expected: &str) {
        assert_eq!(errors_of(source), vec![expected]);
    }

    // ───────────────────────────── more builtins ──────────────────────────

    #[rstest]
    #[case("divmod(13, 7)", "[1, 6]")]
    #[case("divmod(-13, 7)", "[-2, 1]")]
    #[case("divmod(7.5, 2)", "[3.0, 1.5]")]
    #[case("divmod(1, 0)", "[nan, nan]")]
    #[case("str2num(\"13\")", "13")]
    #[case("str2num(\"13.42\")", "13.42")]
    #[case("str2num(\"-13\")", "-13")]
    #[case("str2num(\"-13.42\")", "-13.42")]
    #[case("string_array(\"abc\")", "['a', 'b', 'c']")]
    #[case("len(string_array(\"héllo\"))", "5")]
    #[case("array(3)", "[nil, nil, nil]")]
    fn test_interpreter_32_conversion_builtins(#[case] expr: &str, #[case] expected: &str) {
        assert_eq!(print(expr), expected);
    }

    #[test]
    fn test_interpreter_33_statistics_builtins() {
        let source = r#"
var arr = array(0);
arr.append(1);
arr.append(2);
arr.append(2);
arr.append(3);

print mean(arr);
print median(arr);
print mode(arr);
print std(arr);
"#;

        assert_eq!(output_of(source), "2\n2.0\n2\n0.816496580927726\n");
    }

    #[test]
    fn test_interpreter_34_regex_builtins() {
        let source = r#"
print re_sub("bar", "", "foobarbaz");
print re_sub("(o+)", "<\1>", "foo");

print re_search("bar", "foobarbaz");
print re_search("(bar)", "foobarbaz");
print re_search("qux", "foobarbaz");

print re_match("foo", "foobarbaz");
print re_match("(foo)", "foobarbaz");
print re_match("bar", "foobarbaz");

print re_findall('f[a-z]*', 'which foot or hand fell fastest');
print re_findall('f([a-z]*)', 'which foot or hand fell fastest');
print re_findall('(f)([a-z]*)', 'which foot or hand fell fastest');
"#;

        assert_eq!(
            output_of(source),
            "foobaz\nf<oo>\n\
             ['bar']\n['bar', 'bar']\n[]\n\
             ['foo']\n['foo', 'foo']\n[]\n\
             ['foot', 'fell', 'fastest']\n\
             ['oot', 'ell', 'astest']\n\
             [['f', 'oot'], ['f', 'ell'], ['f', 'astest']]\n"
        );
    }

    #[rstest]
    #[case(
        "print str2num(\"foo\");",
        "1:20: LoxRuntimeError: Cannot convert 'foo' to an integer or float."
    )]
    #[case(
        "print mean(array(0));",
        "1:20: LoxRuntimeError: mean requires at least one data point."
    )]
    #[case("print mean(1);", "1:13: LoxRuntimeError: Expected an array but got int.")]
    #[case(
        "print std(string_array(\"ab\"));",
        "1:29: LoxRuntimeError: Expected a number but got string."
    )]
    #[case("print len(42);", "1:13: LoxRuntimeError: Object of type 'int' has no length.")]
    fn test_interpreter_35_more_builtin_errors(#[case] source: &str, #[case] expected: &str) {
        assert_eq!(errors_of(source), vec![expected]);
    }

    #[test]
    fn test_interpreter_36_invalid_pattern_is_a_runtime_error() {
        let errors = errors_of("re_search(\"(\", \"x\");");

        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("1:19: LoxRuntimeError: Invalid regular expression:"));
    }
}
