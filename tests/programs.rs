//! Whole programs run through the public interpreter API.

use flox::interpreter::{FloxError, Interpreter};
use flox::{ErrorKind, Value};

fn run(src: &str) -> Result<String, FloxError> {
    let mut raw_output: Vec<u8> = Vec::new();
    let mut interp = Interpreter::new(&mut raw_output);
    interp.eval(src)?;
    let diagnostics = interp.take_diagnostics();
    assert!(diagnostics.is_empty(), "{:?}", diagnostics);
    Ok(String::from_utf8(raw_output).expect("cannot convert output to string"))
}

fn run_err(src: &str) -> ErrorKind {
    let mut raw_output: Vec<u8> = Vec::new();
    let mut interp = Interpreter::new(&mut raw_output);
    match interp.eval(src) {
        Err(FloxError::Runtime(e)) => e.kind().cloned().expect("located error"),
        out => panic!("unexpected output: {:?}", out),
    }
}

#[test]
fn precedence() -> Result<(), FloxError> {
    assert_eq!(run("print 1 + 2 * 3; print (1 + 2) * 3;")?, "7\n9\n");
    Ok(())
}

#[test]
fn compound_assignment() -> Result<(), FloxError> {
    let prg = r#"
        var x = 10;
        x += 5;
        print x;
        var y = 10;
        y -= 3;
        print y;
        y *= 2;
        print y;
        y /= 7;
        print y;
    "#;
    assert_eq!(run(prg)?, "15\n7\n14\n2\n");
    Ok(())
}

#[test]
fn block_scoping() -> Result<(), FloxError> {
    assert_eq!(
        run("var a = 1; { var a = 2; print a; } print a;")?,
        "2\n1\n"
    );
    assert_eq!(
        run_err("{ var inner = 1; } print inner;"),
        ErrorKind::UndefinedVariable("inner".to_string())
    );
    Ok(())
}

#[test]
fn closures_share_state() -> Result<(), FloxError> {
    let prg = r#"
        fun make_counter() {
            var count = 0;
            fun inc() {
                count += 1;
                return count;
            }
            return inc;
        }
        var a = make_counter();
        print a();
        print a();
        print a();
        var b = make_counter();
        print b();
        print a();
    "#;
    assert_eq!(run(prg)?, "1\n2\n3\n1\n4\n");
    Ok(())
}

#[test]
fn sibling_closures_see_the_same_scope() -> Result<(), FloxError> {
    let prg = r#"
        var get;
        var set;
        fun make() {
            var v = "initial";
            fun g() { return v; }
            fun s(x) { v = x; }
            get = g;
            set = s;
        }
        make();
        set("updated");
        print get();
    "#;
    assert_eq!(run(prg)?, "updated\n");
    Ok(())
}

#[test]
fn lambdas_as_arguments() -> Result<(), FloxError> {
    let prg = r#"
        fun apply(f, x) { return f(x); }
        var k = 10;
        print apply(fun (n) { return n * k; }, 4);
    "#;
    assert_eq!(run(prg)?, "40\n");
    Ok(())
}

#[test]
fn recursion() -> Result<(), FloxError> {
    let prg = r#"
        fun fib(n) {
            if (n < 2) return n;
            return fib(n - 1) + fib(n - 2);
        }
        print fib(15);
    "#;
    assert_eq!(run(prg)?, "610\n");
    Ok(())
}

#[test]
fn arrays() -> Result<(), FloxError> {
    let prg = r#"
        var arr = [1, 2, 3];
        print arr[0];
        var same = arr + 4;
        print arr;
        print same == arr;
        4 + arr;
        print arr;
        arr[1] = "x";
        print arr[1];
        arr[0] += 10;
        print arr[0];
    "#;
    assert_eq!(
        run(prg)?,
        "1\n[0: 1, 1: 2, 2: 3, 3: 4,]\ntrue\n[0: 4, 1: 1, 2: 2, 3: 3, 4: 4,]\nx\n14\n"
    );
    Ok(())
}

#[test]
fn concatenation_and_removal() -> Result<(), FloxError> {
    let prg = r#"
        var a = [1, 2];
        a + [3, 4];
        print a;
        a - 1;
        print a;
        1 - a;
        print a;
        print (1, 2) + (3,);
    "#;
    assert_eq!(
        run(prg)?,
        "[0: 1, 1: 2, 2: 3, 3: 4,]\n[0: 1, 1: 2, 2: 3,]\n[0: 2, 1: 3,]\n(0: 1, 1: 2, 2: 3,)\n"
    );
    Ok(())
}

#[test]
fn collection_errors() {
    assert_eq!(
        run_err("var t = (1, 2); t[0] = 5;"),
        ErrorKind::ImmutableCollection
    );
    assert_eq!(
        run_err("var a = [1]; a - 2;"),
        ErrorKind::RemoveCount {
            requested: 2,
            size: 1
        }
    );
    assert_eq!(
        run_err("var a = [1]; 3 - a;"),
        ErrorKind::RemoveCount {
            requested: 3,
            size: 1
        }
    );
    assert_eq!(run_err("var n = 1; print n[0];"), ErrorKind::NotIndexable);
    assert_eq!(run_err("print [1][\"a\"];"), ErrorKind::BadIndex);
    assert_eq!(run_err("print [1][5];"), ErrorKind::IndexOutOfRange(5));
}

#[test]
fn huge_index_is_rejected() -> Result<(), FloxError> {
    let grow = "var a = [1]; var n = 1; var k = 0; while (k < 25) { n = n * 10; k += 1; }";
    assert_eq!(run_err(&format!("{} a[n] = 2;", grow)), ErrorKind::BadIndex);
    assert_eq!(run_err(&format!("{} print a[n];", grow)), ErrorKind::BadIndex);
    assert_eq!(run(&format!("{} 0 + a; print a;", grow))?, "[0: 0, 1: 1,]\n");
    assert_eq!(
        run(&format!("{} var b = [0]; b + a; print b;", grow))?,
        "[0: 0, 1: 1,]\n"
    );
    Ok(())
}

#[test]
fn self_containing_collection_prints() -> Result<(), FloxError> {
    assert_eq!(
        run("var a = [1]; a[0] = a; print a; print `${a}`;")?,
        "[0: [...],]\n[0: [...],]\n"
    );
    Ok(())
}

#[test]
fn overflowing_product_prints_infinity() -> Result<(), FloxError> {
    let prg = "var n = 2; var k = 0; while (k < 11) { n = n * n; k += 1; } print n; print -n;";
    assert_eq!(run(prg)?, "Infinity\n-Infinity\n");
    Ok(())
}

#[test]
fn switch_prints_only_matching_case() -> Result<(), FloxError> {
    let prg = r#"switch 2: case 1: { print "a"; } case 2: { print "b"; }"#;
    assert_eq!(run(prg)?, "b\n");
    Ok(())
}

#[test]
fn switch_break_stops_later_cases_and_default() -> Result<(), FloxError> {
    let prg = r#"
        switch 2:
            case 2: { print "first"; break; }
            case 2: { print "second"; }
            default: { print "default"; }
        print "after";
    "#;
    assert_eq!(run(prg)?, "first\nafter\n");
    Ok(())
}

#[test]
fn switch_default_without_match() -> Result<(), FloxError> {
    let prg = r#"switch "z": case "a": { print 1; } default: { print 2; }"#;
    assert_eq!(run(prg)?, "2\n");
    Ok(())
}

#[test]
fn division() -> Result<(), FloxError> {
    assert_eq!(run("print 10 / 2;")?, "5\n");
    assert_eq!(run_err("print 10 / 0;"), ErrorKind::DivByZero);
    Ok(())
}

#[test]
fn undefined_variable_message_names_it() {
    let mut raw_output: Vec<u8> = Vec::new();
    let mut interp = Interpreter::new(&mut raw_output);
    match interp.eval("\n\nprint ghost;") {
        Err(e) => assert_eq!(
            e.to_string(),
            "[line 3] Error at 'ghost': Undefined variable 'ghost'."
        ),
        out => panic!("unexpected output: {:?}", out),
    }
}

#[test]
fn malformed_statement_does_not_stop_the_rest() {
    let mut raw_output: Vec<u8> = Vec::new();
    let mut interp = Interpreter::new(&mut raw_output);
    let result = interp.eval("print 1;\nvar = 2;\nprint 3;\nprint 4;");
    assert!(result.is_ok());
    let diagnostics = interp.take_diagnostics();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(
        diagnostics[0].to_string(),
        "[line 2] Error at '=': Expect variable name."
    );
    assert_eq!(raw_output, b"1\n3\n4\n");
}

#[test]
fn missing_semicolon_at_end() {
    let mut raw_output: Vec<u8> = Vec::new();
    let mut interp = Interpreter::new(&mut raw_output);
    assert!(interp.eval("print 1").is_ok());
    assert_eq!(
        interp.take_diagnostics()[0].to_string(),
        "[line 1] Error at end: Expect ';' after value."
    );
}

#[test]
fn for_loop_and_continue() -> Result<(), FloxError> {
    assert_eq!(
        run("for (var i = 0; i < 3; i += 1) { print i; }")?,
        "0\n1\n2\n"
    );
    // `continue` skips the increment, so the loop counts by hand here.
    let prg = r#"
        var i = 0;
        for (; i < 5;) {
            i += 1;
            if (i == 3) { continue; }
            print i;
        }
    "#;
    assert_eq!(run(prg)?, "1\n2\n4\n5\n");
    Ok(())
}

#[test]
fn continue_skips_for_increment() -> Result<(), FloxError> {
    let prg = r#"
        for (var i = 0; i < 4; i += 1) {
            print i;
            if (i == 1) {
                i = 2;
                continue;
            }
        }
    "#;
    // Had the increment run after `continue`, 2 would be skipped.
    assert_eq!(run(prg)?, "0\n1\n2\n3\n");
    Ok(())
}

#[test]
fn break_in_nested_loop_only_leaves_inner() -> Result<(), FloxError> {
    let prg = r#"
        var i = 0;
        while (i < 2) {
            var j = 0;
            while (true) {
                if (j == 2) { break; }
                print `${i}.${j}`;
                j += 1;
            }
            i += 1;
        }
    "#;
    assert_eq!(run(prg)?, "0.0\n0.1\n1.0\n1.1\n");
    Ok(())
}

#[test]
fn templates() -> Result<(), FloxError> {
    let prg = r#"
        var name = "flox";
        print `hello ${name}!`;
        print `cost: $5, \${literal}`;
        print `multi
line`;
    "#;
    assert_eq!(
        run(prg)?,
        "hello flox!\ncost: $5, ${literal}\nmulti\nline\n"
    );
    Ok(())
}

#[test]
fn strings() -> Result<(), FloxError> {
    let prg = "print \"ab\" + 'c\nd'; print \"abc\"[2];";
    assert_eq!(run(prg)?, "abc\nd\nc\n");
    Ok(())
}

#[test]
fn equality_is_strict() -> Result<(), FloxError> {
    assert_eq!(
        run(r#"print 1 == "1"; print nil == false; print nil == nil; print "a" != "b";"#)?,
        "false\nfalse\ntrue\ntrue\n"
    );
    Ok(())
}

#[test]
fn constants() -> Result<(), FloxError> {
    assert_eq!(run("const pi = 3.14; print pi;")?, "3.14\n");
    assert_eq!(
        run_err("const pi = 3; pi += 1;"),
        ErrorKind::ConstantReassigned("pi".to_string())
    );
    Ok(())
}

#[test]
fn maybe_is_a_boolean() -> Result<(), FloxError> {
    let out = run("print maybe;")?;
    assert!(out == "true\n" || out == "false\n", "{}", out);
    Ok(())
}

#[test]
fn clock_returns_milliseconds() -> Result<(), FloxError> {
    let mut raw_output: Vec<u8> = Vec::new();
    let mut interp = Interpreter::new(&mut raw_output);
    match interp.eval("clock();")?.as_slice() {
        [Value::Number(ms)] => assert!(*ms > 1e12),
        out => panic!("unexpected output: {:?}", out),
    }
    Ok(())
}

#[test]
fn session_persists_between_calls() -> Result<(), FloxError> {
    let mut raw_output: Vec<u8> = Vec::new();
    let mut interp = Interpreter::new(&mut raw_output);
    interp.eval("var total = 1;")?;
    interp.eval("total = total + 41;")?;
    let values = interp.eval("total;")?;
    assert_eq!(values, vec![Value::Number(42.0)]);
    Ok(())
}

#[test]
fn wrong_argument_count() {
    assert_eq!(
        run_err("fun two(a, b) { return a; } two(1);"),
        ErrorKind::Arity {
            expected: 2,
            got: 1
        }
    );
}
