use super::*;
use pretty_assertions::assert_eq;
use proptest::prelude::{Just, ProptestConfig, prop_assert_eq, prop_oneof, proptest};
use proptest::strategy::Strategy as _;

fn config(strategy: Strategy, constant_folding: bool) -> Config {
    Config {
        strategy,
        constant_folding,
        ..Config::default()
    }
}

/// The completion value as display text, or the uncaught message.
fn outcome(config: Config, src: &str) -> String {
    let mut interp = Interpreter::new(config);
    match interp.evaluate("diff", src) {
        Ok(Some(v)) => interp.value_to_string(&v),
        Ok(None) => "<none>".to_string(),
        Err(EngineError::Uncaught { message, .. }) => format!("uncaught {message}"),
        Err(EngineError::Syntax(e)) => format!("syntax {}", e.message),
    }
}

/// Runs `src` under every strategy and checks they agree.
fn agree(src: &str) -> String {
    let tree = outcome(config(Strategy::TreeWalk, true), src);
    let folded = outcome(config(Strategy::Bytecode, true), src);
    let unfolded = outcome(config(Strategy::Bytecode, false), src);
    assert_eq!(tree, folded, "tree walker and folded bytecode disagree on {src}");
    assert_eq!(tree, unfolded, "tree walker and unfolded bytecode disagree on {src}");
    tree
}

#[test]
fn strategies_agree_on_control_flow() {
    let cases = [
        ("var s = 0; for (var i = 0; i < 10; i++) { if (i % 2) continue; s += i; } s", "20"),
        ("var n = 0; outer: for (var i = 0; i < 3; i++) for (var j = 0; j < 3; j++) { if (j == 1) continue outer; n++; } n", "3"),
        ("var i = 0; do { i++; } while (i < 5); i", "5"),
        ("var k = 3, r = ''; while (k--) r += k; r", "210"),
        ("var r = ''; switch (2) { case 1: r += 'a'; case 2: r += 'b'; case 3: r += 'c'; break; default: r += 'd'; } r", "bc"),
        ("var r = ''; switch ('z') { case 'a': r = 'a'; default: r += 'd'; case 'b': r += 'b'; } r", "db"),
        ("lbl: { 1; break lbl; 2; }", "1"),
        ("if (0) 'a'; else if ('') 'b'; else 'c';", "c"),
        ("var o = { a: 1 }; with (o) { a = 2; b = 3; } o.a + ':' + b", "2:3"),
        ("var x; for (x in { p: 1, q: 2 }); x", "q"),
    ];
    for (src, expected) in cases {
        assert_eq!(agree(src), expected, "{src}");
    }
}

#[test]
fn strategies_agree_on_exceptions_and_finally() {
    let cases = [
        ("function f() { try { return 1; } finally { return 2; } } f()", "2"),
        ("function f() { try { throw 1; } finally { return 'masked'; } } f()", "masked"),
        ("var s = ''; for (;;) { try { break; } finally { s += 'f'; } } s", "f"),
        ("var s = ''; for (var i = 0; i < 2; i++) { try { continue; } finally { s += i; } } s", "01"),
        ("1; try { 2; } finally { 3; }", "2"),
        ("var r; try { try { throw 'in'; } finally { r = 'fin'; } } catch (e) { r += ':' + e; } r", "fin:in"),
        ("var r; try { throw { code: 7 }; } catch (e) { r = e.code; } r", "7"),
        ("var e = 'outer'; try { throw 'inner'; } catch (e) { } e", "outer"),
        ("function g() { throw new TypeError('t'); } var r; try { g(); } catch (e) { r = e.name; } r", "TypeError"),
        ("throw 'boom'", "uncaught boom"),
        ("try { throw 1; } finally { }", "uncaught 1"),
        ("var a = []; try { a.push(1, (function () { throw 'x'; })()); } catch (e) { a.push(e); } a.join()", "x"),
    ];
    for (src, expected) in cases {
        assert_eq!(agree(src), expected, "{src}");
    }
}

#[test]
fn strategies_agree_on_functions_and_objects() {
    let cases = [
        ("function fib(n) { return n < 2 ? n : fib(n - 1) + fib(n - 2); } fib(15)", "610"),
        ("function mk() { var c = 0; return function () { return ++c; }; } var f = mk(); f(); f(); f()", "3"),
        ("function P(x) { this.x = x; } P.prototype.get = function () { return this.x; }; new P(4).get()", "4"),
        ("var o = { n: 1 }; o.n++; o['n'] += 2; o.n", "4"),
        ("var a = [3, 1, 2]; a.sort(); a.join('')", "123"),
        ("typeof undefinedName + typeof null + typeof {} + typeof 'x'", "undefinedobjectobjectstring"),
        ("var s = ''; var o = { a: 1, b: 2 }; for (var k in o) { s += k; delete o.b; } s", "a"),
        ("(function () { return arguments.length; })(1, 2, 3)", "3"),
        ("var x = 1; function f() { return x; var x = 2; } f()", "undefined"),
        ("eval('var q = 3; q * 2')", "6"),
    ];
    for (src, expected) in cases {
        assert_eq!(agree(src), expected, "{src}");
    }
}

#[test]
fn strategies_agree_on_conversions() {
    let cases = [
        ("1 + '2' + 3", "123"),
        ("'3' * '4'", "12"),
        ("[] + {}", "[object Object]"),
        ("({ valueOf: function () { return 5; } }) + 1", "6"),
        ("-1 >>> 28", "15"),
        ("(0.1 + 0.2) + ':' + 1 / 0 + ':' + -1 / 0 + ':' + 0 / 0", "0.30000000000000004:Infinity:-Infinity:NaN"),
        ("'b' > 'a' && 'B' < 'a' && !(NaN < 1) && !(NaN >= 1)", "true"),
        ("null == 0 || undefined == 0 || '' == 0", "true"),
        ("5 % -3 + ':' + -5 % 3", "2:-2"),
    ];
    for (src, expected) in cases {
        assert_eq!(agree(src), expected, "{src}");
    }
}

#[test]
fn recursion_limit_is_a_range_error_under_both_strategies() {
    for strategy in [Strategy::TreeWalk, Strategy::Bytecode] {
        let config = Config {
            strategy,
            recursion_limit: Some(50),
            ..Config::default()
        };
        let v = outcome(
            config,
            "function f() { return f(); } var r; try { f(); } catch (e) { r = e.name; } r",
        );
        assert_eq!(v, "RangeError");
    }
}

#[test]
fn recursion_limit_boundary_is_exact_under_both_strategies() {
    const LIMIT: u32 = 40;
    let src = format!(
        "function deep(n) {{ return n ? deep(n - 1) : 'ok'; }}\n\
         var r = deep({}) + ':';\n\
         try {{ deep({}); r += 'ok'; }} catch (e) {{ r += e.name; }}\n\
         r",
        LIMIT - 1,
        LIMIT
    );
    for strategy in [Strategy::TreeWalk, Strategy::Bytecode] {
        let config = Config {
            strategy,
            recursion_limit: Some(LIMIT),
            ..Config::default()
        };
        assert_eq!(outcome(config, &src), "ok:RangeError");
    }
}

/// Runs `f` on a thread with an ordinary 2 MiB stack.
fn on_small_stack<T: Send + 'static>(f: impl FnOnce() -> T + Send + 'static) -> T {
    std::thread::Builder::new()
        .stack_size(2 * 1024 * 1024)
        .spawn(f)
        .unwrap()
        .join()
        .unwrap()
}

#[test]
fn default_recursion_limit_fits_an_ordinary_thread() {
    let results = on_small_stack(|| {
        [Strategy::TreeWalk, Strategy::Bytecode].map(|strategy| {
            outcome(
                config(strategy, true),
                "function f() { return f(); } var r; try { f(); } catch (e) { r = e.name; } r",
            )
        })
    });
    assert_eq!(results, ["RangeError".to_string(), "RangeError".to_string()]);
}

#[test]
fn unlimited_recursion_grows_the_native_stack() {
    let results = on_small_stack(|| {
        [Strategy::TreeWalk, Strategy::Bytecode].map(|strategy| {
            let config = Config {
                strategy,
                recursion_limit: None,
                ..Config::default()
            };
            outcome(config, "function deep(n) { return n ? deep(n - 1) + 1 : 0; } deep(3000)")
        })
    });
    assert_eq!(results, ["3000".to_string(), "3000".to_string()]);
}

#[test]
fn recursion_budget_is_restored_after_unwinding() {
    let config = Config {
        recursion_limit: Some(20),
        ..Config::default()
    };
    let mut interp = Interpreter::new(config);
    interp
        .evaluate("t", "function deep(n) { return n ? deep(n - 1) : 0; } function f() { return f(); }")
        .unwrap();
    for _ in 0..3 {
        let v = interp.evaluate("t", "var r; try { f(); } catch (e) { r = e.name; } r").unwrap();
        assert_eq!(v, Some(JsValue::string("RangeError")));
    }
    let v = interp.evaluate("t", "deep(15)").unwrap();
    assert_eq!(v, Some(JsValue::Number(0.0)));
}

#[test]
fn syntax_errors_surface_to_the_host() {
    let mut interp = Interpreter::new(Config::default());
    let err = interp.evaluate("bad.js", "var = 1;").unwrap_err();
    match err {
        EngineError::Syntax(e) => {
            assert_eq!(&*e.source_name, "bad.js");
            assert_eq!(e.line, 1);
        }
        other => panic!("expected syntax error, got {other:?}"),
    }
}

#[test]
fn globals_persist_across_evaluations() {
    let mut interp = Interpreter::new(Config::default());
    interp.evaluate("a", "var counter = 1; function bump() { return ++counter; }").unwrap();
    interp.evaluate("b", "bump(); bump();").unwrap();
    assert_eq!(interp.evaluate("c", "counter").unwrap(), Some(JsValue::Number(3.0)));
    assert_eq!(interp.evaluate("d", "var unused;").unwrap(), None);
}

#[test]
fn host_call_and_construct() {
    let mut interp = Interpreter::new(Config::default());
    interp
        .evaluate("host", "function add(a, b) { return a + b; } function Pt(x) { this.x = x; } function bad() { throw new Error('no'); }")
        .unwrap();
    let global = interp.global_object();
    let add = interp.intern("add");
    let JsValue::Object(add) = interp.get(global, add).unwrap() else {
        panic!("add is not an object");
    };
    let sum = interp
        .call(add, JsValue::Undefined, &[JsValue::Number(2.0), JsValue::Number(5.0)])
        .unwrap();
    assert_eq!(sum, JsValue::Number(7.0));

    let pt = interp.intern("Pt");
    let JsValue::Object(pt) = interp.get(global, pt).unwrap() else {
        panic!("Pt is not an object");
    };
    let JsValue::Object(point) = interp.construct(pt, &[JsValue::Number(9.0)]).unwrap() else {
        panic!("construct returned a primitive");
    };
    let x = interp.intern("x");
    assert_eq!(interp.get(point, x).unwrap(), JsValue::Number(9.0));

    let bad = interp.intern("bad");
    let JsValue::Object(bad) = interp.get(global, bad).unwrap() else {
        panic!("bad is not an object");
    };
    match interp.call(bad, JsValue::Undefined, &[]) {
        Err(EngineError::Uncaught { message, traceback, .. }) => {
            assert_eq!(message, "Error: no");
            assert_eq!(traceback.len(), 1);
        }
        other => panic!("unexpected {other:?}"),
    }
    assert!(interp.try_regions.is_empty());
    assert_eq!(interp.contexts.len(), 1);
}

struct Counter {
    hits: u32,
}

struct CounterClass;

impl ObjectClass for CounterClass {
    fn class_name(&self) -> &'static str {
        "Counter"
    }

    fn get(&self, interp: &mut Interpreter, this: ObjectId, name: Atom) -> JsResult<JsValue> {
        if interp.atom_string(name).to_rust_string() != "hits" {
            return interp.native_get(this, name);
        }
        let counter = interp.object_mut(this).and_then(|o| o.host_data_mut::<Counter>());
        match counter {
            Some(counter) => {
                counter.hits += 1;
                Ok(JsValue::Number(f64::from(counter.hits)))
            }
            None => Ok(JsValue::Undefined),
        }
    }

    fn put(&self, interp: &mut Interpreter, _this: ObjectId, _name: Atom, _value: JsValue, _attrs: Attributes) -> JsResult<()> {
        Err(interp.throw_error(ErrorKind::TypeError, "counter is read-only"))
    }
}

#[test]
fn host_objects_use_their_own_class() {
    for strategy in [Strategy::TreeWalk, Strategy::Bytecode] {
        let mut interp = Interpreter::new(config(strategy, true));
        let counter = interp.create_host_object(Rc::new(CounterClass), Box::new(Counter { hits: 0 }));
        interp.define_global("counter", JsValue::Object(counter));
        let v = interp
            .evaluate("host", "counter.hits; counter.hits; var r; try { counter.hits = 0; } catch (e) { r = e.name; } r + counter.hits")
            .unwrap();
        assert_eq!(v, Some(JsValue::string("TypeError3")));
        let v = interp.evaluate("host", "Object.prototype.toString.call(counter)").unwrap();
        assert_eq!(v, Some(JsValue::string("[object Counter]")));
    }
}

#[test]
fn pinned_host_values_survive_collection() {
    let mut interp = Interpreter::new(Config::default());
    let v = interp.evaluate("pin", "({ tag: 'kept' })").unwrap();
    let Some(JsValue::Object(obj)) = v else {
        panic!("expected object");
    };
    interp.pin(obj);
    interp.collect_garbage();
    let tag = interp.intern("tag");
    assert_eq!(interp.get(obj, tag).unwrap(), JsValue::string("kept"));
    interp.unpin(obj);
    interp.collect_garbage();
    assert!(interp.object(obj).is_none());
}

#[test]
fn undefdef_reads_unresolved_names_as_undefined() {
    let strict = outcome(Config::default(), "var r; try { r = missing; } catch (e) { r = e.name; } r");
    assert_eq!(strict, "ReferenceError");
    let lenient = outcome(
        Config {
            compat: CompatFlags::UNDEFDEF,
            ..Config::default()
        },
        "typeof missing + ':' + (missing === undefined)",
    );
    assert_eq!(lenient, "undefined:true");
}

#[test]
fn sgml_comments_need_their_flag() {
    let src = "var a = 1;\n<!-- ignored\na";
    let with_flag = outcome(
        Config {
            compat: CompatFlags::SGML_COMMENT,
            ..Config::default()
        },
        src,
    );
    assert_eq!(with_flag, "1");
    assert!(outcome(Config::default(), src).starts_with("syntax"));
}

#[test]
fn annex_b_octal_literals() {
    let annex_b = Config {
        compat: CompatFlags::ANNEX_B,
        ..Config::default()
    };
    assert_eq!(outcome(annex_b, "010 + '\\101'"), "8A");
    assert_eq!(outcome(Config::default(), "010"), "10");
}

fn panicking_abort(message: &str) -> ! {
    panic!("abort: {message}")
}

#[test]
#[should_panic(expected = "abort: object limit exhausted")]
fn object_limit_routes_to_abort_hook() {
    let mut interp = Interpreter::new(Config {
        object_limit: Some(2_000),
        ..Config::default()
    });
    interp.set_abort_hook(panicking_abort);
    let _ = interp.evaluate("limit", "var a = []; for (var i = 0; i < 5000; i++) a[i] = {};");
}

#[test]
fn collection_between_statements_keeps_live_values() {
    for strategy in [Strategy::TreeWalk, Strategy::Bytecode] {
        let mut interp = Interpreter::new(Config {
            strategy,
            gc_threshold: 50,
            ..Config::default()
        });
        let v = interp
            .evaluate(
                "gc",
                "var keep = { v: 'alive' };\n\
                 for (var i = 0; i < 200; i++) { var tmp = { n: i }; }\n\
                 for (var j = 0; j < 200; j++) { var tmp2 = [j]; }\n\
                 keep.v + tmp.n + tmp2[0]",
            )
            .unwrap();
        assert_eq!(v, Some(JsValue::string("alive199199")));
    }
}

#[test]
fn shared_literal_table_seeds_atoms() {
    let literals = Arc::new(LiteralTable::with_extra(&["hostName"]));
    let mut a = Interpreter::with_literals(literals.clone(), Config::default());
    let mut b = Interpreter::with_literals(literals, Config::default());
    let in_a = a.intern("hostName");
    let in_b = b.intern("hostName");
    assert_eq!(in_a, in_b);
    assert!(a.interner().is_literal(in_a));
}

fn leaf() -> impl proptest::strategy::Strategy<Value = String> {
    prop_oneof![
        (-20i32..20).prop_map(|n| n.to_string()),
        (0u32..1000).prop_map(|n| format!("{}.{}", n / 100, n % 100)),
        Just("'7'".to_string()),
        Just("'x'".to_string()),
        Just("''".to_string()),
        Just("true".to_string()),
        Just("null".to_string()),
        Just("undefined".to_string()),
        Just("NaN".to_string()),
    ]
}

fn expression() -> impl proptest::strategy::Strategy<Value = String> {
    leaf().prop_recursive(4, 32, 3, |inner| {
        let binary = prop_oneof![
            Just("+"), Just("-"), Just("*"), Just("/"), Just("%"),
            Just("<<"), Just(">>"), Just(">>>"), Just("&"), Just("|"), Just("^"),
            Just("<"), Just(">"), Just("<="), Just(">="),
            Just("=="), Just("!="), Just("==="), Just("!=="),
            Just("&&"), Just("||"), Just(","),
        ];
        let unary = prop_oneof![Just("-"), Just("+"), Just("!"), Just("~"), Just("typeof"), Just("void")];
        prop_oneof![
            (inner.clone(), binary, inner.clone()).prop_map(|(l, op, r)| format!("({l} {op} {r})")),
            (unary, inner.clone()).prop_map(|(op, e)| format!("({op} {e})")),
            (inner.clone(), inner.clone(), inner).prop_map(|(c, t, e)| format!("({c} ? {t} : {e})")),
        ]
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn random_arithmetic_agrees_across_strategies(expr in expression()) {
        let src = format!("var v = {expr}; typeof v + ':' + v");
        let tree = outcome(config(Strategy::TreeWalk, true), &src);
        let folded = outcome(config(Strategy::Bytecode, true), &src);
        let unfolded = outcome(config(Strategy::Bytecode, false), &src);
        prop_assert_eq!(&tree, &folded);
        prop_assert_eq!(&tree, &unfolded);
    }
}
