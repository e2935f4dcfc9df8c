// tests/programs.rs
//! Whole programs through the public API.

use std::cell::RefCell;
use std::rc::Rc;

use stone::lexer::TokenType;
use stone::{Frame, Natives, Program, StoneError, Value};

type Calls = Rc<RefCell<Vec<Vec<Value>>>>;

/// Loads `source` with a `print` that records its arguments.
fn load_capturing(source: &str) -> (Program, Calls) {
    let calls: Calls = Rc::default();
    let sink = Rc::clone(&calls);
    let mut natives = Natives::new();
    natives.register("print", move |args: &mut [Value]| {
        sink.borrow_mut().push(args.to_vec());
    });
    let program = stone::load_with(source, natives).unwrap();
    (program, calls)
}

fn run_main(source: &str) -> (Frame, Vec<Vec<Value>>) {
    let (program, calls) = load_capturing(source);
    let mut frame = Frame::new();
    program.execute("main", &mut frame).unwrap();
    let printed = calls.borrow().clone();
    (frame, printed)
}

#[test]
fn straight_line_arithmetic() {
    let (frame, _) = run_main(
        r#"
        void main() {
            int a; int b; int c;
            a = 4;
            b = a * 3;
            c = b - a;
            c = c / 2;
        }
        "#,
    );
    assert_eq!(frame.locals(), &[Value::Int(4), Value::Int(12), Value::Int(4)]);
}

#[test]
fn string_concatenation() {
    let (frame, _) = run_main(
        r#"void main() { string s; s = "foo"; s = s + "bar"; }"#,
    );
    assert_eq!(frame.locals(), &[Value::from("foobar")]);
}

#[test]
fn identifiers_share_ids_by_text() {
    let program = stone::load("void main() { int a; int b; a = b; b = a; }").unwrap();
    let names: Vec<&str> = program
        .identifiers()
        .iter()
        .map(|i| i.text.as_str())
        .collect();
    assert_eq!(names, ["main", "a", "b"]);

    let id_of = |text: &str| -> Vec<u32> {
        program
            .tokens()
            .iter()
            .filter(|t| t.kind == TokenType::Identifier && t.text == text)
            .map(|t| t.id)
            .collect()
    };
    let a = id_of("a");
    let b = id_of("b");
    assert_eq!(a.len(), 3);
    assert!(a.iter().all(|id| *id == a[0]));
    assert!(b.iter().all(|id| *id == b[0]));
    assert_ne!(a[0], b[0]);
}

#[test]
fn if_else_selects_a_branch() {
    let source = r#"
        void pick(int a, int b) {
            if (a == b) { print(1); } else { print(2); }
        }
    "#;
    let (program, calls) = load_capturing(source);
    program
        .execute("pick", &mut Frame::with_args(vec![Value::Int(3), Value::Int(3)]))
        .unwrap();
    program
        .execute("pick", &mut Frame::with_args(vec![Value::Int(3), Value::Int(4)]))
        .unwrap();
    assert_eq!(*calls.borrow(), vec![vec![Value::Int(1)], vec![Value::Int(2)]]);
}

#[test]
fn while_loop_runs_three_times() {
    let (frame, printed) = run_main(
        r#"
        void main() {
            int i;
            i = 0;
            while (i < 3) {
                print(i);
                i = i + 1;
            }
        }
        "#,
    );
    assert_eq!(frame.local(0), Some(&Value::Int(3)));
    assert_eq!(printed.len(), 3);
}

#[test]
fn nested_control_flow() {
    let (frame, _) = run_main(
        r#"
        void main() {
            int i; int evens; int half;
            i = 0;
            evens = 0;
            while (i < 10) {
                half = i / 2;
                half = half * 2;
                if (half == i) { evens = evens + 1; }
                i = i + 1;
            }
        }
        "#,
    );
    assert_eq!(frame.local(1), Some(&Value::Int(5)));
}

#[test]
fn last_comparison_decides() {
    // `a < 1` is false, `a > 5` is true: only the second is observed.
    let (_, printed) = run_main(
        r#"
        void main() {
            int a;
            a = 9;
            if (a < 1 a > 5) { print("taken"); } else { print("skipped"); }
        }
        "#,
    );
    assert_eq!(printed, vec![vec![Value::from("taken")]]);
}

#[test]
fn mismatched_kinds_degrade_quietly() {
    let (frame, printed) = run_main(
        r#"
        void main() {
            int n; string s; int sum;
            n = 1;
            s = "1";
            sum = n + s;
            if (n == s) { print("equal"); } else { print("different"); }
        }
        "#,
    );
    assert_eq!(frame.local(2), Some(&Value::None));
    assert_eq!(printed, vec![vec![Value::from("different")]]);
}

#[test]
fn print_receives_exact_values() {
    let (_, printed) = run_main(
        r#"void main() { int a; string b; a = 1; b = "hi"; print(a, b); }"#,
    );
    assert_eq!(printed, vec![vec![Value::Int(1), Value::from("hi")]]);
}

#[test]
fn user_functions_get_copies() {
    let (frame, printed) = run_main(
        r#"
        void bump(int n) {
            int m;
            m = n + 1;
            print(m);
        }
        void main() {
            int x;
            x = 5;
            bump(x);
            print(x);
        }
        "#,
    );
    assert_eq!(frame.locals(), &[Value::Int(5)]);
    assert_eq!(printed, vec![vec![Value::Int(6)], vec![Value::Int(5)]]);
}

#[test]
fn recursion_through_forward_calls() {
    let (_, printed) = run_main(
        r#"
        void main() { countdown(3); }
        void countdown(int n) {
            if (n > 0) {
                int next;
                print(n);
                next = n - 1;
                countdown(next);
            }
        }
        "#,
    );
    assert_eq!(
        printed,
        vec![vec![Value::Int(3)], vec![Value::Int(2)], vec![Value::Int(1)]]
    );
}

#[test]
fn declaration_in_a_loop_keeps_later_slots() {
    let (frame, _) = run_main(
        r#"
        void main() {
            int i; int total;
            i = 0;
            total = 0;
            while (i < 2) {
                int step;
                step = 10;
                total = total + step;
                i = i + 1;
            }
        }
        "#,
    );
    assert_eq!(frame.local(1), Some(&Value::Int(20)));
}

#[test]
fn natives_fill_caller_variables() {
    let mut natives = Natives::new();
    natives.register("answer", |args: &mut [Value]| {
        for arg in args.iter_mut() {
            arg.set_int(42);
        }
    });
    let program = stone::load_with("void main() { int a; answer(a); }", natives).unwrap();
    let mut frame = Frame::new();
    program.execute("main", &mut frame).unwrap();
    assert_eq!(frame.locals(), &[Value::Int(42)]);
}

#[test]
fn natives_are_callable_by_name() {
    let (program, calls) = load_capturing("void main() { }");
    program
        .execute("print", &mut Frame::with_args(vec![Value::from("direct")]))
        .unwrap();
    assert_eq!(*calls.borrow(), vec![vec![Value::from("direct")]]);
}

#[test]
fn execute_errors() {
    let program = stone::load("void greet(string who) { print(who); }").unwrap();
    assert!(matches!(
        program.execute("missing", &mut Frame::new()),
        Err(StoneError::UnknownEntry(name)) if name == "missing"
    ));
    assert!(matches!(
        program.execute("greet", &mut Frame::new()),
        Err(StoneError::ArgumentCount { expected: 1, found: 0, .. })
    ));
}

#[test]
fn load_errors_carry_positions() {
    let err = stone::load("void main() {\n  int a;\n  a = b;\n}").unwrap_err();
    assert_eq!(err.position(), Some((3, 7)));
    assert_eq!(err.to_string(), "(3:7): unknown variable `b`");

    let err = stone::load("void main() { a = $; }").unwrap_err();
    assert!(matches!(err, StoneError::Lex { .. }));
}
