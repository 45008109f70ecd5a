// Tests for small graphs built from the standard units.

use std::{cell::RefCell, rc::Rc, time::Duration};
use tandem_core::{ComputeError, Failure, Graph, Status, Value, ValueType};
use tandem_std::{
    Arith, ArithOp, Branch, Cast, Compare, CompareOp, Constant, DebugText, FnUnit, GetVar,
    Interval, SetVar, Ticker, Vars,
};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A debug text unit that records every rendered value.
fn recording_debug(level: log::Level) -> (DebugText, Rc<RefCell<Vec<String>>>) {
    let texts = Rc::new(RefCell::new(vec![]));
    let t = texts.clone();
    let debug = DebugText::new(level).with_sink(move |s| {
        t.borrow_mut().push(s.to_string());
        true
    });
    (debug, texts)
}

// -+-------  -+-------
// | five |   | one  |
// -+-------  -+-------
//  |          |
// -+------------
// |    add    |
// -+------------
#[test]
fn test_add_constants() {
    init_logger();
    let mut g = Graph::new();
    let five = g.add_unit(Constant::new(5));
    let one = g.add_unit(Constant::new(1));
    let add = g.add_unit(Arith::new(ArithOp::Add, ValueType::Int));
    g.connect_value(five, 0, add, 0).unwrap();
    g.connect_value(one, 0, add, 1).unwrap();
    assert_eq!(g.pull(add), Ok(vec![Value::Int(6)]));
}

#[test]
fn test_unconnected_operand_uses_identity() {
    let mut g = Graph::new();
    let five = g.add_unit(Constant::new(5.0));
    let div = g.add_unit(Arith::new(ArithOp::Div, ValueType::Float));
    g.connect_value(five, 0, div, 0).unwrap();
    assert_eq!(g.pull(div), Ok(vec![Value::Float(5.0)]));
}

// -+---
// | 2 |
// -+---
//  |
// -+-----
// | add |  (`r` removed)
// -+-----
#[test]
fn test_removed_input_fails_compute() {
    init_logger();
    let mut g = Graph::new();
    let two = g.add_unit(Constant::new(2));
    let add = g.add_unit(Arith::new(ArithOp::Add, ValueType::Int));
    g.connect_value(two, 0, add, 0).unwrap();
    let r = g.port(add, tandem_core::port::Kind::ValueIn, 1).unwrap();
    g.remove_port(r).unwrap();
    assert!(matches!(
        g.pull(add),
        Err(Failure::ComputeFailure { unit, .. }) if unit == add
    ));

    // A unit left with no inputs at all fails the same way.
    let cast = g.add_unit(Cast::new(ValueType::Text));
    let value = g.port(cast, tandem_core::port::Kind::ValueIn, 0).unwrap();
    g.remove_port(value).unwrap();
    assert!(matches!(
        g.pull(cast),
        Err(Failure::ComputeFailure { unit, .. }) if unit == cast
    ));
}

// -+------
// | "41" |
// -+------
//  |
// -+------    -+---
// | cast |    | 1 |
// -+------    -+---
//  |           |
// -+-------------
// |     add     |
// -+-------------
#[test]
fn test_cast_then_add() {
    let mut g = Graph::new();
    let text = g.add_unit(Constant::new("41"));
    let cast = g.add_unit(Cast::new(ValueType::Int));
    let one = g.add_unit(Constant::new(1));
    let add = g.add_unit(Arith::new(ArithOp::Add, ValueType::Int));
    g.connect_value(text, 0, cast, 0).unwrap();
    g.connect_value(cast, 0, add, 0).unwrap();
    g.connect_value(one, 0, add, 1).unwrap();
    assert_eq!(g.pull(add), Ok(vec![Value::Int(42)]));

    // The text constant cannot be connected to the integer input directly.
    assert!(g.connect_value(text, 0, add, 0).is_err());
}

#[test]
fn test_failing_fn_unit_fails_consumer() {
    let mut g = Graph::new();
    let calls = Rc::new(RefCell::new(0));
    let c = calls.clone();
    let src = g.add_unit(FnUnit::new("flaky", ValueType::Int, move || {
        *c.borrow_mut() += 1;
        Err(ComputeError::new("unavailable"))
    }));
    let add = g.add_unit(Arith::new(ArithOp::Add, ValueType::Int));
    g.connect_value(src, 0, add, 0).unwrap();
    let failure = g.pull(add).unwrap_err();
    assert_eq!(
        failure.root_cause(),
        &Failure::ComputeFailure {
            unit: src,
            error: ComputeError::new("unavailable"),
        }
    );
    assert_eq!(*calls.borrow(), 1);
}

// A counter incremented on every update.
//
// -+------
// | tick |
// -+------     -+---------   -+---
//  |           | get-var |   | 1 |
//  |           -+---------   -+---
//  |            |             |
//  |           -+---------------
//  |           |      add      |
//  |           -+---------------
//  |            |
// -+-------------
// |   set-var   |
// -+-------------
#[test]
fn test_ticker_counter() {
    init_logger();
    let mut g = Graph::new();
    let vars = Vars::new();
    vars.create("count", 0).unwrap();
    let mut ticker = Ticker::add(&mut g, Interval::EveryUpdate);
    let get = g.add_unit(GetVar::new(vars.clone(), "count"));
    let one = g.add_unit(Constant::new(1));
    let add = g.add_unit(Arith::new(ArithOp::Add, ValueType::Int));
    let set = g.add_unit(SetVar::new(vars.clone(), "count"));
    g.connect_value(get, 0, add, 0).unwrap();
    g.connect_value(one, 0, add, 1).unwrap();
    g.connect_value(add, 0, set, 0).unwrap();
    g.connect_control(ticker.unit(), 0, set).unwrap();

    for _ in 0..3 {
        let result = ticker.update(&mut g, Duration::from_millis(16));
        assert_eq!(result, Some(Ok(vec![])));
    }
    assert_eq!(vars.get("count"), Some(Value::Int(3)));
}

#[test]
fn test_ticker_interval() {
    let mut g = Graph::new();
    let fires = Rc::new(RefCell::new(0));
    let f = fires.clone();
    let mut ticker = Ticker::add(&mut g, Interval::Every(Duration::from_millis(100)));
    g.on_status(ticker.unit(), move |ev| {
        if ev.status == Status::ProcessSuccess {
            *f.borrow_mut() += 1;
        }
    })
    .unwrap();

    let ms = Duration::from_millis;
    assert!(ticker.update(&mut g, ms(0)).is_some());
    assert!(ticker.update(&mut g, ms(60)).is_none());
    assert!(ticker.update(&mut g, ms(60)).is_some());
    assert!(ticker.update(&mut g, ms(99)).is_none());
    assert!(ticker.update(&mut g, ms(1)).is_some());
    assert_eq!(*fires.borrow(), 3);

    // Zero intervals are ignored.
    ticker.set_interval(Interval::Every(Duration::ZERO));
    assert_eq!(ticker.interval(), Interval::Every(ms(100)));
}

// -+------                -+-----   -+----
// | root |                | x  |    | 10 |
// -+------                -+-----   -+----
//  |                       |         |
// -+-------------         -+-----------
// |   branch    |---------|    gt     |
// -+---------+---         -+-----------
//  |true     |false
// -+-----   -+-----
// | big |   |small|
// -+-----   -+-----
#[test]
fn test_branch_on_comparison() {
    init_logger();
    let mut g = Graph::new();
    let vars = Vars::new();
    vars.create("x", 11).unwrap();
    let root = g.add_unit(Constant::new(Value::Unit));
    let x = g.add_unit(GetVar::new(vars.clone(), "x"));
    let ten = g.add_unit(Constant::new(10));
    let gt = g.add_unit(Compare::new(CompareOp::Gt, ValueType::Int));
    let branch = g.add_unit(Branch);
    let (big, big_texts) = recording_debug(log::Level::Debug);
    let (small, small_texts) = recording_debug(log::Level::Debug);
    let big = g.add_unit(big);
    let small = g.add_unit(small);
    let big_label = g.add_unit(Constant::new("big"));
    let small_label = g.add_unit(Constant::new("small"));

    g.connect_control(root, 0, branch).unwrap();
    g.connect_value(x, 0, gt, 0).unwrap();
    g.connect_value(ten, 0, gt, 1).unwrap();
    g.connect_value(gt, 0, branch, 0).unwrap();
    g.connect_control(branch, Branch::TRUE, big).unwrap();
    g.connect_control(branch, Branch::FALSE, small).unwrap();
    g.connect_value(big_label, 0, big, 0).unwrap();
    g.connect_value(small_label, 0, small, 0).unwrap();

    g.fire(root).unwrap();
    vars.update("x", 3).unwrap();
    g.fire(root).unwrap();
    assert_eq!(*big_texts.borrow(), ["big"]);
    assert_eq!(*small_texts.borrow(), ["small"]);
}

#[test]
fn test_debug_text_outputs_value_and_text() {
    let mut g = Graph::new();
    let list = Value::List(vec![Value::Int(1), Value::Bool(true)]);
    let src = g.add_unit(Constant::new(list.clone()));
    let debug = g.add_unit(DebugText::default());
    g.connect_value(src, 0, debug, 0).unwrap();
    assert_eq!(
        g.fire(debug),
        Ok(vec![list, Value::from("[1, true]")])
    );
}

#[test]
fn test_debug_text_sink_rejection_fails_compute() {
    let mut g = Graph::new();
    let src = g.add_unit(Constant::new(1));
    let debug = g.add_unit(DebugText::new(log::Level::Info).with_sink(|_| false));
    g.connect_value(src, 0, debug, 0).unwrap();
    assert!(matches!(
        g.fire(debug),
        Err(Failure::ComputeFailure { unit, .. }) if unit == debug
    ));
}

#[test]
fn test_debug_text_serializes_without_sink() {
    let (debug, _) = recording_debug(log::Level::Warn);
    let json = serde_json::to_string(&debug).unwrap();
    let back: DebugText = serde_json::from_str(&json).unwrap();
    assert_eq!(back.level, log::Level::Warn);
}

#[test]
fn test_set_var_rejects_other_types() {
    let mut g = Graph::new();
    let vars = Vars::new();
    vars.create("name", "tandem").unwrap();
    let value = g.add_unit(FnUnit::new("any", ValueType::Any, || Ok(Value::Int(1))));
    let set = g.add_unit(SetVar::new(vars.clone(), "name"));
    // The set unit's input is typed by the variable at the time it was added.
    assert!(g.connect_value(value, 0, set, 0).is_err());
    let input = g.port(set, tandem_core::port::Kind::ValueIn, 0).unwrap();
    g.remove_port(input).unwrap();
    g.add_port(set, tandem_core::port::Decl::value_in("value", ValueType::Any))
        .unwrap();
    g.connect_value(value, 0, set, 0).unwrap();
    assert!(matches!(g.fire(set), Err(Failure::ComputeFailure { .. })));
    assert_eq!(vars.get("name"), Some(Value::from("tandem")));
}
