use indexmap::IndexMap;
use proptest::prelude::*;

use crate::{
    self as ir,
    ir_mutator::IrMutator,
    ir_operator::{as_const_int, make_const},
    simplify::VarInfo,
    substitute::substitute,
    CallType, DeviceApi, Expr, ForType, Interval, ModulusRemainder, Options, Scope, Simplify,
    Stmt, Type,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn int_var(name: &str) -> Expr {
    Expr::var(Type::Int32, name)
}

fn simplify_with_bounds(e: &Expr, bounds: &Scope<Interval>) -> Expr {
    ir::simplify(e, true, bounds, &Scope::new())
}

#[test]
fn test_prove_reflexive() {
    init_logging();
    let x = int_var("x");
    assert!(ir::can_prove(&Expr::eq(x.clone(), x.clone())));
    assert!(ir::can_prove(&Expr::le(x.clone(), x.clone())));
    assert!(!ir::can_prove(&Expr::lt(x.clone(), x)));
}

#[test]
fn test_prove_offsets() {
    init_logging();
    let x = int_var("x");
    assert!(ir::can_prove(&Expr::gt(x.clone() + 1, x.clone())));
    assert!(ir::can_prove(&Expr::ne(x.clone() + 2, x.clone() - 3)));
    assert!(!ir::can_prove(&Expr::lt(x.clone() + 1, x)));
}

#[test]
fn test_prove_refuted_by_counter_example() {
    init_logging();
    let x = int_var("x");
    let y = int_var("y");
    assert!(!ir::can_prove(&Expr::lt(x, y)));
}

#[test]
fn test_prove_inconclusive_is_false() {
    init_logging();
    let x = int_var("x");
    // True for every trial value, but beyond the simplifier.
    assert!(!ir::can_prove(&Expr::ge(x.clone() * x, Expr::from(0))));
}

#[test]
fn test_prove_ignores_likely() {
    init_logging();
    let x = int_var("x");
    let e = Expr::likely(Expr::lt(x.clone(), x + 1));
    assert!(ir::can_prove(&e));
}

#[test]
fn test_prove_with_lets() {
    init_logging();
    let x = int_var("x");
    let t = int_var("t");
    let e = Expr::let_in("t", Expr::from(4), Expr::lt(x.clone(), x + t));
    assert!(ir::can_prove(&e));
}

#[test]
#[should_panic(expected = "Argument to can_prove is not a boolean Expr")]
fn test_prove_rejects_non_boolean() {
    ir::can_prove(&(int_var("x") + 1));
}

#[test]
fn test_prover_options() {
    init_logging();
    let options = Options {
        proof_trials: 0,
        ..Options::default()
    };
    let x = int_var("x");
    let y = int_var("y");
    // With no trials nothing can be refuted, but nothing is proven either.
    assert!(!ir::Prover::with_options(&options).can_prove(&Expr::lt(x, y)));
}

#[test]
fn test_const_extractors() {
    let vector = Expr::broadcast(Expr::from(3), 4);
    assert_eq!(Simplify::const_int(&vector), None);
    assert_eq!(Simplify::const_int(&Expr::from(3)), Some(3));
    assert_eq!(Simplify::const_int(&Expr::from(1.5f32)), None);
    assert_eq!(Simplify::const_float(&Expr::from(1.5f32)), Some(1.5));
    assert_eq!(Simplify::const_uint(&make_const(Type::UInt8, 7)), Some(7));
    assert_eq!(
        Simplify::const_uint(&make_const(Type::UInt8.with_lanes(2), 7)),
        None
    );
}

#[test]
fn test_found_buffer_reference() {
    let alignment = Scope::new();
    let mut simplify = Simplify::new(true, &Scope::new(), &alignment);
    for name in ["buf", "buf.stride.0", "buf.min.0", "buf.stride.1"] {
        simplify.var_info.push(name, VarInfo::default());
    }

    simplify.found_buffer_reference("buf", 0);
    assert_eq!(simplify.var_info("buf").map(|info| info.old_uses), Some(1));
    assert_eq!(simplify.var_info("buf.stride.0").map(|info| info.old_uses), Some(0));

    simplify.found_buffer_reference("buf", 1);
    assert_eq!(simplify.var_info("buf").map(|info| info.old_uses), Some(2));
    assert_eq!(simplify.var_info("buf.stride.0").map(|info| info.old_uses), Some(1));
    assert_eq!(simplify.var_info("buf.min.0").map(|info| info.old_uses), Some(1));
    assert_eq!(simplify.var_info("buf.stride.1").map(|info| info.old_uses), Some(0));

    // Names never bound are ignored.
    simplify.found_buffer_reference("other", 2);
    assert!(simplify.var_info("other").is_none());
}

#[test]
fn test_bounds_decide_comparisons() {
    init_logging();
    let mut bounds = Scope::new();
    bounds.push("x", Interval::bounded(Expr::from(0), Expr::from(5)));
    let x = int_var("x");

    assert_eq!(
        simplify_with_bounds(&Expr::lt(x.clone(), Expr::from(10)), &bounds),
        Expr::from(true)
    );
    assert_eq!(
        simplify_with_bounds(&Expr::eq(x.clone(), Expr::from(7)), &bounds),
        Expr::from(false)
    );
    assert_eq!(
        simplify_with_bounds(&Expr::min(x.clone(), Expr::from(8)), &bounds),
        x
    );
    assert_eq!(simplify_with_bounds(&(x.clone() % 8), &bounds), x);
    assert_eq!(
        simplify_with_bounds(&Expr::lt(x.clone(), Expr::from(3)), &bounds),
        Expr::lt(x, Expr::from(3))
    );
}

#[test]
fn test_bounds_pin_a_value() {
    let mut bounds = Scope::new();
    bounds.push("x", Interval::single_point(Expr::from(3)));
    // Symbolic ends are ignored.
    bounds.push("y", Interval::bounded(int_var("z"), Expr::from(10)));

    assert_eq!(
        simplify_with_bounds(&(int_var("x") + 1), &bounds),
        Expr::from(4)
    );
    assert_eq!(
        simplify_with_bounds(&Expr::lt(int_var("y"), Expr::from(20)), &bounds),
        Expr::from(true)
    );
}

#[test]
fn test_offsets_near_the_type_limits() {
    let x = int_var("x");
    let mut zero = IndexMap::new();
    zero.insert("x".to_string(), Expr::from(0));

    for e in [
        Expr::lt(x.clone() + 10, Expr::from(-2147483647)),
        Expr::le(x.clone() + -10, Expr::from(2147483640)),
        Expr::lt(Expr::from(2147483640), x.clone() + -10),
        Expr::eq(x.clone() + 10, Expr::from(-2147483647)),
    ] {
        let simplified = ir::simplify_expr(&e);
        assert_eq!(
            ir::simplify_expr(&substitute(&zero, &simplified)),
            ir::simplify_expr(&substitute(&zero, &e)),
            "{} became {}",
            e,
            simplified
        );
    }
}

#[test]
fn test_alignment_decides_mod() {
    let mut alignment = Scope::new();
    alignment.push("x", ModulusRemainder::new(4, 1));
    let x = int_var("x");

    assert_eq!(
        ir::simplify(&(x.clone() % 4), true, &Scope::new(), &alignment),
        Expr::from(1)
    );
    assert_eq!(
        ir::simplify(&((x.clone() * 2 + 3) % 2), true, &Scope::new(), &alignment),
        Expr::from(1)
    );
    assert_eq!(
        ir::simplify(&(x.clone() % 3), true, &Scope::new(), &alignment),
        x % 3
    );
}

#[test]
fn test_dead_lets() {
    init_logging();
    let x = int_var("x");
    let y = int_var("y");
    let t = int_var("t");

    let alignment = Scope::new();
    let mut simplify = Simplify::new(true, &Scope::new(), &alignment);
    let e = Expr::let_in("t", Expr::from(3), t.clone() * t.clone() + x.clone());
    assert_eq!(simplify.mutate_expr(&e), x.clone() + 9);
    assert_eq!(simplify.stats().replaced_uses, 2);
    assert_eq!(simplify.stats().dead_lets, 1);

    let live = Expr::let_in("t", x.clone() * y.clone(), t.clone() + t.clone());
    assert!(ir::simplify_expr(&live).same_as(&live));

    // The counted uses are cancelled away, so the binding goes too.
    let cancelled = Expr::let_in("t", x.clone() * y, t.clone() - t);
    assert_eq!(ir::simplify_expr(&cancelled), Expr::from(0));

    let unused = Expr::let_in("t", x.clone(), Expr::from(5));
    assert_eq!(
        ir::simplify(&unused, false, &Scope::new(), &Scope::new()),
        Expr::let_in("t", x, Expr::from(5))
    );
}

#[test]
fn test_let_values_bound_their_uses() {
    let x = int_var("x");
    let t = int_var("t");
    let e = Expr::let_in("t", x % 4, Expr::lt(t, Expr::from(4)));
    assert_eq!(ir::simplify_expr(&e), Expr::from(true));
}

#[test]
fn test_buffer_metadata_lets_survive() {
    let i = int_var("i");
    let body = Stmt::evaluate(Expr::call(
        Type::Int32,
        "buf",
        CallType::Image,
        vec![i.clone()],
    ));
    let s = Stmt::let_stmt("buf.stride.0", int_var("stride"), body.clone());
    assert!(ir::simplify_stmt(&s, true, &Scope::new(), &Scope::new()).same_as(&s));

    let s = Stmt::let_stmt("unrelated", int_var("stride"), body.clone());
    assert_eq!(
        ir::simplify_stmt(&s, true, &Scope::new(), &Scope::new()),
        body
    );
}

#[test]
fn test_select_learns_condition() {
    let x = int_var("x");
    let e = Expr::select(
        Expr::eq(x.clone(), Expr::from(3)),
        x.clone() + 1,
        x.clone() * 2,
    );
    assert_eq!(
        ir::simplify_expr(&e),
        Expr::select(Expr::eq(x.clone(), Expr::from(3)), Expr::from(4), x * 2)
    );

    let b = Expr::var(Type::Bool, "b");
    let e = Expr::select(
        Expr::logical_not(b.clone()),
        Expr::from(1),
        Expr::select(b.clone(), Expr::from(2), Expr::from(3)),
    );
    // Not(b) false in the false arm means b is true there.
    assert_eq!(
        ir::simplify_expr(&e),
        Expr::select(b, Expr::from(2), Expr::from(1))
    );
}

#[test]
fn test_if_then_else() {
    init_logging();
    let x = int_var("x");
    let store = |value: Expr| Stmt::store("out", value, Expr::from(0));

    let s = Stmt::if_then_else(
        Expr::eq(x.clone(), Expr::from(3)),
        store(x.clone() + 1),
        Some(store(x.clone())),
    );
    assert_eq!(
        ir::simplify_stmt(&s, true, &Scope::new(), &Scope::new()),
        Stmt::if_then_else(
            Expr::eq(x.clone(), Expr::from(3)),
            store(Expr::from(4)),
            Some(store(x.clone())),
        )
    );

    let s = Stmt::if_then_else(
        Expr::lt(Expr::from(1), Expr::from(2)),
        store(Expr::from(1) + 1),
        Some(store(x.clone())),
    );
    assert_eq!(
        ir::simplify_stmt(&s, true, &Scope::new(), &Scope::new()),
        store(Expr::from(2))
    );

    let s = Stmt::if_then_else(
        Expr::lt(x.clone(), Expr::from(3)),
        Stmt::no_op(),
        Some(store(x.clone())),
    );
    assert_eq!(
        ir::simplify_stmt(&s, true, &Scope::new(), &Scope::new()),
        Stmt::if_then_else(Expr::le(Expr::from(3), x.clone()), store(x), None)
    );
}

#[test]
fn test_loops() {
    init_logging();
    let i = int_var("i");
    let body = Stmt::store(
        "out",
        Expr::select(Expr::lt(i.clone(), Expr::from(10)), i.clone(), Expr::from(0)),
        i.clone(),
    );
    let s = Stmt::for_loop(
        "i",
        Expr::from(0),
        Expr::from(10),
        ForType::Serial,
        DeviceApi::Host,
        body,
    );
    assert_eq!(
        ir::simplify_stmt(&s, true, &Scope::new(), &Scope::new()),
        Stmt::for_loop(
            "i",
            Expr::from(0),
            Expr::from(10),
            ForType::Serial,
            DeviceApi::Host,
            Stmt::store("out", i.clone(), i.clone()),
        )
    );

    let empty = Stmt::for_loop(
        "i",
        Expr::from(0),
        Expr::from(4) - 4,
        ForType::Parallel,
        DeviceApi::None,
        Stmt::store("out", i.clone(), i),
    );
    assert_eq!(
        ir::simplify_stmt(&empty, true, &Scope::new(), &Scope::new()),
        Stmt::no_op()
    );
}

#[test]
fn test_loop_variable_shadows_outer_bounds() {
    let mut bounds = Scope::new();
    bounds.push("i", Interval::single_point(Expr::from(100)));
    let i = int_var("i");
    let s = Stmt::for_loop(
        "i",
        Expr::from(0),
        int_var("n"),
        ForType::Serial,
        DeviceApi::None,
        Stmt::store("out", i.clone(), i.clone()),
    );
    assert!(ir::simplify_stmt(&s, true, &bounds, &Scope::new()).same_as(&s));
}

#[test]
fn test_asserts_and_blocks() {
    let x = int_var("x");
    let store = Stmt::store("out", x.clone(), Expr::from(0));
    let s = Stmt::block_of([
        Stmt::assert_stmt(Expr::le(x.clone(), x.clone()), Expr::from(0)),
        store.clone(),
        Stmt::no_op(),
    ]);
    assert_eq!(
        ir::simplify_stmt(&s, true, &Scope::new(), &Scope::new()),
        store
    );

    let failing = Stmt::assert_stmt(Expr::lt(x.clone(), x), Expr::from(7));
    assert_eq!(
        ir::simplify_stmt(&failing, true, &Scope::new(), &Scope::new()),
        Stmt::assert_stmt(Expr::from(false), Expr::from(7))
    );
}

#[test]
fn test_simplify_all_subexpressions() {
    let t = int_var("t");
    let s = Stmt::let_stmt(
        "t",
        Expr::from(2) + 3,
        Stmt::store("out", t.clone() * 1, t.clone()),
    );
    assert_eq!(
        ir::simplify_all_subexpressions(&s),
        Stmt::let_stmt("t", Expr::from(5), Stmt::store("out", t.clone(), t))
    );
}

struct NoRules;

impl ir::RewriteRules for NoRules {
    fn rewrite(&self, _e: &Expr) -> Option<Expr> {
        None
    }
}

#[test]
fn test_pluggable_rules() {
    let x = int_var("x");
    let alignment = Scope::new();
    let mut simplify = Simplify::new(true, &Scope::new(), &alignment).with_rules(&NoRules);
    assert_eq!(simplify.mutate_expr(&(x.clone() + 0)), x.clone() + 0);
    assert_eq!(simplify.mutate_expr(&(Expr::from(2) + 3)), Expr::from(5));
}

#[test]
fn test_no_float_simplify() {
    let e = Expr::from(1.5f32) + Expr::from(2.0f32);
    let alignment = Scope::new();
    let options = Options {
        no_float_simplify: true,
        ..Options::default()
    };
    let mut simplify = Simplify::with_options(&options, &Scope::new(), &alignment);
    assert_eq!(simplify.mutate_expr(&e), e);
    assert_eq!(ir::simplify_expr(&e), Expr::from(3.5f32));
}

#[test]
fn test_vectors() {
    let a = Expr::broadcast(Expr::from(3), 4);
    let b = Expr::broadcast(Expr::from(4), 4);
    assert_eq!(
        ir::simplify_expr(&(a + b)),
        Expr::broadcast(Expr::from(7), 4)
    );
}

#[test]
fn test_lowered_bfloat_simplifies_to_bits() {
    let bf16 = |value: f64| Expr::float_imm(Type::BFloat16, value);
    let s = Stmt::store(
        "out",
        Expr::add(bf16(2.0), bf16(3.0)),
        Expr::from(0),
    );
    let lowered = ir::lower_narrow_float_math(&s);
    assert_eq!(
        ir::simplify_stmt(&lowered, true, &Scope::new(), &Scope::new()),
        Stmt::store("out", Expr::uint_imm(Type::UInt16, 0x40a0), Expr::from(0))
    );
}

const NAMES: [&str; 3] = ["x", "y", "t"];

fn int_expr() -> impl Strategy<Value = Expr> {
    let leaf = prop_oneof![
        (-8i32..8).prop_map(Expr::from),
        prop::sample::select(NAMES.to_vec()).prop_map(int_var),
    ];
    leaf.prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            (inner.clone(), inner.clone()).prop_map(|(a, b)| a + b),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| a - b),
            (inner.clone(), -4i32..4).prop_map(|(a, c)| a * c),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| Expr::min(a, b)),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| Expr::max(a, b)),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| a / b),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| a % b),
            (inner.clone(), inner.clone(), inner.clone(), inner.clone())
                .prop_map(|(a, b, t, f)| Expr::select(Expr::lt(a, b), t, f)),
            (
                prop::sample::select(NAMES.to_vec()),
                -4i32..4,
                inner.clone(),
                inner.clone()
            )
                .prop_map(|(name, c, t, f)| Expr::select(
                    Expr::eq(int_var(name), Expr::from(c)),
                    t,
                    f
                )),
            (inner.clone(), inner).prop_map(|(value, body)| Expr::let_in("t", value, body)),
        ]
    })
}

fn bool_expr() -> impl Strategy<Value = Expr> {
    prop_oneof![
        (int_expr(), int_expr()).prop_map(|(a, b)| Expr::lt(a, b)),
        (int_expr(), int_expr()).prop_map(|(a, b)| Expr::le(a, b)),
        (int_expr(), int_expr()).prop_map(|(a, b)| Expr::eq(a, b)),
        (int_expr(), int_expr()).prop_map(|(a, b)| Expr::ne(a, b)),
    ]
}

/// Evaluates `e` by substituting literals for its free variables and folding.
fn evaluate(e: &Expr, x: i32, y: i32, t: i32) -> Expr {
    let mut values = IndexMap::new();
    values.insert("x".to_string(), Expr::from(x));
    values.insert("y".to_string(), Expr::from(y));
    values.insert("t".to_string(), Expr::from(t));
    ir::simplify_expr(&substitute(&values, e))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn simplify_preserves_values(
        e in int_expr(),
        x in -16i32..16,
        y in -16i32..16,
        t in -16i32..16,
    ) {
        let expected = evaluate(&e, x, y, t);
        prop_assert!(as_const_int(&expected).is_some(), "{} did not evaluate", e);
        let simplified = ir::simplify_expr(&e);
        prop_assert_eq!(evaluate(&simplified, x, y, t), expected, "{} became {}", e, simplified);
    }

    #[test]
    fn simplify_is_idempotent(e in int_expr()) {
        let once = ir::simplify_expr(&e);
        let twice = ir::simplify_expr(&once);
        prop_assert_eq!(&twice, &once, "{} simplified to {}", e, once);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn proofs_hold(
        e in bool_expr(),
        x in -16i32..16,
        y in -16i32..16,
        t in -16i32..16,
    ) {
        if ir::can_prove(&e) {
            prop_assert_eq!(evaluate(&e, x, y, t), Expr::from(true), "proved {}", e);
        }
    }
}
