use luz_expr::{evaluate, NameTable, TimeOfDay, Value};
use proptest::prelude::*;

fn arb_time() -> impl Strategy<Value = TimeOfDay> {
    (0u8..24, 0u8..60).prop_map(|(h, m)| TimeOfDay::new(h, m).unwrap())
}

fn run(src: &str, names: &mut NameTable) -> Value {
    evaluate(src, names).unwrap()
}

proptest! {
    #[test]
    fn number_arithmetic_matches_i64(a in -1_000_000i64..1_000_000, b in -1_000_000i64..1_000_000) {
        let mut names: NameTable = [("a", a), ("b", b)].into_iter().collect();
        prop_assert_eq!(run("a + b", &mut names), Value::Number(a + b));
        prop_assert_eq!(run("a - b", &mut names), Value::Number(a - b));
        prop_assert_eq!(run("a * b", &mut names), Value::Number(a * b));
        if b != 0 {
            prop_assert_eq!(run("a / b", &mut names), Value::Number(a / b));
        }
    }

    #[test]
    fn adding_minutes_commutes(time in arb_time(), m in -10_000i64..10_000) {
        let mut names = NameTable::new();
        names.set("t", time);
        names.set("m", m);
        let lhs = run("t + m", &mut names);
        prop_assert_eq!(run("m + t", &mut names), lhs.clone());
        prop_assert_eq!(lhs, Value::Time(time.add_minutes(m)));
    }

    #[test]
    fn rounding_lands_on_five_minute_boundaries(time in arb_time()) {
        let mut names = NameTable::new();
        names.set("t", time);
        let up = run("UP(t)", &mut names).as_time().unwrap();
        let down = run("DOWN(t)", &mut names).as_time().unwrap();
        prop_assert_eq!(up.minute() % 5, 0);
        prop_assert_eq!(down.minute() % 5, 0);
        names.set("u", up);
        names.set("d", down);
        prop_assert_eq!(run("UP(u)", &mut names), Value::Time(up));
        prop_assert_eq!(run("DOWN(d)", &mut names), Value::Time(down));
    }

    #[test]
    fn time_literals_round_trip_through_display(time in arb_time()) {
        let mut names = NameTable::new();
        let rendered = time.to_string();
        prop_assert_eq!(run(&rendered, &mut names), Value::Time(time));
    }
}
