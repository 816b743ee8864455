use super::*;

#[test]
fn test_simple_ordering_and_arithmetic() {
    let a = SimpleScore::of(-10);
    let b = SimpleScore::of(-5);
    assert!(b > a);
    assert_eq!(a + b, SimpleScore::of(-15));
    assert_eq!(a - b, SimpleScore::of(-5));
    assert_eq!(-a, SimpleScore::of(10));
}

#[test]
fn test_hard_dominates_soft() {
    let s1 = HardSoftScore::of(-1, 1_000);
    let s2 = HardSoftScore::of(0, -1_000);
    assert!(s2 > s1);
    assert!(s2.is_better_than(&s1));
    assert!(s1.is_worse_than(&s2));
    assert!(!s1.is_feasible());
    assert!(s1.is_hard());
    assert!(!HardSoftScore::of_soft(-3).is_hard());
}

#[test]
fn test_medium_breaks_hard_tie() {
    let s1 = HardMediumSoftScore::of(0, -2, 50);
    let s2 = HardMediumSoftScore::of(0, -1, -50);
    assert!(s2 > s1);
}

#[test]
fn test_scale_multiplies_every_level() {
    assert_eq!(HardSoftScore::of(2, -3).scale(7), HardSoftScore::of(14, -21));
    assert_eq!(HardSoftScore::ONE_SOFT.scale(0), HardSoftScore::ZERO);
    assert_eq!(
        HardMediumSoftScore::ONE_MEDIUM.scale(-4),
        HardMediumSoftScore::of(0, -4, 0)
    );
}

#[test]
fn test_scale_saturates() {
    assert_eq!(SimpleScore::of(i64::MAX).scale(2), SimpleScore::of(i64::MAX));
    assert_eq!(
        HardSoftScore::of(i64::MIN / 2, 3).scale(-4),
        HardSoftScore::of(i64::MAX, -12)
    );
}

#[test]
fn test_level_numbers() {
    let s = HardMediumSoftScore::of(1, 2, 3);
    assert_eq!(s.to_level_numbers(), vec![1, 2, 3]);
    assert_eq!(HardMediumSoftScore::from_level_numbers(&[1, 2, 3]), Some(s));
    assert_eq!(HardMediumSoftScore::from_level_numbers(&[1, 2]), None);
    assert_eq!(HardMediumSoftScore::from_level_numbers(&[1, 2, 3, 4]), None);
    assert_eq!(HardMediumSoftScore::level_label(1), Some(ScoreLevel::Medium));
    assert_eq!(HardSoftScore::level_label(2), None);
}

#[test]
fn test_parse_roundtrip_forms() {
    assert_eq!(HardSoftScore::parse("-1hard/-20soft"), Ok(HardSoftScore::of(-1, -20)));
    assert_eq!(HardSoftScore::parse(" 0hard / 5soft "), Ok(HardSoftScore::of(0, 5)));
    assert_eq!(SimpleScore::parse("42"), Ok(SimpleScore::of(42)));
    assert_eq!(HardSoftScore::of(3, -4).to_string(), "3hard/-4soft");
}

#[test]
fn test_parse_errors() {
    assert!(HardSoftScore::parse("1hard").is_err());
    assert!(HardSoftScore::parse("1hard/2soft/3soft").is_err());
    assert!(HardSoftScore::parse("1medium/2soft").is_err());
    assert!(HardSoftScore::parse("xhard/2soft").is_err());
    assert!(SimpleScore::parse("nope").is_err());
}

mod properties {
    use proptest::prelude::*;

    use super::*;

    proptest! {
        #[test]
        fn scale_distributes_over_match_weights(
            hard in -1_000i64..1_000,
            soft in -1_000i64..1_000,
            a in -10_000i64..10_000,
            b in -10_000i64..10_000,
        ) {
            let w = HardSoftScore::of(hard, soft);
            prop_assert_eq!(w.scale(a) + w.scale(b), w.scale(a + b));
            prop_assert_eq!(w.scale(a) - w.scale(a), HardSoftScore::ZERO);
        }
    }
}
