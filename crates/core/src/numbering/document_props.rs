//! Property-based tests for document numbering.

use proptest::prelude::*;

use crate::numbering::document::{DocumentKind, DocumentNumber, Period, next_sequence};

fn arb_kind() -> impl Strategy<Value = DocumentKind> {
    prop_oneof![
        Just(DocumentKind::Income),
        Just(DocumentKind::Expense),
    ]
}

fn arb_period() -> impl Strategy<Value = Period> {
    (2000i32..2100, 1u32..=12).prop_map(|(year, month)| Period::new(year, month).unwrap())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// A formatted number parses back to the same parts.
    #[test]
    fn prop_format_parse_agree(
        kind in arb_kind(),
        period in arb_period(),
        sequence in 1u32..1_000_000,
    ) {
        let number = DocumentNumber::new(kind, period, sequence);
        let parsed = DocumentNumber::parse(&number.to_string()).unwrap();
        prop_assert_eq!(parsed, number);
    }

    /// Feeding each issued number back in yields a gapless run 1..=n.
    #[test]
    fn prop_sequential_allocation_is_gapless(
        kind in arb_kind(),
        period in arb_period(),
        n in 1usize..200,
    ) {
        let mut latest: Option<String> = None;
        let mut issued = Vec::with_capacity(n);

        for _ in 0..n {
            let sequence = next_sequence(latest.as_deref(), kind, period).unwrap();
            let number = DocumentNumber::new(kind, period, sequence).to_string();
            issued.push(sequence);
            latest = Some(number);
        }

        let expected: Vec<u32> = (1..=u32::try_from(n).unwrap()).collect();
        prop_assert_eq!(issued, expected);
    }

    /// Numbers of one period all share its stem.
    #[test]
    fn prop_number_starts_with_stem(
        kind in arb_kind(),
        period in arb_period(),
        sequence in 1u32..100_000,
    ) {
        let number = DocumentNumber::new(kind, period, sequence).to_string();
        prop_assert!(number.starts_with(&DocumentNumber::stem(kind, period)));
    }

    /// Within the padded width, string order matches sequence order.
    #[test]
    fn prop_padded_numbers_sort_lexicographically(
        kind in arb_kind(),
        period in arb_period(),
        a in 1u32..10_000,
        b in 1u32..10_000,
    ) {
        let left = DocumentNumber::new(kind, period, a).to_string();
        let right = DocumentNumber::new(kind, period, b).to_string();
        prop_assert_eq!(left.cmp(&right), a.cmp(&b));
    }
}
