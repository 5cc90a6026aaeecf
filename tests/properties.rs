use proptest::prelude::*;
use seller_ingest::{coerce_numeric, normalize, validate, Cell, RawRow, RequiredSchema};
use std::sync::Arc;

const POOL: [&str; 9] = [
    "asin",
    "price",
    "reviews",
    "rating",
    "conversion_rate",
    "click_through_rate",
    "brands",
    "keywords",
    "niche",
];

fn pick(mask: &[bool]) -> Vec<&'static str> {
    POOL.iter()
        .zip(mask)
        .filter(|(_, keep)| **keep)
        .map(|(name, _)| *name)
        .collect()
}

proptest! {
    #[test]
    fn prop_valid_iff_every_required_name_present(
        required_mask in proptest::collection::vec(any::<bool>(), POOL.len()),
        header_mask in proptest::collection::vec(any::<bool>(), POOL.len()),
    ) {
        let required = pick(&required_mask);
        prop_assume!(!required.is_empty());
        let schema = RequiredSchema::new(required.iter().copied()).unwrap();
        let header = pick(&header_mask);

        let res = validate(header.iter().copied(), &schema);
        let expected_missing: Vec<String> = required
            .iter()
            .filter(|r| !header.contains(r))
            .map(|r| r.to_string())
            .collect();
        prop_assert_eq!(res.is_ok(), expected_missing.is_empty());
        prop_assert_eq!(res.missing(), expected_missing.as_slice());
    }

    #[test]
    fn prop_text_without_digits_coerces_to_zero(s in "[^0-9.\\-]*") {
        prop_assert_eq!(coerce_numeric(&s), 0.0);
    }

    #[test]
    fn prop_well_formed_numbers_parse_exactly(s in "-?[0-9]{1,12}(\\.[0-9]{1,6})?") {
        let expected: f64 = s.parse().unwrap();
        prop_assert_eq!(coerce_numeric(&s), expected);
    }

    #[test]
    fn prop_numeric_cells_are_always_finite(cells in proptest::collection::vec(".*", 1..6)) {
        let header: Arc<[String]> = (0..cells.len()).map(|i| format!("c{i}")).collect();
        let names: Vec<String> = header.iter().cloned().collect();
        let schema = RequiredSchema::new(names.clone()).unwrap().with_numeric(names.clone());
        let typed = normalize(&RawRow::new(header, cells), &schema);
        for name in &names {
            match typed.get(&schema, name) {
                Some(Cell::Number(n)) => prop_assert!(n.is_finite()),
                other => prop_assert!(false, "expected number for {}, got {:?}", name, other),
            }
        }
    }
}
