// Tests for aligning extracted annual totals onto register years

use rainfall_register::register::{
    Month, MonthlyTable, Rainfall, Token, Tolerance, TotalsAligner, ValueNormalizer, YearBlock,
};

/// Table whose years have the given monthly sums (spread over two months)
fn table_with_sums(sums: &[(i32, Option<f64>)]) -> MonthlyTable {
    MonthlyTable::new(
        sums.iter()
            .map(|&(year, sum)| {
                let mut block = YearBlock::empty(year);
                if let Some(sum) = sum {
                    block.months[Month::January as usize].value = Rainfall::Value(sum / 2.0);
                    block.months[Month::July as usize].value = Rainfall::Value(sum / 2.0);
                }
                block
            })
            .collect(),
    )
}

fn tokens(raw: &[&str]) -> Vec<Token> {
    raw.iter().map(|t| Token::new(*t)).collect()
}

fn totals_by_year(aligner: &TotalsAligner, raw: &[&str], table: &MonthlyTable) -> Vec<(i32, Rainfall)> {
    aligner
        .align(&tokens(raw), Some(table))
        .totals
        .entries
        .iter()
        .map(|e| (e.year, e.total))
        .collect()
}

#[test]
fn test_out_of_order_totals_matched_by_value() {
    let table = table_with_sums(&[(1890, Some(10.0)), (1891, Some(20.0)), (1892, Some(15.0))]);

    let result = TotalsAligner::default().align(&tokens(&["15.0", "9.9", "20.1"]), Some(&table));

    assert_eq!(
        result
            .totals
            .entries
            .iter()
            .map(|e| (e.year, e.total))
            .collect::<Vec<_>>(),
        vec![
            (1890, Rainfall::Value(9.9)),
            (1891, Rainfall::Value(20.1)),
            (1892, Rainfall::Value(15.0)),
        ]
    );
    assert_eq!(result.report.matched_by_value, 3);
    assert_eq!(result.report.assigned_by_position, 0);
    assert!(!result.report.has_count_mismatch());
}

#[test]
fn test_unmatched_total_falls_back_to_first_open_year() {
    let table = table_with_sums(&[(1900, Some(50.0)), (1901, Some(60.0))]);

    let result = TotalsAligner::default().align(&tokens(&["7.0"]), Some(&table));

    assert_eq!(result.totals.total_for(1900), Some(Rainfall::Value(7.0)));
    assert_eq!(result.totals.total_for(1901), Some(Rainfall::Missing));
    assert_eq!(result.report.matched_by_value, 0);
    assert_eq!(result.report.assigned_by_position, 1);
    assert_eq!(result.report.years_without_total, vec![1901]);
}

#[test]
fn test_relative_tolerance_accepts_large_sums() {
    // 2.0 off a 60.0 sum is outside 0.5 but within 5%
    let table = table_with_sums(&[(1900, Some(50.0)), (1901, Some(60.0))]);

    let aligned = totals_by_year(&TotalsAligner::default(), &["62.0"], &table);

    assert_eq!(aligned, vec![(1900, Rainfall::Missing), (1901, Rainfall::Value(62.0))]);
}

#[test]
fn test_surplus_totals_are_discarded() {
    let table = table_with_sums(&[(1890, Some(10.0)), (1891, Some(20.0))]);

    let result = TotalsAligner::default().align(&tokens(&["10.0", "20.0", "33.0", "44.0"]), Some(&table));

    assert_eq!(result.totals.entries.len(), 2);
    assert_eq!(result.totals.present_count(), 2);
    assert_eq!(result.report.discarded_totals, vec![33.0, 44.0]);
    assert!(result.report.has_count_mismatch());
}

#[test]
fn test_missing_totals_are_skipped_not_placed() {
    let table = table_with_sums(&[(1890, Some(10.0)), (1891, Some(20.0))]);

    let result = TotalsAligner::default().align(&tokens(&["-", "", "20.0"]), Some(&table));

    assert_eq!(result.totals.total_for(1890), Some(Rainfall::Missing));
    assert_eq!(result.totals.total_for(1891), Some(Rainfall::Value(20.0)));
    assert_eq!(result.report.unreadable_totals, 2);
}

#[test]
fn test_unmatched_totals_keep_reading_order() {
    // 99.0 and 77.0 are near no sum, so they fill the open years left to right
    let table = table_with_sums(&[(1890, Some(10.0)), (1891, Some(20.0)), (1892, Some(30.0))]);

    let aligned = totals_by_year(&TotalsAligner::default(), &["99.0", "20.0", "77.0"], &table);

    assert_eq!(
        aligned,
        vec![
            (1890, Rainfall::Value(99.0)),
            (1891, Rainfall::Value(20.0)),
            (1892, Rainfall::Value(77.0)),
        ]
    );
}

#[test]
fn test_years_without_data_are_fallback_targets() {
    let table = table_with_sums(&[(1890, None), (1891, Some(20.0)), (1892, None)]);

    let aligned = totals_by_year(&TotalsAligner::default(), &["5.5", "20.0"], &table);

    assert_eq!(
        aligned,
        vec![
            (1890, Rainfall::Value(5.5)),
            (1891, Rainfall::Value(20.0)),
            (1892, Rainfall::Missing),
        ]
    );
}

#[test]
fn test_equal_values_placed_on_separate_years() {
    // Both totals read "30.0"; each must land once even though the second
    // value equals one that is already placed
    let table = table_with_sums(&[(1890, Some(30.0)), (1891, Some(80.0))]);

    let aligned = totals_by_year(&TotalsAligner::default(), &["30.0", "30.0"], &table);

    assert_eq!(aligned, vec![(1890, Rainfall::Value(30.0)), (1891, Rainfall::Value(30.0))]);
}

#[test]
fn test_empty_table_uses_synthetic_years() {
    let result = TotalsAligner::default().align(&tokens(&["40.12", "38.0"]), Some(&MonthlyTable::default()));

    let years: Vec<i32> = result.totals.entries.iter().map(|e| e.year).collect();
    assert_eq!(years, vec![1, 2]);
    assert!(result.report.synthetic_years);
}

#[test]
fn test_no_totals_leaves_every_year_missing() {
    let table = table_with_sums(&[(1890, Some(10.0)), (1891, Some(20.0))]);

    let result = TotalsAligner::default().align(&[], Some(&table));

    assert_eq!(result.totals.entries.len(), 2);
    assert_eq!(result.totals.present_count(), 0);
    assert_eq!(result.report.years_without_total, vec![1890, 1891]);
}

#[test]
fn test_zero_tolerance_requires_exact_sum() {
    let table = table_with_sums(&[(1890, Some(10.0)), (1891, Some(20.0))]);
    let aligner = TotalsAligner::new(ValueNormalizer::default(), Tolerance::new(0.0, 0.0).unwrap());

    let result = aligner.align(&tokens(&["20.1", "10.0"]), Some(&table));

    // "20.1" misses 1891 exactly, "10.0" matches 1890, the leftover goes to 1891
    assert_eq!(result.totals.total_for(1890), Some(Rainfall::Value(10.0)));
    assert_eq!(result.totals.total_for(1891), Some(Rainfall::Value(20.1)));
    assert_eq!(result.report.matched_by_value, 1);
    assert_eq!(result.report.assigned_by_position, 1);
}

#[test]
fn test_alignment_is_deterministic() {
    let table = table_with_sums(&[(1890, Some(10.0)), (1891, Some(10.0)), (1892, Some(12.0))]);
    let raw = tokens(&["10.2", "11.0", "10.0", "3.0"]);
    let aligner = TotalsAligner::default();

    let first = aligner.align(&raw, Some(&table));
    for _ in 0..20 {
        assert_eq!(aligner.align(&raw, Some(&table)), first);
    }
}

#[test]
fn test_output_never_exceeds_input_totals() {
    let table = table_with_sums(&[
        (1890, Some(10.0)),
        (1891, None),
        (1892, Some(30.0)),
        (1893, Some(40.0)),
    ]);
    let cases: [&[&str]; 5] = [
        &[],
        &["-"],
        &["10.0"],
        &["1", "2", "3", "4", "5", "6"],
        &["40.0", "-", "30.0", "x"],
    ];

    for raw in cases {
        let result = TotalsAligner::default().align(&tokens(raw), Some(&table));
        let non_missing_in = raw
            .iter()
            .filter(|t| !rainfall_register::register::normalize_value(t).is_missing())
            .count();
        assert_eq!(result.totals.entries.len(), table.len());
        assert!(result.totals.present_count() <= non_missing_in, "case {raw:?}");
    }
}
