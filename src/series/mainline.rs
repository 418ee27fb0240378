//! Mainline selection
//!
//! Handicap and total markets quote several line values at once (2.0, 2.25,
//! 2.5, ...). The mainline is the single line the market is "normally"
//! displayed at. Preference order: an explicitly marked default line from
//! the catalog/detail document, otherwise the most balanced line, with
//! even-money and canonical-value tie-breaks.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// A candidate line with both side prices quoted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineQuote {
    pub line: Decimal,
    pub side_a: Decimal,
    pub side_b: Decimal,
}

const EVEN_MONEY: Decimal = dec!(2.0);

/// Pick the displayed line among simultaneously quoted candidates.
///
/// Returns `None` when no line has both sides quoted. `canonical` is the
/// last tie-break target: 2.5 for totals, 0 for handicaps.
pub fn select_mainline(
    explicit: Option<Decimal>,
    candidates: &[LineQuote],
    canonical: Decimal,
) -> Option<Decimal> {
    if candidates.is_empty() {
        return None;
    }

    if let Some(line) = explicit {
        if candidates.iter().any(|q| q.line == line) {
            return Some(line);
        }
    }

    let mut best: Option<(&LineQuote, (Decimal, Decimal, Decimal))> = None;
    for quote in candidates {
        let balance = (quote.side_a - quote.side_b).abs();
        let avg = (quote.side_a + quote.side_b) / dec!(2);
        let off_even = (avg - EVEN_MONEY).abs();
        let off_canonical = (quote.line - canonical).abs();
        let key = (balance, off_even, off_canonical);

        match &best {
            None => best = Some((quote, key)),
            Some((_, best_key)) if key < *best_key => best = Some((quote, key)),
            _ => {}
        }
    }

    best.map(|(q, _)| q.line)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quote(line: Decimal, a: Decimal, b: Decimal) -> LineQuote {
        LineQuote { line, side_a: a, side_b: b }
    }

    #[test]
    fn test_empty_candidates() {
        assert_eq!(select_mainline(None, &[], dec!(2.5)), None);
    }

    #[test]
    fn test_explicit_default_wins() {
        let candidates = [
            quote(dec!(2.5), dec!(1.50), dec!(2.50)),
            quote(dec!(3.0), dec!(1.95), dec!(1.95)),
        ];
        // 3.0 is better balanced, but the document marks 2.5 as default
        assert_eq!(
            select_mainline(Some(dec!(2.5)), &candidates, dec!(2.5)),
            Some(dec!(2.5))
        );
    }

    #[test]
    fn test_explicit_default_absent_falls_through() {
        let candidates = [quote(dec!(3.0), dec!(1.95), dec!(1.95))];
        assert_eq!(
            select_mainline(Some(dec!(2.5)), &candidates, dec!(2.5)),
            Some(dec!(3.0))
        );
    }

    #[test]
    fn test_most_balanced_wins() {
        let candidates = [
            quote(dec!(2.0), dec!(1.40), dec!(2.80)),
            quote(dec!(2.5), dec!(1.90), dec!(1.92)),
            quote(dec!(3.0), dec!(2.40), dec!(1.55)),
        ];
        assert_eq!(select_mainline(None, &candidates, dec!(2.5)), Some(dec!(2.5)));
    }

    #[test]
    fn test_even_money_tie_break() {
        // same balance; 2.5 sits closer to even money on average
        let candidates = [
            quote(dec!(2.5), dec!(1.95), dec!(1.95)),
            quote(dec!(3.0), dec!(2.60), dec!(2.60)),
        ];
        assert_eq!(select_mainline(None, &candidates, dec!(2.5)), Some(dec!(2.5)));
    }

    #[test]
    fn test_canonical_tie_break() {
        // identical prices on both lines; prefer the canonical 2.5
        let candidates = [
            quote(dec!(3.5), dec!(1.90), dec!(1.90)),
            quote(dec!(2.5), dec!(1.90), dec!(1.90)),
        ];
        assert_eq!(select_mainline(None, &candidates, dec!(2.5)), Some(dec!(2.5)));
    }

    #[test]
    fn test_handicap_canonical_zero() {
        let candidates = [
            quote(dec!(-1.5), dec!(1.90), dec!(1.90)),
            quote(dec!(0), dec!(1.90), dec!(1.90)),
        ];
        assert_eq!(select_mainline(None, &candidates, dec!(0)), Some(dec!(0)));
    }
}
