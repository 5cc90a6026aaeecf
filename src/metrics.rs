//! Pure calculations over normalized rows.
//!
//! Zero denominators yield `0` rather than `NaN` or infinity, same policy as
//! cell coercion.
use crate::Dataset;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Profitability {
    pub profit: f64,
    /// Profit as a percentage of price.
    pub margin_pct: f64,
    /// Profit as a percentage of cost.
    pub roi_pct: f64,
}

pub fn profitability(price: f64, cost: f64, fees: f64) -> Profitability {
    let profit = price - cost - fees;
    Profitability {
        profit,
        margin_pct: percent(profit, price),
        roi_pct: percent(profit, cost),
    }
}

/// Advertising cost of sales, in percent.
pub fn acos(ad_spend: f64, ad_sales: f64) -> f64 {
    percent(ad_spend, ad_sales)
}

fn percent(part: f64, whole: f64) -> f64 {
    if whole == 0.0 {
        0.0
    } else {
        part / whole * 100.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnSummary {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

/// Summary of the numeric cells of `column`; `None` when there are none.
pub fn summarize(data: &Dataset, column: &str) -> Option<ColumnSummary> {
    let mut count = 0usize;
    let mut sum = 0.0;
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for n in data.numbers(column) {
        count += 1;
        sum += n;
        min = min.min(n);
        max = max.max(n);
    }
    (count > 0).then(|| ColumnSummary {
        count,
        min,
        max,
        mean: sum / count as f64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profit_margin_and_roi() {
        let p = profitability(25.0, 10.0, 5.0);
        assert_eq!(p.profit, 10.0);
        assert_eq!(p.margin_pct, 40.0);
        assert_eq!(p.roi_pct, 100.0);
    }

    #[test]
    fn zero_denominators_are_zero() {
        let p = profitability(0.0, 0.0, 2.0);
        assert_eq!(p.margin_pct, 0.0);
        assert_eq!(p.roi_pct, 0.0);
        assert_eq!(acos(50.0, 0.0), 0.0);
        assert_eq!(acos(25.0, 100.0), 25.0);
    }
}
