//! Tariff flag distribution

use serde::{Deserialize, Serialize};

use super::round1;
use crate::models::{Bill, TariffFlag};

/// Share of bills carrying one flag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlagShare {
    pub flag: TariffFlag,
    pub count: usize,
    /// Percentage of all bills, one decimal (0 when there are no bills)
    pub percent: f64,
}

/// Count of each flag, always green, yellow, red
pub fn flag_distribution(bills: &[Bill]) -> Vec<FlagShare> {
    let mut tally = [0usize; 3];
    for bill in bills {
        tally[bill.tariff_flag.index()] += 1;
    }

    let total = bills.len();
    TariffFlag::ALL
        .into_iter()
        .map(|flag| {
            let count = tally[flag.index()];
            let percent = if total > 0 {
                round1(count as f64 / total as f64 * 100.0)
            } else {
                0.0
            };
            FlagShare {
                flag,
                count,
                percent,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{bill_at, BillFixture};

    #[test]
    fn test_flag_distribution() {
        let bills = vec![
            bill_at(1, "2024-01-01", 100),
            bill_at(2, "2024-01-02", 100).with_flag(TariffFlag::Red),
            bill_at(3, "2024-01-03", 100),
        ];

        let dist = flag_distribution(&bills);
        assert_eq!(dist.len(), 3);
        assert_eq!(dist[0].flag, TariffFlag::Green);
        assert_eq!(dist[0].count, 2);
        assert_eq!(dist[0].percent, 66.7);
        assert_eq!(dist[1].count, 0);
        assert_eq!(dist[1].percent, 0.0);
        assert_eq!(dist[2].flag, TariffFlag::Red);
        assert_eq!(dist[2].percent, 33.3);
    }

    #[test]
    fn test_flag_distribution_empty() {
        let dist = flag_distribution(&[]);
        assert_eq!(dist.len(), 3);
        assert!(dist.iter().all(|s| s.count == 0 && s.percent == 0.0));
    }
}
