//! Region heuristic and per-region summaries
//!
//! Regions come from a plain substring test on the free-text address, looking
//! for a state abbreviation. This is a heuristic: any occurrence of the
//! letters (for example "PR" inside "PRAIA") counts, and an address naming
//! two states resolves to whichever is checked first.

use serde::{Deserialize, Serialize};

use crate::models::{Bill, TariffFlag};

/// Coarse geographic bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Region {
    #[serde(rename = "São Paulo")]
    SaoPaulo,
    #[serde(rename = "Rio de Janeiro")]
    RioDeJaneiro,
    #[serde(rename = "Minas Gerais")]
    MinasGerais,
    #[serde(rename = "Paraná")]
    Parana,
    #[serde(rename = "Rio Grande do Sul")]
    RioGrandeDoSul,
    #[serde(rename = "Other")]
    Other,
}

/// Checked in order; first match wins
const STATE_CODES: [(&str, Region); 5] = [
    ("SP", Region::SaoPaulo),
    ("RJ", Region::RioDeJaneiro),
    ("MG", Region::MinasGerais),
    ("PR", Region::Parana),
    ("RS", Region::RioGrandeDoSul),
];

impl Region {
    pub fn label(&self) -> &'static str {
        match self {
            Self::SaoPaulo => "São Paulo",
            Self::RioDeJaneiro => "Rio de Janeiro",
            Self::MinasGerais => "Minas Gerais",
            Self::Parana => "Paraná",
            Self::RioGrandeDoSul => "Rio Grande do Sul",
            Self::Other => "Other",
        }
    }
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Derive the region from an address (case-sensitive)
pub fn region_for_address(address: &str) -> Region {
    STATE_CODES
        .iter()
        .find(|(code, _)| address.contains(*code))
        .map(|(_, region)| *region)
        .unwrap_or(Region::Other)
}

/// Summary of the bills in one region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionalInsight {
    pub region: Region,
    /// Rounded average consumption (kWh)
    pub avg_consumption: u32,
    /// Rounded average bill value
    pub avg_value: f64,
    pub count: usize,
    pub dominant_flag: TariffFlag,
}

struct RegionAccumulator {
    region: Region,
    consumption: u64,
    value: f64,
    count: usize,
    flags: [usize; 3],
}

/// Plurality flag of a green/yellow/red tally
///
/// Folds in green, yellow, red order keeping the current leader only while it
/// is strictly ahead, so a tie goes to the later flag: {2, 2, 0} is yellow.
pub fn dominant_flag(tally: [usize; 3]) -> TariffFlag {
    TariffFlag::ALL
        .into_iter()
        .reduce(|leader, next| {
            if tally[leader.index()] > tally[next.index()] {
                leader
            } else {
                next
            }
        })
        .unwrap_or_default()
}

/// Per-region averages and dominant flag, in order of first appearance
pub fn regional_insights(bills: &[Bill]) -> Vec<RegionalInsight> {
    let mut regions: Vec<RegionAccumulator> = Vec::new();

    for bill in bills {
        let region = region_for_address(&bill.address);
        let idx = match regions.iter().position(|r| r.region == region) {
            Some(idx) => idx,
            None => {
                regions.push(RegionAccumulator {
                    region,
                    consumption: 0,
                    value: 0.0,
                    count: 0,
                    flags: [0; 3],
                });
                regions.len() - 1
            }
        };

        let acc = &mut regions[idx];
        acc.consumption += u64::from(bill.consumption_kwh);
        acc.value += bill.total_value;
        acc.count += 1;
        acc.flags[bill.tariff_flag.index()] += 1;
    }

    regions
        .into_iter()
        .map(|acc| {
            let count = acc.count as f64;
            RegionalInsight {
                region: acc.region,
                avg_consumption: (acc.consumption as f64 / count).round() as u32,
                avg_value: (acc.value / count).round(),
                count: acc.count,
                dominant_flag: dominant_flag(acc.flags),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{bill_at, BillFixture};

    #[test]
    fn test_region_for_address() {
        assert_eq!(region_for_address("Av. Paulista, 1000 - SP"), Region::SaoPaulo);
        assert_eq!(region_for_address("Copacabana, Rio - RJ"), Region::RioDeJaneiro);
        assert_eq!(region_for_address("Savassi, BH - MG"), Region::MinasGerais);
        assert_eq!(region_for_address("Curitiba/PR"), Region::Parana);
        assert_eq!(region_for_address("Porto Alegre - RS"), Region::RioGrandeDoSul);
        assert_eq!(region_for_address("Recife - PE"), Region::Other);
        // Case-sensitive
        assert_eq!(region_for_address("curitiba/pr"), Region::Other);
    }

    #[test]
    fn test_region_first_match_wins() {
        // Mentions both RJ and SP; SP is checked first
        assert_eq!(region_for_address("Rua RJ, 10 - Campinas SP"), Region::SaoPaulo);
    }

    #[test]
    fn test_dominant_flag() {
        assert_eq!(dominant_flag([3, 1, 0]), TariffFlag::Green);
        assert_eq!(dominant_flag([0, 1, 4]), TariffFlag::Red);
        assert_eq!(dominant_flag([1, 5, 2]), TariffFlag::Yellow);
        // Ties resolve to the later flag
        assert_eq!(dominant_flag([2, 2, 0]), TariffFlag::Yellow);
        assert_eq!(dominant_flag([2, 0, 2]), TariffFlag::Red);
        assert_eq!(dominant_flag([1, 1, 1]), TariffFlag::Red);
    }

    #[test]
    fn test_regional_insights() {
        let sp = "Rua A, 1 - São Paulo, SP";
        let rj = "Rua B, 2 - Niterói, RJ";
        let bills = vec![
            bill_at(1, "2024-01-01", 200).with_address(rj).with_value(150.0),
            bill_at(2, "2024-01-02", 100).with_address(sp).with_value(90.0),
            bill_at(3, "2024-01-03", 300).with_address(rj).with_value(250.5),
            bill_at(4, "2024-01-04", 250)
                .with_address(rj)
                .with_flag(TariffFlag::Red),
        ];

        let regions = regional_insights(&bills);
        assert_eq!(regions.len(), 2);

        // First appearance order
        assert_eq!(regions[0].region, Region::RioDeJaneiro);
        assert_eq!(regions[0].count, 3);
        assert_eq!(regions[0].avg_consumption, 250);
        // (150 + 250.5 + 200) / 3 = 200.17
        assert_eq!(regions[0].avg_value, 200.0);
        assert_eq!(regions[0].dominant_flag, TariffFlag::Green);

        assert_eq!(regions[1].region, Region::SaoPaulo);
        assert_eq!(regions[1].count, 1);
    }

    #[test]
    fn test_region_serializes_as_label() {
        assert_eq!(
            serde_json::to_string(&Region::Parana).unwrap(),
            "\"Paraná\""
        );
    }
}
