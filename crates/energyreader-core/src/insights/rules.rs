//! Built-in insight rules
//!
//! Every rule sees the same history, ordered most recent first and holding at
//! least two bills (the generator guarantees both).

use crate::analytics::{percent_change, round1, round2};
use crate::config::InsightConfig;
use crate::models::{Bill, TariffFlag};

use super::types::{Insight, InsightKind};

/// A rule that may produce one insight from a bill history
pub trait InsightRule: Send + Sync {
    /// Stable identifier, used in logs
    fn id(&self) -> &'static str;

    /// Evaluate against `history` (most recent first, len >= 2)
    fn evaluate(&self, history: &[Bill], config: &InsightConfig) -> Option<Insight>;
}

/// Large consumption swing between the last two bills
pub struct ConsumptionChangeRule;

impl InsightRule for ConsumptionChangeRule {
    fn id(&self) -> &'static str {
        "consumption_change"
    }

    fn evaluate(&self, history: &[Bill], config: &InsightConfig) -> Option<Insight> {
        let (latest, previous) = (history.first()?, history.get(1)?);

        let delta = i64::from(latest.consumption_kwh) - i64::from(previous.consumption_kwh);
        let pct = percent_change(
            f64::from(previous.consumption_kwh),
            f64::from(latest.consumption_kwh),
        )?;

        if pct.abs() <= config.consumption_change_pct {
            return None;
        }

        let magnitude = round1(pct.abs());
        let insight = if pct > 0.0 {
            Insight::new(
                InsightKind::Warning,
                format!("Consumption up {:.1}%", magnitude),
                format!(
                    "Usage rose by {} kWh. Check air conditioning and heater use.",
                    delta.abs()
                ),
            )
        } else {
            Insight::new(
                InsightKind::Success,
                format!("Consumption down {:.1}%", magnitude),
                format!("Usage fell by {} kWh. Nice savings!", delta.abs()),
            )
        };
        Some(insight.with_value(magnitude))
    }
}

/// Red flag on the latest bill, or a switch back to green
pub struct TariffFlagRule;

impl InsightRule for TariffFlagRule {
    fn id(&self) -> &'static str {
        "tariff_flag"
    }

    fn evaluate(&self, history: &[Bill], _config: &InsightConfig) -> Option<Insight> {
        let (latest, previous) = (history.first()?, history.get(1)?);

        match latest.tariff_flag {
            TariffFlag::Red => Some(Insight::new(
                InsightKind::Warning,
                "Red flag active",
                "Avoid running high-consumption appliances between 18h and 21h to save up to \
                 R$ 50 on the next bill.",
            )),
            TariffFlag::Green if previous.tariff_flag != TariffFlag::Green => Some(Insight::new(
                InsightKind::Success,
                "Green flag active",
                "Good time to use appliances: energy is cheaper this month.",
            )),
            _ => None,
        }
    }
}

/// Bill got noticeably more expensive
pub struct ValueIncreaseRule;

impl InsightRule for ValueIncreaseRule {
    fn id(&self) -> &'static str {
        "value_increase"
    }

    fn evaluate(&self, history: &[Bill], config: &InsightConfig) -> Option<Insight> {
        let (latest, previous) = (history.first()?, history.get(1)?);

        let delta = latest.total_value - previous.total_value;
        if delta <= config.value_increase {
            return None;
        }

        Some(
            Insight::new(
                InsightKind::Warning,
                format!("Bill R$ {:.2} higher", delta),
                "Consider reviewing electric shower and air conditioning use to cut costs.",
            )
            .with_value(round2(delta)),
        )
    }
}

/// Latest consumption well above the user's own average
pub struct AboveAverageRule;

impl InsightRule for AboveAverageRule {
    fn id(&self) -> &'static str {
        "above_average"
    }

    fn evaluate(&self, history: &[Bill], config: &InsightConfig) -> Option<Insight> {
        let latest = history.first()?;

        let total: f64 = history.iter().map(|b| f64::from(b.consumption_kwh)).sum();
        let avg = total / history.len() as f64;
        if avg == 0.0 {
            return None;
        }

        let current = f64::from(latest.consumption_kwh);
        if current <= avg * config.above_average_factor {
            return None;
        }

        let above = (current / avg - 1.0) * 100.0;
        Some(
            Insight::new(
                InsightKind::Tip,
                "Consumption above your average",
                format!(
                    "{:.1}% above normal. How about setting a savings goal for next month?",
                    above
                ),
            )
            .with_value(round1(above)),
        )
    }
}

/// Estimated monthly savings from solar generation
pub struct SolarSavingsRule;

impl InsightRule for SolarSavingsRule {
    fn id(&self) -> &'static str {
        "solar_savings"
    }

    fn evaluate(&self, history: &[Bill], config: &InsightConfig) -> Option<Insight> {
        let window = config.savings_window;
        if window == 0 || history.len() < window {
            return None;
        }

        let recent: f64 = history[..window]
            .iter()
            .map(|b| f64::from(b.consumption_kwh))
            .sum();
        let savings = recent / window as f64 * config.solar_offset * config.solar_efficiency;

        Some(
            Insight::new(
                InsightKind::Tip,
                "Solar energy savings potential",
                format!(
                    "Based on your consumption, you could save up to R$ {:.2} per month with \
                     solar energy.",
                    savings
                ),
            )
            .with_value(round2(savings)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{bill_at, BillFixture};

    fn pair(latest: u32, previous: u32) -> Vec<Bill> {
        vec![bill_at(2, "2024-02-01", latest), bill_at(1, "2024-01-01", previous)]
    }

    #[test]
    fn test_consumption_change_increase() {
        let insight = ConsumptionChangeRule
            .evaluate(&pair(280, 200), &InsightConfig::default())
            .unwrap();
        assert_eq!(insight.kind, InsightKind::Warning);
        assert_eq!(insight.title, "Consumption up 40.0%");
        assert!(insight.description.contains("80 kWh"));
        assert_eq!(insight.value, Some(40.0));
    }

    #[test]
    fn test_consumption_change_decrease() {
        let insight = ConsumptionChangeRule
            .evaluate(&pair(150, 200), &InsightConfig::default())
            .unwrap();
        assert_eq!(insight.kind, InsightKind::Success);
        assert_eq!(insight.title, "Consumption down 25.0%");
        assert!(insight.description.contains("50 kWh"));
    }

    #[test]
    fn test_consumption_change_threshold_is_strict() {
        let config = InsightConfig::default();
        // Exactly 15% does not fire
        assert!(ConsumptionChangeRule.evaluate(&pair(230, 200), &config).is_none());
        assert!(ConsumptionChangeRule.evaluate(&pair(231, 200), &config).is_some());
    }

    #[test]
    fn test_consumption_change_zero_previous() {
        assert!(ConsumptionChangeRule
            .evaluate(&pair(100, 0), &InsightConfig::default())
            .is_none());
    }

    #[test]
    fn test_tariff_flag_rule() {
        let config = InsightConfig::default();

        let red = vec![
            bill_at(2, "2024-02-01", 100).with_flag(TariffFlag::Red),
            bill_at(1, "2024-01-01", 100).with_flag(TariffFlag::Red),
        ];
        let insight = TariffFlagRule.evaluate(&red, &config).unwrap();
        assert_eq!(insight.kind, InsightKind::Warning);
        assert_eq!(insight.title, "Red flag active");

        let back_to_green = vec![
            bill_at(2, "2024-02-01", 100),
            bill_at(1, "2024-01-01", 100).with_flag(TariffFlag::Yellow),
        ];
        let insight = TariffFlagRule.evaluate(&back_to_green, &config).unwrap();
        assert_eq!(insight.kind, InsightKind::Success);

        // Green after green, or yellow: nothing to say
        assert!(TariffFlagRule.evaluate(&pair(100, 100), &config).is_none());
        let yellow = vec![
            bill_at(2, "2024-02-01", 100).with_flag(TariffFlag::Yellow),
            bill_at(1, "2024-01-01", 100),
        ];
        assert!(TariffFlagRule.evaluate(&yellow, &config).is_none());
    }

    #[test]
    fn test_value_increase_rule() {
        let config = InsightConfig::default();
        let history = vec![
            bill_at(2, "2024-02-01", 100).with_value(300.0),
            bill_at(1, "2024-01-01", 100).with_value(200.0),
        ];
        let insight = ValueIncreaseRule.evaluate(&history, &config).unwrap();
        assert_eq!(insight.title, "Bill R$ 100.00 higher");
        assert_eq!(insight.value, Some(100.0));

        let history = vec![
            bill_at(2, "2024-02-01", 100).with_value(250.0),
            bill_at(1, "2024-01-01", 100).with_value(200.0),
        ];
        assert!(ValueIncreaseRule.evaluate(&history, &config).is_none());
    }

    #[test]
    fn test_above_average_rule() {
        let config = InsightConfig::default();
        // avg = 150, 1.2 × 150 = 180 < 200
        let insight = AboveAverageRule.evaluate(&pair(200, 100), &config).unwrap();
        assert_eq!(insight.kind, InsightKind::Tip);
        assert!(insight.description.starts_with("33.3% above normal"));

        // avg = 110, 1.2 × 110 = 132 > 120
        assert!(AboveAverageRule.evaluate(&pair(120, 100), &config).is_none());
        assert!(AboveAverageRule.evaluate(&pair(0, 0), &config).is_none());
    }

    #[test]
    fn test_solar_savings_rule() {
        let config = InsightConfig::default();
        assert!(SolarSavingsRule.evaluate(&pair(200, 200), &config).is_none());

        let history = vec![
            bill_at(4, "2024-04-01", 300),
            bill_at(3, "2024-03-01", 200),
            bill_at(2, "2024-02-01", 250),
            bill_at(1, "2024-01-01", 1000),
        ];
        let insight = SolarSavingsRule.evaluate(&history, &config).unwrap();
        // 250 × 0.15 × 0.8 = 30
        assert_eq!(insight.value, Some(30.0));
        assert!(insight.description.contains("R$ 30.00"));
    }
}
