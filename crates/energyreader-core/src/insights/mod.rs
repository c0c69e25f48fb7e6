//! Insight Generator - rule-based consumption advice
//!
//! Compares a user's most recent bills and produces short advisory messages.
//! Rules are independent types implementing [`InsightRule`]; the generator
//! runs them in registration order and keeps at most `max_insights` results.
//!
//! ## Built-in Rules
//!
//! - **Consumption change** - large swing vs the previous bill
//! - **Tariff flag** - red flag warning, or a return to green
//! - **Value increase** - bill noticeably more expensive
//! - **Above average** - latest bill well above the user's mean
//! - **Solar savings** - estimated monthly savings with solar generation
//!
//! ## Usage
//!
//! ```rust,ignore
//! use energyreader_core::insights::InsightGenerator;
//!
//! let history = db.list_bills(&BillFilter::for_user(user_id))?;
//! let insights = InsightGenerator::new().generate(&history);
//! ```

pub mod engine;
pub mod rules;
pub mod types;

pub use engine::InsightGenerator;
pub use rules::{
    AboveAverageRule, ConsumptionChangeRule, InsightRule, SolarSavingsRule, TariffFlagRule,
    ValueIncreaseRule,
};
pub use types::{Insight, InsightKind};
