// PDP - Product Data Pipeline
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Pipeline configuration and the banding rules it carries.

use crate::error::ConfigError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Transformation configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Price band thresholds for `dim_product`.
    #[serde(default)]
    pub price_tiers: PriceTiers,

    /// Session-length bands for fact rows.
    #[serde(default)]
    pub engagement: EngagementBands,
}

impl PipelineConfig {
    /// Create a configuration with default bands.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the price tier thresholds.
    pub fn with_price_tiers(mut self, tiers: PriceTiers) -> Self {
        self.price_tiers = tiers;
        self
    }

    /// Replace the engagement thresholds.
    pub fn with_engagement(mut self, bands: EngagementBands) -> Self {
        self.engagement = bands;
        self
    }

    /// Check every threshold set.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.price_tiers.validate()?;
        self.engagement.validate()
    }
}

/// Ordered price band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PriceTier {
    Budget,
    Standard,
    Premium,
    Luxury,
}

impl PriceTier {
    /// All tiers, cheapest first.
    pub const ALL: [PriceTier; 4] = [
        PriceTier::Budget,
        PriceTier::Standard,
        PriceTier::Premium,
        PriceTier::Luxury,
    ];

    /// Get tier name as string.
    pub fn as_str(&self) -> &'static str {
        match self {
            PriceTier::Budget => "Budget",
            PriceTier::Standard => "Standard",
            PriceTier::Premium => "Premium",
            PriceTier::Luxury => "Luxury",
        }
    }
}

impl fmt::Display for PriceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inclusive lower bounds of the Standard, Premium and Luxury bands.
///
/// A price exactly at a threshold belongs to the higher band:
/// with the defaults, 1000.00 is `Premium`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceTiers {
    pub standard: Decimal,
    pub premium: Decimal,
    pub luxury: Decimal,
}

impl Default for PriceTiers {
    fn default() -> Self {
        Self {
            standard: Decimal::new(500, 0),
            premium: Decimal::new(1000, 0),
            luxury: Decimal::new(2500, 0),
        }
    }
}

impl PriceTiers {
    /// Create thresholds from whole currency units.
    pub fn new(standard: i64, premium: i64, luxury: i64) -> Self {
        Self {
            standard: Decimal::from(standard),
            premium: Decimal::from(premium),
            luxury: Decimal::from(luxury),
        }
    }

    /// Band a price.
    pub fn classify(&self, price: Decimal) -> PriceTier {
        if price >= self.luxury {
            PriceTier::Luxury
        } else if price >= self.premium {
            PriceTier::Premium
        } else if price >= self.standard {
            PriceTier::Standard
        } else {
            PriceTier::Budget
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.standard < self.premium && self.premium < self.luxury {
            Ok(())
        } else {
            Err(ConfigError::UnorderedThresholds {
                name: "price_tiers",
            })
        }
    }
}

/// Session engagement band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EngagementLevel {
    #[serde(rename = "Very Low")]
    VeryLow,
    Low,
    Medium,
    High,
}

impl EngagementLevel {
    /// All levels, shortest sessions first.
    pub const ALL: [EngagementLevel; 4] = [
        EngagementLevel::VeryLow,
        EngagementLevel::Low,
        EngagementLevel::Medium,
        EngagementLevel::High,
    ];

    /// Get level name as string.
    pub fn as_str(&self) -> &'static str {
        match self {
            EngagementLevel::VeryLow => "Very Low",
            EngagementLevel::Low => "Low",
            EngagementLevel::Medium => "Medium",
            EngagementLevel::High => "High",
        }
    }
}

impl fmt::Display for EngagementLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inclusive lower bounds (minutes) of the Low, Medium and High bands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngagementBands {
    pub low: f64,
    pub medium: f64,
    pub high: f64,
}

impl Default for EngagementBands {
    fn default() -> Self {
        Self {
            low: 30.0,
            medium: 60.0,
            high: 120.0,
        }
    }
}

impl EngagementBands {
    /// Band a session length in minutes.
    pub fn classify(&self, minutes: f64) -> EngagementLevel {
        if minutes >= self.high {
            EngagementLevel::High
        } else if minutes >= self.medium {
            EngagementLevel::Medium
        } else if minutes >= self.low {
            EngagementLevel::Low
        } else {
            EngagementLevel::VeryLow
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let finite = self.low.is_finite() && self.medium.is_finite() && self.high.is_finite();
        if finite && self.low < self.medium && self.medium < self.high {
            Ok(())
        } else {
            Err(ConfigError::UnorderedThresholds { name: "engagement" })
        }
    }
}
