//! Core data models for budget optimization

use crate::error::OptimizerError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Marketing spend channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    SocialMedia,
    SearchAds,
    Email,
    Promotions,
}

impl Channel {
    /// All channels in canonical order
    pub const ALL: [Channel; 4] = [
        Channel::SocialMedia,
        Channel::SearchAds,
        Channel::Email,
        Channel::Promotions,
    ];

    /// Allocation key used on the wire
    pub fn key(&self) -> &'static str {
        match self {
            Channel::SocialMedia => "social_media",
            Channel::SearchAds => "search_ads",
            Channel::Email => "email",
            Channel::Promotions => "promotions",
        }
    }

    /// Name of the trained spend feature for this channel
    pub fn spend_feature(&self) -> &'static str {
        match self {
            Channel::SocialMedia => "Social_Media_Spend",
            Channel::SearchAds => "Search_Ads_Spend",
            Channel::Email => "Email_Spend",
            Channel::Promotions => "Promotions_Spend",
        }
    }

    /// Token identifying this channel inside derived feature names
    pub fn name_token(&self) -> &'static str {
        match self {
            Channel::SocialMedia => "Social",
            Channel::SearchAds => "Search",
            Channel::Email => "Email",
            Channel::Promotions => "Promotions",
        }
    }

    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            Channel::SocialMedia => "Social Media",
            Channel::SearchAds => "Search Ads",
            Channel::Email => "Email",
            Channel::Promotions => "Promotions",
        }
    }

    pub fn from_key(key: &str) -> Option<Channel> {
        Channel::ALL.into_iter().find(|c| c.key() == key)
    }

    pub fn from_spend_feature(name: &str) -> Option<Channel> {
        Channel::ALL.into_iter().find(|c| c.spend_feature() == name)
    }

    /// First channel (in canonical order) whose token appears in `name`
    pub fn mentioned_in(name: &str) -> Option<Channel> {
        Channel::ALL.into_iter().find(|c| name.contains(c.name_token()))
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Market-condition context applied to non-spend features
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scenario {
    #[default]
    Normal,
    Holiday,
    CompetitorHigh,
}

impl Scenario {
    pub const ALL: [Scenario; 3] = [Scenario::Normal, Scenario::Holiday, Scenario::CompetitorHigh];

    pub fn as_str(&self) -> &'static str {
        match self {
            Scenario::Normal => "normal",
            Scenario::Holiday => "holiday",
            Scenario::CompetitorHigh => "competitor_high",
        }
    }

    /// Competitor activity index assumed under this scenario
    pub fn competitor_activity(&self) -> f64 {
        match self {
            Scenario::CompetitorHigh => 60.0,
            _ => 50.0,
        }
    }

    /// Calendar month assumed under this scenario
    pub fn month_number(&self) -> f64 {
        match self {
            Scenario::Holiday => 12.0,
            _ => 6.0,
        }
    }

    /// Encoded season (0 = holiday season)
    pub fn season_code(&self) -> f64 {
        match self {
            Scenario::Holiday => 0.0,
            _ => 1.0,
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scenario {
    type Err = OptimizerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Scenario::ALL
            .into_iter()
            .find(|sc| sc.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| OptimizerError::invalid(format!("unknown scenario '{}'", s)))
    }
}

/// Spend amount per channel
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    pub social_media: f64,
    pub search_ads: f64,
    pub email: f64,
    pub promotions: f64,
}

impl Allocation {
    pub fn new(social_media: f64, search_ads: f64, email: f64, promotions: f64) -> Self {
        Self {
            social_media,
            search_ads,
            email,
            promotions,
        }
    }

    /// Build an allocation from shares of `total_budget`, in canonical channel order
    pub fn from_shares(shares: [f64; 4], total_budget: f64) -> Self {
        Self::new(
            shares[0] * total_budget,
            shares[1] * total_budget,
            shares[2] * total_budget,
            shares[3] * total_budget,
        )
    }

    /// 25% social, 35% search, 15% email, 25% promotions
    pub fn default_split(total_budget: f64) -> Self {
        Self::from_shares([0.25, 0.35, 0.15, 0.25], total_budget)
    }

    /// Validate a keyed allocation: every channel present, no unknown keys,
    /// amounts finite and non-negative
    pub fn try_from_map(amounts: &HashMap<String, f64>) -> Result<Self, OptimizerError> {
        if let Some(unknown) = amounts.keys().find(|k| Channel::from_key(k).is_none()) {
            return Err(OptimizerError::invalid(format!(
                "unknown channel '{}' in allocation",
                unknown
            )));
        }

        let mut values = [0.0; 4];
        for (slot, channel) in values.iter_mut().zip(Channel::ALL) {
            let amount = *amounts.get(channel.key()).ok_or_else(|| {
                OptimizerError::invalid(format!("allocation is missing channel '{}'", channel))
            })?;
            if !amount.is_finite() || amount < 0.0 {
                return Err(OptimizerError::invalid(format!(
                    "allocation for '{}' must be a non-negative number, got {}",
                    channel, amount
                )));
            }
            *slot = amount;
        }

        Ok(Self::new(values[0], values[1], values[2], values[3]))
    }

    pub fn get(&self, channel: Channel) -> f64 {
        match channel {
            Channel::SocialMedia => self.social_media,
            Channel::SearchAds => self.search_ads,
            Channel::Email => self.email,
            Channel::Promotions => self.promotions,
        }
    }

    /// Sum of all channel amounts, accumulated in canonical order
    pub fn total(&self) -> f64 {
        Channel::ALL.iter().map(|c| self.get(*c)).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Channel, f64)> + '_ {
        Channel::ALL.into_iter().map(move |c| (c, self.get(c)))
    }
}

/// Ordered feature names the predictor was trained on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct FeatureSchema {
    names: Vec<String>,
}

impl FeatureSchema {
    pub fn new<I, S>(names: I) -> Result<Self, OptimizerError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        if names.is_empty() {
            return Err(OptimizerError::invalid("feature schema is empty"));
        }
        Ok(Self { names })
    }

    /// Feature columns produced by the training pipeline
    pub fn standard() -> Self {
        Self {
            names: STANDARD_FEATURES.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl TryFrom<Vec<String>> for FeatureSchema {
    type Error = OptimizerError;

    fn try_from(names: Vec<String>) -> Result<Self, Self::Error> {
        FeatureSchema::new(names)
    }
}

impl From<FeatureSchema> for Vec<String> {
    fn from(schema: FeatureSchema) -> Self {
        schema.names
    }
}

/// Feature columns emitted by the training pipeline, in training order
pub const STANDARD_FEATURES: &[&str] = &[
    "Social_Media_Spend",
    "Search_Ads_Spend",
    "Email_Spend",
    "Promotions_Spend",
    "Competitor_Activity_Index",
    "Month_Num",
    "Season_Encoded",
    "Social_Spend_Ratio",
    "Search_Spend_Ratio",
    "Email_Spend_Ratio",
    "Promotions_Spend_Ratio",
    "Sales_Revenue_Lag1",
    "Total_Spend_Lag1",
    "Sales_Revenue_MA3",
    "Total_Spend_MA3",
];

/// Model input, positionally aligned to a [`FeatureSchema`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureVector(Vec<f64>);

impl FeatureVector {
    pub fn new(values: Vec<f64>) -> Self {
        Self(values)
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Baseline vs optimized outcome of one optimization call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationResult {
    pub scenario: Scenario,
    pub total_budget: f64,
    pub current_allocation: Allocation,
    pub optimized_allocation: Allocation,
    pub current_revenue: f64,
    pub optimized_revenue: f64,
    pub revenue_improvement: f64,
    pub current_roi: f64,
    pub optimized_roi: f64,
    pub roi_improvement: f64,
    pub candidates_evaluated: usize,
    pub candidates_rejected: usize,
}
