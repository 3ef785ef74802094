use super::answers::Answers;
use serde::{Deserialize, Serialize};

const DAYS_PER_MONTH: f64 = 30.0;
const MAX_VARIABLE_RATE: f64 = 90.0;

/// Break-even facts derived from the cost-structure answers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub contribution: f64,
    pub bep_monthly_teams: f64,
    pub bep_daily_teams: f64,
    pub current_daily_teams: f64,
    pub gap_daily_teams: f64,
    pub gap_ratio: f64,
}

/// Names of the values produced by [`compute_metrics`], as referenced by rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricId {
    Contribution,
    BepMonthlyTeams,
    BepDailyTeams,
    CurrentDailyTeams,
    GapDailyTeams,
    GapRatio,
}

impl MetricId {
    pub const fn ordered() -> [Self; 6] {
        [
            Self::Contribution,
            Self::BepMonthlyTeams,
            Self::BepDailyTeams,
            Self::CurrentDailyTeams,
            Self::GapDailyTeams,
            Self::GapRatio,
        ]
    }

    pub const fn key(self) -> &'static str {
        match self {
            Self::Contribution => "contribution",
            Self::BepMonthlyTeams => "bep_monthly_teams",
            Self::BepDailyTeams => "bep_daily_teams",
            Self::CurrentDailyTeams => "current_daily_teams",
            Self::GapDailyTeams => "gap_daily_teams",
            Self::GapRatio => "gap_ratio",
        }
    }
}

impl Metrics {
    pub fn get(&self, id: MetricId) -> f64 {
        match id {
            MetricId::Contribution => self.contribution,
            MetricId::BepMonthlyTeams => self.bep_monthly_teams,
            MetricId::BepDailyTeams => self.bep_daily_teams,
            MetricId::CurrentDailyTeams => self.current_daily_teams,
            MetricId::GapDailyTeams => self.gap_daily_teams,
            MetricId::GapRatio => self.gap_ratio,
        }
    }
}

pub fn compute_metrics(answers: &Answers) -> Metrics {
    let avg_ticket = answers.number_or_zero("avg_ticket").max(0.0);
    let fixed_cost = answers.number_or_zero("fixed_cost").max(0.0);
    let variable_rate = answers
        .number_or_zero("variable_rate")
        .clamp(0.0, MAX_VARIABLE_RATE);
    let monthly_teams = answers.number_or_zero("monthly_teams").max(0.0);

    let contribution = avg_ticket * (1.0 - variable_rate / 100.0);
    // floor keeps the break-even count finite and non-negative
    let safe_contribution = contribution.max(1.0);
    let bep_monthly_teams = fixed_cost / safe_contribution;
    let bep_daily_teams = bep_monthly_teams / DAYS_PER_MONTH;
    let current_daily_teams = monthly_teams / DAYS_PER_MONTH;
    let gap_daily_teams = (bep_daily_teams - current_daily_teams).max(0.0);
    let gap_ratio = bep_daily_teams / current_daily_teams.max(1.0);

    Metrics {
        contribution,
        bep_monthly_teams,
        bep_daily_teams,
        current_daily_teams,
        gap_daily_teams,
        gap_ratio,
    }
}
