//! Business-week summary with week-over-week growth

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::business_week::{BusinessWeek, BusinessWeekResolver};
use super::profit_loss::{percentage, PeriodAggregator, PeriodTotals, ReportEnvelope};
use crate::traits::*;
use crate::types::*;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklySummaryQuery {
    pub branch_id: String,
    /// 0 is the current business week, 1 the previous one, and so on
    #[serde(default)]
    pub week_offset: u32,
}

impl WeeklySummaryQuery {
    pub fn new(branch_id: impl Into<String>, week_offset: u32) -> Self {
        Self {
            branch_id: branch_id.into(),
            week_offset,
        }
    }
}

/// Figures for one trading day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyRollup {
    pub date: NaiveDate,
    pub sales_count: usize,
    pub revenue: BigDecimal,
    pub cost: BigDecimal,
    pub expenses: BigDecimal,
    pub other_income: BigDecimal,
    pub purchases: BigDecimal,
    pub profit: BigDecimal,
}

impl DailyRollup {
    fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            sales_count: 0,
            revenue: BigDecimal::from(0),
            cost: BigDecimal::from(0),
            expenses: BigDecimal::from(0),
            other_income: BigDecimal::from(0),
            purchases: BigDecimal::from(0),
            profit: BigDecimal::from(0),
        }
    }
}

/// Percent change against the previous week
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekOverWeekGrowth {
    pub revenue: BigDecimal,
    pub gross_profit: BigDecimal,
    pub net_profit: BigDecimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklySummary {
    pub branch_id: String,
    pub week: BusinessWeek,
    pub totals: PeriodTotals,
    /// Saturday through Thursday, one entry per day
    pub daily: Vec<DailyRollup>,
    pub previous_week: BusinessWeek,
    pub previous_totals: PeriodTotals,
    pub growth: WeekOverWeekGrowth,
}

impl<S: LedgerStorage + CommerceStorage> PeriodAggregator<S> {
    /// Summary of the business week `week_offset` weeks before the current one
    #[instrument(skip(self, query), fields(branch_id = %query.branch_id, week_offset = query.week_offset))]
    pub async fn weekly_summary(&self, query: &WeeklySummaryQuery) -> ReportEnvelope<WeeklySummary> {
        ReportEnvelope::from_result(self.try_weekly_summary(query).await, "weekly summary")
    }

    pub async fn try_weekly_summary(&self, query: &WeeklySummaryQuery) -> LedgerResult<WeeklySummary> {
        self.branch_required(&query.branch_id).await?;

        let resolver = BusinessWeekResolver::new(self.config.week_numbering);
        let week = resolver.resolve_offset(self.clock.today(), query.week_offset)?;
        let previous_week = resolver.previous(&week)?;

        let data = self
            .gather(&query.branch_id, week.first_day(), week.last_day())
            .await?;
        let totals = self.totals(&data)?;
        let mut by_day = self.daily(&data)?;

        let daily = week
            .days()
            .into_iter()
            .map(|date| match by_day.remove(&date) {
                Some(day) => DailyRollup {
                    date,
                    sales_count: day.sales_count,
                    profit: day.profit(),
                    revenue: day.revenue,
                    cost: day.cost,
                    expenses: day.expenses,
                    other_income: day.other_income,
                    purchases: day.purchases,
                },
                None => DailyRollup::empty(date),
            })
            .collect();

        let previous_data = self
            .gather(&query.branch_id, previous_week.first_day(), previous_week.last_day())
            .await?;
        let previous_totals = self.totals(&previous_data)?;

        let places = self.config.margin_decimal_places;
        let growth = WeekOverWeekGrowth {
            revenue: growth(
                &totals.total_sales_revenue,
                &previous_totals.total_sales_revenue,
                places,
            ),
            gross_profit: growth(&totals.gross_profit, &previous_totals.gross_profit, places),
            net_profit: growth(&totals.net_profit, &previous_totals.net_profit, places),
        };

        debug!(
            week = week.week_number,
            year = week.year,
            revenue = %totals.total_sales_revenue,
            "Weekly summary computed"
        );

        Ok(WeeklySummary {
            branch_id: query.branch_id.clone(),
            week,
            totals,
            daily,
            previous_week,
            previous_totals,
            growth,
        })
    }
}

/// Percent change from `previous` to `current`.
///
/// A zero baseline yields 100, -100 or 0 following the sign of `current`.
pub fn growth(current: &BigDecimal, previous: &BigDecimal, places: i64) -> BigDecimal {
    let zero = BigDecimal::from(0);
    if *previous == zero {
        return if *current > zero {
            BigDecimal::from(100)
        } else if *current < zero {
            BigDecimal::from(-100)
        } else {
            zero
        };
    }
    percentage(&(current - previous), &previous.abs(), places)
}
