//! Profit and loss over a branch and date range
//!
//! Figures are recomputed from sales, purchases and the journal on every call.

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, error, instrument};

use crate::commerce::{Product, Purchase, Sale};
use crate::config::{CostBasis, ReportingConfig};
use crate::traits::*;
use crate::types::*;

/// Outcome of a report call. Failures are carried as data rather than returned as errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportEnvelope<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ReportEnvelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    /// Wrap an error. Internal failures get a generic message; the detail is only logged.
    pub fn failure(err: &LedgerError, report: &str) -> Self {
        let message = match err.kind() {
            ErrorKind::Validation | ErrorKind::NotFound | ErrorKind::Computation => err.to_string(),
            ErrorKind::Internal => format!("Failed to calculate {}", report),
        };
        error!(error = %err, report, "Report failed");
        Self {
            success: false,
            data: None,
            error: Some(message),
        }
    }

    pub fn from_result(result: LedgerResult<T>, report: &str) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(err) => Self::failure(&err, report),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfitLossQuery {
    pub branch_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl ProfitLossQuery {
    pub fn new(branch_id: impl Into<String>, start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            branch_id: branch_id.into(),
            start_date,
            end_date,
        }
    }
}

/// Headline figures for a window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodTotals {
    pub sales_count: usize,
    pub total_sales_revenue: BigDecimal,
    pub total_other_income: BigDecimal,
    pub total_cost_of_goods_sold: BigDecimal,
    pub total_operating_expenses: BigDecimal,
    pub purchase_count: usize,
    pub total_purchases: BigDecimal,
    pub gross_profit: BigDecimal,
    pub operating_profit: BigDecimal,
    pub net_profit: BigDecimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevenueSection {
    pub total_sales_revenue: BigDecimal,
    pub total_other_income: BigDecimal,
    pub sales_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostSection {
    pub total_cost_of_goods_sold: BigDecimal,
    pub total_operating_expenses: BigDecimal,
    /// Purchases are shown for reference; they do not enter profit
    pub total_purchases: BigDecimal,
    pub purchase_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfitSection {
    pub gross_profit: BigDecimal,
    pub operating_profit: BigDecimal,
    pub net_profit: BigDecimal,
    pub gross_margin: BigDecimal,
    pub operating_margin: BigDecimal,
    pub net_margin: BigDecimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductProfit {
    pub product_id: String,
    pub product_name: String,
    pub quantity: BigDecimal,
    pub cost: BigDecimal,
    pub revenue: BigDecimal,
    pub profit: BigDecimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyProfit {
    pub date: NaiveDate,
    pub revenue: BigDecimal,
    pub cost: BigDecimal,
    pub expenses: BigDecimal,
    pub other_income: BigDecimal,
    pub profit: BigDecimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfitBreakdown {
    pub sales_by_product: Vec<ProductProfit>,
    pub daily_profit_trend: Vec<DailyProfit>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfitLossReport {
    pub branch_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub revenue: RevenueSection,
    pub costs: CostSection,
    pub profit: ProfitSection,
    pub breakdown: ProfitBreakdown,
}

/// Per-day accumulator shared by the trend and the weekly rollups
#[derive(Debug, Clone, Default)]
pub(crate) struct DayFigures {
    pub sales_count: usize,
    pub revenue: BigDecimal,
    pub cost: BigDecimal,
    pub expenses: BigDecimal,
    pub other_income: BigDecimal,
    pub purchases: BigDecimal,
    /// Expense and income postings seen on the day
    pub journal_count: usize,
}

impl DayFigures {
    pub fn profit(&self) -> BigDecimal {
        &self.revenue - &self.cost - &self.expenses + &self.other_income
    }

    /// False for days that only carry purchases, which never enter profit
    pub fn has_profit_activity(&self) -> bool {
        self.sales_count > 0 || self.journal_count > 0
    }
}

/// Rows read for one window, with every lookup already resolved
pub(crate) struct PeriodData {
    pub sales: Vec<Sale>,
    pub purchases: Vec<Purchase>,
    /// (entry date, signed amount) of movements touching an expense head
    pub expenses: Vec<(NaiveDate, BigDecimal)>,
    /// (entry date, signed amount) of movements touching an income head
    pub other_income: Vec<(NaiveDate, BigDecimal)>,
    pub products: HashMap<String, Product>,
}

/// Computes profit/loss and weekly figures from the stored books
pub struct PeriodAggregator<S> {
    pub(crate) storage: S,
    pub(crate) config: ReportingConfig,
    pub(crate) clock: Arc<dyn Clock>,
}

impl<S: LedgerStorage + CommerceStorage> PeriodAggregator<S> {
    pub fn new(storage: S, config: ReportingConfig) -> Self {
        Self::with_clock(storage, config, Arc::new(SystemClock))
    }

    pub fn with_clock(storage: S, config: ReportingConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            storage,
            config,
            clock,
        }
    }

    /// Profit and loss for `[start_date, end_date]`, both days inclusive
    #[instrument(skip(self, query), fields(branch_id = %query.branch_id, start = %query.start_date, end = %query.end_date))]
    pub async fn profit_loss(&self, query: &ProfitLossQuery) -> ReportEnvelope<ProfitLossReport> {
        ReportEnvelope::from_result(self.try_profit_loss(query).await, "profit/loss")
    }

    /// Same as [`Self::profit_loss`] but with the error returned to the caller
    pub async fn try_profit_loss(&self, query: &ProfitLossQuery) -> LedgerResult<ProfitLossReport> {
        if query.start_date > query.end_date {
            return Err(LedgerError::Validation(format!(
                "Start date {} is after end date {}",
                query.start_date, query.end_date
            )));
        }
        self.branch_required(&query.branch_id).await?;

        let data = self
            .gather(&query.branch_id, query.start_date, query.end_date)
            .await?;
        let totals = self.totals(&data)?;
        let places = self.config.margin_decimal_places;

        let profit = ProfitSection {
            gross_margin: percentage(&totals.gross_profit, &totals.total_sales_revenue, places),
            operating_margin: percentage(
                &totals.operating_profit,
                &totals.total_sales_revenue,
                places,
            ),
            net_margin: percentage(&totals.net_profit, &totals.total_sales_revenue, places),
            gross_profit: totals.gross_profit.clone(),
            operating_profit: totals.operating_profit.clone(),
            net_profit: totals.net_profit.clone(),
        };

        let daily_profit_trend = self
            .daily(&data)?
            .into_iter()
            .filter(|(_, day)| day.has_profit_activity())
            .map(|(date, day)| DailyProfit {
                date,
                profit: day.profit(),
                revenue: day.revenue,
                cost: day.cost,
                expenses: day.expenses,
                other_income: day.other_income,
            })
            .collect();

        debug!(
            sales = totals.sales_count,
            revenue = %totals.total_sales_revenue,
            net_profit = %totals.net_profit,
            "Profit/loss computed"
        );

        Ok(ProfitLossReport {
            branch_id: query.branch_id.clone(),
            start_date: query.start_date,
            end_date: query.end_date,
            revenue: RevenueSection {
                total_sales_revenue: totals.total_sales_revenue,
                total_other_income: totals.total_other_income,
                sales_count: totals.sales_count,
            },
            costs: CostSection {
                total_cost_of_goods_sold: totals.total_cost_of_goods_sold,
                total_operating_expenses: totals.total_operating_expenses,
                total_purchases: totals.total_purchases,
                purchase_count: totals.purchase_count,
            },
            profit,
            breakdown: ProfitBreakdown {
                sales_by_product: self.by_product(&data)?,
                daily_profit_trend,
            },
        })
    }

    pub(crate) async fn branch_required(&self, branch_id: &str) -> LedgerResult<()> {
        match self.storage.get_branch(branch_id).await? {
            Some(_) => Ok(()),
            None => Err(LedgerError::BranchNotFound(branch_id.to_string())),
        }
    }

    /// Read every row the window needs and resolve products and account types
    pub(crate) async fn gather(
        &self,
        branch_id: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> LedgerResult<PeriodData> {
        let sales: Vec<Sale> = self
            .storage
            .list_sales(branch_id, start_date, end_date)
            .await?
            .into_iter()
            .filter(|sale| sale.status.is_realized())
            .collect();

        let purchases: Vec<Purchase> = self
            .storage
            .list_purchases(branch_id, start_date, end_date)
            .await?
            .into_iter()
            .filter(|purchase| purchase.status != crate::commerce::PaymentStatus::Cancelled)
            .collect();

        let filter = MovementFilter {
            branch_id: Some(branch_id.to_string()),
            ..MovementFilter::between(start_date, end_date)
        };
        let movements = self.storage.list_movements(&filter).await?;

        let mut account_types: HashMap<String, AccountType> = HashMap::new();
        let mut expenses = Vec::new();
        let mut other_income = Vec::new();
        // Movements derived from sales and purchases are already counted through
        // revenue and cost of goods sold.
        for movement in movements.iter().filter(|m| m.source.is_none()) {
            let debit_type = self
                .account_type(&mut account_types, &movement.debit_account_id)
                .await?;
            let credit_type = self
                .account_type(&mut account_types, &movement.credit_account_id)
                .await?;

            // Credits to expense heads and debits to income heads are corrections
            // and net against the period.
            let amount = movement.amount();
            if debit_type == AccountType::Expense {
                expenses.push((movement.entry_date, amount.clone()));
            }
            if credit_type == AccountType::Expense {
                expenses.push((movement.entry_date, -amount.clone()));
            }
            if credit_type == AccountType::Income {
                other_income.push((movement.entry_date, amount.clone()));
            }
            if debit_type == AccountType::Income {
                other_income.push((movement.entry_date, -amount.clone()));
            }
        }

        let product_ids: HashSet<&str> = sales
            .iter()
            .flat_map(|sale| sale.items.iter().map(|item| item.product_id.as_str()))
            .collect();
        let mut products = HashMap::new();
        for product_id in product_ids {
            if let Some(product) = self.storage.get_product(product_id).await? {
                products.insert(product_id.to_string(), product);
            }
        }

        Ok(PeriodData {
            sales,
            purchases,
            expenses,
            other_income,
            products,
        })
    }

    async fn account_type(
        &self,
        cache: &mut HashMap<String, AccountType>,
        account_id: &str,
    ) -> LedgerResult<AccountType> {
        if let Some(account_type) = cache.get(account_id) {
            return Ok(*account_type);
        }
        let account = self.storage.get_account(account_id).await?.ok_or_else(|| {
            LedgerError::Computation(format!(
                "Journal references account '{}' which no longer exists",
                account_id
            ))
        })?;
        cache.insert(account_id.to_string(), account.account_type);
        Ok(account.account_type)
    }

    /// Unit cost of a sale line under the configured cost basis
    fn unit_cost(
        &self,
        data: &PeriodData,
        sale: &Sale,
        item: &crate::commerce::LineItem,
    ) -> LedgerResult<BigDecimal> {
        if self.config.cost_basis == CostBasis::RecordedUnitCost {
            if let Some(ref cost) = item.unit_cost {
                return Ok(cost.clone());
            }
        }
        data.products
            .get(&item.product_id)
            .map(|product| product.cost_price.clone())
            .ok_or_else(|| {
                LedgerError::Computation(format!(
                    "Sale '{}' references product '{}' which no longer exists",
                    sale.invoice_no, item.product_id
                ))
            })
    }

    /// Cost of goods sold for one sale
    fn sale_cost(&self, data: &PeriodData, sale: &Sale) -> LedgerResult<BigDecimal> {
        let mut cost = BigDecimal::from(0);
        for item in &sale.items {
            cost += self.unit_cost(data, sale, item)? * &item.quantity;
        }
        Ok(cost)
    }

    pub(crate) fn totals(&self, data: &PeriodData) -> LedgerResult<PeriodTotals> {
        let total_sales_revenue: BigDecimal = data.sales.iter().map(|s| &s.grand_total).sum();

        let mut total_cost_of_goods_sold = BigDecimal::from(0);
        for sale in &data.sales {
            total_cost_of_goods_sold += self.sale_cost(data, sale)?;
        }

        let total_operating_expenses: BigDecimal =
            data.expenses.iter().map(|(_, amount)| amount).sum();
        let total_other_income: BigDecimal =
            data.other_income.iter().map(|(_, amount)| amount).sum();
        let total_purchases: BigDecimal = data.purchases.iter().map(|p| &p.grand_total).sum();

        let gross_profit = &total_sales_revenue - &total_cost_of_goods_sold;
        let operating_profit = &gross_profit - &total_operating_expenses;
        let net_profit = &operating_profit + &total_other_income;

        Ok(PeriodTotals {
            sales_count: data.sales.len(),
            total_sales_revenue,
            total_other_income,
            total_cost_of_goods_sold,
            total_operating_expenses,
            purchase_count: data.purchases.len(),
            total_purchases,
            gross_profit,
            operating_profit,
            net_profit,
        })
    }

    /// Figures grouped by calendar day, ascending
    pub(crate) fn daily(&self, data: &PeriodData) -> LedgerResult<BTreeMap<NaiveDate, DayFigures>> {
        let mut days: BTreeMap<NaiveDate, DayFigures> = BTreeMap::new();

        for sale in &data.sales {
            let cost = self.sale_cost(data, sale)?;
            let day = days.entry(sale.business_date()).or_default();
            day.sales_count += 1;
            day.revenue += &sale.grand_total;
            day.cost += cost;
        }
        for purchase in &data.purchases {
            days.entry(purchase.business_date()).or_default().purchases += &purchase.grand_total;
        }
        for (date, amount) in &data.expenses {
            let day = days.entry(*date).or_default();
            day.expenses += amount;
            day.journal_count += 1;
        }
        for (date, amount) in &data.other_income {
            let day = days.entry(*date).or_default();
            day.other_income += amount;
            day.journal_count += 1;
        }

        Ok(days)
    }

    /// Sale lines grouped by product, most profitable first
    fn by_product(&self, data: &PeriodData) -> LedgerResult<Vec<ProductProfit>> {
        let mut grouped: HashMap<&str, ProductProfit> = HashMap::new();

        for sale in &data.sales {
            for item in &sale.items {
                let cost = self.unit_cost(data, sale, item)? * &item.quantity;
                let entry = grouped
                    .entry(item.product_id.as_str())
                    .or_insert_with(|| ProductProfit {
                        product_id: item.product_id.clone(),
                        product_name: data
                            .products
                            .get(&item.product_id)
                            .map(|p| p.name.clone())
                            .unwrap_or_else(|| item.product_id.clone()),
                        quantity: BigDecimal::from(0),
                        cost: BigDecimal::from(0),
                        revenue: BigDecimal::from(0),
                        profit: BigDecimal::from(0),
                    });
                entry.quantity += &item.quantity;
                entry.revenue += &item.total;
                entry.profit += &item.total - &cost;
                entry.cost += cost;
            }
        }

        let mut products: Vec<ProductProfit> = grouped.into_values().collect();
        products.sort_by(|a, b| {
            b.profit
                .cmp(&a.profit)
                .then_with(|| a.product_id.cmp(&b.product_id))
        });
        Ok(products)
    }
}

/// `part` as a percentage of `whole`, or zero when `whole` is zero
pub fn percentage(part: &BigDecimal, whole: &BigDecimal, places: i64) -> BigDecimal {
    if *whole == BigDecimal::from(0) {
        return BigDecimal::from(0);
    }
    (part * BigDecimal::from(100) / whole).round(places)
}
