//! Integration tests for trading-ledger-core

use std::collections::HashMap;
use std::sync::Arc;

use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime};
use trading_ledger_core::{
    patterns,
    utils::{EnhancedTransactionValidator, MemoryStorage},
    AccountHead, AccountType, ChartOfAccounts, CommerceBook, CommerceStorage, CostBasis, Counterparty,
    DefaultAccountValidator, DocumentDraft, FixedClock, JournalEntryRequest, JournalPoster, Ledger,
    LedgerError, LineDraft, LineItem, PaymentStatus, PeriodAggregator, ProfitLossQuery,
    ReportingConfig, Sale, VoucherType, WeeklySummaryQuery,
};

fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

fn at(date: NaiveDate, hour: u32) -> NaiveDateTime {
    date.and_hms_opt(hour, 0, 0).unwrap()
}

fn dec(value: i64) -> BigDecimal {
    BigDecimal::from(value)
}

/// Storage with the standard chart, a "main" branch and one tiller product
async fn setup() -> (
    MemoryStorage,
    Ledger<MemoryStorage>,
    CommerceBook<MemoryStorage>,
    HashMap<String, AccountHead>,
) {
    let storage = MemoryStorage::new();
    let mut ledger = Ledger::new(storage.clone());
    let accounts = ledger.setup_standard_chart_of_accounts().await.unwrap();

    let mut book = CommerceBook::new(storage.clone());
    book.register_branch("main".into(), "Main Showroom".into())
        .await
        .unwrap();
    book.register_product(trading_ledger_core::Product::new(
        "tiller".into(),
        "Power Tiller".into(),
        dec(600),
        dec(1000),
    ))
    .await
    .unwrap();

    (storage, ledger, book, accounts)
}

async fn paid_sale(
    book: &mut CommerceBook<MemoryStorage>,
    invoice_no: &str,
    when: NaiveDateTime,
    unit_price: i64,
) -> Sale {
    let draft = DocumentDraft::new(
        invoice_no,
        "main",
        when,
        vec![LineDraft::new("tiller", dec(1)).at(dec(unit_price))],
    )
    .paid(dec(unit_price));
    book.record_sale(draft).await.unwrap()
}

fn aggregator(storage: &MemoryStorage, today: NaiveDate) -> PeriodAggregator<MemoryStorage> {
    PeriodAggregator::with_clock(
        storage.clone(),
        ReportingConfig::default(),
        Arc::new(FixedClock(today)),
    )
}

#[tokio::test]
async fn test_two_sales_without_expenses() {
    let (storage, mut ledger, mut book, accounts) = setup().await;

    let first = paid_sale(&mut book, "INV-1", at(ymd(2025, 12, 14), 10), 1000).await;
    let second = paid_sale(&mut book, "INV-2", at(ymd(2025, 12, 15), 11), 500).await;
    for sale in [&first, &second] {
        let entry = patterns::sale_entry(
            sale,
            accounts["cash"].id.clone(),
            accounts["sales_revenue"].id.clone(),
        )
        .unwrap();
        ledger.post_entry(entry).await.unwrap();
    }

    let query = ProfitLossQuery::new("main", ymd(2025, 12, 1), ymd(2025, 12, 31));
    let envelope = aggregator(&storage, ymd(2025, 12, 31))
        .profit_loss(&query)
        .await;
    assert!(envelope.success);
    let report = envelope.data.unwrap();

    assert_eq!(report.revenue.total_sales_revenue, dec(1500));
    assert_eq!(report.revenue.sales_count, 2);
    // Journal entries raised from the sales are not counted a second time
    assert_eq!(report.revenue.total_other_income, dec(0));
    assert_eq!(report.costs.total_operating_expenses, dec(0));
    assert_eq!(report.costs.total_cost_of_goods_sold, dec(1200));
    assert_eq!(report.profit.gross_profit, dec(300));
    assert_eq!(report.profit.net_profit, report.profit.gross_profit);
    assert_eq!(report.profit.gross_margin, dec(20));

    assert_eq!(report.breakdown.daily_profit_trend.len(), 2);
    assert_eq!(report.breakdown.daily_profit_trend[0].date, ymd(2025, 12, 14));
    assert_eq!(report.breakdown.daily_profit_trend[0].profit, dec(400));
    assert_eq!(report.breakdown.daily_profit_trend[1].profit, dec(-100));

    let products = &report.breakdown.sales_by_product;
    assert_eq!(products.len(), 1);
    assert_eq!(products[0].product_name, "Power Tiller");
    assert_eq!(products[0].quantity, dec(2));
    assert_eq!(products[0].profit, dec(300));
}

#[tokio::test]
async fn test_asset_and_liability_both_increase() {
    let (_storage, mut ledger, _book, accounts) = setup().await;
    let inventory = &accounts["inventory"];
    let payables = &accounts["accounts_payable"];

    let request = JournalEntryRequest::new(
        ymd(2025, 3, 1),
        VoucherType::Journal,
        inventory.id.clone(),
        payables.id.clone(),
        dec(200),
    );
    let posted = ledger.post_entry(request).await.unwrap();

    assert_eq!(posted.debit_account.current_balance, dec(200));
    assert_eq!(posted.credit_account.current_balance, dec(200));
    assert!(posted.movement.is_balanced());
    assert_eq!(
        ledger.get_account_balance(&payables.id, None).await.unwrap(),
        dec(200)
    );

    let trial_balance = ledger.get_trial_balance(ymd(2025, 3, 31)).await.unwrap();
    assert!(trial_balance.is_balanced);
    assert_eq!(trial_balance.total_debits, dec(200));
}

#[tokio::test]
async fn test_margins_are_zero_without_revenue() {
    let (storage, mut ledger, _book, accounts) = setup().await;

    let rent = patterns::expense_payment(
        ymd(2025, 6, 2),
        "main".into(),
        accounts["rent_expense"].id.clone(),
        accounts["cash"].id.clone(),
        dec(300),
        "June rent".into(),
    )
    .unwrap();
    ledger.post_entry(rent).await.unwrap();

    let query = ProfitLossQuery::new("main", ymd(2025, 6, 1), ymd(2025, 6, 30));
    let report = aggregator(&storage, ymd(2025, 6, 30))
        .try_profit_loss(&query)
        .await
        .unwrap();

    assert_eq!(report.revenue.total_sales_revenue, dec(0));
    assert_eq!(report.costs.total_operating_expenses, dec(300));
    assert_eq!(report.profit.net_profit, dec(-300));
    assert_eq!(report.profit.gross_margin, dec(0));
    assert_eq!(report.profit.operating_margin, dec(0));
    assert_eq!(report.profit.net_margin, dec(0));
}

#[tokio::test]
async fn test_reversed_expense_nets_out_of_profit() {
    let (storage, mut ledger, _book, accounts) = setup().await;
    let rent_account = accounts["rent_expense"].id.clone();

    let rent = patterns::expense_payment(
        ymd(2025, 6, 2),
        "main".into(),
        rent_account.clone(),
        accounts["cash"].id.clone(),
        dec(300),
        "June rent".into(),
    )
    .unwrap();
    let rent = ledger.post_entry(rent).await.unwrap();
    ledger
        .reverse_entry(&rent.movement.id, ymd(2025, 6, 3), Some("Paid by landlord".into()))
        .await
        .unwrap();

    let refund = patterns::other_income_receipt(
        ymd(2025, 6, 4),
        "main".into(),
        accounts["cash"].id.clone(),
        accounts["service_income"].id.clone(),
        dec(150),
        "Gearbox repair".into(),
    )
    .unwrap();
    let refund = ledger.post_entry(refund).await.unwrap();
    ledger
        .reverse_entry(&refund.movement.id, ymd(2025, 6, 5), None)
        .await
        .unwrap();

    let report = aggregator(&storage, ymd(2025, 6, 30))
        .try_profit_loss(&ProfitLossQuery::new("main", ymd(2025, 6, 1), ymd(2025, 6, 30)))
        .await
        .unwrap();
    assert_eq!(report.costs.total_operating_expenses, dec(0));
    assert_eq!(report.revenue.total_other_income, dec(0));
    assert_eq!(report.profit.net_profit, dec(0));
    assert_eq!(ledger.get_account_balance(&rent_account, None).await.unwrap(), dec(0));

    let trend = &report.breakdown.daily_profit_trend;
    assert_eq!(trend.len(), 4);
    assert_eq!(trend[0].expenses, dec(300));
    assert_eq!(trend[1].expenses, dec(-300));
    assert_eq!(trend[1].profit, dec(300));
    assert_eq!(trend[3].other_income, dec(-150));
}

#[tokio::test]
async fn test_purchase_only_days_stay_out_of_the_trend() {
    let (storage, _ledger, mut book, _accounts) = setup().await;
    paid_sale(&mut book, "INV-1", at(ymd(2025, 7, 1), 9), 1000).await;
    let restock = DocumentDraft::new(
        "PO-1",
        "main",
        at(ymd(2025, 7, 2), 9),
        vec![LineDraft::new("tiller", dec(2))],
    );
    book.record_purchase(restock).await.unwrap();

    let report = aggregator(&storage, ymd(2025, 7, 31))
        .try_profit_loss(&ProfitLossQuery::new("main", ymd(2025, 7, 1), ymd(2025, 7, 31)))
        .await
        .unwrap();
    assert_eq!(report.costs.total_purchases, dec(1200));
    let dates: Vec<NaiveDate> = report
        .breakdown
        .daily_profit_trend
        .iter()
        .map(|day| day.date)
        .collect();
    assert_eq!(dates, vec![ymd(2025, 7, 1)]);
}

#[tokio::test]
async fn test_other_income_and_branch_scoping() {
    let (storage, mut ledger, mut book, accounts) = setup().await;
    book.register_branch("north".into(), "North Depot".into())
        .await
        .unwrap();
    paid_sale(&mut book, "INV-1", at(ymd(2025, 6, 3), 9), 1000).await;

    let repair = patterns::other_income_receipt(
        ymd(2025, 6, 4),
        "main".into(),
        accounts["cash"].id.clone(),
        accounts["service_income"].id.clone(),
        dec(150),
        "Gearbox repair".into(),
    )
    .unwrap();
    ledger.post_entry(repair).await.unwrap();

    let north_rent = patterns::expense_payment(
        ymd(2025, 6, 4),
        "north".into(),
        accounts["rent_expense"].id.clone(),
        accounts["cash"].id.clone(),
        dec(80),
        "Depot rent".into(),
    )
    .unwrap();
    ledger.post_entry(north_rent).await.unwrap();

    let aggregator = aggregator(&storage, ymd(2025, 6, 30));
    let main = aggregator
        .try_profit_loss(&ProfitLossQuery::new("main", ymd(2025, 6, 1), ymd(2025, 6, 30)))
        .await
        .unwrap();
    assert_eq!(main.revenue.total_other_income, dec(150));
    assert_eq!(main.costs.total_operating_expenses, dec(0));
    assert_eq!(main.profit.operating_profit, dec(400));
    assert_eq!(main.profit.net_profit, dec(550));
    assert_eq!(main.profit.net_margin, dec(55));

    let north = aggregator
        .try_profit_loss(&ProfitLossQuery::new("north", ymd(2025, 6, 1), ymd(2025, 6, 30)))
        .await
        .unwrap();
    assert_eq!(north.revenue.sales_count, 0);
    assert_eq!(north.profit.net_profit, dec(-80));
}

#[tokio::test]
async fn test_aggregation_is_idempotent() {
    let (storage, _ledger, mut book, _accounts) = setup().await;
    paid_sale(&mut book, "INV-1", at(ymd(2025, 7, 1), 9), 1000).await;
    paid_sale(&mut book, "INV-2", at(ymd(2025, 7, 2), 9), 1200).await;

    let aggregator = aggregator(&storage, ymd(2025, 7, 31));
    let query = ProfitLossQuery::new("main", ymd(2025, 7, 1), ymd(2025, 7, 31));
    let first = aggregator.profit_loss(&query).await;
    let second = aggregator.profit_loss(&query).await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_unrealized_and_cancelled_documents_are_ignored() {
    let (storage, _ledger, mut book, _accounts) = setup().await;
    paid_sale(&mut book, "INV-1", at(ymd(2025, 7, 1), 9), 1000).await;

    let unpaid = DocumentDraft::new(
        "INV-2",
        "main",
        at(ymd(2025, 7, 2), 9),
        vec![LineDraft::new("tiller", dec(1))],
    );
    let unpaid = book.record_sale(unpaid).await.unwrap();
    assert_eq!(unpaid.status, PaymentStatus::Pending);

    let cancelled = paid_sale(&mut book, "INV-3", at(ymd(2025, 7, 3), 9), 900).await;
    book.cancel_sale(&cancelled.id).await.unwrap();

    let purchase = DocumentDraft::new(
        "PO-1",
        "main",
        at(ymd(2025, 7, 4), 9),
        vec![LineDraft::new("tiller", dec(3))],
    );
    book.record_purchase(purchase).await.unwrap();

    let report = aggregator(&storage, ymd(2025, 7, 31))
        .try_profit_loss(&ProfitLossQuery::new("main", ymd(2025, 7, 1), ymd(2025, 7, 31)))
        .await
        .unwrap();
    assert_eq!(report.revenue.sales_count, 1);
    assert_eq!(report.revenue.total_sales_revenue, dec(1000));
    // Purchases are reported but do not enter profit
    assert_eq!(report.costs.total_purchases, dec(1800));
    assert_eq!(report.costs.purchase_count, 1);
    assert_eq!(report.profit.net_profit, dec(400));
}

#[tokio::test]
async fn test_cost_basis_policy() {
    let (storage, _ledger, mut book, _accounts) = setup().await;
    paid_sale(&mut book, "INV-1", at(ymd(2025, 8, 5), 9), 1000).await;
    book.update_cost_price("tiller", dec(700)).await.unwrap();

    let query = ProfitLossQuery::new("main", ymd(2025, 8, 1), ymd(2025, 8, 31));
    let current = aggregator(&storage, ymd(2025, 8, 31))
        .try_profit_loss(&query)
        .await
        .unwrap();
    assert_eq!(current.costs.total_cost_of_goods_sold, dec(700));

    let recorded = PeriodAggregator::with_clock(
        storage.clone(),
        ReportingConfig {
            cost_basis: CostBasis::RecordedUnitCost,
            ..ReportingConfig::default()
        },
        Arc::new(FixedClock(ymd(2025, 8, 31))),
    )
    .try_profit_loss(&query)
    .await
    .unwrap();
    assert_eq!(recorded.costs.total_cost_of_goods_sold, dec(600));
}

#[tokio::test]
async fn test_missing_product_is_a_structured_failure() {
    let (mut storage, _ledger, _book, _accounts) = setup().await;
    let orphan = Sale::new(
        "INV-9".into(),
        "main".into(),
        None,
        at(ymd(2025, 9, 1), 9),
        vec![LineItem::new("discontinued".into(), dec(1), dec(250))],
    )
    .with_paid(dec(250));
    storage.save_sale(&orphan).await.unwrap();

    let envelope = aggregator(&storage, ymd(2025, 9, 30))
        .profit_loss(&ProfitLossQuery::new("main", ymd(2025, 9, 1), ymd(2025, 9, 30)))
        .await;
    assert!(!envelope.success);
    assert!(envelope.data.is_none());
    assert!(envelope.error.unwrap().contains("discontinued"));
}

#[tokio::test]
async fn test_report_rejects_bad_queries() {
    let (storage, _ledger, _book, _accounts) = setup().await;
    let aggregator = aggregator(&storage, ymd(2025, 9, 30));

    let unknown = aggregator
        .try_profit_loss(&ProfitLossQuery::new("south", ymd(2025, 9, 1), ymd(2025, 9, 30)))
        .await;
    assert!(matches!(unknown, Err(LedgerError::BranchNotFound(_))));

    let reversed = aggregator
        .profit_loss(&ProfitLossQuery::new("main", ymd(2025, 9, 30), ymd(2025, 9, 1)))
        .await;
    assert!(!reversed.success);
    assert!(reversed.error.unwrap().starts_with("Validation error"));
}

#[tokio::test]
async fn test_weekly_summary_with_growth() {
    let (storage, mut ledger, mut book, accounts) = setup().await;

    // Week of Saturday 2025-12-13
    paid_sale(&mut book, "INV-1", at(ymd(2025, 12, 13), 10), 1000).await;
    paid_sale(&mut book, "INV-2", at(ymd(2025, 12, 15), 16), 1000).await;
    let rent = patterns::expense_payment(
        ymd(2025, 12, 14),
        "main".into(),
        accounts["rent_expense"].id.clone(),
        accounts["cash"].id.clone(),
        dec(100),
        "Shop rent".into(),
    )
    .unwrap();
    ledger.post_entry(rent).await.unwrap();
    // Friday holiday sale belongs to no business week
    paid_sale(&mut book, "INV-3", at(ymd(2025, 12, 19), 10), 1000).await;
    // Previous week
    paid_sale(&mut book, "INV-0", at(ymd(2025, 12, 8), 12), 1000).await;

    let aggregator = aggregator(&storage, ymd(2025, 12, 17));
    let envelope = aggregator
        .weekly_summary(&WeeklySummaryQuery::new("main", 0))
        .await;
    assert!(envelope.success);
    let summary = envelope.data.unwrap();

    assert_eq!(summary.week.first_day(), ymd(2025, 12, 13));
    assert_eq!(summary.week.end_date, ymd(2025, 12, 18).and_hms_opt(23, 59, 59).unwrap());
    assert_eq!(summary.previous_week.first_day(), ymd(2025, 12, 6));

    assert_eq!(summary.totals.sales_count, 2);
    assert_eq!(summary.totals.total_sales_revenue, dec(2000));
    assert_eq!(summary.totals.gross_profit, dec(800));
    assert_eq!(summary.totals.net_profit, dec(700));
    assert_eq!(summary.previous_totals.total_sales_revenue, dec(1000));

    assert_eq!(summary.daily.len(), 6);
    assert_eq!(summary.daily[0].date, ymd(2025, 12, 13));
    assert_eq!(summary.daily[0].revenue, dec(1000));
    assert_eq!(summary.daily[1].expenses, dec(100));
    assert_eq!(summary.daily[1].profit, dec(-100));
    assert_eq!(summary.daily[3].revenue, dec(0));
    assert_eq!(summary.daily[5].date, ymd(2025, 12, 18));

    assert_eq!(summary.growth.revenue, dec(100));
    assert_eq!(summary.growth.gross_profit, dec(100));
    assert_eq!(summary.growth.net_profit, dec(75));

    let last_week = aggregator
        .try_weekly_summary(&WeeklySummaryQuery::new("main", 1))
        .await
        .unwrap();
    assert_eq!(last_week.week.first_day(), ymd(2025, 12, 6));
    assert_eq!(last_week.totals.total_sales_revenue, dec(1000));
    // Nothing was sold the week before
    assert_eq!(last_week.growth.revenue, dec(100));
}

#[tokio::test]
async fn test_friday_clock_reports_the_week_just_ended() {
    let (storage, _ledger, mut book, _accounts) = setup().await;
    paid_sale(&mut book, "INV-1", at(ymd(2025, 12, 18), 10), 1000).await;

    let summary = aggregator(&storage, ymd(2025, 12, 19))
        .try_weekly_summary(&WeeklySummaryQuery::new("main", 0))
        .await
        .unwrap();
    assert_eq!(summary.week.first_day(), ymd(2025, 12, 13));
    assert_eq!(summary.daily[5].revenue, dec(1000));
    assert_eq!(summary.growth.net_profit, dec(100));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_postings_do_not_lose_updates() {
    let (storage, ledger, _book, accounts) = setup().await;
    let cash = accounts["cash"].id.clone();
    let capital = accounts["owners_capital"].id.clone();

    let mut handles = Vec::new();
    for _ in 0..50 {
        let storage = storage.clone();
        let cash = cash.clone();
        let capital = capital.clone();
        handles.push(tokio::spawn(async move {
            let mut poster = JournalPoster::new(storage);
            let request = patterns::owner_investment(ymd(2025, 1, 1), cash, capital, dec(10))
                .unwrap();
            poster.post_entry(request).await.unwrap();
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(ledger.get_account_balance(&cash, None).await.unwrap(), dec(500));
    assert_eq!(ledger.get_account_balance(&capital, None).await.unwrap(), dec(500));
    assert_eq!(storage.movement_count().unwrap(), 50);
    assert!(ledger.reconcile_account(&cash).await.unwrap().is_consistent);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_reversals_post_only_once() {
    let (storage, mut ledger, _book, accounts) = setup().await;
    let cash = accounts["cash"].id.clone();
    let capital = accounts["owners_capital"].id.clone();

    let investment =
        patterns::owner_investment(ymd(2025, 1, 1), cash.clone(), capital.clone(), dec(100))
            .unwrap();
    let original = ledger.post_entry(investment).await.unwrap().movement;

    let mut handles = Vec::new();
    for _ in 0..8 {
        let storage = storage.clone();
        let movement_id = original.id.clone();
        handles.push(tokio::spawn(async move {
            let mut poster = JournalPoster::new(storage);
            poster
                .reverse_entry(&movement_id, ymd(2025, 1, 2), Some("Duplicate".into()))
                .await
        }));
    }

    let mut posted = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => posted += 1,
            Err(error) => assert!(matches!(error, LedgerError::Validation(_)), "{error}"),
        }
    }

    assert_eq!(posted, 1);
    assert_eq!(storage.movement_count().unwrap(), 2);
    assert_eq!(ledger.get_account_balance(&cash, None).await.unwrap(), dec(0));
    assert_eq!(ledger.get_account_balance(&capital, None).await.unwrap(), dec(0));
    for reconciliation in ledger.reconcile_all().await.unwrap() {
        assert!(reconciliation.is_consistent, "{:?}", reconciliation);
    }
}

#[tokio::test]
async fn test_reconciliation_and_reversal() {
    let (_storage, mut ledger, _book, accounts) = setup().await;
    let cash = accounts["cash"].id.clone();
    let bank = accounts["bank"].id.clone();

    let investment = patterns::owner_investment(
        ymd(2025, 1, 1),
        cash.clone(),
        accounts["owners_capital"].id.clone(),
        dec(5000),
    )
    .unwrap();
    ledger.post_entry(investment).await.unwrap();

    let deposit = patterns::contra_transfer(ymd(2025, 1, 2), bank.clone(), cash.clone(), dec(2000))
        .unwrap();
    let deposit = ledger.post_entry(deposit).await.unwrap();
    assert_eq!(deposit.debit_account.current_balance, dec(2000));
    assert_eq!(deposit.credit_account.current_balance, dec(3000));

    let reversal = ledger
        .reverse_entry(&deposit.movement.id, ymd(2025, 1, 3), Some("Wrong branch".into()))
        .await
        .unwrap();
    assert_eq!(reversal.movement.reversal_of.as_deref(), Some(deposit.movement.id.as_str()));
    assert_eq!(ledger.get_account_balance(&bank, None).await.unwrap(), dec(0));
    assert_eq!(
        ledger.get_account_balance(&bank, Some(ymd(2025, 1, 2))).await.unwrap(),
        dec(2000)
    );

    let again = ledger
        .reverse_entry(&deposit.movement.id, ymd(2025, 1, 4), None)
        .await;
    assert!(matches!(again, Err(LedgerError::Validation(_))));

    for reconciliation in ledger.reconcile_all().await.unwrap() {
        assert!(reconciliation.is_consistent, "{:?}", reconciliation);
    }
    let integrity = ledger.validate_integrity(ymd(2025, 1, 31)).await.unwrap();
    assert!(integrity.is_valid, "{:?}", integrity.issues);
    assert_eq!(integrity.movement_count, 3);
}

#[tokio::test]
async fn test_enhanced_validation_requires_a_description() {
    let storage = MemoryStorage::new();
    let mut ledger = Ledger::with_validators(
        storage,
        Box::new(DefaultAccountValidator),
        Box::new(EnhancedTransactionValidator),
    );
    let accounts = ledger.setup_standard_chart_of_accounts().await.unwrap();

    let bare = JournalEntryRequest::new(
        ymd(2025, 2, 1),
        VoucherType::Journal,
        accounts["cash"].id.clone(),
        accounts["owners_capital"].id.clone(),
        dec(100),
    );
    let rejected = ledger.post_entry(bare.clone()).await;
    assert!(matches!(rejected, Err(LedgerError::Validation(_))));

    let described = bare.reference("CAP-001");
    assert!(ledger.post_entry(described).await.is_ok());
}

#[tokio::test]
async fn test_commerce_book_dues_and_payments() {
    let (_storage, _ledger, mut book, _accounts) = setup().await;
    book.register_counterparty(Counterparty::customer("c-1".into(), "Rahim Agro".into()))
        .await
        .unwrap();
    book.register_counterparty(Counterparty::supplier("s-1".into(), "Delta Motors".into()))
        .await
        .unwrap();

    let draft = DocumentDraft::new(
        "INV-10",
        "main",
        at(ymd(2025, 4, 5), 11),
        vec![LineDraft::new("tiller", dec(2))],
    )
    .counterparty("c-1")
    .adjustments(dec(100), dec(50))
    .paid(dec(500));
    let sale = book.record_sale(draft).await.unwrap();
    assert_eq!(sale.subtotal, dec(2000));
    assert_eq!(sale.grand_total, dec(2050));
    assert_eq!(sale.due_amount, dec(1550));
    assert_eq!(sale.status, PaymentStatus::Partial);
    assert_eq!(sale.items[0].unit_cost, Some(dec(600)));
    assert_eq!(book.get_counterparty("c-1").await.unwrap().due(), dec(1550));

    let overpaid = book.receive_sale_payment(&sale.id, &dec(2000)).await;
    assert!(matches!(overpaid, Err(LedgerError::Validation(_))));

    let settled = book.receive_sale_payment(&sale.id, &dec(1550)).await.unwrap();
    assert_eq!(settled.status, PaymentStatus::Completed);
    assert_eq!(book.get_counterparty("c-1").await.unwrap().due(), dec(0));

    // A supplier cannot be billed on a sale
    let wrong_party = DocumentDraft::new(
        "INV-11",
        "main",
        at(ymd(2025, 4, 6), 11),
        vec![LineDraft::new("tiller", dec(1))],
    )
    .counterparty("s-1");
    assert!(matches!(
        book.record_sale(wrong_party).await,
        Err(LedgerError::Validation(_))
    ));

    let purchase = DocumentDraft::new(
        "PO-7",
        "main",
        at(ymd(2025, 4, 7), 9),
        vec![LineDraft::new("tiller", dec(5))],
    )
    .counterparty("s-1");
    let purchase = book.record_purchase(purchase).await.unwrap();
    assert_eq!(purchase.grand_total, dec(3000));
    assert_eq!(book.get_counterparty("s-1").await.unwrap().due(), dec(3000));

    let purchase = book.pay_purchase(&purchase.id, &dec(1000)).await.unwrap();
    assert_eq!(purchase.status, PaymentStatus::Partial);
    let purchase = book.cancel_purchase(&purchase.id).await.unwrap();
    assert_eq!(purchase.status, PaymentStatus::Cancelled);
    assert_eq!(book.get_counterparty("s-1").await.unwrap().due(), dec(0));

    let advance = book.record_advance("c-1", &dec(300)).await.unwrap();
    assert_eq!(advance.advance(), dec(300));

    let unknown = DocumentDraft::new(
        "INV-12",
        "main",
        at(ymd(2025, 4, 8), 9),
        vec![LineDraft::new("harvester", dec(1))],
    );
    assert!(matches!(
        book.record_sale(unknown).await,
        Err(LedgerError::ProductNotFound(_))
    ));
}

#[tokio::test]
async fn test_chart_hierarchy() {
    let (_storage, mut ledger, _book, accounts) = setup().await;
    let salaries = &accounts["salary_expense"];

    let drivers = ledger
        .create_account(
            AccountHead::new("6021".into(), "Driver Wages".into(), AccountType::Expense)
                .with_parent(salaries.id.clone()),
        )
        .await
        .unwrap();

    let path = ledger.chart().get_account_path(&drivers.id).await.unwrap();
    let codes: Vec<&str> = path.iter().map(|a| a.code.as_str()).collect();
    assert_eq!(codes, vec!["6020", "6021"]);

    let children = ledger.chart().get_child_accounts(&salaries.id).await.unwrap();
    assert_eq!(children.len(), 1);

    let mut looped = salaries.clone();
    looped.parent_id = Some(drivers.id.clone());
    assert!(matches!(
        ledger.update_account(&looped).await,
        Err(LedgerError::Validation(_))
    ));

    // Leaf heads without movements can be removed; system heads cannot
    ledger.delete_account(&drivers.id).await.unwrap();
    assert!(ledger.delete_account(&salaries.id).await.is_err());
}
