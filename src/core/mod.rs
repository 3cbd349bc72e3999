pub mod anomaly;
pub mod error;
pub mod ledger;
pub mod money;
pub mod ownership;
pub mod period;
pub mod rent;

// Flat public surface for domain types and functions.
pub use anomaly::Anomaly;
pub use error::EngineError;
pub use ledger::{
    build_report, ownership_anomalies, Contract, ExpenseAttribution, ExpenseRecord,
    ExpenseStatus, FailurePolicy, LedgerInput, OwnerReport, OwnerReportItem, ReportRequest, Unit,
};
pub use money::{normalize, Currency, MonetaryRecord};
pub use ownership::{check_shares, distribute, OwnershipCheck, OwnershipMap, OwnershipShare};
pub use period::{BillingPeriod, ReportPeriod};
pub use rent::{
    distribute_lump_sum, find_active_obligation, monthly_balance, obligation_anomalies, paid_months,
    require_active_obligation, tenant_account, AllocationPlan, MonthlyBalance, ObligationLookup,
    PaymentRecord, PaymentStatus, RentObligation, TenantAccount,
};
