//! Top-up rule service
//!
//! Rules describe a government credit and which holders are eligible for
//! it. Executing a rule credits every active account whose holder matches
//! and records the run as a batch execution.

use chrono::{NaiveDate, Utc};
use edufund_core::{
    models::{
        BatchExecution, BatchJobType, BatchOutcome, EducationLevel, ResidentialStatus,
        SchoolingStatus, TopUpRule, TopUpRuleStatus,
    },
    traits::{
        BatchExecutionRepository, EducationAccountRepository, PaginatedResponse, Pagination,
        TopUpEntry, TopUpRuleRepository, TransactionRepository,
    },
    AppError, AppResult,
};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

/// Partial update of a scheduled rule
///
/// Eligibility fields use `Some(None)` to clear a criterion.
#[derive(Debug, Clone, Default)]
pub struct TopUpRuleChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub amount: Option<Decimal>,
    pub min_age: Option<Option<u32>>,
    pub max_age: Option<Option<u32>>,
    pub residential_status: Option<Option<ResidentialStatus>>,
    pub schooling_status: Option<Option<SchoolingStatus>>,
    pub education_level: Option<Option<EducationLevel>>,
    pub scheduled_date: Option<NaiveDate>,
}

impl TopUpRuleChanges {
    fn apply(self, rule: &mut TopUpRule) {
        if let Some(name) = self.name {
            rule.name = name.trim().to_string();
        }
        if let Some(description) = self.description {
            rule.description = Some(description).filter(|d| !d.trim().is_empty());
        }
        if let Some(amount) = self.amount {
            rule.amount = amount;
        }
        if let Some(min_age) = self.min_age {
            rule.min_age = min_age;
        }
        if let Some(max_age) = self.max_age {
            rule.max_age = max_age;
        }
        if let Some(status) = self.residential_status {
            rule.residential_status = status;
        }
        if let Some(status) = self.schooling_status {
            rule.schooling_status = status;
        }
        if let Some(level) = self.education_level {
            rule.education_level = level;
        }
        if let Some(date) = self.scheduled_date {
            rule.scheduled_date = date;
        }
    }
}

/// Top-up rule management and execution
pub struct TopUpService {
    rules: Arc<dyn TopUpRuleRepository>,
    accounts: Arc<dyn EducationAccountRepository>,
    transactions: Arc<dyn TransactionRepository>,
    batches: Arc<dyn BatchExecutionRepository>,
}

impl TopUpService {
    pub fn new(
        rules: Arc<dyn TopUpRuleRepository>,
        accounts: Arc<dyn EducationAccountRepository>,
        transactions: Arc<dyn TransactionRepository>,
        batches: Arc<dyn BatchExecutionRepository>,
    ) -> Self {
        Self {
            rules,
            accounts,
            transactions,
            batches,
        }
    }

    pub async fn list(
        &self,
        status: Option<TopUpRuleStatus>,
        pagination: Pagination,
    ) -> AppResult<PaginatedResponse<TopUpRule>> {
        let (rules, total) = self
            .rules
            .list_filtered(status, pagination.limit(), pagination.offset())
            .await?;
        Ok(PaginatedResponse::new(rules, total, pagination))
    }

    pub async fn get(&self, id: i32) -> AppResult<TopUpRule> {
        self.rules
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::TopUpRuleNotFound(id.to_string()))
    }

    #[instrument(skip(self, rule), fields(name = %rule.name))]
    pub async fn create(&self, mut rule: TopUpRule, created_by: &str) -> AppResult<TopUpRule> {
        rule.name = rule.name.trim().to_string();
        if rule.name.is_empty() {
            return Err(AppError::MissingField("name".to_string()));
        }
        rule.validate()?;
        rule.status = TopUpRuleStatus::Scheduled;
        rule.executed_at = None;
        rule.created_by = created_by.to_string();

        let created = self.rules.create(&rule).await?;
        info!(
            rule_id = created.id,
            scheduled_date = %created.scheduled_date,
            "Top-up rule scheduled"
        );
        Ok(created)
    }

    /// Edit a rule that has not run yet
    #[instrument(skip(self, changes))]
    pub async fn update(&self, id: i32, changes: TopUpRuleChanges) -> AppResult<TopUpRule> {
        let mut rule = self.get(id).await?;
        if rule.status != TopUpRuleStatus::Scheduled {
            return Err(AppError::Conflict(format!(
                "Top-up rule {} is {} and can no longer be edited",
                id, rule.status
            )));
        }

        changes.apply(&mut rule);
        if rule.name.is_empty() {
            return Err(AppError::MissingField("name".to_string()));
        }
        rule.validate()?;

        self.rules.update(&rule).await
    }

    #[instrument(skip(self))]
    pub async fn cancel(&self, id: i32) -> AppResult<TopUpRule> {
        let rule = self.get(id).await?;
        if !rule.status.can_transition_to(TopUpRuleStatus::Cancelled) {
            return Err(AppError::transition(
                "top-up rule",
                rule.status,
                TopUpRuleStatus::Cancelled,
            ));
        }

        let cancelled = self
            .rules
            .set_status(id, TopUpRuleStatus::Scheduled, TopUpRuleStatus::Cancelled, None)
            .await?
            .ok_or_else(|| {
                AppError::transition("top-up rule", rule.status, TopUpRuleStatus::Cancelled)
            })?;

        info!(rule_id = id, "Top-up rule cancelled");
        Ok(cancelled)
    }

    /// Execute a scheduled rule now
    ///
    /// The rule is claimed (marked executed) before any account is credited,
    /// so two concurrent executions cannot both pay out. A failed credit run
    /// releases the claim and the rule can be executed again.
    #[instrument(skip(self))]
    pub async fn execute(
        &self,
        rule_id: i32,
        today: NaiveDate,
        triggered_by: &str,
    ) -> AppResult<BatchExecution> {
        let rule = self.get(rule_id).await?;
        if !rule.status.can_transition_to(TopUpRuleStatus::Executed) {
            return Err(AppError::transition(
                "top-up rule",
                rule.status,
                TopUpRuleStatus::Executed,
            ));
        }

        let rule = self
            .rules
            .set_status(
                rule_id,
                TopUpRuleStatus::Scheduled,
                TopUpRuleStatus::Executed,
                Some(Utc::now()),
            )
            .await?
            .ok_or_else(|| {
                AppError::transition("top-up rule", rule.status, TopUpRuleStatus::Executed)
            })?;

        let run = self
            .batches
            .start(BatchJobType::TopUp, Some(rule.id.to_string()), triggered_by)
            .await?;

        let outcome = match self.credit_eligible(&rule, today, triggered_by).await {
            Ok((processed, affected)) => {
                info!(
                    rule_id = rule.id,
                    processed,
                    affected,
                    amount = %rule.amount,
                    "Top-up rule executed"
                );
                BatchOutcome::succeeded(processed, affected)
            }
            Err(e) => {
                error!(rule_id = rule.id, "Top-up rule execution failed: {}", e);
                match self.rules.release(rule.id).await {
                    Ok(Some(_)) => info!(rule_id = rule.id, "Top-up rule returned to scheduled"),
                    Ok(None) => warn!(rule_id = rule.id, "Top-up rule was no longer executed"),
                    Err(release_err) => error!(
                        rule_id = rule.id,
                        "Failed to release top-up rule: {}", release_err
                    ),
                }
                BatchOutcome::failed(0, e.to_string())
            }
        };

        self.batches.finish(run.id, &outcome).await
    }

    /// Execute every scheduled rule whose date has arrived
    ///
    /// A failing rule is logged and the remaining rules still run.
    #[instrument(skip(self))]
    pub async fn run_due(&self, today: NaiveDate, triggered_by: &str) -> AppResult<Vec<BatchExecution>> {
        let due = self.rules.find_due(today).await?;
        let mut runs = Vec::with_capacity(due.len());

        for rule in due {
            match self.execute(rule.id, today, triggered_by).await {
                Ok(run) => runs.push(run),
                Err(e) => warn!(rule_id = rule.id, "Skipping due top-up rule: {}", e),
            }
        }

        Ok(runs)
    }

    async fn credit_eligible(
        &self,
        rule: &TopUpRule,
        today: NaiveDate,
        performed_by: &str,
    ) -> AppResult<(usize, usize)> {
        let active = self.accounts.list_active_with_holders().await?;
        let entries: Vec<TopUpEntry> = active
            .iter()
            .filter(|a| rule.matches(&a.holder, today))
            .map(|a| TopUpEntry {
                account_id: a.account.id,
                amount: rule.amount,
                topup_rule_id: Some(rule.id),
                description: Some(rule.name.clone()),
                performed_by: performed_by.to_string(),
            })
            .collect();

        if entries.is_empty() {
            return Ok((active.len(), 0));
        }

        let credited = self.transactions.record_top_ups(&entries).await?;
        Ok((active.len(), credited.len()))
    }
}
