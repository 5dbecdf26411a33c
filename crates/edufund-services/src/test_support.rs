//! In-memory repositories for service tests
//!
//! One `MemoryStore` implements every repository trait over plain vectors
//! behind a `parking_lot::Mutex`. Multi-row writes apply all-or-nothing,
//! like the PostgreSQL transactions they stand in for.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use edufund_core::models::{
    AccountHolder, AccountHolderListItem, AccountStatus, AccountWithHolder, BatchExecution,
    BatchJobType, BatchOutcome, BatchStatus, ClosureReason, Course, EducationAccount, Enrollment,
    EnrollmentDetail, EnrollmentStatus, Invoice, InvoiceStatus, PaymentMethod, TopUpRule,
    TopUpRuleStatus, Transaction, TransactionKind,
};
use edufund_core::query::{
    AccountHolderQuery, BatchExecutionQuery, CourseQuery, HolderSortField, InvoiceQuery,
    SortDirection, TransactionQuery,
};
use edufund_core::traits::{
    AccountHolderRepository, AccountSummary, BatchExecutionRepository, CourseRepository,
    EducationAccountRepository, EnrollmentRepository, InvoiceRepository, OutstandingSummary,
    PaymentEntry, Repository, TopUpEntry, TopUpRuleRepository, TransactionRepository,
};
use edufund_core::{AppError, AppResult};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::sync::Arc;

#[derive(Default)]
struct State {
    next_id: i64,
    holders: Vec<AccountHolder>,
    accounts: Vec<EducationAccount>,
    courses: Vec<Course>,
    enrollments: Vec<Enrollment>,
    invoices: Vec<Invoice>,
    transactions: Vec<Transaction>,
    rules: Vec<TopUpRule>,
    batches: Vec<BatchExecution>,
}

impl State {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn account_mut(&mut self, id: i32) -> Option<&mut EducationAccount> {
        self.accounts.iter_mut().find(|a| a.id == id)
    }
}

fn page<T: Clone>(items: &[T], limit: i64, offset: i64) -> Vec<T> {
    items
        .iter()
        .skip(offset.max(0) as usize)
        .take(limit.max(0) as usize)
        .cloned()
        .collect()
}

#[derive(Default)]
pub(crate) struct MemoryStore {
    state: Mutex<State>,
    /// Fail the next `record_top_ups` call
    pub fail_top_ups: Mutex<bool>,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn seed_holder(&self, nric: &str, full_name: &str, dob: NaiveDate) -> (AccountHolder, EducationAccount) {
        let mut state = self.state.lock();
        let holder_id = state.next_id() as i32;
        let holder = AccountHolder {
            id: holder_id,
            nric: nric.to_string(),
            full_name: full_name.to_string(),
            date_of_birth: dob,
            ..Default::default()
        };
        let account_id = state.next_id() as i32;
        let account = EducationAccount {
            id: account_id,
            account_number: EducationAccount::format_number("EA", account_id),
            holder_id,
            ..Default::default()
        };
        state.holders.push(holder.clone());
        state.accounts.push(account.clone());
        (holder, account)
    }

    pub fn seed_course(&self, code: &str, fee: Decimal) -> Course {
        let mut state = self.state.lock();
        let today = Utc::now().date_naive();
        let course = Course {
            id: state.next_id() as i32,
            course_code: code.to_string(),
            name: format!("{} course", code),
            provider: "Polytechnic".to_string(),
            fee,
            start_date: today,
            end_date: today + chrono::Duration::days(90),
            ..Default::default()
        };
        state.courses.push(course.clone());
        course
    }

    pub fn set_balance(&self, account_id: i32, balance: Decimal) {
        if let Some(account) = self.state.lock().account_mut(account_id) {
            account.balance = balance;
        }
    }

    pub fn update_holder(&self, holder: AccountHolder) {
        let mut state = self.state.lock();
        if let Some(slot) = state.holders.iter_mut().find(|h| h.id == holder.id) {
            *slot = holder;
        }
    }

    pub fn update_course(&self, course: Course) {
        let mut state = self.state.lock();
        if let Some(slot) = state.courses.iter_mut().find(|c| c.id == course.id) {
            *slot = course;
        }
    }

    pub fn account(&self, id: i32) -> EducationAccount {
        self.state
            .lock()
            .accounts
            .iter()
            .find(|a| a.id == id)
            .cloned()
            .expect("account seeded")
    }

    pub fn invoice(&self, id: i32) -> Invoice {
        self.state
            .lock()
            .invoices
            .iter()
            .find(|i| i.id == id)
            .cloned()
            .expect("invoice exists")
    }

    pub fn transactions(&self) -> Vec<Transaction> {
        self.state.lock().transactions.clone()
    }
}

#[async_trait]
impl AccountHolderRepository for MemoryStore {
    async fn find_by_id(&self, id: i32) -> AppResult<Option<AccountHolder>> {
        Ok(self.state.lock().holders.iter().find(|h| h.id == id).cloned())
    }

    async fn find_by_nric(&self, nric: &str) -> AppResult<Option<AccountHolder>> {
        Ok(self
            .state
            .lock()
            .holders
            .iter()
            .find(|h| h.nric == nric)
            .cloned())
    }

    async fn search(&self, query: &AccountHolderQuery) -> AppResult<(Vec<AccountHolderListItem>, i64)> {
        let state = self.state.lock();
        let filter = &query.filter;
        let term = filter.search_term().map(str::to_lowercase);

        let mut items: Vec<AccountHolderListItem> = state
            .holders
            .iter()
            .map(|holder| {
                let account = state.accounts.iter().find(|a| a.holder_id == holder.id);
                AccountHolderListItem {
                    holder: holder.clone(),
                    account_id: account.map(|a| a.id),
                    account_number: account.map(|a| a.account_number.clone()),
                    account_status: account.map(|a| a.status),
                    balance: account.map(|a| a.balance),
                }
            })
            .filter(|item| {
                let h = &item.holder;
                let age = h.age_on(query.today);
                term.as_ref().map_or(true, |t| {
                    h.full_name.to_lowercase().contains(t) || h.nric.to_lowercase().contains(t)
                }) && filter
                    .residential_status
                    .map_or(true, |s| s == h.residential_status)
                    && filter.schooling_status.map_or(true, |s| s == h.schooling_status)
                    && filter.education_level.map_or(true, |l| l == h.education_level)
                    && filter
                        .account_status
                        .map_or(true, |s| item.account_status == Some(s))
                    && filter.min_age.map_or(true, |min| age >= min)
                    && filter.max_age.map_or(true, |max| age <= max)
                    && filter
                        .min_balance
                        .map_or(true, |min| item.balance.is_some_and(|b| b >= min))
                    && filter
                        .max_balance
                        .map_or(true, |max| item.balance.is_some_and(|b| b <= max))
            })
            .collect();

        items.sort_by(|a, b| {
            let ordering = match query.sort_by {
                HolderSortField::FullName => a.holder.full_name.cmp(&b.holder.full_name),
                HolderSortField::Nric => a.holder.nric.cmp(&b.holder.nric),
                HolderSortField::Age => b.holder.date_of_birth.cmp(&a.holder.date_of_birth),
                HolderSortField::Balance => a.balance.cmp(&b.balance),
                HolderSortField::CreatedAt => a.holder.created_at.cmp(&b.holder.created_at),
            };
            let ordering = match query.direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            };
            ordering.then(a.holder.id.cmp(&b.holder.id))
        });

        let total = items.len() as i64;
        Ok((
            page(&items, query.pagination.limit(), query.pagination.offset()),
            total,
        ))
    }

    async fn create_with_account(
        &self,
        holder: &AccountHolder,
        account_prefix: &str,
    ) -> AppResult<(AccountHolder, EducationAccount)> {
        let mut state = self.state.lock();
        if state.holders.iter().any(|h| h.nric == holder.nric) {
            return Err(AppError::AlreadyExists(holder.nric.clone()));
        }
        let mut created = holder.clone();
        created.id = state.next_id() as i32;
        let account_id = state.next_id() as i32;
        let account = EducationAccount {
            id: account_id,
            account_number: EducationAccount::format_number(account_prefix, account_id),
            holder_id: created.id,
            ..Default::default()
        };
        state.holders.push(created.clone());
        state.accounts.push(account.clone());
        Ok((created, account))
    }

    async fn update(&self, holder: &AccountHolder) -> AppResult<AccountHolder> {
        let mut state = self.state.lock();
        let slot = state
            .holders
            .iter_mut()
            .find(|h| h.id == holder.id)
            .ok_or_else(|| AppError::AccountHolderNotFound(holder.id.to_string()))?;
        let password_hash = slot.password_hash.clone();
        *slot = holder.clone();
        slot.password_hash = password_hash;
        slot.updated_at = Utc::now();
        Ok(slot.clone())
    }

    async fn update_password(&self, id: i32, password_hash: Option<&str>) -> AppResult<bool> {
        let mut state = self.state.lock();
        Ok(match state.holders.iter_mut().find(|h| h.id == id) {
            Some(holder) => {
                holder.password_hash = password_hash.map(str::to_string);
                true
            }
            None => false,
        })
    }

    async fn count(&self) -> AppResult<i64> {
        Ok(self.state.lock().holders.len() as i64)
    }
}

#[async_trait]
impl EducationAccountRepository for MemoryStore {
    async fn find_by_id(&self, id: i32) -> AppResult<Option<EducationAccount>> {
        Ok(self.state.lock().accounts.iter().find(|a| a.id == id).cloned())
    }

    async fn find_by_holder(&self, holder_id: i32) -> AppResult<Option<EducationAccount>> {
        Ok(self
            .state
            .lock()
            .accounts
            .iter()
            .find(|a| a.holder_id == holder_id)
            .cloned())
    }

    async fn find_by_number(&self, account_number: &str) -> AppResult<Option<EducationAccount>> {
        Ok(self
            .state
            .lock()
            .accounts
            .iter()
            .find(|a| a.account_number == account_number)
            .cloned())
    }

    async fn list(
        &self,
        status: Option<AccountStatus>,
        limit: i64,
        offset: i64,
    ) -> AppResult<(Vec<EducationAccount>, i64)> {
        let state = self.state.lock();
        let matching: Vec<EducationAccount> = state
            .accounts
            .iter()
            .filter(|a| status.map_or(true, |s| a.status == s))
            .cloned()
            .collect();
        Ok((page(&matching, limit, offset), matching.len() as i64))
    }

    async fn list_active_with_holders(&self) -> AppResult<Vec<AccountWithHolder>> {
        let state = self.state.lock();
        Ok(state
            .accounts
            .iter()
            .filter(|a| a.status == AccountStatus::Active)
            .filter_map(|a| {
                state
                    .holders
                    .iter()
                    .find(|h| h.id == a.holder_id)
                    .map(|h| AccountWithHolder {
                        account: a.clone(),
                        holder: h.clone(),
                    })
            })
            .collect())
    }

    async fn close(
        &self,
        id: i32,
        reason: ClosureReason,
        at: chrono::DateTime<Utc>,
    ) -> AppResult<Option<EducationAccount>> {
        let mut state = self.state.lock();
        Ok(match state.account_mut(id) {
            Some(account) if account.status == AccountStatus::Active => {
                account.status = AccountStatus::Closed;
                account.closure_reason = Some(reason);
                account.closed_at = Some(at);
                Some(account.clone())
            }
            _ => None,
        })
    }

    async fn close_many(
        &self,
        ids: &[i32],
        reason: ClosureReason,
        at: chrono::DateTime<Utc>,
    ) -> AppResult<u64> {
        let mut closed = 0;
        for id in ids {
            if EducationAccountRepository::close(self, *id, reason, at)
                .await?
                .is_some()
            {
                closed += 1;
            }
        }
        Ok(closed)
    }

    async fn reopen(&self, id: i32) -> AppResult<Option<EducationAccount>> {
        let mut state = self.state.lock();
        Ok(match state.account_mut(id) {
            Some(account) if account.status == AccountStatus::Closed => {
                account.status = AccountStatus::Active;
                account.closure_reason = None;
                account.closed_at = None;
                Some(account.clone())
            }
            _ => None,
        })
    }

    async fn summary(&self) -> AppResult<AccountSummary> {
        let state = self.state.lock();
        Ok(AccountSummary {
            active: state
                .accounts
                .iter()
                .filter(|a| a.status == AccountStatus::Active)
                .count() as i64,
            closed: state
                .accounts
                .iter()
                .filter(|a| a.status == AccountStatus::Closed)
                .count() as i64,
            total_balance: state
                .accounts
                .iter()
                .filter(|a| a.status == AccountStatus::Active)
                .map(|a| a.balance)
                .sum(),
        })
    }
}

#[async_trait]
impl TransactionRepository for MemoryStore {
    async fn find_by_id(&self, id: i64) -> AppResult<Option<Transaction>> {
        Ok(self
            .state
            .lock()
            .transactions
            .iter()
            .find(|t| t.id == id)
            .cloned())
    }

    async fn list(&self, query: &TransactionQuery) -> AppResult<(Vec<Transaction>, i64)> {
        let state = self.state.lock();
        let mut matching: Vec<Transaction> = state
            .transactions
            .iter()
            .filter(|t| query.account_id.map_or(true, |id| t.account_id == id))
            .filter(|t| query.kind.map_or(true, |k| t.kind == k))
            .filter(|t| query.status.map_or(true, |s| t.status == s))
            .cloned()
            .collect();
        matching.reverse();
        Ok((
            page(&matching, query.pagination.limit(), query.pagination.offset()),
            matching.len() as i64,
        ))
    }

    async fn record_top_ups(&self, entries: &[TopUpEntry]) -> AppResult<Vec<Transaction>> {
        if std::mem::take(&mut *self.fail_top_ups.lock()) {
            return Err(AppError::Database("connection reset".to_string()));
        }
        let mut state = self.state.lock();
        let mut recorded = Vec::new();
        for entry in entries {
            let Some(account) = state.account_mut(entry.account_id) else {
                continue;
            };
            if account.status != AccountStatus::Active {
                continue;
            }
            account.balance += entry.amount;
            let balance = account.balance;

            let mut txn = Transaction::completed(
                entry.account_id,
                TransactionKind::TopUp,
                entry.amount,
                &entry.performed_by,
            );
            txn.id = state.next_id();
            txn.balance_after = Some(balance);
            txn.topup_rule_id = entry.topup_rule_id;
            txn.description = entry.description.clone();
            state.transactions.push(txn.clone());
            recorded.push(txn);
        }
        Ok(recorded)
    }
}

#[async_trait]
impl InvoiceRepository for MemoryStore {
    async fn find_by_id(&self, id: i32) -> AppResult<Option<Invoice>> {
        Ok(self.state.lock().invoices.iter().find(|i| i.id == id).cloned())
    }

    async fn list(&self, query: &InvoiceQuery) -> AppResult<(Vec<Invoice>, i64)> {
        let state = self.state.lock();
        let matching: Vec<Invoice> = state
            .invoices
            .iter()
            .filter(|i| query.holder_id.map_or(true, |id| i.holder_id == id))
            .filter(|i| query.enrollment_id.map_or(true, |id| i.enrollment_id == id))
            .filter(|i| query.status.map_or(true, |s| i.status == s))
            .filter(|i| query.due_before.map_or(true, |d| i.due_date < d))
            .cloned()
            .collect();
        Ok((
            page(&matching, query.pagination.limit(), query.pagination.offset()),
            matching.len() as i64,
        ))
    }

    async fn transition(
        &self,
        id: i32,
        from: InvoiceStatus,
        to: InvoiceStatus,
    ) -> AppResult<Option<Invoice>> {
        from.ensure_transition(to)?;
        let mut state = self.state.lock();
        Ok(match state.invoices.iter_mut().find(|i| i.id == id) {
            Some(invoice) if invoice.status == from => {
                invoice.status = to;
                Some(invoice.clone())
            }
            _ => None,
        })
    }

    async fn pay(&self, payment: &PaymentEntry) -> AppResult<(Invoice, Vec<Transaction>)> {
        let mut state = self.state.lock();
        let invoice = state
            .invoices
            .iter()
            .find(|i| i.id == payment.invoice_id)
            .cloned()
            .ok_or_else(|| AppError::InvoiceNotFound(payment.invoice_id.to_string()))?;
        invoice.status.ensure_transition(InvoiceStatus::Paid)?;
        payment.split.validate_for(invoice.amount)?;

        let account = state
            .account_mut(payment.account_id)
            .ok_or_else(|| AppError::EducationAccountNotFound(payment.account_id.to_string()))?;
        if !account.can_transact() {
            return Err(AppError::AccountClosed(account.account_number.clone()));
        }
        if !account.covers(payment.split.balance_amount) {
            return Err(AppError::InsufficientBalance {
                required: payment.split.balance_amount.to_string(),
                available: account.balance.to_string(),
            });
        }
        account.balance -= payment.split.balance_amount;
        let balance = account.balance;

        let mut transactions = Vec::new();
        if payment.split.balance_amount > Decimal::ZERO {
            let mut txn = Transaction::completed(
                payment.account_id,
                TransactionKind::CoursePayment,
                payment.split.balance_amount,
                &payment.performed_by,
            );
            txn.balance_after = Some(balance);
            txn.payment_method = Some(PaymentMethod::AccountBalance);
            txn.invoice_id = Some(invoice.id);
            transactions.push(txn);
        }
        if payment.split.external_amount > Decimal::ZERO {
            let mut txn = Transaction::completed(
                payment.account_id,
                TransactionKind::ExternalPayment,
                payment.split.external_amount,
                &payment.performed_by,
            );
            txn.payment_method = payment.split.external_method;
            txn.invoice_id = Some(invoice.id);
            transactions.push(txn);
        }
        for txn in &mut transactions {
            txn.id = state.next_id();
            state.transactions.push(txn.clone());
        }

        let slot = state
            .invoices
            .iter_mut()
            .find(|i| i.id == invoice.id)
            .ok_or_else(|| AppError::InvoiceNotFound(invoice.id.to_string()))?;
        slot.status = InvoiceStatus::Paid;
        slot.paid_at = Some(Utc::now());
        Ok((slot.clone(), transactions))
    }

    async fn outstanding_summary(&self, holder_id: Option<i32>) -> AppResult<OutstandingSummary> {
        let state = self.state.lock();
        let outstanding: Vec<&Invoice> = state
            .invoices
            .iter()
            .filter(|i| i.status == InvoiceStatus::Outstanding)
            .filter(|i| holder_id.map_or(true, |id| i.holder_id == id))
            .collect();
        Ok(OutstandingSummary {
            count: outstanding.len() as i64,
            amount: outstanding.iter().map(|i| i.amount).sum(),
        })
    }
}

#[async_trait]
impl EnrollmentRepository for MemoryStore {
    async fn find_by_id(&self, id: i32) -> AppResult<Option<Enrollment>> {
        Ok(self
            .state
            .lock()
            .enrollments
            .iter()
            .find(|e| e.id == id)
            .cloned())
    }

    async fn list_by_holder(&self, holder_id: i32) -> AppResult<Vec<EnrollmentDetail>> {
        let state = self.state.lock();
        Ok(state
            .enrollments
            .iter()
            .filter(|e| e.holder_id == holder_id)
            .filter_map(|e| {
                state
                    .courses
                    .iter()
                    .find(|c| c.id == e.course_id)
                    .map(|c| EnrollmentDetail {
                        enrollment: e.clone(),
                        course_code: c.course_code.clone(),
                        course_name: c.name.clone(),
                        provider: c.provider.clone(),
                        fee: c.fee,
                        start_date: c.start_date,
                        end_date: c.end_date,
                    })
            })
            .collect())
    }

    async fn find_active(&self, holder_id: i32, course_id: i32) -> AppResult<Option<Enrollment>> {
        Ok(self
            .state
            .lock()
            .enrollments
            .iter()
            .find(|e| {
                e.holder_id == holder_id
                    && e.course_id == course_id
                    && e.status == EnrollmentStatus::Active
            })
            .cloned())
    }

    async fn enroll(
        &self,
        enrollment: &Enrollment,
        invoice: &Invoice,
        invoice_prefix: &str,
    ) -> AppResult<(Enrollment, Invoice)> {
        let mut state = self.state.lock();
        if state.enrollments.iter().any(|e| {
            e.holder_id == enrollment.holder_id
                && e.course_id == enrollment.course_id
                && e.status == EnrollmentStatus::Active
        }) {
            return Err(AppError::AlreadyEnrolled(enrollment.holder_id.to_string()));
        }
        let mut created = enrollment.clone();
        created.id = state.next_id() as i32;
        let mut issued = invoice.clone();
        issued.id = state.next_id() as i32;
        issued.enrollment_id = created.id;
        issued.invoice_number =
            Invoice::format_number(invoice_prefix, issued.created_at.date_naive(), issued.id);
        state.enrollments.push(created.clone());
        state.invoices.push(issued.clone());
        Ok((created, issued))
    }

    async fn set_status(
        &self,
        id: i32,
        from: EnrollmentStatus,
        to: EnrollmentStatus,
    ) -> AppResult<Option<Enrollment>> {
        if !from.can_transition_to(to) {
            return Err(AppError::transition("enrollment", from, to));
        }
        let mut state = self.state.lock();
        let updated = match state.enrollments.iter_mut().find(|e| e.id == id) {
            Some(enrollment) if enrollment.status == from => {
                enrollment.status = to;
                enrollment.clone()
            }
            _ => return Ok(None),
        };
        if to == EnrollmentStatus::Withdrawn {
            for invoice in state
                .invoices
                .iter_mut()
                .filter(|i| i.enrollment_id == id && i.status == InvoiceStatus::Outstanding)
            {
                invoice.status = InvoiceStatus::Cancelled;
            }
        }
        Ok(Some(updated))
    }

    async fn count_active_by_course(&self, course_id: i32) -> AppResult<i64> {
        Ok(self
            .state
            .lock()
            .enrollments
            .iter()
            .filter(|e| e.course_id == course_id && e.status == EnrollmentStatus::Active)
            .count() as i64)
    }
}

#[async_trait]
impl Repository<Course, i32> for MemoryStore {
    async fn find_by_id(&self, id: i32) -> AppResult<Option<Course>> {
        Ok(self.state.lock().courses.iter().find(|c| c.id == id).cloned())
    }

    async fn find_all(&self, limit: i64, offset: i64) -> AppResult<Vec<Course>> {
        Ok(page(&self.state.lock().courses, limit, offset))
    }

    async fn count(&self) -> AppResult<i64> {
        Ok(self.state.lock().courses.len() as i64)
    }

    async fn create(&self, entity: &Course) -> AppResult<Course> {
        let mut state = self.state.lock();
        if state
            .courses
            .iter()
            .any(|c| c.course_code == entity.course_code)
        {
            return Err(AppError::AlreadyExists(entity.course_code.clone()));
        }
        let mut created = entity.clone();
        created.id = state.next_id() as i32;
        state.courses.push(created.clone());
        Ok(created)
    }

    async fn update(&self, entity: &Course) -> AppResult<Course> {
        let mut state = self.state.lock();
        let slot = state
            .courses
            .iter_mut()
            .find(|c| c.id == entity.id)
            .ok_or_else(|| AppError::CourseNotFound(entity.id.to_string()))?;
        *slot = entity.clone();
        Ok(slot.clone())
    }

    async fn delete(&self, id: i32) -> AppResult<bool> {
        let mut state = self.state.lock();
        let before = state.courses.len();
        state.courses.retain(|c| c.id != id);
        Ok(state.courses.len() < before)
    }
}

#[async_trait]
impl CourseRepository for MemoryStore {
    async fn find_by_code(&self, course_code: &str) -> AppResult<Option<Course>> {
        Ok(self
            .state
            .lock()
            .courses
            .iter()
            .find(|c| c.course_code == course_code)
            .cloned())
    }

    async fn list_filtered(&self, query: &CourseQuery) -> AppResult<(Vec<Course>, i64)> {
        let state = self.state.lock();
        let matching: Vec<Course> = state
            .courses
            .iter()
            .filter(|c| query.status.map_or(true, |s| c.status == s))
            .filter(|c| query.provider.as_ref().map_or(true, |p| &c.provider == p))
            .cloned()
            .collect();
        Ok((
            page(&matching, query.pagination.limit(), query.pagination.offset()),
            matching.len() as i64,
        ))
    }
}

#[async_trait]
impl Repository<TopUpRule, i32> for MemoryStore {
    async fn find_by_id(&self, id: i32) -> AppResult<Option<TopUpRule>> {
        Ok(self.state.lock().rules.iter().find(|r| r.id == id).cloned())
    }

    async fn find_all(&self, limit: i64, offset: i64) -> AppResult<Vec<TopUpRule>> {
        Ok(page(&self.state.lock().rules, limit, offset))
    }

    async fn count(&self) -> AppResult<i64> {
        Ok(self.state.lock().rules.len() as i64)
    }

    async fn create(&self, entity: &TopUpRule) -> AppResult<TopUpRule> {
        let mut state = self.state.lock();
        let mut created = entity.clone();
        created.id = state.next_id() as i32;
        created.status = TopUpRuleStatus::Scheduled;
        state.rules.push(created.clone());
        Ok(created)
    }

    async fn update(&self, entity: &TopUpRule) -> AppResult<TopUpRule> {
        let mut state = self.state.lock();
        let slot = state
            .rules
            .iter_mut()
            .find(|r| r.id == entity.id && r.status == TopUpRuleStatus::Scheduled)
            .ok_or_else(|| AppError::Conflict(format!("Top-up rule {} is not scheduled", entity.id)))?;
        *slot = entity.clone();
        Ok(slot.clone())
    }

    async fn delete(&self, id: i32) -> AppResult<bool> {
        let mut state = self.state.lock();
        let before = state.rules.len();
        state
            .rules
            .retain(|r| r.id != id || r.status != TopUpRuleStatus::Scheduled);
        Ok(state.rules.len() < before)
    }
}

#[async_trait]
impl TopUpRuleRepository for MemoryStore {
    async fn find_due(&self, today: NaiveDate) -> AppResult<Vec<TopUpRule>> {
        Ok(self
            .state
            .lock()
            .rules
            .iter()
            .filter(|r| r.is_due(today))
            .cloned()
            .collect())
    }

    async fn list_filtered(
        &self,
        status: Option<TopUpRuleStatus>,
        limit: i64,
        offset: i64,
    ) -> AppResult<(Vec<TopUpRule>, i64)> {
        let state = self.state.lock();
        let matching: Vec<TopUpRule> = state
            .rules
            .iter()
            .filter(|r| status.map_or(true, |s| r.status == s))
            .cloned()
            .collect();
        Ok((page(&matching, limit, offset), matching.len() as i64))
    }

    async fn set_status(
        &self,
        id: i32,
        from: TopUpRuleStatus,
        to: TopUpRuleStatus,
        executed_at: Option<chrono::DateTime<Utc>>,
    ) -> AppResult<Option<TopUpRule>> {
        let mut state = self.state.lock();
        Ok(match state.rules.iter_mut().find(|r| r.id == id) {
            Some(rule) if rule.status == from => {
                rule.status = to;
                rule.executed_at = executed_at.or(rule.executed_at);
                Some(rule.clone())
            }
            _ => None,
        })
    }

    async fn release(&self, id: i32) -> AppResult<Option<TopUpRule>> {
        let mut state = self.state.lock();
        Ok(match state.rules.iter_mut().find(|r| r.id == id) {
            Some(rule) if rule.status == TopUpRuleStatus::Executed => {
                rule.status = TopUpRuleStatus::Scheduled;
                rule.executed_at = None;
                Some(rule.clone())
            }
            _ => None,
        })
    }
}

#[async_trait]
impl BatchExecutionRepository for MemoryStore {
    async fn start(
        &self,
        job_type: BatchJobType,
        reference: Option<String>,
        triggered_by: &str,
    ) -> AppResult<BatchExecution> {
        let mut state = self.state.lock();
        let run = BatchExecution {
            id: state.next_id(),
            job_type,
            reference,
            triggered_by: triggered_by.to_string(),
            status: BatchStatus::Running,
            processed_count: 0,
            affected_count: 0,
            error_message: None,
            started_at: Utc::now(),
            finished_at: None,
        };
        state.batches.push(run.clone());
        Ok(run)
    }

    async fn finish(&self, id: i64, outcome: &BatchOutcome) -> AppResult<BatchExecution> {
        let mut state = self.state.lock();
        let run = state
            .batches
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or_else(|| AppError::BatchExecutionNotFound(id.to_string()))?;
        run.status = outcome.status;
        run.processed_count = outcome.processed_count;
        run.affected_count = outcome.affected_count;
        run.error_message = outcome.error_message.clone();
        run.finished_at = Some(Utc::now());
        Ok(run.clone())
    }

    async fn find_by_id(&self, id: i64) -> AppResult<Option<BatchExecution>> {
        Ok(self.state.lock().batches.iter().find(|b| b.id == id).cloned())
    }

    async fn list(&self, query: &BatchExecutionQuery) -> AppResult<(Vec<BatchExecution>, i64)> {
        let state = self.state.lock();
        let mut matching: Vec<BatchExecution> = state
            .batches
            .iter()
            .filter(|b| query.job_type.map_or(true, |t| b.job_type == t))
            .cloned()
            .collect();
        matching.reverse();
        Ok((
            page(&matching, query.pagination.limit(), query.pagination.offset()),
            matching.len() as i64,
        ))
    }
}
