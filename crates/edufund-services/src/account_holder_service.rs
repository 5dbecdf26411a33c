//! Account holder service
//!
//! Registration, profile maintenance and the filtered holder listing used by
//! the Admin Portal. Registration opens the holder's education account in
//! the same unit of work.

use chrono::NaiveDate;
use edufund_core::{
    models::{
        AccountHolder, AccountHolderDetail, AccountHolderListItem, EducationAccount,
        EducationLevel, ResidentialStatus, SchoolingStatus,
    },
    query::AccountHolderQuery,
    traits::{
        AccountHolderRepository, EducationAccountRepository, EnrollmentRepository,
        InvoiceRepository, PaginatedResponse,
    },
    AppError, AppResult,
};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Partial update of a holder profile; `None` leaves a field unchanged
#[derive(Debug, Clone, Default)]
pub struct HolderChanges {
    pub full_name: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub residential_address: Option<String>,
    pub residential_status: Option<ResidentialStatus>,
    pub schooling_status: Option<SchoolingStatus>,
    pub education_level: Option<EducationLevel>,
}

impl HolderChanges {
    fn apply(self, holder: &mut AccountHolder) {
        if let Some(full_name) = self.full_name {
            holder.full_name = full_name.trim().to_string();
        }
        if let Some(dob) = self.date_of_birth {
            holder.date_of_birth = dob;
        }
        if let Some(email) = self.email {
            holder.email = Some(email.trim().to_string()).filter(|e| !e.is_empty());
        }
        if let Some(phone) = self.phone {
            holder.phone = Some(phone.trim().to_string()).filter(|p| !p.is_empty());
        }
        if let Some(address) = self.residential_address {
            holder.residential_address = Some(address.trim().to_string()).filter(|a| !a.is_empty());
        }
        if let Some(status) = self.residential_status {
            holder.residential_status = status;
        }
        if let Some(status) = self.schooling_status {
            holder.schooling_status = status;
        }
        if let Some(level) = self.education_level {
            holder.education_level = level;
        }
    }
}

fn validate_profile(holder: &AccountHolder, today: NaiveDate) -> AppResult<()> {
    if holder.full_name.trim().is_empty() {
        return Err(AppError::MissingField("full_name".to_string()));
    }
    if holder.date_of_birth > today {
        return Err(AppError::Validation(format!(
            "date_of_birth {} is in the future",
            holder.date_of_birth
        )));
    }
    Ok(())
}

/// Registers holders and serves their profiles and listings
pub struct AccountHolderService {
    holders: Arc<dyn AccountHolderRepository>,
    accounts: Arc<dyn EducationAccountRepository>,
    enrollments: Arc<dyn EnrollmentRepository>,
    invoices: Arc<dyn InvoiceRepository>,
    account_prefix: String,
}

impl AccountHolderService {
    pub fn new(
        holders: Arc<dyn AccountHolderRepository>,
        accounts: Arc<dyn EducationAccountRepository>,
        enrollments: Arc<dyn EnrollmentRepository>,
        invoices: Arc<dyn InvoiceRepository>,
        account_prefix: impl Into<String>,
    ) -> Self {
        Self {
            holders,
            accounts,
            enrollments,
            invoices,
            account_prefix: account_prefix.into(),
        }
    }

    /// Filtered, sorted and paginated holder listing
    #[instrument(skip(self, query), fields(page = query.pagination.page))]
    pub async fn list(
        &self,
        query: &AccountHolderQuery,
    ) -> AppResult<PaginatedResponse<AccountHolderListItem>> {
        query.filter.validate()?;
        let (items, total) = self.holders.search(query).await?;
        debug!("Holder search matched {} rows", total);
        Ok(PaginatedResponse::new(items, total, query.pagination))
    }

    pub async fn get(&self, id: i32) -> AppResult<AccountHolder> {
        self.holders
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::AccountHolderNotFound(id.to_string()))
    }

    pub async fn find_by_nric(&self, nric: &str) -> AppResult<Option<AccountHolder>> {
        self.holders
            .find_by_nric(&AccountHolder::normalize_nric(nric))
            .await
    }

    /// Holder with account, enrollments and outstanding invoice totals
    #[instrument(skip(self))]
    pub async fn get_detail(&self, id: i32) -> AppResult<AccountHolderDetail> {
        let holder = self.get(id).await?;
        let account = self.accounts.find_by_holder(id).await?;
        let enrollments = self.enrollments.list_by_holder(id).await?;
        let outstanding = self.invoices.outstanding_summary(Some(id)).await?;

        Ok(AccountHolderDetail {
            holder,
            account,
            enrollments,
            outstanding_invoices: outstanding.count,
            outstanding_amount: outstanding.amount,
        })
    }

    /// Register a holder and open their education account
    #[instrument(skip(self, holder))]
    pub async fn create(
        &self,
        mut holder: AccountHolder,
        today: NaiveDate,
    ) -> AppResult<(AccountHolder, EducationAccount)> {
        holder.nric = AccountHolder::normalize_nric(&holder.nric);
        holder.full_name = holder.full_name.trim().to_string();
        if holder.nric.is_empty() {
            return Err(AppError::MissingField("nric".to_string()));
        }
        validate_profile(&holder, today)?;

        if self.holders.find_by_nric(&holder.nric).await?.is_some() {
            warn!("Rejected duplicate holder registration");
            return Err(AppError::AlreadyExists(format!(
                "Account holder {} already exists",
                holder.nric
            )));
        }

        let (holder, account) = self
            .holders
            .create_with_account(&holder, &self.account_prefix)
            .await?;

        info!(
            holder_id = holder.id,
            account_number = %account.account_number,
            "Account holder registered"
        );

        Ok((holder, account))
    }

    #[instrument(skip(self, changes))]
    pub async fn update(
        &self,
        id: i32,
        changes: HolderChanges,
        today: NaiveDate,
    ) -> AppResult<AccountHolder> {
        let mut holder = self.get(id).await?;
        changes.apply(&mut holder);
        validate_profile(&holder, today)?;

        self.holders.update(&holder).await
    }

    /// Set or clear the holder's E-Service password hash
    #[instrument(skip(self, password_hash))]
    pub async fn set_password(&self, id: i32, password_hash: Option<String>) -> AppResult<()> {
        if !self
            .holders
            .update_password(id, password_hash.as_deref())
            .await?
        {
            return Err(AppError::AccountHolderNotFound(id.to_string()));
        }
        info!(
            holder_id = id,
            enabled = password_hash.is_some(),
            "E-Service password updated"
        );
        Ok(())
    }

    pub async fn count(&self) -> AppResult<i64> {
        self.holders.count().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MemoryStore;
    use edufund_core::models::AccountStatus;
    use edufund_core::query::{AccountHolderFilter, HolderSortField, SortDirection};
    use edufund_core::traits::Pagination;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn service(store: &Arc<MemoryStore>) -> AccountHolderService {
        AccountHolderService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            "EA",
        )
    }

    fn query(filter: AccountHolderFilter) -> AccountHolderQuery {
        AccountHolderQuery {
            filter,
            sort_by: HolderSortField::FullName,
            direction: SortDirection::Asc,
            today: date(2024, 6, 1),
            pagination: Pagination::default(),
        }
    }

    #[tokio::test]
    async fn test_create_normalizes_nric_and_opens_account() {
        let store = MemoryStore::new();
        let svc = service(&store);

        let holder = AccountHolder {
            nric: " s1234567d ".to_string(),
            full_name: "  Tan Wei Ming ".to_string(),
            date_of_birth: date(2005, 3, 14),
            ..Default::default()
        };

        let (holder, account) = svc.create(holder, date(2024, 6, 1)).await.unwrap();
        assert_eq!(holder.nric, "S1234567D");
        assert_eq!(holder.full_name, "Tan Wei Ming");
        assert_eq!(account.holder_id, holder.id);
        assert_eq!(account.status, AccountStatus::Active);
        assert!(account.account_number.starts_with("EA"));
    }

    #[tokio::test]
    async fn test_create_rejects_duplicate_nric() {
        let store = MemoryStore::new();
        store.seed_holder("S1234567D", "Existing", date(2004, 1, 1));
        let svc = service(&store);

        let holder = AccountHolder {
            nric: "s1234567d".to_string(),
            full_name: "Someone Else".to_string(),
            ..Default::default()
        };

        let err = svc.create(holder, date(2024, 6, 1)).await.unwrap_err();
        assert!(matches!(err, AppError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn test_create_rejects_future_birth_date() {
        let store = MemoryStore::new();
        let svc = service(&store);

        let holder = AccountHolder {
            nric: "T0000001A".to_string(),
            full_name: "Not Born Yet".to_string(),
            date_of_birth: date(2030, 1, 1),
            ..Default::default()
        };

        let err = svc.create(holder, date(2024, 6, 1)).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_list_rejects_inverted_age_range() {
        let store = MemoryStore::new();
        let svc = service(&store);

        let err = svc
            .list(&query(AccountHolderFilter {
                min_age: Some(30),
                max_age: Some(20),
                ..Default::default()
            }))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_list_rejects_unrealistic_age() {
        let store = MemoryStore::new();
        let svc = service(&store);

        let err = svc
            .list(&query(AccountHolderFilter {
                max_age: Some(u32::MAX),
                ..Default::default()
            }))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = svc
            .list(&query(AccountHolderFilter {
                min_age: Some(151),
                ..Default::default()
            }))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_list_filters_by_age_and_balance() {
        let store = MemoryStore::new();
        let (_, young) = store.seed_holder("S0000001A", "Alice Lim", date(2008, 1, 1));
        let (_, older) = store.seed_holder("S0000002B", "Bala Raj", date(1999, 1, 1));
        store.set_balance(young.id, dec!(500));
        store.set_balance(older.id, dec!(50));
        let svc = service(&store);

        let page = svc
            .list(&query(AccountHolderFilter {
                max_age: Some(20),
                min_balance: Some(dec!(100)),
                ..Default::default()
            }))
            .await
            .unwrap();

        assert_eq!(page.pagination.total, 1);
        assert_eq!(page.data[0].holder.full_name, "Alice Lim");
        assert_eq!(page.data[0].balance, Some(dec!(500)));
    }

    #[tokio::test]
    async fn test_get_detail_includes_outstanding_totals() {
        let store = MemoryStore::new();
        let (holder, account) = store.seed_holder("S0000003C", "Chen Hui", date(2006, 5, 5));
        let svc = service(&store);

        let detail = svc.get_detail(holder.id).await.unwrap();
        assert_eq!(detail.account.unwrap().id, account.id);
        assert!(detail.enrollments.is_empty());
        assert_eq!(detail.outstanding_invoices, 0);
        assert_eq!(detail.outstanding_amount, dec!(0));
    }

    #[tokio::test]
    async fn test_update_applies_only_given_fields() {
        let store = MemoryStore::new();
        let (holder, _) = store.seed_holder("S0000004D", "Devi", date(2006, 5, 5));
        let svc = service(&store);

        let updated = svc
            .update(
                holder.id,
                HolderChanges {
                    email: Some(" devi@example.org ".to_string()),
                    schooling_status: Some(SchoolingStatus::NotInSchool),
                    ..Default::default()
                },
                date(2024, 6, 1),
            )
            .await
            .unwrap();

        assert_eq!(updated.full_name, "Devi");
        assert_eq!(updated.email.as_deref(), Some("devi@example.org"));
        assert_eq!(updated.schooling_status, SchoolingStatus::NotInSchool);
    }

    #[tokio::test]
    async fn test_set_password_on_unknown_holder() {
        let store = MemoryStore::new();
        let svc = service(&store);

        let err = svc
            .set_password(999, Some("$argon2id$stub".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::AccountHolderNotFound(_)));
    }
}
