//! Seller payout accounts.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument};

use bazaar_auth::Identity;
use bazaar_core::{BankAccountId, DomainError, Entity, UserId};
use bazaar_parties::{BankAccount, BankAccountDraft};

use crate::error::ServiceResult;
use crate::product_service::profile_of;
use crate::store::CatalogStore;

pub struct BankAccounts<S: ?Sized> {
    store: Arc<S>,
}

impl<S: ?Sized> Clone for BankAccounts<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<S> BankAccounts<S>
where
    S: CatalogStore + ?Sized,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    #[instrument(skip(self, owner, draft), fields(owner_id = %owner.user_id), err)]
    pub async fn create(&self, owner: &Identity, draft: BankAccountDraft) -> ServiceResult<BankAccount> {
        draft.validate()?;
        self.store.upsert_profile(&profile_of(owner)).await?;

        let account = draft.into_account(BankAccountId::new(), owner.user_id, Utc::now());
        self.store.insert_bank_account(&account).await?;

        info!(bank_account_id = %account.id, "bank account created");
        Ok(account)
    }

    /// Live accounts of `owner`, newest first.
    pub async fn list(&self, owner: UserId) -> ServiceResult<Vec<BankAccount>> {
        Ok(self.store.bank_accounts_of(owner).await?)
    }

    #[instrument(skip(self, draft), fields(bank_account_id = %id, caller = %caller), err)]
    pub async fn update(&self, id: BankAccountId, caller: UserId, draft: BankAccountDraft) -> ServiceResult<BankAccount> {
        draft.validate()?;
        let mut account = self.owned_account(id, caller).await?;
        draft.apply_to(&mut account);
        self.store.update_bank_account(&account).await?;
        Ok(account)
    }

    #[instrument(skip(self), fields(bank_account_id = %id, caller = %caller), err)]
    pub async fn delete(&self, id: BankAccountId, caller: UserId) -> ServiceResult<()> {
        self.owned_account(id, caller).await?;
        self.store.soft_delete_bank_account(id).await?;
        info!("bank account deleted");
        Ok(())
    }

    async fn owned_account(&self, id: BankAccountId, caller: UserId) -> ServiceResult<BankAccount> {
        let account = self
            .store
            .bank_account_by_id(id)
            .await?
            .ok_or(DomainError::not_found("bank account"))?;
        if !account.is_owned_by(caller) {
            return Err(DomainError::forbidden("bank account belongs to another user").into());
        }
        Ok(account)
    }
}
