use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bazaar_core::{BankAccountId, DomainError, DomainResult, Entity, UserId};

/// A seller's payout account. Buyers reference it by id when ordering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankAccount {
    pub id: BankAccountId,
    pub owner_id: UserId,
    pub bank_name: String,
    pub account_name: String,
    pub account_number: String,
    pub created_at: DateTime<Utc>,
}

impl Entity for BankAccount {
    type Id = BankAccountId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn owner_id(&self) -> UserId {
        self.owner_id
    }
}

/// Descriptive fields of a bank account, used for both create and update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankAccountDraft {
    pub bank_name: String,
    pub account_name: String,
    pub account_number: String,
}

impl BankAccountDraft {
    /// Reject blank fields. Length limits are enforced at the API boundary.
    pub fn validate(&self) -> DomainResult<()> {
        for (field, value) in [
            ("bankName", &self.bank_name),
            ("bankAccountName", &self.account_name),
            ("bankAccountNumber", &self.account_number),
        ] {
            if value.trim().is_empty() {
                return Err(DomainError::validation(format!("{field}: must not be blank")));
            }
        }
        Ok(())
    }

    pub fn into_account(self, id: BankAccountId, owner_id: UserId, now: DateTime<Utc>) -> BankAccount {
        BankAccount {
            id,
            owner_id,
            bank_name: self.bank_name,
            account_name: self.account_name,
            account_number: self.account_number,
            created_at: now,
        }
    }

    /// Overwrite the descriptive fields of `account`, keeping identity and owner.
    pub fn apply_to(self, account: &mut BankAccount) {
        account.bank_name = self.bank_name;
        account.account_name = self.account_name;
        account.account_number = self.account_number;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> BankAccountDraft {
        BankAccountDraft {
            bank_name: "Bank Jago".to_string(),
            account_name: "Seller One".to_string(),
            account_number: "1234567890".to_string(),
        }
    }

    #[test]
    fn blank_fields_are_rejected() {
        let mut d = draft();
        d.account_number = "   ".to_string();
        assert!(matches!(d.validate(), Err(DomainError::Validation(msg)) if msg.starts_with("bankAccountNumber")));
    }

    #[test]
    fn apply_to_keeps_identity_and_owner() {
        let owner = UserId::new();
        let id = BankAccountId::new();
        let mut account = draft().into_account(id, owner, Utc::now());

        BankAccountDraft {
            bank_name: "Bank Mandiri".to_string(),
            account_name: "Seller Two".to_string(),
            account_number: "999999".to_string(),
        }
        .apply_to(&mut account);

        assert_eq!(account.id, id);
        assert!(account.is_owned_by(owner));
        assert_eq!(account.bank_name, "Bank Mandiri");
    }
}
