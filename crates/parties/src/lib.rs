//! Parties domain module (sellers, buyers and their payout accounts).
//!
//! Plain domain records and rules, no IO, no HTTP, no storage.

pub mod bank_account;
pub mod profile;

pub use bank_account::{BankAccount, BankAccountDraft};
pub use profile::UserProfile;
