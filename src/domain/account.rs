//! Account version rows
//!
//! The scenario works on a single flat table keyed by account name. Each row
//! carries a version counter that the concurrent workers overwrite.

use nutype::nutype;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Rows written by setup on every run, in listing order
pub const SEED_ACCOUNTS: [(&str, i64); 3] = [("alice", 3), ("bob", 5), ("candy", 4)];

/// Primary key of an account row, bounded by the `VARCHAR(100)` column
#[nutype(
    validate(not_empty, len_char_max = 100),
    derive(
        Debug,
        Clone,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        Hash,
        Serialize,
        Deserialize,
        AsRef,
        Display
    )
)]
pub struct AccountName(String);

/// Version counter stored for an account
#[nutype(
    validate(greater_or_equal = 0),
    derive(
        Debug,
        Clone,
        Copy,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        Hash,
        Serialize,
        Deserialize,
        AsRef,
        Display
    )
)]
pub struct Version(i64);

/// One row of `account_versions`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountVersion {
    pub account: AccountName,
    pub version: Version,
}

impl AccountVersion {
    pub fn new(account: AccountName, version: Version) -> Self {
        Self { account, version }
    }
}

impl fmt::Display for AccountVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>6} : {}", self.account.as_ref(), self.version)
    }
}

/// The three fixed rows the table is reset to before each run
pub fn seed_rows() -> Vec<AccountVersion> {
    SEED_ACCOUNTS
        .iter()
        .map(|(account, version)| {
            AccountVersion::new(
                AccountName::try_new((*account).to_string()).expect("Seed account is valid"),
                Version::try_new(*version).expect("Seed version is valid"),
            )
        })
        .collect()
}

/// Build a list of account names from string literals
pub fn account_names(names: &[&str]) -> Result<Vec<AccountName>, AccountNameError> {
    names
        .iter()
        .map(|name| AccountName::try_new((*name).to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn seed_rows_are_sorted_and_fixed() {
        let rows = seed_rows();
        let pairs: Vec<(String, i64)> = rows
            .iter()
            .map(|row| (row.account.to_string(), row.version.into_inner()))
            .collect();

        assert_eq!(
            pairs,
            vec![
                ("alice".to_string(), 3),
                ("bob".to_string(), 5),
                ("candy".to_string(), 4)
            ]
        );
    }

    #[test]
    fn empty_account_name_is_rejected() {
        assert!(AccountName::try_new(String::new()).is_err());
    }

    #[test]
    fn negative_version_is_rejected() {
        assert!(Version::try_new(-1).is_err());
        assert!(Version::try_new(0).is_ok());
    }

    #[test]
    fn row_display_right_aligns_account() {
        let row = AccountVersion::new(
            AccountName::try_new("bob".to_string()).unwrap(),
            Version::try_new(6).unwrap(),
        );
        assert_eq!(row.to_string(), "   bob : 6");
    }

    #[test]
    fn account_names_fails_on_any_invalid_name() {
        assert!(account_names(&["alice", ""]).is_err());
        assert_eq!(account_names(&["alice", "bob"]).unwrap().len(), 2);
    }

    proptest! {
        #[test]
        fn account_names_over_column_width_are_rejected(name in "[a-z]{101,150}") {
            prop_assert!(AccountName::try_new(name).is_err());
        }

        #[test]
        fn account_names_within_column_width_are_accepted(name in "[a-z]{1,100}") {
            prop_assert!(AccountName::try_new(name).is_ok());
        }
    }
}
