use serde::{Deserialize, Serialize};

pub type OwnerId = u64;
pub type DogId = u64;

/// A customer who books stays and pays for them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    pub id: OwnerId,
    pub fullname: String,
    pub email: String,
    pub phone_number: String,
    /// Account that incoming transfers must originate from to settle this owner's stays.
    pub bank_account: Option<String>,
}

impl Owner {
    /// Whether a transfer sent from `from_account` can be attributed to this owner.
    ///
    /// Account numbers are compared ignoring whitespace and letter case, so
    /// `PL61 1090 1014` and `pl6110901014` are the same account. An owner
    /// without a registered account never matches.
    pub fn owns_account(&self, from_account: &str) -> bool {
        match &self.bank_account {
            Some(registered) => {
                let registered = normalize_account(registered);
                !registered.is_empty() && registered == normalize_account(from_account)
            }
            None => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dog {
    pub id: DogId,
    pub owner_id: OwnerId,
    pub name: String,
    pub age: u32,
    pub notes: Option<String>,
}

fn normalize_account(account: &str) -> String {
    account
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_uppercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owner(account: Option<&str>) -> Owner {
        Owner {
            id: 1,
            fullname: "Anna Nowak".to_string(),
            email: "anna@example.com".to_string(),
            phone_number: "600100200".to_string(),
            bank_account: account.map(str::to_string),
        }
    }

    #[test]
    fn test_owns_account_ignores_spacing_and_case() {
        let owner = owner(Some("PL61 1090 1014 0000 0712 1981 2874"));
        assert!(owner.owns_account("pl61109010140000071219812874"));
        assert!(owner.owns_account(" PL61 1090 1014 0000 0712 1981 2874 "));
        assert!(!owner.owns_account("PL61109010140000071219812875"));
    }

    #[test]
    fn test_owner_without_account_never_matches() {
        assert!(!owner(None).owns_account("123"));
        assert!(!owner(Some("   ")).owns_account(""));
    }
}
