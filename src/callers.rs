//! Caller identity → short code resolution.
//!
//! The export snapshot and the alignment sources refer to callers by short
//! code (`ico`, `dani`) while the registry stores user ids. The mapping is a
//! case-insensitive substring test over username and display name — fragile
//! if more callers are ever added, but deterministic for the two the data
//! actually has. Both expected codes must resolve to exactly one user each;
//! anything else aborts the run, because every downstream comparison and the
//! export's `preferred_caller` column depend on the mapping being right.

use std::collections::HashMap;

use thiserror::Error;

use crate::db::DbUser;

/// The short codes the export snapshot and spreadsheets use, paired with the
/// uppercase tag that marks a caller's spreadsheet files.
pub const CALLER_CODES: &[(&str, &str)] = &[("ico", "ИЦО"), ("dani", "ДАНИ")];

#[derive(Debug, Error)]
pub enum CallerError {
    #[error("no user matches caller code '{0}'")]
    Unresolved(String),

    #[error("caller code '{code}' matches more than one user ({first} and {second})")]
    Ambiguous {
        code: String,
        first: String,
        second: String,
    },
}

/// Resolved two-way mapping between user ids and short codes.
pub struct CallerDirectory {
    code_by_id: HashMap<String, String>,
    id_by_code: HashMap<String, String>,
}

impl CallerDirectory {
    /// Resolve the known caller codes against the user table.
    ///
    /// Every user gets a code: the first known code whose name appears as a
    /// substring of the username or display name, falling back to the
    /// username itself for users outside the caller pair. The known codes
    /// must each match exactly one user or resolution fails.
    pub fn resolve(users: &[DbUser]) -> Result<Self, CallerError> {
        let mut code_by_id = HashMap::new();
        let mut id_by_code: HashMap<String, String> = HashMap::new();

        for user in users {
            let username = user.username.to_lowercase();
            let display = user
                .display_name
                .as_deref()
                .unwrap_or_default()
                .to_lowercase();

            let code = CALLER_CODES
                .iter()
                .find(|(code, _)| username.contains(code) || display.contains(code))
                .map(|(code, _)| (*code).to_string())
                .unwrap_or_else(|| username.clone());

            if CALLER_CODES.iter().any(|(c, _)| *c == code) {
                if let Some(existing) = id_by_code.get(&code) {
                    return Err(CallerError::Ambiguous {
                        code,
                        first: existing.clone(),
                        second: user.id.clone(),
                    });
                }
                id_by_code.insert(code.clone(), user.id.clone());
            }
            code_by_id.insert(user.id.clone(), code);
        }

        for (code, _) in CALLER_CODES {
            if !id_by_code.contains_key(*code) {
                return Err(CallerError::Unresolved((*code).to_string()));
            }
        }

        Ok(Self {
            code_by_id,
            id_by_code,
        })
    }

    /// Short code for a user id, if the id is known at all.
    pub fn code_for(&self, user_id: &str) -> Option<&str> {
        self.code_by_id.get(user_id).map(String::as_str)
    }

    /// User id a known caller code resolved to.
    pub fn id_for(&self, code: &str) -> Option<&str> {
        self.id_by_code.get(code).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str, username: &str, display: Option<&str>) -> DbUser {
        DbUser {
            id: id.to_string(),
            username: username.to_string(),
            display_name: display.map(str::to_string),
        }
    }

    #[test]
    fn resolves_both_callers_by_username_or_display_name() {
        let users = vec![
            user("u1", "ico.petrov", None),
            user("u2", "daniela", Some("Дани / Dani")),
            user("u3", "admin", Some("Administrator")),
        ];
        let dir = CallerDirectory::resolve(&users).expect("resolve");
        assert_eq!(dir.id_for("ico"), Some("u1"));
        assert_eq!(dir.id_for("dani"), Some("u2"));
        assert_eq!(dir.code_for("u1"), Some("ico"));
        assert_eq!(dir.code_for("u2"), Some("dani"));
        // Non-caller users fall back to their username as the code.
        assert_eq!(dir.code_for("u3"), Some("admin"));
        assert_eq!(dir.code_for("unknown"), None);
    }

    #[test]
    fn missing_caller_is_a_hard_error() {
        let users = vec![user("u1", "ico", None)];
        match CallerDirectory::resolve(&users) {
            Err(CallerError::Unresolved(code)) => assert_eq!(code, "dani"),
            other => panic!("expected Unresolved, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn duplicate_match_for_one_code_is_a_hard_error() {
        let users = vec![
            user("u1", "ico", None),
            user("u2", "nikola", Some("Ico (backup)")),
            user("u3", "dani", None),
        ];
        match CallerDirectory::resolve(&users) {
            Err(CallerError::Ambiguous { code, .. }) => assert_eq!(code, "ico"),
            other => panic!("expected Ambiguous, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn match_is_case_insensitive() {
        let users = vec![
            user("u1", "ICO", None),
            user("u2", "x", Some("DANIELA")),
        ];
        let dir = CallerDirectory::resolve(&users).expect("resolve");
        assert_eq!(dir.id_for("ico"), Some("u1"));
        assert_eq!(dir.id_for("dani"), Some("u2"));
    }
}
