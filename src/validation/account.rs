use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use super::{FieldErrors, REQUIRED};
use crate::model::account::Identity;

pub const PASSWORD_MIN_LENGTH: usize = 8;

pub const USERNAME_MESSAGE: &str = "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.";
pub const PASSWORD_TOO_SHORT: &str =
    "This password is too short. It must contain at least 8 characters.";
pub const PASSWORD_NUMERIC: &str = "This password is entirely numeric.";
pub const PASSWORD_TOO_SIMILAR: &str =
    "The password is too similar to your personal information.";
pub const PASSWORD_MISMATCH: &str = "The two password fields didn't match.";
pub const USERNAME_TAKEN: &str = "A user with that username already exists.";

static USERNAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[\w.@+-]+$").expect("username pattern is a valid regex")
});

/// Decimal digits in any script; numerals such as `Ⅷ` or `½` do not count.
static DIGITS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\p{Nd}+$").expect("digit pattern is a valid regex"));

/// Registration / employee form. Used for self-registration and for the
/// admin add and edit screens.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[schema(example = json!({
    "username": "jdoe",
    "email": "jdoe@example.com",
    "first_name": "John",
    "last_name": "Doe",
    "password1": "Secr3tPass!",
    "password2": "Secr3tPass!"
}))]
pub struct AccountForm {
    #[serde(default)]
    #[validate(length(max = 150, message = "Ensure this value has at most 150 characters."))]
    pub username: String,
    #[serde(default)]
    #[validate(email(message = "Enter a valid email address."))]
    pub email: String,
    #[serde(default)]
    #[validate(length(max = 150, message = "Ensure this value has at most 150 characters."))]
    pub first_name: String,
    #[serde(default)]
    #[validate(length(max = 150, message = "Ensure this value has at most 150 characters."))]
    pub last_name: String,
    #[serde(default)]
    pub password1: String,
    #[serde(default)]
    pub password2: String,
    /// Only honoured on the admin screens.
    #[serde(default)]
    pub is_staff: Option<bool>,
}

/// Output of a successful [`AccountForm::clean`]. The password is still
/// plaintext and must be hashed before it is stored.
#[derive(Debug, Clone)]
pub struct CleanedAccount {
    pub identity: Identity,
    pub password: String,
    pub is_staff: Option<bool>,
}

impl AccountForm {
    pub fn clean(&self) -> Result<CleanedAccount, FieldErrors> {
        let trimmed = AccountForm {
            username: self.username.trim().to_string(),
            email: self.email.trim().to_string(),
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            password1: self.password1.clone(),
            password2: self.password2.clone(),
            is_staff: self.is_staff,
        };

        let mut errors = match trimmed.validate() {
            Ok(()) => FieldErrors::new(),
            Err(e) => FieldErrors::from(e),
        };

        if !trimmed.username.is_empty()
            && !errors.has("username")
            && !USERNAME_RE.is_match(&trimmed.username)
        {
            errors.add("username", USERNAME_MESSAGE);
        }

        for (field, value) in [
            ("username", &trimmed.username),
            ("email", &trimmed.email),
            ("first_name", &trimmed.first_name),
            ("last_name", &trimmed.last_name),
            ("password1", &trimmed.password1),
            ("password2", &trimmed.password2),
        ] {
            if value.is_empty() {
                errors.replace(field, REQUIRED);
            }
        }

        // Similarity is only checked against personal fields that are valid.
        let personal: Vec<&str> = [
            ("username", trimmed.username.as_str()),
            ("first_name", trimmed.first_name.as_str()),
            ("last_name", trimmed.last_name.as_str()),
        ]
        .into_iter()
        .filter(|(field, _)| !errors.has(field))
        .map(|(_, value)| value)
        .collect();

        if !errors.has("password1") {
            if let Err(message) = check_password(&trimmed.password1, &personal) {
                errors.add("password1", message);
            }
        }

        if !errors.has("password1")
            && !errors.has("password2")
            && trimmed.password1 != trimmed.password2
        {
            errors.add("password2", PASSWORD_MISMATCH);
        }

        errors.into_result(CleanedAccount {
            identity: Identity {
                username: trimmed.username,
                email: trimmed.email,
                first_name: trimmed.first_name,
                last_name: trimmed.last_name,
            },
            password: trimmed.password1,
            is_staff: trimmed.is_staff,
        })
    }
}

/// Password strength rules. `personal` holds the username and names the
/// password must not contain, compared case-insensitively; blank entries
/// are ignored.
pub fn check_password(password: &str, personal: &[&str]) -> Result<(), &'static str> {
    if password.chars().count() < PASSWORD_MIN_LENGTH {
        return Err(PASSWORD_TOO_SHORT);
    }

    if DIGITS_RE.is_match(password) {
        return Err(PASSWORD_NUMERIC);
    }

    let lowered = password.to_lowercase();
    let similar = personal
        .iter()
        .filter(|value| !value.is_empty())
        .any(|value| lowered.contains(&value.to_lowercase()));
    if similar {
        return Err(PASSWORD_TOO_SIMILAR);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(username: &str, password: &str) -> AccountForm {
        AccountForm {
            username: username.to_string(),
            email: format!("{username}@example.com"),
            first_name: "John".to_string(),
            last_name: "Doe".to_string(),
            password1: password.to_string(),
            password2: password.to_string(),
            is_staff: None,
        }
    }

    fn password_errors(f: &AccountForm) -> Vec<String> {
        match f.clean() {
            Ok(_) => Vec::new(),
            Err(errors) => errors.get("password1").unwrap_or_default().to_vec(),
        }
    }

    #[test]
    fn accepts_strong_password() {
        let cleaned = form("jdoe", "Secr3tPass!").clean().expect("valid form");
        assert_eq!(cleaned.identity.username, "jdoe");
        assert_eq!(cleaned.password, "Secr3tPass!");
    }

    #[test]
    fn rejects_password_containing_username() {
        assert_eq!(password_errors(&form("jdoe", "jdoe12345")), vec![PASSWORD_TOO_SIMILAR]);
        assert_eq!(password_errors(&form("jdoe", "xxJDOExx99")), vec![PASSWORD_TOO_SIMILAR]);
    }

    #[test]
    fn rejects_password_containing_names() {
        assert_eq!(password_errors(&form("zed", "johnny-b-goode")), vec![PASSWORD_TOO_SIMILAR]);
        assert_eq!(password_errors(&form("zed", "Mr.DOE.2024")), vec![PASSWORD_TOO_SIMILAR]);
    }

    #[test]
    fn rejects_short_and_numeric_passwords() {
        assert_eq!(password_errors(&form("jdoe", "Ab1!")), vec![PASSWORD_TOO_SHORT]);
        assert_eq!(password_errors(&form("jdoe", "1234567890")), vec![PASSWORD_NUMERIC]);
        assert_eq!(password_errors(&form("jdoe", "١٢٣٤٥٦٧٨٩")), vec![PASSWORD_NUMERIC]);
    }

    #[test]
    fn numerals_that_are_not_digits_pass() {
        assert!(check_password("ⅠⅡⅢⅣⅤⅥⅦⅧ", &[]).is_ok());
        assert!(check_password("½½½½½½½½", &[]).is_ok());
    }

    #[test]
    fn password_predicate_matches_rules() {
        let personal = ["jdoe", "John", "Doe"];
        let cases = [
            ("Secr3tPass!", true),
            ("abcdefgh", true),
            ("abcdefg", false),
            ("12345678", false),
            ("1234567a", true),
            ("myjdoepass", false),
            ("JOHNNYCASH", false),
            ("doe-a-deer", false),
            ("pässwörd1", true),
        ];
        for (password, expected) in cases {
            assert_eq!(
                check_password(password, &personal).is_ok(),
                expected,
                "password {password:?}"
            );
        }
    }

    #[test]
    fn confirmation_must_match() {
        let mut f = form("jdoe", "Secr3tPass!");
        f.password2 = "Secr3tPass?".to_string();
        let errors = f.clean().unwrap_err();
        assert_eq!(errors.get("password2"), Some(&[PASSWORD_MISMATCH.to_string()][..]));
        assert!(!errors.has("password1"));
    }

    #[test]
    fn rejects_username_outside_pattern() {
        let errors = form("j doe", "Secr3tPass!").clean().unwrap_err();
        assert_eq!(errors.get("username"), Some(&[USERNAME_MESSAGE.to_string()][..]));

        let mut allowed = form("j.doe+hr@corp-1", "Secr3tPass!");
        allowed.email = "jdoe@example.com".to_string();
        assert!(allowed.clean().is_ok());
    }

    #[test]
    fn invalid_username_is_not_used_for_similarity() {
        // "ja ne" fails the pattern, so a password containing it is only
        // judged on the other rules.
        let errors = form("ja ne", "ja ne secret!").clean().unwrap_err();
        assert!(errors.has("username"));
        assert!(!errors.has("password1"));
    }

    #[test]
    fn missing_fields_are_required() {
        let errors = AccountForm::default().clean().unwrap_err();
        for field in ["username", "email", "first_name", "last_name", "password1", "password2"] {
            assert_eq!(errors.get(field), Some(&[REQUIRED.to_string()][..]), "{field}");
        }
    }

    #[test]
    fn rejects_bad_email() {
        let mut f = form("jdoe", "Secr3tPass!");
        f.email = "not-an-email".to_string();
        let errors = f.clean().unwrap_err();
        assert!(errors.has("email"));
    }
}
