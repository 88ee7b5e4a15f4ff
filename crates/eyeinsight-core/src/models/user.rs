use serde::{Deserialize, Serialize};

use super::de::deserialize_string_or_number;

/// An account as confirmed by the `/validate-token` endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(deserialize_with = "deserialize_string_or_number")]
    pub id: String,
    pub username: String,
    pub email: String,
    #[serde(default = "default_role")]
    pub role: String,
}

fn default_role() -> String {
    "user".to_string()
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role.eq_ignore_ascii_case("admin")
    }
}

/// Registration payload posted to `/signup`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignupProfile {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
}

impl SignupProfile {
    pub fn new(username: &str, email: &str, password: &str) -> Self {
        Self {
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            age: None,
            gender: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_user_with_numeric_id() {
        let json = r#"{"id": 17, "username": "alice", "email": "a@x.com", "role": "user"}"#;
        let user: User = serde_json::from_str(json).expect("Failed to parse user JSON");
        assert_eq!(user.id, "17");
        assert!(!user.is_admin());
    }

    #[test]
    fn test_parse_user_without_role() {
        let json = r#"{"id": "1", "username": "alice", "email": "a@x.com"}"#;
        let user: User = serde_json::from_str(json).expect("Failed to parse user JSON");
        assert_eq!(user.role, "user");
    }

    #[test]
    fn test_signup_profile_omits_missing_optionals() {
        let profile = SignupProfile::new("bob", "b@x.com", "secret1");
        let value = serde_json::to_value(&profile).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"username": "bob", "email": "b@x.com", "password": "secret1"})
        );

        let profile = SignupProfile {
            age: Some(42),
            gender: Some("female".to_string()),
            ..profile
        };
        let value = serde_json::to_value(&profile).unwrap();
        assert_eq!(value["age"], 42);
        assert_eq!(value["gender"], "female");
    }
}
