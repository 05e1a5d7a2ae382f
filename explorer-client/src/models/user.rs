use serde::{Deserialize, Serialize};

/// Claims returned by the hosted UI `userInfo` endpoint.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub preferred_username: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

impl UserProfile {
    /// Email when present, else the preferred username.
    pub fn display_name(&self) -> &str {
        self.email
            .as_deref()
            .or(self.preferred_username.as_deref())
            .or(self.username.as_deref())
            .unwrap_or(&self.sub)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_name_prefers_email() {
        let profile: UserProfile = serde_json::from_str(
            r#"{"sub": "abc", "email": "ada@example.com", "preferred_username": "ada"}"#,
        )
        .unwrap();

        assert_eq!(profile.display_name(), "ada@example.com");
    }

    #[test]
    fn display_name_falls_back_to_preferred_username() {
        let profile: UserProfile =
            serde_json::from_str(r#"{"sub": "abc", "preferred_username": "ada"}"#).unwrap();

        assert_eq!(profile.display_name(), "ada");
    }
}
