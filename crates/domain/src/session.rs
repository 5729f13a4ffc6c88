use serde::{Deserialize, Serialize};

const ANONYMOUS_USERNAMES: [&str; 2] = ["guest", "unknown"];

/// Process-wide connection state, populated from the server status call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub server_url: String,
    pub logged_in: bool,
    pub username: String,
    pub is_admin: bool,
    pub token: String,
    pub available_sizes: Vec<String>,
}

impl Session {
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            ..Self::default()
        }
    }

    pub fn update_from_status(
        &mut self,
        username: &str,
        status: &str,
        token: &str,
        available_sizes: Vec<String>,
    ) {
        self.username = username.to_string();
        self.is_admin = matches!(status, "admin" | "webmaster");
        self.token = token.to_string();
        self.available_sizes = available_sizes;
        self.logged_in = !username.is_empty() && !ANONYMOUS_USERNAMES.contains(&username);
    }

    pub fn clear(&mut self) {
        self.logged_in = false;
        self.username.clear();
        self.is_admin = false;
        self.token.clear();
        self.available_sizes.clear();
    }

    pub fn action_token(&self) -> Option<&str> {
        if self.token.is_empty() {
            return None;
        }
        Some(&self.token)
    }
}
