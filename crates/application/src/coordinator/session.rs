use jpics_domain::Session;
use tracing::info;

use super::{lock_poisoned, DataCoordinator};
use crate::{ApplicationError, LoginCommand};

impl DataCoordinator {
    pub fn session(&self) -> Session {
        self.session
            .read()
            .map(|session| session.clone())
            .unwrap_or_default()
    }

    /// Asks the server who we are and refreshes the session from the answer.
    pub async fn check_status(&self) -> Result<Session, ApplicationError> {
        let status = self
            .remote("pwg.session.getStatus", || async move {
                self.api.session_status().await.map_err(ApplicationError::from)
            })
            .await?;

        let mut session = self
            .session
            .write()
            .map_err(|_| lock_poisoned("session"))?;
        session.update_from_status(
            &status.username,
            &status.status,
            &status.token,
            status.available_sizes,
        );
        Ok(session.clone())
    }

    /// Returns `false` when the server rejected the credentials.
    pub async fn login(&self, command: LoginCommand) -> Result<bool, ApplicationError> {
        let username = command.username.as_str();
        let password = command.password.as_str();
        let accepted = self
            .remote("pwg.session.login", || async move {
                self.api
                    .login(username, password)
                    .await
                    .map_err(ApplicationError::from)
            })
            .await?;
        if !accepted {
            info!(%username, "login rejected");
            return Ok(false);
        }

        let session = self.check_status().await?;
        info!(username = %session.username, admin = session.is_admin, "logged in");
        Ok(session.logged_in)
    }

    pub async fn logout(&self) -> Result<(), ApplicationError> {
        self.remote("pwg.session.logout", || async move {
            self.api.logout().await.map_err(ApplicationError::from)
        })
        .await?;

        self.session
            .write()
            .map_err(|_| lock_poisoned("session"))?
            .clear();
        info!("logged out");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::tests::harness;
    use crate::fakes::FakeApi;

    fn credentials(password: &str) -> LoginCommand {
        LoginCommand {
            username: "alice".to_string(),
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn login_populates_session_from_status() {
        let harness = harness(FakeApi::new());
        assert!(harness
            .coordinator
            .login(credentials("secret"))
            .await
            .expect("login"));

        let session = harness.coordinator.session();
        assert!(session.logged_in);
        assert!(session.is_admin);
        assert_eq!(session.username, "alice");
        assert_eq!(session.token, "token-alice");
        assert_eq!(session.server_url, "https://gallery.test");
    }

    #[tokio::test]
    async fn rejected_login_leaves_session_empty() {
        let harness = harness(FakeApi::new());
        assert!(!harness
            .coordinator
            .login(credentials("wrong"))
            .await
            .expect("login"));
        assert!(!harness.coordinator.session().logged_in);
        assert_eq!(harness.api.calls_named("session_status"), 0);
    }

    #[tokio::test]
    async fn logout_clears_token() {
        let harness = harness(FakeApi::new());
        harness.coordinator.check_status().await.expect("status");
        harness.coordinator.logout().await.expect("logout");

        let session = harness.coordinator.session();
        assert!(!session.logged_in);
        assert!(session.action_token().is_none());
    }
}
