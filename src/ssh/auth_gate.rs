//! Password authentication gate.
//!
//! Every submission is counted and kept; once the count reaches the threshold
//! the session is accepted with whatever credentials came last. There is no
//! lockout: a client that keeps trying always gets in.

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthAttempt {
    pub username: String,
    pub password: String,
    pub attempt_number: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthDecision {
    Rejected,
    Authenticated,
}

#[derive(Debug, Clone)]
pub struct AuthGate {
    threshold: u32,
    attempts: Vec<AuthAttempt>,
    identity: Option<String>,
}

impl AuthGate {
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold: threshold.max(1),
            attempts: Vec::new(),
            identity: None,
        }
    }

    pub fn submit(&mut self, username: &str, password: &str) -> AuthDecision {
        let attempt_number = self.attempt_count() + 1;
        self.attempts.push(AuthAttempt {
            username: username.to_string(),
            password: password.to_string(),
            attempt_number,
        });

        if attempt_number >= self.threshold {
            self.identity = Some(username.to_string());
            AuthDecision::Authenticated
        } else {
            AuthDecision::Rejected
        }
    }

    pub fn attempt_count(&self) -> u32 {
        self.attempts.len() as u32
    }

    pub fn attempts(&self) -> &[AuthAttempt] {
        &self.attempts
    }

    pub fn last_attempt(&self) -> Option<&AuthAttempt> {
        self.attempts.last()
    }

    /// Username of the submission that was accepted
    pub fn identity(&self) -> Option<&str> {
        self.identity.as_deref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_second_attempt_succeeds_with_last_identity() {
        let mut gate = AuthGate::new(2);
        assert_eq!(gate.submit("root", "x"), AuthDecision::Rejected);
        assert!(!gate.is_authenticated());
        assert_eq!(gate.submit("admin", "y"), AuthDecision::Authenticated);
        assert_eq!(gate.identity(), Some("admin"));
        assert_eq!(gate.attempts()[0].username, "root");
        assert_eq!(gate.last_attempt().unwrap().attempt_number, 2);
    }

    #[test]
    fn test_zero_threshold_acts_as_one() {
        let mut gate = AuthGate::new(0);
        assert_eq!(gate.submit("a", "b"), AuthDecision::Authenticated);
    }

    proptest! {
        #[test]
        fn decision_depends_only_on_count(
            threshold in 1u32..6,
            creds in prop::collection::vec((".{0,12}", ".{0,12}"), 1..10),
        ) {
            let mut gate = AuthGate::new(threshold);
            for (i, (user, pass)) in creds.iter().enumerate() {
                let expected = if (i as u32 + 1) >= threshold {
                    AuthDecision::Authenticated
                } else {
                    AuthDecision::Rejected
                };
                prop_assert_eq!(gate.submit(user, pass), expected);
            }
        }
    }
}
