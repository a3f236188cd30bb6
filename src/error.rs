use thiserror::Error;

use crate::session::state::SessionType;

#[derive(Error, Debug)]
pub enum SessionError {
    /// Starting a session with nothing to study is a caller bug.
    #[error("cannot start a {} session without subjects", .session_type.label())]
    NoSubjects { session_type: SessionType },

    #[error("a {} session is already in progress", .0.label())]
    AlreadyActive(SessionType),

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

pub type SessionResult<T> = Result<T, SessionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = SessionError::NoSubjects {
            session_type: SessionType::Review,
        };
        assert_eq!(err.to_string(), "cannot start a review session without subjects");
        let err = SessionError::AlreadyActive(SessionType::SelfStudy);
        assert_eq!(err.to_string(), "a self-study session is already in progress");
    }
}
