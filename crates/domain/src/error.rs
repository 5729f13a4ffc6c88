#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    #[error("{kind} id must be positive, got {value}")]
    InvalidId { kind: &'static str, value: i64 },
    #[error("{0} must not be empty")]
    EmptyName(&'static str),
}
