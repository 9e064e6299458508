use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("invalid dependency condition: {0} (expected: started|healthy|success|complete)")]
    InvalidCondition(String),
    #[error("invalid port protocol: {0} (expected: tcp|udp)")]
    InvalidProtocol(String),
    #[error("invalid removal policy: {0} (expected: destroy|retain)")]
    InvalidRemovalPolicy(String),
}
