/// Rejection of an incoming registration or attendance payload.
///
/// The client-facing message is fixed; `missing` only feeds logs.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Missing required fields")]
    MissingFields { missing: Vec<&'static str> },
}

impl ValidationError {
    pub fn missing(&self) -> &[&'static str] {
        match self {
            Self::MissingFields { missing } => missing,
        }
    }
}
