use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("the front end crashed: {0}")]
    Crashed(String),
    #[error("no known pass step named {0}")]
    UnknownPassStep(String),
}
