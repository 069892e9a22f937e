use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Dbus error: {0}")]
    DbusError(#[from] zbus::Error),
    #[error("call was cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, Error>;
