#![allow(dead_code)]

use std::io;
use std::string::FromUtf8Error;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    // Wire-format errors. Inbound packets that trip these are dropped
    // silently by the engine and only counted for diagnostics.
    #[error("insufficient data for base length type")]
    ErrBaseLen,
    #[error("insufficient data for calculated length type")]
    ErrCalcLen,
    #[error("segment prefix is reserved")]
    ErrReserved,
    #[error("too many compression pointers")]
    ErrTooManyPointers,
    #[error("invalid compression pointer")]
    ErrInvalidPtr,
    #[error("name too long")]
    ErrNameTooLong,
    #[error("zero length segment")]
    ErrZeroSegLen,
    #[error("segment length too long")]
    ErrSegTooLong,
    #[error("character string exceeds maximum length")]
    ErrStringTooLong,
    #[error("insufficient data for resource body length")]
    ErrResourceLen,
    #[error("resource length too long")]
    ErrResTooLong,
    #[error("too many questions")]
    ErrTooManyQuestions,
    #[error("too many answers")]
    ErrTooManyAnswers,
    #[error("too many authorities")]
    ErrTooManyAuthorities,
    #[error("too many additionals")]
    ErrTooManyAdditionals,
    #[error("nil resource body")]
    ErrNilResourceBody,

    // Session errors.
    #[error("engine closed")]
    ErrEngineClosed,
    #[error("transport failure: {0}")]
    ErrTransport(String),
    #[error("device listeners already in place")]
    ErrListenersAlreadyInstalled,
    #[error("service record is missing a name")]
    ErrMissingServiceName,

    #[error("{0}")]
    Other(String),
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::ErrTransport(e.to_string())
    }
}

impl From<FromUtf8Error> for Error {
    fn from(e: FromUtf8Error) -> Self {
        Error::Other(e.to_string())
    }
}
