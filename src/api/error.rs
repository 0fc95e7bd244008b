use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use deadpool_redis::{CreatePoolError, PoolError, redis::RedisError};
use serde::Serialize;
use std::borrow::Cow;

use crate::ENV;

/// Errors surfaced over plain HTTP (the websocket upgrade and the health check).
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Unauthorized: {0}")]
    Unauthorized(Cow<'static, str>),
    #[error("Internal Server Error")]
    InternalServer,
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub message: Cow<'static, str>,
}

impl Error {
    pub fn unauthorized(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::Unauthorized(msg.into())
    }
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        match *self {
            Error::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Error::InternalServer => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let mut res = HttpResponse::build(self.status_code());

        res.insert_header(("Access-Control-Allow-Origin", ENV.frontend_url.as_str()));
        res.insert_header(("Access-Control-Allow-Credentials", "true"));

        match self {
            Error::Unauthorized(msg) => res.json(ErrorBody { message: msg.clone() }),
            Error::InternalServer => {
                res.json(ErrorBody { message: "Internal Server Error".into() })
            }
        }
    }
}

/// Failure category reported to socket clients in `error` events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    BadRequest,
    Unauthorized,
    NotFound,
    AlreadyExists,
    AlreadyAnswered,
    AlreadyInChat,
    InvalidState,
    TransientStoreFailure,
}

#[derive(thiserror::Error, Debug)]
pub enum SystemError {
    // jwt errors
    #[error("JWT Error")]
    JwtError(#[from] jsonwebtoken::errors::Error),
    // sqlx errors
    #[error("Database Error : {0}")]
    DatabaseError(Cow<'static, str>),
    // serde errors
    #[error("JSON Serialization/Deserialization Error")]
    JsonError(#[from] serde_json::Error),
    // redis errors
    #[error(transparent)]
    PoolInit(#[from] CreatePoolError),
    #[error("Redis pool error: {0}")]
    PoolGet(#[from] PoolError),
    #[error("Redis error")]
    RedisError(#[from] RedisError),
    // domain errors
    #[error("Bad Request: {0}")]
    BadRequest(Cow<'static, str>),
    #[error("Unauthorized: {0}")]
    Unauthorized(Cow<'static, str>),
    #[error("Not Found: {0}")]
    NotFound(Cow<'static, str>),
    #[error("Already Exists: {0}")]
    AlreadyExists(Cow<'static, str>),
    #[error("Already Answered: {0}")]
    AlreadyAnswered(Cow<'static, str>),
    #[error("Already In Chat: {0}")]
    AlreadyInChat(Cow<'static, str>),
    #[error("Invalid State: {0}")]
    InvalidState(Cow<'static, str>),
    #[error("Database Conflict: {0:?}")]
    Conflict(Option<DbErrorMeta>),
    #[error("Internal System Error: {0}")]
    InternalError(Box<dyn std::error::Error + Send + Sync>),
}

#[derive(Debug)]
pub struct DbErrorMeta {
    pub code: Option<String>,
    pub constraint: Option<String>,
    pub message: String,
}

fn conflict_message(meta: &Option<DbErrorMeta>) -> Cow<'static, str> {
    let Some(m) = meta else {
        return "Duplicate value".into();
    };

    let Some(constraint) = &m.constraint else {
        return "Duplicate value".into();
    };

    let field = constraint.split('_').next_back().unwrap_or("value");

    let mut chars = field.chars();
    let field = match chars.next() {
        Some(c) => c.to_uppercase().collect::<String>() + chars.as_str(),
        None => "Value".to_string(),
    };

    format!("{field} already exists").into()
}

impl SystemError {
    pub fn bad_request(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn not_found(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn unauthorized(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn already_exists(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::AlreadyExists(msg.into())
    }

    pub fn already_answered(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::AlreadyAnswered(msg.into())
    }

    pub fn already_in_chat(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::AlreadyInChat(msg.into())
    }

    pub fn invalid_state(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::InvalidState(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            SystemError::BadRequest(_) => ErrorKind::BadRequest,
            SystemError::Unauthorized(_) | SystemError::JwtError(_) => ErrorKind::Unauthorized,
            SystemError::NotFound(_) => ErrorKind::NotFound,
            SystemError::AlreadyExists(_) | SystemError::Conflict(_) => ErrorKind::AlreadyExists,
            SystemError::AlreadyAnswered(_) => ErrorKind::AlreadyAnswered,
            SystemError::AlreadyInChat(_) => ErrorKind::AlreadyInChat,
            SystemError::InvalidState(_) => ErrorKind::InvalidState,
            SystemError::DatabaseError(_)
            | SystemError::JsonError(_)
            | SystemError::PoolInit(_)
            | SystemError::PoolGet(_)
            | SystemError::RedisError(_)
            | SystemError::InternalError(_) => ErrorKind::TransientStoreFailure,
        }
    }

    /// Message safe to hand to a socket client. Store internals are never echoed.
    pub fn client_message(&self) -> Cow<'static, str> {
        match self {
            SystemError::BadRequest(msg)
            | SystemError::Unauthorized(msg)
            | SystemError::NotFound(msg)
            | SystemError::AlreadyExists(msg)
            | SystemError::AlreadyAnswered(msg)
            | SystemError::AlreadyInChat(msg)
            | SystemError::InvalidState(msg) => msg.clone(),
            SystemError::Conflict(meta) => conflict_message(meta),
            SystemError::JwtError(_) => "Invalid or expired token".into(),
            _ => {
                log::error!("Transient store failure: {:?}", self);
                "Temporary failure, please retry".into()
            }
        }
    }
}

impl From<SystemError> for Error {
    fn from(value: SystemError) -> Self {
        match value {
            SystemError::Unauthorized(msg) => Error::Unauthorized(msg),
            SystemError::JwtError(_) => Error::unauthorized("Invalid or expired token"),
            _ => {
                log::error!("Internal Server Error: {:?}", value);
                Error::InternalServer
            }
        }
    }
}

impl From<validator::ValidationErrors> for SystemError {
    fn from(err: validator::ValidationErrors) -> Self {
        SystemError::BadRequest(err.to_string().into())
    }
}

impl From<sqlx::Error> for SystemError {
    fn from(err: sqlx::Error) -> Self {
        log::error!("{:?}", err);
        if let sqlx::Error::Database(db_err) = &err {
            match db_err.code().as_deref() {
                Some("23505") => {
                    return SystemError::Conflict(Some(DbErrorMeta {
                        code: db_err.code().map(|s| s.to_string()),
                        constraint: db_err.constraint().map(|s| s.to_string()),
                        message: db_err.message().to_string(),
                    }));
                }
                _ => {
                    log::error!("Unhandled DB error: {:?}", db_err);
                    return SystemError::DatabaseError(db_err.message().to_string().into());
                }
            }
        }
        SystemError::InternalError(Box::new(err))
    }
}
