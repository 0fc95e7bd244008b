use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::api::error;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum TypeClaims {
    RefreshToken,
    AccessToken,
}

/// Claims issued by the account service. Only access tokens open a socket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub iat: u64,
    pub exp: u64,
    pub jti: Option<Uuid>,
    pub _type: Option<TypeClaims>,
}

impl Claims {
    pub fn decode(token: &str, secret: &[u8]) -> Result<Self, error::SystemError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.validate_nbf = false;
        let token_data = decode::<Self>(token, &DecodingKey::from_secret(secret), &validation)?;
        Ok(token_data.claims)
    }

    /// Resolves the user behind a bearer token, rejecting refresh tokens.
    pub fn authenticate(token: &str, secret: &[u8]) -> Result<Uuid, error::SystemError> {
        let claims = Self::decode(token, secret)?;
        if claims._type.as_ref() != Some(&TypeClaims::AccessToken) {
            return Err(error::SystemError::unauthorized("Only access tokens are accepted"));
        }
        Ok(claims.sub)
    }
}

pub fn validate_payload<T: Validate>(payload: &T) -> Result<(), error::SystemError> {
    payload.validate()?;
    Ok(())
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// The only place a timestamp is truncated to a day. All streak arithmetic
/// compares the dates produced here.
pub fn calendar_day(at: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    at.with_timezone(&offset).date_naive()
}

/// Unordered pair of users stored in canonical (low, high) order, so (a, b)
/// and (b, a) address the same record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UserPair {
    pub low: Uuid,
    pub high: Uuid,
}

impl UserPair {
    pub fn new(a: Uuid, b: Uuid) -> Self {
        if a <= b { UserPair { low: a, high: b } } else { UserPair { low: b, high: a } }
    }
}
