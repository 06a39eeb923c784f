//! Time-ordered 64-bit ids.
//!
//! Layout, most significant bits first: 42 bits of milliseconds since the epoch, 10 bits of
//! client id, 12 bits of sequence. Sorting ids sorts them by creation time.

use derive_where::derive_where;
use serde::{Deserialize, Serialize};
use std::{
    fmt::{Display, Formatter},
    marker::PhantomData,
};
use thiserror::Error;
use time::{Duration, UtcDateTime};

pub const TIMESTAMP_OFFSET: u64 = 22;
pub const TIMESTAMP_LENGTH: u64 = 42;

pub const CLIENT_ID_OFFSET: u64 = 12;
pub const CLIENT_ID_LENGTH: u64 = 10;

pub const SEQUENCE_OFFSET: u64 = 0;
pub const SEQUENCE_LENGTH: u64 = 12;

const fn max_value(length: u64) -> u64 {
    (1 << length) - 1
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Error)]
pub enum SnowflakeTimestampError {
    #[error("Specified time was before the snowflake epoch.")]
    TimeBeforeEpoch,
    #[error("Resulting timestamp uses too many bits.")]
    TimestampTooLarge,
}

pub trait Epoch {
    const EPOCH_TIME: UtcDateTime;
}

pub fn millis_since_epoch<SnowflakeEpoch: Epoch>(
    time: UtcDateTime,
) -> Result<u64, SnowflakeTimestampError> {
    let millis = (time - SnowflakeEpoch::EPOCH_TIME).whole_milliseconds();
    let millis = u64::try_from(millis).map_err(|_| SnowflakeTimestampError::TimeBeforeEpoch)?;

    if millis > max_value(TIMESTAMP_LENGTH) {
        return Err(SnowflakeTimestampError::TimestampTooLarge);
    }
    Ok(millis)
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("Client id was out of range: {0}")]
pub struct ClientIdOutOfRangeError(u16);

/// Distinguishes ids minted by different client processes within the same millisecond.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct ClientId(u16);

impl ClientId {
    #[must_use]
    pub fn new(id: u16) -> Option<Self> {
        (u64::from(id) <= max_value(CLIENT_ID_LENGTH)).then_some(Self(id))
    }

    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn random() -> Self {
        Self(rand::random_range(0..=max_value(CLIENT_ID_LENGTH)) as u16)
    }

    #[must_use]
    pub fn get(self) -> u16 {
        self.0
    }
}

impl TryFrom<u16> for ClientId {
    type Error = ClientIdOutOfRangeError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(ClientIdOutOfRangeError(value))
    }
}

#[derive_where(
    Copy,
    Clone,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Debug,
    Default,
    Hash,
    Serialize,
    Deserialize
)]
#[serde(transparent)]
pub struct Snowflake<SnowflakeEpoch>(u64, #[serde(skip)] PhantomData<SnowflakeEpoch>);

impl<SnowflakeEpoch> Snowflake<SnowflakeEpoch> {
    #[must_use]
    pub fn new(inner: u64) -> Self {
        Self(inner, PhantomData)
    }

    /// Returns `None` if `millis` does not fit the timestamp bits.
    #[must_use]
    pub fn from_parts(millis: u64, client_id: ClientId, sequence: u16) -> Option<Self> {
        if millis > max_value(TIMESTAMP_LENGTH) {
            return None;
        }
        let snowflake = millis << TIMESTAMP_OFFSET
            | u64::from(client_id.get()) << CLIENT_ID_OFFSET
            | (u64::from(sequence) & max_value(SEQUENCE_LENGTH)) << SEQUENCE_OFFSET;

        Some(Self::new(snowflake))
    }

    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }

    #[must_use]
    pub fn timestamp_millis(self) -> u64 {
        self.0 >> TIMESTAMP_OFFSET
    }

    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn client_id(self) -> ClientId {
        ClientId(((self.0 >> CLIENT_ID_OFFSET) & max_value(CLIENT_ID_LENGTH)) as u16)
    }

    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn sequence(self) -> u16 {
        ((self.0 >> SEQUENCE_OFFSET) & max_value(SEQUENCE_LENGTH)) as u16
    }

    #[must_use]
    pub fn created_at(self) -> UtcDateTime
    where
        SnowflakeEpoch: Epoch,
    {
        SnowflakeEpoch::EPOCH_TIME + Duration::milliseconds(self.timestamp_millis().cast_signed())
    }
}

impl<SnowflakeEpoch> Display for Snowflake<SnowflakeEpoch> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl<SnowflakeEpoch> From<u64> for Snowflake<SnowflakeEpoch> {
    fn from(value: u64) -> Self {
        Self::new(value)
    }
}

impl<SnowflakeEpoch> From<Snowflake<SnowflakeEpoch>> for u64 {
    fn from(value: Snowflake<SnowflakeEpoch>) -> Self {
        value.get()
    }
}

/// Mints strictly increasing snowflakes for one client.
///
/// A clock that stands still or runs backwards advances the sequence of the last issued
/// millisecond instead; an exhausted sequence borrows the following millisecond.
#[derive_where(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub struct SnowflakeGenerator<SnowflakeEpoch> {
    client_id: ClientId,
    last: Option<(u64, u16)>,
    phantom_data: PhantomData<SnowflakeEpoch>,
}

impl<SnowflakeEpoch> SnowflakeGenerator<SnowflakeEpoch> {
    #[must_use]
    pub fn new(client_id: ClientId) -> Self {
        Self {
            client_id,
            last: None,
            phantom_data: PhantomData,
        }
    }

    #[must_use]
    pub fn client_id(self) -> ClientId {
        self.client_id
    }

    pub fn generate_at(
        &mut self,
        time: UtcDateTime,
    ) -> Result<Snowflake<SnowflakeEpoch>, SnowflakeTimestampError>
    where
        SnowflakeEpoch: Epoch,
    {
        let millis = millis_since_epoch::<SnowflakeEpoch>(time)?;

        let (millis, sequence) = match self.last {
            Some((last_millis, last_sequence)) if millis <= last_millis => {
                if u64::from(last_sequence) == max_value(SEQUENCE_LENGTH) {
                    (last_millis + 1, 0)
                } else {
                    (last_millis, last_sequence + 1)
                }
            }
            _ => (millis, 0),
        };

        let snowflake = Snowflake::from_parts(millis, self.client_id, sequence)
            .ok_or(SnowflakeTimestampError::TimestampTooLarge)?;
        self.last = Some((millis, sequence));

        Ok(snowflake)
    }

    pub fn generate(&mut self) -> Result<Snowflake<SnowflakeEpoch>, SnowflakeTimestampError>
    where
        SnowflakeEpoch: Epoch,
    {
        self.generate_at(UtcDateTime::now())
    }
}
