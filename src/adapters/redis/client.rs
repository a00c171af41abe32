//! Redis client implementation

use crate::adapters::retry::{connect_with_retry, RetryPolicy};
use crate::adapters::traits::{BlockMode, Dequeued, PatientQueue};
use crate::config::RedisConfig;
use crate::domain::errors::ConnectionError;
use ::redis::aio::MultiplexedConnection;
use async_trait::async_trait;
use std::fmt;
use tokio::sync::watch;
use url::Url;

const SERVICE: &str = "Redis";

/// Port used when the URL does not name one
pub const DEFAULT_REDIS_PORT: u16 = 6379;

/// Host and port of the queue server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedisAddress {
    pub host: String,
    pub port: u16,
}

impl RedisAddress {
    /// Parse `redis://host:port`
    ///
    /// The scheme is optional and the port defaults to 6379. Credentials,
    /// database index and query parameters are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError::InvalidAddress`] if no host can be found.
    pub fn parse(url: &str) -> Result<Self, ConnectionError> {
        let invalid = |message: String| ConnectionError::InvalidAddress {
            service: SERVICE.to_string(),
            message,
        };

        let trimmed = url.trim();
        let with_scheme = if trimmed.contains("://") {
            trimmed.to_string()
        } else {
            format!("redis://{trimmed}")
        };

        let parsed = Url::parse(&with_scheme).map_err(|e| invalid(format!("{url}: {e}")))?;
        let host = parsed
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| invalid(format!("{url}: missing host")))?;

        Ok(Self {
            host: host.to_string(),
            port: parsed.port().unwrap_or(DEFAULT_REDIS_PORT),
        })
    }

    /// URL handed to the redis client
    pub fn connection_url(&self) -> String {
        format!("redis://{}:{}/", self.host, self.port)
    }
}

impl fmt::Display for RedisAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Single Redis connection used for the waiting room
pub struct RedisQueue {
    connection: Option<MultiplexedConnection>,
    address: RedisAddress,
}

impl RedisQueue {
    /// Connect to Redis, retrying per `policy`
    ///
    /// Each attempt opens a connection and sends `PING`; the handle is only
    /// returned once the server answered.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError::InvalidAddress`] for an unusable URL,
    /// [`ConnectionError::Exhausted`] once every attempt failed and
    /// [`ConnectionError::Interrupted`] if `shutdown` fires first.
    pub async fn connect(
        config: &RedisConfig,
        policy: &RetryPolicy,
        shutdown: watch::Receiver<bool>,
    ) -> Result<Self, ConnectionError> {
        let address = RedisAddress::parse(&config.url)?;
        let client = ::redis::Client::open(address.connection_url().as_str()).map_err(|e| {
            ConnectionError::InvalidAddress {
                service: SERVICE.to_string(),
                message: e.to_string(),
            }
        })?;

        let connection = connect_with_retry(SERVICE, policy, shutdown, |_| {
            let client = client.clone();
            async move {
                let mut connection = client.get_multiplexed_async_connection().await?;
                ::redis::cmd("PING")
                    .query_async::<String>(&mut connection)
                    .await?;
                Ok::<_, ::redis::RedisError>(connection)
            }
        })
        .await?;

        tracing::info!(host = %address.host, port = address.port, "Connected to Redis at {}", address);

        Ok(Self {
            connection: Some(connection),
            address,
        })
    }

    /// Address this queue is connected to
    pub fn address(&self) -> &RedisAddress {
        &self.address
    }

    fn connection(&mut self) -> Result<&mut MultiplexedConnection, ConnectionError> {
        self.connection
            .as_mut()
            .ok_or_else(|| ConnectionError::Closed(SERVICE.to_string()))
    }

    /// Number of patients waiting in `queue_name` (`LLEN`)
    pub async fn queue_length(&mut self, queue_name: &str) -> Result<u64, ConnectionError> {
        let connection = self.connection()?;
        ::redis::cmd("LLEN")
            .arg(queue_name)
            .query_async::<u64>(connection)
            .await
            .map_err(lost)
    }

    /// Push a payload the way the producer does (`LPUSH`)
    ///
    /// Returns the queue length after the push.
    pub async fn enqueue(
        &mut self,
        queue_name: &str,
        payload: &str,
    ) -> Result<u64, ConnectionError> {
        let connection = self.connection()?;
        ::redis::cmd("LPUSH")
            .arg(queue_name)
            .arg(payload)
            .query_async::<u64>(connection)
            .await
            .map_err(lost)
    }
}

fn lost(e: ::redis::RedisError) -> ConnectionError {
    ConnectionError::Lost {
        service: SERVICE.to_string(),
        message: e.to_string(),
    }
}

#[async_trait]
impl PatientQueue for RedisQueue {
    async fn dequeue(
        &mut self,
        queue_name: &str,
        block: BlockMode,
    ) -> Result<Option<Dequeued>, ConnectionError> {
        let connection = self.connection()?;
        let reply: Option<(String, String)> = ::redis::cmd("BRPOP")
            .arg(queue_name)
            .arg(block.as_brpop_timeout())
            .query_async(connection)
            .await
            .map_err(lost)?;

        Ok(reply.map(|(queue, payload)| Dequeued { queue, payload }))
    }

    async fn close(&mut self) {
        if self.connection.take().is_some() {
            tracing::debug!(address = %self.address, "Redis connection closed");
        }
    }
}
