// handler.rs
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    error::G2pError,
    guesser::G2pTool,
    messages::{DEFAULT_SITE_ID, PRONOUNCE_TOPIC, PronounceRequest},
    resolver::Resolver,
};

/// A message as it travels over the transport: topic plus JSON payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub topic: String,
    pub payload: Value,
}

/// Maps inbound envelopes to resolver calls, filtering by site id.
pub struct RequestHandler<T> {
    resolver: Resolver<T>,
    site_ids: Vec<String>,
}

impl<T: G2pTool> RequestHandler<T> {
    /// An empty `site_ids` accepts every site.
    pub fn new(resolver: Resolver<T>, site_ids: Vec<String>) -> Self {
        Self { resolver, site_ids }
    }

    pub fn resolver(&self) -> &Resolver<T> {
        &self.resolver
    }

    pub fn topics(&self) -> &'static [&'static str] {
        &[PRONOUNCE_TOPIC]
    }

    fn check_site_id(&self, payload: &Value) -> bool {
        if self.site_ids.is_empty() {
            return true;
        }
        let site_id = payload
            .get("siteId")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_SITE_ID);
        self.site_ids.iter().any(|s| s == site_id)
    }

    /// Returns the reply to publish, or `None` for foreign topics and
    /// sites outside the allow-list. A payload that is not a valid request
    /// is returned as an error for the transport to deal with.
    pub async fn on_message(&self, envelope: Envelope) -> Result<Option<Envelope>, G2pError> {
        if envelope.topic != PRONOUNCE_TOPIC {
            return Ok(None);
        }
        if !self.check_site_id(&envelope.payload) {
            return Ok(None);
        }

        let request: PronounceRequest = serde_json::from_value(envelope.payload)?;
        let response = self.resolver.resolve(&request).await;

        let reply = Envelope {
            topic: response.topic().to_string(),
            payload: serde_json::to_value(&response)?,
        };
        debug!("-> {} {}", reply.topic, reply.payload);
        Ok(Some(reply))
    }
}
