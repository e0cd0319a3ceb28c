use std::sync::Arc;

use log::{debug, info};
use tokio::io::{AsyncBufRead, AsyncWrite};

pub mod config;
pub mod dictionary;
mod error;
pub mod guesser;
pub mod handler;
pub mod messages;
pub mod resolver;
pub mod transport;
pub mod watcher;

pub use config::{CliArgs, ServiceConfig};
pub use dictionary::{DictionaryIndex, DictionaryStore};
pub use error::{G2pError, LineError};
pub use guesser::{G2pTool, Guesser, PhonetisaurusApply};
pub use handler::{Envelope, RequestHandler};
pub use messages::{
    G2pErrorMessage, G2pPhonemes, G2pResponse, PronounceRequest, Pronunciation,
    PronunciationSource,
};
pub use resolver::Resolver;
pub use watcher::ReloadWatcher;

/// The assembled service: request handling plus the optional dictionary
/// reload watcher.
pub struct G2pHermes<T> {
    handler: RequestHandler<T>,
    watcher: Option<ReloadWatcher>,
}

impl G2pHermes<PhonetisaurusApply> {
    /// Builds the service around the phonetisaurus subprocess guesser.
    pub fn new(config: &ServiceConfig) -> Self {
        let tool = PhonetisaurusApply::new(config.g2p_program.clone(), config.g2p_timeout);
        Self::with_tool(config, tool)
    }
}

impl<T: G2pTool> G2pHermes<T> {
    pub fn with_tool(config: &ServiceConfig, tool: T) -> Self {
        info!("Models: {:?}", config.models);
        info!("Dictionaries: {:?}", config.dictionaries);

        let store = Arc::new(DictionaryStore::new(config.dictionaries.clone()));
        let watcher = ReloadWatcher::new(config.reload_interval, store.clone());
        let resolver = Resolver::new(store, Guesser::new(config.models.clone(), tool));

        Self {
            handler: RequestHandler::new(resolver, config.site_ids.clone()),
            watcher,
        }
    }

    pub fn handler(&self) -> &RequestHandler<T> {
        &self.handler
    }

    /// Starts the reload watcher (if configured) and serves envelopes read
    /// from `reader` until EOF, writing replies to `writer`.
    pub async fn run<R, W>(self, reader: R, writer: W) -> Result<(), G2pError>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let watcher = self.watcher.map(ReloadWatcher::spawn);
        let envelopes = transport::read_envelopes(reader);
        let result = transport::serve(&self.handler, envelopes, writer).await;
        if let Some(watcher) = watcher {
            watcher.abort();
        }
        debug!("Shutting down");
        result
    }
}
