// resolver.rs
use std::{
    any::Any,
    collections::{BTreeMap, HashSet},
    panic::AssertUnwindSafe,
    sync::Arc,
};

use futures::FutureExt;
use log::{debug, error};

use crate::{
    dictionary::DictionaryStore,
    error::G2pError,
    guesser::{G2pTool, Guesser},
    messages::{G2pErrorMessage, G2pPhonemes, G2pResponse, PronounceRequest, Pronunciation},
};

/// Turns one pronounce request into exactly one response.
pub struct Resolver<T> {
    store: Arc<DictionaryStore>,
    guesser: Guesser<T>,
}

/// Distinct `words` without a pronunciation yet, in request order.
fn residual_words(words: &[String], found: &BTreeMap<String, Vec<Pronunciation>>) -> Vec<String> {
    let mut seen = HashSet::new();
    words
        .iter()
        .filter(|w| !found.contains_key(*w) && seen.insert(w.as_str()))
        .cloned()
        .collect()
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

impl<T: G2pTool> Resolver<T> {
    pub fn new(store: Arc<DictionaryStore>, guesser: Guesser<T>) -> Self {
        Self { store, guesser }
    }

    pub fn store(&self) -> &Arc<DictionaryStore> {
        &self.store
    }

    pub fn guesser(&self) -> &Guesser<T> {
        &self.guesser
    }

    /// Never fails: every fault becomes a `G2pResponse::Error` carrying the
    /// request words as context.
    pub async fn resolve(&self, request: &PronounceRequest) -> G2pResponse {
        debug!("<- {:?}", request);

        let result = match AssertUnwindSafe(self.lookup_and_guess(request))
            .catch_unwind()
            .await
        {
            Ok(result) => result,
            Err(panic) => Err(G2pError::Common(format!(
                "internal error: {}",
                panic_message(panic.as_ref())
            ))),
        };

        match result {
            Ok(phonemes) => G2pResponse::Phonemes(G2pPhonemes {
                id: request.id.clone(),
                phonemes,
                site_id: request.site_id.clone(),
                session_id: request.session_id.clone(),
            }),
            Err(e) => {
                error!("handle_pronounce: {}", e);
                G2pResponse::Error(G2pErrorMessage {
                    id: request.id.clone(),
                    error: e.to_string(),
                    context: request.words.join(","),
                    site_id: request.site_id.clone(),
                    session_id: request.session_id.clone(),
                })
            }
        }
    }

    async fn lookup_and_guess(
        &self,
        request: &PronounceRequest,
    ) -> Result<BTreeMap<String, Vec<Pronunciation>>, G2pError> {
        let dictionary_ids = request.dictionary_ids.as_deref();
        let all_dictionaries = dictionary_ids.is_none_or(|ids| ids.is_empty());

        let mut phonemes = if all_dictionaries && self.store.is_empty() {
            BTreeMap::new()
        } else {
            self.store.lookup(&request.words, dictionary_ids)?
        };

        if let Some(model_ids) = &request.model_ids {
            let residual = residual_words(&request.words, &phonemes);
            if !residual.is_empty() {
                let guesses = self
                    .guesser
                    .guess_words(&residual, model_ids, request.num_guesses)
                    .await?;
                // Guessed words are a subset of the residual, so no key is replaced.
                phonemes.extend(guesses);
            }
        }

        Ok(phonemes)
    }
}
