// guesser.rs
use std::{
    collections::{BTreeMap, HashSet},
    future::Future,
    io::Write,
    path::{Path, PathBuf},
    process::Stdio,
    time::Duration,
};

use log::{debug, warn};
use tempfile::Builder;
use tokio::process::Command;

use crate::{dictionary::Entry, error::G2pError, messages::Pronunciation};

pub const DEFAULT_G2P_PROGRAM: &str = "phonetisaurus-apply";

/// Something that can guess pronunciations for a batch of words with one model.
pub trait G2pTool {
    /// Returns one `(word, phonemes)` pair per guess, best first for each word.
    fn guess(
        &self,
        model_path: &Path,
        words: &[String],
        nbest: usize,
    ) -> impl Future<Output = Result<Vec<Entry>, G2pError>> + Send;
}

/// Parses `WORD P1 P2 ...` lines. Blank lines are skipped; nothing else is filtered.
pub fn parse_guess_output(text: &str) -> Vec<Entry> {
    text.lines()
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let word = parts.next()?;
            Some((word.to_string(), parts.map(|p| p.to_string()).collect()))
        })
        .collect()
}

/// Runs `phonetisaurus-apply` (or a compatible program) as a subprocess.
#[derive(Debug, Clone)]
pub struct PhonetisaurusApply {
    program: PathBuf,
    timeout: Option<Duration>,
}

impl Default for PhonetisaurusApply {
    fn default() -> Self {
        Self::new(DEFAULT_G2P_PROGRAM, None)
    }
}

impl PhonetisaurusApply {
    /// `timeout` bounds each invocation; `None` waits for the tool forever.
    pub fn new<P: Into<PathBuf>>(program: P, timeout: Option<Duration>) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }
}

impl G2pTool for PhonetisaurusApply {
    async fn guess(
        &self,
        model_path: &Path,
        words: &[String],
        nbest: usize,
    ) -> Result<Vec<Entry>, G2pError> {
        // Both scratch files are removed when dropped, on every return path.
        let mut word_list = Builder::new().suffix(".txt").tempfile()?;
        for word in words {
            writeln!(word_list, "{}", word)?;
        }
        word_list.flush()?;
        let pronounce_file = Builder::new().suffix(".txt").tempfile()?;

        let mut command = Command::new(&self.program);
        command
            .arg("--model")
            .arg(model_path)
            .arg("--word_list")
            .arg(word_list.path())
            .arg("--nbest")
            .arg(nbest.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::from(pronounce_file.reopen()?))
            .kill_on_drop(true);
        debug!("{:?}", command);

        let program = self.program.display().to_string();
        let mut child = command.spawn()?;
        let status = match self.timeout {
            Some(after) => match tokio::time::timeout(after, child.wait()).await {
                Ok(status) => status?,
                Err(_) => {
                    if let Err(e) = child.kill().await {
                        warn!("failed to kill {}: {}", program, e);
                    }
                    return Err(G2pError::ToolTimeout { program, after });
                }
            },
            None => child.wait().await?,
        };
        if !status.success() {
            return Err(G2pError::ToolFailed { program, status });
        }

        let output = tokio::fs::read(pronounce_file.path()).await?;
        Ok(parse_guess_output(&String::from_utf8_lossy(&output)))
    }
}

/// Registered G2P models and the tool used to run them.
pub struct Guesser<T> {
    models: Vec<(String, PathBuf)>,
    tool: T,
}

impl<T: G2pTool> Guesser<T> {
    pub fn new(models: Vec<(String, PathBuf)>, tool: T) -> Self {
        Self { models, tool }
    }

    pub fn models(&self) -> &[(String, PathBuf)] {
        &self.models
    }

    pub fn tool(&self) -> &T {
        &self.tool
    }

    fn model_path(&self, model_id: &str) -> Result<&Path, G2pError> {
        self.models
            .iter()
            .find(|(id, _)| id == model_id)
            .map(|(_, path)| path.as_path())
            .ok_or_else(|| G2pError::UnknownModel(model_id.to_string()))
    }

    /// Guesses pronunciations for `words` with each model in `model_ids`
    /// (empty means every registered model, in registration order).
    ///
    /// All guesses one model makes for a word are kept. When several models
    /// are consulted, a later model's guesses for a word replace the earlier
    /// model's. Any tool failure fails the whole call.
    pub async fn guess_words(
        &self,
        words: &[String],
        model_ids: &[String],
        num_guesses: usize,
    ) -> Result<BTreeMap<String, Vec<Pronunciation>>, G2pError> {
        let selected: Vec<(&str, &Path)> = if model_ids.is_empty() {
            self.models
                .iter()
                .map(|(id, path)| (id.as_str(), path.as_path()))
                .collect()
        } else {
            model_ids
                .iter()
                .map(|id| Ok((id.as_str(), self.model_path(id)?)))
                .collect::<Result<_, G2pError>>()?
        };

        let requested: HashSet<&str> = words.iter().map(String::as_str).collect();
        let mut guesses = BTreeMap::new();
        for (model_id, model_path) in selected {
            debug!(
                "Guessing {} word(s) with {} ({})",
                words.len(),
                model_id,
                model_path.display()
            );
            let mut model_guesses: BTreeMap<String, Vec<Pronunciation>> = BTreeMap::new();
            for (word, phonemes) in self.tool.guess(model_path, words, num_guesses).await? {
                if !requested.contains(word.as_str()) {
                    debug!("Ignoring guess for unrequested word {:?}", word);
                    continue;
                }
                let pronunciation = Pronunciation::from_model(&word, model_id, phonemes);
                model_guesses.entry(word).or_default().push(pronunciation);
            }
            guesses.extend(model_guesses);
        }
        Ok(guesses)
    }
}
