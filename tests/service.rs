// End-to-end tests over the JSON-lines transport with a fake guesser.

use std::{
    io::Write,
    path::{Path, PathBuf},
};

use g2p_hermes_rs::{
    Envelope, G2pError, G2pHermes, G2pTool, ServiceConfig, dictionary::Entry,
    messages::{ERROR_TOPIC, PHONEMES_TOPIC},
};
use serde_json::{Value, json};
use tempfile::NamedTempFile;

/// Spells each word letter by letter, `nbest` times.
struct SpellingTool;

impl G2pTool for SpellingTool {
    async fn guess(
        &self,
        _model_path: &Path,
        words: &[String],
        nbest: usize,
    ) -> Result<Vec<Entry>, G2pError> {
        Ok(words
            .iter()
            .flat_map(|w| {
                let letters: Vec<String> = w.chars().map(|c| c.to_uppercase().to_string()).collect();
                std::iter::repeat_n((w.clone(), letters), nbest)
            })
            .collect())
    }
}

fn dictionary(lines: &[&str]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    for line in lines {
        writeln!(file, "{}", line).unwrap();
    }
    file.flush().unwrap();
    file
}

fn config(dictionaries: Vec<(String, PathBuf)>, site_ids: &[&str]) -> ServiceConfig {
    ServiceConfig {
        models: vec![("spell".to_string(), PathBuf::from("spell.fst"))],
        dictionaries,
        site_ids: site_ids.iter().map(|s| s.to_string()).collect(),
        ..Default::default()
    }
}

async fn exchange(config: &ServiceConfig, inbound: &[Value]) -> Vec<Envelope> {
    let input: String = inbound.iter().map(|v| format!("{}\n", v)).collect();
    exchange_raw(config, input.as_bytes()).await
}

async fn exchange_raw(config: &ServiceConfig, input: &[u8]) -> Vec<Envelope> {
    let mut output = Vec::new();
    G2pHermes::with_tool(config, SpellingTool)
        .run(input, &mut output)
        .await
        .unwrap();
    String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

fn pronounce(payload: Value) -> Value {
    json!({"topic": "hermes/g2p/pronounce", "payload": payload})
}

#[tokio::test]
async fn lookup_and_guess_in_one_request() {
    let dict = dictionary(&["foo F O O", "bar B A R", "baz B A Z"]);
    let config = config(vec![("X".into(), dict.path().to_path_buf())], &[]);

    let replies = exchange(
        &config,
        &[pronounce(json!({
            "id": "r1",
            "words": ["foo", "qux"],
            "models": [],
            "numGuesses": 2,
            "siteId": "kitchen",
            "sessionId": "abc"
        }))],
    )
    .await;

    assert_eq!(replies.len(), 1);
    let reply = &replies[0];
    assert_eq!(reply.topic, PHONEMES_TOPIC);
    assert_eq!(reply.payload["id"], "r1");
    assert_eq!(reply.payload["siteId"], "kitchen");
    assert_eq!(reply.payload["sessionId"], "abc");
    assert_eq!(
        reply.payload["phonemes"]["foo"],
        json!([{"word": "foo", "phonemes": ["F", "O", "O"], "dictionaryId": "X"}])
    );
    assert_eq!(
        reply.payload["phonemes"]["qux"],
        json!([
            {"word": "qux", "phonemes": ["Q", "U", "X"], "modelId": "spell"},
            {"word": "qux", "phonemes": ["Q", "U", "X"], "modelId": "spell"}
        ])
    );
}

#[tokio::test]
async fn one_bad_request_does_not_stop_the_loop() {
    let dict = dictionary(&["foo F O O"]);
    let config = config(vec![("X".into(), dict.path().to_path_buf())], &[]);

    let replies = exchange(
        &config,
        &[
            json!("not an envelope"),
            pronounce(json!({"id": "1", "words": ["foo"], "models": ["nope"]})),
            pronounce(json!({"id": "2", "words": 17})),
            pronounce(json!({"id": "3", "words": ["foo"], "dictionaries": ["Y"]})),
            pronounce(json!({"id": "4", "words": ["foo"]})),
        ],
    )
    .await;

    let summary: Vec<_> = replies
        .iter()
        .map(|r| (r.topic.as_str(), r.payload["id"].as_str().unwrap()))
        .collect();
    assert_eq!(
        summary,
        vec![(PHONEMES_TOPIC, "1"), (ERROR_TOPIC, "3"), (PHONEMES_TOPIC, "4")]
    );

    // Bytes that are not UTF-8 are dropped like any other unreadable line.
    let mut input: Vec<u8> = Vec::new();
    writeln!(input, "{}", pronounce(json!({"id": "5", "words": ["foo"]}))).unwrap();
    input.extend_from_slice(b"\xff\xfe\n");
    writeln!(input, "{}", pronounce(json!({"id": "6", "words": ["foo"]}))).unwrap();
    input.extend_from_slice(b"\xc3 half a character\n");
    writeln!(input, "{}", pronounce(json!({"id": "7", "words": ["foo"]}))).unwrap();

    let ids: Vec<_> = exchange_raw(&config, &input)
        .await
        .iter()
        .map(|r| r.payload["id"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(ids, vec!["5", "6", "7"]);
}

#[tokio::test]
async fn unknown_model_error_names_the_model() {
    let config = config(vec![], &[]);
    let replies = exchange(
        &config,
        &[pronounce(json!({"id": "e", "words": ["b", "a"], "models": ["klingon"]}))],
    )
    .await;

    assert_eq!(replies[0].topic, ERROR_TOPIC);
    assert!(replies[0].payload["error"].as_str().unwrap().contains("klingon"));
    assert_eq!(replies[0].payload["context"], "b,a");
}

#[tokio::test]
async fn other_sites_get_no_reply() {
    let dict = dictionary(&["foo F O O"]);
    let config = config(vec![("X".into(), dict.path().to_path_buf())], &["attic"]);

    let replies = exchange(
        &config,
        &[
            pronounce(json!({"id": "1", "words": ["foo"], "siteId": "kitchen"})),
            pronounce(json!({"id": "2", "words": ["foo"], "siteId": "attic"})),
        ],
    )
    .await;

    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].payload["id"], "2");
}
