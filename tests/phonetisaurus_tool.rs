// Runs PhonetisaurusApply against shell scripts standing in for the real binary.
// Everything lives in one test so no other thread forks while a script is
// still open for writing.
#![cfg(unix)]

use std::{
    fs,
    os::unix::fs::PermissionsExt,
    path::{Path, PathBuf},
    time::Duration,
};

use g2p_hermes_rs::{G2pError, G2pTool, Guesser, PhonetisaurusApply};

fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn words(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn phonetisaurus_apply_contract() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("scratch.txt");

    // $1=--model $2=model $3=--word_list $4=list $5=--nbest $6=n
    let echo = script(
        dir.path(),
        "echo-g2p",
        &format!(
            "echo \"$4\" > {log}\n\
             while read -r w; do\n\
             i=0; while [ $i -lt \"$6\" ]; do printf '%s\\t%s %s\\n' \"$w\" \"$(basename \"$2\")\" \"$i\"; i=$((i+1)); done\n\
             printf '\\n'\n\
             done < \"$4\"",
            log = log.display()
        ),
    );
    let fail = script(dir.path(), "fail-g2p", "exit 3");
    let hang = script(dir.path(), "hang-g2p", "sleep 30");

    // Success: N-best lines come back in order and the word list is removed.
    let tool = PhonetisaurusApply::new(&echo, None);
    let guesses = tool
        .guess(Path::new("/models/en.fst"), &words(&["hello", "world"]), 2)
        .await
        .unwrap();
    assert_eq!(
        guesses,
        vec![
            ("hello".to_string(), words(&["en.fst", "0"])),
            ("hello".to_string(), words(&["en.fst", "1"])),
            ("world".to_string(), words(&["en.fst", "0"])),
            ("world".to_string(), words(&["en.fst", "1"])),
        ]
    );
    let word_list = fs::read_to_string(&log).unwrap();
    assert!(!Path::new(word_list.trim()).exists());

    // Through the guesser: model ids tag the results, later models win.
    let guesser = Guesser::new(
        vec![
            ("first".to_string(), PathBuf::from("/models/first.fst")),
            ("second".to_string(), PathBuf::from("/models/second.fst")),
        ],
        PhonetisaurusApply::new(&echo, Some(Duration::from_secs(10))),
    );
    let merged = guesser
        .guess_words(&words(&["hello"]), &[], 1)
        .await
        .unwrap();
    assert_eq!(merged["hello"].len(), 1);
    assert_eq!(merged["hello"][0].model_id(), Some("second"));
    assert_eq!(merged["hello"][0].phonemes, words(&["second.fst", "0"]));

    // Non-zero exit is a hard failure.
    let err = PhonetisaurusApply::new(&fail, None)
        .guess(Path::new("m.fst"), &words(&["x"]), 1)
        .await
        .unwrap_err();
    assert!(matches!(err, G2pError::ToolFailed { .. }), "{:?}", err);

    // A hung tool is cut off by the timeout.
    let err = PhonetisaurusApply::new(&hang, Some(Duration::from_millis(200)))
        .guess(Path::new("m.fst"), &words(&["x"]), 1)
        .await
        .unwrap_err();
    assert!(matches!(err, G2pError::ToolTimeout { .. }), "{:?}", err);

    // A missing program surfaces as an I/O error.
    let err = PhonetisaurusApply::new(dir.path().join("does-not-exist"), None)
        .guess(Path::new("m.fst"), &words(&["x"]), 1)
        .await
        .unwrap_err();
    assert!(matches!(err, G2pError::Io(_)), "{:?}", err);
}
