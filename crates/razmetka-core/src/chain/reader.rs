//! Streaming reader for tab-separated chain files.
//!
//! A line holding `token<TAB>label` or `token<TAB>features<TAB>label` adds a
//! position to the current sentence (features are comma separated). Any
//! other line, blank or not, closes the sentence.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::debug;

use crate::chain::Chain;
use crate::error::{RazmetkaError, Result};

/// Iterator over the sentences of a chain file.
pub struct ChainReader<R> {
    reader: R,
    line: String,
    done: bool,
}

impl<R: BufRead> ChainReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: String::new(),
            done: false,
        }
    }

    fn read_sentence(&mut self) -> std::io::Result<Option<Chain>> {
        let mut chain = Chain::default();
        loop {
            self.line.clear();
            if self.reader.read_line(&mut self.line)? == 0 {
                self.done = true;
                return Ok((!chain.is_empty()).then_some(chain));
            }
            let line = self.line.trim_end_matches(['\n', '\r']);
            match parse_position(line) {
                Some((token, features, label)) => chain.push(token, features, label),
                None if chain.is_empty() => continue,
                None => return Ok(Some(chain)),
            }
        }
    }
}

impl ChainReader<BufReader<File>> {
    /// Open a chain file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| RazmetkaError::io(path, e))?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> Iterator for ChainReader<R> {
    type Item = std::io::Result<Chain>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        self.read_sentence().transpose()
    }
}

fn parse_position(line: &str) -> Option<(String, Vec<String>, String)> {
    let parts: Vec<&str> = line.split('\t').collect();
    match parts.as_slice() {
        [token, label] => Some((token.to_string(), Vec::new(), label.to_string())),
        [token, features, label] => {
            let features = features
                .split(',')
                .filter(|f| !f.is_empty())
                .map(str::to_string)
                .collect();
            Some((token.to_string(), features, label.to_string()))
        }
        _ => None,
    }
}

/// Read at most `max_chains` sentences from the file at `path`.
pub fn read_chains<P: AsRef<Path>>(path: P, max_chains: usize) -> Result<Vec<Chain>> {
    let path = path.as_ref();
    let mut chains = Vec::new();
    for chain in ChainReader::open(path)?.take(max_chains) {
        chains.push(chain.map_err(|e| RazmetkaError::io(path, e))?);
    }
    debug!(path = %path.display(), chains = chains.len(), "read chain file");
    Ok(chains)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn read_all(text: &str) -> Vec<Chain> {
        ChainReader::new(Cursor::new(text))
            .collect::<std::io::Result<Vec<_>>>()
            .unwrap()
    }

    #[test]
    fn test_two_and_three_field_lines() {
        let chains = read_all("кот\tЖ,S@ЕД@ИМ\tS@ЕД@ИМ\nбежит\tV@НАСТ\n\n");
        assert_eq!(chains.len(), 1);
        let chain = &chains[0];
        assert_eq!(chain.tokens(), ["кот", "бежит"]);
        assert_eq!(chain.features()[0], ["Ж", "S@ЕД@ИМ"]);
        assert!(chain.features()[1].is_empty());
        assert_eq!(chain.labels(), ["S@ЕД@ИМ", "V@НАСТ"]);
    }

    #[test]
    fn test_malformed_line_ends_sentence() {
        let text = "a\tX\nbroken line\nb\tY\nc\tf\tZ\n";
        let chains = read_all(text);
        assert_eq!(chains.len(), 2);
        assert_eq!(chains[0].tokens(), ["a"]);
        assert_eq!(chains[1].tokens(), ["b", "c"]);
    }

    #[test]
    fn test_one_sentence_per_boundary() {
        let text = "a\tX\n\n\n\nb\tY\none\ttwo\tthree\tfour\n\nc\tZ";
        let chains = read_all(text);
        assert_eq!(chains.len(), 3);
        assert_eq!(chains[2].labels(), ["Z"]);
    }

    #[test]
    fn test_crlf_and_empty_feature_items() {
        let chains = read_all("a\tf1,,f2\tX\r\n\r\n");
        assert_eq!(chains.len(), 1);
        assert_eq!(chains[0].features()[0], ["f1", "f2"]);
        assert_eq!(chains[0].labels(), ["X"]);
    }

    #[test]
    fn test_read_chains_respects_limit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.txt");
        std::fs::write(&path, "a\tX\n\nb\tY\n\nc\tZ\n").unwrap();
        assert_eq!(read_chains(&path, 2).unwrap().len(), 2);
        assert_eq!(read_chains(&path, 10).unwrap().len(), 3);
    }

    #[test]
    fn test_missing_file_is_typed_error() {
        let err = read_chains("/definitely/not/here.txt", 10).unwrap_err();
        assert!(matches!(err, RazmetkaError::Io { .. }));
    }
}
