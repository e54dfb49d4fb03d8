//! Loaders for the plain-text resources the pruning tables are built from.

use std::collections::{BTreeSet, HashMap};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::debug;

use crate::error::{RazmetkaError, Result};

/// Surface form to closed list of labels.
pub type ExceptionLexicon = HashMap<String, Vec<String>>;

fn open<P: AsRef<Path>>(path: P) -> Result<BufReader<File>> {
    let path = path.as_ref();
    File::open(path)
        .map(BufReader::new)
        .map_err(|e| RazmetkaError::io(path, e))
}

/// Parse `key<TAB>value1,value2,...` lines. Lines without a tab are skipped;
/// a repeated key keeps its last list.
pub fn parse_exception_lexicon<R: BufRead>(reader: R) -> std::io::Result<ExceptionLexicon> {
    let mut lexicon = ExceptionLexicon::new();
    for line in reader.lines() {
        let line = line?;
        let line = line.trim_end_matches('\r');
        let Some((key, values)) = line.split_once('\t') else {
            continue;
        };
        let values: Vec<String> = values
            .split(',')
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .collect();
        lexicon.insert(key.to_string(), values);
    }
    Ok(lexicon)
}

/// Parse one label per line, skipping blank lines.
pub fn parse_tag_list<R: BufRead>(reader: R) -> std::io::Result<BTreeSet<String>> {
    let mut tags = BTreeSet::new();
    for line in reader.lines() {
        let line = line?;
        let tag = line.trim();
        if !tag.is_empty() {
            tags.insert(tag.to_string());
        }
    }
    Ok(tags)
}

/// Load an exception lexicon file.
pub fn load_exception_lexicon<P: AsRef<Path>>(path: P) -> Result<ExceptionLexicon> {
    let path = path.as_ref();
    let lexicon = parse_exception_lexicon(open(path)?).map_err(|e| RazmetkaError::io(path, e))?;
    debug!(path = %path.display(), entries = lexicon.len(), "loaded exception lexicon");
    Ok(lexicon)
}

/// Load a tag list file.
pub fn load_tag_list<P: AsRef<Path>>(path: P) -> Result<BTreeSet<String>> {
    let path = path.as_ref();
    let tags = parse_tag_list(open(path)?).map_err(|e| RazmetkaError::io(path, e))?;
    debug!(path = %path.display(), tags = tags.len(), "loaded tag list");
    Ok(tags)
}
