//! Stemming algorithms for reducing words to their root forms.

/// Trait for stemming algorithms.
pub trait Stemmer: Send + Sync {
    /// Stem a lower-cased word to its root form.
    fn stem(&self, word: &str) -> String;

    /// Get the name of this stemmer.
    fn name(&self) -> &'static str;
}

/// Light English suffix stemmer.
///
/// Strips plural and common verbal suffixes. Words of three characters or
/// fewer are left alone.
#[derive(Debug, Clone, Default)]
pub struct SuffixStemmer;

impl SuffixStemmer {
    /// Create a new suffix stemmer.
    pub fn new() -> Self {
        SuffixStemmer
    }
}

impl Stemmer for SuffixStemmer {
    fn stem(&self, word: &str) -> String {
        if word.chars().count() <= 3 || !word.is_ascii() {
            return word.to_string();
        }

        if let Some(base) = word.strip_suffix("ies") {
            return format!("{base}y");
        }
        for suffix in ["sses", "ing", "edly", "ed", "ly"] {
            if let Some(base) = word.strip_suffix(suffix) {
                if base.len() >= 3 {
                    return match suffix {
                        "sses" => format!("{base}ss"),
                        "ly" => base.to_string(),
                        _ => undouble(base).to_string(),
                    };
                }
            }
        }
        for suffix in ["xes", "ches", "shes"] {
            if word.ends_with(suffix) {
                return word[..word.len() - 2].to_string();
            }
        }
        if word.ends_with('s') && !word.ends_with("ss") && !word.ends_with("us") {
            return word[..word.len() - 1].to_string();
        }

        word.to_string()
    }

    fn name(&self) -> &'static str {
        "suffix"
    }
}

/// Drop one letter of a trailing double consonant, except `ll`, `ss`, `zz`.
fn undouble(base: &str) -> &str {
    match *base.as_bytes() {
        [.., a, b]
            if a == b
                && !matches!(b, b'a' | b'e' | b'i' | b'o' | b'u' | b'l' | b's' | b'z') =>
        {
            &base[..base.len() - 1]
        }
        _ => base,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suffix_stemmer() {
        let stemmer = SuffixStemmer::new();
        assert_eq!(stemmer.stem("running"), "run");
        assert_eq!(stemmer.stem("stopped"), "stop");
        assert_eq!(stemmer.stem("falling"), "fall");
        assert_eq!(stemmer.stem("missed"), "miss");
        assert_eq!(stemmer.stem("jumping"), "jump");
        assert_eq!(stemmer.stem("queries"), "query");
        assert_eq!(stemmer.stem("documents"), "document");
        assert_eq!(stemmer.stem("classes"), "class");
        assert_eq!(stemmer.stem("glass"), "glass");
        assert_eq!(stemmer.stem("foxes"), "fox");
        assert_eq!(stemmer.stem("matches"), "match");
        assert_eq!(stemmer.stem("bus"), "bus");
        assert_eq!(stemmer.name(), "suffix");
    }
}
