//! Translation seam: the capability trait, the sentinel-fallback policy for
//! the caption service, and the fixed-size batching loop for the offline
//! translator.

use anyhow::{ensure, Result};
use tracing::warn;

/// Returned when the caption to translate is empty.
pub const NO_CAPTION: &str = "No caption available";
/// Returned when the translation capability itself failed.
pub const TRANSLATION_FAILED: &str = "Translation failed";

/// An English→French translation capability.
///
/// Implementations must return exactly one output per input, in input
/// order, and accept empty and single-item batches. `&mut self` because
/// model-backed implementations carry decoding state (KV caches, RNG).
pub trait Translator {
    fn translate_batch(&mut self, texts: &[String]) -> Result<Vec<String>>;
}

/// Outcome of translating a caption for the service path.
///
/// Translation never raises past this boundary: callers always get a
/// string, either the model output or a fixed sentinel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Translation {
    /// The model produced a translation.
    Done(String),
    /// Empty input or a failed model call, downgraded to a sentinel.
    Fallback(&'static str),
}

impl Translation {
    pub fn as_str(&self) -> &str {
        match self {
            Translation::Done(s) => s,
            Translation::Fallback(s) => s,
        }
    }

    pub fn into_string(self) -> String {
        match self {
            Translation::Done(s) => s,
            Translation::Fallback(s) => s.to_string(),
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Translation::Fallback(_))
    }
}

/// Translate one caption with the service's fallback policy.
///
/// Empty input short-circuits to [`NO_CAPTION`] without touching the
/// translator. A translator error is logged and mapped to
/// [`TRANSLATION_FAILED`]; there is no retry.
pub fn translate_to_french<T: Translator + ?Sized>(translator: &mut T, text: &str) -> Translation {
    if text.is_empty() {
        return Translation::Fallback(NO_CAPTION);
    }
    let input = [text.to_string()];
    match translator.translate_batch(&input) {
        Ok(mut outputs) if !outputs.is_empty() => Translation::Done(outputs.remove(0)),
        Ok(_) => {
            warn!("translator returned no output for {:?}", text);
            Translation::Fallback(TRANSLATION_FAILED)
        }
        Err(e) => {
            warn!("translation failed for {:?}: {}", text, e);
            Translation::Fallback(TRANSLATION_FAILED)
        }
    }
}

/// Translate a caption list in consecutive fixed-size batches.
///
/// The output has exactly the same length and order as the input; a batch
/// whose output count differs from its input count is an error, as is a
/// zero batch size. Errors propagate (no partial results).
pub fn translate_all<T: Translator + ?Sized>(
    translator: &mut T,
    texts: &[String],
    batch_size: usize,
) -> Result<Vec<String>> {
    ensure!(batch_size > 0, "batch size must be at least 1");

    let mut translations = Vec::with_capacity(texts.len());
    for batch in texts.chunks(batch_size) {
        let decoded = translator.translate_batch(batch)?;
        ensure!(
            decoded.len() == batch.len(),
            "translator returned {} outputs for a batch of {}",
            decoded.len(),
            batch.len()
        );
        translations.extend(decoded);
    }
    Ok(translations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    /// Uppercases each input and records the size of every batch it sees.
    struct MockTranslator {
        batch_sizes: Vec<usize>,
        fail: bool,
    }

    impl MockTranslator {
        fn new() -> Self {
            Self {
                batch_sizes: Vec::new(),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                batch_sizes: Vec::new(),
                fail: true,
            }
        }
    }

    impl Translator for MockTranslator {
        fn translate_batch(&mut self, texts: &[String]) -> Result<Vec<String>> {
            self.batch_sizes.push(texts.len());
            if self.fail {
                return Err(anyhow!("model exploded"));
            }
            Ok(texts.iter().map(|t| t.to_uppercase()).collect())
        }
    }

    // ── translate_to_french ──────────────────────────────────────────────

    #[test]
    fn empty_input_short_circuits() {
        let mut mock = MockTranslator::new();
        let out = translate_to_french(&mut mock, "");
        assert_eq!(out, Translation::Fallback(NO_CAPTION));
        assert_eq!(out.as_str(), "No caption available");
        // The translator was never invoked.
        assert!(mock.batch_sizes.is_empty());
    }

    #[test]
    fn model_error_downgrades_to_sentinel() {
        let mut mock = MockTranslator::failing();
        let out = translate_to_french(&mut mock, "a dog");
        assert_eq!(out, Translation::Fallback(TRANSLATION_FAILED));
        assert!(out.is_fallback());
        assert_eq!(mock.batch_sizes, vec![1]);
    }

    #[test]
    fn success_passes_through() {
        let mut mock = MockTranslator::new();
        let out = translate_to_french(&mut mock, "a dog");
        assert_eq!(out, Translation::Done("A DOG".to_string()));
        assert!(!out.is_fallback());
        assert_eq!(out.into_string(), "A DOG");
    }

    // ── translate_all ────────────────────────────────────────────────────

    fn captions(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("caption {}", i)).collect()
    }

    #[test]
    fn batches_are_consecutive_and_order_preserving() {
        let mut mock = MockTranslator::new();
        let input = captions(10);
        let out = translate_all(&mut mock, &input, 8).unwrap();

        // 10 captions at batch size 8: one call of 8, one of 2.
        assert_eq!(mock.batch_sizes, vec![8, 2]);
        assert_eq!(out.len(), input.len());

        // Same result as translating each caption individually, in order.
        let expected: Vec<String> = input.iter().map(|t| t.to_uppercase()).collect();
        assert_eq!(out, expected);
    }

    #[test]
    fn empty_input_is_fine() {
        let mut mock = MockTranslator::new();
        let out = translate_all(&mut mock, &[], 8).unwrap();
        assert!(out.is_empty());
        assert!(mock.batch_sizes.is_empty());
    }

    #[test]
    fn exact_multiple_of_batch_size() {
        let mut mock = MockTranslator::new();
        let out = translate_all(&mut mock, &captions(16), 8).unwrap();
        assert_eq!(mock.batch_sizes, vec![8, 8]);
        assert_eq!(out.len(), 16);
    }

    #[test]
    fn zero_batch_size_is_an_error() {
        let mut mock = MockTranslator::new();
        assert!(translate_all(&mut mock, &captions(3), 0).is_err());
    }

    #[test]
    fn model_error_propagates() {
        let mut mock = MockTranslator::failing();
        assert!(translate_all(&mut mock, &captions(3), 8).is_err());
    }

    #[test]
    fn count_mismatch_is_an_error() {
        struct Dropping;
        impl Translator for Dropping {
            fn translate_batch(&mut self, texts: &[String]) -> Result<Vec<String>> {
                Ok(texts.iter().skip(1).cloned().collect())
            }
        }
        assert!(translate_all(&mut Dropping, &captions(3), 8).is_err());
    }
}
