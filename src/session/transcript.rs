use crate::recognition::RecognitionEvent;

/// Transcript accumulated by one session.
///
/// Final results are appended in arrival order. Interim results replace the
/// pending interim fragment and never enter the history.
#[derive(Debug, Clone, Default)]
pub struct SessionTranscript {
    finals: Vec<String>,
    interim: String,
}

impl SessionTranscript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, event: &RecognitionEvent) {
        if event.is_final {
            self.finals.push(event.transcript.clone());
            self.interim.clear();
        } else {
            self.interim.clone_from(&event.transcript);
        }
    }

    pub fn finals(&self) -> &[String] {
        &self.finals
    }

    pub fn interim(&self) -> &str {
        &self.interim
    }

    /// Non-empty final fragments joined with single spaces
    pub fn text(&self) -> String {
        join_finals(&self.finals)
    }

    pub fn into_parts(self) -> (Vec<String>, String) {
        (self.finals, self.interim)
    }
}

/// Trimmed non-empty fragments joined with single spaces
pub fn join_finals(finals: &[String]) -> String {
    finals
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interim_replaces_previous_interim() {
        let mut transcript = SessionTranscript::new();
        transcript.apply(&RecognitionEvent::interim("hel"));
        transcript.apply(&RecognitionEvent::interim("hello wor"));

        assert_eq!(transcript.interim(), "hello wor");
        assert!(transcript.finals().is_empty());
    }

    #[test]
    fn test_final_appends_and_clears_interim() {
        let mut transcript = SessionTranscript::new();
        transcript.apply(&RecognitionEvent::interim("hello wor"));
        transcript.apply(&RecognitionEvent::final_result("hello world"));
        transcript.apply(&RecognitionEvent::interim("how"));
        transcript.apply(&RecognitionEvent::final_result("how are you"));

        assert_eq!(transcript.finals(), ["hello world", "how are you"]);
        assert_eq!(transcript.interim(), "");
        assert_eq!(transcript.text(), "hello world how are you");
    }

    #[test]
    fn test_text_skips_blank_finals() {
        let mut transcript = SessionTranscript::new();
        transcript.apply(&RecognitionEvent::final_result(" first "));
        transcript.apply(&RecognitionEvent::final_result(""));
        transcript.apply(&RecognitionEvent::final_result("second"));

        assert_eq!(transcript.text(), "first second");
    }

    #[test]
    fn test_join_finals_matches_text() {
        let finals = vec!["  dear".to_string(), " ".to_string(), "diary ".to_string()];
        assert_eq!(join_finals(&finals), "dear diary");
        assert_eq!(join_finals(&[]), "");
    }
}
