//! Client-side form state and validation rules.

use crate::client::UploadFile;
use crate::config::UploadRules;
use thiserror::Error;

/// Hard limit on question length, in characters.
pub const MAX_QUESTION_CHARS: usize = 1000;
/// Above this length the counter turns to a warning.
pub const WARNING_THRESHOLD: usize = 900;
/// Above this length the counter turns to danger.
pub const DANGER_THRESHOLD: usize = 950;

/// Literal text the user must type to confirm deleting the collection.
pub const DELETE_CONFIRMATION: &str = "DELETE";

/// Input rejected before any request is sent.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// Question is empty or whitespace.
    #[error("Please enter a question")]
    EmptyQuestion,
    /// Question exceeds [`MAX_QUESTION_CHARS`].
    #[error("Question is too long ({length}/{max} characters)", max = MAX_QUESTION_CHARS)]
    QuestionTooLong {
        /// Character count of the rejected question.
        length: usize,
    },
    /// File has no contents.
    #[error("File '{0}' is empty")]
    EmptyFile(String),
    /// File exceeds the configured size limit.
    #[error("File '{name}' is too large ({size} bytes, limit {limit} bytes)")]
    FileTooLarge {
        /// File name.
        name: String,
        /// Actual size in bytes.
        size: u64,
        /// Configured limit in bytes.
        limit: u64,
    },
    /// File extension is not in the allowed list.
    #[error("File type not supported: '{name}' (allowed: {allowed})")]
    UnsupportedFileType {
        /// File name.
        name: String,
        /// Comma separated list of allowed extensions.
        allowed: String,
    },
    /// Typed confirmation did not match [`DELETE_CONFIRMATION`].
    #[error("Deletion cancelled: type DELETE to confirm")]
    ConfirmationMismatch,
}

/// Visual state of the question character counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterLevel {
    /// Comfortably within the limit.
    Normal,
    /// Approaching the limit.
    Warning,
    /// At or beyond the danger threshold.
    Danger,
}

impl CounterLevel {
    /// Classify a question length.
    pub fn for_length(length: usize) -> Self {
        if length > DANGER_THRESHOLD {
            Self::Danger
        } else if length > WARNING_THRESHOLD {
            Self::Warning
        } else {
            Self::Normal
        }
    }
}

/// Which answer path a validated question takes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryMode {
    /// Wait for the complete answer.
    Standard {
        /// Ask for supporting sources.
        include_sources: bool,
        /// Ask for evaluation metrics.
        enable_evaluation: bool,
    },
    /// Render the answer as it arrives.
    Streaming,
}

/// State of the question form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryForm {
    question: String,
    include_sources: bool,
    sources_enabled: bool,
    enable_evaluation: bool,
    streaming: bool,
}

impl Default for QueryForm {
    fn default() -> Self {
        Self {
            question: String::new(),
            include_sources: true,
            sources_enabled: true,
            enable_evaluation: false,
            streaming: false,
        }
    }
}

impl QueryForm {
    /// Replace the question text.
    pub fn set_question(&mut self, question: impl Into<String>) {
        self.question = question.into();
    }

    /// Current question text.
    pub fn question(&self) -> &str {
        &self.question
    }

    /// Number of characters typed so far.
    pub fn char_count(&self) -> usize {
        self.question.chars().count()
    }

    /// Counter state for the current question.
    pub fn counter_level(&self) -> CounterLevel {
        CounterLevel::for_length(self.char_count())
    }

    /// Toggle streaming. Enabling it clears and locks the sources option, since the streaming
    /// endpoint never returns sources; disabling it unlocks the option without changing it.
    pub fn set_streaming(&mut self, streaming: bool) {
        self.streaming = streaming;
        if streaming {
            self.include_sources = false;
            self.sources_enabled = false;
        } else {
            self.sources_enabled = true;
        }
    }

    /// Toggle source inclusion. Returns `false` when the control is locked.
    pub fn set_include_sources(&mut self, include: bool) -> bool {
        if !self.sources_enabled {
            return false;
        }
        self.include_sources = include;
        true
    }

    /// Toggle evaluation metrics.
    pub fn set_enable_evaluation(&mut self, enable: bool) {
        self.enable_evaluation = enable;
    }

    /// Whether streaming is on.
    pub fn streaming(&self) -> bool {
        self.streaming
    }

    /// Whether sources will be requested.
    pub fn include_sources(&self) -> bool {
        self.include_sources
    }

    /// Whether the sources control accepts changes.
    pub fn sources_enabled(&self) -> bool {
        self.sources_enabled
    }

    /// Whether evaluation will be requested.
    pub fn enable_evaluation(&self) -> bool {
        self.enable_evaluation
    }

    /// Check the question and pick the answer path.
    pub fn validate(&self) -> Result<QueryMode, ValidationError> {
        let question = self.question.trim();
        if question.is_empty() {
            return Err(ValidationError::EmptyQuestion);
        }
        let length = self.char_count();
        if length > MAX_QUESTION_CHARS {
            return Err(ValidationError::QuestionTooLong { length });
        }
        if self.streaming {
            Ok(QueryMode::Streaming)
        } else {
            Ok(QueryMode::Standard {
                include_sources: self.include_sources,
                enable_evaluation: self.enable_evaluation,
            })
        }
    }
}

/// Accept the typed confirmation only when it is exactly [`DELETE_CONFIRMATION`].
pub fn confirm_delete(typed: &str) -> Result<(), ValidationError> {
    if typed == DELETE_CONFIRMATION {
        Ok(())
    } else {
        Err(ValidationError::ConfirmationMismatch)
    }
}

/// Check a document against the configured upload rules.
pub fn validate_upload(file: &UploadFile, rules: &UploadRules) -> Result<(), ValidationError> {
    if file.is_empty() {
        return Err(ValidationError::EmptyFile(file.file_name.clone()));
    }
    let allowed = file
        .extension()
        .is_some_and(|ext| rules.allowed_extensions.iter().any(|item| *item == ext));
    if !allowed {
        return Err(ValidationError::UnsupportedFileType {
            name: file.file_name.clone(),
            allowed: rules.allowed_extensions.join(", "),
        });
    }
    if file.len() > rules.max_bytes {
        return Err(ValidationError::FileTooLarge {
            name: file.file_name.clone(),
            size: file.len(),
            limit: rules.max_bytes,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_levels_follow_thresholds() {
        assert_eq!(CounterLevel::for_length(0), CounterLevel::Normal);
        assert_eq!(CounterLevel::for_length(900), CounterLevel::Normal);
        assert_eq!(CounterLevel::for_length(901), CounterLevel::Warning);
        assert_eq!(CounterLevel::for_length(950), CounterLevel::Warning);
        assert_eq!(CounterLevel::for_length(951), CounterLevel::Danger);
        assert_eq!(CounterLevel::for_length(1200), CounterLevel::Danger);
    }

    #[test]
    fn counter_counts_characters_not_bytes() {
        let mut form = QueryForm::default();
        form.set_question("é".repeat(901));
        assert_eq!(form.char_count(), 901);
        assert_eq!(form.counter_level(), CounterLevel::Warning);
    }

    #[test]
    fn streaming_locks_and_clears_sources() {
        let mut form = QueryForm::default();
        assert!(form.include_sources());

        form.set_streaming(true);
        assert!(!form.include_sources());
        assert!(!form.sources_enabled());
        assert!(!form.set_include_sources(true));
        assert!(!form.include_sources());

        form.set_streaming(false);
        assert!(form.sources_enabled());
        assert!(!form.include_sources(), "re-enabling must not force a value");
        assert!(form.set_include_sources(true));
        assert!(form.include_sources());
    }

    #[test]
    fn validation_rejects_blank_and_long_questions() {
        let mut form = QueryForm::default();
        form.set_question("   ");
        assert_eq!(form.validate(), Err(ValidationError::EmptyQuestion));

        form.set_question("x".repeat(1001));
        assert_eq!(
            form.validate(),
            Err(ValidationError::QuestionTooLong { length: 1001 })
        );

        form.set_question("x".repeat(1000));
        assert!(form.validate().is_ok());
    }

    #[test]
    fn validation_picks_answer_path() {
        let mut form = QueryForm::default();
        form.set_question("What is X?");
        form.set_enable_evaluation(true);
        assert_eq!(
            form.validate(),
            Ok(QueryMode::Standard {
                include_sources: true,
                enable_evaluation: true
            })
        );

        form.set_streaming(true);
        assert_eq!(form.validate(), Ok(QueryMode::Streaming));
    }

    #[test]
    fn delete_requires_exact_confirmation() {
        assert!(confirm_delete("DELETE").is_ok());
        for typed in ["delete", "DELETE ", " DELETE", "", "DEL"] {
            assert_eq!(
                confirm_delete(typed),
                Err(ValidationError::ConfirmationMismatch),
                "{typed:?} must be rejected"
            );
        }
    }

    #[test]
    fn upload_rules_are_enforced() {
        let rules = UploadRules {
            max_bytes: 8,
            allowed_extensions: vec!["txt".into(), "pdf".into()],
        };
        assert!(validate_upload(&UploadFile::new("a.TXT", b"hello".to_vec()), &rules).is_ok());
        assert!(matches!(
            validate_upload(&UploadFile::new("a.txt", Vec::new()), &rules),
            Err(ValidationError::EmptyFile(_))
        ));
        assert!(matches!(
            validate_upload(&UploadFile::new("a.exe", b"MZ".to_vec()), &rules),
            Err(ValidationError::UnsupportedFileType { .. })
        ));
        assert!(matches!(
            validate_upload(&UploadFile::new("a.pdf", vec![0; 9]), &rules),
            Err(ValidationError::FileTooLarge { size: 9, limit: 8, .. })
        ));
    }
}
