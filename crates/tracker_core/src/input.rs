use std::fmt;

use crate::InputRule;

/// Parameters a user supplies to start a job. Immutable once submitted.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct JobInput {
    pub topic: String,
    /// Question or script id, depending on the feature.
    pub target_id: Option<String>,
    pub facts: Vec<String>,
}

impl JobInput {
    pub fn topic(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            ..Self::default()
        }
    }

    pub fn target(target_id: impl Into<String>) -> Self {
        Self {
            target_id: Some(target_id.into()),
            ..Self::default()
        }
    }

    pub fn with_facts<I, S>(mut self, facts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.facts = facts.into_iter().map(Into::into).collect();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    MissingTopic,
    MissingQuestion,
    MissingScript,
    TooFewFacts { required: usize, provided: usize },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::MissingTopic => write!(f, "Please enter a topic"),
            ValidationError::MissingQuestion => write!(f, "Please select a question"),
            ValidationError::MissingScript => write!(f, "Please select a script"),
            ValidationError::TooFewFacts { required, .. } => {
                write!(f, "Please provide at least {required} facts")
            }
        }
    }
}

/// Checks `input` against `rule` and returns the trimmed form that will be submitted.
pub fn validate(rule: InputRule, input: &JobInput) -> Result<JobInput, ValidationError> {
    let topic = input.topic.trim().to_string();
    let target_id = input
        .target_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(ToOwned::to_owned);
    let facts: Vec<String> = input
        .facts
        .iter()
        .map(|fact| fact.trim())
        .filter(|fact| !fact.is_empty())
        .map(ToOwned::to_owned)
        .collect();

    match rule {
        InputRule::Topic => {
            if topic.is_empty() {
                return Err(ValidationError::MissingTopic);
            }
        }
        InputRule::QuestionId => {
            if target_id.is_none() {
                return Err(ValidationError::MissingQuestion);
            }
        }
        InputRule::ScriptId => {
            if target_id.is_none() {
                return Err(ValidationError::MissingScript);
            }
        }
        InputRule::TopicWithFacts { min_facts } => {
            if topic.is_empty() {
                return Err(ValidationError::MissingTopic);
            }
            if facts.len() < min_facts {
                return Err(ValidationError::TooFewFacts {
                    required: min_facts,
                    provided: facts.len(),
                });
            }
        }
    }

    Ok(JobInput {
        topic,
        target_id,
        facts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_topic_is_rejected_with_prompt() {
        let err = validate(InputRule::Topic, &JobInput::topic("   ")).unwrap_err();
        assert_eq!(err, ValidationError::MissingTopic);
        assert_eq!(err.to_string(), "Please enter a topic");
    }

    #[test]
    fn topic_is_trimmed() {
        let input = validate(InputRule::Topic, &JobInput::topic("  Indus Valley \n")).unwrap();
        assert_eq!(input.topic, "Indus Valley");
    }

    #[test]
    fn blank_facts_do_not_count() {
        let input = JobInput::topic("Mauryan empire").with_facts(["Ashoka", " ", "Kalinga"]);
        let err = validate(InputRule::TopicWithFacts { min_facts: 3 }, &input).unwrap_err();
        assert_eq!(
            err,
            ValidationError::TooFewFacts {
                required: 3,
                provided: 2
            }
        );
        assert_eq!(err.to_string(), "Please provide at least 3 facts");
    }

    #[test]
    fn whitespace_target_id_counts_as_missing() {
        let err = validate(InputRule::QuestionId, &JobInput::target("  ")).unwrap_err();
        assert_eq!(err, ValidationError::MissingQuestion);
        let err = validate(InputRule::ScriptId, &JobInput::default()).unwrap_err();
        assert_eq!(err, ValidationError::MissingScript);
    }
}
