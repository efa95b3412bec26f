use super::*;
use std::cell::{Cell, RefCell};

#[derive(Default)]
struct RecordingGenerator {
    prompts: RefCell<Vec<String>>,
    reply: String,
    released: Cell<bool>,
}

impl RecordingGenerator {
    fn replying(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            ..Self::default()
        }
    }
}

impl TextGenerator for RecordingGenerator {
    fn complete(&self, prompt: &str, _config: &GenerationConfig) -> Result<String> {
        self.prompts.borrow_mut().push(prompt.to_string());
        Ok(self.reply.clone())
    }

    fn release(&self) -> Result<()> {
        self.released.set(true);
        Ok(())
    }
}

struct UnavailableGenerator;

impl TextGenerator for UnavailableGenerator {
    fn complete(&self, _prompt: &str, _config: &GenerationConfig) -> Result<String> {
        Err(RagError::Network("connection refused".to_string()))
    }
}

#[test]
fn prompt_follows_template() {
    let prompt = build_prompt("what color is the sky", &["the sky is blue", "grass is green"]);

    assert_eq!(
        prompt,
        "Answer the following question based on the context:\n\nContext: the sky is blue grass is green\n\nQuestion: what color is the sky"
    );
}

#[test]
fn prompt_without_context() {
    let prompt = build_prompt::<&str>("anything?", &[]);

    assert!(prompt.contains("Context: \n\n"));
    assert!(prompt.ends_with("Question: anything?"));
}

#[test]
fn truncation_keeps_short_text() {
    let text = "one two  three";
    assert!(matches!(truncate_to_tokens(text, 3), Cow::Borrowed("one two  three")));
    assert_eq!(truncate_to_tokens(text, 10), text);
}

#[test]
fn truncation_drops_tail() {
    assert_eq!(truncate_to_tokens("one two\n\nthree four", 2), "one two");
    assert_eq!(truncate_to_tokens("  lead one two", 1), "  lead");
    assert_eq!(truncate_to_tokens("one two", 0), "");
}

#[test]
fn generate_sends_truncated_prompt() {
    let backend = RecordingGenerator::replying("  Blue.  ");
    let config = GenerationConfig {
        max_input_tokens: 12,
        ..GenerationConfig::default()
    };
    let generator = Generator::new(&backend, config);

    let answer = generator
        .generate("what color is the sky", &["the sky is blue"])
        .expect("generate should succeed");

    assert_eq!(answer, "Blue.");
    let prompts = backend.prompts.borrow();
    assert_eq!(prompts.len(), 1);
    assert_eq!(estimate_token_count(&prompts[0]), 12);
    assert!(prompts[0].starts_with("Answer the following question"));
    assert!(!prompts[0].contains("Question:"));
}

#[test]
fn generate_wraps_backend_failures() {
    let generator = Generator::new(UnavailableGenerator, GenerationConfig::default());

    let err = generator
        .generate("q", &["context"])
        .expect_err("unavailable backend should fail");

    assert!(matches!(err, RagError::Generation(message) if message.contains("connection refused")));
}

#[test]
fn empty_response_is_an_error() {
    let generator = Generator::new(
        RecordingGenerator::replying("   "),
        GenerationConfig::default(),
    );

    let err = generator
        .generate("q", &["context"])
        .expect_err("blank response should fail");

    assert!(matches!(err, RagError::Generation(_)));
}

#[test]
fn shutdown_releases_backend() {
    let backend = RecordingGenerator::replying("ok");
    let generator = Generator::new(&backend, GenerationConfig::default());

    generator.shutdown().expect("shutdown should succeed");

    assert!(backend.released.get());
}

#[test]
fn greedy_backend_ignores_beam_settings() {
    assert!(GenerationConfig::default().ignored_without_beam_search().is_empty());

    let single_beam = GenerationConfig {
        beam_width: Some(1),
        ..GenerationConfig::default()
    };
    assert!(single_beam.ignored_without_beam_search().is_empty());

    let beam = GenerationConfig {
        beam_width: Some(4),
        early_stopping: true,
        ..GenerationConfig::default()
    };
    assert_eq!(
        beam.ignored_without_beam_search(),
        vec!["beam_width", "early_stopping"]
    );
}
