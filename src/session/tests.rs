use super::*;
use crate::config::PipelineConfig;
use crate::testing::{KeywordEmbedder, ScriptedGenerator};
use std::fs;
use tempfile::TempDir;

const DOCUMENT: &str = "Cats are mammals.\n\nThe sky is blue.\n\nWater is wet.";

fn session(input: &str) -> Session<&[u8], Vec<u8>> {
    Session::new(input.as_bytes(), Vec::new(), 3)
}

fn output_of(session: Session<&[u8], Vec<u8>>) -> String {
    String::from_utf8(session.into_output()).expect("output should be UTF-8")
}

fn ingested_pipeline<'a>(
    embedder: &'a KeywordEmbedder,
    generator: &'a ScriptedGenerator,
) -> Pipeline<&'a KeywordEmbedder, &'a ScriptedGenerator> {
    let config = PipelineConfig {
        top_n: 1,
        ..PipelineConfig::default()
    };
    let mut pipeline = Pipeline::new(embedder, generator, config);
    pipeline.ingest(DOCUMENT).expect("ingest should succeed");
    pipeline
}

#[test]
fn exit_terminates_immediately() {
    let embedder = KeywordEmbedder::default();
    let generator = ScriptedGenerator::default();
    let pipeline = ingested_pipeline(&embedder, &generator);

    for input in ["exit\n", "EXIT\n", "  Exit  \n"] {
        let mut session = session(input);
        let answered = session.run_queries(&pipeline).expect("loop should succeed");

        assert_eq!(answered, 0);
        assert_eq!(session.state(), SessionState::Terminated);
    }
    assert!(generator.prompts.borrow().is_empty());
}

#[test]
fn end_of_input_terminates() {
    let embedder = KeywordEmbedder::default();
    let generator = ScriptedGenerator::default();
    let pipeline = ingested_pipeline(&embedder, &generator);
    let mut session = session("");

    let answered = session.run_queries(&pipeline).expect("loop should succeed");

    assert_eq!(answered, 0);
    assert_eq!(session.state(), SessionState::Terminated);
}

#[test]
fn answers_query_and_prints_chunks() {
    let embedder = KeywordEmbedder::default();
    let generator = ScriptedGenerator::default();
    let pipeline = ingested_pipeline(&embedder, &generator);
    let mut session = session("what color is the sky\nexit\n");

    let answered = session.run_queries(&pipeline).expect("loop should succeed");
    let output = output_of(session);

    assert_eq!(answered, 1);
    assert!(output.contains(QUERY_PROMPT));
    assert!(output.contains("Retrieved Chunks:"));
    assert!(output.contains("Chunk 1"));
    assert!(output.contains("The sky is blue."));
    assert!(!output.contains("Chunk 2"));
    assert!(output.contains("AI Response:"));
    assert!(output.contains("Based on: The sky is blue."));
}

#[test]
fn blank_lines_are_skipped() {
    let embedder = KeywordEmbedder::default();
    let generator = ScriptedGenerator::default();
    let pipeline = ingested_pipeline(&embedder, &generator);
    let mut session = session("\n   \nsky\nexit\n");

    let answered = session.run_queries(&pipeline).expect("loop should succeed");

    assert_eq!(answered, 1);
    assert_eq!(generator.prompts.borrow().len(), 1);
}

#[test]
fn generation_failure_keeps_session_alive() {
    let embedder = KeywordEmbedder::default();
    let generator = ScriptedGenerator::failing_on("broken");
    let pipeline = ingested_pipeline(&embedder, &generator);
    let mut session = session("broken question\nblue sky\nexit\n");

    let answered = session.run_queries(&pipeline).expect("loop should succeed");
    let output = output_of(session);

    assert_eq!(answered, 1);
    assert!(output.contains("Generation error: model unavailable"));
    assert!(output.contains("Please try again."));
    assert!(output.contains("Based on: The sky is blue."));
}

#[test]
fn queries_are_independent() {
    let embedder = KeywordEmbedder::default();
    let generator = ScriptedGenerator::default();
    let pipeline = ingested_pipeline(&embedder, &generator);
    let mut session = session("sky\ncats\nexit\n");

    session.run_queries(&pipeline).expect("loop should succeed");

    let prompts = generator.prompts.borrow();
    assert_eq!(prompts.len(), 2);
    assert!(prompts[1].contains("Context: Cats are mammals."));
    assert!(!prompts[1].contains("sky"));
}

#[test]
fn menu_accepts_file_choice() {
    let mut session = session("2\nnotes.txt\n");

    let source = session.choose_source().expect("menu should succeed");

    assert_eq!(source, Some(DocumentSource::File("notes.txt".into())));
}

#[test]
fn menu_accepts_url_choice() {
    let mut session = session("1\nhttps://example.com/article\n");

    let source = session.choose_source().expect("menu should succeed");

    assert!(matches!(source, Some(DocumentSource::Url(url)) if url.path() == "/article"));
}

#[test]
fn menu_reprompts_on_invalid_choice() {
    let mut session = session("3\nabc\n2\nnotes.txt\n");

    let source = session.choose_source().expect("menu should succeed");
    let output = output_of(session);

    assert_eq!(source, Some(DocumentSource::File("notes.txt".into())));
    assert_eq!(output.matches(SOURCE_MENU_PROMPT).count(), 3);
    assert_eq!(output.matches("Invalid choice").count(), 2);
}

#[test]
fn menu_gives_up_after_max_attempts() {
    let mut session = session("x\ny\nz\n2\nnever.txt\n");

    let source = session.choose_source().expect("menu should succeed");
    let output = output_of(session);

    assert_eq!(source, None);
    assert!(output.contains("Too many invalid attempts."));
}

#[test]
fn menu_rejects_invalid_url() {
    let mut session = session("1\nnot a url\n2\nnotes.txt\n");

    let source = session.choose_source().expect("menu should succeed");

    assert_eq!(source, Some(DocumentSource::File("notes.txt".into())));
}

#[test]
fn empty_document_reprompts_for_source() {
    let temp_dir = TempDir::new().expect("should create TempDir successfully");
    let empty = temp_dir.path().join("empty.txt");
    let good = temp_dir.path().join("good.txt");
    fs::write(&empty, "").expect("should write fixture");
    fs::write(&good, DOCUMENT).expect("should write fixture");

    let embedder = KeywordEmbedder::default();
    let generator = ScriptedGenerator::default();
    let mut pipeline = Pipeline::new(&embedder, &generator, PipelineConfig::default());
    let fetcher = DocumentFetcher::new(temp_dir.path().join("Selected_Document.txt"));
    let input = format!("2\n{}\n2\n{}\n", empty.display(), good.display());
    let mut session = Session::new(input.as_bytes(), Vec::new(), 3);

    let loaded = session
        .acquire_document(&fetcher, &mut pipeline)
        .expect("acquire should succeed");
    let output = String::from_utf8(session.into_output()).expect("output should be UTF-8");

    assert!(loaded);
    assert!(output.contains("No content found"));
    assert!(output.contains("Document split into 3 chunks."));
    assert_eq!(pipeline.store().len(), 3);
}

#[test]
fn missing_file_reprompts_then_gives_up() {
    let temp_dir = TempDir::new().expect("should create TempDir successfully");
    let embedder = KeywordEmbedder::default();
    let generator = ScriptedGenerator::default();
    let mut pipeline = Pipeline::new(&embedder, &generator, PipelineConfig::default());
    let fetcher = DocumentFetcher::new(temp_dir.path().join("Selected_Document.txt"));
    let mut session = Session::new(
        "2\nmissing-a.txt\n2\nmissing-b.txt\n".as_bytes(),
        Vec::new(),
        2,
    );

    let loaded = session
        .acquire_document(&fetcher, &mut pipeline)
        .expect("acquire should succeed");
    let output = String::from_utf8(session.into_output()).expect("output should be UTF-8");

    assert!(!loaded);
    assert_eq!(output.matches("does not exist").count(), 2);
    assert!(output.contains("No document loaded after repeated attempts."));
    assert!(pipeline.store().is_empty());
}

#[test]
fn failed_document_leaves_no_chunks_behind() {
    let temp_dir = TempDir::new().expect("should create TempDir successfully");
    let bad = temp_dir.path().join("bad.txt");
    let good = temp_dir.path().join("good.txt");
    fs::write(&bad, "The cat sat.\n\nboom here").expect("should write fixture");
    fs::write(&good, "The sky is blue.").expect("should write fixture");

    let embedder = KeywordEmbedder::failing_on("boom");
    let generator = ScriptedGenerator::default();
    let mut pipeline =
        Pipeline::new(&embedder, &generator, PipelineConfig::default()).with_batch_size(1);
    let fetcher = DocumentFetcher::new(temp_dir.path().join("Selected_Document.txt"));
    let input = format!("2\n{}\n2\n{}\n", bad.display(), good.display());
    let mut session = Session::new(input.as_bytes(), Vec::new(), 3);

    let loaded = session
        .acquire_document(&fetcher, &mut pipeline)
        .expect("acquire should succeed");
    let output = String::from_utf8(session.into_output()).expect("output should be UTF-8");

    assert!(loaded);
    assert!(output.contains("Embedding error: embedding model crashed"));
    assert_eq!(pipeline.store().all_chunks(), vec!["The sky is blue."]);
}
