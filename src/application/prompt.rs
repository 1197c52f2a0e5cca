//! Prompt construction for article generation.

use std::fmt::Write as _;

use crate::domain::style::ArticleStyle;
use crate::domain::topics::TopicDescriptor;

use super::generator::{ChatMessage, CompletionRequest};

const SYSTEM_PROMPT: &str = "You write vivid, accurate science explainer articles. \
Return ONLY valid JSON, never markdown. \
The JSON must follow the shape requested by the user.";

const RESPONSE_SHAPE: &str = r#"{
  "id": string,
  "title": string,
  "subtitle": string,
  "readingMinutes": number,
  "hero": { "unsplashQuery": string, "alt": string },
  "sections": [ { "heading": string, "paragraphs": string[] } ],
  "keyTakeaways": string[],
  "sources": [ { "label": string, "url": string } ]
}"#;

const CONSTRAINTS: &[&str] = &[
    "4 to 7 sections, each with 2 to 4 paragraphs.",
    "Keep it exciting, but do not fake certainty.",
    "A paragraphs array must never be empty.",
    "3 to 8 key takeaways.",
    "2 to 8 sources from reputable organisations or journals (NASA, ESA, Nature, Science, \
     university pages), each with an absolute https URL.",
    "readingMinutes is a whole number between 1 and 30.",
    "Output must be a single valid JSON object.",
];

/// Build the provider request for one topic in one style.
pub fn build_request(
    topic: &TopicDescriptor,
    style: ArticleStyle,
    model: &str,
    temperature: f32,
) -> CompletionRequest {
    CompletionRequest {
        model: model.to_string(),
        temperature,
        json_output: true,
        messages: vec![
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(user_prompt(topic, style)),
        ],
    }
}

fn user_prompt(topic: &TopicDescriptor, style: ArticleStyle) -> String {
    let mut prompt = String::with_capacity(2048);

    prompt.push_str("Write a blog-style article about this open scientific mystery.\n\n");
    let _ = writeln!(prompt, "STYLE:\n{}\n", style.directive());

    prompt.push_str("Topic:\n");
    let _ = writeln!(prompt, "- id: {}", topic.id);
    let _ = writeln!(prompt, "- title: {}", topic.title);
    let _ = writeln!(prompt, "- hook: {}", topic.hook);
    let _ = writeln!(prompt, "- category: {}", topic.category.as_str());
    let _ = writeln!(prompt, "- difficulty (1-5): {}", topic.difficulty);

    push_list(&mut prompt, "What we know", &topic.known);
    push_list(&mut prompt, "What we don't know", &topic.unknown);
    push_list(&mut prompt, "Leading hypotheses", &topic.hypotheses);
    push_list(&mut prompt, "How to test / move forward", &topic.how_to_test);

    let _ = writeln!(prompt, "\nReturn JSON with this shape:\n{RESPONSE_SHAPE}");

    prompt.push_str("\nConstraints:\n");
    for constraint in CONSTRAINTS {
        let _ = writeln!(prompt, "- {constraint}");
    }

    prompt.trim_end().to_string()
}

fn push_list(prompt: &mut String, heading: &str, items: &[String]) {
    let _ = writeln!(prompt, "\n{heading}:");
    for item in items {
        let _ = writeln!(prompt, "- {item}");
    }
}
