//! Benchmarks for cache key derivation
//!
//! This benchmark measures:
//! - Prompt normalization (tool-call id scrubbing)
//! - Canonical encoding + hashing of the normalized request

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use canvas_lm_cache::cache::{normalize, serialize, CacheKey, CallKind};
use canvas_lm_cache::types::{PromptMessage, ToolCallPart, ToolResultPart};

const MODEL: &str = "gemini-3-flash-preview";

fn create_simple_prompt() -> Vec<PromptMessage> {
    vec![
        PromptMessage::system("You help the user build a canvas."),
        PromptMessage::user("Hello, world!"),
    ]
}

fn create_agent_loop(steps: usize) -> Vec<PromptMessage> {
    let mut prompt = vec![
        PromptMessage::system("You help the user build a canvas."),
        PromptMessage::user("Plan a product launch moodboard"),
    ];
    for i in 0..steps {
        let id = format!("call_{:08x}", i * 7919);
        prompt.push(PromptMessage::assistant_tool_call(ToolCallPart::new(
            id.clone(),
            "createCanvasNode",
            serde_json::json!({
                "type": "research",
                "title": format!("Step {}", i),
                "position": {"x": i * 40, "y": i * 25},
            }),
        )));
        prompt.push(PromptMessage::tool_result(ToolResultPart::new(
            id,
            "createCanvasNode",
            serde_json::json!({"nodeId": format!("node-{}", i), "ok": true}),
        )));
        prompt.push(PromptMessage::assistant(format!("Added step {}", i)));
    }
    prompt
}

fn bench_key_derivation(c: &mut Criterion) {
    let mut group = c.benchmark_group("key_derivation");

    let cases = [
        ("simple", create_simple_prompt()),
        ("agent_10_steps", create_agent_loop(10)),
        ("agent_100_steps", create_agent_loop(100)),
    ];

    for (name, prompt) in &cases {
        group.bench_with_input(BenchmarkId::new("normalize", name), prompt, |b, p| {
            b.iter(|| normalize(black_box(p)))
        });

        let normalized = normalize(prompt);
        group.bench_with_input(BenchmarkId::new("serialize", name), &normalized, |b, p| {
            b.iter(|| serialize(black_box(p), MODEL, CallKind::Stream))
        });

        group.bench_with_input(BenchmarkId::new("for_call", name), prompt, |b, p| {
            b.iter(|| CacheKey::for_call(black_box(p), MODEL, CallKind::Generate))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_key_derivation);
criterion_main!(benches);
