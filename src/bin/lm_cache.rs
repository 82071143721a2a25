//! lm-cache: inspect and maintain the model response cache file
//!
//! Usage:
//!   lm-cache path                   Print the cache file location
//!   lm-cache list                   List cached keys
//!   lm-cache show <key>             Print one entry
//!   lm-cache stats                  Entry counts by call kind and model
//!   lm-cache remove <key>           Delete one entry
//!   lm-cache clear                  Delete every entry

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{bail, Context};
use canvas_lm_cache::cache::{CacheEntry, CacheKey, CacheStore, JsonFileStore};
use canvas_lm_cache::CacheSettings;
use serde_json::{Map, Value};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        print_usage();
        std::process::exit(1);
    }

    let outcome = match args[1].as_str() {
        "path" => cmd_path(&args[2..]),
        "list" => cmd_list(&args[2..]).await,
        "show" => cmd_show(&args[2..]).await,
        "stats" => cmd_stats(&args[2..]).await,
        "remove" => cmd_remove(&args[2..]).await,
        "clear" => cmd_clear(&args[2..]).await,
        "version" | "--version" | "-V" => {
            println!("lm-cache {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {other}");
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    };

    if let Err(e) = outcome {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn print_usage() {
    println!(
        r#"lm-cache: model response cache tool

USAGE:
    lm-cache <COMMAND> [--file <path>]

COMMANDS:
    path                Print the cache file location
    list                List cached keys
    show <key>          Print one cached entry
    stats               Entry counts by call kind and model
    remove <key>        Delete one entry
    clear               Delete every entry
    version             Show version information
    help                Show this help message

ENVIRONMENT:
    LM_CACHE_PATH       Cache file (default .cache/ai-cache.json)"#
    );
}

fn resolve_path(args: &[String]) -> anyhow::Result<PathBuf> {
    for (i, arg) in args.iter().enumerate() {
        if arg == "--file" {
            if let Some(path) = args.get(i + 1) {
                return Ok(PathBuf::from(path));
            }
            bail!("--file needs a path");
        }
    }
    let settings = CacheSettings::from_env().context("reading cache settings")?;
    Ok(settings.path)
}

/// Positional arguments, with `--file <path>` stripped.
fn positional(args: &[String]) -> Vec<&str> {
    let mut out = Vec::new();
    let mut skip = false;
    for arg in args {
        if skip {
            skip = false;
            continue;
        }
        if arg == "--file" {
            skip = true;
            continue;
        }
        out.push(arg.as_str());
    }
    out
}

fn open(args: &[String]) -> anyhow::Result<JsonFileStore> {
    Ok(JsonFileStore::new(resolve_path(args)?))
}

fn required_key<'a>(args: &'a [String], cmd: &str) -> anyhow::Result<&'a str> {
    match positional(args).first().copied() {
        Some(key) => Ok(key),
        None => bail!("usage: lm-cache {cmd} <key>"),
    }
}

fn cmd_path(args: &[String]) -> anyhow::Result<()> {
    println!("{}", resolve_path(args)?.display());
    Ok(())
}

async fn cmd_list(args: &[String]) -> anyhow::Result<()> {
    let store = open(args)?;
    for key in store.keys().await? {
        println!("{key}");
    }
    Ok(())
}

async fn cmd_show(args: &[String]) -> anyhow::Result<()> {
    let key = required_key(args, "show")?;
    let store = open(args)?;
    match store.get(key).await? {
        Some(value) => println!("{}", serde_json::to_string_pretty(&value)?),
        None => bail!("no entry for key '{key}'"),
    }
    Ok(())
}

/// Entry counts gathered from one read of the cache file.
#[derive(Debug, Default, PartialEq)]
struct Summary {
    entries: usize,
    by_kind: BTreeMap<String, usize>,
    by_model: BTreeMap<String, usize>,
    replay_parts: usize,
    unreadable: usize,
}

impl Summary {
    fn from_map(map: Map<String, Value>) -> Self {
        let mut summary = Summary {
            entries: map.len(),
            ..Summary::default()
        };
        for (key, value) in map {
            let Some(parsed) = CacheKey::parse(&key) else {
                *summary.by_kind.entry("unrecognized".into()).or_default() += 1;
                continue;
            };
            *summary.by_kind.entry(parsed.kind().to_string()).or_default() += 1;
            *summary.by_model.entry(parsed.model().to_string()).or_default() += 1;

            match CacheEntry::decode(value, parsed.kind()) {
                Ok(CacheEntry::Stream(entry)) => summary.replay_parts += entry.chunks.len(),
                Ok(CacheEntry::Generate(_)) => {}
                Err(_) => summary.unreadable += 1,
            }
        }
        summary
    }
}

async fn cmd_stats(args: &[String]) -> anyhow::Result<()> {
    let store = open(args)?;
    let summary = Summary::from_map(store.snapshot().await?);

    let size = tokio::fs::metadata(store.path())
        .await
        .map(|m| m.len())
        .unwrap_or(0);
    println!("file:     {} ({} bytes)", store.path().display(), size);
    println!("entries:  {}", summary.entries);
    for (kind, n) in &summary.by_kind {
        println!("  {kind:<12} {n}");
    }
    println!("models:");
    for (model, n) in &summary.by_model {
        println!("  {model:<32} {n}");
    }
    println!("stream parts recorded: {}", summary.replay_parts);
    if summary.unreadable > 0 {
        println!("unreadable entries:    {}", summary.unreadable);
    }
    Ok(())
}

async fn cmd_remove(args: &[String]) -> anyhow::Result<()> {
    let key = required_key(args, "remove")?;
    let store = open(args)?;
    if !store.remove(key).await? {
        bail!("no entry for key '{key}'");
    }
    println!("removed {key}");
    Ok(())
}

async fn cmd_clear(args: &[String]) -> anyhow::Result<()> {
    let store = open(args)?;
    let n = store.len().await?;
    store.clear().await?;
    println!("cleared {n} entries from {}", store.path().display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use canvas_lm_cache::cache::StreamEntry;
    use canvas_lm_cache::{CallKind, GenerateResult, PromptMessage, StreamPart};

    fn key(text: &str, model: &str, kind: CallKind) -> String {
        CacheKey::for_call(&[PromptMessage::user(text)], model, kind).to_string()
    }

    #[test]
    fn summary_counts_kinds_models_and_parts() {
        let mut map = Map::new();
        map.insert(
            key("a", "m1", CallKind::Generate),
            CacheEntry::Generate(GenerateResult::text("x")).encode().unwrap(),
        );
        map.insert(
            key("b", "m2", CallKind::Stream),
            CacheEntry::Stream(StreamEntry {
                chunks: vec![StreamPart::text_delta("t", "1"), StreamPart::text_delta("t", "2")],
                request: None,
                response: None,
            })
            .encode()
            .unwrap(),
        );
        map.insert(key("c", "m1", CallKind::Stream), serde_json::json!({"kind": "generate"}));
        map.insert("hand-written".into(), serde_json::json!(1));

        let summary = Summary::from_map(map);
        assert_eq!(summary.entries, 4);
        assert_eq!(summary.by_kind["generate"], 1);
        assert_eq!(summary.by_kind["stream"], 2);
        assert_eq!(summary.by_kind["unrecognized"], 1);
        assert_eq!(summary.by_model["m1"], 2);
        assert_eq!(summary.replay_parts, 2);
        assert_eq!(summary.unreadable, 1);
    }

    #[test]
    fn positional_skips_file_flag() {
        let args: Vec<String> = ["--file", "/tmp/c.json", "some-key"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(positional(&args), vec!["some-key"]);
        assert_eq!(resolve_path(&args).unwrap(), PathBuf::from("/tmp/c.json"));
    }
}
