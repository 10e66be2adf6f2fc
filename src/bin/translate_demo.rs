use std::io::{self, Write};
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::json;
use tracing_subscriber::EnvFilter;
use vr_translate_sdk::{
    DEFAULT_SOURCE_LANG, DEFAULT_TARGET_LANG, GazeData, ListenerError, ScreenshotRequest,
    SdkConfig, VrTranslateClient, unix_millis,
};

const SAMPLE_PNG_BASE64: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mP8/5+hHgAHggJ/PchI7wAAAABJRU5ErkJggg==";
const WEBSOCKET_WAIT: Duration = Duration::from_secs(3);
const LANGUAGE_PREVIEW: usize = 5;

#[derive(Clone, Copy, PartialEq, Eq)]
enum DemoMode {
    Comprehensive,
    Interactive,
}

struct DemoConfig {
    mode: DemoMode,
    sdk: SdkConfig,
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();

    let config = parse_config(std::env::args().skip(1).collect())?;
    init_tracing(config.debug);

    let client = VrTranslateClient::new(config.sdk)?;
    eprintln!(
        "translate_demo: base_url={}, websocket_url={}",
        client.config().base_url,
        client.config().websocket_url
    );

    match config.mode {
        DemoMode::Interactive => interactive_mode(&client).await?,
        DemoMode::Comprehensive => run_comprehensive_demo(&client).await,
    }

    client.close().await;
    Ok(())
}

fn init_tracing(debug: bool) {
    let default_directive = if debug {
        "vr_translate_sdk=debug,translate_demo=debug"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

async fn run_comprehensive_demo(client: &VrTranslateClient) {
    println!("VR translation service SDK demo");
    println!("{}", "=".repeat(60));

    demo_service_monitoring(client).await;
    demo_text_translation(client).await;
    demo_batch_translation(client).await;
    demo_ocr(client).await;
    demo_websocket(client).await;

    println!("\n{}", "=".repeat(60));
    println!("demo finished");
}

fn section(title: &str) {
    println!("\n{}", "=".repeat(60));
    println!("{title}");
    println!("{}", "=".repeat(60));
}

async fn demo_service_monitoring(client: &VrTranslateClient) {
    section("service monitoring");

    match client.get_languages().await {
        Ok(languages) => {
            println!("common languages: {}", languages.common.len());
            for language in languages.common.iter().take(LANGUAGE_PREVIEW) {
                println!(
                    "  - {}: {} ({})",
                    language.code,
                    language.name,
                    language.native_name.as_deref().unwrap_or("-")
                );
            }
            if languages.common.len() > LANGUAGE_PREVIEW {
                println!(
                    "  ... and {} more",
                    languages.common.len() - LANGUAGE_PREVIEW
                );
            }
        }
        Err(error) => eprintln!("error: failed to fetch languages: {error}"),
    }

    match client.get_stats().await {
        Ok(stats) => {
            println!("service: {} {}", stats.service.name, stats.service.version);
            println!("status:  {}", stats.service.status);
            println!("uptime:  {:.1}s", stats.service.uptime);
            if let Some(response_time) = stats.performance.get("responseTime") {
                println!("response time: {response_time}");
            }
            println!("features:");
            for (feature, supported) in &stats.features {
                println!("  - {feature}: {}", if *supported { "yes" } else { "no" });
            }
            println!("limits:");
            print_limit("max text length", stats.limits.max_text_length);
            print_limit("max batch size", stats.limits.max_batch_size);
            print_limit("max image size", stats.limits.max_image_size.as_ref());
            print_limit("rate limit", stats.limits.rate_limit.as_ref());
        }
        Err(error) => eprintln!("error: failed to fetch stats: {error}"),
    }
}

fn print_limit<T: std::fmt::Display>(label: &str, value: Option<T>) {
    match value {
        Some(value) => println!("  - {label}: {value}"),
        None => println!("  - {label}: n/a"),
    }
}

async fn demo_text_translation(client: &VrTranslateClient) {
    section("text translation");

    let samples = [
        ("Hello World!", "en", "zh-CN"),
        ("Good morning", "en", "zh-CN"),
        ("你好世界", "zh-CN", "en"),
        ("こんにちは", "ja", "zh-CN"),
        ("Bonjour le monde", "fr", "zh-CN"),
    ];

    for (text, source_lang, target_lang) in samples {
        println!("\n'{text}' ({source_lang} -> {target_lang})");
        match client.translate(text, source_lang, target_lang).await {
            Ok(result) => {
                println!("  original:    {}", result.original);
                println!("  translation: {}", result.translation);
                println!("  languages:   {} -> {}", result.source_lang, result.target_lang);
            }
            Err(error) => eprintln!("  error: {error}"),
        }
    }
}

async fn demo_batch_translation(client: &VrTranslateClient) {
    section("batch translation");

    let texts = [
        "Welcome to our VR translation service",
        "This is a powerful translation API",
        "It supports multiple languages",
        "Real-time translation is available",
        "WebSocket communication is supported",
    ];

    match client.batch_translate(&texts, "en", "zh-CN").await {
        Ok(result) => {
            println!(
                "total={}, successful={}, failed={}",
                result.total, result.successful, result.failed
            );
            for item in &result.results {
                match (&item.translation, &item.error) {
                    (Some(translation), _) if item.success => {
                        println!("  {}. {} -> {}", item.index + 1, item.original, translation)
                    }
                    (_, error) => println!(
                        "  {}. {} -> [error: {}]",
                        item.index + 1,
                        item.original,
                        error.as_deref().unwrap_or("unknown")
                    ),
                }
            }
        }
        Err(error) => eprintln!("error: batch translation failed: {error}"),
    }
}

async fn demo_ocr(client: &VrTranslateClient) {
    section("ocr");

    let image_bytes = match STANDARD.decode(SAMPLE_PNG_BASE64) {
        Ok(bytes) => bytes,
        Err(error) => {
            eprintln!("error: sample image is not valid base64: {error}");
            return;
        }
    };

    match client.ocr(image_bytes.clone(), DEFAULT_SOURCE_LANG).await {
        Ok(result) => {
            println!("  text:     {}", result.text);
            println!(
                "  language: {}",
                result.language.as_deref().unwrap_or("unknown")
            );
            if let Some(timestamp) = &result.timestamp {
                println!("  time:     {timestamp}");
            }
        }
        Err(error) => eprintln!("  error: ocr failed: {error}"),
    }

    match client.ocr_translate(image_bytes, "en", "zh-CN").await {
        Ok(result) => {
            println!("  original:    {}", result.original);
            println!("  translation: {}", result.translation);
            println!("  languages:   {} -> {}", result.source_lang, result.target_lang);
        }
        Err(error) => eprintln!("  error: ocr translation failed: {error}"),
    }
}

async fn demo_websocket(client: &VrTranslateClient) {
    section("websocket");

    if let Err(error) = client.connect_websocket().await {
        eprintln!("error: websocket connect failed: {error}");
        return;
    }

    client.on_message_fn("translation_result", |message| async move {
        println!("[translation_result] {}", message.payload);
        Ok::<(), ListenerError>(())
    });
    client.on_message_fn("system", |message| async move {
        println!("[system] {}", message.payload);
        Ok::<(), ListenerError>(())
    });

    let result = async {
        client
            .send_gaze_data(&GazeData {
                x: 150.0,
                y: 250.0,
                timestamp: unix_millis(),
                confidence: Some(0.92),
            })
            .await?;
        println!("gaze data sent");

        client
            .send_screenshot(&ScreenshotRequest {
                image: format!("data:image/png;base64,{SAMPLE_PNG_BASE64}"),
                source_lang: "en".to_string(),
                target_lang: "zh-CN".to_string(),
            })
            .await?;
        println!("screenshot sent");

        client
            .send_config(&json!({
                "gaze": { "threshold": 2.5, "radius": 60 },
                "translation": { "sourceLanguage": "en", "targetLanguage": "zh-CN" }
            }))
            .await?;
        println!("config sent");

        println!("waiting {}s for messages...", WEBSOCKET_WAIT.as_secs());
        tokio::time::sleep(WEBSOCKET_WAIT).await;
        Ok::<(), vr_translate_sdk::SdkError>(())
    }
    .await;

    if let Err(error) = result {
        eprintln!("error: websocket demo failed: {error}");
    }

    client.disconnect_websocket().await;
    println!("websocket disconnected");
}

async fn interactive_mode(client: &VrTranslateClient) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("interactive mode: type text to translate, 'quit' to exit");
    let stdin = io::stdin();

    loop {
        let Some(text) = prompt(&stdin, "text> ")? else {
            break;
        };
        if matches!(text.to_ascii_lowercase().as_str(), "quit" | "exit" | "q") {
            break;
        }
        if text.is_empty() {
            continue;
        }

        let source_lang = prompt(&stdin, &format!("source [{DEFAULT_SOURCE_LANG}]> "))?
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_SOURCE_LANG.to_string());
        let target_lang = prompt(&stdin, &format!("target [{DEFAULT_TARGET_LANG}]> "))?
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_TARGET_LANG.to_string());

        match client.translate(text, &source_lang, &target_lang).await {
            Ok(result) => {
                println!("original:    {}", result.original);
                println!("translation: {}", result.translation);
                println!("languages:   {} -> {}", result.source_lang, result.target_lang);
            }
            Err(error) => eprintln!("error: {error}"),
        }
    }

    Ok(())
}

fn prompt(stdin: &io::Stdin, label: &str) -> io::Result<Option<String>> {
    print!("{label}");
    io::stdout().flush()?;

    let mut input = String::new();
    if stdin.read_line(&mut input)? == 0 {
        return Ok(None);
    }
    Ok(Some(input.trim().to_string()))
}

fn parse_config(args: Vec<String>) -> Result<DemoConfig, Box<dyn std::error::Error>> {
    let mut sdk = SdkConfig::from_env()?;
    let mut mode = DemoMode::Comprehensive;
    let mut debug = false;

    let mut i = 0usize;
    while i < args.len() {
        match args[i].as_str() {
            "--interactive" | "-i" => {
                mode = DemoMode::Interactive;
                i += 1;
            }
            "--demo" | "-d" => {
                mode = DemoMode::Comprehensive;
                i += 1;
            }
            "--debug" => {
                debug = true;
                i += 1;
            }
            "--base-url" => {
                let value = args.get(i + 1).ok_or("missing value for --base-url")?;
                sdk = sdk.with_base_url(value.as_str());
                i += 2;
            }
            "--ws-url" => {
                let value = args.get(i + 1).ok_or("missing value for --ws-url")?;
                sdk = sdk.with_websocket_url(value.as_str());
                i += 2;
            }
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            other => {
                return Err(format!("unknown argument: {other}").into());
            }
        }
    }

    sdk.validate()?;
    Ok(DemoConfig { mode, sdk, debug })
}

fn print_help() {
    println!(
        "Usage:\n  cargo run --bin translate_demo -- [--demo | --interactive] [--base-url URL] [--ws-url URL] [--debug]\n\nEnv:\n  VR_TRANSLATE_BASE_URL   (default http://localhost:8080)\n  VR_TRANSLATE_WS_URL     (default ws://localhost:8081)\n  VR_TRANSLATE_TIMEOUT_MS (default 10000)\n  VR_TRANSLATE_RETRIES    (default 3)\n  VR_TRANSLATE_API_KEY\n  RUST_LOG\n\nInteractive commands:\n  quit | exit | q"
    );
}
