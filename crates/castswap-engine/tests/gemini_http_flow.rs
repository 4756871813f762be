use std::path::{Path, PathBuf};

use castswap_contracts::failures::{FailureKind, AUTH_KEY_INVALID_MESSAGE, SAFETY_MESSAGE};
use castswap_engine::{ApiKeyStore, GeminiImageClient, Studio, StudioConfig};
use image::{Rgb, RgbImage};
use mockito::{Matcher, Server};
use serde_json::json;

const ENDPOINT_PATH: &str = "/v1beta/models/test-image-model:generateContent";

fn config_for(server_url: &str) -> StudioConfig {
    StudioConfig {
        api_base: format!("{server_url}/v1beta"),
        model: "test-image-model".to_string(),
        max_persons: 5,
    }
}

fn write_png(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    let path = dir.join(name);
    RgbImage::from_pixel(width, height, Rgb([90, 90, 90]))
        .save(&path)
        .expect("test image should save");
    path
}

fn ready_studio(
    server_url: &str,
    dir: &Path,
    persons: usize,
) -> Studio<GeminiImageClient, ApiKeyStore> {
    let client = GeminiImageClient::new(&config_for(server_url)).expect("client should build");
    let mut studio =
        Studio::new(client, ApiKeyStore::with_key("test-key"), 5, None).expect("studio should start");
    studio
        .upload_poster(&write_png(dir, "poster.png", 1000, 1500))
        .expect("poster should ingest");
    let person_paths: Vec<PathBuf> = (0..persons)
        .map(|idx| write_png(dir, &format!("person-{idx}.png"), 64, 64))
        .collect();
    let report = studio.upload_persons(&person_paths);
    assert_eq!(report.added.len(), persons, "persons should ingest");
    studio
}

#[test]
fn poster_swap_returns_png_data_url_through_http_mock() {
    let mut server = Server::new();
    let temp = tempfile::tempdir().expect("tempdir");
    let mock = server
        .mock("POST", ENDPOINT_PATH)
        .match_query(Matcher::UrlEncoded("key".into(), "test-key".into()))
        .match_body(Matcher::PartialJson(json!({
            "generationConfig": {
                "imageConfig": {"aspectRatio": "3:4", "imageSize": "1K"}
            }
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "candidates": [{
                    "content": {"parts": [{"inlineData": {"mimeType": "image/png", "data": "XYZ"}}]},
                    "finishReason": "STOP"
                }]
            })
            .to_string(),
        )
        .create();

    let mut studio = ready_studio(&server.url(), temp.path(), 2);
    let outcome = studio.generate().expect("generation should not hit infrastructure errors");

    mock.assert();
    let image = outcome.expect("mocked response should yield an image");
    assert_eq!(image.data_url, "data:image/png;base64,XYZ");
    assert_eq!(
        studio.state().result.as_ref().map(|result| result.data_url.as_str()),
        Some("data:image/png;base64,XYZ")
    );
    assert!(studio.state().error.is_none());
}

#[test]
fn request_body_orders_poster_persons_then_instruction() {
    let mut server = Server::new();
    let temp = tempfile::tempdir().expect("tempdir");
    let mock = server
        .mock("POST", ENDPOINT_PATH)
        .match_query(Matcher::Any)
        .match_body(Matcher::Regex(
            r#""parts":\[\{"inlineData":\{[^}]+\}\},\{"inlineData":\{[^}]+\}\},\{"text":"You are an expert"#
                .to_string(),
        ))
        .with_status(200)
        .with_body(r#"{"candidates":[{"content":{"parts":[{"inlineData":{"data":"QQ=="}}]}}]}"#)
        .create();

    let mut studio = ready_studio(&server.url(), temp.path(), 1);
    let outcome = studio.generate().expect("generation should run");

    mock.assert();
    assert!(outcome.is_ok());
}

#[test]
fn missing_poster_never_reaches_the_service() {
    let mut server = Server::new();
    let mock = server
        .mock("POST", ENDPOINT_PATH)
        .match_query(Matcher::Any)
        .expect(0)
        .create();

    let client = GeminiImageClient::new(&config_for(&server.url())).expect("client should build");
    let mut studio =
        Studio::new(client, ApiKeyStore::with_key("test-key"), 5, None).expect("studio should start");
    let failure = studio
        .generate()
        .expect("precondition failures are outcomes")
        .expect_err("generation must not succeed without a poster");

    mock.assert();
    assert_eq!(failure.kind, FailureKind::MissingPoster);
}

#[test]
fn entity_not_found_resets_key_selection() {
    let mut server = Server::new();
    let temp = tempfile::tempdir().expect("tempdir");
    let mock = server
        .mock("POST", ENDPOINT_PATH)
        .match_query(Matcher::Any)
        .with_status(404)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"error":{"code":404,"message":"Requested entity was not found.","status":"NOT_FOUND"}}"#,
        )
        .create();

    let mut studio = ready_studio(&server.url(), temp.path(), 1);
    assert!(studio.state().api_key_selected);
    let failure = studio
        .generate()
        .expect("generation should run")
        .expect_err("404 must fail");

    mock.assert();
    assert_eq!(failure.kind, FailureKind::AuthKeyInvalid);
    assert_eq!(failure.message, AUTH_KEY_INVALID_MESSAGE);
    assert!(!studio.state().api_key_selected);
    assert_eq!(
        studio.state().error.as_ref().map(|error| error.kind),
        Some(FailureKind::AuthKeyInvalid)
    );
}

#[test]
fn safety_block_and_text_feedback_are_classified() {
    let mut server = Server::new();
    let temp = tempfile::tempdir().expect("tempdir");
    let safety = server
        .mock("POST", ENDPOINT_PATH)
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"candidates":[{"finishReason":"SAFETY"}]}"#)
        .expect(1)
        .create();

    let mut studio = ready_studio(&server.url(), temp.path(), 1);
    let failure = studio
        .generate()
        .expect("generation should run")
        .expect_err("safety block must fail");
    safety.assert();
    assert_eq!(failure.kind, FailureKind::Safety);
    assert_eq!(failure.message, SAFETY_MESSAGE);
    safety.remove();

    let feedback = server
        .mock("POST", ENDPOINT_PATH)
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"candidates":[{"content":{"parts":[{"text":"Please provide clearer face photos."}]}}]}"#)
        .create();
    let failure = studio
        .generate()
        .expect("generation should run")
        .expect_err("text-only response must fail");
    feedback.assert();
    assert_eq!(failure.kind, FailureKind::ModelTextFeedback);
    assert_eq!(failure.message, "Please provide clearer face photos.");
    assert!(studio.state().api_key_selected);
}

#[test]
fn server_errors_surface_status_and_body() {
    let mut server = Server::new();
    let temp = tempfile::tempdir().expect("tempdir");
    let mock = server
        .mock("POST", ENDPOINT_PATH)
        .match_query(Matcher::Any)
        .with_status(500)
        .with_body(r#"{"error":{"message":"backend overloaded"}}"#)
        .create();

    let mut studio = ready_studio(&server.url(), temp.path(), 1);
    let failure = studio
        .generate()
        .expect("generation should run")
        .expect_err("500 must fail");

    mock.assert();
    assert_eq!(failure.kind, FailureKind::Generic);
    assert!(failure.message.contains("(500)"), "{}", failure.message);
    assert!(failure.message.contains("backend overloaded"));
}

#[test]
fn entity_not_found_after_long_details_still_resets_key() {
    let mut server = Server::new();
    let temp = tempfile::tempdir().expect("tempdir");
    let body = json!({
        "error": {
            "code": 404,
            "details": "z".repeat(600),
            "message": "Requested entity was not found.",
            "status": "NOT_FOUND"
        }
    })
    .to_string();
    assert!(body.find("Requested entity").unwrap_or(0) > 512);
    let mock = server
        .mock("POST", ENDPOINT_PATH)
        .match_query(Matcher::Any)
        .with_status(404)
        .with_header("content-type", "application/json")
        .with_body(body)
        .create();

    let mut studio = ready_studio(&server.url(), temp.path(), 1);
    let failure = studio
        .generate()
        .expect("generation should run")
        .expect_err("404 must fail");

    mock.assert();
    assert_eq!(failure.kind, FailureKind::AuthKeyInvalid);
    assert!(!studio.state().api_key_selected);
}
