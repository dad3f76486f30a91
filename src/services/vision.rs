use base64::{Engine as _, engine::general_purpose};
use serde::Deserialize;
use crate::config::Config;
use crate::error::ExtractionError;
use crate::models::extraction::ExtractionCandidate;

/// Title length cap for a candidate.
const MAX_TITLE_CHARS: usize = 100;
/// Description length cap for a candidate.
const MAX_DESCRIPTION_CHARS: usize = 500;

const SYSTEM_PROMPT: &str = "You are an assistant specialized in extracting calendar events from images. \
Analyze the provided image and extract any calendar events, meetings, appointments, or scheduled \
activities you can identify. Return your response as a JSON array. Each element must be an object \
with the string keys: title, date, time, location, description, plus a confidence object scoring \
each of those five fields between 0.0 and 1.0. Use an empty string for any field that is not \
visible in the image. If no calendar events are found, return an empty array: []";

const USER_PROMPT: &str = "Please analyze this image and extract any calendar events, appointments, \
or scheduled activities you can find. Return the results as a JSON array.";

#[derive(Deserialize)]
struct ChatCompletion {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: String,
}

/// Sends an uploaded image to the external vision endpoint and maps the
/// reply into candidate calendar events.
///
/// A single call is attempted; there is no retry. Nothing is persisted
/// here - the admin confirms candidates before they become events. An
/// image with no detectable events yields `Ok` with an empty list.
///
/// # Arguments
///
/// * `http` - The shared HTTP client (carries the bounded timeout).
/// * `config` - The application's configuration.
/// * `image_bytes` - The raw uploaded image.
///
/// # Returns
///
/// A `Result` containing the proposed candidates.
pub async fn extract_events(
    http: &reqwest::Client,
    config: &Config,
    image_bytes: &[u8],
) -> Result<Vec<ExtractionCandidate>, ExtractionError> {
    let endpoint = config.vision_endpoint.as_deref().ok_or_else(|| {
        ExtractionError::ServiceUnavailable("VISION_ENDPOINT is not configured".to_string())
    })?;

    let base64_image = general_purpose::STANDARD.encode(image_bytes);
    let url = format!(
        "{}/openai/deployments/{}/chat/completions?api-version={}",
        endpoint.trim_end_matches('/'),
        config.vision_deployment,
        config.vision_api_version
    );

    let body = sonic_rs::json!({
        "messages": [
            { "role": "system", "content": SYSTEM_PROMPT },
            {
                "role": "user",
                "content": [
                    { "type": "text", "text": USER_PROMPT },
                    {
                        "type": "image_url",
                        "image_url": {
                            "url": format!("data:image/jpeg;base64,{}", base64_image),
                            "detail": "high"
                        }
                    }
                ]
            }
        ],
        "max_tokens": 2000,
        "temperature": 0.1
    });

    let mut request = http.post(&url).json(&body);
    if let Some(key) = &config.vision_api_key {
        request = request.header("api-key", key.as_str());
    }

    tracing::debug!("🤖 Sending {} image bytes to vision endpoint", image_bytes.len());

    let response = request.send().await.map_err(|e| {
        if e.is_timeout() {
            ExtractionError::ServiceUnavailable("vision call timed out".to_string())
        } else {
            ExtractionError::ServiceUnavailable(e.to_string())
        }
    })?;

    let status = response.status();
    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        return Err(ExtractionError::Auth);
    }
    if !status.is_success() {
        return Err(ExtractionError::ServiceUnavailable(format!(
            "vision endpoint answered {}",
            status
        )));
    }

    let body = response
        .text()
        .await
        .map_err(|e| ExtractionError::ServiceUnavailable(e.to_string()))?;

    let completion: ChatCompletion = sonic_rs::from_str(&body)
        .map_err(|e| ExtractionError::InvalidResponse(format!("completion envelope: {}", e)))?;

    let content = completion
        .choices
        .first()
        .map(|c| c.message.content.trim().to_string())
        .ok_or_else(|| ExtractionError::InvalidResponse("no choices in completion".to_string()))?;

    let candidates = parse_candidates(&content)?;
    tracing::info!("✅ Vision service proposed {} candidate events", candidates.len());

    Ok(candidates)
}

/// Maps the model's reply text into candidates.
///
/// The reply is expected to be a JSON array, possibly wrapped in
/// markdown code fences. Candidates without a title are dropped; field
/// lengths and confidences are clamped.
fn parse_candidates(content: &str) -> Result<Vec<ExtractionCandidate>, ExtractionError> {
    let stripped = strip_code_fences(content);

    let raw: Vec<ExtractionCandidate> = sonic_rs::from_str(stripped)
        .map_err(|e| ExtractionError::InvalidResponse(format!("candidate array: {}", e)))?;

    Ok(raw
        .into_iter()
        .filter(|candidate| !candidate.title.trim().is_empty())
        .map(|mut candidate| {
            candidate.title = truncate_chars(&candidate.title, MAX_TITLE_CHARS);
            candidate.description = truncate_chars(&candidate.description, MAX_DESCRIPTION_CHARS);
            candidate.confidence.title = candidate.confidence.title.clamp(0.0, 1.0);
            candidate.confidence.date = candidate.confidence.date.clamp(0.0, 1.0);
            candidate.confidence.time = candidate.confidence.time.clamp(0.0, 1.0);
            candidate.confidence.location = candidate.confidence.location.clamp(0.0, 1.0);
            candidate.confidence.description = candidate.confidence.description.clamp(0.0, 1.0);
            candidate
        })
        .collect())
}

fn strip_code_fences(content: &str) -> &str {
    let trimmed = content.trim();
    let without_open = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    without_open
        .strip_suffix("```")
        .unwrap_or(without_open)
        .trim()
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
