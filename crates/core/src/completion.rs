use crate::traits::CompletionClient;
use crate::GenerationError;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use url::Url;

pub const DEFAULT_INFERENCE_ENDPOINT: &str = "https://api-inference.huggingface.co/models/";
pub const DEFAULT_INFERENCE_MODEL: &str = "google/flan-t5-small";

#[derive(Debug, Clone)]
pub struct InferenceConfig {
    /// Base URL; the model name is joined onto it.
    pub endpoint: String,
    pub model: String,
    pub api_token: String,
    pub timeout: Duration,
    pub max_length: u32,
    pub temperature: f32,
}

impl InferenceConfig {
    pub fn new(api_token: impl Into<String>) -> Self {
        Self {
            endpoint: DEFAULT_INFERENCE_ENDPOINT.to_string(),
            model: DEFAULT_INFERENCE_MODEL.to_string(),
            api_token: api_token.into(),
            timeout: Duration::from_secs(30),
            max_length: 200,
            temperature: 0.1,
        }
    }
}

#[derive(Debug, Serialize)]
struct InferenceRequest<'a> {
    inputs: &'a str,
    parameters: InferenceParameters,
}

#[derive(Debug, Serialize)]
struct InferenceParameters {
    max_length: u32,
    temperature: f32,
    do_sample: bool,
    return_full_text: bool,
}

/// Text generation through the Hugging Face inference API.
#[derive(Debug, Clone)]
pub struct HuggingFaceClient {
    url: Url,
    api_token: String,
    max_length: u32,
    temperature: f32,
    client: Client,
}

impl HuggingFaceClient {
    pub fn new(config: InferenceConfig) -> Result<Self, GenerationError> {
        let mut base = config.endpoint.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let url = Url::parse(&base)?.join(config.model.trim_start_matches('/'))?;

        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            url,
            api_token: config.api_token,
            max_length: config.max_length,
            temperature: config.temperature,
            client,
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl CompletionClient for HuggingFaceClient {
    async fn complete(&self, prompt: &str) -> Result<String, GenerationError> {
        let payload = InferenceRequest {
            inputs: prompt,
            parameters: InferenceParameters {
                max_length: self.max_length,
                temperature: self.temperature,
                do_sample: true,
                return_full_text: false,
            },
        };

        let response = self
            .client
            .post(self.url.clone())
            .bearer_auth(&self.api_token)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: Value = response.json().await?;
        let generated = generated_text(&parsed)?;
        Ok(clean_completion(&generated, prompt))
    }
}

/// Pulls the generated text out of the shapes the inference API returns:
/// a list of `{generated_text}` / `{summary_text}` objects, or a single
/// object carrying `generated_text` or `error`.
fn generated_text(payload: &Value) -> Result<String, GenerationError> {
    let text_of = |item: &Value| {
        item.get("generated_text")
            .or_else(|| item.get("summary_text"))
            .and_then(Value::as_str)
            .map(str::to_string)
    };

    match payload {
        Value::Array(items) => items
            .first()
            .and_then(text_of)
            .ok_or_else(|| GenerationError::UnexpectedPayload(payload.to_string())),
        Value::Object(map) => {
            if let Some(text) = text_of(payload) {
                Ok(text)
            } else if let Some(error) = map.get("error") {
                Err(GenerationError::Api(
                    error.as_str().map_or_else(|| error.to_string(), str::to_string),
                ))
            } else {
                Err(GenerationError::UnexpectedPayload(payload.to_string()))
            }
        }
        other => Err(GenerationError::UnexpectedPayload(other.to_string())),
    }
}

/// Drops an echoed prompt and anything up to the last `Answer:` marker.
pub fn clean_completion(raw: &str, prompt: &str) -> String {
    let mut text = raw.trim();
    if let Some(rest) = text.strip_prefix(prompt.trim()) {
        text = rest.trim();
    }
    if let Some((_, after)) = text.rsplit_once("Answer:") {
        text = after.trim();
    }
    text.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer) -> InferenceConfig {
        InferenceConfig {
            endpoint: format!("{}/models", server.uri()),
            model: "acme/tiny".to_string(),
            timeout: Duration::from_secs(2),
            ..InferenceConfig::new("hf_test_token")
        }
    }

    #[test]
    fn model_is_joined_onto_the_endpoint() {
        let client = HuggingFaceClient::new(InferenceConfig::new("token")).unwrap();
        assert_eq!(
            client.url().as_str(),
            "https://api-inference.huggingface.co/models/google/flan-t5-small"
        );
    }

    #[test]
    fn completion_is_cleaned() {
        let prompt = "Context: x\n\nQuestion: y\n\nAnswer:";
        assert_eq!(clean_completion("  Paris  ", prompt), "Paris");
        assert_eq!(clean_completion(&format!("{prompt} Paris"), prompt), "Paris");
        assert_eq!(clean_completion("junk Answer: Paris", prompt), "Paris");
    }

    #[test]
    fn payload_shapes_are_understood() {
        assert_eq!(
            generated_text(&json!([{"generated_text": "a"}])).unwrap(),
            "a"
        );
        assert_eq!(generated_text(&json!([{"summary_text": "b"}])).unwrap(), "b");
        assert_eq!(generated_text(&json!({"generated_text": "c"})).unwrap(), "c");
        assert!(matches!(
            generated_text(&json!({"error": "Model is loading"})),
            Err(GenerationError::Api(message)) if message == "Model is loading"
        ));
        assert!(matches!(
            generated_text(&json!([])),
            Err(GenerationError::UnexpectedPayload(_))
        ));
        assert!(generated_text(&json!("plain")).is_err());
    }

    #[tokio::test]
    async fn posts_prompt_with_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/acme/tiny"))
            .and(header("authorization", "Bearer hf_test_token"))
            .and(body_partial_json(json!({
                "inputs": "What is up?",
                "parameters": {"return_full_text": false}
            })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!([{"generated_text": " The sky. "}])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = HuggingFaceClient::new(config_for(&server)).unwrap();
        let answer = client.complete("What is up?").await.unwrap();
        assert_eq!(answer, "The sky.");
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let client = HuggingFaceClient::new(config_for(&server)).unwrap();
        let error = client.complete("prompt").await.unwrap_err();
        assert!(matches!(error, GenerationError::Status { status: 503, ref body } if body == "overloaded"));
    }

    #[tokio::test]
    async fn slow_endpoint_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_delay(Duration::from_millis(800))
                    .set_body_json(json!([{"generated_text": "late"}])),
            )
            .mount(&server)
            .await;

        let client = HuggingFaceClient::new(InferenceConfig {
            timeout: Duration::from_millis(100),
            ..config_for(&server)
        })
        .unwrap();

        let error = client.complete("prompt").await.unwrap_err();
        assert!(matches!(error, GenerationError::Http(ref inner) if inner.is_timeout()));
    }
}
