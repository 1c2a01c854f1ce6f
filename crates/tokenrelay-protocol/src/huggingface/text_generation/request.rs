use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_NEW_TOKENS: u32 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextGenerationParameters {
    pub max_new_tokens: u32,
    pub return_full_text: bool,
}

impl Default for TextGenerationParameters {
    fn default() -> Self {
        Self {
            max_new_tokens: DEFAULT_MAX_NEW_TOKENS,
            return_full_text: false,
        }
    }
}

/// Payload of a hosted-inference text generation call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextGenerationRequest {
    pub inputs: String,
    pub parameters: TextGenerationParameters,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn serializes_to_inference_shape() {
        let body = TextGenerationRequest {
            inputs: "Once upon a time".to_string(),
            parameters: TextGenerationParameters::default(),
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({
                "inputs": "Once upon a time",
                "parameters": { "max_new_tokens": 60, "return_full_text": false }
            })
        );
    }
}
