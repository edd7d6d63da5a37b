//! Free-text analysis of a reading through a text-generation port.
//!
//! The port is a trait so the HTTP backend can be swapped for a test
//! double. One attempt per request, no retry.

use std::sync::Arc;

use crate::divination::ElementResult;
use crate::error::{GenerationError, OracleError};

/// A text-generation backend: prompt in, text out.
pub trait TextGenerator: Send + Sync {
    fn generate(&self, prompt: &str) -> Result<String, GenerationError>;

    /// Backend name for logging.
    fn name(&self) -> &str;
}

/// Type-erased generator for dynamic dispatch.
pub type BoxedGenerator = Arc<dyn TextGenerator>;

/// Build the analysis prompt for a reading and an optional keyword.
pub fn build_prompt(result: &ElementResult, keyword: &str) -> String {
    let mut prompt = String::from("以下是一次小六壬占卜的三個結果（名稱=數字 方位 五行 守護神）：\n");
    for (i, e) in result.as_array().iter().enumerate() {
        prompt.push_str(&format!(
            "{}. {}（{}，{}方位，五行屬{}，守護神{}）\n",
            i + 1,
            e.label,
            e.name,
            e.direction,
            e.phase,
            e.guardian
        ));
    }
    let keyword = keyword.trim();
    if !keyword.is_empty() {
        prompt.push_str(&format!("使用者關心的關鍵字：{}\n", keyword));
    }
    prompt.push_str("請依據三者的順序、方位與五行生剋，用繁體中文給出簡短的分析與建議。");
    prompt
}

/// Sends reading prompts to a [`TextGenerator`].
#[derive(Clone)]
pub struct AnalysisRequester {
    generator: BoxedGenerator,
}

impl AnalysisRequester {
    pub fn new(generator: BoxedGenerator) -> Self {
        Self { generator }
    }

    pub fn generator_name(&self) -> &str {
        self.generator.name()
    }

    /// Request an analysis; failures become `AnalysisUnavailable`.
    pub fn request(&self, result: &ElementResult, keyword: &str) -> Result<String, OracleError> {
        let prompt = build_prompt(result, keyword);
        log::debug!(
            "requesting analysis from {} ({} bytes)",
            self.generator.name(),
            prompt.len()
        );
        self.generator.generate(&prompt).map_err(|e| {
            log::warn!("analysis via {} failed: {}", self.generator.name(), e);
            OracleError::AnalysisUnavailable(e.to_string())
        })
    }
}


#[cfg(test)]
mod tests {
    use super::testing::ScriptedGenerator;
    use super::*;
    use crate::divination::map_elements;

    #[test]
    fn prompt_embeds_elements_and_keyword() {
        let prompt = build_prompt(&map_elements(5, 3, 2), "  工作 ");
        assert!(prompt.contains("1. 小吉=5北方水玄武"));
        assert!(prompt.contains("2. 病符=7西南金白虎"));
        assert!(prompt.contains("3. 桃花=8东北土勾陈"));
        assert!(prompt.contains("關鍵字：工作\n"));
    }

    #[test]
    fn prompt_without_keyword() {
        let prompt = build_prompt(&map_elements(1, 1, 1), "   ");
        assert!(!prompt.contains("關鍵字"));
    }

    #[test]
    fn returns_text_verbatim() {
        let generator = Arc::new(ScriptedGenerator::replying("  吉中帶險。\n"));
        let requester = AnalysisRequester::new(generator.clone());

        let text = requester.request(&map_elements(1, 2, 3), "").unwrap();
        assert_eq!(text, "  吉中帶險。\n");
        assert_eq!(generator.calls(), 1);
        assert_eq!(requester.generator_name(), "scripted");
    }

    #[test]
    fn failure_is_analysis_unavailable() {
        let generator = Arc::new(ScriptedGenerator::failing("quota exceeded"));
        let requester = AnalysisRequester::new(generator.clone());

        let err = requester.request(&map_elements(1, 2, 3), "愛情").unwrap_err();
        match err {
            OracleError::AnalysisUnavailable(msg) => assert!(msg.contains("quota exceeded")),
            other => panic!("unexpected error: {:?}", other),
        }
        // single attempt, no retry
        assert_eq!(generator.calls(), 1);
    }
}
