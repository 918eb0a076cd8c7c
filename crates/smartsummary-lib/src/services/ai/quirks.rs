// OpenAI model quirks
// Newer reasoning models reject `max_tokens` and any temperature but 1

/// Name of the JSON field carrying the output token limit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenParam {
    MaxTokens,
    MaxCompletionTokens,
}

impl TokenParam {
    pub fn field_name(&self) -> &'static str {
        match self {
            TokenParam::MaxTokens => "max_tokens",
            TokenParam::MaxCompletionTokens => "max_completion_tokens",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelRule {
    pub prefix: String,
    pub token_param: TokenParam,
    /// Temperature the model insists on; the request value is replaced
    pub fixed_temperature: Option<f32>,
}

impl ModelRule {
    pub fn new(prefix: impl Into<String>, token_param: TokenParam, fixed_temperature: Option<f32>) -> Self {
        Self {
            prefix: prefix.into(),
            token_param,
            fixed_temperature,
        }
    }
}

/// Prefix table resolved by longest match
#[derive(Debug, Clone)]
pub struct ModelQuirks {
    rules: Vec<ModelRule>,
}

impl Default for ModelQuirks {
    fn default() -> Self {
        let reasoning = |prefix: &str| ModelRule::new(prefix, TokenParam::MaxCompletionTokens, Some(1.0));
        Self {
            rules: vec![
                reasoning("gpt-5"),
                reasoning("gpt-5-mini"),
                reasoning("gpt-5-nano"),
                reasoning("o1"),
                reasoning("o3"),
                reasoning("o4"),
            ],
        }
    }
}

impl ModelQuirks {
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Add a rule, replacing any rule with the same prefix
    pub fn with_rule(mut self, rule: ModelRule) -> Self {
        self.rules.retain(|r| r.prefix != rule.prefix);
        self.rules.push(rule);
        self
    }

    pub fn resolve(&self, model: &str) -> Option<&ModelRule> {
        let model = model.to_lowercase();
        self.rules
            .iter()
            .filter(|r| model.starts_with(&r.prefix))
            .max_by_key(|r| r.prefix.len())
    }

    pub fn token_param(&self, model: &str) -> TokenParam {
        self.resolve(model)
            .map(|r| r.token_param)
            .unwrap_or(TokenParam::MaxTokens)
    }

    pub fn temperature(&self, model: &str, requested: Option<f32>) -> Option<f32> {
        match self.resolve(model).and_then(|r| r.fixed_temperature) {
            Some(fixed) => Some(fixed),
            None => requested,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_rules() {
        let quirks = ModelQuirks::default();
        assert_eq!(quirks.token_param("gpt-4o-mini"), TokenParam::MaxTokens);
        assert_eq!(quirks.token_param("gpt-5-mini-2025"), TokenParam::MaxCompletionTokens);
        assert_eq!(quirks.token_param("o3-mini"), TokenParam::MaxCompletionTokens);
        assert_eq!(quirks.temperature("o1-preview", Some(0.7)), Some(1.0));
        assert_eq!(quirks.temperature("gpt-4o", Some(0.7)), Some(0.7));
    }

    #[test]
    fn test_longest_prefix_wins() {
        let quirks = ModelQuirks::default()
            .with_rule(ModelRule::new("gpt-5-chat", TokenParam::MaxTokens, None));
        assert_eq!(quirks.token_param("gpt-5-chat-latest"), TokenParam::MaxTokens);
        assert_eq!(quirks.temperature("gpt-5-chat-latest", Some(0.3)), Some(0.3));
        assert_eq!(quirks.token_param("gpt-5"), TokenParam::MaxCompletionTokens);
    }

    #[test]
    fn test_with_rule_replaces_same_prefix() {
        let quirks = ModelQuirks::empty()
            .with_rule(ModelRule::new("x", TokenParam::MaxTokens, None))
            .with_rule(ModelRule::new("x", TokenParam::MaxCompletionTokens, None));
        assert_eq!(quirks.token_param("x1"), TokenParam::MaxCompletionTokens);
    }
}
