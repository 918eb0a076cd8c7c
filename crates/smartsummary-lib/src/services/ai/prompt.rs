// Prompt Builder
// Turns summary settings and chat history into provider-neutral messages

use std::collections::HashMap;

use crate::models::{
    ChatMessage, ChatRole, Language, PromptMessage, SourceType, SummaryLength, SummarySettings,
    SummaryStyle,
};

/// Builds summary prompts and chat message lists
#[derive(Debug, Clone, Default)]
pub struct PromptBuilder {
    /// Custom style id -> style description
    custom_styles: HashMap<String, String>,
}

impl PromptBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_custom_styles(mut self, custom_styles: HashMap<String, String>) -> Self {
        self.custom_styles = custom_styles;
        self
    }

    fn length_instruction(length: SummaryLength) -> &'static str {
        match length {
            SummaryLength::Short => "简洁的摘要（100-200字）",
            SummaryLength::Medium => "中等长度的摘要（200-400字）",
            SummaryLength::Long => "详细的摘要（400-600字）",
        }
    }

    fn style_instruction(&self, style: &SummaryStyle) -> String {
        match style {
            SummaryStyle::Bullet => "使用要点列表的形式".to_string(),
            SummaryStyle::Paragraph => "使用段落的形式".to_string(),
            SummaryStyle::Qa => "使用问答的形式".to_string(),
            SummaryStyle::Custom(id) => match self.custom_styles.get(id) {
                Some(description) => format!("按照以下风格要求：{}", description),
                None => {
                    log::warn!("Unknown custom style '{}', using its id as the instruction", id);
                    format!("使用“{}”风格", id)
                }
            },
        }
    }

    fn language_instruction(language: Language) -> &'static str {
        match language {
            Language::Zh => "用中文回复",
            Language::En => "用英文回复",
            Language::Auto => "根据内容的主要语言来回复",
        }
    }

    /// Single user prompt asking for a summary of `content`
    pub fn summary_prompt(&self, content: &str, settings: &SummarySettings, source_type: SourceType) -> String {
        let type_text = match source_type {
            SourceType::Page => "网页内容",
            SourceType::Selection => "选中的文本内容",
        };

        format!(
            "请对以下{}进行智能摘要。要求：\n1. {}\n2. {}\n3. {}\n4. 提取关键信息和主要观点\n5. 保持客观准确\n\n内容：\n{}",
            type_text,
            Self::length_instruction(settings.length),
            self.style_instruction(&settings.style),
            Self::language_instruction(settings.language),
            content
        )
    }

    pub fn summary_messages(
        &self,
        content: &str,
        settings: &SummarySettings,
        source_type: SourceType,
    ) -> Vec<PromptMessage> {
        vec![PromptMessage::user(self.summary_prompt(content, settings, source_type))]
    }

    /// System message carrying the summary context, then the full history
    pub fn chat_messages(&self, history: &[ChatMessage], context: Option<&str>) -> Vec<PromptMessage> {
        let mut messages = Vec::with_capacity(history.len() + 1);

        if let Some(context) = context.filter(|c| !c.is_empty()) {
            messages.push(PromptMessage::system(format!(
                "你是一个智能助手。用户基于以下摘要内容与你对话：\n\n{}\n\n请基于这个摘要内容回答用户的问题，保持回答的准确性和相关性。",
                context
            )));
        }

        messages.extend(history.iter().map(|m| match m.role {
            ChatRole::User => PromptMessage::user(m.content.clone()),
            ChatRole::Assistant => PromptMessage::assistant(m.content.clone()),
        }));

        messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MessageRole;

    #[test]
    fn test_summary_prompt_layout() {
        let settings = SummarySettings {
            length: SummaryLength::Short,
            style: SummaryStyle::Bullet,
            language: Language::Zh,
        };
        let prompt = PromptBuilder::new().summary_prompt("正文", &settings, SourceType::Page);
        assert_eq!(
            prompt,
            "请对以下网页内容进行智能摘要。要求：\n1. 简洁的摘要（100-200字）\n2. 使用要点列表的形式\n3. 用中文回复\n4. 提取关键信息和主要观点\n5. 保持客观准确\n\n内容：\n正文"
        );
    }

    #[test]
    fn test_selection_and_axes() {
        let settings = SummarySettings {
            length: SummaryLength::Long,
            style: SummaryStyle::Qa,
            language: Language::En,
        };
        let prompt = PromptBuilder::new().summary_prompt("x", &settings, SourceType::Selection);
        assert!(prompt.starts_with("请对以下选中的文本内容进行智能摘要"));
        assert!(prompt.contains("详细的摘要（400-600字）"));
        assert!(prompt.contains("使用问答的形式"));
        assert!(prompt.contains("用英文回复"));
    }

    #[test]
    fn test_custom_style_resolution() {
        let mut styles = HashMap::new();
        styles.insert("tweet".to_string(), "像推文一样简短".to_string());
        let builder = PromptBuilder::new().with_custom_styles(styles);

        let mut settings = SummarySettings::default();
        settings.style = SummaryStyle::Custom("tweet".to_string());
        assert!(builder.summary_prompt("x", &settings, SourceType::Page).contains("按照以下风格要求：像推文一样简短"));

        settings.style = SummaryStyle::Custom("missing".to_string());
        assert!(builder.summary_prompt("x", &settings, SourceType::Page).contains("使用“missing”风格"));
    }

    #[test]
    fn test_chat_messages_order() {
        let history = vec![
            ChatMessage::user("问题一"),
            ChatMessage::assistant("回答一"),
            ChatMessage::user("问题二"),
        ];
        let messages = PromptBuilder::new().chat_messages(&history, Some("摘要上下文"));

        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0].role, MessageRole::System);
        assert!(messages[0].content.contains("\n\n摘要上下文\n\n"));
        let tail: Vec<&str> = messages[1..].iter().map(|m| m.content.as_str()).collect();
        assert_eq!(tail, vec!["问题一", "回答一", "问题二"]);
    }

    #[test]
    fn test_chat_without_context_has_no_system_message() {
        let messages = PromptBuilder::new().chat_messages(&[ChatMessage::user("hi")], None);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, MessageRole::User);
    }
}
