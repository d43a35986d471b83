//! Reply personas. Each style is a fixed preset: a system prompt, a prompt
//! template for the post being answered, and the formatting rules applied to
//! whatever the model sends back.

use serde::{Deserialize, Serialize};

use crate::Post;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplyStyle {
    Chainlinkp,
    Builder,
    #[default]
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormattingRules {
    pub max_replies: usize,
    pub allow_emoji: bool,
    pub max_sentences: usize,
}

impl ReplyStyle {
    /// Unknown names fall back to [`ReplyStyle::Neutral`].
    pub fn from_name(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "chainlinkp" | "crypto" => ReplyStyle::Chainlinkp,
            "builder" | "tech" => ReplyStyle::Builder,
            _ => ReplyStyle::Neutral,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ReplyStyle::Chainlinkp => "chainlinkp",
            ReplyStyle::Builder => "builder",
            ReplyStyle::Neutral => "neutral",
        }
    }

    pub fn temperature(self) -> f64 {
        match self {
            ReplyStyle::Chainlinkp => 0.8,
            ReplyStyle::Builder => 0.7,
            ReplyStyle::Neutral => 0.6,
        }
    }

    pub fn rules(self) -> FormattingRules {
        match self {
            ReplyStyle::Chainlinkp => FormattingRules {
                max_replies: 3,
                allow_emoji: false,
                max_sentences: 2,
            },
            ReplyStyle::Builder => FormattingRules {
                max_replies: 3,
                allow_emoji: false,
                max_sentences: 3,
            },
            ReplyStyle::Neutral => FormattingRules {
                max_replies: 3,
                allow_emoji: true,
                max_sentences: 2,
            },
        }
    }

    pub fn system_prompt(self) -> &'static str {
        match self {
            ReplyStyle::Chainlinkp => {
                "You are a crypto Twitter personality who is short, punchy, and direct. No corporate speak. No emojis."
            }
            ReplyStyle::Builder => {
                "You are a pragmatic software founder replying on Twitter. Concrete, specific, no hype. No emojis."
            }
            ReplyStyle::Neutral => {
                "You write thoughtful, friendly replies to social media posts. Keep them brief and on topic."
            }
        }
    }

    fn voice(self) -> &'static str {
        match self {
            ReplyStyle::Chainlinkp => r#"- Short, punchy replies (1-2 sentences max)
- Chainlink/$LINK maximalist but not forced
- Anti-bank/establishment energy
- Direct and brief, no fluff
- Use "Tick tock" for things coming soon
- Say "You love to see it" for good developments
- Ask thought-provoking questions sometimes
- NO EMOJIS"#,
            ReplyStyle::Builder => r#"- Speak from hands-on shipping experience
- Add one concrete detail, number, or tradeoff
- Disagree politely when the take is shallow
- Up to 3 sentences
- NO EMOJIS"#,
            ReplyStyle::Neutral => r#"- Friendly and curious
- Add something the post did not say
- 1-2 sentences"#,
        }
    }

    pub fn render_prompt(self, post: &Post) -> String {
        let rules = self.rules();
        format!(
            r#"Your style:
{voice}

POST TO REPLY TO:
"{text}"

Author: @{author}
Engagement: {likes} likes, {reposts} reposts, {replies} replies

Generate {count} distinct reply options in this style:
- Reply 1: Direct agreement or call-out with a punchy take
- Reply 2: Brief insight
- Reply 3: Question or observation that adds depth

Return them as a numbered list. Text only.

REPLY OPTIONS:"#,
            voice = self.voice(),
            text = post.text,
            author = post.author_handle(),
            likes = post.metrics.likes,
            reposts = post.metrics.reposts,
            replies = post.metrics.replies,
            count = rules.max_replies,
        )
    }
}

/// Pulls reply options out of free-form model output. Numbered lines win;
/// otherwise blank-line separated paragraphs longer than 10 characters are used.
pub fn parse_replies(content: &str, rules: FormattingRules) -> Vec<String> {
    let numbered: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter_map(strip_number_prefix)
        .collect();

    let candidates = if numbered.is_empty() {
        content
            .split("\n\n")
            .map(str::trim)
            .filter(|paragraph| paragraph.chars().count() > 10)
            .map(str::to_string)
            .collect()
    } else {
        numbered
    };

    candidates
        .into_iter()
        .map(|reply| {
            let reply = strip_quotes(&reply);
            if rules.allow_emoji {
                reply
            } else {
                strip_emoji(&reply)
            }
        })
        .filter(|reply| !reply.is_empty())
        .take(rules.max_replies)
        .collect()
}

fn strip_number_prefix(line: &str) -> Option<String> {
    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits == 0 {
        return None;
    }
    let rest = &line[digits..];
    let rest = rest.strip_prefix('.').or_else(|| rest.strip_prefix(')'))?;
    let rest = rest.trim();
    if rest.is_empty() {
        None
    } else {
        Some(rest.to_string())
    }
}

fn strip_quotes(reply: &str) -> String {
    reply
        .trim()
        .trim_matches(|c| c == '"' || c == '\u{201c}' || c == '\u{201d}')
        .trim()
        .to_string()
}

fn strip_emoji(reply: &str) -> String {
    let kept: String = reply.chars().filter(|c| !is_emoji(*c)).collect();
    kept.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn is_emoji(c: char) -> bool {
    matches!(c as u32,
        0x1F300..=0x1FAFF | 0x2600..=0x27BF | 0x1F1E6..=0x1F1FF | 0xFE0F | 0x200D)
}
