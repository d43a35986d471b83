use serde::{Deserialize, Serialize};

pub const GENERAL_CATEGORY: &str = "general";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub accounts: Vec<String>,
    #[serde(default)]
    pub subreddits: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryStrategy {
    Keywords,
    Accounts,
    /// One keyword search across every category. Results come back untagged
    /// and are sorted into categories by content.
    Combined,
}

impl Category {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            keywords: Vec::new(),
            accounts: Vec::new(),
            subreddits: Vec::new(),
        }
    }

    /// Builds an X recent-search query. Falls back to keywords when the category
    /// has no accounts configured.
    pub fn search_query(&self, strategy: QueryStrategy) -> Option<String> {
        let terms: Vec<String> = match strategy {
            QueryStrategy::Accounts if !self.accounts.is_empty() => self
                .accounts
                .iter()
                .map(|account| format!("from:{}", account.trim_start_matches('@')))
                .collect(),
            _ => self.keywords.clone(),
        };
        search_clause(&terms)
    }

    pub fn matches(&self, lowercase_text: &str) -> bool {
        self.keywords
            .iter()
            .any(|keyword| lowercase_text.contains(&keyword.to_lowercase()))
    }
}

fn search_clause(terms: &[String]) -> Option<String> {
    if terms.is_empty() {
        return None;
    }
    Some(format!(
        "({}) -is:reply -is:retweet lang:en",
        terms.join(" OR ")
    ))
}

/// Keywords of every category in one query, first occurrence of each kept.
pub fn combined_search_query(categories: &[Category]) -> Option<String> {
    let mut terms: Vec<String> = Vec::new();
    for keyword in categories.iter().flat_map(|category| category.keywords.iter()) {
        if !terms.iter().any(|term| term.eq_ignore_ascii_case(keyword)) {
            terms.push(keyword.clone());
        }
    }
    search_clause(&terms)
}

#[derive(Debug, Clone, Default)]
pub struct CategoryCatalog {
    categories: Vec<Category>,
}

impl CategoryCatalog {
    pub fn new(categories: Vec<Category>) -> Self {
        Self { categories }
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    /// First category (in configured order) with a keyword in the text.
    pub fn detect(&self, text: &str) -> &str {
        let lowercase = text.to_lowercase();
        self.categories
            .iter()
            .find(|category| category.matches(&lowercase))
            .map(|category| category.name.as_str())
            .unwrap_or(GENERAL_CATEGORY)
    }
}

pub fn default_categories() -> Vec<Category> {
    let build = |name: &str, accounts: &[&str], keywords: &[&str], subreddits: &[&str]| Category {
        name: name.to_string(),
        keywords: keywords.iter().map(|s| s.to_string()).collect(),
        accounts: accounts.iter().map(|s| s.to_string()).collect(),
        subreddits: subreddits.iter().map(|s| s.to_string()).collect(),
    };

    vec![
        build(
            "tech",
            &["paulg", "naval", "levelsio", "dhh", "rauchg", "garrytan", "sama", "ID_AA_Carmack", "patrickc", "amasad", "tobi", "patio11"],
            &["tech", "software", "startup", "developer"],
            &["programming", "technology"],
        ),
        build(
            "crypto",
            &["chainlink", "VitalikButerin", "CryptoHayes", "cobie", "ZachXBT", "Pentoshi1", "lookonchain", "ErikVoorhees"],
            &["crypto", "bitcoin", "ethereum", "chainlink"],
            &["CryptoCurrency", "ethtrader", "Chainlink", "defi"],
        ),
        build(
            "ai",
            &["AnthropicAI", "OpenAI", "ylecun", "karpathy", "DrJimFan", "DemisHassabis", "swyx", "AravSrinivas"],
            &["ai", "llm", "gpt", "claude", "openai"],
            &["MachineLearning", "LocalLLaMA"],
        ),
    ]
}
