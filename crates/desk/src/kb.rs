//! Knowledge-base articles.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use nesk_core::{CategoryId, DomainError, DomainResult, Entity, KbArticleId, TeamMemberId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KbArticle {
    pub id: KbArticleId,
    pub title: String,
    pub content: String,
    pub keywords: String,
    pub category_id: Option<CategoryId>,
    pub published: bool,
    /// Set on first publication and kept afterwards.
    pub published_at: Option<DateTime<Utc>>,
    pub author_id: TeamMemberId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl KbArticle {
    pub fn draft(author_id: TeamMemberId, input: &ValidArticle, now: DateTime<Utc>) -> Self {
        Self {
            id: KbArticleId::new(),
            title: input.title.clone(),
            content: input.content.clone(),
            keywords: input.keywords.clone(),
            category_id: input.category_id,
            published: input.published,
            published_at: input.published.then_some(now),
            author_id,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, input: &ValidArticle, now: DateTime<Utc>) {
        self.title = input.title.clone();
        self.content = input.content.clone();
        self.keywords = input.keywords.clone();
        self.category_id = input.category_id;
        self.set_published(input.published, now);
        self.updated_at = now;
    }

    pub fn toggle_published(&mut self, now: DateTime<Utc>) {
        self.set_published(!self.published, now);
        self.updated_at = now;
    }

    fn set_published(&mut self, published: bool, now: DateTime<Utc>) {
        if published && self.published_at.is_none() {
            self.published_at = Some(now);
        }
        self.published = published;
    }

    /// Case-insensitive match over title, content and keywords.
    pub fn matches(&self, search: &str) -> bool {
        let needle = search.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        [&self.title, &self.content, &self.keywords]
            .iter()
            .any(|field| field.to_lowercase().contains(&needle))
    }
}

impl Entity for KbArticle {
    type Id = KbArticleId;

    fn id(&self) -> &KbArticleId {
        &self.id
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ArticleInput {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub keywords: Option<String>,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    #[serde(default)]
    pub published: bool,
}

/// Trimmed, validated article fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidArticle {
    pub title: String,
    pub content: String,
    pub keywords: String,
    pub category_id: Option<CategoryId>,
    pub published: bool,
}

impl ArticleInput {
    pub fn validate(&self) -> DomainResult<ValidArticle> {
        Ok(ValidArticle {
            title: DomainError::require_text("title", &self.title)?,
            content: DomainError::require_text("content", &self.content)?,
            keywords: self.keywords.as_deref().unwrap_or_default().trim().to_string(),
            category_id: self.category_id,
            published: self.published,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn valid(published: bool) -> ValidArticle {
        ArticleInput {
            title: "Reset your password".into(),
            content: "Use the forgot password link.".into(),
            keywords: Some(" password, login ".into()),
            category_id: None,
            published,
        }
        .validate()
        .unwrap()
    }

    #[test]
    fn publish_timestamp_is_set_once() {
        let t0 = Utc::now();
        let mut article = KbArticle::draft(TeamMemberId::new(), &valid(false), t0);
        assert_eq!(article.published_at, None);

        let t1 = t0 + Duration::minutes(1);
        article.toggle_published(t1);
        assert!(article.published);
        assert_eq!(article.published_at, Some(t1));

        let t2 = t1 + Duration::minutes(1);
        article.toggle_published(t2);
        article.apply(&valid(true), t2 + Duration::minutes(1));
        assert!(article.published);
        assert_eq!(article.published_at, Some(t1));
    }

    #[test]
    fn validation_trims_keywords() {
        assert_eq!(valid(false).keywords, "password, login");
        let err = ArticleInput {
            title: "t".into(),
            content: " ".into(),
            ..Default::default()
        }
        .validate()
        .unwrap_err();
        assert_eq!(err, DomainError::validation("content is required"));
    }

    #[test]
    fn search_is_case_insensitive_across_fields() {
        let article = KbArticle::draft(TeamMemberId::new(), &valid(true), Utc::now());
        assert!(article.matches("PASSWORD"));
        assert!(article.matches("login"));
        assert!(!article.matches("billing"));
    }
}
