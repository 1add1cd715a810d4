//! Keywords served on the primary surface

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::KeywordError;

/// Application-specific keywords reachable through the primary surface
#[async_trait]
pub trait KeywordLibrary: Send + Sync {
    /// Run the keyword `name`
    async fn run_keyword(
        &self,
        name: &str,
        args: Vec<Value>,
        kwargs: Map<String, Value>,
    ) -> Result<Value, KeywordError>;

    /// Names of all keywords this library provides
    fn keyword_names(&self) -> Vec<String>;
}

type Keyword = Box<dyn Fn(Vec<Value>, Map<String, Value>) -> Result<Value, String> + Send + Sync>;

/// Library built from plain closures
#[derive(Default)]
pub struct KeywordSet {
    keywords: BTreeMap<String, Keyword>,
}

impl KeywordSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a keyword, replacing any keyword with the same name
    pub fn with<F>(mut self, name: impl Into<String>, keyword: F) -> Self
    where
        F: Fn(Vec<Value>, Map<String, Value>) -> Result<Value, String> + Send + Sync + 'static,
    {
        self.keywords.insert(name.into(), Box::new(keyword));
        self
    }
}

#[async_trait]
impl KeywordLibrary for KeywordSet {
    async fn run_keyword(
        &self,
        name: &str,
        args: Vec<Value>,
        kwargs: Map<String, Value>,
    ) -> Result<Value, KeywordError> {
        let keyword = self
            .keywords
            .get(name)
            .ok_or_else(|| KeywordError::NotFound(name.to_string()))?;
        keyword(args, kwargs).map_err(KeywordError::Failed)
    }

    fn keyword_names(&self) -> Vec<String> {
        self.keywords.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_keyword_set_dispatch() {
        let library = KeywordSet::new()
            .with("echo", |args, _| Ok(args.into_iter().next().unwrap_or(Value::Null)))
            .with("fail", |_, _| Err("boom".to_string()));

        assert_eq!(
            library.run_keyword("echo", vec![json!("hi")], Map::new()).await,
            Ok(json!("hi"))
        );
        assert_eq!(
            library.run_keyword("fail", vec![], Map::new()).await,
            Err(KeywordError::Failed("boom".to_string()))
        );

        let missing = library
            .run_keyword("pushButton", vec![], Map::new())
            .await
            .unwrap_err();
        assert_eq!(missing.to_string(), "No keyword with name 'pushButton' found");
        assert_eq!(library.keyword_names(), vec!["echo", "fail"]);
    }
}
