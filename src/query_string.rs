use std::collections::HashMap;

#[derive(PartialEq, Debug, Default)]
pub struct QueryString {
    items: HashMap<String, String>,
}

impl QueryString {
    pub fn from(buf: &str) -> Self {
        let vs: Vec<(String, String)> = serde_urlencoded::from_str(buf).unwrap_or_default();
        QueryString {
            items: vs.into_iter().collect(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.items.get(key).map(|s| s.as_str())
    }

    pub fn get_page(&self) -> usize {
        self.get("page")
            .and_then(|v| v.parse().ok())
            .filter(|&page: &usize| page > 0)
            .unwrap_or(1)
    }
}
