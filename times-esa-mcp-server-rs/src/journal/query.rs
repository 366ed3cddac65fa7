use chrono::NaiveDate;

const DEFAULT_PER_PAGE: u32 = 20;

#[derive(Clone, Debug, PartialEq)]
pub struct SearchQuery {
    category: Option<String>,
    terms: Vec<String>,
    page: u32,
    per_page: u32,
    sort: String,
    order: String,
}

impl Default for SearchQuery {
    fn default() -> Self {
        Self {
            category: None,
            terms: Vec::new(),
            page: 1,
            per_page: DEFAULT_PER_PAGE,
            sort: "updated".to_string(),
            order: "desc".to_string(),
        }
    }
}

impl SearchQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn category(mut self, category: &str) -> Self {
        self.category = Some(format!("category:{category}"));
        self
    }

    pub fn category_exact(mut self, category: &str) -> Self {
        self.category = Some(format!("on:{category}"));
        self
    }

    pub fn category_prefix(mut self, category: &str) -> Self {
        self.category = Some(format!("in:{category}"));
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for tag in tags {
            self.terms.push(format!("tag:{}", tag.as_ref()));
        }
        self
    }

    pub fn keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for keyword in keywords {
            self.terms.push(keyword.as_ref().to_string());
        }
        self
    }

    pub fn user(mut self, screen_name: &str) -> Self {
        self.terms.push(format!("user:{screen_name}"));
        self
    }

    pub fn date_range(mut self, field: &str, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        if let Some(from) = from {
            self.terms.push(format!("{field}:>{}", from.format("%Y-%m-%d")));
        }
        if let Some(to) = to {
            self.terms.push(format!("{field}:<{}", to.format("%Y-%m-%d")));
        }
        self
    }

    pub fn wip(mut self, wip: bool) -> Self {
        self.terms.push(format!("wip:{wip}"));
        self
    }

    pub fn starred(mut self, starred: bool) -> Self {
        self.terms.push(format!("starred:{starred}"));
        self
    }

    pub fn pagination(mut self, page: u32, per_page: u32) -> Self {
        self.page = page;
        self.per_page = per_page;
        self
    }

    pub fn sort(mut self, sort: &str, order: &str) -> Self {
        self.sort = sort.to_string();
        self.order = order.to_string();
        self
    }

    pub fn q(&self) -> Option<String> {
        let parts: Vec<&str> = self
            .category
            .iter()
            .map(String::as_str)
            .chain(self.terms.iter().map(String::as_str))
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" "))
        }
    }

    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(q) = self.q() {
            params.push(("q", q));
        }
        if self.page > 0 {
            params.push(("page", self.page.to_string()));
        }
        if self.per_page > 0 {
            params.push(("per_page", self.per_page.to_string()));
        }
        if !self.sort.is_empty() {
            params.push(("sort", self.sort.clone()));
        }
        if !self.order.is_empty() {
            params.push(("order", self.order.clone()));
        }
        params
    }
}
