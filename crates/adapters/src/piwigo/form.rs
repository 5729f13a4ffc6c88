use std::fmt::Display;

use url::form_urlencoded;

/// One `ws.php` call as url-encoded form fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormRequest {
    method: &'static str,
    fields: Vec<(String, String)>,
}

impl FormRequest {
    pub fn new(method: &'static str) -> Self {
        Self {
            method,
            fields: Vec::new(),
        }
    }

    pub fn method(&self) -> &'static str {
        self.method
    }

    pub fn field(mut self, key: &str, value: impl Display) -> Self {
        self.fields.push((key.to_string(), value.to_string()));
        self
    }

    pub fn optional(self, key: &str, value: Option<impl Display>) -> Self {
        match value {
            Some(value) => self.field(key, value),
            None => self,
        }
    }

    /// Repeated `key[]=value` pairs.
    pub fn list<T: Display>(mut self, key: &str, values: impl IntoIterator<Item = T>) -> Self {
        let key = format!("{key}[]");
        for value in values {
            self.fields.push((key.clone(), value.to_string()));
        }
        self
    }

    /// A single field holding `values` joined by `separator`, for parameters
    /// the server documents as string lists.
    pub fn joined<T: Display>(
        self,
        key: &str,
        values: impl IntoIterator<Item = T>,
        separator: &str,
    ) -> Self {
        let joined = values
            .into_iter()
            .map(|value| value.to_string())
            .collect::<Vec<_>>()
            .join(separator);
        self.field(key, joined)
    }

    pub fn encode(&self) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        serializer.append_pair("method", self.method);
        for (key, value) in &self.fields {
            serializer.append_pair(key, value);
        }
        serializer.finish()
    }
}
