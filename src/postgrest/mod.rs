//! Table access through the PostgREST API

mod filter;
mod query;
mod types;

use reqwest::Client;
use serde::Serialize;

pub use filter::*;
pub use query::*;
pub use types::*;

/// Client for a single table
#[derive(Debug, Clone)]
pub struct PostgrestClient {
    /// The base URL for the Supabase project
    url: String,

    /// The anonymous API key for the Supabase project
    key: String,

    /// The table or view name
    table: String,

    /// HTTP client
    client: Client,
}

impl PostgrestClient {
    /// Create a new PostgrestClient
    pub(crate) fn new(url: &str, key: &str, table: &str, client: Client) -> Self {
        Self {
            url: url.trim_end_matches('/').to_string(),
            key: key.to_string(),
            table: table.to_string(),
            client,
        }
    }

    /// The table this client talks to
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Get the base URL for REST API requests
    fn get_url(&self) -> String {
        format!("{}/rest/v1/{}", self.url, self.table)
    }

    fn context(&self) -> RequestContext {
        RequestContext {
            url: self.get_url(),
            key: self.key.clone(),
            client: self.client.clone(),
            access_token: None,
        }
    }

    /// Select specific columns from the table
    pub fn select(&self, columns: &str) -> SelectBuilder {
        SelectBuilder::new(self.context(), columns)
    }

    /// Insert data into the table
    pub fn insert<T: Serialize>(&self, values: T) -> InsertBuilder<T> {
        InsertBuilder::new(self.context(), values)
    }

    /// Update data in the table
    pub fn update<T: Serialize>(&self, values: T) -> UpdateBuilder<T> {
        UpdateBuilder::new(self.context(), values)
    }

    /// Delete data from the table
    pub fn delete(&self) -> DeleteBuilder {
        DeleteBuilder::new(self.context())
    }
}
