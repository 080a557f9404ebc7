//! Query builders for PostgrestClient

use reqwest::Client;
use serde::{de::DeserializeOwned, Serialize};

use crate::error::Error;
use crate::fetch::{Fetch, FetchBuilder};
use crate::postgrest::filter::FilterOperator;
use crate::postgrest::types::{ReturnOption, SortOrder};

/// Media type asking PostgREST for a single object instead of an array
const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";

/// Ordered query parameters
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    params: Vec<(String, String)>,
}

impl QueryBuilder {
    /// Create a new QueryBuilder
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parameter to the query
    pub fn add_param(&mut self, key: &str, value: &str) {
        self.params.push((key.to_string(), value.to_string()));
    }

    /// Get the query parameters
    pub fn get_params(&self) -> &[(String, String)] {
        &self.params
    }
}

/// Endpoint and credentials shared by every builder
#[derive(Debug, Clone)]
pub(crate) struct RequestContext {
    pub(crate) url: String,
    pub(crate) key: String,
    pub(crate) client: Client,
    pub(crate) access_token: Option<String>,
}

impl RequestContext {
    /// Start a request carrying the project key and the caller's token.
    ///
    /// Without a user token the anon key doubles as the bearer, matching
    /// what row level security expects for anonymous callers.
    fn start<'a>(&'a self, fetch: fn(&'a Client, &str) -> FetchBuilder<'a>) -> FetchBuilder<'a> {
        let token = self.access_token.as_deref().unwrap_or(&self.key);
        fetch(&self.client, &self.url)
            .header("apikey", &self.key)
            .bearer_auth(token)
    }
}

/// Builder for SELECT queries
pub struct SelectBuilder {
    context: RequestContext,
    query: QueryBuilder,
}

impl SelectBuilder {
    pub(crate) fn new(context: RequestContext, columns: &str) -> Self {
        let mut query = QueryBuilder::new();
        query.add_param("select", columns);
        Self { context, query }
    }

    /// Run the query as the given user
    pub fn auth(mut self, access_token: &str) -> Self {
        self.context.access_token = Some(access_token.to_string());
        self
    }

    /// Filter rows where column equals a value
    pub fn eq<V: ToString>(mut self, column: &str, value: V) -> Self {
        self.query
            .add_param(column, &FilterOperator::Eq.apply(&value.to_string()));
        self
    }

    /// Order the results by a column
    pub fn order(mut self, column: &str, order: SortOrder) -> Self {
        self.query
            .add_param("order", &format!("{}.{}", column, order.as_str()));
        self
    }

    /// Execute the query and return the results
    pub async fn execute<T: DeserializeOwned>(&self) -> Result<Vec<T>, Error> {
        self.context
            .start(Fetch::get)
            .query(self.query.get_params())
            .execute::<Vec<T>>()
            .await
    }
}

/// Builder for INSERT queries
pub struct InsertBuilder<T: Serialize> {
    context: RequestContext,
    values: T,
    single: bool,
}

impl<T: Serialize> InsertBuilder<T> {
    pub(crate) fn new(context: RequestContext, values: T) -> Self {
        Self {
            context,
            values,
            single: false,
        }
    }

    /// Run the insert as the given user
    pub fn auth(mut self, access_token: &str) -> Self {
        self.context.access_token = Some(access_token.to_string());
        self
    }

    /// Return the inserted row as an object rather than a one element array
    pub fn single(mut self) -> Self {
        self.single = true;
        self
    }

    /// Execute the insert and return the stored representation
    pub async fn execute<R: DeserializeOwned>(&self) -> Result<R, Error> {
        let mut fetch = self
            .context
            .start(Fetch::post)
            .header("Prefer", &ReturnOption::Representation.prefer());
        if self.single {
            fetch = fetch.header("Accept", SINGLE_OBJECT);
        }

        fetch.json(&self.values)?.execute::<R>().await
    }
}

/// Builder for UPDATE queries
pub struct UpdateBuilder<T: Serialize> {
    context: RequestContext,
    values: T,
    query: QueryBuilder,
    single: bool,
}

impl<T: Serialize> UpdateBuilder<T> {
    pub(crate) fn new(context: RequestContext, values: T) -> Self {
        Self {
            context,
            values,
            query: QueryBuilder::new(),
            single: false,
        }
    }

    /// Run the update as the given user
    pub fn auth(mut self, access_token: &str) -> Self {
        self.context.access_token = Some(access_token.to_string());
        self
    }

    /// Filter rows where column equals a value
    pub fn eq<V: ToString>(mut self, column: &str, value: V) -> Self {
        self.query
            .add_param(column, &FilterOperator::Eq.apply(&value.to_string()));
        self
    }

    /// Expect exactly one matching row and return it as an object
    pub fn single(mut self) -> Self {
        self.single = true;
        self
    }

    /// Execute the update and return the stored representation
    pub async fn execute<R: DeserializeOwned>(&self) -> Result<R, Error> {
        let mut fetch = self
            .context
            .start(Fetch::patch)
            .header("Prefer", &ReturnOption::Representation.prefer())
            .query(self.query.get_params());
        if self.single {
            fetch = fetch.header("Accept", SINGLE_OBJECT);
        }

        fetch.json(&self.values)?.execute::<R>().await
    }
}

/// Builder for DELETE queries
pub struct DeleteBuilder {
    context: RequestContext,
    query: QueryBuilder,
}

impl DeleteBuilder {
    pub(crate) fn new(context: RequestContext) -> Self {
        Self {
            context,
            query: QueryBuilder::new(),
        }
    }

    /// Run the delete as the given user
    pub fn auth(mut self, access_token: &str) -> Self {
        self.context.access_token = Some(access_token.to_string());
        self
    }

    /// Filter rows where column equals a value
    pub fn eq<V: ToString>(mut self, column: &str, value: V) -> Self {
        self.query
            .add_param(column, &FilterOperator::Eq.apply(&value.to_string()));
        self
    }

    /// Execute the delete without returning the deleted data
    pub async fn execute_no_return(&self) -> Result<(), Error> {
        self.context
            .start(Fetch::delete)
            .header("Prefer", &ReturnOption::Minimal.prefer())
            .query(self.query.get_params())
            .execute_empty()
            .await
    }
}
