//! services/api/src/adapters/backend.rs
//!
//! Thin REST wrapper over the backend API. Requests are forwarded with the
//! user's bearer token; the upstream status and JSON body come back untouched.

use async_trait::async_trait;
use billing_portal_core::ports::{
    BackendMethod, BackendRequest, BackendResponse, BackendService, PortResult,
};
use reqwest::{Client, Method};

use crate::adapters::http::{json_body, transport_error};

#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    fn url_for(&self, request: &BackendRequest) -> String {
        let path = request.path.trim_start_matches('/');
        match request.query.as_deref().filter(|q| !q.is_empty()) {
            Some(query) => format!("{}/{}?{}", self.base_url, path, query),
            None => format!("{}/{}", self.base_url, path),
        }
    }
}

fn method_of(method: BackendMethod) -> Method {
    match method {
        BackendMethod::Get => Method::GET,
        BackendMethod::Post => Method::POST,
        BackendMethod::Put => Method::PUT,
        BackendMethod::Delete => Method::DELETE,
    }
}

#[async_trait]
impl BackendService for HttpBackend {
    async fn forward(&self, request: BackendRequest) -> PortResult<BackendResponse> {
        let mut builder = self
            .client
            .request(method_of(request.method), self.url_for(&request))
            .bearer_auth(&request.access_token);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(transport_error)?;
        let status = response.status().as_u16();
        let body = json_body(response).await?;
        Ok(BackendResponse { status, body })
    }
}
