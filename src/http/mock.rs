//! Scripted transport for tests
//!
//! Replies are matched on method + path. One-shot replies are consumed in
//! FIFO order, then the route's standing reply (if any) is used. Unmatched
//! requests get a 404. Every request is recorded.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use super::{ApiRequest, ApiResponse, Method, Transport};
use crate::error::{ApiError, ApiResult};

#[derive(Debug, Clone)]
pub struct MockReply {
    outcome: Result<ApiResponse, String>,
    delay: Option<Duration>,
}

impl MockReply {
    pub fn json(status: u16, body: Value) -> Self {
        let bytes = serde_json::to_vec(&body).unwrap_or_default();
        Self {
            outcome: Ok(ApiResponse::new(status, bytes).with_header("content-type", "application/json")),
            delay: None,
        }
    }

    /// 200 with a JSON body
    pub fn ok(body: Value) -> Self {
        Self::json(200, body)
    }

    pub fn status(status: u16) -> Self {
        Self {
            outcome: Ok(ApiResponse::new(status, Vec::new())),
            delay: None,
        }
    }

    pub fn response(response: ApiResponse) -> Self {
        Self {
            outcome: Ok(response),
            delay: None,
        }
    }

    /// No response at all
    pub fn network_error(message: &str) -> Self {
        Self {
            outcome: Err(message.to_string()),
            delay: None,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

struct MockRoute {
    method: Method,
    path: String,
    queued: VecDeque<MockReply>,
    standing: Option<MockReply>,
}

#[derive(Default)]
pub struct MockTransport {
    routes: Mutex<Vec<MockRoute>>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn route_mut<'a>(routes: &'a mut Vec<MockRoute>, method: Method, path: &str) -> &'a mut MockRoute {
        let idx = match routes.iter().position(|r| r.method == method && r.path == path) {
            Some(idx) => idx,
            None => {
                routes.push(MockRoute {
                    method,
                    path: path.to_string(),
                    queued: VecDeque::new(),
                    standing: None,
                });
                routes.len() - 1
            }
        };
        &mut routes[idx]
    }

    /// Queue a one-shot reply.
    pub fn on(&self, method: Method, path: &str, reply: MockReply) -> &Self {
        let mut routes = self.routes.lock();
        Self::route_mut(&mut routes, method, path).queued.push_back(reply);
        self
    }

    /// Reply used whenever no one-shot reply is queued.
    pub fn always(&self, method: Method, path: &str, reply: MockReply) -> &Self {
        let mut routes = self.routes.lock();
        Self::route_mut(&mut routes, method, path).standing = Some(reply);
        self
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().clone()
    }

    pub fn requests_to(&self, method: Method, path: &str) -> Vec<ApiRequest> {
        self.requests
            .lock()
            .iter()
            .filter(|r| r.method == method && r.path == path)
            .cloned()
            .collect()
    }

    pub fn last_request(&self) -> Option<ApiRequest> {
        self.requests.lock().last().cloned()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    fn next_reply(&self, method: Method, path: &str) -> Option<MockReply> {
        let mut routes = self.routes.lock();
        let route = routes.iter_mut().find(|r| r.method == method && r.path == path)?;
        route.queued.pop_front().or_else(|| route.standing.clone())
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: &ApiRequest) -> ApiResult<ApiResponse> {
        self.requests.lock().push(request.clone());

        let Some(reply) = self.next_reply(request.method, &request.path) else {
            let body = serde_json::json!({
                "detail": format!("no mock route for {} {}", request.method, request.path)
            });
            return Ok(ApiResponse::new(404, serde_json::to_vec(&body).unwrap_or_default()));
        };

        if let Some(delay) = reply.delay {
            tokio::time::sleep(delay).await;
        }
        reply.outcome.map_err(ApiError::Network)
    }

    fn name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_queued_replies_then_standing_reply() {
        let mock = MockTransport::new();
        mock.on(Method::Get, "/x", MockReply::ok(json!(1)))
            .on(Method::Get, "/x", MockReply::ok(json!(2)))
            .always(Method::Get, "/x", MockReply::ok(json!(0)));

        let req = ApiRequest::get("/x");
        let bodies: Vec<i64> = futures::future::join_all((0..4).map(|_| mock.send(&req)))
            .await
            .into_iter()
            .map(|r| r.unwrap().json::<i64>().unwrap())
            .collect();
        assert_eq!(bodies, vec![1, 2, 0, 0]);
        assert_eq!(mock.requests_to(Method::Get, "/x").len(), 4);
    }

    #[tokio::test]
    async fn test_unmatched_route_is_404() {
        let mock = MockTransport::new();
        let resp = mock.send(&ApiRequest::delete("/nowhere")).await.unwrap();
        assert_eq!(resp.status, 404);
    }

    #[tokio::test]
    async fn test_network_error_reply() {
        let mock = MockTransport::new();
        mock.on(Method::Post, "/y", MockReply::network_error("connection reset"));
        let err = mock.send(&ApiRequest::post("/y")).await.unwrap_err();
        assert_eq!(err, ApiError::Network("connection reset".to_string()));
    }
}
