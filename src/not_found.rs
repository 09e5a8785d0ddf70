//! The fallback for routes that do not exist.

use axum::{
    Json,
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
};
use serde_json::json;

/// Respond with a JSON `404 Not Found` naming the unknown path.
pub async fn get_404_not_found(uri: Uri) -> Response {
    tracing::debug!("No route for {}", uri.path());

    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": format!("no route for {}", uri.path()) })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use axum::Router;
    use axum_test::TestServer;
    use serde_json::json;

    use super::get_404_not_found;

    #[tokio::test]
    async fn unknown_route_is_json_not_found() {
        let app = Router::new().fallback(get_404_not_found);
        let server = TestServer::new(app);

        let response = server.get("/nowhere").await;

        response.assert_status_not_found();
        response.assert_json(&json!({ "error": "no route for /nowhere" }));
    }
}
