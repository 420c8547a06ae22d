use crate::registry::{tool_fn, ToolDefinition, ToolRegistry};
use crate::tool_schema::{FieldType, InputSchema};
use crate::types::Result;
use serde_json::Value;

pub fn register(registry: &mut ToolRegistry, client: reqwest::Client) -> Result<()> {
    registry.register(
        ToolDefinition::new(
            "web_read",
            "Reads a webpage.",
            InputSchema::new()
                .required("url", FieldType::String)
                .describe("Absolute http(s) URL of the page."),
        )
        .with_title("Web Read"),
        tool_fn(move |params| {
            let client = client.clone();
            async move {
                let url = params
                    .get("url")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                fetch_text(&client, &url).await.map(Value::String)
            }
        }),
    )
}

pub async fn fetch_text(client: &reqwest::Client, url: &str) -> std::result::Result<String, String> {
    tracing::debug!("[🌐] web_read {}", url);
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| format!("Error reading website: {}", e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(format!("HTTP error! status: {}", status.as_u16()));
    }

    response
        .text()
        .await
        .map_err(|e| format!("Error reading website: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::get, Router};

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_web_read_body_and_status() {
        let base = serve(
            Router::new()
                .route("/page", get(|| async { "<p>hello</p>" }))
                .route("/gone", get(|| async { StatusCode::NOT_FOUND })),
        )
        .await;

        let client = reqwest::Client::new();
        assert_eq!(
            fetch_text(&client, &format!("{}/page", base)).await.unwrap(),
            "<p>hello</p>"
        );
        assert_eq!(
            fetch_text(&client, &format!("{}/gone", base)).await.unwrap_err(),
            "HTTP error! status: 404"
        );
    }
}
