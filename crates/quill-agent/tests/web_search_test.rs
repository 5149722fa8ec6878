use quill_agent::{AgentTool, ToolObservation, WebSearchTool};
use serde_json::json;

#[tokio::test]
async fn test_search_maps_organic_results() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/search")
        .match_header("x-api-key", "serper-key")
        .match_body(mockito::Matcher::Json(json!({"q": "rust axum"})))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "organic": [
                    {"title": "A", "link": "https://a.example", "snippet": "first", "position": 1},
                    {"title": "B", "link": "https://b.example", "snippet": "second", "position": 2},
                    {"title": "C", "link": "https://c.example", "snippet": "third", "position": 3}
                ]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let tool = WebSearchTool::new(Some("serper-key".to_string()))
        .unwrap()
        .with_endpoint(format!("{}/search", server.url()));

    let obs = tool
        .call(json!({"query": "rust axum", "num_results": 2}))
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(
        obs,
        ToolObservation::Records(vec![
            json!({"title": "A", "link": "https://a.example", "snippet": "first"}),
            json!({"title": "B", "link": "https://b.example", "snippet": "second"}),
        ])
    );
}

#[tokio::test]
async fn test_search_default_result_count() {
    let mut server = mockito::Server::new_async().await;
    let organic: Vec<_> = (0..8)
        .map(|i| json!({"title": format!("t{}", i), "link": "l", "snippet": "s"}))
        .collect();
    let _mock = server
        .mock("POST", "/search")
        .with_status(200)
        .with_body(json!({ "organic": organic }).to_string())
        .create_async()
        .await;

    let tool = WebSearchTool::new(Some("k".to_string()))
        .unwrap()
        .with_endpoint(format!("{}/search", server.url()));

    let records = tool.search("anything", 5).await;
    assert_eq!(records.len(), 5);
}

#[tokio::test]
async fn test_search_http_error_becomes_error_record() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/search")
        .with_status(403)
        .with_body("forbidden")
        .create_async()
        .await;

    let tool = WebSearchTool::new(Some("bad".to_string()))
        .unwrap()
        .with_endpoint(format!("{}/search", server.url()));

    let records = tool.search("q", 5).await;
    assert_eq!(records.len(), 1);
    assert!(records[0]["error"].as_str().unwrap().contains("403"));
}

#[tokio::test]
async fn test_search_without_key_makes_no_request() {
    let tool = WebSearchTool::new(None).unwrap();
    let records = tool.search("q", 5).await;
    assert_eq!(records, vec![json!({"error": "SERPER_API_KEY not set"})]);
}

#[tokio::test]
async fn test_search_requires_query_argument() {
    let tool = WebSearchTool::new(Some("k".to_string())).unwrap();
    assert!(tool.call(json!({"num_results": 3})).await.is_err());
}
