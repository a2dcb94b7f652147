use std::collections::HashMap;

use sidekick_memory::{FieldCondition, QdrantOps, VectorFilter, VectorPoint, VectorStore};
use testcontainers::ContainerAsync;
use testcontainers::GenericImage;
use testcontainers::core::{ContainerPort, WaitFor};
use testcontainers::runners::AsyncRunner;

const QDRANT_GRPC_PORT: ContainerPort = ContainerPort::Tcp(6334);
const COLLECTION: &str = "sidekick_test_chunks";

fn qdrant_image() -> GenericImage {
    GenericImage::new("qdrant/qdrant", "v1.16.0")
        .with_wait_for(WaitFor::message_on_stdout("gRPC listening"))
        .with_exposed_port(QDRANT_GRPC_PORT)
}

async fn setup() -> (QdrantOps, ContainerAsync<GenericImage>) {
    let container = qdrant_image().start().await.unwrap();
    let grpc_port = container.get_host_port_ipv4(6334).await.unwrap();
    let ops = QdrantOps::new(&format!("http://127.0.0.1:{grpc_port}")).unwrap();
    (ops, container)
}

fn chunk_point(id: &str, vector: Vec<f32>, repo: &str) -> VectorPoint {
    let mut payload = HashMap::new();
    payload.insert("repoName".into(), serde_json::json!(repo));
    payload.insert("filename".into(), serde_json::json!("src/lib.rs"));
    payload.insert("startLine".into(), serde_json::json!(1));
    payload.insert("endLine".into(), serde_json::json!(50));
    VectorPoint {
        id: id.into(),
        vector,
        payload,
    }
}

fn repo_filter(repo: &str) -> VectorFilter {
    VectorFilter {
        must: vec![FieldCondition::any_text(
            "repoName",
            vec![repo.to_owned(), repo.to_lowercase()],
        )],
    }
}

#[tokio::test]
#[ignore = "requires docker"]
async fn ensure_collection_is_idempotent() {
    let (ops, _container) = setup().await;
    assert!(!VectorStore::collection_exists(&ops, COLLECTION).await.unwrap());
    VectorStore::ensure_collection(&ops, COLLECTION, 4).await.unwrap();
    VectorStore::ensure_collection(&ops, COLLECTION, 4).await.unwrap();
    assert!(VectorStore::collection_exists(&ops, COLLECTION).await.unwrap());
}

#[tokio::test]
#[ignore = "requires docker"]
async fn search_restores_chunk_ids_and_scopes_by_repo() {
    let (ops, _container) = setup().await;
    VectorStore::ensure_collection(&ops, COLLECTION, 4).await.unwrap();
    VectorStore::upsert(
        &ops,
        COLLECTION,
        vec![
            chunk_point("Acme_App__src_lib_rs__1-50", vec![0.1, 0.2, 0.3, 0.4], "acme_app"),
            chunk_point("other__src_lib_rs__1-50", vec![0.1, 0.2, 0.3, 0.4], "other"),
        ],
    )
    .await
    .unwrap();

    let hits = VectorStore::search(
        &ops,
        COLLECTION,
        vec![0.1, 0.2, 0.3, 0.4],
        5,
        Some(repo_filter("Acme_App")),
    )
    .await
    .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, "Acme_App__src_lib_rs__1-50");
    assert_eq!(hits[0].payload["startLine"], serde_json::json!(1));
}

#[tokio::test]
#[ignore = "requires docker"]
async fn delete_by_filter_removes_repo_points() {
    let (ops, _container) = setup().await;
    VectorStore::ensure_collection(&ops, COLLECTION, 4).await.unwrap();
    VectorStore::upsert(
        &ops,
        COLLECTION,
        vec![
            chunk_point("a", vec![1.0, 0.0, 0.0, 0.0], "acme_app"),
            chunk_point("b", vec![1.0, 0.0, 0.0, 0.0], "other"),
        ],
    )
    .await
    .unwrap();

    VectorStore::delete_by_filter(&ops, COLLECTION, repo_filter("acme_app"))
        .await
        .unwrap();

    let hits = VectorStore::search(&ops, COLLECTION, vec![1.0, 0.0, 0.0, 0.0], 10, None)
        .await
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, "b");
}
