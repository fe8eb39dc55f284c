mod common;

use common::{FakeAzure, provider};
use std::collections::HashSet;
use stratus_cloud::{
    CloudProvider, PageRequest, Paginator, Reference, Snapshot, SnapshotSpec, VolumeSpec,
};

#[tokio::test]
async fn test_volume_delete_is_idempotent() {
    let fake = FakeAzure::new();
    let provider = provider(&fake);
    let volumes = provider.block_store().volumes();

    let volume = volumes.create(VolumeSpec::new("data", 8)).await.unwrap();
    assert_eq!(volume.name, "data");
    assert_ne!(volume.id, "data");
    assert_eq!(volume.size, 8);

    assert!(volumes.delete(&volume.id).await.unwrap());
    assert!(volumes.delete(&volume.id).await.unwrap());
    assert!(volumes.get(&volume.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_get_of_unknown_id_is_none() {
    let fake = FakeAzure::new();
    let provider = provider(&fake);

    assert!(
        provider
            .block_store()
            .snapshots()
            .get("missing")
            .await
            .unwrap()
            .is_none()
    );
    assert!(provider.object_store().get("missing").await.unwrap().is_none());
}

#[tokio::test]
async fn test_blank_volume_needs_a_size() {
    let fake = FakeAzure::new();
    let provider = provider(&fake);

    let err = provider
        .block_store()
        .volumes()
        .create(VolumeSpec::new("empty", 0))
        .await
        .unwrap_err();
    assert!(matches!(err, stratus_cloud::CloudError::InvalidConfiguration(_)));
    assert_eq!(fake.mutation_count(), 0);
}

#[tokio::test]
async fn test_pagination_visits_every_volume_once() {
    let fake = FakeAzure::new();
    let provider = provider(&fake);
    let volumes = provider.block_store().volumes();

    let mut created = HashSet::new();
    for i in 0..7 {
        let volume = volumes
            .create(VolumeSpec::new(format!("vol-{}", i), 1))
            .await
            .unwrap();
        created.insert(volume.id);
    }

    let first = volumes.list(PageRequest::new().with_limit(3)).await.unwrap();
    assert_eq!(first.len(), 3);
    assert!(first.is_truncated());
    assert_eq!(first.total_results(), 7);

    let all = Paginator::new(Some(3), |req| volumes.list(req))
        .collect_all()
        .await
        .unwrap();
    let seen: Vec<String> = all.into_iter().map(|v| v.id).collect();
    assert_eq!(seen.len(), 7);
    assert_eq!(seen.iter().cloned().collect::<HashSet<_>>(), created);
}

#[tokio::test]
async fn test_find_narrows_list() {
    let fake = FakeAzure::new();
    let provider = provider(&fake);
    let volumes = provider.block_store().volumes();

    for name in ["web-data", "web-logs", "db-data"] {
        volumes.create(VolumeSpec::new(name, 2)).await.unwrap();
    }

    let all = volumes.list(PageRequest::new()).await.unwrap();
    let found = volumes.find("web-*", PageRequest::new()).await.unwrap();
    let all_ids: HashSet<&str> = all.iter().map(|v| v.id.as_str()).collect();

    assert_eq!(found.len(), 2);
    assert!(found.iter().all(|v| v.name.starts_with("web-")));
    assert!(found.iter().all(|v| all_ids.contains(v.id.as_str())));

    let exact = volumes.find("db-data", PageRequest::new()).await.unwrap();
    assert_eq!(exact.len(), 1);
}

#[tokio::test]
async fn test_snapshot_round_trip_keeps_size() {
    let fake = FakeAzure::new();
    let provider = provider(&fake);
    let storage = provider.block_store();

    let volume = storage
        .volumes()
        .create(VolumeSpec::new("source", 10))
        .await
        .unwrap();
    let snapshot = storage
        .snapshots()
        .create(SnapshotSpec::new("nightly", volume.id.as_str()).with_description("backup"))
        .await
        .unwrap();
    assert_eq!(snapshot.size, 10);
    assert_eq!(snapshot.volume_id.as_deref(), Some(volume.id.as_str()));
    assert_eq!(snapshot.description.as_deref(), Some("backup"));

    let restored = storage
        .snapshots()
        .create_volume(&Reference::<Snapshot>::Resolved(snapshot.clone()), None, None)
        .await
        .unwrap();
    assert_eq!(restored.size, 10);
    assert_eq!(restored.source_snapshot_id.as_deref(), Some(snapshot.id.as_str()));

    // Asking for less than the snapshot holds still yields the full size
    let spec = VolumeSpec::new("restored-small", 4).from_snapshot(snapshot.id.as_str());
    let small = storage.volumes().create(spec).await.unwrap();
    assert_eq!(small.size, 10);
}

#[tokio::test]
async fn test_volume_from_missing_snapshot_is_not_found() {
    let fake = FakeAzure::new();
    let provider = provider(&fake);

    let spec = VolumeSpec::new("restored", 10).from_snapshot("no-such-snapshot");
    let err = provider
        .block_store()
        .volumes()
        .create(spec)
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(fake.mutation_count(), 0);
}

#[tokio::test]
async fn test_bucket_find_uses_prefix() {
    let fake = FakeAzure::new();
    let provider = provider(&fake);
    let buckets = provider.object_store();

    let created = buckets.create("Logs-2024", None).await.unwrap();
    assert_eq!(created.name, "logs-2024");
    buckets.create("logs-2025", None).await.unwrap();
    buckets.create("assets", None).await.unwrap();

    let found = buckets.find("logs", PageRequest::new()).await.unwrap();
    assert_eq!(found.len(), 2);

    assert!(buckets.delete("assets").await.unwrap());
    assert!(buckets.delete("assets").await.unwrap());
    assert_eq!(buckets.list(PageRequest::new()).await.unwrap().len(), 2);
}
