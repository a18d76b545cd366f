//! Transform cache behaviour through the middleware.
//!
//! Tests verify:
//! - One transform per signed path, identical bytes on repeat requests
//! - Cache status header
//! - Disk cache end to end
//! - Unverified requests never touch the cache

use std::sync::Arc;

use bitblt::{BitbltConfig, Directive, DiskCache, Signer, TransformCache, CACHE_STATUS_HEADER};

use super::test_utils::{app, body_bytes, get, image_dimensions, CountingCache, OriginLog, SECRET};

fn segment(width: Option<u32>, height: Option<u32>) -> String {
    Directive::new(&Signer::new(SECRET), width, height).segment()
}

#[tokio::test]
async fn test_second_request_served_from_cache() {
    let cache = Arc::new(CountingCache::default());
    let app = app(
        BitbltConfig::new(SECRET).with_cache(cache.clone()),
        OriginLog::default(),
    );
    let uri = format!("/{}/photo.jpg", segment(Some(32), Some(32)));

    let first = get(&app, &uri).await;
    assert_eq!(first.headers()[CACHE_STATUS_HEADER], "miss");
    let first = body_bytes(first).await;
    assert_eq!(cache.puts(), 1);

    let second = get(&app, &uri).await;
    assert_eq!(second.headers()[CACHE_STATUS_HEADER], "hit");
    let second = body_bytes(second).await;

    assert_eq!(cache.puts(), 1, "second request must not transform again");
    assert_eq!(first, second);
    assert_eq!(image_dimensions(&second), (32, 32));
}

#[tokio::test]
async fn test_distinct_sizes_distinct_entries() {
    let cache = Arc::new(CountingCache::default());
    let app = app(
        BitbltConfig::new(SECRET).with_cache(cache.clone()),
        OriginLog::default(),
    );

    let small = body_bytes(get(&app, &format!("/{}/photo.jpg", segment(Some(10), None))).await).await;
    let large = body_bytes(get(&app, &format!("/{}/photo.jpg", segment(Some(40), None))).await).await;

    assert_eq!(cache.puts(), 2);
    assert_eq!(image_dimensions(&small), (10, 10));
    assert_eq!(image_dimensions(&large), (40, 40));
}

#[tokio::test]
async fn test_unverified_request_skips_cache() {
    let cache = Arc::new(CountingCache::default());
    let app = app(
        BitbltConfig::new(SECRET).with_cache(cache.clone()),
        OriginLog::default(),
    );

    get(&app, "/bitblt-32x32-deadbeef/photo.jpg").await;
    get(&app, "/photo.jpg").await;

    assert_eq!(cache.gets(), 0);
    assert_eq!(cache.puts(), 0);
}

#[tokio::test]
async fn test_undecodable_image_not_cached() {
    let cache = Arc::new(CountingCache::default());
    let app = app(
        BitbltConfig::new(SECRET).with_cache(cache.clone()),
        OriginLog::default(),
    );

    get(&app, &format!("/{}/broken.jpg", segment(Some(10), None))).await;
    assert_eq!(cache.puts(), 0);
}

#[tokio::test]
async fn test_disk_cache_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let disk = Arc::new(DiskCache::new(dir.path()));
    let app = app(
        BitbltConfig::new(SECRET).with_cache(disk.clone()),
        OriginLog::default(),
    );
    let uri = format!("/gallery/{}/photo.jpg", segment(Some(24), None));

    let first = body_bytes(get(&app, &uri).await).await;

    // Keyed by the path as requested, directive included
    let stored = disk.get(&uri).await.unwrap().unwrap();
    assert_eq!(stored, first);

    let second = get(&app, &uri).await;
    assert_eq!(second.headers()[CACHE_STATUS_HEADER], "hit");
    assert_eq!(body_bytes(second).await, first);
}

#[tokio::test]
async fn test_broken_disk_cache_does_not_fail_request() {
    let dir = tempfile::tempdir().unwrap();
    let not_a_dir = dir.path().join("file");
    std::fs::write(&not_a_dir, b"").unwrap();

    let app = app(
        BitbltConfig::new(SECRET).with_cache(Arc::new(DiskCache::new(&not_a_dir))),
        OriginLog::default(),
    );

    let response = get(&app, &format!("/{}/photo.jpg", segment(Some(12), None))).await;
    assert_eq!(image_dimensions(&body_bytes(response).await), (12, 12));
}
