use crate::test_utils::InMemoryZk;
use crate::Error;
use crate::PathError;
use crate::TreeCacheBuilder;
use crate::TreeCacheConfig;

#[test]
fn test_build_rejects_invalid_path() {
    let zk = InMemoryZk::new();

    let result = TreeCacheBuilder::new(zk.framework(), "no-slash").build();
    assert!(matches!(
        result,
        Err(Error::InvalidPath(PathError::MissingLeadingSlash))
    ));

    let result = TreeCacheBuilder::new(zk.framework(), "/trailing/").build();
    assert!(matches!(result, Err(Error::InvalidPath(PathError::TrailingSlash))));
}

#[test]
fn test_build_rejects_zero_command_buffer() {
    let zk = InMemoryZk::new();
    let config = TreeCacheConfig {
        path: "/root".to_string(),
        command_buffer_size: 0,
        ..Default::default()
    };

    let result = TreeCacheBuilder::from_config(zk.framework(), config).build();
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn test_setters_override_config() {
    let zk = InMemoryZk::new();
    let config = TreeCacheConfig {
        path: "/from/config".to_string(),
        cache_data: true,
        max_depth: 7,
        ..Default::default()
    };

    let builder = TreeCacheBuilder::new(zk.framework(), "/ignored")
        .config(config)
        .cache_data(false)
        .max_depth(2)
        .create_parent_nodes(true);
    let debug = format!("{builder:?}");
    assert!(debug.contains("/from/config"));
    assert!(debug.contains("cache_data: false"));
    assert!(debug.contains("max_depth: 2"));
    assert!(debug.contains("create_parent_nodes: true"));

    let cache = builder.build().unwrap();
    assert_eq!(cache.path(), "/from/config");
}

#[tokio::test]
async fn test_built_cache_is_latent() {
    let zk = InMemoryZk::new();
    zk.create("/root", b"").unwrap();

    let cache = TreeCacheBuilder::new(zk.framework(), "/root").build().unwrap();

    assert_eq!(cache.path(), "/root");
    assert!(cache.get_current_data("/root").await.is_none());
}
