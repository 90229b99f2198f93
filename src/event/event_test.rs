use bytes::Bytes;

use super::*;
use crate::Stat;

fn stat(mzxid: i64) -> Stat {
    Stat {
        mzxid,
        ..Default::default()
    }
}

#[test]
fn test_child_data_equality() {
    let a = ChildData::new("/a", stat(1), Some(Bytes::from_static(b"x")));
    let same = ChildData::new("/a", stat(1), Some(Bytes::from_static(b"x")));
    let other_stat = ChildData::new("/a", stat(2), Some(Bytes::from_static(b"x")));
    let other_data = ChildData::new("/a", stat(1), Some(Bytes::from_static(b"y")));
    let other_path = ChildData::new("/b", stat(1), Some(Bytes::from_static(b"x")));

    assert_eq!(a, same);
    assert_ne!(a, other_stat);
    assert_ne!(a, other_data);
    assert_ne!(a, other_path);
    assert_ne!(a, ChildData::new("/a", stat(1), None));
}

#[test]
fn test_event_path_comes_from_data() {
    let event = TreeCacheEvent::node(
        TreeCacheEventType::NodeAdded,
        ChildData::new("/root/1", stat(3), None),
    );
    assert_eq!(event.path(), Some("/root/1"));
    assert_eq!(event.event_type(), TreeCacheEventType::NodeAdded);

    let event = TreeCacheEvent::connection(TreeCacheEventType::Initialized);
    assert_eq!(event.path(), None);
    assert!(event.data().is_none());
}

#[test]
fn test_display() {
    let event = TreeCacheEvent::node(
        TreeCacheEventType::NodeUpdated,
        ChildData::new("/root", stat(9), Some(Bytes::from_static(b"hello"))),
    );
    assert_eq!(
        event.to_string(),
        "TreeCacheEvent { type = NODE_UPDATED, path = /root, data = 5 bytes }"
    );

    let event = TreeCacheEvent::connection(TreeCacheEventType::ConnectionLost);
    assert_eq!(
        event.to_string(),
        "TreeCacheEvent { type = CONNECTION_LOST, path = None, data = None }"
    );

    let event = TreeCacheEvent::node(
        TreeCacheEventType::NodeRemoved,
        ChildData::new("/root/a", stat(9), None),
    );
    assert_eq!(
        event.to_string(),
        "TreeCacheEvent { type = NODE_REMOVED, path = /root/a, data = None }"
    );
}
