mod common;

use common::test_pool;
use sqlx::SqlitePool;

use peerdex::fixtures::{self, SiteSeed};
use peerdex::models::{
    NotificationFilter, Permissions, QueryContext, RecordFilter, SortField, PRIVATE_ORIGIN,
};
use peerdex::query;

async fn seed_site(pool: &SqlitePool, seed: SiteSeed) -> i64 {
    fixtures::insert_site(pool, &seed).await.unwrap()
}

fn private_ctx() -> QueryContext {
    QueryContext {
        permissions: Permissions { read_private: true },
        ..Default::default()
    }
}

#[tokio::test]
async fn explicit_origins_report_missed_origins() {
    let (_tmp, pool) = test_pool().await;
    let alice = seed_site(&pool, SiteSeed::new("mesh://alice").title("Alice")).await;
    seed_site(&pool, SiteSeed::new("mesh://bob").indexed(false)).await;

    fixtures::insert_record(&pool, alice, "/blog/one.md", 100, 110, 120)
        .await
        .unwrap();

    let filter = RecordFilter {
        origin: Some(vec!["mesh://alice".to_string(), "mesh://bob".to_string()].into()),
        ..Default::default()
    };
    let response = query(&pool, &filter, &QueryContext::default()).await.unwrap();

    assert_eq!(response.records.len(), 1);
    assert_eq!(response.records[0].site.url, "mesh://alice");
    assert_eq!(
        response.missed_origins,
        Some(vec!["mesh://bob".to_string()])
    );
}

#[tokio::test]
async fn missed_origins_absent_without_explicit_origin() {
    let (_tmp, pool) = test_pool().await;
    let alice = seed_site(&pool, SiteSeed::new("mesh://alice")).await;
    fixtures::insert_record(&pool, alice, "/a.md", 1, 1, 1)
        .await
        .unwrap();

    let response = query(&pool, &RecordFilter::default(), &QueryContext::default())
        .await
        .unwrap();
    assert_eq!(response.records.len(), 1);
    assert!(response.missed_origins.is_none());
}

#[tokio::test]
async fn raw_origins_are_normalized_before_matching() {
    let (_tmp, pool) = test_pool().await;
    let alice = seed_site(&pool, SiteSeed::new("mesh://alice")).await;
    fixtures::insert_record(&pool, alice, "/a.md", 1, 1, 1)
        .await
        .unwrap();

    let filter = RecordFilter {
        origin: Some("MESH://Alice/".to_string().into()),
        ..Default::default()
    };
    let response = query(&pool, &filter, &QueryContext::default()).await.unwrap();
    assert_eq!(response.records.len(), 1);
    assert_eq!(response.missed_origins, Some(Vec::new()));
}

#[tokio::test]
async fn private_origin_is_denied_without_capability() {
    let (_tmp, pool) = test_pool().await;
    seed_site(&pool, SiteSeed::new(PRIVATE_ORIGIN)).await;

    let filter = RecordFilter {
        origin: Some(vec!["mesh://alice".to_string(), PRIVATE_ORIGIN.to_string()].into()),
        ..Default::default()
    };
    let err = query(&pool, &filter, &QueryContext::default())
        .await
        .unwrap_err();
    assert!(err.is_permission_denied());
}

#[tokio::test]
async fn private_origin_is_queryable_with_capability() {
    let (_tmp, pool) = test_pool().await;
    let private = seed_site(&pool, SiteSeed::new(PRIVATE_ORIGIN)).await;
    fixtures::insert_record(&pool, private, "/notes/todo.md", 1, 2, 3)
        .await
        .unwrap();

    let filter = RecordFilter {
        origin: Some(PRIVATE_ORIGIN.to_string().into()),
        ..Default::default()
    };
    let response = query(&pool, &filter, &private_ctx()).await.unwrap();
    assert_eq!(response.records.len(), 1);
    assert_eq!(response.records[0].url, format!("{}/notes/todo.md", PRIVATE_ORIGIN));
}

#[tokio::test]
async fn unscoped_query_hides_private_origin() {
    let (_tmp, pool) = test_pool().await;
    let alice = seed_site(&pool, SiteSeed::new("mesh://alice")).await;
    let private = seed_site(&pool, SiteSeed::new(PRIVATE_ORIGIN)).await;
    fixtures::insert_record(&pool, alice, "/a.md", 1, 1, 1)
        .await
        .unwrap();
    fixtures::insert_record(&pool, private, "/p.md", 1, 1, 1)
        .await
        .unwrap();

    let response = query(&pool, &RecordFilter::default(), &QueryContext::default())
        .await
        .unwrap();
    let origins: Vec<&str> = response
        .records
        .iter()
        .map(|r| r.site.url.as_str())
        .collect();
    assert_eq!(origins, vec!["mesh://alice"]);
}

#[tokio::test]
async fn unscoped_query_with_capability_scans_index_targets() {
    let (_tmp, pool) = test_pool().await;
    let target = seed_site(&pool, SiteSeed::new("mesh://alice")).await;
    let stray = seed_site(&pool, SiteSeed::new("mesh://stray").index_target(false)).await;
    fixtures::insert_record(&pool, target, "/a.md", 1, 1, 1)
        .await
        .unwrap();
    fixtures::insert_record(&pool, stray, "/s.md", 1, 1, 1)
        .await
        .unwrap();

    let response = query(&pool, &RecordFilter::default(), &private_ctx())
        .await
        .unwrap();
    let origins: Vec<&str> = response
        .records
        .iter()
        .map(|r| r.site.url.as_str())
        .collect();
    assert_eq!(origins, vec!["mesh://alice"]);
}

#[tokio::test]
async fn unindexed_sites_never_match() {
    let (_tmp, pool) = test_pool().await;
    let bob = seed_site(&pool, SiteSeed::new("mesh://bob").indexed(false)).await;
    fixtures::insert_record(&pool, bob, "/b.md", 1, 1, 1)
        .await
        .unwrap();

    let response = query(&pool, &RecordFilter::default(), &QueryContext::default())
        .await
        .unwrap();
    assert!(response.records.is_empty());
}

#[tokio::test]
async fn path_specs_or_combine() {
    let (_tmp, pool) = test_pool().await;
    let alice = seed_site(&pool, SiteSeed::new("mesh://alice")).await;
    fixtures::insert_record(&pool, alice, "/blog/one.md", 1, 1, 1)
        .await
        .unwrap();
    fixtures::insert_record(&pool, alice, "/blog/two.md", 2, 2, 2)
        .await
        .unwrap();
    fixtures::insert_record(&pool, alice, "/blog/pic.png", 3, 3, 3)
        .await
        .unwrap();
    fixtures::insert_record(&pool, alice, "/about.md", 4, 4, 4)
        .await
        .unwrap();
    fixtures::insert_record(&pool, alice, "/deep/nested/three.md", 5, 5, 5)
        .await
        .unwrap();

    let filter = RecordFilter {
        path: Some(vec!["/blog/*.md".to_string(), "/about.md".to_string()].into()),
        sort: SortField::Path,
        ..Default::default()
    };
    let response = query(&pool, &filter, &QueryContext::default()).await.unwrap();
    let paths: Vec<&str> = response.records.iter().map(|r| r.path.as_str()).collect();
    assert_eq!(paths, vec!["/about.md", "/blog/one.md", "/blog/two.md"]);
}

#[tokio::test]
async fn prefix_pattern_matches_direct_children_only() {
    let (_tmp, pool) = test_pool().await;
    let alice = seed_site(&pool, SiteSeed::new("mesh://alice")).await;
    fixtures::insert_record(&pool, alice, "/blog/one.md", 1, 1, 1)
        .await
        .unwrap();
    fixtures::insert_record(&pool, alice, "/blog/drafts/two.md", 2, 2, 2)
        .await
        .unwrap();

    let filter = RecordFilter {
        path: Some("/blog/*".to_string().into()),
        ..Default::default()
    };
    let response = query(&pool, &filter, &QueryContext::default()).await.unwrap();
    let paths: Vec<&str> = response.records.iter().map(|r| r.path.as_str()).collect();
    assert_eq!(paths, vec!["/blog/one.md"]);
}

#[tokio::test]
async fn malformed_path_spec_propagates() {
    let (_tmp, pool) = test_pool().await;

    let filter = RecordFilter {
        path: Some("/blog/a*b.md".to_string().into()),
        ..Default::default()
    };
    let err = query(&pool, &filter, &QueryContext::default())
        .await
        .unwrap_err();
    assert!(matches!(err, peerdex::Error::InvalidPathSpec(_)));
}

#[tokio::test]
async fn links_filter_matches_and_suppresses_reconciliation() {
    let (_tmp, pool) = test_pool().await;
    let alice = seed_site(&pool, SiteSeed::new("mesh://alice")).await;
    let linked = fixtures::insert_record(&pool, alice, "/reply.md", 1, 1, 1)
        .await
        .unwrap();
    let other = fixtures::insert_record(&pool, alice, "/other.md", 2, 2, 2)
        .await
        .unwrap();
    fixtures::insert_attribute(&pool, linked, "link", "mesh://bob/post.md")
        .await
        .unwrap();
    fixtures::insert_attribute(&pool, other, "link", "mesh://carol/post.md")
        .await
        .unwrap();

    let filter = RecordFilter {
        origin: Some("mesh://alice".to_string().into()),
        // Trailing slash is stripped by link-target normalization.
        links: Some("mesh://bob/post.md/".to_string()),
        ..Default::default()
    };
    let response = query(&pool, &filter, &QueryContext::default()).await.unwrap();
    assert_eq!(response.records.len(), 1);
    assert_eq!(response.records[0].path, "/reply.md");
    assert!(response.missed_origins.is_none());
}

#[tokio::test]
async fn notification_filter_requires_a_notification_row() {
    let (_tmp, pool) = test_pool().await;
    let alice = seed_site(&pool, SiteSeed::new("mesh://alice")).await;
    let noisy = fixtures::insert_record(&pool, alice, "/mention.md", 1, 1, 120)
        .await
        .unwrap();
    fixtures::insert_record(&pool, alice, "/quiet.md", 1, 1, 120)
        .await
        .unwrap();
    fixtures::insert_notification(&pool, noisy, "reply", "mesh://carol", "/x.md")
        .await
        .unwrap();

    let filter = RecordFilter {
        origin: Some("mesh://alice".to_string().into()),
        notification: Some(NotificationFilter::Flag(true)),
        ..Default::default()
    };
    let response = query(&pool, &filter, &QueryContext::default()).await.unwrap();

    assert_eq!(response.records.len(), 1);
    let notification = response.records[0].notification.as_ref().unwrap();
    assert_eq!(notification.key, "reply");
    assert_eq!(notification.subject, "mesh://carol/x.md");
    assert!(notification.unread);
    // Notification filter active: reconciliation not computed.
    assert!(response.missed_origins.is_none());
}

#[tokio::test]
async fn unread_filter_applies_rtime_threshold() {
    let (_tmp, pool) = test_pool().await;
    let alice = seed_site(&pool, SiteSeed::new("mesh://alice")).await;
    let old = fixtures::insert_record(&pool, alice, "/old.md", 1, 1, 100)
        .await
        .unwrap();
    let fresh = fixtures::insert_record(&pool, alice, "/fresh.md", 1, 1, 200)
        .await
        .unwrap();
    fixtures::insert_notification(&pool, old, "reply", "mesh://carol", "/a.md")
        .await
        .unwrap();
    fixtures::insert_notification(&pool, fresh, "mention", "mesh://carol", "/b.md")
        .await
        .unwrap();

    let ctx = QueryContext {
        notification_rtime: 150,
        ..Default::default()
    };
    let filter = RecordFilter {
        notification: Some(NotificationFilter::Unread { unread: true }),
        ..Default::default()
    };
    let response = query(&pool, &filter, &ctx).await.unwrap();

    assert_eq!(response.records.len(), 1);
    assert_eq!(response.records[0].path, "/fresh.md");
    assert!(response.records[0].notification.as_ref().unwrap().unread);

    // Any-read-state form returns both, with read state resolved per record.
    let filter = RecordFilter {
        notification: Some(NotificationFilter::Flag(true)),
        sort: SortField::Rtime,
        ..Default::default()
    };
    let response = query(&pool, &filter, &ctx).await.unwrap();
    assert_eq!(response.records.len(), 2);
    assert!(!response.records[0].notification.as_ref().unwrap().unread);
    assert!(response.records[1].notification.as_ref().unwrap().unread);
}

#[tokio::test]
async fn pagination_splits_without_overlap_or_gap() {
    let (_tmp, pool) = test_pool().await;
    let alice = seed_site(&pool, SiteSeed::new("mesh://alice")).await;
    for (i, path) in ["/a.md", "/b.md", "/c.md", "/d.md"].into_iter().enumerate() {
        fixtures::insert_record(&pool, alice, path, i as i64, i as i64, i as i64)
            .await
            .unwrap();
    }

    let page = |offset| RecordFilter {
        sort: SortField::Path,
        offset,
        limit: Some(2),
        ..Default::default()
    };

    let first = query(&pool, &page(0), &QueryContext::default()).await.unwrap();
    let second = query(&pool, &page(2), &QueryContext::default()).await.unwrap();

    let mut paths: Vec<String> = first
        .records
        .iter()
        .chain(second.records.iter())
        .map(|r| r.path.clone())
        .collect();
    assert_eq!(paths, vec!["/a.md", "/b.md", "/c.md", "/d.md"]);

    paths.dedup();
    assert_eq!(paths.len(), 4);
}

#[tokio::test]
async fn computed_sort_keys_take_the_earlier_timestamp() {
    let (_tmp, pool) = test_pool().await;
    let alice = seed_site(&pool, SiteSeed::new("mesh://alice")).await;
    // crtime = min(ctime, rtime): 50, 100, 300
    fixtures::insert_record(&pool, alice, "/first.md", 50, 600, 500)
        .await
        .unwrap();
    fixtures::insert_record(&pool, alice, "/second.md", 400, 600, 100)
        .await
        .unwrap();
    fixtures::insert_record(&pool, alice, "/third.md", 300, 600, 300)
        .await
        .unwrap();

    let filter = RecordFilter {
        sort: SortField::Crtime,
        ..Default::default()
    };
    let response = query(&pool, &filter, &QueryContext::default()).await.unwrap();
    let paths: Vec<&str> = response.records.iter().map(|r| r.path.as_str()).collect();
    assert_eq!(paths, vec!["/first.md", "/second.md", "/third.md"]);

    let filter = RecordFilter {
        sort: SortField::Crtime,
        reverse: true,
        ..Default::default()
    };
    let response = query(&pool, &filter, &QueryContext::default()).await.unwrap();
    let paths: Vec<&str> = response.records.iter().map(|r| r.path.as_str()).collect();
    assert_eq!(paths, vec!["/third.md", "/second.md", "/first.md"]);
}

#[tokio::test]
async fn records_reconstruct_attributes_losslessly() {
    let (_tmp, pool) = test_pool().await;
    let alice = seed_site(&pool, SiteSeed::new("mesh://alice").title("Alice")).await;
    let record = fixtures::insert_record(&pool, alice, "/blog/first.md", 100, 110, 120)
        .await
        .unwrap();

    let content = "hello|world\n,;\ttabs and \u{1} bytes";
    fixtures::insert_attribute(&pool, record, "content", content)
        .await
        .unwrap();
    fixtures::insert_attribute(&pool, record, "link", "X")
        .await
        .unwrap();
    fixtures::insert_attribute(&pool, record, "link", "Y")
        .await
        .unwrap();
    fixtures::insert_attribute(&pool, record, "tag", "blog")
        .await
        .unwrap();

    let filter = RecordFilter {
        origin: Some("mesh://alice".to_string().into()),
        ..Default::default()
    };
    let response = query(&pool, &filter, &QueryContext::default()).await.unwrap();

    assert_eq!(response.records.len(), 1);
    let r = &response.records[0];
    assert_eq!(r.content.as_deref(), Some(content));
    assert_eq!(r.index.links, vec!["X", "Y"]);
    assert_eq!(r.index.rtime, 120);
    assert_eq!(r.metadata.len(), 1);
    assert_eq!(r.metadata.get("tag").map(String::as_str), Some("blog"));
    assert_eq!(r.url, "mesh://alice/blog/first.md");
    assert_eq!(r.site.title, "Alice");
    assert_eq!(r.ctime, 100);
    assert_eq!(r.mtime, 110);
    assert!(r.notification.is_none());
}

#[tokio::test]
async fn untitled_site_gets_friendly_fallback_title() {
    let (_tmp, pool) = test_pool().await;
    let origin = "mesh://9f1e2d3c4b5a69788766554433221100ffeeddccbbaa99887766554433221100";
    let site = seed_site(&pool, SiteSeed::new(origin)).await;
    fixtures::insert_record(&pool, site, "/a.md", 1, 1, 1)
        .await
        .unwrap();

    let response = query(&pool, &RecordFilter::default(), &QueryContext::default())
        .await
        .unwrap();
    assert_eq!(response.records[0].site.title, "9f1e2d..00");
}

#[tokio::test]
async fn explicit_empty_origin_list_yields_nothing_but_reconciles() {
    let (_tmp, pool) = test_pool().await;
    let alice = seed_site(&pool, SiteSeed::new("mesh://alice")).await;
    fixtures::insert_record(&pool, alice, "/a.md", 1, 1, 1)
        .await
        .unwrap();

    let filter = RecordFilter {
        origin: Some(Vec::<String>::new().into()),
        ..Default::default()
    };
    let response = query(&pool, &filter, &QueryContext::default()).await.unwrap();
    assert!(response.records.is_empty());
    assert_eq!(response.missed_origins, Some(Vec::new()));
}
