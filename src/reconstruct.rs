//! Rebuilding structured records from raw index rows.
//!
//! The index stores record metadata as entity-attribute-value rows; each
//! attribute arrives as its own row and is merged here by record id.
//! `link` values keep their stored order; `content` is a single value
//! (last writer wins if the index ever held duplicates).

use std::collections::HashMap;

use crate::models::{
    IndexState, NotificationDescription, QueryContext, RecordDescription, SiteRef, ATTR_CONTENT,
    ATTR_LINK,
};
use crate::origins;

/// One joined row from the main record lookup.
#[derive(Debug, Clone)]
pub(crate) struct RecordRow {
    pub id: i64,
    pub path: String,
    pub ctime: i64,
    pub mtime: i64,
    pub rtime: i64,
    pub origin: String,
    pub title: String,
    pub notification: Option<NotificationRow>,
}

/// Notification fields joined onto a record row.
#[derive(Debug, Clone)]
pub(crate) struct NotificationRow {
    pub key: String,
    pub subject_origin: String,
    pub subject_path: String,
}

/// One attribute row belonging to a record.
#[derive(Debug, Clone)]
pub(crate) struct AttributeRow {
    pub key: String,
    pub value: String,
}

/// Assemble a [`RecordDescription`] from a joined row and its attribute rows.
pub(crate) fn build_record(
    row: RecordRow,
    attributes: Vec<AttributeRow>,
    ctx: &QueryContext,
) -> RecordDescription {
    let mut content: Option<String> = None;
    let mut links: Vec<String> = Vec::new();
    let mut metadata: HashMap<String, String> = HashMap::new();

    for attr in attributes {
        match attr.key.as_str() {
            ATTR_CONTENT => content = Some(attr.value),
            ATTR_LINK => links.push(attr.value),
            _ => {
                metadata.insert(attr.key, attr.value);
            }
        }
    }

    let title = if row.title.trim().is_empty() {
        origins::friendly_title(&row.origin)
    } else {
        row.title.clone()
    };

    let notification = row.notification.map(|n| NotificationDescription {
        key: n.key,
        subject: format!("{}{}", n.subject_origin, n.subject_path),
        unread: row.rtime > ctx.notification_rtime,
    });

    RecordDescription {
        url: format!("{}{}", row.origin, row.path),
        path: row.path,
        ctime: row.ctime,
        mtime: row.mtime,
        metadata,
        index: IndexState {
            rtime: row.rtime,
            links,
        },
        content,
        site: SiteRef {
            url: row.origin,
            title,
        },
        notification,
    }
}
