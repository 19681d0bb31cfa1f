use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::join_all;

use super::operations::FeedCacheOperations;

/// 关系数据来源：谁把某个用户加为了好友
#[async_trait]
pub trait RelationshipSource: Send + Sync {
    async fn holders_of(&self, owner: &str) -> Result<Vec<String>, sqlx::Error>;
}

/// 缓存失效扩散。
/// 用户发帖或改帖会影响所有关注者的动态流；建立或解除好友关系影响双方的动态流。
/// 失效失败只记录日志，不影响触发它的写操作。
pub struct InvalidationCoordinator {
    feed: Arc<FeedCacheOperations>,
    relationships: Arc<dyn RelationshipSource>,
}

impl InvalidationCoordinator {
    pub fn new(feed: Arc<FeedCacheOperations>, relationships: Arc<dyn RelationshipSource>) -> Self {
        Self {
            feed,
            relationships,
        }
    }

    /// 内容变更：失效所有持有该用户为好友的人的动态流，返回删除的键数
    pub async fn on_content_changed(&self, owner: &str) -> u64 {
        let holders = match self.relationships.holders_of(owner).await {
            Ok(holders) => holders,
            Err(e) => {
                tracing::error!("Failed to load connections of {}: {}", owner, e);
                return 0;
            }
        };

        if holders.is_empty() {
            return 0;
        }

        let total = self.invalidate_feeds(holders.iter().map(String::as_str)).await;
        tracing::info!(
            "Invalidated {} feed entries for {} connections of {}",
            total,
            holders.len(),
            owner
        );
        total
    }

    /// 建立好友关系后双方的动态流都要重新计算
    pub async fn on_connection_created(&self, a: &str, b: &str) -> u64 {
        self.invalidate_feeds([a, b]).await
    }

    pub async fn on_connection_removed(&self, a: &str, b: &str) -> u64 {
        self.invalidate_feeds([a, b]).await
    }

    async fn invalidate_feeds<'a>(&self, users: impl IntoIterator<Item = &'a str>) -> u64 {
        join_all(users.into_iter().map(|user| self.feed.invalidate_owner(user)))
            .await
            .into_iter()
            .sum()
    }
}
