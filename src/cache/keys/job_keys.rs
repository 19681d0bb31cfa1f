use super::CacheKey;

/// 职位列表缓存键前缀
pub const JOB_PREFIX: &str = "jobs";

/// 生成某个用户某一页职位列表的缓存键
pub fn job_page_key(user_id: &str, limit: i64, offset: i64) -> CacheKey {
    CacheKey::new(JOB_PREFIX, user_id).part(limit).part(offset)
}
