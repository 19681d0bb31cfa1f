use super::{CacheKey, KeyPrefix};

/// 个人主页缓存键前缀
pub const PROFILE_PREFIX: &str = "profile";

const BRAND_POSTS: &str = "brand_posts";

/// 个人主页按字段分组缓存，单个字段变更只失效对应分组
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileSection {
    Summary,
    About,
    Education,
    Work,
}

impl ProfileSection {
    pub fn as_str(self) -> &'static str {
        match self {
            ProfileSection::Summary => "summary",
            ProfileSection::About => "about",
            ProfileSection::Education => "education",
            ProfileSection::Work => "work",
        }
    }
}

/// 生成个人主页某个分组的缓存键
pub fn profile_section_key(profile_id: &str, section: ProfileSection) -> CacheKey {
    CacheKey::new(PROFILE_PREFIX, profile_id).part(section.as_str())
}

/// 生成品牌主页帖子列表的缓存键
pub fn brand_posts_key(profile_id: &str, limit: i64, offset: i64) -> CacheKey {
    CacheKey::new(PROFILE_PREFIX, profile_id)
        .part(BRAND_POSTS)
        .part(limit)
        .part(offset)
}

/// 品牌帖子全部分页的前缀
pub fn brand_posts_prefix(profile_id: &str) -> KeyPrefix {
    KeyPrefix::owner(PROFILE_PREFIX, profile_id).part(BRAND_POSTS)
}

/// 某个主页的全部缓存
pub fn profile_prefix(profile_id: &str) -> KeyPrefix {
    KeyPrefix::owner(PROFILE_PREFIX, profile_id)
}
