//! 通用类型定义

use serde::{Deserialize, Serialize};

/// 定义基于 UUID v7 的强类型 ID
///
/// 生成的类型实现 `Display`、`FromStr`、`From<Uuid>`、serde 透明序列化，
/// 并实现 [`Identifier`]，以便仓储层统一处理。
#[macro_export]
macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            ::serde::Serialize,
            ::serde::Deserialize,
            ::derive_more::Display,
            ::derive_more::From,
        )]
        #[serde(transparent)]
        #[display("{_0}")]
        pub struct $name(pub ::uuid::Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(::uuid::Uuid::now_v7())
            }

            pub fn from_uuid(uuid: ::uuid::Uuid) -> Self {
                Self(uuid)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl ::std::str::FromStr for $name {
            type Err = ::uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(::uuid::Uuid::parse_str(s)?))
            }
        }

        impl $crate::Identifier for $name {
            fn as_uuid(&self) -> ::uuid::Uuid {
                self.0
            }

            fn from_uuid(uuid: ::uuid::Uuid) -> Self {
                Self(uuid)
            }
        }
    };
}

/// 所有实体 ID 的公共能力
pub trait Identifier:
    Copy + Eq + Ord + std::hash::Hash + std::fmt::Display + Send + Sync + 'static
{
    fn as_uuid(&self) -> uuid::Uuid;

    fn from_uuid(uuid: uuid::Uuid) -> Self;
}

define_id!(
    /// 用户 ID
    UserId
);

/// 分页参数
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub page_size: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: 20,
        }
    }
}

impl Pagination {
    pub fn new(page: u32, page_size: u32) -> Self {
        Self {
            page: page.max(1),
            page_size: page_size.clamp(1, 1000),
        }
    }

    pub fn offset(&self) -> u32 {
        (self.page.saturating_sub(1)) * self.page_size
    }

    pub fn limit(&self) -> u32 {
        self.page_size
    }
}

/// 分页结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagedResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
}

impl<T> PagedResult<T> {
    pub fn new(items: Vec<T>, total: u64, pagination: &Pagination) -> Self {
        Self {
            items,
            total,
            page: pagination.page,
            page_size: pagination.page_size,
        }
    }

    pub fn total_pages(&self) -> u32 {
        if self.page_size == 0 {
            return 0;
        }
        self.total.div_ceil(self.page_size as u64) as u32
    }

    /// 对当前页数据做映射，分页信息保持不变
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PagedResult<U> {
        PagedResult {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            page_size: self.page_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_id_parse_and_display() {
        let id = UserId::new();
        let parsed: UserId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_user_id_serializes_as_plain_uuid() {
        let id = UserId::new();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id.0));
    }

    #[test]
    fn test_ids_are_time_ordered() {
        let first = UserId::new();
        let second = UserId::new();
        assert!(first < second);
    }

    #[test]
    fn test_pagination_offset() {
        assert_eq!(Pagination::new(1, 20).offset(), 0);
        assert_eq!(Pagination::new(3, 20).offset(), 40);
        assert_eq!(Pagination::new(0, 20).page, 1);
    }

    #[test]
    fn test_total_pages() {
        let result: PagedResult<u8> = PagedResult::new(vec![], 41, &Pagination::new(1, 20));
        assert_eq!(result.total_pages(), 3);
    }
}
