//! 分页模型

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortInfo {
    pub empty: bool,
    pub sorted: bool,
    pub unsorted: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pageable {
    pub unpaged: bool,
    pub offset: u64,
    pub page_number: u32,
    pub page_size: u32,
    pub paged: bool,
    #[serde(default)]
    pub sort: SortInfo,
}

/// 服务端分页结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub content: Vec<T>,
    pub empty: bool,
    pub first: bool,
    pub last: bool,
    pub number: u32,
    pub number_of_elements: u32,
    pub size: u32,
    pub total_elements: u64,
    pub total_pages: u32,
    #[serde(default)]
    pub pageable: Pageable,
    #[serde(default)]
    pub sort: SortInfo,
}

/// 分页查询参数
///
/// 未设置的字段不会出现在查询字符串中。
#[derive(Debug, Clone, Default, Serialize)]
pub struct PageQuery {
    pub page: u32,
    pub size: Option<u32>,
    pub sort: Option<String>,
    pub ascending: Option<bool>,
    pub search: Option<String>,
    pub filter: Option<String>,
}

impl PageQuery {
    pub fn new(page: u32) -> Self {
        Self {
            page,
            ..Default::default()
        }
    }

    pub fn size(mut self, size: u32) -> Self {
        self.size = Some(size);
        self
    }

    pub fn sort_by(mut self, field: impl Into<String>, ascending: bool) -> Self {
        self.sort = Some(field.into());
        self.ascending = Some(ascending);
        self
    }

    pub fn search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    pub fn filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }
}
