use log::debug;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use utoipa::ToSchema;

use crate::l2::knn_l2;
use crate::metrics;
use crate::{Error, Result};

/// 最近邻搜索结果，两个列表一一对应
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Neighbors {
    /// 与查询向量的欧氏距离，升序
    pub distances: Vec<f32>,
    /// 向量在索引中的位置，即插入顺序
    pub indices: Vec<usize>,
}

impl Neighbors {
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// 只追加的暴力 L2 索引
///
/// 向量的插入位置就是它的 ID，不支持删除和更新
#[derive(Debug, Clone)]
pub struct SimilarityIndex {
    /// 向量维数
    d: usize,
    /// 所有向量首尾相接存放
    data: Vec<f32>,
}

impl SimilarityIndex {
    pub fn new(d: usize) -> Self {
        Self { d, data: vec![] }
    }

    pub fn dimension(&self) -> usize {
        self.d
    }

    /// 已存储的向量数量
    pub fn len(&self) -> usize {
        if self.d == 0 { 0 } else { self.data.len() / self.d }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// 追加一个向量，返回它的 ID
    pub fn insert(&mut self, vector: &[f32]) -> Result<usize> {
        self.check_dimension(vector)?;
        let id = self.len();
        self.data.extend_from_slice(vector);
        Ok(id)
    }

    /// 获取指定 ID 的向量
    pub fn get(&self, id: usize) -> Option<&[f32]> {
        if self.d == 0 {
            return None;
        }
        self.data.chunks_exact(self.d).nth(id)
    }

    /// 查询距离最近的 k 个向量，索引为空时返回空结果
    pub fn query(&self, vector: &[f32], k: usize) -> Result<Neighbors> {
        self.check_dimension(vector)?;
        let (indices, distances) = knn_l2(vector, &self.data, k);
        Ok(Neighbors { distances, indices })
    }

    fn check_dimension(&self, vector: &[f32]) -> Result<()> {
        if vector.len() != self.d || self.d == 0 {
            return Err(Error::Validation(format!(
                "vector dimension mismatch: got {}, index expects {}",
                vector.len(),
                self.d
            )));
        }
        Ok(())
    }
}

/// 跨请求共享的相似度索引
///
/// 所有读写都在锁内完成，写入过程中不会被读到半截的状态
#[derive(Debug)]
pub struct SharedIndex {
    inner: RwLock<SimilarityIndex>,
}

impl SharedIndex {
    pub fn new(d: usize) -> Self {
        Self { inner: RwLock::new(SimilarityIndex::new(d)) }
    }

    pub async fn dimension(&self) -> usize {
        self.inner.read().await.dimension()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }

    pub async fn insert(&self, vector: &[f32]) -> Result<usize> {
        let mut index = self.inner.write().await;
        let id = index.insert(vector)?;
        metrics::set_index_size(index.len());
        debug!("向量 {} 已加入索引", id);
        Ok(id)
    }

    pub async fn query(&self, vector: &[f32], k: usize) -> Result<Neighbors> {
        self.inner.read().await.query(vector, k)
    }

    /// 先查询再插入，两步在同一把写锁内完成
    ///
    /// 返回的邻居中不会包含刚插入的向量自身
    pub async fn query_then_insert(&self, vector: &[f32], k: usize) -> Result<(Neighbors, usize)> {
        let mut index = self.inner.write().await;
        let neighbors = index.query(vector, k)?;
        let id = index.insert(vector)?;
        metrics::set_index_size(index.len());
        debug!("向量 {} 已加入索引", id);
        Ok((neighbors, id))
    }
}
