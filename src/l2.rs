/// 计算两个等长向量的欧氏距离平方
#[inline(always)]
pub fn l2_squared(va: &[f32], vb: &[f32]) -> f32 {
    debug_assert_eq!(va.len(), vb.len());
    va.iter().zip(vb).map(|(a, b)| (a - b) * (a - b)).sum()
}

/// 在若干组 d 维向量 vb 中查找与 va 欧氏距离最小的 k 个，返回索引和距离
///
/// 结果按距离升序排列，距离相同时索引小的在前
///
/// 参数：
/// - va: d 维的查询向量
/// - vb: 若干组首尾相接的 d 维向量
/// - k: 返回的最近邻居数量
pub fn knn_l2(va: &[f32], vb: &[f32], k: usize) -> (Vec<usize>, Vec<f32>) {
    let d = va.len();
    if k == 0 || d == 0 {
        return (vec![], vec![]);
    }

    // 维护一个长度不超过 k 的升序数组
    let mut best: Vec<(f32, usize)> = Vec::with_capacity(k.min(vb.len() / d) + 1);
    for (i, chunk) in vb.chunks_exact(d).enumerate() {
        let mut dis = l2_squared(va, chunk);
        if dis.is_nan() {
            dis = f32::INFINITY;
        }
        if best.len() == k && dis >= best[k - 1].0 {
            continue;
        }
        // 插入到所有相等元素之后，保证先插入的向量排在前面
        let pos = best.partition_point(|&(x, _)| x <= dis);
        best.insert(pos, (dis, i));
        best.truncate(k);
    }

    best.into_iter().map(|(dis, i)| (i, dis.sqrt())).unzip()
}
