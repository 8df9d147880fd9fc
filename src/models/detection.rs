use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// 置信度阈值
pub const CONF_THRESHOLD: f32 = 0.25;
/// NMS 的 IoU 阈值
pub const IOU_THRESHOLD: f32 = 0.45;

/// COCO 数据集的 80 个类别
pub const COCO_LABELS: [&str; 80] = [
    "person", "bicycle", "car", "motorcycle", "airplane", "bus", "train", "truck", "boat",
    "traffic light", "fire hydrant", "stop sign", "parking meter", "bench", "bird", "cat", "dog",
    "horse", "sheep", "cow", "elephant", "bear", "zebra", "giraffe", "backpack", "umbrella",
    "handbag", "tie", "suitcase", "frisbee", "skis", "snowboard", "sports ball", "kite",
    "baseball bat", "baseball glove", "skateboard", "surfboard", "tennis racket", "bottle",
    "wine glass", "cup", "fork", "knife", "spoon", "bowl", "banana", "apple", "sandwich", "orange",
    "broccoli", "carrot", "hot dog", "pizza", "donut", "cake", "chair", "couch", "potted plant",
    "bed", "dining table", "toilet", "tv", "laptop", "mouse", "remote", "keyboard", "cell phone",
    "microwave", "oven", "toaster", "sink", "refrigerator", "book", "clock", "vase", "scissors",
    "teddy bear", "hair drier", "toothbrush",
];

/// 一个检测框，坐标为原图像素坐标
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Detection {
    pub xmin: f32,
    pub ymin: f32,
    pub xmax: f32,
    pub ymax: f32,
    pub confidence: f32,
    pub class: u32,
    pub name: String,
}

impl Detection {
    fn area(&self) -> f32 {
        (self.xmax - self.xmin).max(0.) * (self.ymax - self.ymin).max(0.)
    }

    /// 两个框的交并比
    pub fn iou(&self, other: &Detection) -> f32 {
        let w = (self.xmax.min(other.xmax) - self.xmin.max(other.xmin)).max(0.);
        let h = (self.ymax.min(other.ymax) - self.ymin.max(other.ymin)).max(0.);
        let inter = w * h;
        let union = self.area() + other.area() - inter;
        if union <= 0. { 0. } else { inter / union }
    }
}

/// 解析 YOLOv5 的原始输出
///
/// 每行格式为 `cx, cy, w, h, objectness, class_scores...`，坐标基于网络输入尺寸，
/// `scale` 为 `(原图宽 / 输入宽, 原图高 / 输入高)`
pub fn decode_yolov5(data: &[f32], scale: (f32, f32), conf_threshold: f32) -> Vec<Detection> {
    let stride = 5 + COCO_LABELS.len();
    let (sx, sy) = scale;
    let mut candidates = vec![];
    for row in data.chunks_exact(stride) {
        let objectness = row[4];
        if objectness < conf_threshold {
            continue;
        }
        let Some((class, score)) = row[5..]
            .iter()
            .copied()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(&b.1))
        else {
            continue;
        };
        let confidence = objectness * score;
        if confidence < conf_threshold {
            continue;
        }
        let (cx, cy, w, h) = (row[0], row[1], row[2], row[3]);
        candidates.push(Detection {
            xmin: (cx - w / 2.) * sx,
            ymin: (cy - h / 2.) * sy,
            xmax: (cx + w / 2.) * sx,
            ymax: (cy + h / 2.) * sy,
            confidence,
            class: class as u32,
            name: COCO_LABELS[class].to_string(),
        });
    }
    candidates
}

/// 按类别执行贪心 NMS，结果按置信度降序排列
pub fn non_max_suppression(mut candidates: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    let mut kept: Vec<Detection> = vec![];
    for det in candidates {
        if kept.iter().any(|k| k.class == det.class && k.iou(&det) > iou_threshold) {
            continue;
        }
        kept.push(det);
    }
    kept
}
