use std::path::Path;
use std::sync::Mutex;

use log::debug;
use ndarray::Array2;
use opencv::core::{CV_32F, Mat, Scalar, Size, Vector};
use opencv::dnn;
use opencv::prelude::*;

use super::cv::rgb_to_mat;
use super::{EMBEDDING_DIM, ImageEmbedder};
use crate::media::Frame;
use crate::{Error, Result};

const INPUT_SIZE: i32 = 224;
const MEAN: [f32; 3] = [0.481_454_66, 0.457_827_5, 0.408_210_73];
const STD: [f32; 3] = [0.268_629_54, 0.261_302_6, 0.275_777_1];

/// 通过 OpenCV dnn 运行导出为 ONNX 的 CLIP ViT-B/32 图像编码器
pub struct ClipEmbedder {
    net: Mutex<dnn::Net>,
}

impl ClipEmbedder {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let path = path
            .to_str()
            .ok_or_else(|| Error::Model(format!("invalid model path: {}", path.display())))?;
        let net = dnn::read_net_from_onnx(path)?;
        Ok(Self { net: Mutex::new(net) })
    }
}

impl ImageEmbedder for ClipEmbedder {
    fn dimension(&self) -> usize {
        EMBEDDING_DIM
    }

    fn embed(&self, frames: &[Frame]) -> Result<Array2<f32>> {
        let images = frames
            .iter()
            .map(|frame| rgb_to_mat(&frame.image))
            .collect::<opencv::Result<Vector<Mat>>>()?;

        // 等比缩放后居中裁剪到 224x224，再逐通道标准化
        let mut blob = dnn::blob_from_images(
            &images,
            1. / 255.,
            Size::new(INPUT_SIZE, INPUT_SIZE),
            Scalar::default(),
            false,
            true,
            CV_32F,
        )?;
        let plane = (INPUT_SIZE * INPUT_SIZE) as usize;
        for (i, values) in blob.data_typed_mut::<f32>()?.chunks_exact_mut(plane).enumerate() {
            let c = i % 3;
            values.iter_mut().for_each(|v| *v = (*v - MEAN[c]) / STD[c]);
        }

        let output = {
            let mut net = self.net.lock().map_err(|_| Error::Model("CLIP net poisoned".into()))?;
            net.set_input(&blob, "", 1., Scalar::default())?;
            net.forward_single("")?
        };
        debug!("CLIP 输出 {} 个元素", output.total());

        let data = output.data_typed::<f32>()?.to_vec();
        Array2::from_shape_vec((frames.len(), EMBEDDING_DIM), data)
            .map_err(|e| Error::Model(format!("unexpected CLIP output: {}", e)))
    }
}
