use std::path::Path;
use std::sync::Mutex;

use image::RgbImage;
use opencv::core::{CV_32F, Scalar, Size};
use opencv::dnn;
use opencv::prelude::*;

use super::cv::rgb_to_mat;
use super::{CONF_THRESHOLD, Detection, IOU_THRESHOLD, ObjectDetector};
use super::{decode_yolov5, non_max_suppression};
use crate::{Error, Result};

const INPUT_SIZE: i32 = 640;

/// 通过 OpenCV dnn 运行导出为 ONNX 的 YOLOv5s
pub struct YoloDetector {
    net: Mutex<dnn::Net>,
}

impl YoloDetector {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let path = path
            .to_str()
            .ok_or_else(|| Error::Model(format!("invalid model path: {}", path.display())))?;
        let net = dnn::read_net_from_onnx(path)?;
        Ok(Self { net: Mutex::new(net) })
    }
}

impl ObjectDetector for YoloDetector {
    fn detect(&self, image: &RgbImage) -> Result<Vec<Detection>> {
        let mat = rgb_to_mat(image)?;
        let blob = dnn::blob_from_image(
            &mat,
            1. / 255.,
            Size::new(INPUT_SIZE, INPUT_SIZE),
            Scalar::default(),
            false,
            false,
            CV_32F,
        )?;

        let output = {
            let mut net = self.net.lock().map_err(|_| Error::Model("YOLO net poisoned".into()))?;
            net.set_input(&blob, "", 1., Scalar::default())?;
            net.forward_single("")?
        };

        let scale = (
            image.width() as f32 / INPUT_SIZE as f32,
            image.height() as f32 / INPUT_SIZE as f32,
        );
        let candidates = decode_yolov5(output.data_typed::<f32>()?, scale, CONF_THRESHOLD);
        Ok(non_max_suppression(candidates, IOU_THRESHOLD))
    }
}
