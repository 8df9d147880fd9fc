use image::RgbImage;
use opencv::core::Mat;
use opencv::prelude::*;

/// 将 RGB 图像复制为 3 通道的 `Mat`，通道顺序保持 RGB
pub fn rgb_to_mat(image: &RgbImage) -> opencv::Result<Mat> {
    let flat = Mat::from_slice(image.as_raw())?;
    let mat = flat.reshape(3, image.height() as i32)?;
    mat.try_clone()
}
