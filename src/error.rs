use thiserror::Error;

/// 分析流水线的错误类型
#[derive(Debug, Error)]
pub enum Error {
    /// 媒体文件无法打开或解码
    #[error("decode error: {0}")]
    Decode(String),
    /// 模型推理失败或模型未加载
    #[error("model error: {0}")]
    Model(String),
    /// 外部网络或平台请求失败
    #[error("fetch error: {0}")]
    Fetch(String),
    /// 缺少必需的输入，或输入不合法
    #[error("validation error: {0}")]
    Validation(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation(_))
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Fetch(err.to_string())
    }
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        Error::Decode(err.to_string())
    }
}

impl From<hound::Error> for Error {
    fn from(err: hound::Error) -> Self {
        Error::Decode(err.to_string())
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(err: tokio::task::JoinError) -> Self {
        Error::Model(err.to_string())
    }
}

#[cfg(feature = "opencv")]
impl From<opencv::Error> for Error {
    fn from(err: opencv::Error) -> Self {
        Error::Model(err.to_string())
    }
}
