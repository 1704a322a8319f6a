use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("configuration error: {0}")]
    ConfigurationError(String),

    #[error("control plane request failed: {0}")]
    ControlPlaneError(String),

    #[error("control plane response missing required field: {0}")]
    SchemaViolation(String),

    #[error("blob store error: {0}")]
    BlobStoreError(String),

    #[error("AWS SDK error: {0}")]
    AwsError(String),

    #[error("Azure error: {0}")]
    AzureError(String),

    #[error("invalid timestamp: {0}")]
    TimestampParseError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("HTTP request error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("unknown error: {0}")]
    Unknown(String),
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Unknown(err.to_string())
    }
}

impl From<aws_sdk_ec2::Error> for AppError {
    fn from(err: aws_sdk_ec2::Error) -> Self {
        AppError::AwsError(err.to_string())
    }
}

impl From<aws_sdk_s3::Error> for AppError {
    fn from(err: aws_sdk_s3::Error) -> Self {
        AppError::AwsError(err.to_string())
    }
}

impl From<aws_sdk_autoscaling::Error> for AppError {
    fn from(err: aws_sdk_autoscaling::Error) -> Self {
        AppError::AwsError(err.to_string())
    }
}
