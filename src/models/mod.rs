// Request/Response models
pub mod subscription;
