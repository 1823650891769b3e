//! Domain records and the admin API's request and response models

pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{Lesson, Notification, Profile, QuizResult};
pub use requests::ConnectivityRequest;
pub use responses::{
    CleanupResponse, ConnectivityResponse, DataResponse, EnqueueResponse, ErrorResponse,
    HealthResponse, InvalidateResponse, QueueResponse,
};
