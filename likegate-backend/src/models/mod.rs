pub mod like_request;
pub mod profile;

pub use like_request::{LikeRequest, NewLikeRequest, ProcessOutcome, RequestStats};
pub use profile::Profile;
