pub mod shortlink;
pub mod sweep;
pub mod upload;

pub use shortlink::{ShortLinkBinder, ShortLinkError, ShortLinkService, YourlsClient};
pub use sweep::SweepService;
pub use upload::UploadService;
