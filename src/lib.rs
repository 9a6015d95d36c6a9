//! Upload a photo or video, have Gemini describe it, pick one of three
//! generated motivational captions and get the caption composed onto the
//! image (optionally framed and branded).

pub mod config;
pub mod error;
pub mod gateway;
pub mod logging;
pub mod media;
pub mod options;
pub mod server;
pub mod session;

pub use config::Config;
pub use error::{ConfigError, DecodeError, GatewayError, SessionError};
pub use gateway::{AiGateway, CaptionOption, GeminiGateway};
pub use media::{MediaAsset, MediaSource};
pub use session::{Session, SessionSnapshot};
