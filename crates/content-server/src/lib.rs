/// Media content server for UPnP/DLNA renderers
///
/// Turns local files, remote streams and live capture devices into HTTP
/// URLs a renderer can fetch, with the metadata (DIDL-Lite, DLNA headers)
/// it needs to play them.
pub mod cache;
pub mod capture;
pub mod codec;
pub mod config;
pub mod content_type;
pub mod didl;
pub mod dlna;
pub mod playlist;
pub mod resolver;
pub mod server;
pub mod streams;
pub mod tags;
pub mod upstream;

pub use cache::MetaCache;
pub use capture::{CaptureHub, CaptureRegistry};
pub use codec::IdCodec;
pub use config::{MicrophoneConfig, ServerConfig};
pub use playlist::{parse_playlist, PlaylistType};
pub use resolver::Resolver;
pub use server::{ContentServer, Services};
pub use streams::StreamTitles;
pub use tags::LoftyTagReader;

#[cfg(feature = "cpal")]
pub use capture::MicrophoneSource;
