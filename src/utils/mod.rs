// Byte-level helpers shared by the tag and audio codecs
pub mod encoding;
pub mod io;

pub use io::ByteSource;
