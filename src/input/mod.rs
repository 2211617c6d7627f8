//! Controller input path: datagram decoding, key mapping and the uinput
//! virtual keyboard, driven by the UDP receiver loop.

pub mod emitter;
pub mod frame;
pub mod mapper;
pub mod receiver;
