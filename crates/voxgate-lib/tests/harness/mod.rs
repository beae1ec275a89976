#![allow(dead_code)]

pub mod mock_tts;
pub mod server;
