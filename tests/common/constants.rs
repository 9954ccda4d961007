#![allow(dead_code)]

pub const ADMIN_ID: i64 = 1;
pub const USER_ID: i64 = 7;
pub const OTHER_USER_ID: i64 = 8;

pub const MAX_SEND_TRIES: u32 = 3;
pub const AUDIO_BODY: &[u8] = b"not really an mp3";
